//! Error types for embed-bridge.
//!
//! This module defines the failure taxonomy of the load-resolve-call pipeline:
//! - [`BridgeError`]: Every way a single invocation can fail
//! - [`Stage`]: The pipeline state a failure occurred in

use std::fmt;

use thiserror::Error;

/// Pipeline states of one end-to-end invocation.
///
/// States are ordered; an invocation only ever moves forward and stops at the
/// first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Nothing has happened yet.
    Idle,
    /// The embedded byte range has been resolved.
    ResourceLocated,
    /// A runtime and context exist.
    ContextReady,
    /// The payload evaluated without an exception.
    ModuleEvaluated,
    /// The `require_*` factory binding was found.
    EntryResolved,
    /// The factory returned without raising.
    FactoryInvoked,
    /// The factory result is a callable.
    CallableResolved,
    /// The callable returned a value.
    Invoked,
    /// The result was converted to a native value.
    Succeeded,
}

impl Stage {
    /// The state that directly follows this one, or `None` at the end.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::ResourceLocated),
            Self::ResourceLocated => Some(Self::ContextReady),
            Self::ContextReady => Some(Self::ModuleEvaluated),
            Self::ModuleEvaluated => Some(Self::EntryResolved),
            Self::EntryResolved => Some(Self::FactoryInvoked),
            Self::FactoryInvoked => Some(Self::CallableResolved),
            Self::CallableResolved => Some(Self::Invoked),
            Self::Invoked => Some(Self::Succeeded),
            Self::Succeeded => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ResourceLocated => "resource-located",
            Self::ContextReady => "context-ready",
            Self::ModuleEvaluated => "module-evaluated",
            Self::EntryResolved => "entry-resolved",
            Self::FactoryInvoked => "factory-invoked",
            Self::CallableResolved => "callable-resolved",
            Self::Invoked => "invoked",
            Self::Succeeded => "succeeded",
        };
        f.write_str(name)
    }
}

/// Failures of the load-resolve-call pipeline.
///
/// Every variant is terminal for the invocation that produced it. No partial
/// result accompanies an error.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The script runtime could not be allocated.
    #[error("Runtime creation failed: {reason}")]
    RuntimeCreationFailed {
        /// Engine-provided reason.
        reason: String,
    },

    /// The execution context could not be allocated from the runtime.
    #[error("Context creation failed: {reason}")]
    ContextCreationFailed {
        /// Engine-provided reason.
        reason: String,
    },

    /// The embedded resource has no data.
    #[error("No data for embedded resource '{resource}'")]
    NoData {
        /// Logical resource name.
        resource: String,
    },

    /// Top-level evaluation of the payload raised an exception.
    #[error("Evaluation of module '{module}' failed: {exception}")]
    EvaluationFailed {
        /// Logical module name.
        module: String,
        /// The stringified exception.
        exception: String,
    },

    /// The `require_*` binding is missing or not a function.
    #[error("Entry point '{entry_point}' not found")]
    EntryPointNotFound {
        /// The global binding that was looked up.
        entry_point: String,
    },

    /// Calling the module factory raised or produced a non-callable.
    #[error("Module factory '{entry_point}' failed: {reason}")]
    ModuleInitFailed {
        /// The factory binding name.
        entry_point: String,
        /// What went wrong.
        reason: String,
    },

    /// A native argument could not be turned into an engine value.
    #[error("Argument {index} could not be converted: {reason}")]
    ArgumentConversionFailed {
        /// Zero-based argument position.
        index: usize,
        /// What went wrong.
        reason: String,
    },

    /// The final call raised or returned `undefined`.
    #[error("Call into module '{module}' failed{}", detail_suffix(.detail.as_deref()))]
    CallFailed {
        /// Logical module name.
        module: String,
        /// Exception text, when one was caught.
        detail: Option<String>,
    },

    /// The call returned a value that is not a number.
    #[error("Result is not numeric (found {found})")]
    ResultConversionFailed {
        /// Engine type name of the returned value.
        found: String,
    },
}

fn detail_suffix(detail: Option<&str>) -> String {
    detail
        .map(|detail| format!(": {detail}"))
        .unwrap_or_default()
}

impl BridgeError {
    /// Create a new `RuntimeCreationFailed` error.
    pub fn runtime_creation_failed(reason: impl Into<String>) -> Self {
        Self::RuntimeCreationFailed {
            reason: reason.into(),
        }
    }

    /// Create a new `ContextCreationFailed` error.
    pub fn context_creation_failed(reason: impl Into<String>) -> Self {
        Self::ContextCreationFailed {
            reason: reason.into(),
        }
    }

    /// Create a new `NoData` error.
    pub fn no_data(resource: impl Into<String>) -> Self {
        Self::NoData {
            resource: resource.into(),
        }
    }

    /// Create a new `EvaluationFailed` error.
    pub fn evaluation_failed(module: impl Into<String>, exception: impl Into<String>) -> Self {
        Self::EvaluationFailed {
            module: module.into(),
            exception: exception.into(),
        }
    }

    /// Create a new `EntryPointNotFound` error.
    pub fn entry_point_not_found(entry_point: impl Into<String>) -> Self {
        Self::EntryPointNotFound {
            entry_point: entry_point.into(),
        }
    }

    /// Create a new `ModuleInitFailed` error.
    pub fn module_init_failed(entry_point: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModuleInitFailed {
            entry_point: entry_point.into(),
            reason: reason.into(),
        }
    }

    /// Create a new `ArgumentConversionFailed` error.
    pub fn argument_conversion_failed(index: usize, reason: impl Into<String>) -> Self {
        Self::ArgumentConversionFailed {
            index,
            reason: reason.into(),
        }
    }

    /// Create a new `CallFailed` error.
    pub fn call_failed(module: impl Into<String>, detail: Option<String>) -> Self {
        Self::CallFailed {
            module: module.into(),
            detail,
        }
    }

    /// Create a new `ResultConversionFailed` error.
    pub fn result_conversion_failed(found: impl Into<String>) -> Self {
        Self::ResultConversionFailed {
            found: found.into(),
        }
    }

    /// The pipeline state the invocation was in when this error ended it.
    pub fn stage(&self) -> Stage {
        match self {
            Self::RuntimeCreationFailed { .. } | Self::ContextCreationFailed { .. } => {
                Stage::ResourceLocated
            }
            Self::NoData { .. } | Self::EvaluationFailed { .. } => Stage::ContextReady,
            Self::EntryPointNotFound { .. } => Stage::ModuleEvaluated,
            Self::ModuleInitFailed { .. } => Stage::EntryResolved,
            Self::ArgumentConversionFailed { .. } | Self::CallFailed { .. } => {
                Stage::CallableResolved
            }
            Self::ResultConversionFailed { .. } => Stage::Invoked,
        }
    }

    /// Returns `true` if the engine itself could not be set up.
    pub fn is_engine_setup(&self) -> bool {
        matches!(
            self,
            Self::RuntimeCreationFailed { .. } | Self::ContextCreationFailed { .. }
        )
    }

    /// Returns `true` if the failure happened while loading the module.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Self::NoData { .. }
                | Self::EvaluationFailed { .. }
                | Self::EntryPointNotFound { .. }
                | Self::ModuleInitFailed { .. }
        )
    }
}
