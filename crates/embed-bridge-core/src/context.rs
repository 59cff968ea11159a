//! Script runtime and context ownership.
//!
//! A [`ScriptContext`] is one QuickJS runtime plus one execution context
//! created from it. It is:
//! - Isolated: values produced in one context never reach another
//! - Single-user: one pipeline operates on it at a time
//! - Limited by [`EngineConfig`] (heap, stack, GC threshold)
//!
//! Independent calls each build their own context; setup cost is traded for
//! total isolation.

use rquickjs::{Context, Ctx, Runtime};
use tracing::{debug, info};
use uuid::Uuid;

use embed_bridge_common::{BridgeConfig, BridgeError, EngineConfig, LoaderConfig};

/// One runtime and one execution context.
///
/// All engine values produced while loading and calling modules are owned by
/// this context and released before it. Fields drop in declaration order, so
/// the context is always released before its runtime.
pub struct ScriptContext {
    context: Context,
    runtime: Runtime,
    id: Uuid,
    loader: LoaderConfig,
}

impl ScriptContext {
    /// Create a runtime and a context with the given engine limits.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::RuntimeCreationFailed`] if the runtime cannot be
    ///   allocated; nothing has been acquired at that point.
    /// - [`BridgeError::ContextCreationFailed`] if the context cannot be
    ///   allocated; the runtime is released before returning.
    pub fn new(config: &EngineConfig) -> Result<Self, BridgeError> {
        let runtime =
            Runtime::new().map_err(|e| BridgeError::runtime_creation_failed(e.to_string()))?;

        if let Some(limit) = config.memory_limit_bytes() {
            runtime.set_memory_limit(limit);
        }
        if let Some(limit) = config.max_stack_size_bytes() {
            runtime.set_max_stack_size(limit);
        }
        if let Some(threshold) = config.gc_threshold_bytes() {
            runtime.set_gc_threshold(threshold);
        }

        // `runtime` is dropped on the error path.
        let context = Context::full(&runtime)
            .map_err(|e| BridgeError::context_creation_failed(e.to_string()))?;

        let id = Uuid::new_v4();

        debug!(
            context_id = %id,
            memory_limit_mb = config.memory_limit_mb,
            max_stack_size_kb = config.max_stack_size_kb,
            "Script context created"
        );

        Ok(Self {
            context,
            runtime,
            id,
            loader: LoaderConfig::default(),
        })
    }

    /// Create a context from the full bridge configuration.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, BridgeError> {
        Ok(Self::new(&config.engine)?.with_loader_config(config.loader.clone()))
    }

    /// Replace the module loader settings.
    #[must_use]
    pub fn with_loader_config(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    /// Unique identifier of this context, used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Module loader settings.
    pub fn loader_config(&self) -> &LoaderConfig {
        &self.loader
    }

    /// Bytes currently in use by the runtime's allocator.
    pub fn memory_used_bytes(&self) -> i64 {
        self.runtime.memory_usage().memory_used_size
    }

    /// Run a garbage collection cycle.
    pub fn run_gc(&self) {
        self.runtime.run_gc();
    }

    /// Run `f` with access to the engine context.
    pub(crate) fn with<F, R>(&self, f: F) -> R
    where
        F: for<'js> FnOnce(Ctx<'js>) -> R,
    {
        self.context.with(f)
    }
}

impl Drop for ScriptContext {
    fn drop(&mut self) {
        info!(context_id = %self.id, "Script context released");
    }
}

impl std::fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptContext")
            .field("id", &self.id)
            .field("strip_terminator", &self.loader.strip_terminator)
            .finish_non_exhaustive()
    }
}
