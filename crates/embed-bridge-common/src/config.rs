//! Configuration structures for embed-bridge.
//!
//! This module defines configuration options for each pipeline component:
//! - [`BridgeConfig`]: Top-level configuration containing all settings
//! - [`EngineConfig`]: Script runtime limits (memory, stack, GC)
//! - [`LoaderConfig`]: How embedded payload bytes are turned into source
//! - [`CallConfig`]: Native call surface settings

use serde::{Deserialize, Serialize};

/// Top-level bridge configuration.
///
/// This structure contains all configuration options for embed-bridge.
/// It can be loaded from files (TOML, JSON) as part of a config file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Script runtime configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Module loader configuration.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Call surface configuration.
    #[serde(default)]
    pub call: CallConfig,
}

/// Script runtime configuration.
///
/// Applied to every runtime when a script context is created. A value of
/// zero leaves the engine's own default in place.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Heap limit for one runtime, in megabytes.
    #[serde(default = "defaults::memory_limit_mb")]
    pub memory_limit_mb: u32,

    /// Maximum native stack used by script execution, in kilobytes.
    #[serde(default = "defaults::max_stack_size_kb")]
    pub max_stack_size_kb: u32,

    /// Allocation volume that triggers a garbage collection, in kilobytes.
    #[serde(default)]
    pub gc_threshold_kb: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_limit_mb: defaults::memory_limit_mb(),
            max_stack_size_kb: defaults::max_stack_size_kb(),
            gc_threshold_kb: 0,
        }
    }
}

impl EngineConfig {
    /// Heap limit in bytes, or `None` when unlimited.
    pub fn memory_limit_bytes(&self) -> Option<usize> {
        non_zero_bytes(self.memory_limit_mb, 1024 * 1024)
    }

    /// Stack limit in bytes, or `None` for the engine default.
    pub fn max_stack_size_bytes(&self) -> Option<usize> {
        non_zero_bytes(self.max_stack_size_kb, 1024)
    }

    /// GC threshold in bytes, or `None` for the engine default.
    pub fn gc_threshold_bytes(&self) -> Option<usize> {
        non_zero_bytes(self.gc_threshold_kb, 1024)
    }
}

fn non_zero_bytes(value: u32, unit: usize) -> Option<usize> {
    (value != 0).then(|| (value as usize).saturating_mul(unit))
}

/// Module loader configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoaderConfig {
    /// Exclude one trailing NUL terminator from the evaluated source.
    ///
    /// The embedding step appends a single `0x00` after the script text.
    /// Payloads without a terminator are evaluated whole either way.
    #[serde(default = "defaults::strip_terminator")]
    pub strip_terminator: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            strip_terminator: defaults::strip_terminator(),
        }
    }
}

/// Native call surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallConfig {
    /// Value returned by the sentinel call surface when any stage fails.
    #[serde(default = "defaults::failure_sentinel")]
    pub failure_sentinel: i32,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            failure_sentinel: defaults::failure_sentinel(),
        }
    }
}

/// Default value functions for serde.
mod defaults {
    pub const fn memory_limit_mb() -> u32 {
        64
    }

    pub const fn max_stack_size_kb() -> u32 {
        1024
    }

    pub const fn strip_terminator() -> bool {
        true
    }

    pub const fn failure_sentinel() -> i32 {
        -1
    }
}
