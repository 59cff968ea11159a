//! Common types, errors, and configuration for embed-bridge.
//!
//! This crate provides shared functionality used across the embed-bridge workspace:
//! - Error types using `thiserror` for the load-resolve-call pipeline
//! - The pipeline [`Stage`] state machine
//! - Configuration structures and the TOML config file

pub mod config;
pub mod config_file;
pub mod error;

pub use config::{BridgeConfig, CallConfig, EngineConfig, LoaderConfig};
pub use config_file::{ConfigFile, ConfigFileError, ScriptEntry};
pub use error::{BridgeError, Stage};
