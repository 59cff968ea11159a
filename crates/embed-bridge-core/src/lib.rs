//! Locate, load, and call JavaScript modules embedded at link time.
//!
//! This crate provides the resource-to-callable-function bridge:
//! - [`EmbeddedResource`] and [`embedded_resource!`]: Payload bytes found via
//!   linker symbols
//! - [`ScriptContext`]: One QuickJS runtime plus one context
//! - [`ScriptContext::load_module`]: Evaluate a payload and resolve its entry
//!   function
//! - [`ScriptContext::invoke`], [`call_embedded`], [`call_with_sentinel`]:
//!   Marshal native arguments in and the result out
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  EmbeddedResource                       │
//! │  (Process lifetime, read-only)                          │
//! │  - _binary_<id>_start / _end, or __DATA,__<id>          │
//! └─────────────────────────────────────────────────────────┘
//!                            │ bytes
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                    ScriptContext                        │
//! │  (Per call pipeline, isolated)                          │
//! │  - Global evaluation of the payload                     │
//! │  - require_<module>() factory → EntryFunction           │
//! └─────────────────────────────────────────────────────────┘
//!                            │ EntryFunction<'ctx>
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                       invoke                            │
//! │  - CallArg → engine values                              │
//! │  - result → i32, or BridgeError                         │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod bridge;
pub mod context;
pub mod loader;
pub mod naming;
pub mod resource;

pub use bridge::{CallArg, call_embedded, call_with_sentinel};
pub use context::ScriptContext;
pub use loader::EntryFunction;
pub use resource::{EmbeddedResource, SymbolConvention};

pub use embed_bridge_common::{BridgeConfig, BridgeError, Stage};
