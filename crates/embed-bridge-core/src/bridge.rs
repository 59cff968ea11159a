//! Calling resolved entry functions from native code.
//!
//! This module provides:
//!
//! 1. [`ScriptContext::invoke`]: convert native arguments, call an
//!    [`EntryFunction`], and convert its result back to `i32`
//! 2. [`call_embedded`]: the whole pipeline for one call in a fresh context,
//!    reporting the full [`BridgeError`] taxonomy
//! 3. [`call_with_sentinel`]: the same pipeline behind a plain integer
//!    surface, with failures reduced to a sentinel and a log line

use std::time::Instant;

use rquickjs::function::{Rest, This};
use rquickjs::{CatchResultExt, Coerced, Ctx, FromJs, Value};
use tracing::{debug, error, info, instrument};

use crate::ScriptContext;
use crate::loader::{EntryFunction, describe_caught};
use crate::resource::EmbeddedResource;
use embed_bridge_common::{BridgeConfig, BridgeError, Stage};

/// A native argument for an entry function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArg {
    /// Passed as an engine integer.
    Int(i32),
    /// JSON text, parsed by the engine into a structured value.
    Json(String),
}

impl From<i32> for CallArg {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl CallArg {
    /// Build the engine value for this argument.
    fn to_value<'js>(&self, ctx: &Ctx<'js>, index: usize) -> Result<Value<'js>, BridgeError> {
        match self {
            Self::Int(value) => Ok(Value::new_int(ctx.clone(), *value)),
            Self::Json(text) => ctx
                .json_parse(text.as_str())
                .catch(ctx)
                .map_err(|e| BridgeError::argument_conversion_failed(index, e.to_string())),
        }
    }
}

impl ScriptContext {
    /// Call an entry function with native arguments.
    ///
    /// Arguments are converted in order and passed positionally, with the
    /// global object as receiver.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::ArgumentConversionFailed`]: a JSON argument did not parse
    /// - [`BridgeError::CallFailed`]: the call raised, returned `undefined`, or
    ///   `entry` belongs to a different context
    /// - [`BridgeError::ResultConversionFailed`]: the result is not a number
    #[instrument(
        skip(self, entry, args),
        fields(context_id = %self.id(), module = entry.module(), argc = args.len())
    )]
    pub fn invoke(&self, entry: &EntryFunction<'_>, args: &[CallArg]) -> Result<i32, BridgeError> {
        if entry.context_id() != self.id() {
            return Err(BridgeError::call_failed(
                entry.module(),
                Some(format!(
                    "entry function belongs to script context {}",
                    entry.context_id()
                )),
            ));
        }

        let start = Instant::now();

        let result = self.with(|ctx| {
            let function = entry
                .restore(&ctx)
                .map_err(|e| BridgeError::call_failed(entry.module(), Some(e.to_string())))?;

            let values = args
                .iter()
                .enumerate()
                .map(|(index, arg)| arg.to_value(&ctx, index))
                .collect::<Result<Vec<_>, _>>()?;

            let returned: Value = function
                .call((This(ctx.globals()), Rest(values)))
                .catch(&ctx)
                .map_err(|e| {
                    BridgeError::call_failed(entry.module(), Some(describe_caught(&e)))
                })?;

            if returned.is_undefined() {
                return Err(BridgeError::call_failed(entry.module(), None));
            }
            debug!(stage = %Stage::Invoked, "Entry function returned");

            result_to_i32(&ctx, returned)
        });

        debug!(
            duration_us = start.elapsed().as_micros(),
            ok = result.is_ok(),
            "Invocation finished"
        );

        result
    }
}

/// Convert a returned engine value to `i32`.
///
/// Numbers go through the engine's ToInt32: truncation toward zero, then
/// wrapping modulo 2^32. NaN and infinities are rejected rather than mapped
/// to 0.
fn result_to_i32<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> Result<i32, BridgeError> {
    if let Some(int) = value.as_int() {
        return Ok(int);
    }

    match value.as_float() {
        Some(float) if float.is_finite() => Coerced::<i32>::from_js(ctx, value)
            .map(|coerced| coerced.0)
            .map_err(|e| BridgeError::result_conversion_failed(e.to_string())),
        Some(float) => Err(BridgeError::result_conversion_failed(format!(
            "non-finite number {float}"
        ))),
        None => Err(BridgeError::result_conversion_failed(value.type_name())),
    }
}

/// Run the whole pipeline once in a fresh context.
///
/// Creates a context, loads `resource` as `module_name`, calls the resolved
/// entry function with `args`, and releases everything before returning.
///
/// # Errors
///
/// Any [`BridgeError`]; [`BridgeError::stage`] tells where the pipeline
/// stopped.
#[instrument(skip(config, resource, args), fields(resource = resource.name(), argc = args.len()))]
pub fn call_embedded(
    config: &BridgeConfig,
    resource: &EmbeddedResource,
    module_name: &str,
    args: &[CallArg],
) -> Result<i32, BridgeError> {
    let start = Instant::now();
    debug!(stage = %Stage::ResourceLocated, len = resource.len(), "Starting invocation");

    let context = ScriptContext::from_config(config)?;
    debug!(stage = %Stage::ContextReady, context_id = %context.id(), "Context ready");

    let entry = context.load_module(resource, module_name)?;
    let value = context.invoke(&entry, args)?;

    info!(
        stage = %Stage::Succeeded,
        result = value,
        duration_us = start.elapsed().as_micros(),
        memory_used = context.memory_used_bytes(),
        "Embedded call completed"
    );

    Ok(value)
}

/// Run the pipeline with integer arguments, returning a sentinel on failure.
///
/// Returns the script's result, or `config.call.failure_sentinel` if any stage
/// fails. The failure itself is only reported through the log. Callers that
/// need to tell failure kinds apart should use [`call_embedded`].
pub fn call_with_sentinel(
    config: &BridgeConfig,
    resource: &EmbeddedResource,
    module_name: &str,
    args: &[i32],
) -> i32 {
    let args: Vec<CallArg> = args.iter().copied().map(CallArg::Int).collect();

    match call_embedded(config, resource, module_name, &args) {
        Ok(value) => value,
        Err(err) => {
            error!(
                resource = resource.name(),
                module = module_name,
                stage = %err.stage(),
                error = %err,
                "Embedded call failed"
            );
            config.call.failure_sentinel
        }
    }
}
