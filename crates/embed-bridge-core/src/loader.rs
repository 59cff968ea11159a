//! Loading embedded modules and resolving their entry functions.
//!
//! Loading is a two-phase protocol:
//!
//! 1. The payload is evaluated as a global script, so its top-level
//!    declarations, including the `require_<module>` factory, become globals.
//! 2. The factory is called with no arguments and the global object as
//!    receiver. Its return value is the function native code wants to call.
//!
//! The payload is therefore never assumed to be the callable itself.

use std::marker::PhantomData;
use std::time::Instant;

use rquickjs::context::EvalOptions;
use rquickjs::function::This;
use rquickjs::{CatchResultExt, CaughtError, Ctx, Function, Persistent, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::ScriptContext;
use crate::naming::{self, EMBED_SOURCE_LABEL};
use crate::resource::EmbeddedResource;
use embed_bridge_common::{BridgeError, Stage};

/// The callable a module's factory produced.
///
/// Borrows the [`ScriptContext`] it was loaded into, so it cannot outlive it.
/// The engine handle is released when this value is dropped.
pub struct EntryFunction<'ctx> {
    function: Persistent<Function<'static>>,
    module: String,
    entry_point: String,
    context_id: Uuid,
    _context: PhantomData<&'ctx ScriptContext>,
}

impl EntryFunction<'_> {
    /// Logical module name.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Name of the factory binding that produced this function.
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Identifier of the owning context.
    pub fn context_id(&self) -> Uuid {
        self.context_id
    }

    /// Re-acquire the function inside the owning context.
    pub(crate) fn restore<'js>(&self, ctx: &Ctx<'js>) -> rquickjs::Result<Function<'js>> {
        self.function.clone().restore(ctx)
    }
}

impl std::fmt::Debug for EntryFunction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryFunction")
            .field("module", &self.module)
            .field("entry_point", &self.entry_point)
            .field("context_id", &self.context_id)
            .finish_non_exhaustive()
    }
}

impl ScriptContext {
    /// Evaluate an embedded payload and resolve its module's entry function.
    ///
    /// # Arguments
    ///
    /// * `resource` - The embedded payload
    /// * `module_name` - Logical module name; the factory looked up is
    ///   `require_<module_name>`
    ///
    /// # Errors
    ///
    /// - [`BridgeError::NoData`]: the resource is null; nothing is evaluated
    /// - [`BridgeError::EvaluationFailed`]: the payload raised during evaluation
    /// - [`BridgeError::EntryPointNotFound`]: the factory binding is missing,
    ///   its lookup raised, or it is not a function
    /// - [`BridgeError::ModuleInitFailed`]: the factory raised or returned a
    ///   non-function
    #[instrument(
        skip(self, resource),
        fields(context_id = %self.id(), resource = resource.name(), source = EMBED_SOURCE_LABEL)
    )]
    pub fn load_module(
        &self,
        resource: &EmbeddedResource,
        module_name: &str,
    ) -> Result<EntryFunction<'_>, BridgeError> {
        let Some(payload) = resource.bytes() else {
            warn!("Embedded resource has no data");
            return Err(BridgeError::no_data(resource.name()));
        };

        let start = Instant::now();
        let source = naming::script_source(payload, self.loader_config().strip_terminator);
        let entry_point = naming::entry_point_name(module_name);

        debug!(
            payload_len = payload.len(),
            source_len = source.len(),
            entry_point = %entry_point,
            "Evaluating embedded module"
        );

        let function = self.with(|ctx| resolve_entry(&ctx, source, module_name, &entry_point))?;

        info!(
            entry_point = %entry_point,
            duration_us = start.elapsed().as_micros(),
            "Module loaded"
        );

        Ok(EntryFunction {
            function,
            module: module_name.to_owned(),
            entry_point,
            context_id: self.id(),
            _context: PhantomData,
        })
    }
}

/// Readable text for a caught script failure.
///
/// The engine reports exhausted memory as a bare `null` exception, which has
/// no useful rendering of its own.
pub(crate) fn describe_caught(caught: &CaughtError<'_>) -> String {
    match caught {
        CaughtError::Value(value) if value.is_null() || value.is_undefined() => {
            format!("out of memory or non-error throw ({})", value.type_name())
        }
        other => other.to_string(),
    }
}

/// Evaluate `source` globally, find the factory and call it.
fn resolve_entry(
    ctx: &Ctx<'_>,
    source: &[u8],
    module_name: &str,
    entry_point: &str,
) -> Result<Persistent<Function<'static>>, BridgeError> {
    let mut options = EvalOptions::default();
    options.global = true;
    options.strict = false;

    ctx.eval_with_options::<(), _>(source, options)
        .catch(ctx)
        .map_err(|e| {
            let exception = describe_caught(&e);
            warn!(exception = %exception, "Module evaluation raised");
            BridgeError::evaluation_failed(module_name, exception)
        })?;
    debug!(stage = %Stage::ModuleEvaluated, "Payload evaluated");

    let globals = ctx.globals();

    let binding: Value = globals.get(entry_point).catch(ctx).map_err(|e| {
        warn!(entry_point, error = %e, "Entry point lookup raised");
        BridgeError::entry_point_not_found(entry_point)
    })?;
    let Some(factory) = binding.as_function().cloned() else {
        warn!(
            entry_point,
            found = binding.type_name(),
            "Entry point is not a function"
        );
        return Err(BridgeError::entry_point_not_found(entry_point));
    };
    debug!(stage = %Stage::EntryResolved, "Factory binding found");

    let exported: Value = factory
        .call((This(globals),))
        .catch(ctx)
        .map_err(|e| BridgeError::module_init_failed(entry_point, describe_caught(&e)))?;
    debug!(stage = %Stage::FactoryInvoked, "Factory returned");

    let Some(callable) = exported.into_function() else {
        return Err(BridgeError::module_init_failed(
            entry_point,
            "factory did not return a function",
        ));
    };
    debug!(stage = %Stage::CallableResolved, "Entry function resolved");

    Ok(Persistent::save(ctx, callable))
}
