//! Command dispatch
//!
//! Resolution order: builtins (fixed table, cannot be shadowed), then the
//! host's procedures and extensions, then coroutines.

use tracing::trace;

use super::binding::{bind, ParamSpec};
use super::errors::{ErrorInfo, USER};
use super::stdlib::{self, coroutine};
use super::types::{Call, CallFrame, CallKind, Completion, Exception, Value};
use crate::interpreter::host::{CommandKind, ProcDef};
use crate::interpreter::session::Interp;

/// Dispatch a resolved argument list (command name first)
pub fn dispatch(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    let name = &args[0];
    trace!(command = %name, argc = args.len() - 1, "dispatch");

    interp
        .host
        .on_dispatch(args)
        .map_err(|msg| ErrorInfo::new(USER, msg))?;

    if let Some(builtin) = stdlib::lookup(name.as_bytes()) {
        return (builtin.run)(interp, args);
    }

    match interp.host.command_kind(name.as_bytes()) {
        CommandKind::Procedure(def) => {
            return invoke_procedure(interp, name, &def, &args[1..]).map(Completion::Call);
        }
        CommandKind::Extension(id) => {
            return interp
                .host
                .invoke_extension(id, args)
                .map(Completion::Value)
                .map_err(|msg| ErrorInfo::new(USER, msg).into());
        }
        CommandKind::None => {}
    }

    if interp.coroutines.contains_key(name) {
        return coroutine::resume_named(interp, args).map(Completion::Value);
    }

    Err(ErrorInfo::no_such_command(name.as_bytes()).into())
}

/// Bind `actual` against a procedure definition under a fresh call frame
///
/// The returned call still has to be entered: the engine pushes the frame
/// and runs the body on its own stack.
pub fn invoke_procedure(
    interp: &mut Interp,
    name: &Value,
    def: &ProcDef,
    actual: &[Value],
) -> Result<Call, Exception> {
    let spec = ParamSpec::parse(interp.host.as_ref(), &def.params)?;
    let body = interp.compile(&def.body)?;

    let scope = interp.host.frame_alloc();
    if let Err(e) = bind(interp.host.as_mut(), scope, &spec, name, actual) {
        interp.host.frame_free(scope);
        return Err(e.into());
    }

    let caller = interp.current();
    let frame = CallFrame {
        level: caller.level + 1,
        kind: CallKind::Procedure,
        scope,
        command: name.clone(),
        args: actual.to_vec(),
        parent: Some(caller.level),
    };
    Ok(Call {
        name: name.clone(),
        body,
        frame,
    })
}
