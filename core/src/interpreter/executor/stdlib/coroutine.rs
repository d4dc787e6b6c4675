//! Coroutines: `coroutine` and `yield`
//!
//! A coroutine owns a VM and its own procedure call chain. Resuming it swaps
//! that chain into the session and runs the VM in a nested run loop until
//! the next `yield` (the VM stops with [`Control::Suspend`] and its frames
//! intact) or until the command finishes.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::wrong_args;
use crate::interpreter::executor::errors::{ErrorInfo, COROUTINE};
use crate::interpreter::executor::types::{Ast, CallFrame, Completion, Control, Exception, Value};
use crate::interpreter::executor::vm::VM;
use crate::interpreter::host::CommandKind;
use crate::interpreter::session::Interp;

/// Saved state of a suspended coroutine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coroutine {
    pub vm: VM,
    /// Procedure frames live inside the coroutine, innermost last
    pub calls: Vec<CallFrame>,
}

/// The coroutine whose VM is currently running
#[derive(Debug, Clone)]
pub(crate) struct Active {
    pub name: Value,
    /// Session nesting depth of the coroutine's own run loop
    pub level: usize,
}

/// `coroutine name command ?arg ...?`
pub fn coroutine(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    if args.len() < 3 {
        return Err(wrong_args(args, "name command ?arg ...?").into());
    }
    let name = args[1].clone();
    let taken = super::lookup(name.as_bytes()).is_some()
        || interp.host.command_kind(name.as_bytes()) != CommandKind::None
        || interp.coroutines.contains_key(&name);
    if taken {
        return Err(ErrorInfo::new(
            COROUTINE,
            format!("command \"{}\" already exists", name),
        )
        .into());
    }

    debug!(coroutine = %name, "create coroutine");
    let co = Coroutine {
        vm: VM::new(Rc::new(Ast::from_words(&args[2..]))),
        calls: Vec::new(),
    };
    interp.coroutines.insert(name.clone(), None);
    run_coroutine(interp, &name, co).map(Completion::Value)
}

/// Resume the coroutine `args[0]` with the optional value `args[1]`
pub(crate) fn resume_named(interp: &mut Interp, args: &[Value]) -> Result<Value, Exception> {
    if args.len() > 2 {
        return Err(wrong_args(args, "?value?").into());
    }
    let name = &args[0];
    let Some(slot) = interp.coroutines.get_mut(name) else {
        return Err(ErrorInfo::no_such_command(name.as_bytes()).into());
    };
    let Some(mut co) = slot.take() else {
        return Err(ErrorInfo::new(
            COROUTINE,
            format!("coroutine \"{}\" is already running", name),
        )
        .into());
    };

    debug!(coroutine = %name, "resume coroutine");
    co.vm.resume(args.get(1).cloned().unwrap_or_default());
    run_coroutine(interp, name, co)
}

/// Run `co` until it yields or finishes
///
/// A yield leaves the coroutine registered and answers the yielded value;
/// anything else removes it and answers its final outcome.
fn run_coroutine(interp: &mut Interp, name: &Value, mut co: Coroutine) -> Result<Value, Exception> {
    if interp.nesting >= interp.limits.max_nesting {
        interp.coroutines.remove(name);
        return Err(ErrorInfo::too_deep().into());
    }

    let saved_calls = std::mem::replace(&mut interp.calls, std::mem::take(&mut co.calls));
    let saved_active = interp.coroutine.replace(Active {
        name: name.clone(),
        level: interp.nesting + 1,
    });
    interp.result = Value::empty();
    interp.nesting += 1;
    interp.run_pass(&mut co.vm);
    interp.nesting -= 1;
    interp.coroutine = saved_active;
    co.calls = std::mem::replace(&mut interp.calls, saved_calls);

    if co.vm.is_suspended() {
        let value = interp.yield_pending.take().unwrap_or_default();
        debug!(coroutine = %name, "coroutine suspended");
        interp.coroutines.insert(name.clone(), Some(co));
        return Ok(value);
    }

    debug!(coroutine = %name, "coroutine finished");
    interp.coroutines.remove(name);
    for frame in co.calls.drain(..) {
        interp.host.frame_free(frame.scope);
    }
    match std::mem::take(&mut co.vm.control) {
        Control::None => Ok(interp.result.clone()),
        Control::Return(value) => Ok(value),
        Control::Error(err) => Err(Exception::Error(err)),
        Control::Break => Err(ErrorInfo::outside_loop("break").into()),
        Control::Continue => Err(ErrorInfo::outside_loop("continue").into()),
        Control::Suspend => Err(ErrorInfo::internal("coroutine suspended without a yield").into()),
    }
}

/// `yield ?value?`
///
/// Only valid directly inside the running coroutine's own run loop; the
/// engine suspends once this command completes.
pub fn yield_(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    if args.len() > 2 {
        return Err(wrong_args(args, "?value?").into());
    }
    let Some(active) = &interp.coroutine else {
        return Err(ErrorInfo::new(COROUTINE, "yield can only be called in a coroutine").into());
    };
    if active.level != interp.nesting {
        return Err(ErrorInfo::new(COROUTINE, "cannot yield: C stack busy").into());
    }
    interp.yield_pending = Some(args.get(1).cloned().unwrap_or_default());
    Ok(Value::empty().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::executor::types::ResultCode;

    fn eval_ok(interp: &mut Interp, script: &str) -> String {
        let code = interp.eval(script);
        assert_eq!(code, ResultCode::Ok, "{}: {}", script, interp.result());
        interp.result().to_string()
    }

    fn eval_err(interp: &mut Interp, script: &str) -> String {
        assert_eq!(interp.eval(script), ResultCode::Error, "{}", script);
        interp.result().to_string()
    }

    const COUNTER: &str = "proc counter {} { yield; set i 0; while 1 { incr i; yield $i } }";

    #[test]
    fn test_generator_yields_in_a_loop() {
        let mut interp = Interp::new();
        eval_ok(&mut interp, COUNTER);
        assert_eq!(eval_ok(&mut interp, "coroutine next counter"), "");
        assert_eq!(eval_ok(&mut interp, "next"), "1");
        assert_eq!(eval_ok(&mut interp, "next"), "2");
        assert_eq!(eval_ok(&mut interp, "list [next] [next]"), "3 4");
        assert!(eval_ok(&mut interp, "info commands n*").contains("next"));
    }

    #[test]
    fn test_resume_value_becomes_the_yield_result() {
        let mut interp = Interp::new();
        eval_ok(
            &mut interp,
            "proc acc {} { set total 0; while 1 { set n [yield $total]; incr total $n } }",
        );
        assert_eq!(eval_ok(&mut interp, "coroutine sum acc"), "0");
        assert_eq!(eval_ok(&mut interp, "sum 5"), "5");
        assert_eq!(eval_ok(&mut interp, "sum 10"), "15");
    }

    #[test]
    fn test_finished_coroutine_is_removed() {
        let mut interp = Interp::new();
        eval_ok(&mut interp, "proc twice {} { yield a; return b }");
        assert_eq!(eval_ok(&mut interp, "coroutine t twice"), "a");
        assert_eq!(eval_ok(&mut interp, "t"), "b");
        assert_eq!(eval_err(&mut interp, "t"), "invalid command name \"t\"");
        assert!(interp.calls.is_empty());
    }

    #[test]
    fn test_yield_outside_coroutine_and_through_expr() {
        let mut interp = Interp::new();
        assert_eq!(eval_err(&mut interp, "yield 1"), "yield can only be called in a coroutine");

        eval_ok(&mut interp, "proc busy {} { expr {[yield 1] + 1} }");
        assert_eq!(eval_err(&mut interp, "coroutine b busy"), "cannot yield: C stack busy");
        assert_eq!(eval_err(&mut interp, "b"), "invalid command name \"b\"");
    }

    #[test]
    fn test_reentry_and_name_collisions() {
        let mut interp = Interp::new();
        eval_ok(&mut interp, "proc selfcall {} { yield; self }");
        eval_ok(&mut interp, "coroutine self selfcall");
        assert_eq!(eval_err(&mut interp, "self"), "coroutine \"self\" is already running");
        assert_eq!(
            eval_err(&mut interp, "coroutine set selfcall"),
            "command \"set\" already exists"
        );
    }

    #[test]
    fn test_info_coroutine_names_the_running_coroutine() {
        let mut interp = Interp::new();
        eval_ok(&mut interp, "proc who {} { yield [info coroutine] }");
        assert_eq!(eval_ok(&mut interp, "coroutine gen who"), "gen");
        assert_eq!(eval_ok(&mut interp, "info coroutine"), "");
    }

    #[test]
    fn test_suspended_state_round_trips_through_json() {
        let mut interp = Interp::new();
        eval_ok(&mut interp, COUNTER);
        eval_ok(&mut interp, "coroutine next counter");
        eval_ok(&mut interp, "next");

        let name = Value::from("next");
        let Some(Some(saved)) = interp.coroutines.get(&name) else {
            panic!("coroutine should be suspended");
        };
        assert!(saved.vm.is_suspended());
        assert_eq!(saved.calls.len(), 1);

        let json = serde_json::to_string(saved).unwrap();
        let restored: Coroutine = serde_json::from_str(&json).unwrap();
        assert_eq!(&restored, saved);

        interp.coroutines.insert(name, Some(restored));
        assert_eq!(eval_ok(&mut interp, "next"), "2");
    }
}
