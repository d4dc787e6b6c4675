//! Command frame handlers
//!
//! A command frame collects its words into an argument list, dispatches,
//! and then, depending on what the command asked for, runs a procedure body
//! or a builtin's script above itself before it completes.

use tracing::debug;

use super::dispatch::dispatch;
use super::errors::{add_procedure_trace, ErrorInfo, BAD_VALUE};
use super::stdlib;
use super::types::{
    Call, CommandPhase, Completion, Control, Exception, FrameKind, Node, Resume, Value,
};
use super::vm::{Step, VM};
use crate::interpreter::session::Interp;

/* ===================== Command Phase ===================== */

pub fn execute_command(vm: &mut VM, interp: &mut Interp, top: usize) -> Step {
    let FrameKind::Command { phase, .. } = &vm.frames[top].kind else {
        return Step::Continue;
    };
    match phase {
        CommandPhase::Words => collect_words(vm, interp, top),
        CommandPhase::Body { proc } => {
            // Body finished normally
            let proc = proc.clone();
            match finish_call(interp, &proc, Ok(())) {
                Ok(value) => {
                    interp.result = value;
                    vm.frames.pop();
                }
                Err(exc) => {
                    set_phase(vm, top, CommandPhase::Words);
                    vm.control = exc.into();
                }
            }
            Step::Continue
        }
        CommandPhase::Builtin { resume } => {
            let resume = resume.clone();
            set_phase(vm, top, CommandPhase::Words);
            let outcome = Ok(interp.result.clone());
            resume_builtin(vm, interp, top, resume, outcome)
        }
        CommandPhase::Yielded => {
            interp.result = vm.resume_value.take().unwrap_or_default();
            vm.frames.pop();
            Step::Continue
        }
    }
}

/// Resolve the remaining words, then dispatch
///
/// Literals and plain variable references are resolved in place; every
/// other word gets a frame of its own and delivers back into `args`.
fn collect_words(vm: &mut VM, interp: &mut Interp, top: usize) -> Step {
    let tree = vm.frames[top].tree.clone();
    let Node::Command { words, .. } = tree.node(vm.frames[top].node) else {
        vm.control = Control::Error(ErrorInfo::internal("command frame on a non-command node"));
        return Step::Continue;
    };

    loop {
        let FrameKind::Command { idx, args, .. } = &mut vm.frames[top].kind else {
            return Step::Continue;
        };
        let Some(&word) = words.get(*idx) else {
            break;
        };
        *idx += 1;

        let inline = match tree.node(word) {
            Node::Literal { span } => Some(Ok(vec![Value::from(tree.slice(*span))])),
            Node::VarSimple { name } => Some(interp.read_var(tree.slice(*name)).map(|v| vec![v])),
            Node::Word { parts } => match parts.as_slice() {
                [only] => match tree.node(*only) {
                    Node::VarSimple { name } => {
                        Some(interp.read_var(tree.slice(*name)).map(|v| vec![v]))
                    }
                    _ => None,
                },
                _ => None,
            },
            Node::Expand { word: inner } => match tree.node(*inner) {
                Node::Literal { span } => Some(
                    interp
                        .host
                        .list_elements(&Value::from(tree.slice(*span)))
                        .map_err(|msg| ErrorInfo::new(BAD_VALUE, msg)),
                ),
                _ => None,
            },
            _ => None,
        };

        match inline {
            Some(Ok(values)) => args.extend(values),
            Some(Err(e)) => {
                vm.control = Control::Error(e);
                return Step::Continue;
            }
            None => {
                let (target, expand) = match tree.node(word) {
                    Node::Expand { word: inner } => (*inner, true),
                    _ => (word, false),
                };
                if let Err(e) = interp.push(vm, &tree, target, top, expand) {
                    vm.control = Control::Error(e);
                }
                return Step::Continue;
            }
        }
    }

    let FrameKind::Command { args, .. } = &mut vm.frames[top].kind else {
        return Step::Continue;
    };
    let args = std::mem::take(args);
    if args.is_empty() {
        // Everything expanded away: nothing to run
        interp.result = Value::empty();
        vm.frames.pop();
        return Step::Continue;
    }

    let outcome = dispatch(interp, &args);
    complete(vm, interp, top, outcome)
}

fn set_phase(vm: &mut VM, top: usize, new: CommandPhase) {
    if let FrameKind::Command { phase, .. } = &mut vm.frames[top].kind {
        *phase = new;
    }
}

/* ===================== Completion ===================== */

/// Act on what a command (or a builtin continuation) answered
pub(crate) fn complete(
    vm: &mut VM,
    interp: &mut Interp,
    top: usize,
    outcome: Result<Completion, Exception>,
) -> Step {
    match outcome {
        Ok(Completion::Value(value)) => {
            interp.result = value;
            if interp.yield_pending.is_some() {
                // Halt with this frame kept; resuming delivers the new value
                set_phase(vm, top, CommandPhase::Yielded);
                vm.control = Control::Suspend;
                return Step::Done;
            }
            vm.frames.pop();
        }
        Ok(Completion::Eval { script, resume }) => match interp.compile(&script) {
            Ok(tree) => {
                set_phase(vm, top, CommandPhase::Builtin { resume });
                interp.result = Value::empty();
                let root = tree.root();
                if let Err(e) = interp.push(vm, &tree, root, top, false) {
                    vm.control = Control::Error(e);
                }
            }
            Err(e) => vm.control = Control::Error(e),
        },
        Ok(Completion::Call(call)) => enter_call(vm, interp, top, call),
        Err(exc) => vm.control = exc.into(),
    }
    Step::Continue
}

/// Hand the outcome of a builtin's script to its continuation
pub(crate) fn resume_builtin(
    vm: &mut VM,
    interp: &mut Interp,
    top: usize,
    resume: Resume,
    outcome: Result<Value, Exception>,
) -> Step {
    let next = stdlib::resume(interp, resume, outcome);
    complete(vm, interp, top, next)
}

/* ===================== Procedure Calls ===================== */

/// Push the call frame and start the body above the command frame
fn enter_call(vm: &mut VM, interp: &mut Interp, top: usize, call: Call) {
    let Call { name, body, frame } = call;
    if interp.calls.len() >= interp.limits.max_call_depth {
        interp.host.frame_free(frame.scope);
        vm.control = Control::Error(ErrorInfo::too_deep());
        return;
    }

    debug!(proc = %name, level = frame.level, "enter procedure");
    interp.calls.push(frame);
    set_phase(vm, top, CommandPhase::Body { proc: name });
    interp.result = Value::empty();

    let root = body.root();
    if let Err(e) = interp.push(vm, &body, root, top, false) {
        vm.control = Control::Error(e);
    }
}

/// Leave the innermost call frame, mapping the body's outcome to the
/// invoking command's outcome
///
/// `return` becomes a normal result; `break` and `continue` cannot leave a
/// procedure.
pub(crate) fn finish_call(
    interp: &mut Interp,
    proc: &Value,
    outcome: Result<(), Exception>,
) -> Result<Value, Exception> {
    if let Some(frame) = interp.calls.pop() {
        interp.host.frame_free(frame.scope);
        debug!(proc = %proc, level = frame.level, "leave procedure");
    }

    match outcome {
        Ok(()) => Ok(interp.result.clone()),
        Err(Exception::Return(value)) => Ok(value),
        Err(Exception::Break) => {
            let mut err = ErrorInfo::outside_loop("break");
            add_procedure_trace(&mut err, proc);
            Err(err.into())
        }
        Err(Exception::Continue) => {
            let mut err = ErrorInfo::outside_loop("continue");
            add_procedure_trace(&mut err, proc);
            Err(err.into())
        }
        Err(Exception::Error(mut err)) => {
            add_procedure_trace(&mut err, proc);
            Err(err.into())
        }
    }
}
