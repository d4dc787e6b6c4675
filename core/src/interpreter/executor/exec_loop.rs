//! Core execution loop
//!
//! This module contains the step() function - the heart of the interpreter.
//! It processes one frame at a time, advancing execution phases and managing
//! the frame stack.
//!
//! ## Function Organization
//! 1. run_until_done() - Top-level driver (calls step repeatedly)
//! 2. step() - Main execution loop (dispatches to phase handlers)
//! 3. unwind() - Pops frames while a control signal is active

use super::commands::{execute_command, finish_call, resume_builtin};
use super::errors::{add_command_trace, ErrorInfo};
use super::types::{CommandPhase, Control, Exception, FrameKind, Node};
use super::vm::{Step, VM};
use super::words::execute_word;
use crate::interpreter::session::Interp;

/* ===================== Public API ===================== */

/// Run the VM until the stack empties, a signal escapes, or it suspends
///
/// After completion, inspect `vm.control` for the final state.
pub fn run_until_done(vm: &mut VM, interp: &mut Interp) {
    loop {
        match step(vm, interp) {
            Step::Continue => continue,
            Step::Done => break,
        }
    }
}

/// Execute one step of the VM
pub fn step(vm: &mut VM, interp: &mut Interp) -> Step {
    match vm.control {
        Control::None => {}
        Control::Suspend => return Step::Done,
        _ => return unwind(vm, interp),
    }

    let Some(top) = vm.frames.len().checked_sub(1) else {
        return Step::Done;
    };

    match &vm.frames[top].kind {
        FrameKind::Script { idx } => {
            let idx = *idx;
            execute_script(vm, interp, top, idx)
        }
        FrameKind::Command { .. } => execute_command(vm, interp, top),
        FrameKind::Word { .. } => execute_word(vm, interp, top),
    }
}

/* ===================== Script Phase ===================== */

/// Evaluate the next command of a script; the script's result is whatever
/// its last command leaves in the session result.
fn execute_script(vm: &mut VM, interp: &mut Interp, top: usize, idx: usize) -> Step {
    let frame = &vm.frames[top];
    let tree = frame.tree.clone();
    let Node::Script { commands } = tree.node(frame.node) else {
        vm.control = Control::Error(ErrorInfo::internal("script frame on a non-script node"));
        return Step::Continue;
    };

    let Some(&command) = commands.get(idx) else {
        vm.frames.pop();
        return Step::Continue;
    };

    vm.frames[top].kind = FrameKind::Script { idx: idx + 1 };
    if let Err(e) = interp.push(vm, &tree, command, top, false) {
        vm.control = Control::Error(e);
    }
    Step::Continue
}

/* ===================== Control Flow ===================== */

/// Unwind one frame while a signal is active
///
/// Procedure boundaries absorb `return`, builtins waiting on a script get
/// the outcome handed to their continuation, and every other command frame
/// adds itself to the error trace on the way out.
fn unwind(vm: &mut VM, interp: &mut Interp) -> Step {
    let Some(top) = vm.frames.len().checked_sub(1) else {
        // Nothing left to unwind: the signal escapes to the caller
        return Step::Done;
    };

    let FrameKind::Command { phase, .. } = &mut vm.frames[top].kind else {
        vm.frames.pop();
        return Step::Continue;
    };
    match std::mem::replace(phase, CommandPhase::Words) {
        CommandPhase::Body { proc } => {
            let exc = take_exception(vm);
            match finish_call(interp, &proc, Err(exc)) {
                Ok(value) => {
                    interp.result = value;
                    vm.frames.pop();
                }
                // Frame stays, now in the Words phase, so the next round
                // records the invoking command in the trace
                Err(exc) => vm.control = exc.into(),
            }
        }
        CommandPhase::Builtin { resume } => {
            let exc = take_exception(vm);
            return resume_builtin(vm, interp, top, resume, Err(exc));
        }
        _ => {
            let (tree, node) = (vm.frames[top].tree.clone(), vm.frames[top].node);
            if let Control::Error(err) = &mut vm.control {
                add_command_trace(err, &tree, node);
            }
            vm.frames.pop();
        }
    }
    Step::Continue
}

/// Move the active signal out of the VM as an exception
fn take_exception(vm: &mut VM) -> Exception {
    match std::mem::take(&mut vm.control) {
        Control::Error(e) => Exception::Error(e),
        Control::Return(v) => Exception::Return(v),
        Control::Break => Exception::Break,
        Control::Continue => Exception::Continue,
        // unwind never runs for these
        Control::None | Control::Suspend => {
            Exception::Error(ErrorInfo::internal("unwinding without a signal"))
        }
    }
}
