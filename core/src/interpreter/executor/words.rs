//! Word frame handlers
//!
//! A word frame produces the value of one word-level node: a composite
//! word, an array reference, a command substitution, or (when a word is the
//! root of the tree) a lone literal, escape or variable.

use super::errors::{ErrorInfo, BAD_VALUE};
use super::types::{Control, FrameKind, Node, Value, WordPhase};
use super::vm::{Step, VM};
use crate::interpreter::session::Interp;

/* ===================== Word Phase ===================== */

pub fn execute_word(vm: &mut VM, interp: &mut Interp, top: usize) -> Step {
    let frame = &vm.frames[top];
    let tree = frame.tree.clone();
    let FrameKind::Word { phase, idx, .. } = &frame.kind else {
        return Step::Continue;
    };
    let (phase, idx) = (*phase, *idx);

    match tree.node(frame.node) {
        Node::Literal { span } => deliver(vm, interp, Value::from(tree.slice(*span))),
        Node::Backslash { bytes } => deliver(vm, interp, Value::from(bytes.as_slice())),
        Node::VarSimple { name } => match interp.read_var(tree.slice(*name)) {
            Ok(value) => deliver(vm, interp, value),
            Err(e) => vm.control = Control::Error(e),
        },

        Node::VarArray { name, index } => match (phase, index) {
            (WordPhase::Concat, Some(index)) => {
                // The index is evaluated strictly before the lookup
                set_phase(vm, top, WordPhase::ArrayIndex);
                if let Err(e) = interp.push(vm, &tree, *index, top, false) {
                    vm.control = Control::Error(e);
                }
            }
            (WordPhase::Concat, None) => {
                let key = element_key(tree.slice(*name), b"");
                lookup_and_deliver(vm, interp, &key);
            }
            _ => {
                let index = take_acc(vm, top);
                let key = element_key(tree.slice(*name), &index);
                lookup_and_deliver(vm, interp, &key);
            }
        },

        Node::CmdSubst { script } => match phase {
            WordPhase::Concat => {
                set_phase(vm, top, WordPhase::Substitute);
                interp.result = Value::empty();
                if let Err(e) = interp.push(vm, &tree, *script, top, false) {
                    vm.control = Control::Error(e);
                }
            }
            _ => {
                let value = interp.result.clone();
                deliver(vm, interp, value);
            }
        },

        Node::Word { parts } => {
            let mut at = idx;
            while let Some(&part) = parts.get(at) {
                at += 1;
                let inline = match tree.node(part) {
                    Node::Literal { span } => Some(Ok(tree.slice(*span).to_vec())),
                    Node::Backslash { bytes } => Some(Ok(bytes.clone())),
                    Node::VarSimple { name } => Some(
                        interp
                            .read_var(tree.slice(*name))
                            .map(|v| v.as_bytes().to_vec()),
                    ),
                    _ => None,
                };
                match inline {
                    Some(Ok(bytes)) => append_acc(vm, top, &bytes),
                    Some(Err(e)) => {
                        vm.control = Control::Error(e);
                        return Step::Continue;
                    }
                    None => {
                        set_idx(vm, top, at);
                        if let Err(e) = interp.push(vm, &tree, part, top, false) {
                            vm.control = Control::Error(e);
                        }
                        return Step::Continue;
                    }
                }
            }
            let value = Value::from(take_acc(vm, top));
            deliver(vm, interp, value);
        }

        Node::Script { .. } | Node::Command { .. } | Node::Expand { .. } => {
            vm.control = Control::Error(ErrorInfo::internal("word frame on a non-word node"));
        }
    }
    Step::Continue
}

/* ===================== Delivery ===================== */

/// Pop the finished word frame and hand its value to the frame waiting on it
///
/// Commands take it as one more argument (or several, for an expanded word),
/// words concatenate it, and a word with no parent leaves it in the session
/// result.
fn deliver(vm: &mut VM, interp: &mut Interp, value: Value) {
    let Some(frame) = vm.frames.pop() else {
        return;
    };
    let expand = matches!(frame.kind, FrameKind::Word { expand: true, .. });

    let Some(parent) = frame.parent.and_then(|p| vm.frames.get_mut(p)) else {
        interp.result = value;
        return;
    };
    match &mut parent.kind {
        FrameKind::Command { args, .. } if expand => match interp.host.list_elements(&value) {
            Ok(items) => args.extend(items),
            Err(msg) => vm.control = Control::Error(ErrorInfo::new(BAD_VALUE, msg)),
        },
        FrameKind::Command { args, .. } => args.push(value),
        FrameKind::Word { acc, .. } => acc.extend_from_slice(value.as_bytes()),
        FrameKind::Script { .. } => interp.result = value,
    }
}

fn lookup_and_deliver(vm: &mut VM, interp: &mut Interp, key: &[u8]) {
    match interp.read_var(key) {
        Ok(value) => deliver(vm, interp, value),
        Err(e) => vm.control = Control::Error(e),
    }
}

/// Variable name of an array element: `name(index)`
fn element_key(name: &[u8], index: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(name.len() + index.len() + 2);
    key.extend_from_slice(name);
    key.push(b'(');
    key.extend_from_slice(index);
    key.push(b')');
    key
}

/* ===================== Frame Accessors ===================== */

fn set_phase(vm: &mut VM, top: usize, new: WordPhase) {
    if let FrameKind::Word { phase, .. } = &mut vm.frames[top].kind {
        *phase = new;
    }
}

fn set_idx(vm: &mut VM, top: usize, at: usize) {
    if let FrameKind::Word { idx, .. } = &mut vm.frames[top].kind {
        *idx = at;
    }
}

fn append_acc(vm: &mut VM, top: usize, bytes: &[u8]) {
    if let FrameKind::Word { acc, .. } = &mut vm.frames[top].kind {
        acc.extend_from_slice(bytes);
    }
}

fn take_acc(vm: &mut VM, top: usize) -> Vec<u8> {
    match &mut vm.frames[top].kind {
        FrameKind::Word { acc, .. } => std::mem::take(acc),
        _ => Vec::new(),
    }
}
