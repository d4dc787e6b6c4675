//! Virtual Machine state
//!
//! The VM holds all execution state of one run loop:
//! - frames: Stack of nodes under evaluation
//! - control: Current control flow state (error, return, suspend, etc.)
//! - resume_value: Value handed back to a suspended `yield`

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::errors::ErrorInfo;
use super::types::{Ast, CommandPhase, Control, Frame, FrameKind, Node, NodeId, Value, WordPhase};

/* ===================== VM ===================== */

/// Virtual Machine state
///
/// This contains everything needed to execute (and serialize/resume) an
/// evaluation. Variables live in the host, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VM {
    /// Stack of execution frames
    pub frames: Vec<Frame>,

    /// Current control flow state
    pub control: Control,

    /// Result for the pending `yield` when execution resumes
    pub resume_value: Option<Value>,
}

impl VM {
    /// Create a VM that evaluates the root of `tree`
    ///
    /// The root may be a script or, for substitution of a single word, any
    /// word-level node.
    pub fn new(tree: Rc<Ast>) -> Self {
        let mut vm = VM {
            frames: vec![],
            control: Control::None,
            resume_value: None,
        };
        let root = tree.root();
        vm.frames.push(Frame {
            kind: initial_kind(tree.node(root), false),
            tree,
            node: root,
            parent: None,
        });
        vm
    }

    /// True once the VM stopped at a `yield` and can be resumed
    pub fn is_suspended(&self) -> bool {
        self.control == Control::Suspend
    }

    /// Continue a suspended VM; `value` becomes the result of the `yield`
    pub fn resume(&mut self, value: Value) {
        self.control = Control::None;
        self.resume_value = Some(value);
    }
}

/* ===================== Frame Management ===================== */

/// Initial frame kind for evaluating `node`
pub(crate) fn initial_kind(node: &Node, expand: bool) -> FrameKind {
    match node {
        Node::Script { .. } => FrameKind::Script { idx: 0 },
        Node::Command { .. } => FrameKind::Command {
            phase: CommandPhase::Words,
            idx: 0,
            args: Vec::new(),
        },
        _ => FrameKind::Word {
            phase: WordPhase::Concat,
            idx: 0,
            acc: Vec::new(),
            expand,
        },
    }
}

/// Push a frame evaluating `node` of `tree` on behalf of frame `parent`
///
/// Fails once the stack holds `max_frames` frames.
pub(crate) fn push_node(
    vm: &mut VM,
    tree: &Rc<Ast>,
    node: NodeId,
    parent: usize,
    expand: bool,
    max_frames: usize,
) -> Result<(), ErrorInfo> {
    if vm.frames.len() >= max_frames {
        return Err(ErrorInfo::too_deep());
    }
    vm.frames.push(Frame {
        kind: initial_kind(tree.node(node), expand),
        tree: Rc::clone(tree),
        node,
        parent: Some(parent),
    });
    Ok(())
}

/* ===================== Step Result ===================== */

/// Result of executing one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Continue to next step
    Continue,
    /// Execution complete (or suspended)
    Done,
}
