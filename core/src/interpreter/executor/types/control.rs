//! Control flow and execution frame types

use std::rc::Rc;

use super::ast::{Ast, NodeId};
use super::phase::{CommandPhase, Resume, WordPhase};
use super::values::Value;
use crate::interpreter::executor::errors::ErrorInfo;
use crate::interpreter::host::ScopeId;
use serde::{Deserialize, Serialize};

/* ===================== Control Flow ===================== */

/// Control flow state
///
/// When control != None, the VM unwinds the stack to find the appropriate
/// handler. For Suspend, the VM stops with its frames intact so it can be
/// resumed later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "t", content = "v")]
pub enum Control {
    #[default]
    None,
    Error(ErrorInfo),
    Return(Value),
    Break,
    Continue,
    Suspend,
}

/// Result code visible to embedders (numeric values match TCL)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResultCode {
    Ok = 0,
    Error = 1,
    Return = 2,
    Break = 3,
    Continue = 4,
}

/// Non-ok outcome of a command
#[derive(Debug, Clone, PartialEq)]
pub enum Exception {
    Error(ErrorInfo),
    Return(Value),
    Break,
    Continue,
}

impl Exception {
    pub fn code(&self) -> ResultCode {
        match self {
            Exception::Error(_) => ResultCode::Error,
            Exception::Return(_) => ResultCode::Return,
            Exception::Break => ResultCode::Break,
            Exception::Continue => ResultCode::Continue,
        }
    }
}

impl From<ErrorInfo> for Exception {
    fn from(err: ErrorInfo) -> Self {
        Exception::Error(err)
    }
}

impl From<Exception> for Control {
    fn from(exc: Exception) -> Self {
        match exc {
            Exception::Error(e) => Control::Error(e),
            Exception::Return(v) => Control::Return(v),
            Exception::Break => Control::Break,
            Exception::Continue => Control::Continue,
        }
    }
}

/// What a command asks the engine to do once its arguments are dispatched
#[derive(Debug)]
pub enum Completion {
    /// Finished with a result
    Value(Value),
    /// Evaluate `script` on the frame stack, then hand the outcome to `resume`
    Eval { script: Value, resume: Resume },
    /// Run a procedure body under a freshly bound call frame
    Call(Call),
}

impl From<Value> for Completion {
    fn from(v: Value) -> Self {
        Completion::Value(v)
    }
}

/// A bound procedure invocation, ready to run
#[derive(Debug)]
pub struct Call {
    pub name: Value,
    pub body: Rc<Ast>,
    pub frame: CallFrame,
}

/* ===================== Call Frames ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    Global,
    Procedure,
}

/// Variable scope of one procedure invocation (or the global scope)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallFrame {
    pub level: usize,
    pub kind: CallKind,
    pub scope: ScopeId,
    /// Invoking command name and its arguments, for introspection
    pub command: Value,
    pub args: Vec<Value>,
    /// Level of the enclosing frame
    pub parent: Option<usize>,
}

impl CallFrame {
    pub fn global(scope: ScopeId) -> Self {
        CallFrame {
            level: 0,
            kind: CallKind::Global,
            scope,
            command: Value::empty(),
            args: Vec::new(),
            parent: None,
        }
    }
}

/* ===================== Frames ===================== */

/// Frame kind - the type and state of a node being evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum FrameKind {
    Script {
        idx: usize,
    },
    Command {
        phase: CommandPhase,
        idx: usize,
        args: Vec<Value>,
    },
    Word {
        phase: WordPhase,
        idx: usize,
        acc: Vec<u8>,
        /// Deliver the result as a list of separate arguments
        expand: bool,
    },
}

/// Execution frame - one per node being evaluated
///
/// The frame stack replaces the native call stack, making evaluation
/// serializable and resumable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(flatten)]
    pub kind: FrameKind,

    /// Tree the node belongs to
    pub tree: Rc<Ast>,

    /// The AST node this frame evaluates
    pub node: NodeId,

    /// Index of the frame waiting for this one's result
    pub parent: Option<usize>,
}
