//! Type definitions for the executor
//!
//! This module contains all the core types used by the executor:
//! - AST nodes (Ast, Node)
//! - Runtime values (Value)
//! - Control flow (Control, Exception, Completion, Frame, FrameKind, CallFrame)
//! - Phases (CommandPhase, WordPhase, Resume)

pub mod ast;
pub mod control;
pub mod phase;
pub mod values;

// Re-export all types for convenient access
pub use ast::{Ast, Node, NodeId, Span};
pub use control::{
    Call, CallFrame, CallKind, Completion, Control, Exception, Frame, FrameKind, ResultCode,
};
pub use phase::{CommandPhase, Resume, WordPhase};
pub use values::Value;
