//! # Executor - Resumable Stack-Driven Evaluation
//!
//! Evaluates a parsed [`types::Ast`] without native recursion.
//!
//! ## Core Principles
//!
//! 1. **Stack-driven execution**: All evaluation state is in `VM::frames`;
//!    scripts, commands and words each get a frame with a phase
//! 2. **Centralized control flow**: `Control` carries error/return/break/continue
//!    while frames unwind, and `Suspend` when a coroutine yields
//! 3. **Builtin continuations**: control-flow builtins ask the engine to run a
//!    script and call them back instead of re-entering the run loop
//! 4. **Host owned data**: variables, procedures and lists live behind the
//!    [`crate::interpreter::host::Host`] trait
//!
//! A suspended VM is plain data and serializes with serde.

pub mod binding;
pub mod commands;
pub mod dispatch;
pub mod errors;
pub mod exec_loop;
pub mod stdlib;
pub mod types;
pub mod vm;
pub mod words;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use errors::ErrorInfo;
pub use exec_loop::{run_until_done, step};
pub use types::{Ast, Control, Node, ResultCode, Value};
pub use vm::{Step, VM};
