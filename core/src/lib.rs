//! Mortar - an embeddable interpreter for a TCL-style command language
//!
//! [`interpreter`] holds the scanner, parser, resumable engine and builtins;
//! [`embed`] is the handle-based surface for host applications; [`config`]
//! and [`cli`] drive the `mortar` binary.

pub mod cli;
pub mod config;
pub mod embed;
pub mod interpreter;

pub use config::{Config, Limits};
pub use embed::{Embedder, ForeignType, InterpHandle, ValueHandle};
pub use interpreter::{Host, Interp, MemoryHost, ParseStatus, ResultCode, Value};
