//! The interpreter: scanner, tree builder, evaluation engine and host seam
//!
//! [`Interp`] is the entry point. It parses source with [`parser`], runs
//! the tree on the [`executor`] and keeps all data in a [`Host`].

pub mod executor;
pub mod host;
pub mod parser;
pub mod scanner;
pub mod session;

pub use executor::types::{ResultCode, Value};
pub use host::{Host, MemoryHost};
pub use parser::{ParseError, ParseStatus};
pub use session::Interp;
