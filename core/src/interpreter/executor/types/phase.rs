//! Execution phase enums for each frame type
//!
//! Each frame kind has its own phase enum tracking which step of its node's
//! evaluation it is currently at.

use serde::{Deserialize, Serialize};

use super::values::Value;

/// Execution phase for Command frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "p")]
pub enum CommandPhase {
    /// Resolving words into the argument list, then dispatching
    Words,
    /// A procedure body is running above this frame (call boundary)
    Body { proc: Value },
    /// A builtin asked for a script to be evaluated and wants the outcome back
    Builtin { resume: Resume },
    /// Suspended at a `yield`; the resume value becomes this command's result
    Yielded,
}

/// Execution phase for Word frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(u8)]
pub enum WordPhase {
    /// Concatenating parts (composite words, literals, plain variables)
    Concat = 0,
    /// Evaluating an array index, then looking up `name(index)`
    ArrayIndex = 1,
    /// Evaluating a bracketed script, then taking its result
    Substitute = 2,
}

/// Continuation of a builtin that handed a script to the engine
///
/// `builtin` names the builtin whose resume function receives the script's
/// outcome together with `state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    pub builtin: String,
    pub state: Vec<Value>,
}

impl Resume {
    pub fn new(builtin: &str, state: Vec<Value>) -> Self {
        Resume {
            builtin: builtin.to_string(),
            state,
        }
    }
}
