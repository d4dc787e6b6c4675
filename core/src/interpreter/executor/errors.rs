//! Error values and errorCode classifications
//!
//! Script-level errors are values: they carry a classification (`code`, the
//! script-visible errorCode), the message that becomes the interpreter
//! result, and the diagnostic trace that accumulates while the error unwinds.

use serde::{Deserialize, Serialize};

use super::types::{Ast, Node, NodeId, Value};
use crate::interpreter::host::list::format_element;

/* ===================== Error Codes ===================== */

pub const NO_SUCH_VARIABLE: &str = "TCL LOOKUP VARNAME";
pub const NO_SUCH_COMMAND: &str = "TCL LOOKUP COMMAND";
pub const WRONG_ARGS: &str = "TCL WRONGARGS";
pub const BAD_VALUE: &str = "TCL VALUE";
pub const ARITHMETIC: &str = "ARITH";
pub const PARSE: &str = "TCL PARSE";
pub const LIMIT: &str = "TCL LIMIT";
pub const BAD_CONTROL: &str = "TCL RESULT";
pub const COROUTINE: &str = "TCL COROUTINE";
pub const INTERNAL: &str = "TCL INTERNAL";
/// Errors raised by scripts (`error`) and host extensions
pub const USER: &str = "NONE";

/// Command text longer than this is cut short in traces
const TRACE_COMMAND_LIMIT: usize = 150;

/* ===================== ErrorInfo ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: Value,
    /// Trace text appended after the message (errorInfo minus the message)
    pub trace: String,
    /// Line of the innermost command the trace has passed through
    pub line: Option<u32>,
    /// Replaces the message at the head of errorInfo (`error msg info`)
    #[serde(default)]
    pub info: Option<String>,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<Value>) -> Self {
        ErrorInfo {
            code: code.into(),
            message: message.into(),
            trace: String::new(),
            line: None,
            info: None,
        }
    }

    pub fn no_such_variable(name: &[u8]) -> Self {
        let name = String::from_utf8_lossy(name);
        ErrorInfo::new(
            classify(NO_SUCH_VARIABLE, &name),
            format!("can't read \"{}\": no such variable", name),
        )
    }

    pub fn no_such_command(name: &[u8]) -> Self {
        let name = String::from_utf8_lossy(name);
        ErrorInfo::new(
            classify(NO_SUCH_COMMAND, &name),
            format!("invalid command name \"{}\"", name),
        )
    }

    /// `wrong # args: should be "usage"`
    pub fn wrong_args(usage: impl AsRef<str>) -> Self {
        ErrorInfo::new(
            WRONG_ARGS,
            format!("wrong # args: should be \"{}\"", usage.as_ref()),
        )
    }

    pub fn too_deep() -> Self {
        ErrorInfo::new(LIMIT, "too many nested evaluations (infinite loop?)")
    }

    pub fn outside_loop(what: &str) -> Self {
        ErrorInfo::new(
            BAD_CONTROL,
            format!("invoked \"{}\" outside of a loop", what),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ErrorInfo::new(INTERNAL, message.into())
    }

    /// The complete errorInfo text: message followed by the trace
    pub fn error_info(&self) -> String {
        match &self.info {
            Some(info) => format!("{}{}", info, self.trace),
            None => format!("{}{}", self.message, self.trace),
        }
    }
}

/// Build an errorCode list `CLASS... detail`
fn classify(class: &str, detail: &str) -> String {
    let detail = format_element(detail.as_bytes());
    format!("{} {}", class, String::from_utf8_lossy(&detail))
}

/* ===================== Trace Formatting ===================== */

/// Record that the error passed through the command `node` of `tree`.
///
/// The first command the error leaves is reported as "while executing",
/// every enclosing one as "invoked from within".
pub(crate) fn add_command_trace(err: &mut ErrorInfo, tree: &Ast, node: NodeId) {
    let Node::Command { span, line, .. } = tree.node(node) else {
        return;
    };
    let header = if err.trace.is_empty() && err.info.is_none() {
        "while executing"
    } else {
        "invoked from within"
    };
    let text = tree.slice(*span);
    let shown = if text.len() > TRACE_COMMAND_LIMIT {
        format!(
            "{}...",
            String::from_utf8_lossy(&text[..TRACE_COMMAND_LIMIT])
        )
    } else {
        String::from_utf8_lossy(text).into_owned()
    };
    err.trace.push_str(&format!("\n    {}\n\"{}\"", header, shown));
    err.line = Some(*line);
}

/// Record that the error left the body of procedure `name`.
pub(crate) fn add_procedure_trace(err: &mut ErrorInfo, name: &Value) {
    let line = err.line.unwrap_or(1);
    err.trace
        .push_str(&format!("\n    (procedure \"{}\" line {})", name, line));
}
