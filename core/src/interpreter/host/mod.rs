//! Host operations
//!
//! Everything the interpreter knows about storage goes through [`Host`]:
//! evaluation arenas, variable scopes, procedure and extension tables,
//! lists and namespaces. The engine never reaches around it, so an
//! embedding can back a session with whatever storage layer it has.
//!
//! [`MemoryHost`] is the in-process implementation used by default.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::executor::types::Value;

pub mod list;
pub mod memory;


pub use memory::{Capture, MemoryHost};

/* ===================== Handles ===================== */

/// Opaque handle to one variable scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

/// Opaque handle to a registered extension command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtensionId(pub u32);

/// Native command supplied by the embedder.
///
/// Receives the full argument vector (command name first). An `Err` carries
/// the error message.
pub type ExtensionFn = Rc<dyn Fn(&mut dyn Host, &[Value]) -> Result<Value, Value>>;

/// Stored procedure definition: raw parameter list and body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcDef {
    pub params: Value,
    pub body: Value,
}

/// What a command name refers to on the host side
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    Procedure(ProcDef),
    Extension(ExtensionId),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stdout,
    Stderr,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Stdout => write!(f, "stdout"),
            Channel::Stderr => write!(f, "stderr"),
        }
    }
}

/* ===================== Host Trait ===================== */

pub trait Host {
    /* ----- evaluation arenas ----- */

    /// Open the working region for one evaluation pass
    fn scope_push(&mut self);
    /// Release the most recently opened region
    fn scope_pop(&mut self);

    /* ----- variable scopes ----- */

    fn frame_alloc(&mut self) -> ScopeId;
    fn frame_free(&mut self, scope: ScopeId);

    fn var_get(&self, scope: ScopeId, name: &[u8]) -> Option<Value>;
    fn var_set(&mut self, scope: ScopeId, name: &[u8], value: Value);
    /// Returns false if the variable did not exist
    fn var_unset(&mut self, scope: ScopeId, name: &[u8]) -> bool;
    /// Make `name` in `scope` an alias of `target` in `target_scope`
    fn var_link(&mut self, scope: ScopeId, name: &[u8], target_scope: ScopeId, target: &[u8]);

    fn var_exists(&self, scope: ScopeId, name: &[u8]) -> bool {
        self.var_get(scope, name).is_some()
    }

    /* ----- commands ----- */

    fn proc_define(&mut self, name: &[u8], def: ProcDef);
    fn proc_lookup(&self, name: &[u8]) -> Option<ProcDef>;
    /// Names of all defined procedures
    fn procs(&self) -> Vec<Value>;

    fn command_kind(&self, name: &[u8]) -> CommandKind;

    fn register_extension(&mut self, name: &[u8], func: ExtensionFn) -> ExtensionId;
    fn invoke_extension(&mut self, id: ExtensionId, args: &[Value]) -> Result<Value, Value>;
    /// Remove a procedure or extension; false if nothing had that name
    fn remove_command(&mut self, name: &[u8]) -> bool;
    /// Names of all procedures and extensions
    fn commands(&self) -> Vec<Value>;

    /* ----- values ----- */

    fn new_string(&mut self, bytes: &[u8]) -> Value {
        Value::from(bytes)
    }

    fn bytes<'v>(&self, value: &'v Value) -> &'v [u8] {
        value.as_bytes()
    }

    fn list_new(&mut self, items: &[Value]) -> Value {
        list::format_list(items)
    }

    /// Split a list value; `Err` carries the message for malformed lists
    fn list_elements(&self, list: &Value) -> Result<Vec<Value>, Value> {
        list::parse_list(self.bytes(list)).map_err(Value::from)
    }

    fn list_length(&self, list: &Value) -> Result<usize, Value> {
        self.list_elements(list).map(|items| items.len())
    }

    fn list_index(&self, list: &Value, index: usize) -> Result<Option<Value>, Value> {
        self.list_elements(list)
            .map(|mut items| (index < items.len()).then(|| items.swap_remove(index)))
    }

    /* ----- namespaces ----- */

    fn ns_create(&mut self, name: &[u8]);
    fn ns_delete(&mut self, name: &[u8]) -> bool;
    fn ns_exists(&self, name: &[u8]) -> bool;
    fn ns_export(&mut self, name: &[u8], patterns: &[Value]);
    fn ns_exports(&self, name: &[u8]) -> Vec<Value>;

    /* ----- environment ----- */

    fn output(&mut self, channel: Channel, bytes: &[u8]);

    /// Called before every command dispatch; an `Err` aborts the command
    fn on_dispatch(&mut self, _args: &[Value]) -> Result<(), Value> {
        Ok(())
    }
}
