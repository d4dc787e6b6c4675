//! In-memory host
//!
//! Hash-map backed storage for scopes, commands and namespaces. Output goes
//! to the process's stdout/stderr unless capture is switched on.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use tracing::warn;

use super::{Channel, CommandKind, ExtensionFn, ExtensionId, Host, ProcDef, ScopeId};
use crate::interpreter::executor::types::Value;

/// Upper bound on alias chains followed by variable lookups
const MAX_LINK_HOPS: usize = 64;

#[derive(Debug, Clone)]
enum Slot {
    Value(Value),
    Link(ScopeId, Vec<u8>),
}

#[derive(Default)]
struct Captured {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Shared view of everything a capturing [`MemoryHost`] has written
#[derive(Clone, Default)]
pub struct Capture(Rc<RefCell<Captured>>);

impl Capture {
    /// Drain captured standard output
    pub fn take_stdout(&self) -> String {
        let bytes = std::mem::take(&mut self.0.borrow_mut().stdout);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Drain captured standard error
    pub fn take_stderr(&self) -> String {
        let bytes = std::mem::take(&mut self.0.borrow_mut().stderr);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[derive(Default)]
pub struct MemoryHost {
    scopes: HashMap<ScopeId, HashMap<Vec<u8>, Slot>>,
    next_scope: u32,
    procs: HashMap<Vec<u8>, ProcDef>,
    extensions: Vec<Option<(Value, ExtensionFn)>>,
    extension_names: HashMap<Vec<u8>, ExtensionId>,
    namespaces: HashMap<Vec<u8>, Vec<Value>>,
    arena_depth: usize,
    captured: Option<Capture>,
}

impl MemoryHost {
    pub fn new() -> Self {
        let mut host = MemoryHost::default();
        host.namespaces.insert(b"::".to_vec(), Vec::new());
        host
    }

    /// A host that keeps everything written to either channel
    pub fn capturing() -> (Self, Capture) {
        let mut host = MemoryHost::new();
        let capture = Capture::default();
        host.captured = Some(capture.clone());
        (host, capture)
    }

    /// Number of evaluation regions currently open
    pub fn arena_depth(&self) -> usize {
        self.arena_depth
    }

    /// Number of live variable scopes
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Follow links from `(scope, name)` to the slot that holds the value
    fn resolve(&self, scope: ScopeId, name: &[u8]) -> (ScopeId, Vec<u8>) {
        let mut at = (scope, name.to_vec());
        for _ in 0..MAX_LINK_HOPS {
            match self.scopes.get(&at.0).and_then(|vars| vars.get(&at.1)) {
                Some(Slot::Link(target_scope, target)) => at = (*target_scope, target.clone()),
                _ => break,
            }
        }
        at
    }
}

fn namespace_key(name: &[u8]) -> Vec<u8> {
    if name.starts_with(b"::") {
        name.to_vec()
    } else {
        let mut key = b"::".to_vec();
        key.extend_from_slice(name);
        key
    }
}

impl Host for MemoryHost {
    fn scope_push(&mut self) {
        self.arena_depth += 1;
    }

    fn scope_pop(&mut self) {
        if self.arena_depth == 0 {
            warn!("scope_pop without a matching scope_push");
            return;
        }
        self.arena_depth -= 1;
    }

    fn frame_alloc(&mut self) -> ScopeId {
        let id = ScopeId(self.next_scope);
        self.next_scope += 1;
        self.scopes.insert(id, HashMap::new());
        id
    }

    fn frame_free(&mut self, scope: ScopeId) {
        self.scopes.remove(&scope);
    }

    fn var_get(&self, scope: ScopeId, name: &[u8]) -> Option<Value> {
        let (scope, name) = self.resolve(scope, name);
        match self.scopes.get(&scope)?.get(&name)? {
            Slot::Value(v) => Some(v.clone()),
            Slot::Link(..) => None,
        }
    }

    fn var_set(&mut self, scope: ScopeId, name: &[u8], value: Value) {
        let (scope, name) = self.resolve(scope, name);
        self.scopes
            .entry(scope)
            .or_default()
            .insert(name, Slot::Value(value));
    }

    fn var_unset(&mut self, scope: ScopeId, name: &[u8]) -> bool {
        let (target_scope, target) = self.resolve(scope, name);
        let existed = matches!(
            self.scopes.get(&target_scope).and_then(|vars| vars.get(&target)),
            Some(Slot::Value(_))
        );
        if let Some(vars) = self.scopes.get_mut(&target_scope) {
            vars.remove(&target);
        }
        existed
    }

    fn var_link(&mut self, scope: ScopeId, name: &[u8], target_scope: ScopeId, target: &[u8]) {
        if scope == target_scope && name == target {
            return;
        }
        self.scopes
            .entry(scope)
            .or_default()
            .insert(name.to_vec(), Slot::Link(target_scope, target.to_vec()));
    }

    fn proc_define(&mut self, name: &[u8], def: ProcDef) {
        if let Some(id) = self.extension_names.remove(name) {
            self.extensions[id.0 as usize] = None;
        }
        self.procs.insert(name.to_vec(), def);
    }

    fn proc_lookup(&self, name: &[u8]) -> Option<ProcDef> {
        self.procs.get(name).cloned()
    }

    fn procs(&self) -> Vec<Value> {
        let mut names: Vec<Value> = self.procs.keys().map(|k| Value::from(k.as_slice())).collect();
        names.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
        names
    }

    fn command_kind(&self, name: &[u8]) -> CommandKind {
        if let Some(def) = self.procs.get(name) {
            return CommandKind::Procedure(def.clone());
        }
        match self.extension_names.get(name) {
            Some(id) => CommandKind::Extension(*id),
            None => CommandKind::None,
        }
    }

    fn register_extension(&mut self, name: &[u8], func: ExtensionFn) -> ExtensionId {
        self.procs.remove(name);
        let id = ExtensionId(self.extensions.len() as u32);
        self.extensions.push(Some((Value::from(name), func)));
        if let Some(old) = self.extension_names.insert(name.to_vec(), id) {
            self.extensions[old.0 as usize] = None;
        }
        id
    }

    fn invoke_extension(&mut self, id: ExtensionId, args: &[Value]) -> Result<Value, Value> {
        let func = match self.extensions.get(id.0 as usize) {
            Some(Some((_, func))) => func.clone(),
            _ => return Err(Value::from(format!("unknown extension #{}", id.0))),
        };
        func(self, args)
    }

    fn remove_command(&mut self, name: &[u8]) -> bool {
        if self.procs.remove(name).is_some() {
            return true;
        }
        match self.extension_names.remove(name) {
            Some(id) => {
                self.extensions[id.0 as usize] = None;
                true
            }
            None => false,
        }
    }

    fn commands(&self) -> Vec<Value> {
        let mut names: Vec<Value> = self
            .procs
            .keys()
            .chain(self.extension_names.keys())
            .map(|k| Value::from(k.as_slice()))
            .collect();
        names.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
        names
    }

    fn ns_create(&mut self, name: &[u8]) {
        self.namespaces.entry(namespace_key(name)).or_default();
    }

    fn ns_delete(&mut self, name: &[u8]) -> bool {
        let key = namespace_key(name);
        if key == b"::" {
            return false;
        }
        self.namespaces.remove(&key).is_some()
    }

    fn ns_exists(&self, name: &[u8]) -> bool {
        self.namespaces.contains_key(&namespace_key(name))
    }

    fn ns_export(&mut self, name: &[u8], patterns: &[Value]) {
        self.namespaces
            .entry(namespace_key(name))
            .or_default()
            .extend(patterns.iter().cloned());
    }

    fn ns_exports(&self, name: &[u8]) -> Vec<Value> {
        self.namespaces
            .get(&namespace_key(name))
            .cloned()
            .unwrap_or_default()
    }

    fn output(&mut self, channel: Channel, bytes: &[u8]) {
        if let Some(Capture(captured)) = &self.captured {
            let mut captured = captured.borrow_mut();
            match channel {
                Channel::Stdout => captured.stdout.extend_from_slice(bytes),
                Channel::Stderr => captured.stderr.extend_from_slice(bytes),
            }
            return;
        }
        let result = match channel {
            Channel::Stdout => std::io::stdout().write_all(bytes),
            Channel::Stderr => std::io::stderr().write_all(bytes),
        };
        if let Err(e) = result {
            warn!(error = %e, %channel, "failed to write output");
        }
    }
}
