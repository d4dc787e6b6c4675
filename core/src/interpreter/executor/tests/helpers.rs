//! Test helpers for executor tests
//!
//! Sessions over a capturing host, eval shortcuts, and a host wrapper that
//! counts region and scope bookkeeping.

use std::cell::Cell;
use std::rc::Rc;

use crate::config::Limits;
use crate::interpreter::executor::types::{ResultCode, Value};
use crate::interpreter::host::{
    Capture, Channel, CommandKind, ExtensionFn, ExtensionId, Host, MemoryHost, ProcDef, ScopeId,
};
use crate::interpreter::session::Interp;

/// Session whose output is captured
pub fn session() -> (Interp, Capture) {
    let (host, capture) = MemoryHost::capturing();
    (Interp::with_host(Box::new(host)), capture)
}

/// Evaluate `script`, require success and return the result
pub fn eval_ok(interp: &mut Interp, script: &str) -> String {
    let code = interp.eval(script);
    assert_eq!(
        code,
        ResultCode::Ok,
        "script failed: {}\nerror: {}",
        script,
        interp.result()
    );
    interp.result().to_string()
}

/// Evaluate `script`, require an error and return its message
pub fn eval_err(interp: &mut Interp, script: &str) -> String {
    let code = interp.eval(script);
    assert_eq!(
        code,
        ResultCode::Error,
        "script should fail: {}\nresult: {}",
        script,
        interp.result()
    );
    interp.result().to_string()
}

/// Bookkeeping observed by a [`CountingHost`]
#[derive(Clone, Default)]
pub struct Counters {
    pub pushes: Rc<Cell<usize>>,
    pub pops: Rc<Cell<usize>>,
    pub depth: Rc<Cell<usize>>,
    pub max_depth: Rc<Cell<usize>>,
    pub live_frames: Rc<Cell<usize>>,
}

impl Counters {
    pub fn balanced(&self) -> bool {
        self.pushes.get() == self.pops.get() && self.depth.get() == 0
    }
}

/// A [`MemoryHost`] that records every region push/pop and frame alloc/free
pub struct CountingHost {
    inner: MemoryHost,
    counters: Counters,
}

impl CountingHost {
    pub fn new() -> (Self, Counters) {
        let counters = Counters::default();
        let host = CountingHost {
            inner: MemoryHost::new(),
            counters: counters.clone(),
        };
        (host, counters)
    }
}

/// Session over a [`CountingHost`]
pub fn counting_session(limits: Limits) -> (Interp, Counters) {
    let (host, counters) = CountingHost::new();
    (Interp::with_host_and_limits(Box::new(host), limits), counters)
}

impl Host for CountingHost {
    fn scope_push(&mut self) {
        let c = &self.counters;
        c.pushes.set(c.pushes.get() + 1);
        c.depth.set(c.depth.get() + 1);
        c.max_depth.set(c.max_depth.get().max(c.depth.get()));
        self.inner.scope_push();
    }

    fn scope_pop(&mut self) {
        let c = &self.counters;
        c.pops.set(c.pops.get() + 1);
        c.depth.set(c.depth.get().saturating_sub(1));
        self.inner.scope_pop();
    }

    fn frame_alloc(&mut self) -> ScopeId {
        let c = &self.counters;
        c.live_frames.set(c.live_frames.get() + 1);
        self.inner.frame_alloc()
    }

    fn frame_free(&mut self, scope: ScopeId) {
        let c = &self.counters;
        c.live_frames.set(c.live_frames.get().saturating_sub(1));
        self.inner.frame_free(scope);
    }

    fn var_get(&self, scope: ScopeId, name: &[u8]) -> Option<Value> {
        self.inner.var_get(scope, name)
    }

    fn var_set(&mut self, scope: ScopeId, name: &[u8], value: Value) {
        self.inner.var_set(scope, name, value);
    }

    fn var_unset(&mut self, scope: ScopeId, name: &[u8]) -> bool {
        self.inner.var_unset(scope, name)
    }

    fn var_link(&mut self, scope: ScopeId, name: &[u8], target_scope: ScopeId, target: &[u8]) {
        self.inner.var_link(scope, name, target_scope, target);
    }

    fn proc_define(&mut self, name: &[u8], def: ProcDef) {
        self.inner.proc_define(name, def);
    }

    fn proc_lookup(&self, name: &[u8]) -> Option<ProcDef> {
        self.inner.proc_lookup(name)
    }

    fn procs(&self) -> Vec<Value> {
        self.inner.procs()
    }

    fn command_kind(&self, name: &[u8]) -> CommandKind {
        self.inner.command_kind(name)
    }

    fn register_extension(&mut self, name: &[u8], func: ExtensionFn) -> ExtensionId {
        self.inner.register_extension(name, func)
    }

    fn invoke_extension(&mut self, id: ExtensionId, args: &[Value]) -> Result<Value, Value> {
        self.inner.invoke_extension(id, args)
    }

    fn remove_command(&mut self, name: &[u8]) -> bool {
        self.inner.remove_command(name)
    }

    fn commands(&self) -> Vec<Value> {
        self.inner.commands()
    }

    fn ns_create(&mut self, name: &[u8]) {
        self.inner.ns_create(name);
    }

    fn ns_delete(&mut self, name: &[u8]) -> bool {
        self.inner.ns_delete(name)
    }

    fn ns_exists(&self, name: &[u8]) -> bool {
        self.inner.ns_exists(name)
    }

    fn ns_export(&mut self, name: &[u8], patterns: &[Value]) {
        self.inner.ns_export(name, patterns);
    }

    fn ns_exports(&self, name: &[u8]) -> Vec<Value> {
        self.inner.ns_exports(name)
    }

    fn output(&mut self, channel: Channel, bytes: &[u8]) {
        self.inner.output(channel, bytes);
    }
}
