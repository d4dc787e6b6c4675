//! Interpreter session
//!
//! An [`Interp`] owns everything one script-running session needs: its host,
//! the current result, the call-frame chain, suspended coroutines and the
//! evaluation limits. Sessions share nothing with each other.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use super::executor::errors::{ErrorInfo, PARSE};
use super::executor::stdlib::coroutine::{Active, Coroutine};
use super::executor::types::{Ast, CallFrame, Control, Exception, Node, NodeId, ResultCode, Value};
use super::executor::vm::{push_node, VM};
use super::executor::run_until_done;
use super::host::{ExtensionFn, ExtensionId, Host, MemoryHost, ScopeId};
use super::parser::{self, ParseError, ParseStatus};
use crate::config::{Config, Limits};

/// Parsed procedure bodies kept per session; the cache is dropped wholesale
/// when it fills up
const BODY_CACHE_LIMIT: usize = 512;

pub struct Interp {
    pub(crate) host: Box<dyn Host>,
    pub(crate) result: Value,
    code: ResultCode,
    error: Option<ErrorInfo>,
    pub(crate) global: CallFrame,
    /// Procedure call frames, innermost last
    pub(crate) calls: Vec<CallFrame>,
    pub(crate) limits: Limits,
    /// Value handed to the resumer once the running coroutine suspends
    pub(crate) yield_pending: Option<Value>,
    /// Coroutines by name; `None` while the coroutine is running
    pub(crate) coroutines: HashMap<Value, Option<Coroutine>>,
    pub(crate) coroutine: Option<Active>,
    /// Native run loops currently active (1 inside a top-level eval)
    pub(crate) nesting: usize,
    body_cache: HashMap<Vec<u8>, Rc<Ast>>,
    parent: Option<u32>,
}

impl Default for Interp {
    fn default() -> Self {
        Interp::new()
    }
}

impl Interp {
    /// Session over a fresh [`MemoryHost`] with default limits
    pub fn new() -> Self {
        Interp::with_host(Box::new(MemoryHost::new()))
    }

    pub fn with_host(host: Box<dyn Host>) -> Self {
        Interp::with_host_and_limits(host, Limits::default())
    }

    /// Session over a fresh [`MemoryHost`] using the configured limits
    pub fn with_config(config: &Config) -> Self {
        Interp::with_host_and_limits(Box::new(MemoryHost::new()), config.limits)
    }

    pub fn with_host_and_limits(mut host: Box<dyn Host>, limits: Limits) -> Self {
        let global = CallFrame::global(host.frame_alloc());
        Interp {
            host,
            result: Value::empty(),
            code: ResultCode::Ok,
            error: None,
            global,
            calls: Vec::new(),
            limits,
            yield_pending: None,
            coroutines: HashMap::new(),
            coroutine: None,
            nesting: 0,
            body_cache: HashMap::new(),
            parent: None,
        }
    }

    /* ===================== Embedding Surface ===================== */

    /// Classify `source` as complete, incomplete or malformed
    pub fn parse(&self, source: &[u8]) -> ParseStatus {
        match parser::parse_with_limit(source, self.limits.max_nodes) {
            Ok(_) => ParseStatus::Complete,
            Err(ParseError::Incomplete(_)) => ParseStatus::Incomplete,
            Err(e) => ParseStatus::Error(e.to_string()),
        }
    }

    /// Parse and run a script at top level
    pub fn eval(&mut self, script: impl AsRef<[u8]>) -> ResultCode {
        match parser::parse_with_limit(script.as_ref(), self.limits.max_nodes) {
            Ok(tree) => self.run_top(Rc::new(tree)),
            Err(e) => self.record_error(ErrorInfo::new(PARSE, e.to_string())),
        }
    }

    /// Run one command built from already-constructed values
    ///
    /// Nothing is re-parsed, so the words reach the command exactly as given.
    pub fn call(&mut self, words: &[Value]) -> ResultCode {
        if words.is_empty() {
            self.result = Value::empty();
            self.code = ResultCode::Ok;
            return self.code;
        }
        self.run_top(Rc::new(Ast::from_words(words)))
    }

    pub fn result(&self) -> &Value {
        &self.result
    }

    pub fn code(&self) -> ResultCode {
        self.code
    }

    /// Full error trace of the last failed evaluation
    pub fn error_info(&self) -> Option<String> {
        self.error.as_ref().map(ErrorInfo::error_info)
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut dyn Host {
        self.host.as_mut()
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Add a native command to this session
    pub fn register_command(&mut self, name: &str, func: ExtensionFn) -> ExtensionId {
        self.host.register_extension(name.as_bytes(), func)
    }

    /// Read a variable as a script at the current level would
    pub fn var_get(&self, name: &str) -> Option<Value> {
        self.read_var(name.as_bytes()).ok()
    }

    pub fn var_set(&mut self, name: &str, value: impl Into<Value>) {
        let (scope, name) = self.target(name.as_bytes());
        self.host.var_set(scope, name, value.into());
    }

    pub fn var_unset(&mut self, name: &str) -> bool {
        let (scope, name) = self.target(name.as_bytes());
        self.host.var_unset(scope, name)
    }

    /// Handle of the session this one was created under
    pub fn parent(&self) -> Option<u32> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<u32>) {
        self.parent = parent;
    }

    /* ===================== Scopes ===================== */

    /// Innermost call frame (the global frame at top level)
    pub fn current(&self) -> &CallFrame {
        self.calls.last().unwrap_or(&self.global)
    }

    pub(crate) fn scope(&self) -> ScopeId {
        self.current().scope
    }

    /// Call frame at an absolute level, if it is on the chain
    pub(crate) fn frame_at(&self, level: usize) -> Option<&CallFrame> {
        if level == 0 {
            return Some(&self.global);
        }
        self.calls.iter().rev().find(|f| f.level == level)
    }

    /// Scope and plain name a variable reference writes to
    ///
    /// `::name` always refers to the global scope.
    pub(crate) fn target<'n>(&self, name: &'n [u8]) -> (ScopeId, &'n [u8]) {
        match name.strip_prefix(b"::") {
            Some(rest) => (self.global.scope, rest),
            None => (self.scope(), name),
        }
    }

    /// Look a variable up in the current frame, then the global frame
    pub(crate) fn read_var(&self, name: &[u8]) -> Result<Value, ErrorInfo> {
        let (scope, plain) = self.target(name);
        self.host
            .var_get(scope, plain)
            .or_else(|| {
                (scope != self.global.scope)
                    .then(|| self.host.var_get(self.global.scope, plain))
                    .flatten()
            })
            .ok_or_else(|| ErrorInfo::no_such_variable(name))
    }

    pub(crate) fn write_var(&mut self, name: &[u8], value: Value) {
        let (scope, plain) = self.target(name);
        self.host.var_set(scope, plain, value);
    }

    /* ===================== Evaluation ===================== */

    pub(crate) fn push(
        &self,
        vm: &mut VM,
        tree: &Rc<Ast>,
        node: NodeId,
        parent: usize,
        expand: bool,
    ) -> Result<(), ErrorInfo> {
        push_node(vm, tree, node, parent, expand, self.limits.max_frames)
    }

    /// Parse a script, reusing the tree if this exact text was seen before
    pub(crate) fn compile(&mut self, script: &Value) -> Result<Rc<Ast>, ErrorInfo> {
        if let Some(tree) = self.body_cache.get(script.as_bytes()) {
            return Ok(Rc::clone(tree));
        }
        let tree = parser::parse_with_limit(script.as_bytes(), self.limits.max_nodes)
            .map(Rc::new)
            .map_err(|e| ErrorInfo::new(PARSE, e.to_string()))?;
        if self.body_cache.len() >= BODY_CACHE_LIMIT {
            self.body_cache.clear();
        }
        self.body_cache
            .insert(script.as_bytes().to_vec(), Rc::clone(&tree));
        Ok(tree)
    }

    /// Run `vm` inside its own evaluation region
    pub(crate) fn run_pass(&mut self, vm: &mut VM) {
        self.host.scope_push();
        run_until_done(vm, self);
        self.host.scope_pop();
    }

    fn run_top(&mut self, tree: Rc<Ast>) -> ResultCode {
        self.error = None;
        self.yield_pending = None;
        self.result = Value::empty();

        let mut vm = VM::new(tree);
        self.nesting += 1;
        self.run_pass(&mut vm);
        self.nesting -= 1;

        let control = std::mem::take(&mut vm.control);
        self.finish_top(control)
    }

    /// Map whatever escaped the top-level run loop to a result code
    fn finish_top(&mut self, control: Control) -> ResultCode {
        match control {
            Control::None => {
                self.code = ResultCode::Ok;
                self.code
            }
            Control::Return(value) => {
                self.result = value;
                self.code = ResultCode::Ok;
                self.code
            }
            Control::Break => self.record_error(ErrorInfo::outside_loop("break")),
            Control::Continue => self.record_error(ErrorInfo::outside_loop("continue")),
            Control::Error(err) => self.record_error(err),
            Control::Suspend => {
                // Only coroutine passes may stop early
                while let Some(frame) = self.calls.pop() {
                    self.host.frame_free(frame.scope);
                }
                self.yield_pending = None;
                self.record_error(ErrorInfo::internal("evaluation suspended outside a coroutine"))
            }
        }
    }

    fn record_error(&mut self, err: ErrorInfo) -> ResultCode {
        debug!(code = %err.code, message = %err.message, "evaluation failed");
        let global = self.global.scope;
        self.host
            .var_set(global, b"errorInfo", Value::from(err.error_info()));
        self.host
            .var_set(global, b"errorCode", Value::from(err.code.as_str()));
        self.result = err.message.clone();
        self.error = Some(err);
        self.code = ResultCode::Error;
        self.code
    }

    /// Evaluate a script in a nested run loop and hand back its outcome
    ///
    /// Used where a builtin needs a value before it can continue (command
    /// substitution inside `expr`). A `yield` cannot cross a nested loop.
    pub(crate) fn eval_nested(&mut self, script: &Value) -> Result<Value, Exception> {
        let tree = self.compile(script)?;
        self.run_nested(tree)
    }

    /// Perform `$` and `[]` substitution on `text` as if it were the content
    /// of a double-quoted word
    pub(crate) fn subst(&mut self, text: &[u8]) -> Result<Value, Exception> {
        let tree = parser::parse_word(text).map_err(|e| ErrorInfo::new(PARSE, e.to_string()))?;
        if let Node::Literal { span } = tree.node(tree.root()) {
            return Ok(Value::from(tree.slice(*span)));
        }
        self.run_nested(Rc::new(tree))
    }

    fn run_nested(&mut self, tree: Rc<Ast>) -> Result<Value, Exception> {
        if self.nesting >= self.limits.max_nesting {
            return Err(ErrorInfo::too_deep().into());
        }
        let mut vm = VM::new(tree);
        self.result = Value::empty();
        self.nesting += 1;
        self.run_pass(&mut vm);
        self.nesting -= 1;

        match std::mem::take(&mut vm.control) {
            Control::None => Ok(self.result.clone()),
            Control::Error(e) => Err(Exception::Error(e)),
            Control::Return(v) => Err(Exception::Return(v)),
            Control::Break => Err(Exception::Break),
            Control::Continue => Err(Exception::Continue),
            Control::Suspend => Err(ErrorInfo::internal("nested evaluation suspended").into()),
        }
    }
}
