//! Embedder - handle-based boundary for host applications
//!
//! Language bindings talk to the interpreter only through an [`Embedder`]:
//! sessions and values are referred to by small integer handles, so nothing
//! on the other side of the boundary holds a Rust reference.
//!
//! Each session is independent. There is no process-wide state; a binding
//! that needs one embedder per process owns it itself.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::interpreter::host::{ExtensionFn, Host};
use crate::interpreter::{Interp, ParseStatus, ResultCode, Value};

/// Opaque handle to an interpreter session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterpHandle(pub u32);

/// Opaque handle to a value held by the embedder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueHandle(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbedError {
    #[error("unknown interpreter handle {0}")]
    UnknownInterp(u32),
    #[error("unknown value handle {0}")]
    UnknownValue(u32),
    #[error("handle table is full")]
    Exhausted,
}

pub type EmbedResult<T> = Result<T, EmbedError>;

/* ===================== Foreign Types ===================== */

/// Builds the native state of a new object from the `Type new` arguments
pub type Constructor = Rc<dyn Fn(&[Value]) -> Result<Box<dyn Any>, Value>>;
/// Runs one method on an object's native state
pub type Method = Rc<dyn Fn(&mut dyn Any, &[Value]) -> Result<Value, Value>>;
/// Receives the native state when the object is destroyed
pub type Destructor = Rc<dyn Fn(Box<dyn Any>)>;

/// A simple object type scripts can instantiate
///
/// `Type new ?arg ...?` constructs an object and answers the name of its
/// object command (`Type1`, `Type2`, ...). `obj method ?arg ...?` calls a
/// method by name; `obj destroy` runs the destructor and removes the
/// command.
#[derive(Clone)]
pub struct ForeignType {
    pub name: String,
    pub constructor: Constructor,
    pub methods: HashMap<String, Method>,
    pub destructor: Option<Destructor>,
}

impl ForeignType {
    pub fn new(name: impl Into<String>, constructor: Constructor) -> Self {
        ForeignType {
            name: name.into(),
            constructor,
            methods: HashMap::new(),
            destructor: None,
        }
    }

    pub fn method(mut self, name: impl Into<String>, method: Method) -> Self {
        self.methods.insert(name.into(), method);
        self
    }

    pub fn destructor(mut self, destructor: Destructor) -> Self {
        self.destructor = Some(destructor);
        self
    }

    /// Command implementing `Type new`
    fn class_command(self) -> ExtensionFn {
        let ty = Rc::new(self);
        let counter = Rc::new(Cell::new(0u32));
        Rc::new(move |host: &mut dyn Host, args: &[Value]| -> Result<Value, Value> {
            match args.get(1) {
                Some(sub) if sub.is("new") => {}
                _ => {
                    return Err(Value::from(format!(
                        "wrong # args: should be \"{} new ?arg ...?\"",
                        ty.name
                    )))
                }
            }
            let state = (ty.constructor)(&args[2..])?;
            counter.set(counter.get() + 1);
            let name = format!("{}{}", ty.name, counter.get());
            debug!(object = %name, "construct foreign object");
            host.register_extension(name.as_bytes(), object_command(Rc::clone(&ty), state));
            Ok(Value::from(name))
        })
    }
}

/// Command for one live object
fn object_command(ty: Rc<ForeignType>, state: Box<dyn Any>) -> ExtensionFn {
    let state: Rc<RefCell<Option<Box<dyn Any>>>> = Rc::new(RefCell::new(Some(state)));
    Rc::new(move |host: &mut dyn Host, args: &[Value]| -> Result<Value, Value> {
        let Some(method) = args.get(1) else {
            return Err(Value::from(format!(
                "wrong # args: should be \"{} method ?arg ...?\"",
                args[0]
            )));
        };

        if method.is("destroy") {
            let taken = state.borrow_mut().take();
            if let (Some(state), Some(destructor)) = (taken, &ty.destructor) {
                destructor(state);
            }
            debug!(object = %args[0], "destroy foreign object");
            host.remove_command(args[0].as_bytes());
            return Ok(Value::empty());
        }

        let Some(func) = ty.methods.get(&*method.to_str_lossy()) else {
            let mut known: Vec<&str> = ty.methods.keys().map(String::as_str).collect();
            known.push("destroy");
            known.sort_unstable();
            return Err(Value::from(format!(
                "unknown method \"{}\": must be {}",
                method,
                known.join(", ")
            )));
        };
        let mut slot = state.borrow_mut();
        let Some(object) = slot.as_mut() else {
            return Err(Value::from(format!("object \"{}\" was destroyed", args[0])));
        };
        func(object.as_mut(), &args[2..])
    })
}

/* ===================== Embedder ===================== */

/// Owner of every session and value handed across the boundary
#[derive(Default)]
pub struct Embedder {
    config: Config,
    interps: Vec<Option<Interp>>,
    values: Vec<Option<Value>>,
    free_values: Vec<u32>,
}

impl Embedder {
    pub fn new() -> Self {
        Embedder::default()
    }

    /// Embedder whose sessions take their limits from `config`
    pub fn with_config(config: Config) -> Self {
        Embedder {
            config,
            ..Embedder::default()
        }
    }

    /* ----- sessions ----- */

    /// Create a session, optionally recording the session it was made under
    pub fn create(&mut self, parent: Option<InterpHandle>) -> EmbedResult<InterpHandle> {
        if let Some(parent) = parent {
            self.interp(parent)?;
        }
        let mut interp = Interp::with_config(&self.config);
        interp.set_parent(parent.map(|p| p.0));
        let id = u32::try_from(self.interps.len()).map_err(|_| EmbedError::Exhausted)?;
        self.interps.push(Some(interp));
        debug!(interp = id, parent = ?parent.map(|p| p.0), "create session");
        Ok(InterpHandle(id))
    }

    pub fn delete(&mut self, handle: InterpHandle) -> EmbedResult<()> {
        let slot = self
            .interps
            .get_mut(handle.0 as usize)
            .ok_or(EmbedError::UnknownInterp(handle.0))?;
        if slot.take().is_none() {
            return Err(EmbedError::UnknownInterp(handle.0));
        }
        debug!(interp = handle.0, "delete session");
        Ok(())
    }

    pub fn interp(&self, handle: InterpHandle) -> EmbedResult<&Interp> {
        self.interps
            .get(handle.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(EmbedError::UnknownInterp(handle.0))
    }

    pub fn interp_mut(&mut self, handle: InterpHandle) -> EmbedResult<&mut Interp> {
        self.interps
            .get_mut(handle.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(EmbedError::UnknownInterp(handle.0))
    }

    /* ----- values ----- */

    /// Hold `bytes` as a value and hand out its handle
    pub fn string(&mut self, bytes: &[u8]) -> EmbedResult<ValueHandle> {
        self.hold(Value::from(bytes))
    }

    pub fn bytes(&self, handle: ValueHandle) -> EmbedResult<&[u8]> {
        self.value(handle).map(Value::as_bytes)
    }

    pub fn value(&self, handle: ValueHandle) -> EmbedResult<&Value> {
        self.values
            .get(handle.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(EmbedError::UnknownValue(handle.0))
    }

    /// Drop the embedder's reference; the handle may be reused afterwards
    pub fn release(&mut self, handle: ValueHandle) -> EmbedResult<()> {
        let slot = self
            .values
            .get_mut(handle.0 as usize)
            .ok_or(EmbedError::UnknownValue(handle.0))?;
        if slot.take().is_none() {
            return Err(EmbedError::UnknownValue(handle.0));
        }
        self.free_values.push(handle.0);
        Ok(())
    }

    fn hold(&mut self, value: Value) -> EmbedResult<ValueHandle> {
        if let Some(id) = self.free_values.pop() {
            self.values[id as usize] = Some(value);
            return Ok(ValueHandle(id));
        }
        let id = u32::try_from(self.values.len()).map_err(|_| EmbedError::Exhausted)?;
        self.values.push(Some(value));
        Ok(ValueHandle(id))
    }

    /* ----- evaluation ----- */

    /// Classify `source` without running anything
    pub fn parse(&self, handle: InterpHandle, source: &[u8]) -> EmbedResult<ParseStatus> {
        Ok(self.interp(handle)?.parse(source))
    }

    /// Parse and run `source`; the result is handed back as a new value
    pub fn eval(
        &mut self,
        handle: InterpHandle,
        source: &[u8],
    ) -> EmbedResult<(ResultCode, ValueHandle)> {
        let interp = self.interp_mut(handle)?;
        let code = interp.eval(source);
        let result = interp.result().clone();
        Ok((code, self.hold(result)?))
    }

    /// Run one command whose words are already values; nothing is re-parsed
    pub fn call(
        &mut self,
        handle: InterpHandle,
        words: &[ValueHandle],
    ) -> EmbedResult<(ResultCode, ValueHandle)> {
        let words = words
            .iter()
            .map(|w| self.value(*w).cloned())
            .collect::<EmbedResult<Vec<Value>>>()?;
        let interp = self.interp_mut(handle)?;
        let code = interp.call(&words);
        let result = interp.result().clone();
        Ok((code, self.hold(result)?))
    }

    /* ----- extension ----- */

    pub fn register_command(
        &mut self,
        handle: InterpHandle,
        name: &str,
        func: ExtensionFn,
    ) -> EmbedResult<()> {
        self.interp_mut(handle)?.register_command(name, func);
        Ok(())
    }

    /// Make `ty` available as the command `ty.name`
    pub fn register_type(&mut self, handle: InterpHandle, ty: ForeignType) -> EmbedResult<()> {
        let name = ty.name.clone();
        self.interp_mut(handle)?
            .register_command(&name, ty.class_command());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    fn text(embedder: &Embedder, handle: ValueHandle) -> String {
        String::from_utf8_lossy(embedder.bytes(handle).unwrap()).into_owned()
    }

    #[test]
    fn test_eval_returns_code_and_result_handle() {
        let mut embedder = Embedder::new();
        let interp = embedder.create(None).unwrap();
        let (code, result) = embedder.eval(interp, b"set x [expr {6 * 7}]").unwrap();
        assert_eq!(code, ResultCode::Ok);
        assert_eq!(text(&embedder, result), "42");

        let (code, result) = embedder.eval(interp, b"nosuch").unwrap();
        assert_eq!(code, ResultCode::Error);
        assert_eq!(text(&embedder, result), "invalid command name \"nosuch\"");
    }

    #[test]
    fn test_parse_has_no_side_effects() {
        let mut embedder = Embedder::new();
        let interp = embedder.create(None).unwrap();
        assert_eq!(embedder.parse(interp, b"set a 1").unwrap(), ParseStatus::Complete);
        assert_eq!(embedder.parse(interp, b"if {1 {").unwrap(), ParseStatus::Incomplete);
        assert!(embedder.interp(interp).unwrap().var_get("a").is_none());
    }

    #[test]
    fn test_call_does_not_requote() {
        let mut embedder = Embedder::new();
        let interp = embedder.create(None).unwrap();
        let words = [
            embedder.string(b"set").unwrap(),
            embedder.string(b"v").unwrap(),
            embedder.string(b"{unbalanced [x] $y").unwrap(),
        ];
        let (code, result) = embedder.call(interp, &words).unwrap();
        assert_eq!(code, ResultCode::Ok);
        assert_eq!(text(&embedder, result), "{unbalanced [x] $y");
    }

    #[test]
    fn test_sessions_are_independent_and_record_parents() {
        let mut embedder = Embedder::new();
        let a = embedder.create(None).unwrap();
        let b = embedder.create(Some(a)).unwrap();
        assert_eq!(embedder.interp(b).unwrap().parent(), Some(a.0));
        assert_eq!(embedder.interp(a).unwrap().parent(), None);

        embedder.eval(a, b"set only_a 1").unwrap();
        let (code, _) = embedder.eval(b, b"set only_a").unwrap();
        assert_eq!(code, ResultCode::Error);

        embedder.delete(a).unwrap();
        assert_eq!(embedder.eval(a, b"set x 1"), Err(EmbedError::UnknownInterp(a.0)));
        assert_eq!(embedder.delete(a), Err(EmbedError::UnknownInterp(a.0)));
        assert_eq!(
            embedder.create(Some(InterpHandle(99))),
            Err(EmbedError::UnknownInterp(99))
        );
    }

    #[test]
    fn test_value_handles_are_released_and_reused() {
        let mut embedder = Embedder::new();
        let first = embedder.string(b"one").unwrap();
        embedder.release(first).unwrap();
        assert_eq!(embedder.bytes(first), Err(EmbedError::UnknownValue(first.0)));
        assert_eq!(embedder.release(first), Err(EmbedError::UnknownValue(first.0)));
        let second = embedder.string(b"two").unwrap();
        assert_eq!(second, first);
        assert_eq!(text(&embedder, second), "two");
    }

    #[test]
    fn test_registered_command() {
        let mut embedder = Embedder::new();
        let interp = embedder.create(None).unwrap();
        let shout: ExtensionFn = Rc::new(|_host: &mut dyn Host, args: &[Value]| -> Result<Value, Value> {
            Ok(Value::from(args[1..].iter().map(|a| a.to_str_lossy().to_uppercase()).collect::<Vec<_>>().join(" ")))
        });
        embedder.register_command(interp, "shout", shout).unwrap();
        let (_, result) = embedder.eval(interp, b"shout hello world").unwrap();
        assert_eq!(text(&embedder, result), "HELLO WORLD");
    }

    struct Counter {
        count: i64,
    }

    fn counter_type(destroyed: Rc<Cell<i64>>) -> ForeignType {
        let constructor: Constructor = Rc::new(|args: &[Value]| -> Result<Box<dyn Any>, Value> {
            let start = args
                .first()
                .map(|v| v.to_str_lossy().parse::<i64>().map_err(|_| Value::from("bad start")))
                .transpose()?
                .unwrap_or(0);
            Ok(Box::new(Counter { count: start }))
        });
        let methods: HashMap<String, Method> = hashmap! {
            "incr".to_string() => Rc::new(|state: &mut dyn Any, _args: &[Value]| -> Result<Value, Value> {
                let counter = state.downcast_mut::<Counter>().ok_or_else(|| Value::from("not a counter"))?;
                counter.count += 1;
                Ok(Value::from(counter.count))
            }) as Method,
            "get".to_string() => Rc::new(|state: &mut dyn Any, _args: &[Value]| -> Result<Value, Value> {
                let counter = state.downcast_mut::<Counter>().ok_or_else(|| Value::from("not a counter"))?;
                Ok(Value::from(counter.count))
            }) as Method,
        };
        let destructor: Destructor = Rc::new(move |state: Box<dyn Any>| {
            if let Ok(counter) = state.downcast::<Counter>() {
                destroyed.set(counter.count);
            }
        });
        ForeignType {
            name: "Counter".to_string(),
            constructor,
            methods,
            destructor: Some(destructor),
        }
    }

    #[test]
    fn test_foreign_type_lifecycle() {
        let mut embedder = Embedder::new();
        let interp = embedder.create(None).unwrap();
        let destroyed = Rc::new(Cell::new(-1));
        embedder
            .register_type(interp, counter_type(Rc::clone(&destroyed)))
            .unwrap();

        let script = b"set c [Counter new 10]; $c incr; $c incr; $c get";
        let (code, result) = embedder.eval(interp, script).unwrap();
        assert_eq!(code, ResultCode::Ok, "{}", text(&embedder, result));
        assert_eq!(text(&embedder, result), "12");

        let (_, name) = embedder.eval(interp, b"set c").unwrap();
        assert_eq!(text(&embedder, name), "Counter1");
        let (_, second) = embedder.eval(interp, b"Counter new").unwrap();
        assert_eq!(text(&embedder, second), "Counter2");

        let (code, result) = embedder.eval(interp, b"$c frob").unwrap();
        assert_eq!(code, ResultCode::Error);
        assert_eq!(
            text(&embedder, result),
            "unknown method \"frob\": must be destroy, get, incr"
        );

        let (code, _) = embedder.eval(interp, b"$c destroy").unwrap();
        assert_eq!(code, ResultCode::Ok);
        assert_eq!(destroyed.get(), 12);
        let (code, result) = embedder.eval(interp, b"$c get").unwrap();
        assert_eq!(code, ResultCode::Error);
        assert_eq!(text(&embedder, result), "invalid command name \"Counter1\"");
    }
}
