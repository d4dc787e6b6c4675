//! Control structures
//!
//! Bodies are never run from here. Each command returns
//! `Completion::Eval` with the next script to run and a [`Resume`] carrying
//! whatever it needs to pick up afterwards, so a `yield` anywhere inside a
//! loop body suspends the whole evaluation cleanly.

use super::expr::condition;
use super::{arity, list_error, wrong_args};
use crate::interpreter::executor::errors::{ErrorInfo, BAD_VALUE};
use crate::interpreter::executor::types::{Completion, Exception, Resume, Value};
use crate::interpreter::session::Interp;

fn eval_then(script: &Value, builtin: &str, state: Vec<Value>) -> Result<Completion, Exception> {
    Ok(Completion::Eval {
        script: script.clone(),
        resume: Resume::new(builtin, state),
    })
}

/// Continuation that simply adopts the script's outcome
pub fn pass_through(
    _interp: &mut Interp,
    _state: Vec<Value>,
    outcome: Result<Value, Exception>,
) -> Result<Completion, Exception> {
    outcome.map(Completion::Value)
}

/* ===================== if ===================== */

/// `if expr1 ?then? body1 elseif expr2 ?then? body2 ... ?else? ?bodyN?`
pub fn if_(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    const USAGE: &str = "expr1 ?then? body1 elseif expr2 ?then? body2 elseif ... ?else? ?bodyN?";
    let mut i = 1;
    loop {
        let Some(test) = args.get(i) else {
            return Err(wrong_args(args, USAGE).into());
        };
        i += 1;
        if args.get(i).is_some_and(|w| w.is("then")) {
            i += 1;
        }
        let Some(body) = args.get(i) else {
            return Err(wrong_args(args, USAGE).into());
        };
        i += 1;

        if condition(interp, test)? {
            return eval_then(body, "if", Vec::new());
        }

        match args.get(i) {
            None => return Ok(Value::empty().into()),
            Some(word) if word.is("elseif") => i += 1,
            Some(word) => {
                if word.is("else") {
                    i += 1;
                }
                return match (args.get(i), args.len() == i + 1) {
                    (Some(body), true) => eval_then(body, "if", Vec::new()),
                    _ => Err(wrong_args(args, USAGE).into()),
                };
            }
        }
    }
}

/* ===================== while ===================== */

/// `while test body`
pub fn while_(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 2, 2, "test command")?;
    let (test, body) = (&args[1], &args[2]);
    if condition(interp, test)? {
        eval_then(body, "while", vec![test.clone(), body.clone()])
    } else {
        Ok(Value::empty().into())
    }
}

pub fn while_resume(
    interp: &mut Interp,
    state: Vec<Value>,
    outcome: Result<Value, Exception>,
) -> Result<Completion, Exception> {
    match outcome {
        Ok(_) | Err(Exception::Continue) => {}
        Err(Exception::Break) => return Ok(Value::empty().into()),
        Err(other) => return Err(other),
    }
    let [test, body] = state.as_slice() else {
        return Err(bad_state("while"));
    };
    if condition(interp, test)? {
        eval_then(body, "while", state.clone())
    } else {
        Ok(Value::empty().into())
    }
}

/* ===================== for ===================== */

const FOR_START: &str = "start";
const FOR_BODY: &str = "body";
const FOR_NEXT: &str = "next";

/// `for start test next body`
pub fn for_(_interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 4, 4, "start test next command")?;
    let state = vec![
        args[2].clone(),
        args[3].clone(),
        args[4].clone(),
        Value::from(FOR_START),
    ];
    eval_then(&args[1], "for", state)
}

/// State: `[test, next, body, phase]` where phase names the script that
/// just finished
pub fn for_resume(
    interp: &mut Interp,
    mut state: Vec<Value>,
    outcome: Result<Value, Exception>,
) -> Result<Completion, Exception> {
    let [test, next, body, phase] = state.as_slice() else {
        return Err(bad_state("for"));
    };
    let (test, next, body) = (test.clone(), next.clone(), body.clone());

    let run_next = if phase.is(FOR_BODY) {
        match outcome {
            Ok(_) | Err(Exception::Continue) => true,
            Err(Exception::Break) => return Ok(Value::empty().into()),
            Err(other) => return Err(other),
        }
    } else {
        outcome?;
        false
    };

    if run_next {
        state[3] = Value::from(FOR_NEXT);
        return eval_then(&next, "for", state);
    }
    if condition(interp, &test)? {
        state[3] = Value::from(FOR_BODY);
        eval_then(&body, "for", state)
    } else {
        Ok(Value::empty().into())
    }
}

/* ===================== foreach ===================== */

/// Loop state flattened into values so it survives serialization:
/// `[body, iteration, (varCount, vars..., itemCount, items...)...]`
struct Foreach {
    body: Value,
    iteration: usize,
    pairs: Vec<(Vec<Value>, Vec<Value>)>,
}

impl Foreach {
    fn iterations(&self) -> usize {
        self.pairs
            .iter()
            .map(|(vars, items)| items.len().div_ceil(vars.len()))
            .max()
            .unwrap_or(0)
    }

    /// Bind the loop variables for the current iteration
    fn assign(&self, interp: &mut Interp) {
        for (vars, items) in &self.pairs {
            for (j, var) in vars.iter().enumerate() {
                let value = items
                    .get(self.iteration * vars.len() + j)
                    .cloned()
                    .unwrap_or_default();
                interp.write_var(var.as_bytes(), value);
            }
        }
    }

    fn to_state(&self) -> Vec<Value> {
        let mut state = vec![self.body.clone(), Value::from(self.iteration)];
        for (vars, items) in &self.pairs {
            state.push(Value::from(vars.len()));
            state.extend(vars.iter().cloned());
            state.push(Value::from(items.len()));
            state.extend(items.iter().cloned());
        }
        state
    }

    fn from_state(state: Vec<Value>) -> Option<Self> {
        let mut it = state.into_iter();
        let body = it.next()?;
        let iteration = count(&it.next()?)?;
        let mut pairs = Vec::new();
        while let Some(n) = it.next() {
            let vars: Vec<Value> = it.by_ref().take(count(&n)?).collect();
            let items_len = count(&it.next()?)?;
            let items: Vec<Value> = it.by_ref().take(items_len).collect();
            pairs.push((vars, items));
        }
        Some(Foreach {
            body,
            iteration,
            pairs,
        })
    }

    /// Run the body for the current iteration, or finish
    fn step(self, interp: &mut Interp) -> Result<Completion, Exception> {
        if self.iteration >= self.iterations() {
            return Ok(Value::empty().into());
        }
        self.assign(interp);
        eval_then(&self.body, "foreach", self.to_state())
    }
}

fn count(value: &Value) -> Option<usize> {
    super::parse_int(value.as_bytes()).and_then(|n| usize::try_from(n).ok())
}

/// `foreach varList list ?varList list ...? command`
pub fn foreach(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    if args.len() < 4 || args.len() % 2 != 0 {
        return Err(wrong_args(args, "varList list ?varList list ...? command").into());
    }
    let mut pairs = Vec::new();
    for pair in args[1..args.len() - 1].chunks(2) {
        let vars = interp.host.list_elements(&pair[0]).map_err(list_error)?;
        if vars.is_empty() {
            return Err(ErrorInfo::new(BAD_VALUE, "foreach varlist is empty").into());
        }
        let items = interp.host.list_elements(&pair[1]).map_err(list_error)?;
        pairs.push((vars, items));
    }
    Foreach {
        body: args[args.len() - 1].clone(),
        iteration: 0,
        pairs,
    }
    .step(interp)
}

pub fn foreach_resume(
    interp: &mut Interp,
    state: Vec<Value>,
    outcome: Result<Value, Exception>,
) -> Result<Completion, Exception> {
    match outcome {
        Ok(_) | Err(Exception::Continue) => {}
        Err(Exception::Break) => return Ok(Value::empty().into()),
        Err(other) => return Err(other),
    }
    let Some(mut lp) = Foreach::from_state(state) else {
        return Err(bad_state("foreach"));
    };
    lp.iteration += 1;
    lp.step(interp)
}

/* ===================== catch ===================== */

/// `catch script ?resultVarName? ?optionsVarName?`
pub fn catch(_interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 1, 3, "script ?resultVarName? ?optionVarName?")?;
    eval_then(&args[1], "catch", args[2..].to_vec())
}

pub fn catch_resume(
    interp: &mut Interp,
    state: Vec<Value>,
    outcome: Result<Value, Exception>,
) -> Result<Completion, Exception> {
    let mut options = Vec::new();
    let (code, value) = match outcome {
        Ok(value) => (0, value),
        Err(Exception::Error(err)) => {
            let info = Value::from(err.error_info());
            let code = Value::from(err.code.as_str());
            let global = interp.global.scope;
            interp.host.var_set(global, b"errorInfo", info.clone());
            interp.host.var_set(global, b"errorCode", code.clone());
            options.extend([Value::from("-errorinfo"), info, Value::from("-errorcode"), code]);
            (1, err.message)
        }
        Err(Exception::Return(value)) => (2, value),
        Err(Exception::Break) => (3, Value::empty()),
        Err(Exception::Continue) => (4, Value::empty()),
    };

    if let Some(var) = state.first() {
        interp.write_var(var.as_bytes(), value);
    }
    if let Some(var) = state.get(1) {
        let mut dict = vec![
            Value::from("-code"),
            Value::from(code as i64),
            Value::from("-level"),
            Value::from("0"),
        ];
        dict.extend(options);
        let dict = interp.host.list_new(&dict);
        interp.write_var(var.as_bytes(), dict);
    }
    Ok(Value::from(code as i64).into())
}

/* ===================== eval / break / continue ===================== */

/// `eval arg ?arg ...?`
pub fn eval(_interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 1, usize::MAX, "arg ?arg ...?")?;
    let script = match &args[1..] {
        [only] => only.clone(),
        many => super::lists::concat_values(many),
    };
    eval_then(&script, "eval", Vec::new())
}

pub fn break_(_interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 0, 0, "")?;
    Err(Exception::Break)
}

pub fn continue_(_interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 0, 0, "")?;
    Err(Exception::Continue)
}

fn bad_state(builtin: &str) -> Exception {
    ErrorInfo::internal(format!(
        "corrupt continuation state for \"{}\"",
        builtin
    ))
    .into()
}
