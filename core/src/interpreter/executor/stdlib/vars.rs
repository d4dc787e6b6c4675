//! Variable commands: set, unset, append, incr, global, upvar

use super::{arity, expect_int, wrong_args};
use crate::interpreter::executor::errors::{ErrorInfo, ARITHMETIC, BAD_VALUE, NO_SUCH_VARIABLE};
use crate::interpreter::executor::types::{Completion, Exception, Value};
use crate::interpreter::host::ScopeId;
use crate::interpreter::session::Interp;

/// `set varName ?newValue?`
pub fn set(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 1, 2, "varName ?newValue?")?;
    match args.get(2) {
        Some(value) => {
            interp.write_var(args[1].as_bytes(), value.clone());
            Ok(value.clone().into())
        }
        None => Ok(interp.read_var(args[1].as_bytes())?.into()),
    }
}

/// `unset ?-nocomplain? ?--? ?varName ...?`
pub fn unset(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    let mut names = &args[1..];
    let mut complain = true;
    if names.first().is_some_and(|a| a.is("-nocomplain")) {
        complain = false;
        names = &names[1..];
    }
    if names.first().is_some_and(|a| a.is("--")) {
        names = &names[1..];
    }

    for name in names {
        let (scope, plain) = interp.target(name.as_bytes());
        if !interp.host.var_unset(scope, plain) && complain {
            return Err(ErrorInfo::new(
                format!("{} {}", NO_SUCH_VARIABLE, name),
                format!("can't unset \"{}\": no such variable", name),
            )
            .into());
        }
    }
    Ok(Value::empty().into())
}

/// `append varName ?value ...?`
pub fn append(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 1, usize::MAX, "varName ?value ...?")?;
    let name = args[1].as_bytes();
    let mut bytes = match interp.read_var(name) {
        Ok(existing) => existing.as_bytes().to_vec(),
        Err(_) => Vec::new(),
    };
    for value in &args[2..] {
        bytes.extend_from_slice(value.as_bytes());
    }
    let value = Value::from(bytes);
    interp.write_var(name, value.clone());
    Ok(value.into())
}

/// `incr varName ?increment?`
///
/// An unset variable counts as zero.
pub fn incr(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 1, 2, "varName ?increment?")?;
    let name = args[1].as_bytes();
    let by = match args.get(2) {
        Some(step) => expect_int(step)?,
        None => 1,
    };
    let current = match interp.read_var(name) {
        Ok(value) => expect_int(&value)?,
        Err(_) => 0,
    };
    let sum = current
        .checked_add(by)
        .ok_or_else(|| ErrorInfo::new(ARITHMETIC, "integer overflow"))?;
    let value = Value::from(sum);
    interp.write_var(name, value.clone());
    Ok(value.into())
}

/// `global ?varName ...?`
pub fn global(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    let scope = interp.scope();
    let global = interp.global.scope;
    if scope == global {
        return Ok(Value::empty().into());
    }
    for name in &args[1..] {
        let full = name.as_bytes();
        let full = full.strip_prefix(b"::").unwrap_or(full);
        // The local alias is the last namespace component
        let local = match full.windows(2).rposition(|w| w == b"::") {
            Some(at) => &full[at + 2..],
            None => full,
        };
        interp.host.var_link(scope, local, global, full);
    }
    Ok(Value::empty().into())
}

/// `upvar ?level? otherVar myVar ?otherVar myVar ...?`
pub fn upvar(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    const USAGE: &str = "?level? otherVar localVar ?otherVar localVar ...?";
    let rest = &args[1..];
    // An odd count means the first word is the level
    let (level, pairs) = match rest.len() {
        0 => return Err(wrong_args(args, USAGE).into()),
        n if n % 2 == 1 => (Some(&rest[0]), &rest[1..]),
        _ => (None, rest),
    };
    if pairs.is_empty() {
        return Err(wrong_args(args, USAGE).into());
    }

    let target = resolve_level(interp, level)?;
    let scope = interp.scope();
    for pair in pairs.chunks(2) {
        interp
            .host
            .var_link(scope, pair[1].as_bytes(), target, pair[0].as_bytes());
    }
    Ok(Value::empty().into())
}

/// Scope of the frame named by an `upvar` level (`N` up, or `#N` absolute)
fn resolve_level(
    interp: &Interp,
    level: Option<&Value>,
) -> Result<ScopeId, ErrorInfo> {
    let bad = |v: &Value| ErrorInfo::new(BAD_VALUE, format!("bad level \"{}\"", v));
    let current = interp.current().level;
    let absolute = match level {
        None => current.checked_sub(1),
        Some(v) => match v.as_bytes().strip_prefix(b"#") {
            Some(n) => super::parse_int(n).and_then(|n| usize::try_from(n).ok()),
            None => super::parse_int(v.as_bytes())
                .and_then(|n| usize::try_from(n).ok())
                .and_then(|n| current.checked_sub(n)),
        },
    };
    let frame = absolute.and_then(|l| interp.frame_at(l));
    match (frame, level) {
        (Some(frame), _) => Ok(frame.scope),
        (None, Some(v)) => Err(bad(v)),
        (None, None) => Err(bad(&Value::from("1"))),
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::executor::types::ResultCode;
    use crate::interpreter::session::Interp;

    fn eval_ok(interp: &mut Interp, script: &str) -> String {
        let code = interp.eval(script);
        assert_eq!(code, ResultCode::Ok, "{}: {}", script, interp.result());
        interp.result().to_string()
    }

    #[test]
    fn test_set_reads_and_writes() {
        let mut interp = Interp::new();
        assert_eq!(eval_ok(&mut interp, "set a 5"), "5");
        assert_eq!(eval_ok(&mut interp, "set a"), "5");
        assert_eq!(interp.eval("set nope"), ResultCode::Error);
        assert_eq!(interp.result().to_string(), "can't read \"nope\": no such variable");
    }

    #[test]
    fn test_unset() {
        let mut interp = Interp::new();
        eval_ok(&mut interp, "set a 1; unset a");
        assert!(interp.var_get("a").is_none());
        assert_eq!(interp.eval("unset a"), ResultCode::Error);
        assert_eq!(interp.result().to_string(), "can't unset \"a\": no such variable");
        eval_ok(&mut interp, "unset -nocomplain a");
    }

    #[test]
    fn test_append_and_incr() {
        let mut interp = Interp::new();
        assert_eq!(eval_ok(&mut interp, "append s ab cd; append s e"), "abcde");
        assert_eq!(eval_ok(&mut interp, "incr n"), "1");
        assert_eq!(eval_ok(&mut interp, "incr n 10"), "11");
        assert_eq!(eval_ok(&mut interp, "incr n -20"), "-9");

        assert_eq!(interp.eval("set s x; incr s"), ResultCode::Error);
        assert_eq!(interp.result().to_string(), "expected integer but got \"x\"");

        assert_eq!(interp.eval("set big 9223372036854775807; incr big"), ResultCode::Error);
        assert_eq!(interp.result().to_string(), "integer overflow");
    }

    #[test]
    fn test_global_links_into_the_global_scope() {
        let mut interp = Interp::new();
        eval_ok(&mut interp, "set counter 0");
        eval_ok(&mut interp, "proc bump {} { global counter; incr counter }");
        eval_ok(&mut interp, "bump; bump");
        assert_eq!(interp.var_get("counter"), Some("2".into()));
    }

    #[test]
    fn test_upvar_aliases_the_callers_variable() {
        let mut interp = Interp::new();
        eval_ok(
            &mut interp,
            "proc setter {name value} { upvar $name v; set v $value }
             proc outer {} { setter local 42; return $local }",
        );
        assert_eq!(eval_ok(&mut interp, "outer"), "42");
        eval_ok(&mut interp, "proc top {} { upvar #0 g x; set x 7 }; top");
        assert_eq!(interp.var_get("g"), Some("7".into()));
    }

    #[test]
    fn test_upvar_at_global_level_is_a_bad_level() {
        let mut interp = Interp::new();
        assert_eq!(interp.eval("upvar a b"), ResultCode::Error);
        assert_eq!(interp.result().to_string(), "bad level \"1\"");
    }

    #[test]
    fn test_global_prefix_reaches_global_variables() {
        let mut interp = Interp::new();
        eval_ok(&mut interp, "proc f {} { set ::shared here }; f");
        assert_eq!(eval_ok(&mut interp, "set shared"), "here");
    }
}
