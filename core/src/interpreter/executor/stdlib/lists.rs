//! List commands: list, llength, lindex, lappend, concat, join
//!
//! List representation belongs to the host; these commands only ever go
//! through its list operations.

use super::{arity, list_error, parse_index};
use crate::interpreter::executor::types::{Completion, Exception, Value};
use crate::interpreter::scanner::is_space;
use crate::interpreter::session::Interp;

/// `list ?arg ...?`
pub fn list(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    Ok(interp.host.list_new(&args[1..]).into())
}

/// `llength list`
pub fn llength(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 1, 1, "list")?;
    let len = interp.host.list_length(&args[1]).map_err(list_error)?;
    Ok(Value::from(len).into())
}

/// `lindex list ?index ...?`
///
/// Several indices (or one index that is itself a list) descend into
/// nested lists; an index out of range gives the empty string.
pub fn lindex(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 1, usize::MAX, "list ?index ...?")?;
    let mut indices = Vec::new();
    match &args[2..] {
        [single] => indices.extend(interp.host.list_elements(single).map_err(list_error)?),
        many => indices.extend(many.iter().cloned()),
    }

    let mut current = args[1].clone();
    for index in &indices {
        let len = interp.host.list_length(&current).map_err(list_error)?;
        let at = parse_index(index, len)?;
        let item = match usize::try_from(at) {
            Ok(at) => interp.host.list_index(&current, at).map_err(list_error)?,
            Err(_) => None,
        };
        match item {
            Some(item) => current = item,
            None => return Ok(Value::empty().into()),
        }
    }
    Ok(current.into())
}

/// `lappend varName ?value ...?`
pub fn lappend(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 1, usize::MAX, "varName ?value ...?")?;
    let name = args[1].as_bytes();
    let mut items = match interp.read_var(name) {
        Ok(existing) => interp.host.list_elements(&existing).map_err(list_error)?,
        Err(_) => Vec::new(),
    };
    items.extend(args[2..].iter().cloned());
    let list = interp.host.list_new(&items);
    interp.write_var(name, list.clone());
    Ok(list.into())
}

/// `concat ?arg ...?`
pub fn concat(_interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    Ok(concat_values(&args[1..]).into())
}

/// Trim each value and join the non-empty ones with single spaces
pub(crate) fn concat_values(values: &[Value]) -> Value {
    let mut out = Vec::new();
    for value in values {
        let bytes = value.as_bytes();
        let start = bytes.iter().position(|&b| !is_space(b));
        let end = bytes.iter().rposition(|&b| !is_space(b));
        let (Some(start), Some(end)) = (start, end) else {
            continue;
        };
        if !out.is_empty() {
            out.push(b' ');
        }
        out.extend_from_slice(&bytes[start..=end]);
    }
    Value::from(out)
}

/// `join list ?joinString?`
pub fn join(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 1, 2, "list ?joinString?")?;
    let items = interp.host.list_elements(&args[1]).map_err(list_error)?;
    let sep = args.get(2).map(|s| s.as_bytes()).unwrap_or(b" ");
    let mut out = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(sep);
        }
        out.extend_from_slice(item.as_bytes());
    }
    Ok(Value::from(out).into())
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
    fn test_list_quotes_its_elements() {
        let mut interp = Interp::new();
        assert_eq!(eval_ok(&mut interp, "list a {b c} {}"), "a {b c} {}");
        assert_eq!(eval_ok(&mut interp, "llength [list a {b c} {}]"), "3");
    }

    #[test]
    fn test_lindex() {
        let mut interp = Interp::new();
        assert_eq!(eval_ok(&mut interp, "lindex {a b c} 1"), "b");
        assert_eq!(eval_ok(&mut interp, "lindex {a b c} end"), "c");
        assert_eq!(eval_ok(&mut interp, "lindex {a b c} 5"), "");
        assert_eq!(eval_ok(&mut interp, "lindex {a b c} -1"), "");
        assert_eq!(eval_ok(&mut interp, "lindex {a {b {c d}}} 1 1 0"), "c");
        assert_eq!(eval_ok(&mut interp, "lindex {a {b {c d}}} {1 1 1}"), "d");
        assert_eq!(eval_ok(&mut interp, "lindex {a b}"), "a b");
    }

    #[test]
    fn test_lappend_builds_a_list_variable() {
        let mut interp = Interp::new();
        eval_ok(&mut interp, "lappend l a; lappend l {b c} d");
        assert_eq!(interp.var_get("l"), Some("a {b c} d".into()));
        assert_eq!(eval_ok(&mut interp, "llength $l"), "3");
    }

    #[test]
    fn test_concat_and_join() {
        let mut interp = Interp::new();
        assert_eq!(eval_ok(&mut interp, "concat { a b } {} c"), "a b c");
        assert_eq!(eval_ok(&mut interp, "join {a b c} ,"), "a,b,c");
        assert_eq!(eval_ok(&mut interp, "join {a {b c}}"), "a b c");
    }

    #[test]
    fn test_malformed_list() {
        let mut interp = Interp::new();
        assert_eq!(interp.eval("llength {a {b}c}"), ResultCode::Error);
        assert_eq!(
            interp.result().to_string(),
            "list element in braces followed by \"c\" instead of space"
        );
    }
}
