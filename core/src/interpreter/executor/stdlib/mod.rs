//! Builtin commands
//!
//! The builtins form a fixed table consulted before anything the host
//! defines, so scripts cannot shadow them. A builtin either answers straight
//! away or hands the engine a script to run together with a [`Resume`]
//! naming the function that picks up the outcome.

pub mod control;
pub mod coroutine;
pub mod expr;
pub mod info;
pub mod io;
pub mod lists;
pub mod namespace;
pub mod procs;
pub mod strings;
pub mod vars;

use super::errors::{ErrorInfo, BAD_VALUE};
use super::types::{Completion, Exception, Resume, Value};
use crate::interpreter::session::Interp;

/* ===================== Builtin Table ===================== */

pub type BuiltinFn = fn(&mut Interp, &[Value]) -> Result<Completion, Exception>;

/// Receives the builtin's saved state and the outcome of the script it asked for
pub type ResumeFn =
    fn(&mut Interp, Vec<Value>, Result<Value, Exception>) -> Result<Completion, Exception>;

pub struct Builtin {
    pub name: &'static str,
    pub run: BuiltinFn,
    pub resume: Option<ResumeFn>,
}

const fn simple(name: &'static str, run: BuiltinFn) -> Builtin {
    Builtin {
        name,
        run,
        resume: None,
    }
}

const fn resumable(name: &'static str, run: BuiltinFn, resume: ResumeFn) -> Builtin {
    Builtin {
        name,
        run,
        resume: Some(resume),
    }
}

static BUILTINS: &[Builtin] = &[
    // variables
    simple("set", vars::set),
    simple("unset", vars::unset),
    simple("append", vars::append),
    simple("incr", vars::incr),
    simple("global", vars::global),
    simple("upvar", vars::upvar),
    // control flow
    resumable("if", control::if_, control::pass_through),
    resumable("while", control::while_, control::while_resume),
    resumable("for", control::for_, control::for_resume),
    resumable("foreach", control::foreach, control::foreach_resume),
    resumable("catch", control::catch, control::catch_resume),
    resumable("eval", control::eval, control::pass_through),
    simple("break", control::break_),
    simple("continue", control::continue_),
    // procedures
    simple("proc", procs::proc_),
    simple("apply", procs::apply),
    simple("return", procs::return_),
    simple("error", procs::error),
    // values
    simple("expr", expr::expr),
    simple("list", lists::list),
    simple("llength", lists::llength),
    simple("lindex", lists::lindex),
    simple("lappend", lists::lappend),
    simple("concat", lists::concat),
    simple("join", lists::join),
    simple("string", strings::string),
    // introspection and environment
    simple("info", info::info),
    simple("namespace", namespace::namespace),
    simple("puts", io::puts),
    // coroutines
    simple("coroutine", coroutine::coroutine),
    simple("yield", coroutine::yield_),
];

pub fn lookup(name: &[u8]) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name.as_bytes() == name)
}

/// Names of every builtin, in table order
pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|b| b.name)
}

/// Hand a finished script's outcome back to the builtin that asked for it
pub fn resume(
    interp: &mut Interp,
    resume: Resume,
    outcome: Result<Value, Exception>,
) -> Result<Completion, Exception> {
    let Some(func) = lookup(resume.builtin.as_bytes()).and_then(|b| b.resume) else {
        return Err(ErrorInfo::internal(format!(
            "no continuation for builtin \"{}\"",
            resume.builtin
        ))
        .into());
    };
    func(interp, resume.state, outcome)
}

/* ===================== Argument Helpers ===================== */

/// Check `args.len() - 1` lies in `min..=max`; `usage` excludes the command name
pub(crate) fn arity(args: &[Value], min: usize, max: usize, usage: &str) -> Result<(), ErrorInfo> {
    let n = args.len().saturating_sub(1);
    if n < min || n > max {
        return Err(wrong_args(args, usage));
    }
    Ok(())
}

pub(crate) fn wrong_args(args: &[Value], usage: &str) -> ErrorInfo {
    let name = args.first().map(|v| v.to_string()).unwrap_or_default();
    if usage.is_empty() {
        ErrorInfo::wrong_args(name)
    } else {
        ErrorInfo::wrong_args(format!("{} {}", name, usage))
    }
}

/// Host list failures surface as value errors
pub(crate) fn list_error(msg: Value) -> ErrorInfo {
    ErrorInfo::new(BAD_VALUE, msg)
}

/* ===================== Conversions ===================== */

/// Parse an integer literal (decimal, `0x`, `0o` or `0b`, optional sign)
///
/// Returns `None` for anything else, including values that overflow.
pub fn parse_int(bytes: &[u8]) -> Option<i64> {
    let text = std::str::from_utf8(bytes).ok()?.trim();
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (radix, digits) = match digits.get(..2) {
        Some("0x") | Some("0X") => (16, &digits[2..]),
        Some("0o") | Some("0O") => (8, &digits[2..]),
        Some("0b") | Some("0B") => (2, &digits[2..]),
        _ => (10, digits),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    let magnitude = u64::from_str_radix(digits, radix).ok()?;
    if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    }
}

pub(crate) fn expect_int(value: &Value) -> Result<i64, ErrorInfo> {
    parse_int(value.as_bytes()).ok_or_else(|| {
        ErrorInfo::new(
            BAD_VALUE,
            format!("expected integer but got \"{}\"", value),
        )
    })
}

/// Boolean spellings accepted by conditions (numbers count by zero-ness)
pub fn parse_bool(bytes: &[u8]) -> Option<bool> {
    let text = std::str::from_utf8(bytes).ok()?.trim();
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" => Some(false),
        _ => parse_int(text.as_bytes())
            .map(|n| n != 0)
            .or_else(|| text.parse::<f64>().ok().map(|f| f != 0.0)),
    }
}

/// Resolve `N`, `end`, `end-N` or `end+N` against a sequence of `len` items
///
/// The result may lie outside `0..len`; callers decide what that means.
pub(crate) fn parse_index(value: &Value, len: usize) -> Result<i64, ErrorInfo> {
    let bad = || {
        ErrorInfo::new(
            BAD_VALUE,
            format!(
                "bad index \"{}\": must be integer?[+-]integer? or end?[+-]integer?",
                value
            ),
        )
    };
    let bytes = value.as_bytes();
    let Some(rest) = bytes.strip_prefix(b"end") else {
        return parse_int(bytes).ok_or_else(bad);
    };
    let last = len as i64 - 1;
    match rest.first() {
        None => Ok(last),
        Some(b'-') | Some(b'+') => {
            let offset = parse_int(&rest[1..]).ok_or_else(bad)?;
            let signed = if rest[0] == b'-' {
                offset.checked_neg()
            } else {
                Some(offset)
            };
            signed.and_then(|o| last.checked_add(o)).ok_or_else(bad)
        }
        Some(_) => Err(bad()),
    }
}

/* ===================== Glob Matching ===================== */

/// Glob match with `*`, `?`, `[chars]`/`[a-z]` and backslash escapes
pub fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Position to retry from after the most recent `*`
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        let step = match pattern.get(p) {
            Some(b'*') => {
                star = Some((p, t));
                p += 1;
                continue;
            }
            Some(b'?') => Some(p + 1),
            Some(b'[') => match_class(pattern, p, text[t]),
            Some(b'\\') if p + 1 < pattern.len() => (pattern[p + 1] == text[t]).then_some(p + 2),
            Some(&c) => (c == text[t]).then_some(p + 1),
            None => None,
        };
        match (step, star) {
            (Some(next), _) => {
                p = next;
                t += 1;
            }
            (None, Some((sp, st))) => {
                p = sp + 1;
                t = st + 1;
                star = Some((sp, st + 1));
            }
            (None, None) => return false,
        }
    }
    pattern[p.min(pattern.len())..].iter().all(|&c| c == b'*')
}

/// Match one byte against the bracket class starting at `pattern[open]`;
/// returns the index just past the class on success
fn match_class(pattern: &[u8], open: usize, c: u8) -> Option<usize> {
    let mut i = open + 1;
    let mut matched = false;
    while i < pattern.len() && pattern[i] != b']' {
        let lo = pattern[i];
        if i + 2 < pattern.len() && pattern[i + 1] == b'-' && pattern[i + 2] != b']' {
            let hi = pattern[i + 2];
            let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
            matched |= (lo..=hi).contains(&c);
            i += 3;
        } else {
            matched |= lo == c;
            i += 1;
        }
    }
    // An unterminated class matches nothing
    (matched && i < pattern.len()).then_some(i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::executor::types::ResultCode;

    #[test]
    fn test_parse_int_signals_failure_instead_of_a_sentinel() {
        assert_eq!(parse_int(b"42"), Some(42));
        assert_eq!(parse_int(b" -7 "), Some(-7));
        assert_eq!(parse_int(b"0x1f"), Some(31));
        assert_eq!(parse_int(b"0b101"), Some(5));
        assert_eq!(parse_int(b"-9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_int(b"9223372036854775808"), None);
        assert_eq!(parse_int(b"-1"), Some(-1));
        assert_eq!(parse_int(b"abc"), None);
        assert_eq!(parse_int(b""), None);
        assert_eq!(parse_int(b"1.5"), None);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool(b"yes"), Some(true));
        assert_eq!(parse_bool(b"Off"), Some(false));
        assert_eq!(parse_bool(b"0"), Some(false));
        assert_eq!(parse_bool(b"2.5"), Some(true));
        assert_eq!(parse_bool(b"maybe"), None);
    }

    #[test]
    fn test_parse_index() {
        let v = |s: &str| Value::from(s);
        assert_eq!(parse_index(&v("2"), 5).ok(), Some(2));
        assert_eq!(parse_index(&v("end"), 5).ok(), Some(4));
        assert_eq!(parse_index(&v("end-1"), 5).ok(), Some(3));
        assert_eq!(parse_index(&v("end+1"), 5).ok(), Some(5));
        assert!(parse_index(&v("middle"), 5).is_err());
        assert_eq!(parse_index(&v("end--2"), 5).ok(), Some(6));
    }

    #[test]
    fn test_parse_index_rejects_overflowing_offsets() {
        let v = |s: &str| Value::from(s);
        assert!(parse_index(&v("end+9223372036854775807"), 5).is_err());
        assert!(parse_index(&v("end--9223372036854775808"), 5).is_err());
        assert_eq!(
            parse_index(&v("end+9223372036854775807"), 0).ok(),
            Some(i64::MAX - 1)
        );

        let mut interp = Interp::new();
        assert_eq!(
            interp.eval("lindex {a b} end+9223372036854775807"),
            ResultCode::Error
        );
        assert!(interp.result().to_string().starts_with("bad index"));
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match(b"*", b""));
        assert!(glob_match(b"a*c", b"abbbc"));
        assert!(glob_match(b"a?c", b"abc"));
        assert!(!glob_match(b"a?c", b"ac"));
        assert!(glob_match(b"[a-c]x", b"bx"));
        assert!(!glob_match(b"[a-c]x", b"dx"));
        assert!(glob_match(b"\\*", b"*"));
        assert!(!glob_match(b"\\*", b"x"));
        assert!(glob_match(b"*.tcl", b"main.tcl"));
        assert!(!glob_match(b"*.tcl", b"main.rs"));
    }

    #[test]
    fn test_lookup_is_exact() {
        assert!(lookup(b"set").is_some());
        assert!(lookup(b"se").is_none());
        assert!(lookup(b"if").and_then(|b| b.resume).is_some());
        assert_eq!(names().count(), BUILTINS.len());
    }
}
