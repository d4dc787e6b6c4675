//! `string` subcommands
//!
//! Lengths and indices count characters, not bytes.

use std::cmp::Ordering;

use super::{expect_int, glob_match, parse_index, wrong_args};
use crate::interpreter::executor::errors::{ErrorInfo, BAD_VALUE};
use crate::interpreter::executor::types::{Completion, Exception, Value};
use crate::interpreter::session::Interp;

const SUBCOMMANDS: &str =
    "compare, equal, first, index, length, match, range, tolower, toupper, or trim";

/// `string subcommand ?arg ...?`
pub fn string(_interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    let Some(sub) = args.get(1) else {
        return Err(wrong_args(args, "subcommand ?arg ...?").into());
    };
    let rest = &args[2..];
    let value = match sub.as_bytes() {
        b"length" => length(args, rest)?,
        b"equal" => compare(args, rest, true)?,
        b"compare" => compare(args, rest, false)?,
        b"index" => index(args, rest)?,
        b"range" => range(args, rest)?,
        b"toupper" => map_text(args, rest, |s| s.to_uppercase())?,
        b"tolower" => map_text(args, rest, |s| s.to_lowercase())?,
        b"trim" => trim(args, rest)?,
        b"first" => first(args, rest)?,
        b"match" => match_(args, rest)?,
        _ => {
            return Err(ErrorInfo::new(
                BAD_VALUE,
                format!(
                    "unknown or ambiguous subcommand \"{}\": must be {}",
                    sub, SUBCOMMANDS
                ),
            )
            .into())
        }
    };
    Ok(value.into())
}

/// Argument-count check for a subcommand; `usage` excludes `string sub`
fn sub_arity(args: &[Value], rest: &[Value], min: usize, max: usize, usage: &str) -> Result<(), ErrorInfo> {
    if rest.len() < min || rest.len() > max {
        let name = format!("{} {}", args[1], usage);
        return Err(wrong_args(&args[..1], &name));
    }
    Ok(())
}

fn chars(value: &Value) -> Vec<char> {
    value.to_str_lossy().chars().collect()
}

fn length(args: &[Value], rest: &[Value]) -> Result<Value, ErrorInfo> {
    sub_arity(args, rest, 1, 1, "string")?;
    Ok(Value::from(rest[0].to_str_lossy().chars().count()))
}

/// `string equal|compare ?-nocase? ?-length n? a b`
fn compare(args: &[Value], rest: &[Value], equal: bool) -> Result<Value, ErrorInfo> {
    const USAGE: &str = "?-nocase? ?-length int? string1 string2";
    let mut nocase = false;
    let mut limit = None;
    let mut i = 0;
    while rest.len() - i > 2 {
        match rest[i].as_bytes() {
            b"-nocase" => {
                nocase = true;
                i += 1;
            }
            b"-length" if rest.len() - i > 3 => {
                limit = Some(expect_int(&rest[i + 1])?);
                i += 2;
            }
            _ => return Err(wrong_args(&args[..1], &format!("{} {}", args[1], USAGE))),
        }
    }
    sub_arity(args, &rest[i..], 2, 2, USAGE)?;

    let prepare = |v: &Value| {
        let mut s: Vec<char> = if nocase {
            v.to_str_lossy().to_lowercase().chars().collect()
        } else {
            chars(v)
        };
        if let Some(n) = limit.and_then(|n| usize::try_from(n).ok()) {
            s.truncate(n);
        }
        s
    };
    let ordering = prepare(&rest[i]).cmp(&prepare(&rest[i + 1]));
    let n: i64 = match (equal, ordering) {
        (true, Ordering::Equal) => 1,
        (true, _) => 0,
        (false, Ordering::Less) => -1,
        (false, Ordering::Equal) => 0,
        (false, Ordering::Greater) => 1,
    };
    Ok(Value::from(n))
}

fn index(args: &[Value], rest: &[Value]) -> Result<Value, ErrorInfo> {
    sub_arity(args, rest, 2, 2, "string charIndex")?;
    let text = chars(&rest[0]);
    let at = parse_index(&rest[1], text.len())?;
    let ch = usize::try_from(at).ok().and_then(|at| text.get(at));
    Ok(ch.map(|c| Value::from(c.to_string())).unwrap_or_default())
}

fn range(args: &[Value], rest: &[Value]) -> Result<Value, ErrorInfo> {
    sub_arity(args, rest, 3, 3, "string first last")?;
    let text = chars(&rest[0]);
    let first = parse_index(&rest[1], text.len())?.max(0);
    let last = parse_index(&rest[2], text.len())?.min(text.len() as i64 - 1);
    if first > last {
        return Ok(Value::empty());
    }
    let slice: String = text[first as usize..=last as usize].iter().collect();
    Ok(Value::from(slice))
}

fn map_text(args: &[Value], rest: &[Value], f: impl Fn(&str) -> String) -> Result<Value, ErrorInfo> {
    sub_arity(args, rest, 1, 1, "string")?;
    Ok(Value::from(f(&rest[0].to_str_lossy())))
}

fn trim(args: &[Value], rest: &[Value]) -> Result<Value, ErrorInfo> {
    sub_arity(args, rest, 1, 2, "string ?chars?")?;
    let text = rest[0].to_str_lossy();
    let trimmed = match rest.get(1) {
        Some(set) => {
            let set: Vec<char> = chars(set);
            text.trim_matches(|c| set.contains(&c)).to_string()
        }
        None => text.trim().to_string(),
    };
    Ok(Value::from(trimmed))
}

/// `string first needle haystack ?startIndex?`
fn first(args: &[Value], rest: &[Value]) -> Result<Value, ErrorInfo> {
    sub_arity(args, rest, 2, 3, "needleString haystackString ?startIndex?")?;
    let needle = chars(&rest[0]);
    let haystack = chars(&rest[1]);
    let start = match rest.get(2) {
        Some(index) => parse_index(index, haystack.len())?.max(0) as usize,
        None => 0,
    };
    if needle.is_empty() || start >= haystack.len() {
        return Ok(Value::from(-1i64));
    }
    let found = haystack[start..]
        .windows(needle.len())
        .position(|w| w == needle.as_slice())
        .map(|at| (at + start) as i64)
        .unwrap_or(-1);
    Ok(Value::from(found))
}

/// `string match ?-nocase? pattern string`
fn match_(args: &[Value], rest: &[Value]) -> Result<Value, ErrorInfo> {
    let (nocase, rest) = match rest.first() {
        Some(flag) if flag.is("-nocase") => (true, &rest[1..]),
        _ => (false, rest),
    };
    sub_arity(args, rest, 2, 2, "?-nocase? pattern string")?;
    let matched = if nocase {
        let pattern = rest[0].to_str_lossy().to_lowercase();
        let text = rest[1].to_str_lossy().to_lowercase();
        glob_match(pattern.as_bytes(), text.as_bytes())
    } else {
        glob_match(rest[0].as_bytes(), rest[1].as_bytes())
    };
    Ok(Value::from(if matched { "1" } else { "0" }))
}
