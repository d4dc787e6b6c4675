//! TCL list representation
//!
//! A list is a string: elements separated by whitespace, with braces,
//! double quotes or backslashes protecting elements that contain special
//! characters. `format_list` always produces text `parse_list` reads back
//! element for element.

use crate::interpreter::executor::types::Value;
use crate::interpreter::parser::escape;
use crate::interpreter::scanner::{is_space, matching_brace};

/* ===================== Formatting ===================== */

/// Quote one element so it survives as a single list element
pub fn format_element(bytes: &[u8]) -> Vec<u8> {
    if bytes.is_empty() {
        return b"{}".to_vec();
    }
    if !needs_quoting(bytes) {
        return bytes.to_vec();
    }
    if brace_safe(bytes) {
        let mut out = Vec::with_capacity(bytes.len() + 2);
        out.push(b'{');
        out.extend_from_slice(bytes);
        out.push(b'}');
        return out;
    }
    let mut out = Vec::with_capacity(bytes.len() * 2);
    for &b in bytes {
        match b {
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\t' => out.extend_from_slice(b"\\t"),
            b'\r' => out.extend_from_slice(b"\\r"),
            0x0b => out.extend_from_slice(b"\\v"),
            0x0c => out.extend_from_slice(b"\\f"),
            b' ' | b'{' | b'}' | b'[' | b']' | b'$' | b'"' | b'\\' | b';' => {
                out.push(b'\\');
                out.push(b);
            }
            _ => out.push(b),
        }
    }
    // A leading `#` would otherwise start a comment when the list is evaluated
    if out[0] == b'#' {
        out.insert(0, b'\\');
    }
    out
}

pub fn format_list(items: &[Value]) -> Value {
    let mut out = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(b' ');
        }
        out.extend_from_slice(&format_element(item.as_bytes()));
    }
    Value::from(out)
}

fn needs_quoting(bytes: &[u8]) -> bool {
    bytes[0] == b'#'
        || bytes.starts_with(b"{*}")
        || bytes
            .iter()
            .any(|&b| is_space(b) || b"{}[]$\"\\;".contains(&b))
}

/// Braces keep the element verbatim only if they balance and the content
/// does not end in a lone backslash
fn brace_safe(bytes: &[u8]) -> bool {
    let mut wrapped = Vec::with_capacity(bytes.len() + 2);
    wrapped.push(b'{');
    wrapped.extend_from_slice(bytes);
    wrapped.push(b'}');
    matching_brace(&wrapped, 0) == Some(wrapped.len() - 1)
}

/* ===================== Parsing ===================== */

/// Split a list into its elements
pub fn parse_list(src: &[u8]) -> Result<Vec<Value>, String> {
    let mut items = Vec::new();
    let mut i = 0;
    loop {
        while i < src.len() && is_space(src[i]) {
            i += 1;
        }
        if i >= src.len() {
            return Ok(items);
        }
        let (item, next) = match src[i] {
            b'{' => {
                let close =
                    matching_brace(src, i).ok_or_else(|| "unmatched open brace in list".to_string())?;
                if close + 1 < src.len() && !is_space(src[close + 1]) {
                    return Err(trailing_error("braces", src[close + 1]));
                }
                (src[i + 1..close].to_vec(), close + 1)
            }
            b'"' => {
                let (item, close) = quoted_element(src, i + 1)?;
                if close + 1 < src.len() && !is_space(src[close + 1]) {
                    return Err(trailing_error("quotes", src[close + 1]));
                }
                (item, close + 1)
            }
            _ => bare_element(src, i),
        };
        items.push(Value::from(item));
        i = next;
    }
}

fn trailing_error(delimiter: &str, found: u8) -> String {
    format!(
        "list element in {} followed by \"{}\" instead of space",
        delimiter,
        char::from(found)
    )
}

fn quoted_element(src: &[u8], start: usize) -> Result<(Vec<u8>, usize), String> {
    let mut out = Vec::new();
    let mut i = start;
    while i < src.len() {
        match src[i] {
            b'"' => return Ok((out, i)),
            b'\\' => {
                let (bytes, next) = escape::resolve(src, i, src.len());
                out.extend_from_slice(&bytes);
                i = next;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    Err("unmatched open quote in list".to_string())
}

fn bare_element(src: &[u8], start: usize) -> (Vec<u8>, usize) {
    let mut out = Vec::new();
    let mut i = start;
    while i < src.len() && !is_space(src[i]) {
        if src[i] == b'\\' {
            let (bytes, next) = escape::resolve(src, i, src.len());
            out.extend_from_slice(&bytes);
            i = next;
        } else {
            out.push(src[i]);
            i += 1;
        }
    }
    (out, i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(s: &str) -> Vec<String> {
        parse_list(s.as_bytes())
            .expect("valid list")
            .iter()
            .map(|v| v.to_string())
            .collect()
    }

    #[test]
    fn test_plain_elements_are_unquoted() {
        assert_eq!(format_element(b"abc"), b"abc");
        assert_eq!(format_element(b""), b"{}");
    }

    #[test]
    fn test_special_elements_are_braced() {
        assert_eq!(format_element(b"a b"), b"{a b}");
        assert_eq!(format_element(b"$x"), b"{$x}");
        assert_eq!(format_element(b"#c"), b"{#c}");
    }

    #[test]
    fn test_unbalanced_elements_are_escaped() {
        assert_eq!(format_element(b"a{b"), b"a\\{b");
        assert_eq!(format_element(b"x }"), b"x\\ \\}");
    }

    #[test]
    fn test_parse_mixed_forms() {
        assert_eq!(split(" a {b c}  \"d e\" f\\ g "), vec!["a", "b c", "d e", "f g"]);
        assert_eq!(split("{a {b c}} {}"), vec!["a {b c}", ""]);
        assert!(split("").is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_list(b"{a b").unwrap_err(),
            "unmatched open brace in list"
        );
        assert_eq!(
            parse_list(b"{a}b").unwrap_err(),
            "list element in braces followed by \"b\" instead of space"
        );
        assert_eq!(
            parse_list(b"\"abc").unwrap_err(),
            "unmatched open quote in list"
        );
    }

    #[test]
    fn test_formatted_lists_parse_back() {
        let items: Vec<Value> = ["", "a b", "{", "}x{", "$y", "#z", "q\"", "tab\there", "\\"]
            .iter()
            .map(|s| Value::from(*s))
            .collect();
        let list = format_list(&items);
        assert_eq!(parse_list(list.as_bytes()).expect("parses"), items);
    }
}
