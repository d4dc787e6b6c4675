//! Re-serialization of trees back to source text
//!
//! `render` produces text that parses back into a tree of the same shape:
//! literals are braced when they need protection, escapes are written in a
//! canonical form that resolves to the same bytes.

use super::escape::decode_bmp;
use crate::interpreter::executor::types::{Ast, Node, NodeId};
use crate::interpreter::scanner::{is_space, matching_brace};

/// Render the whole tree rooted at `ast.root()`
pub fn render(ast: &Ast) -> Vec<u8> {
    let mut out = Vec::new();
    render_node(ast, ast.root(), &mut out);
    out
}

fn render_node(ast: &Ast, id: NodeId, out: &mut Vec<u8>) {
    match ast.node(id) {
        Node::Script { commands } => {
            for (i, command) in commands.iter().enumerate() {
                if i > 0 {
                    out.push(b'\n');
                }
                render_node(ast, *command, out);
            }
        }
        Node::Command { words, .. } => {
            for (i, word) in words.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                render_node(ast, *word, out);
            }
        }
        Node::Literal { span } => render_literal(ast.slice(*span), out),
        Node::Word { parts } => render_word(ast, parts, out),
        Node::Expand { word } => {
            out.extend_from_slice(b"{*}");
            render_node(ast, *word, out);
        }
        // Standalone substitutions render exactly as they would inside a word
        other => render_part(ast, other, out),
    }
}

/// A whole word that is a single literal
fn render_literal(bytes: &[u8], out: &mut Vec<u8>) {
    if bytes.is_empty() {
        out.extend_from_slice(b"{}");
    } else if !needs_protection(bytes) {
        out.extend_from_slice(bytes);
    } else if brace_safe(bytes) {
        out.push(b'{');
        out.extend_from_slice(bytes);
        out.push(b'}');
    } else {
        for &b in bytes {
            if is_space(b) || b"$[]{}\\\";".contains(&b) {
                escape_byte(b, out);
            } else {
                out.push(b);
            }
        }
    }
}

fn needs_protection(bytes: &[u8]) -> bool {
    bytes[0] == b'#'
        || bytes.starts_with(b"{*}")
        || bytes
            .iter()
            .any(|&b| is_space(b) || b"$[]{}\\\";".contains(&b))
}

/// Braces keep `bytes` verbatim only if they balance under the scanner's rules
fn brace_safe(bytes: &[u8]) -> bool {
    let mut wrapped = Vec::with_capacity(bytes.len() + 2);
    wrapped.push(b'{');
    wrapped.extend_from_slice(bytes);
    wrapped.push(b'}');
    matching_brace(&wrapped, 0) == Some(wrapped.len() - 1)
}

fn render_word(ast: &Ast, parts: &[NodeId], out: &mut Vec<u8>) {
    // Literal parts of a word never contain `$`-names, `[` or `\`; quotes are
    // the only delimiter that can clash with them.
    let quoted = !parts.iter().any(|p| match ast.node(*p) {
        Node::Literal { span } => ast.slice(*span).contains(&b'"'),
        _ => false,
    });
    if quoted {
        out.push(b'"');
    }
    for part in parts {
        match ast.node(*part) {
            Node::Literal { span } => out.extend_from_slice(ast.slice(*span)),
            other => render_part(ast, other, out),
        }
    }
    if quoted {
        out.push(b'"');
    }
}

fn render_part(ast: &Ast, node: &Node, out: &mut Vec<u8>) {
    match node {
        Node::Backslash { bytes } => render_escape(bytes, out),
        Node::VarSimple { name } => {
            let name = ast.slice(*name);
            out.extend_from_slice(b"${");
            out.extend_from_slice(name);
            out.push(b'}');
        }
        Node::VarArray { name, index } => {
            out.push(b'$');
            out.extend_from_slice(ast.slice(*name));
            out.push(b'(');
            if let Some(index) = index {
                match ast.node(*index) {
                    Node::Literal { span } => out.extend_from_slice(ast.slice(*span)),
                    Node::Word { parts } => {
                        for part in parts {
                            match ast.node(*part) {
                                Node::Literal { span } => out.extend_from_slice(ast.slice(*span)),
                                other => render_part(ast, other, out),
                            }
                        }
                    }
                    other => render_part(ast, other, out),
                }
            }
            out.push(b')');
        }
        Node::CmdSubst { script } => {
            out.push(b'[');
            render_node(ast, *script, out);
            out.push(b']');
        }
        Node::Literal { span } => out.extend_from_slice(ast.slice(*span)),
        Node::Script { .. } | Node::Command { .. } | Node::Word { .. } | Node::Expand { .. } => {}
    }
}

fn render_escape(bytes: &[u8], out: &mut Vec<u8>) {
    match bytes {
        [b] => escape_byte(*b, out),
        _ => match decode_bmp(bytes) {
            Some(cp) => out.extend_from_slice(format!("\\u{:04x}", cp).as_bytes()),
            None => bytes.iter().for_each(|&b| escape_byte(b, out)),
        },
    }
}

fn escape_byte(b: u8, out: &mut Vec<u8>) {
    let named = match b {
        0x07 => Some(b'a'),
        0x08 => Some(b'b'),
        0x0c => Some(b'f'),
        b'\n' => Some(b'n'),
        b'\r' => Some(b'r'),
        b'\t' => Some(b't'),
        0x0b => Some(b'v'),
        _ => None,
    };
    if let Some(letter) = named {
        out.extend_from_slice(&[b'\\', letter]);
    } else if b == b' ' || (b.is_ascii_punctuation()) {
        out.extend_from_slice(&[b'\\', b]);
    } else {
        out.extend_from_slice(format!("\\x{:02x}", b).as_bytes());
    }
}

/* ===================== Structural Comparison ===================== */

/// Compare two trees node by node, by resolved content rather than offsets
pub fn same_shape(a: &Ast, b: &Ast) -> bool {
    same_node(a, a.root(), b, b.root())
}

fn same_node(a: &Ast, x: NodeId, b: &Ast, y: NodeId) -> bool {
    let all = |xs: &[NodeId], ys: &[NodeId]| {
        xs.len() == ys.len() && xs.iter().zip(ys).all(|(p, q)| same_node(a, *p, b, *q))
    };
    match (a.node(x), b.node(y)) {
        (Node::Script { commands: p }, Node::Script { commands: q }) => all(p, q),
        (Node::Command { words: p, .. }, Node::Command { words: q, .. }) => all(p, q),
        (Node::Word { parts: p }, Node::Word { parts: q }) => all(p, q),
        (Node::Literal { span: p }, Node::Literal { span: q }) => a.slice(*p) == b.slice(*q),
        (Node::VarSimple { name: p }, Node::VarSimple { name: q }) => a.slice(*p) == b.slice(*q),
        (
            Node::VarArray { name: p, index: i },
            Node::VarArray { name: q, index: j },
        ) => {
            a.slice(*p) == b.slice(*q)
                && match (i, j) {
                    (None, None) => true,
                    (Some(i), Some(j)) => same_node(a, *i, b, *j),
                    _ => false,
                }
        }
        (Node::CmdSubst { script: p }, Node::CmdSubst { script: q }) => same_node(a, *p, b, *q),
        (Node::Backslash { bytes: p }, Node::Backslash { bytes: q }) => p == q,
        (Node::Expand { word: p }, Node::Expand { word: q }) => same_node(a, *p, b, *q),
        _ => false,
    }
}

