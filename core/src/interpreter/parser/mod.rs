//! Tree builder
//!
//! Consumes the word scanner's spans and decomposes each word into literal
//! runs, variable references, command substitutions and resolved escapes,
//! producing an [`Ast`] ready for the executor.

use thiserror::Error;

use super::executor::types::{Ast, Node, NodeId, Span};
use super::scanner::{
    count_lines, matching_bracket, matching_paren, scan_name, ScanError, Scanner, Token, WordKind,
    WordSpan,
};

pub mod escape;
pub mod render;


pub use render::{render, same_shape};

/// Node budget used when the caller does not supply one
pub const DEFAULT_MAX_NODES: usize = 1_000_000;

/// Deepest nesting of command substitutions and array indices in one tree
pub const MAX_NESTING: usize = 200;

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The text is a prefix of something valid; more input is needed
    #[error("{0}")]
    Incomplete(String),
    /// The text is malformed and can never complete
    #[error("{message}")]
    Syntax { message: String, line: u32 },
    /// The tree outgrew its node budget
    #[error("script too large: more than {0} syntax nodes")]
    Exhausted(usize),
    /// Substitutions nest deeper than the builder will follow
    #[error("script nested too deeply: more than {0} levels")]
    TooDeep(usize),
}

impl From<ScanError> for ParseError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::Incomplete(msg) => ParseError::Incomplete(msg.to_string()),
            ScanError::Syntax { message, line } => ParseError::Syntax {
                message: message.to_string(),
                line,
            },
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Syntactic classification of a buffer, as needed by interactive front ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStatus {
    Complete,
    Incomplete,
    Error(String),
}

/* ===================== Public API ===================== */

/// Parse a script into a tree
pub fn parse(source: &[u8]) -> ParseResult<Ast> {
    parse_with_limit(source, DEFAULT_MAX_NODES)
}

/// Parse a script, failing with [`ParseError::Exhausted`] past `max_nodes`
pub fn parse_with_limit(source: &[u8], max_nodes: usize) -> ParseResult<Ast> {
    let mut builder = TreeBuilder::new(source, max_nodes);
    let root = builder.script(0, source.len(), 1)?;
    builder.ast.set_root(root);
    Ok(builder.ast)
}

/// Parse `source` as the content of a single double-quoted word
///
/// The tree's root is the word node itself rather than a script.
pub fn parse_word(source: &[u8]) -> ParseResult<Ast> {
    let mut builder = TreeBuilder::new(source, DEFAULT_MAX_NODES);
    let root = builder.compound(0, source.len(), 1)?;
    builder.ast.set_root(root);
    Ok(builder.ast)
}

/// Classify `source` without evaluating anything
pub fn parse_status(source: &[u8]) -> ParseStatus {
    match parse(source) {
        Ok(_) => ParseStatus::Complete,
        Err(ParseError::Incomplete(_)) => ParseStatus::Incomplete,
        Err(e) => ParseStatus::Error(e.to_string()),
    }
}

/* ===================== AST Builder ===================== */

struct TreeBuilder<'s> {
    src: &'s [u8],
    ast: Ast,
    max_nodes: usize,
    depth: usize,
}

impl<'s> TreeBuilder<'s> {
    fn new(src: &'s [u8], max_nodes: usize) -> Self {
        TreeBuilder {
            src,
            ast: Ast::with_source(src),
            max_nodes,
            depth: 0,
        }
    }

    fn push(&mut self, node: Node) -> ParseResult<NodeId> {
        if self.ast.len() >= self.max_nodes {
            return Err(ParseError::Exhausted(self.max_nodes));
        }
        Ok(self.ast.alloc(node))
    }

    /// Script over `src[start..end]`: commands with at least one word
    fn script(&mut self, start: usize, end: usize, line: u32) -> ParseResult<NodeId> {
        let mut scanner = Scanner::range(self.src, start, end, line);
        let mut commands = Vec::new();
        let mut words = Vec::new();
        let mut first: Option<WordSpan> = None;
        let mut last_end = start;

        while let Some(token) = scanner.next_token()? {
            match token {
                Token::Word(span) => {
                    if first.is_none() {
                        first = Some(span);
                    }
                    last_end = span.raw_end;
                    words.push(self.word(&span)?);
                }
                Token::EndOfCommand => {
                    if let Some(head) = first.take() {
                        let command = Node::Command {
                            words: std::mem::take(&mut words),
                            span: Span::new(head.raw_start, last_end),
                            line: head.line,
                        };
                        commands.push(self.push(command)?);
                    }
                }
            }
        }

        self.push(Node::Script { commands })
    }

    fn word(&mut self, span: &WordSpan) -> ParseResult<NodeId> {
        let id = match span.kind {
            WordKind::Braced => self.push(Node::Literal {
                span: Span::new(span.start, span.end),
            })?,
            WordKind::Quoted | WordKind::Bare => {
                self.compound(span.start, span.end, span.line)?
            }
        };
        if span.expand {
            self.push(Node::Expand { word: id })
        } else {
            Ok(id)
        }
    }

    /// Decompose `src[start..end]` into word parts.
    ///
    /// Literal runs are only materialized when a substitution or escape
    /// interrupts them, or at the end of the range.
    fn compound(&mut self, start: usize, end: usize, line: u32) -> ParseResult<NodeId> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::TooDeep(MAX_NESTING));
        }
        self.depth += 1;
        let word = self.parts(start, end, line);
        self.depth -= 1;
        word
    }

    fn parts(&mut self, start: usize, end: usize, line: u32) -> ParseResult<NodeId> {
        let src = self.src;
        let mut parts = Vec::new();
        let mut run = start;
        let mut i = start;

        while i < end {
            match src[i] {
                b'$' => match self.variable(i, end, line)? {
                    Some((node, next)) => {
                        self.flush(&mut parts, run, i)?;
                        parts.push(node);
                        i = next;
                        run = i;
                    }
                    None => i += 1,
                },
                b'[' => {
                    let close = matching_bracket(&src[..end], i)
                        .ok_or_else(|| ParseError::Incomplete("missing close-bracket".into()))?;
                    self.flush(&mut parts, run, i)?;
                    let nested_line = line + count_lines(&src[start..i]);
                    let script = self.script(i + 1, close, nested_line)?;
                    parts.push(self.push(Node::CmdSubst { script })?);
                    i = close + 1;
                    run = i;
                }
                b'\\' => {
                    let (bytes, next) = escape::resolve(src, i, end);
                    self.flush(&mut parts, run, i)?;
                    parts.push(self.push(Node::Backslash { bytes })?);
                    i = next;
                    run = i;
                }
                _ => i += 1,
            }
        }
        self.flush(&mut parts, run, end)?;

        match parts.as_slice() {
            [] => self.push(Node::Literal {
                span: Span::new(start, start),
            }),
            [only] if matches!(self.ast.node(*only), Node::Literal { .. }) => Ok(*only),
            _ => self.push(Node::Word { parts }),
        }
    }

    fn flush(&mut self, parts: &mut Vec<NodeId>, from: usize, to: usize) -> ParseResult<()> {
        if from < to {
            parts.push(self.push(Node::Literal {
                span: Span::new(from, to),
            })?);
        }
        Ok(())
    }

    /// Variable reference at the `$` in `src[at]`.
    ///
    /// Returns `None` when the `$` does not start a reference and is
    /// therefore literal text.
    fn variable(
        &mut self,
        at: usize,
        end: usize,
        line: u32,
    ) -> ParseResult<Option<(NodeId, usize)>> {
        let src = self.src;
        let name_start = at + 1;

        if name_start < end && src[name_start] == b'{' {
            let close = src[name_start + 1..end]
                .iter()
                .position(|&b| b == b'}')
                .map(|p| name_start + 1 + p)
                .ok_or_else(|| ParseError::Syntax {
                    message: "missing close-brace for variable name".into(),
                    line,
                })?;
            let node = self.push(Node::VarSimple {
                name: Span::new(name_start + 1, close),
            })?;
            return Ok(Some((node, close + 1)));
        }

        let name_end = scan_name(src, name_start, end);
        if name_end == name_start {
            return Ok(None);
        }

        if name_end < end && src[name_end] == b'(' {
            let close = matching_paren(src, name_end, end).ok_or_else(|| ParseError::Syntax {
                message: "missing )".into(),
                line,
            })?;
            let index = if close > name_end + 1 {
                Some(self.compound(name_end + 1, close, line)?)
            } else {
                None
            };
            let node = self.push(Node::VarArray {
                name: Span::new(name_start, name_end),
                index,
            })?;
            return Ok(Some((node, close + 1)));
        }

        let node = self.push(Node::VarSimple {
            name: Span::new(name_start, name_end),
        })?;
        Ok(Some((node, name_end)))
    }
}
