//! Word scanner
//!
//! Splits source text into word spans tagged bare/quoted/braced and marks
//! command boundaries. Spans are absolute byte offsets into the scanned
//! buffer with delimiters stripped; the tree builder decomposes their content.

use thiserror::Error;

/* ===================== Tokens ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordKind {
    Bare,
    Quoted,
    Braced,
}

/// One word of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordSpan {
    pub kind: WordKind,
    /// Word carried a `{*}` prefix
    pub expand: bool,
    /// Content range, delimiters stripped
    pub start: usize,
    pub end: usize,
    /// Full range including delimiters and prefix
    pub raw_start: usize,
    pub raw_end: usize,
    /// 1-based line the word starts on
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Word(WordSpan),
    EndOfCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// More input could complete the text
    #[error("{0}")]
    Incomplete(&'static str),
    /// The text can never be completed
    #[error("{message}")]
    Syntax { message: &'static str, line: u32 },
}

/* ===================== Scanner ===================== */

pub struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    at_command_start: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Scanner::range(src, 0, src.len(), 1)
    }

    /// Scan `src[start..end]`, reporting offsets relative to `src`
    pub fn range(src: &'a [u8], start: usize, end: usize, line: u32) -> Self {
        Scanner {
            src: &src[..end],
            pos: start,
            line,
            at_command_start: true,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Next word or command boundary; `None` once the input is exhausted.
    pub fn next_token(&mut self) -> Result<Option<Token>, ScanError> {
        if self.at_command_start {
            self.skip_command_gap();
            if self.pos >= self.src.len() {
                return Ok(None);
            }
            self.at_command_start = false;
        } else {
            self.skip_separators();
            if self.pos >= self.src.len() {
                self.at_command_start = true;
                return Ok(Some(Token::EndOfCommand));
            }
            match self.src[self.pos] {
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    self.at_command_start = true;
                    return Ok(Some(Token::EndOfCommand));
                }
                b';' => {
                    self.pos += 1;
                    self.at_command_start = true;
                    return Ok(Some(Token::EndOfCommand));
                }
                _ => {}
            }
        }
        self.scan_word().map(|w| Some(Token::Word(w)))
    }

    /// Whitespace, empty statements and comments before a command
    fn skip_command_gap(&mut self) {
        let src = self.src;
        while self.pos < src.len() {
            match src[self.pos] {
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c | b';' => self.pos += 1,
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                }
                b'\\' if src.get(self.pos + 1) == Some(&b'\n') => {
                    self.pos += 2;
                    self.line += 1;
                }
                b'#' => {
                    while self.pos < src.len() && src[self.pos] != b'\n' {
                        if src[self.pos] == b'\\' && self.pos + 1 < src.len() {
                            if src[self.pos + 1] == b'\n' {
                                self.line += 1;
                            }
                            self.pos += 2;
                        } else {
                            self.pos += 1;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn skip_separators(&mut self) {
        let src = self.src;
        while self.pos < src.len() {
            match src[self.pos] {
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c => self.pos += 1,
                b'\\' if src.get(self.pos + 1) == Some(&b'\n') => {
                    self.pos += 2;
                    self.line += 1;
                }
                _ => return,
            }
        }
    }

    fn scan_word(&mut self) -> Result<WordSpan, ScanError> {
        let src = self.src;
        let raw_start = self.pos;
        let line = self.line;
        let mut pos = self.pos;

        let mut expand = false;
        if src[pos..].starts_with(b"{*}") && !ends_word(src, pos + 3) {
            expand = true;
            pos += 3;
        }

        let (kind, start, end, raw_end) = match src[pos] {
            b'{' => {
                let close = matching_brace(src, pos).ok_or(ScanError::Incomplete(
                    "missing close-brace",
                ))?;
                if !ends_word(src, close + 1) {
                    return Err(ScanError::Syntax {
                        message: "extra characters after close-brace",
                        line: line + count_lines(&src[raw_start..close]),
                    });
                }
                (WordKind::Braced, pos + 1, close, close + 1)
            }
            b'"' => {
                let close = closing_quote(src, pos)?;
                if !ends_word(src, close + 1) {
                    return Err(ScanError::Syntax {
                        message: "extra characters after close-quote",
                        line: line + count_lines(&src[raw_start..close]),
                    });
                }
                (WordKind::Quoted, pos + 1, close, close + 1)
            }
            _ => {
                let end = bare_word_end(src, pos)?;
                (WordKind::Bare, pos, end, end)
            }
        };

        self.line += count_lines(&src[raw_start..raw_end]);
        self.pos = raw_end;

        Ok(WordSpan {
            kind,
            expand,
            start,
            end,
            raw_start,
            raw_end,
            line,
        })
    }
}

/* ===================== Lexical Helpers ===================== */

pub(crate) fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c)
}

/// True if position `i` cannot continue a word
fn ends_word(src: &[u8], i: usize) -> bool {
    match src.get(i) {
        None => true,
        Some(&b) if is_space(b) || b == b';' => true,
        Some(&b'\\') => src.get(i + 1) == Some(&b'\n'),
        _ => false,
    }
}

pub(crate) fn count_lines(bytes: &[u8]) -> u32 {
    bytes.iter().filter(|&&b| b == b'\n').count() as u32
}

fn bare_word_end(src: &[u8], mut i: usize) -> Result<usize, ScanError> {
    while i < src.len() {
        match src[i] {
            b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c | b';' => break,
            b'\\' => {
                if src.get(i + 1) == Some(&b'\n') {
                    break;
                }
                i += 2;
            }
            b'[' => {
                i = matching_bracket(src, i)
                    .ok_or(ScanError::Incomplete("missing close-bracket"))?
                    + 1;
            }
            // `${name}` may hold spaces; an unclosed one is left to the builder
            b'$' if src.get(i + 1) == Some(&b'{') => {
                i = match src[i + 2..].iter().position(|&b| b == b'}') {
                    Some(p) => i + 2 + p + 1,
                    None => i + 1,
                };
            }
            _ => i += 1,
        }
    }
    Ok(i.min(src.len()))
}

fn closing_quote(src: &[u8], open: usize) -> Result<usize, ScanError> {
    let mut i = open + 1;
    while i < src.len() {
        match src[i] {
            b'\\' => i += 2,
            b'[' => {
                i = matching_bracket(src, i)
                    .ok_or(ScanError::Incomplete("missing close-bracket"))?
                    + 1;
            }
            b'"' => return Ok(i),
            _ => i += 1,
        }
    }
    Err(ScanError::Incomplete("missing \""))
}

/// Index of the `}` closing the brace at `open`; nested braces are counted
/// and a backslash hides the byte after it.
pub(crate) fn matching_brace(src: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < src.len() {
        match src[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the `]` closing the bracket at `open`.
///
/// Nested brackets are counted, `{...}` is skipped as an opaque balanced
/// run, and `"..."` is skipped with backslash escapes honoured.
pub(crate) fn matching_bracket(src: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < src.len() {
        match src[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            b'{' => {
                i = matching_brace(src, i)? + 1;
                continue;
            }
            b'"' => {
                i = simple_quote_end(src, i)? + 1;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

pub(crate) fn simple_quote_end(src: &[u8], open: usize) -> Option<usize> {
    let mut i = open + 1;
    while i < src.len() {
        match src[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Index of the `)` closing the parenthesis at `open`, within `src[..end]`
pub(crate) fn matching_paren(src: &[u8], open: usize, end: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < end {
        match src[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            b'[' => {
                i = matching_bracket(&src[..end], i)? + 1;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// End of a bare variable name starting at `start`: ASCII letters, digits,
/// underscores and `::` namespace separators.
pub(crate) fn scan_name(src: &[u8], start: usize, end: usize) -> usize {
    let mut i = start;
    while i < end {
        let b = src[i];
        if b.is_ascii_alphanumeric() || b == b'_' {
            i += 1;
        } else if b == b':' && i + 1 < end && src[i + 1] == b':' {
            i += 2;
            while i < end && src[i] == b':' {
                i += 1;
            }
        } else {
            break;
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(src: &str) -> Vec<Vec<(WordKind, String)>> {
        let mut scanner = Scanner::new(src.as_bytes());
        let mut commands = Vec::new();
        let mut current = Vec::new();
        while let Some(tok) = scanner.next_token().expect("scan") {
            match tok {
                Token::Word(w) => {
                    current.push((w.kind, src[w.start..w.end].to_string()));
                }
                Token::EndOfCommand => commands.push(std::mem::take(&mut current)),
            }
        }
        commands
    }

    #[test]
    fn test_splits_commands_and_words() {
        let cmds = words("set a 1; puts $a\nputs {x y}");
        assert_eq!(cmds.len(), 3);
        assert_eq!(cmds[0].len(), 3);
        assert_eq!(cmds[2][1], (WordKind::Braced, "x y".to_string()));
    }

    #[test]
    fn test_comments_and_blank_statements_are_skipped() {
        let cmds = words("# comment \\\n still comment\n;;\n  puts hi");
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0][0].1, "puts");
    }

    #[test]
    fn test_quoted_word_may_contain_brackets_with_quotes() {
        let cmds = words(r#"puts "a [string length "x y"] b""#);
        assert_eq!(cmds[0].len(), 2);
        assert_eq!(cmds[0][1].0, WordKind::Quoted);
        assert_eq!(cmds[0][1].1, r#"a [string length "x y"] b"#);
    }

    #[test]
    fn test_bare_word_keeps_bracketed_spaces() {
        let cmds = words("set x [expr {1 + 2}]");
        assert_eq!(cmds[0][2].1, "[expr {1 + 2}]");
    }

    #[test]
    fn test_expand_prefix() {
        let mut scanner = Scanner::new(b"list {*}{1 2} {*} x");
        let mut spans = Vec::new();
        while let Some(Token::Word(w)) = scanner.next_token().expect("scan") {
            spans.push(w);
        }
        assert!(spans[1].expand);
        assert_eq!(spans[1].kind, WordKind::Braced);
        assert!(!spans[2].expand, "a lone {{*}} is an ordinary braced word");
    }

    #[test]
    fn test_unterminated_brace_is_incomplete() {
        let mut scanner = Scanner::new(b"if {1 {");
        let err = loop {
            match scanner.next_token() {
                Ok(Some(_)) => continue,
                Ok(None) => unreachable!("expected an error"),
                Err(e) => break e,
            }
        };
        assert_eq!(err, ScanError::Incomplete("missing close-brace"));
    }

    #[test]
    fn test_extra_characters_after_brace_is_syntax_error() {
        let mut scanner = Scanner::new(b"puts {a}b");
        scanner.next_token().expect("first word");
        let err = scanner.next_token().expect_err("second word");
        assert!(matches!(err, ScanError::Syntax { .. }));
    }

    #[test]
    fn test_tracks_lines() {
        let mut scanner = Scanner::new(b"a\n\nb {x\ny} c");
        let mut lines = Vec::new();
        while let Some(tok) = scanner.next_token().expect("scan") {
            if let Token::Word(w) = tok {
                lines.push(w.line);
            }
        }
        assert_eq!(lines, vec![1, 3, 3, 4]);
    }

    #[test]
    fn test_scan_name_accepts_namespace_separators() {
        let src = b"::ns::var(x)";
        assert_eq!(scan_name(src, 0, src.len()), 9);
    }
}
