//! `expr`: expression parsing and evaluation
//!
//! An expression is parsed into an [`ExprNode`] tree and then evaluated;
//! `&&`, `||` and `?:` only evaluate the operands they need. Operands are
//! numbers, braced or quoted strings, `$variables`, `[commands]` and math
//! function calls. Integers are 64-bit and overflow is an error.

use std::cmp::Ordering;

use super::lists::concat_values;
use super::{arity, parse_bool, parse_int};
use crate::interpreter::executor::errors::{ErrorInfo, ARITHMETIC, BAD_VALUE, PARSE};
use crate::interpreter::executor::types::{Completion, Exception, Value};
use crate::interpreter::scanner::{
    is_space, matching_brace, matching_bracket, matching_paren, scan_name, simple_quote_end,
};
use crate::interpreter::session::Interp;

/* ===================== Builtin ===================== */

/// `expr arg ?arg ...?`
pub fn expr(interp: &mut Interp, args: &[Value]) -> Result<Completion, Exception> {
    arity(args, 1, usize::MAX, "arg ?arg ...?")?;
    let text = match &args[1..] {
        [only] => only.clone(),
        many => concat_values(many),
    };
    let value = evaluate(interp, text.as_bytes())?;
    Ok(value.into_value().into())
}

/// Evaluate an expression and interpret the result as a boolean
pub fn condition(interp: &mut Interp, text: &Value) -> Result<bool, Exception> {
    let value = evaluate(interp, text.as_bytes())?;
    Ok(value.truthy()?)
}

pub fn evaluate(interp: &mut Interp, text: &[u8]) -> Result<Operand, Exception> {
    let tree = ExprParser::new(text).parse()?;
    tree.eval(interp)
}

/* ===================== Values ===================== */

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Double(f64),
}

/// Result of evaluating any subexpression
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Num(Num),
    Str(Value),
}

impl Operand {
    fn int(n: i64) -> Self {
        Operand::Num(Num::Int(n))
    }

    fn flag(b: bool) -> Self {
        Operand::int(i64::from(b))
    }

    /// Numeric view, parsing strings that look like numbers
    fn number(&self) -> Option<Num> {
        match self {
            Operand::Num(n) => Some(*n),
            Operand::Str(s) => parse_number(s.as_bytes()),
        }
    }

    fn truthy(&self) -> Result<bool, ErrorInfo> {
        match self {
            Operand::Num(Num::Int(n)) => Ok(*n != 0),
            Operand::Num(Num::Double(f)) => Ok(*f != 0.0),
            Operand::Str(s) => parse_bool(s.as_bytes()).ok_or_else(|| {
                ErrorInfo::new(
                    BAD_VALUE,
                    format!("expected boolean value but got \"{}\"", s),
                )
            }),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Operand::Num(Num::Int(n)) => Value::from(n),
            Operand::Num(Num::Double(f)) => Value::from(format_double(f)),
            Operand::Str(s) => s,
        }
    }

    fn text(&self) -> Value {
        self.clone().into_value()
    }
}

/// Integers first, then doubles (including `Inf` and `NaN`)
fn parse_number(bytes: &[u8]) -> Option<Num> {
    if let Some(n) = parse_int(bytes) {
        return Some(Num::Int(n));
    }
    let text = std::str::from_utf8(bytes).ok()?.trim();
    let first = text.bytes().next()?;
    // Rust also accepts words like "infinity"; keep to numeric spellings
    let numeric = first.is_ascii_digit()
        || matches!(first, b'.' | b'-' | b'+')
        || text.eq_ignore_ascii_case("inf")
        || text.eq_ignore_ascii_case("nan");
    if !numeric {
        return None;
    }
    text.parse::<f64>().ok().map(Num::Double)
}

/// Shortest text that reads back as the same double, always marked as
/// floating point (`3.0`, `1e+20`, `Inf`)
pub fn format_double(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Inf" } else { "-Inf" }.to_string();
    }
    let sci = format!("{:e}", f);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((&sci, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if !(-5..17).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
    }
    let plain = format!("{}", f);
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}

/* ===================== Syntax Tree ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    StrEq,
    StrNe,
    BitAnd,
    BitXor,
    BitOr,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::StrEq => "eq",
            BinaryOp::StrNe => "ne",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
        }
    }
}

/// Binary operators by precedence, tightest first
const LEVELS: &[&[(&str, BinaryOp)]] = &[
    &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Mod)],
    &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
    &[("<<", BinaryOp::Shl), (">>", BinaryOp::Shr)],
    &[
        ("<=", BinaryOp::Le),
        (">=", BinaryOp::Ge),
        ("<", BinaryOp::Lt),
        (">", BinaryOp::Gt),
    ],
    &[("==", BinaryOp::Eq), ("!=", BinaryOp::Ne)],
    &[("eq", BinaryOp::StrEq), ("ne", BinaryOp::StrNe)],
    &[("&", BinaryOp::BitAnd)],
    &[("^", BinaryOp::BitXor)],
    &[("|", BinaryOp::BitOr)],
];

#[derive(Debug, Clone, PartialEq)]
enum ExprNode {
    Literal(Operand),
    /// `$name`, `${name}` or `$name(index)`, kept as source text
    Var(Vec<u8>),
    /// Content of a double-quoted string, substituted on evaluation
    Quoted(Vec<u8>),
    /// Script of a `[...]` operand
    Command(Vec<u8>),
    Unary(UnaryOp, Box<ExprNode>),
    Binary(BinaryOp, Box<ExprNode>, Box<ExprNode>),
    And(Box<ExprNode>, Box<ExprNode>),
    Or(Box<ExprNode>, Box<ExprNode>),
    Ternary(Box<ExprNode>, Box<ExprNode>, Box<ExprNode>),
    Call(String, Vec<ExprNode>),
}

/* ===================== Parser ===================== */

/// Deepest operator tree the parser will build, counting both nested
/// groups and the length of left-associative chains
const MAX_DEPTH: usize = 200;

struct ExprParser<'s> {
    src: &'s [u8],
    pos: usize,
    depth: usize,
}

impl<'s> ExprParser<'s> {
    fn new(src: &'s [u8]) -> Self {
        ExprParser { src, pos: 0, depth: 0 }
    }

    /// Any error aborts the whole parse, so levels are only released on success
    fn descend(&mut self) -> Result<(), ErrorInfo> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn error(&self, detail: &str) -> ErrorInfo {
        ErrorInfo::new(
            PARSE,
            format!(
                "syntax error in expression \"{}\": {}",
                String::from_utf8_lossy(self.src),
                detail
            ),
        )
    }

    fn parse(mut self) -> Result<ExprNode, ErrorInfo> {
        let node = self.ternary()?;
        self.skip_space();
        if self.pos < self.src.len() {
            return Err(self.error("extra tokens at end of expression"));
        }
        Ok(node)
    }

    fn skip_space(&mut self) {
        while self.pos < self.src.len() && is_space(self.src[self.pos]) {
            self.pos += 1;
        }
    }

    /// Consume `op` if it comes next
    ///
    /// A word operator must not run into a following identifier character,
    /// and `&`/`|` must not be the first half of `&&`/`||`.
    fn eat(&mut self, op: &str) -> bool {
        self.skip_space();
        let op = op.as_bytes();
        if !self.src[self.pos..].starts_with(op) {
            return false;
        }
        let next = self.src.get(self.pos + op.len()).copied();
        let word = op[0].is_ascii_alphabetic();
        if word && next.is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return false;
        }
        if (op == b"&" || op == b"|") && next == Some(op[0]) {
            return false;
        }
        if (op == b"<" || op == b">") && matches!(next, Some(b'<') | Some(b'>') | Some(b'=')) {
            return false;
        }
        self.pos += op.len();
        true
    }

    fn ternary(&mut self) -> Result<ExprNode, ErrorInfo> {
        self.descend()?;
        let test = self.logical_or()?;
        if !self.eat("?") {
            self.depth -= 1;
            return Ok(test);
        }
        let yes = self.ternary()?;
        if !self.eat(":") {
            return Err(self.error("missing \":\" in ternary conditional"));
        }
        let no = self.ternary()?;
        self.depth -= 1;
        Ok(ExprNode::Ternary(Box::new(test), Box::new(yes), Box::new(no)))
    }

    fn logical_or(&mut self) -> Result<ExprNode, ErrorInfo> {
        let mut left = self.logical_and()?;
        let mut links = 0;
        while self.eat("||") {
            self.descend()?;
            links += 1;
            let right = self.logical_and()?;
            left = ExprNode::Or(Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<ExprNode, ErrorInfo> {
        let mut left = self.binary(LEVELS.len())?;
        let mut links = 0;
        while self.eat("&&") {
            self.descend()?;
            links += 1;
            let right = self.binary(LEVELS.len())?;
            left = ExprNode::And(Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    /// Left-associative binary operators whose `LEVELS` index is below `bound`
    fn binary(&mut self, bound: usize) -> Result<ExprNode, ErrorInfo> {
        let mut left = self.unary()?;
        let mut links = 0;
        while let Some((level, op)) = self.binary_op(bound) {
            self.descend()?;
            links += 1;
            // the right operand only takes operators that bind tighter
            let right = self.binary(level)?;
            left = ExprNode::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    fn binary_op(&mut self, bound: usize) -> Option<(usize, BinaryOp)> {
        for (level, ops) in LEVELS[..bound].iter().enumerate() {
            for &(symbol, op) in ops.iter() {
                if self.eat(symbol) {
                    return Some((level, op));
                }
            }
        }
        None
    }

    fn unary(&mut self) -> Result<ExprNode, ErrorInfo> {
        self.skip_space();
        for (symbol, op) in [
            ("-", UnaryOp::Neg),
            ("+", UnaryOp::Plus),
            ("!", UnaryOp::Not),
            ("~", UnaryOp::BitNot),
        ] {
            // `!=` is a binary operator, never a negation
            if symbol == "!" && self.src[self.pos..].starts_with(b"!=") {
                continue;
            }
            if self.eat(symbol) {
                self.descend()?;
                let inner = self.unary()?;
                self.depth -= 1;
                return Ok(ExprNode::Unary(op, Box::new(inner)));
            }
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<ExprNode, ErrorInfo> {
        self.skip_space();
        let start = self.pos;
        let Some(&c) = self.src.get(start) else {
            return Err(self.error("premature end of expression"));
        };
        match c {
            b'(' => {
                self.pos += 1;
                let inner = self.ternary()?;
                if !self.eat(")") {
                    return Err(self.error("missing close parenthesis"));
                }
                Ok(inner)
            }
            b'{' => {
                let close = matching_brace(self.src, start)
                    .ok_or_else(|| self.error("missing close-brace"))?;
                self.pos = close + 1;
                Ok(ExprNode::Literal(Operand::Str(Value::from(
                    &self.src[start + 1..close],
                ))))
            }
            b'"' => {
                let close = simple_quote_end(self.src, start)
                    .ok_or_else(|| self.error("missing close-quote"))?;
                self.pos = close + 1;
                Ok(ExprNode::Quoted(self.src[start + 1..close].to_vec()))
            }
            b'[' => {
                let close = matching_bracket(self.src, start)
                    .ok_or_else(|| self.error("missing close-bracket"))?;
                self.pos = close + 1;
                Ok(ExprNode::Command(self.src[start + 1..close].to_vec()))
            }
            b'$' => self.variable(start),
            b'0'..=b'9' | b'.' => self.number(start),
            c if c.is_ascii_alphabetic() => self.word(start),
            _ => Err(self.error(&format!("unexpected \"{}\"", char::from(c)))),
        }
    }

    fn variable(&mut self, start: usize) -> Result<ExprNode, ErrorInfo> {
        let end = self.src.len();
        let mut i = start + 1;
        if self.src.get(i) == Some(&b'{') {
            let close = self.src[i..]
                .iter()
                .position(|&b| b == b'}')
                .ok_or_else(|| self.error("missing close-brace for variable name"))?;
            i += close + 1;
        } else {
            i = scan_name(self.src, i, end);
            if i == start + 1 {
                return Err(self.error("invalid character \"$\""));
            }
            if self.src.get(i) == Some(&b'(') {
                let close = matching_paren(self.src, i, end)
                    .ok_or_else(|| self.error("missing )"))?;
                i = close + 1;
            }
        }
        self.pos = i;
        Ok(ExprNode::Var(self.src[start..i].to_vec()))
    }

    fn number(&mut self, start: usize) -> Result<ExprNode, ErrorInfo> {
        let mut i = start;
        while i < self.src.len() {
            let b = self.src[i];
            let exponent_sign = matches!(b, b'+' | b'-')
                && i > start
                && matches!(self.src[i - 1], b'e' | b'E')
                && !self.src[start..i].starts_with(b"0x");
            if b.is_ascii_alphanumeric() || b == b'.' || exponent_sign {
                i += 1;
            } else {
                break;
            }
        }
        self.pos = i;
        let text = &self.src[start..i];
        match parse_number(text) {
            Some(n) => Ok(ExprNode::Literal(Operand::Num(n))),
            None => Err(self.error(&format!(
                "invalid number \"{}\"",
                String::from_utf8_lossy(text)
            ))),
        }
    }

    /// Function call, boolean literal, or a word operator in the wrong place
    fn word(&mut self, start: usize) -> Result<ExprNode, ErrorInfo> {
        let mut i = start;
        while i < self.src.len() && (self.src[i].is_ascii_alphanumeric() || self.src[i] == b'_') {
            i += 1;
        }
        let name = String::from_utf8_lossy(&self.src[start..i]).into_owned();
        self.pos = i;

        if self.eat("(") {
            let mut args = Vec::new();
            if !self.eat(")") {
                loop {
                    args.push(self.ternary()?);
                    if self.eat(")") {
                        break;
                    }
                    if !self.eat(",") {
                        return Err(self.error("missing close parenthesis"));
                    }
                }
            }
            return Ok(ExprNode::Call(name, args));
        }

        if parse_bool(name.as_bytes()).is_some() || parse_number(name.as_bytes()).is_some() {
            return Ok(ExprNode::Literal(Operand::Str(Value::from(name))));
        }
        Err(self.error(&format!("invalid bareword \"{}\"", name)))
    }
}

/* ===================== Evaluation ===================== */

fn arith_error(message: &str) -> ErrorInfo {
    ErrorInfo::new(ARITHMETIC, message)
}

fn non_numeric(value: &Operand, op: &str) -> ErrorInfo {
    ErrorInfo::new(
        BAD_VALUE,
        format!(
            "can't use non-numeric string \"{}\" as operand of \"{}\"",
            value.text(),
            op
        ),
    )
}

fn float_operand(op: &str) -> ErrorInfo {
    ErrorInfo::new(
        BAD_VALUE,
        format!("can't use floating-point value as operand of \"{}\"", op),
    )
}

fn overflow() -> ErrorInfo {
    arith_error("integer overflow")
}

impl ExprNode {
    fn eval(&self, interp: &mut Interp) -> Result<Operand, Exception> {
        match self {
            ExprNode::Literal(value) => Ok(value.clone()),
            ExprNode::Var(text) | ExprNode::Quoted(text) => {
                interp.subst(text).map(Operand::Str)
            }
            ExprNode::Command(script) => interp
                .eval_nested(&Value::from(script.as_slice()))
                .map(Operand::Str),
            ExprNode::Unary(op, inner) => {
                let value = inner.eval(interp)?;
                Ok(unary(*op, &value)?)
            }
            ExprNode::Binary(op, left, right) => {
                let left = left.eval(interp)?;
                let right = right.eval(interp)?;
                Ok(binary(*op, &left, &right)?)
            }
            ExprNode::And(left, right) => {
                if !left.eval(interp)?.truthy()? {
                    return Ok(Operand::flag(false));
                }
                Ok(Operand::flag(right.eval(interp)?.truthy()?))
            }
            ExprNode::Or(left, right) => {
                if left.eval(interp)?.truthy()? {
                    return Ok(Operand::flag(true));
                }
                Ok(Operand::flag(right.eval(interp)?.truthy()?))
            }
            ExprNode::Ternary(test, yes, no) => {
                if test.eval(interp)?.truthy()? {
                    yes.eval(interp)
                } else {
                    no.eval(interp)
                }
            }
            ExprNode::Call(name, args) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.eval(interp)?);
                }
                Ok(call(name, &values)?)
            }
        }
    }
}

fn unary(op: UnaryOp, value: &Operand) -> Result<Operand, ErrorInfo> {
    let symbol = match op {
        UnaryOp::Neg => "-",
        UnaryOp::Plus => "+",
        UnaryOp::Not => "!",
        UnaryOp::BitNot => "~",
    };
    if op == UnaryOp::Not {
        return Ok(Operand::flag(!value.truthy()?));
    }
    let n = value.number().ok_or_else(|| non_numeric(value, symbol))?;
    let result = match (op, n) {
        (UnaryOp::Neg, Num::Int(i)) => Num::Int(i.checked_neg().ok_or_else(overflow)?),
        (UnaryOp::Neg, Num::Double(f)) => Num::Double(-f),
        (UnaryOp::Plus, n) => n,
        (UnaryOp::BitNot, Num::Int(i)) => Num::Int(!i),
        (UnaryOp::BitNot, Num::Double(_)) => return Err(float_operand(symbol)),
        (UnaryOp::Not, n) => Num::Int(i64::from(as_f64(n) == 0.0)),
    };
    Ok(Operand::Num(result))
}

fn binary(op: BinaryOp, left: &Operand, right: &Operand) -> Result<Operand, ErrorInfo> {
    let symbol = op.symbol();
    match op {
        BinaryOp::StrEq => return Ok(Operand::flag(left.text() == right.text())),
        BinaryOp::StrNe => return Ok(Operand::flag(left.text() != right.text())),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne => {
            let ordering = compare(left, right);
            let result = match op {
                BinaryOp::Lt => ordering == Some(Ordering::Less),
                BinaryOp::Gt => ordering == Some(Ordering::Greater),
                BinaryOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                BinaryOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                BinaryOp::Eq => ordering == Some(Ordering::Equal),
                _ => ordering != Some(Ordering::Equal),
            };
            return Ok(Operand::flag(result));
        }
        _ => {}
    }

    let a = left.number().ok_or_else(|| non_numeric(left, symbol))?;
    let b = right.number().ok_or_else(|| non_numeric(right, symbol))?;
    let result = match (a, b) {
        (Num::Int(a), Num::Int(b)) => Num::Int(int_op(op, a, b)?),
        (a, b) => {
            let (a, b) = (as_f64(a), as_f64(b));
            Num::Double(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => return Err(float_operand(symbol)),
            })
        }
    };
    Ok(Operand::Num(result))
}

fn as_f64(n: Num) -> f64 {
    match n {
        Num::Int(i) => i as f64,
        Num::Double(f) => f,
    }
}

/// Numeric comparison when both sides are numbers, byte-wise otherwise
fn compare(left: &Operand, right: &Operand) -> Option<Ordering> {
    match (left.number(), right.number()) {
        (Some(Num::Int(a)), Some(Num::Int(b))) => Some(a.cmp(&b)),
        (Some(a), Some(b)) => as_f64(a).partial_cmp(&as_f64(b)),
        _ => Some(left.text().as_bytes().cmp(right.text().as_bytes())),
    }
}

fn int_op(op: BinaryOp, a: i64, b: i64) -> Result<i64, ErrorInfo> {
    match op {
        BinaryOp::Add => a.checked_add(b).ok_or_else(overflow),
        BinaryOp::Sub => a.checked_sub(b).ok_or_else(overflow),
        BinaryOp::Mul => a.checked_mul(b).ok_or_else(overflow),
        BinaryOp::Div | BinaryOp::Mod => {
            if b == 0 {
                return Err(arith_error("divide by zero"));
            }
            let q = a.checked_div(b).ok_or_else(overflow)?;
            let r = a % b;
            // Quotient rounds towards negative infinity; remainder takes
            // the sign of the divisor
            let adjust = r != 0 && ((r < 0) != (b < 0));
            if op == BinaryOp::Div {
                Ok(if adjust { q - 1 } else { q })
            } else {
                Ok(if adjust { r + b } else { r })
            }
        }
        BinaryOp::Shl => {
            if b < 0 {
                return Err(arith_error("negative shift argument"));
            }
            if a == 0 {
                return Ok(0);
            }
            let shifted = u32::try_from(b)
                .ok()
                .filter(|&s| s < 64)
                .map(|s| a << s)
                .filter(|&v| v >> b == a);
            shifted.ok_or_else(overflow)
        }
        BinaryOp::Shr => {
            if b < 0 {
                return Err(arith_error("negative shift argument"));
            }
            Ok(if b >= 64 { if a < 0 { -1 } else { 0 } } else { a >> b })
        }
        BinaryOp::BitAnd => Ok(a & b),
        BinaryOp::BitXor => Ok(a ^ b),
        BinaryOp::BitOr => Ok(a | b),
        _ => Err(ErrorInfo::internal(format!(
            "\"{}\" is not an integer operator",
            op.symbol()
        ))),
    }
}

/* ===================== Math Functions ===================== */

fn call(name: &str, args: &[Operand]) -> Result<Operand, ErrorInfo> {
    let numbers = |min: usize, max: usize| -> Result<Vec<Num>, ErrorInfo> {
        if args.len() < min || args.len() > max {
            let which = if args.len() < min { "few" } else { "many" };
            return Err(ErrorInfo::new(
                BAD_VALUE,
                format!("too {} arguments for math function \"{}\"", which, name),
            ));
        }
        args.iter()
            .map(|a| {
                a.number().ok_or_else(|| {
                    ErrorInfo::new(
                        BAD_VALUE,
                        format!("expected number but got \"{}\"", a.text()),
                    )
                })
            })
            .collect()
    };

    let result = match name {
        "abs" => match numbers(1, 1)?[0] {
            Num::Int(i) => Num::Int(i.checked_abs().ok_or_else(overflow)?),
            Num::Double(f) => Num::Double(f.abs()),
        },
        "int" => Num::Int(to_int(numbers(1, 1)?[0], f64::trunc)?),
        "round" => Num::Int(to_int(numbers(1, 1)?[0], f64::round)?),
        "double" => Num::Double(as_f64(numbers(1, 1)?[0])),
        "min" | "max" => {
            let values = numbers(1, usize::MAX)?;
            let mut best = values[0];
            for &n in &values[1..] {
                let ordering = match (best, n) {
                    (Num::Int(a), Num::Int(b)) => Some(b.cmp(&a)),
                    (a, b) => as_f64(b).partial_cmp(&as_f64(a)),
                };
                let better = if name == "min" {
                    ordering == Some(Ordering::Less)
                } else {
                    ordering == Some(Ordering::Greater)
                };
                if better {
                    best = n;
                }
            }
            best
        }
        _ => {
            return Err(ErrorInfo::new(
                BAD_VALUE,
                format!("unknown math function \"{}\"", name),
            ))
        }
    };
    Ok(Operand::Num(result))
}

fn to_int(n: Num, rounding: fn(f64) -> f64) -> Result<i64, ErrorInfo> {
    match n {
        Num::Int(i) => Ok(i),
        Num::Double(f) => {
            let r = rounding(f);
            if !r.is_finite() || r < i64::MIN as f64 || r >= i64::MAX as f64 {
                return Err(arith_error("integer value too large to represent"));
            }
            Ok(r as i64)
        }
    }
}
