//! Strict parser for Python literal syntax.
//!
//! Nested cells in the input CSVs are produced by Python's `str()` of a dict, so they use Python
//! literal syntax rather than JSON (single quotes, `True`/`None`, tuples as keys). [`parse`]
//! accepts the same closed grammar as `ast.literal_eval` for plain data: strings, bytes, numbers
//! with an optional sign, `True`/`False`/`None`, lists, tuples, sets and dicts. Anything else is a
//! [`LiteralError`]. Nothing is ever evaluated.

use std::fmt;

use thiserror::Error;

/// Maximum container nesting accepted by [`parse`].
pub const MAX_DEPTH: usize = 100;

/// A parsed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Set(Vec<Literal>),
    /// Entries in insertion order. A repeated key keeps its first position and the last value.
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    /// Returns the entries if this is a dict.
    pub fn as_dict(&self) -> Option<&[(Literal, Literal)]> {
        match self {
            Self::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Python `repr()` of the value.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        write_repr(&mut out, self);
        out
    }
}

/// Renders Python `str()`: top-level strings are unquoted, everything else is its `repr()`.
impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            other => f.write_str(&other.repr()),
        }
    }
}

/// Error returned when the input is not a plain literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid literal at offset {offset}: {message}")]
pub struct LiteralError {
    /// Byte offset into the input where parsing stopped.
    pub offset: usize,
    pub message: String,
}

/// Parse `input` as a single literal. Surrounding whitespace is ignored.
pub fn parse(input: &str) -> Result<Literal, LiteralError> {
    let mut parser = Parser { src: input, pos: 0 };
    parser.skip_ws();
    let value = parser.value(0)?;
    parser.skip_ws();
    if parser.pos != input.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

/// Python `repr()` of a float: shortest round-trip digits, scientific notation outside
/// `1e-4 <= |v| < 1e16`, and a trailing `.0` for integral values.
pub fn python_float_repr(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let sci = format!("{v:e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if (-4..16).contains(&exp) {
        let plain = v.to_string();
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

enum StrKind {
    Text(String),
    Bytes(Vec<u8>),
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' || c == '\n' || c == '\r' || c == '\x0c' {
                self.pos += 1;
            } else if c == '\\' && matches!(self.peek_nth(1), Some('\n')) {
                // explicit line continuation
                self.pos += 2;
            } else {
                break;
            }
        }
    }

    fn value(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('+') | Some('-') => self.signed_number(),
            Some(c) if c.is_ascii_digit() => self.number(false),
            Some('.') if matches!(self.peek_nth(1), Some(d) if d.is_ascii_digit()) => self.number(false),
            Some('\'') | Some('"') => self.strings(),
            Some('[') => {
                self.bump();
                let items = self.sequence(']', depth)?;
                Ok(Literal::List(items))
            }
            Some('(') => self.paren(depth),
            Some('{') => self.brace(depth),
            Some(c) if c.is_alphabetic() || c == '_' => self.name_or_prefixed_string(),
            Some(c) => Err(self.error(format!("unexpected character {c:?}"))),
        }
    }

    fn signed_number(&mut self) -> Result<Literal, LiteralError> {
        let negative = self.bump() == Some('-');
        self.skip_ws();
        match self.peek() {
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(negative),
            _ => Err(self.error("unary sign must be followed by a number")),
        }
    }

    fn number(&mut self, negative: bool) -> Result<Literal, LiteralError> {
        let start = self.pos;
        let radix_prefixed = self.rest().len() > 1
            && self.rest().starts_with('0')
            && matches!(self.peek_nth(1), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B'));

        let mut prev = '\0';
        while let Some(c) = self.peek() {
            let sign_after_exp = !radix_prefixed && (c == '+' || c == '-') && matches!(prev, 'e' | 'E');
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || sign_after_exp {
                prev = c;
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let token = &self.src[start..self.pos];
        let at = start;
        let fail = |message: &str| LiteralError {
            offset: at,
            message: format!("{message}: {token:?}"),
        };

        if token.ends_with(['j', 'J']) {
            return Err(fail("complex numbers are not supported"));
        }
        if token.starts_with('_') || token.ends_with('_') || token.contains("__") {
            return Err(fail("misplaced underscore in number"));
        }
        let digits: String = token.chars().filter(|&c| c != '_').collect();

        if radix_prefixed {
            let radix = match digits.as_bytes().get(1) {
                Some(b'x' | b'X') => 16,
                Some(b'o' | b'O') => 8,
                _ => 2,
            };
            let body = &digits[2..];
            let magnitude = i64::from_str_radix(body, radix).map_err(|_| fail("invalid integer"))?;
            return Ok(Literal::Int(if negative { -magnitude } else { magnitude }));
        }

        let is_float = digits.contains(['.', 'e', 'E']);
        if is_float {
            if !digits.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) {
                return Err(fail("invalid float"));
            }
            let v: f64 = digits.parse().map_err(|_| fail("invalid float"))?;
            return Ok(Literal::Float(if negative { -v } else { v }));
        }

        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(fail("invalid integer"));
        }
        if digits.len() > 1 && digits.starts_with('0') && digits.chars().any(|c| c != '0') {
            return Err(fail("leading zeros in decimal integer"));
        }
        let text = if negative { format!("-{digits}") } else { digits };
        text.parse::<i64>()
            .map(Literal::Int)
            .map_err(|_| fail("integer out of range"))
    }

    fn name_or_prefixed_string(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let name = &self.src[start..self.pos];

        if matches!(self.peek(), Some('\'' | '"')) {
            if is_string_prefix(name) {
                self.pos = start;
                return self.strings();
            }
            return Err(LiteralError {
                offset: start,
                message: format!("unsupported string prefix {name:?}"),
            });
        }

        match name {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            "set" => {
                self.skip_ws();
                if self.eat('(') {
                    self.skip_ws();
                    if self.eat(')') {
                        return Ok(Literal::Set(Vec::new()));
                    }
                }
                Err(self.error("only the empty call set() is allowed"))
            }
            other => Err(LiteralError {
                offset: start,
                message: format!("names are not literals: {other:?}"),
            }),
        }
    }

    /// One or more adjacent string literals, concatenated.
    fn strings(&mut self) -> Result<Literal, LiteralError> {
        let mut acc = self.string()?;
        loop {
            let save = self.pos;
            self.skip_ws();
            if !self.at_string_start() {
                self.pos = save;
                break;
            }
            let next = self.string()?;
            acc = match (acc, next) {
                (StrKind::Text(mut a), StrKind::Text(b)) => {
                    a.push_str(&b);
                    StrKind::Text(a)
                }
                (StrKind::Bytes(mut a), StrKind::Bytes(b)) => {
                    a.extend_from_slice(&b);
                    StrKind::Bytes(a)
                }
                _ => return Err(self.error("cannot mix bytes and non-bytes literals")),
            };
        }
        Ok(match acc {
            StrKind::Text(s) => Literal::Str(s),
            StrKind::Bytes(b) => Literal::Bytes(b),
        })
    }

    fn at_string_start(&self) -> bool {
        let rest = self.rest();
        let prefix_len = rest
            .chars()
            .take_while(|c| matches!(c, 'r' | 'R' | 'u' | 'U' | 'b' | 'B'))
            .count();
        is_string_prefix(&rest[..prefix_len]) && matches!(self.peek_nth(prefix_len), Some('\'' | '"'))
    }

    fn string(&mut self) -> Result<StrKind, LiteralError> {
        let mut raw = false;
        let mut bytes = false;
        while let Some(c) = self.peek() {
            match c {
                'r' | 'R' => raw = true,
                'b' | 'B' => bytes = true,
                'u' | 'U' => {}
                _ => break,
            }
            self.pos += 1;
        }

        let quote = match self.bump() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected string quote")),
        };
        let triple = self.peek() == Some(quote) && self.peek_nth(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let c = self.bump().ok_or_else(|| self.error("unterminated string literal"))?;
            if c == quote {
                if !triple {
                    break;
                }
                if self.peek() == Some(quote) && self.peek_nth(1) == Some(quote) {
                    self.pos += 2;
                    break;
                }
                out.push(c);
                continue;
            }
            if c == '\n' && !triple {
                return Err(self.error("newline in single-quoted string"));
            }
            if c != '\\' {
                if bytes && !c.is_ascii() {
                    return Err(self.error("bytes can only contain ASCII literal characters"));
                }
                out.push(c);
                continue;
            }

            let esc = self.bump().ok_or_else(|| self.error("unterminated string literal"))?;
            if raw {
                out.push('\\');
                out.push(esc);
                continue;
            }
            self.escape(esc, bytes, &mut out)?;
        }

        if bytes {
            let mut buf = Vec::with_capacity(out.len());
            for c in out.chars() {
                let byte = u8::try_from(u32::from(c))
                    .map_err(|_| self.error("byte escape out of range"))?;
                buf.push(byte);
            }
            Ok(StrKind::Bytes(buf))
        } else {
            Ok(StrKind::Text(out))
        }
    }

    fn escape(&mut self, esc: char, bytes: bool, out: &mut String) -> Result<(), LiteralError> {
        match esc {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut code = esc.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                out.push(self.code_point(code)?);
            }
            'x' => {
                let code = self.hex_digits(2)?;
                out.push(self.code_point(code)?);
            }
            'u' if !bytes => {
                let code = self.hex_digits(4)?;
                out.push(self.code_point(code)?);
            }
            'U' if !bytes => {
                let code = self.hex_digits(8)?;
                out.push(self.code_point(code)?);
            }
            'N' if !bytes => return Err(self.error("named unicode escapes are not supported")),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_digits(&mut self, n: usize) -> Result<u32, LiteralError> {
        let mut code = 0u32;
        for _ in 0..n {
            let d = self
                .peek()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("truncated hex escape"))?;
            code = code * 16 + d;
            self.pos += 1;
        }
        Ok(code)
    }

    fn code_point(&self, code: u32) -> Result<char, LiteralError> {
        char::from_u32(code).ok_or_else(|| self.error("escape is not a valid code point"))
    }

    /// Comma-separated values up to `close`; trailing comma allowed. The opening bracket has
    /// already been consumed.
    fn sequence(&mut self, close: char, depth: usize) -> Result<Vec<Literal>, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.value(depth + 1)?);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            if self.eat(close) {
                return Ok(items);
            }
            return Err(self.error(format!("expected ',' or '{close}'")));
        }
    }

    fn paren(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.bump();
        self.skip_ws();
        if self.eat(')') {
            return Ok(Literal::Tuple(Vec::new()));
        }
        let first = self.value(depth + 1)?;
        self.skip_ws();
        if self.eat(')') {
            // parenthesized expression, not a tuple
            return Ok(first);
        }
        if !self.eat(',') {
            return Err(self.error("expected ',' or ')'"));
        }
        let mut items = vec![first];
        items.extend(self.sequence(')', depth)?);
        Ok(Literal::Tuple(items))
    }

    fn brace(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.bump();
        self.skip_ws();
        if self.eat('}') {
            return Ok(Literal::Dict(Vec::new()));
        }

        let first = self.value(depth + 1)?;
        self.skip_ws();
        if !self.eat(':') {
            let mut items = vec![first];
            if !self.eat('}') {
                if !self.eat(',') {
                    return Err(self.error("expected ',' or '}'"));
                }
                items.extend(self.sequence('}', depth)?);
            }
            let mut unique: Vec<Literal> = Vec::with_capacity(items.len());
            for item in items {
                if !is_hashable(&item) {
                    return Err(self.error("unhashable set element"));
                }
                if !unique.contains(&item) {
                    unique.push(item);
                }
            }
            return Ok(Literal::Set(unique));
        }

        let mut entries: Vec<(Literal, Literal)> = Vec::new();
        let mut key = first;
        loop {
            if !is_hashable(&key) {
                return Err(self.error("unhashable dict key"));
            }
            self.skip_ws();
            let value = self.value(depth + 1)?;
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => entries.push((key, value)),
            }

            self.skip_ws();
            if self.eat('}') {
                return Ok(Literal::Dict(entries));
            }
            if !self.eat(',') {
                return Err(self.error("expected ',' or '}'"));
            }
            self.skip_ws();
            if self.eat('}') {
                return Ok(Literal::Dict(entries));
            }
            key = self.value(depth + 1)?;
            self.skip_ws();
            if !self.eat(':') {
                return Err(self.error("expected ':' after dict key"));
            }
        }
    }
}

/// String prefixes accepted before a quote: none, `r`, `u`, `b`, `br` or `rb` in any case.
fn is_string_prefix(prefix: &str) -> bool {
    matches!(
        prefix.to_ascii_lowercase().as_str(),
        "" | "r" | "u" | "b" | "br" | "rb"
    )
}

fn is_hashable(value: &Literal) -> bool {
    match value {
        Literal::List(_) | Literal::Set(_) | Literal::Dict(_) => false,
        Literal::Tuple(items) => items.iter().all(is_hashable),
        _ => true,
    }
}

fn write_repr(out: &mut String, value: &Literal) {
    match value {
        Literal::None => out.push_str("None"),
        Literal::Bool(true) => out.push_str("True"),
        Literal::Bool(false) => out.push_str("False"),
        Literal::Int(v) => out.push_str(&v.to_string()),
        Literal::Float(v) => out.push_str(&python_float_repr(*v)),
        Literal::Str(s) => write_str_repr(out, s),
        Literal::Bytes(b) => write_bytes_repr(out, b),
        Literal::List(items) => write_items(out, '[', ']', items),
        Literal::Tuple(items) if items.len() == 1 => {
            out.push('(');
            write_repr(out, &items[0]);
            out.push_str(",)");
        }
        Literal::Tuple(items) => write_items(out, '(', ')', items),
        Literal::Set(items) if items.is_empty() => out.push_str("set()"),
        Literal::Set(items) => write_items(out, '{', '}', items),
        Literal::Dict(entries) => {
            out.push('{');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_repr(out, k);
                out.push_str(": ");
                write_repr(out, v);
            }
            out.push('}');
        }
    }
}

fn write_items(out: &mut String, open: char, close: char, items: &[Literal]) {
    out.push(open);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_repr(out, item);
    }
    out.push(close);
}

fn write_str_repr(out: &mut String, s: &str) {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push(quote);
}

fn write_bytes_repr(out: &mut String, b: &[u8]) {
    let quote = if b.contains(&b'\'') && !b.contains(&b'"') { '"' } else { '\'' };
    out.push('b');
    out.push(quote);
    for &byte in b {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            c if char::from(c) == quote => {
                out.push('\\');
                out.push(quote);
            }
            0x20..=0x7e => out.push(char::from(byte)),
            _ => out.push_str(&format!("\\x{byte:02x}")),
        }
    }
    out.push(quote);
}
