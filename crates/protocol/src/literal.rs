//! Restricted literal decoding for build-number server replies.
//!
//! The server answers with the textual form of a literal mapping, for
//! example `{'next_build_num': 42}`. Only literal forms are accepted:
//! strings, numbers, `True`/`False`/`None`, lists, tuples, sets and
//! mappings. Names, calls, subscripts and operators are rejected as illegal
//! values, so nothing in a reply is ever evaluated.

use std::fmt;

use serde_json::{Map, Number, Value};

/// Deepest container nesting accepted before decoding gives up.
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Set(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("syntax error at line {line}, offset {offset}: '{text}'")]
    Syntax {
        line: usize,
        offset: usize,
        text: String,
    },

    #[error("illegal value used. (Is the resulting text not a pure literal?)")]
    IllegalValue,

    #[error("unknown parse error: {reason}")]
    Unknown { reason: String },
}

impl Literal {
    /// Converts into a JSON value tree. Tuples and sets become arrays,
    /// non-string mapping keys are rendered as literal text.
    pub fn into_json(self) -> Value {
        match self {
            Literal::None => Value::Null,
            Literal::Bool(b) => Value::Bool(b),
            Literal::Int(i) => Value::from(i),
            Literal::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
            Literal::Str(s) => Value::String(s),
            Literal::List(items) | Literal::Tuple(items) | Literal::Set(items) => {
                Value::Array(items.into_iter().map(Literal::into_json).collect())
            }
            Literal::Dict(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.into_key(), value.into_json());
                }
                Value::Object(map)
            }
        }
    }

    fn into_key(self) -> String {
        match self {
            Literal::Str(s) => s,
            other => other.to_string(),
        }
    }
}

impl From<&Value> for Literal {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Literal::None,
            Value::Bool(b) => Literal::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Literal::Int(i),
                None => Literal::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Literal::Str(s.clone()),
            Value::Array(items) => Literal::List(items.iter().map(Literal::from).collect()),
            Value::Object(map) => Literal::Dict(
                map.iter()
                    .map(|(k, v)| (Literal::Str(k.clone()), Literal::from(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => write!(f, "None"),
            Literal::Bool(true) => write!(f, "True"),
            Literal::Bool(false) => write!(f, "False"),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{:?}", x),
            Literal::Str(s) => {
                write!(f, "'")?;
                for c in s.chars() {
                    match c {
                        '\'' => write!(f, "\\'")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\r' => write!(f, "\\r")?,
                        '\t' => write!(f, "\\t")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "'")
            }
            Literal::List(items) => write_seq(f, "[", items, "]"),
            Literal::Tuple(items) if items.len() == 1 => write!(f, "({},)", items[0]),
            Literal::Tuple(items) => write_seq(f, "(", items, ")"),
            Literal::Set(items) => write_seq(f, "{", items, "}"),
            Literal::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Literal], close: &str) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "{}", close)
}

/// Decodes `text` as a single literal.
pub fn parse_literal(text: &str) -> Result<Literal, DecodeError> {
    let mut parser = Parser::new(text);
    parser.skip_blank();
    let value = parser.parse_value()?;
    parser.skip_blank();
    if parser.peek().is_some() {
        return Err(parser.unexpected());
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, depth: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
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

    /// Skips all whitespace, newlines and comments.
    fn skip_blank(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => self.skip_comment(),
                _ => break,
            }
        }
    }

    /// Skips whitespace and comments between tokens. Newlines only count as
    /// whitespace inside brackets.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some('\n') | Some('\r') if self.depth == 0 => break,
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => self.skip_comment(),
                Some('\\') if matches!(self.peek_nth(1), Some('\n')) => {
                    self.pos += 2;
                }
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn syntax_error(&self) -> DecodeError {
        self.syntax_error_at(self.pos)
    }

    fn syntax_error_at(&self, pos: usize) -> DecodeError {
        let before = &self.src[..pos];
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let line_end = self.src[pos..].find('\n').map_or(self.src.len(), |i| pos + i);

        DecodeError::Syntax {
            line: before.matches('\n').count() + 1,
            offset: self.src[line_start..pos].chars().count() + 1,
            text: self.src[line_start..line_end].trim_end().to_string(),
        }
    }

    /// Error for a token found where a separator or the end was expected.
    /// Continuations that would form a valid expression are illegal values,
    /// anything else is a syntax error.
    fn unexpected(&self) -> DecodeError {
        let src = self.src;
        let rest = &src[self.pos..];
        let Some(c) = rest.chars().next() else {
            return self.syntax_error();
        };

        let continues_expression = match c {
            '+' | '-' | '*' | '/' | '%' | '@' | '&' | '|' | '^' | '<' | '>' | '.' | '(' | '[' => {
                true
            }
            '=' | '!' => rest[1..].starts_with('='),
            c if is_ident_start(c) => {
                let word = take_ident(rest);
                matches!(word, "and" | "or" | "if" | "in" | "is" | "not")
            }
            _ => false,
        };

        if continues_expression {
            DecodeError::IllegalValue
        } else {
            self.syntax_error()
        }
    }

    fn enter(&mut self) -> Result<(), DecodeError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(DecodeError::Unknown {
                reason: format!("nesting deeper than {} levels", MAX_NESTING),
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_value(&mut self) -> Result<Literal, DecodeError> {
        self.skip_trivia();
        match self.peek() {
            None => Err(self.syntax_error()),
            Some('[') => {
                self.enter()?;
                let items = self.parse_items(']')?;
                self.leave();
                Ok(Literal::List(items))
            }
            Some('(') => {
                self.enter()?;
                let value = self.parse_paren()?;
                self.leave();
                Ok(value)
            }
            Some('{') => {
                self.enter()?;
                let value = self.parse_brace()?;
                self.leave();
                Ok(value)
            }
            Some('+') | Some('-') => self.parse_signed(),
            Some('\'') | Some('"') => self.parse_strings(false),
            Some(c) if c.is_ascii_digit() => self.parse_number(false),
            Some('.') if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.parse_number(false)
            }
            Some(c) if is_ident_start(c) => self.parse_name(),
            Some(_) => Err(self.syntax_error()),
        }
    }

    /// Comma-separated values up to `close`, trailing comma allowed. The
    /// opening bracket is still pending.
    fn parse_items(&mut self, close: char) -> Result<Vec<Literal>, DecodeError> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.parse_value()?);
            self.skip_trivia();
            if self.eat(close) {
                return Ok(items);
            }
            if !self.eat(',') {
                return Err(self.unexpected());
            }
        }
    }

    fn parse_paren(&mut self) -> Result<Literal, DecodeError> {
        self.bump();
        self.skip_trivia();
        if self.eat(')') {
            return Ok(Literal::Tuple(Vec::new()));
        }

        let first = self.parse_value()?;
        self.skip_trivia();
        if self.eat(')') {
            return Ok(first);
        }
        if !self.eat(',') {
            return Err(self.unexpected());
        }

        let mut items = vec![first];
        loop {
            self.skip_trivia();
            if self.eat(')') {
                return Ok(Literal::Tuple(items));
            }
            items.push(self.parse_value()?);
            self.skip_trivia();
            if self.eat(')') {
                return Ok(Literal::Tuple(items));
            }
            if !self.eat(',') {
                return Err(self.unexpected());
            }
        }
    }

    fn parse_brace(&mut self) -> Result<Literal, DecodeError> {
        self.bump();
        self.skip_trivia();
        if self.eat('}') {
            return Ok(Literal::Dict(Vec::new()));
        }

        let first = self.parse_value()?;
        self.skip_trivia();
        if self.eat(':') {
            let value = self.parse_value()?;
            return self.parse_dict_rest(vec![(first, value)]);
        }

        let mut items = vec![first];
        loop {
            if self.eat('}') {
                return Ok(Literal::Set(items));
            }
            if !self.eat(',') {
                return Err(self.unexpected());
            }
            self.skip_trivia();
            if self.eat('}') {
                return Ok(Literal::Set(items));
            }
            items.push(self.parse_value()?);
            self.skip_trivia();
        }
    }

    fn parse_dict_rest(
        &mut self,
        mut entries: Vec<(Literal, Literal)>,
    ) -> Result<Literal, DecodeError> {
        loop {
            self.skip_trivia();
            if self.eat('}') {
                return Ok(Literal::Dict(entries));
            }
            if !self.eat(',') {
                return Err(self.unexpected());
            }
            self.skip_trivia();
            if self.eat('}') {
                return Ok(Literal::Dict(entries));
            }

            let key = self.parse_value()?;
            self.skip_trivia();
            if !self.eat(':') {
                return Err(self.syntax_error());
            }
            let value = self.parse_value()?;
            entries.push((key, value));
        }
    }

    fn parse_signed(&mut self) -> Result<Literal, DecodeError> {
        // Only a single sign directly applied to a number is a literal.
        let mut signs = 0usize;
        let mut negative = false;
        while let Some(sign @ ('+' | '-')) = self.peek() {
            self.bump();
            signs += 1;
            negative = sign == '-';
            self.skip_trivia();
        }

        let operand_is_number = match self.peek() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()),
            None => return Err(self.syntax_error()),
            Some(_) => false,
        };

        if operand_is_number {
            let number = self.parse_number(negative)?;
            if signs > 1 {
                return Err(DecodeError::IllegalValue);
            }
            return Ok(number);
        }

        // Anything after a sign that still parses is a non-literal
        // expression; surface a syntax error if it does not.
        self.parse_value()?;
        Err(DecodeError::IllegalValue)
    }

    fn parse_number(&mut self, negative: bool) -> Result<Literal, DecodeError> {
        let start = self.pos;

        if self.peek() == Some('0') {
            let radix = match self.peek_nth(1) {
                Some('x') | Some('X') => Some(16),
                Some('o') | Some('O') => Some(8),
                Some('b') | Some('B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.pos += 2;
                // A separator may follow the radix prefix.
                if self.peek() == Some('_') {
                    self.bump();
                }
                let digits = self.scan_digits(radix).ok_or_else(|| self.syntax_error())?;
                self.finish_number()?;
                return int_literal(&digits, radix, negative);
            }
        }

        let mut text = String::new();
        if self.peek() != Some('.') {
            text.push_str(&self.scan_digits(10).ok_or_else(|| self.syntax_error())?);
        }

        let mut is_float = false;
        if self.peek() == Some('.') {
            self.bump();
            is_float = true;
            text.push('.');
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                text.push_str(&self.scan_digits(10).ok_or_else(|| self.syntax_error())?);
            }
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let has_digits = match self.peek_nth(1) {
                Some('+') | Some('-') => self.peek_nth(2).is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if has_digits {
                self.bump();
                is_float = true;
                text.push('e');
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    self.bump();
                    text.push(sign);
                }
                text.push_str(&self.scan_digits(10).ok_or_else(|| self.syntax_error())?);
            }
        }

        self.finish_number()?;

        if is_float {
            let value: f64 = text.parse().map_err(|_| self.syntax_error_at(start))?;
            return Ok(Literal::Float(if negative { -value } else { value }));
        }

        // Decimal integers may not carry leading zeros, except for zero itself.
        if text.len() > 1 && text.starts_with('0') && text.chars().any(|c| c != '0') {
            return Err(self.syntax_error_at(start));
        }
        int_literal(&text, 10, negative)
    }

    /// Digits in `radix` with single `_` separators between them.
    fn scan_digits(&mut self, radix: u32) -> Option<String> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_digit(radix) {
                digits.push(c);
                self.bump();
            } else if c == '_'
                && !digits.is_empty()
                && self.peek_nth(1).is_some_and(|n| n.is_digit(radix))
            {
                self.bump();
            } else {
                break;
            }
        }
        (!digits.is_empty()).then_some(digits)
    }

    /// A number must not run straight into a name character.
    fn finish_number(&self) -> Result<(), DecodeError> {
        match self.peek() {
            Some('j') | Some('J') => Err(DecodeError::IllegalValue),
            Some(c) if is_ident_continue(c) => Err(self.syntax_error()),
            _ => Ok(()),
        }
    }

    fn parse_name(&mut self) -> Result<Literal, DecodeError> {
        let start = self.pos;
        let src = self.src;
        let word = take_ident(&src[self.pos..]);
        self.pos += word.len();

        if matches!(self.peek(), Some('\'') | Some('"')) {
            if let Some(prefix) = StringPrefix::parse(word) {
                let value = self.parse_strings(prefix.raw)?;
                return if prefix.literal {
                    Ok(value)
                } else {
                    Err(DecodeError::IllegalValue)
                };
            }
            return Err(self.syntax_error_at(start));
        }

        match word {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            _ => Err(DecodeError::IllegalValue),
        }
    }

    /// One string plus any adjacent strings, which concatenate.
    fn parse_strings(&mut self, raw: bool) -> Result<Literal, DecodeError> {
        let mut acc = self.parse_string_body(raw)?;

        loop {
            self.skip_trivia();
            match self.peek() {
                Some('\'') | Some('"') => acc.push_str(&self.parse_string_body(false)?),
                Some(c) if is_ident_start(c) => {
                    let src = self.src;
                    let word = take_ident(&src[self.pos..]);
                    let after = src[self.pos + word.len()..].chars().next();
                    let Some(prefix) = StringPrefix::parse(word) else {
                        break;
                    };
                    if !matches!(after, Some('\'') | Some('"')) {
                        break;
                    }
                    self.pos += word.len();
                    let part = self.parse_string_body(prefix.raw)?;
                    if !prefix.literal {
                        return Err(DecodeError::IllegalValue);
                    }
                    acc.push_str(&part);
                }
                _ => break,
            }
        }

        Ok(Literal::Str(acc))
    }

    fn parse_string_body(&mut self, raw: bool) -> Result<String, DecodeError> {
        let start = self.pos;
        let Some(quote) = self.bump() else {
            return Err(self.syntax_error());
        };
        let triple = self.peek() == Some(quote) && self.peek_nth(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(self.syntax_error_at(start));
            };

            if c == quote {
                if !triple {
                    return Ok(out);
                }
                if self.peek() == Some(quote) && self.peek_nth(1) == Some(quote) {
                    self.pos += 2;
                    return Ok(out);
                }
                out.push(c);
                continue;
            }

            match c {
                '\n' if !triple => return Err(self.syntax_error_at(start)),
                '\\' if raw => {
                    out.push('\\');
                    match self.bump() {
                        Some(next) => out.push(next),
                        None => return Err(self.syntax_error_at(start)),
                    }
                }
                '\\' => self.parse_escape(&mut out, start)?,
                c => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String, start: usize) -> Result<(), DecodeError> {
        let Some(c) = self.bump() else {
            return Err(self.syntax_error_at(start));
        };

        match c {
            '\n' => {}
            '\\' | '\'' | '"' => out.push(c),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.bump();
                        }
                        None => break,
                    }
                }
                out.push(self.code_point(code, start)?);
            }
            'x' => out.push(self.hex_escape(2, start)?),
            'u' => out.push(self.hex_escape(4, start)?),
            'U' => out.push(self.hex_escape(8, start)?),
            'N' => {
                return Err(DecodeError::Unknown {
                    reason: "named unicode escapes are not supported".to_string(),
                })
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, len: usize, start: usize) -> Result<char, DecodeError> {
        let mut code = 0u32;
        for _ in 0..len {
            let digit = self
                .peek()
                .and_then(|d| d.to_digit(16))
                .ok_or_else(|| self.syntax_error_at(start))?;
            code = code * 16 + digit;
            self.bump();
        }
        self.code_point(code, start)
    }

    fn code_point(&self, code: u32, start: usize) -> Result<char, DecodeError> {
        char::from_u32(code).ok_or_else(|| self.syntax_error_at(start))
    }
}

struct StringPrefix {
    raw: bool,
    /// `false` for byte and formatted strings, which are not plain text.
    literal: bool,
}

impl StringPrefix {
    fn parse(word: &str) -> Option<Self> {
        let lower = word.to_ascii_lowercase();
        match lower.as_str() {
            "r" => Some(Self { raw: true, literal: true }),
            "u" => Some(Self { raw: false, literal: true }),
            "b" | "f" => Some(Self { raw: false, literal: false }),
            "br" | "rb" | "fr" | "rf" => Some(Self { raw: true, literal: false }),
            _ => None,
        }
    }
}

fn int_literal(digits: &str, radix: u32, negative: bool) -> Result<Literal, DecodeError> {
    let out_of_range = || DecodeError::Unknown {
        reason: format!("integer literal {} is out of range", digits),
    };

    let magnitude = i128::from_str_radix(digits, radix).map_err(|_| out_of_range())?;
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value)
        .map(Literal::Int)
        .map_err(|_| out_of_range())
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn take_ident(s: &str) -> &str {
    let end = s
        .char_indices()
        .find(|&(_, c)| !is_ident_continue(c))
        .map_or(s.len(), |(i, _)| i);
    &s[..end]
}
