//! Parser for JSON documents.
//!
//! Hand-written recursive descent over the raw bytes with a single cursor, so that every error
//! can point at the exact byte the grammar gave up on. No token stream is built; every value is
//! allocated straight into the document's arena as soon as it is complete.

use tracing::*;

use crate::arena::{Arena, StrRef};
use crate::array::DynArray;
use crate::config::Options;
use crate::error::{ParseError, ParseErrorKind};
use crate::map::ObjectMap;
use crate::value::{Value, ValueId};

/// `(escape code, decoded byte)` pairs understood inside strings.
const ESCAPES: [(u8, u8); 8] = [
    (b'"', b'"'),
    (b'\\', b'\\'),
    (b'/', b'/'),
    (b'b', 0x08),
    (b'f', 0x0c),
    (b'n', b'\n'),
    (b'r', b'\r'),
    (b't', b'\t'),
];

/// Byte produced by the escape `\code`.
pub(crate) fn unescape_code(code: u8) -> Option<u8> {
    ESCAPES.iter().find(|(c, _)| *c == code).map(|(_, b)| *b)
}

/// Escape code to write after a backslash for `byte`, if it needs one.
pub(crate) fn escape_code(byte: u8) -> Option<u8> {
    ESCAPES.iter().find(|(_, b)| *b == byte).map(|(c, _)| *c)
}

pub(crate) struct Parser<'t, 'a> {
    text: &'t str,
    bytes: &'t [u8],
    pos: usize,
    depth: usize,
    arena: &'a mut Arena,
    options: &'a Options,
}

type PResult<T> = Result<T, ParseError>;

impl<'t, 'a> Parser<'t, 'a> {
    pub(crate) fn new(text: &'t str, arena: &'a mut Arena, options: &'a Options) -> Self {
        Parser {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            depth: 0,
            arena,
            options,
        }
    }

    /// Parse the whole text. Empty (or all-whitespace) text has no root.
    pub(crate) fn parse_root(mut self) -> PResult<Option<ValueId>> {
        self.skip_whitespace();
        let root = match self.peek() {
            None => return Ok(None),
            Some(b'{') => self.parse_object()?,
            Some(b'[') => self.parse_array()?,
            Some(_) => return Err(self.error(ParseErrorKind::InvalidRoot)),
        };

        self.skip_whitespace();
        if self.pos < self.bytes.len() {
            return Err(self.error(ParseErrorKind::TrailingCharacters));
        }
        Ok(Some(root))
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_digit(&self) -> Option<u8> {
        self.peek().filter(u8::is_ascii_digit)
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        self.error_at(kind, self.pos)
    }

    fn error_at(&self, kind: ParseErrorKind, pos: usize) -> ParseError {
        ParseError::new(kind, self.text, pos)
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn expect_literal(&mut self, literal: &'static str) -> PResult<()> {
        if self.bytes[self.pos..].starts_with(literal.as_bytes()) {
            self.pos += literal.len();
            Ok(())
        } else {
            Err(self.error(ParseErrorKind::ExpectedLiteral(literal)))
        }
    }

    fn enter(&mut self) -> PResult<()> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(self.error(ParseErrorKind::TooDeep {
                limit: self.options.max_depth,
            }));
        }
        Ok(())
    }

    fn parse_value(&mut self) -> PResult<ValueId> {
        let value = match self.peek() {
            Some(b'{') => return self.parse_object(),
            Some(b'[') => return self.parse_array(),
            Some(b'"') => Value::String(self.parse_string()?),
            Some(b't') => {
                self.expect_literal("true")?;
                Value::True
            }
            Some(b'f') => {
                self.expect_literal("false")?;
                Value::False
            }
            Some(b'n') => {
                self.expect_literal("null")?;
                Value::Null
            }
            Some(b'-' | b'0'..=b'9') => Value::Number(self.parse_number()?),
            _ => return Err(self.error(ParseErrorKind::ExpectedValue)),
        };
        Ok(self.arena.alloc(value))
    }

    fn parse_object(&mut self) -> PResult<ValueId> {
        self.enter()?;
        self.pos += 1;
        let mut map = ObjectMap::with_capacity(self.options.container_capacity);

        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
        } else {
            loop {
                self.skip_whitespace();
                if self.peek() != Some(b'"') {
                    return Err(self.error(ParseErrorKind::ExpectedString));
                }
                let key = self.parse_string()?;

                self.skip_whitespace();
                self.expect_literal(":")?;
                self.skip_whitespace();
                let value = self.parse_value()?;

                if map.insert(self.arena.pages(), key, value).is_some() {
                    trace!(key = self.arena.str(key), "duplicate key, keeping the last value");
                }

                self.skip_whitespace();
                match self.peek() {
                    Some(b',') => self.pos += 1,
                    Some(b'}') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.error(ParseErrorKind::ExpectedToken("`,` or `}`"))),
                }
            }
        }

        self.depth -= 1;
        Ok(self.arena.alloc(Value::Object(map)))
    }

    fn parse_array(&mut self) -> PResult<ValueId> {
        self.enter()?;
        self.pos += 1;
        let mut items = DynArray::with_capacity(self.options.container_capacity);

        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
        } else {
            loop {
                self.skip_whitespace();
                items.push(self.parse_value()?);

                self.skip_whitespace();
                match self.peek() {
                    Some(b',') => self.pos += 1,
                    Some(b']') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.error(ParseErrorKind::ExpectedToken("`,` or `]`"))),
                }
            }
        }

        self.depth -= 1;
        Ok(self.arena.alloc(Value::Array(items)))
    }

    /// Strings take two passes: the first validates escapes and measures the decoded length,
    /// the second decodes into exactly that many arena bytes.
    fn parse_string(&mut self) -> PResult<StrRef> {
        self.pos += 1;
        let start = self.pos;
        let mut len = 0;

        loop {
            match self.peek() {
                None | Some(b'\n') => return Err(self.error(ParseErrorKind::UnterminatedString)),
                Some(b'"') => break,
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        None => return Err(self.error(ParseErrorKind::UnterminatedString)),
                        Some(b'u') => return Err(self.error(ParseErrorKind::UnicodeEscape)),
                        Some(code) if unescape_code(code).is_some() => {
                            self.pos += 1;
                            len += 1;
                        }
                        Some(_) => {
                            let c = self.text[self.pos..].chars().next().unwrap_or_default();
                            return Err(self.error(ParseErrorKind::InvalidEscape(c)));
                        }
                    }
                }
                Some(b) if b < 0x20 => return Err(self.error(ParseErrorKind::ControlCharacter(b))),
                Some(_) => {
                    self.pos += 1;
                    len += 1;
                }
            }
        }

        let text = self.text;
        let raw = &text[start..self.pos];
        self.pos += 1;

        Ok(self.arena.alloc_with(len, |buf| decode_into(raw, buf)))
    }

    /// Digits are accumulated into a significand and a decimal exponent. Short literals are
    /// scaled by a single exact power of ten; the rest go through the standard library's
    /// correctly rounded conversion.
    fn parse_number(&mut self) -> PResult<f64> {
        let start = self.pos;
        let negative = self.peek() == Some(b'-');
        if negative {
            self.pos += 1;
        }

        let mut decimal = Decimal::default();

        match self.peek() {
            Some(b'0') => {
                self.pos += 1;
                if self.peek_digit().is_some() {
                    return Err(self.error(ParseErrorKind::LeadingZero));
                }
            }
            Some(b'1'..=b'9') => {
                while let Some(d) = self.peek_digit() {
                    decimal.push_integer(d - b'0');
                    self.pos += 1;
                }
            }
            _ => return Err(self.error(ParseErrorKind::ExpectedDigit)),
        }

        if self.peek() == Some(b'.') {
            self.pos += 1;
            if self.peek_digit().is_none() {
                return Err(self.error(ParseErrorKind::ExpectedDigit));
            }
            while let Some(d) = self.peek_digit() {
                decimal.push_fraction(d - b'0');
                self.pos += 1;
            }
        }

        if let Some(b'e' | b'E') = self.peek() {
            self.pos += 1;
            let negative_exp = match self.peek() {
                Some(b'-') => {
                    self.pos += 1;
                    true
                }
                Some(b'+') => {
                    self.pos += 1;
                    false
                }
                _ => false,
            };
            if self.peek_digit().is_none() {
                return Err(self.error(ParseErrorKind::ExpectedDigit));
            }
            let mut exp: i64 = 0;
            while let Some(d) = self.peek_digit() {
                exp = exp.saturating_mul(10).saturating_add(i64::from(d - b'0'));
                self.pos += 1;
            }
            decimal.exponent = if negative_exp {
                decimal.exponent.saturating_sub(exp)
            } else {
                decimal.exponent.saturating_add(exp)
            };
        }

        let value = match decimal.to_f64() {
            Some(magnitude) if negative => -magnitude,
            Some(magnitude) => magnitude,
            // the literal was validated above, so only overflow can make this non-finite
            None => self.text[start..self.pos].parse().unwrap_or(f64::NAN),
        };
        if !value.is_finite() {
            return Err(self.error_at(ParseErrorKind::NumberOutOfRange, start));
        }
        Ok(value)
    }
}

/// Significant digits a `u64` significand can always hold.
const MAX_DIGITS: u32 = 19;

/// Powers of ten that are exactly representable as `f64`.
const POW10: [f64; 23] = [
    1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11, 1e12, 1e13, 1e14, 1e15, 1e16,
    1e17, 1e18, 1e19, 1e20, 1e21, 1e22,
];

/// `significand * 10^exponent`, as read so far.
#[derive(Debug, Default)]
struct Decimal {
    significand: u64,
    exponent: i64,
    digits: u32,
    /// Set once a non-zero digit had to be dropped.
    truncated: bool,
}

impl Decimal {
    fn push_integer(&mut self, d: u8) {
        if !self.push(d) {
            self.exponent = self.exponent.saturating_add(1);
        }
    }

    fn push_fraction(&mut self, d: u8) {
        if self.push(d) {
            self.exponent = self.exponent.saturating_sub(1);
        }
    }

    /// Append a digit to the significand. Returns `false` if it no longer fits and was dropped.
    fn push(&mut self, d: u8) -> bool {
        if self.digits == MAX_DIGITS {
            self.truncated |= d != 0;
            return false;
        }
        self.significand = self.significand * 10 + u64::from(d);
        if self.significand != 0 {
            self.digits += 1;
        }
        true
    }

    /// The value if it can be computed with a single rounding, `None` otherwise.
    fn to_f64(&self) -> Option<f64> {
        if self.significand == 0 {
            return Some(0.0);
        }
        let power = *POW10.get(usize::try_from(self.exponent.unsigned_abs()).ok()?)?;
        if self.truncated || self.significand > 1 << 53 {
            return None;
        }
        let significand = self.significand as f64;
        Some(if self.exponent < 0 {
            significand / power
        } else {
            significand * power
        })
    }
}

/// Decode a string body already validated by the first pass.
fn decode_into(raw: &str, buf: &mut String) {
    let mut rest = raw;
    while let Some(i) = rest.find('\\') {
        buf.push_str(&rest[..i]);
        let decoded = unescape_code(rest.as_bytes()[i + 1]).unwrap_or(b'?');
        buf.push(char::from(decoded));
        rest = &rest[i + 2..];
    }
    buf.push_str(rest);
}
