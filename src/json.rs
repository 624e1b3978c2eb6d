//! JSON utilities: a canonical compact writer and a pull tokenizer.
//!
//! The writer is `serde_json` with a tweaked formatter so that the output
//! matches the canonical form used on Antelope chains. The tokenizer feeds
//! the strict (streaming) JSON → binary encoder: it delivers numbers as raw
//! text so that 64-bit and 128-bit ranges can be checked exactly, and it
//! borrows string payloads from the input whenever they contain no escape.

use std::borrow::Cow;
use std::io;

use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, Serializer};
use snafu::{ensure, Snafu};

pub use serde_json::from_str;


// -----------------------------------------------------------------------------
//     Canonical writer
// -----------------------------------------------------------------------------

pub struct EOSFormatter {
    base: CompactFormatter,
}

/// JSON formatter with the following differences to `serde_json::Formatter`:
///  - `u128` and `i128` are implemented and are represented as strings
///    (ie: double-quoted)
///  - `f32` and `f64` never use scientific notation, and floats that have no
///    fractional part do not get a trailing ".0"
impl EOSFormatter {
    fn new() -> Self {
        EOSFormatter { base: CompactFormatter {} }
    }
}

impl Formatter for EOSFormatter {
    #[inline]
    fn write_u128<W>(&mut self, writer: &mut W, value: u128) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b"\"")?;
        self.base.write_u128(writer, value)?;
        writer.write_all(b"\"")
    }

    #[inline]
    fn write_i128<W>(&mut self, writer: &mut W, value: i128) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b"\"")?;
        self.base.write_i128(writer, value)?;
        writer.write_all(b"\"")
    }

    #[inline]
    fn write_f32<W>(&mut self, writer: &mut W, value: f32) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        // use this instead of the default impl that uses Ryu in order to
        // ensure that we never use scientific notation
        write!(writer, "{}", value)
    }

    #[inline]
    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        // use this instead of the default impl that uses Ryu in order to
        // ensure that we never use scientific notation
        write!(writer, "{}", value)
    }
}

pub fn to_string<T>(value: &T) -> serde_json::Result<String>
where
    T: ?Sized + Serialize,
{
    let fmt = EOSFormatter::new();
    let mut vec = Vec::with_capacity(128);
    let mut ser = Serializer::with_formatter(&mut vec, fmt);
    value.serialize(&mut ser)?;
    let string = unsafe {
        // We do not emit invalid UTF-8.
        String::from_utf8_unchecked(vec)
    };
    Ok(string)
}


// -----------------------------------------------------------------------------
//     Pull tokenizer
// -----------------------------------------------------------------------------

#[derive(Debug, Snafu, Clone)]
pub enum JsonTokenError {
    #[snafu(display("expected JSON value at offset {pos}"))]
    ExpectedValue { pos: usize },

    #[snafu(display("unterminated string starting at offset {pos}"))]
    UnterminatedString { pos: usize },

    #[snafu(display("invalid escape sequence at offset {pos}"))]
    InvalidEscape { pos: usize },

    #[snafu(display("invalid \\u escape at offset {pos}"))]
    InvalidUnicodeEscape { pos: usize },

    #[snafu(display("control character inside string at offset {pos}"))]
    ControlCharacter { pos: usize },

    #[snafu(display("invalid number at offset {pos}"))]
    InvalidNumber { pos: usize },

    #[snafu(display("expected ':' at offset {pos}"))]
    ExpectedColon { pos: usize },

    #[snafu(display("expected ',' or closing bracket at offset {pos}"))]
    ExpectedCommaOrEnd { pos: usize },

    #[snafu(display("expected object key at offset {pos}"))]
    ExpectedKey { pos: usize },

    #[snafu(display("unexpected trailing characters at offset {pos}"))]
    TrailingCharacters { pos: usize },

    #[snafu(display("unexpected end of input"))]
    UnexpectedEnd,
}

type Result<T, E = JsonTokenError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq)]
pub enum JsonToken<'a> {
    Null,
    Bool(bool),
    /// A number, kept as its raw text so the consumer can parse it with
    /// exact range checks.
    Number(&'a str),
    Str(Cow<'a, str>),
    Key(Cow<'a, str>),
    StartObject,
    EndObject,
    StartArray,
    EndArray,
}

enum Frame {
    Object { has_entries: bool, awaiting_value: bool },
    Array { has_entries: bool },
}

/// Pull parser over a JSON text.
///
/// [`Tokenizer::next`] consumes one token, [`Tokenizer::peek`] is idempotent.
/// Structural commas and colons are consumed internally and never surface as
/// tokens. After the top-level value, [`Tokenizer::expect_end`] checks that
/// only whitespace remains.
pub struct Tokenizer<'a> {
    input: &'a [u8],
    text: &'a str,
    pos: usize,
    stack: Vec<Frame>,
    peeked: Option<JsonToken<'a>>,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Tokenizer {
            input: text.as_bytes(),
            text,
            pos: 0,
            stack: vec![],
            peeked: None,
            done: false,
        }
    }

    /// Nesting depth of the structural stack (objects + arrays currently open).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn peek(&mut self) -> Result<&JsonToken<'a>> {
        if self.peeked.is_none() {
            let tok = self.advance()?;
            self.peeked = Some(tok);
        }
        Ok(self.peeked.as_ref().unwrap())  // safe unwrap
    }

    pub fn next(&mut self) -> Result<JsonToken<'a>> {
        match self.peeked.take() {
            Some(tok) => Ok(tok),
            None => self.advance(),
        }
    }

    /// Check that the whole input has been consumed (only trailing whitespace
    /// is allowed).
    pub fn expect_end(&mut self) -> Result<()> {
        ensure!(self.peeked.is_none(), TrailingCharactersSnafu { pos: self.pos });
        self.skip_ws();
        ensure!(self.pos == self.input.len(), TrailingCharactersSnafu { pos: self.pos });
        Ok(())
    }

    fn skip_ws(&mut self) {
        while let Some(&c) = self.input.get(self.pos) {
            match c {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                _ => break,
            }
        }
    }

    fn advance(&mut self) -> Result<JsonToken<'a>> {
        self.skip_ws();

        match self.stack.last() {
            None => {
                ensure!(!self.done, TrailingCharactersSnafu { pos: self.pos });
                self.parse_value()
            },
            Some(Frame::Object { awaiting_value: true, .. }) => self.parse_value(),
            Some(Frame::Object { has_entries, .. }) => {
                let has_entries = *has_entries;
                match self.input.get(self.pos) {
                    Some(b'}') => {
                        self.pos += 1;
                        self.pop_frame();
                        Ok(JsonToken::EndObject)
                    },
                    Some(b',') if has_entries => {
                        self.pos += 1;
                        self.skip_ws();
                        self.parse_key()
                    },
                    Some(b'"') if !has_entries => self.parse_key(),
                    Some(_) => {
                        if has_entries {
                            ExpectedCommaOrEndSnafu { pos: self.pos }.fail()
                        } else {
                            ExpectedKeySnafu { pos: self.pos }.fail()
                        }
                    },
                    None => UnexpectedEndSnafu.fail(),
                }
            },
            Some(Frame::Array { has_entries }) => {
                let has_entries = *has_entries;
                match self.input.get(self.pos) {
                    Some(b']') => {
                        self.pos += 1;
                        self.pop_frame();
                        Ok(JsonToken::EndArray)
                    },
                    Some(b',') if has_entries => {
                        self.pos += 1;
                        self.skip_ws();
                        self.parse_value()
                    },
                    Some(_) if !has_entries => self.parse_value(),
                    Some(_) => ExpectedCommaOrEndSnafu { pos: self.pos }.fail(),
                    None => UnexpectedEndSnafu.fail(),
                }
            },
        }
    }

    fn pop_frame(&mut self) {
        self.stack.pop();
        match self.stack.last_mut() {
            None => self.done = true,
            Some(Frame::Object { awaiting_value, has_entries }) => {
                *awaiting_value = false;
                *has_entries = true;
            },
            Some(Frame::Array { has_entries }) => *has_entries = true,
        }
    }

    // record on the enclosing frame that a value is being consumed
    fn mark_value(&mut self) {
        match self.stack.last_mut() {
            None => self.done = true,
            Some(Frame::Object { awaiting_value, has_entries }) => {
                *awaiting_value = false;
                *has_entries = true;
            },
            Some(Frame::Array { has_entries }) => *has_entries = true,
        }
    }

    fn parse_key(&mut self) -> Result<JsonToken<'a>> {
        ensure!(self.input.get(self.pos) == Some(&b'"'), ExpectedKeySnafu { pos: self.pos });
        let key = self.parse_string_payload()?;
        self.skip_ws();
        ensure!(self.input.get(self.pos) == Some(&b':'), ExpectedColonSnafu { pos: self.pos });
        self.pos += 1;
        if let Some(Frame::Object { awaiting_value, .. }) = self.stack.last_mut() {
            *awaiting_value = true;
        }
        Ok(JsonToken::Key(key))
    }

    fn parse_value(&mut self) -> Result<JsonToken<'a>> {
        match self.input.get(self.pos) {
            Some(b'n') => {
                self.expect_literal("null")?;
                self.mark_value();
                Ok(JsonToken::Null)
            },
            Some(b't') => {
                self.expect_literal("true")?;
                self.mark_value();
                Ok(JsonToken::Bool(true))
            },
            Some(b'f') => {
                self.expect_literal("false")?;
                self.mark_value();
                Ok(JsonToken::Bool(false))
            },
            Some(b'"') => {
                let s = self.parse_string_payload()?;
                self.mark_value();
                Ok(JsonToken::Str(s))
            },
            Some(b'{') => {
                self.pos += 1;
                self.mark_value();
                self.stack.push(Frame::Object { has_entries: false, awaiting_value: false });
                Ok(JsonToken::StartObject)
            },
            Some(b'[') => {
                self.pos += 1;
                self.mark_value();
                self.stack.push(Frame::Array { has_entries: false });
                Ok(JsonToken::StartArray)
            },
            Some(b'-') | Some(b'0'..=b'9') => {
                let n = self.parse_number()?;
                self.mark_value();
                Ok(JsonToken::Number(n))
            },
            Some(_) => ExpectedValueSnafu { pos: self.pos }.fail(),
            None => UnexpectedEndSnafu.fail(),
        }
    }

    fn expect_literal(&mut self, lit: &str) -> Result<()> {
        ensure!(self.input[self.pos..].starts_with(lit.as_bytes()),
                ExpectedValueSnafu { pos: self.pos });
        self.pos += lit.len();
        Ok(())
    }

    fn parse_number(&mut self) -> Result<&'a str> {
        let start = self.pos;
        let bytes = self.input;
        let mut pos = self.pos;

        if bytes.get(pos) == Some(&b'-') { pos += 1; }

        // integer part: a single 0, or a nonzero digit followed by more digits
        match bytes.get(pos) {
            Some(b'0') => pos += 1,
            Some(b'1'..=b'9') => {
                while matches!(bytes.get(pos), Some(b'0'..=b'9')) { pos += 1; }
            },
            _ => return InvalidNumberSnafu { pos }.fail(),
        }

        if bytes.get(pos) == Some(&b'.') {
            pos += 1;
            ensure!(matches!(bytes.get(pos), Some(b'0'..=b'9')), InvalidNumberSnafu { pos });
            while matches!(bytes.get(pos), Some(b'0'..=b'9')) { pos += 1; }
        }

        if matches!(bytes.get(pos), Some(b'e') | Some(b'E')) {
            pos += 1;
            if matches!(bytes.get(pos), Some(b'+') | Some(b'-')) { pos += 1; }
            ensure!(matches!(bytes.get(pos), Some(b'0'..=b'9')), InvalidNumberSnafu { pos });
            while matches!(bytes.get(pos), Some(b'0'..=b'9')) { pos += 1; }
        }

        self.pos = pos;
        Ok(&self.text[start..pos])
    }

    fn parse_string_payload(&mut self) -> Result<Cow<'a, str>> {
        let start = self.pos;
        self.pos += 1;  // opening quote
        let content_start = self.pos;

        // fast path: no escape sequence, borrow the input
        loop {
            match self.input.get(self.pos) {
                Some(b'"') => {
                    let s = &self.text[content_start..self.pos];
                    self.pos += 1;
                    return Ok(Cow::Borrowed(s));
                },
                Some(b'\\') => break,
                Some(&c) if c < 0x20 => return ControlCharacterSnafu { pos: self.pos }.fail(),
                Some(_) => self.pos += 1,
                None => return UnterminatedStringSnafu { pos: start }.fail(),
            }
        }

        // slow path: unescape into an owned string
        let mut result = String::from(&self.text[content_start..self.pos]);
        loop {
            match self.input.get(self.pos) {
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(Cow::Owned(result));
                },
                Some(b'\\') => {
                    self.pos += 1;
                    match self.input.get(self.pos) {
                        Some(b'"') => { result.push('"'); self.pos += 1; },
                        Some(b'\\') => { result.push('\\'); self.pos += 1; },
                        Some(b'/') => { result.push('/'); self.pos += 1; },
                        Some(b'b') => { result.push('\u{8}'); self.pos += 1; },
                        Some(b'f') => { result.push('\u{c}'); self.pos += 1; },
                        Some(b'n') => { result.push('\n'); self.pos += 1; },
                        Some(b'r') => { result.push('\r'); self.pos += 1; },
                        Some(b't') => { result.push('\t'); self.pos += 1; },
                        Some(b'u') => {
                            self.pos += 1;
                            let c = self.parse_unicode_escape()?;
                            result.push(c);
                        },
                        _ => return InvalidEscapeSnafu { pos: self.pos }.fail(),
                    }
                },
                Some(&c) if c < 0x20 => return ControlCharacterSnafu { pos: self.pos }.fail(),
                Some(_) => {
                    // copy a full run of plain chars at once
                    let run_start = self.pos;
                    while matches!(self.input.get(self.pos), Some(&c) if c != b'"' && c != b'\\' && c >= 0x20) {
                        self.pos += 1;
                    }
                    result.push_str(&self.text[run_start..self.pos]);
                },
                None => return UnterminatedStringSnafu { pos: start }.fail(),
            }
        }
    }

    fn parse_hex4(&mut self) -> Result<u32> {
        let pos = self.pos;
        let hex = self.text.get(pos..pos + 4).context_invalid_unicode(pos)?;
        let n = u32::from_str_radix(hex, 16).ok().context_invalid_unicode(pos)?;
        self.pos += 4;
        Ok(n)
    }

    fn parse_unicode_escape(&mut self) -> Result<char> {
        let pos = self.pos;
        let n = self.parse_hex4()?;
        if (0xd800..0xdc00).contains(&n) {
            // high surrogate, must be followed by \uXXXX with a low surrogate
            ensure!(self.input.get(self.pos) == Some(&b'\\')
                    && self.input.get(self.pos + 1) == Some(&b'u'),
                    InvalidUnicodeEscapeSnafu { pos });
            self.pos += 2;
            let n2 = self.parse_hex4()?;
            ensure!((0xdc00..0xe000).contains(&n2), InvalidUnicodeEscapeSnafu { pos });
            let c = 0x10000 + ((n - 0xd800) << 10) + (n2 - 0xdc00);
            char::from_u32(c).context_invalid_unicode(pos)
        }
        else {
            char::from_u32(n).context_invalid_unicode(pos)
        }
    }
}

// tiny helper to avoid repeating the same snafu context
trait InvalidUnicodeExt<T> {
    fn context_invalid_unicode(self, pos: usize) -> Result<T>;
}

impl<T> InvalidUnicodeExt<T> for Option<T> {
    fn context_invalid_unicode(self, pos: usize) -> Result<T> {
        self.ok_or_else(|| InvalidUnicodeEscapeSnafu { pos }.build())
    }
}


// =============================================================================
//
//     Unittests
//
// =============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;
    use super::*;

    #[test]
    fn canonical_writer() {
        assert_eq!(to_string(&json!({"a": 1, "b": [true, null]})).unwrap(),
                   r#"{"a":1,"b":[true,null]}"#);
        assert_eq!(to_string(&170141183460469231731687303715884105727_u128).unwrap(),
                   r#""170141183460469231731687303715884105727""#);
        assert_eq!(to_string(&json!(1.5)).unwrap(), "1.5");
    }

    #[test]
    fn tokenize_simple() {
        use JsonToken::*;

        let mut t = Tokenizer::new(r#" {"a": 1, "b": [true, null, "x\n"], "c": -1.5e3} "#);
        assert_eq!(t.next().unwrap(), StartObject);
        assert_eq!(t.next().unwrap(), Key("a".into()));
        assert_eq!(t.peek().unwrap(), &Number("1"));
        assert_eq!(t.next().unwrap(), Number("1"));
        assert_eq!(t.next().unwrap(), Key("b".into()));
        assert_eq!(t.next().unwrap(), StartArray);
        assert_eq!(t.next().unwrap(), Bool(true));
        assert_eq!(t.next().unwrap(), Null);
        assert_eq!(t.next().unwrap(), Str("x\n".into()));
        assert_eq!(t.next().unwrap(), EndArray);
        assert_eq!(t.next().unwrap(), Key("c".into()));
        assert_eq!(t.next().unwrap(), Number("-1.5e3"));
        assert_eq!(t.next().unwrap(), EndObject);
        assert!(t.expect_end().is_ok());
    }

    #[test]
    fn tokenize_numbers_stay_text() {
        let mut t = Tokenizer::new("18446744073709551615");
        assert_eq!(t.next().unwrap(), JsonToken::Number("18446744073709551615"));
        assert!(t.expect_end().is_ok());
    }

    #[test]
    fn tokenize_errors() {
        assert!(Tokenizer::new(r#"{"a" 1}"#).nth_err(1));
        assert!(Tokenizer::new(r#"{"a": 1 "b": 2}"#).nth_err(3));
        assert!(Tokenizer::new(r#"[1, ]"#).nth_err(2));
        assert!(Tokenizer::new(r#""unterminated"#).nth_err(0));
        assert!(Tokenizer::new(r#"01"#).nth_err(1));

        let mut t = Tokenizer::new("1 2");
        t.next().unwrap();
        assert!(t.expect_end().is_err());
    }

    impl Tokenizer<'_> {
        // consume tokens until one errors out; check it is the n-th one
        fn nth_err(&mut self, n: usize) -> bool {
            for i in 0.. {
                match self.next() {
                    Err(_) => return i == n,
                    Ok(_) if self.done && self.stack.is_empty() => {
                        return match self.expect_end() { Err(_) => i + 1 == n, Ok(_) => false };
                    },
                    Ok(_) => continue,
                }
            }
            unreachable!()
        }
    }
}
