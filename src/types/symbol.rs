use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use snafu::{ensure, Snafu, ResultExt, OptionExt};

use crate::impl_auto_error_conversion;


#[derive(Debug, Snafu)]
pub enum InvalidSymbol {
    #[snafu(display("creating symbol from empty string"))]
    Empty,

    #[snafu(display(r#"symbol code longer than 7 characters: "{code}""#))]
    TooLong { code: String },

    #[snafu(display("missing comma in symbol"))]
    MissingComma,

    #[snafu(display(r#"invalid char '{c}' in symbol code "{code}""#))]
    CharError { code: String, c: char },

    #[snafu(display("could not parse precision for symbol"))]
    ParsePrecisionError { source: ParseIntError },

    #[snafu(display("given precision {given} should be <= max precision {max}"))]
    PrecisionError { given: u8, max: u8 },

    #[snafu(display("invalid u64 representation: {value} cannot be turned into a valid symbol"))]
    InvalidU64Representation { value: u64 },
}

impl_auto_error_conversion!(ParseIntError, InvalidSymbol, ParsePrecisionSnafu);


/// The code part of a [`Symbol`]: up to 7 uppercase ASCII letters packed in a
/// `u64`, one byte per char starting from the low byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SymbolCode(u64);

impl SymbolCode {
    pub fn new(s: &str) -> Result<SymbolCode, InvalidSymbol> {
        string_to_symbol_code(s).map(SymbolCode)
    }

    pub fn from_u64(n: u64) -> SymbolCode {
        SymbolCode(n)
    }

    pub fn as_u64(&self) -> u64 { self.0 }
}

/// `Symbol` represents a token: a precision and a code.
///
/// When encoded as a `u64`, the first byte is the number of decimals and the
/// remaining bytes are the code.
///
/// ## Example
/// ```
/// # use sable::{Symbol, SymbolCode, InvalidSymbol};
/// let symbol: Symbol = "4,CUR".parse()?;
/// assert_eq!(symbol.decimals(), 4);
/// assert_eq!(symbol.precision(), 10000);
/// assert_eq!(symbol.code(), SymbolCode::new("CUR")?);
/// # Ok::<(), InvalidSymbol>(())
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Symbol {
    value: u64,
}

impl Symbol {
    const MAX_PRECISION: u8 = 18;

    pub fn new(s: &str) -> Result<Self, InvalidSymbol> {
        let s = s.trim();
        ensure!(!s.is_empty(), EmptySnafu);
        let pos = s.find(',').context(MissingCommaSnafu)?;
        let precision: u8 = s[..pos].parse().context(ParsePrecisionSnafu)?;
        Self::from_precision_and_code(precision, &s[pos + 1..])
    }

    pub fn from_precision_and_code(precision: u8, code: &str) -> Result<Self, InvalidSymbol> {
        ensure!(precision <= Self::MAX_PRECISION,
                PrecisionSnafu { given: precision, max: Self::MAX_PRECISION });
        Ok(Self {
            value: (string_to_symbol_code(code)? << 8) | (precision as u64),
        })
    }

    pub fn from_u64(n: u64) -> Result<Self, InvalidSymbol> {
        let result = Self { value: n };
        ensure!(result.is_valid(), InvalidU64RepresentationSnafu { value: n });
        Ok(result)
    }

    pub fn as_u64(&self) -> u64 { self.value }

    pub fn decimals(&self) -> u8 {
        (self.value & 0xff) as u8
    }

    /// 10^decimals, ie. the number of fractional units in one whole token.
    pub fn precision(&self) -> i64 {
        let mut p10: i64 = 1;
        for _ in 0..self.decimals() {
            p10 *= 10;
        }
        p10
    }

    #[inline]
    pub fn code(&self) -> SymbolCode {
        SymbolCode(self.value >> 8)
    }

    pub fn name(&self) -> String {
        symbol_code_to_string(self.code().as_u64())
    }

    pub fn is_valid(&self) -> bool {
        self.decimals() <= Self::MAX_PRECISION && is_valid_symbol_code(&self.name())
    }
}


// -----------------------------------------------------------------------------
//     Helper functions
// -----------------------------------------------------------------------------

// see ref implementation in AntelopeIO/spring/libraries/chain/symbol.{hpp,cpp}

#[inline]
fn string_to_symbol_code(s: &str) -> Result<u64, InvalidSymbol> {
    ensure!(!s.is_empty(), EmptySnafu);
    ensure!(s.len() <= 7, TooLongSnafu { code: s });

    let mut result: u64 = 0;
    for (i, &c) in s.as_bytes().iter().enumerate() {
        ensure!(c.is_ascii_uppercase(), CharSnafu { code: s, c: c as char });
        result |= (c as u64) << (8 * i);
    }
    Ok(result)
}

fn symbol_code_to_string(value: u64) -> String {
    let mut v: u64 = value;
    let mut result = String::with_capacity(7);
    while v != 0 {
        let c = (v & 0xff) as u8;
        result.push(c as char);
        v >>= 8;
    }
    result
}

#[inline]
fn is_valid_symbol_code(code: &str) -> bool {
    !code.is_empty() && code.len() <= 7 && code.bytes().all(|c| c.is_ascii_uppercase())
}


// -----------------------------------------------------------------------------
//     Conversion traits
// -----------------------------------------------------------------------------

impl TryFrom<&str> for Symbol {
    type Error = InvalidSymbol;

    fn try_from(s: &str) -> Result<Symbol, InvalidSymbol> {
        Symbol::new(s)
    }
}


// -----------------------------------------------------------------------------
//     `Display` implementation
// -----------------------------------------------------------------------------

impl fmt::Display for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", symbol_code_to_string(self.0))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.decimals(), self.name())
    }
}


// -----------------------------------------------------------------------------
//     `FromStr` implementation
// -----------------------------------------------------------------------------

impl FromStr for SymbolCode {
    type Err = InvalidSymbol;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SymbolCode::new(s)
    }
}

impl FromStr for Symbol {
    type Err = InvalidSymbol;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::new(s)
    }
}


// -----------------------------------------------------------------------------
//     `Serde` traits implementation
// -----------------------------------------------------------------------------

impl Serialize for SymbolCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SymbolCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code: String = String::deserialize(deserializer)?;
        SymbolCode::new(&code).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Serialize for Symbol {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> Result<Symbol, D::Error>
    where
        D: Deserializer<'de>,
    {
        let symbol: String = String::deserialize(deserializer)?;
        Symbol::new(&symbol).map_err(|e| de::Error::custom(e.to_string()))
    }
}


// =============================================================================
//
//     Unittests
//
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_symbols() {
        let symbols = [
            "0,WAXXXXXX",
            "0,",
            "0, ",
            ",",
            "19,WAX",
            "-1,WAX",
            "4,eos",
        ];

        for s in symbols {
            assert!(Symbol::new(s).is_err(), r#"symbol "{s}" should fail constructing"#);
        }
    }

    #[test]
    fn basic_functionality() {
        let obj = Symbol::new("4,FOO").unwrap();
        let json = r#""4,FOO""#;

        assert_eq!(obj.decimals(), 4);
        assert_eq!(obj.precision(), 10000);
        assert_eq!(obj.name(), "FOO");
        assert_eq!(obj.code(), SymbolCode::new("FOO").unwrap());

        assert_eq!(serde_json::from_str::<Symbol>(json).unwrap(), obj);
        assert_eq!(serde_json::to_string(&obj).unwrap(), json);
    }
}
