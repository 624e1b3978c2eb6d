use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use snafu::{Snafu, OptionExt, ensure};


#[derive(Debug, Snafu)]
pub enum InvalidName {
    #[snafu(display(r#"name is longer than 13 characters: "{name}""#))]
    TooLong { name: String },

    #[snafu(display(r#"invalid char '{c}' in name "{name}""#))]
    InvalidChar { name: String, c: char },

    #[snafu(display(r#"thirteenth char '{c}' out of range in name "{name}""#))]
    InvalidChar13 { name: String, c: char },
}

/// Represent an immutable name in the Antelope data model, encoded as a `uint64`.
///
/// A name packs up to 13 characters from the alphabet `.12345a-z`, 5 bits per
/// character except the 13th which gets the low 4 bits of the `u64` (and is
/// therefore restricted to `.1-5a-j`). Trailing dots are not significant and
/// are dropped from the string representation.
#[derive(Eq, Hash, PartialEq, Ord, PartialOrd, Debug, Copy, Clone, Default)]
pub struct Name {
    value: u64,
}

impl Name {
    /// Build a `Name` from its string representation, validating every char.
    ///
    /// ## Example
    /// ```
    /// # use sable::{Name, InvalidName};
    /// assert_eq!(Name::new("eosio.token")?.as_u64(), 6138663591592764928);
    /// assert_eq!(Name::new("a.b.c.d.e")?.to_string(), "a.b.c.d.e");
    /// assert_eq!(Name::new("")?.as_u64(), 0);
    /// assert!(Name::new("eosio.tokenxx").is_err());
    /// # Ok::<(), InvalidName>(())
    /// ```
    pub fn new(s: &str) -> Result<Self, InvalidName> {
        ensure!(s.len() <= 13, TooLongSnafu { name: s });

        let mut value: u64 = 0;
        for (i, c) in s.chars().enumerate() {
            let x = char_to_symbol(c).context(InvalidCharSnafu { name: s, c })?;
            if i < 12 {
                value |= (x & 0x1f) << (64 - 5 * (i + 1));
            }
            else {
                // 13th char only has 4 bits left in the u64
                ensure!(x == x & 0x0f, InvalidChar13Snafu { name: s, c });
                value |= x;
            }
        }

        Ok(Name { value })
    }

    /// Build a `Name` from its `u64` representation.
    #[inline]
    pub const fn from_u64(n: u64) -> Self {
        // NOTE: no validation here, all u64 are valid names
        Self { value: n }
    }

    /// Return the name `u64` representation.
    #[inline]
    pub fn as_u64(&self) -> u64 { self.value }
}

// -----------------------------------------------------------------------------
//     Helper functions
// -----------------------------------------------------------------------------

// see ref implementation in AntelopeIO/spring/libraries/chain/name.{hpp,cpp}

const fn char_to_symbol(c: char) -> Option<u64> {
    match c {
        'a'..='z' => Some((c as u64 - 'a' as u64) + 6),
        '1'..='5' => Some((c as u64 - '1' as u64) + 1),
        '.' => Some(0),
        _ => None,
    }
}

const CHARMAP: &[u8] = b".12345abcdefghijklmnopqrstuvwxyz";

fn u64_to_string(n: u64) -> String {
    let mut n = n;
    let mut s: Vec<u8> = vec![b'.'; 13];
    for i in 0..=12 {
        let c: u8 = CHARMAP[n as usize & match i { 0 => 0x0f, _ => 0x1f }];
        s[12 - i] = c;
        n >>= match i { 0 => 4, _ => 5 };
    }

    // truncate string with unused trailing symbols
    let mut end_pos = 13;
    while end_pos > 0 && s[end_pos - 1] == b'.' {
        end_pos -= 1;
    }
    s.truncate(end_pos);

    String::from_utf8(s).unwrap()  // safe unwrap
}


// -----------------------------------------------------------------------------
//     Conversion traits
// -----------------------------------------------------------------------------

impl TryFrom<&str> for Name {
    type Error = InvalidName;

    fn try_from(s: &str) -> Result<Name, InvalidName> {
        Name::new(s)
    }
}

impl From<u64> for Name {
    fn from(n: u64) -> Name {
        Name::from_u64(n)
    }
}


// -----------------------------------------------------------------------------
//     `Display` implementation
// -----------------------------------------------------------------------------

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u64_to_string(self.value))
    }
}


// -----------------------------------------------------------------------------
//     `FromStr` implementation
// -----------------------------------------------------------------------------

impl FromStr for Name {
    type Err = InvalidName;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Name::new(s)
    }
}


// -----------------------------------------------------------------------------
//     `Serde` traits implementation
// -----------------------------------------------------------------------------

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> Result<Name, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name: String = String::deserialize(deserializer)?;
        Name::new(&name).map_err(|e| de::Error::custom(e.to_string()))
    }
}


// =============================================================================
//
//     Unittests
//
// =============================================================================

#[cfg(test)]
mod tests {
    use color_eyre::eyre::Result;
    use super::*;

    #[test]
    fn simple_names() -> Result<()> {
        let n = Name::new("nico")?;
        assert_eq!(n.to_string(), "nico");

        let n2 = Name::new("eosio.token")?;
        assert_eq!(n2.to_string(), "eosio.token");
        assert_eq!(n2.as_u64(), 6138663591592764928);

        let n3 = Name::new("a.b.c.d.e")?;
        assert_eq!(n3.to_string(), "a.b.c.d.e");

        assert_eq!(Name::new("")?, Name::from_u64(0));
        assert_eq!(Name::from_u64(0).to_string(), "");

        Ok(())
    }

    #[test]
    fn thirteenth_char() -> Result<()> {
        // 13th char must map to a value in 0..=15, ie. chars '.', '1'-'5', 'a'-'j'
        assert!(Name::new("aaaaaaaaaaaaj").is_ok());
        assert!(matches!(Name::new("aaaaaaaaaaaak"),
                         Err(InvalidName::InvalidChar13 { .. })));
        assert!(matches!(Name::new("eosio.tokenxx"),
                         Err(InvalidName::InvalidChar13 { .. })));
        Ok(())
    }

    #[test]
    fn invalid_names() {
        assert!(matches!(Name::new("yepthatstoolong"), Err(InvalidName::TooLong { .. })));
        assert!(matches!(Name::new("abcDef"), Err(InvalidName::InvalidChar { .. })));
        assert!(matches!(Name::new("A"), Err(InvalidName::InvalidChar { .. })));
        assert!(matches!(Name::new("a-b"), Err(InvalidName::InvalidChar { .. })));
        assert!(matches!(Name::new("á"), Err(InvalidName::InvalidChar { .. })));
        assert!(matches!(Name::new("a6"), Err(InvalidName::InvalidChar { .. })));
    }

    #[test]
    fn trailing_dots_are_trimmed() -> Result<()> {
        // trailing dots encode to zero bits and disappear from the string form
        assert_eq!(Name::new("a.")?.to_string(), "a");
        assert_eq!(Name::new("a..")?, Name::new("a")?);
        Ok(())
    }

    #[test]
    fn basic_functionality() {
        let name = Name::new("foobar").unwrap();
        let json = r#""foobar""#;

        assert_eq!(name, Name::from_u64(6712742083569909760));
        assert_eq!(name.as_u64(), 6712742083569909760);

        assert_eq!(serde_json::from_str::<Name>(json).unwrap(), name);
        assert_eq!(serde_json::to_string(&name).unwrap(), json);
    }
}
