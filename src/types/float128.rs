use hex::FromHexError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// An opaque IEEE-754 binary128 value.
///
/// Rust has no stable native `f128`, so the value is kept as its 16-byte
/// little-endian bit pattern and only converted to/from the hex string used
/// by the JSON representation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Float128([u8; 16]);

impl Float128 {
    pub fn from_hex(s: &str) -> Result<Self, FromHexError> {
        let mut result = [0_u8; 16];
        hex::decode_to_slice(s, &mut result)?;
        Ok(Float128(result))
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<[u8; 16]> for Float128 {
    fn from(bin: [u8; 16]) -> Self {
        Float128(bin)
    }
}

impl Serialize for Float128 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_hex().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Float128 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr: String = String::deserialize(deserializer)?;
        Self::from_hex(&repr).map_err(|e| de::Error::custom(e.to_string()))
    }
}
