//! Binary serialization of native values.
//!
//! The Antelope wire format has only a handful of rules, all of which live in
//! this module:
//!
//!  - numbers are fixed-width little-endian, except for the dedicated varint
//!    types which use a base-128 encoding,
//!  - blobs, strings and containers carry a var-uint32 element count in
//!    front of their payload,
//!  - optional values are a one-byte presence flag, followed by the value
//!    when the flag is 1,
//!  - everything else (names, symbols, assets, timestamps, digests, keys) is
//!    reduced to one of the above.
//!
//! Implement (or derive field-by-field) [`ABISerializable`] for your own
//! types to make them encodable without going through an ABI.

use std::collections::{BTreeMap, BTreeSet};
use std::str::{from_utf8, Utf8Error};

use snafu::{ResultExt, Snafu};

use crate::{
    ByteStream, StreamError,
    types::*,
    impl_auto_error_conversion,
};


/// A type with an Antelope wire representation.
///
/// Writing cannot fail (the target stream grows as needed), reading can: the
/// stream may end early or carry bytes that are not a valid encoding.
pub trait ABISerializable {
    fn to_bin(&self, stream: &mut ByteStream);
    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError>
    where
        Self: Sized;
}

/// Serialize a value to a fresh byte buffer.
pub fn to_bin<T: ABISerializable>(value: &T) -> Bytes {
    let mut stream = ByteStream::new();
    value.to_bin(&mut stream);
    Bytes(stream.into_bytes())
}

/// Serialize a value and return the hex representation of the result.
pub fn to_hex<T: ABISerializable>(value: &T) -> String {
    let mut stream = ByteStream::new();
    value.to_bin(&mut stream);
    stream.hex_data()
}

/// Deserialize a value from a byte buffer.
pub fn from_bin<T: ABISerializable>(bin: impl AsRef<[u8]>) -> Result<T, SerializeError> {
    let mut stream = ByteStream::from(bin.as_ref().to_vec());
    T::from_bin(&mut stream)
}


// -----------------------------------------------------------------------------
//     Decoding helpers
// -----------------------------------------------------------------------------

fn read_array<const N: usize>(stream: &mut ByteStream) -> Result<[u8; N], SerializeError> {
    Ok(stream.read_bytes(N)?.try_into().unwrap())  // safe unwrap, length checked by `read_bytes`
}

fn encode_sequence<'a, T>(items: impl ExactSizeIterator<Item = &'a T>, stream: &mut ByteStream)
where
    T: ABISerializable + 'a,
{
    stream.write_var_u32(items.len() as u32);
    for item in items {
        item.to_bin(stream);
    }
}

fn decode_sequence<T: ABISerializable>(stream: &mut ByteStream) -> Result<Vec<T>, SerializeError> {
    let count = stream.read_var_u32()? as usize;
    // don't trust the declared count for the initial allocation, the stream
    // may be truncated or hostile
    let mut result = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        result.push(T::from_bin(stream)?);
    }
    Ok(result)
}


// -----------------------------------------------------------------------------
//     Scalars
// -----------------------------------------------------------------------------

impl ABISerializable for bool {
    #[inline]
    fn to_bin(&self, stream: &mut ByteStream) {
        stream.write_byte(*self as u8)
    }
    #[inline]
    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        match stream.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => InvalidBoolSnafu.fail(),
        }
    }
}

// a single macro covers every fixed-width number, integer or float: they all
// go through their little-endian byte representation
macro_rules! impl_scalar_serialization {
    ($($typ:ty),+ $(,)?) => {
        $(
            impl ABISerializable for $typ {
                #[inline]
                fn to_bin(&self, stream: &mut ByteStream) {
                    stream.write_bytes(&self.to_le_bytes())
                }
                #[inline]
                fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
                    Ok(<$typ>::from_le_bytes(read_array(stream)?))
                }
            }
        )+
    }
}

impl_scalar_serialization!(
    i8, i16, i32, i64, i128,
    u8, u16, u32, u64, u128,
    f32, f64,
);

impl ABISerializable for VarUint32 {
    #[inline]
    fn to_bin(&self, stream: &mut ByteStream) {
        stream.write_var_u32(self.0)
    }
    #[inline]
    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        Ok(VarUint32(stream.read_var_u32()?))
    }
}

impl ABISerializable for VarInt32 {
    #[inline]
    fn to_bin(&self, stream: &mut ByteStream) {
        stream.write_var_i32(self.0)
    }
    #[inline]
    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        Ok(VarInt32(stream.read_var_i32()?))
    }
}


// -----------------------------------------------------------------------------
//     Blobs and strings
// -----------------------------------------------------------------------------

impl ABISerializable for Bytes {
    fn to_bin(&self, stream: &mut ByteStream) {
        self.0.as_slice().to_bin(stream)
    }
    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        let len = stream.read_var_u32()? as usize;
        Ok(Bytes::from(stream.read_bytes(len)?))
    }
}

impl ABISerializable for String {
    fn to_bin(&self, stream: &mut ByteStream) {
        self.as_bytes().to_bin(stream)
    }
    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        let len = stream.read_var_u32()? as usize;
        let s = from_utf8(stream.read_bytes(len)?).context(Utf8Snafu)?;
        Ok(s.to_owned())
    }
}

// encode-only impls for borrowed blobs and strings, so that callers don't
// have to copy just to serialize

impl ABISerializable for &[u8] {
    fn to_bin(&self, stream: &mut ByteStream) {
        stream.write_var_u32(self.len() as u32);
        stream.write_bytes(self);
    }
    fn from_bin(_stream: &mut ByteStream) -> Result<Self, SerializeError> {
        unimplemented!("use `Bytes` to decode byte blobs")
    }
}

impl ABISerializable for &str {
    fn to_bin(&self, stream: &mut ByteStream) {
        self.as_bytes().to_bin(stream)
    }
    fn from_bin(_stream: &mut ByteStream) -> Result<Self, SerializeError> {
        unimplemented!("use `String` to decode strings")
    }
}


// -----------------------------------------------------------------------------
//     Names, symbols and assets
// -----------------------------------------------------------------------------

impl ABISerializable for Name {
    #[inline]
    fn to_bin(&self, stream: &mut ByteStream) {
        self.as_u64().to_bin(stream)
    }
    #[inline]
    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        // every u64 is a valid name
        Ok(Name::from_u64(u64::from_bin(stream)?))
    }
}

impl ABISerializable for SymbolCode {
    #[inline]
    fn to_bin(&self, stream: &mut ByteStream) {
        self.as_u64().to_bin(stream)
    }
    #[inline]
    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        Ok(SymbolCode::from_u64(u64::from_bin(stream)?))
    }
}

impl ABISerializable for Symbol {
    #[inline]
    fn to_bin(&self, stream: &mut ByteStream) {
        self.as_u64().to_bin(stream)
    }
    #[inline]
    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        // unlike names, not every u64 is a valid precision + code pair
        Ok(Symbol::from_u64(u64::from_bin(stream)?)?)
    }
}

impl ABISerializable for Asset {
    fn to_bin(&self, stream: &mut ByteStream) {
        self.amount().to_bin(stream);
        self.symbol().to_bin(stream);
    }
    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        let amount = i64::from_bin(stream)?;
        let symbol = Symbol::from_bin(stream)?;
        Ok(Asset::new(amount, symbol)?)
    }
}

impl ABISerializable for ExtendedAsset {
    fn to_bin(&self, stream: &mut ByteStream) {
        self.quantity.to_bin(stream);
        self.contract.to_bin(stream);
    }
    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        Ok(ExtendedAsset {
            quantity: Asset::from_bin(stream)?,
            contract: Name::from_bin(stream)?,
        })
    }
}


// -----------------------------------------------------------------------------
//     Timestamps
// -----------------------------------------------------------------------------

macro_rules! impl_timestamp_serialization {
    ($typ:ty, $repr:ty) => {
        impl ABISerializable for $typ {
            #[inline]
            fn to_bin(&self, stream: &mut ByteStream) {
                <$repr>::from(*self).to_bin(stream)
            }
            #[inline]
            fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
                <$repr>::from_bin(stream).map(Into::into)
            }
        }
    }
}

impl_timestamp_serialization!(TimePoint, i64);       // microseconds
impl_timestamp_serialization!(TimePointSec, u32);    // seconds
impl_timestamp_serialization!(BlockTimestamp, u32);  // half-second slots


// -----------------------------------------------------------------------------
//     Digests and opaque fixed-size values
// -----------------------------------------------------------------------------

macro_rules! impl_digest_serialization {
    ($typ:ty) => {
        impl ABISerializable for $typ {
            #[inline]
            fn to_bin(&self, stream: &mut ByteStream) {
                stream.write_bytes(&self.0)
            }
            #[inline]
            fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
                Ok(<$typ>::from(read_array(stream)?))
            }
        }
    }
}

impl_digest_serialization!(Checksum160);
impl_digest_serialization!(Checksum256);
impl_digest_serialization!(Checksum512);

impl ABISerializable for Float128 {
    #[inline]
    fn to_bin(&self, stream: &mut ByteStream) {
        stream.write_bytes(&self.bytes()[..])
    }
    #[inline]
    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        Ok(Float128::from(read_array::<16>(stream)?))
    }
}


// -----------------------------------------------------------------------------
//     Keys and signatures
// -----------------------------------------------------------------------------

impl<T: CryptoDataType, const DATA_SIZE: usize> ABISerializable for CryptoData<T, DATA_SIZE> {
    fn to_bin(&self, stream: &mut ByteStream) {
        stream.write_byte(self.key_type().index());
        stream.write_bytes(&self.data()[..]);
    }

    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        let key_type = KeyType::from_index(stream.read_byte()?)?;
        // WebAuthn payloads are variable-sized and don't fit the fixed
        // storage, refuse them instead of misreading the stream
        if key_type == KeyType::WebAuthn {
            return InvalidDataSnafu {
                msg: format!("WebAuthn {} are not supported", T::DISPLAY_NAME),
            }.fail();
        }
        Ok(Self::with_key_type(key_type, read_array(stream)?))
    }
}


// -----------------------------------------------------------------------------
//     Containers
// -----------------------------------------------------------------------------

impl<T: ABISerializable> ABISerializable for Option<T> {
    fn to_bin(&self, stream: &mut ByteStream) {
        self.is_some().to_bin(stream);
        if let Some(value) = self {
            value.to_bin(stream);
        }
    }

    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        Ok(match bool::from_bin(stream)? {
            true => Some(T::from_bin(stream)?),
            false => None,
        })
    }
}

impl<T: ABISerializable> ABISerializable for Vec<T> {
    fn to_bin(&self, stream: &mut ByteStream) {
        encode_sequence(self.iter(), stream)
    }

    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        decode_sequence(stream)
    }
}

impl<T: ABISerializable> ABISerializable for Box<T> {
    fn to_bin(&self, stream: &mut ByteStream) {
        self.as_ref().to_bin(stream)
    }

    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        Ok(Box::new(T::from_bin(stream)?))
    }
}

// sets and maps share the sequence layout, with map entries flattened to
// key-value pairs

impl<T: ABISerializable + Ord> ABISerializable for BTreeSet<T> {
    fn to_bin(&self, stream: &mut ByteStream) {
        encode_sequence(self.iter(), stream)
    }

    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        Ok(decode_sequence(stream)?.into_iter().collect())
    }
}

impl<K, V> ABISerializable for BTreeMap<K, V>
where
    K: ABISerializable + Ord,
    V: ABISerializable,
{
    fn to_bin(&self, stream: &mut ByteStream) {
        stream.write_var_u32(self.len() as u32);
        for (key, value) in self {
            key.to_bin(stream);
            value.to_bin(stream);
        }
    }

    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        let count = stream.read_var_u32()?;
        let mut result = BTreeMap::new();
        for _ in 0..count {
            let key = K::from_bin(stream)?;
            let value = V::from_bin(stream)?;
            result.insert(key, value);
        }
        Ok(result)
    }
}

// a pair of a type id and a blob; with the `Vec` impl above this gives the
// encoding of the `Extensions` type
impl ABISerializable for (u16, Bytes) {
    fn to_bin(&self, stream: &mut ByteStream) {
        self.0.to_bin(stream);
        self.1.to_bin(stream);
    }

    fn from_bin(stream: &mut ByteStream) -> Result<Self, SerializeError> {
        Ok((u16::from_bin(stream)?, Bytes::from_bin(stream)?))
    }
}


// -----------------------------------------------------------------------------
//     Errors
// -----------------------------------------------------------------------------

#[derive(Debug, Snafu)]
pub enum SerializeError {
    #[snafu(display("stream error"))]
    StreamError { source: StreamError },

    #[snafu(display("byte is not a valid bool encoding"))]
    InvalidBool,

    #[snafu(display("cannot decode bytes as utf-8"))]
    Utf8Error { source: Utf8Error },

    #[snafu(display("invalid symbol"))]
    InvalidSymbol { source: InvalidSymbol },

    #[snafu(display("invalid asset"))]
    InvalidAsset { source: InvalidAsset },

    #[snafu(display("invalid crypto data"))]
    InvalidCryptoData { source: InvalidCryptoData },

    #[snafu(display("{msg}"))]
    InvalidData { msg: String },  // acts as a generic error type with a given message
}

impl_auto_error_conversion!(StreamError, SerializeError, StreamSnafu);
impl_auto_error_conversion!(InvalidSymbol, SerializeError, InvalidSymbolSnafu);
impl_auto_error_conversion!(InvalidAsset, SerializeError, InvalidAssetSnafu);
impl_auto_error_conversion!(InvalidCryptoData, SerializeError, InvalidCryptoDataSnafu);


// =============================================================================
//
//     Unittests
//
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_layout_is_little_endian() {
        assert_eq!(to_hex(&0x0102_0304_u32), "04030201");
        assert_eq!(to_hex(&-2i16), "feff");
        assert_eq!(to_hex(&0.125f32), "0000003e");
    }

    #[test]
    fn sequences_are_length_prefixed() {
        assert_eq!(to_hex(&Vec::<u16>::new()), "00");
        assert_eq!(to_hex(&vec![1u16, 2, 3]), "03010002000300");
        assert_eq!(to_hex(&"abc".to_owned()), "03616263");
    }

    #[test]
    fn optional_flag_byte() {
        assert_eq!(to_hex(&None::<u32>), "00");
        assert_eq!(to_hex(&Some(1u32)), "0101000000");

        // flag bytes other than 0/1 are rejected
        assert!(matches!(from_bin::<Option<u32>>([2u8]),
                         Err(SerializeError::InvalidBool { .. })));
    }

    #[test]
    fn map_entries_are_flattened_pairs() {
        let map = BTreeMap::from([(1u8, 2u8), (3, 4)]);
        assert_eq!(to_hex(&map), "0201020304");
        assert_eq!(from_bin::<BTreeMap<u8, u8>>(to_bin(&map)).unwrap(), map);
    }
}
