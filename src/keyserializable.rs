//! Memcomparable key encoding.
//!
//! Values encoded with [`KeySerializable::to_key`] compare bytewise the same
//! way the values themselves compare, which is what database range indexes
//! need. The rules are:
//!
//!  - unsigned integers: big-endian bytes
//!  - signed integers: big-endian with the sign bit flipped
//!  - floats: total order (`-NaN < -inf < ... < -0.0 < +0.0 < ... < +inf < NaN`),
//!    obtained by flipping all bits of negative values and only the sign bit
//!    of positive ones
//!  - strings and byte blobs: embedded `0x00` is escaped as `0x00 0x01`, the
//!    key is terminated with `0x00 0x00` so that a prefix sorts first
//!  - sequences: every element is prefixed with `0x01`, the sequence is
//!    terminated with `0x00`
//!  - tuples: plain concatenation

use crate::{ByteStream, types::*};


/// Serialize a value to its memcomparable key form.
pub trait KeySerializable {
    fn to_key(&self, stream: &mut ByteStream);
}

/// Return the key form of a value as a byte vector.
pub fn to_key<T: KeySerializable>(value: &T) -> Vec<u8> {
    let mut s = ByteStream::new();
    value.to_key(&mut s);
    s.into_bytes()
}


// -----------------------------------------------------------------------------
//     Integer and bool keys
// -----------------------------------------------------------------------------

impl KeySerializable for bool {
    fn to_key(&self, stream: &mut ByteStream) {
        stream.write_byte(*self as u8)
    }
}

macro_rules! impl_unsigned_key {
    ($typ:ty) => {
        impl KeySerializable for $typ {
            fn to_key(&self, stream: &mut ByteStream) {
                stream.write_bytes(&self.to_be_bytes())
            }
        }
    }
}

macro_rules! impl_signed_key {
    ($typ:ty, $unsigned:ty) => {
        impl KeySerializable for $typ {
            fn to_key(&self, stream: &mut ByteStream) {
                // flipping the sign bit maps the signed range onto the
                // unsigned range while keeping the ordering
                let v = (*self as $unsigned) ^ (1 << (<$typ>::BITS - 1));
                stream.write_bytes(&v.to_be_bytes())
            }
        }
    }
}

impl_unsigned_key!(u8);
impl_unsigned_key!(u16);
impl_unsigned_key!(u32);
impl_unsigned_key!(u64);
impl_unsigned_key!(u128);

impl_signed_key!(i8, u8);
impl_signed_key!(i16, u16);
impl_signed_key!(i32, u32);
impl_signed_key!(i64, u64);
impl_signed_key!(i128, u128);


// -----------------------------------------------------------------------------
//     Float keys
// -----------------------------------------------------------------------------

macro_rules! impl_float_key {
    ($typ:ty, $bits:ty) => {
        impl KeySerializable for $typ {
            fn to_key(&self, stream: &mut ByteStream) {
                let bits = self.to_bits();
                let sign_mask: $bits = 1 << (<$bits>::BITS - 1);
                let v = if bits & sign_mask != 0 { !bits } else { bits | sign_mask };
                stream.write_bytes(&v.to_be_bytes())
            }
        }
    }
}

impl_float_key!(f32, u32);
impl_float_key!(f64, u64);


// -----------------------------------------------------------------------------
//     Keys for types represented by an integer
// -----------------------------------------------------------------------------

impl KeySerializable for Name {
    fn to_key(&self, stream: &mut ByteStream) {
        self.as_u64().to_key(stream)
    }
}

impl KeySerializable for VarUint32 {
    fn to_key(&self, stream: &mut ByteStream) {
        u32::from(*self).to_key(stream)
    }
}

impl KeySerializable for VarInt32 {
    fn to_key(&self, stream: &mut ByteStream) {
        i32::from(*self).to_key(stream)
    }
}

impl KeySerializable for TimePoint {
    fn to_key(&self, stream: &mut ByteStream) {
        self.micros().to_key(stream)
    }
}

impl KeySerializable for TimePointSec {
    fn to_key(&self, stream: &mut ByteStream) {
        self.secs().to_key(stream)
    }
}

impl KeySerializable for BlockTimestamp {
    fn to_key(&self, stream: &mut ByteStream) {
        self.slot().to_key(stream)
    }
}


// -----------------------------------------------------------------------------
//     String and blob keys
// -----------------------------------------------------------------------------

fn bytes_to_key(bytes: &[u8], stream: &mut ByteStream) {
    for &b in bytes {
        stream.write_byte(b);
        if b == 0 {
            stream.write_byte(1);
        }
    }
    stream.write_byte(0);
    stream.write_byte(0);
}

impl KeySerializable for String {
    fn to_key(&self, stream: &mut ByteStream) {
        bytes_to_key(self.as_bytes(), stream)
    }
}

impl KeySerializable for &str {
    fn to_key(&self, stream: &mut ByteStream) {
        bytes_to_key(self.as_bytes(), stream)
    }
}

impl KeySerializable for Bytes {
    fn to_key(&self, stream: &mut ByteStream) {
        bytes_to_key(&self.0, stream)
    }
}


// -----------------------------------------------------------------------------
//     Container keys
// -----------------------------------------------------------------------------

impl<T: KeySerializable> KeySerializable for Vec<T> {
    fn to_key(&self, stream: &mut ByteStream) {
        for elem in self {
            stream.write_byte(1);
            elem.to_key(stream);
        }
        stream.write_byte(0);
    }
}

impl<T: KeySerializable> KeySerializable for Option<T> {
    fn to_key(&self, stream: &mut ByteStream) {
        match self {
            Some(v) => {
                stream.write_byte(1);
                v.to_key(stream);
            },
            None => stream.write_byte(0),
        }
    }
}

impl<T: KeySerializable, const N: usize> KeySerializable for [T; N] {
    fn to_key(&self, stream: &mut ByteStream) {
        for elem in self {
            elem.to_key(stream);
        }
    }
}

macro_rules! impl_tuple_key {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: KeySerializable),+> KeySerializable for ($($name,)+) {
            fn to_key(&self, stream: &mut ByteStream) {
                $(self.$idx.to_key(stream);)+
            }
        }
    }
}

impl_tuple_key!(A: 0);
impl_tuple_key!(A: 0, B: 1);
impl_tuple_key!(A: 0, B: 1, C: 2);
impl_tuple_key!(A: 0, B: 1, C: 2, D: 3);


// =============================================================================
//
//     Unittests
//
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // check that key ordering follows value ordering for a slice that is
    // already sorted in its natural order
    #[track_caller]
    fn check_key_order<T: KeySerializable>(sorted: &[T]) {
        let keys: Vec<Vec<u8>> = sorted.iter().map(to_key).collect();
        for w in keys.windows(2) {
            assert!(w[0] < w[1], "keys not in order: {} >= {}",
                    hex::encode(&w[0]), hex::encode(&w[1]));
        }
    }

    #[test]
    fn int_keys() {
        check_key_order(&[i32::MIN, -1000, -1, 0, 1, 1000, i32::MAX]);
        check_key_order(&[i8::MIN, -1, 0, i8::MAX]);
        check_key_order(&[0u64, 1, 255, 256, u64::MAX]);
        check_key_order(&[i128::MIN, -1, 0, 1, i128::MAX]);
    }

    #[test]
    fn float_keys() {
        check_key_order(&[f64::NEG_INFINITY, -1e300, -1.0, -1e-300, -0.0,
                          0.0, 1e-300, 1.0, 1e300, f64::INFINITY, f64::NAN]);
        check_key_order(&[f32::NEG_INFINITY, -1.0f32, -0.0, 0.0, 1.0, f32::INFINITY]);
    }

    #[test]
    fn name_keys() {
        let names: Vec<Name> = ["", "a", "eosio", "eosio.token", "zzzzzzzzzzzzj"]
            .iter().map(|s| Name::new(s).unwrap()).collect();
        let mut sorted = names.clone();
        sorted.sort_by_key(|n| n.as_u64());
        assert_eq!(names, sorted);
        check_key_order(&names);
    }

    #[test]
    fn string_keys() {
        // embedded NUL bytes must not make a shorter string sort after a
        // longer one
        check_key_order(&["", "a", "a\0", "a\0a", "a\x01", "aa", "b"]);
    }

    #[test]
    fn vector_keys() {
        check_key_order(&[
            vec![],
            vec![0u32],
            vec![0u32, 0],
            vec![0u32, 1],
            vec![1u32],
            vec![1u32, 0],
        ]);
    }

    #[test]
    fn tuple_keys() {
        check_key_order(&[
            (0u8, "".to_string()),
            (0u8, "a".to_string()),
            (1u8, "".to_string()),
            (1u8, "a\0".to_string()),
            (1u8, "aa".to_string()),
        ]);
    }
}
