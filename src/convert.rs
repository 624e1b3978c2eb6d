//! Checked conversions from strings and JSON values to numeric types.
//!
//! JSON input may carry numbers either as native JSON numbers or as quoted
//! decimal strings (the wire-canonical form for 64-bit and larger integers),
//! so every conversion here accepts both and rejects values that do not fit
//! the target type exactly.

use std::any::type_name;
use std::num::{ParseFloatError, ParseIntError, TryFromIntError};
use std::str::FromStr;

use num::{Float, Integer, Signed, Unsigned};
use serde_json::Value as JsonValue;
use snafu::prelude::*;


// -----------------------------------------------------------------------------
//     Error type for all possible conversion errors
// -----------------------------------------------------------------------------

#[derive(Debug, Snafu)]
pub enum ConversionError {
    #[snafu(display("invalid integer: {repr} - target type: {target}"))]
    Int {
        repr: String,
        target: &'static str,
        source: ParseIntError
    },

    #[snafu(display("integer out of range: cannot fit {value} in a `{target_type}`"))]
    IntPrecision {
        value: i128,  // i128 allows to represent both i64 and u64
        target_type: &'static str,
        source: TryFromIntError
    },

    #[snafu(display("invalid float: {repr}"))]
    Float {
        repr: String,
        source: ParseFloatError,
    },

    #[snafu(display(r#"cannot convert given variant {value} to type "{typename}""#))]
    IncompatibleVariantTypes {
        typename: &'static str,
        value: Box<JsonValue>
    },
}

type Result<T, E = ConversionError> = std::result::Result<T, E>;


// -----------------------------------------------------------------------------
//     Utility functions to convert numeric types
// -----------------------------------------------------------------------------

pub fn variant_to_str(v: &JsonValue) -> Result<&str> {
    v.as_str().with_context(|| IncompatibleVariantTypesSnafu {
        typename: "&str",
        value: v.clone(),
    })
}

pub fn str_to_int<T>(s: &str) -> Result<T>
where
    T: Integer + FromStr<Err = ParseIntError>,
{
    s.parse().context(IntSnafu { repr: s, target: type_name::<T>() })
}

pub fn str_to_float<T>(s: &str) -> Result<T>
where
    T: Float + FromStr<Err = ParseFloatError>,
{
    s.parse().context(FloatSnafu { repr: s })
}

pub fn variant_to_int<T>(v: &JsonValue) -> Result<T>
where
    T: TryFromInt64 + FromStr<Err = ParseIntError>,
{
    if let Some(n) = v.as_i64()      { T::try_from_i64(n) }
    else if let Some(s) = v.as_str() {
        s.parse().context(IntSnafu { repr: s, target: type_name::<T>() })
    }
    else {
        IncompatibleVariantTypesSnafu { typename: type_name::<T>(), value: v.clone() }.fail()
    }
}

pub fn variant_to_uint<T>(v: &JsonValue) -> Result<T>
where
    T: TryFromUint64 + FromStr<Err = ParseIntError>,
{
    if let Some(n) = v.as_u64()      { T::try_from_u64(n) }
    else if let Some(s) = v.as_str() {
        s.parse().context(IntSnafu { repr: s, target: type_name::<T>() })
    }
    else {
        IncompatibleVariantTypesSnafu { typename: type_name::<T>(), value: v.clone() }.fail()
    }
}

pub fn variant_to_float<T>(v: &JsonValue) -> Result<T>
where
    T: TryFromFloat64 + FromStr<Err = ParseFloatError>,
{
    if let Some(x) = v.as_f64()      { T::try_from_f64(x) }
    else if let Some(s) = v.as_str() { s.parse().context(FloatSnafu { repr: s }) }
    else {
        IncompatibleVariantTypesSnafu { typename: type_name::<T>(), value: v.clone() }.fail()
    }
}


// -----------------------------------------------------------------------------
//     Trait definitions to convert an i64/u64 to any int and f64 to f32
//
//     note: TryFrom doesn't work because it has `Err = TryFromIntError`
//           for all types except themselves where `Err = Infallible`
// -----------------------------------------------------------------------------

pub trait TryFromInt64 : Integer + Signed {
    fn try_from_i64(value: i64) -> Result<Self, ConversionError>;
}

pub trait TryFromUint64 : Integer + Unsigned {
    fn try_from_u64(value: u64) -> Result<Self, ConversionError>;
}

pub trait TryFromFloat64 : Float {
    fn try_from_f64(value: f64) -> Result<Self, ConversionError>;
}

macro_rules! impl_try_from_int64 {
    ($t:ty) => {
        impl TryFromInt64 for $t {
            fn try_from_i64(value: i64) -> Result<Self, ConversionError> {
                value.try_into().context(IntPrecisionSnafu {
                    value: value as i128,
                    target_type: stringify!($t),
                })
            }
        }
    }
}

macro_rules! impl_try_from_uint64 {
    ($t:ty) => {
        impl TryFromUint64 for $t {
            fn try_from_u64(value: u64) -> Result<Self, ConversionError> {
                value.try_into().context(IntPrecisionSnafu {
                    value: value as i128,
                    target_type: stringify!($t),
                })
            }
        }
    }
}

impl_try_from_int64!(i8);
impl_try_from_int64!(i16);
impl_try_from_int64!(i32);

impl_try_from_uint64!(u8);
impl_try_from_uint64!(u16);
impl_try_from_uint64!(u32);

// widening conversions never fail, they cannot go through the macro because
// the corresponding `TryFrom` impls have `Error = Infallible`

impl TryFromInt64 for i64 {
    fn try_from_i64(value: i64) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

impl TryFromInt64 for i128 {
    fn try_from_i64(value: i64) -> Result<Self, ConversionError> {
        Ok(value as i128)
    }
}

impl TryFromUint64 for u64 {
    fn try_from_u64(value: u64) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

impl TryFromUint64 for u128 {
    fn try_from_u64(value: u64) -> Result<Self, ConversionError> {
        Ok(value as u128)
    }
}

impl TryFromFloat64 for f32 {
    fn try_from_f64(value: f64) -> Result<Self, ConversionError> {
        Ok(value as f32)
    }
}

impl TryFromFloat64 for f64 {
    fn try_from_f64(value: f64) -> Result<Self, ConversionError> {
        Ok(value)
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;
    use super::*;

    #[test]
    fn int_conversions() {
        assert_eq!(variant_to_int::<i8>(&json!(-128)).unwrap(), -128);
        assert!(variant_to_int::<i8>(&json!(128)).is_err());

        // quoted form is accepted for every width
        assert_eq!(variant_to_uint::<u64>(&json!("18446744073709551615")).unwrap(), u64::MAX);
        assert!(variant_to_uint::<u64>(&json!("18446744073709551616")).is_err());

        assert_eq!(variant_to_int::<i128>(&json!("-170141183460469231731687303715884105728")).unwrap(),
                   i128::MIN);
    }

    #[test]
    fn float_conversions() {
        assert_eq!(variant_to_float::<f64>(&json!(1.5)).unwrap(), 1.5);
        assert!(variant_to_float::<f64>(&json!("Infinity")).unwrap().is_infinite());
        assert!(variant_to_float::<f64>(&json!("NaN")).unwrap().is_nan());
        assert!(variant_to_float::<f64>(&json!([])).is_err());
    }
}
