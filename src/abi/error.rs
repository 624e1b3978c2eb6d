use hex::FromHexError;
use serde_json::Error as JsonError;
use snafu::Snafu;

use crate::{SerializeError, impl_auto_error_conversion};
use crate::json::JsonTokenError;

/// Errors from loading, resolving or using an ABI.
///
/// The first group corresponds to structural problems detected while
/// resolving an `ABIDefinition` into a type graph; the second group covers
/// transcoding failures.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ABIError {
    // ----- resolution errors -----------------------------------------------

    #[snafu(display(r#"unsupported ABI version: "{version}""#))]
    VersionError { version: String },

    #[snafu(display("recursion limit reached"))]
    RecursionLimitReached,

    #[snafu(display(r#"invalid nesting of wrapper types in "{name}""#))]
    InvalidNesting { name: String },

    #[snafu(display(r#"unknown type: "{name}""#))]
    UnknownType { name: String },

    #[snafu(display("missing name in {what} definition"))]
    MissingName { what: &'static str },

    #[snafu(display(r#"type redefined: "{name}""#))]
    RedefinedType { name: String },

    #[snafu(display(r#"base "{base}" of struct "{name}" is not a struct"#))]
    BaseNotAStruct { name: String, base: String },

    #[snafu(display(r#"typedef "{name}" resolves to a binary extension"#))]
    ExtensionTypedef { name: String },

    #[snafu(display("bad ABI: {message}"))]
    BadAbi { message: String },

    // ----- transcoding errors ----------------------------------------------

    #[snafu(display("encode error: {message}"))]
    EncodeError { message: String },

    #[snafu(display("decode error: {message}"))]
    DecodeError { message: String },

    #[snafu(display(r#"expected field "{field}" while processing struct "{strct}""#))]
    ExpectedField { field: String, strct: String },

    #[snafu(display(r#"unexpected field "{field}" while processing struct "{strct}""#))]
    UnexpectedField { field: String, strct: String },

    #[snafu(display(r#"type "{typename}" is not valid within the variant "{variant}""#))]
    InvalidTypeForVariant { typename: String, variant: String },

    #[snafu(display(r#"invalid index {index} for variant "{variant}""#))]
    BadVariantIndex { index: u32, variant: String },

    #[snafu(display("cannot deserialize {what} from stream"))]
    DeserializeError { what: String, source: SerializeError },

    #[snafu(display(r#"cannot convert value to/from builtin type "{typename}""#))]
    ValueError { typename: String, source: crate::InvalidValue },

    #[snafu(display("transcoding was interrupted: {message}"))]
    Interrupted { message: String },

    // ----- registry errors -------------------------------------------------

    #[snafu(display(r#"no ABI loaded for contract "{contract}""#))]
    UnknownAbi { contract: crate::Name },

    #[snafu(display(r#"contract "{contract}" has no action "{action}""#))]
    UnknownAction { contract: crate::Name, action: crate::Name },

    #[snafu(display(r#"contract "{contract}" has no table "{table}""#))]
    UnknownTable { contract: crate::Name, table: crate::Name },

    // ----- document / input errors -----------------------------------------

    #[snafu(display("cannot parse JSON document"))]
    JsonParseError { source: JsonTokenError },

    #[snafu(display("cannot deserialize ABIDefinition from JSON"))]
    JsonSerdeError { source: JsonError },

    #[snafu(display("cannot decode hex representation"))]
    HexError { source: FromHexError },
}

impl_auto_error_conversion!(FromHexError, ABIError, HexSnafu);
impl_auto_error_conversion!(JsonError, ABIError, JsonSerdeSnafu);
impl_auto_error_conversion!(JsonTokenError, ABIError, JsonParseSnafu);
