use std::sync::OnceLock;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use snafu::{ensure, ResultExt};

use crate::{
    ABISerializable, ActionName, ByteStream, Extensions, JsonValue, TableName,
    abi::data::ABI_SCHEMA,
    abi::error::{ABIError, DeserializeSnafu, VersionSnafu},
    abi::serializer::ABI,
};

// see doc at: https://docs.eosnetwork.com/manuals/cdt/latest/best-practices/abi/understanding-abi-files/
//
// C++ reference implementation is at:
// https://github.com/AntelopeIO/spring/blob/main/libraries/chain/include/eosio/chain/abi_def.hpp

type Result<T, E = ABIError> = core::result::Result<T, E>;

pub type TypeNameDef = String;
pub type FieldName = String;


#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub new_type_name: TypeNameDef,

    #[serde(rename = "type")]
    pub type_: TypeNameDef,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: FieldName,
    #[serde(rename = "type")]
    pub type_: TypeNameDef,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Struct {
    pub name: TypeNameDef,
    #[serde(default)]
    pub base: TypeNameDef,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub name: ActionName,
    #[serde(rename = "type")]
    pub type_: TypeNameDef,
    #[serde(default)]
    pub ricardian_contract: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: TableName,
    #[serde(rename = "type")]
    pub type_: TypeNameDef,
    #[serde(default)]
    pub index_type: TypeNameDef,
    #[serde(default)]
    pub key_names: Vec<FieldName>,
    #[serde(default)]
    pub key_types: Vec<TypeNameDef>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClausePair {
    pub id: String,
    pub body: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    #[serde(deserialize_with = "u64_or_string")]
    pub error_code: u64,
    pub error_msg: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: TypeNameDef,
    #[serde(default)]
    pub types: Vec<TypeNameDef>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub name: ActionName,
    pub result_type: TypeNameDef,
}

/// Literal mirror of an on-chain ABI document.
///
/// This is the unresolved form: type references are plain strings. Use
/// [`ABI::from_definition`] to resolve it into a type graph usable for
/// transcoding.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ABIDefinition {
    pub version: String,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub structs: Vec<Struct>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub ricardian_clauses: Vec<ClausePair>,
    #[serde(default)]
    pub error_messages: Vec<ErrorMessage>,
    #[serde(default)]
    pub abi_extensions: Extensions,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub action_results: Vec<ActionResult>,
}

// `uint64` is double-quoted in canonical JSON but plenty of tooling emits it
// bare, accept both on input
fn u64_or_string<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let v = JsonValue::deserialize(d)?;
    crate::convert::variant_to_uint(&v).map_err(serde::de::Error::custom)
}


impl ABIDefinition {
    pub fn from_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).context(super::error::JsonSerdeSnafu)
    }

    pub fn from_variant(v: &JsonValue) -> Result<Self> {
        Self::from_str(&v.to_string())
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        Self::from_bin(&mut ByteStream::from(hex::decode(s)?))
    }

    /// Parse an ABI document from its binary form.
    ///
    /// The layout is itself described by an ABI (see `abi_schema()`), apart
    /// from the leading version string and the `abi_extensions`. The last
    /// sections (`variants`, `action_results`) were introduced by later ABI
    /// versions and may be absent.
    pub fn from_bin(data: &mut ByteStream) -> Result<Self> {
        let version = String::from_bin(data).context(DeserializeSnafu { what: "version" })?;
        ensure!(version.starts_with("eosio::abi/1."), VersionSnafu { version });

        let parser = bin_abi_parser();
        let abi = json!({
            "version":            version,
            "types":              parser.decode_variant(data, "typedef[]")?,
            "structs":            parser.decode_variant(data, "struct[]")?,
            "actions":            parser.decode_variant(data, "action[]")?,
            "tables":             parser.decode_variant(data, "table[]")?,
            "ricardian_clauses":  parser.decode_variant(data, "ricardian_clause[]")?,
            "error_messages":     parser.decode_variant(data, "error_message[]")?,
            "abi_extensions":     decode_extensions(data)?,
            "variants": if !data.leftover().is_empty() {
                parser.decode_variant(data, "variant[]")?
            } else { json!([]) },
            "action_results": if !data.leftover().is_empty() {
                parser.decode_variant(data, "action_result[]")?
            } else { json!([]) },
        });

        ensure!(data.leftover().is_empty(),
                super::error::BadAbiSnafu { message: "trailing bytes after ABI document" });

        Self::from_variant(&abi)
    }

    pub fn to_bin(&self, stream: &mut ByteStream) -> Result<()> {
        let parser = bin_abi_parser();
        self.version.to_bin(stream);
        parser.encode_variant(stream, "typedef[]", &json!(self.types))?;
        parser.encode_variant(stream, "struct[]", &json!(self.structs))?;
        parser.encode_variant(stream, "action[]", &json!(self.actions))?;
        parser.encode_variant(stream, "table[]", &json!(self.tables))?;
        parser.encode_variant(stream, "ricardian_clause[]", &json!(self.ricardian_clauses))?;
        parser.encode_variant(stream, "error_message[]", &json!(self.error_messages))?;
        self.abi_extensions.to_bin(stream);
        parser.encode_variant(stream, "variant[]", &json!(self.variants))?;
        parser.encode_variant(stream, "action_result[]", &json!(self.action_results))?;

        Ok(())
    }
}

fn decode_extensions(data: &mut ByteStream) -> Result<JsonValue> {
    if data.leftover().is_empty() {
        return Ok(json!([]));
    }
    let extensions = Extensions::from_bin(data)
        .context(DeserializeSnafu { what: "abi_extensions" })?;
    Ok(serde_json::to_value(extensions)?)
}

impl Default for ABIDefinition {
    fn default() -> ABIDefinition {
        ABIDefinition {
            version: "eosio::abi/1.2".to_owned(),
            types: vec![],
            structs: vec![],
            actions: vec![],
            tables: vec![],
            ricardian_clauses: vec![],
            error_messages: vec![],
            abi_extensions: vec![],
            variants: vec![],
            action_results: vec![],
        }
    }
}


/// The ABI describing ABI documents themselves.
pub fn abi_schema() -> &'static ABIDefinition {
    static ABI_SCHEMA_ONCE: OnceLock<ABIDefinition> = OnceLock::new();
    ABI_SCHEMA_ONCE.get_or_init(|| {
        ABIDefinition::from_str(ABI_SCHEMA).unwrap()  // safe unwrap, embedded document
    })
}

fn bin_abi_parser() -> &'static ABI {
    static BIN_ABI_PARSER: OnceLock<ABI> = OnceLock::new();
    BIN_ABI_PARSER.get_or_init(|| {
        ABI::from_definition(abi_schema()).unwrap()  // safe unwrap
    })
}


#[cfg(test)]
mod tests {
    use crate::abi::data::ABI_EXAMPLE;
    use super::*;

    #[test]
    fn parse_abi_def() -> Result<(), serde_json::Error> {
        let abi: ABIDefinition = serde_json::from_str(ABI_EXAMPLE)?;

        assert_eq!(abi.version, "eosio::abi/1.1");
        assert!(!abi.structs.is_empty());

        Ok(())
    }

    #[test]
    fn unsupported_version() {
        let mut stream = ByteStream::new();
        "eosio::abi/2.0".to_string().to_bin(&mut stream);
        assert!(matches!(ABIDefinition::from_bin(&mut stream),
                         Err(ABIError::VersionError { .. })));
    }
}
