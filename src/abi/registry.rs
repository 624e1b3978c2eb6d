//! Registry of resolved ABIs keyed by contract account.
//!
//! This is the top-level entry point when working with several contracts:
//! load each contract's ABI once with [`ABIRegistry::set_abi`], then transcode
//! action payloads by `(contract, type name)`.
//!
//! A registry is a plain value, create as many as needed. Transcoding only
//! reads the registry, so sharing one behind your own `Arc`/lock is fine as
//! long as no `set_abi` runs concurrently.

use std::collections::HashMap;

use snafu::OptionExt;

use crate::{ABI, ABIDefinition, ABIError, JsonValue, Name};
use crate::abi::error::{UnknownAbiSnafu, UnknownActionSnafu, UnknownTableSnafu};

type Result<T, E = ABIError> = core::result::Result<T, E>;

#[derive(Default, Debug)]
pub struct ABIRegistry {
    abis: HashMap<Name, ABI>,
}

impl ABIRegistry {
    pub fn new() -> Self {
        Self { abis: HashMap::new() }
    }

    // -----------------------------------------------------------------------------
    //     Loading ABIs
    // -----------------------------------------------------------------------------

    /// Parse, resolve and install the ABI for `contract`.
    ///
    /// The previous ABI (if any) stays installed when resolution fails: the
    /// new graph is fully built before it replaces the old one.
    pub fn set_abi(&mut self, contract: Name, abi_json: &str) -> Result<()> {
        let abi = ABI::from_str(abi_json)?;
        self.abis.insert(contract, abi);
        Ok(())
    }

    pub fn set_abi_definition(&mut self, contract: Name, def: &ABIDefinition) -> Result<()> {
        let abi = ABI::from_definition(def)?;
        self.abis.insert(contract, abi);
        Ok(())
    }

    pub fn set_abi_hex(&mut self, contract: Name, abi_hex: &str) -> Result<()> {
        let abi = ABI::from_hex_abi(abi_hex)?;
        self.abis.insert(contract, abi);
        Ok(())
    }

    pub fn set_abi_bin(&mut self, contract: Name, abi_bin: &[u8]) -> Result<()> {
        let abi = ABI::from_bin_abi(abi_bin)?;
        self.abis.insert(contract, abi);
        Ok(())
    }

    pub fn remove_abi(&mut self, contract: Name) -> Option<ABI> {
        self.abis.remove(&contract)
    }

    pub fn get_abi(&self, contract: Name) -> Result<&ABI> {
        self.abis.get(&contract).context(UnknownAbiSnafu { contract })
    }

    // -----------------------------------------------------------------------------
    //     Action and table bindings
    // -----------------------------------------------------------------------------

    /// The declared payload type name for `(contract, action)`.
    pub fn get_type_for_action(&self, contract: Name, action: Name) -> Result<&str> {
        self.get_abi(contract)?
            .action_type(action)
            .context(UnknownActionSnafu { contract, action })
    }

    /// The declared row type name for `(contract, table)`.
    pub fn get_type_for_table(&self, contract: Name, table: Name) -> Result<&str> {
        self.get_abi(contract)?
            .table_type(table)
            .context(UnknownTableSnafu { contract, table })
    }

    // -----------------------------------------------------------------------------
    //     Transcoding
    // -----------------------------------------------------------------------------

    /// Encode a JSON document to binary.
    ///
    /// This uses the strict streaming encoder: struct fields must appear in
    /// their declared order, which is the canonical client form. Use
    /// [`ABIRegistry::variant_to_bin`] to accept fields in any order.
    pub fn json_to_bin(&self, contract: Name, typename: &str, json: &str) -> Result<Vec<u8>> {
        self.get_abi(contract)?.json_to_binary(typename, json)
    }

    /// Encode an already-parsed JSON value to binary (fields reorderable).
    pub fn variant_to_bin(&self, contract: Name, typename: &str, value: &JsonValue) -> Result<Vec<u8>> {
        self.get_abi(contract)?.variant_to_binary(typename, value)
    }

    /// Decode binary data to its canonical JSON string form.
    pub fn bin_to_json(&self, contract: Name, typename: &str, bytes: &[u8]) -> Result<String> {
        self.get_abi(contract)?.binary_to_json(typename, bytes)
    }

    /// Decode hex-encoded binary data to its canonical JSON string form.
    pub fn hex_to_json(&self, contract: Name, typename: &str, hex_repr: &str) -> Result<String> {
        let bytes = hex::decode(hex_repr)?;
        self.bin_to_json(contract, typename, &bytes)
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
    use crate::abi::data::TOKEN_HEX_ABI;
    use super::*;

    static TOKEN_ABI: &str = r#"{
        "version": "eosio::abi/1.2",
        "structs": [
            {
                "name": "transfer",
                "base": "",
                "fields": [
                    { "name": "from", "type": "name" },
                    { "name": "to", "type": "name" },
                    { "name": "quantity", "type": "asset" },
                    { "name": "memo", "type": "string" }
                ]
            }
        ],
        "actions": [
            { "name": "transfer", "type": "transfer", "ricardian_contract": "" }
        ]
    }"#;

    #[test]
    fn transfer_roundtrip() -> Result<()> {
        let mut reg = ABIRegistry::new();
        let token = Name::new("eosio.token")?;
        reg.set_abi(token, TOKEN_ABI)?;

        let action = Name::new("transfer")?;
        assert_eq!(reg.get_type_for_action(token, action)?, "transfer");

        let json = r#"{"from":"useraaaaaaaa","to":"useraaaaaaab","quantity":"0.0001 SYS","memo":"test memo"}"#;
        let bin = reg.json_to_bin(token, "transfer", json)?;
        let hex_repr = hex::encode(&bin);

        assert_eq!(reg.bin_to_json(token, "transfer", &bin)?, json);
        assert_eq!(reg.hex_to_json(token, "transfer", &hex_repr)?, json);

        Ok(())
    }

    #[test]
    fn hex_abi_document() -> Result<()> {
        let mut reg = ABIRegistry::new();
        let token = Name::new("eosio.token")?;

        let abi = ABI::from_hex_abi(TOKEN_HEX_ABI)?;
        assert!(abi.is_type("transfer"));
        reg.set_abi_bin(token, &hex::decode(TOKEN_HEX_ABI)?)?;
        assert_eq!(reg.get_type_for_action(token, Name::new("transfer")?)?, "transfer");

        Ok(())
    }

    #[test]
    fn failed_set_abi_keeps_previous() -> Result<()> {
        let mut reg = ABIRegistry::new();
        let token = Name::new("eosio.token")?;
        reg.set_abi(token, TOKEN_ABI)?;

        assert!(reg.set_abi(token, r#"{"version": "eosio::abi/1.2",
            "structs": [{"name": "s", "base": "", "fields": [{"name": "x", "type": "nope"}]}]
        }"#).is_err());

        // the previously installed ABI is untouched
        assert!(reg.get_abi(token)?.is_type("transfer"));
        Ok(())
    }

    #[test]
    fn unknown_contract() {
        let reg = ABIRegistry::new();
        let contract = Name::new("nope").unwrap();
        assert!(matches!(reg.get_abi(contract), Err(ABIError::UnknownAbi { .. })));
    }
}
