//!
//! This library converts between the three representations of strongly-typed
//! values used on [Antelope](https://antelope.io) (formerly EOSIO)
//! blockchains:
//!
//!  - the compact binary wire encoding,
//!  - the JSON textual encoding,
//!  - Rust native values ([`AntelopeValue`] and the types in [`types`]).
//!
//! The conversions are driven entirely at runtime by an ABI: a JSON document
//! describing the structs, aliases, variants and binary-extension fields of a
//! smart contract. Parse one with [`ABIDefinition`], resolve it into an
//! [`ABI`] and use [`ABI::json_to_binary`] / [`ABI::binary_to_json`] (or an
//! [`ABIRegistry`] when dealing with several contracts keyed by account).
//!
//! ```
//! # use sable::{ABI, ABIError};
//! let abi = ABI::from_str(r#"{
//!     "version": "eosio::abi/1.2",
//!     "structs": [{
//!         "name": "transfer", "base": "",
//!         "fields": [
//!             { "name": "from", "type": "name" },
//!             { "name": "to", "type": "name" },
//!             { "name": "quantity", "type": "asset" },
//!             { "name": "memo", "type": "string" }
//!         ]
//!     }]
//! }"#)?;
//!
//! let bin = abi.json_to_binary("transfer", r#"{
//!     "from": "alice", "to": "bob", "quantity": "1.0000 EOS", "memo": ""
//! }"#)?;
//! assert_eq!(abi.binary_to_json("transfer", &bin)?,
//!            r#"{"from":"alice","to":"bob","quantity":"1.0000 EOS","memo":""}"#);
//! # Ok::<(), ABIError>(())
//! ```
//!
//! Two JSON → binary paths exist: the streaming one above, which requires
//! struct fields in their declared order (the canonical client form), and
//! [`ABI::variant_to_binary`] over an already-parsed [`JsonValue`], which
//! accepts fields in any order.
//!
//! For Rust-native values, the [`ABISerializable`] trait gives the binary
//! form and `serde` gives the JSON form; [`KeySerializable`] produces
//! memcomparable keys whose bytewise order matches the value order.

// disable this lint to allow our types to implement a `from_str` constructor
// without implementing the `std::str::FromStr` trait
// if we didn't, we would have to import that trait everywhere we want to build
// our types, which wouldn't be very convenient and isn't very discoverable
#![allow(clippy::should_implement_trait)]

pub mod abi;
pub mod abiserializable;
pub mod bytestream;
pub mod config;
pub mod convert;
pub mod json;
pub mod keyserializable;
pub mod macros;
pub mod types;

pub use serde_json::{
    Map as JsonMap,
    Value as JsonValue,
    Error as JsonError,
    json
};

pub use types::*;

pub use abi::{ABI, ABIDefinition, ABIError, ABIRegistry, TranscodeHook, TypeName, abi_schema};

pub use bytestream::{ByteStream, StreamError};
pub use abiserializable::{ABISerializable, SerializeError, to_bin, to_hex, from_bin};
pub use keyserializable::{KeySerializable, to_key};
