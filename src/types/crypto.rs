use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use ripemd::{Digest, Ripemd160};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use snafu::{ensure, ResultExt, Snafu};


#[derive(Debug, Snafu)]
pub enum InvalidCryptoData {
    #[snafu(display("invalid key type index: {index}"))]
    KeyTypeIndex { index: u8 },

    #[snafu(display("not crypto data: {msg}"))]
    NotCryptoData { msg: String },

    #[snafu(display("{msg}"))]
    InvalidDataSize { msg: String },

    #[snafu(display("checksums don't match: actual: {hash} - expected: {expected}"))]
    InvalidHash { hash: String, expected: String },

    #[snafu(display("unsupported key type: {what}"))]
    UnsupportedKeyType { what: String },

    #[snafu(display("error while decoding base58 data"))]
    Base58Error { source: bs58::decode::Error },
}


#[derive(Eq, PartialEq, Hash, Debug, Copy, Clone)]
pub enum KeyType {
    K1,
    R1,
    WebAuthn,
}

impl KeyType {
    pub fn from_index(i: u8) -> Result<Self, InvalidCryptoData> {
        Ok(match i {
            0 => Self::K1,
            1 => Self::R1,
            2 => Self::WebAuthn,
            _ => KeyTypeIndexSnafu { index: i }.fail()?,
        })
    }

    pub fn index(&self) -> u8 {
        match self {
            Self::K1 => 0,
            Self::R1 => 1,
            Self::WebAuthn => 2,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::K1 => "K1",
            Self::R1 => "R1",
            Self::WebAuthn => "WA",
        }
    }
}

pub trait CryptoDataType {
    const DISPLAY_NAME: &'static str;
    const PREFIX: &'static str;
}

/// Common storage for public keys, private keys and signatures: a key type
/// discriminant followed by `DATA_SIZE` raw bytes.
///
/// WebAuthn keys carry variable-sized payloads and are not representable
/// here; they are rejected with `UnsupportedKeyType` instead of silently
/// mangling data.
#[derive(Eq, Hash, PartialEq, Debug, Clone)]
pub struct CryptoData<T: CryptoDataType, const DATA_SIZE: usize> {
    key_type: KeyType,
    data: [u8; DATA_SIZE],
    phantom: PhantomData<T>,
}

impl<T: CryptoDataType, const DATA_SIZE: usize> CryptoData<T, DATA_SIZE> {
    pub fn key_type(&self) -> KeyType { self.key_type }
    pub fn data(&self) -> &[u8; DATA_SIZE] { &self.data }

    pub fn with_key_type(key_type: KeyType, data: [u8; DATA_SIZE]) -> Self {
        Self { key_type, data, phantom: PhantomData }
    }

    pub fn new(s: &str) -> Result<Self, InvalidCryptoData> {
        // check legacy formats first
        if T::PREFIX == "PUB" && s.starts_with("EOS") {
            // legacy format public key: checksum has no key type suffix
            let data = string_to_key_data(&s[3..], None)?;
            Ok(Self::with_key_type(KeyType::K1, Self::vec_to_data(data)?))
        }
        else if T::PREFIX == "PVT" && !s.contains('_') {
            // legacy private key WIF format
            let data = from_wif(s)?;
            Ok(Self::with_key_type(KeyType::K1, Self::vec_to_data(data)?))
        }
        else if let Some(enc) = s.strip_prefix(versioned_prefix(T::PREFIX, "K1")) {
            let data = string_to_key_data(enc, Some("K1"))?;
            Ok(Self::with_key_type(KeyType::K1, Self::vec_to_data(data)?))
        }
        else if let Some(enc) = s.strip_prefix(versioned_prefix(T::PREFIX, "R1")) {
            let data = string_to_key_data(enc, Some("R1"))?;
            Ok(Self::with_key_type(KeyType::R1, Self::vec_to_data(data)?))
        }
        else if s.starts_with(versioned_prefix(T::PREFIX, "WA")) {
            UnsupportedKeyTypeSnafu { what: format!("{} with WebAuthn key type", T::DISPLAY_NAME) }.fail()
        }
        else {
            NotCryptoDataSnafu { msg: s }.fail()
        }
    }

    pub fn vec_to_data(v: Vec<u8>) -> Result<[u8; DATA_SIZE], InvalidCryptoData> {
        let input_len = v.len();
        v.try_into().map_err(|_| InvalidDataSizeSnafu {
            msg: format!("wrong size for {}, needs to be {} but is: {}",
                         T::DISPLAY_NAME, DATA_SIZE, input_len)
        }.build())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.data)
    }
}

// the K1/R1/WA prefixes are fixed so all the prefix strings can be static
fn versioned_prefix(prefix: &str, kind: &str) -> &'static str {
    match (prefix, kind) {
        ("PUB", "K1") => "PUB_K1_",
        ("PUB", "R1") => "PUB_R1_",
        ("PUB", "WA") => "PUB_WA_",
        ("PVT", "K1") => "PVT_K1_",
        ("PVT", "R1") => "PVT_R1_",
        ("PVT", "WA") => "PVT_WA_",
        ("SIG", "K1") => "SIG_K1_",
        ("SIG", "R1") => "SIG_R1_",
        ("SIG", "WA") => "SIG_WA_",
        _ => unreachable!("unknown crypto data prefix"),
    }
}


// -----------------------------------------------------------------------------
//     `TryFrom` / `FromStr` implementations
// -----------------------------------------------------------------------------

impl<T: CryptoDataType, const DATA_SIZE: usize> TryFrom<&str> for CryptoData<T, DATA_SIZE> {
    type Error = InvalidCryptoData;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl<T: CryptoDataType, const DATA_SIZE: usize> FromStr for CryptoData<T, DATA_SIZE> {
    type Err = InvalidCryptoData;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}


// -----------------------------------------------------------------------------
//     `Display` implementation
// -----------------------------------------------------------------------------

impl<T: CryptoDataType, const DATA_SIZE: usize> fmt::Display for CryptoData<T, DATA_SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if T::PREFIX == "PUB" && self.key_type == KeyType::K1 {
            // K1 public keys use the legacy format, which is what the vast
            // majority of the ecosystem still produces and expects
            return write!(f, "EOS{}", key_data_to_string(&self.data, None));
        }
        match self.key_type {
            KeyType::K1 | KeyType::R1 => {
                let kind = self.key_type.prefix();
                write!(f, "{}{}", versioned_prefix(T::PREFIX, kind),
                       key_data_to_string(&self.data, Some(kind)))
            },
            KeyType::WebAuthn => {
                // `new()` and `from_bin()` never construct these
                write!(f, "{}_WA_<unsupported>", T::PREFIX)
            },
        }
    }
}


// -----------------------------------------------------------------------------
//     `Serde` traits implementation
// -----------------------------------------------------------------------------

impl<T: CryptoDataType, const DATA_SIZE: usize> Serialize for CryptoData<T, DATA_SIZE> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de, T: CryptoDataType, const DATA_SIZE: usize> Deserialize<'de> for CryptoData<T, DATA_SIZE> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr: String = String::deserialize(deserializer)?;
        Self::new(&repr).map_err(|e| de::Error::custom(e.to_string()))
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKeyType;

impl CryptoDataType for PublicKeyType {
    const DISPLAY_NAME: &'static str = "public key";
    const PREFIX: &'static str = "PUB";
}

pub type PublicKey = CryptoData<PublicKeyType, 33>;


#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrivateKeyType;

impl CryptoDataType for PrivateKeyType {
    const DISPLAY_NAME: &'static str = "private key";
    const PREFIX: &'static str = "PVT";
}

pub type PrivateKey = CryptoData<PrivateKeyType, 32>;


#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureType;

impl CryptoDataType for SignatureType {
    const DISPLAY_NAME: &'static str = "signature";
    const PREFIX: &'static str = "SIG";
}

pub type Signature = CryptoData<SignatureType, 65>;


// -----------------------------------------------------------------------------
//     Helper functions
// -----------------------------------------------------------------------------

fn checksum(data: &[u8], suffix: Option<&str>) -> [u8; 4] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    if let Some(suffix) = suffix {
        hasher.update(suffix);
    }
    let digest = hasher.finalize();
    digest[..4].try_into().unwrap()  // safe unwrap
}

fn string_to_key_data(enc_data: &str, suffix: Option<&str>) -> Result<Vec<u8>, InvalidCryptoData> {
    let data = bs58::decode(enc_data).into_vec().context(Base58Snafu)?;

    ensure!(data.len() > 4, NotCryptoDataSnafu { msg: format!(
        "invalid length for decoded base58 crypto data, needs to be at least 5, is {}",
        data.len())
    });

    let (payload, expected) = data.split_at(data.len() - 4);
    let actual = checksum(payload, suffix);

    ensure!(actual == expected, InvalidHashSnafu {
        hash: hex::encode(actual),
        expected: hex::encode(expected),
    });

    Ok(payload.to_owned())
}

fn from_wif(enc_data: &str) -> Result<Vec<u8>, InvalidCryptoData> {
    let data = bs58::decode(enc_data).into_vec().context(Base58Snafu)?;

    ensure!(data.len() == 37, NotCryptoDataSnafu { msg: format!(
        "invalid length for decoded WIF key, needs to be 37, is {}",
        data.len())
    });

    let digest = Sha256::digest(&data[..data.len() - 4]);
    let digest2 = Sha256::digest(digest);

    let actual = &digest[..4];
    let actual2 = &digest2[..4];
    let expected = &data[data.len() - 4..];

    ensure!(actual == expected || actual2 == expected, InvalidHashSnafu {
        hash: hex::encode(actual2),
        expected: hex::encode(expected)
    });

    // drop the version byte and the checksum
    Ok(data[1..data.len() - 4].to_owned())
}

fn key_data_to_string<const N: usize>(k: &[u8; N], suffix: Option<&str>) -> String {
    let mut data: Vec<u8> = Vec::from(*k);
    data.extend_from_slice(&checksum(k, suffix));
    bs58::encode(data).into_string()
}


// =============================================================================
//
//     Unittests
//
// =============================================================================
