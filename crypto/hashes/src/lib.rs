use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Display, Formatter};
use std::str::{self, FromStr};
use thiserror::Error;

pub const HASH_SIZE: usize = 32;

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Default)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Blake2b-256 digest of `data`
    pub fn digest(data: &[u8]) -> Self {
        let hash = blake2b_simd::Params::new().hash_length(HASH_SIZE).hash(data);
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(hash.as_bytes());
        Hash(bytes)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashParseError {
    /// Number of hex characters found where exactly `2 * HASH_SIZE` are expected
    #[error("expected {expected} hex characters, found {0}", expected = HASH_SIZE * 2)]
    InvalidLength(usize),

    #[error("invalid hex character")]
    InvalidChar,
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut hex = [0u8; HASH_SIZE * 2];
        let hex = faster_hex::hex_encode(&self.0, &mut hex).expect("The output is exactly twice the size of the input");
        f.write_str(hex)
    }
}

impl Debug for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for Hash {
    type Err = HashParseError;

    fn from_str(hash_str: &str) -> Result<Self, Self::Err> {
        if hash_str.len() != HASH_SIZE * 2 {
            return Err(HashParseError::InvalidLength(hash_str.len()));
        }
        let mut bytes = [0u8; HASH_SIZE];
        faster_hex::hex_decode(hash_str.as_bytes(), &mut bytes).map_err(|_| HashParseError::InvalidChar)?;
        Ok(Hash(bytes))
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let hash_str = String::deserialize(deserializer)?;
            Hash::from_str(&hash_str).map_err(D::Error::custom)
        } else {
            Ok(Hash(<[u8; HASH_SIZE]>::deserialize(deserializer)?))
        }
    }
}
