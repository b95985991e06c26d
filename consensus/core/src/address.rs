//! Account addresses: the currency prefix followed by the hex encoded public spend key.

use crate::{
    config::constants::currency::ADDRESS_PREFIX,
    errors::address::{AddressError, AddressResult},
};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

pub const ADDRESS_KEY_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountAddress {
    spend_key: [u8; ADDRESS_KEY_SIZE],
}

impl AccountAddress {
    pub const fn new(spend_key: [u8; ADDRESS_KEY_SIZE]) -> Self {
        Self { spend_key }
    }

    pub fn spend_key(&self) -> &[u8; ADDRESS_KEY_SIZE] {
        &self.spend_key
    }
}

impl Display for AccountAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut hex = [0u8; ADDRESS_KEY_SIZE * 2];
        let hex = faster_hex::hex_encode(&self.spend_key, &mut hex).expect("The output is exactly twice the size of the input");
        write!(f, "{}{}", ADDRESS_PREFIX, hex)
    }
}

impl FromStr for AccountAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> AddressResult<Self> {
        let key = s.strip_prefix(ADDRESS_PREFIX).ok_or(AddressError::MissingPrefix(ADDRESS_PREFIX))?;
        if key.len() != ADDRESS_KEY_SIZE * 2 {
            return Err(AddressError::InvalidKeyLength(ADDRESS_KEY_SIZE * 2, key.len()));
        }
        let mut spend_key = [0u8; ADDRESS_KEY_SIZE];
        faster_hex::hex_decode(key.as_bytes(), &mut spend_key).map_err(|_| AddressError::InvalidKeyChar)?;
        Ok(Self { spend_key })
    }
}

impl TryFrom<&str> for AccountAddress {
    type Error = AddressError;

    fn try_from(value: &str) -> AddressResult<Self> {
        value.parse()
    }
}
