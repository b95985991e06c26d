use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must start with '{0}'")]
    MissingPrefix(&'static str),

    #[error("address key must be {0} hex characters, found {1}")]
    InvalidKeyLength(usize, usize),

    #[error("address key is not valid hex")]
    InvalidKeyChar,
}

pub type AddressResult<T> = std::result::Result<T, AddressError>;
