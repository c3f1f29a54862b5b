use thiserror::Error;

/// Errors are deterministic for a given input: retrying the same call cannot succeed.
#[derive(Debug, Error)]
pub enum Error {
    // Payment codes
    #[error("unsupported payment code version {0}")]
    UnsupportedVersion(u8),
    #[error("malformed payment code: {0}")]
    Decode(sp_code::Error),

    // Inputs
    #[error("no inputs to derive a shared secret from")]
    NoInputs,
    #[error("no eligible inputs to derive a shared secret from")]
    NoEligibleInputs,
    #[error("{inputs} inputs but {prevouts} prevouts")]
    PrevoutMismatch { inputs: usize, prevouts: usize },

    // Curve arithmetic
    #[error("{0} produced a degenerate result")]
    InvalidResult(&'static str),
    #[error("spending key derivation degenerated to zero")]
    InvalidDerivation,

    // Conversions
    #[error("address: {0}")]
    Address(String),
    #[error(transparent)]
    Wif(#[from] bitcoin::key::FromWifError),
    #[error(transparent)]
    Secp256k1(#[from] bitcoin::secp256k1::Error),
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
}

impl From<sp_code::Error> for Error {
    fn from(e: sp_code::Error) -> Self {
        match e {
            sp_code::Error::UnsupportedVersion(version) => Error::UnsupportedVersion(version),
            other => Error::Decode(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
