use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Client creation
    #[cfg(feature = "mnemonic")]
    #[error(transparent)]
    Mnemonic(#[from] bip39::Error),
    #[error("failed to generate master key from seed")]
    SeedDerivation,
    #[error("failed to derive {0} key")]
    KeyDerivation(&'static str),

    // Scanning
    #[error("invalid tweak: {0}")]
    InvalidTweak(String),

    // Wrapped external errors
    #[error(transparent)]
    SilentPayments(#[from] silentpayments::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
