//! Bech32m codec for BIP352 silent payment codes.
//!
//! A payment code is the string form of a recipient's scan and spend public keys:
//! a human readable prefix (`sp`, `tsp` or `sprt`), one version word, and the
//! 66 bytes `scan ‖ spend` packed into 5-bit groups with a bech32m checksum.
use bech32::primitives::decode::{CheckedHrpstring, CheckedHrpstringError};
use bech32::primitives::iter::{ByteIterExt, Fe32IterExt};
use bech32::{Bech32m, Fe32, Hrp};
use secp256k1::PublicKey;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length of `scan ‖ spend` once unpacked from the 5-bit groups.
pub const PAYLOAD_LENGTH: usize = 66;
const HRP_MAINNET: Hrp = Hrp::parse_unchecked("sp");
const HRP_TESTNET: Hrp = Hrp::parse_unchecked("tsp");
const HRP_REGTEST: Hrp = Hrp::parse_unchecked("sprt");

/// Error types for payment code operations.
#[derive(Debug)]
pub enum Error {
    InvalidNetwork(String),
    InvalidCode(String),
    UnsupportedVersion(u8),
    Bech32Decode(CheckedHrpstringError),
    Secp256k1(secp256k1::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidNetwork(n) => write!(f, "Invalid network: {}", n),
            Error::InvalidCode(msg) => write!(f, "Invalid payment code: {}", msg),
            Error::UnsupportedVersion(v) => write!(f, "Unsupported version: {}", v),
            Error::Bech32Decode(e) => write!(f, "Bech32m decode error: {}", e),
            Error::Secp256k1(e) => write!(f, "Secp256k1 error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<CheckedHrpstringError> for Error {
    fn from(e: CheckedHrpstringError) -> Self {
        Error::Bech32Decode(e)
    }
}

impl From<secp256k1::Error> for Error {
    fn from(e: secp256k1::Error) -> Self {
        Error::Secp256k1(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The network format used for this payment code.
///
/// There are three network types: Mainnet (`sp1..`), Testnet (`tsp1..`), and Regtest (`sprt1..`).
/// Signet uses the same network type as Testnet.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl Network {
    fn hrp(self) -> Hrp {
        match self {
            Network::Mainnet => HRP_MAINNET,
            Network::Testnet => HRP_TESTNET,
            Network::Regtest => HRP_REGTEST,
        }
    }

    fn from_hrp(hrp: &Hrp) -> Result<Self> {
        if *hrp == HRP_MAINNET {
            Ok(Network::Mainnet)
        } else if *hrp == HRP_TESTNET {
            Ok(Network::Testnet)
        } else if *hrp == HRP_REGTEST {
            Ok(Network::Regtest)
        } else {
            Err(Error::InvalidCode(format!(
                "Wrong prefix, expected \"sp\", \"tsp\", or \"sprt\", got \"{}\"",
                hrp
            )))
        }
    }
}

impl From<Network> for &str {
    fn from(value: Network) -> Self {
        match value {
            Network::Mainnet => "bitcoin", // same string as rust-bitcoin
            Network::Regtest => "regtest",
            Network::Testnet => "testnet",
        }
    }
}

impl TryFrom<&str> for Network {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        let res = match value {
            "bitcoin" | "main" => Self::Mainnet,
            "regtest" => Self::Regtest,
            "testnet" | "signet" | "test" => Self::Testnet,
            _ => return Err(Error::InvalidNetwork(value.to_string())),
        };
        Ok(res)
    }
}

/// A version 0 silent payment code: the recipient's scan and spend public keys.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct PaymentCode {
    version: u8,
    scan_pubkey: PublicKey,
    spend_pubkey: PublicKey,
    network: Network,
}

#[cfg(feature = "serde")]
impl Serialize for PaymentCode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for PaymentCode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code: String = Deserialize::deserialize(deserializer)?;

        PaymentCode::try_from(code.as_str()).map_err(serde::de::Error::custom)
    }
}

impl PaymentCode {
    pub fn new(
        scan_pubkey: PublicKey,
        spend_pubkey: PublicKey,
        network: Network,
        version: u8,
    ) -> Result<Self> {
        if version != 0 {
            return Err(Error::UnsupportedVersion(version));
        }

        Ok(PaymentCode {
            version,
            scan_pubkey,
            spend_pubkey,
            network,
        })
    }

    /// Build a version 0 code, the only version this codec accepts.
    pub fn new_v0(scan_pubkey: PublicKey, spend_pubkey: PublicKey, network: Network) -> Self {
        PaymentCode {
            version: 0,
            scan_pubkey,
            spend_pubkey,
            network,
        }
    }

    /// Get the scan public key.
    pub fn get_scan_key(&self) -> PublicKey {
        self.scan_pubkey
    }

    /// Get the spend public key.
    pub fn get_spend_key(&self) -> PublicKey {
        self.spend_pubkey
    }

    /// Get the network.
    pub fn get_network(&self) -> Network {
        self.network
    }

    /// Get the version word.
    pub fn get_version(&self) -> u8 {
        self.version
    }
}

/// Returns true if `code` decodes to a version 0 payment code.
///
/// Checksum, prefix, length and key errors all count as invalid.
pub fn is_valid(code: &str) -> bool {
    PaymentCode::try_from(code).is_ok()
}

impl fmt::Display for PaymentCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut data = [0u8; PAYLOAD_LENGTH];
        data[..33].copy_from_slice(&self.scan_pubkey.serialize());
        data[33..].copy_from_slice(&self.spend_pubkey.serialize());

        // bech32m caps the code length at 1023 characters, not the 90 of segwit addresses
        let encoded = data
            .iter()
            .copied()
            .bytes_to_fes()
            .with_checksum::<Bech32m>(&self.network.hrp())
            .with_witness_version(Fe32::Q)
            .chars()
            .collect::<String>();

        f.write_str(&encoded)
    }
}

impl TryFrom<&str> for PaymentCode {
    type Error = Error;

    fn try_from(code: &str) -> Result<Self> {
        let checked = CheckedHrpstring::new::<Bech32m>(code)?;

        let network = Network::from_hrp(&checked.hrp())?;

        let mut words = checked.fe32_iter::<&mut dyn Iterator<Item = u8>>();

        let version = match words.next() {
            Some(word) => word.to_u8(),
            None => return Err(Error::InvalidCode("Missing version".to_string())),
        };
        if version != 0 {
            return Err(Error::UnsupportedVersion(version));
        }

        let data = words.fes_to_bytes().collect::<Vec<u8>>();
        if data.len() != PAYLOAD_LENGTH {
            return Err(Error::InvalidCode(format!(
                "Wrong payload length, expected {}, got {}",
                PAYLOAD_LENGTH,
                data.len()
            )));
        }

        let scan_pubkey = PublicKey::from_slice(&data[..33])?;
        let spend_pubkey = PublicKey::from_slice(&data[33..])?;

        PaymentCode::new(scan_pubkey, spend_pubkey, network, version)
    }
}

impl TryFrom<String> for PaymentCode {
    type Error = Error;

    fn try_from(code: String) -> Result<Self> {
        code.as_str().try_into()
    }
}

impl FromStr for PaymentCode {
    type Err = Error;

    fn from_str(code: &str) -> Result<Self> {
        code.try_into()
    }
}

impl From<PaymentCode> for String {
    fn from(val: PaymentCode) -> Self {
        val.to_string()
    }
}
