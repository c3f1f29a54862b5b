use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey, Signing};
use bitcoin::{Amount, OutPoint, PrivateKey, ScriptBuf, Txid};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use crate::error::Result;
use crate::utils::secp::even_y_key;

/// How a spent output is unlocked, which decides if and how its key joins the shared secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UtxoType {
    P2wpkh,
    P2shP2wpkh,
    P2pkh,
    P2tr,
    /// Spendable in the transaction but kept out of the shared secret, e.g. a taproot
    /// script path spend whose internal key is provably unspendable.
    NonEligible,
}

/// An output the sender spends, with the private key that unlocks it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub txid: Txid,
    pub vout: u32,
    /// Serialized as hex; deserialized from hex or WIF, the latter also under `"wif"`.
    #[serde(alias = "wif", deserialize_with = "secret_or_wif")]
    pub private_key: SecretKey,
    pub utxo_type: UtxoType,
}

fn secret_or_wif<'de, D>(deserializer: D) -> std::result::Result<SecretKey, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    match SecretKey::from_str(&encoded) {
        Ok(key) => Ok(key),
        Err(_) => PrivateKey::from_wif(&encoded)
            .map(|key| key.inner)
            .map_err(serde::de::Error::custom),
    }
}

impl Utxo {
    pub fn new(txid: Txid, vout: u32, private_key: SecretKey, utxo_type: UtxoType) -> Self {
        Self {
            txid,
            vout,
            private_key,
            utxo_type,
        }
    }

    pub fn from_wif(txid: Txid, vout: u32, wif: &str, utxo_type: UtxoType) -> Result<Self> {
        let private_key = PrivateKey::from_wif(wif)?;
        Ok(Self::new(txid, vout, private_key.inner, utxo_type))
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }

    /// The key this input contributes to the sender's aggregate key, if any.
    ///
    /// Taproot keys are first mapped to their even-y counterpart.
    pub fn eligible_key<C: Signing>(&self, secp: &Secp256k1<C>) -> Option<SecretKey> {
        match self.utxo_type {
            UtxoType::NonEligible => None,
            UtxoType::P2tr => Some(even_y_key(secp, &self.private_key)),
            UtxoType::P2wpkh | UtxoType::P2shP2wpkh | UtxoType::P2pkh => Some(self.private_key),
        }
    }
}

/// Where a target pays to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Recipient {
    /// An ordinary address, passed through untouched.
    Address(String),
    /// A silent payment code, replaced by a one-time taproot address when resolved.
    PaymentCode(String),
}

/// One entry of a payment's output list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    #[serde(flatten)]
    pub recipient: Recipient,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Amount>,
}

impl Target {
    pub fn address(address: impl Into<String>, value: Option<Amount>) -> Self {
        Self {
            recipient: Recipient::Address(address.into()),
            value,
        }
    }

    pub fn payment_code(code: impl Into<String>, value: Option<Amount>) -> Self {
        Self {
            recipient: Recipient::PaymentCode(code.into()),
            value,
        }
    }

    pub fn is_payment_code(&self) -> bool {
        matches!(self.recipient, Recipient::PaymentCode(_))
    }
}

/// A payment to one spend key within a [`SilentPaymentGroup`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupEntry {
    pub spend_key: PublicKey,
    pub network: sp_code::Network,
    pub value: Option<Amount>,
    /// Position of the target in the caller's list.
    pub index: usize,
}

/// All payments to codes sharing one scan key, in the order they were listed.
///
/// The position of an entry is its output counter `k`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SilentPaymentGroup {
    pub scan_key: PublicKey,
    pub entries: Vec<GroupEntry>,
}

impl SilentPaymentGroup {
    pub fn new(scan_key: PublicKey) -> Self {
        Self {
            scan_key,
            entries: vec![],
        }
    }
}

/// An output found by the receiver, with the key that spends it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendableOutput {
    pub txid: Txid,
    pub vout: u32,
    pub amount: Amount,
    pub script_pubkey: ScriptBuf,
    /// `t_k`, the shared-secret tweak added to the spend key.
    pub tweak: SecretKey,
    pub private_key: SecretKey,
}

impl SpendableOutput {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}

impl From<&SpendableOutput> for Utxo {
    fn from(output: &SpendableOutput) -> Self {
        Utxo::new(output.txid, output.vout, output.private_key, UtxoType::P2tr)
    }
}

impl From<SpendableOutput> for Utxo {
    fn from(output: SpendableOutput) -> Self {
        (&output).into()
    }
}
