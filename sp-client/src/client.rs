use bitcoin::bip32::{ChildNumber, Xpriv};
use bitcoin::secp256k1::{All, PublicKey, Secp256k1, SecretKey};
use bitcoin::{NetworkKind, Transaction};
use serde::{Deserialize, Serialize};
use silentpayments::{scan_transaction, Network, PaymentCode, SpendableOutput, Utxo};

use crate::constants::{PURPOSE, SCAN_BRANCH, SPEND_BRANCH};
use crate::error::{Error, Result};

#[cfg(feature = "mnemonic")]
use crate::constants::DEFAULT_ACCOUNT;

/// A payment code together with the key pairs it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedCode {
    pub address: PaymentCode,
    pub scan_public: PublicKey,
    pub scan_private: SecretKey,
    pub spend_public: PublicKey,
    pub spend_private: SecretKey,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct SpClient {
    scan_sk: SecretKey,
    spend_sk: SecretKey,
    network: Network,
}

fn coin_type(network: Network) -> u32 {
    match network {
        Network::Mainnet => 0,
        Network::Testnet | Network::Regtest => 1,
    }
}

fn network_kind(network: Network) -> NetworkKind {
    match network {
        Network::Mainnet => NetworkKind::Main,
        Network::Testnet | Network::Regtest => NetworkKind::Test,
    }
}

impl SpClient {
    pub fn new(scan_sk: SecretKey, spend_sk: SecretKey, network: Network) -> Self {
        Self {
            scan_sk,
            spend_sk,
            network,
        }
    }

    /// Keys at `m/352'/coin'/account'/1'/0` (scan) and `m/352'/coin'/account'/0'/0` (spend),
    /// where `coin` is 0 on mainnet and 1 elsewhere.
    pub fn from_seed(seed: &[u8], account: u32, network: Network) -> Result<Self> {
        let secp = Secp256k1::new();
        let master_xpriv =
            Xpriv::new_master(network_kind(network), seed).map_err(|_| Error::SeedDerivation)?;

        let base_deriv = vec![
            ChildNumber::from_hardened_idx(PURPOSE).expect("352"),
            ChildNumber::from_hardened_idx(coin_type(network)).expect("0 or 1"),
            ChildNumber::from_hardened_idx(account)
                .map_err(|_| Error::KeyDerivation("account"))?,
        ];

        let mut scan_deriv = base_deriv.clone();
        scan_deriv.push(ChildNumber::from_hardened_idx(SCAN_BRANCH).expect("1"));
        scan_deriv.push(ChildNumber::from_normal_idx(0).expect("0"));

        let mut spend_deriv = base_deriv;
        spend_deriv.push(ChildNumber::from_hardened_idx(SPEND_BRANCH).expect("0"));
        spend_deriv.push(ChildNumber::from_normal_idx(0).expect("0"));

        let scan_sk = derive(&secp, &master_xpriv, &scan_deriv, "scan")?;
        let spend_sk = derive(&secp, &master_xpriv, &spend_deriv, "spend")?;

        log::debug!("derived {:?} keys for account {}", network, account);

        Ok(Self::new(scan_sk, spend_sk, network))
    }

    #[cfg(feature = "mnemonic")]
    pub fn from_mnemonic(
        mnemonic: &bip39::Mnemonic,
        passphrase: &str,
        account: u32,
        network: Network,
    ) -> Result<Self> {
        let seed = mnemonic.to_seed(passphrase);
        Self::from_seed(&seed, account, network)
    }

    pub fn get_scan_key(&self) -> SecretKey {
        self.scan_sk
    }

    pub fn get_spend_key(&self) -> SecretKey {
        self.spend_sk
    }

    pub fn get_network(&self) -> Network {
        self.network
    }

    pub fn payment_code(&self) -> PaymentCode {
        let secp = Secp256k1::signing_only();
        PaymentCode::new_v0(
            self.scan_sk.public_key(&secp),
            self.spend_sk.public_key(&secp),
            self.network,
        )
    }

    pub fn derived_code(&self) -> DerivedCode {
        let address = self.payment_code();
        DerivedCode {
            scan_public: address.get_scan_key(),
            scan_private: self.scan_sk,
            spend_public: address.get_spend_key(),
            spend_private: self.spend_sk,
            address,
        }
    }

    /// Outputs of `tx` paying to this client, given the transaction's tweak.
    pub fn scan(&self, tx: &Transaction, tweak: &PublicKey) -> Result<Vec<SpendableOutput>> {
        Ok(scan_transaction(tx, &self.scan_sk, &self.spend_sk, tweak)?)
    }

    /// Same as [`SpClient::scan`] with a hex encoded tweak, returning spendable utxos.
    pub fn scan_hex(&self, tx: &Transaction, tweak_hex: &str) -> Result<Vec<Utxo>> {
        let bytes = hex::decode(tweak_hex).map_err(|e| Error::InvalidTweak(e.to_string()))?;
        let tweak =
            PublicKey::from_slice(&bytes).map_err(|e| Error::InvalidTweak(e.to_string()))?;

        Ok(self.scan(tx, &tweak)?.into_iter().map(Utxo::from).collect())
    }
}

fn derive(
    secp: &Secp256k1<All>,
    master_xpriv: &Xpriv,
    path: &[ChildNumber],
    name: &'static str,
) -> Result<SecretKey> {
    Ok(master_xpriv
        .derive_priv(secp, &path)
        .map_err(|_| Error::KeyDerivation(name))?
        .private_key)
}

/// The mainnet payment code and keys of `account` for a bip39 mnemonic.
#[cfg(feature = "mnemonic")]
pub fn derive_code(mnemonic: &str, account: u32, passphrase: &str) -> Result<DerivedCode> {
    let mnemonic = bip39::Mnemonic::parse(mnemonic)?;
    let client = SpClient::from_mnemonic(&mnemonic, passphrase, account, Network::Mainnet)?;

    Ok(client.derived_code())
}

/// Outputs of `tx` owned by the default mainnet account of `mnemonic`.
#[cfg(feature = "mnemonic")]
pub fn scan(tx: &Transaction, mnemonic: &str, tweak_hex: &str) -> Result<Vec<Utxo>> {
    let mnemonic = bip39::Mnemonic::parse(mnemonic)?;
    let client = SpClient::from_mnemonic(&mnemonic, "", DEFAULT_ACCOUNT, Network::Mainnet)?;

    client.scan_hex(tx, tweak_hex)
}
