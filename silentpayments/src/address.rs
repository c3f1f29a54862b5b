use bitcoin::address::NetworkUnchecked;
use bitcoin::key::TweakedPublicKey;
use bitcoin::secp256k1::XOnlyPublicKey;
use bitcoin::{Address, Network};

use crate::error::{Error, Result};

pub(crate) fn to_bitcoin_network(network: sp_code::Network) -> Network {
    match network {
        sp_code::Network::Mainnet => Network::Bitcoin,
        sp_code::Network::Testnet => Network::Testnet,
        sp_code::Network::Regtest => Network::Regtest,
    }
}

/// Taproot address paying straight to `output_key`.
pub(crate) fn taproot_address(output_key: XOnlyPublicKey, network: Network) -> Address {
    Address::p2tr_tweaked(
        TweakedPublicKey::dangerous_assume_tweaked(output_key),
        network,
    )
}

/// Encode a hex x-only public key as a taproot address.
pub fn pubkey_to_address(xonly_hex: &str, network: Network) -> Result<String> {
    let bytes = hex::decode(xonly_hex)?;
    let output_key = XOnlyPublicKey::from_slice(&bytes)?;

    Ok(taproot_address(output_key, network).to_string())
}

/// The hex x-only output key of a taproot address.
pub fn address_to_pubkey(address: &str) -> Result<String> {
    let unchecked: Address<NetworkUnchecked> = address
        .parse()
        .map_err(|e: bitcoin::address::ParseError| Error::Address(e.to_string()))?;
    let script_pubkey = unchecked.assume_checked().script_pubkey();

    if !script_pubkey.is_p2tr() {
        return Err(Error::Address(format!("{} is not a taproot address", address)));
    }

    Ok(hex::encode(&script_pubkey.as_bytes()[2..34]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "bc1pkrwcgdrye4e2uyfjchs54nucpwa7gq66hpzr68hcpxp739mxx29smlt4hf";

    #[test]
    fn address_round_trip() {
        let xonly = address_to_pubkey(ADDRESS).unwrap();
        assert_eq!(xonly.len(), 64);
        assert_eq!(pubkey_to_address(&xonly, Network::Bitcoin).unwrap(), ADDRESS);
    }

    #[test]
    fn network_decides_prefix() {
        let xonly = address_to_pubkey(ADDRESS).unwrap();
        let regtest = pubkey_to_address(&xonly, Network::Regtest).unwrap();

        assert!(regtest.starts_with("bcrt1p"));
        assert_eq!(address_to_pubkey(&regtest).unwrap(), xonly);
    }

    #[test]
    fn non_taproot_address_is_rejected() {
        assert!(matches!(
            address_to_pubkey("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"),
            Err(Error::Address(_))
        ));
        assert!(address_to_pubkey("definitely not an address").is_err());
    }

    #[test]
    fn bad_hex_is_rejected() {
        assert!(matches!(
            pubkey_to_address("zz", Network::Bitcoin),
            Err(Error::Hex(_))
        ));
        assert!(matches!(
            pubkey_to_address("00", Network::Bitcoin),
            Err(Error::Secp256k1(_))
        ));
    }
}
