use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{PublicKey, SecretKey};
use bitcoin::OutPoint;

use crate::error::{Error, Result};
use crate::utils::hash::{tagged_hash, INPUTS_TAG};
use crate::utils::secp::scalar_from_hash;

/// Consensus serialization of an outpoint: txid in internal byte order, then the
/// output index as 4 little-endian bytes.
pub fn serialize_outpoint(outpoint: &OutPoint) -> [u8; 36] {
    let mut bytes = [0u8; 36];
    bytes[..32].copy_from_slice(&outpoint.txid.to_byte_array());
    bytes[32..].copy_from_slice(&outpoint.vout.to_le_bytes());
    bytes
}

/// The lexicographically smallest serialized outpoint, independent of input order.
pub fn smallest_outpoint<'a, I>(outpoints: I) -> Result<[u8; 36]>
where
    I: IntoIterator<Item = &'a OutPoint>,
{
    outpoints
        .into_iter()
        .map(serialize_outpoint)
        .min()
        .ok_or(Error::NoInputs)
}

/// `hash_BIP0352/Inputs(smallest_outpoint ‖ A)` as a scalar.
#[allow(non_snake_case)]
pub fn outpoint_hash<'a, I>(outpoints: I, A: &PublicKey) -> Result<SecretKey>
where
    I: IntoIterator<Item = &'a OutPoint>,
{
    let mut data = [0u8; 69];
    data[..36].copy_from_slice(&smallest_outpoint(outpoints)?);
    data[36..].copy_from_slice(&A.serialize());

    scalar_from_hash(tagged_hash(INPUTS_TAG, &data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::Txid;
    use std::str::FromStr;

    fn outpoint(txid: &str, vout: u32) -> OutPoint {
        OutPoint::new(Txid::from_str(txid).unwrap(), vout)
    }

    #[test]
    fn txid_is_stored_in_internal_order() {
        let op = outpoint(
            "a2365547d16b555593e3f58a2b67143fc8ab84e7e1257b1c13d2a9a2ec3a2efb",
            1,
        );
        let bytes = serialize_outpoint(&op);

        assert_eq!(bytes[0], 0xfb);
        assert_eq!(bytes[31], 0xa2);
        assert_eq!(&bytes[32..], &[1, 0, 0, 0]);
    }

    #[test]
    fn smallest_ignores_order() {
        let ops = [
            outpoint(
                "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16",
                0,
            ),
            outpoint(
                "a1075db55d416d3ca199f55b6084e2115b9345e16c5cf302fc80e9d5fbf5d48d",
                0,
            ),
            outpoint(
                "a1075db55d416d3ca199f55b6084e2115b9345e16c5cf302fc80e9d5fbf5d48d",
                3,
            ),
        ];
        let mut reversed = ops;
        reversed.reverse();

        let smallest = smallest_outpoint(&ops).unwrap();
        assert_eq!(smallest, smallest_outpoint(&reversed).unwrap());
        assert_eq!(smallest, serialize_outpoint(&ops[0]));
    }

    #[test]
    fn output_index_compares_little_endian() {
        let txid = "a1075db55d416d3ca199f55b6084e2115b9345e16c5cf302fc80e9d5fbf5d48d";
        let ops = [outpoint(txid, 1), outpoint(txid, 256)];

        assert_eq!(
            smallest_outpoint(&ops).unwrap(),
            serialize_outpoint(&ops[1])
        );
    }

    #[test]
    fn no_outpoints() {
        let none: [OutPoint; 0] = [];
        assert!(matches!(smallest_outpoint(&none), Err(Error::NoInputs)));
    }
}
