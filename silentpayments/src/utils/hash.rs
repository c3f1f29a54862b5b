use bitcoin::hashes::{sha256, Hash, HashEngine};

/// Tag binding a derivation to the spent outpoints and the aggregate input key.
pub const INPUTS_TAG: &str = "BIP0352/Inputs";
/// Tag deriving the per-output tweak from the ECDH shared point.
pub const SHARED_SECRET_TAG: &str = "BIP0352/SharedSecret";

/// BIP340 tagged hash: `SHA256(SHA256(tag) ‖ SHA256(tag) ‖ data)`.
pub fn tagged_hash(tag: &str, data: &[u8]) -> [u8; 32] {
    let tag_hash = sha256::Hash::hash(tag.as_bytes());

    let mut engine = sha256::Hash::engine();
    engine.input(tag_hash.as_ref());
    engine.input(tag_hash.as_ref());
    engine.input(data);

    sha256::Hash::from_engine(engine).to_byte_array()
}

/// Big-endian 4-byte serialization of `i`.
pub fn ser32(i: u32) -> [u8; 4] {
    i.to_be_bytes()
}
