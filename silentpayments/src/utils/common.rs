use bitcoin::key::TweakedPublicKey;
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey, Signing, XOnlyPublicKey};
use bitcoin::ScriptBuf;

use crate::error::Result;
use crate::utils::hash::{ser32, tagged_hash, SHARED_SECRET_TAG};
use crate::utils::secp::{point_add, point_from_scalar, scalar_from_hash};

/// `t_k = hash_BIP0352/SharedSecret(S ‖ ser32(k))`.
pub(crate) fn calculate_t_k(ecdh_shared_secret: &PublicKey, k: u32) -> Result<SecretKey> {
    let mut data = [0u8; 37];
    data[..33].copy_from_slice(&ecdh_shared_secret.serialize());
    data[33..].copy_from_slice(&ser32(k));

    scalar_from_hash(tagged_hash(SHARED_SECRET_TAG, &data))
}

/// `P_k = t_k * G + B_spend`.
#[allow(non_snake_case)]
pub(crate) fn calculate_P_k<C: Signing>(
    secp: &Secp256k1<C>,
    B_spend: &PublicKey,
    t_k: &SecretKey,
) -> Result<PublicKey> {
    point_add(&point_from_scalar(secp, t_k), B_spend)
}

/// Witness v1 script paying straight to `output_key`, with no further taproot tweak.
pub(crate) fn taproot_script(output_key: XOnlyPublicKey) -> ScriptBuf {
    ScriptBuf::new_p2tr_tweaked(TweakedPublicKey::dangerous_assume_tweaked(output_key))
}
