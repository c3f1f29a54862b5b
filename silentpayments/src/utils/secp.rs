//! Scalar and point arithmetic over secp256k1.
//!
//! Every operation that can land on the zero scalar or the point at infinity
//! returns [`Error::InvalidResult`] instead of a substitute value.
use bitcoin::secp256k1::{
    ecdh::shared_secret_point, Parity, PublicKey, Scalar, Secp256k1, SecretKey, Signing,
    Verification,
};

use crate::error::{Error, Result};

/// `a + b mod n`.
pub fn scalar_add(a: &SecretKey, b: &SecretKey) -> Result<SecretKey> {
    a.add_tweak(&Scalar::from(*b))
        .map_err(|_| Error::InvalidResult("scalar addition"))
}

/// `a * b mod n`.
pub fn scalar_multiply(a: &SecretKey, b: &SecretKey) -> Result<SecretKey> {
    a.mul_tweak(&Scalar::from(*b))
        .map_err(|_| Error::InvalidResult("scalar multiplication"))
}

/// `n - a`.
pub fn scalar_negate(a: &SecretKey) -> SecretKey {
    a.negate()
}

/// Interpret a 32-byte big-endian hash as a scalar.
///
/// Hashes that are zero or not below the curve order are rejected, never reduced.
pub fn scalar_from_hash(hash: [u8; 32]) -> Result<SecretKey> {
    SecretKey::from_slice(&hash).map_err(|_| Error::InvalidResult("hash to scalar"))
}

/// `k * G`.
pub fn point_from_scalar<C: Signing>(secp: &Secp256k1<C>, k: &SecretKey) -> PublicKey {
    k.public_key(secp)
}

/// `k * P`.
pub fn point_multiply<C: Verification>(
    secp: &Secp256k1<C>,
    point: &PublicKey,
    k: &SecretKey,
) -> Result<PublicKey> {
    point
        .mul_tweak(secp, &Scalar::from(*k))
        .map_err(|_| Error::InvalidResult("point multiplication"))
}

/// `P + Q`.
pub fn point_add(p: &PublicKey, q: &PublicKey) -> Result<PublicKey> {
    p.combine(q).map_err(|_| Error::InvalidResult("point addition"))
}

/// Sum of all `points`.
pub fn combine_points(points: &[PublicKey]) -> Result<PublicKey> {
    if points.is_empty() {
        return Err(Error::InvalidResult("empty point sum"));
    }
    let refs: Vec<&PublicKey> = points.iter().collect();
    PublicKey::combine_keys(&refs).map_err(|_| Error::InvalidResult("point sum"))
}

/// Shared point `secret * point`, computed in constant time.
pub fn ecdh(secret: &SecretKey, point: &PublicKey) -> Result<PublicKey> {
    let mut uncompressed = [0u8; 65];
    uncompressed[0] = 0x04;
    uncompressed[1..].copy_from_slice(&shared_secret_point(point, secret));

    PublicKey::from_slice(&uncompressed).map_err(|_| Error::InvalidResult("ecdh"))
}

/// True if `k * G` has an odd y coordinate (compressed prefix `0x03`).
pub fn has_odd_y<C: Signing>(secp: &Secp256k1<C>, k: &SecretKey) -> bool {
    let (_, parity) = k.x_only_public_key(secp);
    parity == Parity::Odd
}

/// The key that produces the even-y point with the same x coordinate as `k * G`.
///
/// Only keys spent under taproot rules go through this; other key types keep their parity.
pub fn even_y_key<C: Signing>(secp: &Secp256k1<C>, k: &SecretKey) -> SecretKey {
    if has_odd_y(secp, k) {
        scalar_negate(k)
    } else {
        *k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn key(hex: &str) -> SecretKey {
        SecretKey::from_str(hex).unwrap()
    }

    const ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";
    const TWO: &str = "0000000000000000000000000000000000000000000000000000000000000002";
    const THREE: &str = "0000000000000000000000000000000000000000000000000000000000000003";
    const N_MINUS_ONE: &str = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364140";

    #[test]
    fn scalar_arithmetic() {
        assert_eq!(scalar_add(&key(ONE), &key(TWO)).unwrap(), key(THREE));
        assert_eq!(
            scalar_multiply(&key(THREE), &key(TWO)).unwrap(),
            key("0000000000000000000000000000000000000000000000000000000000000006")
        );
        assert_eq!(scalar_negate(&key(ONE)), key(N_MINUS_ONE));
    }

    #[test]
    fn scalar_sum_to_zero_fails() {
        assert!(matches!(
            scalar_add(&key(ONE), &key(N_MINUS_ONE)),
            Err(Error::InvalidResult(_))
        ));
    }

    #[test]
    fn hash_above_order_is_rejected() {
        assert!(scalar_from_hash([0xff; 32]).is_err());
        assert!(scalar_from_hash([0x00; 32]).is_err());
        assert_eq!(scalar_from_hash(key(TWO).secret_bytes()).unwrap(), key(TWO));
    }

    #[test]
    fn point_arithmetic_agrees_with_scalars() {
        let secp = Secp256k1::new();
        let g = point_from_scalar(&secp, &key(ONE));
        let two_g = point_from_scalar(&secp, &key(TWO));
        let three_g = point_from_scalar(&secp, &key(THREE));

        assert_eq!(point_add(&g, &two_g).unwrap(), three_g);
        assert_eq!(point_multiply(&secp, &g, &key(THREE)).unwrap(), three_g);
        assert_eq!(combine_points(&[g, g, g]).unwrap(), three_g);
        assert_eq!(ecdh(&key(THREE), &g).unwrap(), three_g);
    }

    #[test]
    fn point_sum_at_infinity_fails() {
        let secp = Secp256k1::new();
        let g = point_from_scalar(&secp, &key(ONE));
        let minus_g = point_from_scalar(&secp, &key(N_MINUS_ONE));

        assert!(matches!(
            point_add(&g, &minus_g),
            Err(Error::InvalidResult(_))
        ));
        assert!(combine_points(&[]).is_err());
    }

    #[test]
    fn even_y_key_flips_only_odd_points() {
        let secp = Secp256k1::new();
        // G has an even y, so -G has an odd one
        assert!(!has_odd_y(&secp, &key(ONE)));
        assert!(has_odd_y(&secp, &key(N_MINUS_ONE)));

        assert_eq!(even_y_key(&secp, &key(ONE)), key(ONE));

        let corrected = even_y_key(&secp, &key(N_MINUS_ONE));
        assert_eq!(corrected, key(ONE));
        assert_eq!(
            corrected.x_only_public_key(&secp).0,
            key(N_MINUS_ONE).x_only_public_key(&secp).0
        );
    }
}
