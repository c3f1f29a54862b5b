//! Sender side: turn payment-code targets into one-time taproot outputs.
//!
//! [`resolve`] derives every output of a transaction at once. It must only be
//! called once per transaction; resolving the same codes again against the same
//! inputs yields the same addresses.
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey, Signing};
use bitcoin::OutPoint;
use sp_code::PaymentCode;
use std::collections::HashMap;

use crate::address::{taproot_address, to_bitcoin_network};
use crate::error::{Error, Result};
use crate::structs::{GroupEntry, Recipient, SilentPaymentGroup, Target, Utxo};
use crate::utils::common::{calculate_P_k, calculate_t_k};
use crate::utils::outpoint::outpoint_hash;
use crate::utils::secp::{ecdh, point_from_scalar, scalar_add, scalar_multiply};

/// Replace every payment-code target with its one-time taproot address.
///
/// The result has the same length and order as `targets`. Address targets are
/// copied unchanged, and when there are no payment codes no key material is read.
///
/// # Errors
///
/// * [`Error::UnsupportedVersion`] / [`Error::Decode`] for an unusable payment code.
/// * [`Error::NoInputs`] if `utxos` is empty.
/// * [`Error::NoEligibleInputs`] if every utxo is [`UtxoType::NonEligible`](crate::UtxoType::NonEligible).
/// * [`Error::InvalidResult`] if the curve arithmetic degenerates.
pub fn resolve(utxos: &[Utxo], targets: &[Target]) -> Result<Vec<Target>> {
    let mut resolved: Vec<Option<Target>> = vec![None; targets.len()];

    let groups = group_targets(targets, &mut resolved)?;
    if groups.is_empty() {
        return Ok(resolved.into_iter().flatten().collect());
    }

    let secp = Secp256k1::new();
    let partial_secret = calculate_partial_secret(&secp, utxos)?;

    log::debug!(
        "resolving {} payment code targets in {} groups",
        groups.iter().map(|g| g.entries.len()).sum::<usize>(),
        groups.len()
    );

    // Use parallel iteration for CPU-intensive ECDH calculations
    #[cfg(all(not(target_arch = "wasm32"), feature = "parallel"))]
    let outputs: Result<Vec<Vec<(usize, Target)>>> = {
        use rayon::prelude::*;
        groups
            .par_iter()
            .map(|group| resolve_group(&secp, group, &partial_secret))
            .collect()
    };

    // Sequential fallback (WASM or no parallel feature)
    #[cfg(not(all(not(target_arch = "wasm32"), feature = "parallel")))]
    let outputs: Result<Vec<Vec<(usize, Target)>>> = groups
        .iter()
        .map(|group| resolve_group(&secp, group, &partial_secret))
        .collect();

    for (index, target) in outputs?.into_iter().flatten() {
        resolved[index] = Some(target);
    }

    resolved
        .into_iter()
        .collect::<Option<Vec<Target>>>()
        .ok_or(Error::InvalidResult("target resolution"))
}

/// Copy address targets into `resolved` and gather payment codes by scan key.
///
/// Groups keep the order their scan key was first seen in, entries keep list order.
pub fn group_targets(
    targets: &[Target],
    resolved: &mut [Option<Target>],
) -> Result<Vec<SilentPaymentGroup>> {
    let mut groups: Vec<SilentPaymentGroup> = vec![];
    let mut positions: HashMap<[u8; 33], usize> = HashMap::new();

    for (index, target) in targets.iter().enumerate() {
        let code = match &target.recipient {
            Recipient::Address(_) => {
                resolved[index] = Some(target.clone());
                continue;
            }
            Recipient::PaymentCode(code) => PaymentCode::try_from(code.as_str())?,
        };

        let scan_key = code.get_scan_key();
        let position = *positions.entry(scan_key.serialize()).or_insert_with(|| {
            groups.push(SilentPaymentGroup::new(scan_key));
            groups.len() - 1
        });

        groups[position].entries.push(GroupEntry {
            spend_key: code.get_spend_key(),
            network: code.get_network(),
            value: target.value,
            index,
        });
    }

    Ok(groups)
}

/// Sum of the eligible input keys, taproot keys taken with even y.
///
/// Running sums may pass through zero; only a zero total is an [`Error::InvalidResult`].
pub fn aggregate_input_key<C: Signing>(secp: &Secp256k1<C>, utxos: &[Utxo]) -> Result<SecretKey> {
    if utxos.is_empty() {
        return Err(Error::NoInputs);
    }

    let mut eligible = 0usize;
    // None stands for a zero running sum
    let mut a_sum: Option<SecretKey> = None;
    for key in utxos.iter().filter_map(|utxo| utxo.eligible_key(secp)) {
        eligible += 1;
        a_sum = match a_sum {
            Some(sum) if sum == key.negate() => None,
            Some(sum) => Some(scalar_add(&sum, &key)?),
            None => Some(key),
        };
    }

    if eligible == 0 {
        return Err(Error::NoEligibleInputs);
    }
    a_sum.ok_or(Error::InvalidResult("input key sum"))
}

/// `outpoint_hash * a`, the sender's half of every shared secret in the transaction.
#[allow(non_snake_case)]
pub fn calculate_partial_secret<C: Signing>(
    secp: &Secp256k1<C>,
    utxos: &[Utxo],
) -> Result<SecretKey> {
    let a_sum = aggregate_input_key(secp, utxos)?;
    let A_sum = point_from_scalar(secp, &a_sum);

    let outpoints: Vec<OutPoint> = utxos.iter().map(Utxo::outpoint).collect();
    let input_hash = outpoint_hash(&outpoints, &A_sum)?;

    scalar_multiply(&input_hash, &a_sum)
}

#[allow(non_snake_case)]
fn resolve_group<C: Signing>(
    secp: &Secp256k1<C>,
    group: &SilentPaymentGroup,
    partial_secret: &SecretKey,
) -> Result<Vec<(usize, Target)>> {
    let ecdh_shared_secret: PublicKey = ecdh(partial_secret, &group.scan_key)?;

    let mut outputs = Vec::with_capacity(group.entries.len());
    for (k, entry) in (0u32..).zip(group.entries.iter()) {
        let t_k = calculate_t_k(&ecdh_shared_secret, k)?;
        let P_k = calculate_P_k(secp, &entry.spend_key, &t_k)?;
        let (output_key, _) = P_k.x_only_public_key();

        let address = taproot_address(output_key, to_bitcoin_network(entry.network));
        log::trace!("target {} resolved to {} (k = {})", entry.index, address, k);

        outputs.push((entry.index, Target::address(address.to_string(), entry.value)));
    }

    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::UtxoType;
    use bitcoin::Txid;
    use std::str::FromStr;

    const TXID: &str = "a2365547d16b555593e3f58a2b67143fc8ab84e7e1257b1c13d2a9a2ec3a2efb";
    const SCAN_SK: &str = "57f0148f94d13095cfda539d0da0d1541304b678d8b36e243980aab4e1b7cead";

    fn code(scan_byte: u8, spend_byte: u8) -> String {
        let secp = Secp256k1::new();
        let scan = SecretKey::from_slice(&[scan_byte; 32]).unwrap().public_key(&secp);
        let spend = SecretKey::from_slice(&[spend_byte; 32]).unwrap().public_key(&secp);
        PaymentCode::new_v0(scan, spend, sp_code::Network::Mainnet).to_string()
    }

    fn utxo(vout: u32, utxo_type: UtxoType) -> Utxo {
        Utxo::new(
            Txid::from_str(TXID).unwrap(),
            vout,
            SecretKey::from_str(SCAN_SK).unwrap(),
            utxo_type,
        )
    }

    #[test]
    fn groups_follow_first_seen_scan_key() {
        let targets = vec![
            Target::payment_code(code(1, 2), None),
            Target::address("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4", None),
            Target::payment_code(code(3, 4), None),
            Target::payment_code(code(1, 5), Some(bitcoin::Amount::from_sat(7))),
        ];
        let mut resolved: Vec<Option<Target>> = vec![None; targets.len()];

        let groups = group_targets(&targets, &mut resolved).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[0].entries.iter().map(|e| e.index).collect::<Vec<_>>(),
            [0, 3]
        );
        assert_eq!(groups[1].entries[0].index, 2);
        assert_eq!(groups[0].entries[1].value, Some(bitcoin::Amount::from_sat(7)));

        assert_eq!(resolved[1], Some(targets[1].clone()));
        assert!(resolved[0].is_none() && resolved[2].is_none() && resolved[3].is_none());
    }

    #[test]
    fn aggregate_skips_non_eligible() {
        let secp = Secp256k1::new();
        let single = aggregate_input_key(&secp, &[utxo(0, UtxoType::P2wpkh)]).unwrap();
        let mixed = aggregate_input_key(
            &secp,
            &[utxo(0, UtxoType::NonEligible), utxo(1, UtxoType::P2wpkh)],
        )
        .unwrap();

        assert_eq!(single, mixed);
    }

    #[test]
    fn aggregate_errors() {
        let secp = Secp256k1::new();
        assert!(matches!(
            aggregate_input_key(&secp, &[]),
            Err(Error::NoInputs)
        ));
        assert!(matches!(
            aggregate_input_key(&secp, &[utxo(0, UtxoType::NonEligible)]),
            Err(Error::NoEligibleInputs)
        ));
    }

    #[test]
    fn zero_partial_sum_is_not_final() {
        let secp = Secp256k1::new();
        let k = utxo(0, UtxoType::P2wpkh);
        let mut minus_k = utxo(1, UtxoType::P2wpkh);
        minus_k.private_key = k.private_key.negate();
        let k_again = utxo(2, UtxoType::P2pkh);

        let cancelling_first = [k.clone(), minus_k.clone(), k_again.clone()];
        let cancelling_last = [k.clone(), k_again.clone(), minus_k.clone()];

        assert_eq!(
            aggregate_input_key(&secp, &cancelling_first).unwrap(),
            k.private_key
        );
        assert_eq!(
            aggregate_input_key(&secp, &cancelling_last).unwrap(),
            k.private_key
        );

        let targets = vec![Target::payment_code(code(1, 2), None)];
        assert_eq!(
            resolve(&cancelling_first, &targets).unwrap(),
            resolve(&cancelling_last, &targets).unwrap()
        );
    }

    #[test]
    fn keys_summing_to_zero() {
        let secp = Secp256k1::new();
        let k = utxo(0, UtxoType::P2wpkh);
        let mut minus_k = utxo(1, UtxoType::P2wpkh);
        minus_k.private_key = k.private_key.negate();

        assert!(matches!(
            aggregate_input_key(&secp, &[k, minus_k]),
            Err(Error::InvalidResult(_))
        ));
    }

    #[test]
    fn same_scan_key_gets_increasing_k() {
        let utxos = [utxo(0, UtxoType::P2wpkh)];
        // same scan key and same spend key: only k tells the two outputs apart
        let targets = vec![
            Target::payment_code(code(1, 2), None),
            Target::payment_code(code(1, 2), None),
        ];

        let resolved = resolve(&utxos, &targets).unwrap();
        assert_ne!(resolved[0], resolved[1]);

        let first_alone = resolve(&utxos, &targets[..1]).unwrap();
        assert_eq!(first_alone[0], resolved[0]);
    }

    #[test]
    fn unresolved_version_is_reported() {
        let utxos = [utxo(0, UtxoType::P2wpkh)];
        let targets = vec![Target::payment_code(
            "sp1lq0u4yswlkqx36shz7j8mwt335p4el5txc8tt6yny3dqewlw4rwdqkqle2fqalvqdr4pw9ay0kuhrrgrtnlgkdswkh5fxfz6pja7a2xu6pvccpqt4",
            None,
        )];

        assert!(matches!(
            resolve(&utxos, &targets),
            Err(Error::UnsupportedVersion(31))
        ));
    }
}
