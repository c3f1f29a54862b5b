//! Receiver side: compute a transaction's tweak and find the outputs it pays to us.
use bitcoin::hashes::Hash;
use bitcoin::script::Instruction;
use bitcoin::secp256k1::{Parity, PublicKey, Secp256k1, SecretKey, Verification, XOnlyPublicKey};
use bitcoin::{CompressedPublicKey, OutPoint, Script, Transaction, TxIn, TxOut};

use crate::error::{Error, Result};
use crate::structs::SpendableOutput;
use crate::utils::common::{calculate_P_k, calculate_t_k, taproot_script};
use crate::utils::outpoint::outpoint_hash;
use crate::utils::secp::{combine_points, ecdh, point_from_scalar, point_multiply, scalar_add};

/// x coordinate of the NUMS point `H` (BIP341); a taproot internal key equal to it has no
/// known private key.
pub const NUMS_H: [u8; 32] = [
    0x50, 0x92, 0x9b, 0x74, 0xc1, 0xa0, 0x49, 0x54, 0xb7, 0x8b, 0x4b, 0x60, 0x35, 0xe9, 0x7a, 0x5e,
    0x07, 0x8a, 0x5a, 0x0f, 0x28, 0xec, 0x96, 0xd5, 0x47, 0xbf, 0xee, 0x9a, 0xce, 0x80, 0x3a, 0xc0,
];

fn compressed_key(bytes: &[u8]) -> Option<PublicKey> {
    if bytes.len() == 33 {
        PublicKey::from_slice(bytes).ok()
    } else {
        None
    }
}

fn pushes(script: &Script) -> Vec<&[u8]> {
    script
        .instructions()
        .filter_map(|instruction| match instruction {
            Ok(Instruction::PushBytes(bytes)) => Some(bytes.as_bytes()),
            _ => None,
        })
        .collect()
}

/// Keys in `items`, plus those of the trailing item parsed as a script when it is not a key.
fn keys_with_nested_script(items: &[&[u8]], keys: &mut Vec<PublicKey>) {
    keys.extend(items.iter().filter_map(|item| compressed_key(item)));

    if let Some(last) = items.last() {
        if compressed_key(last).is_none() {
            let nested = pushes(Script::from_bytes(last));
            keys.extend(nested.iter().filter_map(|item| compressed_key(item)));
        }
    }
}

/// Every compressed public key revealed by an input's unlocking data.
///
/// Looks at the pushes of the script sig and the witness items, and at a
/// trailing redeem script or witness script.
pub fn input_public_keys(txin: &TxIn) -> Vec<PublicKey> {
    let mut keys = vec![];

    keys_with_nested_script(&pushes(&txin.script_sig), &mut keys);

    let witness: Vec<&[u8]> = txin.witness.iter().collect();
    keys_with_nested_script(&witness, &mut keys);

    keys
}

/// The key an input contributes under BIP352, given the script it spends.
///
/// Returns `None` for inputs that take no part in the shared secret.
pub fn eligible_input_key(txin: &TxIn, script_pubkey: &Script) -> Option<PublicKey> {
    if script_pubkey.is_p2tr() {
        if txin.witness.is_empty() {
            return None;
        }
        if let Some(control_block) = txin.witness.taproot_control_block() {
            if control_block.len() >= 33 && control_block[1..33] == NUMS_H {
                return None;
            }
        }
        XOnlyPublicKey::from_slice(&script_pubkey.as_bytes()[2..34])
            .ok()
            .map(|xonly| xonly.public_key(Parity::Even))
    } else if script_pubkey.is_p2wpkh() {
        txin.witness.last().and_then(compressed_key)
    } else if script_pubkey.is_p2sh() {
        let redeem_script = txin.script_sig.redeem_script()?;
        if !redeem_script.is_p2wpkh() {
            return None;
        }
        txin.witness.last().and_then(compressed_key)
    } else if script_pubkey.is_p2pkh() {
        let pubkey_hash = &script_pubkey.as_bytes()[3..23];
        txin.script_sig
            .as_bytes()
            .windows(33)
            .rev()
            .filter_map(|window| CompressedPublicKey::from_slice(window).ok())
            .find(|key| key.pubkey_hash().to_byte_array() == pubkey_hash)
            .map(|key| key.0)
    } else {
        None
    }
}

#[allow(non_snake_case)]
fn tweak_from_keys<C: Verification>(
    secp: &Secp256k1<C>,
    tx: &Transaction,
    keys: &[PublicKey],
) -> Result<PublicKey> {
    if keys.is_empty() {
        return Err(Error::NoEligibleInputs);
    }

    let A_sum = combine_points(keys)?;
    let outpoints: Vec<OutPoint> = tx.input.iter().map(|txin| txin.previous_output).collect();
    let input_hash = outpoint_hash(&outpoints, &A_sum)?;

    point_multiply(secp, &A_sum, &input_hash)
}

/// `outpoint_hash * A`, where `A` sums every public key found in the inputs' unlocking data.
///
/// Works without the spent outputs, so taproot key path inputs, which reveal no key,
/// do not contribute. Use [`compute_tweak_with_prevouts`] when the prevouts are known.
pub fn compute_tweak(tx: &Transaction) -> Result<PublicKey> {
    if tx.input.is_empty() {
        return Err(Error::NoInputs);
    }

    let mut keys = vec![];
    for (vin, txin) in tx.input.iter().enumerate() {
        let found = input_public_keys(txin);
        if found.is_empty() {
            log::warn!("input {} of {} reveals no public key", vin, tx.compute_txid());
        }
        keys.extend(found);
    }

    tweak_from_keys(&Secp256k1::verification_only(), tx, &keys)
}

/// Same as [`compute_tweak`], classifying inputs by the outputs they spend.
///
/// `prevouts[i]` must be the output spent by `tx.input[i]`.
pub fn compute_tweak_with_prevouts(tx: &Transaction, prevouts: &[TxOut]) -> Result<PublicKey> {
    if tx.input.is_empty() {
        return Err(Error::NoInputs);
    }
    if tx.input.len() != prevouts.len() {
        return Err(Error::PrevoutMismatch {
            inputs: tx.input.len(),
            prevouts: prevouts.len(),
        });
    }

    let keys: Vec<PublicKey> = tx
        .input
        .iter()
        .zip(prevouts)
        .filter_map(|(txin, prevout)| eligible_input_key(txin, &prevout.script_pubkey))
        .collect();

    log::debug!("{} of {} inputs are eligible", keys.len(), tx.input.len());

    tweak_from_keys(&Secp256k1::verification_only(), tx, &keys)
}

/// Find the outputs of `tx` paying to the code made of `scan_sk` and `spend_sk`.
///
/// Output keys are derived for `k = 0, 1, …` until a `k` matches nothing.
/// Labelled spend keys are not checked.
#[allow(non_snake_case)]
pub fn scan_transaction(
    tx: &Transaction,
    scan_sk: &SecretKey,
    spend_sk: &SecretKey,
    tweak: &PublicKey,
) -> Result<Vec<SpendableOutput>> {
    let secp = Secp256k1::new();
    let txid = tx.compute_txid();
    let B_spend = point_from_scalar(&secp, spend_sk);
    let ecdh_shared_secret = ecdh(scan_sk, tweak)?;

    let mut candidates: Vec<(u32, &TxOut)> = tx
        .output
        .iter()
        .enumerate()
        .filter(|(_, txout)| txout.script_pubkey.is_p2tr())
        .map(|(vout, txout)| (vout as u32, txout))
        .collect();

    let mut found = vec![];
    let mut k = 0u32;
    while !candidates.is_empty() {
        let t_k = calculate_t_k(&ecdh_shared_secret, k)?;
        let P_k = calculate_P_k(&secp, &B_spend, &t_k)?;
        let expected = taproot_script(P_k.x_only_public_key().0);

        let (matched, rest): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|(_, txout)| txout.script_pubkey == expected);
        candidates = rest;

        if matched.is_empty() {
            break;
        }

        let private_key = scalar_add(spend_sk, &t_k).map_err(|_| Error::InvalidDerivation)?;
        for (vout, txout) in matched {
            log::trace!("output {}:{} is ours (k = {})", txid, vout, k);
            found.push(SpendableOutput {
                txid,
                vout,
                amount: txout.value,
                script_pubkey: txout.script_pubkey.clone(),
                tweak: t_k,
                private_key,
            });
        }
        k += 1;
    }

    log::debug!("found {} owned outputs in {}", found.len(), txid);

    Ok(found)
}
