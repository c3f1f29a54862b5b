//! BIP352 silent payments.
//!
//! A sender turns each payment code among a transaction's outputs into a fresh
//! taproot address with [`resolve`], using the private keys of the inputs it spends.
//! The recipient recovers those outputs, and the keys that spend them, with
//! [`compute_tweak`] and [`scan_transaction`].
mod address;
pub mod error;
pub mod receiving;
pub mod sending;
mod structs;
pub mod utils;

pub use bitcoin;
pub use bitcoin::secp256k1;
pub use sp_code;

pub use address::{address_to_pubkey, pubkey_to_address};
pub use error::{Error, Result};
pub use receiving::{compute_tweak, compute_tweak_with_prevouts, scan_transaction};
pub use sending::resolve;
pub use sp_code::{Network, PaymentCode};
pub use structs::*;

/// True if `code` decodes to a payment code this crate can pay to.
pub fn is_payment_code_valid(code: &str) -> bool {
    sp_code::is_valid(code)
}
