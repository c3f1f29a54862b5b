//! Wallet side of silent payments: keys derived from a seed at `m/352'/coin'/account'`,
//! the payment code they form, and scanning transactions for outputs paid to it.
mod client;
pub mod constants;
mod error;

pub use bitcoin;
pub use silentpayments;

pub use client::*;
pub use error::{Error, Result};
