//! Low-level building blocks shared by the sender and the receiver.
pub(crate) mod common;
pub mod hash;
pub mod outpoint;
pub mod secp;
