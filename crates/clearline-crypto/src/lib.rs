//! Crypto implementations: signer capabilities, challenge digests, secp256k1
//! signatures with recovery.

pub mod digest;
pub mod signature;
pub mod signer;

pub use digest::{auth_challenge_digest, domain_separator, envelope_digest, AUTH_DOMAIN_NAME};
pub use signature::Signature;
pub use signer::{LocalWallet, MessageSigner, SessionKeySigner, WalletSigner};
