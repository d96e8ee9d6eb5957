//! Signer capabilities.
//!
//! Two signer kinds exist and callers pick by context, never by shape:
//! the wallet signer (interactive, structured challenge signatures, used
//! once per handshake) and the session-key signer (non-interactive raw
//! digest signatures, used for every call after authentication).

use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use clearline_types::{Address, ChallengeEnvelope, CryptoError};

use crate::digest::{auth_challenge_digest, envelope_digest};
use crate::signature::Signature;

/// Non-interactive signing capability: a raw ECDSA signature over a 32-byte
/// digest.
pub trait MessageSigner: Send + Sync {
    fn address(&self) -> Address;

    fn sign_digest(&self, digest: [u8; 32]) -> Result<Signature, CryptoError>;

    /// Sign a serialized request envelope (keccak digest of the payload).
    fn sign_envelope(&self, payload: &[u8]) -> Result<Signature, CryptoError> {
        self.sign_digest(envelope_digest(payload))
    }
}

/// Interactive wallet capability: produces the structured, domain-separated
/// signature over the auth challenge. External key custodians implement this
/// trait; [`LocalWallet`] is the in-process implementation.
pub trait WalletSigner: MessageSigner {
    fn sign_auth_challenge(&self, envelope: &ChallengeEnvelope) -> Result<Signature, CryptoError> {
        self.sign_digest(auth_challenge_digest(envelope))
    }
}

/// Ephemeral per-connection signing key. Generated fresh for every connect
/// attempt and never persisted beyond the connection's lifetime.
#[derive(Debug, Clone)]
pub struct SessionKeySigner {
    key: PrivateKeySigner,
    address: Address,
}

impl SessionKeySigner {
    pub fn random() -> Self {
        Self::from_key(PrivateKeySigner::random())
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let key = PrivateKeySigner::from_slice(bytes)
            .map_err(|err| CryptoError::InvalidKey(err.to_string()))?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: PrivateKeySigner) -> Self {
        let address = addr_from_alloy(key.address());
        Self { key, address }
    }
}

impl MessageSigner for SessionKeySigner {
    fn address(&self) -> Address {
        self.address
    }

    fn sign_digest(&self, digest: [u8; 32]) -> Result<Signature, CryptoError> {
        sign_with(&self.key, digest)
    }
}

/// In-process wallet backed by a raw private key. Production deployments
/// hand an external custodian implementation of [`WalletSigner`] to the
/// client instead.
#[derive(Debug, Clone)]
pub struct LocalWallet {
    key: PrivateKeySigner,
    address: Address,
}

impl LocalWallet {
    pub fn random() -> Self {
        Self::from_key(PrivateKeySigner::random())
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let key = PrivateKeySigner::from_slice(bytes)
            .map_err(|err| CryptoError::InvalidKey(err.to_string()))?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: PrivateKeySigner) -> Self {
        let address = addr_from_alloy(key.address());
        Self { key, address }
    }
}

impl MessageSigner for LocalWallet {
    fn address(&self) -> Address {
        self.address
    }

    fn sign_digest(&self, digest: [u8; 32]) -> Result<Signature, CryptoError> {
        sign_with(&self.key, digest)
    }
}

impl WalletSigner for LocalWallet {}

fn sign_with(key: &PrivateKeySigner, digest: [u8; 32]) -> Result<Signature, CryptoError> {
    let signature = key
        .sign_hash_sync(&digest.into())
        .map_err(|err| CryptoError::SigningFailed(err.to_string()))?;
    Ok(Signature::from_alloy(&signature))
}

fn addr_from_alloy(address: alloy_primitives::Address) -> Address {
    Address::new(address.0 .0)
}

#[cfg(test)]
mod tests {
    use clearline_types::{Address, Allowance, AuthParams, ChallengeEnvelope};

    use super::{LocalWallet, MessageSigner, SessionKeySigner, WalletSigner};
    use crate::digest::auth_challenge_digest;

    fn challenge_for(wallet: &LocalWallet, session: &SessionKeySigner) -> ChallengeEnvelope {
        ChallengeEnvelope {
            challenge: "chal-1".to_string(),
            wallet: wallet.address(),
            params: AuthParams {
                scope: "trading".to_string(),
                session_key_address: session.address(),
                expires_at: 1_800_000_000_000,
                allowances: vec![Allowance {
                    asset: "usdc".to_string(),
                    amount: "100".to_string(),
                }],
                application_id: "clearline".to_string(),
            },
        }
    }

    #[test]
    fn session_key_signature_recovers_to_its_address() {
        let signer = SessionKeySigner::from_bytes(&[0x21; 32]).unwrap();
        let payload = br#"[7,"get_balances",{},1000]"#;
        let signature = signer.sign_envelope(payload).unwrap();
        let recovered = signature
            .recover(crate::digest::envelope_digest(payload))
            .unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn wallet_challenge_signature_recovers_to_wallet_address() {
        let wallet = LocalWallet::from_bytes(&[0x11; 32]).unwrap();
        let session = SessionKeySigner::from_bytes(&[0x22; 32]).unwrap();
        let envelope = challenge_for(&wallet, &session);

        let signature = wallet.sign_auth_challenge(&envelope).unwrap();
        let recovered = signature.recover(auth_challenge_digest(&envelope)).unwrap();
        assert_eq!(recovered, wallet.address());
    }

    #[test]
    fn fresh_session_keys_are_distinct() {
        let a = SessionKeySigner::random();
        let b = SessionKeySigner::random();
        assert_ne!(a.address(), b.address());
        assert_ne!(a.address(), Address::default());
    }
}
