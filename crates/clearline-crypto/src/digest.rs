//! Canonical digests for the two signing paths.
//!
//! The wallet signs a structured, domain-separated digest over the auth
//! challenge (EIP-712 encoding: typehash plus 32-byte words, strings and
//! arrays hashed). The session key signs a plain keccak digest of the
//! serialized request envelope.

use alloy_primitives::keccak256;
use clearline_types::{Address, Allowance, ChallengeEnvelope};

/// EIP-712 domain name for the challenge signature.
pub const AUTH_DOMAIN_NAME: &str = "clearline";

const DOMAIN_TYPE: &[u8] = b"EIP712Domain(string name)";
const POLICY_TYPE: &[u8] = b"Policy(string challenge,string scope,address wallet,address participant,string application,uint256 expire,Allowance[] allowances)Allowance(string asset,string amount)";
const ALLOWANCE_TYPE: &[u8] = b"Allowance(string asset,string amount)";

/// Digest of a serialized request envelope, signed by the session key.
pub fn envelope_digest(payload: &[u8]) -> [u8; 32] {
    keccak256(payload).0
}

/// Domain-separated digest of the auth challenge, signed by the wallet.
///
/// The `participant` word is the session key address taken from the same
/// `AuthParams` sent in the auth request; any divergence between the two is
/// rejected by the remote side.
pub fn auth_challenge_digest(envelope: &ChallengeEnvelope) -> [u8; 32] {
    let params = &envelope.params;

    let mut enc = Vec::with_capacity(8 * 32);
    enc.extend_from_slice(keccak256(POLICY_TYPE).as_slice());
    enc.extend_from_slice(keccak256(envelope.challenge.as_bytes()).as_slice());
    enc.extend_from_slice(keccak256(params.scope.as_bytes()).as_slice());
    enc.extend_from_slice(&address_word(&envelope.wallet));
    enc.extend_from_slice(&address_word(&params.session_key_address));
    enc.extend_from_slice(keccak256(params.application_id.as_bytes()).as_slice());
    enc.extend_from_slice(&u64_word(params.expires_at));
    enc.extend_from_slice(&allowances_hash(&params.allowances));
    let struct_hash = keccak256(&enc);

    let mut preimage = Vec::with_capacity(2 + 64);
    preimage.extend_from_slice(&[0x19, 0x01]);
    preimage.extend_from_slice(&domain_separator());
    preimage.extend_from_slice(struct_hash.as_slice());
    keccak256(&preimage).0
}

pub fn domain_separator() -> [u8; 32] {
    let mut enc = Vec::with_capacity(64);
    enc.extend_from_slice(keccak256(DOMAIN_TYPE).as_slice());
    enc.extend_from_slice(keccak256(AUTH_DOMAIN_NAME.as_bytes()).as_slice());
    keccak256(&enc).0
}

fn allowance_hash(allowance: &Allowance) -> [u8; 32] {
    let mut enc = Vec::with_capacity(3 * 32);
    enc.extend_from_slice(keccak256(ALLOWANCE_TYPE).as_slice());
    enc.extend_from_slice(keccak256(allowance.asset.as_bytes()).as_slice());
    enc.extend_from_slice(keccak256(allowance.amount.as_bytes()).as_slice());
    keccak256(&enc).0
}

fn allowances_hash(allowances: &[Allowance]) -> [u8; 32] {
    let mut enc = Vec::with_capacity(allowances.len() * 32);
    for allowance in allowances {
        enc.extend_from_slice(&allowance_hash(allowance));
    }
    keccak256(&enc).0
}

fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn u64_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

#[cfg(test)]
mod tests {
    use clearline_types::{Address, Allowance, AuthParams, ChallengeEnvelope};

    use super::{auth_challenge_digest, domain_separator, envelope_digest};

    fn envelope() -> ChallengeEnvelope {
        ChallengeEnvelope {
            challenge: "chal-1".to_string(),
            wallet: Address::new([0xaa; 20]),
            params: AuthParams {
                scope: "trading".to_string(),
                session_key_address: Address::new([0x11; 20]),
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
    fn digest_is_deterministic() {
        assert_eq!(auth_challenge_digest(&envelope()), auth_challenge_digest(&envelope()));
        assert_eq!(domain_separator(), domain_separator());
    }

    #[test]
    fn digest_binds_every_field() {
        let base = auth_challenge_digest(&envelope());

        let mut changed = envelope();
        changed.challenge = "chal-2".to_string();
        assert_ne!(auth_challenge_digest(&changed), base);

        let mut changed = envelope();
        changed.params.scope = "audit".to_string();
        assert_ne!(auth_challenge_digest(&changed), base);

        let mut changed = envelope();
        changed.params.session_key_address = Address::new([0x22; 20]);
        assert_ne!(auth_challenge_digest(&changed), base);

        let mut changed = envelope();
        changed.params.expires_at += 1;
        assert_ne!(auth_challenge_digest(&changed), base);

        let mut changed = envelope();
        changed.params.allowances.clear();
        assert_ne!(auth_challenge_digest(&changed), base);

        let mut changed = envelope();
        changed.wallet = Address::new([0xbb; 20]);
        assert_ne!(auth_challenge_digest(&changed), base);
    }

    #[test]
    fn envelope_digest_tracks_payload() {
        let a = envelope_digest(b"[1,\"ping\",{},0]");
        let b = envelope_digest(b"[2,\"ping\",{},0]");
        assert_ne!(a, b);
        assert_eq!(a, envelope_digest(b"[1,\"ping\",{},0]"));
    }
}
