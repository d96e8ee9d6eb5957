//! Handshake data model: auth parameters and the wallet-signed challenge.

use serde::{Deserialize, Serialize};

use crate::ids::Address;

/// Per-asset spending allowance granted to the session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowance {
    pub asset: String,
    pub amount: String,
}

/// Parameters of one authentication handshake.
///
/// Built exactly once per connect attempt: the same instance feeds both the
/// outgoing auth request and the wallet-signed challenge digest, so the two
/// can never diverge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthParams {
    pub scope: String,
    pub session_key_address: Address,
    pub expires_at: u64,
    pub allowances: Vec<Allowance>,
    pub application_id: String,
}

/// The structured payload a wallet signer is asked to sign during the
/// challenge-response handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeEnvelope {
    pub challenge: String,
    pub wallet: Address,
    pub params: AuthParams,
}

#[cfg(test)]
mod tests {
    use super::{Allowance, AuthParams};
    use crate::ids::Address;

    #[test]
    fn auth_params_serialize_camel_case() {
        let params = AuthParams {
            scope: "trading".to_string(),
            session_key_address: Address::new([0x11; 20]),
            expires_at: 1_800_000_000_000,
            allowances: vec![Allowance {
                asset: "usdc".to_string(),
                amount: "100".to_string(),
            }],
            application_id: "clearline".to_string(),
        };
        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("sessionKeyAddress").is_some());
        assert!(json.get("expiresAt").is_some());
        assert!(json.get("applicationId").is_some());
        assert_eq!(json["allowances"][0]["asset"], "usdc");

        let back: AuthParams = serde_json::from_value(json).unwrap();
        assert_eq!(back, params);
    }
}
