//! App sessions: remotely-assigned off-chain trading contexts.

use serde::{Deserialize, Serialize};

use crate::ids::{Address, SessionId};

/// Lifecycle of an app session as reported by the clearing authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Creating,
    Open,
    Active,
    Closing,
    Closed,
}

/// One participant's stake in a session, denominated in an asset symbol.
///
/// Amounts are opaque decimal strings; the authority is the source of truth
/// and the client performs no arithmetic on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub participant: Address,
    pub asset: String,
    pub amount: String,
}

/// An off-chain trading session. The id is assigned only by the clearing
/// authority, never generated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub participants: Vec<Address>,
    pub allocations: Vec<Allocation>,
    pub status: SessionStatus,
    pub nonce: u64,
    pub created_at: u64,
}

impl Session {
    pub fn is_closed(&self) -> bool {
        self.status == SessionStatus::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::SessionStatus;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Open).unwrap(),
            "\"open\""
        );
        let status: SessionStatus = serde_json::from_str("\"closing\"").unwrap();
        assert_eq!(status, SessionStatus::Closing);
    }
}
