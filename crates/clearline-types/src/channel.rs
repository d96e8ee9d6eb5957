//! Payment channels: on-chain-anchored, off-chain-updated balance containers.

use serde::{Deserialize, Serialize};

use crate::ids::{Address, ChainId, ChannelId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    Pending,
    Open,
    Active,
    Closing,
    Closed,
    Disputed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub status: ChannelStatus,
    pub token: Address,
    pub chain_id: ChainId,
    pub amount: String,
}

impl Channel {
    pub fn is_settled(&self) -> bool {
        matches!(self.status, ChannelStatus::Closed)
    }
}
