//! Off-chain ledger balances and the dynamically discovered asset table.

use serde::{Deserialize, Serialize};

use crate::ids::{Address, ChainId};

/// Per-asset off-chain balance snapshot, refreshed by explicit query or by
/// push notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerBalance {
    pub asset: String,
    pub available: String,
    pub locked: String,
    pub total: String,
}

/// An asset the clearing authority supports, discovered from its broadcast.
/// There is no static fallback table: this dynamic mapping is the only one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedAsset {
    pub token: Address,
    pub chain_id: ChainId,
    pub symbol: String,
    pub decimals: u8,
}
