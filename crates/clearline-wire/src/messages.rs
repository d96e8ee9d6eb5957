//! Typed payloads for each protocol method.
//!
//! Field names follow the authority's camelCase JSON. Where a wire shape
//! matches the domain model exactly (`LedgerBalance`, `SupportedAsset`,
//! `Allocation`), the domain type is used directly; session and channel
//! records differ (the authority names ids `appSessionId`/`channelId`) and
//! get dedicated wire structs converted in [`crate::convert`].

use serde::{Deserialize, Serialize};

use clearline_types::{
    Address, Allocation, AuthParams, ChainId, ChannelId, ChannelStatus, LedgerBalance, SessionId,
    SessionStatus, SupportedAsset,
};

// ---- handshake ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequestParams {
    pub address: Address,
    #[serde(flatten)]
    pub params: AuthParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthChallengeResult {
    pub challenge_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthVerifyParams {
    pub challenge: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthVerifyResult {
    pub address: Address,
    pub session_key_address: Address,
    pub token: String,
}

// ---- sessions ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDefinition {
    pub protocol: String,
    pub participants: Vec<Address>,
    pub weights: Vec<u64>,
    pub quorum: u64,
    pub nonce: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionParams {
    pub definition: SessionDefinition,
    pub allocations: Vec<Allocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseSessionParams {
    pub app_session_id: SessionId,
    pub allocations: Vec<Allocation>,
}

/// Session record as the authority reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSession {
    pub app_session_id: SessionId,
    pub status: SessionStatus,
    pub participants: Vec<Address>,
    pub allocations: Vec<Allocation>,
    pub nonce: u64,
    pub created_at: u64,
}

// ---- channels ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelParams {
    pub chain_id: ChainId,
    pub token: Address,
}

/// Channel record as the authority reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireChannel {
    pub channel_id: ChannelId,
    pub status: ChannelStatus,
    pub token: Address,
    pub chain_id: ChainId,
    pub amount: String,
}

/// Exactly one of `allocate_amount` (off-chain ledger <-> channel) and
/// `resize_amount` (on-chain custody <-> channel) is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeChannelParams {
    pub channel_id: ChannelId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocate_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize_amount: Option<String>,
    pub funds_destination: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseChannelParams {
    pub channel_id: ChannelId,
    pub funds_destination: Address,
}

// ---- ledger ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferParams {
    pub destination: Address,
    pub asset: String,
    pub amount: String,
}

/// Result of a transfer; reused as the `payment` broadcast payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub from: Address,
    pub to: Address,
    pub asset: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBalancesResult {
    pub ledger_balances: Vec<LedgerBalance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetChannelsResult {
    pub channels: Vec<WireChannel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAssetsResult {
    pub assets: Vec<SupportedAsset>,
}

// ---- broadcasts ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceUpdateNotice {
    pub balance_updates: Vec<LedgerBalance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelUpdateNotice {
    pub channels: Vec<WireChannel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdateNotice {
    pub app_session: WireSession,
}

// ---- error replies ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub error: String,
}

impl ErrorResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
