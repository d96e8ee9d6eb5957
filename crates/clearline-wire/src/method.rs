//! Protocol method names.

// Handshake
pub const AUTH_REQUEST: &str = "auth_request";
pub const AUTH_CHALLENGE: &str = "auth_challenge";
pub const AUTH_VERIFY: &str = "auth_verify";

// Liveness
pub const PING: &str = "ping";
pub const PONG: &str = "pong";

// Sessions
pub const CREATE_SESSION: &str = "create_session";
pub const CLOSE_SESSION: &str = "close_session";

// Channels
pub const CREATE_CHANNEL: &str = "create_channel";
pub const RESIZE_CHANNEL: &str = "resize_channel";
pub const CLOSE_CHANNEL: &str = "close_channel";

// Ledger
pub const TRANSFER: &str = "transfer";
pub const GET_BALANCES: &str = "get_balances";
pub const GET_CHANNELS: &str = "get_channels";
pub const GET_ASSETS: &str = "get_assets";

// Error replies
pub const ERROR: &str = "error";

// Broadcast kinds (responses with id 0)
pub const ASSETS: &str = "assets";
pub const BALANCE_UPDATE: &str = "balance_update";
pub const CHANNEL_UPDATE: &str = "channel_update";
pub const SESSION_UPDATE: &str = "session_update";
pub const PAYMENT: &str = "payment";
