//! Wire protocol for the Clearline clearing authority: positional JSON
//! envelopes, method names, typed payloads, and domain conversions.

pub mod convert;
pub mod envelope;
pub mod messages;
pub mod method;

pub use envelope::{unix_millis_now, RequestFrame, ResponseFrame, WireError, BROADCAST_ID};
pub use messages::{
    AuthChallengeResult, AuthRequestParams, AuthVerifyParams, AuthVerifyResult,
    BalanceUpdateNotice, ChannelUpdateNotice, CloseChannelParams, CloseSessionParams,
    CreateChannelParams, CreateSessionParams, ErrorResult, GetAssetsResult, GetBalancesResult,
    GetChannelsResult, PaymentRecord, ResizeChannelParams, SessionDefinition, SessionUpdateNotice,
    TransferParams, WireChannel, WireSession,
};
