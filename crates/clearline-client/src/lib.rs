//! Clearline protocol client.
//!
//! This crate exposes:
//! - transport abstractions (`Transport`, `WsTransport`, `MockTransport`),
//! - the connection manager (`Connection`) with request correlation,
//!   heartbeat, and reconnection,
//! - the challenge-response authenticator producing a session-key signer,
//! - the event dispatcher (`EventBus`) for server pushes,
//! - the session/channel registry (`Registry`) with its synchronized cache,
//! - the settlement contract boundary (`SettlementContract`),
//! - a high-level facade (`ClearlineClient`).

pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod contract;
pub mod events;
pub mod registry;
pub mod transport;

pub use auth::AuthError;
pub use client::ClearlineClient;
pub use config::{AuthConfig, ClientConfig, ReconnectPolicy, ReconnectSchedule, RegistryLimits};
pub use connection::{ClientError, Connection, ConnectionState, ConnectionStatus};
pub use contract::{ContractError, MockSettlement, SettlementContract, TxReceipt};
pub use events::{EventBus, EventKind, Subscription};
pub use registry::{Registry, ResizeIntent};
pub use transport::{
    FrameSink, FrameStream, MockControls, MockTransport, Transport, TransportError, TransportLink,
    WsTransport,
};
