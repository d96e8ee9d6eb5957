pub mod auth;
pub mod balance;
pub mod channel;
pub mod error;
pub mod ids;
pub mod session;

pub use auth::{Allowance, AuthParams, ChallengeEnvelope};
pub use balance::{LedgerBalance, SupportedAsset};
pub use channel::{Channel, ChannelStatus};
pub use error::{CryptoError, ValidationError};
pub use ids::{Address, ChainId, ChannelId, SessionId};
pub use session::{Allocation, Session, SessionStatus};
