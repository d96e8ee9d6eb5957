//! ClearlineClient: high-level facade wiring transport, connection, events,
//! and registry behind one explicit handle.

use std::sync::Arc;

use clearline_crypto::WalletSigner;
use clearline_types::Address;
use serde_json::Value;
use tokio::sync::watch;

use crate::config::ClientConfig;
use crate::connection::{ClientError, Connection, ConnectionState, ConnectionStatus};
use crate::contract::SettlementContract;
use crate::events::{EventBus, EventKind, Subscription};
use crate::registry::Registry;
use crate::transport::Transport;

/// One client instance: one logical connection to the clearing authority
/// plus the registry view built on top of it. Constructed explicitly and
/// passed by the caller; there is no global instance.
pub struct ClearlineClient {
    conn: Connection,
    registry: Registry,
    events: EventBus,
    settlement: Option<Arc<dyn SettlementContract>>,
}

impl ClearlineClient {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let events = EventBus::new();
        let limits = config.limits;
        let conn = Connection::new(transport, config, events.clone());
        let registry = Registry::new(conn.clone(), &events, limits);
        Self {
            conn,
            registry,
            events,
            settlement: None,
        }
    }

    /// Attach the on-chain custody boundary used around channel funding.
    pub fn with_settlement(mut self, settlement: Arc<dyn SettlementContract>) -> Self {
        self.settlement = Some(settlement);
        self
    }

    /// Connect and authenticate as `address`, using `wallet` for the
    /// handshake challenge. Resolves only once the session key is active.
    pub async fn connect(
        &self,
        address: Address,
        wallet: Arc<dyn WalletSigner>,
    ) -> Result<(), ClientError> {
        self.conn.connect(address, wallet).await
    }

    pub async fn disconnect(&self) {
        self.conn.disconnect().await
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.conn.status()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.conn.watch_status()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to one kind of server push.
    pub fn on_event(
        &self,
        kind: EventKind,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        self.events.subscribe(kind, handler)
    }

    pub fn settlement(&self) -> Option<&Arc<dyn SettlementContract>> {
        self.settlement.as_ref()
    }
}
