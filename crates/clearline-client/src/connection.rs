//! Connection manager: transport lifecycle, request/response correlation,
//! heartbeat, and reconnection.
//!
//! One logical connection multiplexes many concurrent calls. Each in-flight
//! call holds a unique correlation id in the pending arena and is settled
//! exactly once: by its response, by its timeout, or by the disconnect
//! sweep.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use clearline_crypto::{MessageSigner, SessionKeySigner, WalletSigner};
use clearline_types::{Address, CryptoError, SessionId};
use clearline_wire::{method, unix_millis_now, RequestFrame, ResponseFrame, WireError};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::auth::{authenticate, AuthError};
use crate::config::{ClientConfig, ReconnectSchedule};
use crate::events::{EventBus, EventKind};
use crate::transport::{FrameSink, FrameStream, Transport, TransportError};

/// Connection lifecycle status. Exactly one holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Authenticating,
    Connected,
    Error,
}

/// Observable connection state: status, last error, and the post-auth token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub error: Option<String>,
    pub token: Option<String>,
}

impl ConnectionState {
    fn disconnected() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            error: None,
            token: None,
        }
    }
}

/// Error taxonomy for client operations.
///
/// Transport failures recover only through the reconnect policy; protocol
/// errors, timeouts, and auth failures surface to the caller and are never
/// silently retried.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("remote rejected request: {message}")]
    Protocol { message: String },
    #[error("request `{method}` timed out")]
    Timeout { method: String },
    #[error("connection closed")]
    ConnectionClosed,
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("request id {0} already in flight")]
    RequestIdInUse(u64),
    #[error("unknown session {0}")]
    UnknownSession(SessionId),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

struct PendingRequest {
    reply: oneshot::Sender<Result<ResponseFrame, ClientError>>,
}

#[derive(Clone)]
pub(crate) struct Credentials {
    pub address: Address,
    pub wallet: Arc<dyn WalletSigner>,
}

pub(crate) struct ConnInner {
    transport: Arc<dyn Transport>,
    pub(crate) config: ClientConfig,
    events: EventBus,
    state: Mutex<ConnectionState>,
    status_tx: watch::Sender<ConnectionStatus>,
    pending: Mutex<HashMap<u64, PendingRequest>>,
    next_id: AtomicU64,
    writer: Mutex<Option<mpsc::UnboundedSender<String>>>,
    session_signer: Mutex<Option<Arc<SessionKeySigner>>>,
    credentials: Mutex<Option<Credentials>>,
    user_closed: AtomicBool,
    reconnecting: AtomicBool,
    // Incremented on every link open and on every deliberate teardown. A
    // reader task only reports a link-down event when its epoch is still
    // current, so superseded links cannot trigger spurious reconnects.
    epoch: AtomicU64,
}

/// Handle to one logical connection. Cloning shares the connection.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnInner>,
}

impl Connection {
    pub(crate) fn new(transport: Arc<dyn Transport>, config: ClientConfig, events: EventBus) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            inner: Arc::new(ConnInner {
                transport,
                config,
                events,
                state: Mutex::new(ConnectionState::disconnected()),
                status_tx,
                pending: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                writer: Mutex::new(None),
                session_signer: Mutex::new(None),
                credentials: Mutex::new(None),
                user_closed: AtomicBool::new(false),
                reconnecting: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.lock().unwrap().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state().status
    }

    /// Watch channel following status transitions.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Wallet address this connection authenticated (or will authenticate) as.
    pub fn identity(&self) -> Option<Address> {
        self.inner
            .credentials
            .lock()
            .unwrap()
            .as_ref()
            .map(|credentials| credentials.address)
    }

    /// Address of the active session key, present only while authenticated.
    pub fn session_address(&self) -> Option<Address> {
        self.inner
            .session_signer
            .lock()
            .unwrap()
            .as_ref()
            .map(|signer| signer.address())
    }

    /// Open the transport and drive the handshake. Succeeds only once
    /// authentication succeeds; a no-op when already connecting or
    /// connected.
    pub async fn connect(
        &self,
        address: Address,
        wallet: Arc<dyn WalletSigner>,
    ) -> Result<(), ClientError> {
        match self.status() {
            ConnectionStatus::Connecting
            | ConnectionStatus::Authenticating
            | ConnectionStatus::Connected => return Ok(()),
            ConnectionStatus::Disconnected | ConnectionStatus::Error => {}
        }
        self.inner.user_closed.store(false, Ordering::SeqCst);
        *self.inner.credentials.lock().unwrap() = Some(Credentials { address, wallet });
        ConnInner::establish(&self.inner).await
    }

    /// Caller-initiated close: rejects all pending requests, clears auth
    /// state, and suppresses reconnection.
    pub async fn disconnect(&self) {
        self.inner.user_closed.store(true, Ordering::SeqCst);
        self.inner.teardown_link();
        *self.inner.credentials.lock().unwrap() = None;
        self.inner.set_state(ConnectionStatus::Disconnected, None, None);
        info!("disconnected");
    }

    /// Transmit an already-built frame and await its correlated response.
    pub async fn send_and_await(&self, frame: RequestFrame) -> Result<ResponseFrame, ClientError> {
        ConnInner::send_and_await(&self.inner, frame).await
    }

    /// Build, sign with the active session key, and send a request.
    pub async fn call(&self, method_name: &str, params: Value) -> Result<ResponseFrame, ClientError> {
        ConnInner::call(&self.inner, method_name, params).await
    }

    pub(crate) fn inner(&self) -> &Arc<ConnInner> {
        &self.inner
    }
}

impl ConnInner {
    fn set_state(&self, status: ConnectionStatus, error: Option<String>, token: Option<String>) {
        {
            let mut state = self.state.lock().unwrap();
            state.status = status;
            state.error = error;
            state.token = token;
        }
        self.status_tx.send_replace(status);
    }

    pub(crate) async fn establish(inner: &Arc<ConnInner>) -> Result<(), ClientError> {
        inner.set_state(ConnectionStatus::Connecting, None, None);
        let link = match inner.transport.open(&inner.config.url).await {
            Ok(link) => link,
            Err(err) => {
                inner.fail_unless_closed(err.to_string());
                return Err(err.into());
            }
        };
        let epoch = inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        *inner.writer.lock().unwrap() = Some(writer_tx);
        spawn_writer(link.sink, writer_rx);
        spawn_reader(inner.clone(), link.stream, epoch);

        inner.set_state(ConnectionStatus::Authenticating, None, None);
        let credentials = inner.credentials.lock().unwrap().clone();
        let Some(credentials) = credentials else {
            inner.teardown_link();
            inner.set_state(
                ConnectionStatus::Error,
                Some("no credentials supplied".to_string()),
                None,
            );
            return Err(ClientError::NotAuthenticated);
        };

        match authenticate(inner, &credentials).await {
            Ok(outcome) => {
                *inner.session_signer.lock().unwrap() = Some(Arc::new(outcome.session_signer));
                inner.set_state(ConnectionStatus::Connected, None, Some(outcome.token));
                info!(address = %credentials.address, "connected to clearing authority");
                spawn_heartbeat(inner.clone(), epoch);
                Ok(())
            }
            Err(err) => {
                inner.teardown_link();
                inner.fail_unless_closed(err.to_string());
                Err(ClientError::Auth(err))
            }
        }
    }

    /// Record a failed connect attempt, unless the caller already closed the
    /// connection deliberately while the attempt was in flight.
    fn fail_unless_closed(&self, message: String) {
        if self.user_closed.load(Ordering::SeqCst) {
            self.set_state(ConnectionStatus::Disconnected, None, None);
        } else {
            self.set_state(ConnectionStatus::Error, Some(message), None);
        }
    }

    pub(crate) async fn send_and_await(
        inner: &Arc<ConnInner>,
        mut frame: RequestFrame,
    ) -> Result<ResponseFrame, ClientError> {
        if frame.id() == 0 {
            frame.set_id(inner.next_id.fetch_add(1, Ordering::Relaxed));
        }
        let id = frame.id();
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let mut pending = inner.pending.lock().unwrap();
            if pending.contains_key(&id) {
                return Err(ClientError::RequestIdInUse(id));
            }
            pending.insert(id, PendingRequest { reply: reply_tx });
        }

        let text = match frame.to_text() {
            Ok(text) => text,
            Err(err) => {
                inner.pending.lock().unwrap().remove(&id);
                return Err(err.into());
            }
        };
        let delivered = inner
            .writer
            .lock()
            .unwrap()
            .as_ref()
            .map(|writer| writer.send(text).is_ok());
        if !matches!(delivered, Some(true)) {
            inner.pending.lock().unwrap().remove(&id);
            return Err(ClientError::ConnectionClosed);
        }

        match tokio::time::timeout(inner.config.request_timeout, reply_rx).await {
            Ok(Ok(outcome)) => outcome,
            // Settlement channel dropped without a verdict: the link died.
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                inner.pending.lock().unwrap().remove(&id);
                Err(ClientError::Timeout {
                    method: frame.method().to_string(),
                })
            }
        }
    }

    pub(crate) async fn call(
        inner: &Arc<ConnInner>,
        method_name: &str,
        params: Value,
    ) -> Result<ResponseFrame, ClientError> {
        let signer = inner
            .session_signer
            .lock()
            .unwrap()
            .clone()
            .ok_or(ClientError::NotAuthenticated)?;
        let mut frame = RequestFrame::new(method_name, params, unix_millis_now());
        // The signature covers id and timestamp, so both are fixed first.
        frame.set_id(inner.next_id.fetch_add(1, Ordering::Relaxed));
        let payload = frame.signing_payload()?;
        frame.push_signature(signer.sign_envelope(&payload)?.to_string());
        Self::send_and_await(inner, frame).await
    }

    /// Deliberate link shutdown: invalidates the live reader, closes the
    /// writer, clears the active signer, and rejects everything pending.
    fn teardown_link(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.writer.lock().unwrap().take();
        *self.session_signer.lock().unwrap() = None;
        self.sweep_pending();
    }

    fn sweep_pending(&self) {
        let entries: Vec<PendingRequest> = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain().map(|(_, entry)| entry).collect()
        };
        for entry in entries {
            let _ = entry.reply.send(Err(ClientError::ConnectionClosed));
        }
    }

    fn route_frame(&self, text: &str) {
        let frame = match ResponseFrame::from_text(text) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "malformed frame");
                return;
            }
        };
        if frame.is_broadcast() {
            let kind = EventKind::from_method(frame.method());
            debug!(kind = kind.as_str(), "broadcast received");
            self.events.publish(&kind, frame.result());
            return;
        }
        let entry = self.pending.lock().unwrap().remove(&frame.id());
        match entry {
            Some(pending) => {
                let outcome = match frame.error_message() {
                    Some(message) => Err(ClientError::Protocol { message }),
                    None => Ok(frame),
                };
                let _ = pending.reply.send(outcome);
            }
            None => debug!(id = frame.id(), "response for unknown or expired request"),
        }
    }

    fn on_link_down(inner: &Arc<ConnInner>, epoch: u64) {
        if inner.epoch.load(Ordering::SeqCst) != epoch {
            return;
        }
        inner.writer.lock().unwrap().take();
        *inner.session_signer.lock().unwrap() = None;
        inner.sweep_pending();

        if inner.user_closed.load(Ordering::SeqCst) {
            inner.set_state(ConnectionStatus::Disconnected, None, None);
            return;
        }
        warn!("connection lost");
        inner.set_state(
            ConnectionStatus::Disconnected,
            Some("connection lost".to_string()),
            None,
        );
        Self::schedule_reconnect(inner.clone());
    }

    /// Start the reconnect supervisor unless one is already running. The
    /// guard serializes attempts: a second involuntary close arriving
    /// mid-reconnect never spawns an overlapping supervisor.
    fn schedule_reconnect(inner: Arc<ConnInner>) {
        if inner
            .reconnecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("reconnect already in flight");
            return;
        }
        tokio::spawn(async move {
            let mut schedule = ReconnectSchedule::new(inner.config.reconnect.clone());
            loop {
                if inner.user_closed.load(Ordering::SeqCst) {
                    break;
                }
                let delay = schedule.next_delay();
                info!(
                    attempt = schedule.attempt(),
                    delay_ms = delay.as_millis() as u64,
                    "reconnect scheduled"
                );
                tokio::time::sleep(delay).await;
                if inner.user_closed.load(Ordering::SeqCst) {
                    break;
                }
                match ConnInner::establish(&inner).await {
                    Ok(()) => {
                        // Retiring the schedule is the one transition that
                        // resets the attempt counter.
                        info!(attempts = schedule.attempt(), "reconnected");
                        break;
                    }
                    Err(ClientError::Auth(err)) => {
                        warn!(error = %err, "authentication failed during reconnect");
                        break;
                    }
                    Err(err) => {
                        warn!(error = %err, "reconnect attempt failed");
                    }
                }
            }
            inner.reconnecting.store(false, Ordering::SeqCst);
        });
    }
}

fn spawn_writer(mut sink: FrameSink, mut rx: mpsc::UnboundedReceiver<String>) {
    tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if let Err(err) = sink.send(text).await {
                warn!(error = %err, "transport send failed");
                break;
            }
        }
        let _ = sink.close().await;
    });
}

fn spawn_reader(inner: Arc<ConnInner>, mut stream: FrameStream, epoch: u64) {
    tokio::spawn(async move {
        while let Some(item) = stream.next().await {
            match item {
                Ok(text) => inner.route_frame(&text),
                Err(err) => {
                    warn!(error = %err, "transport receive failed");
                    break;
                }
            }
        }
        ConnInner::on_link_down(&inner, epoch);
    });
}

fn spawn_heartbeat(inner: Arc<ConnInner>, epoch: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(inner.config.heartbeat_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if inner.epoch.load(Ordering::SeqCst) != epoch
                || inner.user_closed.load(Ordering::SeqCst)
            {
                break;
            }
            // A failed heartbeat is observable but never forces a
            // disconnect; the transport close event is authoritative.
            match ConnInner::call(&inner, method::PING, serde_json::json!({})).await {
                Ok(_) => debug!("heartbeat acknowledged"),
                Err(err) => warn!(error = %err, "heartbeat failed"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use clearline_crypto::{LocalWallet, MessageSigner};
    use clearline_node_mock::Scenario;
    use clearline_wire::{method, RequestFrame};
    use serde_json::json;

    use super::{ClientError, Connection, ConnectionStatus};
    use crate::config::ClientConfig;
    use crate::events::EventBus;
    use crate::transport::MockTransport;

    fn test_config() -> ClientConfig {
        let mut config = ClientConfig::default();
        config.reconnect.jitter_ms = 0;
        config
    }

    async fn connected() -> (Connection, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new(Scenario::funded(1337).node));
        let conn = Connection::new(transport.clone(), test_config(), EventBus::new());
        let wallet = Arc::new(LocalWallet::from_bytes(&[0x11; 32]).unwrap());
        conn.connect(wallet.address(), wallet).await.unwrap();
        (conn, transport)
    }

    #[tokio::test]
    async fn call_requires_authentication() {
        let transport = MockTransport::new(Scenario::funded(1337).node);
        let conn = Connection::new(Arc::new(transport), test_config(), EventBus::new());
        let err = conn.call(method::GET_BALANCES, json!({})).await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
        assert_eq!(conn.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn duplicate_correlation_ids_are_refused() {
        let (conn, transport) = connected().await;
        transport
            .node()
            .lock()
            .unwrap()
            .drop_methods
            .insert(method::PING.to_string());

        // Occupy an id, then try to reuse it while still outstanding.
        let mut first = RequestFrame::new(method::PING, json!({}), 1);
        first.set_id(500);
        let mut second = RequestFrame::new(method::PING, json!({}), 1);
        second.set_id(500);

        let inner = conn.inner().clone();
        let race =
            tokio::spawn(async move { super::ConnInner::send_and_await(&inner, first).await });
        tokio::task::yield_now().await;

        let err = conn.send_and_await(second).await.unwrap_err();
        assert!(matches!(err, ClientError::RequestIdInUse(500)));

        // The first request is settled exactly once, by the disconnect sweep.
        conn.disconnect().await;
        let outcome = race.await.unwrap();
        assert!(matches!(outcome, Err(ClientError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn session_address_tracks_auth_lifecycle() {
        let (conn, _transport) = connected().await;
        assert!(conn.session_address().is_some());
        conn.disconnect().await;
        assert!(conn.session_address().is_none());
        assert!(conn.state().token.is_none());
    }
}
