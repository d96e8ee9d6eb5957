//! Duplex transport interface. Implementations: a WebSocket transport for
//! real deployments and an in-memory transport backed by `MockNode` for
//! tests.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clearline_node_mock::MockNode;
use futures_util::{sink, stream, Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Error model for transport operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("send failed: {0}")]
    Send(String),
    #[error("receive failed: {0}")]
    Receive(String),
}

pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// One open duplex link: a sink of outgoing text frames and a stream of
/// incoming ones. The stream ending (or yielding an error) means the link is
/// down.
pub struct TransportLink {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, url: &str) -> Result<TransportLink, TransportError>;
}

/// WebSocket transport over tokio-tungstenite.
#[derive(Debug, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, url: &str) -> Result<TransportLink, TransportError> {
        let (ws, _) = connect_async(url)
            .await
            .map_err(|err| TransportError::ConnectFailed(err.to_string()))?;
        let (write, read) = ws.split();

        let sink = write
            .sink_map_err(|err| TransportError::Send(err.to_string()))
            .with(|text: String| async move { Ok::<Message, TransportError>(Message::Text(text.into())) });

        let stream = read.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(_)) => Some(Err(TransportError::ConnectionClosed)),
                // Ping/pong/binary frames are not part of this protocol.
                Ok(_) => None,
                Err(err) => Some(Err(TransportError::Receive(err.to_string()))),
            }
        });

        Ok(TransportLink {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

/// Test-side handles into a [`MockTransport`]: broadcast injection, forced
/// link failure, and connect accounting.
#[derive(Debug, Default)]
pub struct MockControls {
    link_tx: Mutex<Option<mpsc::UnboundedSender<Result<String, TransportError>>>>,
    kill_tx: Mutex<Option<oneshot::Sender<()>>>,
    fail_next_connect: AtomicBool,
    connects: AtomicU32,
}

impl MockControls {
    /// Push a raw frame to the connected client, as the server would for an
    /// unsolicited broadcast. Returns false when no link is up.
    pub fn push_broadcast(&self, frame: impl Into<String>) -> bool {
        match self.link_tx.lock().unwrap().as_ref() {
            Some(tx) => tx.send(Ok(frame.into())).is_ok(),
            None => false,
        }
    }

    /// Sever the current link. The client observes an involuntary close.
    pub fn kill_link(&self) {
        if let Some(kill) = self.kill_tx.lock().unwrap().take() {
            let _ = kill.send(());
        }
        self.link_tx.lock().unwrap().take();
    }

    /// Make the next `open` call fail with a connect error.
    pub fn fail_next_connect(&self) {
        self.fail_next_connect.store(true, Ordering::SeqCst);
    }

    /// Number of successfully opened links so far.
    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

/// In-memory transport backed by [`MockNode`], used for tests. Each `open`
/// resets the node's per-link auth state, so reconnecting clients must
/// re-authenticate just like against a real authority.
pub struct MockTransport {
    node: Arc<Mutex<MockNode>>,
    controls: Arc<MockControls>,
}

impl MockTransport {
    pub fn new(node: MockNode) -> Self {
        Self {
            node: Arc::new(Mutex::new(node)),
            controls: Arc::new(MockControls::default()),
        }
    }

    pub fn node(&self) -> Arc<Mutex<MockNode>> {
        self.node.clone()
    }

    pub fn controls(&self) -> Arc<MockControls> {
        self.controls.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, _url: &str) -> Result<TransportLink, TransportError> {
        if self.controls.fail_next_connect.swap(false, Ordering::SeqCst) {
            return Err(TransportError::ConnectFailed(
                "injected connect failure".to_string(),
            ));
        }
        self.controls.connects.fetch_add(1, Ordering::SeqCst);
        self.node.lock().unwrap().begin_link();

        let (client_tx, mut client_rx) = mpsc::unbounded_channel::<String>();
        let (server_tx, server_rx) = mpsc::unbounded_channel::<Result<String, TransportError>>();
        let (kill_tx, mut kill_rx) = oneshot::channel::<()>();
        *self.controls.link_tx.lock().unwrap() = Some(server_tx.clone());
        *self.controls.kill_tx.lock().unwrap() = Some(kill_tx);

        let node = self.node.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut kill_rx => break,
                    frame = client_rx.recv() => match frame {
                        Some(text) => {
                            let replies = node.lock().unwrap().handle_frame(&text);
                            for reply in replies {
                                if server_tx.send(Ok(reply)).is_err() {
                                    return;
                                }
                            }
                        }
                        None => break,
                    },
                }
            }
            // Dropping server_tx ends the client-side stream.
        });

        let sink = sink::unfold(client_tx, |tx, text: String| async move {
            tx.send(text).map_err(|_| TransportError::ConnectionClosed)?;
            Ok::<_, TransportError>(tx)
        });
        let stream = stream::unfold(server_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });

        Ok(TransportLink {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

#[cfg(test)]
mod tests {
    use clearline_node_mock::Scenario;
    use futures_util::{SinkExt, StreamExt};

    use super::{MockTransport, Transport};

    #[tokio::test]
    async fn mock_link_round_trips_frames() {
        let transport = MockTransport::new(Scenario::funded(1337).node);
        let mut link = transport.open("mock://").await.unwrap();
        assert_eq!(transport.controls().connect_count(), 1);

        // An unauthenticated request still gets a correlated error reply.
        link.sink
            .send(r#"{"req":[5,"get_balances",{},1],"sig":[]}"#.to_string())
            .await
            .unwrap();
        let reply = link.stream.next().await.unwrap().unwrap();
        assert!(reply.contains("\"error\""));
        assert!(reply.contains("[5,"));
    }

    #[tokio::test]
    async fn kill_link_ends_the_stream() {
        let transport = MockTransport::new(Scenario::funded(1337).node);
        let controls = transport.controls();
        let mut link = transport.open("mock://").await.unwrap();

        controls.kill_link();
        assert!(link.stream.next().await.is_none());
        assert!(!controls.push_broadcast("{}"));
    }

    #[tokio::test]
    async fn injected_connect_failure_hits_once() {
        let transport = MockTransport::new(Scenario::funded(1337).node);
        transport.controls().fail_next_connect();
        assert!(transport.open("mock://").await.is_err());
        assert!(transport.open("mock://").await.is_ok());
        assert_eq!(transport.controls().connect_count(), 1);
    }
}
