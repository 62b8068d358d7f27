//! Transport seam for the push channel
//!
//! The connection manager is agnostic to what actually carries the message
//! stream: the production transport is a WebSocket ([`WsConnector`]), tests
//! and local development use the in-memory transport ([`memory`]), and any
//! other channel speaking the same event vocabulary (such as the embedded
//! P2P engine's channel equivalent) can plug in by implementing
//! [`PushConnector`].
//!
//! A connector produces one connection per dial as a sink/source pair; the
//! connection driver owns both halves for the lifetime of that session.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{FeedError, FeedResult};

/// Write half of an established push connection
#[async_trait]
pub trait PushSink: Send {
    /// Transmit one text frame
    async fn send(&mut self, text: String) -> FeedResult<()>;
    /// Close the connection; best effort
    async fn close(&mut self);
}

/// Read half of an established push connection
#[async_trait]
pub trait PushSource: Send {
    /// Next text frame. `None` on clean close, `Err` on channel failure.
    async fn next(&mut self) -> Option<FeedResult<String>>;
}

/// One established connection, as separately owned halves
pub type PushPair = (Box<dyn PushSink>, Box<dyn PushSource>);

/// Factory for push-channel connections
#[async_trait]
pub trait PushConnector: Send + Sync {
    /// Dial the remote end once
    async fn connect(&self) -> FeedResult<PushPair>;
}

/// WebSocket transport (the production push channel)
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// Create a connector dialing the given `ws://` or `wss://` URL
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The URL this connector dials
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PushConnector for WsConnector {
    async fn connect(&self) -> FeedResult<PushPair> {
        let (stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| FeedError::Transport(format!("failed to open {}: {e}", self.url)))?;
        let (sink, source) = stream.split();
        Ok((Box::new(WsSink { inner: sink }), Box::new(WsSource { inner: source })))
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct WsSink {
    inner: SplitSink<WsStream, Message>,
}

#[async_trait]
impl PushSink for WsSink {
    async fn send(&mut self, text: String) -> FeedResult<()> {
        self.inner
            .send(Message::Text(text))
            .await
            .map_err(|e| FeedError::Transport(format!("send failed: {e}")))
    }

    async fn close(&mut self) {
        let _ = self.inner.send(Message::Close(None)).await;
    }
}

struct WsSource {
    inner: SplitStream<WsStream>,
}

#[async_trait]
impl PushSource for WsSource {
    async fn next(&mut self) -> Option<FeedResult<String>> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Close(_))) | None => return None,
                // Binary frames and socket-level ping/pong are not part of
                // the protocol; tungstenite answers pings itself.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Some(Err(FeedError::Transport(e.to_string()))),
            }
        }
    }
}

pub mod memory {
    //! In-memory transport for tests and local development
    //!
    //! Dial outcomes are scripted in advance: each call to
    //! [`MemoryConnector::accept`] queues one successful session and returns
    //! its remote end, each call to [`MemoryConnector::refuse`] queues one
    //! failed dial. A dial with nothing queued fails as if nobody were
    //! listening. Script the next session before closing the current one so
    //! a reconnecting client finds it.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    use crate::error::{FeedError, FeedResult};

    use super::{PushConnector, PushPair, PushSink, PushSource};

    enum Dial {
        Refuse(String),
        Accept {
            to_client: mpsc::UnboundedReceiver<String>,
            from_client: mpsc::UnboundedSender<String>,
        },
    }

    /// Connector with scripted dial outcomes
    #[derive(Default)]
    pub struct MemoryConnector {
        sessions: Mutex<VecDeque<Dial>>,
        dials: AtomicUsize,
    }

    impl MemoryConnector {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Queue one refused dial
        pub fn refuse(&self, reason: impl Into<String>) {
            self.sessions.lock().push_back(Dial::Refuse(reason.into()));
        }

        /// Queue one accepted dial; returns the remote (server) end
        pub fn accept(&self) -> MemoryRemote {
            let (to_client_tx, to_client_rx) = mpsc::unbounded_channel();
            let (from_client_tx, from_client_rx) = mpsc::unbounded_channel();
            self.sessions.lock().push_back(Dial::Accept {
                to_client: to_client_rx,
                from_client: from_client_tx,
            });
            MemoryRemote {
                to_client: Some(to_client_tx),
                from_client: from_client_rx,
            }
        }

        /// How many dials have been attempted so far
        pub fn dial_count(&self) -> usize {
            self.dials.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PushConnector for MemoryConnector {
        async fn connect(&self) -> FeedResult<PushPair> {
            self.dials.fetch_add(1, Ordering::SeqCst);
            match self.sessions.lock().pop_front() {
                Some(Dial::Accept { to_client, from_client }) => Ok((
                    Box::new(MemorySink { tx: from_client }),
                    Box::new(MemorySource { rx: to_client }),
                )),
                Some(Dial::Refuse(reason)) => Err(FeedError::Transport(reason)),
                None => Err(FeedError::Transport("nobody listening".to_string())),
            }
        }
    }

    /// The remote end of an accepted in-memory session
    pub struct MemoryRemote {
        to_client: Option<mpsc::UnboundedSender<String>>,
        from_client: mpsc::UnboundedReceiver<String>,
    }

    impl MemoryRemote {
        /// Push one frame to the client; returns whether it was delivered
        pub fn send(&self, text: impl Into<String>) -> bool {
            match &self.to_client {
                Some(tx) => tx.send(text.into()).is_ok(),
                None => false,
            }
        }

        /// Next frame the client transmitted, `None` once the client is gone
        pub async fn recv(&mut self) -> Option<String> {
            self.from_client.recv().await
        }

        /// Close the session from the remote side
        pub fn close(&mut self) {
            self.to_client = None;
        }
    }

    struct MemorySink {
        tx: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl PushSink for MemorySink {
        async fn send(&mut self, text: String) -> FeedResult<()> {
            self.tx
                .send(text)
                .map_err(|_| FeedError::Transport("session closed".to_string()))
        }

        async fn close(&mut self) {}
    }

    struct MemorySource {
        rx: mpsc::UnboundedReceiver<String>,
    }

    #[async_trait]
    impl PushSource for MemorySource {
        async fn next(&mut self) -> Option<FeedResult<String>> {
            self.rx.recv().await.map(Ok)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryConnector;
    use super::*;

    #[tokio::test]
    async fn test_memory_roundtrip() {
        let connector = MemoryConnector::new();
        let mut remote = connector.accept();

        let (mut sink, mut source) = connector.connect().await.unwrap();
        assert_eq!(connector.dial_count(), 1);

        assert!(remote.send(r#"{"type":"ping"}"#));
        let frame = source.next().await.unwrap().unwrap();
        assert_eq!(frame, r#"{"type":"ping"}"#);

        sink.send("hello".to_string()).await.unwrap();
        assert_eq!(remote.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_memory_refused_dial() {
        let connector = MemoryConnector::new();
        connector.refuse("connection refused");

        let err = connector.connect().await.err().unwrap();
        assert!(matches!(err, FeedError::Transport(_)));
    }

    #[tokio::test]
    async fn test_memory_unscripted_dial_fails() {
        let connector = MemoryConnector::new();
        assert!(connector.connect().await.is_err());
    }

    #[tokio::test]
    async fn test_memory_remote_close_ends_stream() {
        let connector = MemoryConnector::new();
        let mut remote = connector.accept();
        let (_sink, mut source) = connector.connect().await.unwrap();

        remote.close();
        assert!(source.next().await.is_none());
    }

    #[test]
    fn test_ws_connector_keeps_url() {
        let connector = WsConnector::new("ws://127.0.0.1:3030/ws");
        assert_eq!(connector.url(), "ws://127.0.0.1:3030/ws");
    }
}
