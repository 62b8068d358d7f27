//! The feed client: one object owning the whole synchronization stack
//!
//! No process-wide state: every connection, timer, and store hangs off a
//! [`FeedClient`] instance. Tearing the client down cancels everything it
//! started.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::connection::{ConnectionManager, ConnectionState, ReconnectPolicy};
use crate::coordinator::SyncCoordinator;
use crate::error::FeedResult;
use crate::notify::{FeedEvent, NotificationEmitter};
use crate::rest::{FallbackApi, RestClient};
use crate::store::FeedStore;
use crate::transport::{PushConnector, WsConnector};
use crate::types::{FeedSnapshot, Post};

/// Client configuration
///
/// The timing defaults match the deployed behavior: 10 s offline polling,
/// 30 s heartbeat, 3 s initial-load fallback, exponential reconnect backoff
/// from 2 s capped at 30 s with at most 10 retries.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Push channel endpoint (`ws://` or `wss://`)
    pub ws_url: String,
    /// Pull channel base URL (e.g. `http://host:3030/api`)
    pub api_base: String,
    /// Interval between full-state polls while the push channel is down
    pub poll_interval: Duration,
    /// Interval between liveness probes while connected
    pub heartbeat_interval: Duration,
    /// How long to wait for the `init` snapshot before polling instead
    pub init_timeout: Duration,
    /// Reconnection backoff policy
    pub reconnect: ReconnectPolicy,
}

impl ClientConfig {
    pub fn new(ws_url: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            api_base: api_base.into(),
            poll_interval: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            init_timeout: Duration::from_secs(3),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Synchronizes a local feed view with the remote source of truth
///
/// # Example
///
/// ```ignore
/// use feedsync_core::{ClientConfig, FeedClient, FeedEvent};
///
/// let config = ClientConfig::new("ws://localhost:3030/ws", "http://localhost:3030/api");
/// let client = FeedClient::new(config);
/// let mut events = client.subscribe();
/// client.connect();
///
/// while let Ok(event) = events.recv().await {
///     match event {
///         FeedEvent::PostArrived { post } => println!("{}: {}", post.author_name, post.content),
///         FeedEvent::ConnectionChanged { state, reason } => println!("{state} ({reason})"),
///     }
/// }
/// ```
pub struct FeedClient {
    store: Arc<FeedStore>,
    connection: Arc<ConnectionManager>,
    coordinator: Arc<SyncCoordinator>,
    emitter: Arc<NotificationEmitter>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl FeedClient {
    /// Create a client with the production transports (WebSocket + HTTP)
    pub fn new(config: ClientConfig) -> Self {
        let connector = Arc::new(WsConnector::new(config.ws_url.clone()));
        let api = Arc::new(RestClient::new(config.api_base.clone()));
        Self::with_transport(config, connector, api)
    }

    /// Create a client over arbitrary transport implementations.
    ///
    /// Any channel speaking the push event vocabulary works here: the
    /// in-memory transport, or an embedded engine's channel equivalent.
    pub fn with_transport(
        config: ClientConfig,
        connector: Arc<dyn PushConnector>,
        api: Arc<dyn FallbackApi>,
    ) -> Self {
        let store = Arc::new(FeedStore::new());
        let emitter = Arc::new(NotificationEmitter::new());
        let (connection, events) =
            ConnectionManager::new(connector, config.reconnect.clone(), config.heartbeat_interval);
        let connection = Arc::new(connection);
        let coordinator = Arc::new(SyncCoordinator::new(
            store.clone(),
            connection.clone(),
            api,
            emitter.clone(),
            config.poll_interval,
            config.init_timeout,
        ));
        let driver = coordinator.clone().spawn(events);

        Self {
            store,
            connection,
            coordinator,
            emitter,
            driver: Mutex::new(Some(driver)),
        }
    }

    /// Open the push channel (and keep it open through reconnects)
    pub fn connect(&self) {
        self.connection.connect();
    }

    /// Close the push channel without tearing down the client.
    /// Polling keeps the view fresh; `connect()` reopens the channel.
    pub fn close(&self) {
        self.connection.close();
    }

    /// Current push-channel state
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Materialize the current feed and roster
    pub fn snapshot(&self) -> FeedSnapshot {
        self.store.snapshot()
    }

    /// Subscribe to derived events (new posts, connection changes)
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.emitter.subscribe()
    }

    /// Submit a post through whichever channel is available.
    ///
    /// See [`SyncCoordinator::publish`] for the fallback semantics.
    pub async fn publish(
        &self,
        content: impl Into<String>,
        author_name: impl Into<String>,
    ) -> FeedResult<Option<Post>> {
        self.coordinator.publish(content, author_name).await
    }

    /// Tear the client down: abort the coordinator, close the channel,
    /// cancel every outstanding timer. Terminal for this instance.
    pub fn shutdown(&self) {
        if let Some(handle) = self.driver.lock().take() {
            handle.abort();
        }
        self.connection.close();
    }
}

impl Drop for FeedClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}
