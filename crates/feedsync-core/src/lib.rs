//! Resilient feed synchronization client
//!
//! Keeps a local view of a shared, append-mostly feed (posts) and a peer
//! roster synchronized with a remote source of truth over an unreliable,
//! intermittently-available transport.
//!
//! ## Overview
//!
//! Two channels feed one store. A persistent push channel delivers
//! incremental events and is kept alive with exponential-backoff
//! reconnection; a request/response pull channel fills the gaps whenever
//! the push channel is down (periodic full-state polls) or slow to answer
//! (initial-load fallback). Because the same data routinely arrives over
//! both channels, redundantly and out of order, every store merge is
//! idempotent: the final content depends only on the set of observed
//! events.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  FeedClient                                                     │
//! │  ├── ConnectionManager: push channel lifecycle, heartbeat,      │
//! │  │   exponential-backoff reconnection                           │
//! │  ├── SyncCoordinator: channel authority, offline polling,       │
//! │  │   init fallback, publish with fallback                       │
//! │  ├── FeedStore: deduplicated posts + roster, confluent merges   │
//! │  └── NotificationEmitter: new-post / connection-state events    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use feedsync_core::{ClientConfig, FeedClient, FeedEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClientConfig::new("ws://localhost:3030/ws", "http://localhost:3030/api");
//!     let client = FeedClient::new(config);
//!     let mut events = client.subscribe();
//!     client.connect();
//!
//!     client.publish("hello, network", "Alice").await.ok();
//!
//!     while let Ok(event) = events.recv().await {
//!         if let FeedEvent::PostArrived { post } = event {
//!             println!("{}: {}", post.author_name, post.content);
//!         }
//!     }
//! }
//! ```

pub mod client;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod notify;
pub mod protocol;
pub mod rest;
pub mod store;
pub mod transport;
pub mod types;

// Re-exports
pub use client::{ClientConfig, FeedClient};
pub use connection::{ConnectionEvent, ConnectionManager, ConnectionState, ReconnectPolicy};
pub use coordinator::SyncCoordinator;
pub use error::{FeedError, FeedResult};
pub use notify::{FeedEvent, NotificationEmitter};
pub use protocol::{ClientMessage, PushEvent};
pub use rest::{FallbackApi, NetworkInfo, PublishRequest, RestClient};
pub use store::FeedStore;
pub use transport::{PushConnector, PushPair, PushSink, PushSource, WsConnector};
pub use types::{FeedSnapshot, Peer, Post};
