//! Pull channel: request/response fallback over HTTP
//!
//! Two endpoints back the push channel up: a full-state fetch used for
//! periodic refresh while the push channel is down (and for the initial
//! load when the push channel is slow to answer), and a publish call used
//! when an outbound post cannot go out over the open channel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{FeedError, FeedResult};
use crate::types::{FeedSnapshot, Peer, Post};

/// Full network state returned by the pull channel
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkInfo {
    /// Our peer identifier as the remote end sees it
    pub local_peer_id: String,
    /// Display name of the remote node, if it has one
    #[serde(default)]
    pub local_name: Option<String>,
    /// Whether the remote node runs in relay mode
    #[serde(default)]
    pub is_relay: bool,
    #[serde(default)]
    pub peers: Vec<Peer>,
    #[serde(default)]
    pub posts: Vec<Post>,
}

impl NetworkInfo {
    /// Convert into a snapshot suitable for [`crate::FeedStore::apply_snapshot`]
    pub fn into_snapshot(self) -> FeedSnapshot {
        FeedSnapshot {
            local_peer_id: Some(self.local_peer_id),
            posts: self.posts,
            peers: self.peers,
        }
    }
}

/// Body of a request/response publish call
#[derive(Debug, Clone, Serialize)]
pub struct PublishRequest {
    pub content: String,
    pub author_name: String,
}

/// The request/response channel the coordinator falls back to when the
/// push channel is unavailable
#[async_trait]
pub trait FallbackApi: Send + Sync {
    /// Fetch the full network state
    async fn fetch_network(&self) -> FeedResult<NetworkInfo>;

    /// Publish a post; returns the created post on success
    async fn publish(&self, request: &PublishRequest) -> FeedResult<Post>;
}

/// HTTP implementation of the pull channel
pub struct RestClient {
    base_url: String,
    http: reqwest::Client,
}

impl RestClient {
    /// Create a client for the given API base URL (e.g. `http://host:3030/api`)
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl FallbackApi for RestClient {
    async fn fetch_network(&self) -> FeedResult<NetworkInfo> {
        let response = self.http.get(self.url("/network")).send().await?;
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }

    async fn publish(&self, request: &PublishRequest) -> FeedResult<Post> {
        let response = self
            .http
            .post(self.url("/post"))
            .json(request)
            .send()
            .await
            .map_err(|e| FeedError::Publish(format!("publish request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(FeedError::Publish(format!(
                "publish rejected: HTTP {}",
                response.status()
            )));
        }

        response
            .json::<Post>()
            .await
            .map_err(|e| FeedError::Publish(format!("invalid publish response: {e}")))
    }
}
