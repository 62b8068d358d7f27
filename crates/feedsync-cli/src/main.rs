//! Feed synchronization CLI
//!
//! Thin wrapper around feedsync-core for command-line usage.
//!
//! ## Usage
//!
//! ```bash
//! # Follow the feed live (push channel with automatic fallback)
//! feedsync watch
//!
//! # Publish a post
//! feedsync post "hello, network" --name Alice
//!
//! # Show the current network state
//! feedsync network
//!
//! # Point at another node
//! feedsync --server http://relay.example.net:3030 watch
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

use feedsync_core::{
    ClientConfig, FallbackApi, FeedClient, FeedEvent, PublishRequest, RestClient,
};

/// Feed synchronization client
#[derive(Parser)]
#[command(name = "feedsync")]
#[command(version = "0.1.0")]
#[command(about = "Keeps a local feed view synchronized with a remote node")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Server base URL
    #[arg(short, long, global = true, default_value = "http://127.0.0.1:3030")]
    server: String,

    /// Push channel URL override (derived from --server by default)
    #[arg(long, global = true)]
    ws_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the feed live, printing posts and connection changes
    Watch,

    /// Publish a post
    Post {
        /// Post body
        content: String,

        /// Display name to publish under
        #[arg(short, long, default_value = "Anonymous")]
        name: String,
    },

    /// Show the current network state
    Network,
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

/// API base for a server URL: `http://host:3030` -> `http://host:3030/api`
fn api_base(server: &str) -> String {
    format!("{}/api", server.trim_end_matches('/'))
}

/// Push channel URL for a server URL:
/// `http://host:3030` -> `ws://host:3030/ws` (https -> wss)
fn push_url(server: &str) -> String {
    let server = server.trim_end_matches('/');
    let ws = if let Some(rest) = server.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = server.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        server.to_string()
    };
    format!("{ws}/ws")
}

async fn watch(config: ClientConfig) -> Result<()> {
    let client = FeedClient::new(config);
    let mut events = client.subscribe();
    client.connect();

    println!("Watching the feed (Ctrl-C to stop)...");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(FeedEvent::PostArrived { post }) => {
                    let author = if post.author_name.is_empty() {
                        post.author.as_str()
                    } else {
                        post.author_name.as_str()
                    };
                    println!("[{}] {}: {}", post.relative_time(), author, post.content);
                }
                Ok(FeedEvent::ConnectionChanged { state, reason }) => {
                    println!("-- connection {state} ({reason})");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    eprintln!("-- fell behind, skipped {n} events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    client.shutdown();
    Ok(())
}

async fn publish(api: RestClient, content: String, name: String) -> Result<()> {
    let request = PublishRequest {
        content,
        author_name: name,
    };
    let post = api.publish(&request).await?;
    println!("Published post {}", post.id);
    Ok(())
}

async fn network(api: RestClient) -> Result<()> {
    let info = api.fetch_network().await?;

    println!("Node:");
    println!("  Peer ID: {}", info.local_peer_id);
    if let Some(name) = &info.local_name {
        println!("  Name:    {}", name);
    }
    println!("  Mode:    {}", if info.is_relay { "relay" } else { "client" });
    println!();

    println!("Peers ({}):", info.peers.len());
    for peer in &info.peers {
        let kind = if peer.is_browser { "browser" } else { "native" };
        println!(
            "  {} [{}] {}",
            peer.peer_id,
            kind,
            peer.display_name()
        );
    }
    println!();

    println!("Posts ({}):", info.posts.len());
    for post in &info.posts {
        let author = if post.author_name.is_empty() {
            post.author.as_str()
        } else {
            post.author_name.as_str()
        };
        println!("  [{}] {}: {}", post.relative_time(), author, post.content);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let ws_url = cli.ws_url.clone().unwrap_or_else(|| push_url(&cli.server));
    let api = api_base(&cli.server);
    tracing::debug!(%ws_url, %api, "resolved endpoints");

    match cli.command {
        Commands::Watch => watch(ClientConfig::new(ws_url, api)).await,
        Commands::Post { content, name } => publish(RestClient::new(api), content, name).await,
        Commands::Network => network(RestClient::new(api)).await,
    }
}
