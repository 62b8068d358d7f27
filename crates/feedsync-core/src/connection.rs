//! Push-channel lifecycle: state machine, heartbeat, reconnection policy
//!
//! One manager owns one push-channel connection at a time and drives it
//! from a background task:
//!
//! ```text
//! Disconnected --connect()--> Connecting --open--> Connected
//!       ^                         |                   |
//!       +----- close/error -------+-------------------+
//! ```
//!
//! On entering `Disconnected` from a previously-`Connected` or failed
//! `Connecting` state, a reconnect is scheduled automatically with
//! exponential backoff; never after a user-initiated [`ConnectionManager::close`].
//! Once the attempt budget is exhausted the manager reports a terminal
//! `Error` state and stays there until an explicit
//! [`ConnectionManager::connect`] call resumes it.
//!
//! Liveness is inferred solely from the channel's own close/error signals;
//! the heartbeat ping keeps intermediaries from idling the connection out
//! but no answer is awaited.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::protocol::ClientMessage;
use crate::transport::{PushConnector, PushSink, PushSource};

/// Externally observable connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No channel; a reconnect may be pending
    Disconnected,
    /// Dial in progress
    Connecting,
    /// Channel open and usable
    Connected,
    /// Reconnection attempts exhausted; explicit `connect()` required
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Error => write!(f, "error"),
        }
    }
}

/// Events delivered to the coordinator, in arrival order
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A lifecycle transition, with human-readable cause.
    /// Repeated transitions to the same state carry the latest reason.
    State {
        state: ConnectionState,
        reason: String,
    },
    /// One inbound text frame, undecoded
    Message(String),
}

/// Reconnection policy knobs
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay for the first retry; doubles each consecutive failure
    pub base_delay: Duration,
    /// Upper bound on the backoff delay
    pub max_delay: Duration,
    /// Consecutive failures tolerated before giving up
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Backoff delay before reconnect attempt `attempt` (1-based):
    /// `min(base * 2^attempt, max)`
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let delay_ms = base_ms
            .saturating_mul(2u64.saturating_pow(attempt.min(32)))
            .min(max_ms);
        Duration::from_millis(delay_ms)
    }

    /// Whether the attempt budget is spent
    pub fn exhausted(&self, attempt: u32) -> bool {
        attempt > self.max_attempts
    }
}

/// Owns the single push-channel connection and its reconnection loop
pub struct ConnectionManager {
    connector: Arc<dyn PushConnector>,
    policy: ReconnectPolicy,
    heartbeat: Duration,
    state: Arc<Mutex<ConnectionState>>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    /// Writer into the current session, present only while one is live
    outbound: Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Create a manager and the event stream it feeds.
    ///
    /// No connection is made until [`connect`](Self::connect) is called.
    pub fn new(
        connector: Arc<dyn PushConnector>,
        policy: ReconnectPolicy,
        heartbeat: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let manager = Self {
            connector,
            policy,
            heartbeat,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            events,
            outbound: Arc::new(Mutex::new(None)),
            driver: Mutex::new(None),
        };
        (manager, events_rx)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Whether the channel is open right now
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Start (or restart) the connection driver.
    ///
    /// Any previous driver generation is aborted first, so a `connect()`
    /// after teardown or after the terminal `Error` state creates a fresh,
    /// independent timer and connection set.
    pub fn connect(&self) {
        let mut driver = self.driver.lock();
        if let Some(handle) = driver.take() {
            handle.abort();
        }
        *self.outbound.lock() = None;

        let connector = self.connector.clone();
        let policy = self.policy.clone();
        let heartbeat = self.heartbeat;
        let state = self.state.clone();
        let events = self.events.clone();
        let outbound = self.outbound.clone();
        *driver = Some(tokio::spawn(async move {
            run_driver(connector, policy, heartbeat, state, events, outbound).await;
        }));
    }

    /// Attempt to transmit over the open channel.
    ///
    /// Returns whether the channel was open at call time. Messages are
    /// never queued across reconnects; on `false` the caller must fall
    /// back to the request/response channel.
    pub fn send(&self, message: &ClientMessage) -> bool {
        if !self.is_connected() {
            return false;
        }
        let outbound = self.outbound.lock();
        let Some(tx) = outbound.as_ref() else {
            return false;
        };
        match message.encode() {
            Ok(text) => tx.send(text).is_ok(),
            Err(e) => {
                warn!(error = %e, "failed to encode outbound message");
                false
            }
        }
    }

    /// Tear down the channel and cancel all pending timers.
    ///
    /// No reconnect is scheduled; this is the user-initiated path.
    pub fn close(&self) {
        if let Some(handle) = self.driver.lock().take() {
            handle.abort();
        }
        *self.outbound.lock() = None;
        set_state(
            &self.state,
            &self.events,
            ConnectionState::Disconnected,
            "closed by client",
        );
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.driver.lock().take() {
            handle.abort();
        }
    }
}

/// Record a transition and notify observers.
///
/// Emits even when the state repeats, so observers always see the latest
/// reason text.
fn set_state(
    state: &Mutex<ConnectionState>,
    events: &mpsc::UnboundedSender<ConnectionEvent>,
    next: ConnectionState,
    reason: &str,
) {
    *state.lock() = next;
    info!(state = %next, reason, "connection state");
    let _ = events.send(ConnectionEvent::State {
        state: next,
        reason: reason.to_string(),
    });
}

/// Connection loop: dial, drive the session, back off, repeat
async fn run_driver(
    connector: Arc<dyn PushConnector>,
    policy: ReconnectPolicy,
    heartbeat: Duration,
    state: Arc<Mutex<ConnectionState>>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    outbound_slot: Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>,
) {
    let mut attempts: u32 = 0;
    loop {
        set_state(&state, &events, ConnectionState::Connecting, "dialing");

        match connector.connect().await {
            Ok((mut sink, mut source)) => {
                // A successful open resets the failure counter
                attempts = 0;
                let (out_tx, out_rx) = mpsc::unbounded_channel();
                *outbound_slot.lock() = Some(out_tx);
                set_state(&state, &events, ConnectionState::Connected, "push channel open");

                let reason =
                    drive_session(&mut sink, &mut source, out_rx, &events, heartbeat).await;

                *outbound_slot.lock() = None;
                set_state(&state, &events, ConnectionState::Disconnected, &reason);
            }
            Err(e) => {
                warn!(error = %e, "push channel dial failed");
                set_state(
                    &state,
                    &events,
                    ConnectionState::Disconnected,
                    &format!("dial failed: {e}"),
                );
            }
        }

        attempts += 1;
        if policy.exhausted(attempts) {
            set_state(
                &state,
                &events,
                ConnectionState::Error,
                "reconnect attempts exhausted",
            );
            return;
        }

        let delay = policy.delay(attempts);
        debug!(attempt = attempts, ?delay, "scheduling reconnect");
        tokio::time::sleep(delay).await;
    }
}

/// Pump one live session until it ends; returns the disconnect reason
async fn drive_session(
    sink: &mut Box<dyn PushSink>,
    source: &mut Box<dyn PushSource>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: &mpsc::UnboundedSender<ConnectionEvent>,
    heartbeat: Duration,
) -> String {
    let mut ticker = tokio::time::interval(heartbeat);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick fires immediately; the heartbeat starts one period in
    ticker.tick().await;

    loop {
        tokio::select! {
            frame = source.next() => match frame {
                Some(Ok(text)) => {
                    if events.send(ConnectionEvent::Message(text)).is_err() {
                        return "observer gone".to_string();
                    }
                }
                Some(Err(e)) => return format!("read error: {e}"),
                None => return "closed by remote".to_string(),
            },
            queued = outbound.recv() => match queued {
                Some(text) => {
                    if let Err(e) = sink.send(text).await {
                        return format!("write error: {e}");
                    }
                }
                None => return "outbound channel closed".to_string(),
            },
            _ = ticker.tick() => {
                match ClientMessage::Ping.encode() {
                    Ok(text) => {
                        if let Err(e) = sink.send(text).await {
                            return format!("write error: {e}");
                        }
                    }
                    Err(e) => debug!(error = %e, "failed to encode heartbeat"),
                }
            }
        }
    }
}
