//! WebSocket connection lifecycle management.
//!
//! [`ConnectionManager`] drives the real socket: it connects, hands inbound
//! text frames to the [`Feed`], and reconnects according to a
//! [`ReconnectPolicy`]. Every successful open replays all active channel
//! subscriptions through the feed.

use std::str::FromStr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tungstenite::Message as WsMessage;

use super::feed::Feed;
use super::link::Transport;
use super::{WsReader, WsWriter, connect};
use crate::{CandlebookError, Result};

/// Initial backoff duration between reconnection attempts.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Maximum backoff duration between reconnection attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// When to try again after the connection is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Wait for an explicit [`ConnectionCommand::Resume`], as an interactive
    /// host does when it comes back to the foreground.
    OnResume,
    /// Retry with exponential backoff. A resume signal cuts the wait short.
    Backoff { initial: Duration, max: Duration },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Backoff {
            initial: INITIAL_BACKOFF,
            max: MAX_BACKOFF,
        }
    }
}

impl FromStr for ReconnectPolicy {
    type Err = CandlebookError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "backoff" => Ok(ReconnectPolicy::default()),
            "resume" => Ok(ReconnectPolicy::OnResume),
            other => Err(CandlebookError::Config(format!(
                "unknown reconnect policy {other:?}, expected \"backoff\" or \"resume\""
            ))),
        }
    }
}

/// Commands sent to the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionCommand {
    /// The host regained the foreground; reconnect now if not connected.
    Resume,
    /// Close the connection and stop.
    Shutdown,
}

/// Why the reader loop exited.
enum DisconnectReason {
    /// The connection was lost, errored, or closed by the server.
    ConnectionError,
    /// Shutdown was requested or every command sender is gone.
    Shutdown,
}

/// Sending side of a running [`ConnectionManager`].
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    tx: mpsc::UnboundedSender<ConnectionCommand>,
}

impl ConnectionHandle {
    /// Asks for an eager reconnect if no connection is live.
    pub fn resume(&self) {
        if self.tx.send(ConnectionCommand::Resume).is_err() {
            debug!("Connection manager already stopped");
        }
    }

    /// Closes the connection and stops the manager.
    pub fn shutdown(&self) {
        if self.tx.send(ConnectionCommand::Shutdown).is_err() {
            debug!("Connection manager already stopped");
        }
    }
}

/// [`Transport`] that queues frames for the writer task.
struct QueueTransport {
    tx: mpsc::UnboundedSender<WsMessage>,
}

impl Transport for QueueTransport {
    fn send_text(&mut self, text: String) -> Result<()> {
        self.tx
            .send(WsMessage::Text(text.into()))
            .map_err(|_| CandlebookError::NotConnected)
    }
}

/// Manages the market data WebSocket including reconnection.
pub struct ConnectionManager {
    url: String,
    feed: Feed,
    policy: ReconnectPolicy,
    cmd_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
}

impl ConnectionManager {
    /// Creates a manager and the handle used to control it.
    #[must_use]
    pub fn new(url: String, feed: Feed, policy: ReconnectPolicy) -> (Self, ConnectionHandle) {
        let (tx, cmd_rx) = mpsc::unbounded_channel();
        let manager = Self {
            url,
            feed,
            policy,
            cmd_rx,
        };
        (manager, ConnectionHandle { tx })
    }

    /// Runs the connection loop until shutdown.
    pub async fn run(mut self) {
        let mut backoff = self.initial_backoff();

        loop {
            let id = self.feed.begin_connect();
            info!(url = %self.url, connection = %id, "Connecting to market feed");

            let (write, read) = match connect(&self.url).await {
                Ok(pair) => pair,
                Err(e) => {
                    error!("Connection failed: {e}");
                    self.feed.on_close(id);
                    if self.wait_for_retry(&mut backoff).await {
                        continue;
                    }
                    info!("Connection manager shutting down");
                    return;
                }
            };

            let (tx, rx) = mpsc::unbounded_channel();
            let writer = tokio::spawn(write_loop(write, rx));

            let replayed = self
                .feed
                .on_open(id, QueueTransport { tx: tx.clone() });
            info!(connection = %id, replayed, "Market feed connected");
            backoff = self.initial_backoff();

            let reason = self.read_loop(read).await;

            // Dropping the feed's transport and our sender ends the writer.
            self.feed.on_close(id);
            if matches!(reason, DisconnectReason::Shutdown) {
                let _ = tx.send(WsMessage::Close(None));
            }
            drop(tx);
            if let Err(e) = writer.await {
                warn!("Writer task failed: {e}");
            }

            match reason {
                DisconnectReason::ConnectionError => {
                    if !self.wait_for_retry(&mut backoff).await {
                        info!("Connection manager shutting down");
                        return;
                    }
                }
                DisconnectReason::Shutdown => {
                    info!("Connection manager shutting down");
                    return;
                }
            }
        }
    }

    fn initial_backoff(&self) -> Duration {
        match self.policy {
            ReconnectPolicy::OnResume => Duration::ZERO,
            ReconnectPolicy::Backoff { initial, .. } => initial,
        }
    }

    /// Waits until the policy allows another attempt. Returns `false` when
    /// the manager should stop instead.
    async fn wait_for_retry(&mut self, backoff: &mut Duration) -> bool {
        match self.policy {
            ReconnectPolicy::OnResume => {
                info!("Disconnected, waiting for resume signal");
                matches!(self.cmd_rx.recv().await, Some(ConnectionCommand::Resume))
            }
            ReconnectPolicy::Backoff { max, .. } => {
                info!(
                    backoff_secs = backoff.as_secs(),
                    "Backing off before retry"
                );
                let sleep = tokio::time::sleep(*backoff);
                *backoff = (*backoff * 2).min(max);
                tokio::select! {
                    () = sleep => true,
                    cmd = self.cmd_rx.recv() => matches!(cmd, Some(ConnectionCommand::Resume)),
                }
            }
        }
    }

    /// Reads frames until disconnection or shutdown.
    async fn read_loop(&mut self, mut read: WsReader) -> DisconnectReason {
        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => self.feed.handle_frame(&text),
                        Some(Ok(WsMessage::Close(frame))) => {
                            warn!(?frame, "Server closed the connection");
                            return DisconnectReason::ConnectionError;
                        }
                        Some(Ok(_)) => {} // Binary/Ping/Pong frames
                        Some(Err(e)) => {
                            warn!("WebSocket error: {e}");
                            return DisconnectReason::ConnectionError;
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            return DisconnectReason::ConnectionError;
                        }
                    }
                }

                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(ConnectionCommand::Resume) => {
                            debug!("Resume ignored, connection is live");
                        }
                        Some(ConnectionCommand::Shutdown) | None => {
                            return DisconnectReason::Shutdown;
                        }
                    }
                }
            }
        }
    }
}

/// Drains queued frames onto the socket until every sender is dropped.
async fn write_loop(mut write: WsWriter, mut rx: mpsc::UnboundedReceiver<WsMessage>) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = write.send(msg).await {
            warn!("Failed to send frame: {e}");
            return;
        }
    }
    let _ = write.close().await;
}
