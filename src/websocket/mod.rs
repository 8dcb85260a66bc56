//! Async WebSocket client for the crypto.com Exchange market data stream.
//!
//! This module is organized by concern:
//! - [`link`] - Connection lifecycle state machine and outbound transport
//! - [`router`] - Channel push demultiplexing
//! - [`feed`] - Shared context combining the two, plus heartbeat handling
//! - [`subscription`] - Subscribe/unsubscribe tied to a value's lifetime
//! - [`connection`] - The socket loop with reconnection

pub mod connection;
pub mod feed;
pub mod link;
pub mod router;
pub mod subscription;

use futures_util::StreamExt;
use futures_util::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::info;
use tungstenite::Message;

use crate::Result;

pub use connection::{ConnectionCommand, ConnectionHandle, ConnectionManager, ReconnectPolicy};
pub use feed::Feed;
pub use link::{Connection, ConnectionId, ConnectionState, Transport};
pub use subscription::Subscription;

/// Write half of a market data WebSocket connection.
pub type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Read half of a market data WebSocket connection.
pub type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Establishes a WebSocket connection to the given URL.
///
/// # Errors
///
/// Returns a [`CandlebookError`](crate::CandlebookError) if the connection or TLS handshake fails.
pub async fn connect(url: &str) -> Result<(WsWriter, WsReader)> {
    let (ws_stream, _) = connect_async(url).await?;
    info!("WebSocket handshake completed");

    Ok(ws_stream.split())
}
