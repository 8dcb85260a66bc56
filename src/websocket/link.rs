//! Connection lifecycle state machine.
//!
//! [`Link`] tracks the single logical connection through
//! `Connecting → Open → Closed → Connecting ...` without touching any
//! socket. Outbound frames go through a [`Transport`], so the whole
//! lifecycle can be driven in tests with a recording fake.

use std::fmt;
use std::time::Instant;

use tracing::debug;

use crate::{CandlebookError, Result};

/// Opaque identity of one connection attempt. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Snapshot of the current connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub state: ConnectionState,
    /// When a frame was last received on this connection.
    pub last_seen_alive: Option<Instant>,
}

/// Outbound half of an open connection.
///
/// Sends are fire-and-forget: an implementation queues the frame and
/// returns without waiting for it to reach the wire.
pub trait Transport: Send {
    fn send_text(&mut self, text: String) -> Result<()>;
}

/// The connection state machine.
#[derive(Default)]
pub struct Link {
    connection: Option<Connection>,
    transport: Option<Box<dyn Transport>>,
    next_id: u64,
}

impl Link {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> Option<Connection> {
        self.connection
    }

    /// Current lifecycle state; no connection at all counts as `Closed`.
    pub fn state(&self) -> ConnectionState {
        self.connection
            .map_or(ConnectionState::Closed, |c| c.state)
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Starts a new connection attempt under a fresh identity, discarding
    /// whatever connection existed before.
    pub fn begin_connect(&mut self) -> ConnectionId {
        self.next_id += 1;
        let id = ConnectionId(self.next_id);
        self.transport = None;
        self.connection = Some(Connection {
            id,
            state: ConnectionState::Connecting,
            last_seen_alive: None,
        });
        debug!(connection = %id, "Connecting");
        id
    }

    /// Marks attempt `id` open with its outbound transport.
    ///
    /// Returns `false` if `id` is not the attempt currently connecting.
    pub fn open(&mut self, id: ConnectionId, transport: Box<dyn Transport>) -> bool {
        match self.connection.as_mut() {
            Some(conn) if conn.id == id && conn.state == ConnectionState::Connecting => {
                conn.state = ConnectionState::Open;
                conn.last_seen_alive = Some(Instant::now());
                self.transport = Some(transport);
                debug!(connection = %id, "Open");
                true
            }
            _ => false,
        }
    }

    /// Closes connection `id` and drops its handle.
    ///
    /// Returns `false` for a stale `id`, leaving a newer connection alone.
    pub fn close(&mut self, id: ConnectionId) -> bool {
        match self.connection {
            Some(conn) if conn.id == id => {
                self.connection = None;
                self.transport = None;
                debug!(connection = %id, "Closed");
                true
            }
            _ => false,
        }
    }

    /// Records that the open connection just showed signs of life.
    pub fn touch(&mut self) {
        if let Some(conn) = self.connection.as_mut() {
            conn.last_seen_alive = Some(Instant::now());
        }
    }

    /// Sends a text frame on the open connection.
    ///
    /// # Errors
    ///
    /// Returns [`CandlebookError::NotConnected`] unless the connection is
    /// open, or whatever the transport reports.
    pub fn send(&mut self, text: String) -> Result<()> {
        if !self.is_open() {
            return Err(CandlebookError::NotConnected);
        }
        match self.transport.as_mut() {
            Some(transport) => transport.send_text(text),
            None => Err(CandlebookError::NotConnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<String>>>);

    impl Transport for Sink {
        fn send_text(&mut self, text: String) -> Result<()> {
            self.0.lock().push(text);
            Ok(())
        }
    }

    #[test]
    fn walks_through_lifecycle() {
        let mut link = Link::new();
        assert_eq!(link.state(), ConnectionState::Closed);

        let id = link.begin_connect();
        assert_eq!(link.state(), ConnectionState::Connecting);
        assert!(matches!(link.send("x".into()), Err(CandlebookError::NotConnected)));

        let sink = Sink::default();
        assert!(link.open(id, Box::new(sink.clone())));
        assert!(link.is_open());
        link.send("hello".into()).unwrap();
        assert_eq!(*sink.0.lock(), vec!["hello".to_string()]);

        assert!(link.close(id));
        assert!(link.connection().is_none());
        assert!(matches!(link.send("x".into()), Err(CandlebookError::NotConnected)));
    }

    #[test]
    fn every_attempt_gets_a_new_identity() {
        let mut link = Link::new();
        let first = link.begin_connect();
        link.close(first);
        let second = link.begin_connect();

        assert_ne!(first, second);
    }

    #[test]
    fn stale_events_are_ignored() {
        let mut link = Link::new();
        let old = link.begin_connect();
        let new = link.begin_connect();

        assert!(!link.open(old, Box::new(Sink::default())));
        assert!(link.open(new, Box::new(Sink::default())));
        assert!(!link.close(old));
        assert!(link.is_open());
    }
}
