//! Process-scoped market feed context.
//!
//! A [`Feed`] is a cheap, cloneable handle shared by the connection manager
//! and every consumer. It owns the connection state machine and the channel
//! router behind one lock, so frame handling, reducer callbacks and
//! subscription changes are applied one at a time and never interleave.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::link::{Connection, ConnectionId, ConnectionState, Link, Transport};
use super::router::{Callback, Router, SubscriberId};
use crate::Result;
use crate::models::{
    ChannelKey, HEARTBEAT_METHOD, HeartbeatReply, InboundFrame, SUBSCRIBE_METHOD,
    SubscribeRequest, SubscriptionResult, UnsubscribeRequest,
};

struct Inner {
    link: Link,
    router: Router,
}

impl Inner {
    fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let json = serde_json::to_string(message)?;
        self.link.send(json)
    }

    fn send_subscribe(&mut self, key: &ChannelKey) {
        if !self.link.is_open() {
            warn!(channel = %key, "Connection not open, subscribe deferred to reconnect");
            return;
        }
        match self.send(&SubscribeRequest::new(std::slice::from_ref(key))) {
            Ok(()) => info!(channel = %key, "Subscribed to channel"),
            Err(e) => warn!(channel = %key, "Failed to send subscribe: {e}"),
        }
    }

    fn send_unsubscribe(&mut self, key: &ChannelKey) {
        if !self.link.is_open() {
            warn!(channel = %key, "Connection not open, skipping unsubscribe");
            return;
        }
        match self.send(&UnsubscribeRequest::new(std::slice::from_ref(key))) {
            Ok(()) => info!(channel = %key, "Unsubscribed from channel"),
            Err(e) => warn!(channel = %key, "Failed to send unsubscribe: {e}"),
        }
    }
}

/// Shared handle to the market feed.
#[derive(Clone)]
pub struct Feed {
    inner: Arc<Mutex<Inner>>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
}

impl Feed {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Closed);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                link: Link::new(),
                router: Router::new(),
            })),
            state_tx: Arc::new(state_tx),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().link.state()
    }

    /// The current connection, or `None` while closed.
    pub fn connection(&self) -> Option<Connection> {
        self.inner.lock().link.connection()
    }

    /// Receiver that observes every connection state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Channel keys with at least one live subscriber.
    pub fn active_channels(&self) -> Vec<ChannelKey> {
        self.inner.lock().router.active_keys()
    }

    /// Starts a connection attempt.
    pub fn begin_connect(&self) -> ConnectionId {
        let id = self.inner.lock().link.begin_connect();
        self.state_tx.send_replace(ConnectionState::Connecting);
        id
    }

    /// Marks attempt `id` open and replays a subscribe for every active
    /// channel. Returns how many channels were replayed.
    pub fn on_open(&self, id: ConnectionId, transport: impl Transport + 'static) -> usize {
        let replayed = {
            let mut inner = self.inner.lock();
            if !inner.link.open(id, Box::new(transport)) {
                debug!(connection = %id, "Ignoring open for stale connection");
                return 0;
            }
            let keys = inner.router.active_keys();
            for key in &keys {
                inner.send_subscribe(key);
            }
            keys.len()
        };
        self.state_tx.send_replace(ConnectionState::Open);
        replayed
    }

    /// Marks connection `id` closed and drops its handle.
    pub fn on_close(&self, id: ConnectionId) {
        let closed = self.inner.lock().link.close(id);
        if closed {
            self.state_tx.send_replace(ConnectionState::Closed);
        }
    }

    /// Processes one inbound text frame.
    ///
    /// Heartbeats are answered on the spot; channel pushes are routed to
    /// their subscribers. Anything unparsable or unexpected is logged and
    /// dropped.
    pub fn handle_frame(&self, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!("Discarding unparsable frame: {e}");
                return;
            }
        };
        let frame: InboundFrame = match serde_json::from_value(value) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Discarding frame with unexpected envelope: {e}");
                return;
            }
        };

        let mut inner = self.inner.lock();
        inner.link.touch();

        if let Some(code) = frame.code.filter(|c| *c != 0) {
            warn!(
                code,
                method = ?frame.method,
                message = ?frame.message,
                "Exchange returned an error"
            );
            return;
        }

        match frame.method.as_deref() {
            Some(HEARTBEAT_METHOD) => {
                let Some(id) = frame.id else {
                    warn!("Heartbeat without id");
                    return;
                };
                match inner.send(&HeartbeatReply::new(id)) {
                    Ok(()) => debug!("Answered heartbeat"),
                    Err(e) => warn!("Failed to answer heartbeat: {e}"),
                }
            }
            Some(SUBSCRIBE_METHOD) => {
                let Some(result) = frame.result else {
                    debug!("Subscription acknowledged");
                    return;
                };
                match serde_json::from_value::<SubscriptionResult>(result) {
                    Ok(result) => {
                        inner.router.dispatch(&result);
                    }
                    Err(e) => debug!("Discarding malformed channel push: {e}"),
                }
            }
            method => debug!(?method, "Ignoring frame"),
        }
    }

    /// Registers `callback` for `key`, subscribing on the wire when the key
    /// becomes active.
    pub(crate) fn register(&self, key: ChannelKey, callback: Callback) -> SubscriberId {
        let mut inner = self.inner.lock();
        let registered = inner.router.register(key.clone(), callback);
        if registered.first {
            inner.send_subscribe(&key);
        }
        registered.id
    }

    /// Releases one registration, unsubscribing on the wire when the key
    /// has no subscribers left.
    pub(crate) fn unregister(&self, key: &ChannelKey, id: SubscriberId) {
        let mut inner = self.inner.lock();
        if inner.router.unregister(key, id) {
            inner.send_unsubscribe(key);
        }
    }
}

impl std::fmt::Debug for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feed")
            .field("state", &*self.state_tx.borrow())
            .finish_non_exhaustive()
    }
}

impl Default for Feed {
    fn default() -> Self {
        Self::new()
    }
}
