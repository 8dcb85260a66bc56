//! Channel subscription sessions.
//!
//! A [`Subscription`] ties one channel key to the lifetime of the value
//! holding it: creating it subscribes, dropping it unsubscribes. Both wire
//! messages are best-effort; while the connection is down they are skipped
//! and the reconnect replay takes over.

use serde_json::Value;

use super::feed::Feed;
use super::router::SubscriberId;
use crate::models::ChannelKey;

pub struct Subscription {
    feed: Feed,
    key: ChannelKey,
    id: SubscriberId,
}

impl Subscription {
    /// Registers `callback` for every push on `key`.
    ///
    /// The callback runs while the feed is locked and must not call back
    /// into the [`Feed`] (including dropping a `Subscription`).
    pub fn new<F>(feed: &Feed, key: ChannelKey, callback: F) -> Self
    where
        F: FnMut(&[Value]) + Send + 'static,
    {
        let id = feed.register(key.clone(), Box::new(callback));
        Self {
            feed: feed.clone(),
            key,
            id,
        }
    }

    pub fn key(&self) -> &ChannelKey {
        &self.key
    }
}

impl Drop for Subscription {
    /// Deregisters before returning, so the callback cannot run again.
    fn drop(&mut self) {
        self.feed.unregister(&self.key, self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
