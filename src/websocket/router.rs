//! Channel push demultiplexing.
//!
//! The [`Router`] remembers which channel keys are wanted and by whom,
//! independently of any connection, so that the full set can be replayed
//! after a reconnect. It never looks inside payloads.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::models::{ChannelKey, SubscriptionResult};

/// Callback invoked with the `data` array of every push for its key.
pub type Callback = Box<dyn FnMut(&[Value]) + Send>;

/// Identifies one registration so that shared keys can be released
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Outcome of [`Router::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registered {
    pub id: SubscriberId,
    /// `true` when this registration made the key active.
    pub first: bool,
}

#[derive(Default)]
pub struct Router {
    routes: BTreeMap<ChannelKey, Vec<(SubscriberId, Callback)>>,
    next_id: u64,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: ChannelKey, callback: Callback) -> Registered {
        self.next_id += 1;
        let id = SubscriberId(self.next_id);
        let subscribers = self.routes.entry(key).or_default();
        subscribers.push((id, callback));

        Registered {
            id,
            first: subscribers.len() == 1,
        }
    }

    /// Removes one registration. Returns `true` when it was the last one
    /// for `key`, which makes the key inactive.
    pub fn unregister(&mut self, key: &ChannelKey, id: SubscriberId) -> bool {
        let Some(subscribers) = self.routes.get_mut(key) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        if subscribers.len() == before {
            return false;
        }
        if subscribers.is_empty() {
            self.routes.remove(key);
            return true;
        }
        false
    }

    /// Keys with at least one subscriber, in key order.
    pub fn active_keys(&self) -> Vec<ChannelKey> {
        self.routes.keys().cloned().collect()
    }

    /// Hands a push to every subscriber of its key. Returns how many
    /// callbacks ran.
    pub fn dispatch(&mut self, result: &SubscriptionResult) -> usize {
        let subscription = result.subscription.as_str();
        let accepted = self
            .routes
            .get_key_value(subscription)
            .map(|(key, _)| key.accepts(&result.channel));

        match accepted {
            Some(true) => {
                let Some(subscribers) = self.routes.get_mut(subscription) else {
                    return 0;
                };
                for (_, callback) in subscribers.iter_mut() {
                    callback(&result.data);
                }
                subscribers.len()
            }
            Some(false) => {
                debug!(
                    channel = result.channel,
                    subscription = result.subscription,
                    "Push family does not match subscription, dropping"
                );
                0
            }
            None => {
                debug!(
                    subscription = result.subscription,
                    "No subscriber for push, dropping"
                );
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::models::Resolution;

    fn counter() -> (Arc<AtomicUsize>, Callback) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        (
            hits,
            Box::new(move |_data: &[Value]| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    fn push(channel: &str, subscription: &str) -> SubscriptionResult {
        SubscriptionResult {
            channel: channel.to_string(),
            subscription: subscription.to_string(),
            instrument_name: Some("BTCUSD-PERP".to_string()),
            data: vec![json!({})],
        }
    }

    #[test]
    fn family_prefix_must_match() {
        let mut router = Router::new();
        let key = ChannelKey::candlestick(Resolution::M1, "BTCUSD-PERP");
        let (hits, callback) = counter();
        router.register(key, callback);

        assert_eq!(router.dispatch(&push("candlestick", "candlestick.1m.BTCUSD-PERP")), 1);
        assert_eq!(router.dispatch(&push("book", "candlestick.1m.BTCUSD-PERP")), 0);
        assert_eq!(router.dispatch(&push("candlestick", "candlestick.5m.BTCUSD-PERP")), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_reaches_only_the_exact_key() {
        let mut router = Router::new();
        let (shallow, a) = counter();
        let (deep, b) = counter();
        let (trades, c) = counter();
        router.register(ChannelKey::book("BTCUSD-PERP", 10), a);
        router.register(ChannelKey::book("BTCUSD-PERP", 150), b);
        router.register(ChannelKey::trade("BTCUSD-PERP"), c);

        assert_eq!(router.dispatch(&push("book", "book.BTCUSD-PERP.150")), 1);
        assert_eq!(router.dispatch(&push("book", "book.BTCUSD-PERP.1")), 0);

        assert_eq!(shallow.load(Ordering::SeqCst), 0);
        assert_eq!(deep.load(Ordering::SeqCst), 1);
        assert_eq!(trades.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn shared_key_is_reference_counted() {
        let mut router = Router::new();
        let key = ChannelKey::book("BTCUSD-PERP", 10);
        let (_, a) = counter();
        let (_, b) = counter();

        let first = router.register(key.clone(), a);
        let second = router.register(key.clone(), b);
        assert!(first.first);
        assert!(!second.first);
        assert_eq!(router.active_keys(), vec![key.clone()]);

        assert!(!router.unregister(&key, first.id));
        assert!(router.unregister(&key, second.id));
        assert!(router.active_keys().is_empty());
    }

    #[test]
    fn unknown_registration_is_noop() {
        let mut router = Router::new();
        let key = ChannelKey::trade("ETH_USD");
        let (_, callback) = counter();
        let registered = router.register(key.clone(), callback);

        assert!(!router.unregister(&ChannelKey::trade("BTC_USD"), registered.id));
        assert!(router.unregister(&key, registered.id));
        assert!(!router.unregister(&key, registered.id));
    }
}
