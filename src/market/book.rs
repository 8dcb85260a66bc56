//! Live top-N order book for one instrument.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::warn;

use crate::models::ChannelKey;
use crate::models::book::BookData;
use crate::reducer::OrderBook;
use crate::websocket::{Feed, Subscription};

/// Keeps an [`OrderBook`] fed from `book.<instrument>.<depth>`.
#[derive(Debug)]
pub struct BookWatcher {
    instrument: String,
    book: Arc<Mutex<OrderBook>>,
    _subscription: Subscription,
}

impl BookWatcher {
    /// Subscribes at `subscribe_depth` levels and keeps the first
    /// `order_size` of each side.
    pub fn new(feed: &Feed, instrument: &str, subscribe_depth: u16, order_size: usize) -> Self {
        let book = Arc::new(Mutex::new(OrderBook::default()));
        let target = Arc::clone(&book);
        let key = ChannelKey::book(instrument, subscribe_depth);

        let subscription = Subscription::new(feed, key, move |data| {
            let Some(first) = data.first() else {
                return;
            };
            match BookData::deserialize(first) {
                Ok(snapshot) => {
                    target
                        .lock()
                        .apply_snapshot(std::slice::from_ref(&snapshot), order_size);
                }
                Err(e) => warn!("Discarding malformed book snapshot: {e}"),
            }
        });

        Self {
            instrument: instrument.to_string(),
            book,
            _subscription: subscription,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// A copy of the current book.
    pub fn snapshot(&self) -> OrderBook {
        self.book.lock().clone()
    }
}
