//! Last price header for one instrument.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::warn;

use crate::models::trade::TradeData;
use crate::models::{ChannelKey, Resolution};
use crate::reducer::LastPrice;
use crate::websocket::{Feed, Subscription};

#[derive(Debug)]
pub struct PriceWatcher {
    price: Arc<Mutex<LastPrice>>,
    _subscription: Subscription,
}

impl PriceWatcher {
    /// Tracks the close of live candle updates at `resolution`.
    pub fn from_candles(feed: &Feed, instrument: &str, resolution: Resolution) -> Self {
        let price = Arc::new(Mutex::new(LastPrice::default()));
        let target = Arc::clone(&price);
        let key = ChannelKey::candlestick(resolution, instrument);

        let subscription = Subscription::new(feed, key, move |data| {
            target.lock().apply_candles(data);
        });

        Self {
            price,
            _subscription: subscription,
        }
    }

    /// Tracks the price of the latest trade.
    pub fn from_trades(feed: &Feed, instrument: &str) -> Self {
        let price = Arc::new(Mutex::new(LastPrice::default()));
        let target = Arc::clone(&price);
        let key = ChannelKey::trade(instrument);

        let subscription = Subscription::new(feed, key, move |data| {
            let Some(first) = data.first() else {
                return;
            };
            match TradeData::deserialize(first) {
                Ok(trade) => {
                    target.lock().apply_trades(std::slice::from_ref(&trade));
                }
                Err(e) => warn!("Discarding malformed trade: {e}"),
            }
        });

        Self {
            price,
            _subscription: subscription,
        }
    }

    pub fn last(&self) -> LastPrice {
        *self.price.lock()
    }
}
