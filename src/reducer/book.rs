//! Top-N order book view.

use rust_decimal::Decimal;

use crate::models::book::{BookData, PriceLevel};

/// Number of levels per side shown by default.
pub const DEFAULT_ORDER_SIZE: usize = 5;

/// Bounded bid/ask view replaced wholesale by each snapshot.
///
/// Level order is whatever the exchange sent; it is never re-sorted here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    pub asks: Vec<PriceLevel>,
    pub bids: Vec<PriceLevel>,
}

impl OrderBook {
    /// Replaces the book with the first snapshot in `data`, keeping at most
    /// `depth` levels per side.
    ///
    /// Returns `false` and leaves the book untouched when `data` is empty.
    pub fn apply_snapshot(&mut self, data: &[BookData], depth: usize) -> bool {
        let Some(snapshot) = data.first() else {
            return false;
        };

        self.asks = snapshot.asks.iter().take(depth).copied().collect();
        self.bids = snapshot.bids.iter().take(depth).copied().collect();
        true
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Best ask minus best bid, if both sides are populated.
    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()?.price - self.best_bid()?.price)
    }

    pub fn is_empty(&self) -> bool {
        self.asks.is_empty() && self.bids.is_empty()
    }
}
