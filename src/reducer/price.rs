//! Last traded price with tick direction.

use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;

use crate::models::candle::decode_candles;
use crate::models::trade::TradeData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceDirection {
    Up,
    Down,
    #[default]
    Unchanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LastPrice {
    current: Option<f64>,
    previous: Option<f64>,
}

impl LastPrice {
    /// Records a new price; the old current price becomes the previous one.
    /// Non-finite prices are ignored.
    pub fn record(&mut self, price: f64) {
        if !price.is_finite() {
            return;
        }
        self.previous = self.current;
        self.current = Some(price);
    }

    /// Records the close of a live single-candle update. Batches are history
    /// and do not move the price.
    pub fn apply_candles(&mut self, data: &[Value]) -> bool {
        if data.len() != 1 {
            return false;
        }
        match decode_candles(data).first() {
            Some(candle) => {
                self.record(candle.close);
                true
            }
            None => false,
        }
    }

    /// Records the price of the first trade in a trade push.
    pub fn apply_trades(&mut self, data: &[TradeData]) -> bool {
        match data.first().and_then(|t| t.price.to_f64()) {
            Some(price) => {
                self.record(price);
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> Option<f64> {
        self.current
    }

    pub fn previous(&self) -> Option<f64> {
        self.previous
    }

    pub fn direction(&self) -> PriceDirection {
        match (self.current, self.previous) {
            (Some(cur), Some(prev)) if cur > prev => PriceDirection::Up,
            (Some(cur), Some(prev)) if cur < prev => PriceDirection::Down,
            _ => PriceDirection::Unchanged,
        }
    }
}
