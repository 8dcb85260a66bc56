//! Trade channel models.

use rust_decimal::Decimal;
use serde::Deserialize;

/// A single executed trade from `trade.<instrument>`.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeData {
    #[serde(rename = "d")]
    pub trade_id: String,
    /// Trade time, epoch milliseconds.
    #[serde(rename = "t")]
    pub timestamp: i64,
    #[serde(rename = "p")]
    pub price: Decimal,
    #[serde(rename = "q")]
    pub qty: Decimal,
    /// Taker side.
    #[serde(rename = "s")]
    pub side: Side,
    #[serde(rename = "i")]
    pub instrument: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}
