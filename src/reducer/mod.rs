//! State folds applied to channel payloads.
//!
//! Each reducer owns one bounded view and exposes a method that folds one
//! inbound payload into it. None of them perform I/O.

pub mod book;
pub mod candles;
pub mod price;

pub use book::OrderBook;
pub use candles::{Applied, CandleSeries};
pub use price::{LastPrice, PriceDirection};
