//! crypto.com Exchange market data client.
//!
//! Maintains a live top-N order book, a bounded candlestick series seeded
//! from REST history, and a last-price header over one shared WebSocket
//! connection. Channel subscriptions are reference counted and replayed
//! after every reconnect.

pub mod config;
pub mod error;
pub mod history;
pub mod market;
pub mod models;
pub mod reducer;
pub mod websocket;

pub use error::{CandlebookError, Result};
