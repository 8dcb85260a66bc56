//! Application configuration loaded from environment variables.
//!
//! Every variable is optional; empty values count as unset:
//! - `CRYPTO_WEBSOCKET_URL`: market data stream endpoint
//! - `CRYPTO_CANDLESTICK_URL`: REST endpoint used to seed candle history
//! - `CRYPTO_INSTRUMENTS`: comma separated instruments to watch
//! - `CRYPTO_BOOK_DEPTH`: depth requested on `book.<instrument>.<depth>`
//! - `CRYPTO_ORDER_SIZE`: book levels kept per side
//! - `CRYPTO_CANDLE_WINDOW`: candles kept per chart
//! - `CRYPTO_RESOLUTION`: initial chart resolution (`1m` ... `1D`)
//! - `CRYPTO_RECONNECT`: `backoff` or `resume`

use std::str::FromStr;

use crate::history::DEFAULT_CANDLESTICK_URL;
use crate::models::Resolution;
use crate::reducer::book::DEFAULT_ORDER_SIZE;
use crate::reducer::candles::{DEFAULT_WINDOW, MAX_WINDOW};
use crate::websocket::ReconnectPolicy;
use crate::{CandlebookError, Result};

/// Default public market data endpoint.
const DEFAULT_WEBSOCKET_URL: &str = "wss://stream.crypto.com/exchange/v1/market";

/// Instrument watched when none is configured.
const DEFAULT_INSTRUMENT: &str = "BTCUSD-PERP";

/// Book depth requested from the exchange by default.
const DEFAULT_BOOK_DEPTH: u16 = 10;

/// Deepest book the exchange serves.
const MAX_BOOK_DEPTH: u16 = 50;

/// Top-level application configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub display: DisplayConfig,
}

/// Where to connect and what to watch.
#[derive(Debug)]
pub struct FeedConfig {
    pub websocket_url: String,
    pub candlestick_url: String,
    pub instruments: Vec<String>,
    pub reconnect: ReconnectPolicy,
}

/// Shape of the maintained views.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub book_depth: u16,
    pub order_size: usize,
    pub candle_window: usize,
    pub resolution: Resolution,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            book_depth: DEFAULT_BOOK_DEPTH,
            order_size: DEFAULT_ORDER_SIZE,
            candle_window: DEFAULT_WINDOW,
            resolution: Resolution::default(),
        }
    }
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`CandlebookError::Config`] if a variable cannot be parsed or is
/// out of range, and [`CandlebookError::InvalidResolution`] for an unknown
/// resolution.
pub fn fetch_config() -> Result<AppConfig> {
    let websocket_url = non_empty_var("CRYPTO_WEBSOCKET_URL")
        .unwrap_or_else(|| DEFAULT_WEBSOCKET_URL.to_string());
    let candlestick_url = non_empty_var("CRYPTO_CANDLESTICK_URL")
        .unwrap_or_else(|| DEFAULT_CANDLESTICK_URL.to_string());

    let instruments = match non_empty_var("CRYPTO_INSTRUMENTS") {
        Some(list) => parse_instruments(&list)?,
        None => vec![DEFAULT_INSTRUMENT.to_string()],
    };

    let reconnect = match non_empty_var("CRYPTO_RECONNECT") {
        Some(value) => value.parse()?,
        None => ReconnectPolicy::default(),
    };

    let book_depth = parse_var("CRYPTO_BOOK_DEPTH")?.unwrap_or(DEFAULT_BOOK_DEPTH);
    if !(1..=MAX_BOOK_DEPTH).contains(&book_depth) {
        return Err(CandlebookError::Config(format!(
            "CRYPTO_BOOK_DEPTH must be between 1 and {MAX_BOOK_DEPTH}, got {book_depth}"
        )));
    }

    let order_size = parse_var("CRYPTO_ORDER_SIZE")?.unwrap_or(DEFAULT_ORDER_SIZE);
    if order_size == 0 {
        return Err(CandlebookError::Config(
            "CRYPTO_ORDER_SIZE must be at least 1".to_string(),
        ));
    }

    let candle_window = parse_var("CRYPTO_CANDLE_WINDOW")?.unwrap_or(DEFAULT_WINDOW);
    if !(1..=MAX_WINDOW).contains(&candle_window) {
        return Err(CandlebookError::Config(format!(
            "CRYPTO_CANDLE_WINDOW must be between 1 and {MAX_WINDOW}, got {candle_window}"
        )));
    }

    let resolution = match non_empty_var("CRYPTO_RESOLUTION") {
        Some(value) => value.parse()?,
        None => Resolution::default(),
    };

    Ok(AppConfig {
        feed: FeedConfig {
            websocket_url,
            candlestick_url,
            instruments,
            reconnect,
        },
        display: DisplayConfig {
            book_depth,
            order_size,
            candle_window,
            resolution,
        },
    })
}

/// Splits a comma separated instrument list, dropping blanks and repeats.
fn parse_instruments(list: &str) -> Result<Vec<String>> {
    let mut instruments: Vec<String> = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if name.contains('.') {
            return Err(CandlebookError::Config(format!(
                "instrument {name:?} must not contain '.'"
            )));
        }
        if !instruments.iter().any(|i| i == name) {
            instruments.push(name.to_string());
        }
    }

    if instruments.is_empty() {
        return Err(CandlebookError::Config(
            "CRYPTO_INSTRUMENTS lists no instruments".to_string(),
        ));
    }
    Ok(instruments)
}

/// Parses an environment variable if it exists and is non-empty.
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    non_empty_var(name)
        .map(|raw| {
            raw.parse().map_err(|e| {
                CandlebookError::Config(format!("{name}={raw:?} is not valid: {e}"))
            })
        })
        .transpose()
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}
