//! Shared models for the crypto.com Exchange v1 market data stream.
//!
//! Contains channel definitions, subscription request/response types,
//! and the heartbeat protocol messages.

pub mod book;
pub mod candle;
pub mod trade;

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CandlebookError;

/// Method name of subscribe requests and of every channel push.
pub const SUBSCRIBE_METHOD: &str = "subscribe";

/// Method name of unsubscribe requests.
pub const UNSUBSCRIBE_METHOD: &str = "unsubscribe";

/// Method name of the server's keepalive check.
pub const HEARTBEAT_METHOD: &str = "public/heartbeat";

/// Method name the client must answer a heartbeat with.
pub const RESPOND_HEARTBEAT_METHOD: &str = "public/respond-heartbeat";

/// Public market data channel families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelFamily {
    Book,
    /// OHLCV candlesticks (wire name: `"candlestick"`).
    Candlestick,
    Trade,
    Ticker,
}

impl ChannelFamily {
    /// Returns the wire-format family name used as the channel key prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelFamily::Book => "book",
            ChannelFamily::Candlestick => "candlestick",
            ChannelFamily::Trade => "trade",
            ChannelFamily::Ticker => "ticker",
        }
    }
}

/// Candlestick time resolutions offered by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Resolution {
    #[default]
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Resolution {
    /// Every resolution, shortest first.
    pub const ALL: [Resolution; 7] = [
        Resolution::M1,
        Resolution::M5,
        Resolution::M15,
        Resolution::M30,
        Resolution::H1,
        Resolution::H4,
        Resolution::D1,
    ];

    /// Returns the wire-format timeframe (`"1m"`, `"4h"`, `"1D"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::M1 => "1m",
            Resolution::M5 => "5m",
            Resolution::M15 => "15m",
            Resolution::M30 => "30m",
            Resolution::H1 => "1h",
            Resolution::H4 => "4h",
            Resolution::D1 => "1D",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = CandlebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resolution::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| CandlebookError::InvalidResolution(s.to_string()))
    }
}

/// The exact string identifying one subscribable stream, e.g.
/// `book.BTCUSD-PERP.10` or `candlestick.1m.BTCUSD-PERP`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey(String);

impl ChannelKey {
    /// `book.<instrument>.<depth>`
    pub fn book(instrument: &str, depth: u16) -> Self {
        Self(format!("{}.{instrument}.{depth}", ChannelFamily::Book.as_str()))
    }

    /// `candlestick.<resolution>.<instrument>`
    pub fn candlestick(resolution: Resolution, instrument: &str) -> Self {
        Self(format!(
            "{}.{resolution}.{instrument}",
            ChannelFamily::Candlestick.as_str()
        ))
    }

    /// `trade.<instrument>`
    pub fn trade(instrument: &str) -> Self {
        Self(format!("{}.{instrument}", ChannelFamily::Trade.as_str()))
    }

    /// `ticker.<instrument>`
    pub fn ticker(instrument: &str) -> Self {
        Self(format!("{}.{instrument}", ChannelFamily::Ticker.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a push reporting `channel` may be delivered to this key.
    ///
    /// The exchange reports a bare family name (`"candlestick"`) while the key
    /// carries resolution and instrument, so this is a prefix test. It is
    /// permissive: a family sharing a prefix with another would also match.
    pub fn accepts(&self, channel: &str) -> bool {
        !channel.is_empty() && self.0.starts_with(channel)
    }
}

impl Borrow<str> for ChannelKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `subscribe` request sent to the market data stream.
#[derive(Debug, Serialize)]
pub struct SubscribeRequest {
    pub method: String,
    pub params: Params,
}

impl SubscribeRequest {
    pub fn new(channels: &[ChannelKey]) -> Self {
        Self {
            method: SUBSCRIBE_METHOD.to_string(),
            params: Params::new(channels),
        }
    }
}

/// An `unsubscribe` request sent to the market data stream.
#[derive(Debug, Serialize)]
pub struct UnsubscribeRequest {
    pub method: String,
    pub params: Params,
}

impl UnsubscribeRequest {
    pub fn new(channels: &[ChannelKey]) -> Self {
        Self {
            method: UNSUBSCRIBE_METHOD.to_string(),
            params: Params::new(channels),
        }
    }
}

/// Channel list used in subscribe/unsubscribe requests.
#[derive(Debug, Serialize)]
pub struct Params {
    pub channels: Vec<String>,
}

impl Params {
    fn new(channels: &[ChannelKey]) -> Self {
        Self {
            channels: channels.iter().map(|c| c.as_str().to_string()).collect(),
        }
    }
}

/// Reply to a server heartbeat; must echo the heartbeat's `id`.
#[derive(Debug, Serialize)]
pub struct HeartbeatReply {
    pub id: Value,
    pub method: String,
}

impl HeartbeatReply {
    pub fn new(id: Value) -> Self {
        Self {
            id,
            method: RESPOND_HEARTBEAT_METHOD.to_string(),
        }
    }
}

/// Envelope shared by every inbound frame.
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    /// Non-zero on error responses.
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

/// The `result` body of a channel push.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionResult {
    /// Family name as reported by the exchange (`"book"`, `"candlestick"`).
    pub channel: String,
    /// The full key the push belongs to.
    pub subscription: String,
    #[serde(default)]
    pub instrument_name: Option<String>,
    /// Family-specific payload objects.
    pub data: Vec<Value>,
}
