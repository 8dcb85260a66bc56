//! Candlestick channel models.
//!
//! The same `{t, o, h, l, c, v}` object shape is used by the
//! `candlestick.<resolution>.<instrument>` channel and by the REST history
//! endpoint. Values arrive as numbers or numeric strings depending on the
//! source, so they are kept as raw JSON and coerced into [`Candlestick`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A candlestick exactly as delivered on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct CandleData {
    /// Start of the candle's time bucket, epoch milliseconds.
    #[serde(default)]
    pub t: Option<Value>,
    #[serde(default)]
    pub o: Option<Value>,
    #[serde(default)]
    pub h: Option<Value>,
    #[serde(default)]
    pub l: Option<Value>,
    #[serde(default)]
    pub c: Option<Value>,
    #[serde(default)]
    pub v: Option<Value>,
}

/// A single OHLCV bar in canonical numeric form.
///
/// Price and volume fields may be `NaN` when the feed delivered something
/// non-numeric; the candle is kept rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candlestick {
    /// Bucket start, epoch milliseconds. Unique within a series.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candlestick {
    /// Coerces a wire candle into canonical form.
    ///
    /// Returns `None` when `t` is not a finite number, since such a candle
    /// cannot be placed in a time-ordered series.
    pub fn from_raw(raw: &CandleData) -> Option<Self> {
        let time = coerce_number(raw.t.as_ref());
        if !time.is_finite() {
            return None;
        }

        Some(Self {
            time: time as i64,
            open: coerce_number(raw.o.as_ref()),
            high: coerce_number(raw.h.as_ref()),
            low: coerce_number(raw.l.as_ref()),
            close: coerce_number(raw.c.as_ref()),
            volume: coerce_number(raw.v.as_ref()),
        })
    }
}

/// Converts a JSON value to a number the way a loose numeric cast does:
/// numbers pass through, strings are parsed after trimming (an empty string
/// is zero), booleans are one or zero, null is zero, and everything else,
/// including a missing value, is `NaN`.
pub fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Null) => 0.0,
        Some(Value::Array(_) | Value::Object(_)) | None => f64::NAN,
    }
}

/// Decodes a channel or REST payload array into candlesticks, preserving
/// order. Entries that are not objects or carry no usable `t` are skipped.
pub fn decode_candles(data: &[Value]) -> Vec<Candlestick> {
    data.iter()
        .filter_map(|value| {
            let candle = CandleData::deserialize(value)
                .ok()
                .and_then(|raw| Candlestick::from_raw(&raw));
            if candle.is_none() {
                warn!(entry = %value, "Dropping candle without a usable timestamp");
            }
            candle
        })
        .collect()
}
