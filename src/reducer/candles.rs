//! Rolling candlestick window.
//!
//! A [`CandleSeries`] is always strictly increasing in `time` and never
//! longer than its window. Multi-candle payloads reseed it; single-candle
//! payloads upsert the in-progress bucket.

use serde_json::Value;
use tracing::debug;

use crate::models::candle::{Candlestick, decode_candles};

/// Window used for chart display.
pub const DEFAULT_WINDOW: usize = 60;

/// Largest window any consumer may ask for.
pub const MAX_WINDOW: usize = 300;

/// What a payload did to the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The series was replaced by a batch; holds the resulting length.
    Reseeded(usize),
    /// A single candle was inserted or replaced.
    Upserted,
    /// Nothing usable in the payload.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct CandleSeries {
    candles: Vec<Candlestick>,
    window: usize,
}

impl CandleSeries {
    /// Creates an empty series holding at most `window` candles (minimum 1).
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            candles: Vec::with_capacity(window),
            window,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Candles oldest first.
    pub fn as_slice(&self) -> &[Candlestick] {
        &self.candles
    }

    pub fn latest(&self) -> Option<&Candlestick> {
        self.candles.last()
    }

    /// Folds a raw channel payload into the series.
    ///
    /// The payload length decides the case: more than one entry is a full
    /// reseed, exactly one is a live update of a single bucket.
    pub fn apply(&mut self, data: &[Value]) -> Applied {
        let is_batch = data.len() > 1;
        let candles = decode_candles(data);

        match (is_batch, candles.as_slice()) {
            (_, []) => Applied::Ignored,
            (true, _) => Applied::Reseeded(self.replace(candles)),
            (false, [candle]) => {
                self.upsert(*candle);
                Applied::Upserted
            }
            (false, _) => Applied::Ignored,
        }
    }

    /// Replaces the whole series with `candles`.
    ///
    /// Input order does not matter; candles sharing a time collapse to the
    /// last one given. Returns the resulting length.
    pub fn replace(&mut self, candles: impl IntoIterator<Item = Candlestick>) -> usize {
        let mut sorted: Vec<Candlestick> = candles.into_iter().collect();
        sorted.sort_by_key(|c| c.time);

        self.candles.clear();
        for candle in sorted {
            match self.candles.last_mut() {
                Some(last) if last.time == candle.time => *last = candle,
                _ => self.candles.push(candle),
            }
        }
        self.trim();

        debug!(len = self.candles.len(), "Candle series reseeded");
        self.candles.len()
    }

    /// Inserts `candle`, replacing any candle with the same time.
    pub fn upsert(&mut self, candle: Candlestick) {
        self.candles.retain(|c| c.time != candle.time);
        let at = self.candles.partition_point(|c| c.time < candle.time);
        self.candles.insert(at, candle);
        self.trim();
    }

    /// Drops the oldest candles beyond the window.
    fn trim(&mut self) {
        if self.candles.len() > self.window {
            let excess = self.candles.len() - self.window;
            self.candles.drain(..excess);
        }
    }
}

impl Default for CandleSeries {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn candle(time: i64, close: f64) -> Candlestick {
        Candlestick {
            time,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    fn assert_invariants(series: &CandleSeries) {
        assert!(series.len() <= series.window());
        assert!(
            series.as_slice().windows(2).all(|w| w[0].time < w[1].time),
            "series not strictly increasing: {:?}",
            series.as_slice()
        );
    }

    #[test]
    fn reseed_sorts_and_keeps_last_window() {
        let mut series = CandleSeries::new(3);
        let len = series.replace([5, 1, 4, 2, 3].map(|t| candle(t, t as f64)));

        assert_eq!(len, 3);
        let times: Vec<_> = series.as_slice().iter().map(|c| c.time).collect();
        assert_eq!(times, vec![3, 4, 5]);
        assert_invariants(&series);
    }

    #[test]
    fn reseed_collapses_duplicate_times() {
        let mut series = CandleSeries::new(10);
        series.replace([candle(1, 1.0), candle(2, 2.0), candle(2, 9.0)]);

        assert_eq!(series.len(), 2);
        assert_eq!(series.latest().map(|c| c.close), Some(9.0));
        assert_invariants(&series);
    }

    #[test]
    fn upsert_replaces_same_bucket() {
        let mut series = CandleSeries::new(10);
        series.replace([candle(1, 1.0), candle(2, 2.0)]);

        series.upsert(candle(2, 5.0));
        series.upsert(candle(2, 5.0));

        assert_eq!(series.len(), 2);
        assert_eq!(series.latest(), Some(&candle(2, 5.0)));
        assert_invariants(&series);
    }

    #[test]
    fn upsert_out_of_order_lands_in_place() {
        let mut series = CandleSeries::new(10);
        series.replace([candle(10, 1.0), candle(30, 3.0)]);

        series.upsert(candle(20, 2.0));

        let times: Vec<_> = series.as_slice().iter().map(|c| c.time).collect();
        assert_eq!(times, vec![10, 20, 30]);
    }

    #[test]
    fn upsert_at_capacity_drops_oldest() {
        let mut series = CandleSeries::new(2);
        series.replace([candle(1, 1.0), candle(2, 2.0)]);

        series.upsert(candle(3, 3.0));

        let times: Vec<_> = series.as_slice().iter().map(|c| c.time).collect();
        assert_eq!(times, vec![2, 3]);
    }

    #[test]
    fn apply_dispatches_on_payload_length() {
        let mut series = CandleSeries::new(60);

        let batch = [
            json!({"t": 1000, "o": 10, "h": 12, "l": 9, "c": 11, "v": 5}),
            json!({"t": 2000, "o": 11, "h": 13, "l": 10, "c": 12, "v": 7}),
        ];
        assert_eq!(series.apply(&batch), Applied::Reseeded(2));

        let single = [json!({"t": 3000, "o": 12, "h": 12, "l": 12, "c": 12, "v": 1})];
        assert_eq!(series.apply(&single), Applied::Upserted);
        assert_eq!(series.len(), 3);

        assert_eq!(series.apply(&[]), Applied::Ignored);
        assert_eq!(series.len(), 3);
        assert_invariants(&series);
    }

    #[test]
    fn window_is_at_least_one() {
        let mut series = CandleSeries::new(0);
        series.upsert(candle(1, 1.0));
        series.upsert(candle(2, 2.0));

        assert_eq!(series.window(), 1);
        assert_eq!(series.as_slice(), &[candle(2, 2.0)]);
    }
}
