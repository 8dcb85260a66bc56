//! Candlestick chart data for one instrument at one resolution.
//!
//! The chart owns its series behind an `Arc`; live pushes write through the
//! subscription callback and history seeding writes through a [`Seeder`]
//! holding only a `Weak`. Dropping the chart or switching resolution
//! replaces the `Arc`, so a history response that lands afterwards finds
//! nothing to upgrade and is discarded. Switching resolution reseeds the new
//! series on its own.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::history::HistoryClient;
use crate::models::candle::Candlestick;
use crate::models::{ChannelKey, Resolution};
use crate::reducer::CandleSeries;
use crate::websocket::{Feed, Subscription};

#[derive(Debug)]
pub struct CandleChart {
    feed: Feed,
    history: HistoryClient,
    instrument: String,
    resolution: Resolution,
    series: Arc<Mutex<CandleSeries>>,
    subscription: Subscription,
}

impl CandleChart {
    /// Subscribes at `resolution`. The series starts empty until
    /// [`seed`](Self::seed) runs or the first batch arrives.
    pub fn new(
        feed: &Feed,
        history: &HistoryClient,
        instrument: &str,
        resolution: Resolution,
        window: usize,
    ) -> Self {
        let series = Arc::new(Mutex::new(CandleSeries::new(window)));
        let subscription = Self::subscribe(feed, instrument, resolution, &series);

        Self {
            feed: feed.clone(),
            history: history.clone(),
            instrument: instrument.to_string(),
            resolution,
            series,
            subscription,
        }
    }

    fn subscribe(
        feed: &Feed,
        instrument: &str,
        resolution: Resolution,
        series: &Arc<Mutex<CandleSeries>>,
    ) -> Subscription {
        let target = Arc::clone(series);
        let key = ChannelKey::candlestick(resolution, instrument);
        Subscription::new(feed, key, move |data| {
            let applied = target.lock().apply(data);
            trace!(?applied, "Candle push applied");
        })
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn channel(&self) -> &ChannelKey {
        self.subscription.key()
    }

    /// Candles oldest first.
    pub fn candles(&self) -> Vec<Candlestick> {
        self.series.lock().as_slice().to_vec()
    }

    pub fn latest(&self) -> Option<Candlestick> {
        self.series.lock().latest().copied()
    }

    /// Switches to `resolution`: the old channel is released, the series is
    /// discarded and reseeded, and any in-flight seed for the old resolution
    /// is orphaned. Returns the new seed task, or `None` if the resolution
    /// did not change.
    pub fn set_resolution(&mut self, resolution: Resolution) -> Option<JoinHandle<bool>> {
        if resolution == self.resolution {
            return None;
        }
        debug!(
            instrument = self.instrument,
            from = %self.resolution,
            to = %resolution,
            "Switching chart resolution"
        );

        let window = self.series.lock().window();
        let series = Arc::new(Mutex::new(CandleSeries::new(window)));
        self.subscription = Self::subscribe(&self.feed, &self.instrument, resolution, &series);
        self.series = series;
        self.resolution = resolution;
        Some(self.seed())
    }

    /// A weak handle for seeding the current series.
    pub fn seeder(&self) -> Seeder {
        Seeder {
            series: Arc::downgrade(&self.series),
            instrument: self.instrument.clone(),
            resolution: self.resolution,
            count: self.series.lock().window(),
        }
    }

    /// Fetches history in the background and seeds the series with it.
    /// The task resolves to whether the series was replaced.
    pub fn seed(&self) -> JoinHandle<bool> {
        let seeder = self.seeder();
        let history = self.history.clone();
        tokio::spawn(async move { seeder.run(&history).await })
    }
}

/// Seeds one chart series without keeping it alive.
#[derive(Debug, Clone)]
pub struct Seeder {
    series: Weak<Mutex<CandleSeries>>,
    instrument: String,
    resolution: Resolution,
    count: usize,
}

impl Seeder {
    /// Fetches history and applies it. Fetch failures leave the series as is.
    pub async fn run(self, history: &HistoryClient) -> bool {
        match history
            .fetch(&self.instrument, self.resolution, self.count)
            .await
        {
            Ok(candles) => self.apply(candles),
            Err(e) => {
                warn!(
                    instrument = self.instrument,
                    resolution = %self.resolution,
                    "Candle history unavailable, keeping current series: {e}"
                );
                false
            }
        }
    }

    /// Replaces the series with `candles` if the chart still wants them.
    /// An empty batch is treated as no data.
    pub fn apply(&self, candles: Vec<Candlestick>) -> bool {
        if candles.is_empty() {
            debug!(instrument = self.instrument, "No candle history returned");
            return false;
        }
        let Some(series) = self.series.upgrade() else {
            debug!(
                instrument = self.instrument,
                resolution = %self.resolution,
                "Chart gone, discarding late candle history"
            );
            return false;
        };
        series.lock().replace(candles);
        true
    }
}
