//! Market views built on the shared [`Feed`].
//!
//! Each view subscribes on construction and unsubscribes when dropped.

pub mod book;
pub mod chart;
pub mod price;

use tracing::info;

use crate::config::DisplayConfig;
use crate::history::HistoryClient;
use crate::models::Resolution;
use crate::websocket::Feed;

pub use book::BookWatcher;
pub use chart::{CandleChart, Seeder};
pub use price::PriceWatcher;

/// Every view kept for one instrument.
#[derive(Debug)]
pub struct InstrumentBoard {
    pub instrument: String,
    pub book: BookWatcher,
    pub chart: CandleChart,
    pub price: PriceWatcher,
}

impl InstrumentBoard {
    pub fn new(
        feed: &Feed,
        history: &HistoryClient,
        instrument: &str,
        display: &DisplayConfig,
    ) -> Self {
        Self {
            instrument: instrument.to_string(),
            book: BookWatcher::new(feed, instrument, display.book_depth, display.order_size),
            chart: CandleChart::new(
                feed,
                history,
                instrument,
                display.resolution,
                display.candle_window,
            ),
            price: PriceWatcher::from_candles(feed, instrument, Resolution::M1),
        }
    }

    /// Logs one line with the state of every view.
    pub fn log_summary(&self) {
        let book = self.book.snapshot();
        let last = self.price.last();
        let latest = self.chart.latest();

        info!(
            instrument = self.instrument,
            best_bid = ?book.best_bid().map(|l| l.price),
            best_ask = ?book.best_ask().map(|l| l.price),
            spread = ?book.spread(),
            resolution = %self.chart.resolution(),
            candles = self.chart.candles().len(),
            close = ?latest.map(|c| c.close),
            price = ?last.current(),
            direction = ?last.direction(),
            "Market summary"
        );
    }
}
