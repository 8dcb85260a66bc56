//! Candlestick history REST client.
//!
//! Used once per chart to seed the series before live updates take over.
//! Failures are returned, never panicked on; callers keep whatever state they
//! had and do not retry.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::models::Resolution;
use crate::models::candle::{Candlestick, decode_candles};
use crate::{CandlebookError, Result};

/// Default public candlestick endpoint.
pub const DEFAULT_CANDLESTICK_URL: &str =
    "https://api.crypto.com/exchange/v1/public/get-candlestick";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches historical candles from the exchange's REST API.
#[derive(Debug, Clone)]
pub struct HistoryClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HistoryClient {
    /// # Errors
    ///
    /// Returns [`CandlebookError::Http`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Fetches up to `count` candles for `instrument`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`CandlebookError::Http`] on transport or status failures and
    /// [`CandlebookError::MalformedMessage`] if the body has no
    /// `result.data` array.
    pub async fn fetch(
        &self,
        instrument: &str,
        resolution: Resolution,
        count: usize,
    ) -> Result<Vec<Candlestick>> {
        let count = count.to_string();
        debug!(instrument, %resolution, count = %count, "Fetching candle history");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("instrument_name", instrument),
                ("timeframe", resolution.as_str()),
                ("count", count.as_str()),
            ])
            .send()
            .await?;

        let response = response.error_for_status()?;
        let body: Value = response.json().await?;
        let candles = parse_history(&body)?;

        info!(
            instrument,
            %resolution,
            candles = candles.len(),
            "Fetched candle history"
        );
        Ok(candles)
    }
}

/// Extracts `result.data` from a history response, sorted by time.
pub(crate) fn parse_history(body: &Value) -> Result<Vec<Candlestick>> {
    let data = body
        .get("result")
        .and_then(|r| r.get("data"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            CandlebookError::MalformedMessage(format!(
                "candlestick response without result.data: {body}"
            ))
        })?;

    let mut candles = decode_candles(data);
    candles.sort_by_key(|c| c.time);
    Ok(candles)
}
