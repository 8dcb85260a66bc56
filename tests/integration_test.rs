//! Live API integration tests for the crypto.com Exchange.
//!
//! These tests connect to the real market data stream and REST API and
//! require network access.
//! Run with: `cargo test --features integration-tests`

#![cfg(feature = "integration-tests")]

mod common;

use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::{sleep, timeout};

use candlebook::history::{DEFAULT_CANDLESTICK_URL, HistoryClient};
use candlebook::market::{BookWatcher, CandleChart};
use candlebook::models::Resolution;
use candlebook::websocket::{
    ConnectionManager, ConnectionState, Feed, ReconnectPolicy, connect,
};

use common::MARKET_WS_URL;

const INSTRUMENT: &str = "BTCUSD-PERP";

#[tokio::test]
async fn test_connect_to_market_stream() {
    let result = connect(MARKET_WS_URL).await;
    assert!(result.is_ok(), "Failed to connect to market stream");
}

#[tokio::test]
async fn test_server_sends_heartbeat() {
    let (_write, mut read) = connect(MARKET_WS_URL).await.expect("Failed to connect");

    // The exchange pings idle connections roughly every 30 seconds.
    let received = timeout(Duration::from_secs(45), async {
        while let Some(msg) = read.next().await {
            if let Ok(tungstenite::Message::Text(text)) = msg {
                if text.contains("public/heartbeat") {
                    return true;
                }
            }
        }
        false
    })
    .await
    .expect("Timeout waiting for heartbeat");

    assert!(received, "Did not receive heartbeat");
}

#[tokio::test]
async fn test_book_watcher_receives_snapshot() {
    let feed = Feed::new();
    let book = BookWatcher::new(&feed, INSTRUMENT, 10, 5);
    let (manager, handle) =
        ConnectionManager::new(MARKET_WS_URL.to_string(), feed.clone(), ReconnectPolicy::default());
    let task = tokio::spawn(manager.run());

    let populated = timeout(Duration::from_secs(15), async {
        while book.snapshot().is_empty() {
            sleep(Duration::from_millis(100)).await;
        }
    })
    .await;
    assert!(populated.is_ok(), "Timeout waiting for book snapshot");

    let snapshot = book.snapshot();
    assert!(snapshot.asks.len() <= 5);
    assert!(snapshot.bids.len() <= 5);
    assert_eq!(feed.state(), ConnectionState::Open);

    drop(book);
    handle.shutdown();
    task.await.expect("Connection manager panicked");
    assert_eq!(feed.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_candle_chart_seeds_from_history() {
    let feed = Feed::new();
    let history = HistoryClient::new(DEFAULT_CANDLESTICK_URL).expect("Failed to build client");
    let chart = CandleChart::new(&feed, &history, INSTRUMENT, Resolution::M1, 60);

    let seeded = chart.seed().await.expect("Seed task panicked");

    assert!(seeded, "History was not applied");
    let candles = chart.candles();
    assert!(!candles.is_empty());
    assert!(candles.len() <= 60);
    assert!(candles.windows(2).all(|w| w[0].time < w[1].time));
}
