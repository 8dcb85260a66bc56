//! Shared test utilities and fixtures.

#![allow(dead_code)]

use std::sync::Arc;

use candlebook::Result;
use candlebook::history::HistoryClient;
use candlebook::websocket::{ConnectionId, Feed, Transport};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// crypto.com Exchange public market data endpoint.
pub const MARKET_WS_URL: &str = "wss://stream.crypto.com/exchange/v1/market";

pub const BOOK_JSON: &str = include_str!("../fixtures/book.json");
pub const CANDLE_BATCH_JSON: &str = include_str!("../fixtures/candlestick_batch.json");
pub const CANDLE_UPDATE_JSON: &str = include_str!("../fixtures/candlestick_update.json");
pub const HEARTBEAT_JSON: &str = include_str!("../fixtures/heartbeat.json");
pub const TRADE_JSON: &str = include_str!("../fixtures/trade.json");
pub const HISTORY_JSON: &str = include_str!("../fixtures/history.json");

/// Transport that records every outbound frame.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<String>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every frame sent so far, parsed as JSON.
    pub fn frames(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .map(|s| serde_json::from_str(s).expect("sent frame is not JSON"))
            .collect()
    }

    /// `(method, channels)` for every subscribe or unsubscribe sent.
    pub fn channel_requests(&self) -> Vec<(String, Vec<String>)> {
        self.frames()
            .into_iter()
            .filter_map(|frame| {
                let method = frame["method"].as_str()?.to_string();
                let channels = frame["params"]["channels"]
                    .as_array()?
                    .iter()
                    .filter_map(|c| c.as_str().map(str::to_string))
                    .collect();
                Some((method, channels))
            })
            .collect()
    }

    /// How many `method` requests named `channel`.
    pub fn count(&self, method: &str, channel: &str) -> usize {
        self.channel_requests()
            .iter()
            .filter(|(m, channels)| m == method && channels.iter().any(|c| c == channel))
            .count()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl Transport for RecordingTransport {
    fn send_text(&mut self, text: String) -> Result<()> {
        self.sent.lock().push(text);
        Ok(())
    }
}

/// Opens `feed` on a fresh connection backed by a recording transport.
pub fn open_feed(feed: &Feed) -> (ConnectionId, RecordingTransport) {
    let transport = RecordingTransport::new();
    let id = feed.begin_connect();
    feed.on_open(id, transport.clone());
    (id, transport)
}

/// History client whose every fetch fails without touching the network.
pub fn offline_history() -> HistoryClient {
    HistoryClient::new("not a url").expect("Failed to build history client")
}

/// Local HTTP endpoint answering every request with a fixed JSON body.
pub struct HistoryServer {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl HistoryServer {
    /// Serves `body` on an ephemeral port until the runtime shuts down.
    pub async fn start(body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind history server");
        let addr = listener.local_addr().expect("listener has an address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let seen = Arc::clone(&seen);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let mut len = 0;
                    while len < buf.len() {
                        match stream.read(&mut buf[len..]).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => len += n,
                        }
                        if buf[..len].windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                    let head = String::from_utf8_lossy(&buf[..len]);
                    if let Some(line) = head.lines().next() {
                        seen.lock().push(line.to_string());
                    }

                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                         content-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Self {
            url: format!("http://{addr}/exchange/v1/public/get-candlestick"),
            requests,
        }
    }

    pub fn client(&self) -> HistoryClient {
        HistoryClient::new(self.url.clone()).expect("Failed to build history client")
    }

    /// Request lines received so far, e.g. `GET /...?timeframe=5m... HTTP/1.1`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// How many requests asked for `timeframe`.
    pub fn count_timeframe(&self, timeframe: &str) -> usize {
        let needle = format!("timeframe={timeframe}&");
        self.requests()
            .iter()
            .filter(|line| line.contains(&needle))
            .count()
    }
}
