use std::time::Duration;

use candlebook::CandlebookError;
use candlebook::config::fetch_config;
use candlebook::history::HistoryClient;
use candlebook::market::InstrumentBoard;
use candlebook::websocket::{ConnectionHandle, ConnectionManager, Feed};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// How often each board logs its summary line.
const SUMMARY_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), CandlebookError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let app_config = fetch_config()?;
    let feed = Feed::new();
    let history = HistoryClient::new(app_config.feed.candlestick_url.clone())?;

    let (manager, handle) = ConnectionManager::new(
        app_config.feed.websocket_url.clone(),
        feed.clone(),
        app_config.feed.reconnect,
    );
    let manager_task = tokio::spawn(manager.run());
    listen_for_resume(handle.clone());

    let boards: Vec<InstrumentBoard> = app_config
        .feed
        .instruments
        .iter()
        .map(|instrument| {
            InstrumentBoard::new(&feed, &history, instrument, &app_config.display)
        })
        .collect();
    for board in &boards {
        // The seed task logs its own failure.
        let _ = board.chart.seed();
    }
    info!(instruments = boards.len(), "Watching markets");

    let mut summary = tokio::time::interval(SUMMARY_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = summary.tick() => boards.iter().for_each(InstrumentBoard::log_summary),
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    warn!("Failed to listen for ctrl-c: {e}");
                }
                break;
            }
        }
    }

    info!("Shutting down");
    drop(boards);
    handle.shutdown();
    if let Err(e) = manager_task.await {
        warn!("Connection manager task failed: {e}");
    }

    Ok(())
}

/// Forwards SIGUSR1 to the connection manager as a resume request.
#[cfg(unix)]
fn listen_for_resume(handle: ConnectionHandle) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut resume = match signal(SignalKind::user_defined1()) {
        Ok(resume) => resume,
        Err(e) => {
            warn!("Cannot listen for SIGUSR1, resume disabled: {e}");
            return;
        }
    };
    tokio::spawn(async move {
        while resume.recv().await.is_some() {
            info!("Resume requested");
            handle.resume();
        }
    });
}

#[cfg(not(unix))]
fn listen_for_resume(_handle: ConnectionHandle) {}
