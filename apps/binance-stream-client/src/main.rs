//! Binance Stream Client Binary
//!
//! Starts the resilient ticker stream client and logs decoded updates.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin binance-stream-client
//! ```
//!
//! # Environment Variables
//!
//! All optional:
//! - `BINANCE_SYMBOLS`: Comma-separated symbols (default: BTCUSDT)
//! - `BINANCE_STREAM_HOST`: Feed host (default: stream.binance.com)
//! - `BINANCE_STREAM_PRIMARY_PORT`: Preferred port (default: 9443)
//! - `BINANCE_STREAM_SECONDARY_PORT`: Fallback port (default: 443)
//! - `BINANCE_STREAM_TIME_UNIT`: MILLISECOND | MICROSECOND (default: MILLISECOND)
//! - `BINANCE_STREAM_HEARTBEAT_INTERVAL_SECS`: Ping interval (default: 15)
//! - `BINANCE_STREAM_MAX_SEND_RETRIES`: Send attempts per request (default: 100)
//! - `BINANCE_STREAM_MAX_CONNECT_ATTEMPTS`: Connect attempts per window (default: 10)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use binance_stream_client::infrastructure::telemetry;
use binance_stream_client::{
    ClientConfig, ConnectionState, MarketDataClient, MarketStream, TcpProbe, TickerEvent,
    WsConnector,
};
use tokio::signal;
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();
    telemetry::init();

    tracing::info!("Starting Binance stream client");

    let config = ClientConfig::from_env();
    log_config(&config);

    let symbols = config.symbols.clone();
    let probe_timeout = config.reachability.timeout;
    let client = MarketDataClient::spawn(
        config,
        Arc::new(WsConnector::new()),
        Arc::new(TcpProbe::new(probe_timeout)),
    );

    let ticker_rx = client.ticker_events();
    let state_rx = client.connection_states();
    tokio::spawn(log_ticker_events(ticker_rx));
    tokio::spawn(log_connection_states(state_rx));

    client.subscribe(symbols).await?;

    tracing::info!("Stream client ready");

    await_shutdown().await;

    client
        .disconnect("shutdown".to_string(), false)
        .await
        .ok();
    client.shutdown();

    // Give in-flight closure a moment before the runtime drops.
    tokio::time::sleep(Duration::from_millis(200)).await;
    tracing::info!("Stream client stopped");
    Ok(())
}

/// Log decoded ticker events as they arrive.
async fn log_ticker_events(mut rx: broadcast::Receiver<TickerEvent>) {
    loop {
        match rx.recv().await {
            Ok(TickerEvent::Update(update)) => {
                tracing::info!(
                    symbol = %update.symbol,
                    last_price = %update.payload.last_price,
                    price_change_percent = %update.payload.price_change_percent,
                    "ticker update"
                );
            }
            Ok(TickerEvent::Error(e)) => {
                tracing::warn!(error = %e, "stream error");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "ticker consumer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Log connection-state transitions.
async fn log_connection_states(mut rx: broadcast::Receiver<ConnectionState>) {
    loop {
        match rx.recv().await {
            Ok(state) => tracing::info!(%state, "connection state"),
            Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &ClientConfig) {
    tracing::info!(
        host = %config.stream.host,
        primary_port = config.stream.primary_port,
        secondary_port = config.stream.secondary_port,
        time_unit = config.stream.time_unit.as_str(),
        symbols = ?config.symbols,
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
