//! Application Services
//!
//! Wires the supervisor, reachability monitor, and broadcast hub into the
//! consumer-facing [`MarketStream`] capability set.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::ports::{
    MarketStream, ReachabilityProbe, StreamConnector, StreamError,
};
use crate::domain::subscription::channel_name;
use crate::infrastructure::binance::supervisor::{ClientCommand, ConnectionState, Supervisor};
use crate::infrastructure::broadcast::{StreamHub, TickerEvent};
use crate::infrastructure::config::ClientConfig;
use crate::infrastructure::reachability::ReachabilityMonitor;

/// Stream type appended to each subscribed symbol.
const TICKER_STREAM: &str = "ticker";

/// Running market-data client: a supervisor task, a reachability monitor,
/// and the broadcast hub their output fans out through.
pub struct MarketDataClient {
    commands: mpsc::UnboundedSender<ClientCommand>,
    hub: Arc<StreamHub>,
    monitor: Arc<ReachabilityMonitor>,
    cancel: CancellationToken,
}

impl MarketDataClient {
    /// Start the client. Spawns the supervisor task, starts reachability
    /// monitoring, and begins connecting immediately.
    #[must_use]
    pub fn spawn(
        config: ClientConfig,
        connector: Arc<dyn StreamConnector>,
        probe: Arc<dyn ReachabilityProbe>,
    ) -> Self {
        let hub = StreamHub::new(config.channels.capacity);
        let monitor = Arc::new(ReachabilityMonitor::new(config.reachability, probe));
        monitor.start_monitoring();

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let supervisor = Supervisor::new(
            config.stream,
            connector,
            Arc::clone(&hub),
            commands_rx,
            monitor.subscribe(),
            cancel.clone(),
        );
        tokio::spawn(supervisor.run());

        Self {
            commands: commands_tx,
            hub,
            monitor,
            cancel,
        }
    }

    /// Request a connection, opening a fresh retry window.
    pub fn connect(&self) -> Result<(), StreamError> {
        self.send_command(ClientCommand::Connect)
    }

    /// Stop the supervisor and the reachability monitor.
    pub fn shutdown(&self) {
        info!("market data client shutting down");
        self.cancel.cancel();
        self.monitor.stop_monitoring();
    }

    fn send_command(&self, command: ClientCommand) -> Result<(), StreamError> {
        self.commands
            .send(command)
            .map_err(|_| StreamError::Unknown("client stopped".to_string()))
    }
}

#[async_trait]
impl MarketStream for MarketDataClient {
    async fn subscribe(&self, symbols: Vec<String>) -> Result<(), StreamError> {
        let channels = symbols
            .iter()
            .map(|s| channel_name(s, TICKER_STREAM))
            .collect();
        self.send_command(ClientCommand::Subscribe(channels))
    }

    async fn unsubscribe(&self, symbols: Vec<String>) -> Result<(), StreamError> {
        let channels = symbols
            .iter()
            .map(|s| channel_name(s, TICKER_STREAM))
            .collect();
        self.send_command(ClientCommand::Unsubscribe(channels))
    }

    async fn disconnect(&self, reason: String, with_retry: bool) -> Result<(), StreamError> {
        self.send_command(ClientCommand::Disconnect { reason, with_retry })
    }

    fn ticker_events(&self) -> broadcast::Receiver<TickerEvent> {
        self.hub.ticker_receiver()
    }

    fn connection_states(&self) -> broadcast::Receiver<ConnectionState> {
        self.hub.state_receiver()
    }
}

impl Drop for MarketDataClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
