//! Reachability Monitoring
//!
//! Periodic host-level reachability probing, published as a broadcast of
//! status transitions. The monitor reports only changes, so subscribers see
//! `Unreachable` once per outage rather than once per probe.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::ports::ReachabilityProbe;

/// Observed reachability of the feed host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReachabilityStatus {
    /// The host accepts connections.
    Reachable,
    /// The host does not accept connections.
    Unreachable,
    /// No probe has completed yet.
    Unknown,
}

/// Monitor cadence and target.
#[derive(Debug, Clone)]
pub struct ReachabilitySettings {
    /// Host to probe.
    pub host: String,
    /// Port to probe.
    pub port: u16,
    /// Interval between probes.
    pub interval: Duration,
    /// Per-probe connect timeout.
    pub timeout: Duration,
}

impl Default for ReachabilitySettings {
    fn default() -> Self {
        Self {
            host: "stream.binance.com".to_string(),
            port: 9443,
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(3),
        }
    }
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodic reachability monitor. Construction does not start probing;
/// callers start and stop it explicitly.
pub struct ReachabilityMonitor {
    settings: ReachabilitySettings,
    probe: Arc<dyn ReachabilityProbe>,
    status_tx: broadcast::Sender<ReachabilityStatus>,
    running: Mutex<Option<Running>>,
}

impl ReachabilityMonitor {
    #[must_use]
    pub fn new(settings: ReachabilitySettings, probe: Arc<dyn ReachabilityProbe>) -> Self {
        let (status_tx, _) = broadcast::channel(16);
        Self {
            settings,
            probe,
            status_tx,
            running: Mutex::new(None),
        }
    }

    /// New receiver for status transitions.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ReachabilityStatus> {
        self.status_tx.subscribe()
    }

    /// Start periodic probing. Calling this while already monitoring is a
    /// no-op; the running probe loop is left untouched.
    pub fn start_monitoring(&self) {
        let mut running = self.running.lock();
        if running.is_some() {
            debug!("reachability monitor already running");
            return;
        }

        info!(host = %self.settings.host, port = self.settings.port, "reachability monitoring started");
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let probe = Arc::clone(&self.probe);
        let settings = self.settings.clone();
        let status_tx = self.status_tx.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(settings.interval);
            let mut last = ReachabilityStatus::Unknown;
            loop {
                tokio::select! {
                    () = task_cancel.cancelled() => return,
                    _ = ticker.tick() => {}
                }
                let status = if probe.check(&settings.host, settings.port).await {
                    ReachabilityStatus::Reachable
                } else {
                    ReachabilityStatus::Unreachable
                };
                if status != last {
                    info!(?last, ?status, "reachability transition");
                    last = status;
                    let _ = status_tx.send(status);
                }
            }
        });

        *running = Some(Running { cancel, handle });
    }

    /// Stop probing. Safe to call when not monitoring.
    pub fn stop_monitoring(&self) {
        if let Some(running) = self.running.lock().take() {
            info!("reachability monitoring stopped");
            running.cancel.cancel();
            running.handle.abort();
        }
    }

    /// Whether a probe loop is currently running.
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.running.lock().is_some()
    }
}

impl Drop for ReachabilityMonitor {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

/// Default probe: a plain TCP connect with a timeout.
#[derive(Debug)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn check(&self, host: &str, port: u16) -> bool {
        let address = format!("{host}:{port}");
        matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect(&address)).await,
            Ok(Ok(_))
        )
    }
}
