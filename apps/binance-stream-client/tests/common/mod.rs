//! Shared test doubles for the integration suites.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;

use tokio_util::sync::CancellationToken;

use binance_stream_client::infrastructure::binance::{ClientCommand, Supervisor};
use binance_stream_client::{
    ConnectionState, Endpoint, Frame, ReachabilityProbe, ReachabilityStatus, StreamConnector,
    StreamHub, StreamSink, StreamSource, StreamSettings, TickerEvent, TransportError,
};

/// Generous deadline for broadcast assertions.
pub const RECV_DEADLINE: Duration = Duration::from_secs(2);

/// Scripted outcome for one connect attempt.
#[derive(Debug, Clone, Copy)]
pub enum ConnectOutcome {
    Succeed,
    Fail,
}

/// Connector whose attempts follow a script and whose open connection the
/// test drives by pushing frames.
pub struct FakeConnector {
    outcomes: Mutex<VecDeque<ConnectOutcome>>,
    dialed: Mutex<Vec<u16>>,
    sent: Arc<Mutex<Vec<String>>>,
    send_failures: Arc<AtomicU32>,
    ping_failures: Arc<AtomicBool>,
    inbound: Mutex<Option<mpsc::UnboundedSender<Result<Frame, TransportError>>>>,
}

impl FakeConnector {
    /// Connector where every attempt succeeds.
    pub fn always_ok() -> Arc<Self> {
        Self::with_outcomes(Vec::new())
    }

    /// Connector following the given script; attempts beyond it succeed.
    pub fn with_outcomes(outcomes: Vec<ConnectOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            dialed: Mutex::new(Vec::new()),
            sent: Arc::new(Mutex::new(Vec::new())),
            send_failures: Arc::new(AtomicU32::new(0)),
            ping_failures: Arc::new(AtomicBool::new(false)),
            inbound: Mutex::new(None),
        })
    }

    /// Ports dialed so far, in order.
    pub fn dialed_ports(&self) -> Vec<u16> {
        self.dialed.lock().clone()
    }

    /// Text frames delivered so far, in order.
    pub fn sent_frames(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Make the next `n` text sends fail.
    pub fn fail_sends(&self, n: u32) {
        self.send_failures.store(n, Ordering::SeqCst);
    }

    /// Toggle ping delivery failure.
    pub fn fail_pings(&self, fail: bool) {
        self.ping_failures.store(fail, Ordering::SeqCst);
    }

    /// Push an inbound frame to the currently open connection.
    pub fn push_frame(&self, frame: Frame) {
        let guard = self.inbound.lock();
        let sender = guard.as_ref().expect("no open connection to push to");
        sender.send(Ok(frame)).expect("connection already closed");
    }

    /// Push an inbound transport error to the currently open connection.
    pub fn push_error(&self, error: TransportError) {
        let guard = self.inbound.lock();
        let sender = guard.as_ref().expect("no open connection to push to");
        sender.send(Err(error)).expect("connection already closed");
    }

    /// End the inbound stream of the currently open connection.
    pub fn drop_stream(&self) {
        self.inbound.lock().take();
    }
}

#[async_trait]
impl StreamConnector for FakeConnector {
    async fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> Result<(Box<dyn StreamSink>, Box<dyn StreamSource>), TransportError> {
        self.dialed.lock().push(endpoint.port);

        let outcome = self
            .outcomes
            .lock()
            .pop_front()
            .unwrap_or(ConnectOutcome::Succeed);
        if matches!(outcome, ConnectOutcome::Fail) {
            return Err(TransportError::ConnectFailed("scripted failure".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.inbound.lock() = Some(tx);

        let sink = FakeSink {
            sent: Arc::clone(&self.sent),
            send_failures: Arc::clone(&self.send_failures),
            ping_failures: Arc::clone(&self.ping_failures),
        };
        let source = FakeSource { rx };
        Ok((Box::new(sink), Box::new(source)))
    }
}

struct FakeSink {
    sent: Arc<Mutex<Vec<String>>>,
    send_failures: Arc<AtomicU32>,
    ping_failures: Arc<AtomicBool>,
}

#[async_trait]
impl StreamSink for FakeSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        let remaining = self.send_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.send_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(TransportError::Send("scripted send failure".to_string()));
        }
        self.sent.lock().push(text);
        Ok(())
    }

    async fn send_ping(&mut self) -> Result<(), TransportError> {
        if self.ping_failures.load(Ordering::SeqCst) {
            return Err(TransportError::Send("scripted ping failure".to_string()));
        }
        Ok(())
    }

    async fn send_pong(&mut self, _payload: Vec<u8>) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close(&mut self) {}
}

struct FakeSource {
    rx: mpsc::UnboundedReceiver<Result<Frame, TransportError>>,
}

#[async_trait]
impl StreamSource for FakeSource {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        self.rx.recv().await
    }
}

/// Probe answering from a shared flag.
pub struct FakeProbe {
    pub reachable: Arc<AtomicBool>,
}

impl FakeProbe {
    pub fn new(reachable: bool) -> (Arc<Self>, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(reachable));
        let probe = Arc::new(Self {
            reachable: Arc::clone(&flag),
        });
        (probe, flag)
    }
}

#[async_trait]
impl ReachabilityProbe for FakeProbe {
    async fn check(&self, _host: &str, _port: u16) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

/// Stream settings tuned for fast tests: millisecond retry delays, no
/// jitter, heartbeat far in the future.
pub fn fast_settings() -> StreamSettings {
    StreamSettings {
        retry_delay: Duration::from_millis(1),
        retry_jitter: 0.0,
        heartbeat_interval: Duration::from_secs(600),
        heartbeat_timeout: Duration::from_secs(1200),
        ..StreamSettings::default()
    }
}

/// A supervisor running against fakes, with every channel the tests need.
pub struct SupervisorHarness {
    pub commands: mpsc::UnboundedSender<ClientCommand>,
    pub reachability: broadcast::Sender<ReachabilityStatus>,
    pub states: broadcast::Receiver<ConnectionState>,
    pub tickers: broadcast::Receiver<TickerEvent>,
    pub cancel: CancellationToken,
}

impl Drop for SupervisorHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawn a supervisor over the given connector. It starts connecting
/// immediately.
pub fn spawn_supervisor(
    settings: StreamSettings,
    connector: Arc<FakeConnector>,
) -> SupervisorHarness {
    let hub = StreamHub::new(256);
    let states = hub.state_receiver();
    let tickers = hub.ticker_receiver();
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (reachability_tx, reachability_rx) = broadcast::channel(16);
    let cancel = CancellationToken::new();

    let supervisor = Supervisor::new(
        settings,
        connector,
        hub,
        commands_rx,
        reachability_rx,
        cancel.clone(),
    );
    tokio::spawn(supervisor.run());

    SupervisorHarness {
        commands: commands_tx,
        reachability: reachability_tx,
        states,
        tickers,
        cancel,
    }
}

/// Poll a condition until it holds or the deadline passes.
pub async fn wait_until(description: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + RECV_DEADLINE;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time: {description}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Receive the next state transition within the deadline.
pub async fn next_state(rx: &mut broadcast::Receiver<ConnectionState>) -> ConnectionState {
    timeout(RECV_DEADLINE, rx.recv())
        .await
        .expect("timed out waiting for a state transition")
        .expect("state channel closed")
}

/// Receive state transitions until the expected one arrives.
pub async fn wait_for_state(
    rx: &mut broadcast::Receiver<ConnectionState>,
    expected: ConnectionState,
) {
    loop {
        if next_state(rx).await == expected {
            return;
        }
    }
}

/// Receive the next ticker event within the deadline.
pub async fn next_ticker(rx: &mut broadcast::Receiver<TickerEvent>) -> TickerEvent {
    timeout(RECV_DEADLINE, rx.recv())
        .await
        .expect("timed out waiting for a ticker event")
        .expect("ticker channel closed")
}

/// A complete combined-stream ticker message for the given symbol.
pub fn ticker_json(symbol: &str) -> String {
    let lower = symbol.to_lowercase();
    format!(
        r#"{{"stream":"{lower}@ticker","data":{{
            "e":"24hrTicker","E":1700000000000,"s":"{symbol}",
            "p":"250.00","P":"0.50","w":"50100.00","x":"49950.00",
            "c":"50200.00","Q":"0.001","b":"50199.00","B":"2.5",
            "a":"50201.00","A":"1.2","o":"49950.00","h":"50500.00",
            "l":"49800.00","v":"12345.678","q":"618000000.00",
            "O":1699913600000,"C":1700000000000,
            "F":100,"L":200,"n":101
        }}}}"#
    )
}
