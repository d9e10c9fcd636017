//! Port Interfaces
//!
//! Interfaces (ports) for external systems following the Hexagonal
//! Architecture pattern. Infrastructure adapters implement these contracts;
//! tests substitute them with synthetic implementations.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`StreamConnector`] / [`StreamSink`] / [`StreamSource`]: transport
//!   connections to the market-data feed
//! - [`ReachabilityProbe`]: host-level reachability checks
//!
//! ## Driver Ports (Inbound)
//!
//! - [`MarketStream`]: the capability set exposed to downstream consumers

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::infrastructure::binance::endpoint::Endpoint;
use crate::infrastructure::binance::supervisor::ConnectionState;
use crate::infrastructure::broadcast::TickerEvent;

// =============================================================================
// Errors
// =============================================================================

/// Transport-level failure. Never crosses the session boundary: the session
/// converts every variant into a closure notification for the supervisor.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Opening the transport failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// Delivering an outbound frame failed.
    #[error("send failed: {0}")]
    Send(String),

    /// The transport closed or errored mid-stream.
    #[error("transport closed: {0}")]
    Closed(String),
}

/// Client error taxonomy surfaced to consumers.
///
/// All variants are recovered locally: they drive state transitions or are
/// reported per-message on the data stream, never as unhandled failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The transport closed with the given reason.
    #[error("transport closed: {0}")]
    TransportClosed(String),

    /// An inbound frame failed to decode.
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// An inbound frame was of an unsupported kind.
    #[error("bad response")]
    BadFrameKind,

    /// The same request failed delivery too many times.
    #[error("max retry send count reached")]
    SendRetryExhausted,

    /// Consecutive connect attempts exceeded the cap.
    #[error("max retry connect count reached")]
    ConnectRetryExhausted,

    /// Anything else.
    #[error("{0}")]
    Unknown(String),
}

// =============================================================================
// Transport Ports
// =============================================================================

/// One inbound frame, already lifted out of the concrete WebSocket library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
    /// Ping control frame with its payload.
    Ping(Vec<u8>),
    /// Pong control frame.
    Pong,
    /// Close frame with an optional reason.
    Close(Option<String>),
    /// Any frame kind the protocol does not support.
    Unsupported,
}

/// Write half of a transport connection.
#[async_trait]
pub trait StreamSink: Send {
    /// Send a text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Send a liveness probe (ping frame).
    async fn send_ping(&mut self) -> Result<(), TransportError>;

    /// Send a pong answering a server ping.
    async fn send_pong(&mut self, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Tear the connection down. Errors on close are ignored by callers.
    async fn close(&mut self);
}

/// Read half of a transport connection.
#[async_trait]
pub trait StreamSource: Send {
    /// Await the next inbound frame. `None` means the stream ended.
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>>;
}

/// Factory opening transport connections to an endpoint.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    /// Open a connection, returning the split write/read halves.
    async fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> Result<(Box<dyn StreamSink>, Box<dyn StreamSource>), TransportError>;
}

// =============================================================================
// Reachability Port
// =============================================================================

/// Host-level reachability check.
///
/// The probe never errors: an unreachable host is a `false` answer,
/// not a failure.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Whether the host currently accepts connections.
    async fn check(&self, host: &str, port: u16) -> bool;
}

// =============================================================================
// Consumer-Facing Port
// =============================================================================

/// Capability set exposed to downstream view/aggregation code.
#[async_trait]
pub trait MarketStream: Send + Sync {
    /// Subscribe to ticker channels for the given symbols.
    async fn subscribe(&self, symbols: Vec<String>) -> Result<(), StreamError>;

    /// Unsubscribe from ticker channels for the given symbols.
    async fn unsubscribe(&self, symbols: Vec<String>) -> Result<(), StreamError>;

    /// Close the current connection. `with_retry = false` suppresses
    /// supervisor-driven reconnection.
    async fn disconnect(&self, reason: String, with_retry: bool) -> Result<(), StreamError>;

    /// Read-only broadcast stream of decoded ticker events.
    fn ticker_events(&self) -> broadcast::Receiver<TickerEvent>;

    /// Read-only broadcast stream of connection-state transitions.
    fn connection_states(&self) -> broadcast::Receiver<ConnectionState>;
}
