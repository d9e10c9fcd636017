//! Binance WebSocket Adapters
//!
//! Implements the resilient client for Binance's combined ticker stream:
//!
//! - **Endpoint / transport**: URL resolution and the TLS WebSocket adapter
//! - **Codec / messages**: combined-stream envelope decoding
//! - **Session**: one connection generation, heartbeat and send retry
//! - **Supervisor**: single-writer lifecycle state machine

pub mod codec;
pub mod endpoint;
pub mod heartbeat;
pub mod messages;
pub mod retry;
pub mod session;
pub mod supervisor;
pub mod transport;

pub use codec::{CodecError, StreamCodec};
pub use endpoint::{Endpoint, PortChoice};
pub use heartbeat::{Heartbeat, HeartbeatConfig};
pub use messages::{DataMessage, InboundEnvelope, ProtocolError, SubscriptionAck};
pub use retry::{ConnectAttempt, RetryConfig, RetryPolicy};
pub use session::{CloseReason, Session, SessionCommand, SessionEvent, SessionId};
pub use supervisor::{ClientCommand, ConnectionState, Supervisor};
pub use transport::WsConnector;
