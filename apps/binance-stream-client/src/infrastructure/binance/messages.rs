//! Inbound Wire Messages
//!
//! Envelope shapes the combined-stream feed sends back: subscription acks,
//! protocol errors, and stream-wrapped data payloads.

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

/// Acknowledgement of a subscribe/unsubscribe request.
///
/// The feed replies `{"result": null, "id": <uuid>}` once the request has
/// been applied. `result` is non-null only for query-style requests.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionAck {
    /// Result payload, `null` for plain subscribe/unsubscribe acks.
    pub result: Option<Value>,
    /// Identifier echoed from the originating request.
    pub id: Uuid,
}

/// Protocol-level error reported by the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable description.
    pub msg: String,
}

/// A data message wrapped in the combined-stream envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct DataMessage<T> {
    /// Stream name the payload arrived on, e.g. `btcusdt@ticker`.
    pub stream: String,
    /// Decoded payload.
    pub data: T,
}

/// Everything a single inbound frame can decode to.
#[derive(Debug, Clone)]
pub enum InboundEnvelope<T> {
    /// Subscription request acknowledgement.
    Ack(SubscriptionAck),
    /// Stream data payload.
    Data(DataMessage<T>),
    /// Feed-reported protocol error.
    Error(ProtocolError),
}
