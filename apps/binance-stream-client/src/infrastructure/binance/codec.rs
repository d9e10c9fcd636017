//! Stream Codec
//!
//! Decodes raw frame bytes into [`InboundEnvelope`] values. The payload type
//! is a parameter so the same envelope handling works for any stream shape.
//!
//! A frame that fails to decode is reported as an error for that frame only;
//! the connection stays up and later frames decode independently.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::messages::{DataMessage, InboundEnvelope, ProtocolError, SubscriptionAck};

/// Errors produced while decoding a single inbound frame.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Frame bytes were not valid JSON.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON was well-formed but a field had the wrong shape or was missing.
    #[error("payload field error: {0}")]
    Field(String),
}

/// JSON codec for the combined-stream envelope, generic over the payload.
#[derive(Debug)]
pub struct StreamCodec<T> {
    _payload: PhantomData<fn() -> T>,
}

impl<T> StreamCodec<T> {
    /// Create a codec for payload type `T`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _payload: PhantomData,
        }
    }
}

impl<T> Default for StreamCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> StreamCodec<T> {
    /// Decode one frame's bytes into an envelope.
    ///
    /// Classification is by top-level key: a `result` key means an ack, an
    /// `error` key means a protocol error, anything else is treated as a
    /// data message.
    pub fn decode(&self, bytes: &[u8]) -> Result<InboundEnvelope<T>, CodecError> {
        let value: Value = serde_json::from_slice(bytes)?;

        let Some(object) = value.as_object() else {
            return Err(CodecError::Field(format!(
                "expected a json object, got {value}"
            )));
        };

        if object.contains_key("result") {
            let ack: SubscriptionAck = serde_json::from_value(value.clone())
                .map_err(|err| CodecError::Field(err.to_string()))?;
            return Ok(InboundEnvelope::Ack(ack));
        }

        if let Some(error) = object.get("error") {
            let error: ProtocolError = serde_json::from_value(error.clone())
                .map_err(|err| CodecError::Field(err.to_string()))?;
            return Ok(InboundEnvelope::Error(error));
        }

        let data: DataMessage<T> = serde_json::from_value(value)
            .map_err(|err| CodecError::Field(err.to_string()))?;
        Ok(InboundEnvelope::Data(data))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::domain::ticker::TickerPayload;

    fn codec() -> StreamCodec<TickerPayload> {
        StreamCodec::new()
    }

    #[test]
    fn decodes_subscription_ack() {
        let raw = br#"{"result":null,"id":"5c5d7d52-7d0f-4d4e-a2ba-3bc0a6d2a2ce"}"#;
        let envelope = codec().decode(raw).unwrap();
        let InboundEnvelope::Ack(ack) = envelope else {
            panic!("expected ack");
        };
        assert!(ack.result.is_none());
    }

    #[test]
    fn decodes_protocol_error() {
        let raw = br#"{"error":{"code":2,"msg":"Invalid request: property name must be a valid JSON name"},"id":null}"#;
        let envelope = codec().decode(raw).unwrap();
        let InboundEnvelope::Error(error) = envelope else {
            panic!("expected error");
        };
        assert_eq!(error.code, 2);
        assert!(error.msg.starts_with("Invalid request"));
    }

    #[test]
    fn decodes_ticker_data() {
        let raw = br#"{
            "stream": "btcusdt@ticker",
            "data": {
                "e": "24hrTicker", "E": 1700000000000, "s": "BTCUSDT",
                "p": "250.00", "P": "0.50", "w": "50100.00", "x": "49950.00",
                "c": "50200.00", "Q": "0.001", "b": "50199.00", "B": "2.5",
                "a": "50201.00", "A": "1.2", "o": "49950.00", "h": "50500.00",
                "l": "49800.00", "v": "12345.678", "q": "618000000.00",
                "O": 1699913600000, "C": 1700000000000,
                "F": 100, "L": 200, "n": 101
            }
        }"#;
        let envelope = codec().decode(raw).unwrap();
        let InboundEnvelope::Data(message) = envelope else {
            panic!("expected data");
        };
        assert_eq!(message.stream, "btcusdt@ticker");
        assert_eq!(message.data.symbol, "BTCUSDT");
    }

    #[test]
    fn malformed_json_is_reported_not_panicked() {
        let err = codec().decode(b"{not json").unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }

    #[test]
    fn wrong_shape_is_a_field_error() {
        let err = codec()
            .decode(br#"{"stream":"btcusdt@ticker","data":{"e":"24hrTicker"}}"#)
            .unwrap_err();
        assert!(matches!(err, CodecError::Field(_)));
    }

    #[test]
    fn non_object_payload_is_a_field_error() {
        let err = codec().decode(b"[1,2,3]").unwrap_err();
        assert!(matches!(err, CodecError::Field(_)));
    }

    proptest! {
        #[test]
        fn decode_never_panics_on_arbitrary_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = codec().decode(&bytes);
        }
    }
}
