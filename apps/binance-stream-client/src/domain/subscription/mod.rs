//! Subscription Request Types and Replay Tracking
//!
//! The client supports one logical stream target at a time, so the manager
//! holds a single slot: the most recent subscribe request issued by a caller.
//! The supervisor reads it after every reconnect to resubscribe
//! automatically. Recording an unsubscribe clears the slot, since there is
//! nothing left to replay.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Wire Request
// =============================================================================

/// Subscribe/unsubscribe verb, upper-cased on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    /// Add channels to the stream.
    Subscribe,
    /// Remove channels from the stream.
    Unsubscribe,
}

impl std::fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subscribe => f.write_str("SUBSCRIBE"),
            Self::Unsubscribe => f.write_str("UNSUBSCRIBE"),
        }
    }
}

/// Outbound subscribe/unsubscribe request.
///
/// # Wire Format (JSON)
/// ```json
/// {"method": "SUBSCRIBE", "params": ["btcusdt@ticker"], "id": "3c3d..."}
/// ```
///
/// Request ids are unique per request and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    /// Request verb.
    pub method: RequestMethod,

    /// Ordered channel names, lower-cased `<symbol>@<stream-type>` tokens.
    pub params: Vec<String>,

    /// Unique request id, echoed back in the acknowledgement.
    pub id: Uuid,
}

impl SubscriptionRequest {
    /// Create a subscribe request for the given channels.
    #[must_use]
    pub fn subscribe(params: Vec<String>) -> Self {
        Self {
            method: RequestMethod::Subscribe,
            params,
            id: Uuid::new_v4(),
        }
    }

    /// Create an unsubscribe request for the given channels.
    #[must_use]
    pub fn unsubscribe(params: Vec<String>) -> Self {
        Self {
            method: RequestMethod::Unsubscribe,
            params,
            id: Uuid::new_v4(),
        }
    }

    /// Serialize the request to its text frame body.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Build the wire channel name for a symbol and stream type.
///
/// Channel names are lower-cased on the wire, e.g. `btcusdt@ticker`.
#[must_use]
pub fn channel_name(symbol: &str, stream_type: &str) -> String {
    format!("{}@{}", symbol.to_lowercase(), stream_type)
}

// =============================================================================
// Replay Slot
// =============================================================================

/// Tracks the last subscribe request for replay after reconnection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    last: RwLock<Option<SubscriptionRequest>>,
}

impl SubscriptionManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the most recently issued request.
    ///
    /// A subscribe replaces the slot; an unsubscribe clears it.
    pub fn record(&self, request: &SubscriptionRequest) {
        let mut slot = self.last.write();
        match request.method {
            RequestMethod::Subscribe => *slot = Some(request.clone()),
            RequestMethod::Unsubscribe => *slot = None,
        }
    }

    /// The request to replay after a reconnect, if any.
    #[must_use]
    pub fn last_request(&self) -> Option<SubscriptionRequest> {
        self.last.read().clone()
    }

    /// Drop any recorded request.
    pub fn clear(&self) {
        *self.last.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("BTCUSDT", "ticker", "btcusdt@ticker"; "upper case symbol")]
    #[test_case("ethusdt", "ticker", "ethusdt@ticker"; "already lower case")]
    #[test_case("AdaUsdt", "trade", "adausdt@trade"; "mixed case")]
    fn channel_names_are_lower_cased(symbol: &str, stream: &str, expected: &str) {
        assert_eq!(channel_name(symbol, stream), expected);
    }

    #[test]
    fn request_ids_are_unique() {
        let a = SubscriptionRequest::subscribe(vec!["btcusdt@ticker".to_string()]);
        let b = SubscriptionRequest::subscribe(vec!["btcusdt@ticker".to_string()]);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn serializes_method_upper_case() {
        let request = SubscriptionRequest::subscribe(vec!["btcusdt@ticker".to_string()]);
        let frame = request.to_frame().unwrap();
        assert!(frame.contains(r#""method":"SUBSCRIBE""#));
        assert!(frame.contains("btcusdt@ticker"));
        assert!(frame.contains(&request.id.to_string()));
    }

    #[test]
    fn manager_starts_empty() {
        let manager = SubscriptionManager::new();
        assert!(manager.last_request().is_none());
    }

    #[test]
    fn subscribe_fills_the_slot() {
        let manager = SubscriptionManager::new();
        let request = SubscriptionRequest::subscribe(vec!["btcusdt@ticker".to_string()]);
        manager.record(&request);
        assert_eq!(manager.last_request(), Some(request));
    }

    #[test]
    fn newer_subscribe_replaces_older() {
        let manager = SubscriptionManager::new();
        let first = SubscriptionRequest::subscribe(vec!["btcusdt@ticker".to_string()]);
        let second = SubscriptionRequest::subscribe(vec!["ethusdt@ticker".to_string()]);
        manager.record(&first);
        manager.record(&second);
        assert_eq!(manager.last_request(), Some(second));
    }

    #[test]
    fn unsubscribe_clears_the_slot() {
        let manager = SubscriptionManager::new();
        manager.record(&SubscriptionRequest::subscribe(vec![
            "btcusdt@ticker".to_string(),
        ]));
        manager.record(&SubscriptionRequest::unsubscribe(vec![
            "btcusdt@ticker".to_string(),
        ]));
        assert!(manager.last_request().is_none());
    }

    #[test]
    fn clear_drops_any_recorded_request() {
        let manager = SubscriptionManager::new();
        manager.record(&SubscriptionRequest::subscribe(vec![
            "btcusdt@ticker".to_string(),
        ]));
        manager.clear();
        assert!(manager.last_request().is_none());
    }
}
