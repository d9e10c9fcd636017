//! Event Broadcasting
//!
//! Fan-out hub for decoded ticker events and connection-state transitions.
//! Consumers subscribe through [`StreamHub`] receivers; a slow or absent
//! consumer never blocks the session loop.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use crate::application::ports::StreamError;
use crate::domain::ticker::TickerPayload;
use crate::infrastructure::binance::supervisor::ConnectionState;

/// One decoded ticker update, keyed by its uppercase symbol.
#[derive(Debug, Clone)]
pub struct TickerUpdate {
    /// Uppercase trading symbol, e.g. `BTCUSDT`.
    pub symbol: String,
    /// Full decoded payload.
    pub payload: TickerPayload,
}

impl TickerUpdate {
    #[must_use]
    pub fn new(payload: TickerPayload) -> Self {
        Self {
            symbol: payload.display_symbol(),
            payload,
        }
    }
}

/// Everything the data stream can carry: updates, or per-message errors that
/// left the connection up.
#[derive(Debug, Clone)]
pub enum TickerEvent {
    /// A decoded ticker update.
    Update(TickerUpdate),
    /// A message-scoped error (decode failure, feed-reported error).
    Error(StreamError),
}

/// Broadcast hub shared by the supervisor, sessions, and consumers.
#[derive(Debug)]
pub struct StreamHub {
    tickers_tx: broadcast::Sender<TickerEvent>,
    states_tx: broadcast::Sender<ConnectionState>,
}

impl StreamHub {
    /// Create a hub with the given per-stream buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Arc<Self> {
        let (tickers_tx, _) = broadcast::channel(capacity);
        let (states_tx, _) = broadcast::channel(capacity);
        Arc::new(Self {
            tickers_tx,
            states_tx,
        })
    }

    /// Publish a ticker event. A zero-receiver send is not an error.
    pub fn send_ticker(&self, event: TickerEvent) {
        let delivered = self.tickers_tx.send(event).unwrap_or(0);
        trace!(delivered, "ticker event published");
    }

    /// Publish a connection-state transition.
    pub fn send_state(&self, state: ConnectionState) {
        let delivered = self.states_tx.send(state).unwrap_or(0);
        trace!(delivered, ?state, "connection state published");
    }

    /// New receiver for ticker events.
    #[must_use]
    pub fn ticker_receiver(&self) -> broadcast::Receiver<TickerEvent> {
        self.tickers_tx.subscribe()
    }

    /// New receiver for connection-state transitions.
    #[must_use]
    pub fn state_receiver(&self) -> broadcast::Receiver<ConnectionState> {
        self.states_tx.subscribe()
    }

    /// Number of live ticker consumers.
    #[must_use]
    pub fn ticker_receiver_count(&self) -> usize {
        self.tickers_tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn events_reach_subscribers() {
        let hub = StreamHub::new(16);
        let mut rx = hub.ticker_receiver();
        hub.send_ticker(TickerEvent::Error(StreamError::BadFrameKind));
        let event = assert_ok!(rx.recv().await);
        assert!(matches!(event, TickerEvent::Error(StreamError::BadFrameKind)));
    }

    #[tokio::test]
    async fn send_without_subscribers_is_harmless() {
        let hub = StreamHub::new(16);
        hub.send_state(ConnectionState::Closed);
        assert_eq!(hub.ticker_receiver_count(), 0);
    }

    #[tokio::test]
    async fn state_transitions_fan_out_to_all_receivers() {
        let hub = StreamHub::new(16);
        let mut a = hub.state_receiver();
        let mut b = hub.state_receiver();
        hub.send_state(ConnectionState::Connecting);
        assert_eq!(a.recv().await.unwrap(), ConnectionState::Connecting);
        assert_eq!(b.recv().await.unwrap(), ConnectionState::Connecting);
    }
}
