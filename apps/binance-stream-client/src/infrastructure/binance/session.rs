//! Stream Session
//!
//! One open WebSocket connection, from transport handoff to closure. The
//! session owns both transport halves and is the only task that writes to
//! the socket; the supervisor talks to it exclusively through commands.
//!
//! Every way a session can end is reported to the supervisor as a single
//! [`SessionEvent::Closed`] carrying the reason and whether the supervisor
//! should schedule a reconnect.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::codec::StreamCodec;
use super::heartbeat::Heartbeat;
use super::messages::InboundEnvelope;
use crate::application::ports::{Frame, StreamError, StreamSink, StreamSource};
use crate::domain::subscription::SubscriptionRequest;
use crate::domain::ticker::TickerPayload;
use crate::infrastructure::broadcast::{StreamHub, TickerEvent, TickerUpdate};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one connection generation. Used by the supervisor to discard
/// events from sessions it has already replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate a fresh, process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Supervisor-to-session commands.
#[derive(Debug)]
pub enum SessionCommand {
    /// Deliver a subscription request frame.
    Send(SubscriptionRequest),
    /// Close the connection.
    Close {
        /// Caller-supplied reason, logged and reported.
        reason: String,
        /// Whether the supervisor should reconnect afterwards.
        with_retry: bool,
    },
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// A liveness probe failed delivery; the connection is presumed dead.
    Retrying,
    /// The peer went silent past the heartbeat timeout.
    HeartbeatStalled,
    /// A request frame failed delivery too many times.
    SendRetryExhausted,
    /// The server sent a close frame.
    ServerClosed(String),
    /// The transport errored or ended mid-stream.
    Transport(String),
    /// Closed on explicit caller request.
    Explicit(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retrying => write!(f, "retrying"),
            Self::HeartbeatStalled => write!(f, "heartbeat stalled"),
            Self::SendRetryExhausted => write!(f, "max retry send count reached"),
            Self::ServerClosed(reason) => write!(f, "server closed: {reason}"),
            Self::Transport(reason) => write!(f, "transport: {reason}"),
            Self::Explicit(reason) => write!(f, "{reason}"),
        }
    }
}

/// Session-to-supervisor notifications.
#[derive(Debug)]
pub enum SessionEvent {
    /// The session is live and processing frames.
    Opened {
        /// Reporting session.
        session: SessionId,
    },
    /// A subscription request went out successfully.
    SendCompleted {
        /// Reporting session.
        session: SessionId,
        /// Id of the delivered request.
        request_id: Uuid,
    },
    /// The session ended.
    Closed {
        /// Reporting session.
        session: SessionId,
        /// What ended it.
        reason: CloseReason,
        /// Whether the supervisor should schedule a reconnect.
        retry: bool,
    },
}

/// What one pass of the session select loop resolved to.
enum Tick {
    Cancelled,
    Heartbeat,
    Command(Option<SessionCommand>),
    Frame(Option<Result<Frame, crate::application::ports::TransportError>>),
}

/// A running connection generation.
pub struct Session {
    id: SessionId,
    sink: Box<dyn StreamSink>,
    source: Box<dyn StreamSource>,
    codec: StreamCodec<TickerPayload>,
    heartbeat: Heartbeat,
    hub: Arc<StreamHub>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
    cancel: CancellationToken,
    max_send_retries: u32,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: SessionId,
        sink: Box<dyn StreamSink>,
        source: Box<dyn StreamSource>,
        heartbeat: Heartbeat,
        hub: Arc<StreamHub>,
        commands: mpsc::UnboundedReceiver<SessionCommand>,
        events: mpsc::UnboundedSender<SessionEvent>,
        cancel: CancellationToken,
        max_send_retries: u32,
    ) -> Self {
        Self {
            id,
            sink,
            source,
            codec: StreamCodec::new(),
            heartbeat,
            hub,
            commands,
            events,
            cancel,
            max_send_retries,
        }
    }

    /// Drive the session until closure or cancellation.
    ///
    /// Cancellation is silent: a cancelled session belongs to a supervisor
    /// that has already moved on and wants no closure event from it.
    pub async fn run(mut self) {
        self.notify(SessionEvent::Opened { session: self.id });

        let mut ticker = tokio::time::interval(self.heartbeat.interval());
        // The immediate first tick would probe a socket that just opened.
        ticker.tick().await;

        loop {
            let tick = tokio::select! {
                () = self.cancel.cancelled() => Tick::Cancelled,
                _ = ticker.tick() => Tick::Heartbeat,
                command = self.commands.recv() => Tick::Command(command),
                frame = self.source.next_frame() => Tick::Frame(frame),
            };

            match tick {
                Tick::Cancelled | Tick::Command(None) => {
                    self.sink.close().await;
                    return;
                }
                Tick::Heartbeat => {
                    if self.heartbeat.is_stalled() {
                        self.close_with(CloseReason::HeartbeatStalled, true).await;
                        return;
                    }
                    if let Err(e) = self.sink.send_ping().await {
                        warn!(session = %self.id, error = %e, "liveness probe failed");
                        self.close_with(CloseReason::Retrying, true).await;
                        return;
                    }
                    self.heartbeat.mark_probe_sent();
                }
                Tick::Command(Some(SessionCommand::Send(request))) => {
                    if !self.send_with_retry(request).await {
                        return;
                    }
                }
                Tick::Command(Some(SessionCommand::Close { reason, with_retry })) => {
                    self.close_with(CloseReason::Explicit(reason), with_retry)
                        .await;
                    return;
                }
                Tick::Frame(Some(Ok(frame))) => {
                    if !self.handle_frame(frame).await {
                        return;
                    }
                }
                Tick::Frame(Some(Err(e))) => {
                    self.close_with(CloseReason::Transport(e.to_string()), true)
                        .await;
                    return;
                }
                Tick::Frame(None) => {
                    self.close_with(CloseReason::Transport("stream ended".to_string()), true)
                        .await;
                    return;
                }
            }
        }
    }

    /// Process one inbound frame. Returns `false` when the session ended.
    async fn handle_frame(&mut self, frame: Frame) -> bool {
        match frame {
            Frame::Text(text) => {
                self.heartbeat.record_activity();
                self.dispatch_payload(text.as_bytes());
                true
            }
            Frame::Binary(bytes) => {
                // The feed may deliver the same JSON payloads as binary
                // frames; decode them identically.
                self.heartbeat.record_activity();
                self.dispatch_payload(&bytes);
                true
            }
            Frame::Ping(payload) => {
                self.heartbeat.record_activity();
                if let Err(e) = self.sink.send_pong(payload).await {
                    warn!(session = %self.id, error = %e, "pong reply failed");
                    self.close_with(CloseReason::Retrying, true).await;
                    return false;
                }
                true
            }
            Frame::Pong => {
                self.heartbeat.record_ack();
                true
            }
            Frame::Close(reason) => {
                let reason = reason.unwrap_or_else(|| "no reason given".to_string());
                self.close_with(CloseReason::ServerClosed(reason), true)
                    .await;
                false
            }
            Frame::Unsupported => {
                self.hub.send_ticker(TickerEvent::Error(StreamError::BadFrameKind));
                true
            }
        }
    }

    /// Decode one payload and publish the outcome.
    ///
    /// Decode failures are reported on the event stream and affect only the
    /// failing message; the connection stays up.
    fn dispatch_payload(&self, bytes: &[u8]) {
        match self.codec.decode(bytes) {
            Ok(InboundEnvelope::Data(message)) => {
                self.hub.send_ticker(TickerEvent::Update(TickerUpdate::new(message.data)));
            }
            Ok(InboundEnvelope::Ack(ack)) => {
                debug!(session = %self.id, request_id = %ack.id, "subscription acknowledged");
            }
            Ok(InboundEnvelope::Error(error)) => {
                warn!(session = %self.id, code = error.code, msg = %error.msg, "feed reported an error");
                self.hub.send_ticker(TickerEvent::Error(StreamError::Unknown(format!(
                    "feed error {}: {}",
                    error.code, error.msg
                ))));
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "frame decode failed");
                self.hub
                    .send_ticker(TickerEvent::Error(StreamError::DecodeFailed(e.to_string())));
            }
        }
    }

    /// Deliver a request frame, retrying delivery on the open socket.
    ///
    /// Returns `false` when the retry budget is exhausted and the session
    /// closed itself; the closure carries `retry = false` so the supervisor
    /// does not reconnect on a wedged write path.
    async fn send_with_retry(&mut self, request: SubscriptionRequest) -> bool {
        let frame = match request.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(session = %self.id, error = %e, "request serialization failed");
                self.hub
                    .send_ticker(TickerEvent::Error(StreamError::Unknown(e.to_string())));
                return true;
            }
        };

        for attempt in 1..=self.max_send_retries {
            match self.sink.send_text(frame.clone()).await {
                Ok(()) => {
                    debug!(session = %self.id, request_id = %request.id, attempt, "request delivered");
                    self.notify(SessionEvent::SendCompleted {
                        session: self.id,
                        request_id: request.id,
                    });
                    return true;
                }
                Err(e) => {
                    warn!(session = %self.id, attempt, error = %e, "request delivery failed");
                }
            }
        }

        self.hub
            .send_ticker(TickerEvent::Error(StreamError::SendRetryExhausted));
        self.close_with(CloseReason::SendRetryExhausted, false).await;
        false
    }

    async fn close_with(&mut self, reason: CloseReason, retry: bool) {
        self.sink.close().await;
        self.notify(SessionEvent::Closed {
            session: self.id,
            reason,
            retry,
        });
    }

    fn notify(&self, event: SessionEvent) {
        // A dropped receiver means the supervisor is gone; nothing to do.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique_and_ordered() {
        let a = SessionId::next();
        let b = SessionId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn close_reason_display_is_stable() {
        assert_eq!(CloseReason::Retrying.to_string(), "retrying");
        assert_eq!(
            CloseReason::SendRetryExhausted.to_string(),
            "max retry send count reached"
        );
        assert_eq!(
            CloseReason::Explicit("user logout".to_string()).to_string(),
            "user logout"
        );
    }
}
