//! Connection Supervisor
//!
//! Single-writer owner of the connection lifecycle. All state transitions
//! happen on this task: caller commands, session notifications, and
//! reachability transitions are funneled into one event loop, so no lock
//! guards the state machine.
//!
//! Sessions are identified by generation. Whenever the supervisor replaces a
//! session it cancels the old one and records the new id; notifications from
//! any other id are stale and discarded.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::endpoint::Endpoint;
use super::heartbeat::{Heartbeat, HeartbeatConfig};
use super::retry::{RetryConfig, RetryPolicy};
use super::session::{
    CloseReason, Session, SessionCommand, SessionEvent, SessionId,
};
use crate::application::ports::{StreamConnector, StreamError};
use crate::domain::subscription::{SubscriptionManager, SubscriptionRequest};
use crate::infrastructure::broadcast::{StreamHub, TickerEvent};
use crate::infrastructure::config::StreamSettings;
use crate::infrastructure::reachability::ReachabilityStatus;

/// Connection lifecycle states, published on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and none being opened.
    Closed,
    /// A connect attempt is in flight.
    Connecting,
    /// Connection open and idle.
    Connected,
    /// Connection open with a request delivery in progress.
    SendingMessage,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::SendingMessage => write!(f, "sending_message"),
        }
    }
}

/// Caller-facing commands accepted by the supervisor.
#[derive(Debug)]
pub enum ClientCommand {
    /// Open a connection, starting a fresh retry window.
    Connect,
    /// Subscribe to ticker channels for the given symbols.
    Subscribe(Vec<String>),
    /// Unsubscribe from ticker channels for the given symbols.
    Unsubscribe(Vec<String>),
    /// Close the current connection.
    Disconnect {
        /// Reason recorded in the closure notification.
        reason: String,
        /// Whether the supervisor may reconnect afterwards.
        with_retry: bool,
    },
}

/// What one pass of the supervisor select loop resolved to.
enum Flow {
    Shutdown,
    Command(Option<ClientCommand>),
    Session(Option<SessionEvent>),
    Reachability(Result<ReachabilityStatus, broadcast::error::RecvError>),
}

struct ActiveSession {
    id: SessionId,
    commands: mpsc::UnboundedSender<SessionCommand>,
    cancel: CancellationToken,
}

/// The supervisor task.
pub struct Supervisor {
    settings: StreamSettings,
    connector: Arc<dyn StreamConnector>,
    hub: Arc<StreamHub>,
    subscriptions: SubscriptionManager,
    policy: RetryPolicy,
    state: ConnectionState,
    active: Option<ActiveSession>,
    commands: mpsc::UnboundedReceiver<ClientCommand>,
    session_events_tx: mpsc::UnboundedSender<SessionEvent>,
    session_events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    reachability: broadcast::Receiver<ReachabilityStatus>,
    reachability_open: bool,
    last_reachability: ReachabilityStatus,
    cancel: CancellationToken,
}

impl Supervisor {
    #[must_use]
    pub fn new(
        settings: StreamSettings,
        connector: Arc<dyn StreamConnector>,
        hub: Arc<StreamHub>,
        commands: mpsc::UnboundedReceiver<ClientCommand>,
        reachability: broadcast::Receiver<ReachabilityStatus>,
        cancel: CancellationToken,
    ) -> Self {
        let policy = RetryPolicy::new(RetryConfig {
            primary_attempts: settings.primary_port_attempts,
            max_attempts: settings.max_connect_attempts,
            delay: settings.retry_delay,
            jitter: settings.retry_jitter,
        });
        let (session_events_tx, session_events_rx) = mpsc::unbounded_channel();
        Self {
            settings,
            connector,
            hub,
            subscriptions: SubscriptionManager::new(),
            policy,
            state: ConnectionState::Closed,
            active: None,
            commands,
            session_events_tx,
            session_events_rx,
            reachability,
            reachability_open: true,
            last_reachability: ReachabilityStatus::Unknown,
            cancel,
        }
    }

    /// Drive the supervisor until shutdown.
    pub async fn run(mut self) {
        info!("connection supervisor started");
        self.connect();

        loop {
            let flow = tokio::select! {
                () = self.cancel.cancelled() => Flow::Shutdown,
                command = self.commands.recv() => Flow::Command(command),
                event = self.session_events_rx.recv() => Flow::Session(event),
                status = self.reachability.recv(), if self.reachability_open => {
                    Flow::Reachability(status)
                }
            };

            match flow {
                Flow::Shutdown | Flow::Command(None) => {
                    self.teardown_session();
                    info!("connection supervisor stopped");
                    return;
                }
                Flow::Command(Some(command)) => self.handle_command(command),
                Flow::Session(Some(event)) => self.handle_session_event(event),
                // The supervisor holds a sender clone, so this arm never
                // yields None while it is alive.
                Flow::Session(None) => {}
                Flow::Reachability(Ok(status)) => self.handle_reachability(status),
                Flow::Reachability(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    warn!(skipped, "reachability receiver lagged");
                }
                Flow::Reachability(Err(broadcast::error::RecvError::Closed)) => {
                    self.reachability_open = false;
                }
            }
        }
    }

    fn handle_command(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::Connect => {
                // An explicit connect always opens a fresh retry window.
                self.policy.reset();
                if self.active.is_none() {
                    self.connect();
                }
            }
            ClientCommand::Subscribe(channels) => {
                let request = SubscriptionRequest::subscribe(channels);
                self.subscriptions.record(&request);
                if self.active.is_none() {
                    // The recorded request replays once a connection opens.
                    self.connect();
                } else if self.state != ConnectionState::Connecting {
                    self.dispatch_send(request);
                }
            }
            ClientCommand::Unsubscribe(channels) => {
                let request = SubscriptionRequest::unsubscribe(channels);
                self.subscriptions.record(&request);
                if self.active.is_some() && self.state != ConnectionState::Connecting {
                    self.dispatch_send(request);
                }
            }
            ClientCommand::Disconnect { reason, with_retry } => {
                if let Some(active) = &self.active {
                    let _ = active.commands.send(SessionCommand::Close { reason, with_retry });
                } else {
                    self.set_state(ConnectionState::Closed);
                }
            }
        }
    }

    fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Opened { session } => {
                if !self.is_current(session) || self.state != ConnectionState::Connecting {
                    debug!(%session, "discarding stale open notification");
                    return;
                }
                info!(%session, "connection open");
                self.set_state(ConnectionState::Connected);
                if let Some(request) = self.subscriptions.last_request() {
                    self.dispatch_send(request);
                }
            }
            SessionEvent::SendCompleted { session, request_id } => {
                if !self.is_current(session) {
                    debug!(%session, "discarding stale send notification");
                    return;
                }
                debug!(%session, %request_id, "request delivered");
                // A successful delivery proves the connection healthy.
                self.policy.reset();
                self.set_state(ConnectionState::Connected);
            }
            SessionEvent::Closed { session, reason, retry } => {
                if !self.is_current(session) {
                    debug!(%session, %reason, "discarding stale closure");
                    return;
                }
                info!(%session, %reason, retry, "connection closed");
                self.active = None;
                self.set_state(ConnectionState::Closed);
                if retry && self.last_reachability != ReachabilityStatus::Unreachable {
                    self.connect();
                }
            }
        }
    }

    fn handle_reachability(&mut self, status: ReachabilityStatus) {
        if status == self.last_reachability {
            return;
        }
        info!(?status, "reachability changed");
        self.last_reachability = status;
        match status {
            ReachabilityStatus::Reachable => {
                // Recovery opens a fresh retry window even if the previous
                // one was exhausted.
                self.policy.reset();
                if self.active.is_none() {
                    self.connect();
                }
            }
            ReachabilityStatus::Unreachable => {
                self.teardown_session();
                self.set_state(ConnectionState::Closed);
            }
            ReachabilityStatus::Unknown => {}
        }
    }

    /// Schedule the next connect attempt, or settle closed when the retry
    /// window is spent.
    fn connect(&mut self) {
        let Some(attempt) = self.policy.next_attempt() else {
            warn!("connect retry window exhausted, settling closed");
            self.hub
                .send_ticker(TickerEvent::Error(StreamError::ConnectRetryExhausted));
            self.set_state(ConnectionState::Closed);
            return;
        };

        let endpoint = Endpoint::resolve(&self.settings, attempt.port);
        info!(
            attempt = attempt.attempt,
            port = endpoint.port,
            delay_ms = attempt.delay.as_millis() as u64,
            "scheduling connect attempt"
        );
        self.set_state(ConnectionState::Connecting);

        let id = SessionId::next();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let cancel = self.cancel.child_token();
        self.active = Some(ActiveSession {
            id,
            commands: commands_tx,
            cancel: cancel.clone(),
        });

        let connector = Arc::clone(&self.connector);
        let hub = Arc::clone(&self.hub);
        let events = self.session_events_tx.clone();
        let heartbeat = HeartbeatConfig {
            interval: self.settings.heartbeat_interval,
            timeout: self.settings.heartbeat_timeout,
        };
        let max_send_retries = self.settings.max_send_retries;
        let delay = attempt.delay;

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(delay) => {}
                }
            }

            let connected = tokio::select! {
                () = cancel.cancelled() => return,
                result = connector.connect(&endpoint) => result,
            };

            match connected {
                Ok((sink, source)) => {
                    Session::new(
                        id,
                        sink,
                        source,
                        Heartbeat::new(heartbeat),
                        hub,
                        commands_rx,
                        events,
                        cancel,
                        max_send_retries,
                    )
                    .run()
                    .await;
                }
                Err(e) => {
                    warn!(session = %id, error = %e, "connect attempt failed");
                    let _ = events.send(SessionEvent::Closed {
                        session: id,
                        reason: CloseReason::Transport(e.to_string()),
                        retry: true,
                    });
                }
            }
        });
    }

    fn dispatch_send(&mut self, request: SubscriptionRequest) {
        let Some(commands) = self.active.as_ref().map(|a| a.commands.clone()) else {
            return;
        };
        self.set_state(ConnectionState::SendingMessage);
        if commands.send(SessionCommand::Send(request)).is_err() {
            // The session just ended; its closure notification is already
            // queued and will drive the reconnect.
            debug!("send dispatched to a closing session");
        }
    }

    fn teardown_session(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(session = %active.id, "tearing down session");
            active.cancel.cancel();
        }
    }

    fn is_current(&self, session: SessionId) -> bool {
        self.active.as_ref().is_some_and(|a| a.id == session)
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        debug!(from = %self.state, to = %state, "connection state transition");
        self.state = state;
        self.hub.send_state(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_state_display_is_stable() {
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
        assert_eq!(ConnectionState::SendingMessage.to_string(), "sending_message");
    }
}
