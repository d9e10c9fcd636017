#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Binance Stream Client - Resilient Market Data Streaming
//!
//! A WebSocket client for Binance's combined ticker stream that keeps
//! itself connected: port-fallback reconnection, heartbeat liveness
//! probing, host reachability monitoring, and automatic subscription
//! replay after every reconnect.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core wire and data types
//!   - `ticker`: 24h rolling-window ticker payload
//!   - `subscription`: Subscribe/unsubscribe requests and replay tracking
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interfaces for transport, reachability, and consumers
//!   - `services`: The assembled market-data client
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `binance`: Endpoint, codec, session, and supervisor
//!   - `reachability`: Periodic host probing
//!   - `broadcast`: Channel-based event distribution
//!   - `config`: Configuration loading
//!
//! # Data Flow
//!
//! ```text
//! Binance WS ──► Session ──► Supervisor ──► Broadcast ──► Consumer 1
//!                  ▲             │           Channels ──► Consumer N
//!                  └── commands ─┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core wire and data types with no external systems.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::subscription::{
    RequestMethod, SubscriptionManager, SubscriptionRequest, channel_name,
};
pub use domain::ticker::TickerPayload;

// Application ports and services
pub use application::ports::{
    Frame, MarketStream, ReachabilityProbe, StreamConnector, StreamError, StreamSink,
    StreamSource, TransportError,
};
pub use application::services::MarketDataClient;

// Infrastructure config
pub use infrastructure::config::{ChannelSettings, ClientConfig, StreamSettings, TimeUnit};

// Connection lifecycle (for integration tests)
pub use infrastructure::binance::{
    CloseReason, ConnectionState, Endpoint, PortChoice, RetryConfig, RetryPolicy, WsConnector,
};

// Broadcast hub (for integration tests)
pub use infrastructure::broadcast::{StreamHub, TickerEvent, TickerUpdate};

// Reachability
pub use infrastructure::reachability::{
    ReachabilityMonitor, ReachabilitySettings, ReachabilityStatus, TcpProbe,
};
