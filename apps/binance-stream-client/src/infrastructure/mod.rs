//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Binance WebSocket stream adapters (endpoint, codec, session, supervisor).
pub mod binance;

/// Broadcast channel adapters for event distribution.
pub mod broadcast;

/// Configuration loading.
pub mod config;

/// Host reachability monitoring.
pub mod reachability;

/// Tracing and log configuration.
pub mod telemetry;
