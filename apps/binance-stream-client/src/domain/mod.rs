//! Domain Layer - Core streaming types and business logic.
//!
//! This layer contains the core domain types for ticker streaming
//! with no networking dependencies. All types here are pure Rust with
//! serialization support.

/// Ticker payload types (24h rolling-window market snapshots).
pub mod ticker;

/// Subscription request types and replay tracking.
pub mod subscription;
