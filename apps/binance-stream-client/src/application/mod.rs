//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the client facade and the port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for external systems (transport, reachability probe).
pub mod ports;

/// Client facade wiring the supervisor, monitor, and broadcast hub.
pub mod services;
