//! Stream Endpoint
//!
//! Resolved connection target for the combined ticker stream. The feed
//! accepts connections on a primary port and a secondary fallback port; the
//! supervisor's retry policy decides which one an attempt uses.

use crate::infrastructure::config::{StreamSettings, TimeUnit};

/// Which of the two valid feed ports to dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortChoice {
    /// Preferred port, used for early connect attempts.
    Primary,
    /// Fallback port, used after repeated failures.
    Secondary,
}

/// Immutable {scheme, host, port, path} tuple used to open a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Feed host name.
    pub host: String,
    /// Resolved port.
    pub port: u16,
    /// URL path, e.g. `/stream`.
    pub path: String,
    /// Streams pre-selected on the connection URL (may be empty).
    pub streams: Vec<String>,
    /// Timestamp precision requested from the feed.
    pub time_unit: TimeUnit,
}

impl Endpoint {
    /// Resolve an endpoint from settings and a port choice.
    #[must_use]
    pub fn resolve(settings: &StreamSettings, choice: PortChoice) -> Self {
        let port = match choice {
            PortChoice::Primary => settings.primary_port,
            PortChoice::Secondary => settings.secondary_port,
        };
        Self {
            host: settings.host.clone(),
            port,
            path: settings.path.clone(),
            streams: settings.initial_streams.clone(),
            time_unit: settings.time_unit,
        }
    }

    /// Full secure-WebSocket URL for this endpoint.
    #[must_use]
    pub fn url(&self) -> String {
        let mut url = format!("wss://{}:{}{}", self.host, self.port, self.path);
        let mut separator = '?';
        if !self.streams.is_empty() {
            url.push(separator);
            url.push_str("streams=");
            url.push_str(&self.streams.join("/"));
            separator = '&';
        }
        url.push(separator);
        url.push_str("timeUnit=");
        url.push_str(self.time_unit.as_str());
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> StreamSettings {
        StreamSettings::default()
    }

    #[test]
    fn primary_and_secondary_ports() {
        let primary = Endpoint::resolve(&settings(), PortChoice::Primary);
        let secondary = Endpoint::resolve(&settings(), PortChoice::Secondary);
        assert_eq!(primary.port, 9443);
        assert_eq!(secondary.port, 443);
        assert_eq!(primary.host, secondary.host);
    }

    #[test]
    fn url_without_streams() {
        let endpoint = Endpoint::resolve(&settings(), PortChoice::Primary);
        assert_eq!(
            endpoint.url(),
            "wss://stream.binance.com:9443/stream?timeUnit=MILLISECOND"
        );
    }

    #[test]
    fn url_with_preselected_streams() {
        let mut cfg = settings();
        cfg.initial_streams = vec!["btcusdt@ticker".to_string(), "ethusdt@ticker".to_string()];
        let endpoint = Endpoint::resolve(&cfg, PortChoice::Secondary);
        assert_eq!(
            endpoint.url(),
            "wss://stream.binance.com:443/stream?streams=btcusdt@ticker/ethusdt@ticker&timeUnit=MILLISECOND"
        );
    }
}
