//! Client Configuration Settings
//!
//! Configuration types for the stream client, loaded from environment
//! variables. Every setting has a working default; the client runs with no
//! environment at all.

use std::time::Duration;

pub use crate::infrastructure::reachability::ReachabilitySettings;

/// Timestamp precision requested from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    /// Millisecond timestamps.
    #[default]
    Millisecond,
    /// Microsecond timestamps.
    Microsecond,
}

impl TimeUnit {
    /// Parse a time unit from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "MICROSECOND" => Self::Microsecond,
            _ => Self::Millisecond,
        }
    }

    /// Get the value used in stream URLs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Millisecond => "MILLISECOND",
            Self::Microsecond => "MICROSECOND",
        }
    }
}

/// Stream connection settings.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Feed host name.
    pub host: String,
    /// Preferred connection port.
    pub primary_port: u16,
    /// Fallback connection port.
    pub secondary_port: u16,
    /// URL path of the combined stream endpoint.
    pub path: String,
    /// Streams pre-selected on the connection URL.
    pub initial_streams: Vec<String>,
    /// Timestamp precision requested from the feed.
    pub time_unit: TimeUnit,
    /// Heartbeat ping interval.
    pub heartbeat_interval: Duration,
    /// Heartbeat timeout before considering the connection dead.
    pub heartbeat_timeout: Duration,
    /// Delivery attempts per request frame before giving up.
    pub max_send_retries: u32,
    /// Connect attempts dialed on the primary port before falling back.
    pub primary_port_attempts: u32,
    /// Total connect attempts before reconnection stops.
    pub max_connect_attempts: u32,
    /// Base delay between connect attempts.
    pub retry_delay: Duration,
    /// Jitter fraction applied to the retry delay.
    pub retry_jitter: f64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            host: "stream.binance.com".to_string(),
            primary_port: 9443,
            secondary_port: 443,
            path: "/stream".to_string(),
            initial_streams: Vec::new(),
            time_unit: TimeUnit::Millisecond,
            heartbeat_interval: Duration::from_secs(15),
            heartbeat_timeout: Duration::from_secs(30),
            max_send_retries: 100,
            primary_port_attempts: 5,
            max_connect_attempts: 10,
            retry_delay: Duration::from_millis(500),
            retry_jitter: 0.1,
        }
    }
}

/// Broadcast channel settings.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// Per-stream broadcast buffer capacity.
    pub capacity: usize,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self { capacity: 10_000 }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Symbols subscribed on startup.
    pub symbols: Vec<String>,
    /// Stream connection settings.
    pub stream: StreamSettings,
    /// Reachability monitor settings.
    pub reachability: ReachabilitySettings,
    /// Broadcast channel settings.
    pub channels: ChannelSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            symbols: vec![
                "BTCUSDT".to_string(),
                "ETHUSDT".to_string(),
                "ADAUSDT".to_string(),
            ],
            stream: StreamSettings::default(),
            reachability: ReachabilitySettings::default(),
            channels: ChannelSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let stream = StreamSettings {
            host: parse_env_string("BINANCE_STREAM_HOST", &defaults.stream.host),
            primary_port: parse_env_u16("BINANCE_STREAM_PRIMARY_PORT", defaults.stream.primary_port),
            secondary_port: parse_env_u16(
                "BINANCE_STREAM_SECONDARY_PORT",
                defaults.stream.secondary_port,
            ),
            path: parse_env_string("BINANCE_STREAM_PATH", &defaults.stream.path),
            initial_streams: parse_env_list("BINANCE_STREAM_INITIAL_STREAMS"),
            time_unit: std::env::var("BINANCE_STREAM_TIME_UNIT")
                .map(|s| TimeUnit::from_str_case_insensitive(&s))
                .unwrap_or_default(),
            heartbeat_interval: parse_env_duration_secs(
                "BINANCE_STREAM_HEARTBEAT_INTERVAL_SECS",
                defaults.stream.heartbeat_interval,
            ),
            heartbeat_timeout: parse_env_duration_secs(
                "BINANCE_STREAM_HEARTBEAT_TIMEOUT_SECS",
                defaults.stream.heartbeat_timeout,
            ),
            max_send_retries: parse_env_u32(
                "BINANCE_STREAM_MAX_SEND_RETRIES",
                defaults.stream.max_send_retries,
            ),
            primary_port_attempts: parse_env_u32(
                "BINANCE_STREAM_PRIMARY_PORT_ATTEMPTS",
                defaults.stream.primary_port_attempts,
            ),
            max_connect_attempts: parse_env_u32(
                "BINANCE_STREAM_MAX_CONNECT_ATTEMPTS",
                defaults.stream.max_connect_attempts,
            ),
            retry_delay: parse_env_duration_millis(
                "BINANCE_STREAM_RETRY_DELAY_MS",
                defaults.stream.retry_delay,
            ),
            retry_jitter: parse_env_f64("BINANCE_STREAM_RETRY_JITTER", defaults.stream.retry_jitter),
        };

        let reachability = ReachabilitySettings {
            host: parse_env_string("BINANCE_REACHABILITY_HOST", &stream.host),
            port: parse_env_u16("BINANCE_REACHABILITY_PORT", stream.primary_port),
            interval: parse_env_duration_secs(
                "BINANCE_REACHABILITY_INTERVAL_SECS",
                defaults.reachability.interval,
            ),
            timeout: parse_env_duration_secs(
                "BINANCE_REACHABILITY_TIMEOUT_SECS",
                defaults.reachability.timeout,
            ),
        };

        let channels = ChannelSettings {
            capacity: parse_env_usize("BINANCE_CHANNEL_CAPACITY", defaults.channels.capacity),
        };

        let symbols = {
            let list = parse_env_list("BINANCE_SYMBOLS");
            if list.is_empty() { defaults.symbols } else { list }
        };

        Self {
            symbols,
            stream,
            reachability,
            channels,
        }
    }
}

fn parse_env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .ok()
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_unit_parsing() {
        assert_eq!(
            TimeUnit::from_str_case_insensitive("microsecond"),
            TimeUnit::Microsecond
        );
        assert_eq!(
            TimeUnit::from_str_case_insensitive("MILLISECOND"),
            TimeUnit::Millisecond
        );
        assert_eq!(
            TimeUnit::from_str_case_insensitive("anything"),
            TimeUnit::Millisecond
        );
    }

    #[test]
    fn defaults_match_the_feed_contract() {
        let config = ClientConfig::default();
        assert_eq!(config.stream.host, "stream.binance.com");
        assert_eq!(config.stream.primary_port, 9443);
        assert_eq!(config.stream.secondary_port, 443);
        assert_eq!(config.stream.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(config.stream.max_send_retries, 100);
        assert_eq!(config.stream.primary_port_attempts, 5);
        assert_eq!(config.stream.max_connect_attempts, 10);
    }
}
