//! Ticker Payload Types
//!
//! Wire format types for the Binance 24h rolling-window ticker stream.
//! Field keys are the single-letter tags used on the wire (`s` = symbol,
//! `c` = last price, ...). Prices and quantities arrive as decimal strings
//! and decode into [`rust_decimal::Decimal`]; timestamps arrive as epoch
//! milliseconds.
//!
//! A `TickerPayload` is an immutable value: a newer one for the same symbol
//! supersedes the prior one, it is never merged.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One symbol's rolling 24h market snapshot.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "e": "24hrTicker",
///   "E": 1672515782136,
///   "s": "BTCUSDT",
///   "p": "-94.99999800",
///   "P": "-0.189",
///   "c": "50000.00",
///   ...
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerPayload {
    /// Event type (always "24hrTicker")
    #[serde(rename = "e")]
    pub event_type: String,

    /// Event time (epoch millis)
    #[serde(rename = "E")]
    pub event_time: i64,

    /// Ticker symbol as sent by the feed (upper-case, e.g. "BTCUSDT")
    #[serde(rename = "s")]
    pub symbol: String,

    /// Absolute price change over the window
    #[serde(rename = "p")]
    pub price_change: Decimal,

    /// Relative price change in percent
    #[serde(rename = "P")]
    pub price_change_percent: Decimal,

    /// Volume-weighted average price
    #[serde(rename = "w")]
    pub weighted_avg_price: Decimal,

    /// First trade price before the window
    #[serde(rename = "x", default)]
    pub first_trade_price: Option<Decimal>,

    /// Last traded price
    #[serde(rename = "c")]
    pub last_price: Decimal,

    /// Last traded quantity
    #[serde(rename = "Q")]
    pub last_quantity: Decimal,

    /// Best bid price
    #[serde(rename = "b", default)]
    pub best_bid_price: Option<Decimal>,

    /// Best bid quantity
    #[serde(rename = "B", default)]
    pub best_bid_quantity: Option<Decimal>,

    /// Best ask price
    #[serde(rename = "a", default)]
    pub best_ask_price: Option<Decimal>,

    /// Best ask quantity
    #[serde(rename = "A", default)]
    pub best_ask_quantity: Option<Decimal>,

    /// Open price
    #[serde(rename = "o")]
    pub open_price: Decimal,

    /// High price
    #[serde(rename = "h")]
    pub high_price: Decimal,

    /// Low price
    #[serde(rename = "l")]
    pub low_price: Decimal,

    /// Total traded base asset volume
    #[serde(rename = "v")]
    pub base_volume: Decimal,

    /// Total traded quote asset volume
    #[serde(rename = "q")]
    pub quote_volume: Decimal,

    /// Statistics window open time (epoch millis)
    #[serde(rename = "O")]
    pub open_time: i64,

    /// Statistics window close time (epoch millis)
    #[serde(rename = "C")]
    pub close_time: i64,

    /// First trade id in the window
    #[serde(rename = "F")]
    pub first_trade_id: i64,

    /// Last trade id in the window
    #[serde(rename = "L")]
    pub last_trade_id: i64,

    /// Total number of trades in the window
    #[serde(rename = "n")]
    pub trade_count: i64,
}

impl TickerPayload {
    /// Event timestamp as a UTC datetime, if the epoch value is representable.
    #[must_use]
    pub fn event_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.event_time)
    }

    /// Window open timestamp as a UTC datetime.
    #[must_use]
    pub fn open_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.open_time)
    }

    /// Window close timestamp as a UTC datetime.
    #[must_use]
    pub fn close_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.close_time)
    }

    /// Symbol key used by downstream snapshot maps (upper-cased).
    #[must_use]
    pub fn display_symbol(&self) -> String {
        self.symbol.to_uppercase()
    }
}
