// Copyright (c) James Kassemi, SC, US. All rights reserved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A (channel, symbols) subscription filter.
///
/// The serialized field names (`channel`, `symbols`) are the ones the data
/// service accepts, and the serialization doubles as the filter's cache
/// identity, so both list order and symbol order are significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(rename = "channel")]
    pub name: String,
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl Channel {
    pub fn new<N, S>(name: N, symbols: S) -> Self
    where
        N: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            name: name.into(),
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// Subscribe to every symbol the venue publishes on this channel.
    pub fn all_symbols<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            symbols: Vec::new(),
        }
    }
}

/// One replayed message: the instant the upstream observer received it,
/// plus the venue payload left as opaque JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayRecord {
    pub local_timestamp: DateTime<Utc>,
    pub message: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_serializes_with_service_field_names() {
        let channel = Channel::new("trade", ["XBTUSD", "ETHUSD"]);
        let json = serde_json::to_string(&channel).unwrap();
        assert_eq!(json, r#"{"channel":"trade","symbols":["XBTUSD","ETHUSD"]}"#);
    }

    #[test]
    fn channel_preserves_symbol_order() {
        let channel = Channel::new("trade", ["ZRXUSD", "ADAUSD"]);
        assert_eq!(channel.symbols, vec!["ZRXUSD", "ADAUSD"]);
    }

    #[test]
    fn all_symbols_serializes_empty_list() {
        let channel = Channel::all_symbols("liquidation");
        let json = serde_json::to_string(&channel).unwrap();
        assert_eq!(json, r#"{"channel":"liquidation","symbols":[]}"#);
    }
}
