use chrono::{DateTime, Datelike, TimeDelta, Timelike, Utc};
use core_types::time::floor_to_minute;
use core_types::types::Channel;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use url::Url;

const CACHE_SUBDIR: &str = "feeds";
const ENTRY_SUFFIX: &str = "ndjson";

/// Identity of one cacheable minute of feed data.
///
/// The filter list is part of the identity: the same minute requested with
/// different filters (or the same filters in a different order) is a
/// different slice, both on disk and at the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceAddress {
    exchange: String,
    minute: DateTime<Utc>,
    filter_digest: String,
    filter_query: Option<String>,
}

impl SliceAddress {
    pub fn new(exchange: &str, minute: DateTime<Utc>, filters: &[Channel]) -> Self {
        let serialized = serialize_filters(filters);
        let filter_digest = hex_digest(serialized.as_bytes());
        Self {
            exchange: exchange.to_string(),
            minute: floor_to_minute(minute),
            filter_digest,
            filter_query: (!filters.is_empty()).then_some(serialized),
        }
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Start of the UTC minute this slice covers.
    pub fn minute(&self) -> DateTime<Utc> {
        self.minute
    }

    /// Cache path relative to the cache root.
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::from(CACHE_SUBDIR);
        path.push(&self.exchange);
        path.push(self.minute.format("%Y-%m-%d").to_string());
        path.push(format!("{:02}", self.minute.hour()));
        path.push(format!("{:02}", self.minute.minute()));
        path.push(format!("{}.{}", self.filter_digest, ENTRY_SUFFIX));
        path
    }

    /// Download URL for this slice at the given service endpoint.
    pub fn remote_url(&self, endpoint: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(endpoint)?;
        url.set_path(&format!(
            "/v1/data-feeds/{}/{:04}/{:02}/{:02}/{:02}/{:02}.json.gz",
            self.exchange,
            self.minute.year(),
            self.minute.month(),
            self.minute.day(),
            self.minute.hour(),
            self.minute.minute(),
        ));
        if let Some(filters) = &self.filter_query {
            url.query_pairs_mut().append_pair("filters", filters);
        }
        Ok(url)
    }
}

impl fmt::Display for SliceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.exchange,
            self.minute.format("%Y-%m-%dT%H:%M"),
            &self.filter_digest[..8]
        )
    }
}

/// Contiguous slice minutes covering `[from, to)`.
///
/// The first minute is the one containing `from`; the last is the minute
/// containing `to`, excluded when `to` is minute-aligned. Records outside
/// the window are trimmed at delivery, not here.
pub fn slice_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let mut minutes = Vec::new();
    let mut cursor = floor_to_minute(from);
    while cursor < to {
        minutes.push(cursor);
        cursor += TimeDelta::minutes(1);
    }
    minutes
}

/// Compact JSON serialization of the filter list; doubles as the remote
/// query value and the input to the cache digest.
fn serialize_filters(filters: &[Channel]) -> String {
    serde_json::to_string(filters).expect("channel filters serialize to JSON")
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::time::parse_utc_instant;

    fn minute(input: &str) -> DateTime<Utc> {
        parse_utc_instant(input).unwrap()
    }

    #[test]
    fn address_is_deterministic() {
        let filters = vec![Channel::new("trade", ["XBTUSD"])];
        let a = SliceAddress::new("bitmex", minute("2019-06-01T00:00:00Z"), &filters);
        let b = SliceAddress::new("bitmex", minute("2019-06-01T00:00:00Z"), &filters);
        assert_eq!(a, b);
        assert_eq!(a.relative_path(), b.relative_path());
    }

    #[test]
    fn filter_order_changes_identity() {
        let ab = vec![
            Channel::new("trade", ["XBTUSD"]),
            Channel::new("orderBookL2", ["XBTUSD"]),
        ];
        let ba = vec![
            Channel::new("orderBookL2", ["XBTUSD"]),
            Channel::new("trade", ["XBTUSD"]),
        ];
        let at = minute("2019-06-01T00:00:00Z");
        assert_ne!(
            SliceAddress::new("bitmex", at, &ab).relative_path(),
            SliceAddress::new("bitmex", at, &ba).relative_path()
        );
    }

    #[test]
    fn symbol_order_changes_identity() {
        let xy = vec![Channel::new("trade", ["XBTUSD", "ETHUSD"])];
        let yx = vec![Channel::new("trade", ["ETHUSD", "XBTUSD"])];
        let at = minute("2019-06-01T00:00:00Z");
        assert_ne!(
            SliceAddress::new("bitmex", at, &xy).relative_path(),
            SliceAddress::new("bitmex", at, &yx).relative_path()
        );
    }

    #[test]
    fn unfiltered_uses_empty_list_marker() {
        let address = SliceAddress::new("bitmex", minute("2019-06-01T00:00:00Z"), &[]);
        // sha256 of "[]"
        assert!(address
            .relative_path()
            .to_string_lossy()
            .contains("4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945"));
        let url = address.remote_url("https://api.tardis.dev").unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn cache_path_embeds_zero_padded_calendar_fields() {
        let address = SliceAddress::new("bitmex", minute("2019-06-01T05:07:00Z"), &[]);
        let path = address.relative_path();
        let text = path.to_string_lossy();
        assert!(text.starts_with("feeds/bitmex/2019-06-01/05/07/"), "{text}");
        assert!(text.ends_with(".ndjson"), "{text}");
    }

    #[test]
    fn remote_url_encodes_filters_once() {
        let filters = vec![Channel::new("trade", ["XBTUSD", "ETHUSD"])];
        let address = SliceAddress::new("bitmex", minute("2019-06-01T00:01:00Z"), &filters);
        let url = address.remote_url("https://api.tardis.dev").unwrap();
        assert_eq!(
            url.path(),
            "/v1/data-feeds/bitmex/2019/06/01/00/01.json.gz"
        );
        let query = url.query().unwrap();
        assert!(query.starts_with("filters="), "{query}");
        let decoded: Vec<Channel> = serde_json::from_str(
            &url.query_pairs().next().unwrap().1,
        )
        .unwrap();
        assert_eq!(decoded, filters);
    }

    #[test]
    fn sub_minute_instants_share_a_slice() {
        let a = SliceAddress::new("bitmex", minute("2019-06-01T00:00:30.500Z"), &[]);
        let b = SliceAddress::new("bitmex", minute("2019-06-01T00:00:00Z"), &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn minutes_cover_half_open_range() {
        let minutes = slice_minutes(minute("2019-06-01"), minute("2019-06-01T00:02:00Z"));
        assert_eq!(
            minutes,
            vec![minute("2019-06-01T00:00:00Z"), minute("2019-06-01T00:01:00Z")]
        );
    }

    #[test]
    fn unaligned_bounds_still_cover_containing_minutes() {
        let minutes = slice_minutes(
            minute("2019-06-01T00:00:30Z"),
            minute("2019-06-01T00:01:30Z"),
        );
        assert_eq!(
            minutes,
            vec![minute("2019-06-01T00:00:00Z"), minute("2019-06-01T00:01:00Z")]
        );
    }

    #[test]
    fn empty_range_produces_no_minutes() {
        let at = minute("2019-06-01T00:00:00Z");
        assert!(slice_minutes(at, at).is_empty());
    }
}
