//! Shared channel and source types.
//!
//! Consumed by the parser, fetcher, aggregator, prober, and the UI layer.

use serde::{Deserialize, Serialize};

/// Group assigned to channels whose playlist entry carries no
/// `group-title` attribute. Always sorts last in grouped views.
pub const DEFAULT_GROUP: &str = "Other";

/// Display name for entries with no usable name field.
pub const UNKNOWN_CHANNEL_NAME: &str = "Unknown";

/// One playable stream entry parsed from a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub logo: Option<String>,
    pub group: String,
    #[serde(default)]
    pub tvg_id: Option<String>,
    #[serde(default)]
    pub tvg_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelGroup {
    pub name: String,
    pub channels: Vec<Channel>,
}

/// Reachability of a channel's stream URL.
///
/// Every channel starts `Unknown`; a completed probe moves it to one of
/// the terminal states, and it never returns to `Unknown` short of a
/// cache clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    #[default]
    Unknown,
    Available,
    Unavailable,
}

impl ChannelStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ChannelStatus::Available | ChannelStatus::Unavailable)
    }
}

/// A user-configured playlist source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub name: String,
    pub url: String,
    pub enabled: bool,
    #[serde(default)]
    pub is_default: bool,
}

impl Source {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            url: url.to_string(),
            enabled: true,
            is_default: false,
        }
    }
}

/// Sort order for channel listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Name,
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_serializes_camel_case() {
        let channel = Channel {
            id: "cctv1".to_string(),
            name: "CCTV-1".to_string(),
            url: "https://example.com/cctv1.m3u8".to_string(),
            logo: None,
            group: "News".to_string(),
            tvg_id: Some("cctv1".to_string()),
            tvg_name: None,
        };

        let json = serde_json::to_value(&channel).unwrap();
        assert_eq!(json["tvgId"], "cctv1");
        assert!(json["tvgName"].is_null());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ChannelStatus::Unavailable).unwrap(),
            "\"unavailable\""
        );
    }

    #[test]
    fn test_status_terminality() {
        assert!(!ChannelStatus::Unknown.is_terminal());
        assert!(ChannelStatus::Available.is_terminal());
        assert!(ChannelStatus::Unavailable.is_terminal());
    }

    #[test]
    fn test_source_new_generates_unique_ids() {
        let a = Source::new("A", "http://a.example/playlist.m3u");
        let b = Source::new("B", "http://b.example/playlist.m3u");
        assert_ne!(a.id, b.id);
        assert!(a.enabled);
        assert!(!a.is_default);
    }
}
