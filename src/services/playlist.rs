//! M3U playlist parser.
//!
//! Turns loosely-structured playlist text into typed channel records and
//! a catalogue of the group names in use. Pure and total: malformed lines
//! are skipped, never raised.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::channel_types::{Channel, DEFAULT_GROUP, UNKNOWN_CHANNEL_NAME};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct M3uParseResult {
    pub channels: Vec<Channel>,
    /// Deduplicated group names in use, sorted ascending.
    pub groups: Vec<String>,
}

/// Attributes collected from a single `#EXTINF:` line, held until the
/// matching URL line arrives.
#[derive(Debug, Clone)]
struct PendingEntry {
    tvg_id: Option<String>,
    tvg_name: Option<String>,
    tvg_logo: Option<String>,
    group_title: String,
    channel_name: String,
}

/// Case-insensitive `key="value"` matchers for the EXTINF attributes we
/// care about. Compiled once per parse.
struct ExtinfPatterns {
    tvg_id: Regex,
    tvg_name: Regex,
    tvg_logo: Regex,
    group_title: Regex,
}

impl ExtinfPatterns {
    fn new() -> Self {
        Self {
            tvg_id: attr_pattern("tvg-id"),
            tvg_name: attr_pattern("tvg-name"),
            tvg_logo: attr_pattern("tvg-logo"),
            group_title: attr_pattern("group-title"),
        }
    }
}

fn attr_pattern(key: &str) -> Regex {
    Regex::new(&format!(r#"(?i){}="([^"]*)""#, key)).unwrap()
}

/// Extract an attribute value; empty values count as absent.
fn extract_attribute(pattern: &Regex, line: &str) -> Option<String> {
    pattern
        .captures(line)
        .map(|captures| captures[1].to_string())
        .filter(|value| !value.is_empty())
}

fn parse_extinf_line(line: &str, patterns: &ExtinfPatterns) -> PendingEntry {
    // Attribute values may themselves contain commas; only the final
    // comma delimits the display name.
    let channel_name = line
        .rfind(',')
        .map(|pos| line[pos + 1..].trim().to_string())
        .unwrap_or_default();

    PendingEntry {
        tvg_id: extract_attribute(&patterns.tvg_id, line),
        tvg_name: extract_attribute(&patterns.tvg_name, line),
        tvg_logo: extract_attribute(&patterns.tvg_logo, line),
        group_title: extract_attribute(&patterns.group_title, line)
            .unwrap_or_else(|| DEFAULT_GROUP.to_string()),
        channel_name,
    }
}

/// Stable channel id: the explicit `tvg-id` when present, otherwise a
/// rolling hash of the stream URL. The same playlist re-parsed yields
/// the same ids.
fn derive_channel_id(url: &str, tvg_id: Option<&str>) -> String {
    if let Some(id) = tvg_id {
        return id.to_string();
    }

    let mut hash: i32 = 0;
    for unit in url.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32);
    }
    format!("channel_{:x}", hash.unsigned_abs())
}

fn build_channel(url: &str, entry: PendingEntry) -> Channel {
    let name = if !entry.channel_name.is_empty() {
        entry.channel_name.clone()
    } else if let Some(tvg_name) = entry.tvg_name.clone() {
        tvg_name
    } else {
        UNKNOWN_CHANNEL_NAME.to_string()
    };

    Channel {
        id: derive_channel_id(url, entry.tvg_id.as_deref()),
        name,
        url: url.to_string(),
        logo: entry.tvg_logo,
        group: entry.group_title,
        tvg_id: entry.tvg_id,
        tvg_name: entry.tvg_name,
    }
}

/// Parse M3U content into channels and the set of group names in use.
///
/// Single top-to-bottom scan. A `#EXTINF:` line opens (or replaces) a
/// pending entry; the next `http://`/`https://` line closes it and emits
/// one channel. URL lines with no open entry are dropped, as are blank
/// lines, the `#EXTM3U` marker, and unrecognized directives.
pub fn parse_m3u(content: &str) -> M3uParseResult {
    let patterns = ExtinfPatterns::new();

    let mut channels: Vec<Channel> = Vec::new();
    let mut index_by_id: HashMap<String, usize> = HashMap::new();
    let mut groups: HashSet<String> = HashSet::new();
    let mut pending: Option<PendingEntry> = None;

    for raw_line in content.lines() {
        let line = raw_line.trim();

        if line.is_empty() {
            continue;
        }

        if line.starts_with("#EXTM3U") {
            continue;
        }

        if line.starts_with("#EXTINF:") {
            pending = Some(parse_extinf_line(line, &patterns));
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        if line.starts_with("http://") || line.starts_with("https://") {
            if let Some(entry) = pending.take() {
                let channel = build_channel(line, entry);
                groups.insert(channel.group.clone());

                match index_by_id.get(&channel.id).copied() {
                    // Duplicate id: last-seen wins
                    Some(index) => channels[index] = channel,
                    None => {
                        index_by_id.insert(channel.id.clone(), channels.len());
                        channels.push(channel);
                    }
                }
            }
        }
    }

    let mut groups: Vec<String> = groups.into_iter().collect();
    groups.sort();

    M3uParseResult { channels, groups }
}
