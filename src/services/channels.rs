//! Channel list aggregation.
//!
//! Search filtering, sorting, and grouping of parsed channels for the
//! channel browser. Pure computation over already-resident data; nothing
//! here suspends.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::channel_types::{Channel, ChannelGroup, ChannelStatus, SortBy, DEFAULT_GROUP};

/// Case-insensitive substring search over name, group, and alternate
/// name. A blank query returns everything.
pub fn filter_channels(channels: &[Channel], query: &str) -> Vec<Channel> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return channels.to_vec();
    }

    channels
        .iter()
        .filter(|channel| {
            channel.name.to_lowercase().contains(&query)
                || channel.group.to_lowercase().contains(&query)
                || channel
                    .tvg_name
                    .as_ref()
                    .map(|name| name.to_lowercase().contains(&query))
                    .unwrap_or(false)
        })
        .cloned()
        .collect()
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn status_rank(status: ChannelStatus) -> u8 {
    match status {
        ChannelStatus::Available => 0,
        ChannelStatus::Unknown => 1,
        ChannelStatus::Unavailable => 2,
    }
}

/// Sort channels by name, or by availability with name as tie-breaker.
pub fn sort_channels(
    channels: &[Channel],
    sort_by: SortBy,
    statuses: &HashMap<String, ChannelStatus>,
) -> Vec<Channel> {
    let mut sorted = channels.to_vec();
    match sort_by {
        SortBy::Name => sorted.sort_by(|a, b| compare_names(&a.name, &b.name)),
        SortBy::Status => sorted.sort_by(|a, b| {
            let rank_a = status_rank(statuses.get(&a.id).copied().unwrap_or_default());
            let rank_b = status_rank(statuses.get(&b.id).copied().unwrap_or_default());
            rank_a
                .cmp(&rank_b)
                .then_with(|| compare_names(&a.name, &b.name))
        }),
    }
    sorted
}

/// Bucket channels by group, preserving input order within each bucket.
/// Bucket order is alphabetical, except the catch-all group always lands
/// last.
pub fn group_channels(channels: &[Channel]) -> Vec<ChannelGroup> {
    let mut buckets: HashMap<String, Vec<Channel>> = HashMap::new();
    for channel in channels {
        buckets
            .entry(channel.group.clone())
            .or_default()
            .push(channel.clone());
    }

    let mut names: Vec<String> = buckets.keys().cloned().collect();
    names.sort_by(|a, b| {
        match (a.as_str() == DEFAULT_GROUP, b.as_str() == DEFAULT_GROUP) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => compare_names(a, b),
        }
    });

    names
        .into_iter()
        .map(|name| {
            let channels = buckets.remove(&name).unwrap_or_default();
            ChannelGroup { name, channels }
        })
        .collect()
}

/// Look up a channel by id, e.g. when the UI resolves a play request.
pub fn find_channel<'a>(channels: &'a [Channel], channel_id: &str) -> Option<&'a Channel> {
    channels.iter().find(|channel| channel.id == channel_id)
}
