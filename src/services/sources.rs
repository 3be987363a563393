//! Playlist source fetching.
//!
//! Fetches raw playlist text for each enabled source and feeds it through
//! the parser, tolerating partial failure: one dead source must not void
//! the channels of the others.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use super::channel_types::{Channel, Source};
use super::playlist::parse_m3u;
use crate::error::{IptvError, Result};

/// Outcome of fetching a single source, for the UI's source list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOutcome {
    pub source_id: String,
    pub source_name: String,
    pub channel_count: usize,
    #[serde(default)]
    pub error: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Merged result of fetching all enabled sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchReport {
    pub channels: Vec<Channel>,
    pub groups: Vec<String>,
    pub outcomes: Vec<SourceOutcome>,
}

pub struct SourceFetcher {
    client: reqwest::Client,
}

impl SourceFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Fetch the raw playlist text for one source.
    pub async fn fetch_source(&self, source: &Source) -> Result<String> {
        let url = url::Url::parse(&source.url).map_err(|e| {
            IptvError::SourceError(format!("Invalid playlist URL '{}': {}", source.url, e))
        })?;

        let response = self.client.get(url).send().await.map_err(|e| {
            IptvError::SourceError(format!("Failed to fetch '{}': {}", source.name, e))
        })?;

        if !response.status().is_success() {
            return Err(IptvError::SourceError(format!(
                "Playlist fetch for '{}' returned {}",
                source.name,
                response.status()
            )));
        }

        response.text().await.map_err(|e| {
            IptvError::SourceError(format!("Failed to read playlist '{}': {}", source.name, e))
        })
    }

    /// Fetch and parse every enabled source, merging the results.
    ///
    /// A failing source is logged and recorded in its outcome, never
    /// propagated; the call errors only when every enabled source failed.
    pub async fn fetch_channels(&self, sources: &[Source]) -> Result<FetchReport> {
        let enabled: Vec<&Source> = sources.iter().filter(|s| s.enabled).collect();
        if enabled.is_empty() {
            return Ok(FetchReport::default());
        }

        let bodies = join_all(enabled.iter().map(|source| self.fetch_source(source))).await;

        let mut report = FetchReport::default();
        let mut groups: HashSet<String> = HashSet::new();
        let mut any_ok = false;

        for (source, body) in enabled.iter().zip(bodies) {
            match body {
                Ok(text) => {
                    let parsed = parse_m3u(&text);
                    log::info!(
                        "Fetched {} channels from source '{}'",
                        parsed.channels.len(),
                        source.name
                    );
                    any_ok = true;
                    report.outcomes.push(SourceOutcome {
                        source_id: source.id.clone(),
                        source_name: source.name.clone(),
                        channel_count: parsed.channels.len(),
                        error: None,
                        fetched_at: Utc::now(),
                    });
                    groups.extend(parsed.groups);
                    report.channels.extend(parsed.channels);
                }
                Err(e) => {
                    log::warn!("Skipping source '{}': {}", source.name, e);
                    report.outcomes.push(SourceOutcome {
                        source_id: source.id.clone(),
                        source_name: source.name.clone(),
                        channel_count: 0,
                        error: Some(e.to_string()),
                        fetched_at: Utc::now(),
                    });
                }
            }
        }

        if !any_ok {
            return Err(IptvError::SourceError(
                "All playlist sources failed".to_string(),
            ));
        }

        let mut groups: Vec<String> = groups.into_iter().collect();
        groups.sort();
        report.groups = groups;

        Ok(report)
    }
}
