//! The data-source boundary: domain records and the [`RepoDataSource`] trait.
//!
//! Everything behind this boundary (the hosted store, its query language, the
//! spam-scoring and lottery-factor formulas) is a collaborator the loading
//! engine consumes, not something it implements. A dashboard supplies one
//! `RepoDataSource` and the engine never talks to the network directly.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::SourceError;
use crate::types::{EnhancementBounds, MetricBounds};

/// Time window a dashboard query covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    /// The trailing 30 days.
    #[default]
    #[serde(rename = "30d")]
    ThirtyDays,
    /// The trailing 90 days.
    #[serde(rename = "90d")]
    NinetyDays,
    /// The trailing year.
    #[serde(rename = "1y")]
    OneYear,
    /// The repository's full history.
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    /// Wire form of the range (`"30d"`, `"90d"`, `"1y"`, `"all"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ThirtyDays => "30d",
            TimeRange::NinetyDays => "90d",
            TimeRange::OneYear => "1y",
            TimeRange::All => "all",
        }
    }

    /// Number of days covered, `None` for the unbounded range.
    pub fn days(&self) -> Option<u32> {
        match self {
            TimeRange::ThirtyDays => Some(30),
            TimeRange::NinetyDays => Some(90),
            TimeRange::OneYear => Some(365),
            TimeRange::All => None,
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pull-request author as reported by the upstream store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub login: String,
    #[serde(default)]
    pub is_bot: bool,
}

/// One pull-request record in a repository's activity window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

/// The identity one progressive loading run is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoQuery {
    pub owner: String,
    pub repo: String,
    pub time_range: TimeRange,
    pub include_bots: bool,
}

impl RepoQuery {
    /// Composite cache key. Owner, repo, window and bot flag all partake in
    /// result identity: flipping any of them is a different query.
    pub fn cache_key(&self) -> String {
        format!(
            "{}/{}:{}:bots={}",
            self.owner,
            self.repo,
            self.time_range.as_str(),
            self.include_bots
        )
    }
}

/// Options forwarded to the record fetch unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub time_range: TimeRange,
    pub include_bots: bool,
}

/// Outcome classification reported by the record fetch.
///
/// A fetch can resolve without rejecting and still carry a degraded outcome;
/// the orchestrator maps these onto the published data status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    Success,
    PartialData,
    LargeRepositoryProtected,
    Error,
}

/// Return shape of the record fetch. Also the value the result cache stores
/// after a successful full-stage load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedPullRequests {
    pub data: Option<Vec<PullRequest>>,
    pub outcome: FetchOutcome,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl FetchedPullRequests {
    /// A plain successful result carrying `data`.
    pub fn success(data: Vec<PullRequest>) -> Self {
        Self {
            data: Some(data),
            outcome: FetchOutcome::Success,
            message: None,
            metadata: None,
        }
    }

    /// The fetched records, empty when the fetch carried no data.
    pub fn records(&self) -> &[PullRequest] {
        self.data.as_deref().unwrap_or_default()
    }
}

/// The external collaborators one loading run consumes.
///
/// Implementations are expected to be cheap to clone (the engine clones them
/// into spawned stage tasks) and are responsible for their own query shapes,
/// bot filtering and statistical formulas. The engine only sequences calls,
/// retries transient failures and publishes results.
pub trait RepoDataSource: Clone + Send + Sync + 'static {
    /// Metric derived synchronously from the full record set (e.g. the
    /// lottery factor). Opaque to the engine.
    type Metric: MetricBounds;
    /// Secondary analytics payload fetched during the enhancement stage
    /// (e.g. direct-commit authorship). Opaque to the engine.
    type Enhancement: EnhancementBounds;

    /// Fetch the pull-request records for a repository and window.
    fn fetch_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        options: &FetchOptions,
    ) -> impl Future<Output = Result<FetchedPullRequests, SourceError>> + Send;

    /// Fetch the enhancement-stage analytics payload.
    fn fetch_direct_commits(
        &self,
        owner: &str,
        repo: &str,
        time_range: TimeRange,
    ) -> impl Future<Output = Result<Self::Enhancement, SourceError>> + Send;

    /// Derive the metric from a record set. Pure; must not block.
    fn derive_metric(&self, records: &[PullRequest]) -> Self::Metric;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_range_wire_form_round_trips() {
        for range in [
            TimeRange::ThirtyDays,
            TimeRange::NinetyDays,
            TimeRange::OneYear,
            TimeRange::All,
        ] {
            let json = serde_json::to_string(&range).unwrap();
            assert_eq!(json, format!("\"{}\"", range.as_str()));
            let back: TimeRange = serde_json::from_str(&json).unwrap();
            assert_eq!(back, range);
        }
    }

    #[test]
    fn cache_key_includes_every_identity_component() {
        let query = RepoQuery {
            owner: "octocat".into(),
            repo: "hello-world".into(),
            time_range: TimeRange::NinetyDays,
            include_bots: false,
        };
        assert_eq!(query.cache_key(), "octocat/hello-world:90d:bots=false");

        let with_bots = RepoQuery {
            include_bots: true,
            ..query.clone()
        };
        assert_ne!(query.cache_key(), with_bots.cache_key());

        let other_window = RepoQuery {
            time_range: TimeRange::All,
            ..query.clone()
        };
        assert_ne!(query.cache_key(), other_window.cache_key());
    }

    #[test]
    fn records_is_empty_for_absent_data() {
        let fetched = FetchedPullRequests {
            data: None,
            outcome: FetchOutcome::Error,
            message: Some("boom".into()),
            metadata: None,
        };
        assert!(fetched.records().is_empty());
    }
}
