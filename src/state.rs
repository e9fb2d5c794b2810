//! Observable loading state published by the progressive loader.
//!
//! A [`ProgressiveDataState`] is the externally visible snapshot for one
//! loading identity. It is created fresh per identity, mutated monotonically
//! while a run is in flight, and discarded wholesale (never merged) when the
//! identity changes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::source::{FetchOutcome, FetchedPullRequests, PullRequest};

/// Quality tiers a loading run moves through, in order.
///
/// The order is total: a consumer observing snapshots from one run sees a
/// non-decreasing sequence of stages.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LoadingStage {
    /// Nothing has run; also terminal when no identity was supplied.
    #[default]
    Initial,
    /// Minimal-cost summary: counts plus a bounded contributor leaderboard.
    Critical,
    /// The complete ordered record set.
    Full,
    /// Opportunistic secondary analytics.
    Enhancement,
    /// Terminal.
    Complete,
}

/// Which stages of the current run have produced their data.
///
/// Flags are only ever raised while a run is in flight, never lowered; a new
/// identity starts from a fresh set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageProgress {
    pub critical: bool,
    pub full: bool,
    pub enhancement: bool,
    pub complete: bool,
}

impl StageProgress {
    /// Whether `stage` has produced its data. `Initial` is trivially reached.
    pub fn reached(&self, stage: LoadingStage) -> bool {
        match stage {
            LoadingStage::Initial => true,
            LoadingStage::Critical => self.critical,
            LoadingStage::Full => self.full,
            LoadingStage::Enhancement => self.enhancement,
            LoadingStage::Complete => self.complete,
        }
    }
}

/// Coarse classification of what the full-stage fetch produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStatusKind {
    #[default]
    Pending,
    Success,
    NoData,
    PartialData,
    LargeRepositoryProtected,
}

/// Tagged status plus optional human-readable text and a free-form metadata
/// bag, surfaced to UI consumers verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataStatus {
    pub kind: DataStatusKind,
    pub message: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl DataStatus {
    /// The initial status before any stage resolves.
    pub fn pending() -> Self {
        Self::default()
    }

    /// Status for a stage whose fetch failed terminally.
    pub fn no_data(message: impl Into<String>) -> Self {
        Self {
            kind: DataStatusKind::NoData,
            message: Some(message.into()),
            metadata: None,
        }
    }

    /// Map a resolved fetch onto a published status. Error-like outcomes
    /// become `NoData`; degraded outcomes pass through with their message and
    /// metadata intact.
    pub(crate) fn from_fetch(fetched: &FetchedPullRequests) -> Self {
        let kind = match fetched.outcome {
            FetchOutcome::Success => DataStatusKind::Success,
            FetchOutcome::PartialData => DataStatusKind::PartialData,
            FetchOutcome::LargeRepositoryProtected => DataStatusKind::LargeRepositoryProtected,
            FetchOutcome::Error => DataStatusKind::NoData,
        };
        Self {
            kind,
            message: fetched.message.clone(),
            metadata: fetched.metadata.clone(),
        }
    }
}

/// One contributor's share of the activity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorActivity {
    pub login: String,
    pub contributions: usize,
}

/// Critical-stage summary: cheap counts plus a bounded leaderboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSummary {
    pub pr_count: usize,
    pub contributor_count: usize,
    pub top_contributors: Vec<ContributorActivity>,
}

impl RepoSummary {
    /// Summarize a record window: distinct authors ranked by contribution
    /// count (ties broken by login), bounded to `limit` entries.
    /// `contributor_count` counts every distinct author, not just the ranked
    /// slice.
    pub fn from_records(records: &[PullRequest], limit: usize) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in records {
            *counts.entry(record.author.login.as_str()).or_insert(0) += 1;
        }
        let contributor_count = counts.len();

        let mut ranked: Vec<ContributorActivity> = counts
            .into_iter()
            .map(|(login, contributions)| ContributorActivity {
                login: login.to_string(),
                contributions,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.contributions
                .cmp(&a.contributions)
                .then_with(|| a.login.cmp(&b.login))
        });
        ranked.truncate(limit);

        Self {
            pr_count: records.len(),
            contributor_count,
            top_contributors: ranked,
        }
    }
}

/// Full-stage payload and its loading/error pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoStats {
    pub pull_requests: Vec<PullRequest>,
    pub loading: bool,
    pub error: Option<String>,
}

/// The externally observable snapshot for one loading identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressiveDataState<M, E> {
    /// Critical-stage summary, present only once that stage succeeds.
    pub basic_info: Option<RepoSummary>,
    /// Full-stage payload plus its loading/error pair.
    pub stats: RepoStats,
    /// Derived metric, computed synchronously from `stats` once available.
    /// Stays `None` for an empty record set.
    pub metric: Option<M>,
    /// Enhancement-stage payload; absent when that stage failed or has not
    /// run yet.
    pub enhancement: Option<E>,
    /// The stage reached so far. Non-decreasing within one run.
    pub current_stage: LoadingStage,
    pub stage_progress: StageProgress,
    pub data_status: DataStatus,
}

impl<M, E> Default for ProgressiveDataState<M, E> {
    fn default() -> Self {
        Self {
            basic_info: None,
            stats: RepoStats::default(),
            metric: None,
            enhancement: None,
            current_stage: LoadingStage::Initial,
            stage_progress: StageProgress::default(),
            data_status: DataStatus::pending(),
        }
    }
}

impl<M, E> ProgressiveDataState<M, E> {
    /// A fresh snapshot at `Initial`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `stage`'s data is available in this snapshot. Used by
    /// consumers to conditionally render partial UI.
    pub fn is_stage_ready(&self, stage: LoadingStage) -> bool {
        match stage {
            LoadingStage::Initial => true,
            LoadingStage::Critical => self.basic_info.is_some(),
            LoadingStage::Full => self.stage_progress.full,
            LoadingStage::Enhancement => self.enhancement.is_some(),
            LoadingStage::Complete => self.stage_progress.complete,
        }
    }
}
