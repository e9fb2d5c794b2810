#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use dioxus_repo_pulse::prelude::*;

/// Secondary analytics payload used by the stub source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectCommits {
    pub commit_count: u32,
}

/// Script for the stub's record fetch.
#[derive(Clone)]
pub enum FetchScript {
    /// Every fetch resolves with these records.
    Records(Vec<PullRequest>),
    /// Every fetch resolves with this exact result.
    Outcome(FetchedPullRequests),
    /// Every fetch rejects.
    Fail(SourceError),
    /// The first fetch resolves with the records, later fetches reject.
    SucceedThenFail(Vec<PullRequest>),
    /// Each fetch resolves with a single record authored by the query's owner.
    EchoOwner,
}

/// Scripted data source counting its invocations.
#[derive(Clone)]
pub struct StubSource {
    pub fetch_calls: Arc<AtomicU32>,
    pub enhancement_calls: Arc<AtomicU32>,
    script: FetchScript,
    enhancement_fails: bool,
    latency: Duration,
}

impl PartialEq for StubSource {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl StubSource {
    pub fn new(script: FetchScript) -> Self {
        Self {
            fetch_calls: Arc::new(AtomicU32::new(0)),
            enhancement_calls: Arc::new(AtomicU32::new(0)),
            script,
            enhancement_fails: false,
            latency: Duration::ZERO,
        }
    }

    pub fn records(records: Vec<PullRequest>) -> Self {
        Self::new(FetchScript::Records(records))
    }

    pub fn failing(error: SourceError) -> Self {
        Self::new(FetchScript::Fail(error))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_failing_enhancement(mut self) -> Self {
        self.enhancement_fails = true;
        self
    }

    pub fn fetches(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn enhancements(&self) -> u32 {
        self.enhancement_calls.load(Ordering::SeqCst)
    }
}

impl RepoDataSource for StubSource {
    type Metric = f64;
    type Enhancement = DirectCommits;

    fn fetch_pull_requests(
        &self,
        owner: &str,
        _repo: &str,
        _options: &FetchOptions,
    ) -> impl Future<Output = Result<FetchedPullRequests, SourceError>> + Send {
        let call = self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.clone();
        let latency = self.latency;
        let owner = owner.to_string();
        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            match script {
                FetchScript::Records(records) => Ok(FetchedPullRequests::success(records)),
                FetchScript::Outcome(outcome) => Ok(outcome),
                FetchScript::Fail(error) => Err(error),
                FetchScript::SucceedThenFail(records) => {
                    if call == 0 {
                        Ok(FetchedPullRequests::success(records))
                    } else {
                        Err(SourceError::Network("connection reset".into()))
                    }
                }
                FetchScript::EchoOwner => {
                    Ok(FetchedPullRequests::success(vec![record(1, &owner)]))
                }
            }
        }
    }

    fn fetch_direct_commits(
        &self,
        _owner: &str,
        _repo: &str,
        _time_range: TimeRange,
    ) -> impl Future<Output = Result<Self::Enhancement, SourceError>> + Send {
        self.enhancement_calls.fetch_add(1, Ordering::SeqCst);
        let fails = self.enhancement_fails;
        async move {
            if fails {
                Err(SourceError::Other("analytics unavailable".into()))
            } else {
                Ok(DirectCommits { commit_count: 7 })
            }
        }
    }

    fn derive_metric(&self, records: &[PullRequest]) -> f64 {
        let summary = RepoSummary::from_records(records, 1);
        summary
            .top_contributors
            .first()
            .map(|top| top.contributions as f64 / records.len() as f64)
            .unwrap_or(0.0)
    }
}

pub fn record(number: u64, login: &str) -> PullRequest {
    PullRequest {
        number,
        title: format!("change #{number}"),
        author: Author {
            login: login.to_string(),
            is_bot: false,
        },
        created_at: Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
            + chrono::Duration::minutes(number as i64),
        merged_at: None,
        additions: 10,
        deletions: 2,
    }
}

pub fn records_cycling(total: usize, authors: usize) -> Vec<PullRequest> {
    (0..total)
        .map(|i| record(i as u64, &format!("user{}", i % authors)))
        .collect()
}

/// A retry budget small enough to keep failing tests fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(1, Duration::from_millis(1), Duration::from_millis(5), 2.0)
}

pub fn fast_config() -> LoaderConfig {
    LoaderConfig {
        cache_ttl: Duration::from_secs(300),
        critical_retry: fast_retry(),
        full_retry: fast_retry(),
        enhancement_retry: fast_retry(),
        idle_deadline: Duration::from_millis(50),
    }
}

pub fn fast_idle() -> Arc<dyn IdleSchedule> {
    Arc::new(DeferredIdleScheduler {
        delay: Duration::from_millis(1),
    })
}

pub fn loader_with(
    source: StubSource,
    cache: ResultCache,
    config: LoaderConfig,
) -> ProgressiveLoader<StubSource> {
    ProgressiveLoader::new(source, cache, fast_idle(), config)
}

pub fn loader(source: StubSource) -> ProgressiveLoader<StubSource> {
    loader_with(source, ResultCache::new(), fast_config())
}

/// Polls `condition` until it holds, panicking after ~2s.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 2s");
}
