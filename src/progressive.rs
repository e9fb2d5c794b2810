//! The staged loading orchestrator.
//!
//! One [`ProgressiveLoader`] drives the critical → full → enhancement →
//! complete pipeline for a repository identity and publishes incremental
//! [`ProgressiveDataState`] snapshots through a watch channel. Consumers see
//! useful information as soon as the critical stage lands and richer data as
//! later stages resolve, without blocking or re-fetching redundantly.
//!
//! Each run owns a fresh cancellation token. Changing the identity cancels
//! the previous run before the new one starts; a cancelled run never writes
//! to the cache or the published snapshot again, even when its network call
//! eventually resolves.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    cache::ResultCache,
    idle::{IdleSchedule, IdleTaskHandle},
    platform,
    retry::RetryPolicy,
    source::{FetchOptions, FetchedPullRequests, RepoDataSource, RepoQuery, TimeRange},
    state::{DataStatus, LoadingStage, ProgressiveDataState, RepoSummary},
};

/// Number of contributors surfaced by the critical-stage summary.
const TOP_CONTRIBUTOR_LIMIT: usize = 5;

/// Tuning for one loader instance.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// How long a cached full-stage payload stays adoptable.
    pub cache_ttl: Duration,
    /// Retry budget for the critical stage.
    pub critical_retry: RetryPolicy,
    /// Retry budget for the full stage.
    pub full_retry: RetryPolicy,
    /// Retry budget for the enhancement stage.
    pub enhancement_retry: RetryPolicy,
    /// Latest point at which scheduled enhancement work must start.
    pub idle_deadline: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            cache_ttl: platform::DEFAULT_CACHE_TTL,
            critical_retry: RetryPolicy::CRITICAL,
            full_retry: RetryPolicy::FULL,
            enhancement_retry: RetryPolicy::ENHANCEMENT,
            idle_deadline: platform::DEFAULT_IDLE_DEADLINE,
        }
    }
}

/// Bookkeeping for the run currently bound to a loader instance.
struct RunSlot {
    query: Option<RepoQuery>,
    token: CancellationToken,
    in_flight: bool,
    idle_task: Option<IdleTaskHandle>,
    closed: bool,
}

impl Default for RunSlot {
    fn default() -> Self {
        Self {
            query: None,
            token: CancellationToken::new(),
            in_flight: false,
            idle_task: None,
            closed: false,
        }
    }
}

struct LoaderInner<S: RepoDataSource> {
    source: S,
    cache: ResultCache,
    idle: Arc<dyn IdleSchedule>,
    config: LoaderConfig,
    state: watch::Sender<ProgressiveDataState<S::Metric, S::Enhancement>>,
    run: Mutex<RunSlot>,
}

/// Cheap-clone handle over one orchestrator instance.
pub struct ProgressiveLoader<S: RepoDataSource> {
    inner: Arc<LoaderInner<S>>,
}

impl<S: RepoDataSource> Clone for ProgressiveLoader<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: RepoDataSource> ProgressiveLoader<S> {
    /// Creates a loader over `source`, publishing into a fresh channel.
    ///
    /// The cache is injected rather than owned so every loader in the process
    /// can share one instance, and so tests can supply an isolated one.
    pub fn new(
        source: S,
        cache: ResultCache,
        idle: Arc<dyn IdleSchedule>,
        config: LoaderConfig,
    ) -> Self {
        let (state, _) = watch::channel(ProgressiveDataState::new());
        Self {
            inner: Arc::new(LoaderInner {
                source,
                cache,
                idle,
                config,
                state,
                run: Mutex::new(RunSlot::default()),
            }),
        }
    }

    /// Subscribes to published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<ProgressiveDataState<S::Metric, S::Enhancement>> {
        self.inner.state.subscribe()
    }

    /// Current snapshot.
    pub fn state(&self) -> ProgressiveDataState<S::Metric, S::Enhancement> {
        self.inner.state.borrow().clone()
    }

    /// Binds the loader to an identity, starting (or restarting) the staged
    /// pipeline.
    ///
    /// A missing or empty owner/repo is a precondition, not a failure: no
    /// stage runs, no fetch is issued, and the snapshot rests at `Initial`
    /// until a valid identity arrives. While a run is in flight, calling
    /// `load` again with the same identity is a no-op; a different identity
    /// cancels the old run and starts fresh.
    pub fn load(
        &self,
        owner: Option<String>,
        repo: Option<String>,
        time_range: TimeRange,
        include_bots: bool,
    ) {
        let Some(query) = identity(owner, repo, time_range, include_bots) else {
            if self.abandon_run() {
                self.inner.state.send_replace(ProgressiveDataState::new());
            }
            return;
        };

        let token = CancellationToken::new();
        {
            let Ok(mut run) = self.inner.run.lock() else {
                return;
            };
            if run.closed {
                return;
            }
            if run.in_flight && run.query.as_ref() == Some(&query) {
                crate::debug_log!("run already in flight for {}", query.cache_key());
                return;
            }
            // Supersede whatever ran before: cancel its token and revoke its
            // pending idle work before the new run can publish anything.
            run.token.cancel();
            if let Some(idle_task) = run.idle_task.take() {
                idle_task.cancel();
            }
            run.query = Some(query.clone());
            run.token = token.clone();
            run.in_flight = true;
        }

        // State is recreated from scratch per identity, never merged.
        self.inner.state.send_replace(ProgressiveDataState::new());
        crate::log_stage!("starting run for {}", query.cache_key());

        let loader = self.clone();
        platform::task::spawn(async move {
            loader.run_pipeline(query, token).await;
        });
    }

    /// Cancels the current run and closes the loader. Used on hook teardown;
    /// subsequent `load` calls are ignored.
    pub fn shutdown(&self) {
        if let Ok(mut run) = self.inner.run.lock() {
            run.closed = true;
            run.token.cancel();
            if let Some(idle_task) = run.idle_task.take() {
                idle_task.cancel();
            }
            run.in_flight = false;
        }
    }

    async fn run_pipeline(&self, query: RepoQuery, token: CancellationToken) {
        let key = query.cache_key();
        let config = &self.inner.config;

        self.publish(&token, |state| {
            state.stats.loading = true;
        });

        // Repeat visit inside the TTL window: adopt the cached payload with
        // zero network I/O, still publishing each stage transition.
        if let Some(cached) = self
            .inner
            .cache
            .get_fresh::<FetchedPullRequests>(&key, config.cache_ttl)
        {
            if token.is_cancelled() {
                return;
            }
            self.publish_critical(&token, &cached);
            self.apply_full_payload(&token, &cached);
            self.schedule_enhancement(query, token);
            return;
        }

        // Stage 1: critical. A failure here is fatal to the run.
        let options = FetchOptions {
            time_range: query.time_range,
            include_bots: query.include_bots,
        };
        let critical = config
            .critical_retry
            .run(|| {
                self.inner
                    .source
                    .fetch_pull_requests(&query.owner, &query.repo, &options)
            })
            .await;
        if token.is_cancelled() {
            return;
        }
        let fetched = match critical {
            Ok(fetched) => fetched,
            Err(error) => {
                crate::log_stage!("critical stage failed for {}: {}", key, error);
                self.publish(&token, |state| {
                    state.basic_info = None;
                    state.stats.loading = false;
                    state.data_status = DataStatus::no_data(error.to_string());
                });
                self.finish_run();
                return;
            }
        };
        self.publish_critical(&token, &fetched);

        // Stage 2: full. Failures are recorded but, unlike the critical
        // stage, do not block enhancement: secondary analytics are
        // best-effort and independent of full-stage health.
        let full = config
            .full_retry
            .run(|| {
                self.inner
                    .source
                    .fetch_pull_requests(&query.owner, &query.repo, &options)
            })
            .await;
        if token.is_cancelled() {
            return;
        }
        match full {
            Ok(fetched) => {
                if fetched.data.is_some() {
                    self.inner.cache.set(key.clone(), fetched.clone());
                }
                self.apply_full_payload(&token, &fetched);
            }
            Err(error) => {
                crate::log_stage!("full stage failed for {}: {}", key, error);
                self.publish(&token, |state| {
                    state.stats.loading = false;
                    state.stats.error = Some(error.to_string());
                    state.current_stage = LoadingStage::Full;
                    state.data_status = DataStatus::no_data(error.to_string());
                });
            }
        }

        self.schedule_enhancement(query, token);
    }

    fn publish_critical(&self, token: &CancellationToken, fetched: &FetchedPullRequests) {
        let summary = RepoSummary::from_records(fetched.records(), TOP_CONTRIBUTOR_LIMIT);
        self.publish(token, |state| {
            state.basic_info = Some(summary);
            state.current_stage = LoadingStage::Critical;
            state.stage_progress.critical = true;
        });
    }

    fn apply_full_payload(&self, token: &CancellationToken, fetched: &FetchedPullRequests) {
        let records = fetched.records().to_vec();
        // An empty record set yields no metric, not a degenerate zero-value.
        let metric = if records.is_empty() {
            None
        } else {
            Some(self.inner.source.derive_metric(&records))
        };
        let status = DataStatus::from_fetch(fetched);
        self.publish(token, move |state| {
            state.stats.pull_requests = records;
            state.stats.loading = false;
            state.stats.error = None;
            state.metric = metric;
            state.current_stage = LoadingStage::Full;
            state.stage_progress.full = true;
            state.data_status = status;
        });
    }

    /// Hands the enhancement stage to the idle scheduler instead of running
    /// it synchronously after the full stage.
    fn schedule_enhancement(&self, query: RepoQuery, token: CancellationToken) {
        let loader = self.clone();
        let deadline = self.inner.config.idle_deadline;
        let callback_token = token.clone();
        let handle = self.inner.idle.schedule(
            deadline,
            Box::new(move || {
                if callback_token.is_cancelled() {
                    return;
                }
                let task_loader = loader.clone();
                platform::task::spawn(async move {
                    task_loader.run_enhancement(query, callback_token).await;
                });
            }),
        );

        if let Ok(mut run) = self.inner.run.lock() {
            if token.is_cancelled() {
                // The identity changed while we were scheduling.
                handle.cancel();
                return;
            }
            run.idle_task = Some(handle);
        }
    }

    async fn run_enhancement(&self, query: RepoQuery, token: CancellationToken) {
        self.publish(&token, |state| {
            state.current_stage = LoadingStage::Enhancement;
        });

        let result = self
            .inner
            .config
            .enhancement_retry
            .run(|| {
                self.inner
                    .source
                    .fetch_direct_commits(&query.owner, &query.repo, query.time_range)
            })
            .await;
        if token.is_cancelled() {
            return;
        }
        match result {
            Ok(payload) => {
                self.publish(&token, |state| {
                    state.enhancement = Some(payload);
                    state.stage_progress.enhancement = true;
                });
            }
            Err(error) => {
                // Recorded only as the absence of enhancement data.
                crate::log_stage!(
                    "enhancement stage failed for {}: {}",
                    query.cache_key(),
                    error
                );
            }
        }

        // Enhancement is best-effort: the run completes either way.
        self.publish(&token, |state| {
            state.current_stage = LoadingStage::Complete;
            state.stage_progress.complete = true;
        });
        self.finish_run();
    }

    /// Publishes a state mutation unless the owning run has been cancelled.
    fn publish(
        &self,
        token: &CancellationToken,
        mutate: impl FnOnce(&mut ProgressiveDataState<S::Metric, S::Enhancement>),
    ) {
        if token.is_cancelled() {
            return;
        }
        self.inner.state.send_modify(mutate);
    }

    /// Cancels whatever is running and unbinds the identity. Reports `false`
    /// on a closed loader, where state must no longer be touched.
    fn abandon_run(&self) -> bool {
        let Ok(mut run) = self.inner.run.lock() else {
            return false;
        };
        if run.closed {
            return false;
        }
        run.token.cancel();
        if let Some(idle_task) = run.idle_task.take() {
            idle_task.cancel();
        }
        run.query = None;
        run.in_flight = false;
        true
    }

    fn finish_run(&self) {
        if let Ok(mut run) = self.inner.run.lock() {
            run.in_flight = false;
        }
    }
}

/// A loading identity is only well-formed with a non-empty owner and repo.
fn identity(
    owner: Option<String>,
    repo: Option<String>,
    time_range: TimeRange,
    include_bots: bool,
) -> Option<RepoQuery> {
    let owner = owner.filter(|owner| !owner.is_empty())?;
    let repo = repo.filter(|repo| !repo.is_empty())?;
    Some(RepoQuery {
        owner,
        repo,
        time_range,
        include_bots,
    })
}
