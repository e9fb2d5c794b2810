//! # Progressive repo-data hook
//!
//! [`use_progressive_repo_data`] binds a component to the staged loading
//! pipeline for one repository identity and keeps a signal updated with every
//! published snapshot. It requires `dioxus_repo_pulse::init()` to be called
//! at application startup.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dioxus::prelude::*;
//! use dioxus_repo_pulse::prelude::*;
//!
//! #[component]
//! fn RepoHealth(owner: String, repo: String) -> Element {
//!     let state = use_progressive_repo_data(
//!         SupabaseSource::shared(),
//!         Some(owner),
//!         Some(repo),
//!         TimeRange::ThirtyDays,
//!         false,
//!     );
//!
//!     let snapshot = state.read();
//!     rsx! {
//!         if let Some(summary) = &snapshot.basic_info {
//!             div { "{summary.pr_count} pull requests" }
//!         }
//!         if snapshot.is_stage_ready(LoadingStage::Full) {
//!             ActivityTable { records: snapshot.stats.pull_requests.clone() }
//!         }
//!     }
//! }
//! ```

use dioxus::prelude::*;

use crate::{
    global::get_global_runtime_handles,
    progressive::ProgressiveLoader,
    runtime::PulseRuntimeHandles,
    source::{RepoDataSource, TimeRange},
    state::ProgressiveDataState,
};

fn runtime_handles_or_panic() -> PulseRuntimeHandles {
    get_global_runtime_handles().unwrap_or_else(|_| {
        panic!(
            "Global runtime not initialized. Call dioxus_repo_pulse::init() before using hooks."
        )
    })
}

/// Hook driving the staged pipeline for a repository identity.
///
/// Returns a live, continuously updated snapshot. While `owner` or `repo` is
/// `None` or empty the snapshot rests at `LoadingStage::Initial` and nothing
/// is fetched; supplying a valid identity (or changing it) cancels whatever
/// ran before and starts a fresh run.
pub fn use_progressive_repo_data<S>(
    source: S,
    owner: Option<String>,
    repo: Option<String>,
    time_range: TimeRange,
    include_bots: bool,
) -> Signal<ProgressiveDataState<S::Metric, S::Enhancement>>
where
    S: RepoDataSource,
{
    let state = use_signal(ProgressiveDataState::new);

    let loader = use_hook(|| {
        let handles = runtime_handles_or_panic();
        let loader = ProgressiveLoader::new(
            source.clone(),
            handles.cache,
            handles.idle,
            handles.loader_config,
        );

        // Forward every published snapshot into the signal for the lifetime
        // of the component.
        let mut snapshots = loader.subscribe();
        let mut state_for_async = state;
        spawn(async move {
            loop {
                let snapshot = snapshots.borrow_and_update().clone();
                state_for_async.set(snapshot);
                if snapshots.changed().await.is_err() {
                    break;
                }
            }
        });

        loader
    });

    use_drop({
        let loader = loader.clone();
        move || loader.shutdown()
    });

    let _reload = use_memo(use_reactive!(|(owner, repo, time_range, include_bots)| {
        loader.load(owner.clone(), repo.clone(), time_range, include_bots);
    }));

    state
}
