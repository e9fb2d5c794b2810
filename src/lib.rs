#![doc = include_str!("../README.md")]

// Core modules
pub mod cache;
pub mod errors;
pub mod global;
pub mod hooks;
pub mod idle;
pub mod lazy;
mod log_utils;
pub mod platform;
pub mod progressive;
pub mod retry;
pub mod runtime;
pub mod source;
pub mod state;
pub mod types;

// Re-export commonly used items at crate root for convenience
pub use global::init;
pub use runtime::PulseRuntimeConfig;

pub mod prelude {
    //! The prelude exports all the most common types and functions for using dioxus-repo-pulse.

    // The main hooks
    pub use crate::hooks::{UseLazyLoad, use_lazy_load, use_progressive_repo_data};

    // The data-source boundary
    pub use crate::source::{
        Author, FetchOptions, FetchOutcome, FetchedPullRequests, PullRequest, RepoDataSource,
        RepoQuery, TimeRange,
    };

    // Observable loading state
    pub use crate::state::{
        ContributorActivity, DataStatus, DataStatusKind, LoadingStage, ProgressiveDataState,
        RepoStats, RepoSummary, StageProgress,
    };

    // Core engine pieces, usable without the hooks layer
    pub use crate::cache::ResultCache;
    pub use crate::idle::{DeferredIdleScheduler, IdleSchedule, IdleTaskHandle, YieldIdleScheduler};
    pub use crate::lazy::{LazyLoadOptions, LazyLoadState, LazyLoader};
    pub use crate::progressive::{LoaderConfig, ProgressiveLoader};
    pub use crate::retry::RetryPolicy;

    // Global initialization
    pub use crate::global::{GlobalPulseError, init, init_with};
    pub use crate::runtime::{PulseRuntime, PulseRuntimeConfig, PulseRuntimeHandles};

    // Error types
    pub use crate::errors::{LoadError, SourceError};
}
