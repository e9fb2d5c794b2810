//! # Viewport lazy-load hook
//!
//! [`use_lazy_load`] wires a [`LazyLoader`] into a component: the producer
//! runs at most once (or per intersection, in continuous mode) and its result
//! lands in a signal. The returned handle is what the caller attaches to its
//! observable region: feed the platform's visibility events into
//! [`UseLazyLoad::set_intersecting`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use dioxus::prelude::*;
//! use dioxus_repo_pulse::prelude::*;
//!
//! #[component]
//! fn SpamPanel(owner: String, repo: String) -> Element {
//!     let panel = use_lazy_load(
//!         move || fetch_spam_breakdown(owner.clone(), repo.clone()),
//!         LazyLoadOptions::default(),
//!     );
//!
//!     let visibility = panel.clone();
//!     rsx! {
//!         div {
//!             onvisible: move |event| {
//!                 if let Ok(intersecting) = event.data().is_intersecting() {
//!                     visibility.set_intersecting(intersecting);
//!                 }
//!             },
//!             if panel.is_loading() {
//!                 Spinner {}
//!             } else if let Some(breakdown) = panel.data() {
//!                 SpamBreakdown { breakdown }
//!             }
//!         }
//!     }
//! }
//! ```

use std::fmt::Display;
use std::future::Future;

use dioxus::prelude::*;

use crate::errors::LoadError;
use crate::lazy::{LazyLoadOptions, LazyLoadState, LazyLoader};

/// Handle returned by [`use_lazy_load`].
pub struct UseLazyLoad<T: 'static> {
    state: Signal<LazyLoadState<T>>,
    loader: LazyLoader<T>,
}

impl<T: 'static> Clone for UseLazyLoad<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state,
            loader: self.loader.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> UseLazyLoad<T> {
    /// Latest produced value, if any.
    pub fn data(&self) -> Option<T> {
        self.state.read().data.clone()
    }

    /// Whether a producer call is in flight.
    pub fn is_loading(&self) -> bool {
        self.state.read().is_loading
    }

    /// Failure of the most recent producer call, if any.
    pub fn error(&self) -> Option<LoadError> {
        self.state.read().error.clone()
    }

    /// Whether the observed region is currently visible.
    pub fn is_intersecting(&self) -> bool {
        self.state.read().is_intersecting
    }

    /// Whether the producer has completed at least once.
    pub fn has_loaded_once(&self) -> bool {
        self.state.read().has_loaded_once
    }

    /// Full snapshot.
    pub fn state(&self) -> LazyLoadState<T> {
        self.state.read().clone()
    }

    /// Manually triggers the producer; a no-op while a call is in flight.
    pub fn load(&self) {
        self.loader.load();
    }

    /// Clears data, error, loading and intersection flags and cancels a
    /// pending delayed invocation.
    pub fn reset(&self) {
        self.loader.reset();
    }

    /// Feed a visibility transition in from the region this handle is
    /// attached to.
    pub fn set_intersecting(&self, intersecting: bool) {
        self.loader.set_intersecting(intersecting);
    }

    /// Observation geometry for the caller to pass to its intersection
    /// primitive.
    pub fn options(&self) -> LazyLoadOptions {
        self.loader.options().clone()
    }
}

/// Hook deferring `producer` until the attached region becomes visible (or
/// running it immediately, per `options`).
pub fn use_lazy_load<T, E, F, Fut>(producer: F, options: LazyLoadOptions) -> UseLazyLoad<T>
where
    T: Clone + Send + Sync + 'static,
    E: Display,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let state = use_signal(LazyLoadState::default);

    let loader = use_hook(|| {
        let loader = LazyLoader::new(producer, options);

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
        move || loader.teardown()
    });

    UseLazyLoad { state, loader }
}
