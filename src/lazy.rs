//! Viewport-driven lazy loading.
//!
//! [`LazyLoader`] defers an arbitrary async producer until an observed region
//! becomes visible (or runs it immediately when configured to), with an
//! optional settle delay, single-flight execution and hard teardown
//! semantics. It is independent of the staged pipeline and reusable for any
//! below-the-fold fetch: secondary dashboard panels, expanded rows, charts.
//!
//! The environment's intersection primitive stays outside this module: the
//! consumer observes its region however the platform allows and feeds
//! transitions in through [`LazyLoader::set_intersecting`]. Observation
//! geometry ([`LazyLoadOptions::root_margin`], [`LazyLoadOptions::threshold`])
//! is carried here only to be passed through to that primitive unchanged.

use std::future::Future;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::errors::LoadError;
use crate::platform;

/// Observation and invocation policy for one [`LazyLoader`].
#[derive(Debug, Clone, PartialEq)]
pub struct LazyLoadOptions {
    /// Invoke the producer on creation instead of waiting for visibility.
    pub load_immediately: bool,
    /// Re-invoke on every not-visible → visible transition instead of at
    /// most once per instance lifetime. Re-triggered loads overwrite `data`.
    pub continuous: bool,
    /// Settle delay between becoming visible and invoking the producer.
    /// Leaving the viewport before it elapses cancels the pending invocation.
    pub delay: Duration,
    /// Observation root (a selector), passed through to the observation
    /// primitive unchanged. `None` observes against the viewport.
    pub root: Option<String>,
    /// Margin passed through to the observation primitive unchanged.
    pub root_margin: String,
    /// Threshold passed through to the observation primitive unchanged.
    pub threshold: f64,
}

impl Default for LazyLoadOptions {
    fn default() -> Self {
        Self {
            load_immediately: false,
            continuous: false,
            delay: Duration::ZERO,
            root: None,
            root_margin: "100px".to_string(),
            threshold: 0.1,
        }
    }
}

/// Snapshot of one lazy-loader instance.
#[derive(Debug, Clone)]
pub struct LazyLoadState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<LoadError>,
    pub is_intersecting: bool,
    pub has_loaded_once: bool,
}

impl<T> Default for LazyLoadState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
            is_intersecting: false,
            has_loaded_once: false,
        }
    }
}

type Producer<T> = dyn Fn() -> BoxFuture<'static, Result<T, LoadError>> + Send + Sync;

struct LazyInner<T> {
    producer: Box<Producer<T>>,
    options: LazyLoadOptions,
    state: watch::Sender<LazyLoadState<T>>,
    in_flight: AtomicBool,
    pending_delay: Mutex<Option<CancellationToken>>,
    teardown: CancellationToken,
}

/// Cheap-clone handle driving one lazy-loaded region.
pub struct LazyLoader<T> {
    inner: Arc<LazyInner<T>>,
}

impl<T> Clone for LazyLoader<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> LazyLoader<T> {
    /// Creates a loader around `producer`. Errors of any displayable type are
    /// coerced into the uniform [`LoadError`].
    ///
    /// With `load_immediately` set, the producer is invoked right away and
    /// intersection transitions are not required.
    pub fn new<F, Fut, E>(producer: F, options: LazyLoadOptions) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: std::fmt::Display,
    {
        let boxed: Box<Producer<T>> = Box::new(move || {
            let fut = producer();
            Box::pin(async move { fut.await.map_err(|err| LoadError::new(err.to_string())) })
        });
        let (state, _) = watch::channel(LazyLoadState::default());
        let loader = Self {
            inner: Arc::new(LazyInner {
                producer: boxed,
                options,
                state,
                in_flight: AtomicBool::new(false),
                pending_delay: Mutex::new(None),
                teardown: CancellationToken::new(),
            }),
        };
        if loader.inner.options.load_immediately {
            loader.trigger_load();
        }
        loader
    }

    /// Subscribes to state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<LazyLoadState<T>> {
        self.inner.state.subscribe()
    }

    /// Current snapshot.
    pub fn state(&self) -> LazyLoadState<T> {
        self.inner.state.borrow().clone()
    }

    /// Observation policy this loader was built with, for the caller to hand
    /// to its intersection primitive.
    pub fn options(&self) -> &LazyLoadOptions {
        &self.inner.options
    }

    /// Feeds a visibility transition in from the environment's intersection
    /// primitive.
    ///
    /// A rising edge arms the producer (after the configured settle delay); a
    /// falling edge cancels a pending delayed invocation but leaves an
    /// already-running producer alone.
    pub fn set_intersecting(&self, intersecting: bool) {
        if self.inner.teardown.is_cancelled() {
            return;
        }
        let was_intersecting = self.inner.state.borrow().is_intersecting;
        self.inner
            .state
            .send_modify(|state| state.is_intersecting = intersecting);

        if intersecting && !was_intersecting {
            self.on_enter_viewport();
        } else if !intersecting && was_intersecting {
            self.cancel_pending_delay();
        }
    }

    /// Manually triggers the producer, bypassing observation. A no-op while a
    /// call is already in flight; nothing is queued.
    pub fn load(&self) {
        self.trigger_load();
    }

    /// Clears `data`, `error`, `is_loading` and `is_intersecting` back to
    /// their initial values and cancels a pending delayed invocation. Does
    /// not re-issue a load.
    pub fn reset(&self) {
        self.cancel_pending_delay();
        if self.inner.teardown.is_cancelled() {
            return;
        }
        self.inner.state.send_modify(|state| {
            state.data = None;
            state.error = None;
            state.is_loading = false;
            state.is_intersecting = false;
        });
    }

    /// Detaches the loader from its consumer: cancels pending delayed work
    /// and silences any in-flight producer. No state mutation happens after
    /// this returns, even when an in-flight producer later resolves.
    pub fn teardown(&self) {
        self.cancel_pending_delay();
        self.inner.teardown.cancel();
    }

    fn on_enter_viewport(&self) {
        let has_loaded_once = self.inner.state.borrow().has_loaded_once;
        if has_loaded_once && !self.inner.options.continuous {
            return;
        }

        let delay = self.inner.options.delay;
        if delay.is_zero() {
            self.trigger_load();
            return;
        }

        let token = CancellationToken::new();
        if let Ok(mut pending) = self.inner.pending_delay.lock() {
            if let Some(previous) = pending.replace(token.clone()) {
                previous.cancel();
            }
        }
        let loader = self.clone();
        platform::task::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = platform::sleep(delay) => {
                    loader.trigger_load();
                }
            }
        });
    }

    fn trigger_load(&self) {
        if self.inner.teardown.is_cancelled() {
            return;
        }
        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            crate::debug_log!("lazy load already in flight, ignoring trigger");
            return;
        }

        self.inner.state.send_modify(|state| state.is_loading = true);
        let loader = self.clone();
        platform::task::spawn(async move {
            let result = (loader.inner.producer)().await;
            if loader.inner.teardown.is_cancelled() {
                // The owning consumer is gone; drop the result on the floor.
                loader.inner.in_flight.store(false, Ordering::SeqCst);
                return;
            }
            loader.inner.state.send_modify(|state| {
                match result {
                    Ok(value) => {
                        state.data = Some(value);
                        state.error = None;
                    }
                    Err(error) => {
                        state.error = Some(error);
                    }
                }
                state.is_loading = false;
                state.has_loaded_once = true;
            });
            loader.inner.in_flight.store(false, Ordering::SeqCst);
        });
    }

    fn cancel_pending_delay(&self) {
        if let Ok(mut pending) = self.inner.pending_delay.lock() {
            if let Some(token) = pending.take() {
                token.cancel();
            }
        }
    }
}
