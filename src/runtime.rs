//! Shared runtime components that back the loading engine.
//!
//! This module lets us manage the result cache and idle-scheduler handles
//! that every loader instance in the process shares from one place.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    cache::ResultCache,
    idle::{DeferredIdleScheduler, IdleSchedule, YieldIdleScheduler},
    progressive::LoaderConfig,
};

/// Configuration for the pulse runtime.
#[derive(Clone)]
pub struct PulseRuntimeConfig {
    loader: LoaderConfig,
    idle: Arc<dyn IdleSchedule>,
}

impl PulseRuntimeConfig {
    /// Creates a new config with default loader tuning and the cooperative
    /// idle scheduler.
    pub fn new() -> Self {
        Self {
            loader: LoaderConfig::default(),
            idle: Arc::new(YieldIdleScheduler::default()),
        }
    }

    /// Selects the fixed-delay fallback scheduler for environments without a
    /// usable idle signal.
    pub fn with_deferred_idle(mut self, delay: Duration) -> Self {
        self.idle = Arc::new(DeferredIdleScheduler { delay });
        self
    }

    /// Supplies a custom idle scheduler.
    pub fn with_idle_scheduler(mut self, idle: Arc<dyn IdleSchedule>) -> Self {
        self.idle = idle;
        self
    }

    /// Overrides the loader tuning (cache TTL, retry budgets, idle deadline).
    pub fn with_loader_config(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    pub(crate) fn into_parts(self) -> (LoaderConfig, Arc<dyn IdleSchedule>) {
        (self.loader, self.idle)
    }
}

impl Default for PulseRuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Central runtime that holds onto core singletons.
#[derive(Clone)]
pub struct PulseRuntime {
    cache: ResultCache,
    idle: Arc<dyn IdleSchedule>,
    loader_config: LoaderConfig,
}

/// Lightweight clones of the runtime handles for consumer code.
#[derive(Clone)]
pub struct PulseRuntimeHandles {
    pub cache: ResultCache,
    pub idle: Arc<dyn IdleSchedule>,
    pub loader_config: LoaderConfig,
}

impl PulseRuntime {
    /// Constructs a new runtime instance using the provided configuration.
    pub fn new(config: PulseRuntimeConfig) -> Self {
        let (loader_config, idle) = config.into_parts();
        Self {
            cache: ResultCache::new(),
            idle,
            loader_config,
        }
    }

    /// Access the cache handle.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Access the idle scheduler handle.
    pub fn idle_scheduler(&self) -> &Arc<dyn IdleSchedule> {
        &self.idle
    }

    /// Access the loader tuning.
    pub fn loader_config(&self) -> &LoaderConfig {
        &self.loader_config
    }

    /// Cloned handles for cache, idle scheduler and loader tuning.
    pub fn handles(&self) -> PulseRuntimeHandles {
        PulseRuntimeHandles {
            cache: self.cache.clone(),
            idle: self.idle.clone(),
            loader_config: self.loader_config.clone(),
        }
    }
}
