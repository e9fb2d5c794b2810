//! # Global runtime management
//!
//! This module provides the global singleton for the result cache and idle
//! scheduler, operating at application scale rather than component lifecycle
//! scale. Hooks resolve their handles from here; non-hook consumers can
//! construct a [`PulseRuntime`] directly instead.

use std::sync::OnceLock;

use crate::runtime::{PulseRuntime, PulseRuntimeConfig, PulseRuntimeHandles};

/// Error type for global runtime operations
#[derive(Debug, thiserror::Error)]
pub enum GlobalPulseError {
    #[error("Global runtime not initialized. Call dioxus_repo_pulse::init() first.")]
    NotInitialized,
}

/// Global singleton instance of the pulse runtime
static GLOBAL_RUNTIME: OnceLock<PulseRuntime> = OnceLock::new();

/// Initialize the global runtime with default configuration.
///
/// This is the recommended way to initialize dioxus-repo-pulse. Call it once
/// at application startup, before any component uses the hooks.
///
/// ## Example
///
/// ```rust,no_run
/// use dioxus::prelude::*;
/// use dioxus_repo_pulse::global::init;
///
/// fn main() {
///     init().expect("runtime initialization");
///     dioxus::launch(app);
/// }
///
/// #[component]
/// fn app() -> Element {
///     rsx! {
///         div { "Hello World!" }
///     }
/// }
/// ```
pub fn init() -> Result<(), GlobalPulseError> {
    init_with(PulseRuntimeConfig::new())
}

/// Initialize the global runtime with a custom configuration.
///
/// A second call is a no-op that keeps the first runtime; this mirrors how
/// application entry points are commonly re-entered in tests.
pub fn init_with(config: PulseRuntimeConfig) -> Result<(), GlobalPulseError> {
    GLOBAL_RUNTIME.get_or_init(|| PulseRuntime::new(config));
    Ok(())
}

/// Get the global runtime instance.
///
/// ## Errors
///
/// Returns `GlobalPulseError::NotInitialized` if `init()` has not been called yet.
pub fn get_global_runtime() -> Result<&'static PulseRuntime, GlobalPulseError> {
    GLOBAL_RUNTIME.get().ok_or(GlobalPulseError::NotInitialized)
}

/// Get cloned handles (cache, idle scheduler, loader tuning) from the global
/// runtime.
///
/// ## Errors
///
/// Returns `GlobalPulseError::NotInitialized` if `init()` has not been called yet.
pub fn get_global_runtime_handles() -> Result<PulseRuntimeHandles, GlobalPulseError> {
    Ok(get_global_runtime()?.handles())
}

/// Check whether the global runtime has been initialized
pub fn is_initialized() -> bool {
    GLOBAL_RUNTIME.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init().unwrap();
        assert!(is_initialized());

        let first = get_global_runtime().unwrap() as *const PulseRuntime;
        // A second init keeps the first runtime.
        init_with(PulseRuntimeConfig::new()).unwrap();
        let second = get_global_runtime().unwrap() as *const PulseRuntime;
        assert_eq!(first, second);
    }

    #[test]
    fn handles_share_the_cache() {
        init().unwrap();
        let handles = get_global_runtime_handles().unwrap();
        handles.cache.set("probe".to_string(), 1u32);
        assert_eq!(
            get_global_runtime().unwrap().cache().get::<u32>("probe"),
            Some(1)
        );
    }
}
