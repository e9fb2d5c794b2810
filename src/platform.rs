//! Platform-specific primitives shared across the crate.
//!
//! Native targets run on tokio; wasm targets swap in `web-time` for monotonic
//! clocks and `wasmtimer` for sleeps, matching the dependency split in
//! `Cargo.toml`.

use std::time::Duration;

// Platform-specific time imports
#[cfg(not(target_family = "wasm"))]
pub use std::time::Instant;
#[cfg(target_family = "wasm")]
pub use web_time::Instant;

/// Default time-to-live for cached query results.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Default deadline handed to the idle scheduler for enhancement work.
pub const DEFAULT_IDLE_DEADLINE: Duration = Duration::from_secs(2);

/// Sleep on the platform timer.
#[cfg(not(target_family = "wasm"))]
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Sleep on the platform timer.
#[cfg(target_family = "wasm")]
pub async fn sleep(duration: Duration) {
    wasmtimer::tokio::sleep(duration).await;
}

pub mod task {
    /// Spawn a background task on the platform executor.
    #[cfg(not(target_family = "wasm"))]
    pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: std::future::Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(future)
    }

    /// Spawn a background task on the platform executor.
    #[cfg(target_family = "wasm")]
    pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: std::future::Future + 'static,
        F::Output: 'static,
    {
        tokio::task::spawn_local(future)
    }
}
