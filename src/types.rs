//! Common trait bounds used throughout dioxus-repo-pulse

/// Common trait bounds for derived-metric payloads
pub trait MetricBounds: Clone + PartialEq + Send + Sync + 'static {}
impl<T> MetricBounds for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// Common trait bounds for enhancement payloads
pub trait EnhancementBounds: Clone + PartialEq + Send + Sync + 'static {}
impl<T> EnhancementBounds for T where T: Clone + PartialEq + Send + Sync + 'static {}
