use crate::snapshot::ViewSnapshot;
use quant_dash_core::traits::SourceKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum ViewCommand {
    /// Starts a refresh cycle now, unless one is already in flight
    /// (suppressed, not queued).
    Refresh,
    GetSnapshot(oneshot::Sender<Arc<ViewSnapshot>>),
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    pub view_id: String,
    /// Symbol for the per-symbol forecast source; `None` means the
    /// index-wide series.
    #[serde(default)]
    pub symbol: Option<String>,
    /// The sources this view fetches each cycle.
    pub sources: Vec<SourceKind>,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

const fn default_refresh_interval_secs() -> u64 {
    30
}

impl ViewConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Aggregate refresh state of a view.
///
/// `Idle -> Fetching -> {Ready | PartiallyFailed | Failed}` each cycle.
/// `Failed` only ever occurs when every source failed and no previous
/// snapshot exists to fall back on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewState {
    Idle,
    Fetching,
    Ready,
    PartiallyFailed,
    Failed,
}
