use crate::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The enumerable upstream sources a view can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    IndexHistory,
    Forecast,
    ModelScorecards,
    CircuitMetrics,
    LastUpdate,
}

impl SourceKind {
    /// Stable name used in logs and stale-source annotations.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IndexHistory => "index_history",
            Self::Forecast => "forecast",
            Self::ModelScorecards => "model_scorecards",
            Self::CircuitMetrics => "circuit_metrics",
            Self::LastUpdate => "last_update",
        }
    }
}

/// Transport seam between the orchestrator and the data service.
///
/// Implementations issue idempotent GETs only; the symbol is meaningful for
/// `SourceKind::Forecast` and ignored elsewhere.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(
        &self,
        kind: SourceKind,
        symbol: Option<&str>,
    ) -> Result<serde_json::Value, FetchError>;
}
