pub mod config;
pub mod config_loader;
pub mod domain;
pub mod error;
pub mod traits;

pub use config::{AppConfig, PipelineConfig, RefreshConfig, ServiceConfig};
pub use config_loader::ConfigLoader;
pub use domain::{
    find_model, CircuitMetrics, ConfidenceBand, DayDelta, DerivedSignal, ForecastRow, MetricValue,
    ModelScorecard, PriceBar, SignalAction,
};
pub use error::{FetchError, SchemaError, SourceError};
pub use traits::{SourceFetcher, SourceKind};
