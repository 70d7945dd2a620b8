pub mod coerce;
pub mod convert;
pub mod metrics;
pub mod normalize;

pub use convert::CurrencyConverter;
pub use normalize::{normalize_source, SourceChunk};
