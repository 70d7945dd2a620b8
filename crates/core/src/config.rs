use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

/// Location of the read-only upstream data service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// Knobs consumed by the normalizer and derived-metrics engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Local-currency units per foreign-currency unit, applied once to every
    /// monetary field at normalization. Changing it requires a restart and a
    /// full re-fetch; cached values are never patched.
    #[serde(default = "default_currency_rate")]
    pub currency_rate: Decimal,
    /// Fallback half-width ratio for confidence bands when a model supplies
    /// no uncertainty estimate of its own.
    #[serde(default = "default_band_ratio")]
    pub band_ratio: f64,
    /// Trailing number of daily returns used for the volatility estimate.
    #[serde(default = "default_volatility_window")]
    pub volatility_window: usize,
}

/// Per-view refresh timing and the symbol catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_currency_rate() -> Decimal {
    // GBP -> INR
    Decimal::from(105)
}

const fn default_band_ratio() -> f64 {
    0.05 // +/- 5%
}

const fn default_volatility_window() -> usize {
    30
}

const fn default_interval_secs() -> u64 {
    30
}

fn default_symbols() -> Vec<String> {
    [
        "Airtel_Africa",
        "AstraZeneca",
        "BAE_Systems",
        "HSBC_Holdings",
        "Lloyds_Banking_Group",
        "National_Grid",
        "Tesco",
        "Unilever",
        "Vodafone_Group",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            currency_rate: default_currency_rate(),
            band_ratio: default_band_ratio(),
            volatility_window: default_volatility_window(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            symbols: default_symbols(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.currency_rate, Decimal::from(105));
        assert!((config.pipeline.band_ratio - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.pipeline.volatility_window, 30);
        assert_eq!(config.refresh.symbols.len(), 9);
    }
}
