//! Canonical record shapes produced by the normalizer.
//!
//! Every upstream source is reduced to one of these types before any view or
//! derived-metric code sees it. Monetary fields are already currency-converted
//! at this point; downstream consumers must never re-convert.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV bar for the index, oldest-first within a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl PriceBar {
    /// Returns true if the OHLC ordering invariant holds and volume is
    /// non-negative. Bars that fail this check are dropped at normalization.
    #[must_use]
    pub fn is_coherent(&self) -> bool {
        self.low <= self.open
            && self.low <= self.close
            && self.low <= self.high
            && self.high >= self.open
            && self.high >= self.close
            && self.volume >= Decimal::ZERO
    }
}

/// One row of the rolling forecast series. Historical rows carry `actual`,
/// future rows carry predictions; back-tested rows may carry both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub actual: Option<Decimal>,
    pub vqc_prediction: Option<Decimal>,
    pub svm_prediction: Option<Decimal>,
}

impl ForecastRow {
    /// True when both an actual price and the quantum prediction are present,
    /// i.e. an error metric is computable for this row.
    #[must_use]
    pub const fn is_backtested(&self) -> bool {
        self.actual.is_some() && self.vqc_prediction.is_some()
    }
}

/// Classification-quality summary for one tracked model.
/// Present figures are percentages in [0, 100]; a figure the upstream
/// source did not report stays `None` rather than reading as 0%.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScorecard {
    pub model: String,
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1_score: Option<f64>,
}

impl ModelScorecard {
    /// Case-insensitive substring match against a canonical identifier
    /// (e.g. "VQC", "SVM", "IBM").
    #[must_use]
    pub fn matches(&self, ident: &str) -> bool {
        self.model.to_lowercase().contains(&ident.to_lowercase())
    }
}

/// Finds the scorecard whose model name contains the given identifier.
#[must_use]
pub fn find_model<'a>(cards: &'a [ModelScorecard], ident: &str) -> Option<&'a ModelScorecard> {
    cards.iter().find(|c| c.matches(ident))
}

/// A passthrough circuit-metric value: number if it parses as one, raw text
/// otherwise. Unknown keys must render without crashing anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

/// Quantum-circuit metadata: a fixed required subset plus opaque extras kept
/// in upstream order for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitMetrics {
    pub circuit_depth: f64,
    pub qubits: f64,
    pub reps: f64,
    pub entanglement: String,
    pub depth: f64,
    pub extra: Vec<(String, MetricValue)>,
}

/// Direction of a derived trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

/// A trading signal with its normalized confidence score.
///
/// Always derived fresh from the latest forecast row; never cached across
/// refresh cycles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedSignal {
    pub action: SignalAction,
    /// Normalized confidence in [0, 1].
    pub confidence: f64,
}

/// The [lower, upper] uncertainty interval around a point prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub lower: Decimal,
    pub upper: Decimal,
}

/// Day-over-day change between the last two defined samples of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayDelta {
    pub delta: Decimal,
    pub percent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            open,
            high,
            low,
            close,
            volume: dec!(1000),
        }
    }

    #[test]
    fn coherent_bar_passes() {
        assert!(bar(dec!(100), dec!(105), dec!(98), dec!(103)).is_coherent());
    }

    #[test]
    fn inverted_range_fails() {
        assert!(!bar(dec!(100), dec!(98), dec!(105), dec!(103)).is_coherent());
    }

    #[test]
    fn negative_volume_fails() {
        let mut b = bar(dec!(100), dec!(105), dec!(98), dec!(103));
        b.volume = dec!(-1);
        assert!(!b.is_coherent());
    }

    #[test]
    fn model_lookup_is_case_insensitive_substring() {
        let cards = vec![
            ModelScorecard {
                model: "Quantum VQC (simulator)".to_string(),
                accuracy: Some(66.0),
                precision: Some(64.0),
                recall: Some(65.0),
                f1_score: Some(64.5),
            },
            ModelScorecard {
                model: "Classical SVM".to_string(),
                accuracy: Some(52.0),
                precision: Some(51.0),
                recall: Some(50.0),
                f1_score: None,
            },
        ];
        assert_eq!(find_model(&cards, "vqc").unwrap().accuracy, Some(66.0));
        assert_eq!(find_model(&cards, "SVM").unwrap().accuracy, Some(52.0));
        assert!(find_model(&cards, "IBM").is_none());
    }
}
