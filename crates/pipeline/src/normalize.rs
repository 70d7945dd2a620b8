//! Schema normalizer: arbitrary upstream row shapes into canonical records.
//!
//! Field names drift between sources (`Date` vs `date` vs `timestamp`, CSV
//! export artifacts like `Price` holding the date column), so every canonical
//! field resolves through a prioritized alias table. The tables below are the
//! module's only growth point; nothing else should special-case an upstream
//! key.
//!
//! Currency conversion happens here, on raw values only, so canonical records
//! can never be converted twice.

use crate::coerce::{coerce_date, coerce_decimal, coerce_f64, coerce_string};
use crate::convert::CurrencyConverter;
use quant_dash_core::config::PipelineConfig;
use quant_dash_core::domain::{
    CircuitMetrics, ForecastRow, MetricValue, ModelScorecard, PriceBar,
};
use quant_dash_core::error::SchemaError;
use quant_dash_core::traits::SourceKind;
use serde_json::{Map, Value};

const DATE_ALIASES: &[&str] = &["Date", "date", "timestamp", "Price"];
const OPEN_ALIASES: &[&str] = &["Open", "open"];
const HIGH_ALIASES: &[&str] = &["High", "high"];
const LOW_ALIASES: &[&str] = &["Low", "low"];
const CLOSE_ALIASES: &[&str] = &["Close", "close"];
const VOLUME_ALIASES: &[&str] = &["Volume", "volume"];

const ACTUAL_ALIASES: &[&str] = &["actual", "Close", "close"];
const VQC_ALIASES: &[&str] = &["vqc_prediction", "VQC_Prediction", "vqc"];
const SVM_ALIASES: &[&str] = &["svm_prediction", "SVM_Prediction", "svm"];

const MODEL_ALIASES: &[&str] = &["model", "Model", "model_name"];
const F1_ALIASES: &[&str] = &["f1Score", "f1_score", "f1"];

const LAST_UPDATE_ALIASES: &[&str] = &["readable", "last_update", "timestamp"];

const REQUIRED_CIRCUIT_KEYS: &[&str] = &["circuit_depth", "qubits", "reps", "entanglement", "depth"];

/// Normalized output of one source fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceChunk {
    Bars(Vec<PriceBar>),
    Forecast(Vec<ForecastRow>),
    Scorecards(Vec<ModelScorecard>),
    Circuit(CircuitMetrics),
    LastUpdate(String),
}

/// Normalizes one raw payload into the canonical shape for its source.
///
/// An empty upstream array yields an empty chunk; a non-empty array whose
/// rows all lack the identity field is a [`SchemaError`].
///
/// # Errors
/// Returns [`SchemaError`] when the payload has the wrong JSON shape or no
/// row can be normalized.
pub fn normalize_source(
    kind: SourceKind,
    payload: &Value,
    config: &PipelineConfig,
) -> Result<SourceChunk, SchemaError> {
    let converter = CurrencyConverter::new(config.currency_rate);
    match kind {
        SourceKind::IndexHistory => {
            let bars = normalize_rows(payload, "date", |row| normalize_price_bar(row, &converter))?;
            Ok(SourceChunk::Bars(bars))
        }
        SourceKind::Forecast => {
            let rows =
                normalize_rows(payload, "date", |row| normalize_forecast_row(row, &converter))?;
            Ok(SourceChunk::Forecast(rows))
        }
        SourceKind::ModelScorecards => {
            let cards = normalize_rows(payload, "model", normalize_scorecard)?;
            Ok(SourceChunk::Scorecards(cards))
        }
        SourceKind::CircuitMetrics => {
            let object = payload
                .as_object()
                .ok_or_else(|| SchemaError::NotObject(json_kind(payload)))?;
            Ok(SourceChunk::Circuit(normalize_circuit_metrics(object)?))
        }
        SourceKind::LastUpdate => {
            let object = payload
                .as_object()
                .ok_or_else(|| SchemaError::NotObject(json_kind(payload)))?;
            let stamp = resolve(object, LAST_UPDATE_ALIASES)
                .and_then(coerce_string)
                .ok_or(SchemaError::MissingIdentity("readable"))?;
            Ok(SourceChunk::LastUpdate(stamp))
        }
    }
}

/// Maps an array payload row-by-row, dropping rows the mapper rejects.
/// Upstream order is preserved; no sorting is performed.
fn normalize_rows<T>(
    payload: &Value,
    identity: &'static str,
    mut map_row: impl FnMut(&Map<String, Value>) -> Option<T>,
) -> Result<Vec<T>, SchemaError> {
    let rows = payload
        .as_array()
        .ok_or_else(|| SchemaError::NotRows(json_kind(payload)))?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(object) = row.as_object() else {
            tracing::debug!("dropped non-object row");
            continue;
        };
        match map_row(object) {
            Some(record) => out.push(record),
            None => tracing::debug!("dropped row missing `{identity}` or required fields"),
        }
    }
    if out.is_empty() && !rows.is_empty() {
        return Err(SchemaError::MissingIdentity(identity));
    }
    Ok(out)
}

/// First alias present and usable wins: `null` and empty strings count as
/// absent.
fn resolve<'a>(row: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    for alias in aliases {
        match row.get(*alias) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) if s.trim().is_empty() => continue,
            Some(value) => return Some(value),
        }
    }
    None
}

fn monetary(
    row: &Map<String, Value>,
    aliases: &[&str],
    converter: &CurrencyConverter,
) -> Option<rust_decimal::Decimal> {
    converter.apply_opt(resolve(row, aliases).and_then(coerce_decimal))
}

/// Drops the row when the date or any OHLC field is missing or unparseable,
/// or when the resulting bar violates the OHLC ordering invariant. A missing
/// volume is zero (genuinely absent in some index rows), not a drop.
fn normalize_price_bar(row: &Map<String, Value>, converter: &CurrencyConverter) -> Option<PriceBar> {
    let bar = PriceBar {
        date: resolve(row, DATE_ALIASES).and_then(coerce_date)?,
        open: monetary(row, OPEN_ALIASES, converter)?,
        high: monetary(row, HIGH_ALIASES, converter)?,
        low: monetary(row, LOW_ALIASES, converter)?,
        close: monetary(row, CLOSE_ALIASES, converter)?,
        volume: resolve(row, VOLUME_ALIASES)
            .and_then(coerce_decimal)
            .unwrap_or_default(),
    };
    bar.is_coherent().then_some(bar)
}

fn normalize_forecast_row(
    row: &Map<String, Value>,
    converter: &CurrencyConverter,
) -> Option<ForecastRow> {
    Some(ForecastRow {
        date: resolve(row, DATE_ALIASES).and_then(coerce_date)?,
        actual: monetary(row, ACTUAL_ALIASES, converter),
        vqc_prediction: monetary(row, VQC_ALIASES, converter),
        svm_prediction: monetary(row, SVM_ALIASES, converter),
    })
}

/// Percentages are clamped into [0, 100]; an absent or unparseable metric
/// stays `None` so a missing figure never renders as a 0% score.
fn normalize_scorecard(row: &Map<String, Value>) -> Option<ModelScorecard> {
    let percentage = |aliases: &[&str]| {
        resolve(row, aliases)
            .and_then(coerce_f64)
            .map(|v| v.clamp(0.0, 100.0))
    };
    Some(ModelScorecard {
        model: resolve(row, MODEL_ALIASES).and_then(coerce_string)?,
        accuracy: percentage(&["accuracy"]),
        precision: percentage(&["precision"]),
        recall: percentage(&["recall"]),
        f1_score: percentage(F1_ALIASES),
    })
}

/// The required subset is pulled by exact key; every other key passes through
/// opaquely, in upstream order, as number-or-text.
fn normalize_circuit_metrics(object: &Map<String, Value>) -> Result<CircuitMetrics, SchemaError> {
    let required_number = |key: &'static str| {
        object
            .get(key)
            .and_then(coerce_f64)
            .ok_or(SchemaError::MissingMetric(key))
    };
    let entanglement = object
        .get("entanglement")
        .and_then(coerce_string)
        .ok_or(SchemaError::MissingMetric("entanglement"))?;

    let extra = object
        .iter()
        .filter(|(key, _)| !REQUIRED_CIRCUIT_KEYS.contains(&key.as_str()))
        .map(|(key, value)| {
            let metric = coerce_f64(value).map_or_else(
                || MetricValue::Text(coerce_string(value).unwrap_or_else(|| value.to_string())),
                MetricValue::Number,
            );
            (key.clone(), metric)
        })
        .collect();

    Ok(CircuitMetrics {
        circuit_depth: required_number("circuit_depth")?,
        qubits: required_number("qubits")?,
        reps: required_number("reps")?,
        entanglement,
        depth: required_number("depth")?,
        extra,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn price_bar_aliases_and_conversion() {
        let payload = json!([
            { "Date": "2025-01-02", "Open": 74.0, "High": 76.0, "Low": 73.0,
              "Close": "75.0", "Volume": 1_200_000 },
            { "date": "2025-01-03", "open": 75.0, "high": 77.0, "low": 74.5,
              "close": 76.5, "volume": 900_000 }
        ]);
        let chunk = normalize_source(SourceKind::IndexHistory, &payload, &config()).unwrap();
        let SourceChunk::Bars(bars) = chunk else {
            panic!("expected bars");
        };
        assert_eq!(bars.len(), 2);
        // 75.0 GBP * 105 = 7875 local
        assert_eq!(bars[0].close, dec!(7875.0));
        assert_eq!(bars[0].volume, dec!(1200000));
        assert_eq!(bars[1].close, dec!(8032.5));
        for bar in &bars {
            assert!(bar.is_coherent());
        }
    }

    #[test]
    fn price_bar_date_can_hide_in_price_column() {
        let payload = json!([
            { "Price": "2025-01-02", "Open": 1.0, "High": 2.0, "Low": 0.5, "Close": 1.5 }
        ]);
        let chunk = normalize_source(SourceKind::IndexHistory, &payload, &config()).unwrap();
        let SourceChunk::Bars(bars) = chunk else {
            panic!("expected bars");
        };
        assert_eq!(bars[0].date, chrono::NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(bars[0].volume, rust_decimal::Decimal::ZERO);
    }

    #[test]
    fn rows_without_any_date_alias_are_dropped() {
        let payload = json!([
            { "Date": "2025-01-02", "Open": 1.0, "High": 2.0, "Low": 0.5, "Close": 1.5 },
            { "Open": 1.0, "High": 2.0, "Low": 0.5, "Close": 1.5 },
            { "Date": null, "Open": 1.0, "High": 2.0, "Low": 0.5, "Close": 1.5 }
        ]);
        let chunk = normalize_source(SourceKind::IndexHistory, &payload, &config()).unwrap();
        let SourceChunk::Bars(bars) = chunk else {
            panic!("expected bars");
        };
        assert_eq!(bars.len(), 1);
    }

    #[test]
    fn incoherent_bars_are_dropped() {
        let payload = json!([
            { "Date": "2025-01-02", "Open": 1.0, "High": 2.0, "Low": 0.5, "Close": 1.5 },
            { "Date": "2025-01-03", "Open": 5.0, "High": 2.0, "Low": 3.0, "Close": 1.5 }
        ]);
        let chunk = normalize_source(SourceKind::IndexHistory, &payload, &config()).unwrap();
        let SourceChunk::Bars(bars) = chunk else {
            panic!("expected bars");
        };
        assert_eq!(bars.len(), 1);
    }

    #[test]
    fn all_rows_unusable_is_a_schema_error() {
        let payload = json!([
            { "Open": 1.0 },
            { "close": "not a number", "Date": "garbage" }
        ]);
        let err = normalize_source(SourceKind::IndexHistory, &payload, &config()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingIdentity("date")));
    }

    #[test]
    fn empty_array_is_an_empty_chunk_not_an_error() {
        let chunk = normalize_source(SourceKind::Forecast, &json!([]), &config()).unwrap();
        assert_eq!(chunk, SourceChunk::Forecast(vec![]));
    }

    #[test]
    fn wrong_shape_is_a_schema_error() {
        let err =
            normalize_source(SourceKind::IndexHistory, &json!({"rows": []}), &config()).unwrap_err();
        assert!(matches!(err, SchemaError::NotRows("object")));
    }

    #[test]
    fn forecast_rows_keep_nulls_as_none() {
        let payload = json!([
            { "date": "2025-01-02", "actual": 74.0, "vqc_prediction": null,
              "svm_prediction": null },
            { "date": "2025-01-03", "actual": null, "VQC_Prediction": 75.5, "svm": 75.2 }
        ]);
        let chunk = normalize_source(SourceKind::Forecast, &payload, &config()).unwrap();
        let SourceChunk::Forecast(rows) = chunk else {
            panic!("expected forecast rows");
        };
        assert_eq!(rows[0].actual, Some(dec!(7770.0)));
        assert_eq!(rows[0].vqc_prediction, None);
        assert_eq!(rows[1].actual, None);
        assert_eq!(rows[1].vqc_prediction, Some(dec!(7927.5)));
        assert_eq!(rows[1].svm_prediction, Some(dec!(7896.0)));
    }

    #[test]
    fn forecast_actual_falls_back_to_close() {
        let payload = json!([
            { "date": "2025-01-02", "Close": 74.0 }
        ]);
        let chunk = normalize_source(SourceKind::Forecast, &payload, &config()).unwrap();
        let SourceChunk::Forecast(rows) = chunk else {
            panic!("expected forecast rows");
        };
        assert_eq!(rows[0].actual, Some(dec!(7770.0)));
    }

    #[test]
    fn scorecards_clamp_percentages() {
        let payload = json!([
            { "model": "Quantum VQC", "accuracy": 87.3, "precision": "86.1",
              "recall": 85.0, "f1Score": 112.0 },
            { "model_name": "Classical SVM", "accuracy": -3.0 }
        ]);
        let chunk = normalize_source(SourceKind::ModelScorecards, &payload, &config()).unwrap();
        let SourceChunk::Scorecards(cards) = chunk else {
            panic!("expected scorecards");
        };
        assert_eq!(cards[0].f1_score, Some(100.0));
        assert_eq!(cards[0].precision, Some(86.1));
        assert_eq!(cards[1].accuracy, Some(0.0));
        assert_eq!(cards[1].model, "Classical SVM");
    }

    #[test]
    fn absent_scorecard_metrics_stay_absent() {
        let payload = json!([
            { "model": "Quantum VQC", "accuracy": 66.0, "recall": "n/a" }
        ]);
        let chunk = normalize_source(SourceKind::ModelScorecards, &payload, &config()).unwrap();
        let SourceChunk::Scorecards(cards) = chunk else {
            panic!("expected scorecards");
        };
        assert_eq!(cards[0].accuracy, Some(66.0));
        assert_eq!(cards[0].recall, None);
        assert_eq!(cards[0].precision, None);
        assert_eq!(cards[0].f1_score, None);
    }

    #[test]
    fn circuit_metrics_pass_unknown_keys_through_in_order() {
        let payload = json!({
            "circuit_depth": 12,
            "qubits": 4,
            "reps": 3,
            "entanglement": "full",
            "depth": 24,
            "total_gates": 96,
            "backend": "aer_simulator"
        });
        let chunk = normalize_source(SourceKind::CircuitMetrics, &payload, &config()).unwrap();
        let SourceChunk::Circuit(metrics) = chunk else {
            panic!("expected circuit metrics");
        };
        assert_eq!(metrics.qubits, 4.0);
        assert_eq!(metrics.entanglement, "full");
        assert_eq!(
            metrics.extra,
            vec![
                ("total_gates".to_string(), MetricValue::Number(96.0)),
                ("backend".to_string(), MetricValue::Text("aer_simulator".to_string())),
            ]
        );
    }

    #[test]
    fn circuit_metrics_missing_required_key_fails() {
        let payload = json!({ "qubits": 4, "reps": 3, "entanglement": "full", "depth": 24 });
        let err = normalize_source(SourceKind::CircuitMetrics, &payload, &config()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingMetric("circuit_depth")));
    }

    #[test]
    fn last_update_reads_readable_field() {
        let payload = json!({ "readable": "2025-03-14 16:30 GMT" });
        let chunk = normalize_source(SourceKind::LastUpdate, &payload, &config()).unwrap();
        assert_eq!(chunk, SourceChunk::LastUpdate("2025-03-14 16:30 GMT".to_string()));
    }

    #[test]
    fn conversion_overflow_drops_the_row_instead_of_panicking() {
        // 7e28 parses fine on its own but overflows once multiplied by the
        // rate; the field reads as missing and the row is dropped with it.
        let payload = json!([
            { "Date": "2025-01-02", "Open": 1.0, "High": "7e28", "Low": 0.5, "Close": 1.5 },
            { "Date": "2025-01-03", "Open": 1.0, "High": 2.0, "Low": 0.5, "Close": 1.5 }
        ]);
        let chunk = normalize_source(SourceKind::IndexHistory, &payload, &config()).unwrap();
        let SourceChunk::Bars(bars) = chunk else {
            panic!("expected bars");
        };
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, chrono::NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
    }

    #[test]
    fn conversion_overflow_in_a_forecast_field_reads_as_null() {
        let payload = json!([
            { "date": "2025-01-02", "actual": 74.0, "vqc_prediction": "7e28" }
        ]);
        let chunk = normalize_source(SourceKind::Forecast, &payload, &config()).unwrap();
        let SourceChunk::Forecast(rows) = chunk else {
            panic!("expected forecast rows");
        };
        assert_eq!(rows[0].actual, Some(dec!(7770.0)));
        assert_eq!(rows[0].vqc_prediction, None);
    }

    #[test]
    fn conversion_is_applied_exactly_once_per_normalization() {
        let payload = json!([
            { "Date": "2025-01-02", "Open": 1.0, "High": 2.0, "Low": 0.5, "Close": 1.5 }
        ]);
        let first = normalize_source(SourceKind::IndexHistory, &payload, &config()).unwrap();
        let second = normalize_source(SourceKind::IndexHistory, &payload, &config()).unwrap();
        let SourceChunk::Bars(bars) = first else {
            panic!("expected bars");
        };
        // 1.5 * 105, not 1.5 * 105 * 105
        assert_eq!(bars[0].close, dec!(157.5));
        assert_eq!(second, SourceChunk::Bars(bars));
    }
}
