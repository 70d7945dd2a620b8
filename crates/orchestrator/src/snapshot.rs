//! Immutable per-view snapshots.
//!
//! A snapshot is built whole at the end of a refresh cycle and published by
//! replacing the previous `Arc` — a concurrently rendering consumer never
//! sees a half-updated view.

use crate::commands::ViewState;
use chrono::{DateTime, Utc};
use quant_dash_core::config::PipelineConfig;
use quant_dash_core::domain::{
    CircuitMetrics, ConfidenceBand, DayDelta, DerivedSignal, ForecastRow, ModelScorecard, PriceBar,
};
use quant_dash_pipeline::metrics;
use rust_decimal::Decimal;
use serde::Serialize;

/// One source's slot in a snapshot: fresh data, retained last-known-good
/// data flagged stale, or nothing (failure with no prior success).
#[derive(Debug, Clone, Serialize)]
pub struct SourcePane<T> {
    pub data: Option<T>,
    pub stale: bool,
    /// The most recent fetch failure for this source, if any.
    pub error: Option<String>,
}

impl<T> SourcePane<T> {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            data: None,
            stale: false,
            error: None,
        }
    }

    #[must_use]
    pub const fn fresh(data: T) -> Self {
        Self {
            data: Some(data),
            stale: false,
            error: None,
        }
    }

    /// Keeps the previous pane's data (flagged stale) after a failed fetch.
    #[must_use]
    pub fn carry_over(previous: &Self, error: String) -> Self
    where
        T: Clone,
    {
        Self {
            data: previous.data.clone(),
            stale: previous.data.is_some(),
            error: Some(error),
        }
    }

    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

impl<T> Default for SourcePane<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Headline figures recomputed from the panes after every cycle.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedView {
    pub current_price: Option<Decimal>,
    pub day_delta: Option<DayDelta>,
    pub volatility_pct: Option<f64>,
    pub signal: Option<DerivedSignal>,
    pub band: Option<ConfidenceBand>,
    pub aggregate_accuracy: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub view_id: String,
    pub state: ViewState,
    /// Monotonic count of completed refresh cycles.
    pub cycle: u64,
    pub fetched_at: DateTime<Utc>,
    pub bars: SourcePane<Vec<PriceBar>>,
    pub forecast: SourcePane<Vec<ForecastRow>>,
    pub scorecards: SourcePane<Vec<ModelScorecard>>,
    pub circuit: SourcePane<CircuitMetrics>,
    pub last_update: SourcePane<String>,
    pub derived: Option<DerivedView>,
}

impl ViewSnapshot {
    /// The pre-first-cycle snapshot: everything empty, state `Idle`.
    #[must_use]
    pub fn initial(view_id: String) -> Self {
        Self {
            view_id,
            state: ViewState::Idle,
            cycle: 0,
            fetched_at: Utc::now(),
            bars: SourcePane::empty(),
            forecast: SourcePane::empty(),
            scorecards: SourcePane::empty(),
            circuit: SourcePane::empty(),
            last_update: SourcePane::empty(),
            derived: None,
        }
    }

    /// True when any pane holds data (fresh or stale) to fall back on.
    #[must_use]
    pub const fn has_any_data(&self) -> bool {
        self.bars.has_data()
            || self.forecast.has_data()
            || self.scorecards.has_data()
            || self.circuit.has_data()
            || self.last_update.has_data()
    }

    /// Recomputes the headline figures from whatever the panes currently
    /// hold. Runs after every cycle; signals are never carried over.
    #[must_use]
    pub fn compute_derived(&self, config: &PipelineConfig) -> DerivedView {
        let closes: Vec<Option<Decimal>> = self
            .bars
            .data
            .iter()
            .flatten()
            .map(|bar| Some(bar.close))
            .collect();
        let actuals: Vec<Option<Decimal>> = self
            .forecast
            .data
            .iter()
            .flatten()
            .map(|row| row.actual)
            .collect();

        let latest_close = closes.iter().rev().find_map(|c| *c);
        let latest_actual = actuals.iter().rev().find_map(|a| *a);
        let current_price = latest_close.or(latest_actual);

        let day_delta = if closes.iter().any(Option::is_some) {
            metrics::day_over_day(&closes)
        } else {
            metrics::day_over_day(&actuals)
        };

        let volatility_pct = self.bars.data.as_deref().and_then(|bars| {
            let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
            metrics::volatility(&closes, config.volatility_window)
        });

        let latest_prediction = self
            .forecast
            .data
            .iter()
            .flatten()
            .rev()
            .find_map(|row| row.vqc_prediction);

        let reference_price = latest_actual.or(latest_close);
        let signal = latest_prediction.map(|prediction| {
            let action = metrics::trading_signal(reference_price, Some(prediction));
            let confidence = reference_price
                .map_or(0.0, |actual| metrics::row_confidence(actual, prediction));
            DerivedSignal { action, confidence }
        });

        let band = latest_prediction
            .map(|prediction| metrics::confidence_band(prediction, None, config.band_ratio));

        let aggregate_accuracy = self
            .forecast
            .data
            .as_deref()
            .and_then(metrics::aggregate_accuracy);

        DerivedView {
            current_price,
            day_delta,
            volatility_pct,
            signal,
            band,
            aggregate_accuracy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use quant_dash_core::domain::SignalAction;
    use rust_decimal_macros::dec;

    fn forecast_row(day: u32, actual: Option<Decimal>, vqc: Option<Decimal>) -> ForecastRow {
        ForecastRow {
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            actual,
            vqc_prediction: vqc,
            svm_prediction: None,
        }
    }

    #[test]
    fn carry_over_keeps_data_and_flags_stale() {
        let previous = SourcePane::fresh(vec![1, 2, 3]);
        let pane = SourcePane::carry_over(&previous, "unexpected status 502".to_string());
        assert_eq!(pane.data, Some(vec![1, 2, 3]));
        assert!(pane.stale);
        assert_eq!(pane.error.as_deref(), Some("unexpected status 502"));
    }

    #[test]
    fn carry_over_without_prior_data_stays_absent() {
        let previous: SourcePane<Vec<i32>> = SourcePane::empty();
        let pane = SourcePane::carry_over(&previous, "transport failure: refused".to_string());
        assert_eq!(pane.data, None);
        assert!(!pane.stale);
        assert!(pane.error.is_some());
    }

    #[test]
    fn derived_view_uses_latest_actual_against_latest_prediction() {
        let mut snapshot = ViewSnapshot::initial("forecast".to_string());
        snapshot.forecast = SourcePane::fresh(vec![
            forecast_row(2, Some(dec!(100)), Some(dec!(100))),
            forecast_row(3, Some(dec!(110)), None),
            forecast_row(4, None, Some(dec!(121))),
        ]);
        let derived = snapshot.compute_derived(&PipelineConfig::default());
        assert_eq!(derived.current_price, Some(dec!(110)));
        let signal = derived.signal.unwrap();
        assert_eq!(signal.action, SignalAction::Buy);
        let band = derived.band.unwrap();
        assert_eq!(band.lower, dec!(114.95));
        assert_eq!(band.upper, dec!(127.05));
        let delta = derived.day_delta.unwrap();
        assert_eq!(delta.delta, dec!(10));
    }

    #[test]
    fn derived_view_on_empty_panes_is_all_none() {
        let snapshot = ViewSnapshot::initial("empty".to_string());
        let derived = snapshot.compute_derived(&PipelineConfig::default());
        assert!(derived.current_price.is_none());
        assert!(derived.day_delta.is_none());
        assert!(derived.volatility_pct.is_none());
        assert!(derived.signal.is_none());
        assert!(derived.aggregate_accuracy.is_none());
    }
}
