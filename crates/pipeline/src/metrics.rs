//! Derived metrics over normalized sequences.
//!
//! Every function here is pure and total: undefined inputs produce `None` or
//! `Hold`, never a panic or a NaN. "Insufficient data" is a representable
//! state the view layer can render, not an exception.

use quant_dash_core::domain::{
    ConfidenceBand, DayDelta, DerivedSignal, ForecastRow, SignalAction,
};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Relative tolerance under which prediction and actual count as equal.
const SIGNAL_TOLERANCE: f64 = 1e-9;

/// Uncertainty interval around a point prediction.
///
/// A model-supplied absolute uncertainty wins; the configured half-width
/// ratio is a fallback only. Both forms are symmetric around the prediction.
#[must_use]
pub fn confidence_band(
    prediction: Decimal,
    uncertainty: Option<Decimal>,
    ratio: f64,
) -> ConfidenceBand {
    let half_width = uncertainty.unwrap_or_else(|| {
        let ratio = Decimal::from_f64(ratio).unwrap_or_default();
        prediction.abs() * ratio
    });
    ConfidenceBand {
        lower: prediction - half_width,
        upper: prediction + half_width,
    }
}

/// Buy when the prediction sits above the actual price, sell when below,
/// hold when either side is absent or the two agree within tolerance.
#[must_use]
pub fn trading_signal(actual: Option<Decimal>, prediction: Option<Decimal>) -> SignalAction {
    let (Some(actual), Some(prediction)) = (actual, prediction) else {
        return SignalAction::Hold;
    };
    let (Some(a), Some(p)) = (actual.to_f64(), prediction.to_f64()) else {
        return SignalAction::Hold;
    };
    let tolerance = SIGNAL_TOLERANCE * a.abs().max(p.abs());
    if (p - a).abs() <= tolerance {
        SignalAction::Hold
    } else if p > a {
        SignalAction::Buy
    } else {
        SignalAction::Sell
    }
}

/// Normalized confidence for one actual/prediction pair:
/// `clamp(1 - |p - a| / |a|, 0, 1)`, and 0 when the actual is 0.
#[must_use]
pub fn row_confidence(actual: Decimal, prediction: Decimal) -> f64 {
    if actual.is_zero() {
        return 0.0;
    }
    let (Some(a), Some(p)) = (actual.to_f64(), prediction.to_f64()) else {
        return 0.0;
    };
    let score = 1.0 - (p - a).abs() / a.abs();
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Signal plus confidence for one forecast row, judged against the quantum
/// prediction. Recomputed every refresh; never cached.
#[must_use]
pub fn derived_signal(row: &ForecastRow) -> DerivedSignal {
    let action = trading_signal(row.actual, row.vqc_prediction);
    let confidence = match (row.actual, row.vqc_prediction) {
        (Some(actual), Some(prediction)) => row_confidence(actual, prediction),
        _ => 0.0,
    };
    DerivedSignal { action, confidence }
}

/// Mean row confidence over the rows where an error metric is computable.
/// No qualifying rows yields `None` — "undefined" is distinct from zero
/// accuracy.
#[must_use]
pub fn aggregate_accuracy(rows: &[ForecastRow]) -> Option<f64> {
    let scores: Vec<f64> = rows
        .iter()
        .filter_map(|row| match (row.actual, row.vqc_prediction) {
            (Some(actual), Some(prediction)) => Some(row_confidence(actual, prediction)),
            _ => None,
        })
        .collect();
    if scores.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Population standard deviation of day-over-day relative returns over the
/// trailing `window` returns, as a percentage. Pairs with a zero or
/// unrepresentable previous close are skipped; fewer than two usable returns
/// yields `None`.
#[must_use]
pub fn volatility(closes: &[Decimal], window: usize) -> Option<f64> {
    let mut returns: Vec<f64> = closes
        .windows(2)
        .filter_map(|pair| {
            let prev = pair[0].to_f64()?;
            let next = pair[1].to_f64()?;
            if prev == 0.0 {
                return None;
            }
            let ret = (next - prev) / prev;
            ret.is_finite().then_some(ret)
        })
        .collect();
    if returns.len() > window {
        returns.drain(..returns.len() - window);
    }
    if returns.len() < 2 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt() * 100.0)
}

/// Change between the last two defined samples. Fewer than two qualifying
/// samples yields `None`, never zero — zero means "no change", not "unknown".
/// A previous sample of exactly zero makes the percent undefined, so the
/// pair does not qualify.
#[must_use]
pub fn day_over_day(values: &[Option<Decimal>]) -> Option<DayDelta> {
    let defined: Vec<Decimal> = values.iter().filter_map(|v| *v).collect();
    let [.., previous, latest] = defined.as_slice() else {
        return None;
    };
    if previous.is_zero() {
        return None;
    }
    let delta = *latest - *previous;
    let percent = (delta / *previous).to_f64()? * 100.0;
    percent.is_finite().then_some(DayDelta { delta, percent })
}
