//! Currency conversion, applied exactly once at the normalization boundary.
//!
//! Converting at render time in several independent views caused
//! double-conversion bugs in the past; the converter therefore only ever sees
//! raw upstream values, never canonical records.

use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy)]
pub struct CurrencyConverter {
    rate: Decimal,
}

impl CurrencyConverter {
    #[must_use]
    pub const fn new(rate: Decimal) -> Self {
        Self { rate }
    }

    /// Converts one monetary amount into local currency. `None` when the
    /// product overflows `Decimal`; the caller treats the value as missing,
    /// the same as an unparseable one.
    #[must_use]
    pub fn apply(&self, amount: Decimal) -> Option<Decimal> {
        amount.checked_mul(self.rate)
    }

    #[must_use]
    pub fn apply_opt(&self, amount: Option<Decimal>) -> Option<Decimal> {
        amount.and_then(|a| self.apply(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn converts_and_passes_none_through() {
        let converter = CurrencyConverter::new(dec!(105));
        assert_eq!(converter.apply(dec!(2)), Some(dec!(210)));
        assert_eq!(converter.apply_opt(Some(dec!(0.5))), Some(dec!(52.5)));
        assert_eq!(converter.apply_opt(None), None);
    }

    #[test]
    fn overflowing_product_is_none_not_a_panic() {
        let converter = CurrencyConverter::new(dec!(105));
        // Representable on its own, not after conversion.
        let huge = Decimal::from_scientific("7e28").unwrap();
        assert_eq!(converter.apply(huge), None);
        assert_eq!(converter.apply_opt(Some(huge)), None);
    }
}
