//! Fixed-point conversion from planck amounts to display decimals.

use crate::error::CoreError;

/// Number of planck per display unit (e.g. `10^10` for DOT, `10^12` for KSM).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitScale(u128);

impl UnitScale {
    pub fn new(planck_per_unit: u128) -> Result<Self, CoreError> {
        if planck_per_unit == 0 {
            return Err(CoreError::InvalidUnitScale);
        }
        Ok(Self(planck_per_unit))
    }

    /// Convert with a scale already known to be non-zero.
    pub fn to_decimal(&self, amount: u128) -> f64 {
        let quotient = amount / self.0;
        let remainder = amount % self.0;
        quotient as f64 + remainder as f64 / self.0 as f64
    }
}

/// Convert `amount` planck into units of `unit_scale` planck.
///
/// Division happens in integer arithmetic; only the quotient and the
/// sub-unit remainder are turned into floating point, so exact multiples
/// of the scale convert exactly.
pub fn to_decimal(amount: u128, unit_scale: u128) -> Result<f64, CoreError> {
    Ok(UnitScale::new(unit_scale)?.to_decimal(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOT: u128 = 1_000_000_000;

    #[test]
    fn exact_multiples_are_exact() {
        assert_eq!(to_decimal(5_000_000_000, DOT).unwrap(), 5.0);
        assert_eq!(to_decimal(2_000_000_000, DOT).unwrap(), 2.0);
        assert_eq!(to_decimal(DOT * 123_456, DOT).unwrap(), 123_456.0);
    }

    #[test]
    fn zero_amount_is_zero() {
        for scale in [1, 10, DOT, u128::MAX] {
            assert_eq!(to_decimal(0, scale).unwrap(), 0.0);
        }
    }

    #[test]
    fn zero_scale_is_rejected() {
        assert!(matches!(
            to_decimal(1, 0),
            Err(CoreError::InvalidUnitScale)
        ));
        assert!(matches!(UnitScale::new(0), Err(CoreError::InvalidUnitScale)));
    }

    #[test]
    fn sub_unit_remainder_is_kept() {
        assert_eq!(to_decimal(1_500_000_000, DOT).unwrap(), 1.5);
    }

    #[test]
    fn magnitude_beyond_u64_survives() {
        let amount = u64::MAX as u128 * 4;
        let value = to_decimal(amount, 1).unwrap();
        assert!(value > u64::MAX as f64);
        assert!(value.is_sign_positive());
    }
}
