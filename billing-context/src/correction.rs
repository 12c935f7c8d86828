//! Optional value correction for overdue installments.

use chrono::NaiveDate;

use crate::{cfg::env_rate, error::ContextError};

/// Host-supplied adjustment of an overdue value (late fee, interest, inflation).
pub trait ValueCorrection: Send + Sync {
    /// Corrected amount for `value` due on `due_date`, seen on `reference`.
    fn corrected_value(&self, value: f64, due_date: NaiveDate, reference: NaiveDate) -> f64;
}

/// Flat fine plus simple pro-rata monthly interest (30-day months).
///
/// `value * (1 + fine_rate) + value * monthly_interest_rate * days_late / 30`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LateFeeCorrection {
    pub fine_rate: f64,
    pub monthly_interest_rate: f64,
}

impl LateFeeCorrection {
    pub const FINE_ENV: &'static str = "CORRECTION_FINE_RATE";
    pub const INTEREST_ENV: &'static str = "CORRECTION_MONTHLY_INTEREST_RATE";

    /// Reads both rates from env. `Ok(None)` when neither is set.
    ///
    /// # Errors
    /// [`ContextError::InvalidEnv`] when a rate is set but not a non-negative number.
    pub fn from_env() -> Result<Option<Self>, ContextError> {
        let fine = env_rate(Self::FINE_ENV)?;
        let interest = env_rate(Self::INTEREST_ENV)?;
        if fine.is_none() && interest.is_none() {
            return Ok(None);
        }
        Ok(Some(Self {
            fine_rate: fine.unwrap_or(0.0),
            monthly_interest_rate: interest.unwrap_or(0.0),
        }))
    }
}

impl ValueCorrection for LateFeeCorrection {
    fn corrected_value(&self, value: f64, due_date: NaiveDate, reference: NaiveDate) -> f64 {
        let days_late = (reference - due_date).num_days().max(0) as f64;
        value * (1.0 + self.fine_rate) + value * self.monthly_interest_rate * days_late / 30.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fine_and_interest() {
        let c = LateFeeCorrection {
            fine_rate: 0.02,
            monthly_interest_rate: 0.01,
        };
        let due = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert!((c.corrected_value(1000.0, due, today) - 1030.0).abs() < 1e-9);
        // Not late yet: only the fine component applies.
        assert!((c.corrected_value(1000.0, today, due) - 1020.0).abs() < 1e-9);
    }
}
