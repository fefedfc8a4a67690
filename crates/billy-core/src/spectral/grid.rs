//! Linear frequency grids spanning a period range.

use crate::config::MAX_FREQUENCIES;
use crate::errors::{BillyError, BillyResult};
use crate::models::FrequencyGridSpec;

impl FrequencyGridSpec {
    pub fn new(period_min: f64, period_max: f64, n_freqs: usize) -> BillyResult<Self> {
        let spec = Self {
            period_min,
            period_max,
            n_freqs,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> BillyResult<()> {
        if !(self.period_min.is_finite() && self.period_min > 0.0) {
            return Err(BillyError::InvalidInput(format!(
                "period_min must be positive, got {}",
                self.period_min
            )));
        }
        if !(self.period_max.is_finite() && self.period_max > self.period_min) {
            return Err(BillyError::InvalidInput(format!(
                "period_max must exceed period_min ({} <= {})",
                self.period_max, self.period_min
            )));
        }
        if self.n_freqs == 0 || self.n_freqs > MAX_FREQUENCIES {
            return Err(BillyError::InvalidInput(format!(
                "n_freqs must be in [1, {MAX_FREQUENCIES}], got {}",
                self.n_freqs
            )));
        }
        Ok(())
    }

    /// Frequencies evenly spaced from `1/period_max` to `1/period_min`.
    pub fn frequencies(&self) -> Vec<f64> {
        let f_lo = 1.0 / self.period_max;
        if self.n_freqs == 1 {
            return vec![f_lo];
        }
        let f_hi = 1.0 / self.period_min;
        let step = (f_hi - f_lo) / (self.n_freqs - 1) as f64;
        (0..self.n_freqs).map(|i| f_lo + i as f64 * step).collect()
    }
}
