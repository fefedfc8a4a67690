//! Analysis defaults, guard bounds and runtime toggles.

use serde::{Deserialize, Serialize};

use crate::errors::{BillyError, BillyResult};
use crate::models::FrequencyGridSpec;

// Periodogram grid defaults
pub const DEFAULT_PERIOD_MIN: f64 = 0.3;
pub const DEFAULT_PERIOD_MAX: f64 = 0.7;
pub const DEFAULT_N_FREQS: usize = 3000;
pub const MAX_FREQUENCIES: usize = 1_000_000;

// Phase binning
pub const DEFAULT_BINSIZE: f64 = 0.01;
pub const DEFAULT_MIN_BIN_ELEMENTS: usize = 1;
pub const MAX_PHASE_BINS: usize = 1_000_000;

// Posterior sampling
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_N_SAMPLES: usize = 100;

// Reference periods [days] marked on the spectra
pub const REFERENCE_ROTATION_PERIOD: f64 = 0.49914;
pub const REFERENCE_ORBITAL_PERIOD: f64 = 0.4485;

/// Whether batch periodograms fan out over a rayon pool.
///
/// Controlled by `BILLY_PARALLEL_PERIODOGRAMS`; any of `0`, `false`, `no`,
/// `off` disables it.
pub fn parallel_periodograms_enabled() -> bool {
    match std::env::var("BILLY_PARALLEL_PERIODOGRAMS") {
        Ok(val) => {
            let v = val.trim().to_lowercase();
            !matches!(v.as_str(), "0" | "false" | "no" | "off")
        }
        Err(_) => true,
    }
}

/// Tunables for [`crate::analysis::split_signal_analysis`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub period_min: f64,
    pub period_max: f64,
    pub n_freqs: usize,
    pub binsize: f64,
    pub min_bin_elements: usize,
    pub seed: u64,
    pub n_samples: usize,
    pub reference_periods: Vec<f64>,
    /// Free-parameter count of the fitted model; enables the BIC figure.
    pub n_free_parameters: Option<usize>,
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            period_min: DEFAULT_PERIOD_MIN,
            period_max: DEFAULT_PERIOD_MAX,
            n_freqs: DEFAULT_N_FREQS,
            binsize: DEFAULT_BINSIZE,
            min_bin_elements: DEFAULT_MIN_BIN_ELEMENTS,
            seed: DEFAULT_SEED,
            n_samples: DEFAULT_N_SAMPLES,
            reference_periods: vec![REFERENCE_ROTATION_PERIOD, REFERENCE_ORBITAL_PERIOD],
            n_free_parameters: None,
            parallel: parallel_periodograms_enabled(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(raw: &str) -> BillyResult<Self> {
        let config: AnalysisConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn grid(&self) -> BillyResult<FrequencyGridSpec> {
        FrequencyGridSpec::new(self.period_min, self.period_max, self.n_freqs)
    }

    pub fn validate(&self) -> BillyResult<()> {
        self.grid()?;
        if !(self.binsize.is_finite() && self.binsize > 0.0) {
            return Err(BillyError::InvalidParameter(format!(
                "binsize must be positive, got {}",
                self.binsize
            )));
        }
        Ok(())
    }
}
