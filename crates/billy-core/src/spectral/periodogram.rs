//! Generalized Lomb–Scargle power spectra for unevenly sampled photometry.
//!
//! Power uses the floating-mean, inverse-variance-weighted formulation
//! (Zechmeister & Kürster 2009) with "standard" normalization,
//! `1 - χ²_model / χ²_ref`, so values lie in `[0, 1]`. No detrending happens
//! here; callers pass residual series when a component must be removed.

use std::f64::consts::TAU;

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::errors::{BillyError, BillyResult};
use crate::models::{FrequencyGridSpec, PowerSpectrum, ResidualBundle, ResidualKey};

/// Below this the weighted design is singular at a frequency (e.g. fewer than
/// three distinct phases); power is reported as zero there.
const DEGENERATE_EPS: f64 = 1e-15;

/// Spread of the data, relative to its magnitude, below which the series is
/// treated as constant. Rounding in the weighted mean leaves residues of a
/// few ulps that must not register as signal.
const FLAT_RTOL: f64 = 1e-12;

/// Normalized weights and centered data shared by every frequency.
struct WeightedSeries<'a> {
    time: &'a [f64],
    weight: Vec<f64>,
    /// Data with the weighted mean removed.
    centered: Vec<f64>,
    /// Weighted variance of the data.
    yy: f64,
    /// Largest absolute data value.
    scale: f64,
}

fn prepare<'a>(
    time: &'a [f64],
    value: &[f64],
    uncertainty: &[f64],
) -> BillyResult<WeightedSeries<'a>> {
    if time.len() != value.len() || time.len() != uncertainty.len() {
        return Err(BillyError::InvalidInput(format!(
            "periodogram inputs differ in length (time={}, value={}, uncertainty={})",
            time.len(),
            value.len(),
            uncertainty.len()
        )));
    }
    if time.is_empty() {
        return Err(BillyError::InvalidInput(
            "periodogram needs at least one observation".to_string(),
        ));
    }
    if let Some((i, dy)) = uncertainty
        .iter()
        .enumerate()
        .find(|(_, dy)| !(dy.is_finite() && **dy > 0.0))
    {
        return Err(BillyError::InvalidInput(format!(
            "uncertainty must be strictly positive, got {dy} at index {i}"
        )));
    }
    if time.iter().chain(value).any(|x| !x.is_finite()) {
        return Err(BillyError::InvalidInput(
            "time and value must be finite".to_string(),
        ));
    }

    let raw: Vec<f64> = uncertainty.iter().map(|dy| 1.0 / (dy * dy)).collect();
    let total: f64 = raw.iter().sum();
    let weight: Vec<f64> = raw.iter().map(|w| w / total).collect();
    let mean: f64 = weight.iter().zip(value).map(|(w, y)| w * y).sum();
    let centered: Vec<f64> = value.iter().map(|y| y - mean).collect();
    let yy: f64 = weight.iter().zip(&centered).map(|(w, y)| w * y * y).sum();
    let scale = value.iter().fold(0.0_f64, |m, y| m.max(y.abs()));

    Ok(WeightedSeries {
        time,
        weight,
        centered,
        yy,
        scale,
    })
}

impl WeightedSeries<'_> {
    fn is_flat(&self) -> bool {
        self.yy <= (FLAT_RTOL * self.scale).powi(2)
    }

    fn power_at(&self, frequency: f64) -> f64 {
        let omega = TAU * frequency;
        let (mut c, mut s) = (0.0, 0.0);
        let (mut yc, mut ys) = (0.0, 0.0);
        let (mut cc, mut cs) = (0.0, 0.0);
        for ((&t, &w), &y) in self.time.iter().zip(&self.weight).zip(&self.centered) {
            let (sin, cos) = (omega * t).sin_cos();
            c += w * cos;
            s += w * sin;
            yc += w * y * cos;
            ys += w * y * sin;
            cc += w * cos * cos;
            cs += w * cos * sin;
        }
        // the data are centered, so Y = 0 in the cross terms
        let ss = 1.0 - cc - s * s;
        let cc = cc - c * c;
        let cs = cs - c * s;
        let d = cc * ss - cs * cs;
        if d <= DEGENERATE_EPS {
            return 0.0;
        }
        let power = (ss * yc * yc + cc * ys * ys - 2.0 * cs * yc * ys) / (self.yy * d);
        power.clamp(0.0, 1.0)
    }
}

/// Lomb–Scargle power of `(time, value, uncertainty)` over the linear grid
/// built from `(period_min, period_max, n_freqs)`.
pub fn compute_power(
    time: &[f64],
    value: &[f64],
    uncertainty: &[f64],
    period_min: f64,
    period_max: f64,
    n_freqs: usize,
) -> BillyResult<PowerSpectrum> {
    let grid = FrequencyGridSpec::new(period_min, period_max, n_freqs)?;
    compute_power_on_grid(time, value, uncertainty, &grid)
}

pub fn compute_power_on_grid(
    time: &[f64],
    value: &[f64],
    uncertainty: &[f64],
    grid: &FrequencyGridSpec,
) -> BillyResult<PowerSpectrum> {
    grid.validate()?;
    let series = prepare(time, value, uncertainty)?;
    let frequency = grid.frequencies();

    let power: Vec<f64> = if series.is_flat() {
        debug!("constant input series, spectrum is flat zero");
        vec![0.0; frequency.len()]
    } else {
        frequency.iter().map(|&f| series.power_at(f)).collect()
    };
    let period = frequency.iter().map(|f| 1.0 / f).collect();

    Ok(PowerSpectrum {
        frequency,
        period,
        power,
        grid: *grid,
    })
}

/// One spectrum per requested residual series, weighted by the bundle's
/// uncertainty. With `parallel`, keys fan out over a rayon pool; the result
/// is identical either way.
pub fn residual_periodograms(
    bundle: &ResidualBundle,
    grid: &FrequencyGridSpec,
    keys: &[ResidualKey],
    parallel: bool,
) -> BillyResult<IndexMap<ResidualKey, PowerSpectrum>> {
    let run = |key: &ResidualKey| -> BillyResult<(ResidualKey, PowerSpectrum)> {
        let spectrum =
            compute_power_on_grid(&bundle.time, bundle.get(*key), &bundle.uncertainty, grid)?;
        Ok((*key, spectrum))
    };

    if !parallel || keys.len() < 2 {
        return keys.iter().map(run).collect();
    }

    match rayon::ThreadPoolBuilder::new()
        .num_threads(keys.len())
        .build()
    {
        Ok(pool) => pool.install(|| {
            keys.par_iter()
                .map(run)
                .collect::<BillyResult<Vec<_>>>()
                .map(|pairs| pairs.into_iter().collect())
        }),
        Err(e) => {
            warn!("periodogram pool unavailable, running sequentially: {e}");
            keys.iter().map(run).collect()
        }
    }
}
