//! Physical periods and reference epochs from fitted model parameters.

use std::f64::consts::TAU;

use crate::errors::{BillyError, BillyResult};
use crate::models::{
    Ephemeris, ModelFamily, ORBITAL_EPOCH_KEY, ORBITAL_PERIOD_KEY, ROTATION_OMEGA_KEY,
    ROTATION_PHI_KEY,
};
use crate::params::ParameterSource;

/// Rotation ephemeris from angular frequency `omega` [rad/day] and phase
/// offset `phi` [rad]: `P = 2π/ω`, `t0 = φP/2π`.
pub fn recover_rotation(angular_frequency: f64, phase_offset: f64) -> BillyResult<Ephemeris> {
    if !(angular_frequency.is_finite() && angular_frequency > 0.0) {
        return Err(BillyError::InvalidParameter(format!(
            "{ROTATION_OMEGA_KEY} must be positive, got {angular_frequency}"
        )));
    }
    if !phase_offset.is_finite() {
        return Err(BillyError::InvalidParameter(format!(
            "{ROTATION_PHI_KEY} must be finite, got {phase_offset}"
        )));
    }
    let period = TAU / angular_frequency;
    Ok(Ephemeris {
        period,
        epoch: phase_offset * period / TAU,
    })
}

/// Orbital ephemeris; both values are already in days.
pub fn recover_orbital(period: f64, epoch: f64) -> BillyResult<Ephemeris> {
    if !(period.is_finite() && period > 0.0) {
        return Err(BillyError::InvalidParameter(format!(
            "{ORBITAL_PERIOD_KEY} must be positive, got {period}"
        )));
    }
    if !epoch.is_finite() {
        return Err(BillyError::InvalidParameter(format!(
            "{ORBITAL_EPOCH_KEY} must be finite, got {epoch}"
        )));
    }
    Ok(Ephemeris { period, epoch })
}

/// Ephemeris of `family` read from `source`.
///
/// A posterior contributes the median of each parameter across its draws,
/// never the mean, and never a single draw.
pub fn recover_ephemeris(source: &ParameterSource, family: ModelFamily) -> BillyResult<Ephemeris> {
    match family {
        ModelFamily::Rotation => recover_rotation(
            source.aggregate_scalar(ROTATION_OMEGA_KEY)?,
            source.aggregate_scalar(ROTATION_PHI_KEY)?,
        ),
        ModelFamily::Orbital => recover_orbital(
            source.aggregate_scalar(ORBITAL_PERIOD_KEY)?,
            source.aggregate_scalar(ORBITAL_EPOCH_KEY)?,
        ),
    }
}
