//! Billy core library: numeric backend for split-signal light-curve analysis.
//!
//! Separates a photometric series into rotation-isolated, orbit-isolated and
//! residual components, computes Lomb–Scargle spectra of each, recovers
//! ephemerides from fitted parameters and phase-folds/bins the isolated
//! signals. With the `python` feature it is compiled as the `_billy_core`
//! extension module via PyO3; rendering stays on the Python side.

pub mod analysis;
pub mod config;
pub mod errors;
pub mod models;
pub mod params;
pub mod phase;
pub mod signal;
pub mod spectral;
pub mod stats;

#[cfg(feature = "python")]
mod python;

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::wrap_pyfunction;

// ---------------------------------------------------------------------------
// Top-level Python module: _billy_core
// ---------------------------------------------------------------------------

#[cfg(feature = "python")]
#[pymodule]
fn _billy_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // -- Defaults -----------------------------------------------------------
    m.add("DEFAULT_PERIOD_MIN", config::DEFAULT_PERIOD_MIN)?;
    m.add("DEFAULT_PERIOD_MAX", config::DEFAULT_PERIOD_MAX)?;
    m.add("DEFAULT_N_FREQS", config::DEFAULT_N_FREQS)?;
    m.add("MAX_FREQUENCIES", config::MAX_FREQUENCIES)?;
    m.add("DEFAULT_BINSIZE", config::DEFAULT_BINSIZE)?;
    m.add("DEFAULT_SEED", config::DEFAULT_SEED)?;
    m.add("DEFAULT_N_SAMPLES", config::DEFAULT_N_SAMPLES)?;
    m.add(
        "REFERENCE_ROTATION_PERIOD",
        config::REFERENCE_ROTATION_PERIOD,
    )?;
    m.add("REFERENCE_ORBITAL_PERIOD", config::REFERENCE_ORBITAL_PERIOD)?;

    // -- Spectra ------------------------------------------------------------
    m.add_function(wrap_pyfunction!(python::compute_power, m)?)?;

    // -- Phase --------------------------------------------------------------
    m.add_function(wrap_pyfunction!(python::fold_phases, m)?)?;
    m.add_function(wrap_pyfunction!(python::bin_phases, m)?)?;
    m.add_function(wrap_pyfunction!(python::recover_rotation, m)?)?;
    m.add_function(wrap_pyfunction!(python::recover_orbital, m)?)?;

    // -- Decomposition and full analysis ------------------------------------
    m.add_function(wrap_pyfunction!(python::decompose, m)?)?;
    m.add_function(wrap_pyfunction!(python::split_signal_analysis, m)?)?;

    // -- Goodness of fit ----------------------------------------------------
    m.add_function(wrap_pyfunction!(python::chisq, m)?)?;
    m.add_function(wrap_pyfunction!(python::bic, m)?)?;

    Ok(())
}
