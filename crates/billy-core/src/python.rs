//! PyO3 bindings for the `_billy_core` extension module.
//!
//! Parameters cross the boundary as JSON (`{"kind": "point_estimate" |
//! "posterior", "parameters": {...}}`); array results come back as dicts of
//! lists so plotting code can stay in Python.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule};

use crate::analysis;
use crate::config::{
    AnalysisConfig, DEFAULT_BINSIZE, DEFAULT_MIN_BIN_ELEMENTS, DEFAULT_N_FREQS,
    DEFAULT_PERIOD_MAX, DEFAULT_PERIOD_MIN, DEFAULT_SEED,
};
use crate::models::{ModelSpec, PhaseFoldResult, ResidualKey, TimeSeries};
use crate::params::{ParameterSource, RowSelector};
use crate::phase::{epoch, fold as phase_fold};
use crate::signal::decompose::decompose_from_source;
use crate::spectral::periodogram;
use crate::stats;

#[pyfunction]
#[pyo3(signature = (time, value, uncertainty, period_min=DEFAULT_PERIOD_MIN, period_max=DEFAULT_PERIOD_MAX, n_freqs=DEFAULT_N_FREQS))]
pub fn compute_power(
    py: Python<'_>,
    time: Vec<f64>,
    value: Vec<f64>,
    uncertainty: Vec<f64>,
    period_min: f64,
    period_max: f64,
    n_freqs: usize,
) -> PyResult<PyObject> {
    let spectrum = py.allow_threads(|| {
        periodogram::compute_power(&time, &value, &uncertainty, period_min, period_max, n_freqs)
    })?;

    let result = PyDict::new(py);
    result.set_item("frequency", spectrum.frequency)?;
    result.set_item("period", spectrum.period)?;
    result.set_item("power", spectrum.power)?;
    Ok(result.into())
}

#[pyfunction]
#[pyo3(signature = (time, value, period, epoch, wrap=true))]
pub fn fold_phases(
    py: Python<'_>,
    time: Vec<f64>,
    value: Vec<f64>,
    period: f64,
    epoch: f64,
    wrap: bool,
) -> PyResult<PyObject> {
    let folded = phase_fold::fold(&time, &value, period, epoch, wrap)?;

    let result = PyDict::new(py);
    result.set_item("phase", folded.phase)?;
    result.set_item("value", folded.value)?;
    Ok(result.into())
}

fn parse_aggregate(name: &str) -> PyResult<phase_fold::BinAggregate> {
    match name {
        "median" => Ok(phase_fold::BinAggregate::Median),
        "mean" => Ok(phase_fold::BinAggregate::Mean),
        other => Err(PyValueError::new_err(format!(
            "aggregate must be 'median' or 'mean', got {other:?}"
        ))),
    }
}

#[pyfunction]
#[pyo3(signature = (phase, value, binsize=DEFAULT_BINSIZE, wrapped=true, aggregate="median", min_elements=DEFAULT_MIN_BIN_ELEMENTS))]
pub fn bin_phases(
    py: Python<'_>,
    phase: Vec<f64>,
    value: Vec<f64>,
    binsize: f64,
    wrapped: bool,
    aggregate: &str,
    min_elements: usize,
) -> PyResult<PyObject> {
    if phase.len() != value.len() {
        return Err(PyValueError::new_err(format!(
            "phase and value differ in length ({}, {})",
            phase.len(),
            value.len()
        )));
    }
    let options = phase_fold::BinOptions {
        binsize,
        aggregate: parse_aggregate(aggregate)?,
        min_elements,
    };
    let folded = PhaseFoldResult {
        phase,
        value,
        wrapped,
    };
    let binned = phase_fold::bin_with(&folded, &options)?;

    let result = PyDict::new(py);
    result.set_item("bin_phase_center", binned.bin_phase_center)?;
    result.set_item("bin_value", binned.bin_value)?;
    result.set_item("bin_count", binned.bin_count)?;
    Ok(result.into())
}

/// Returns `(period, epoch)`.
#[pyfunction]
pub fn recover_rotation(angular_frequency: f64, phase_offset: f64) -> PyResult<(f64, f64)> {
    let e = epoch::recover_rotation(angular_frequency, phase_offset)?;
    Ok((e.period, e.epoch))
}

/// Returns `(period, epoch)`.
#[pyfunction]
pub fn recover_orbital(period: f64, t0: f64) -> PyResult<(f64, f64)> {
    let e = epoch::recover_orbital(period, t0)?;
    Ok((e.period, e.epoch))
}

/// Residual series keyed by name. Posterior sources use draw `draw_index`
/// when given, otherwise one draw picked with `seed`.
#[pyfunction]
#[pyo3(signature = (time, value, uncertainty, model, params_json, seed=DEFAULT_SEED, draw_index=None))]
#[allow(clippy::too_many_arguments)]
pub fn decompose(
    py: Python<'_>,
    time: Vec<f64>,
    value: Vec<f64>,
    uncertainty: Vec<f64>,
    model: Vec<String>,
    params_json: &str,
    seed: u64,
    draw_index: Option<usize>,
) -> PyResult<PyObject> {
    let series = TimeSeries::new(time, value, uncertainty)?;
    let model = ModelSpec::from_tokens(model.as_slice())?;
    let source = ParameterSource::from_json_str(params_json)?;
    let selector = match draw_index {
        Some(i) => RowSelector::Index(i),
        None => RowSelector::SeededDraw { seed },
    };
    let bundle = decompose_from_source(&series, &model, &source, &selector)?;

    let result = PyDict::new(py);
    for key in ResidualKey::ALL {
        result.set_item(key.as_str(), bundle.get(key).to_vec())?;
    }
    result.set_item("fingerprint", bundle.fingerprint())?;
    Ok(result.into())
}

/// Full analysis report as nested dicts.
#[pyfunction]
#[pyo3(signature = (time, value, uncertainty, model, params_json, config_json=None))]
pub fn split_signal_analysis(
    py: Python<'_>,
    time: Vec<f64>,
    value: Vec<f64>,
    uncertainty: Vec<f64>,
    model: Vec<String>,
    params_json: &str,
    config_json: Option<&str>,
) -> PyResult<PyObject> {
    let series = TimeSeries::new(time, value, uncertainty)?;
    let model = ModelSpec::from_tokens(model.as_slice())?;
    let source = ParameterSource::from_json_str(params_json)?;
    let config = match config_json {
        Some(raw) => AnalysisConfig::from_json_str(raw)?,
        None => AnalysisConfig::default(),
    };

    let report = py.allow_threads(|| {
        analysis::split_signal_analysis(&series, &model, &source, &config)
    })?;
    let encoded = serde_json::to_string(&report).map_err(crate::errors::BillyError::from)?;

    let json = PyModule::import(py, "json")?;
    Ok(json.call_method1("loads", (encoded,))?.unbind())
}

#[pyfunction]
pub fn chisq(y_mod: Vec<f64>, y_obs: Vec<f64>, y_err: Vec<f64>) -> PyResult<f64> {
    Ok(stats::chisq(&y_mod, &y_obs, &y_err)?)
}

#[pyfunction]
pub fn bic(chisq: f64, k: usize, n: usize) -> PyResult<f64> {
    Ok(stats::bic(chisq, k, n)?)
}
