//! Split a composite fit into rotation-isolated, orbit-isolated and residual
//! series.

use tracing::debug;

use crate::errors::{BillyError, BillyResult};
use crate::models::{
    ModelFamily, ModelSpec, ResidualBundle, TimeSeries, FULL_MODEL_KEY, TRANSIT_KEY,
};
use crate::params::{ParameterLookup, ParameterSource, PointEstimate, RowSelector};
use crate::signal::accumulator::accumulate;

fn check_len(name: &str, series: &[f64], expected: usize) -> BillyResult<()> {
    if series.len() != expected {
        return Err(BillyError::InvalidInput(format!(
            "{name} has {} samples, time base has {expected}",
            series.len()
        )));
    }
    Ok(())
}

fn component_series(
    family: ModelFamily,
    model: &ModelSpec,
    params: &PointEstimate,
    len: usize,
) -> BillyResult<Vec<f64>> {
    match model.component(family) {
        Some(spec) => accumulate(family, spec.harmonic_count, params, len),
        None => {
            debug!(family = family.tag(), "component absent from model, using zeros");
            Ok(vec![0.0; len])
        }
    }
}

fn subtract(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// Decompose `series` with harmonic terms taken from `source` reduced by
/// `selector`.
///
/// `transit` defaults to zeros. Without `full_model`, the full model is
/// rebuilt as rotation + orbital + transit.
pub fn decompose(
    series: &TimeSeries,
    model: &ModelSpec,
    full_model: Option<&[f64]>,
    transit: Option<&[f64]>,
    source: &ParameterSource,
    selector: &RowSelector,
) -> BillyResult<ResidualBundle> {
    let params = source.resolve(selector)?;
    decompose_resolved(series, model, full_model, transit, &params)
}

/// Like [`decompose`], but the full model and transit series come from the
/// resolved parameters (`mu_model`, `mu_transit`) when present.
pub fn decompose_from_source(
    series: &TimeSeries,
    model: &ModelSpec,
    source: &ParameterSource,
    selector: &RowSelector,
) -> BillyResult<ResidualBundle> {
    let params = source.resolve(selector)?;
    let full_model = optional_series(&params, FULL_MODEL_KEY)?;
    let transit = optional_series(&params, TRANSIT_KEY)?;
    decompose_resolved(series, model, full_model, transit, &params)
}

fn optional_series<'a>(params: &'a PointEstimate, name: &str) -> BillyResult<Option<&'a [f64]>> {
    if params.contains(name) {
        params.lookup_series(name).map(Some)
    } else {
        Ok(None)
    }
}

fn decompose_resolved(
    series: &TimeSeries,
    model: &ModelSpec,
    full_model: Option<&[f64]>,
    transit: Option<&[f64]>,
    params: &PointEstimate,
) -> BillyResult<ResidualBundle> {
    let n = series.len();
    let observed = series.value();

    let rotation_model = component_series(ModelFamily::Rotation, model, params, n)?;
    let orbital = component_series(ModelFamily::Orbital, model, params, n)?;

    let transit_model = match transit {
        Some(t) => {
            check_len(TRANSIT_KEY, t, n)?;
            t.to_vec()
        }
        None => vec![0.0; n],
    };
    let orbital_model: Vec<f64> = orbital
        .iter()
        .zip(&transit_model)
        .map(|(o, t)| o + t)
        .collect();

    let full_model = match full_model {
        Some(m) => {
            check_len(FULL_MODEL_KEY, m, n)?;
            m.to_vec()
        }
        None => {
            debug!("no full model supplied, rebuilding from components");
            rotation_model
                .iter()
                .zip(&orbital_model)
                .map(|(r, o)| r + o)
                .collect()
        }
    };

    Ok(ResidualBundle {
        time: series.time().to_vec(),
        observed: observed.to_vec(),
        uncertainty: series.uncertainty().to_vec(),
        isolated_rotation: subtract(observed, &orbital_model),
        isolated_orbital: subtract(observed, &rotation_model),
        full_residual: subtract(observed, &full_model),
        rotation_model,
        orbital_model,
        transit_model,
        full_model,
    })
}
