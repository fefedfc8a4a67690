//! End-to-end split-signal analysis.
//!
//! Chains decomposition, residual periodograms, ephemeris recovery and phase
//! folding into the numeric products a renderer needs. Two selection policies
//! coexist on purpose and are kept separate:
//!
//! - the decomposition of a posterior uses one seeded random draw
//!   ([`RowSelector::SeededDraw`]), so the isolated series are a consistent
//!   realization of the model;
//! - the ephemerides of a posterior use the per-parameter median across all
//!   draws.
//!
//! A MAP point estimate feeds both paths directly.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::errors::{BillyError, BillyResult};
use crate::models::{
    BinnedPhaseResult, Ephemeris, ModelFamily, ModelSpec, PhaseFoldResult, PowerSpectrum,
    ResidualBundle, ResidualKey, SpectralPeak, TimeSeries, FULL_MODEL_KEY,
};
use crate::params::{ParameterSource, RowSelector};
use crate::phase::epoch::recover_ephemeris;
use crate::phase::fold::{bin_with, fold_at, BinOptions};
use crate::signal::decompose::decompose_from_source;
use crate::spectral::periodogram::residual_periodograms;
use crate::stats::{bic, chisq};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComponentFold {
    pub family: ModelFamily,
    pub ephemeris: Ephemeris,
    pub folded: PhaseFoldResult,
    pub binned: BinnedPhaseResult,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpectrumSummary {
    pub key: ResidualKey,
    pub peak: Option<SpectralPeak>,
    /// Power at the grid point nearest each configured reference period.
    pub reference_power: Vec<SpectralPeak>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// Selector used for the decomposition; `None` for a point estimate.
    pub decomposition_selector: Option<RowSelector>,
    pub bundle: ResidualBundle,
    pub fingerprint: String,
    pub periodograms: IndexMap<ResidualKey, PowerSpectrum>,
    pub spectral_summary: Vec<SpectrumSummary>,
    pub rotation: Option<ComponentFold>,
    pub orbital: Option<ComponentFold>,
    pub chisq: f64,
    pub bic: Option<f64>,
}

fn component_fold(
    family: ModelFamily,
    bundle: &ResidualBundle,
    source: &ParameterSource,
    options: &BinOptions,
) -> BillyResult<ComponentFold> {
    let ephemeris = recover_ephemeris(source, family)?;
    let isolated = match family {
        ModelFamily::Rotation => &bundle.isolated_rotation,
        ModelFamily::Orbital => &bundle.isolated_orbital,
    };
    let folded = fold_at(&bundle.time, isolated, &ephemeris)?;
    let binned = bin_with(&folded, options)?;
    Ok(ComponentFold {
        family,
        ephemeris,
        folded,
        binned,
    })
}

/// Run the full split-signal analysis of `series` under `model`.
pub fn split_signal_analysis(
    series: &TimeSeries,
    model: &ModelSpec,
    source: &ParameterSource,
    config: &AnalysisConfig,
) -> BillyResult<AnalysisReport> {
    config.validate()?;
    let grid = config.grid()?;

    let decomposition_selector = source
        .is_posterior()
        .then_some(RowSelector::SeededDraw { seed: config.seed });
    let bundle = decompose_from_source(
        series,
        model,
        source,
        &decomposition_selector.unwrap_or(RowSelector::Median),
    )?;

    let periodograms =
        residual_periodograms(&bundle, &grid, &ResidualKey::SPECTRAL, config.parallel)?;
    let spectral_summary = periodograms
        .iter()
        .map(|(key, spectrum)| SpectrumSummary {
            key: *key,
            peak: spectrum.peak(),
            reference_power: config
                .reference_periods
                .iter()
                .filter_map(|p| spectrum.power_near(*p))
                .collect(),
        })
        .collect();

    let options = BinOptions {
        min_elements: config.min_bin_elements,
        ..BinOptions::new(config.binsize)
    };
    let fold_family = |family: ModelFamily| -> BillyResult<Option<ComponentFold>> {
        match model.component(family) {
            Some(_) => component_fold(family, &bundle, source, &options).map(Some),
            None => Ok(None),
        }
    };
    let rotation = fold_family(ModelFamily::Rotation)?;
    let orbital = fold_family(ModelFamily::Orbital)?;

    let chisq = chisq(&bundle.full_model, &bundle.observed, &bundle.uncertainty)?;
    let bic = config
        .n_free_parameters
        .map(|k| bic(chisq, k, bundle.len()))
        .transpose()?;

    info!(
        points = bundle.len(),
        posterior = source.is_posterior(),
        rotation_period = rotation.as_ref().map(|f| f.ephemeris.period),
        orbital_period = orbital.as_ref().map(|f| f.ephemeris.period),
        chisq,
        "split-signal analysis complete"
    );

    Ok(AnalysisReport {
        decomposition_selector,
        fingerprint: bundle.fingerprint(),
        bundle,
        periodograms,
        spectral_summary,
        rotation,
        orbital,
        chisq,
        bic,
    })
}

/// `config.n_samples` distinct posterior draws of the full model, for
/// overplotting against the data. Clamped to the ensemble size.
pub fn posterior_model_draws(
    source: &ParameterSource,
    config: &AnalysisConfig,
) -> BillyResult<Vec<Vec<f64>>> {
    let ParameterSource::Posterior(samples) = source else {
        return Err(BillyError::InvalidInput(
            "model draws need a posterior ensemble".to_string(),
        ));
    };
    let n = if config.n_samples > samples.row_count() {
        warn!(
            requested = config.n_samples,
            available = samples.row_count(),
            "fewer posterior draws than requested samples"
        );
        samples.row_count()
    } else {
        config.n_samples
    };
    samples.sample_series(FULL_MODEL_KEY, n, config.seed)
}
