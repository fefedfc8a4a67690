//! Parameter sources: MAP point estimates and posterior sample ensembles.
//!
//! The fitting engine emits either a single best-fit table or a chain of
//! draws. Both are keyed by parameter name, and every value is either a
//! scalar (`omegarot`, `t0`, ...) or a deterministic series aligned to the
//! time base (`mu_model`, `mu_rotsin0`, ...). Consumers read them through
//! [`ParameterLookup`]; a posterior is first reduced to a [`PointEstimate`]
//! by a [`RowSelector`].

use std::borrow::Cow;

use indexmap::IndexMap;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{BillyError, BillyResult};
use crate::stats::nan_median;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Scalar(f64),
    Series(Vec<f64>),
}

/// Read access to named parameters.
pub trait ParameterLookup {
    fn get(&self, name: &str) -> Option<&ParameterValue>;

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// A scalar parameter; a one-element series is accepted as a scalar.
    fn lookup_scalar(&self, name: &str) -> BillyResult<f64> {
        match self.get(name) {
            Some(ParameterValue::Scalar(v)) => Ok(*v),
            Some(ParameterValue::Series(s)) if s.len() == 1 => Ok(s[0]),
            Some(ParameterValue::Series(s)) => Err(BillyError::InvalidParameter(format!(
                "{name} is a series of length {}, expected a scalar",
                s.len()
            ))),
            None => Err(BillyError::MissingParameter(name.to_string())),
        }
    }

    fn lookup_series(&self, name: &str) -> BillyResult<&[f64]> {
        match self.get(name) {
            Some(ParameterValue::Series(s)) => Ok(s),
            Some(ParameterValue::Scalar(_)) => Err(BillyError::InvalidParameter(format!(
                "{name} is a scalar, expected a series"
            ))),
            None => Err(BillyError::MissingParameter(name.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// PointEstimate
// ---------------------------------------------------------------------------

/// A single parameter set, e.g. the MAP estimate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointEstimate {
    values: IndexMap<String, ParameterValue>,
}

impl PointEstimate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, ParameterValue::Scalar(value));
        self
    }

    pub fn with_series(mut self, name: impl Into<String>, series: Vec<f64>) -> Self {
        self.insert(name, ParameterValue::Series(series));
        self
    }

    /// Set `name`, replacing an earlier value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: ParameterValue) {
        self.values.insert(name.into(), value);
    }

    pub fn from_json_str(raw: &str) -> BillyResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ParameterLookup for PointEstimate {
    fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }
}

// ---------------------------------------------------------------------------
// PosteriorSamples
// ---------------------------------------------------------------------------

/// An ensemble of posterior draws: every parameter carries `row_count` draws.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "IndexMap<String, Vec<ParameterValue>>",
    into = "IndexMap<String, Vec<ParameterValue>>"
)]
pub struct PosteriorSamples {
    draws: IndexMap<String, Vec<ParameterValue>>,
    row_count: usize,
}

impl TryFrom<IndexMap<String, Vec<ParameterValue>>> for PosteriorSamples {
    type Error = BillyError;

    fn try_from(draws: IndexMap<String, Vec<ParameterValue>>) -> BillyResult<Self> {
        Self::new(draws)
    }
}

impl From<PosteriorSamples> for IndexMap<String, Vec<ParameterValue>> {
    fn from(samples: PosteriorSamples) -> Self {
        samples.draws
    }
}

impl PosteriorSamples {
    pub fn new(draws: IndexMap<String, Vec<ParameterValue>>) -> BillyResult<Self> {
        let mut row_count: Option<usize> = None;
        for (name, column) in &draws {
            match row_count {
                None => row_count = Some(column.len()),
                Some(n) if n != column.len() => {
                    return Err(BillyError::InvalidInput(format!(
                        "posterior column {name} has {} draws, expected {n}",
                        column.len()
                    )));
                }
                Some(_) => {}
            }
        }
        let row_count = row_count.unwrap_or(0);
        if row_count == 0 {
            return Err(BillyError::InvalidInput(
                "posterior ensemble has no draws".to_string(),
            ));
        }
        Ok(Self { draws, row_count })
    }

    pub fn from_json_str(raw: &str) -> BillyResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn contains(&self, name: &str) -> bool {
        self.draws.contains_key(name)
    }

    fn column(&self, name: &str) -> BillyResult<&[ParameterValue]> {
        self.draws
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| BillyError::MissingParameter(name.to_string()))
    }

    /// The parameter set of one draw.
    pub fn select_row(&self, index: usize) -> BillyResult<PointEstimate> {
        if index >= self.row_count {
            return Err(BillyError::InvalidInput(format!(
                "row {index} out of range for {} draws",
                self.row_count
            )));
        }
        let values = self
            .draws
            .iter()
            .map(|(name, column)| (name.clone(), column[index].clone()))
            .collect();
        Ok(PointEstimate { values })
    }

    /// Per-parameter median across draws (elementwise for series).
    pub fn median(&self) -> BillyResult<PointEstimate> {
        let mut values = IndexMap::with_capacity(self.draws.len());
        for name in self.draws.keys() {
            values.insert(name.clone(), self.median_of(name)?);
        }
        Ok(PointEstimate { values })
    }

    /// Median across draws of a single parameter, NaN draws ignored.
    pub fn median_of(&self, name: &str) -> BillyResult<ParameterValue> {
        let column = self.column(name)?;
        match &column[0] {
            ParameterValue::Scalar(_) => {
                let scalars = column
                    .iter()
                    .map(|v| match v {
                        ParameterValue::Scalar(x) => Ok(*x),
                        ParameterValue::Series(_) => Err(mixed_column(name)),
                    })
                    .collect::<BillyResult<Vec<f64>>>()?;
                Ok(ParameterValue::Scalar(nan_median(&scalars)))
            }
            ParameterValue::Series(first) => {
                let width = first.len();
                let mut rows = Vec::with_capacity(column.len());
                for v in column {
                    match v {
                        ParameterValue::Series(s) if s.len() == width => rows.push(s.as_slice()),
                        ParameterValue::Series(s) => {
                            return Err(BillyError::InvalidParameter(format!(
                                "draws of {name} differ in length ({} vs {width})",
                                s.len()
                            )))
                        }
                        ParameterValue::Scalar(_) => return Err(mixed_column(name)),
                    }
                }
                let mut scratch = Vec::with_capacity(rows.len());
                let medians = (0..width)
                    .map(|j| {
                        scratch.clear();
                        scratch.extend(rows.iter().map(|r| r[j]));
                        nan_median(&scratch)
                    })
                    .collect();
                Ok(ParameterValue::Series(medians))
            }
        }
    }

    /// Series of `n` distinct draws of `name`, chosen without replacement.
    pub fn sample_series(&self, name: &str, n: usize, seed: u64) -> BillyResult<Vec<Vec<f64>>> {
        let column = self.column(name)?;
        if n > self.row_count {
            return Err(BillyError::InvalidInput(format!(
                "cannot draw {n} samples without replacement from {} draws",
                self.row_count
            )));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rand::seq::index::sample(&mut rng, self.row_count, n)
            .into_iter()
            .map(|row| match &column[row] {
                ParameterValue::Series(s) => Ok(s.clone()),
                ParameterValue::Scalar(_) => Err(BillyError::InvalidParameter(format!(
                    "{name} is a scalar, expected a series"
                ))),
            })
            .collect()
    }
}

fn mixed_column(name: &str) -> BillyError {
    BillyError::InvalidParameter(format!("draws of {name} mix scalars and series"))
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// How a posterior ensemble is reduced to one parameter set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSelector {
    /// A specific draw.
    Index(usize),
    /// One draw picked uniformly with a caller-seeded RNG.
    SeededDraw { seed: u64 },
    /// Per-parameter median across all draws.
    Median,
}

impl RowSelector {
    /// Row picked by `Index` / `SeededDraw`; `None` for `Median`.
    pub fn row(&self, row_count: usize) -> Option<usize> {
        match *self {
            RowSelector::Index(i) => Some(i),
            RowSelector::SeededDraw { seed } => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                Some(rng.gen_range(0..row_count.max(1)))
            }
            RowSelector::Median => None,
        }
    }
}

/// Either a point estimate or a posterior ensemble.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "parameters", rename_all = "snake_case")]
pub enum ParameterSource {
    PointEstimate(PointEstimate),
    Posterior(PosteriorSamples),
}

impl ParameterSource {
    pub fn from_json_str(raw: &str) -> BillyResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn row_count(&self) -> usize {
        match self {
            ParameterSource::PointEstimate(_) => 1,
            ParameterSource::Posterior(p) => p.row_count(),
        }
    }

    pub fn is_posterior(&self) -> bool {
        matches!(self, ParameterSource::Posterior(_))
    }

    /// Reduce to a single parameter set. Point estimates ignore `selector`.
    pub fn resolve(&self, selector: &RowSelector) -> BillyResult<Cow<'_, PointEstimate>> {
        match self {
            ParameterSource::PointEstimate(p) => Ok(Cow::Borrowed(p)),
            ParameterSource::Posterior(samples) => match selector.row(samples.row_count()) {
                Some(row) => {
                    debug!(row, draws = samples.row_count(), "selected posterior draw");
                    Ok(Cow::Owned(samples.select_row(row)?))
                }
                None => Ok(Cow::Owned(samples.median()?)),
            },
        }
    }

    /// A scalar parameter: the point value, or the median across draws.
    pub fn aggregate_scalar(&self, name: &str) -> BillyResult<f64> {
        match self {
            ParameterSource::PointEstimate(p) => p.lookup_scalar(name),
            ParameterSource::Posterior(samples) => match samples.median_of(name)? {
                ParameterValue::Scalar(v) => Ok(v),
                ParameterValue::Series(s) if s.len() == 1 => Ok(s[0]),
                ParameterValue::Series(s) => Err(BillyError::InvalidParameter(format!(
                    "{name} is a series of length {}, expected a scalar",
                    s.len()
                ))),
            },
        }
    }
}
