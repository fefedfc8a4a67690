//! Shared typed models used across the decomposition, spectral and phase layers.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{BillyError, BillyResult};

// ---------------------------------------------------------------------------
// Well-known parameter names emitted by the fitting engine
// ---------------------------------------------------------------------------

/// Full model series.
pub const FULL_MODEL_KEY: &str = "mu_model";
/// Transit-only component series.
pub const TRANSIT_KEY: &str = "mu_transit";
/// Rotation angular frequency [rad/day].
pub const ROTATION_OMEGA_KEY: &str = "omegarot";
/// Rotation phase offset [rad].
pub const ROTATION_PHI_KEY: &str = "phirot";
/// Orbital period [days].
pub const ORBITAL_PERIOD_KEY: &str = "period";
/// Orbital reference epoch [days].
pub const ORBITAL_EPOCH_KEY: &str = "t0";

// ---------------------------------------------------------------------------
// 1. TimeSeries
// ---------------------------------------------------------------------------

/// Observed photometry: time [days], relative flux and flux uncertainty.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeSeries {
    time: Vec<f64>,
    value: Vec<f64>,
    uncertainty: Vec<f64>,
}

impl TimeSeries {
    pub fn new(time: Vec<f64>, value: Vec<f64>, uncertainty: Vec<f64>) -> BillyResult<Self> {
        if time.len() != value.len() || time.len() != uncertainty.len() {
            return Err(BillyError::InvalidInput(format!(
                "time series arrays differ in length (time={}, value={}, uncertainty={})",
                time.len(),
                value.len(),
                uncertainty.len()
            )));
        }
        Ok(Self {
            time,
            value,
            uncertainty,
        })
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn value(&self) -> &[f64] {
        &self.value
    }

    pub fn uncertainty(&self) -> &[f64] {
        &self.uncertainty
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

// ---------------------------------------------------------------------------
// 2. Model components
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Rotation,
    Orbital,
}

impl ModelFamily {
    /// Short tag used inside parameter names (`rot` / `orb`).
    pub fn tag(self) -> &'static str {
        match self {
            ModelFamily::Rotation => "rot",
            ModelFamily::Orbital => "orb",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "rot" => Some(ModelFamily::Rotation),
            "orb" => Some(ModelFamily::Orbital),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrigKind {
    Sin,
    Cos,
}

impl TrigKind {
    pub fn tag(self) -> &'static str {
        match self {
            TrigKind::Sin => "sin",
            TrigKind::Cos => "cos",
        }
    }
}

static HARMONIC_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^mu_(rot|orb)(sin|cos)(\d+)$").unwrap());

/// Structured name of one per-harmonic deterministic series, e.g. `mu_rotsin0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HarmonicKey {
    pub family: ModelFamily,
    pub trig: TrigKind,
    pub harmonic_index: usize,
}

impl HarmonicKey {
    pub fn new(family: ModelFamily, trig: TrigKind, harmonic_index: usize) -> Self {
        Self {
            family,
            trig,
            harmonic_index,
        }
    }
}

impl fmt::Display for HarmonicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mu_{}{}{}",
            self.family.tag(),
            self.trig.tag(),
            self.harmonic_index
        )
    }
}

impl FromStr for HarmonicKey {
    type Err = BillyError;

    fn from_str(s: &str) -> BillyResult<Self> {
        let caps = HARMONIC_KEY_RE
            .captures(s)
            .ok_or_else(|| BillyError::InvalidInput(format!("not a harmonic key: {s:?}")))?;
        let family = ModelFamily::from_tag(&caps[1])
            .ok_or_else(|| BillyError::InvalidInput(format!("unknown family in {s:?}")))?;
        let trig = if &caps[2] == "sin" {
            TrigKind::Sin
        } else {
            TrigKind::Cos
        };
        let harmonic_index = caps[3]
            .parse::<usize>()
            .map_err(|e| BillyError::InvalidInput(format!("bad harmonic index in {s:?}: {e}")))?;
        Ok(Self::new(family, trig, harmonic_index))
    }
}

/// One periodic component of the fitted model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelComponentSpec {
    pub family: ModelFamily,
    pub harmonic_count: usize,
}

impl ModelComponentSpec {
    pub fn new(family: ModelFamily, harmonic_count: usize) -> Self {
        Self {
            family,
            harmonic_count,
        }
    }

    /// Parse an upstream component token such as `"1rot"` or `"2orb"`.
    ///
    /// Returns `Ok(None)` for tokens naming neither family (`"transit"`).
    pub fn parse_token(token: &str) -> BillyResult<Option<Self>> {
        let family = if token.contains("rot") {
            ModelFamily::Rotation
        } else if token.contains("orb") {
            ModelFamily::Orbital
        } else {
            return Ok(None);
        };
        let digits: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(BillyError::InvalidInput(format!(
                "component token {token:?} has no harmonic count"
            )));
        }
        let harmonic_count = digits
            .parse::<usize>()
            .map_err(|e| BillyError::InvalidInput(format!("component token {token:?}: {e}")))?;
        Ok(Some(Self::new(family, harmonic_count)))
    }
}

/// The declared model: at most one component per family.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    components: Vec<ModelComponentSpec>,
}

impl ModelSpec {
    pub fn new(components: Vec<ModelComponentSpec>) -> BillyResult<Self> {
        for (i, c) in components.iter().enumerate() {
            if components[..i].iter().any(|o| o.family == c.family) {
                return Err(BillyError::InvalidInput(format!(
                    "duplicate {:?} component in model",
                    c.family
                )));
            }
        }
        Ok(Self { components })
    }

    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> BillyResult<Self> {
        let mut components = Vec::new();
        for token in tokens {
            if let Some(c) = ModelComponentSpec::parse_token(token.as_ref())? {
                components.push(c);
            }
        }
        Self::new(components)
    }

    pub fn component(&self, family: ModelFamily) -> Option<&ModelComponentSpec> {
        self.components.iter().find(|c| c.family == family)
    }

    pub fn components(&self) -> &[ModelComponentSpec] {
        &self.components
    }
}

// ---------------------------------------------------------------------------
// 3. ResidualBundle
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualKey {
    Time,
    Observed,
    Uncertainty,
    IsolatedRotation,
    IsolatedOrbital,
    FullResidual,
    RotationModel,
    OrbitalModel,
    TransitModel,
    FullModel,
}

impl ResidualKey {
    pub const ALL: [ResidualKey; 10] = [
        ResidualKey::Time,
        ResidualKey::Observed,
        ResidualKey::Uncertainty,
        ResidualKey::IsolatedRotation,
        ResidualKey::IsolatedOrbital,
        ResidualKey::FullResidual,
        ResidualKey::RotationModel,
        ResidualKey::OrbitalModel,
        ResidualKey::TransitModel,
        ResidualKey::FullModel,
    ];

    /// The flux series whose spectra are inspected: raw, rotation-isolated,
    /// orbit-isolated and full residual.
    pub const SPECTRAL: [ResidualKey; 4] = [
        ResidualKey::Observed,
        ResidualKey::IsolatedRotation,
        ResidualKey::IsolatedOrbital,
        ResidualKey::FullResidual,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResidualKey::Time => "time",
            ResidualKey::Observed => "observed",
            ResidualKey::Uncertainty => "uncertainty",
            ResidualKey::IsolatedRotation => "isolated_rotation",
            ResidualKey::IsolatedOrbital => "isolated_orbital",
            ResidualKey::FullResidual => "full_residual",
            ResidualKey::RotationModel => "rotation_model",
            ResidualKey::OrbitalModel => "orbital_model",
            ResidualKey::TransitModel => "transit_model",
            ResidualKey::FullModel => "full_model",
        }
    }
}

/// Aligned series produced by [`crate::signal::decompose::decompose`].
///
/// `orbital_model` already includes the transit component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResidualBundle {
    pub time: Vec<f64>,
    pub observed: Vec<f64>,
    pub uncertainty: Vec<f64>,
    pub isolated_rotation: Vec<f64>,
    pub isolated_orbital: Vec<f64>,
    pub full_residual: Vec<f64>,
    pub rotation_model: Vec<f64>,
    pub orbital_model: Vec<f64>,
    pub transit_model: Vec<f64>,
    pub full_model: Vec<f64>,
}

impl ResidualBundle {
    pub fn get(&self, key: ResidualKey) -> &[f64] {
        match key {
            ResidualKey::Time => &self.time,
            ResidualKey::Observed => &self.observed,
            ResidualKey::Uncertainty => &self.uncertainty,
            ResidualKey::IsolatedRotation => &self.isolated_rotation,
            ResidualKey::IsolatedOrbital => &self.isolated_orbital,
            ResidualKey::FullResidual => &self.full_residual,
            ResidualKey::RotationModel => &self.rotation_model,
            ResidualKey::OrbitalModel => &self.orbital_model,
            ResidualKey::TransitModel => &self.transit_model,
            ResidualKey::FullModel => &self.full_model,
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// SHA-256 hex digest over every series' exact bit patterns.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for key in ResidualKey::ALL {
            hasher.update(key.as_str().as_bytes());
            for v in self.get(key) {
                hasher.update(v.to_bits().to_le_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

// ---------------------------------------------------------------------------
// 4. Spectra
// ---------------------------------------------------------------------------

/// The `(period_min, period_max, n_freqs)` triple a spectrum was built on.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrequencyGridSpec {
    pub period_min: f64,
    pub period_max: f64,
    pub n_freqs: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerSpectrum {
    /// Ascending frequency [1/day].
    pub frequency: Vec<f64>,
    /// `1 / frequency`, hence descending.
    pub period: Vec<f64>,
    pub power: Vec<f64>,
    pub grid: FrequencyGridSpec,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpectralPeak {
    pub period: f64,
    pub power: f64,
}

impl PowerSpectrum {
    /// Highest-power grid point; first one wins on ties.
    pub fn peak(&self) -> Option<SpectralPeak> {
        let mut best: Option<SpectralPeak> = None;
        for (&period, &power) in self.period.iter().zip(&self.power) {
            if best.map_or(true, |b| power > b.power) {
                best = Some(SpectralPeak { period, power });
            }
        }
        best
    }

    /// Power at the grid point whose period is closest to `period`.
    pub fn power_near(&self, period: f64) -> Option<SpectralPeak> {
        self.period
            .iter()
            .zip(&self.power)
            .min_by(|(a, _), (b, _)| (*a - period).abs().total_cmp(&(*b - period).abs()))
            .map(|(&period, &power)| SpectralPeak { period, power })
    }
}

// ---------------------------------------------------------------------------
// 5. Phase products
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseFoldResult {
    /// Ascending; in `[-0.5, 0.5)` when `wrapped`, else `[0, 1)`.
    pub phase: Vec<f64>,
    pub value: Vec<f64>,
    pub wrapped: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinnedPhaseResult {
    pub bin_phase_center: Vec<f64>,
    pub bin_value: Vec<f64>,
    /// Number of folded points aggregated into each emitted bin.
    pub bin_count: Vec<usize>,
}

/// Physical period and reference epoch of one periodic component.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ephemeris {
    pub period: f64,
    pub epoch: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_series_rejects_ragged_arrays() {
        let err = TimeSeries::new(vec![0.0, 1.0], vec![1.0], vec![0.1, 0.1]).unwrap_err();
        assert!(matches!(err, BillyError::InvalidInput(_)));
    }

    #[test]
    fn test_harmonic_key_encoding() {
        let key = HarmonicKey::new(ModelFamily::Rotation, TrigKind::Sin, 0);
        assert_eq!(key.to_string(), "mu_rotsin0");
        let key = HarmonicKey::new(ModelFamily::Orbital, TrigKind::Cos, 12);
        assert_eq!(key.to_string(), "mu_orbcos12");
    }

    #[test]
    fn test_harmonic_key_decoding() {
        let key: HarmonicKey = "mu_orbsin3".parse().unwrap();
        assert_eq!(key, HarmonicKey::new(ModelFamily::Orbital, TrigKind::Sin, 3));
        assert_eq!(key.to_string().parse::<HarmonicKey>().unwrap(), key);
    }

    #[test]
    fn test_harmonic_key_rejects_malformed() {
        for bad in ["mu_rotsin", "mu_foocos1", "rotsin0", "mu_rottan0", "mu_rotsin0x"] {
            assert!(bad.parse::<HarmonicKey>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_component_token_parsing() {
        assert_eq!(
            ModelComponentSpec::parse_token("2rot").unwrap(),
            Some(ModelComponentSpec::new(ModelFamily::Rotation, 2))
        );
        assert_eq!(
            ModelComponentSpec::parse_token("1orb").unwrap(),
            Some(ModelComponentSpec::new(ModelFamily::Orbital, 1))
        );
        assert_eq!(ModelComponentSpec::parse_token("transit").unwrap(), None);
        assert!(ModelComponentSpec::parse_token("rot").is_err());
    }

    #[test]
    fn test_model_spec_rejects_duplicate_family() {
        let err = ModelSpec::from_tokens(&["1rot", "2rot"]).unwrap_err();
        assert!(matches!(err, BillyError::InvalidInput(_)));

        let spec = ModelSpec::from_tokens(&["2rot", "1orb", "transit"]).unwrap();
        assert_eq!(spec.components().len(), 2);
        assert_eq!(spec.component(ModelFamily::Orbital).unwrap().harmonic_count, 1);
    }

    #[test]
    fn test_spectrum_peak_and_nearest() {
        let spectrum = PowerSpectrum {
            frequency: vec![1.0, 2.0, 4.0],
            period: vec![1.0, 0.5, 0.25],
            power: vec![0.1, 0.8, 0.3],
            grid: FrequencyGridSpec {
                period_min: 0.25,
                period_max: 1.0,
                n_freqs: 3,
            },
        };
        let peak = spectrum.peak().unwrap();
        assert_eq!(peak.period, 0.5);
        assert_eq!(peak.power, 0.8);
        assert_eq!(spectrum.power_near(0.3).unwrap().period, 0.25);
    }

    #[test]
    fn test_fingerprint_detects_single_bit_change() {
        let series = vec![1.0, 2.0, 3.0];
        let mut bundle = ResidualBundle {
            time: series.clone(),
            observed: series.clone(),
            uncertainty: series.clone(),
            isolated_rotation: series.clone(),
            isolated_orbital: series.clone(),
            full_residual: series.clone(),
            rotation_model: series.clone(),
            orbital_model: series.clone(),
            transit_model: series.clone(),
            full_model: series,
        };
        let before = bundle.fingerprint();
        assert_eq!(before.len(), 64);
        assert_eq!(before, bundle.clone().fingerprint());
        bundle.full_residual[1] = f64::from_bits(2.0f64.to_bits() + 1);
        assert_ne!(before, bundle.fingerprint());
    }
}
