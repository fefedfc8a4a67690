//! Phase folding and phase binning of isolated signals.

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_MIN_BIN_ELEMENTS, MAX_PHASE_BINS};
use crate::errors::{BillyError, BillyResult};
use crate::models::{BinnedPhaseResult, Ephemeris, PhaseFoldResult};
use crate::stats::{nan_mean, nan_median};

/// Fold `time` at `period` around `epoch`.
///
/// Phases are `((t - epoch) / period) mod 1`; with `wrap` the upper half is
/// shifted down so phases lie in `[-0.5, 0.5)`. Output is stably sorted by
/// phase, ties keeping input order.
pub fn fold(
    time: &[f64],
    value: &[f64],
    period: f64,
    epoch: f64,
    wrap: bool,
) -> BillyResult<PhaseFoldResult> {
    if !(period.is_finite() && period > 0.0) {
        return Err(BillyError::InvalidParameter(format!(
            "fold period must be positive, got {period}"
        )));
    }
    if !epoch.is_finite() {
        return Err(BillyError::InvalidParameter(format!(
            "fold epoch must be finite, got {epoch}"
        )));
    }
    if time.len() != value.len() {
        return Err(BillyError::InvalidInput(format!(
            "fold inputs differ in length (time={}, value={})",
            time.len(),
            value.len()
        )));
    }
    if time.iter().any(|t| !t.is_finite()) {
        return Err(BillyError::InvalidInput("fold times must be finite".to_string()));
    }

    let raw: Vec<f64> = time
        .iter()
        .map(|t| {
            let cycles = (t - epoch) / period;
            let mut phase = cycles - cycles.floor();
            // a tiny negative fraction rounds up to exactly 1.0
            if phase >= 1.0 {
                phase = 0.0;
            }
            if wrap && phase >= 0.5 {
                phase -= 1.0;
            }
            phase
        })
        .collect();

    let mut order: Vec<usize> = (0..raw.len()).collect();
    order.sort_by(|&a, &b| raw[a].total_cmp(&raw[b]));

    Ok(PhaseFoldResult {
        phase: order.iter().map(|&i| raw[i]).collect(),
        value: order.iter().map(|&i| value[i]).collect(),
        wrapped: wrap,
    })
}

/// Fold at a recovered ephemeris, wrapped.
pub fn fold_at(time: &[f64], value: &[f64], ephemeris: &Ephemeris) -> BillyResult<PhaseFoldResult> {
    fold(time, value, ephemeris.period, ephemeris.epoch, true)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinAggregate {
    #[default]
    Median,
    Mean,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinOptions {
    pub binsize: f64,
    pub aggregate: BinAggregate,
    /// Bins holding fewer points are dropped.
    pub min_elements: usize,
}

impl BinOptions {
    pub fn new(binsize: f64) -> Self {
        Self {
            binsize,
            aggregate: BinAggregate::Median,
            min_elements: DEFAULT_MIN_BIN_ELEMENTS,
        }
    }
}

/// Median-bin a fold into `ceil(1 / binsize)` equal-width bins.
pub fn bin(folded: &PhaseFoldResult, binsize: f64) -> BillyResult<BinnedPhaseResult> {
    bin_with(folded, &BinOptions::new(binsize))
}

/// Bin a fold; empty bins are omitted rather than padded.
pub fn bin_with(folded: &PhaseFoldResult, options: &BinOptions) -> BillyResult<BinnedPhaseResult> {
    let binsize = options.binsize;
    if !(binsize.is_finite() && binsize > 0.0) {
        return Err(BillyError::InvalidParameter(format!(
            "binsize must be positive, got {binsize}"
        )));
    }
    let n_bins = (1.0 / binsize).ceil().max(1.0);
    if n_bins > MAX_PHASE_BINS as f64 {
        return Err(BillyError::InvalidParameter(format!(
            "binsize {binsize} needs more than {MAX_PHASE_BINS} bins"
        )));
    }
    let n_bins = n_bins as usize;
    let start = if folded.wrapped { -0.5 } else { 0.0 };
    let end = start + 1.0;

    let bin_index = |phase: f64| -> usize {
        let mut k = (((phase - start) / binsize).floor() as usize).min(n_bins - 1);
        // never open a bin whose lower edge rounds onto the domain end
        while k > 0 && start + k as f64 * binsize >= end {
            k -= 1;
        }
        k
    };
    let aggregate = |values: &[f64]| match options.aggregate {
        BinAggregate::Median => nan_median(values),
        BinAggregate::Mean => nan_mean(values),
    };

    let mut out = BinnedPhaseResult {
        bin_phase_center: Vec::new(),
        bin_value: Vec::new(),
        bin_count: Vec::new(),
    };
    let mut members: Vec<f64> = Vec::new();
    let mut current: Option<usize> = None;

    let flush = |k: usize, members: &mut Vec<f64>, out: &mut BinnedPhaseResult| {
        if !members.is_empty() && members.len() >= options.min_elements {
            let lo = start + k as f64 * binsize;
            let hi = (lo + binsize).min(end);
            out.bin_phase_center.push(0.5 * (lo + hi));
            out.bin_value.push(aggregate(members));
            out.bin_count.push(members.len());
        }
        members.clear();
    };

    // phases arrive sorted, so each bin is one contiguous run
    for (&phase, &value) in folded.phase.iter().zip(&folded.value) {
        let k = bin_index(phase);
        if let Some(prev) = current {
            if prev != k {
                flush(prev, &mut members, &mut out);
            }
        }
        current = Some(k);
        members.push(value);
    }
    if let Some(prev) = current {
        flush(prev, &mut members, &mut out);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn test_fold_wraps_and_sorts() {
        let folded = fold(&[0.1, 0.6, 1.25, 2.9], &[1.0, 2.0, 3.0, 4.0], 1.0, 0.0, true).unwrap();
        assert!(folded.wrapped);
        let expected = [-0.4, -0.1, 0.1, 0.25];
        for (p, e) in folded.phase.iter().zip(expected) {
            assert_abs_diff_eq!(*p, e, epsilon = 1e-12);
        }
        assert_eq!(folded.value, vec![2.0, 4.0, 1.0, 3.0]);
    }

    #[test]
    fn test_fold_without_wrap_stays_in_unit_interval() {
        let folded = fold(&[-0.25, 0.75, 3.5], &[1.0, 2.0, 3.0], 1.0, 0.0, false).unwrap();
        assert_eq!(folded.phase, vec![0.5, 0.75, 0.75]);
        // tie at 0.75 keeps input order
        assert_eq!(folded.value, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_fold_honours_epoch() {
        let folded = fold(&[10.75], &[1.0], 0.5, 10.5, true).unwrap();
        assert_abs_diff_eq!(folded.phase[0], -0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_fold_rejects_bad_parameters() {
        assert!(matches!(
            fold(&[0.0], &[1.0], 0.0, 0.0, true),
            Err(BillyError::InvalidParameter(_))
        ));
        assert!(matches!(
            fold(&[0.0], &[1.0], -1.0, 0.0, true),
            Err(BillyError::InvalidParameter(_))
        ));
        assert!(matches!(
            fold(&[0.0, 1.0], &[1.0], 1.0, 0.0, true),
            Err(BillyError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_two_points_give_two_bins() {
        let folded = fold(&[0.1, 0.6], &[5.0, 7.0], 1.0, 0.0, true).unwrap();
        let binned = bin(&folded, 0.5).unwrap();
        assert_eq!(binned.bin_phase_center, vec![-0.25, 0.25]);
        assert_eq!(binned.bin_value, vec![7.0, 5.0]);
        assert_eq!(binned.bin_count, vec![1, 1]);
    }

    #[test]
    fn test_empty_bins_are_omitted() {
        let folded = fold(&[0.015, 0.045, 0.075], &[1.0, 3.0, 2.0], 1.0, 0.0, true).unwrap();
        let binned = bin(&folded, 0.01).unwrap();
        assert_eq!(binned.bin_phase_center.len(), 3);
        assert!(binned.bin_value.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_median_and_mean_aggregates() {
        let folded = fold(&[0.1, 0.2, 0.3], &[1.0, 2.0, 9.0], 1.0, 0.0, true).unwrap();
        let median = bin(&folded, 0.5).unwrap();
        assert_eq!(median.bin_value, vec![2.0]);
        let mean = bin_with(
            &folded,
            &BinOptions {
                aggregate: BinAggregate::Mean,
                ..BinOptions::new(0.5)
            },
        )
        .unwrap();
        assert_eq!(mean.bin_value, vec![4.0]);
    }

    #[test]
    fn test_min_elements_drops_sparse_bins() {
        let folded = fold(&[0.1, 0.15, 0.7], &[1.0, 2.0, 3.0], 1.0, 0.0, true).unwrap();
        let binned = bin_with(
            &folded,
            &BinOptions {
                min_elements: 2,
                ..BinOptions::new(0.5)
            },
        )
        .unwrap();
        assert_eq!(binned.bin_phase_center, vec![0.25]);
        assert_eq!(binned.bin_count, vec![2]);
    }

    #[test]
    fn test_truncated_last_bin_is_centered_inside_domain() {
        let folded = fold(&[0.45], &[1.0], 1.0, 0.0, true).unwrap();
        let binned = bin(&folded, 0.3).unwrap();
        // bins: [-0.5,-0.2) [-0.2,0.1) [0.1,0.4) [0.4,0.5)
        assert_eq!(binned.bin_phase_center.len(), 1);
        assert_abs_diff_eq!(binned.bin_phase_center[0], 0.45, epsilon = 1e-12);
    }

    #[test]
    fn test_bin_rejects_non_positive_binsize() {
        let folded = fold(&[0.1], &[1.0], 1.0, 0.0, true).unwrap();
        for bad in [0.0, -0.1, f64::NAN] {
            assert!(matches!(
                bin(&folded, bad),
                Err(BillyError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_unwrapped_bins_cover_unit_interval() {
        let folded = fold(&[0.1, 0.9], &[1.0, 2.0], 1.0, 0.0, false).unwrap();
        let binned = bin(&folded, 0.5).unwrap();
        assert_eq!(binned.bin_phase_center, vec![0.25, 0.75]);
    }

    proptest! {
        #[test]
        fn prop_wrapped_phase_in_range(
            times in proptest::collection::vec(-1e4f64..1e4, 1..200),
            period in 1e-3f64..100.0,
            epoch in -1e3f64..1e3,
        ) {
            let values = vec![0.0; times.len()];
            let folded = fold(&times, &values, period, epoch, true).unwrap();
            prop_assert!(folded.phase.iter().all(|p| (-0.5..0.5).contains(p)));
            prop_assert!(folded.phase.windows(2).all(|w| w[0] <= w[1]));
        }

        #[test]
        fn prop_binning_coverage(
            times in proptest::collection::vec(0.0f64..100.0, 1..300),
            binsize in 1e-3f64..=1.0,
        ) {
            let values: Vec<f64> = times.iter().map(|t| t.sin()).collect();
            let folded = fold(&times, &values, 0.731, 0.0, true).unwrap();
            let binned = bin(&folded, binsize).unwrap();
            let max_bins = (1.0 / binsize).ceil() as usize;
            prop_assert!(binned.bin_phase_center.len() <= max_bins);
            prop_assert!(binned.bin_phase_center.iter().all(|c| (-0.5..0.5).contains(c)));
            prop_assert!(binned.bin_phase_center.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(binned.bin_count.iter().sum::<usize>(), times.len());
        }
    }
}
