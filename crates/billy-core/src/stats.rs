//! Free-standing numeric helpers: goodness of fit, robust aggregates, flattening.

use serde::{Deserialize, Serialize};

use crate::errors::{BillyError, BillyResult};

/// χ² = Σ (y_mod − y_obs)² / y_err².
pub fn chisq(y_mod: &[f64], y_obs: &[f64], y_err: &[f64]) -> BillyResult<f64> {
    if y_mod.len() != y_obs.len() || y_obs.len() != y_err.len() {
        return Err(BillyError::InvalidInput(format!(
            "chisq inputs differ in length ({}, {}, {})",
            y_mod.len(),
            y_obs.len(),
            y_err.len()
        )));
    }
    if let Some(bad) = y_err.iter().find(|e| e.is_nan() || **e <= 0.0) {
        return Err(BillyError::InvalidInput(format!(
            "uncertainties must be strictly positive, found {bad}"
        )));
    }
    Ok(y_mod
        .iter()
        .zip(y_obs)
        .zip(y_err)
        .map(|((m, o), e)| (m - o).powi(2) / e.powi(2))
        .sum())
}

/// Bayesian information criterion: χ² + k ln n, for `k` free parameters and
/// `n` data points.
pub fn bic(chisq: f64, k: usize, n: usize) -> BillyResult<f64> {
    if n == 0 {
        return Err(BillyError::InvalidInput(
            "BIC needs at least one data point".to_string(),
        ));
    }
    Ok(chisq + k as f64 * (n as f64).ln())
}

/// Median ignoring NaNs; NaN when nothing remains.
pub fn nan_median(values: &[f64]) -> f64 {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    if v.is_empty() {
        return f64::NAN;
    }
    v.sort_by(f64::total_cmp);
    let n = v.len();
    if n % 2 == 0 {
        0.5 * (v[n / 2 - 1] + v[n / 2])
    } else {
        v[n / 2]
    }
}

/// Mean ignoring NaNs; NaN when nothing remains.
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|x| !x.is_nan())
        .fold((0.0, 0usize), |(s, c), x| (s + x, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Arbitrarily nested numeric sequence, e.g. a table of true parameter values
/// where some entries are vectors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Nested {
    Leaf(f64),
    List(Vec<Nested>),
}

/// Depth-first flattening of [`Nested`] values into leaf order.
pub fn flatten(items: &[Nested]) -> Vec<f64> {
    fn walk(item: &Nested, out: &mut Vec<f64>) {
        match item {
            Nested::Leaf(v) => out.push(*v),
            Nested::List(children) => children.iter().for_each(|c| walk(c, out)),
        }
    }
    let mut out = Vec::new();
    items.iter().for_each(|i| walk(i, &mut out));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_chisq_basic() {
        let value = chisq(&[1.0, 2.0], &[1.5, 1.0], &[0.5, 1.0]).unwrap();
        assert_abs_diff_eq!(value, 1.0 + 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_chisq_rejects_zero_error() {
        assert!(matches!(
            chisq(&[1.0], &[1.0], &[0.0]),
            Err(BillyError::InvalidInput(_))
        ));
        assert!(chisq(&[1.0], &[1.0, 2.0], &[1.0]).is_err());
    }

    #[test]
    fn test_bic() {
        let value = bic(10.0, 3, 100).unwrap();
        assert_abs_diff_eq!(value, 10.0 + 3.0 * 100f64.ln(), epsilon = 1e-12);
        assert!(bic(1.0, 1, 0).is_err());
    }

    #[test]
    fn test_nan_median() {
        assert_eq!(nan_median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(nan_median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(nan_median(&[f64::NAN, 5.0, 1.0]), 3.0);
        assert!(nan_median(&[]).is_nan());
        assert!(nan_median(&[f64::NAN]).is_nan());
    }

    #[test]
    fn test_nan_mean() {
        assert_eq!(nan_mean(&[1.0, f64::NAN, 3.0]), 2.0);
        assert!(nan_mean(&[]).is_nan());
    }

    #[test]
    fn test_flatten_nested() {
        let nested: Vec<Nested> =
            serde_json::from_str("[1.0, [2.0, [3.0, 4.0]], [], 5.0]").unwrap();
        assert_eq!(flatten(&nested), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }
}
