//! Summation of per-harmonic component series.
//!
//! The fitting engine emits every harmonic's sine and cosine term as a
//! deterministic series already evaluated on the time base, so a component's
//! contribution is the plain sum of those series; nothing is re-synthesized
//! from frequencies or phases here.

use crate::errors::{BillyError, BillyResult};
use crate::models::{HarmonicKey, ModelFamily, TrigKind};
use crate::params::{ParameterLookup, ParameterValue};

/// Add `value` onto `acc`, broadcasting scalars.
fn add_term(acc: &mut [f64], key: &HarmonicKey, value: &ParameterValue) -> BillyResult<()> {
    match value {
        ParameterValue::Series(series) => {
            if series.len() != acc.len() {
                return Err(BillyError::InvalidInput(format!(
                    "{key} has {} samples, time base has {}",
                    series.len(),
                    acc.len()
                )));
            }
            acc.iter_mut().zip(series).for_each(|(a, v)| *a += v);
        }
        ParameterValue::Scalar(v) => acc.iter_mut().for_each(|a| *a += v),
    }
    Ok(())
}

/// Sum of the first `harmonic_count` sine and cosine terms of `family`.
pub fn accumulate<P: ParameterLookup + ?Sized>(
    family: ModelFamily,
    harmonic_count: usize,
    source: &P,
    len: usize,
) -> BillyResult<Vec<f64>> {
    let mut acc = vec![0.0; len];
    for harmonic_index in 0..harmonic_count {
        for trig in [TrigKind::Sin, TrigKind::Cos] {
            let key = HarmonicKey::new(family, trig, harmonic_index);
            let name = key.to_string();
            let value = source
                .get(&name)
                .ok_or(BillyError::MissingParameter(name))?;
            add_term(&mut acc, &key, value)?;
        }
    }
    Ok(acc)
}
