//! Criterion benchmarks for billy-core.
//!
//! Everything here is pure Rust; the `python` feature is not needed.
//!
//! ## Benchmark groups
//!
//! 1. **frequency_grid**: Linear grid construction.
//! 2. **periodogram**: Single spectra at growing series lengths.
//! 3. **residual_periodograms**: Sequential vs rayon fan-out over a bundle.
//! 4. **decomposition**: MAP and seeded posterior decomposition.
//! 5. **phase**: Folding and median binning.
//! 6. **analysis**: The full split-signal pipeline.
//!
//! ## Running
//!
//! ```sh
//! cargo bench --manifest-path crates/billy-core/Cargo.toml
//! # Run only the periodogram group:
//! cargo bench --manifest-path crates/billy-core/Cargo.toml -- periodogram
//! ```

use std::f64::consts::TAU;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use indexmap::IndexMap;

use _billy_core::analysis::split_signal_analysis;
use _billy_core::config::{AnalysisConfig, DEFAULT_BINSIZE};
use _billy_core::models::{FrequencyGridSpec, ModelSpec, ResidualKey, TimeSeries};
use _billy_core::params::{
    ParameterSource, ParameterValue, PointEstimate, PosteriorSamples, RowSelector,
};
use _billy_core::phase::fold::{bin, fold};
use _billy_core::signal::decompose::decompose_from_source;
use _billy_core::spectral::periodogram::{compute_power_on_grid, residual_periodograms};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const P_ROT: f64 = 0.49914;
const P_ORB: f64 = 0.4485;

/// Irregular sampling over a 27-day sector.
fn sector_times(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            27.0 * x / n as f64 + 0.002 * (x * 0.7).sin()
        })
        .collect()
}

fn rotation(t: &[f64], amp: f64) -> Vec<f64> {
    t.iter().map(|t| amp * (TAU * t / P_ROT).sin()).collect()
}

fn orbital(t: &[f64], amp: f64) -> Vec<f64> {
    t.iter().map(|t| amp * (TAU * t / P_ORB).cos()).collect()
}

fn light_curve(n: usize) -> TimeSeries {
    let t = sector_times(n);
    let rot = rotation(&t, 0.02);
    let orb = orbital(&t, 0.004);
    let y = (0..n)
        .map(|i| 1.0 + rot[i] + orb[i] + 5e-4 * ((i * 7919) % 13) as f64 / 13.0)
        .collect();
    TimeSeries::new(t, y, vec![1e-3; n]).unwrap()
}

fn map_source(series: &TimeSeries) -> ParameterSource {
    let t = series.time();
    let zeros = vec![0.0; t.len()];
    ParameterSource::PointEstimate(
        PointEstimate::new()
            .with_series("mu_rotsin0", rotation(t, 0.02))
            .with_series("mu_rotcos0", zeros.clone())
            .with_series("mu_orbsin0", zeros.clone())
            .with_series("mu_orbcos0", orbital(t, 0.004))
            .with_series("mu_transit", zeros)
            .with_scalar("omegarot", TAU / P_ROT)
            .with_scalar("phirot", 0.0)
            .with_scalar("period", P_ORB)
            .with_scalar("t0", 0.0),
    )
}

fn posterior_source(series: &TimeSeries, rows: usize) -> ParameterSource {
    let t = series.time();
    let column = |f: &dyn Fn(f64) -> Vec<f64>| -> Vec<ParameterValue> {
        (0..rows)
            .map(|r| ParameterValue::Series(f(1.0 + 0.001 * r as f64)))
            .collect()
    };
    let mut draws = IndexMap::new();
    draws.insert("mu_rotsin0".to_string(), column(&|s| rotation(t, 0.02 * s)));
    draws.insert("mu_rotcos0".to_string(), column(&|_| vec![0.0; t.len()]));
    draws.insert("mu_orbsin0".to_string(), column(&|_| vec![0.0; t.len()]));
    draws.insert("mu_orbcos0".to_string(), column(&|s| orbital(t, 0.004 * s)));
    ParameterSource::Posterior(PosteriorSamples::new(draws).unwrap())
}

// ---------------------------------------------------------------------------
// 1. Frequency grid
// ---------------------------------------------------------------------------

fn bench_frequency_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("frequency_grid");

    for &n in &[300usize, 3000, 30000] {
        let grid = FrequencyGridSpec::new(0.3, 0.7, n).unwrap();
        group.bench_with_input(BenchmarkId::new("frequencies", n), &grid, |b, grid| {
            b.iter(|| black_box(grid.frequencies()));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// 2. Single periodogram
// ---------------------------------------------------------------------------

fn bench_periodogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("periodogram");
    group.measurement_time(std::time::Duration::from_secs(10));
    let grid = FrequencyGridSpec::new(0.3, 0.7, 3000).unwrap();

    for &n in &[500usize, 2000, 8000] {
        let series = light_curve(n);
        group.bench_with_input(BenchmarkId::new("default_grid", n), &series, |b, s| {
            b.iter(|| {
                compute_power_on_grid(s.time(), s.value(), s.uncertainty(), black_box(&grid))
                    .unwrap()
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// 3. Residual periodograms
// ---------------------------------------------------------------------------

fn bench_residual_periodograms(c: &mut Criterion) {
    let mut group = c.benchmark_group("residual_periodograms");
    group.measurement_time(std::time::Duration::from_secs(10));
    let grid = FrequencyGridSpec::new(0.3, 0.7, 3000).unwrap();
    let series = light_curve(2000);
    let model = ModelSpec::from_tokens(&["1rot", "1orb"]).unwrap();
    let bundle =
        decompose_from_source(&series, &model, &map_source(&series), &RowSelector::Median).unwrap();

    for parallel in [false, true] {
        let label = if parallel { "rayon" } else { "sequential" };
        group.bench_function(label, |b| {
            b.iter(|| {
                residual_periodograms(&bundle, &grid, &ResidualKey::SPECTRAL, parallel).unwrap()
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// 4. Decomposition
// ---------------------------------------------------------------------------

fn bench_decomposition(c: &mut Criterion) {
    let mut group = c.benchmark_group("decomposition");
    let series = light_curve(5000);
    let model = ModelSpec::from_tokens(&["1rot", "1orb"]).unwrap();

    let map = map_source(&series);
    group.bench_function("map", |b| {
        b.iter(|| decompose_from_source(&series, &model, &map, &RowSelector::Median).unwrap());
    });

    let posterior = posterior_source(&series, 200);
    group.bench_function("posterior_seeded_draw", |b| {
        b.iter(|| {
            decompose_from_source(
                &series,
                &model,
                &posterior,
                &RowSelector::SeededDraw { seed: 42 },
            )
            .unwrap()
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// 5. Fold and bin
// ---------------------------------------------------------------------------

fn bench_phase(c: &mut Criterion) {
    let mut group = c.benchmark_group("phase");

    for &n in &[1000usize, 10000] {
        let series = light_curve(n);
        group.bench_with_input(BenchmarkId::new("fold", n), &series, |b, s| {
            b.iter(|| fold(s.time(), s.value(), P_ROT, 0.0, true).unwrap());
        });

        let folded = fold(series.time(), series.value(), P_ROT, 0.0, true).unwrap();
        group.bench_with_input(BenchmarkId::new("bin_median", n), &folded, |b, f| {
            b.iter(|| bin(f, black_box(DEFAULT_BINSIZE)).unwrap());
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// 6. Full pipeline
// ---------------------------------------------------------------------------

fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");
    group.sample_size(20);
    let series = light_curve(2000);
    let model = ModelSpec::from_tokens(&["1rot", "1orb"]).unwrap();
    let source = map_source(&series);
    let config = AnalysisConfig {
        n_free_parameters: Some(8),
        ..AnalysisConfig::default()
    };

    group.bench_function("split_signal_map", |b| {
        b.iter(|| split_signal_analysis(&series, &model, &source, &config).unwrap());
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Register all benchmark groups
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_frequency_grid,
    bench_periodogram,
    bench_residual_periodograms,
    bench_decomposition,
    bench_phase,
    bench_analysis,
);
criterion_main!(benches);
