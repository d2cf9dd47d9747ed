//! Benchmarks for the LS pipeline stages

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lsfactor_algorithms::hydrology::{
    derive_ls, downslope_angle, fill_sinks, flow_direction, inflow_mask, slope_length,
    DownslopeAngleParams, LsPipelineParams, SlopeLengthParams,
};
use lsfactor_core::{GeoTransform, Raster};

/// Create a DEM with a basin shape: higher edges sloping toward a center
/// outlet, plus small deterministic noise to avoid large flats.
fn create_basin_dem(size: usize) -> Raster<f64> {
    let mut dem = Raster::new(size, size);
    dem.set_transform(GeoTransform::new(0.0, size as f64 * 30.0, 30.0, -30.0));
    let center = size as f64 / 2.0;
    for row in 0..size {
        for col in 0..size {
            let dx = col as f64 - center;
            let dy = row as f64 - center;
            let dist = (dx * dx + dy * dy).sqrt();
            let noise = ((row * 7 + col * 13) % 17) as f64 * 0.01;
            dem.set(row, col, dist + noise).unwrap();
        }
    }
    dem
}

fn bench_fill_sinks(c: &mut Criterion) {
    let mut group = c.benchmark_group("hydrology/fill_sinks");
    for size in [128, 256, 512] {
        let dem = create_basin_dem(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| fill_sinks(black_box(&dem)).unwrap())
        });
    }
    group.finish();
}

fn bench_flow_direction(c: &mut Criterion) {
    let mut group = c.benchmark_group("hydrology/flow_direction");
    for size in [256, 512, 1024] {
        let dem = create_basin_dem(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| flow_direction(black_box(&dem)).unwrap())
        });
    }
    group.finish();
}

fn bench_slope_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("hydrology/slope_length");
    group.sample_size(20);
    for size in [128, 256, 512] {
        let dem = create_basin_dem(size);
        let filled = fill_sinks(&dem).unwrap();
        let fdir = flow_direction(&filled).unwrap();
        let inflow = inflow_mask(&fdir).unwrap();
        let angle = downslope_angle(&filled, &fdir, DownslopeAngleParams::default()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                slope_length(
                    black_box(&fdir),
                    black_box(&inflow),
                    black_box(&angle),
                    SlopeLengthParams::default(),
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("hydrology/derive_ls");
    group.sample_size(10);
    for size in [128, 256] {
        let dem = create_basin_dem(size);
        let boundary = Raster::filled(size, size, 1u8);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                derive_ls(
                    black_box(&dem),
                    black_box(&boundary),
                    LsPipelineParams::default(),
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_fill_sinks,
    bench_flow_direction,
    bench_slope_length,
    bench_full_pipeline,
);
criterion_main!(benches);
