use criterion::{criterion_group, criterion_main, Criterion};
use linfa::ParamGuard;
use ndarray::Array1;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use okriging_kriging::{OrdinaryKriging, StationPoint};
use okriging_raster::GridParams;
use rand_xoshiro::Xoshiro256Plus;

fn stations(n: usize) -> Vec<StationPoint<f64>> {
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let lat = Array1::random_using(n, Uniform::new(47.5, 54.5), &mut rng);
    let lon = Array1::random_using(n, Uniform::new(6., 15.), &mut rng);
    let noise = Array1::random_using(n, Uniform::new(0., 2.), &mut rng);
    (0..n)
        .map(|i| {
            let value = 3. * (lat[i] - 47.) + 1.5 * (lon[i] - 6.) + noise[i];
            StationPoint::new(format!("S{i}"), lat[i], lon[i], value)
        })
        .collect()
}

fn criterion_kriging(c: &mut Criterion) {
    let nts = [50, 200];
    let grid = GridParams::new(47., 55., 5., 16.)
        .rows(100)
        .check()
        .expect("valid grid");

    let mut group = c.benchmark_group("kriging");
    group.sample_size(10);
    for nt in nts {
        let points = stations(nt);
        let params = OrdinaryKriging::params()
            .check()
            .expect("valid parameters");
        group.bench_function(format!("fit {nt}"), |b| {
            b.iter(|| std::hint::black_box(params.fit(&points).expect("kriging fit")));
        });
        let kriging = params.fit(&points).expect("kriging fit");
        group.bench_function(format!("interpolate {nt}"), |b| {
            b.iter(|| {
                std::hint::black_box(kriging.interpolate(&grid).expect("kriging interpolation"))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_kriging);
criterion_main!(benches);
