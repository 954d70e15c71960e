//! # Kinematics Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use acq_lib::kinematics::{solve_aimed_pose, solve_pose, AimSide, ArmGeometry};
use nalgebra::Point3;
use util::maths::linspace;

fn kinematics_benchmark(c: &mut Criterion) {
    let geometry = ArmGeometry::default();
    let object = Point3::new(250.0, 0.0, 50.0);

    // Heights covering all three regions of the solution
    let heights = linspace(
        geometry.min_reachable_height_mm(),
        geometry.max_reachable_height_mm(),
        1000,
    );

    c.bench_function("solve_pose::envelope", |b| {
        b.iter(|| {
            for &h in heights.iter() {
                black_box(solve_pose(&geometry, h).unwrap());
            }
        })
    });

    c.bench_function("solve_aimed_pose::envelope", |b| {
        b.iter(|| {
            for &h in heights.iter() {
                black_box(solve_aimed_pose(&geometry, &object, h, AimSide::Front).unwrap());
            }
        })
    });
}

criterion_group!(benches, kinematics_benchmark);
criterion_main!(benches);
