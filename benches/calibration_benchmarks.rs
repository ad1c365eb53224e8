//! Benchmarks for calibration and scroll decisions

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use head_scroller::{
    calibration::{Calibrator, ScrollIntent},
    constants::CALIBRATION_SAMPLES,
    pose_estimation::HeadPose,
    scroll_control::ScrollAccumulator,
};

fn benchmark_calibration(c: &mut Criterion) {
    let mut group = c.benchmark_group("calibration");

    #[allow(clippy::cast_precision_loss)]
    let poses: Vec<HeadPose> = (0..CALIBRATION_SAMPLES)
        .map(|i| HeadPose::new(180.0, 180.0, 175.0 + (i % 10) as f64))
        .collect();

    group.bench_function("full_calibration", |b| {
        b.iter(|| {
            let mut calibrator = Calibrator::new();
            for pose in &poses {
                black_box(calibrator.observe(pose));
            }
            black_box(calibrator.baseline());
        });
    });

    let mut calibrator = Calibrator::new();
    for pose in &poses {
        calibrator.observe(pose);
    }
    for roll in [150.0, 180.0, 200.0] {
        let pose = HeadPose::new(180.0, 180.0, roll);
        group.bench_with_input(BenchmarkId::new("calibrated_observe", roll), &pose, |b, pose| {
            b.iter(|| black_box(calibrator.observe(black_box(pose))));
        });
    }

    group.finish();
}

fn benchmark_scroll(c: &mut Criterion) {
    c.bench_function("scroll_accumulator", |b| {
        let mut accumulator = ScrollAccumulator::new();
        b.iter(|| black_box(accumulator.push(black_box(ScrollIntent::Down.scroll_amount()))));
    });
}

criterion_group!(benches, benchmark_calibration, benchmark_scroll);
criterion_main!(benches);
