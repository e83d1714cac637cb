use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;
use voxblock::{voxelize, voxelize_multires, BlockMatcher, Point, PointCloud, Rgb};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_sphere_cloud(n: usize, radius: f64) -> PointCloud {
    let golden = std::f64::consts::PI * (3.0 - 5.0f64.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - y * y).sqrt();
            let theta = golden * i as f64;
            let p = [theta.cos() * r * radius, y * radius, theta.sin() * r * radius];
            Point::new(p, Rgb::new((y + 1.0) * 0.5, theta.sin().abs(), r))
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────────────

fn bench_voxelize(c: &mut Criterion) {
    let mut group = c.benchmark_group("voxelize");
    group.measurement_time(Duration::from_secs(3));

    for &n in &[10_000usize, 100_000] {
        let cloud = make_sphere_cloud(n, 10.0);
        group.bench_function(&format!("{}_single", n), |b| {
            b.iter(|| black_box(voxelize(black_box(&cloud), 0.25).unwrap()));
        });
        group.bench_function(&format!("{}_multires", n), |b| {
            b.iter(|| black_box(voxelize_multires(black_box(&cloud), 0.25, 4).unwrap()));
        });
    }
    group.finish();
}

fn bench_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_colors");
    group.measurement_time(Duration::from_secs(3));

    let palette: Vec<[f64; 3]> = (0..256)
        .map(|i| [(i * 7 % 256) as f64, (i * 13 % 256) as f64, (i * 29 % 256) as f64])
        .collect();
    let matcher = BlockMatcher::new(palette).unwrap();
    let queries: Vec<[f64; 3]> = make_sphere_cloud(20_000, 1.0)
        .iter()
        .map(|p| p.color.to_255())
        .collect();

    group.bench_function("20000x256", |b| {
        b.iter(|| black_box(matcher.match_colors(black_box(&queries))));
    });
    group.finish();
}

criterion_group!(benches, bench_voxelize, bench_match);
criterion_main!(benches);
