use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use spectral_pt::sampling::sample_uniform_sphere;
use spectral_pt::shapes::intersect_triangle;
use spectral_pt::{Point2f, Point3f, Ray, INFINITY};

fn random_rays(n: usize, rng: &mut Xoshiro256Plus) -> Vec<Ray> {
    (0..n)
        .map(|_| {
            let origin = Point3f::new(rng.gen_range(-0.2..0.2), rng.gen_range(-0.2..0.2), -1.0);
            let jitter = sample_uniform_sphere(Point2f::new(rng.gen(), rng.gen())) * 0.5;
            Ray::new(origin, (Point3f::new(0.0, 0.0, 1.0) - origin) + jitter)
        })
        .collect()
}

fn bench(c: &mut Criterion) {
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let p0 = Point3f::new(-1.0, -1.0, 0.0);
    let p1 = Point3f::new(1.0, -1.0, 0.0);
    let p2 = Point3f::new(0.0, 1.0, 0.2);

    let mut group = c.benchmark_group("Triangle");
    for &n in &[1_000usize, 10_000] {
        let rays = random_rays(n, &mut rng);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("intersect", n), &rays, |b, rays| {
            b.iter(|| rays.iter().filter(|r| intersect_triangle(r, INFINITY, p0, p1, p2).is_some()).count())
        });
    }
    group.finish();
}

criterion_group!(benches, bench);
criterion_main!(benches);
