use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use spectral_pt::camera::Camera;
use spectral_pt::filter::BoxFilter;
use spectral_pt::renderer::render_description;
use spectral_pt::sampler::{CameraSample, IndependentSampler, Sampler};
use spectral_pt::scenes::cornell_box;
use spectral_pt::settings::{IntegratorKind, RenderSettings};
use spectral_pt::{Point2i, INFINITY};

fn bench(c: &mut Criterion) {
    let desc = cornell_box().unwrap();
    let camera = desc.camera((256, 256)).unwrap();
    let lights = desc.build_lights();
    let scene = desc.build_scene(&lights);

    let mut sampler = IndependentSampler::new(512, 1);
    let filter = BoxFilter::default();
    let mut rng = Xoshiro256Plus::seed_from_u64(0);

    let mut group = c.benchmark_group("Cornell");
    group.throughput(Throughput::Elements(1));
    group.bench_function("scene intersect", |b| {
        b.iter(|| {
            let pixel = Point2i::new(rng.gen_range(0..256), rng.gen_range(0..256));
            sampler.start_pixel_sample(pixel, rng.gen_range(0..512), 0);
            let camera_sample: CameraSample = sampler.get_camera_sample(pixel, &filter);
            camera.generate_ray(camera_sample).and_then(|cr| scene.intersect(&cr.ray, INFINITY))
        })
    });

    for integrator in [IntegratorKind::Normal, IntegratorKind::Path] {
        let settings = RenderSettings { width: 32, height: 32, spp: 4, integrator, ..RenderSettings::default() };
        group.throughput(Throughput::Elements(32 * 32 * 4));
        group.sample_size(10);
        group.bench_function(format!("render 32x32 {:?}", integrator), |b| {
            b.iter(|| render_description(&desc, &settings).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench);
criterion_main!(benches);
