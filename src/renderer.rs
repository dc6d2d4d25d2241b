//! Render orchestration: the parallel setup kernels and the per-pixel sample loop.
//!
//! Every pixel is owned by exactly one rayon task for the whole pass, which gets it as an
//! exclusive `FilmPixel`. Scene data is shared read-only, so the loop needs no locks.

use std::time::Instant;

use anyhow::{ensure, Context};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};

use crate::camera::Camera;
use crate::film::{FilmPixel, Pixel, PixelSensor, RgbFilm};
use crate::filter::Filter;
use crate::geometry::{Transform, Transformable};
use crate::integrator::Integrator;
use crate::light::DiffuseAreaLight;
use crate::material::Material;
use crate::primitive::GeometricPrimitive;
use crate::sampler::{PixelSampler, Sampler};
use crate::scene::Scene;
use crate::scenes::SceneDescription;
use crate::settings::RenderSettings;
use crate::shapes::{Triangle, TriangleMesh};
use crate::spectrum::{SampledSpectrum, SampledWavelengths};
use crate::Float;

/// One triangle handle per face of `mesh`.
pub fn build_triangles(mesh: &TriangleMesh) -> Vec<Triangle<'_>> {
    let triangles: Vec<_> = (0..mesh.n_triangles).into_par_iter().map(|i| Triangle::new(mesh, i)).collect();
    debug!(count = triangles.len(), "built triangles");
    triangles
}

/// Transforms every element in place.
pub fn apply_transform<T: Transformable + Send>(data: &mut [T], t: Transform) {
    data.par_iter_mut().for_each(|x| *x = x.transform(t));
}

pub fn init_pixels(n: usize) -> Vec<Pixel> {
    let mut pixels = Vec::with_capacity(n);
    pixels.par_extend((0..n).into_par_iter().map(|_| Pixel::default()));
    pixels
}

/// Pairs triangles with their material and, for emitters, with the light of the same index.
pub fn build_primitives<'a>(
    triangles: &[Triangle<'a>],
    material: Option<&'a Material>,
    area_lights: Option<&'a [DiffuseAreaLight<'a>]>,
) -> Vec<GeometricPrimitive<'a>> {
    let prims: Vec<_> = triangles
        .par_iter()
        .enumerate()
        .map(|(i, &tri)| GeometricPrimitive::new(tri, material, area_lights.and_then(|lights| lights.get(i))))
        .collect();
    debug!(count = prims.len(), emissive = area_lights.is_some(), "built primitives");
    prims
}

pub struct Renderer<'s, C: Camera, I: Integrator> {
    scene: &'s Scene<'s>,
    camera: &'s C,
    integrator: I,
    sampler: PixelSampler,
    filter: Box<dyn Filter>,
    show_progress: bool,
}

impl<'s, C: Camera, I: Integrator> Renderer<'s, C, I> {
    pub fn new(scene: &'s Scene<'s>, camera: &'s C, integrator: I, sampler: PixelSampler, filter: Box<dyn Filter>) -> Self {
        Self { scene, camera, integrator, sampler, filter, show_progress: false }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn samples_per_pixel(&self) -> u32 {
        self.sampler.samples_per_pixel()
    }

    /// Runs every sample of every pixel, accumulating into `film`.
    pub fn render<S: PixelSensor>(&self, film: &mut RgbFilm<S>) -> anyhow::Result<()> {
        ensure!(
            film.resolution() == self.camera.resolution(),
            "film resolution {:?} does not match camera resolution {:?}",
            film.resolution(),
            self.camera.resolution()
        );
        let res = film.resolution();
        let spp = self.samples_per_pixel();
        let span = info_span!("render", width = res.x, height = res.y, spp);
        let _enter = span.enter();
        let start = Instant::now();

        let progress = if self.show_progress {
            let bar = ProgressBar::new(res.x as u64 * res.y as u64);
            bar.set_style(
                ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} pixels")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        film.par_pixels_mut().for_each_with(self.sampler.clone(), |sampler, mut pixel| {
            for sample_index in 0..spp {
                self.evaluate_pixel_sample(&mut pixel, sampler, sample_index);
            }
            progress.inc(1);
        });
        progress.finish_and_clear();

        info!(elapsed_ms = start.elapsed().as_millis() as u64, "render finished");
        Ok(())
    }

    pub fn render_with_pool<S: PixelSensor>(&self, film: &mut RgbFilm<S>, pool: &rayon::ThreadPool) -> anyhow::Result<()> {
        pool.install(|| self.render(film))
    }

    /// Traces one camera sample and adds its radiance to `pixel`.
    pub fn evaluate_pixel_sample<S: PixelSensor>(
        &self,
        pixel: &mut FilmPixel<'_, S>,
        sampler: &mut PixelSampler,
        sample_index: u32,
    ) {
        let p = pixel.p();
        sampler.start_pixel_sample(p, sample_index, 0);

        let lu = sampler.get_1d();
        let mut lambda = SampledWavelengths::sample_visible(lu);
        let camera_sample = sampler.get_camera_sample(p, self.filter.as_ref());

        let mut l = SampledSpectrum::zero();
        if let Some(mut crd) = self.camera.generate_ray_differential(camera_sample) {
            let spp = sampler.samples_per_pixel();
            crd.ray.scale_differentials(Float::max(0.125, 1.0 / (spp as Float).sqrt()));
            if !crd.weight.is_black() {
                l = crd.weight * self.integrator.radiance(crd.ray, &mut lambda, self.scene, sampler, self.camera);
            }

            if l.has_nans() {
                warn!(x = p.x, y = p.y, sample = sample_index, "NaN radiance value");
            } else if l.has_infs() {
                warn!(x = p.x, y = p.y, sample = sample_index, "infinite radiance value");
            }
        }

        pixel.add_sample(&l, &lambda, camera_sample.filter_weight);
    }
}

/// Builds the described scene and renders it with `settings`, returning the finished film.
pub fn render_description(desc: &SceneDescription, settings: &RenderSettings) -> anyhow::Result<RgbFilm> {
    settings.validate()?;
    let resolution = (settings.width, settings.height);

    let camera = desc.camera(resolution)?;
    let mut film = RgbFilm::new(resolution, settings.color_space()?)?;
    let lights = desc.build_lights();
    let scene = desc.build_scene(&lights);

    let renderer = Renderer::new(
        &scene,
        &camera,
        settings.make_integrator(),
        settings.make_sampler(),
        settings.make_filter(),
    )
    .with_progress(settings.progress);

    match settings.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .context("failed to build render thread pool")?;
            renderer.render_with_pool(&mut film, &pool)?;
        }
        None => renderer.render(&mut film)?,
    }
    Ok(film)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::BoxFilter;
    use crate::integrator::SurfaceNormalIntegrator;
    use crate::sampler::IndependentSampler;
    use crate::scenes::{cornell_box, furnace};
    use crate::settings::{IntegratorKind, SamplerKind};
    use crate::spectrum::SRGB;
    use crate::{Normal3, Point2i};
    use pretty_assertions::assert_eq;

    fn small_settings() -> RenderSettings {
        RenderSettings { width: 6, height: 4, spp: 4, threads: Some(2), ..RenderSettings::default() }
    }

    #[test]
    fn test_apply_transform() {
        let mut points = vec![point3f!(0, 0, 0), point3f!(1, 2, 3)];
        apply_transform(&mut points, Transform::translate(vec3f!(1, 0, -1)));
        assert_eq!(points, vec![point3f!(1, 0, -1), point3f!(2, 2, 2)]);

        let mut normals = vec![Normal3::new(0.0, 0.0, 1.0)];
        apply_transform(&mut normals, Transform::scale(1.0, 1.0, 2.0));
        assert_eq!(normals[0], Normal3::new(0.0, 0.0, 0.5));
    }

    #[test]
    fn test_init_pixels_zeroed() {
        let pixels = init_pixels(10);
        assert_eq!(pixels.len(), 10);
        assert!(pixels.iter().all(|p| *p == Pixel::default()));
    }

    #[test]
    fn test_build_primitives_attaches_lights() {
        let desc = furnace(0.5, 1.0).unwrap();
        let lights = desc.build_lights();
        let scene = desc.build_scene(&lights);
        assert_eq!(scene.num_primitives(), 12);
        assert_eq!(scene.lights().len(), 12);

        let tris = build_triangles(&desc.objects[0].mesh);
        let prims = build_primitives(&tris, None, None);
        assert_eq!(prims.len(), tris.len());
    }

    #[test]
    fn test_render_is_deterministic_across_thread_counts() {
        let desc = cornell_box().unwrap();
        let one = render_description(&desc, &RenderSettings { threads: Some(1), ..small_settings() }).unwrap();
        let many = render_description(&desc, &RenderSettings { threads: Some(4), ..small_settings() }).unwrap();
        for y in 0..4 {
            for x in 0..6 {
                let p = Point2i::new(x, y);
                assert_eq!(one.pixel(p), many.pixel(p));
            }
        }
    }

    #[test]
    fn test_every_pixel_receives_samples() {
        let desc = furnace(0.5, 1.0).unwrap();
        let settings = RenderSettings {
            integrator: IntegratorKind::Normal,
            sampler: SamplerKind::Stratified,
            ..small_settings()
        };
        let film = render_description(&desc, &settings).unwrap();
        for y in 0..4 {
            for x in 0..6 {
                assert!(film.pixel(Point2i::new(x, y)).weight_sum > 0.0);
            }
        }
    }

    #[test]
    fn test_mismatched_film_is_rejected() {
        let desc = furnace(0.5, 1.0).unwrap();
        let camera = desc.camera((4, 4)).unwrap();
        let lights = desc.build_lights();
        let scene = desc.build_scene(&lights);
        let renderer = Renderer::new(
            &scene,
            &camera,
            SurfaceNormalIntegrator,
            IndependentSampler::new(1, 0).into(),
            Box::new(BoxFilter::default()),
        );
        let mut film = RgbFilm::new((5, 4), &SRGB).unwrap();
        assert!(renderer.render(&mut film).is_err());

        let mut film = RgbFilm::new((4, 4), &SRGB).unwrap();
        renderer.render(&mut film).unwrap();
        assert_eq!(film.pixel(Point2i::new(3, 3)).weight_sum, 1.0);
    }
}
