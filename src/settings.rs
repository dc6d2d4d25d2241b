//! Render configuration shared by the CLI, the tests and the benchmarks.

use anyhow::ensure;
use clap::ValueEnum;

use crate::filter::{BoxFilter, Filter, GaussianFilter};
use crate::integrator::{AmbientOcclusionIntegrator, PathIntegrator, RenderIntegrator, SurfaceNormalIntegrator};
use crate::sampler::{IndependentSampler, PixelSampler, StratifiedSampler};
use crate::spectrum::RgbColorSpace;
use crate::{Float, Vec2f};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum IntegratorKind {
    /// Visualizes the shading normal
    Normal,
    /// Unoccluded fraction of the cosine-weighted hemisphere
    #[value(name = "ao")]
    AmbientOcclusion,
    /// Unidirectional path tracing with light sampling
    Path,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SamplerKind {
    Independent,
    Stratified,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FilterKind {
    Box,
    Gaussian,
}

#[derive(Clone, Debug)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub spp: u32,
    pub seed: u64,

    pub integrator: IntegratorKind,
    pub max_depth: u32,
    pub rr_depth: u32,
    pub regularize: bool,
    pub ao_max_distance: Float,

    pub sampler: SamplerKind,
    pub jitter: bool,

    pub filter: FilterKind,
    pub filter_radius: Float,
    pub filter_sigma: Float,

    pub color_space: String,
    /// Size of a dedicated thread pool; `None` uses the global rayon pool.
    pub threads: Option<usize>,
    pub progress: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            spp: 16,
            seed: 0,
            integrator: IntegratorKind::Path,
            max_depth: 5,
            rr_depth: 1,
            regularize: false,
            ao_max_distance: Float::INFINITY,
            sampler: SamplerKind::Independent,
            jitter: true,
            filter: FilterKind::Gaussian,
            filter_radius: 1.5,
            filter_sigma: 0.5,
            color_space: "srgb".to_string(),
            threads: None,
            progress: false,
        }
    }
}

impl RenderSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.width > 0 && self.height > 0, "image resolution {}x{} has a zero dimension", self.width, self.height);
        ensure!(self.spp > 0, "samples per pixel must be positive");
        ensure!(self.filter_radius > 0.0, "filter radius must be positive, got {}", self.filter_radius);
        ensure!(self.filter_sigma > 0.0, "filter sigma must be positive, got {}", self.filter_sigma);
        ensure!(self.ao_max_distance > 0.0, "ambient occlusion distance must be positive");
        if let Some(threads) = self.threads {
            ensure!(threads > 0, "thread count must be positive");
        }
        Ok(())
    }

    pub fn color_space(&self) -> anyhow::Result<&'static RgbColorSpace> {
        RgbColorSpace::from_name(&self.color_space)
    }

    pub fn make_integrator(&self) -> RenderIntegrator {
        match self.integrator {
            IntegratorKind::Normal => SurfaceNormalIntegrator.into(),
            IntegratorKind::AmbientOcclusion => AmbientOcclusionIntegrator::new(self.ao_max_distance).into(),
            IntegratorKind::Path => {
                PathIntegrator::new(self.max_depth, self.regularize).with_rr_depth(self.rr_depth).into()
            }
        }
    }

    pub fn make_sampler(&self) -> PixelSampler {
        match self.sampler {
            SamplerKind::Independent => IndependentSampler::new(self.spp, self.seed).into(),
            SamplerKind::Stratified => StratifiedSampler::with_spp(self.spp, self.jitter, self.seed).into(),
        }
    }

    pub fn make_filter(&self) -> Box<dyn Filter> {
        let radius = Vec2f::new(self.filter_radius, self.filter_radius);
        match self.filter {
            FilterKind::Box => Box::new(BoxFilter::new(radius)),
            FilterKind::Gaussian => Box::new(GaussianFilter::new(radius, self.filter_sigma)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::Sampler;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let settings = RenderSettings::default();
        assert_eq!((settings.width, settings.height, settings.spp), (400, 400, 16));
        assert_eq!(settings.max_depth, 5);
        assert_eq!(settings.filter, FilterKind::Gaussian);
        assert_eq!(settings.color_space().unwrap().name, "srgb");
        settings.validate().unwrap();
    }

    #[test]
    fn test_invalid_settings() {
        assert!(RenderSettings { spp: 0, ..Default::default() }.validate().is_err());
        assert!(RenderSettings { width: 0, ..Default::default() }.validate().is_err());
        assert!(RenderSettings { threads: Some(0), ..Default::default() }.validate().is_err());
        assert!(RenderSettings { color_space: "cmyk".into(), ..Default::default() }.color_space().is_err());
    }

    #[test]
    fn test_factories_follow_choices() {
        let settings = RenderSettings {
            spp: 9,
            sampler: SamplerKind::Stratified,
            integrator: IntegratorKind::AmbientOcclusion,
            filter: FilterKind::Box,
            filter_radius: 0.5,
            ..Default::default()
        };
        let sampler = settings.make_sampler();
        assert!(matches!(sampler, PixelSampler::Stratified(_)));
        assert_eq!(sampler.samples_per_pixel(), 9);
        assert!(matches!(settings.make_integrator(), RenderIntegrator::AmbientOcclusion(_)));
        assert_eq!(settings.make_filter().radius(), Vec2f::new(0.5, 0.5));
    }
}
