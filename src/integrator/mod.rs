//! Light transport. An integrator turns a camera ray into a radiance estimate at the path's
//! sampled wavelengths.

use crate::camera::Camera;
use crate::geometry::RayDifferential;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::spectrum::{SampledSpectrum, SampledWavelengths};

mod ao;
mod normal;
mod path;

pub use ao::AmbientOcclusionIntegrator;
pub use normal::SurfaceNormalIntegrator;
pub use path::PathIntegrator;

pub trait Integrator: Sync {
    /// Estimates the radiance arriving along `ray`. `lambda` may have its secondary wavelengths
    /// terminated by dispersive materials on the way.
    fn radiance(
        &self,
        ray: RayDifferential,
        lambda: &mut SampledWavelengths,
        scene: &Scene<'_>,
        sampler: &mut dyn Sampler,
        camera: &dyn Camera,
    ) -> SampledSpectrum;
}

/// The integrators a render can be configured with.
#[derive(Clone, Debug)]
pub enum RenderIntegrator {
    Normal(SurfaceNormalIntegrator),
    AmbientOcclusion(AmbientOcclusionIntegrator),
    Path(PathIntegrator),
}

impl Integrator for RenderIntegrator {
    fn radiance(
        &self,
        ray: RayDifferential,
        lambda: &mut SampledWavelengths,
        scene: &Scene<'_>,
        sampler: &mut dyn Sampler,
        camera: &dyn Camera,
    ) -> SampledSpectrum {
        match self {
            RenderIntegrator::Normal(i) => i.radiance(ray, lambda, scene, sampler, camera),
            RenderIntegrator::AmbientOcclusion(i) => i.radiance(ray, lambda, scene, sampler, camera),
            RenderIntegrator::Path(i) => i.radiance(ray, lambda, scene, sampler, camera),
        }
    }
}

impl From<SurfaceNormalIntegrator> for RenderIntegrator {
    fn from(i: SurfaceNormalIntegrator) -> Self {
        RenderIntegrator::Normal(i)
    }
}

impl From<AmbientOcclusionIntegrator> for RenderIntegrator {
    fn from(i: AmbientOcclusionIntegrator) -> Self {
        RenderIntegrator::AmbientOcclusion(i)
    }
}

impl From<PathIntegrator> for RenderIntegrator {
    fn from(i: PathIntegrator) -> Self {
        RenderIntegrator::Path(i)
    }
}
