use cgmath::InnerSpace;

use crate::camera::Camera;
use crate::geometry::{face_forward, Frame, RayDifferential};
use crate::integrator::Integrator;
use crate::sampler::Sampler;
use crate::sampling::{cosine_hemisphere_pdf, sample_cosine_hemisphere};
use crate::scene::Scene;
use crate::spectrum::{SampledSpectrum, SampledWavelengths};
use crate::{Float, INFINITY, PI};

/// Fraction of the cosine-weighted hemisphere above each visible point that is not occluded
/// within `max_distance`.
#[derive(Clone, Debug)]
pub struct AmbientOcclusionIntegrator {
    max_distance: Float,
}

impl AmbientOcclusionIntegrator {
    pub fn new(max_distance: Float) -> Self {
        Self { max_distance }
    }
}

impl Integrator for AmbientOcclusionIntegrator {
    fn radiance(
        &self,
        mut ray: RayDifferential,
        lambda: &mut SampledWavelengths,
        scene: &Scene<'_>,
        sampler: &mut dyn Sampler,
        camera: &dyn Camera,
    ) -> SampledSpectrum {
        let spp = sampler.samples_per_pixel();
        loop {
            let mut si = match scene.intersect(&ray.ray, INFINITY) {
                Some(hit) => hit.intr,
                None => return SampledSpectrum::zero(),
            };
            if si.get_bsdf(&ray, lambda, camera, spp).is_none() {
                ray = RayDifferential::new(si.spawn_ray(ray.ray.dir));
                continue;
            }

            let n = face_forward(si.n().0, -ray.ray.dir);
            let local = sample_cosine_hemisphere(sampler.get_2d());
            let pdf = cosine_hemisphere_pdf(local.z.abs());
            if pdf == 0.0 {
                return SampledSpectrum::zero();
            }
            let wi = Frame::from_z(n).from_local(local);

            let occlusion_ray = si.spawn_ray(wi);
            // spawned directions are unit length, so t is a distance
            if scene.intersect_p(&occlusion_ray, self.max_distance) {
                return SampledSpectrum::zero();
            }
            return SampledSpectrum::uniform(wi.dot(n) / (PI * pdf));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::tests::center_estimate;
    use crate::scenes::{cornell_box, furnace};
    use approx::assert_relative_eq;

    #[test]
    fn test_enclosure_is_fully_occluded() {
        let desc = furnace(0.5, 1.0).unwrap();
        assert_eq!(center_estimate(&AmbientOcclusionIntegrator::new(INFINITY), &desc, 32), 0.0);
    }

    #[test]
    fn test_short_rays_see_nothing_in_the_way() {
        let desc = furnace(0.5, 1.0).unwrap();
        assert_relative_eq!(center_estimate(&AmbientOcclusionIntegrator::new(1e-3), &desc, 32), 1.0, max_relative = 1e-4);
    }

    #[test]
    fn test_open_box_is_partially_occluded() {
        let desc = cornell_box().unwrap();
        let ao = center_estimate(&AmbientOcclusionIntegrator::new(INFINITY), &desc, 512);
        assert!(ao > 0.0 && ao < 1.0, "{}", ao);
    }
}
