use cgmath::InnerSpace;

use crate::camera::Camera;
use crate::geometry::{face_forward, RayDifferential};
use crate::integrator::Integrator;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::spectrum::{SampledSpectrum, SampledWavelengths};
use crate::{Float, INFINITY};

/// Visualizes shading normals. Each wavelength reports the normal component of its band: x for
/// long wavelengths, y for the middle of the visible range and z for short wavelengths.
#[derive(Clone, Debug, Default)]
pub struct SurfaceNormalIntegrator;

impl SurfaceNormalIntegrator {
    fn band(lambda: Float) -> usize {
        if lambda >= 590.0 {
            0
        } else if lambda >= 490.0 {
            1
        } else {
            2
        }
    }
}

impl Integrator for SurfaceNormalIntegrator {
    fn radiance(
        &self,
        ray: RayDifferential,
        lambda: &mut SampledWavelengths,
        scene: &Scene<'_>,
        _sampler: &mut dyn Sampler,
        _camera: &dyn Camera,
    ) -> SampledSpectrum {
        let si = match scene.intersect(&ray.ray, INFINITY) {
            Some(hit) => hit.intr,
            None => return SampledSpectrum::zero(),
        };
        let n = face_forward(si.shading_n.0.normalize(), -ray.ray.dir);
        let components = [n.x, n.y, n.z];
        SampledSpectrum::new_with(|i| 0.5 * (components[Self::band(lambda[i])] + 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PerspectiveCamera;
    use crate::sampler::IndependentSampler;
    use crate::scenes::furnace;
    use crate::{Ray, Transform};

    #[test]
    fn test_wall_facing_camera() {
        let desc = furnace(0.5, 1.0).unwrap();
        let lights = desc.build_lights();
        let scene = desc.build_scene(&lights);
        let camera = PerspectiveCamera::new(Transform::IDENTITY, (4, 4), 45.0).unwrap();
        let mut sampler = IndependentSampler::new(1, 0);
        let mut lambda = SampledWavelengths::sample_visible(0.3);
        let ray = RayDifferential::new(Ray::new(point3f!(0, 0, 0), vec3f!(0, 0, 1)));
        let l = SurfaceNormalIntegrator.radiance(ray, &mut lambda, &scene, &mut sampler, &camera);
        // the far wall faces -z
        for i in 0..4 {
            let expected = match SurfaceNormalIntegrator::band(lambda[i]) {
                2 => 0.0,
                _ => 0.5,
            };
            assert!((l[i] - expected).abs() < 1e-4, "{:?} at {}", l, lambda[i]);
        }
    }
}
