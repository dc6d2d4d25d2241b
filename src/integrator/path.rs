use cgmath::InnerSpace;
use tracing::trace;

use crate::camera::Camera;
use crate::geometry::RayDifferential;
use crate::integrator::Integrator;
use crate::interaction::SurfaceInteraction;
use crate::light::LightSampleContext;
use crate::reflection::{BxDFReflTransFlags, TransportMode, BSDF};
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::spectrum::{SampledSpectrum, SampledWavelengths};
use crate::{power_heuristic, sqr, Float, INFINITY};

/// Unidirectional path tracing with next-event estimation. Emission found by BSDF sampling and
/// by light sampling is combined with the power heuristic.
#[derive(Clone, Debug)]
pub struct PathIntegrator {
    max_depth: u32,
    rr_depth: u32,
    regularize: bool,
}

impl PathIntegrator {
    pub fn new(max_depth: u32, regularize: bool) -> Self {
        Self { max_depth, rr_depth: 1, regularize }
    }

    /// Russian roulette is only considered once a path is deeper than `rr_depth`.
    pub fn with_rr_depth(mut self, rr_depth: u32) -> Self {
        self.rr_depth = rr_depth;
        self
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Direct lighting at `si` from one uniformly chosen light, weighted against BSDF sampling.
    fn sample_ld(
        &self,
        si: &SurfaceInteraction<'_>,
        bsdf: &BSDF,
        lambda: &SampledWavelengths,
        scene: &Scene<'_>,
        sampler: &mut dyn Sampler,
    ) -> SampledSpectrum {
        let u_light = sampler.get_1d();
        let u = sampler.get_2d();

        let lights = scene.lights();
        if lights.is_empty() {
            return SampledSpectrum::zero();
        }
        let light_index = ((u_light * lights.len() as Float) as usize).min(lights.len() - 1);
        let light_pmf = 1.0 / lights.len() as Float;
        let light = &lights[light_index];

        let ctx = LightSampleContext::from(si);
        let ls = match light.sample_li(&ctx, u, lambda) {
            Some(ls) if !ls.l.is_black() && ls.pdf > 0.0 => ls,
            _ => return SampledSpectrum::zero(),
        };

        let wo = si.wo();
        let wi = ls.wi;
        let f = bsdf.f(wo, wi, TransportMode::Radiance) * wi.dot(si.shading_n.0).abs();
        if f.is_black() || !scene.unoccluded(&si.intr, &ls.p_light) {
            return SampledSpectrum::zero();
        }

        let p_l = light_pmf * ls.pdf;
        let p_b = bsdf.pdf(wo, wi, TransportMode::Radiance, BxDFReflTransFlags::ALL);
        let w_l = power_heuristic(1, p_l, 1, p_b);
        ls.l * f * (w_l / p_l)
    }
}

impl Integrator for PathIntegrator {
    fn radiance(
        &self,
        mut ray: RayDifferential,
        lambda: &mut SampledWavelengths,
        scene: &Scene<'_>,
        sampler: &mut dyn Sampler,
        camera: &dyn Camera,
    ) -> SampledSpectrum {
        let spp = sampler.samples_per_pixel();
        let mut l = SampledSpectrum::zero();
        let mut beta = SampledSpectrum::uniform(1.0);
        let mut depth = 0;

        let mut specular_bounce = false;
        let mut any_non_specular = false;
        // accumulated squared relative index of refraction, which the throughput carries
        // through refraction and Russian roulette should not see
        let mut eta_scale: Float = 1.0;
        let mut p_b: Float = 1.0;
        let mut prev_ctx: Option<LightSampleContext> = None;

        loop {
            let mut si = match scene.intersect(&ray.ray, INFINITY) {
                Some(hit) => hit.intr,
                None => break,
            };

            let le = si.le(-ray.ray.dir, lambda);
            if !le.is_black() {
                match (&prev_ctx, si.area_light) {
                    (Some(ctx), Some(light)) if depth > 0 && !specular_bounce => {
                        let light_pmf = 1.0 / scene.lights().len() as Float;
                        let p_l = light_pmf * light.pdf_li(ctx, ray.ray.dir);
                        let w_b = power_heuristic(1, p_b, 1, p_l);
                        l += beta * le * w_b;
                    }
                    _ => l += beta * le,
                }
            }

            let mut bsdf = match si.get_bsdf(&ray, lambda, camera, spp) {
                Some(bsdf) => bsdf,
                None => {
                    // pass through surfaces that only mark an emitter boundary
                    ray = RayDifferential::new(si.spawn_ray(ray.ray.dir));
                    continue;
                }
            };
            if self.regularize && any_non_specular {
                bsdf.regularize();
            }

            if depth == self.max_depth {
                break;
            }
            depth += 1;

            if bsdf.flags().is_non_specular() {
                l += beta * self.sample_ld(&si, &bsdf, lambda, scene, sampler);
            }
            prev_ctx = Some(LightSampleContext::from(&si));

            let wo = -ray.ray.dir;
            let u = sampler.get_1d();
            let bs = match bsdf.sample_f(wo, u, sampler.get_2d(), TransportMode::Radiance, BxDFReflTransFlags::ALL) {
                Some(bs) => bs,
                None => break,
            };

            beta *= bs.f * (bs.wi.dot(si.shading_n.0).abs() / bs.pdf);
            p_b = if bs.pdf_is_proportional {
                bsdf.pdf(wo, bs.wi, TransportMode::Radiance, BxDFReflTransFlags::ALL)
            } else {
                bs.pdf
            };
            specular_bounce = bs.is_specular();
            any_non_specular |= !bs.is_specular();
            if bs.is_transmission() {
                eta_scale *= sqr(bs.eta);
            }
            ray = RayDifferential::new(si.spawn_ray(bs.wi));

            if beta.is_black() {
                break;
            }
            let rr_beta = beta * eta_scale;
            if rr_beta.max_component_value() < 1.0 && depth > self.rr_depth {
                let q = Float::max(0.0, 1.0 - rr_beta.max_component_value());
                if sampler.get_1d() < q {
                    trace!(depth, "path terminated by russian roulette");
                    break;
                }
                beta /= 1.0 - q;
            }
        }
        l
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::tests::center_estimate;
    use crate::scenes::{cornell_box, furnace};
    use approx::assert_relative_eq;

    #[test]
    fn test_furnace_converges_to_geometric_series() {
        let albedo = 0.5;
        let desc = furnace(albedo, 1.0).unwrap();
        let integrator = PathIntegrator::new(5, false);
        let expected: Float = (0..=5).map(|k| albedo.powi(k)).sum();
        assert_relative_eq!(center_estimate(&integrator, &desc, 2048), expected, max_relative = 0.03);
    }

    #[test]
    fn test_zero_depth_sees_only_emission() {
        let desc = furnace(0.9, 2.0).unwrap();
        let integrator = PathIntegrator::new(0, false);
        assert_relative_eq!(center_estimate(&integrator, &desc, 16), 2.0, max_relative = 1e-5);
    }

    #[test]
    fn test_cornell_box_is_finite_and_lit() {
        let desc = cornell_box().unwrap();
        let estimate = center_estimate(&PathIntegrator::new(5, true), &desc, 256);
        assert!(estimate.is_finite() && estimate > 0.0);
    }
}
