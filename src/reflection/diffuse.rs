use crate::reflection::{
    abs_cos_theta, same_hemisphere, BSDFSample, BxDFFlags, BxDFModel, BxDFReflTransFlags, TransportMode,
};
use crate::sampling::{cosine_hemisphere_pdf, sample_cosine_hemisphere};
use crate::spectrum::SampledSpectrum;
use crate::{Float, Point2f, Vec3f, INV_PI};

/// Lambertian reflection.
#[derive(Clone, Copy, Debug)]
pub struct DiffuseBxDF {
    r: SampledSpectrum,
}

impl DiffuseBxDF {
    pub fn new(r: SampledSpectrum) -> Self {
        Self { r }
    }
}

impl BxDFModel for DiffuseBxDF {
    fn flags(&self) -> BxDFFlags {
        if self.r.is_black() {
            BxDFFlags::UNSET
        } else {
            BxDFFlags::DIFFUSE_REFLECTION
        }
    }

    fn f(&self, wo: Vec3f, wi: Vec3f, _mode: TransportMode) -> SampledSpectrum {
        if !same_hemisphere(wo, wi) {
            return SampledSpectrum::zero();
        }
        self.r * INV_PI
    }

    fn sample_f(
        &self,
        wo: Vec3f,
        _uc: Float,
        u: Point2f,
        _mode: TransportMode,
        sample_flags: BxDFReflTransFlags,
    ) -> Option<BSDFSample> {
        if !sample_flags.contains(BxDFReflTransFlags::REFLECTION) {
            return None;
        }

        let mut wi = sample_cosine_hemisphere(u);
        // flip direction if wo is on the opposite hemisphere
        if wo.z < 0.0 {
            wi.z *= -1.0;
        }
        let pdf = cosine_hemisphere_pdf(abs_cos_theta(wi));
        if pdf == 0.0 {
            return None;
        }
        Some(BSDFSample::new(self.r * INV_PI, wi, pdf, BxDFFlags::DIFFUSE_REFLECTION))
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f, _mode: TransportMode, sample_flags: BxDFReflTransFlags) -> Float {
        if !sample_flags.contains(BxDFReflTransFlags::REFLECTION) || !same_hemisphere(wo, wi) {
            return 0.0;
        }
        cosine_hemisphere_pdf(abs_cos_theta(wi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::InnerSpace;

    #[test]
    fn test_f_is_albedo_over_pi() {
        let bxdf = DiffuseBxDF::new(SampledSpectrum::uniform(0.5));
        let wo = vec3f!(0, 0, 1);
        assert_relative_eq!(bxdf.f(wo, wo, TransportMode::Radiance), SampledSpectrum::uniform(0.5 * INV_PI));
        assert!(bxdf.f(wo, vec3f!(0, 0, -1), TransportMode::Radiance).is_black());
    }

    #[test]
    fn test_sample_mirrors_wo_hemisphere() {
        let bxdf = DiffuseBxDF::new(SampledSpectrum::uniform(0.5));
        let wo = vec3f!(0.3, 0.1, -0.9).normalize();
        let bs = bxdf
            .sample_f(wo, 0.5, point2f!(0.2, 0.7), TransportMode::Radiance, BxDFReflTransFlags::ALL)
            .unwrap();
        assert!(bs.wi.z < 0.0);
        assert_eq!(bs.flags, BxDFFlags::DIFFUSE_REFLECTION);
        assert_relative_eq!(bs.pdf, bxdf.pdf(wo, bs.wi, TransportMode::Radiance, BxDFReflTransFlags::ALL));
    }

    #[test]
    fn test_transmission_only_request_is_rejected() {
        let bxdf = DiffuseBxDF::new(SampledSpectrum::uniform(0.5));
        let wo = vec3f!(0, 0, 1);
        let gate = BxDFReflTransFlags::TRANSMISSION;
        assert!(bxdf.sample_f(wo, 0.5, point2f!(0.5, 0.5), TransportMode::Radiance, gate).is_none());
        assert_eq!(bxdf.pdf(wo, wo, TransportMode::Radiance, gate), 0.0);
    }

    #[test]
    fn test_black_reflectance_has_no_lobes() {
        assert_eq!(DiffuseBxDF::new(SampledSpectrum::zero()).flags(), BxDFFlags::UNSET);
    }
}
