use cgmath::InnerSpace;

use crate::geometry::face_forward;
use crate::reflection::fresnel::fr_complex_spectrum;
use crate::reflection::microfacet::TrowbridgeReitzDistribution;
use crate::reflection::{
    abs_cos_theta, reflect, same_hemisphere, BSDFSample, BxDFFlags, BxDFModel, BxDFReflTransFlags, TransportMode,
};
use crate::spectrum::SampledSpectrum;
use crate::{Float, Point2f, Vec3f};

/// Metal surface described by its complex index of refraction `eta + i k`.
#[derive(Clone, Copy, Debug)]
pub struct ConductorBxDF {
    distrib: TrowbridgeReitzDistribution,
    eta: SampledSpectrum,
    k: SampledSpectrum,
}

impl ConductorBxDF {
    pub fn new(distrib: TrowbridgeReitzDistribution, eta: SampledSpectrum, k: SampledSpectrum) -> Self {
        Self { distrib, eta, k }
    }
}

impl BxDFModel for ConductorBxDF {
    fn flags(&self) -> BxDFFlags {
        if self.distrib.effectively_smooth() {
            BxDFFlags::SPECULAR_REFLECTION
        } else {
            BxDFFlags::GLOSSY_REFLECTION
        }
    }

    fn f(&self, wo: Vec3f, wi: Vec3f, _mode: TransportMode) -> SampledSpectrum {
        if !same_hemisphere(wo, wi) || self.distrib.effectively_smooth() {
            return SampledSpectrum::zero();
        }

        let cos_theta_o = abs_cos_theta(wo);
        let cos_theta_i = abs_cos_theta(wi);
        if cos_theta_i == 0.0 || cos_theta_o == 0.0 {
            return SampledSpectrum::zero();
        }
        let wm = wi + wo;
        if wm.magnitude2() == 0.0 {
            return SampledSpectrum::zero();
        }
        let wm = wm.normalize();

        let fr = fr_complex_spectrum(wo.dot(wm).abs(), self.eta, self.k);
        fr * (self.distrib.d(wm) * self.distrib.g(wo, wi) / (4.0 * cos_theta_i * cos_theta_o))
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

        if self.distrib.effectively_smooth() {
            // sample perfect specular conductor BRDF
            let wi = Vec3f::new(-wo.x, -wo.y, wo.z);
            let f = fr_complex_spectrum(abs_cos_theta(wi), self.eta, self.k) / abs_cos_theta(wi);
            return Some(BSDFSample::new(f, wi, 1.0, BxDFFlags::SPECULAR_REFLECTION));
        }

        // sample rough conductor BRDF
        if wo.z == 0.0 {
            return None;
        }
        let wm = self.distrib.sample_wm(wo, u);
        let wi = reflect(wo, wm);
        if !same_hemisphere(wo, wi) {
            return None;
        }

        let pdf = self.distrib.pdf(wo, wm) / (4.0 * wo.dot(wm).abs());
        let cos_theta_o = abs_cos_theta(wo);
        let cos_theta_i = abs_cos_theta(wi);
        if cos_theta_i == 0.0 || cos_theta_o == 0.0 {
            return None;
        }

        let fr = fr_complex_spectrum(wo.dot(wm).abs(), self.eta, self.k);
        let f = fr * (self.distrib.d(wm) * self.distrib.g(wo, wi) / (4.0 * cos_theta_i * cos_theta_o));
        Some(BSDFSample::new(f, wi, pdf, BxDFFlags::GLOSSY_REFLECTION))
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f, _mode: TransportMode, sample_flags: BxDFReflTransFlags) -> Float {
        if !sample_flags.contains(BxDFReflTransFlags::REFLECTION)
            || !same_hemisphere(wo, wi)
            || self.distrib.effectively_smooth()
        {
            return 0.0;
        }

        let wm = wo + wi;
        if wm.magnitude2() == 0.0 {
            return 0.0;
        }
        let wm = face_forward(wm.normalize(), Vec3f::unit_z());
        self.distrib.pdf(wo, wm) / (4.0 * wo.dot(wm).abs())
    }

    fn regularize(&mut self) {
        self.distrib.regularize();
    }
}
