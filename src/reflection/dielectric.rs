use cgmath::InnerSpace;

use crate::geometry::{face_forward, Normal3};
use crate::reflection::fresnel::fr_dielectric;
use crate::reflection::microfacet::TrowbridgeReitzDistribution;
use crate::reflection::{
    abs_cos_theta, cos_theta, reflect, refract, same_hemisphere, BSDFSample, BxDFFlags, BxDFModel,
    BxDFReflTransFlags, TransportMode,
};
use crate::spectrum::SampledSpectrum;
use crate::{sqr, Float, Point2f, Vec3f};

/// Interface between two dielectrics, smooth or rough.
#[derive(Clone, Copy, Debug)]
pub struct DielectricBxDF {
    /// Index of refraction below the surface over the one above it
    eta: Float,
    distrib: TrowbridgeReitzDistribution,
}

/// Probabilities of choosing reflection and transmission given the Fresnel terms and the
/// lobes allowed by `sample_flags`. `None` when neither is allowed.
fn lobe_probabilities(r: Float, t: Float, sample_flags: BxDFReflTransFlags) -> Option<(Float, Float)> {
    let pr = if sample_flags.contains(BxDFReflTransFlags::REFLECTION) { r } else { 0.0 };
    let pt = if sample_flags.contains(BxDFReflTransFlags::TRANSMISSION) { t } else { 0.0 };
    if pr == 0.0 && pt == 0.0 {
        None
    } else {
        Some((pr, pt))
    }
}

impl DielectricBxDF {
    pub fn new(eta: Float, distrib: TrowbridgeReitzDistribution) -> Self {
        Self { eta, distrib }
    }

    pub fn eta(&self) -> Float {
        self.eta
    }

    fn is_specular(&self) -> bool {
        self.eta == 1.0 || self.distrib.effectively_smooth()
    }

    /// The generalized half vector of a reflection or refraction pair, oriented to +z, along
    /// with the relative index along `wi`. `None` for pairs no microfacet can produce.
    fn half_vector(&self, wo: Vec3f, wi: Vec3f) -> Option<(Vec3f, Float, bool)> {
        let cos_theta_o = cos_theta(wo);
        let cos_theta_i = cos_theta(wi);
        let reflect = cos_theta_i * cos_theta_o > 0.0;
        let etap = if reflect {
            1.0
        } else if cos_theta_o > 0.0 {
            self.eta
        } else {
            1.0 / self.eta
        };

        let wm = wi * etap + wo;
        if cos_theta_i == 0.0 || cos_theta_o == 0.0 || wm.magnitude2() == 0.0 {
            return None;
        }
        let wm = face_forward(wm.normalize(), Vec3f::unit_z());

        // discard back-facing microfacets
        if wm.dot(wi) * cos_theta_i < 0.0 || wm.dot(wo) * cos_theta_o < 0.0 {
            return None;
        }
        Some((wm, etap, reflect))
    }
}

impl BxDFModel for DielectricBxDF {
    fn flags(&self) -> BxDFFlags {
        let flags = if self.eta == 1.0 {
            BxDFFlags::TRANSMISSION
        } else {
            BxDFFlags::REFLECTION | BxDFFlags::TRANSMISSION
        };
        flags | if self.distrib.effectively_smooth() { BxDFFlags::SPECULAR } else { BxDFFlags::GLOSSY }
    }

    fn f(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode) -> SampledSpectrum {
        if self.is_specular() {
            return SampledSpectrum::zero();
        }
        let (wm, etap, reflect) = match self.half_vector(wo, wi) {
            Some(h) => h,
            None => return SampledSpectrum::zero(),
        };

        let fr = fr_dielectric(wo.dot(wm), self.eta);
        let cos_theta_o = cos_theta(wo);
        let cos_theta_i = cos_theta(wi);
        if reflect {
            SampledSpectrum::uniform(
                self.distrib.d(wm) * self.distrib.g(wo, wi) * fr / (4.0 * cos_theta_i * cos_theta_o).abs(),
            )
        } else {
            let denom = sqr(wi.dot(wm) + wo.dot(wm) / etap) * cos_theta_i * cos_theta_o;
            let mut ft = self.distrib.d(wm) * (1.0 - fr) * self.distrib.g(wo, wi)
                * (wi.dot(wm) * wo.dot(wm) / denom).abs();
            if mode == TransportMode::Radiance {
                ft /= sqr(etap);
            }
            SampledSpectrum::uniform(ft)
        }
    }

    fn sample_f(
        &self,
        wo: Vec3f,
        uc: Float,
        u: Point2f,
        mode: TransportMode,
        sample_flags: BxDFReflTransFlags,
    ) -> Option<BSDFSample> {
        if self.is_specular() {
            // sample perfect specular dielectric BSDF
            let r = fr_dielectric(cos_theta(wo), self.eta);
            let t = 1.0 - r;
            let (pr, pt) = lobe_probabilities(r, t, sample_flags)?;

            if uc < pr / (pr + pt) {
                let wi = Vec3f::new(-wo.x, -wo.y, wo.z);
                let fr = SampledSpectrum::uniform(r / abs_cos_theta(wi));
                Some(BSDFSample::new(fr, wi, pr / (pr + pt), BxDFFlags::SPECULAR_REFLECTION))
            } else {
                let (wi, etap) = refract(wo, Normal3::new(0.0, 0.0, 1.0), self.eta)?;
                let mut ft = SampledSpectrum::uniform(t / abs_cos_theta(wi));
                // account for non-symmetry with transmission to different medium
                if mode == TransportMode::Radiance {
                    ft /= sqr(etap);
                }
                Some(BSDFSample::new(ft, wi, pt / (pr + pt), BxDFFlags::SPECULAR_TRANSMISSION).with_eta(etap))
            }
        } else {
            // sample rough dielectric BSDF
            let wm = self.distrib.sample_wm(wo, u);
            let r = fr_dielectric(wo.dot(wm), self.eta);
            let t = 1.0 - r;
            let (pr, pt) = lobe_probabilities(r, t, sample_flags)?;

            if uc < pr / (pr + pt) {
                let wi = reflect(wo, wm);
                if !same_hemisphere(wo, wi) {
                    return None;
                }
                let pdf = self.distrib.pdf(wo, wm) / (4.0 * wo.dot(wm).abs()) * pr / (pr + pt);
                let f = SampledSpectrum::uniform(
                    self.distrib.d(wm) * self.distrib.g(wo, wi) * r / (4.0 * cos_theta(wi) * cos_theta(wo)),
                );
                Some(BSDFSample::new(f, wi, pdf, BxDFFlags::GLOSSY_REFLECTION))
            } else {
                let (wi, etap) = refract(wo, Normal3(wm), self.eta)?;
                if same_hemisphere(wo, wi) || wi.z == 0.0 {
                    return None;
                }
                let denom = sqr(wi.dot(wm) + wo.dot(wm) / etap);
                let dwm_dwi = wi.dot(wm).abs() / denom;
                let pdf = self.distrib.pdf(wo, wm) * dwm_dwi * pt / (pr + pt);

                let mut ft = t * self.distrib.d(wm) * self.distrib.g(wo, wi)
                    * (wi.dot(wm) * wo.dot(wm) / (cos_theta(wi) * cos_theta(wo) * denom)).abs();
                if mode == TransportMode::Radiance {
                    ft /= sqr(etap);
                }
                Some(BSDFSample::new(SampledSpectrum::uniform(ft), wi, pdf, BxDFFlags::GLOSSY_TRANSMISSION).with_eta(etap))
            }
        }
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f, _mode: TransportMode, sample_flags: BxDFReflTransFlags) -> Float {
        if self.is_specular() {
            return 0.0;
        }
        let (wm, etap, reflect) = match self.half_vector(wo, wi) {
            Some(h) => h,
            None => return 0.0,
        };

        let r = fr_dielectric(wo.dot(wm), self.eta);
        let t = 1.0 - r;
        let (pr, pt) = match lobe_probabilities(r, t, sample_flags) {
            Some(p) => p,
            None => return 0.0,
        };

        if reflect {
            self.distrib.pdf(wo, wm) / (4.0 * wo.dot(wm).abs()) * pr / (pr + pt)
        } else {
            let denom = sqr(wi.dot(wm) + wo.dot(wm) / etap);
            let dwm_dwi = wi.dot(wm).abs() / denom;
            self.distrib.pdf(wo, wm) * dwm_dwi * pt / (pr + pt)
        }
    }

    fn regularize(&mut self) {
        self.distrib.regularize();
    }
}
