use crate::reflection::{
    BSDFSample, BxDFFlags, BxDFModel, BxDFReflTransFlags, CoatedConductorBxDF, CoatedDiffuseBxDF, ConductorBxDF,
    DielectricBxDF, DiffuseBxDF, TransportMode,
};
use crate::spectrum::SampledSpectrum;
use crate::{lerp, Float, Point2f, Vec3f, ONE_MINUS_EPSILON};

/// A model that can be one side of a mix. Mixes do not nest, which keeps `BxDF` a flat value.
#[derive(Clone, Debug)]
pub enum MixComponent {
    Diffuse(DiffuseBxDF),
    Dielectric(DielectricBxDF),
    Conductor(ConductorBxDF),
    CoatedDiffuse(CoatedDiffuseBxDF),
    CoatedConductor(CoatedConductorBxDF),
}

macro_rules! dispatch_component {
    ($self:expr, $b:ident => $e:expr) => {
        match $self {
            MixComponent::Diffuse($b) => $e,
            MixComponent::Dielectric($b) => $e,
            MixComponent::Conductor($b) => $e,
            MixComponent::CoatedDiffuse($b) => $e,
            MixComponent::CoatedConductor($b) => $e,
        }
    };
}

impl BxDFModel for MixComponent {
    fn flags(&self) -> BxDFFlags {
        dispatch_component!(self, b => b.flags())
    }

    fn f(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode) -> SampledSpectrum {
        dispatch_component!(self, b => b.f(wo, wi, mode))
    }

    fn sample_f(
        &self,
        wo: Vec3f,
        uc: Float,
        u: Point2f,
        mode: TransportMode,
        sample_flags: BxDFReflTransFlags,
    ) -> Option<BSDFSample> {
        dispatch_component!(self, b => b.sample_f(wo, uc, u, mode, sample_flags))
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode, sample_flags: BxDFReflTransFlags) -> Float {
        dispatch_component!(self, b => b.pdf(wo, wi, mode, sample_flags))
    }

    fn regularize(&mut self) {
        dispatch_component!(self, b => b.regularize())
    }
}

/// Linear blend `(1 - amount) * a + amount * b` of two models.
#[derive(Clone, Debug)]
pub struct MixBxDF {
    components: [MixComponent; 2],
    amount: Float,
}

impl MixBxDF {
    pub fn new(a: impl Into<MixComponent>, b: impl Into<MixComponent>, amount: Float) -> Self {
        Self { components: [a.into(), b.into()], amount: amount.clamp(0.0, 1.0) }
    }

    pub fn amount(&self) -> Float {
        self.amount
    }

    fn weights(&self) -> [Float; 2] {
        [1.0 - self.amount, self.amount]
    }
}

impl BxDFModel for MixBxDF {
    fn flags(&self) -> BxDFFlags {
        let [wa, wb] = self.weights();
        let [a, b] = &self.components;
        match (wa > 0.0, wb > 0.0) {
            (true, true) => a.flags() | b.flags(),
            (true, false) => a.flags(),
            (false, true) => b.flags(),
            (false, false) => BxDFFlags::UNSET,
        }
    }

    fn f(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode) -> SampledSpectrum {
        let [a, b] = &self.components;
        a.f(wo, wi, mode) * (1.0 - self.amount) + b.f(wo, wi, mode) * self.amount
    }

    fn sample_f(
        &self,
        wo: Vec3f,
        uc: Float,
        u: Point2f,
        mode: TransportMode,
        sample_flags: BxDFReflTransFlags,
    ) -> Option<BSDFSample> {
        let weights = self.weights();
        // choose a component and remap uc so it can be reused by that component
        let (chosen, other, uc) = if uc < weights[0] {
            (0, 1, (uc / weights[0]).min(ONE_MINUS_EPSILON))
        } else {
            (1, 0, ((uc - weights[0]) / weights[1]).min(ONE_MINUS_EPSILON))
        };

        let mut bs = self.components[chosen].sample_f(wo, uc, u, mode, sample_flags)?;
        if bs.is_specular() {
            bs.f *= weights[chosen];
            bs.pdf *= weights[chosen];
            return Some(bs);
        }

        let other_component = &self.components[other];
        bs.f = bs.f * weights[chosen] + other_component.f(wo, bs.wi, mode) * weights[other];
        bs.pdf = lerp(
            self.amount,
            if chosen == 0 { bs.pdf } else { other_component.pdf(wo, bs.wi, mode, sample_flags) },
            if chosen == 1 { bs.pdf } else { other_component.pdf(wo, bs.wi, mode, sample_flags) },
        );
        Some(bs)
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode, sample_flags: BxDFReflTransFlags) -> Float {
        let [a, b] = &self.components;
        lerp(self.amount, a.pdf(wo, wi, mode, sample_flags), b.pdf(wo, wi, mode, sample_flags))
    }

    fn regularize(&mut self) {
        for c in &mut self.components {
            c.regularize();
        }
    }
}

macro_rules! impl_from_component {
    ($($variant:ident($ty:ty)),*) => {
        $(
            impl From<$ty> for MixComponent {
                fn from(b: $ty) -> Self {
                    MixComponent::$variant(b)
                }
            }
        )*
    };
}

impl_from_component!(
    Diffuse(DiffuseBxDF),
    Dielectric(DielectricBxDF),
    Conductor(ConductorBxDF),
    CoatedDiffuse(CoatedDiffuseBxDF),
    CoatedConductor(CoatedConductorBxDF)
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::TrowbridgeReitzDistribution;
    use approx::assert_relative_eq;
    use cgmath::InnerSpace;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256Plus;

    fn diffuse(r: Float) -> DiffuseBxDF {
        DiffuseBxDF::new(SampledSpectrum::uniform(r))
    }

    #[test]
    fn test_f_is_weighted_blend() {
        let mix = MixBxDF::new(diffuse(1.0), diffuse(0.0), 0.25);
        let wo = vec3f!(0, 0, 1);
        let wi = vec3f!(0.3, 0, 0.9).normalize();
        let expected = diffuse(1.0).f(wo, wi, TransportMode::Radiance) * 0.75;
        assert_relative_eq!(mix.f(wo, wi, TransportMode::Radiance), expected, max_relative = 1e-5);
    }

    #[test]
    fn test_sample_pdf_matches_pdf_for_non_specular() {
        let rough = ConductorBxDF::new(
            TrowbridgeReitzDistribution::new(0.3, 0.3),
            SampledSpectrum::uniform(0.2),
            SampledSpectrum::uniform(3.0),
        );
        let mix = MixBxDF::new(diffuse(0.5), rough, 0.6);
        let wo = vec3f!(0.2, 0.4, 0.8).normalize();
        let mut rng = Xoshiro256Plus::seed_from_u64(41);
        for _ in 0..300 {
            let u = Point2f::new(rng.gen(), rng.gen());
            if let Some(bs) = mix.sample_f(wo, rng.gen(), u, TransportMode::Radiance, BxDFReflTransFlags::ALL) {
                let pdf = mix.pdf(wo, bs.wi, TransportMode::Radiance, BxDFReflTransFlags::ALL);
                assert_relative_eq!(bs.pdf, pdf, max_relative = 1e-2);
                assert_relative_eq!(bs.f, mix.f(wo, bs.wi, TransportMode::Radiance), max_relative = 1e-2);
            }
        }
    }

    #[test]
    fn test_specular_lobe_scaled_by_selection_probability() {
        let mirror = ConductorBxDF::new(
            TrowbridgeReitzDistribution::new(0.0, 0.0),
            SampledSpectrum::uniform(0.2),
            SampledSpectrum::uniform(3.0),
        );
        let mix = MixBxDF::new(diffuse(0.5), mirror, 0.5);
        let wo = vec3f!(0, 0.6, 0.8);
        let bs = mix
            .sample_f(wo, 0.9, point2f!(0.5, 0.5), TransportMode::Radiance, BxDFReflTransFlags::ALL)
            .unwrap();
        assert!(bs.is_specular());
        assert_relative_eq!(bs.pdf, 0.5);
        assert!(mix.flags().is_specular() && mix.flags().is_diffuse());
    }

    #[test]
    fn test_zero_amount_only_uses_first() {
        let mix = MixBxDF::new(diffuse(0.5), DielectricBxDF::new(1.5, TrowbridgeReitzDistribution::new(0.0, 0.0)), 0.0);
        assert_eq!(mix.flags(), BxDFFlags::DIFFUSE_REFLECTION);
    }
}
