use crate::material::MaterialEvalContext;
use crate::reflection::DiffuseBxDF;
use crate::spectrum::{SampledWavelengths, Spectrum};

#[derive(Clone, Debug)]
pub struct DiffuseMaterial {
    reflectance: Spectrum,
}

impl DiffuseMaterial {
    pub fn new(reflectance: Spectrum) -> Self {
        Self { reflectance }
    }

    pub fn get_bxdf(&self, _ctx: &MaterialEvalContext, lambda: &mut SampledWavelengths) -> DiffuseBxDF {
        let r = self.reflectance.sample(lambda).clamp(0.0, 1.0);
        DiffuseBxDF::new(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::tests::test_context;
    use crate::reflection::{BxDFModel, TransportMode};
    use crate::spectrum::SampledSpectrum;
    use crate::INV_PI;
    use approx::assert_relative_eq;

    #[test]
    fn test_reflectance_is_clamped() {
        let material = DiffuseMaterial::new(Spectrum::constant(1.5));
        let mut lambda = SampledWavelengths::sample_visible(0.5);
        let bxdf = material.get_bxdf(&test_context(), &mut lambda);
        let wo = vec3f!(0, 0, 1);
        assert_relative_eq!(bxdf.f(wo, wo, TransportMode::Radiance), SampledSpectrum::uniform(INV_PI));
    }
}
