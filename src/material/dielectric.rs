use crate::material::{MaterialEvalContext, Roughness};
use crate::reflection::DielectricBxDF;
use crate::spectrum::{SampledWavelengths, Spectrum};

/// Glass-like interface. A wavelength-dependent index of refraction disperses light, so only
/// the path's first wavelength survives scattering off it.
#[derive(Clone, Debug)]
pub struct DielectricMaterial {
    eta: Spectrum,
    roughness: Roughness,
}

impl DielectricMaterial {
    pub fn new(eta: Spectrum, roughness: Roughness) -> Self {
        Self { eta, roughness }
    }

    pub fn get_bxdf(&self, _ctx: &MaterialEvalContext, lambda: &mut SampledWavelengths) -> DielectricBxDF {
        let mut sampled_eta = self.eta.evaluate(lambda[0]);
        if !self.eta.is_constant() {
            lambda.terminate_secondary();
        }
        // an index of 0 is meaningless, treat it as index matched
        if sampled_eta == 0.0 {
            sampled_eta = 1.0;
        }

        DielectricBxDF::new(sampled_eta, self.roughness.distribution())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::tests::test_context;
    use crate::spectrum::PiecewiseLinearSpectrum;

    #[test]
    fn test_constant_eta_keeps_all_wavelengths() {
        let material = DielectricMaterial::new(Spectrum::constant(1.5), Roughness::smooth());
        let mut lambda = SampledWavelengths::sample_visible(0.3);
        let bxdf = material.get_bxdf(&test_context(), &mut lambda);
        assert_eq!(bxdf.eta(), 1.5);
        assert!(!lambda.secondary_terminated());
    }

    #[test]
    fn test_dispersive_eta_terminates_secondary() -> anyhow::Result<()> {
        let eta = Spectrum::PiecewiseLinear(PiecewiseLinearSpectrum::new(vec![360.0, 830.0], vec![1.6, 1.4])?);
        let material = DielectricMaterial::new(eta, Roughness::smooth());
        let mut lambda = SampledWavelengths::sample_visible(0.3);
        let bxdf = material.get_bxdf(&test_context(), &mut lambda);
        assert!(lambda.secondary_terminated());
        assert!(bxdf.eta() > 1.4 && bxdf.eta() < 1.6);
        Ok(())
    }

    #[test]
    fn test_zero_eta_is_index_matched() {
        let material = DielectricMaterial::new(Spectrum::constant(0.0), Roughness::smooth());
        let mut lambda = SampledWavelengths::sample_visible(0.3);
        assert_eq!(material.get_bxdf(&test_context(), &mut lambda).eta(), 1.0);
    }
}
