use crate::material::{MaterialEvalContext, Roughness};
use crate::reflection::{CoatedConductorBxDF, CoatedDiffuseBxDF, ConductorBxDF, DielectricBxDF, DiffuseBxDF};
use crate::spectrum::{SampledWavelengths, Spectrum};
use crate::Float;

/// Parameters shared by both coated materials: the dielectric coating and the medium between
/// it and the base.
#[derive(Clone, Debug)]
pub struct Coating {
    pub roughness: Roughness,
    pub eta: Spectrum,
    pub thickness: Float,
    pub albedo: Spectrum,
    pub g: Float,
    pub max_depth: u32,
    pub n_samples: u32,
}

impl Default for Coating {
    fn default() -> Self {
        Self {
            roughness: Roughness::smooth(),
            eta: Spectrum::constant(1.5),
            thickness: 0.01,
            albedo: Spectrum::constant(0.0),
            g: 0.0,
            max_depth: 10,
            n_samples: 1,
        }
    }
}

impl Coating {
    fn interface(&self, lambda: &mut SampledWavelengths) -> DielectricBxDF {
        let mut eta = self.eta.evaluate(lambda[0]);
        if !self.eta.is_constant() {
            lambda.terminate_secondary();
        }
        if eta == 0.0 {
            eta = 1.0;
        }
        DielectricBxDF::new(eta, self.roughness.distribution())
    }
}

/// A diffuse base under a dielectric coating, e.g. plastic or varnished wood.
#[derive(Clone, Debug)]
pub struct CoatedDiffuseMaterial {
    reflectance: Spectrum,
    coating: Coating,
}

impl CoatedDiffuseMaterial {
    pub fn new(reflectance: Spectrum, coating: Coating) -> Self {
        Self { reflectance, coating }
    }

    pub fn get_bxdf(&self, _ctx: &MaterialEvalContext, lambda: &mut SampledWavelengths) -> CoatedDiffuseBxDF {
        let r = self.reflectance.sample(lambda).clamp(0.0, 1.0);
        let albedo = self.coating.albedo.sample(lambda);
        let top = self.coating.interface(lambda);

        CoatedDiffuseBxDF::new(
            top,
            DiffuseBxDF::new(r),
            self.coating.thickness,
            albedo,
            self.coating.g,
            self.coating.max_depth,
            self.coating.n_samples,
        )
    }
}

/// A metal base under a dielectric coating.
#[derive(Clone, Debug)]
pub struct CoatedConductorMaterial {
    conductor_eta: Spectrum,
    conductor_k: Spectrum,
    conductor_roughness: Roughness,
    coating: Coating,
}

impl CoatedConductorMaterial {
    pub fn new(conductor_eta: Spectrum, conductor_k: Spectrum, conductor_roughness: Roughness, coating: Coating) -> Self {
        Self { conductor_eta, conductor_k, conductor_roughness, coating }
    }

    pub fn get_bxdf(&self, _ctx: &MaterialEvalContext, lambda: &mut SampledWavelengths) -> CoatedConductorBxDF {
        let top = self.coating.interface(lambda);

        // the conductor sits below the coating, so its index is relative to the coating's
        let ce = self.conductor_eta.sample(lambda) / top.eta();
        let ck = self.conductor_k.sample(lambda) / top.eta();
        let bottom = ConductorBxDF::new(self.conductor_roughness.distribution(), ce, ck);

        CoatedConductorBxDF::new(
            top,
            bottom,
            self.coating.thickness,
            self.coating.albedo.sample(lambda),
            self.coating.g,
            self.coating.max_depth,
            self.coating.n_samples,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::tests::test_context;
    use crate::reflection::BxDFModel;
    use crate::spectrum::named_spectrum;

    #[test]
    fn test_coated_diffuse_flags() {
        let material = CoatedDiffuseMaterial::new(Spectrum::constant(0.5), Coating::default());
        let mut lambda = SampledWavelengths::sample_visible(0.5);
        let flags = material.get_bxdf(&test_context(), &mut lambda).flags();
        assert!(flags.is_specular() && flags.is_diffuse() && !flags.is_transmissive());
    }

    #[test]
    fn test_coated_conductor_flags() {
        let (eta, k) = match (named_spectrum("metal-Cu-eta"), named_spectrum("metal-Cu-k")) {
            (Some(eta), Some(k)) => (eta.clone(), k.clone()),
            _ => panic!("copper spectra missing"),
        };
        let coating = Coating { roughness: Roughness::isotropic(0.1), ..Coating::default() };
        let material = CoatedConductorMaterial::new(eta, k, Roughness::isotropic(0.3), coating);
        let mut lambda = SampledWavelengths::sample_visible(0.5);
        let flags = material.get_bxdf(&test_context(), &mut lambda).flags();
        assert!(flags.is_glossy() && !flags.is_specular());
    }
}
