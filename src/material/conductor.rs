use anyhow::Context;

use crate::material::{MaterialEvalContext, Roughness};
use crate::reflection::ConductorBxDF;
use crate::spectrum::{named_spectrum, SampledWavelengths, Spectrum};

#[derive(Clone, Debug)]
pub struct ConductorMaterial {
    eta: Spectrum,
    k: Spectrum,
    roughness: Roughness,
}

impl ConductorMaterial {
    pub fn new(eta: Spectrum, k: Spectrum, roughness: Roughness) -> Self {
        Self { eta, k, roughness }
    }

    /// A metal from the built-in tables, by its chemical symbol (`Ag`, `Au`, `Cu`, `Al`).
    pub fn named(metal: &str, roughness: Roughness) -> anyhow::Result<Self> {
        let eta = named_spectrum(&format!("metal-{}-eta", metal))
            .with_context(|| format!("no spectral data for metal '{}'", metal))?;
        let k = named_spectrum(&format!("metal-{}-k", metal))
            .with_context(|| format!("no spectral data for metal '{}'", metal))?;
        Ok(Self::new(eta.clone(), k.clone(), roughness))
    }

    pub fn get_bxdf(&self, _ctx: &MaterialEvalContext, lambda: &mut SampledWavelengths) -> ConductorBxDF {
        let eta = self.eta.sample(lambda);
        let k = self.k.sample(lambda);
        ConductorBxDF::new(self.roughness.distribution(), eta, k)
    }
}
