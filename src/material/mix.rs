use anyhow::ensure;

use crate::material::{Material, MaterialEvalContext};
use crate::reflection::{BxDF, MixBxDF, MixComponent};
use crate::spectrum::SampledWavelengths;
use crate::Float;

/// Blend of two non-mix materials, `amount` of the second one.
#[derive(Clone, Debug)]
pub struct MixMaterial {
    materials: Box<[Material; 2]>,
    amount: Float,
}

impl MixMaterial {
    pub fn new(a: Material, b: Material, amount: Float) -> anyhow::Result<Self> {
        ensure!(!a.is_mix() && !b.is_mix(), "mix materials cannot be nested");
        ensure!((0.0..=1.0).contains(&amount), "mix amount {} is outside [0, 1]", amount);
        Ok(Self { materials: Box::new([a, b]), amount })
    }

    pub fn get_bxdf(&self, ctx: &MaterialEvalContext, lambda: &mut SampledWavelengths) -> MixBxDF {
        let [a, b] = &*self.materials;
        let a = component(a.get_bxdf(ctx, lambda));
        let b = component(b.get_bxdf(ctx, lambda));
        MixBxDF::new(a, b, self.amount)
    }
}

fn component(bxdf: BxDF) -> MixComponent {
    match bxdf {
        BxDF::Diffuse(b) => b.into(),
        BxDF::Dielectric(b) => b.into(),
        BxDF::Conductor(b) => b.into(),
        BxDF::CoatedDiffuse(b) => b.into(),
        BxDF::CoatedConductor(b) => b.into(),
        BxDF::Mix(_) => unreachable!("nested mix materials are rejected on construction"),
    }
}
