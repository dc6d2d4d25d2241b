use cgmath::InnerSpace;

use crate::geometry::{coordinate_system, gram_schmidt, Frame, Normal3};
use crate::reflection::{BSDFSample, BxDF, BxDFFlags, BxDFModel, BxDFReflTransFlags, TransportMode};
use crate::spectrum::SampledSpectrum;
use crate::{Float, Point2f, Vec3f};

/// The scattering model at one hit point, together with the shading frame that maps render
/// space directions to the model's local space.
#[derive(Clone, Debug)]
pub struct BSDF {
    frame: Frame,
    bxdf: BxDF,
}

impl BSDF {
    /// Builds the shading frame from the shading normal `ns` and the shading tangent `dpdus`.
    pub fn new(ns: Normal3, dpdus: Vec3f, bxdf: BxDF) -> Self {
        let z = ns.0.normalize();
        let x = gram_schmidt(dpdus, z);
        let frame = if x.magnitude2() > 0.0 {
            Frame::from_xz(x.normalize(), z)
        } else {
            let (x, y) = coordinate_system(z);
            Frame { x, y, z }
        };
        Self { frame, bxdf }
    }

    pub fn flags(&self) -> BxDFFlags {
        self.bxdf.flags()
    }

    pub fn bxdf(&self) -> &BxDF {
        &self.bxdf
    }

    pub fn render_to_local(&self, v: Vec3f) -> Vec3f {
        self.frame.to_local(v)
    }

    pub fn local_to_render(&self, v: Vec3f) -> Vec3f {
        self.frame.from_local(v)
    }

    pub fn f(&self, wo_render: Vec3f, wi_render: Vec3f, mode: TransportMode) -> SampledSpectrum {
        let wi = self.render_to_local(wi_render);
        let wo = self.render_to_local(wo_render);
        if wo.z == 0.0 {
            return SampledSpectrum::zero();
        }
        self.bxdf.f(wo, wi, mode)
    }

    /// Samples an incident direction. The returned `wi` is in render space.
    pub fn sample_f(
        &self,
        wo_render: Vec3f,
        uc: Float,
        u: Point2f,
        mode: TransportMode,
        sample_flags: BxDFReflTransFlags,
    ) -> Option<BSDFSample> {
        let wo = self.render_to_local(wo_render);
        if wo.z == 0.0 || !self.flags().intersects(BxDFFlags::from_bits_truncate(sample_flags.bits())) {
            return None;
        }

        let mut bs = self.bxdf.sample_f(wo, uc, u, mode, sample_flags)?;
        if !bs.is_usable() {
            return None;
        }
        bs.wi = self.local_to_render(bs.wi);
        Some(bs)
    }

    pub fn pdf(&self, wo_render: Vec3f, wi_render: Vec3f, mode: TransportMode, sample_flags: BxDFReflTransFlags) -> Float {
        let wo = self.render_to_local(wo_render);
        let wi = self.render_to_local(wi_render);
        if wo.z == 0.0 {
            return 0.0;
        }
        self.bxdf.pdf(wo, wi, mode, sample_flags)
    }

    pub fn regularize(&mut self) {
        self.bxdf.regularize();
    }
}
