use cgmath::{EuclideanSpace, InnerSpace, Zero};

use crate::camera::Camera;
use crate::geometry::{offset_ray_origin, Normal3, Ray, RayDifferential};
use crate::interval::Point3fi;
use crate::light::DiffuseAreaLight;
use crate::material::{Material, MaterialEvalContext};
use crate::reflection::BSDF;
use crate::spectrum::{SampledSpectrum, SampledWavelengths};
use crate::{difference_of_products, Float, Point2f, Point3f, Vec3f};

/// Fraction of a shadow ray's length left unoccluded at its far end, so that the target surface
/// does not occlude itself.
pub const SHADOW_EPSILON: Float = 0.0001;

/// A point on a surface (or a sampled point on a light), with the error bounds of its position.
#[derive(Clone, Copy, Debug)]
pub struct Interaction {
    pub pi: Point3fi,

    pub time: Float,

    /// Outgoing direction, zero when there is none.
    pub wo: Vec3f,

    pub n: Normal3,

    pub uv: Point2f,
}

impl Interaction {
    pub fn new(pi: Point3fi, n: Normal3, uv: Point2f, wo: Vec3f, time: Float) -> Self {
        let wo = if wo.magnitude2() > 0.0 { wo.normalize() } else { wo };
        Self { pi, time, wo, n, uv }
    }

    pub fn p(&self) -> Point3f {
        self.pi.point()
    }

    pub fn is_surface_interaction(&self) -> bool {
        !self.n.is_zero()
    }

    pub fn offset_ray_origin(&self, w: Vec3f) -> Point3f {
        offset_ray_origin(&self.pi, &self.n, w)
    }

    pub fn offset_ray_origin_to(&self, pt: Point3f) -> Point3f {
        self.offset_ray_origin(pt - self.p())
    }

    pub fn spawn_ray(&self, d: Vec3f) -> Ray {
        Ray { origin: self.offset_ray_origin(d), dir: d, time: self.time }
    }

    /// Ray towards `p2` whose direction is scaled so that `t = 1` lands on `p2`. Trace it with
    /// `t_max = 1 - SHADOW_EPSILON`.
    pub fn spawn_ray_to(&self, p2: Point3f) -> Ray {
        let origin = self.offset_ray_origin_to(p2);
        Ray { origin, dir: p2 - origin, time: self.time }
    }

    /// Like `spawn_ray_to`, with both endpoints offset off their surfaces.
    pub fn spawn_ray_to_interaction(&self, it: &Interaction) -> Ray {
        let origin = self.offset_ray_origin_to(it.p());
        let target = it.offset_ray_origin_to(origin);
        Ray { origin, dir: target - origin, time: self.time }
    }
}

/// Partial derivatives of position and normal with respect to the surface parameterization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiffGeom {
    pub dpdu: Vec3f,
    pub dpdv: Vec3f,
    pub dndu: Normal3,
    pub dndv: Normal3,
}

pub struct SurfaceInteraction<'a> {
    pub intr: Interaction,

    pub geom: DiffGeom,

    pub shading_n: Normal3,

    pub shading_geom: DiffGeom,

    /// Screen-space derivatives of the hit point and its (u, v) coordinates
    pub dpdx: Vec3f,
    pub dpdy: Vec3f,
    pub dudx: Float,
    pub dvdx: Float,
    pub dudy: Float,
    pub dvdy: Float,

    pub material: Option<&'a Material>,

    pub area_light: Option<&'a DiffuseAreaLight<'a>>,
}

impl<'a> SurfaceInteraction<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pi: Point3fi,
        uv: Point2f,
        wo: Vec3f,
        dpdu: Vec3f,
        dpdv: Vec3f,
        dndu: Normal3,
        dndv: Normal3,
        time: Float,
        flip_normal: bool,
    ) -> Self {
        let mut n = Normal3(dpdu.cross(dpdv).normalize());
        if flip_normal {
            n = -n;
        }
        let geom = DiffGeom { dpdu, dpdv, dndu, dndv };

        Self {
            intr: Interaction::new(pi, n, uv, wo, time),
            geom,
            shading_n: n,
            shading_geom: geom,
            dpdx: Vec3f::zero(),
            dpdy: Vec3f::zero(),
            dudx: 0.0,
            dvdx: 0.0,
            dudy: 0.0,
            dvdy: 0.0,
            material: None,
            area_light: None,
        }
    }

    pub fn p(&self) -> Point3f {
        self.intr.p()
    }

    pub fn n(&self) -> Normal3 {
        self.intr.n
    }

    pub fn wo(&self) -> Vec3f {
        self.intr.wo
    }

    /// Replaces the shading frame. When `orientation_is_authoritative` the geometric normal is
    /// flipped to the side of `ns`, otherwise `ns` is flipped to the side of the geometric normal.
    pub fn set_shading_geometry(
        &mut self,
        ns: Normal3,
        dpdus: Vec3f,
        dpdvs: Vec3f,
        dndus: Normal3,
        dndvs: Normal3,
        orientation_is_authoritative: bool,
    ) {
        self.shading_n = ns;
        if orientation_is_authoritative {
            self.intr.n = self.intr.n.faceforward(self.shading_n.0);
        } else {
            self.shading_n = self.shading_n.faceforward(self.intr.n.0);
        }

        self.shading_geom = DiffGeom { dpdu: dpdus, dpdv: dpdvs, dndu: dndus, dndv: dndvs };
        while self.shading_geom.dpdu.magnitude2() > 1e16 || self.shading_geom.dpdv.magnitude2() > 1e16 {
            self.shading_geom.dpdu *= 1e-8;
            self.shading_geom.dpdv *= 1e-8;
        }
    }

    pub fn set_intersection_properties(&mut self, material: Option<&'a Material>, area_light: Option<&'a DiffuseAreaLight<'a>>) {
        self.material = material;
        self.area_light = area_light;
    }

    pub fn spawn_ray(&self, d: Vec3f) -> Ray {
        self.intr.spawn_ray(d)
    }

    pub fn spawn_ray_to(&self, p2: Point3f) -> Ray {
        self.intr.spawn_ray_to(p2)
    }

    /// Estimates how the hit point and its (u, v) coordinates change from pixel to pixel, from
    /// the ray's differentials when it has them, otherwise from the camera.
    pub fn compute_differentials<C: Camera + ?Sized>(&mut self, ray: &RayDifferential, camera: &C, samples_per_pixel: u32) {
        let n = self.intr.n.0;
        let p = self.p();
        match ray.diff {
            Some(diff) if n.dot(diff.rx_dir) != 0.0 && n.dot(diff.ry_dir) != 0.0 => {
                // intersect the offset rays with the tangent plane
                let d = -n.dot(p.to_vec());
                let tx = (-n.dot(diff.rx_origin.to_vec()) - d) / n.dot(diff.rx_dir);
                let px = diff.rx_origin + diff.rx_dir * tx;
                let ty = (-n.dot(diff.ry_origin.to_vec()) - d) / n.dot(diff.ry_dir);
                let py = diff.ry_origin + diff.ry_dir * ty;
                self.dpdx = px - p;
                self.dpdy = py - p;
            }
            _ => {
                let (dpdx, dpdy) = camera.approximate_dp_dxy(p, self.intr.n, samples_per_pixel);
                self.dpdx = dpdx;
                self.dpdy = dpdy;
            }
        }

        // least squares fit of (du, dv) against dp
        let dpdu = self.geom.dpdu;
        let dpdv = self.geom.dpdv;
        let ata00 = dpdu.dot(dpdu);
        let ata01 = dpdu.dot(dpdv);
        let ata11 = dpdv.dot(dpdv);
        let mut inv_det = 1.0 / difference_of_products(ata00, ata11, ata01, ata01);
        if !inv_det.is_finite() {
            inv_det = 0.0;
        }

        let atb0x = dpdu.dot(self.dpdx);
        let atb1x = dpdv.dot(self.dpdx);
        let atb0y = dpdu.dot(self.dpdy);
        let atb1y = dpdv.dot(self.dpdy);

        let clamp_derivative = |d: Float| if d.is_finite() { d.clamp(-1e8, 1e8) } else { 0.0 };
        self.dudx = clamp_derivative(difference_of_products(ata11, atb0x, ata01, atb1x) * inv_det);
        self.dvdx = clamp_derivative(difference_of_products(ata00, atb1x, ata01, atb0x) * inv_det);
        self.dudy = clamp_derivative(difference_of_products(ata11, atb0y, ata01, atb1y) * inv_det);
        self.dvdy = clamp_derivative(difference_of_products(ata00, atb1y, ata01, atb0y) * inv_det);
    }

    /// Builds the BSDF of the hit material. Returns `None` for surfaces without a material,
    /// which only mark the boundary of an emitter.
    pub fn get_bsdf<C: Camera + ?Sized>(
        &mut self,
        ray: &RayDifferential,
        lambda: &mut SampledWavelengths,
        camera: &C,
        samples_per_pixel: u32,
    ) -> Option<BSDF> {
        self.compute_differentials(ray, camera, samples_per_pixel);

        let material = self.material?;
        let ctx = MaterialEvalContext::from(&*self);
        let bxdf = material.get_bxdf(&ctx, lambda);
        Some(BSDF::new(self.shading_n, self.shading_geom.dpdu, bxdf))
    }

    /// Radiance emitted from the hit point along `w`.
    pub fn le(&self, w: Vec3f, lambda: &SampledWavelengths) -> SampledSpectrum {
        match self.area_light {
            Some(light) => light.l(self.p(), self.intr.n, self.intr.uv, w, lambda),
            None => SampledSpectrum::zero(),
        }
    }
}
