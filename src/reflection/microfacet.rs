use cgmath::{InnerSpace, Vector2};

use crate::reflection::{abs_cos_theta, cos2_theta, cos_phi, sin_phi, tan2_theta};
use crate::sampling::sample_uniform_disk_polar;
use crate::{lerp, sqr, Float, Point2f, Vec3f, PI};

/// Also known as GGX.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrowbridgeReitzDistribution {
    alpha_x: Float,
    alpha_y: Float,
}

impl TrowbridgeReitzDistribution {
    pub fn new(alpha_x: Float, alpha_y: Float) -> Self {
        let mut distrib = Self { alpha_x, alpha_y };
        if !distrib.effectively_smooth() {
            // very small alphas underflow in d(), keep them out of that range
            distrib.alpha_x = distrib.alpha_x.max(1e-4);
            distrib.alpha_y = distrib.alpha_y.max(1e-4);
        }
        distrib
    }

    /// Maps a user-facing roughness in [0, 1] to the distribution's alpha parameter.
    pub fn roughness_to_alpha(roughness: Float) -> Float {
        roughness.sqrt()
    }

    pub fn alpha_x(&self) -> Float {
        self.alpha_x
    }

    pub fn alpha_y(&self) -> Float {
        self.alpha_y
    }

    /// Below this roughness the lobe is treated as a perfect mirror.
    pub fn effectively_smooth(&self) -> bool {
        self.alpha_x.max(self.alpha_y) < 1e-3
    }

    /// Differential area of microfacets oriented along `wm`.
    pub fn d(&self, wm: Vec3f) -> Float {
        let tan2_theta = tan2_theta(wm);
        if tan2_theta.is_infinite() {
            return 0.0;
        }
        let cos4_theta = sqr(cos2_theta(wm));
        if cos4_theta < 1e-16 {
            return 0.0;
        }
        let e = tan2_theta * (sqr(cos_phi(wm) / self.alpha_x) + sqr(sin_phi(wm) / self.alpha_y));
        1.0 / (PI * self.alpha_x * self.alpha_y * cos4_theta * sqr(1.0 + e))
    }

    /// Masked microfacet area per visible microfacet area, seen from `w`.
    pub fn lambda(&self, w: Vec3f) -> Float {
        let tan2_theta = tan2_theta(w);
        if tan2_theta.is_infinite() {
            return 0.0;
        }
        let alpha2 = sqr(cos_phi(w) * self.alpha_x) + sqr(sin_phi(w) * self.alpha_y);
        ((1.0 + alpha2 * tan2_theta).sqrt() - 1.0) / 2.0
    }

    pub fn g1(&self, w: Vec3f) -> Float {
        1.0 / (1.0 + self.lambda(w))
    }

    /// Fraction of microfacets visible from both `wo` and `wi`.
    pub fn g(&self, wo: Vec3f, wi: Vec3f) -> Float {
        1.0 / (1.0 + self.lambda(wo) + self.lambda(wi))
    }

    /// Distribution of normals visible from `w`.
    pub fn visible_d(&self, w: Vec3f, wm: Vec3f) -> Float {
        self.g1(w) / abs_cos_theta(w) * self.d(wm) * w.dot(wm).abs()
    }

    pub fn pdf(&self, w: Vec3f, wm: Vec3f) -> Float {
        self.visible_d(w, wm)
    }

    /// Samples a microfacet normal from the distribution of normals visible from `w`.
    pub fn sample_wm(&self, w: Vec3f, u: Point2f) -> Vec3f {
        // transform w to the hemispherical configuration
        let mut wh = Vec3f::new(self.alpha_x * w.x, self.alpha_y * w.y, w.z).normalize();
        if wh.z < 0.0 {
            wh = -wh;
        }

        let t1 = if wh.z < 0.99999 {
            Vec3f::unit_z().cross(wh).normalize()
        } else {
            Vec3f::unit_x()
        };
        let t2 = wh.cross(t1);

        // warp a uniform disk sample to the projection of the visible hemisphere
        let mut p = sample_uniform_disk_polar(u);
        let h = (1.0 - sqr(p.x)).sqrt();
        p.y = lerp((1.0 + wh.z) / 2.0, h, p.y);

        let pz = Float::max(0.0, 1.0 - Vector2::new(p.x, p.y).magnitude2()).sqrt();
        let nh = p.x * t1 + p.y * t2 + pz * wh;
        Vec3f::new(self.alpha_x * nh.x, self.alpha_y * nh.y, Float::max(1e-6, nh.z)).normalize()
    }

    pub fn regularize(&mut self) {
        if self.alpha_x < 0.3 {
            self.alpha_x = (2.0 * self.alpha_x).clamp(0.1, 0.3);
        }
        if self.alpha_y < 0.3 {
            self.alpha_y = (2.0 * self.alpha_y).clamp(0.1, 0.3);
        }
    }
}
