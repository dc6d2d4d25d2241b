use num::Complex;

use crate::spectrum::SampledSpectrum;
use crate::{safe_sqrt, sqr, Float};

/// Unpolarized Fresnel reflectance of a dielectric interface with relative index of refraction
/// `eta`. A negative `cos_theta_i` means the light arrives from inside the medium.
pub fn fr_dielectric(cos_theta_i: Float, mut eta: Float) -> Float {
    let mut cos_theta_i = cos_theta_i.clamp(-1.0, 1.0);
    if cos_theta_i < 0.0 {
        eta = 1.0 / eta;
        cos_theta_i = -cos_theta_i;
    }

    // compute cos_theta_t using snell's law
    let sin2_theta_i = 1.0 - sqr(cos_theta_i);
    let sin2_theta_t = sin2_theta_i / sqr(eta);
    if sin2_theta_t >= 1.0 {
        return 1.0; // total internal reflection
    }
    let cos_theta_t = safe_sqrt(1.0 - sin2_theta_t);

    let r_parallel = (eta * cos_theta_i - cos_theta_t) / (eta * cos_theta_i + cos_theta_t);
    let r_perp = (cos_theta_i - eta * cos_theta_t) / (cos_theta_i + eta * cos_theta_t);
    (sqr(r_parallel) + sqr(r_perp)) / 2.0
}

/// Fresnel reflectance of a conductor with complex index of refraction `eta`.
pub fn fr_complex(cos_theta_i: Float, eta: Complex<Float>) -> Float {
    let cos_theta_i = cos_theta_i.clamp(0.0, 1.0);
    let sin2_theta_i = 1.0 - sqr(cos_theta_i);
    let sin2_theta_t = Complex::new(sin2_theta_i, 0.0) / (eta * eta);
    let cos_theta_t = (Complex::new(1.0, 0.0) - sin2_theta_t).sqrt();

    let r_parallel = (eta * cos_theta_i - cos_theta_t) / (eta * cos_theta_i + cos_theta_t);
    let cos_i = Complex::new(cos_theta_i, 0.0);
    let r_perp = (cos_i - eta * cos_theta_t) / (cos_i + eta * cos_theta_t);
    (r_parallel.norm_sqr() + r_perp.norm_sqr()) / 2.0
}

/// `fr_complex` at each wavelength, with the real part of the index in `eta` and the
/// absorption coefficient in `k`.
pub fn fr_complex_spectrum(cos_theta_i: Float, eta: SampledSpectrum, k: SampledSpectrum) -> SampledSpectrum {
    SampledSpectrum::new_with(|i| fr_complex(cos_theta_i, Complex::new(eta[i], k[i])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_dielectric_normal_incidence() {
        // ((eta - 1) / (eta + 1))^2
        assert_abs_diff_eq!(fr_dielectric(1.0, 1.5), 0.04, epsilon = 1e-6);
        assert_abs_diff_eq!(fr_dielectric(-1.0, 1.5), 0.04, epsilon = 1e-6);
        assert_abs_diff_eq!(fr_dielectric(0.5, 1.0), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_dielectric_total_internal_reflection() {
        assert_eq!(fr_dielectric(-0.1, 1.5), 1.0);
    }

    #[test]
    fn test_complex_matches_dielectric_without_absorption() {
        for &cos in &[0.1, 0.5, 0.9, 1.0] {
            assert_abs_diff_eq!(fr_complex(cos, Complex::new(1.5, 0.0)), fr_dielectric(cos, 1.5), epsilon = 1e-5);
        }
        // strongly absorbing metals are highly reflective
        assert!(fr_complex(1.0, Complex::new(0.2, 3.9)) > 0.9);
    }

    #[test]
    fn test_complex_normal_incidence() {
        // |(eta - 1) / (eta + 1)|^2
        for &eta in &[Complex::new(0.2, 3.9), Complex::new(1.1, 6.5), Complex::new(2.9, 3.1)] {
            let one = Complex::new(1.0, 0.0);
            let expected = ((eta - one) / (eta + one)).norm_sqr();
            assert_abs_diff_eq!(fr_complex(1.0, eta), expected, epsilon = 1e-5);
        }
        assert_abs_diff_eq!(fr_complex(1.0, Complex::new(0.2, 3.9)), 0.951_951_9, epsilon = 1e-5);
    }
}
