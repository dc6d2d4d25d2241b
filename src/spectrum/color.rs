//! CIE matching functions and the RGB color spaces the film can output to.

use anyhow::bail;
use cgmath::{Matrix3, Vector3};
use once_cell::sync::Lazy;

use crate::Float;

use super::{Rgb, SampledSpectrum, SampledWavelengths, NUM_SPECTRUM_SAMPLES};

/// Integral of the CIE Y matching function over wavelength, in nm.
pub const CIE_Y_INTEGRAL: Float = 106.856_895;

/// Asymmetric Gaussian lobe used by the analytic matching-function fits.
fn lobe(lambda: Float, mu: Float, sigma_lo: Float, sigma_hi: Float) -> Float {
    let sigma = if lambda < mu { sigma_lo } else { sigma_hi };
    let t = (lambda - mu) / sigma;
    (-0.5 * t * t).exp()
}

/// Multi-lobe Gaussian fit of the CIE 1931 2° x̄ function (Wyman et al. 2013).
pub fn cie_x(lambda: Float) -> Float {
    1.056 * lobe(lambda, 599.8, 37.9, 31.0)
        + 0.362 * lobe(lambda, 442.0, 16.0, 26.7)
        - 0.065 * lobe(lambda, 501.1, 20.4, 26.2)
}

pub fn cie_y(lambda: Float) -> Float {
    0.821 * lobe(lambda, 568.8, 46.9, 40.5) + 0.286 * lobe(lambda, 530.9, 16.3, 31.1)
}

pub fn cie_z(lambda: Float) -> Float {
    1.217 * lobe(lambda, 437.0, 11.8, 36.0) + 0.681 * lobe(lambda, 459.0, 26.0, 13.8)
}

/// Monte Carlo estimate of the XYZ tristimulus values of `s`, normalized so that a unit
/// constant spectrum has Y = 1.
pub fn spectrum_to_xyz(s: &SampledSpectrum, lambda: &SampledWavelengths) -> [Float; 3] {
    let pdf = lambda.pdf();
    let weighted = s.safe_div(pdf);
    let mut xyz = [0.0; 3];
    for i in 0..NUM_SPECTRUM_SAMPLES {
        let l = lambda[i];
        xyz[0] += cie_x(l) * weighted[i];
        xyz[1] += cie_y(l) * weighted[i];
        xyz[2] += cie_z(l) * weighted[i];
    }
    let scale = 1.0 / (NUM_SPECTRUM_SAMPLES as Float * CIE_Y_INTEGRAL);
    [xyz[0] * scale, xyz[1] * scale, xyz[2] * scale]
}

#[derive(Clone, Debug, PartialEq)]
pub struct RgbColorSpace {
    pub name: &'static str,
    pub rgb_from_xyz: Matrix3<Float>,
    pub xyz_from_rgb: Matrix3<Float>,
}

// cgmath matrices are built column by column, so each row below is a column of the matrix.
#[allow(clippy::excessive_precision)]
pub static SRGB: Lazy<RgbColorSpace> = Lazy::new(|| RgbColorSpace {
    name: "srgb",
    rgb_from_xyz: Matrix3::new(
        3.240479, -0.969256, 0.055648,
        -1.537150, 1.875991, -0.204043,
        -0.498535, 0.041556, 1.057311,
    ),
    xyz_from_rgb: Matrix3::new(
        0.412453, 0.212671, 0.019334,
        0.357580, 0.715160, 0.119193,
        0.180423, 0.072169, 0.950227,
    ),
});

#[allow(clippy::excessive_precision)]
pub static REC2020: Lazy<RgbColorSpace> = Lazy::new(|| RgbColorSpace {
    name: "rec2020",
    rgb_from_xyz: Matrix3::new(
        1.716_651_2, -0.666_684_4, 0.017_639_9,
        -0.355_670_8, 1.616_481_2, -0.042_770_6,
        -0.253_366_3, 0.015_768_5, 0.942_103_1,
    ),
    xyz_from_rgb: Matrix3::new(
        0.636_958_0, 0.262_700_2, 0.0,
        0.144_616_9, 0.677_998_1, 0.028_072_7,
        0.168_881_0, 0.059_301_7, 1.060_985_1,
    ),
});

impl RgbColorSpace {
    pub fn from_name(name: &str) -> anyhow::Result<&'static RgbColorSpace> {
        match name.to_ascii_lowercase().as_str() {
            "srgb" => Ok(&*SRGB),
            "rec2020" => Ok(&*REC2020),
            _ => bail!("unknown color space '{}', expected one of: srgb, rec2020", name),
        }
    }

    pub fn to_rgb(&self, xyz: [Float; 3]) -> Rgb {
        mul_mat3(&self.rgb_from_xyz, Rgb::from(xyz))
    }
}

pub fn mul_mat3(m: &Matrix3<Float>, c: Rgb) -> Rgb {
    let v = *m * Vector3::new(c[0], c[1], c[2]);
    Rgb::new(v.x, v.y, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cgmath::SquareMatrix;

    #[test]
    fn test_cie_y_integral() {
        let sum: f64 = (360..=830).map(|l| cie_y(l as Float) as f64).sum();
        assert_abs_diff_eq!(sum, CIE_Y_INTEGRAL as f64, epsilon = 1.5);
    }

    #[test]
    fn test_color_space_matrices_are_inverses() {
        for cs in [&*SRGB, &*REC2020] {
            let m = cs.rgb_from_xyz * cs.xyz_from_rgb;
            assert_abs_diff_eq!(m, Matrix3::identity(), epsilon = 1e-3);
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(RgbColorSpace::from_name("sRGB").unwrap().name, "srgb");
        assert!(RgbColorSpace::from_name("aces").is_err());
    }

    #[test]
    fn test_white_maps_to_gray() {
        // a four-wavelength estimate of a unit spectrum lands near Y = 1
        let lambda = SampledWavelengths::sample_uniform_visible(0.37);
        let xyz = spectrum_to_xyz(&SampledSpectrum::uniform(1.0), &lambda);
        assert!(xyz[1] > 0.5 && xyz[1] < 1.5);
    }
}
