use approx::{AbsDiffEq, RelativeEq};

use crate::Float;

mod color;
mod spectra;
mod wavelengths;

pub use color::*;
pub use spectra::*;
pub use wavelengths::*;

/// Number of wavelengths carried by every `SampledSpectrum` in the pipeline.
pub const NUM_SPECTRUM_SAMPLES: usize = 4;

pub const LAMBDA_MIN: Float = 360.0;
pub const LAMBDA_MAX: Float = 830.0;

/// A fixed-size vector of spectral or color coefficients with pointwise arithmetic.
#[derive(Clone, Copy)]
pub struct CoefficientSpectrum<const N: usize>([Float; N]);

/// Radiometric values at the `NUM_SPECTRUM_SAMPLES` wavelengths of a `SampledWavelengths`.
pub type SampledSpectrum = CoefficientSpectrum<NUM_SPECTRUM_SAMPLES>;

pub type Rgb = CoefficientSpectrum<3>;

impl<const N: usize> CoefficientSpectrum<N> {

    #[inline]
    pub fn new_with<F: FnMut(usize) -> Float>(init: F) -> Self {
        Self(std::array::from_fn(init))
    }

    #[inline]
    pub fn zip<F: Fn(Float, Float) -> Float>(&self, other: &Self, f: F) -> Self {
        Self::new_with(|i| f(self[i], other[i]))
    }

    pub fn uniform(val: Float) -> Self {
        Self::new_with(|_| val)
    }

    pub fn zero() -> Self {
        Self::uniform(0.0)
    }

    pub fn map<F: Fn(Float) -> Float>(&self, f: F) -> Self {
        Self::new_with(|i| f(self[i]))
    }

    pub fn is_black(&self) -> bool {
        self.0.iter().all(|&x| x == 0.0)
    }

    /// True if any coefficient is nonzero.
    pub fn is_positive(&self) -> bool {
        !self.is_black()
    }

    pub fn has_nans(&self) -> bool {
        self.0.iter().any(|&x| x.is_nan())
    }

    pub fn has_infs(&self) -> bool {
        self.0.iter().any(|&x| x.is_infinite())
    }

    pub fn lerp(t: Float, s1: Self, s2: Self) -> Self {
        (1.0 - t) * s1 + t * s2
    }

    pub fn sqrt(self) -> Self {
        self.map(Float::sqrt)
    }

    pub fn exp(self) -> Self {
        self.map(Float::exp)
    }

    pub fn clamp(self, low: Float, high: Float) -> Self {
        self.map(|x| x.clamp(low, high))
    }

    pub fn clamp_positive(self) -> Self {
        self.clamp(0.0, Float::INFINITY)
    }

    /// Pointwise division that yields zero wherever the divisor is zero.
    pub fn safe_div(self, rhs: Self) -> Self {
        self.zip(&rhs, crate::math::safe_div)
    }

    pub fn min_component_value(&self) -> Float {
        self.0.iter().cloned().fold(Float::INFINITY, Float::min)
    }

    pub fn max_component_value(&self) -> Float {
        self.0.iter().cloned().fold(Float::NEG_INFINITY, Float::max)
    }

    pub fn average(&self) -> Float {
        self.0.iter().sum::<Float>() / N as Float
    }

    pub fn values(&self) -> &[Float; N] {
        &self.0
    }
}

impl Rgb {
    pub fn new(r: Float, g: Float, b: Float) -> Self {
        Self([r, g, b])
    }

    pub fn r(&self) -> Float { self[0] }
    pub fn g(&self) -> Float { self[1] }
    pub fn b(&self) -> Float { self[2] }
}

impl<const N: usize> std::ops::Index<usize> for CoefficientSpectrum<N> {
    type Output = Float;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const N: usize> std::ops::IndexMut<usize> for CoefficientSpectrum<N> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const N: usize> PartialEq for CoefficientSpectrum<N> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<const N: usize> Default for CoefficientSpectrum<N> {
    fn default() -> Self {
        Self::uniform(Float::default())
    }
}

impl<const N: usize> std::fmt::Debug for CoefficientSpectrum<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl<const N: usize> From<[Float; N]> for CoefficientSpectrum<N> {
    fn from(a: [Float; N]) -> Self {
        Self(a)
    }
}

impl<const N: usize> From<Float> for CoefficientSpectrum<N> {
    fn from(x: Float) -> Self {
        Self::uniform(x)
    }
}

impl<const N: usize> From<CoefficientSpectrum<N>> for [Float; N] {
    fn from(s: CoefficientSpectrum<N>) -> Self {
        s.0
    }
}

impl<const N: usize> std::iter::Sum for CoefficientSpectrum<N> {
    fn sum<I: Iterator<Item=Self>>(iter: I) -> Self {
        iter.fold(Self::uniform(0.0), std::ops::Add::add)
    }
}

impl<const N: usize> std::ops::Neg for CoefficientSpectrum<N> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.map(|x| -x)
    }
}

impl<const N: usize> AbsDiffEq for CoefficientSpectrum<N> {
    type Epsilon = Float;

    fn default_epsilon() -> Float {
        Float::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Float) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl<const N: usize> RelativeEq for CoefficientSpectrum<N> {
    fn default_max_relative() -> Float {
        Float::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: Float, max_relative: Float) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
    }
}

macro_rules! impl_op {
    ($op:ident, $name:ident, $sym:tt) => {
        impl<const N: usize> std::ops::$op for CoefficientSpectrum<N> {
            type Output = Self;

            fn $name(self, rhs: Self) -> Self::Output {
                Self::zip(&self, &rhs, |x, y| x $sym y)
            }
        }

        impl<const N: usize> std::ops::$op<Float> for CoefficientSpectrum<N> {
            type Output = Self;

            fn $name(self, rhs: Float) -> Self::Output {
                Self::new_with(|i| self[i] $sym rhs)
            }
        }

        impl<const N: usize> std::ops::$op<CoefficientSpectrum<N>> for Float {
            type Output = CoefficientSpectrum<N>;

            fn $name(self, rhs: CoefficientSpectrum<N>) -> Self::Output {
                CoefficientSpectrum::new_with(|i| self $sym rhs[i])
            }
        }
    }
}

macro_rules! impl_assign_op {
    ($op:ident, $name:ident, $sym:tt) => {
        impl<const N: usize> std::ops::$op for CoefficientSpectrum<N> {
            fn $name(&mut self, rhs: Self) {
                for i in 0..N {
                    self[i] $sym rhs[i];
                }
            }
        }

        impl<const N: usize> std::ops::$op<Float> for CoefficientSpectrum<N> {
            fn $name(&mut self, rhs: Float) {
                for i in 0..N {
                    self[i] $sym rhs;
                }
            }
        }
    }
}

impl_op!(Add, add, +);
impl_op!(Sub, sub, -);
impl_op!(Mul, mul, *);
impl_op!(Div, div, /);
impl_assign_op!(AddAssign, add_assign, +=);
impl_assign_op!(SubAssign, sub_assign, -=);
impl_assign_op!(MulAssign, mul_assign, *=);
impl_assign_op!(DivAssign, div_assign, /=);


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_sum() {
        let spectra = vec![Rgb::uniform(1.0), Rgb::from([0.0, 1.0, 0.5])];
        let sum: Rgb = spectra.into_iter().sum();
        assert_eq!(sum, Rgb::from([1.0, 2.0, 1.5]));
    }

    #[test]
    fn test_reductions() {
        let s = SampledSpectrum::from([0.5, -1.0, 2.0, 0.5]);
        assert_eq!(s.min_component_value(), -1.0);
        assert_eq!(s.max_component_value(), 2.0);
        assert_eq!(s.average(), 0.5);
        assert!(s.is_positive());
        assert!(!SampledSpectrum::zero().is_positive());
    }

    #[test]
    fn test_safe_div_and_nan() {
        let a = SampledSpectrum::from([1.0, 2.0, 3.0, 4.0]);
        let b = SampledSpectrum::from([2.0, 0.0, 1.0, 0.0]);
        assert_eq!(a.safe_div(b), SampledSpectrum::from([0.5, 0.0, 3.0, 0.0]));
        assert!(!(a / b).has_nans());
        assert!((a / b).has_infs());
        assert!((SampledSpectrum::zero() / SampledSpectrum::zero()).has_nans());
    }
}
