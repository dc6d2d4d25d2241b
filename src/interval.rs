//! Floating-point error bounds.
//!
//! Positions computed by intersection routines carry a conservative bound on the rounding error
//! they accumulated. The `gamma(n)` bound covers `n` successive floating-point operations, and
//! `Interval` keeps a value as a `[low, high]` range whose arithmetic always rounds outward.

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::{Float, Point3f, Vec3f};

pub const MACHINE_EPSILON: Float = std::f32::EPSILON * 0.5;

/// Bound on the relative error accumulated by `n` floating-point operations.
#[inline]
pub fn gamma(n: i32) -> Float {
    let n = n as Float;
    (n * MACHINE_EPSILON) / (1.0 - n * MACHINE_EPSILON)
}

pub fn next_float_up(mut v: f32) -> f32 {
    if v.is_infinite() && v > 0.0 { return v; }

    if v == -0.0 { v = 0.0 }

    let bits = v.to_bits();
    let bits = if v >= 0.0 { bits + 1 } else { bits - 1 };
    f32::from_bits(bits)
}

pub fn next_float_down(mut v: f32) -> f32 {
    if v.is_infinite() && v < 0.0 { return v; }

    if v == 0.0 { v = -0.0 }

    let bits = v.to_bits();
    let bits = if v > 0.0 { bits - 1 } else { bits + 1 };
    f32::from_bits(bits)
}

#[inline] fn add_round_up(a: Float, b: Float) -> Float { next_float_up(a + b) }
#[inline] fn add_round_down(a: Float, b: Float) -> Float { next_float_down(a + b) }
#[inline] fn sub_round_up(a: Float, b: Float) -> Float { next_float_up(a - b) }
#[inline] fn sub_round_down(a: Float, b: Float) -> Float { next_float_down(a - b) }
#[inline] fn mul_round_up(a: Float, b: Float) -> Float { next_float_up(a * b) }
#[inline] fn mul_round_down(a: Float, b: Float) -> Float { next_float_down(a * b) }
#[inline] fn div_round_up(a: Float, b: Float) -> Float { next_float_up(a / b) }
#[inline] fn div_round_down(a: Float, b: Float) -> Float { next_float_down(a / b) }

/// A closed range of floats that is guaranteed to contain the exact result of the computation
/// that produced it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval {
    low: Float,
    high: Float,
}

impl Interval {
    pub fn new(v: Float) -> Self {
        Self { low: v, high: v }
    }

    pub fn with_bounds(a: Float, b: Float) -> Self {
        Self { low: a.min(b), high: a.max(b) }
    }

    pub fn from_value_and_error(v: Float, err: Float) -> Self {
        if err == 0.0 {
            Self::new(v)
        } else {
            Self {
                low: sub_round_down(v, err),
                high: add_round_up(v, err),
            }
        }
    }

    pub fn lower_bound(&self) -> Float { self.low }

    pub fn upper_bound(&self) -> Float { self.high }

    pub fn midpoint(&self) -> Float {
        (self.low + self.high) / 2.0
    }

    pub fn width(&self) -> Float {
        self.high - self.low
    }

    pub fn is_exact(&self) -> bool {
        self.low == self.high
    }

    pub fn contains(&self, v: Float) -> bool {
        v >= self.low && v <= self.high
    }

    pub fn sqr(self) -> Self {
        let mut alow = self.low.abs();
        let mut ahigh = self.high.abs();
        if alow > ahigh {
            std::mem::swap(&mut alow, &mut ahigh);
        }
        if self.contains(0.0) {
            return Self { low: 0.0, high: mul_round_up(ahigh, ahigh) };
        }
        Self { low: mul_round_down(alow, alow), high: mul_round_up(ahigh, ahigh) }
    }

    pub fn sqrt(self) -> Self {
        Self {
            low: next_float_down(self.low.max(0.0).sqrt()).max(0.0),
            high: next_float_up(self.high.sqrt()),
        }
    }
}

impl From<Float> for Interval {
    fn from(v: Float) -> Self {
        Self::new(v)
    }
}

impl Add for Interval {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            low: add_round_down(self.low, rhs.low),
            high: add_round_up(self.high, rhs.high),
        }
    }
}

impl Sub for Interval {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            low: sub_round_down(self.low, rhs.high),
            high: sub_round_up(self.high, rhs.low),
        }
    }
}

impl Mul for Interval {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let lp = [
            mul_round_down(self.low, rhs.low),
            mul_round_down(self.high, rhs.low),
            mul_round_down(self.low, rhs.high),
            mul_round_down(self.high, rhs.high),
        ];
        let hp = [
            mul_round_up(self.low, rhs.low),
            mul_round_up(self.high, rhs.low),
            mul_round_up(self.low, rhs.high),
            mul_round_up(self.high, rhs.high),
        ];
        Self {
            low: lp.iter().cloned().fold(Float::INFINITY, Float::min),
            high: hp.iter().cloned().fold(Float::NEG_INFINITY, Float::max),
        }
    }
}

impl Div for Interval {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        if rhs.contains(0.0) {
            // the quotient is unbounded when the divisor may be zero
            return Self { low: Float::NEG_INFINITY, high: Float::INFINITY };
        }
        let low_quot = [
            div_round_down(self.low, rhs.low),
            div_round_down(self.high, rhs.low),
            div_round_down(self.low, rhs.high),
            div_round_down(self.high, rhs.high),
        ];
        let high_quot = [
            div_round_up(self.low, rhs.low),
            div_round_up(self.high, rhs.low),
            div_round_up(self.low, rhs.high),
            div_round_up(self.high, rhs.high),
        ];
        Self {
            low: low_quot.iter().cloned().fold(Float::INFINITY, Float::min),
            high: high_quot.iter().cloned().fold(Float::NEG_INFINITY, Float::max),
        }
    }
}

impl Neg for Interval {
    type Output = Self;

    fn neg(self) -> Self {
        Self { low: -self.high, high: -self.low }
    }
}

impl Add<Float> for Interval {
    type Output = Self;

    fn add(self, rhs: Float) -> Self {
        self + Interval::new(rhs)
    }
}

impl Mul<Float> for Interval {
    type Output = Self;

    fn mul(self, rhs: Float) -> Self {
        if rhs > 0.0 {
            Self { low: mul_round_down(rhs, self.low), high: mul_round_up(rhs, self.high) }
        } else {
            Self { low: mul_round_down(rhs, self.high), high: mul_round_up(rhs, self.low) }
        }
    }
}

/// A point whose coordinates are each an `Interval`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point3fi {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Point3fi {
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        Self { x, y, z }
    }

    pub fn exact(p: Point3f) -> Self {
        Self::new(p.x.into(), p.y.into(), p.z.into())
    }

    pub fn from_value_and_error(p: Point3f, e: Vec3f) -> Self {
        Self {
            x: Interval::from_value_and_error(p.x, e.x),
            y: Interval::from_value_and_error(p.y, e.y),
            z: Interval::from_value_and_error(p.z, e.z),
        }
    }

    /// The midpoint of each coordinate interval.
    pub fn point(&self) -> Point3f {
        Point3f::new(self.x.midpoint(), self.y.midpoint(), self.z.midpoint())
    }

    /// Half the width of each coordinate interval.
    pub fn error(&self) -> Vec3f {
        Vec3f::new(self.x.width() / 2.0, self.y.width() / 2.0, self.z.width() / 2.0)
    }

    pub fn is_exact(&self) -> bool {
        self.x.is_exact() && self.y.is_exact() && self.z.is_exact()
    }

    pub fn contains(&self, p: Point3f) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.contains(p.z)
    }
}

impl From<Point3f> for Point3fi {
    fn from(p: Point3f) -> Self {
        Self::exact(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256Plus;

    fn random_interval(rng: &mut Xoshiro256Plus) -> Interval {
        let a = rng.gen_range(-100.0..100.0);
        let b = a + rng.gen_range(0.0..5.0);
        Interval::with_bounds(a, b)
    }

    fn sample_in(i: Interval, rng: &mut Xoshiro256Plus) -> f64 {
        let t: f64 = rng.gen();
        i.lower_bound() as f64 + t * (i.upper_bound() as f64 - i.lower_bound() as f64)
    }

    fn contains_f64(i: Interval, v: f64) -> bool {
        v >= i.lower_bound() as f64 && v <= i.upper_bound() as f64
    }

    #[test]
    fn test_next_float() {
        assert!(next_float_up(1.0) > 1.0);
        assert!(next_float_down(1.0) < 1.0);
        assert!(next_float_up(-0.0) > 0.0);
        assert!(next_float_down(0.0) < 0.0);
        assert_eq!(next_float_up(Float::INFINITY), Float::INFINITY);
        assert_eq!(next_float_down(Float::NEG_INFINITY), Float::NEG_INFINITY);
    }

    #[test]
    fn test_arithmetic_contains_exact_results() {
        let mut rng = Xoshiro256Plus::seed_from_u64(7);
        for _ in 0..10_000 {
            let a = random_interval(&mut rng);
            let b = random_interval(&mut rng);
            let va = sample_in(a, &mut rng) as f32 as f64;
            let vb = sample_in(b, &mut rng) as f32 as f64;
            if !contains_f64(a, va) || !contains_f64(b, vb) {
                continue;
            }

            assert!(contains_f64(a + b, va + vb));
            assert!(contains_f64(a - b, va - vb));
            assert!(contains_f64(a * b, va * vb));
            if !b.contains(0.0) {
                assert!(contains_f64(a / b, va / vb));
            }
            assert!(contains_f64(a.sqr(), va * va));
        }
    }

    #[test]
    fn test_operations_only_widen() {
        let a = Interval::from_value_and_error(1.0, 0.25);
        let b = Interval::new(3.0);
        let sum = a + b;
        assert!(sum.width() >= a.width());
        let scaled = a * 2.0;
        assert!(scaled.width() >= 2.0 * a.width());
        assert!((-a).contains(-1.0));
    }

    #[test]
    fn test_division_by_interval_containing_zero() {
        let q = Interval::new(1.0) / Interval::with_bounds(-1.0, 1.0);
        assert_eq!(q.lower_bound(), Float::NEG_INFINITY);
        assert_eq!(q.upper_bound(), Float::INFINITY);
    }

    #[test]
    fn test_point_error_round_trip() {
        let p = Point3f::new(0.25, -3.0, 10.0);
        let e = Vec3f::new(1e-3, 0.0, 2e-2);
        let pi = Point3fi::from_value_and_error(p, e);
        assert!(pi.contains(p));
        assert!(pi.error().x >= e.x);
        assert!(pi.error().z >= e.z);
        assert_eq!(pi.error().y, 0.0);
        assert!(!pi.is_exact());
    }
}
