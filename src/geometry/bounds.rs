use cgmath::{EuclideanSpace, InnerSpace};

use crate::{lerp, Float, Point2f, Point3f, Vec2f, Vec3f};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds3f {
    pub min: Point3f,
    pub max: Point3f,
}

impl Bounds3f {
    pub fn empty() -> Self {
        Self {
            min: Point3f::new(Float::INFINITY, Float::INFINITY, Float::INFINITY),
            max: Point3f::new(Float::NEG_INFINITY, Float::NEG_INFINITY, Float::NEG_INFINITY),
        }
    }

    pub fn with_bounds(p1: Point3f, p2: Point3f) -> Self {
        Self {
            min: Point3f::new(p1.x.min(p2.x), p1.y.min(p2.y), p1.z.min(p2.z)),
            max: Point3f::new(p1.x.max(p2.x), p1.y.max(p2.y), p1.z.max(p2.z)),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Point3f>) -> Self {
        points.into_iter().fold(Self::empty(), Self::join_point)
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn join_point(self, p: Point3f) -> Self {
        Self {
            min: Point3f::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z)),
            max: Point3f::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z)),
        }
    }

    pub fn join(self, other: &Self) -> Self {
        self.join_point(other.min).join_point(other.max)
    }

    pub fn diagonal(&self) -> Vec3f {
        self.max - self.min
    }

    pub fn centroid(&self) -> Point3f {
        self.min + self.diagonal() * 0.5
    }

    pub fn contains(&self, p: Point3f) -> bool {
        p.x >= self.min.x && p.x <= self.max.x
            && p.y >= self.min.y && p.y <= self.max.y
            && p.z >= self.min.z && p.z <= self.max.z
    }

    pub fn corner(&self, i: usize) -> Point3f {
        Point3f::new(
            if i & 1 == 0 { self.min.x } else { self.max.x },
            if i & 2 == 0 { self.min.y } else { self.max.y },
            if i & 4 == 0 { self.min.z } else { self.max.z },
        )
    }

    pub fn iter_corners(&self) -> impl Iterator<Item = Point3f> + '_ {
        (0..8).map(move |i| self.corner(i))
    }

    pub fn bounding_sphere(&self) -> (Point3f, Float) {
        let center = self.centroid();
        let radius = if self.contains(center) {
            (self.max - center).magnitude()
        } else {
            0.0
        };
        (center, radius)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds2f {
    pub min: Point2f,
    pub max: Point2f,
}

impl Bounds2f {
    pub fn with_bounds(p1: Point2f, p2: Point2f) -> Self {
        Self {
            min: Point2f::new(p1.x.min(p2.x), p1.y.min(p2.y)),
            max: Point2f::new(p1.x.max(p2.x), p1.y.max(p2.y)),
        }
    }

    pub fn diagonal(&self) -> Vec2f {
        self.max - self.min
    }

    pub fn area(&self) -> Float {
        let d = self.diagonal();
        d.x * d.y
    }

    /// Linearly interpolates between the corners by the fractional position `t`.
    pub fn lerp(&self, t: Point2f) -> Point2f {
        Point2f::new(lerp(t.x, self.min.x, self.max.x), lerp(t.y, self.min.y, self.max.y))
    }

    /// The position of `p` relative to the corners, (0, 0) at `min` and (1, 1) at `max`.
    pub fn offset(&self, p: Point2f) -> Vec2f {
        let mut o = p - self.min;
        if self.max.x > self.min.x { o.x /= self.max.x - self.min.x; }
        if self.max.y > self.min.y { o.y /= self.max.y - self.min.y; }
        o
    }

    pub fn centroid(&self) -> Point2f {
        Point2f::from_vec((self.min.to_vec() + self.max.to_vec()) * 0.5)
    }
}
