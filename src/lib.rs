#[macro_use] pub mod macros; // must stay at the top
pub mod math;
pub mod interval;
pub mod hash;
pub mod geometry;
pub mod sampling;
pub mod spectrum;
pub mod shapes;
pub mod interaction;
pub mod reflection;
pub mod material;
pub mod light;
pub mod primitive;
pub mod scene;
pub mod sampler;
pub mod filter;
pub mod camera;
pub mod film;
pub mod integrator;
pub mod renderer;
pub mod settings;
pub mod scenes;
pub mod imageio;

pub use geometry::*;
pub use math::*;
pub use interval::{Interval, Point3fi};

use cgmath::{Point2, Point3, Vector2, Vector3};

pub type Float = f32;

pub type Point2f = Point2<Float>;
pub type Point2i = Point2<i32>;
pub type Point3f = Point3<Float>;
pub type Vec2f = Vector2<Float>;
pub type Vec2i = Vector2<i32>;
pub type Vec3f = Vector3<Float>;
