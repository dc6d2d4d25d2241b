use anyhow::ensure;
use cgmath::{EuclideanSpace, InnerSpace, Zero};

use crate::geometry::{Frame, Normal3, Transform, Transformable};
use crate::sampler::CameraSample;
use crate::spectrum::SampledSpectrum;
use crate::{lerp, Bounds2f, Differential, Float, Point2i, Point3f, Ray, RayDifferential, Vec2f, Vec3f};

pub struct CameraRay {
    pub ray: Ray,
    pub weight: SampledSpectrum,
}

pub struct CameraRayDifferential {
    pub ray: RayDifferential,
    pub weight: SampledSpectrum,
}

pub trait Camera: Sync {
    fn generate_ray(&self, sample: CameraSample) -> Option<CameraRay>;

    /// Generates a ray along with the rays through the neighbouring pixels in x and y.
    fn generate_ray_differential(&self, sample: CameraSample) -> Option<CameraRayDifferential> {
        let CameraRay { ray, weight } = self.generate_ray(sample)?;

        let cs_shift_x = CameraSample { p_film: sample.p_film + Vec2f::new(1.0, 0.0), ..sample };
        let cs_shift_y = CameraSample { p_film: sample.p_film + Vec2f::new(0.0, 1.0), ..sample };
        let diff = match (self.generate_ray(cs_shift_x), self.generate_ray(cs_shift_y)) {
            (Some(rx), Some(ry)) => Some(Differential {
                rx_origin: rx.ray.origin,
                ry_origin: ry.ray.origin,
                rx_dir: rx.ray.dir,
                ry_dir: ry.ray.dir,
            }),
            _ => None,
        };

        Some(CameraRayDifferential { ray: RayDifferential { ray, diff }, weight })
    }

    fn resolution(&self) -> Point2i;

    /// Approximates the change of a surface point `p` with normal `n` between adjacent pixels,
    /// for rays that carry no differentials.
    fn approximate_dp_dxy(&self, p: Point3f, n: Normal3, samples_per_pixel: u32) -> (Vec3f, Vec3f);
}

struct CameraProjection {
    raster_to_camera: Transform,
}

impl CameraProjection {
    fn new(camera_to_screen: Transform, full_resolution: Point2i, screen_window: Bounds2f) -> Self {
        // raster y grows downward while screen y grows upward
        let screen_to_raster = Transform::scale(full_resolution.x as Float, full_resolution.y as Float, 1.0)
            * Transform::scale(
                1.0 / (screen_window.max.x - screen_window.min.x),
                1.0 / (screen_window.min.y - screen_window.max.y),
                1.0,
            )
            * Transform::translate(vec3f!(-screen_window.min.x, -screen_window.max.y, 0.0));

        let raster_to_camera = camera_to_screen.inverse() * screen_to_raster.inverse();
        Self { raster_to_camera }
    }
}

/// Smallest change in camera space origin and direction between neighbouring pixels, over the
/// whole film.
#[derive(Clone, Copy, Debug)]
struct MinDifferentials {
    pos_x: Vec3f,
    pos_y: Vec3f,
    dir_x: Vec3f,
    dir_y: Vec3f,
}

/// A pinhole camera. `fov` is the full field of view in degrees along the shorter image axis.
pub struct PerspectiveCamera {
    render_from_camera: Transform,
    camera_from_render: Transform,
    resolution: Point2i,
    proj: CameraProjection,
    dx_camera: Vec3f,
    dy_camera: Vec3f,
    shutter_open: Float,
    shutter_close: Float,
    lens_radius: Float,
    focal_distance: Float,
    min_diff: MinDifferentials,
}

impl PerspectiveCamera {
    pub fn new(render_from_camera: Transform, resolution: (u32, u32), fov: Float) -> anyhow::Result<Self> {
        ensure!(resolution.0 > 0 && resolution.1 > 0, "camera resolution {:?} has a zero dimension", resolution);
        ensure!(fov > 0.0 && fov < 180.0, "field of view {} must be in (0, 180) degrees", fov);

        let full_resolution = Point2i::new(resolution.0 as i32, resolution.1 as i32);
        let aspect = full_resolution.x as Float / full_resolution.y as Float;
        let screen_window = if aspect > 1.0 {
            Bounds2f::with_bounds(point2f!(-aspect, -1), point2f!(aspect, 1))
        } else {
            Bounds2f::with_bounds(point2f!(-1, -1.0 / aspect), point2f!(1, 1.0 / aspect))
        };

        let proj = CameraProjection::new(Transform::perspective(fov, 1e-2, 1000.0), full_resolution, screen_window);
        let raster_origin: Point3f = point3f!(0, 0, 0).transform(proj.raster_to_camera);
        let dx_camera = point3f!(1, 0, 0).transform(proj.raster_to_camera) - raster_origin;
        let dy_camera = point3f!(0, 1, 0).transform(proj.raster_to_camera) - raster_origin;

        let mut camera = Self {
            render_from_camera,
            camera_from_render: render_from_camera.inverse(),
            resolution: full_resolution,
            proj,
            dx_camera,
            dy_camera,
            shutter_open: 0.0,
            shutter_close: 1.0,
            lens_radius: 0.0,
            focal_distance: 1e6,
            min_diff: MinDifferentials { pos_x: Vec3f::zero(), pos_y: Vec3f::zero(), dir_x: Vec3f::zero(), dir_y: Vec3f::zero() },
        };
        camera.min_diff = camera.find_minimum_differentials();
        Ok(camera)
    }

    pub fn with_lens(mut self, lens_radius: Float, focal_distance: Float) -> Self {
        self.lens_radius = lens_radius;
        self.focal_distance = focal_distance;
        self
    }

    pub fn with_shutter(mut self, open: Float, close: Float) -> Self {
        self.shutter_open = open;
        self.shutter_close = close;
        self
    }

    fn camera_space_ray(&self, sample: &CameraSample) -> (Point3f, Ray) {
        let p_film = point3f!(sample.p_film.x, sample.p_film.y, 0);
        let p_camera: Point3f = p_film.transform(self.proj.raster_to_camera);
        if self.lens_radius > 0.0 {
            unimplemented!("thin lens depth of field (lens radius {}, focal distance {})", self.lens_radius, self.focal_distance);
        }

        let time = lerp(sample.time, self.shutter_open, self.shutter_close);
        let ray = Ray { origin: Point3f::origin(), dir: p_camera.to_vec().normalize(), time };
        (p_camera, ray)
    }

    /// Sweeps the film diagonal and keeps the shortest position and direction differentials.
    fn find_minimum_differentials(&self) -> MinDifferentials {
        let keep_shorter = |best: &mut Option<Vec3f>, v: Vec3f| {
            if best.map_or(true, |b| v.magnitude2() < b.magnitude2()) {
                *best = Some(v);
            }
        };
        let (mut pos_x, mut pos_y, mut dir_x, mut dir_y) = (None, None, None, None);

        let n = 512;
        for i in 0..n {
            let t = i as Float / (n - 1) as Float;
            let sample = CameraSample {
                p_film: point2f!(t * self.resolution.x as Float, t * self.resolution.y as Float),
                p_lens: point2f!(0.5, 0.5),
                time: 0.5,
                filter_weight: 1.0,
            };
            let crd = match self.generate_ray_differential(sample) {
                Some(crd) => crd,
                None => continue,
            };
            let (ray, diff) = match (crd.ray.ray, crd.ray.diff) {
                (ray, Some(diff)) => (ray, diff),
                _ => continue,
            };

            keep_shorter(&mut pos_x, (diff.rx_origin - ray.origin).transform(self.camera_from_render));
            keep_shorter(&mut pos_y, (diff.ry_origin - ray.origin).transform(self.camera_from_render));

            let frame = Frame::from_z(ray.dir.normalize());
            let df = frame.to_local(ray.dir.normalize());
            let dxf = frame.to_local(diff.rx_dir.normalize()).normalize();
            let dyf = frame.to_local(diff.ry_dir.normalize()).normalize();
            keep_shorter(&mut dir_x, dxf - df);
            keep_shorter(&mut dir_y, dyf - df);
        }

        MinDifferentials {
            pos_x: pos_x.unwrap_or_else(Vec3f::zero),
            pos_y: pos_y.unwrap_or_else(Vec3f::zero),
            dir_x: dir_x.unwrap_or_else(Vec3f::zero),
            dir_y: dir_y.unwrap_or_else(Vec3f::zero),
        }
    }
}

impl Camera for PerspectiveCamera {
    fn generate_ray(&self, sample: CameraSample) -> Option<CameraRay> {
        let (_, ray) = self.camera_space_ray(&sample);
        Some(CameraRay { ray: ray.transform(self.render_from_camera), weight: SampledSpectrum::uniform(1.0) })
    }

    fn generate_ray_differential(&self, sample: CameraSample) -> Option<CameraRayDifferential> {
        let (p_camera, ray) = self.camera_space_ray(&sample);
        let diff = Differential {
            rx_origin: ray.origin,
            ry_origin: ray.origin,
            rx_dir: (p_camera + self.dx_camera).to_vec().normalize(),
            ry_dir: (p_camera + self.dy_camera).to_vec().normalize(),
        };
        let ray = RayDifferential { ray, diff: Some(diff) };
        Some(CameraRayDifferential { ray: ray.transform(self.render_from_camera), weight: SampledSpectrum::uniform(1.0) })
    }

    fn resolution(&self) -> Point2i {
        self.resolution
    }

    fn approximate_dp_dxy(&self, p: Point3f, n: Normal3, samples_per_pixel: u32) -> (Vec3f, Vec3f) {
        // rotate so the point lies on +z, where the minimum differentials were measured
        let p_camera: Point3f = p.transform(self.camera_from_render);
        let down_z = Transform::rotate_from_to(p_camera.to_vec().normalize(), vec3f!(0, 0, 1));
        let p_down_z: Point3f = p_camera.transform(down_z);
        let n_down_z = n.transform(self.camera_from_render).transform(down_z).0;
        let d = n_down_z.z * p_down_z.z;

        let hit_plane = |o: Vec3f, dir: Vec3f| {
            let t = -(n_down_z.dot(o) - d) / n_down_z.dot(dir);
            Point3f::from_vec(o + dir * t)
        };
        let px = hit_plane(self.min_diff.pos_x, vec3f!(0, 0, 1) + self.min_diff.dir_x);
        let py = hit_plane(self.min_diff.pos_y, vec3f!(0, 0, 1) + self.min_diff.dir_y);

        let spp_scale = Float::max(0.125, 1.0 / (samples_per_pixel.max(1) as Float).sqrt());
        let up_z = down_z.inverse();
        let dpdx = (px - p_down_z).transform(up_z).transform(self.render_from_camera) * spp_scale;
        let dpdy = (py - p_down_z).transform(up_z).transform(self.render_from_camera) * spp_scale;
        (dpdx, dpdy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_at(x: Float, y: Float) -> CameraSample {
        CameraSample { p_film: point2f!(x, y), p_lens: point2f!(0.5, 0.5), time: 0.0, filter_weight: 1.0 }
    }

    #[test]
    fn test_rays_cover_field_of_view() {
        let camera = PerspectiveCamera::new(Transform::IDENTITY, (16, 16), 90.0).unwrap();
        let center = camera.generate_ray(sample_at(8.0, 8.0)).unwrap().ray;
        assert_abs_diff_eq!(center.dir, vec3f!(0, 0, 1), epsilon = 1e-5);

        // raster y grows downward
        let corner = camera.generate_ray(sample_at(0.0, 0.0)).unwrap().ray;
        assert_abs_diff_eq!(corner.dir, vec3f!(-1, 1, 1).normalize(), epsilon = 1e-4);
    }

    #[test]
    fn test_wide_film_keeps_fov_on_short_axis() {
        let camera = PerspectiveCamera::new(Transform::IDENTITY, (32, 16), 90.0).unwrap();
        let top = camera.generate_ray(sample_at(16.0, 0.0)).unwrap().ray;
        assert_abs_diff_eq!(top.dir, vec3f!(0, 1, 1).normalize(), epsilon = 1e-4);
        assert_eq!(camera.resolution(), Point2i::new(32, 16));
    }

    #[test]
    fn test_ray_is_in_render_space() {
        let render_from_camera = Transform::translate(vec3f!(0, 0, -5));
        let camera = PerspectiveCamera::new(render_from_camera, (8, 8), 45.0).unwrap();
        let ray = camera.generate_ray(sample_at(4.0, 4.0)).unwrap().ray;
        assert_abs_diff_eq!(ray.origin, point3f!(0, 0, -5), epsilon = 1e-4);
    }

    #[test]
    fn test_differentials_are_one_pixel_apart() {
        let camera = PerspectiveCamera::new(Transform::IDENTITY, (16, 16), 90.0).unwrap();
        let crd = camera.generate_ray_differential(sample_at(8.0, 8.0)).unwrap();
        let shifted = camera.generate_ray(sample_at(9.0, 8.0)).unwrap().ray;
        let diff = crd.ray.diff.unwrap();
        assert_abs_diff_eq!(diff.rx_dir, shifted.dir, epsilon = 1e-5);
        assert_abs_diff_eq!(diff.rx_origin, crd.ray.ray.origin, epsilon = 1e-6);
    }

    #[test]
    fn test_approximate_dp_dxy_matches_pixel_footprint() {
        let camera = PerspectiveCamera::new(Transform::IDENTITY, (16, 16), 90.0).unwrap();
        let p = point3f!(0, 0, 5);
        let n = Normal3::new(0.0, 0.0, -1.0);
        // a pixel at the image center spans 2 * 5 / 16 at distance 5, off-axis pixels a bit less
        let (dpdx, dpdy) = camera.approximate_dp_dxy(p, n, 1);
        assert!(dpdx.magnitude() > 0.2 && dpdx.magnitude() < 0.65, "{:?}", dpdx);
        assert!(dpdy.magnitude() > 0.2 && dpdy.magnitude() < 0.65, "{:?}", dpdy);
        assert_abs_diff_eq!(dpdx.z, 0.0, epsilon = 1e-4);

        let (dpdx4, _) = camera.approximate_dp_dxy(p, n, 4);
        assert_abs_diff_eq!(dpdx4.magnitude(), 0.5 * dpdx.magnitude(), epsilon = 1e-4);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(PerspectiveCamera::new(Transform::IDENTITY, (0, 16), 60.0).is_err());
        assert!(PerspectiveCamera::new(Transform::IDENTITY, (16, 16), 180.0).is_err());
    }

    #[test]
    #[should_panic]
    fn test_lens_is_unimplemented() {
        let camera = PerspectiveCamera::new(Transform::IDENTITY, (4, 4), 60.0).unwrap().with_lens(0.1, 5.0);
        camera.generate_ray(sample_at(2.0, 2.0));
    }
}
