//! Built-in scenes. A `SceneDescription` owns all mesh, material and emission data; the render
//! structures borrow from it.

use anyhow::{bail, Context};
use cgmath::InnerSpace;
use rayon::prelude::*;
use tracing::info;

use crate::camera::PerspectiveCamera;
use crate::light::DiffuseAreaLight;
use crate::material::{CoatedDiffuseMaterial, Coating, ConductorMaterial, DiffuseMaterial, Material, Roughness};
use crate::primitive::PrimitiveList;
use crate::renderer::{build_primitives, build_triangles};
use crate::scene::Scene;
use crate::shapes::TriangleMesh;
use crate::spectrum::{PiecewiseLinearSpectrum, Spectrum};
use crate::{Float, Point2f, Point3f, Transform, Vec3f};

#[derive(Clone, Debug)]
pub struct Emission {
    pub spectrum: Spectrum,
    pub scale: Float,
    pub two_sided: bool,
}

pub struct SceneObject {
    pub mesh: TriangleMesh,
    /// Index into `SceneDescription::materials`
    pub material: Option<usize>,
    pub emission: Option<Emission>,
}

#[derive(Clone, Copy, Debug)]
pub struct CameraSetup {
    pub from: Point3f,
    pub to: Point3f,
    pub up: Vec3f,
    pub fov: Float,
}

pub struct SceneDescription {
    pub objects: Vec<SceneObject>,
    pub materials: Vec<Material>,
    pub camera: CameraSetup,
}

/// The area lights of a description, one per emitting triangle, with the offset of each
/// object's first light.
pub struct SceneLights<'a> {
    lights: Vec<DiffuseAreaLight<'a>>,
    offsets: Vec<Option<usize>>,
}

impl SceneLights<'_> {
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}

impl SceneDescription {
    pub fn by_name(name: &str) -> anyhow::Result<Self> {
        match name {
            "cornell" | "cornell-box" => cornell_box(),
            "furnace" => furnace(0.5, 1.0),
            _ => bail!("unknown scene '{}', expected one of: cornell, furnace", name),
        }
    }

    pub fn camera(&self, resolution: (u32, u32)) -> anyhow::Result<PerspectiveCamera> {
        let c = self.camera;
        let render_from_camera = Transform::camera_look_at(c.from, c.to, c.up).context("invalid scene camera")?;
        PerspectiveCamera::new(render_from_camera, resolution, c.fov)
    }

    pub fn build_lights(&self) -> SceneLights<'_> {
        let mut lights = Vec::new();
        let mut offsets = Vec::with_capacity(self.objects.len());
        for obj in &self.objects {
            match &obj.emission {
                Some(e) => {
                    offsets.push(Some(lights.len()));
                    let tris = build_triangles(&obj.mesh);
                    lights.par_extend(
                        tris.into_par_iter().map(|tri| DiffuseAreaLight::new(tri, &e.spectrum, e.scale, e.two_sided)),
                    );
                }
                None => offsets.push(None),
            }
        }
        SceneLights { lights, offsets }
    }

    pub fn build_scene<'a>(&'a self, lights: &'a SceneLights<'a>) -> Scene<'a> {
        let mut prims = Vec::new();
        for (obj, offset) in self.objects.iter().zip(&lights.offsets) {
            let tris = build_triangles(&obj.mesh);
            let material = obj.material.and_then(|i| self.materials.get(i));
            let area_lights = offset.map(|o| &lights.lights[o..o + tris.len()]);
            prims.extend(build_primitives(&tris, material, area_lights));
        }
        let scene = Scene::new(PrimitiveList::new(prims), &lights.lights);
        info!(primitives = scene.num_primitives(), lights = lights.len(), "built scene");
        scene
    }
}

/// A mesh of planar quads, each wound so that its geometric normal points along `facing`.
fn quads_mesh(render_from_object: &Transform, quads: &[([Point3f; 4], Vec3f)]) -> anyhow::Result<TriangleMesh> {
    let mut p = Vec::with_capacity(4 * quads.len());
    let mut uv = Vec::with_capacity(4 * quads.len());
    let mut indices = Vec::with_capacity(6 * quads.len());
    for (corners, facing) in quads {
        let base = p.len() as u32;
        let winding = (corners[0] - corners[2]).cross(corners[1] - corners[2]);
        if winding.dot(*facing) >= 0.0 {
            indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        } else {
            indices.extend([base, base + 2, base + 1, base, base + 3, base + 2]);
        }
        p.extend_from_slice(corners);
        uv.extend([Point2f::new(0.0, 0.0), Point2f::new(1.0, 0.0), Point2f::new(1.0, 1.0), Point2f::new(0.0, 1.0)]);
    }
    TriangleMesh::new(render_from_object, false, indices, p, None, Some(uv))
}

/// The faces of the cube `[-1, 1]^3`, facing outward or inward.
fn cube_faces(outward: bool) -> Vec<([Point3f; 4], Vec3f)> {
    let s = if outward { 1.0 } else { -1.0 };
    vec![
        ([point3f!(-1, -1, -1), point3f!(1, -1, -1), point3f!(1, -1, 1), point3f!(-1, -1, 1)], vec3f!(0, -s, 0)),
        ([point3f!(-1, 1, -1), point3f!(1, 1, -1), point3f!(1, 1, 1), point3f!(-1, 1, 1)], vec3f!(0, s, 0)),
        ([point3f!(-1, -1, -1), point3f!(-1, 1, -1), point3f!(-1, 1, 1), point3f!(-1, -1, 1)], vec3f!(-s, 0, 0)),
        ([point3f!(1, -1, -1), point3f!(1, 1, -1), point3f!(1, 1, 1), point3f!(1, -1, 1)], vec3f!(s, 0, 0)),
        ([point3f!(-1, -1, -1), point3f!(1, -1, -1), point3f!(1, 1, -1), point3f!(-1, 1, -1)], vec3f!(0, 0, -s)),
        ([point3f!(-1, -1, 1), point3f!(1, -1, 1), point3f!(1, 1, 1), point3f!(-1, 1, 1)], vec3f!(0, 0, s)),
    ]
}

fn step_spectrum(lambdas: &[Float], values: &[Float]) -> anyhow::Result<Spectrum> {
    Ok(Spectrum::PiecewiseLinear(PiecewiseLinearSpectrum::new(lambdas.to_vec(), values.to_vec())?))
}

/// The Cornell box: a white room open towards the camera with a red left wall, a green right
/// wall and a ceiling light, holding a varnished block and a rough gold block.
pub fn cornell_box() -> anyhow::Result<SceneDescription> {
    let white = Spectrum::constant(0.73);
    let red = step_spectrum(&[360.0, 560.0, 600.0, 830.0], &[0.05, 0.05, 0.65, 0.65])?;
    let green = step_spectrum(&[360.0, 480.0, 520.0, 580.0, 620.0, 830.0], &[0.05, 0.05, 0.5, 0.5, 0.05, 0.05])?;

    let materials: Vec<Material> = vec![
        DiffuseMaterial::new(white.clone()).into(),
        DiffuseMaterial::new(red).into(),
        DiffuseMaterial::new(green).into(),
        CoatedDiffuseMaterial::new(white, Coating { roughness: Roughness::isotropic(0.05), ..Coating::default() }).into(),
        ConductorMaterial::named("Au", Roughness::isotropic(0.2))?.into(),
    ];
    let (white_mat, red_mat, green_mat, varnish_mat, gold_mat) = (0, 1, 2, 3, 4);

    let id = Transform::IDENTITY;
    let room = quads_mesh(
        &id,
        &[
            // floor, ceiling, back
            ([point3f!(-1, -1, -1), point3f!(1, -1, -1), point3f!(1, -1, 1), point3f!(-1, -1, 1)], vec3f!(0, 1, 0)),
            ([point3f!(-1, 1, -1), point3f!(1, 1, -1), point3f!(1, 1, 1), point3f!(-1, 1, 1)], vec3f!(0, -1, 0)),
            ([point3f!(-1, -1, 1), point3f!(1, -1, 1), point3f!(1, 1, 1), point3f!(-1, 1, 1)], vec3f!(0, 0, -1)),
        ],
    )?;
    let left = quads_mesh(
        &id,
        &[([point3f!(-1, -1, -1), point3f!(-1, 1, -1), point3f!(-1, 1, 1), point3f!(-1, -1, 1)], vec3f!(1, 0, 0))],
    )?;
    let right = quads_mesh(
        &id,
        &[([point3f!(1, -1, -1), point3f!(1, 1, -1), point3f!(1, 1, 1), point3f!(1, -1, 1)], vec3f!(-1, 0, 0))],
    )?;
    let light = quads_mesh(
        &id,
        &[([point3f!(-0.25, 0.998, -0.25), point3f!(0.25, 0.998, -0.25), point3f!(0.25, 0.998, 0.25), point3f!(-0.25, 0.998, 0.25)], vec3f!(0, -1, 0))],
    )?;

    let short_block = quads_mesh(
        &(Transform::translate(vec3f!(0.35, -0.7, -0.3))
            * Transform::rotate(-18.0, vec3f!(0, 1, 0))
            * Transform::scale(0.3, 0.3, 0.3)),
        &cube_faces(true),
    )?;
    let tall_block = quads_mesh(
        &(Transform::translate(vec3f!(-0.35, -0.4, 0.3))
            * Transform::rotate(18.0, vec3f!(0, 1, 0))
            * Transform::scale(0.3, 0.6, 0.3)),
        &cube_faces(true),
    )?;

    let object = |mesh, material| SceneObject { mesh, material: Some(material), emission: None };
    let objects = vec![
        object(room, white_mat),
        object(left, red_mat),
        object(right, green_mat),
        object(short_block, varnish_mat),
        object(tall_block, gold_mat),
        SceneObject {
            mesh: light,
            material: Some(white_mat),
            emission: Some(Emission { spectrum: Spectrum::blackbody(5500.0), scale: 12.0, two_sided: false }),
        },
    ];

    Ok(SceneDescription {
        objects,
        materials,
        camera: CameraSetup { from: point3f!(0, 0, -3.4), to: point3f!(0, 0, 0), up: vec3f!(0, 1, 0), fov: 38.0 },
    })
}

/// A closed diffuse room whose walls all emit `le`. Seen from inside, radiance converges to
/// `le / (1 - albedo)` as the path depth grows.
pub fn furnace(albedo: Float, le: Float) -> anyhow::Result<SceneDescription> {
    anyhow::ensure!((0.0..1.0).contains(&albedo), "furnace albedo {} must be in [0, 1)", albedo);
    let walls = quads_mesh(&Transform::IDENTITY, &cube_faces(false))?;
    Ok(SceneDescription {
        objects: vec![SceneObject {
            mesh: walls,
            material: Some(0),
            emission: Some(Emission { spectrum: Spectrum::constant(le), scale: 1.0, two_sided: false }),
        }],
        materials: vec![DiffuseMaterial::new(Spectrum::constant(albedo)).into()],
        camera: CameraSetup { from: point3f!(0, 0, 0), to: point3f!(0, 0, 1), up: vec3f!(0, 1, 0), fov: 45.0 },
    })
}
