use crate::{
    bvh::Bvh,
    core::{Aabb, Intersection, Ray, T_MIN},
    geometry::Geometry,
    result::LsResult,
};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Points are hit if their distance to the ray is at most `min_radius + t * angular_radius`
/// where `t` is the distance along the ray. With `angular_radius` set to the angle covered by
/// a pixel this corresponds to a tolerance of a fixed number of pixels on screen.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointTolerance {
    pub min_radius: f32,
    pub angular_radius: f32,
}
impl PointTolerance {
    pub fn radius_at(&self, t: f32) -> f32 {
        self.min_radius + t.max(0.0) * self.angular_radius
    }
}
impl Default for PointTolerance {
    fn default() -> Self {
        Self {
            min_radius: 0.005,
            angular_radius: 0.003,
        }
    }
}

#[derive(Clone, Debug, Default)]
enum Target {
    Triangles {
        triangles: Vec<[Vec3; 3]>,
        bvh: Bvh,
    },
    Points {
        points: Vec<Vec3>,
        bvh: Bvh,
    },
    #[default]
    Empty,
}

/// Answers nearest hit queries against the scene geometry. It is derived from a [`Geometry`]
/// and remembers the version of the geometry it has been built from, such that the owner of the
/// geometry can decide when a rebuild is necessary.
#[derive(Clone, Debug, Default)]
pub struct RayTracer {
    geometry_version: u64,
    tolerance: PointTolerance,
    target: Target,
}

impl RayTracer {
    /// Builds the acceleration structure in world space. Blocks until done.
    pub fn build(geometry: &Geometry, geometry_version: u64, tolerance: PointTolerance) -> Self {
        let start = Instant::now();
        let target = match geometry {
            Geometry::Mesh(mesh) => {
                let triangles = mesh.triangles().collect::<Vec<_>>();
                let bbs = triangles
                    .iter()
                    .map(|tri| Aabb::from_points(tri.iter().copied()))
                    .collect::<Vec<_>>();
                let bvh = Bvh::build(&bbs);
                Target::Triangles { triangles, bvh }
            }
            Geometry::PointCloud(pc) => {
                let points = pc.world_points().collect::<Vec<_>>();
                let bbs = points
                    .iter()
                    .map(|p| Aabb { min: *p, max: *p })
                    .collect::<Vec<_>>();
                let bvh = Bvh::build(&bbs);
                Target::Points { points, bvh }
            }
        };
        info!(
            "built ray tracing structure for {} primitives of geometry version {} in {} ms",
            geometry.n_primitives(),
            geometry_version,
            start.elapsed().as_millis()
        );
        Self {
            geometry_version,
            tolerance,
            target,
        }
    }

    pub fn geometry_version(&self) -> u64 {
        self.geometry_version
    }
    pub fn tolerance(&self) -> PointTolerance {
        self.tolerance
    }
    pub fn set_tolerance(&mut self, tolerance: PointTolerance) {
        self.tolerance = tolerance;
    }

    /// Nearest hit along the ray. A missing hit is `Ok(None)`, a degenerate direction is an
    /// error.
    pub fn query(&self, origin: Vec3, direction: Vec3) -> LsResult<Option<Intersection>> {
        let ray = Ray::new(origin, direction)?;
        Ok(self.query_ray(&ray))
    }

    pub fn query_ray(&self, ray: &Ray) -> Option<Intersection> {
        match &self.target {
            Target::Triangles { triangles, bvh } => bvh
                .nearest(ray, |idx| intersect_triangle(ray, &triangles[idx]), |_| 0.0)
                .map(|(idx, t)| {
                    let [a, b, c] = triangles[idx];
                    let n = (b - a).cross(c - a).normalize_or_zero();
                    let n = if n.dot(ray.direction()) > 0.0 { -n } else { n };
                    Intersection {
                        point: ray.at(t),
                        distance: t,
                        primitive: idx,
                        normal: Some(n),
                    }
                }),
            Target::Points { points, bvh } => {
                let tol = self.tolerance;
                bvh.nearest(
                    ray,
                    |idx| {
                        let p = points[idx];
                        let t = ray.project(p);
                        let r = tol.radius_at(t);
                        (t > T_MIN && ray.squared_dist_to_point(p) <= r * r).then_some(t)
                    },
                    |bb| tol.radius_at(bb.max_dist(ray.origin)),
                )
                .map(|(idx, t)| Intersection {
                    point: points[idx],
                    distance: t,
                    primitive: idx,
                    normal: None,
                })
            }
            Target::Empty => None,
        }
    }
}

/// Möller–Trumbore, double sided
fn intersect_triangle(ray: &Ray, tri: &[Vec3; 3]) -> Option<f32> {
    let [a, b, c] = *tri;
    let e1 = b - a;
    let e2 = c - a;
    let p = ray.direction().cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = ray.direction().dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    (t > T_MIN).then_some(t)
}

#[cfg(test)]
use {
    crate::{
        geometry::{make_test_quad, PointCloud, TriangleMesh},
        result::ErrorKind,
    },
    glam::Mat4,
};

#[test]
fn test_mesh_query() -> LsResult<()> {
    let mut mesh = make_test_quad(0.0);
    mesh.set_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, -1.0)));
    let tracer = RayTracer::build(&Geometry::Mesh(mesh), 3, PointTolerance::default());
    assert_eq!(tracer.geometry_version(), 3);
    let hit = tracer.query(Vec3::new(0.5, 0.5, 1.0), Vec3::NEG_Z)?.unwrap();
    assert!((hit.distance - 2.0).abs() < 1e-6);
    assert!((hit.point - Vec3::new(0.5, 0.5, -1.0)).length() < 1e-6);
    assert_eq!(hit.normal, Some(Vec3::Z));
    // from below the normal flips towards the ray origin
    let hit = tracer.query(Vec3::new(0.5, 0.5, -3.0), Vec3::Z)?.unwrap();
    assert_eq!(hit.normal, Some(Vec3::NEG_Z));
    assert_eq!(tracer.query(Vec3::new(1.5, 0.5, 1.0), Vec3::NEG_Z)?, None);
    assert_eq!(tracer.query(Vec3::new(0.5, 0.5, 1.0), Vec3::Z)?, None);
    let err = tracer.query(Vec3::ZERO, Vec3::ZERO).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DegenerateInput);
    Ok(())
}

#[test]
fn test_nearest_of_two_layers() -> LsResult<()> {
    let sphere_near = TriangleMesh::sphere(Vec3::new(0.0, 0.0, -2.0), 0.5, 1);
    let tracer = RayTracer::build(&Geometry::Mesh(sphere_near), 0, PointTolerance::default());
    let hit = tracer.query(Vec3::ZERO, Vec3::NEG_Z)?.unwrap();
    // the front of the sphere, not its back
    assert!(hit.distance < 1.6 && hit.distance > 1.4);
    Ok(())
}

#[test]
fn test_point_query() -> LsResult<()> {
    let pc = PointCloud::new(
        vec![
            Vec3::new(0.0, 0.0, -2.0),
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(0.3, 0.0, -0.5),
        ],
        Mat4::IDENTITY,
    );
    let tracer = RayTracer::build(&Geometry::PointCloud(pc), 1, PointTolerance::default());
    let hit = tracer.query(Vec3::new(0.0, 0.0, 0.2), Vec3::NEG_Z)?.unwrap();
    assert_eq!(hit.primitive, 1);
    assert_eq!(hit.point, Vec3::ZERO);
    assert!((hit.distance - 0.2).abs() < 1e-6);
    assert_eq!(hit.normal, None);
    // slightly off the ray still counts
    let hit = tracer.query(Vec3::new(0.004, 0.0, 0.2), Vec3::NEG_Z)?.unwrap();
    assert_eq!(hit.primitive, 1);
    // too far off
    assert_eq!(tracer.query(Vec3::new(0.1, 0.0, 0.2), Vec3::NEG_Z)?, None);
    Ok(())
}

#[test]
fn test_empty() -> LsResult<()> {
    let tracer = RayTracer::default();
    assert_eq!(tracer.query(Vec3::ZERO, Vec3::X)?, None);
    let pc = PointCloud::new(vec![], Mat4::IDENTITY);
    let tracer = RayTracer::build(&Geometry::PointCloud(pc), 0, PointTolerance::default());
    assert_eq!(tracer.query(Vec3::ZERO, Vec3::X)?, None);
    Ok(())
}
