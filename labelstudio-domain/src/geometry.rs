use crate::{lserr, result::LsResult};
use glam::{Mat3, Mat4, Vec3};
use std::collections::HashMap;

/// Triangle mesh in object space together with the rigid transform that places it in the world.
#[derive(Clone, Debug, PartialEq)]
pub struct TriangleMesh {
    vertices: Vec<Vec3>,
    faces: Vec<[u32; 3]>,
    transform: Mat4,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Vec3>, faces: Vec<[u32; 3]>, transform: Mat4) -> LsResult<Self> {
        let n_vertices = vertices.len();
        if let Some(face) = faces
            .iter()
            .find(|f| f.iter().any(|vidx| *vidx as usize >= n_vertices))
        {
            return Err(lserr!(
                "face {:?} references a vertex outside of the {} vertices",
                face,
                n_vertices
            ));
        }
        Ok(Self {
            vertices,
            faces,
            transform,
        })
    }

    /// Icosphere obtained by subdividing an icosahedron `n_subdivisions` times.
    pub fn sphere(center: Vec3, radius: f32, n_subdivisions: u8) -> Self {
        let t = (1.0 + 5f32.sqrt()) / 2.0;
        let mut vertices = [
            (-1.0, t, 0.0),
            (1.0, t, 0.0),
            (-1.0, -t, 0.0),
            (1.0, -t, 0.0),
            (0.0, -1.0, t),
            (0.0, 1.0, t),
            (0.0, -1.0, -t),
            (0.0, 1.0, -t),
            (t, 0.0, -1.0),
            (t, 0.0, 1.0),
            (-t, 0.0, -1.0),
            (-t, 0.0, 1.0),
        ]
        .iter()
        .map(|(x, y, z)| Vec3::new(*x, *y, *z).normalize())
        .collect::<Vec<_>>();
        let mut faces: Vec<[u32; 3]> = vec![
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];
        for _ in 0..n_subdivisions {
            let mut midpoints = HashMap::<(u32, u32), u32>::new();
            let mut midpoint = |a: u32, b: u32, vertices: &mut Vec<Vec3>| {
                let key = (a.min(b), a.max(b));
                *midpoints.entry(key).or_insert_with(|| {
                    let m = ((vertices[a as usize] + vertices[b as usize]) * 0.5).normalize();
                    vertices.push(m);
                    (vertices.len() - 1) as u32
                })
            };
            faces = faces
                .iter()
                .flat_map(|[a, b, c]| {
                    let ab = midpoint(*a, *b, &mut vertices);
                    let bc = midpoint(*b, *c, &mut vertices);
                    let ca = midpoint(*c, *a, &mut vertices);
                    [[*a, ab, ca], [*b, bc, ab], [*c, ca, bc], [ab, bc, ca]]
                })
                .collect();
        }
        let vertices = vertices.into_iter().map(|v| v * radius).collect();
        Self {
            vertices,
            faces,
            transform: Mat4::from_translation(center),
        }
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }
    /// Replaces the rotational part of the transform and keeps the translation.
    pub fn set_rotation(&mut self, rotation: Mat3) {
        let translation = self.transform.w_axis.truncate();
        self.transform = Mat4::from_mat3(rotation);
        self.transform.w_axis = translation.extend(1.0);
    }
    pub fn world_vertices(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices
            .iter()
            .map(|v| self.transform.transform_point3(*v))
    }
    /// World space corners of the triangle with index `face_idx`
    pub fn triangle(&self, face_idx: usize) -> [Vec3; 3] {
        let [a, b, c] = self.faces[face_idx];
        let tf = |vidx: u32| self.transform.transform_point3(self.vertices[vidx as usize]);
        [tf(a), tf(b), tf(c)]
    }
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        (0..self.faces.len()).map(|face_idx| self.triangle(face_idx))
    }
    /// Mean of all vertices in world space
    pub fn mean(&self) -> Vec3 {
        mean(self.world_vertices(), self.vertices.len())
    }
    /// Shifts the vertices such that their object space mean is at the origin.
    pub fn subtract_mean(&mut self) {
        let m = mean(self.vertices.iter().copied(), self.vertices.len());
        for v in &mut self.vertices {
            *v -= m;
        }
    }
    /// Area weighted vertex normals in object space
    pub fn vertex_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];
        for [a, b, c] in &self.faces {
            let (va, vb, vc) = (
                self.vertices[*a as usize],
                self.vertices[*b as usize],
                self.vertices[*c as usize],
            );
            let n = (vb - va).cross(vc - va);
            for vidx in [a, b, c] {
                normals[*vidx as usize] += n;
            }
        }
        normals
            .into_iter()
            .map(|n| n.normalize_or_zero())
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud {
    points: Vec<Vec3>,
    transform: Mat4,
}
impl PointCloud {
    pub fn new(points: Vec<Vec3>, transform: Mat4) -> Self {
        Self { points, transform }
    }
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }
    pub fn world_points(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.points
            .iter()
            .map(|p| self.transform.transform_point3(*p))
    }
    pub fn mean(&self) -> Vec3 {
        mean(self.world_points(), self.points.len())
    }
}

/// The scene content that annotations are attached to.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Mesh(TriangleMesh),
    PointCloud(PointCloud),
}
impl Geometry {
    pub fn mean(&self) -> Vec3 {
        match self {
            Self::Mesh(m) => m.mean(),
            Self::PointCloud(pc) => pc.mean(),
        }
    }
    /// number of triangles or points
    pub fn n_primitives(&self) -> usize {
        match self {
            Self::Mesh(m) => m.faces().len(),
            Self::PointCloud(pc) => pc.points().len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.n_primitives() == 0
    }
}

fn mean(it: impl Iterator<Item = Vec3>, n: usize) -> Vec3 {
    if n == 0 {
        Vec3::ZERO
    } else {
        it.fold(Vec3::ZERO, |acc, v| acc + v) / n as f32
    }
}

#[cfg(test)]
pub(crate) fn make_test_quad(z: f32) -> TriangleMesh {
    TriangleMesh::new(
        vec![
            Vec3::new(-1.0, -1.0, z),
            Vec3::new(1.0, -1.0, z),
            Vec3::new(1.0, 1.0, z),
            Vec3::new(-1.0, 1.0, z),
        ],
        vec![[0, 1, 2], [0, 2, 3]],
        Mat4::IDENTITY,
    )
    .unwrap()
}

#[test]
fn test_mesh() {
    let mut mesh = make_test_quad(1.0);
    assert_eq!(mesh.mean(), Vec3::new(0.0, 0.0, 1.0));
    for n in mesh.vertex_normals() {
        assert!((n - Vec3::Z).length() < 1e-6);
    }
    mesh.set_transform(Mat4::from_translation(Vec3::X));
    assert_eq!(mesh.triangle(0)[0], Vec3::new(0.0, -1.0, 1.0));
    mesh.set_rotation(Mat3::from_rotation_z(std::f32::consts::FRAC_PI_2));
    assert!((mesh.transform().w_axis.truncate() - Vec3::X).length() < 1e-6);
    mesh.subtract_mean();
    assert!(mesh.vertices()[0].z.abs() < 1e-6);
    assert!(TriangleMesh::new(vec![Vec3::ZERO], vec![[0, 0, 1]], Mat4::IDENTITY).is_err());
}

#[test]
fn test_sphere() {
    let sphere = TriangleMesh::sphere(Vec3::ONE, 2.0, 2);
    assert_eq!(sphere.faces().len(), 20 * 4 * 4);
    // 12 + 30 + 120 vertices after two subdivisions
    assert_eq!(sphere.vertices().len(), 162);
    for v in sphere.world_vertices() {
        assert!(((v - Vec3::ONE).length() - 2.0).abs() < 1e-5);
    }
}

#[test]
fn test_point_cloud() {
    let pc = PointCloud::new(
        vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)],
        Mat4::from_translation(Vec3::Y),
    );
    let geo = Geometry::PointCloud(pc);
    assert_eq!(geo.mean(), Vec3::new(1.0, 1.0, 0.0));
    assert_eq!(geo.n_primitives(), 2);
    assert!(!geo.is_empty());
}
