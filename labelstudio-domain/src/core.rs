use crate::result::{LsError, LsResult};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Squared lengths below this are considered zero.
pub const DEGENERATE_EPS: f32 = 1e-12;
/// Smallest ray parameter accepted as a hit in front of the ray origin.
pub const T_MIN: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    direction: Vec3,
    inv_direction: Vec3,
}
impl Ray {
    /// The direction is normalized. A direction of (almost) zero length is rejected since
    /// there is no meaningful ray to cast.
    pub fn new(origin: Vec3, direction: Vec3) -> LsResult<Self> {
        if !direction.is_finite() || direction.length_squared() < DEGENERATE_EPS {
            return Err(LsError::degenerate(&format!(
                "cannot cast a ray with direction {direction}"
            )));
        }
        let direction = direction.normalize();
        Ok(Self {
            origin,
            direction,
            inv_direction: direction.recip(),
        })
    }
    pub fn direction(&self) -> Vec3 {
        self.direction
    }
    pub fn inv_direction(&self) -> Vec3 {
        self.inv_direction
    }
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
    /// Ray parameter of the orthogonal projection of `p` onto the ray's line
    pub fn project(&self, p: Vec3) -> f32 {
        (p - self.origin).dot(self.direction)
    }
    pub fn squared_dist_to_point(&self, p: Vec3) -> f32 {
        let t = self.project(p);
        (p - self.at(t)).length_squared()
    }
}

/// Result of a successful pick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    pub point: Vec3,
    /// ray parameter, i.e., the distance from the ray origin since ray directions are normalized
    pub distance: f32,
    /// index of the triangle or point in insertion order
    pub primitive: usize,
    /// geometric normal of the triangle facing the ray origin, `None` for point clouds
    pub normal: Option<Vec3>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}
impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }
    pub fn from_points(points: impl Iterator<Item = Vec3>) -> Self {
        points.fold(Self::empty(), |bb, p| bb.grow(p))
    }
    #[must_use]
    pub fn grow(self, p: Vec3) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }
    #[must_use]
    pub fn merge(self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
    #[must_use]
    pub fn inflate(self, r: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(r),
            max: self.max + Vec3::splat(r),
        }
    }
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }
    /// Upper bound of the distance between `p` and any point inside the box
    pub fn max_dist(&self, p: Vec3) -> f32 {
        (self.min - p).abs().max((self.max - p).abs()).length()
    }
    /// Slab test. Returns the ray parameter where the ray enters the box, clamped to zero if
    /// the origin is inside.
    pub fn ray_entry(&self, ray: &Ray) -> Option<f32> {
        let t0 = (self.min - ray.origin) * ray.inv_direction();
        let t1 = (self.max - ray.origin) * ray.inv_direction();
        // NaN from 0 * inf lands in min/max and is ignored by glam's min/max element semantics
        let t_near = t0.min(t1).max_element();
        let t_far = t0.max(t1).min_element();
        if t_far >= t_near.max(0.0) {
            Some(t_near.max(0.0))
        } else {
            None
        }
    }
}

/// Normalizes `q`, falls back to the identity if `q` cannot be normalized.
pub fn normalize_quat(q: Quat) -> Quat {
    let len_sq = q.length_squared();
    if !q.is_finite() || len_sq < DEGENERATE_EPS {
        Quat::IDENTITY
    } else {
        q.normalize()
    }
}

pub fn is_unit_quat(q: Quat, tol: f32) -> bool {
    (q.length() - 1.0).abs() < tol
}

/// Ray parameter where `ray` hits the plane through `plane_point` with normal `plane_normal`.
/// Negative parameters and rays parallel to the plane yield `None`.
pub fn ray_plane(ray: &Ray, plane_point: Vec3, plane_normal: Vec3) -> Option<f32> {
    let denom = plane_normal.dot(ray.direction());
    if denom.abs() <= 1e-6 {
        return None;
    }
    let t = (plane_point - ray.origin).dot(plane_normal) / denom;
    if t < T_MIN {
        None
    } else {
        Some(t)
    }
}

/// Parameter `s` of the point `line_point + s * line_dir` that is closest to `ray`. `None`
/// if ray and line are parallel.
pub fn closest_on_line_to_ray(ray: &Ray, line_point: Vec3, line_dir: Vec3) -> Option<f32> {
    let line_dir = line_dir.try_normalize()?;
    let w = line_point - ray.origin;
    let b = line_dir.dot(ray.direction());
    let denom = 1.0 - b * b;
    if denom.abs() < 1e-6 {
        return None;
    }
    let d = line_dir.dot(w);
    let e = ray.direction().dot(w);
    Some((b * e - d) / denom)
}

#[cfg(test)]
use crate::result::ErrorKind;
#[test]
fn test_ray() {
    let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -2.0)).unwrap();
    assert_eq!(ray.direction(), Vec3::NEG_Z);
    assert_eq!(ray.at(3.0), Vec3::new(0.0, 0.0, -3.0));
    assert!((ray.squared_dist_to_point(Vec3::new(1.0, 0.0, -5.0)) - 1.0).abs() < 1e-6);
    let err = Ray::new(Vec3::ZERO, Vec3::splat(1e-9)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DegenerateInput);
    assert!(Ray::new(Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 1.0)).is_err());
}
#[test]
fn test_aabb() {
    let bb = Aabb::from_points([Vec3::ONE, -Vec3::ONE].into_iter());
    assert_eq!(bb.center(), Vec3::ZERO);
    assert_eq!(bb.extent(), Vec3::splat(2.0));
    let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z).unwrap();
    assert_eq!(bb.ray_entry(&ray), Some(4.0));
    let inside = Ray::new(Vec3::ZERO, Vec3::X).unwrap();
    assert_eq!(bb.ray_entry(&inside), Some(0.0));
    let miss = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z).unwrap();
    assert_eq!(bb.ray_entry(&miss), None);
    let behind = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z).unwrap();
    assert_eq!(bb.ray_entry(&behind), None);
    assert!(Aabb::empty().is_empty());
    assert!((bb.max_dist(Vec3::ZERO) - 3f32.sqrt()).abs() < 1e-6);
}
#[test]
fn test_planes_and_lines() {
    let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z).unwrap();
    assert_eq!(ray_plane(&ray, Vec3::ZERO, Vec3::Z), Some(5.0));
    assert_eq!(ray_plane(&ray, Vec3::ZERO, Vec3::X), None);
    assert_eq!(ray_plane(&ray, Vec3::new(0.0, 0.0, 6.0), Vec3::Z), None);
    let ray = Ray::new(Vec3::new(2.0, 1.0, 5.0), Vec3::NEG_Z).unwrap();
    let s = closest_on_line_to_ray(&ray, Vec3::ZERO, Vec3::X).unwrap();
    assert!((s - 2.0).abs() < 1e-6);
    assert_eq!(closest_on_line_to_ray(&ray, Vec3::ZERO, Vec3::Z), None);
    assert_eq!(normalize_quat(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0)), Quat::IDENTITY);
    assert!(is_unit_quat(normalize_quat(Quat::from_xyzw(1.0, 2.0, 3.0, 4.0)), 1e-6));
}
