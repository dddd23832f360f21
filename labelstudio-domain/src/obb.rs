use crate::core::{ray_plane, Ray, T_MIN};
use glam::{Quat, Vec2, Vec3};

/// One of the six faces of an oriented box, identified by the local axis it is orthogonal to
/// and the side of the box it lies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxFace {
    /// 0, 1, or 2 for the local x-, y-, or z-axis
    pub axis: usize,
    pub positive: bool,
}
impl BoxFace {
    pub fn sign(&self) -> f32 {
        if self.positive {
            1.0
        } else {
            -1.0
        }
    }
    /// Outward normal in the local frame of the box
    pub fn local_normal(&self) -> Vec3 {
        let mut n = Vec3::ZERO;
        n[self.axis] = self.sign();
        n
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxHit {
    pub distance: f32,
    pub face: BoxFace,
}

/// Box with arbitrary orientation given by its center, its rotation and its full edge lengths.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientedBox {
    pub center: Vec3,
    pub orientation: Quat,
    pub dimensions: Vec3,
}
impl OrientedBox {
    pub fn to_local(&self, p: Vec3) -> Vec3 {
        self.orientation.inverse() * (p - self.center)
    }
    pub fn to_world(&self, p: Vec3) -> Vec3 {
        self.orientation * p + self.center
    }
    pub fn axis(&self, axis: usize) -> Vec3 {
        let mut local = Vec3::ZERO;
        local[axis] = 1.0;
        self.orientation * local
    }
    pub fn contains(&self, p: Vec3) -> bool {
        let local = self.to_local(p);
        local.abs().cmple(self.dimensions * 0.5).all()
    }
    /// Slab test in the local frame of the box. If the ray starts inside the box, the exit face
    /// is reported.
    pub fn ray_intersection(&self, ray: &Ray) -> Option<BoxHit> {
        let inv_rot = self.orientation.inverse();
        let origin = inv_rot * (ray.origin - self.center);
        let dir = inv_rot * ray.direction();
        let half = self.dimensions * 0.5;
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;
        let mut near_face = None;
        let mut far_face = None;
        for axis in 0..3 {
            if dir[axis].abs() < 1e-9 {
                if origin[axis].abs() > half[axis] {
                    return None;
                }
                continue;
            }
            let t0 = (-half[axis] - origin[axis]) / dir[axis];
            let t1 = (half[axis] - origin[axis]) / dir[axis];
            // entering through the negative face iff the ray points along +axis
            let (t_in, t_out, in_positive) = if t0 < t1 {
                (t0, t1, false)
            } else {
                (t1, t0, true)
            };
            if t_in > t_near {
                t_near = t_in;
                near_face = Some(BoxFace {
                    axis,
                    positive: in_positive,
                });
            }
            if t_out < t_far {
                t_far = t_out;
                far_face = Some(BoxFace {
                    axis,
                    positive: !in_positive,
                });
            }
        }
        if t_near > t_far || t_far < T_MIN {
            return None;
        }
        if t_near >= T_MIN {
            near_face.map(|face| BoxHit {
                distance: t_near,
                face,
            })
        } else {
            far_face.map(|face| BoxHit {
                distance: t_far,
                face,
            })
        }
    }
}

/// Planar rectangle centered at `center`. The local x- and y-axes span the plane, the local
/// z-axis is the normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientedRect {
    pub center: Vec3,
    pub orientation: Quat,
    pub size: Vec2,
}
impl OrientedRect {
    pub fn normal(&self) -> Vec3 {
        self.orientation * Vec3::Z
    }
    /// Coordinates of `p` projected onto the plane of the rectangle, in the rectangle's frame
    pub fn to_plane(&self, p: Vec3) -> Vec2 {
        (self.orientation.inverse() * (p - self.center)).truncate()
    }
    pub fn corners(&self) -> [Vec3; 4] {
        let h = self.size * 0.5;
        [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
            .map(|(sx, sy)| self.center + self.orientation * Vec3::new(sx * h.x, sy * h.y, 0.0))
    }
    pub fn ray_intersection(&self, ray: &Ray) -> Option<f32> {
        let t = ray_plane(ray, self.center, self.normal())?;
        let local = self.to_plane(ray.at(t));
        if local.abs().cmple(self.size * 0.5).all() {
            Some(t)
        } else {
            None
        }
    }
}

#[cfg(test)]
use std::f32::consts::FRAC_PI_4;

#[test]
fn test_box_hit() {
    let obb = OrientedBox {
        center: Vec3::new(0.0, 0.0, -5.0),
        orientation: Quat::IDENTITY,
        dimensions: Vec3::new(2.0, 2.0, 2.0),
    };
    let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z).unwrap();
    let hit = obb.ray_intersection(&ray).unwrap();
    assert!((hit.distance - 4.0).abs() < 1e-6);
    assert_eq!(
        hit.face,
        BoxFace {
            axis: 2,
            positive: true
        }
    );
    assert_eq!(hit.face.local_normal(), Vec3::Z);
    let miss = Ray::new(Vec3::new(1.5, 0.0, 0.0), Vec3::NEG_Z).unwrap();
    assert_eq!(obb.ray_intersection(&miss), None);
    let away = Ray::new(Vec3::ZERO, Vec3::Z).unwrap();
    assert_eq!(obb.ray_intersection(&away), None);

    // from inside we hit the exit face
    let inside = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::X).unwrap();
    let hit = obb.ray_intersection(&inside).unwrap();
    assert!((hit.distance - 1.0).abs() < 1e-6);
    assert_eq!(
        hit.face,
        BoxFace {
            axis: 0,
            positive: true
        }
    );
}

#[test]
fn test_rotated_box() {
    let obb = OrientedBox {
        center: Vec3::ZERO,
        orientation: Quat::from_rotation_z(FRAC_PI_4),
        dimensions: Vec3::new(2.0, 2.0, 2.0),
    };
    // the rotated corner sticks out to sqrt(2) along x
    let ray = Ray::new(Vec3::new(1.3, 0.0, 5.0), Vec3::NEG_Z).unwrap();
    assert!(obb.ray_intersection(&ray).is_some());
    assert!(obb.contains(Vec3::new(1.3, 0.0, 0.0)));
    assert!(!obb.contains(Vec3::new(1.3, 1.3, 0.0)));
    let p = Vec3::new(0.3, -0.2, 0.7);
    assert!((obb.to_world(obb.to_local(p)) - p).length() < 1e-6);
    assert!((obb.axis(0) - Vec3::new(1.0, 1.0, 0.0).normalize()).length() < 1e-6);
}

#[test]
fn test_rect_hit() {
    let rect = OrientedRect {
        center: Vec3::new(0.0, 0.0, -2.0),
        orientation: Quat::IDENTITY,
        size: Vec2::new(1.0, 0.5),
    };
    let ray = Ray::new(Vec3::new(0.4, 0.2, 0.0), Vec3::NEG_Z).unwrap();
    assert_eq!(rect.ray_intersection(&ray), Some(2.0));
    let outside = Ray::new(Vec3::new(0.4, 0.3, 0.0), Vec3::NEG_Z).unwrap();
    assert_eq!(rect.ray_intersection(&outside), None);
    assert_eq!(rect.corners()[2], Vec3::new(0.5, 0.25, -2.0));
    assert_eq!(rect.to_plane(Vec3::new(0.1, 0.2, 7.0)), Vec2::new(0.1, 0.2));
}
