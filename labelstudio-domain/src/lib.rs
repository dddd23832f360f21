mod bvh;
mod camera;
mod core;
mod geometry;
mod obb;
mod raytrace;
pub mod result;
pub use bvh::Bvh;
pub use camera::{Camera, CameraIntrinsics, DEFAULT_FOV_DEGREES, WORLD_UP};
pub use self::core::{
    closest_on_line_to_ray, is_unit_quat, normalize_quat, ray_plane, Aabb, Intersection, Ray,
    DEGENERATE_EPS, T_MIN,
};
pub use geometry::{Geometry, PointCloud, TriangleMesh};
pub use obb::{BoxFace, BoxHit, OrientedBox, OrientedRect};
pub use raytrace::{PointTolerance, RayTracer};
pub use result::{to_ls, ErrorKind, LsError, LsResult};

/// Re-exported such that users of this crate agree on the math types.
pub use glam;
