use crate::{
    core::normalize_quat,
    lserr,
    result::{LsError, LsResult},
};
use glam::{Affine3A, Mat3, Mat3A, Mat4, Quat, Vec2, Vec3, Vec3A};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const WORLD_UP: Vec3 = Vec3::Y;
/// used when the viewing direction is parallel to [`WORLD_UP`]
const WORLD_UP_FALLBACK: Vec3 = Vec3::Z;
pub const DEFAULT_FOV_DEGREES: f32 = 45.0;

/// Pinhole intrinsics of the sensor that recorded the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraIntrinsics {
    pub matrix: Mat3,
    pub width: u32,
    pub height: u32,
}

/// Layout of the intrinsics file, the matrix is stored column-major as flat list.
#[derive(Deserialize, Serialize)]
struct IntrinsicsFile {
    intrinsic_matrix: Vec<f32>,
    width: u32,
    height: u32,
}

impl CameraIntrinsics {
    pub fn from_json_str(s: &str) -> LsResult<Self> {
        let file: IntrinsicsFile = serde_json::from_str(s)?;
        let arr: [f32; 9] = file.intrinsic_matrix.as_slice().try_into().map_err(|_| {
            LsError::with_kind(
                crate::ErrorKind::Parse,
                &format!(
                    "intrinsic matrix needs 9 entries, got {}",
                    file.intrinsic_matrix.len()
                ),
            )
        })?;
        if file.width == 0 || file.height == 0 {
            return Err(lserr!(
                "image size must be positive, got {}x{}",
                file.width,
                file.height
            ));
        }
        Ok(Self {
            matrix: Mat3::from_cols_array(&arr),
            width: file.width,
            height: file.height,
        })
    }
    pub fn to_json_string(&self) -> LsResult<String> {
        let file = IntrinsicsFile {
            intrinsic_matrix: self.matrix.to_cols_array().to_vec(),
            width: self.width,
            height: self.height,
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }
    pub fn fx(&self) -> f32 {
        self.matrix.x_axis.x
    }
    pub fn fy(&self) -> f32 {
        self.matrix.y_axis.y
    }
    /// Vertical field of view in degrees
    pub fn fov_degrees(&self) -> f32 {
        (2.0 * (self.height as f32 / (2.0 * self.fy())).atan()).to_degrees()
    }
}

/// Interactive perspective camera. The view matrix maps world coordinates into camera
/// coordinates where the camera looks along its negative z-axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    position: Vec3,
    orientation: Quat,
    lookat: Vec3,
    fov: f32,
    view_matrix: Affine3A,
}

impl Default for Camera {
    fn default() -> Self {
        let mut cam = Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            lookat: Vec3::ZERO,
            fov: DEFAULT_FOV_DEGREES,
            view_matrix: Affine3A::IDENTITY,
        };
        cam.reset(Vec3::splat(-0.1), Vec3::ZERO);
        cam
    }
}

impl Camera {
    pub fn new(fov_degrees: f32) -> Self {
        Self {
            fov: fov_degrees,
            ..Self::default()
        }
    }
    pub fn from_intrinsics(intrinsics: &CameraIntrinsics) -> Self {
        Self::new(intrinsics.fov_degrees())
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }
    pub fn orientation(&self) -> Quat {
        self.orientation
    }
    pub fn lookat(&self) -> Vec3 {
        self.lookat
    }
    pub fn fov(&self) -> f32 {
        self.fov
    }
    pub fn set_fov(&mut self, fov_degrees: f32) {
        self.fov = fov_degrees;
    }
    pub fn view_matrix(&self) -> &Affine3A {
        &self.view_matrix
    }
    pub fn view_matrix_4x4(&self) -> Mat4 {
        Mat4::from(self.view_matrix)
    }

    pub fn forward_vector(&self) -> Vec3 {
        -(self.orientation * Vec3::Z)
    }
    pub fn up_vector(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }
    pub fn right_vector(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    /// Places the camera at `position` looking at `lookat`.
    pub fn reset(&mut self, lookat: Vec3, position: Vec3) {
        self.lookat = lookat;
        self.position = position;
        self.orientation = match look_rotation(position - lookat) {
            Some(rot) => normalize_quat(Quat::from_mat3(&rot)),
            None => {
                warn!("camera position {position} coincides with lookat, using identity orientation");
                Quat::IDENTITY
            }
        };
        self.update_view_matrix();
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_view_matrix();
    }
    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = normalize_quat(orientation);
        self.update_view_matrix();
    }
    pub fn set_lookat(&mut self, lookat: Vec3) {
        self.lookat = lookat;
    }
    /// Re-aims the camera at `lookat` without moving it.
    pub fn update_lookat(&mut self, lookat: Vec3) {
        self.lookat = lookat;
        if let Some(rot) = look_rotation(self.position - lookat) {
            self.set_orientation(Quat::from_mat3(&rot));
        }
    }

    fn update_view_matrix(&mut self) {
        let rotation = Mat3A::from_quat(self.orientation.conjugate());
        self.view_matrix = Affine3A {
            matrix3: rotation,
            translation: -(rotation * Vec3A::from(self.position)),
        };
    }

    /// Pans the camera. The translation is given in camera coordinates, position and lookat are
    /// moved together.
    pub fn translate(&mut self, local_delta: Vec3) {
        let delta = self.orientation * local_delta;
        self.position += delta;
        self.lookat += delta;
        self.update_view_matrix();
    }

    /// Orbits around the lookat point. `delta` is a rotation in camera coordinates.
    pub fn rotate_around_target(&mut self, delta: Quat) {
        let t = self.view_matrix.transform_point3(self.lookat);
        let new_view = Affine3A::from_translation(t)
            * Affine3A::from_quat(normalize_quat(delta))
            * Affine3A::from_translation(-t)
            * self.view_matrix;
        let orientation = normalize_quat(Quat::from_mat3a(&new_view.matrix3).conjugate());
        self.position = -(orientation * Vec3::from(new_view.translation));
        self.orientation = orientation;
        self.update_view_matrix();
    }

    /// Moves the camera along its forward vector. The lookat point stays where it is, such that
    /// the distance to the orbit pivot changes.
    pub fn zoom(&mut self, delta: f32) {
        self.position += self.forward_vector() * delta;
        self.update_view_matrix();
    }

    pub fn distance_to_lookat(&self) -> f32 {
        self.position.distance(self.lookat)
    }

    /// Transforms into camera coordinates and divides by the depth.
    pub fn project_point(&self, point: Vec3) -> Vec2 {
        let v = self.view_matrix.transform_point3(point);
        (v / v.z).truncate()
    }

    fn tan_half_fov(&self) -> f32 {
        (self.fov.to_radians() / 2.0).tan()
    }

    /// Direction in world coordinates of the ray through the center of pixel `(x, y)`.
    pub fn compute_ray_world(&self, width: f32, height: f32, x: f32, y: f32) -> Vec3 {
        let aspect_ratio = width / height;
        let tan = self.tan_half_fov();
        let p_x = (2.0 * ((x + 0.5) / width) - 1.0) * tan * aspect_ratio;
        let p_y = (1.0 - 2.0 * ((y + 0.5) / height)) * tan;
        let ray_cam = Vec3::new(p_x, p_y, -1.0);
        self.orientation * ray_cam.normalize()
    }

    /// Inverse of [`Camera::compute_ray_world`], i.e., pixel coordinates of a world point. Points
    /// behind the camera have no pixel.
    pub fn project_to_pixel(&self, point: Vec3, width: f32, height: f32) -> Option<Vec2> {
        let v = self.view_matrix.transform_point3(point);
        if v.z >= 0.0 {
            return None;
        }
        let tan = self.tan_half_fov();
        let aspect_ratio = width / height;
        let p_x = v.x / -v.z;
        let p_y = v.y / -v.z;
        let x = (p_x / (tan * aspect_ratio) + 1.0) / 2.0 * width - 0.5;
        let y = (1.0 - p_y / tan) / 2.0 * height - 0.5;
        Some(Vec2::new(x, y))
    }
}

/// Rotation whose z-axis is `backward`, i.e., a camera with this rotation looks along
/// `-backward`. `None` if `backward` has no length.
fn look_rotation(backward: Vec3) -> Option<Mat3> {
    let z = backward.try_normalize()?;
    let mut x = WORLD_UP.cross(z);
    if x.length_squared() < 1e-10 {
        x = WORLD_UP_FALLBACK.cross(z);
    }
    let x = x.normalize();
    let y = z.cross(x).normalize();
    Some(Mat3::from_cols(x, y, z))
}

#[cfg(test)]
const TOL: f32 = 1e-5;

#[test]
fn test_reset() {
    let mut cam = Camera::default();
    cam.reset(Vec3::ZERO, Vec3::new(0.0, 0.0, 0.2));
    assert!((cam.orientation().length() - 1.0).abs() < TOL);
    assert!((cam.forward_vector() - Vec3::NEG_Z).length() < TOL);
    assert!((cam.up_vector() - Vec3::Y).length() < TOL);
    assert!((cam.view_matrix().transform_point3(Vec3::ZERO) - Vec3::new(0.0, 0.0, -0.2)).length() < TOL);

    // looking straight down along the world up axis must not degenerate
    cam.reset(Vec3::ZERO, Vec3::new(0.0, 3.0, 0.0));
    assert!(cam.orientation().is_finite());
    assert!((cam.orientation().length() - 1.0).abs() < TOL);
    assert!((cam.forward_vector() - Vec3::NEG_Y).length() < TOL);
    cam.reset(Vec3::ZERO, Vec3::new(0.0, -3.0, 0.0));
    assert!((cam.forward_vector() - Vec3::Y).length() < TOL);

    cam.reset(Vec3::ONE, Vec3::ONE);
    assert_eq!(cam.orientation(), Quat::IDENTITY);
}

#[test]
fn test_center_ray_and_projection() {
    let mut cam = Camera::default();
    cam.reset(Vec3::ZERO, Vec3::new(0.0, 0.0, 0.2));
    let (w, h) = (500.0, 500.0);
    // pixel (249.5, 249.5) is the exact center after the half pixel offset
    let dir = cam.compute_ray_world(w, h, 249.5, 249.5);
    assert!((dir - Vec3::NEG_Z).length() < TOL);
    assert!(cam.project_point(Vec3::new(0.0, 0.0, -1.0)).length() < TOL);
    let px = cam.project_to_pixel(Vec3::ZERO, w, h).unwrap();
    assert!((px - Vec2::new(249.5, 249.5)).length() < 1e-3);
    assert_eq!(cam.project_to_pixel(Vec3::new(0.0, 0.0, 1.0), w, h), None);

    // round trip through an off-center pixel
    cam.reset(Vec3::new(0.3, -0.2, 0.1), Vec3::new(1.0, 2.0, 3.0));
    let dir = cam.compute_ray_world(640.0, 480.0, 100.0, 400.0);
    let p = cam.position() + dir * 2.5;
    let px = cam.project_to_pixel(p, 640.0, 480.0).unwrap();
    assert!((px - Vec2::new(100.0, 400.0)).length() < 1e-2);
}

#[test]
fn test_translate_and_zoom() {
    let mut cam = Camera::default();
    cam.reset(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0));
    cam.translate(Vec3::new(0.5, 0.0, 0.0));
    assert!((cam.position() - Vec3::new(0.5, 0.0, 1.0)).length() < TOL);
    assert!((cam.lookat() - Vec3::new(0.5, 0.0, 0.0)).length() < TOL);
    assert!((cam.forward_vector() - Vec3::NEG_Z).length() < TOL);
    cam.zoom(0.25);
    assert!((cam.position() - Vec3::new(0.5, 0.0, 0.75)).length() < TOL);
    // lookat is not touched by zooming
    assert!((cam.lookat() - Vec3::new(0.5, 0.0, 0.0)).length() < TOL);
    let expected = Affine3A::from_translation(Vec3::new(-0.5, 0.0, -0.75));
    assert!(cam.view_matrix().abs_diff_eq(expected, TOL));
}

#[test]
fn test_orbit() {
    let mut cam = Camera::default();
    cam.reset(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0));
    for _ in 0..100 {
        cam.rotate_around_target(
            Quat::from_rotation_y(0.05) * Quat::from_rotation_x(0.03),
        );
        assert!((cam.orientation().length() - 1.0).abs() < TOL);
        // orbiting keeps the distance to the pivot
        assert!((cam.distance_to_lookat() - 2.0).abs() < 1e-3);
        // and keeps the pivot in the center of the view
        let center = cam.view_matrix().transform_point3(cam.lookat());
        assert!(center.truncate().length() < 1e-3);
    }
    cam.set_orientation(Quat::from_xyzw(0.0, 2.0, 0.0, 0.0));
    assert!((cam.orientation().length() - 1.0).abs() < TOL);
}

#[test]
fn test_update_lookat() {
    let mut cam = Camera::default();
    cam.reset(Vec3::ZERO, Vec3::ZERO);
    cam.set_position(Vec3::new(0.0, 0.0, 0.2));
    cam.update_lookat(Vec3::ZERO);
    assert!((cam.forward_vector() - Vec3::NEG_Z).length() < TOL);
}

#[test]
fn test_intrinsics() -> LsResult<()> {
    let s = r#"{"intrinsic_matrix": [500.0, 0.0, 0.0, 0.0, 400.0, 0.0, 320.0, 240.0, 1.0], "width": 640, "height": 480}"#;
    let intrinsics = CameraIntrinsics::from_json_str(s)?;
    assert_eq!(intrinsics.fx(), 500.0);
    assert_eq!(intrinsics.fy(), 400.0);
    assert_eq!(intrinsics.matrix.z_axis, Vec3::new(320.0, 240.0, 1.0));
    let expected_fov = (2.0 * (480.0f32 / 800.0).atan()).to_degrees();
    assert!((intrinsics.fov_degrees() - expected_fov).abs() < TOL);
    assert!((Camera::from_intrinsics(&intrinsics).fov() - expected_fov).abs() < TOL);
    let reread = CameraIntrinsics::from_json_str(&intrinsics.to_json_string()?)?;
    assert_eq!(reread, intrinsics);
    assert!(CameraIntrinsics::from_json_str(r#"{"intrinsic_matrix": [1.0], "width": 1, "height": 1}"#).is_err());
    Ok(())
}
