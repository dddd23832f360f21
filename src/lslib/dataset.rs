use crate::{
    file_util::{self, DatasetPaths},
    result::{ErrorKind, LsError, LsResult},
};
use labelstudio_domain::{
    glam::{Mat3, Mat4, Quat, Vec3},
    normalize_quat, Camera, CameraIntrinsics,
};
use std::{f32::consts::PI, path::Path};
use tracing::{info, warn};

fn parse_err(msg: &str) -> LsError {
    LsError::with_kind(ErrorKind::Parse, msg)
}

pub fn read_intrinsics(path: &Path) -> LsResult<CameraIntrinsics> {
    let s = file_util::read_to_string(path)?;
    CameraIntrinsics::from_json_str(&s)
}

fn parse_row(line: &str, line_idx: usize) -> LsResult<[f32; 4]> {
    let values = line
        .split_whitespace()
        .map(|s| s.parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| parse_err(&format!("line {line_idx}: {e}")))?;
    <[f32; 4]>::try_from(values.as_slice()).map_err(|_| {
        parse_err(&format!(
            "line {line_idx}: expected 4 numbers, got {}",
            values.len()
        ))
    })
}

/// Parses a camera log with one frame per block of 5 lines. The first line of each block holds
/// frame indices and is ignored, the following 4 lines are the rows of the camera-to-world
/// transform.
pub fn parse_trajectory(s: &str) -> LsResult<Vec<Mat4>> {
    let lines = s
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .collect::<Vec<_>>();
    if lines.len() % 5 != 0 {
        return Err(parse_err(&format!(
            "trajectory needs blocks of 5 lines, found {} lines",
            lines.len()
        )));
    }
    lines
        .chunks(5)
        .map(|block| -> LsResult<Mat4> {
            let mut rows = [0f32; 16];
            for (r, (line_idx, line)) in block[1..].iter().enumerate() {
                rows[r * 4..(r + 1) * 4].copy_from_slice(&parse_row(line, *line_idx + 1)?);
            }
            Ok(Mat4::from_cols_array(&rows).transpose())
        })
        .collect()
}

pub fn read_trajectory(path: &Path) -> LsResult<Vec<Mat4>> {
    let s = file_util::read_to_string(path)?;
    let frames = parse_trajectory(&s)?;
    info!("read {} camera frames from {path:?}", frames.len());
    Ok(frames)
}

/// Camera position and orientation of a recorded frame. Recorded cameras look along their
/// positive z-axis, ours along the negative one, hence the rotation about x by π.
pub fn camera_pose_from_frame(frame: &Mat4) -> (Vec3, Quat) {
    let rotation = Quat::from_mat3(&Mat3::from_mat4(*frame));
    let orientation = normalize_quat(rotation * Quat::from_axis_angle(Vec3::X, PI));
    (frame.w_axis.truncate(), orientation)
}

/// Replays a recorded camera trajectory frame by frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CameraPlayback {
    frames: Vec<Mat4>,
    current: usize,
}
impl CameraPlayback {
    pub fn new(frames: Vec<Mat4>) -> Self {
        Self { frames, current: 0 }
    }
    pub fn from_dataset(paths: &DatasetPaths) -> LsResult<Self> {
        read_trajectory(&paths.trajectory()).map(Self::new)
    }
    pub fn len(&self) -> usize {
        self.frames.len()
    }
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
    pub fn current_idx(&self) -> usize {
        self.current
    }
    pub fn is_finished(&self) -> bool {
        self.current >= self.frames.len()
    }
    pub fn rewind(&mut self) {
        self.current = 0;
    }
    /// Moves the camera to the current frame and advances. Returns false once all frames have
    /// been shown.
    pub fn apply_next(&mut self, camera: &mut Camera) -> bool {
        match self.frames.get(self.current) {
            Some(frame) => {
                let (position, orientation) = camera_pose_from_frame(frame);
                camera.set_orientation(orientation);
                camera.set_position(position);
                self.current += 1;
                true
            }
            None => false,
        }
    }
}

/// Camera initialized from the intrinsics of a dataset, or with the default field of view if
/// the dataset has none.
pub fn dataset_camera(paths: &DatasetPaths, default_fov: f32) -> Camera {
    let path = paths.intrinsics();
    if !path.exists() {
        return Camera::new(default_fov);
    }
    match read_intrinsics(&path) {
        Ok(intrinsics) => Camera::from_intrinsics(&intrinsics),
        Err(e) => {
            warn!("could not read intrinsics {path:?}, {e:?}");
            Camera::new(default_fov)
        }
    }
}

#[cfg(test)]
use crate::file_util::get_test_folder;

#[cfg(test)]
const TRAJECTORY: &str = "0 0 1
1 0 0 0.5
0 1 0 1.0
0 0 1 -2.0
0 0 0 1

1 1 2
0 -1 0 0
1 0 0 0
0 0 1 0
0 0 0 1
";

#[test]
fn test_parse_trajectory() -> LsResult<()> {
    let frames = parse_trajectory(TRAJECTORY)?;
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].w_axis.truncate(), Vec3::new(0.5, 1.0, -2.0));
    assert_eq!(frames[1].x_axis.truncate(), Vec3::new(0.0, 1.0, 0.0));
    let truncated = TRAJECTORY.lines().take(4).collect::<Vec<_>>().join("\n");
    assert_eq!(
        parse_trajectory(&truncated).map_err(|e| e.kind()),
        Err(ErrorKind::Parse)
    );
    assert!(parse_trajectory("0 0 1\n1 0 0\n0 1 0 0\n0 0 1 0\n0 0 0 1").is_err());
    assert!(parse_trajectory("")?.is_empty());
    Ok(())
}

#[test]
fn test_camera_pose() -> LsResult<()> {
    let frames = parse_trajectory(TRAJECTORY)?;
    let (position, orientation) = camera_pose_from_frame(&frames[0]);
    assert_eq!(position, Vec3::new(0.5, 1.0, -2.0));
    // identity frame looks along +z, our camera then looks along +z as well
    let forward = orientation * Vec3::NEG_Z;
    assert!((forward - Vec3::Z).length() < 1e-5);
    assert!(((orientation * Vec3::Y) - Vec3::NEG_Y).length() < 1e-5);

    let mut playback = CameraPlayback::new(frames);
    let mut camera = Camera::new(60.0);
    assert!(playback.apply_next(&mut camera));
    assert_eq!(camera.position(), position);
    assert!(playback.apply_next(&mut camera));
    assert!(playback.is_finished());
    assert!(!playback.apply_next(&mut camera));
    playback.rewind();
    assert_eq!(playback.current_idx(), 0);
    Ok(())
}

#[test]
fn test_read_dataset() -> LsResult<()> {
    let paths = DatasetPaths::new(get_test_folder().join("dataset"));
    let playback = CameraPlayback::from_dataset(&paths)?;
    assert_eq!(playback.len(), 3);
    let intrinsics = read_intrinsics(&paths.intrinsics())?;
    let camera = dataset_camera(&paths, 60.0);
    assert!((camera.fov() - intrinsics.fov_degrees()).abs() < 1e-5);
    let camera = dataset_camera(&DatasetPaths::new(get_test_folder()), 45.0);
    assert_eq!(camera.fov(), 45.0);
    Ok(())
}
