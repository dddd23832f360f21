use crate::{
    file_util::{self, DEFAULT_HOMEDIR},
    result::{to_ls, ErrorKind, LsError, LsResult},
};
use labelstudio_domain::{glam::Vec3, PointTolerance, DEFAULT_FOV_DEGREES};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    f32::consts::PI,
    fmt::Debug,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

/// Sensitivities of the camera gestures
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct CameraCfg {
    /// radians per dragged pixel
    pub orbit_speed: f32,
    /// pan distance per dragged viewport width/height
    pub pan_speed: f32,
    /// zoom distance per scroll unit
    pub zoom_speed: f32,
    /// zooming stops at this distance to the lookat point
    pub min_distance: f32,
    /// vertical field of view in degrees if no intrinsics are available
    pub fov: f32,
}
impl Default for CameraCfg {
    fn default() -> Self {
        Self {
            orbit_speed: PI / 2000.0,
            pan_speed: 1.0,
            zoom_speed: 0.05,
            min_distance: 0.05,
            fov: DEFAULT_FOV_DEGREES,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PickingCfg {
    pub point_tolerance: PointTolerance,
    /// keypoints closer than this to the cursor on screen can be grabbed
    pub keypoint_radius_px: f32,
}
impl Default for PickingCfg {
    fn default() -> Self {
        Self {
            point_tolerance: PointTolerance::default(),
            keypoint_radius_px: 12.0,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct AnnotationCfg {
    /// box size for classes without a default size in the dataset metadata
    pub default_box_size: Vec3,
    pub rotation_step_degrees: f32,
    /// lower bound for box dimensions and rectangle sizes
    pub min_dimension: f32,
}
impl Default for AnnotationCfg {
    fn default() -> Self {
        Self {
            default_box_size: Vec3::splat(0.2),
            rotation_step_degrees: 5.0,
            min_dimension: 1e-3,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Cfg {
    /// folder for logs, defaults to the folder of the cfg file
    pub home_folder: Option<String>,
    pub camera: CameraCfg,
    pub picking: PickingCfg,
    pub annotation: AnnotationCfg,
}
impl Cfg {
    pub fn home_folder(&self) -> PathBuf {
        self.home_folder
            .as_ref()
            .map_or_else(|| DEFAULT_HOMEDIR.clone(), PathBuf::from)
    }
    pub fn log_folder(&self) -> PathBuf {
        get_log_folder(&self.home_folder())
    }
}

pub fn get_cfg_path() -> PathBuf {
    DEFAULT_HOMEDIR.join("ls_cfg.toml")
}

pub fn get_log_folder(home_folder: &Path) -> PathBuf {
    home_folder.join("logs")
}

pub fn read_cfg_gen<CFG: Debug + DeserializeOwned + Default>(
    cfg_toml_path: &Path,
) -> LsResult<CFG> {
    if cfg_toml_path.exists() {
        let toml_str = file_util::read_to_string(cfg_toml_path)?;
        toml::from_str(&toml_str).map_err(|e| {
            LsError::with_kind(
                ErrorKind::Parse,
                &format!("could not parse cfg due to {e:?}"),
            )
        })
    } else {
        warn!("cfg {cfg_toml_path:?} file does not exist. using default cfg");
        Ok(CFG::default())
    }
}

pub fn read_cfg() -> LsResult<Cfg> {
    read_cfg_gen::<Cfg>(&get_cfg_path())
}

pub fn write_cfg_to(cfg: &Cfg, p: &Path) -> LsResult<()> {
    let cfg_str = toml::to_string_pretty(cfg).map_err(to_ls)?;
    file_util::write(p, cfg_str)?;
    info!("wrote cfg to {p:?}");
    Ok(())
}

pub fn write_cfg(cfg: &Cfg) -> LsResult<()> {
    write_cfg_to(cfg, &get_cfg_path())
}

#[cfg(test)]
use crate::{defer_file_removal, file_util::get_test_folder};

#[test]
fn test_partial_cfg() -> LsResult<()> {
    let cfg: Cfg = toml::from_str(
        r#"
        [camera]
        zoom_speed = 0.1
        [annotation]
        default_box_size = [0.5, 0.5, 1.0]
        "#,
    )
    .map_err(to_ls)?;
    assert_eq!(cfg.camera.zoom_speed, 0.1);
    assert_eq!(cfg.camera.orbit_speed, CameraCfg::default().orbit_speed);
    assert_eq!(cfg.annotation.default_box_size, Vec3::new(0.5, 0.5, 1.0));
    assert_eq!(cfg.picking, PickingCfg::default());
    Ok(())
}

#[test]
fn test_broken_cfg() -> LsResult<()> {
    let path = get_test_folder().join("tmp-cfg-broken.toml");
    defer_file_removal!(&path);
    file_util::write(&path, "[camera\nzoom_speed = ")?;
    let err = read_cfg_gen::<Cfg>(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    Ok(())
}

#[test]
fn test_write_read_cfg() -> LsResult<()> {
    let path = get_test_folder().join("tmp-cfg-roundtrip.toml");
    defer_file_removal!(&path);
    let mut cfg = Cfg::default();
    cfg.home_folder = Some("/tmp/labelstudio-test-home".to_string());
    cfg.picking.keypoint_radius_px = 3.0;
    write_cfg_to(&cfg, &path)?;
    let read = read_cfg_gen::<Cfg>(&path)?;
    assert_eq!(read, cfg);
    assert_eq!(
        read.log_folder(),
        PathBuf::from("/tmp/labelstudio-test-home/logs")
    );
    let missing = read_cfg_gen::<Cfg>(&get_test_folder().join("no-cfg-here.toml"))?;
    assert_eq!(missing, Cfg::default());
    assert_eq!(missing.log_folder(), DEFAULT_HOMEDIR.join("logs"));
    Ok(())
}
