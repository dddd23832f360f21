use crate::result::{ErrorKind, LsError, LsResult};
use lazy_static::lazy_static;
use std::{
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{error, info};

lazy_static! {
    pub static ref DEFAULT_HOMEDIR: PathBuf = match dirs::home_dir() {
        Some(p) => p.join(".labelstudio"),
        _ => std::env::temp_dir().join("labelstudio"),
    };
}

pub const ANNOTATIONS_FILENAME: &str = "annotations.json";
pub const INTRINSICS_FILENAME: &str = "camera_intrinsics.json";
pub const TRAJECTORY_RELPATH: &str = "scene/trajectory.log";

pub fn read_to_string<P>(p: P) -> LsResult<String>
where
    P: AsRef<Path> + Debug,
{
    fs::read_to_string(&p).map_err(|e| {
        LsError::with_kind(
            ErrorKind::Io,
            &format!("could not read {p:?} due to {e:?}"),
        )
    })
}

pub fn write<P, C>(path: P, contents: C) -> LsResult<()>
where
    P: AsRef<Path> + Debug,
    C: AsRef<[u8]>,
{
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&path, contents).map_err(|e| {
        LsError::with_kind(
            ErrorKind::Io,
            &format!("could not write to {path:?} since {e:?}"),
        )
    })
}

pub struct Defer<F: FnMut()> {
    pub func: F,
}
impl<F: FnMut()> Drop for Defer<F> {
    fn drop(&mut self) {
        (self.func)();
    }
}
#[macro_export]
macro_rules! defer {
    ($f:expr) => {
        let _dfr = $crate::file_util::Defer { func: $f };
    };
}
pub fn checked_remove<'a, P: AsRef<Path> + Debug>(
    path: &'a P,
    func: fn(p: &'a P) -> io::Result<()>,
) {
    match func(path) {
        Ok(_) => info!("removed {path:?}"),
        Err(e) => error!("could not remove {path:?} due to {e:?}"),
    }
}
#[macro_export]
macro_rules! defer_file_removal {
    ($path:expr) => {
        let func = || $crate::file_util::checked_remove($path, std::fs::remove_file);
        $crate::defer!(func);
    };
}

/// Files of a dataset folder recorded by a scanning app.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetPaths {
    pub folder: PathBuf,
}
impl DatasetPaths {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }
    pub fn annotations(&self) -> PathBuf {
        self.folder.join(ANNOTATIONS_FILENAME)
    }
    pub fn intrinsics(&self) -> PathBuf {
        self.folder.join(INTRINSICS_FILENAME)
    }
    pub fn trajectory(&self) -> PathBuf {
        self.folder.join(TRAJECTORY_RELPATH)
    }
}

pub fn get_test_folder() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources/test_data")
}

#[test]
fn test_dataset_paths() {
    let paths = DatasetPaths::new("/data/scan");
    assert_eq!(paths.annotations(), PathBuf::from("/data/scan/annotations.json"));
    assert_eq!(
        paths.intrinsics(),
        PathBuf::from("/data/scan/camera_intrinsics.json")
    );
    assert_eq!(
        paths.trajectory(),
        PathBuf::from("/data/scan/scene/trajectory.log")
    );
}

#[test]
fn test_read_missing() {
    let err = read_to_string(get_test_folder().join("does-not-exist.json")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}
