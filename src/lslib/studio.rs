use crate::{
    cfg::Cfg,
    commands::CommandStack,
    controller::Controller,
    dataset::{dataset_camera, CameraPlayback},
    events::{EventQueue, InputEvent, KeyCode, Modifiers},
    file_util::DatasetPaths,
    result::{lserr, trace_ok_err, trace_ok_warn, LsResult},
    scene_model::SceneModel,
    tools::Preview,
};
use labelstudio_domain::Geometry;
use std::path::PathBuf;
use tracing::{info, warn};

/// Owns the annotated scene with its history and the controller. The window system pushes
/// events, [`Studio::process_events`] consumes them once per frame.
#[derive(Clone, Debug)]
pub struct Studio {
    model: SceneModel,
    stack: CommandStack,
    controller: Controller,
    queue: EventQueue,
    paths: Option<DatasetPaths>,
    playback: Option<CameraPlayback>,
}

impl Studio {
    pub fn new(cfg: Cfg, width: u32, height: u32) -> Self {
        let mut model = SceneModel::new(cfg.annotation);
        model.set_point_tolerance(cfg.picking.point_tolerance);
        Self {
            model,
            stack: CommandStack::new(),
            controller: Controller::new(cfg, width, height),
            queue: EventQueue::default(),
            paths: None,
            playback: None,
        }
    }

    /// Opens a dataset folder. Annotations, intrinsics and the camera trajectory are optional.
    pub fn open_dataset(
        cfg: Cfg,
        folder: impl Into<PathBuf>,
        width: u32,
        height: u32,
    ) -> LsResult<Self> {
        let paths = DatasetPaths::new(folder);
        if !paths.folder.is_dir() {
            return Err(lserr!("dataset folder {:?} does not exist", paths.folder));
        }
        let mut studio = Self::new(cfg, width, height);
        let annotations = paths.annotations();
        if annotations.exists() {
            studio.model.load(&annotations)?;
        } else {
            info!("no annotations at {annotations:?}, starting empty");
        }
        let fov = studio.controller.cfg().camera.fov;
        *studio.controller.camera_mut() = dataset_camera(&paths, fov);
        if paths.trajectory().exists() {
            studio.playback = trace_ok_warn(CameraPlayback::from_dataset(&paths));
        }
        studio.paths = Some(paths);
        Ok(studio)
    }

    pub fn model(&self) -> &SceneModel {
        &self.model
    }
    pub fn stack(&self) -> &CommandStack {
        &self.stack
    }
    pub fn controller(&self) -> &Controller {
        &self.controller
    }
    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }
    pub fn paths(&self) -> Option<&DatasetPaths> {
        self.paths.as_ref()
    }
    pub fn playback_mut(&mut self) -> Option<&mut CameraPlayback> {
        self.playback.as_mut()
    }
    pub fn preview(&self) -> Preview {
        self.controller.preview()
    }

    /// Replaces the scene geometry and points the camera at it.
    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.model.set_geometry(geometry);
        self.controller.reset_camera(&self.model);
    }

    /// Moves the camera to the next recorded frame if there is one.
    pub fn step_playback(&mut self) -> bool {
        match &mut self.playback {
            Some(playback) => playback.apply_next(self.controller.camera_mut()),
            None => false,
        }
    }

    pub fn push_event(&mut self, event: InputEvent) {
        self.queue.push(event);
    }
    pub fn n_pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Handles all queued events in order and returns how many have been used.
    pub fn process_events(&mut self) -> usize {
        let mut n_used = 0;
        while let Some(event) = self.queue.pop() {
            if self.handle(event) {
                n_used += 1;
            }
        }
        n_used
    }

    fn handle(&mut self, event: InputEvent) -> bool {
        if let InputEvent::KeyPress { key, modifiers } = event {
            if let Some(used) = self.shortcut(key, modifiers) {
                return used;
            }
        }
        self.controller
            .handle(event, &mut self.model, &mut self.stack)
    }

    fn shortcut(&mut self, key: KeyCode, modifiers: Modifiers) -> Option<bool> {
        if !modifiers.ctrl {
            return None;
        }
        if key.is_char('Z') && !modifiers.shift {
            Some(self.undo())
        } else if (key.is_char('Z') && modifiers.shift) || key.is_char('Y') {
            Some(self.redo())
        } else if key.is_char('S') {
            Some(trace_ok_err(self.save()).is_some())
        } else {
            None
        }
    }

    /// Gestures in progress are dropped since they might refer to annotations the undo removes.
    pub fn undo(&mut self) -> bool {
        self.controller.cancel_gesture(&mut self.model, &mut self.stack);
        self.stack.undo(&mut self.model)
    }
    pub fn redo(&mut self) -> bool {
        self.controller.cancel_gesture(&mut self.model, &mut self.stack);
        self.stack.redo(&mut self.model)
    }

    /// Writes the annotations into the dataset folder.
    pub fn save(&self) -> LsResult<()> {
        match &self.paths {
            Some(paths) => self.model.save(&paths.annotations()),
            None => {
                warn!("no dataset opened, nothing to save to");
                Err(lserr!("no dataset opened"))
            }
        }
    }
    pub fn save_to(&mut self, folder: impl Into<PathBuf>) -> LsResult<()> {
        let paths = DatasetPaths::new(folder);
        self.model.save(&paths.annotations())?;
        self.paths = Some(paths);
        Ok(())
    }
}

#[cfg(test)]
use {
    crate::{file_util::get_test_folder, result::ErrorKind, tools::ToolId},
    labelstudio_domain::{
        glam::{Mat4, Vec3},
        PointCloud,
    },
};

#[cfg(test)]
fn click(studio: &mut Studio, x: f32, y: f32) {
    studio.push_event(InputEvent::moved(x, y, Modifiers::NONE));
    studio.push_event(InputEvent::left_down(x, y, Modifiers::NONE));
    studio.push_event(InputEvent::left_up(x, y, Modifiers::NONE));
}

#[test]
fn test_undo_redo_shortcuts() {
    let mut studio = Studio::new(Cfg::default(), 500, 500);
    studio.set_geometry(Geometry::PointCloud(PointCloud::new(
        vec![Vec3::ZERO],
        Mat4::IDENTITY,
    )));
    studio
        .controller_mut()
        .camera_mut()
        .reset(Vec3::ZERO, Vec3::new(0.0, 0.0, 0.2));
    click(&mut studio, 249.5, 249.5);
    assert_eq!(studio.n_pending_events(), 3);
    assert_eq!(studio.process_events(), 3);
    assert_eq!(studio.model().keypoints().len(), 1);

    studio.push_event(InputEvent::key('z', Modifiers::ctrl()));
    studio.process_events();
    assert!(studio.model().keypoints().is_empty());
    studio.push_event(InputEvent::key('z', Modifiers::ctrl_shift()));
    studio.process_events();
    assert_eq!(studio.model().keypoints().len(), 1);
    studio.push_event(InputEvent::key('z', Modifiers::ctrl()));
    studio.push_event(InputEvent::key('y', Modifiers::ctrl()));
    studio.process_events();
    assert_eq!(studio.model().keypoints().len(), 1);
    assert_eq!(studio.model().keypoints()[0].id, 0);
    // undo on an exhausted history is not used
    studio.push_event(InputEvent::key('z', Modifiers::ctrl()));
    studio.push_event(InputEvent::key('z', Modifiers::ctrl()));
    assert_eq!(studio.process_events(), 1);
    assert!(studio.model().keypoints().is_empty());
    // no dataset, nothing to save
    assert_eq!(studio.save().map_err(|e| e.kind()), Err(ErrorKind::Other));
}

#[test]
fn test_open_dataset() -> LsResult<()> {
    let folder = get_test_folder().join("dataset");
    let mut studio = Studio::open_dataset(Cfg::default(), &folder, 640, 480)?;
    assert_eq!(studio.model().keypoints().len(), 2);
    assert_eq!(studio.model().next_keypoint_id(), 4);
    assert_eq!(studio.model().metadata().class_name(2), Some("lamp"));
    assert!((studio.controller().camera().fov() - 51.282_01).abs() < 1e-3);
    assert!(studio.step_playback());
    assert_eq!(
        studio.controller().camera().position(),
        Vec3::new(0.0, 0.0, -1.0)
    );
    studio.push_event(InputEvent::key('b', Modifiers::NONE));
    studio.process_events();
    assert_eq!(studio.controller().active_tool(), ToolId::BoundingBox);
    assert!(Studio::open_dataset(Cfg::default(), folder.join("missing"), 1, 1).is_err());
    Ok(())
}
