use crate::{
    annotations::ClassId,
    cfg::Cfg,
    commands::CommandStack,
    events::{InputEvent, KeyCode, Modifiers, MouseButton},
    scene_model::SceneModel,
    tools::{make_tool_vec, Mover, Preview, ToolContext, ToolId, ToolState, ViewContext},
};
use labelstudio_domain::{
    glam::{Quat, Vec2, Vec3},
    Camera,
};
use tracing::{debug, info};

/// Routes input events to the active tool. Pointer drags that the tool does not consume move
/// the camera.
#[derive(Clone, Debug)]
pub struct Controller {
    camera: Camera,
    width: f32,
    height: f32,
    pointer: Vec2,
    tools: Vec<ToolState>,
    active_tool: ToolId,
    class_id: ClassId,
    mover: Mover,
    cfg: Cfg,
}

macro_rules! view_ctx {
    ($self:expr, $modifiers:expr) => {
        ViewContext {
            camera: &$self.camera,
            width: $self.width,
            height: $self.height,
            pointer: $self.pointer,
            modifiers: $modifiers,
        }
    };
}

macro_rules! tool_ctx {
    ($self:expr, $model:expr, $stack:expr) => {
        ToolContext {
            model: $model,
            stack: $stack,
            cfg: &$self.cfg,
            class_id: $self.class_id,
        }
    };
}

impl Controller {
    pub fn new(cfg: Cfg, width: u32, height: u32) -> Self {
        let mut tools = make_tool_vec();
        let active_tool = ToolId::AddKeypoint;
        let mut model = SceneModel::default();
        let mut stack = CommandStack::new();
        let mut ctx = ToolContext {
            model: &mut model,
            stack: &mut stack,
            cfg: &cfg,
            class_id: 0,
        };
        for t in tools.iter_mut().filter(|t| t.id == active_tool) {
            t.activate(&mut ctx);
        }
        Self {
            camera: Camera::new(cfg.camera.fov),
            width: width.max(1) as f32,
            height: height.max(1) as f32,
            pointer: Vec2::ZERO,
            tools,
            active_tool,
            class_id: 0,
            mover: Mover::new(),
            cfg,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }
    pub fn viewport(&self) -> (f32, f32) {
        (self.width, self.height)
    }
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }
    pub fn active_tool(&self) -> ToolId {
        self.active_tool
    }
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }
    pub fn set_class_id(&mut self, class_id: ClassId) {
        self.class_id = class_id;
    }
    pub fn cfg(&self) -> &Cfg {
        &self.cfg
    }
    pub fn preview(&self) -> Preview {
        self.tools
            .iter()
            .find(|t| t.id == self.active_tool)
            .map_or(Preview::None, ToolState::preview)
    }

    /// Looks at the center of the scene geometry from the direction of the origin, where
    /// scanning apps usually start recording.
    pub fn reset_camera(&mut self, model: &SceneModel) {
        let mean = model.geometry().map_or(Vec3::ZERO, |g| g.mean());
        let position = -mean.try_normalize().unwrap_or(Vec3::NEG_Z);
        self.camera.reset(mean, position);
    }

    fn active_tool_idx(&self) -> Option<usize> {
        self.tools.iter().position(|t| t.id == self.active_tool)
    }

    /// Deactivates the current tool, which drops its gesture, and activates `tool_id`.
    pub fn switch_tool(
        &mut self,
        tool_id: ToolId,
        model: &mut SceneModel,
        stack: &mut CommandStack,
    ) {
        if tool_id == self.active_tool {
            return;
        }
        let mut ctx = tool_ctx!(self, model, stack);
        for t in self.tools.iter_mut() {
            if t.id == self.active_tool {
                t.deactivate(&mut ctx);
            }
        }
        for t in self.tools.iter_mut() {
            if t.id == tool_id {
                t.activate(&mut ctx);
            }
        }
        self.active_tool = tool_id;
    }

    /// Drops the gesture of the active tool and a pending camera drag. Needed whenever the
    /// model changes outside of the tools, e.g., on undo, since gestures refer to annotation ids.
    pub fn cancel_gesture(&mut self, model: &mut SceneModel, stack: &mut CommandStack) {
        self.mover.move_mouse_released();
        if let Some(idx) = self.active_tool_idx() {
            let mut ctx = tool_ctx!(self, model, stack);
            let tool = &mut self.tools[idx];
            tool.deactivate(&mut ctx);
            tool.activate(&mut ctx);
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1) as f32;
        self.height = height.max(1) as f32;
    }

    pub fn left_button_down(
        &mut self,
        pos: Vec2,
        modifiers: Modifiers,
        model: &mut SceneModel,
        stack: &mut CommandStack,
    ) -> bool {
        self.pointer = pos;
        if let Some(idx) = self.active_tool_idx() {
            let view = view_ctx!(self, modifiers);
            let mut ctx = tool_ctx!(self, model, stack);
            if self.tools[idx].left_button_down(&view, &mut ctx) {
                return true;
            }
        }
        self.mover.move_mouse_pressed(pos);
        true
    }

    /// A click that did not move the pointer goes to the tool. Releasing a camera drag does not.
    pub fn left_button_up(
        &mut self,
        pos: Vec2,
        modifiers: Modifiers,
        model: &mut SceneModel,
        stack: &mut CommandStack,
    ) -> bool {
        self.pointer = pos;
        let moved = self.mover.move_mouse_released();
        if moved {
            return false;
        }
        match self.active_tool_idx() {
            Some(idx) => {
                let view = view_ctx!(self, modifiers);
                let mut ctx = tool_ctx!(self, model, stack);
                self.tools[idx].left_button_up(&view, &mut ctx)
            }
            None => false,
        }
    }

    pub fn mouse_moved(
        &mut self,
        pos: Vec2,
        modifiers: Modifiers,
        model: &mut SceneModel,
        stack: &mut CommandStack,
    ) -> bool {
        self.pointer = pos;
        if let Some(idx) = self.active_tool_idx() {
            let view = view_ctx!(self, modifiers);
            let mut ctx = tool_ctx!(self, model, stack);
            if self.tools[idx].mouse_moved(&view, &mut ctx) {
                return true;
            }
        }
        let (width, height) = (self.width, self.height);
        let orbit_speed = self.cfg.camera.orbit_speed;
        let pan_speed = self.cfg.camera.pan_speed;
        let camera = &mut self.camera;
        self.mover.move_mouse_held(
            |from, to| {
                let diff = to - from;
                if modifiers.ctrl {
                    camera.translate(Vec3::new(
                        -diff.x / width * pan_speed,
                        diff.y / height * pan_speed,
                        0.0,
                    ));
                } else {
                    let q = Quat::from_axis_angle(Vec3::Y, diff.x * orbit_speed)
                        * Quat::from_axis_angle(Vec3::X, diff.y * orbit_speed);
                    camera.rotate_around_target(q);
                }
            },
            pos,
        );
        true
    }

    /// Zooms towards the lookat point but not closer than the configured minimum distance.
    pub fn scroll(&mut self, offset: Vec2) -> bool {
        let delta = offset.y * self.cfg.camera.zoom_speed;
        let max_delta = self.camera.distance_to_lookat() - self.cfg.camera.min_distance;
        let delta = delta.min(max_delta.max(0.0));
        debug!("zoom by {delta}");
        self.camera.zoom(delta);
        true
    }

    /// Tool keys switch tools. Digits the tool does not consume set the class of new
    /// annotations.
    pub fn keypress(
        &mut self,
        key: KeyCode,
        modifiers: Modifiers,
        model: &mut SceneModel,
        stack: &mut CommandStack,
    ) -> bool {
        if let KeyCode::Char(c) = key {
            if !modifiers.any() {
                if let Some(tool_id) = ToolId::from_key(c) {
                    self.switch_tool(tool_id, model, stack);
                    return true;
                }
            }
        }
        let consumed = match self.active_tool_idx() {
            Some(idx) => {
                let mut ctx = tool_ctx!(self, model, stack);
                self.tools[idx].keypress(key, modifiers, &mut ctx)
            }
            None => false,
        };
        if consumed {
            return true;
        }
        match key.digit() {
            Some(class_id) if !modifiers.any() => {
                info!("current class id {class_id}");
                self.class_id = class_id;
                true
            }
            _ => false,
        }
    }

    /// Returns whether the event has been used.
    pub fn handle(
        &mut self,
        event: InputEvent,
        model: &mut SceneModel,
        stack: &mut CommandStack,
    ) -> bool {
        match event {
            InputEvent::PointerDown {
                pos,
                button: MouseButton::Left,
                modifiers,
            } => self.left_button_down(pos, modifiers, model, stack),
            InputEvent::PointerUp {
                pos,
                button: MouseButton::Left,
                modifiers,
            } => self.left_button_up(pos, modifiers, model, stack),
            InputEvent::PointerDown { pos, .. } | InputEvent::PointerUp { pos, .. } => {
                self.pointer = pos;
                false
            }
            InputEvent::PointerMove { pos, modifiers } => {
                self.mouse_moved(pos, modifiers, model, stack)
            }
            InputEvent::Scroll { offset, .. } => self.scroll(offset),
            InputEvent::KeyPress { key, modifiers } => self.keypress(key, modifiers, model, stack),
            InputEvent::Resize { width, height } => {
                self.resize(width, height);
                true
            }
        }
    }
}

#[cfg(test)]
use {
    crate::{annotations::Keypoint, commands::AddKeypoint},
    labelstudio_domain::{glam::Mat4, Geometry, PointCloud, TriangleMesh},
    std::f32::consts::PI,
};

#[cfg(test)]
fn make_scene() -> (Controller, SceneModel, CommandStack) {
    let mut model = SceneModel::default();
    model.set_geometry(Geometry::PointCloud(PointCloud::new(
        vec![Vec3::ZERO],
        Mat4::IDENTITY,
    )));
    let mut ctrl = Controller::new(Cfg::default(), 500, 500);
    ctrl.camera_mut()
        .reset(Vec3::ZERO, Vec3::new(0.0, 0.0, 0.2));
    (ctrl, model, CommandStack::new())
}

#[test]
fn test_click_adds_keypoint() {
    let (mut ctrl, mut model, mut stack) = make_scene();
    assert_eq!(ctrl.active_tool(), ToolId::AddKeypoint);
    ctrl.mouse_moved(Vec2::new(249.5, 249.5), Modifiers::NONE, &mut model, &mut stack);
    assert!(matches!(ctrl.preview(), Preview::Point(_)));
    ctrl.left_button_down(Vec2::new(249.5, 249.5), Modifiers::NONE, &mut model, &mut stack);
    assert!(ctrl.left_button_up(Vec2::new(249.5, 249.5), Modifiers::NONE, &mut model, &mut stack));
    assert_eq!(model.keypoints().len(), 1);
    assert!(model.keypoints()[0].position.length() < 1e-6);
    // a click into the void does nothing
    assert!(!ctrl.left_button_up(Vec2::new(10.0, 10.0), Modifiers::NONE, &mut model, &mut stack));
    assert_eq!(stack.len(), 1);
}

#[test]
fn test_drag_orbits_without_adding() {
    let (mut ctrl, mut model, mut stack) = make_scene();
    let before = *ctrl.camera();
    ctrl.left_button_down(Vec2::new(249.5, 249.5), Modifiers::NONE, &mut model, &mut stack);
    ctrl.mouse_moved(Vec2::new(259.5, 249.5), Modifiers::NONE, &mut model, &mut stack);
    assert!(!ctrl.left_button_up(Vec2::new(259.5, 249.5), Modifiers::NONE, &mut model, &mut stack));
    assert!(model.keypoints().is_empty());
    let cam = ctrl.camera();
    assert!((cam.distance_to_lookat() - 0.2).abs() < 1e-5);
    let angle = before.forward_vector().angle_between(cam.forward_vector());
    assert!((angle - 10.0 * PI / 2000.0).abs() < 1e-4);
    assert!((cam.orientation().length() - 1.0).abs() < 1e-5);
}

#[test]
fn test_pan_and_zoom() {
    let (mut ctrl, mut model, mut stack) = make_scene();
    ctrl.left_button_down(Vec2::new(100.0, 100.0), Modifiers::ctrl(), &mut model, &mut stack);
    ctrl.mouse_moved(Vec2::new(150.0, 100.0), Modifiers::ctrl(), &mut model, &mut stack);
    ctrl.left_button_up(Vec2::new(150.0, 100.0), Modifiers::ctrl(), &mut model, &mut stack);
    assert!((ctrl.camera().lookat() - Vec3::new(-0.1, 0.0, 0.0)).length() < 1e-5);
    assert!((ctrl.camera().position() - Vec3::new(-0.1, 0.0, 0.2)).length() < 1e-5);

    ctrl.scroll(Vec2::new(0.0, 1.0));
    assert!((ctrl.camera().distance_to_lookat() - 0.15).abs() < 1e-5);
    for _ in 0..10 {
        ctrl.scroll(Vec2::new(0.0, 1.0));
    }
    assert!((ctrl.camera().distance_to_lookat() - ctrl.cfg().camera.min_distance).abs() < 1e-5);
    ctrl.scroll(Vec2::new(0.0, -2.0));
    assert!((ctrl.camera().distance_to_lookat() - 0.15).abs() < 1e-5);
}

#[test]
fn test_switch_tools_and_classes() {
    let (mut ctrl, mut model, mut stack) = make_scene();
    stack.execute(
        AddKeypoint::new(Keypoint::new(0, Vec3::ZERO)).into(),
        &mut model,
    );
    assert!(ctrl.keypress(KeyCode::from_char('v'), Modifiers::NONE, &mut model, &mut stack));
    assert_eq!(ctrl.active_tool(), ToolId::MoveKeypoint);
    assert!(ctrl.keypress(KeyCode::Char('3'), Modifiers::NONE, &mut model, &mut stack));
    assert_eq!(ctrl.class_id(), 3);
    assert!(ctrl.keypress(KeyCode::Delete, Modifiers::NONE, &mut model, &mut stack));
    assert!(model.keypoints().is_empty());
    assert!(ctrl.keypress(KeyCode::from_char('b'), Modifiers::NONE, &mut model, &mut stack));
    assert!(ctrl.keypress(KeyCode::from_char('r'), Modifiers::NONE, &mut model, &mut stack));
    assert_eq!(ctrl.active_tool(), ToolId::AddRectangle);
    assert!(!ctrl.keypress(KeyCode::from_char('x'), Modifiers::NONE, &mut model, &mut stack));
}

#[cfg(test)]
fn make_plane_scene() -> (Controller, SceneModel, CommandStack) {
    let mut model = SceneModel::default();
    let mut stack = CommandStack::new();
    // plane z = 0 spanning [-1, 1]^2
    model.set_geometry(Geometry::Mesh(
        TriangleMesh::new(
            vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
            Mat4::IDENTITY,
        )
        .unwrap(),
    ));
    stack.execute(
        AddKeypoint::new(Keypoint::new(0, Vec3::ZERO)).into(),
        &mut model,
    );
    let mut ctrl = Controller::new(Cfg::default(), 500, 500);
    ctrl.camera_mut().reset(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0));
    ctrl.switch_tool(ToolId::MoveKeypoint, &mut model, &mut stack);
    (ctrl, model, stack)
}

#[test]
fn test_move_keypoint_drag() {
    let (mut ctrl, mut model, mut stack) = make_plane_scene();
    let center = Vec2::new(249.5, 249.5);
    assert!(ctrl.left_button_down(center + Vec2::new(3.0, 0.0), Modifiers::NONE, &mut model, &mut stack));
    assert!(ctrl.mouse_moved(Vec2::new(300.0, 249.5), Modifiers::NONE, &mut model, &mut stack));
    assert!(matches!(ctrl.preview(), Preview::Point(_)));
    assert!(ctrl.left_button_up(Vec2::new(300.0, 249.5), Modifiers::NONE, &mut model, &mut stack));
    let kp = model.keypoints()[0];
    assert!(kp.position.x > 0.05);
    assert!(kp.position.y.abs() < 1e-3);
    assert_eq!(stack.len(), 2);
    stack.undo(&mut model);
    assert_eq!(model.keypoints()[0].position, Vec3::ZERO);
}

#[test]
fn test_cancel_gesture() {
    let (mut ctrl, mut model, mut stack) = make_plane_scene();
    let center = Vec2::new(249.5, 249.5);
    assert!(ctrl.left_button_down(center, Modifiers::NONE, &mut model, &mut stack));
    ctrl.mouse_moved(Vec2::new(300.0, 249.5), Modifiers::NONE, &mut model, &mut stack);
    assert!(matches!(ctrl.preview(), Preview::Point(_)));
    ctrl.cancel_gesture(&mut model, &mut stack);
    assert_eq!(ctrl.preview(), Preview::None);
    assert_eq!(ctrl.active_tool(), ToolId::MoveKeypoint);
    ctrl.left_button_up(Vec2::new(300.0, 249.5), Modifiers::NONE, &mut model, &mut stack);
    assert_eq!(model.keypoints()[0].position, Vec3::ZERO);
    assert_eq!(stack.len(), 1);

    // a camera drag is dropped as well
    let before = *ctrl.camera();
    ctrl.left_button_down(Vec2::new(10.0, 10.0), Modifiers::NONE, &mut model, &mut stack);
    ctrl.cancel_gesture(&mut model, &mut stack);
    ctrl.mouse_moved(Vec2::new(60.0, 10.0), Modifiers::NONE, &mut model, &mut stack);
    assert_eq!(ctrl.camera().position(), before.position());
}
