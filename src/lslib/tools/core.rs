use crate::{
    annotations::{BoundingBox, ClassId, Rectangle},
    cfg::Cfg,
    commands::{CommandKind, CommandStack},
    events::{KeyCode, Modifiers},
    result::{trace_ok_err, LsResult},
    scene_model::SceneModel,
};
use labelstudio_domain::{
    glam::{Mat3, Quat, Vec2, Vec3},
    Camera, Intersection, Ray,
};

/// What the user sees and where the pointer is
#[derive(Clone, Copy, Debug)]
pub struct ViewContext<'a> {
    pub camera: &'a Camera,
    pub width: f32,
    pub height: f32,
    pub pointer: Vec2,
    pub modifiers: Modifiers,
}
impl<'a> ViewContext<'a> {
    pub fn pick_ray(&self) -> LsResult<Ray> {
        Ray::new(
            self.camera.position(),
            self.camera.compute_ray_world(self.width, self.height, self.pointer.x, self.pointer.y),
        )
    }
    pub fn to_pixel(&self, p: Vec3) -> Option<Vec2> {
        self.camera.project_to_pixel(p, self.width, self.height)
    }
    /// Traces the pick ray against the scene geometry, errors are logged.
    pub fn pick_surface(&self, model: &SceneModel) -> Option<(Ray, Intersection)> {
        let ray = trace_ok_err(self.pick_ray())?;
        let isct = model.raytracer().query_ray(&ray)?;
        Some((ray, isct))
    }
}

/// State tools may read and change. Changes of annotations go through the command stack.
pub struct ToolContext<'a> {
    pub model: &'a mut SceneModel,
    pub stack: &'a mut CommandStack,
    pub cfg: &'a Cfg,
    /// class of newly created annotations
    pub class_id: ClassId,
}
impl<'a> ToolContext<'a> {
    pub fn execute(&mut self, command: impl Into<CommandKind>) {
        self.stack.execute(command.into(), self.model);
    }
}

/// In-progress gestures that a renderer might want to show
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Preview {
    #[default]
    None,
    Point(Vec3),
    BoundingBox(BoundingBox),
    Rectangle(Rectangle),
}

/// Tools interpret pointer and key events. The event methods return `true` if the event has
/// been consumed, otherwise the controller might use it, e.g., to move the camera.
pub trait Manipulate {
    fn new() -> Self
    where
        Self: Sized;

    fn on_activate(&mut self, _ctx: &mut ToolContext) {}
    /// In-progress gestures are dropped without committing anything.
    fn on_deactivate(&mut self, _ctx: &mut ToolContext) {}
    fn left_button_down(&mut self, _view: &ViewContext, _ctx: &mut ToolContext) -> bool {
        false
    }
    fn left_button_up(&mut self, _view: &ViewContext, _ctx: &mut ToolContext) -> bool {
        false
    }
    fn mouse_moved(&mut self, _view: &ViewContext, _ctx: &mut ToolContext) -> bool {
        false
    }
    fn keypress(&mut self, _key: KeyCode, _modifiers: Modifiers, _ctx: &mut ToolContext) -> bool {
        false
    }
    fn preview(&self) -> Preview {
        Preview::None
    }
}

/// Tracks the pointer while a button is held.
#[derive(Clone, Copy, Debug, Default)]
pub struct Mover {
    mouse_pos_start: Option<Vec2>,
    moved: bool,
}
impl Mover {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn move_mouse_pressed(&mut self, mouse_pos: Vec2) {
        self.mouse_pos_start = Some(mouse_pos);
        self.moved = false;
    }
    /// Calls `f_move` with the previous and the current pointer position if the button is held.
    pub fn move_mouse_held<T, F: FnOnce(Vec2, Vec2) -> T>(
        &mut self,
        f_move: F,
        mouse_pos: Vec2,
    ) -> Option<T> {
        let mp_from = self.mouse_pos_start?;
        if mp_from == mouse_pos {
            return None;
        }
        self.moved = true;
        self.mouse_pos_start = Some(mouse_pos);
        Some(f_move(mp_from, mouse_pos))
    }
    /// Returns whether the pointer has moved since the button was pressed.
    pub fn move_mouse_released(&mut self) -> bool {
        let moved = self.moved;
        self.mouse_pos_start = None;
        self.moved = false;
        moved
    }
    pub fn is_held(&self) -> bool {
        self.mouse_pos_start.is_some()
    }
}

/// Rotation with `normal` as local z-axis and a local x-axis that is as close to `tangent_hint`
/// as possible.
pub fn frame_from_normal(normal: Vec3, tangent_hint: Vec3) -> Quat {
    let z = normal.try_normalize().unwrap_or(Vec3::Z);
    let x = (tangent_hint - z * tangent_hint.dot(z))
        .try_normalize()
        .unwrap_or_else(|| z.any_orthonormal_vector());
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize()
}

/// Surface normal facing the viewer. Point clouds have no normals, then the ray is used.
pub fn facing_normal(ray: &Ray, isct: &Intersection) -> Vec3 {
    isct.normal.unwrap_or(-ray.direction())
}

#[test]
fn test_mover() {
    let mut mover = Mover::new();
    assert_eq!(mover.move_mouse_held(|a, b| b - a, Vec2::ONE), None);
    mover.move_mouse_pressed(Vec2::new(10.0, 10.0));
    assert!(mover.is_held());
    assert_eq!(mover.move_mouse_held(|a, b| b - a, Vec2::new(10.0, 10.0)), None);
    assert_eq!(
        mover.move_mouse_held(|a, b| b - a, Vec2::new(12.0, 9.0)),
        Some(Vec2::new(2.0, -1.0))
    );
    assert_eq!(
        mover.move_mouse_held(|a, b| b - a, Vec2::new(13.0, 9.0)),
        Some(Vec2::new(1.0, 0.0))
    );
    assert!(mover.move_mouse_released());
    assert!(!mover.is_held());
    mover.move_mouse_pressed(Vec2::ZERO);
    assert!(!mover.move_mouse_released());
}

#[test]
fn test_frame_from_normal() {
    let q = frame_from_normal(Vec3::Y, Vec3::X);
    assert!((q * Vec3::Z - Vec3::Y).length() < 1e-6);
    assert!((q * Vec3::X - Vec3::X).length() < 1e-6);
    // hint parallel to the normal
    let q = frame_from_normal(Vec3::Z, Vec3::Z);
    assert!((q * Vec3::Z - Vec3::Z).length() < 1e-6);
    assert!((q.length() - 1.0).abs() < 1e-6);
}
