use super::core::{Manipulate, Preview, ToolContext, ViewContext};
use crate::{
    annotations::{BoundingBox, Id},
    commands::{
        AddBoundingBox, AnnotationRef, ChangeClassId, MoveBoundingBox, RemoveBoundingBox,
        ResizeBoundingBox,
    },
    events::{KeyCode, Modifiers},
    result::trace_ok_err,
    scene_model::Selection,
};
use labelstudio_domain::{
    closest_on_line_to_ray,
    glam::{Quat, Vec3},
    ray_plane, BoxFace, Ray,
};
use tracing::info;

pub const ACTOR_NAME: &str = "BoundingBox";

#[derive(Clone, Copy, Debug, PartialEq)]
enum Gesture {
    /// The box follows the pointer on a plane facing the camera through the grab point.
    Move {
        start: BoundingBox,
        current: BoundingBox,
        grab_point: Vec3,
        plane_normal: Vec3,
    },
    /// One face follows the pointer along its normal, the opposite face stays.
    Resize {
        start: BoundingBox,
        current: BoundingBox,
        face: BoxFace,
    },
}
impl Gesture {
    fn current(&self) -> &BoundingBox {
        match self {
            Self::Move { current, .. } | Self::Resize { current, .. } => current,
        }
    }
}

/// Box after dragging `face` of `start` to the point on its axis closest to `ray`
pub fn resize_along_face(
    start: &BoundingBox,
    face: BoxFace,
    ray: &Ray,
    min_dimension: f32,
) -> Option<BoundingBox> {
    let obb = start.to_oriented_box();
    let axis = obb.axis(face.axis) * face.sign();
    let half = start.dimensions[face.axis] * 0.5;
    let face_center = start.position + axis * half;
    let opposite_center = start.position - axis * half;
    let s = closest_on_line_to_ray(ray, face_center, axis)?;
    let new_dim = (2.0 * half + s).max(min_dimension);
    let mut dimensions = start.dimensions;
    dimensions[face.axis] = new_dim;
    Some(BoundingBox {
        position: opposite_center + axis * (new_dim * 0.5),
        dimensions,
        ..*start
    })
}

/// Creates boxes on the surface, moves, resizes, and rotates them.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoundingBoxTool {
    gesture: Option<Gesture>,
}

impl BoundingBoxTool {
    fn select(ctx: &mut ToolContext, id: Id) {
        let selection = ctx.model.selection();
        ctx.model.set_selection(Selection {
            bounding_box: Some(id),
            ..selection
        });
    }
}

impl Manipulate for BoundingBoxTool {
    fn new() -> Self {
        Self::default()
    }
    fn on_deactivate(&mut self, _ctx: &mut ToolContext) {
        self.gesture = None;
    }
    fn left_button_down(&mut self, view: &ViewContext, ctx: &mut ToolContext) -> bool {
        let Some(ray) = trace_ok_err(view.pick_ray()) else {
            return false;
        };
        let Some((id, hit)) = ctx.model.pick_bounding_box(&ray) else {
            return false;
        };
        let Some(start) = ctx.model.get_bounding_box(id).copied() else {
            return false;
        };
        self.gesture = Some(if view.modifiers.shift {
            Gesture::Resize {
                start,
                current: start,
                face: hit.face,
            }
        } else {
            Gesture::Move {
                start,
                current: start,
                grab_point: ray.at(hit.distance),
                plane_normal: -view.camera.forward_vector(),
            }
        });
        Self::select(ctx, id);
        true
    }
    fn mouse_moved(&mut self, view: &ViewContext, ctx: &mut ToolContext) -> bool {
        let Some(gesture) = &mut self.gesture else {
            return false;
        };
        let Some(ray) = trace_ok_err(view.pick_ray()) else {
            return true;
        };
        match gesture {
            Gesture::Move {
                start,
                current,
                grab_point,
                plane_normal,
            } => {
                if let Some(t) = ray_plane(&ray, *grab_point, *plane_normal) {
                    current.position = start.position + (ray.at(t) - *grab_point);
                }
            }
            Gesture::Resize {
                start,
                current,
                face,
            } => {
                let min_dim = ctx.model.annotation_cfg().min_dimension;
                if let Some(resized) = resize_along_face(start, *face, &ray, min_dim) {
                    *current = resized;
                }
            }
        }
        true
    }
    fn left_button_up(&mut self, view: &ViewContext, ctx: &mut ToolContext) -> bool {
        match self.gesture.take() {
            Some(Gesture::Move { start, current, .. }) => {
                if start != current {
                    ctx.execute(MoveBoundingBox::new(
                        current.id,
                        current.position,
                        current.orientation,
                    ));
                }
                true
            }
            Some(Gesture::Resize { start, current, .. }) => {
                if start != current {
                    ctx.execute(ResizeBoundingBox::new(
                        current.id,
                        current.dimensions,
                        current.position,
                    ));
                }
                true
            }
            None => match view.pick_surface(ctx.model) {
                Some((_, isct)) => {
                    let size = ctx.model.default_size(ctx.class_id);
                    info!("adding bounding box at {}", isct.point);
                    ctx.execute(AddBoundingBox::new(BoundingBox::new(
                        ctx.class_id,
                        isct.point,
                        Quat::IDENTITY,
                        size,
                    )));
                    true
                }
                None => false,
            },
        }
    }
    fn keypress(&mut self, key: KeyCode, _modifiers: Modifiers, ctx: &mut ToolContext) -> bool {
        let Some(active) = ctx.model.active_bounding_box().copied() else {
            return false;
        };
        let step = ctx.cfg.annotation.rotation_step_degrees.to_radians();
        let rotation = if key.is_char('Q') {
            Some(Quat::from_rotation_z(step))
        } else if key.is_char('E') {
            Some(Quat::from_rotation_z(-step))
        } else {
            None
        };
        if let Some(rotation) = rotation {
            self.gesture = None;
            ctx.execute(MoveBoundingBox::new(
                active.id,
                active.position,
                (active.orientation * rotation).normalize(),
            ));
            true
        } else if let Some(class_id) = key.digit() {
            if class_id != active.class_id {
                ctx.execute(ChangeClassId::new(
                    AnnotationRef::BoundingBox(active.id),
                    class_id,
                ));
            }
            true
        } else if key.is_delete() {
            self.gesture = None;
            ctx.execute(RemoveBoundingBox::new(active.id));
            true
        } else {
            false
        }
    }
    fn preview(&self) -> Preview {
        self.gesture
            .map_or(Preview::None, |g| Preview::BoundingBox(*g.current()))
    }
}

#[test]
fn test_resize_along_face() -> crate::result::LsResult<()> {
    let start = BoundingBox::new(0, Vec3::ZERO, Quat::IDENTITY, Vec3::new(2.0, 1.0, 1.0));
    let face = BoxFace {
        axis: 0,
        positive: true,
    };
    // ray crossing the x-axis at x = 3
    let ray = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z)?;
    let resized = resize_along_face(&start, face, &ray, 1e-3).unwrap();
    assert!((resized.dimensions.x - 4.0).abs() < 1e-5);
    assert!((resized.position.x - 1.0).abs() < 1e-5);
    assert_eq!(resized.dimensions.y, 1.0);
    // dragging the negative face beyond the opposite one clamps the box
    let face = BoxFace {
        axis: 0,
        positive: false,
    };
    let resized = resize_along_face(&start, face, &ray, 1e-3).unwrap();
    assert!((resized.dimensions.x - 1e-3).abs() < 1e-6);
    assert!((resized.position.x - (1.0 - 5e-4)).abs() < 1e-5);
    Ok(())
}
