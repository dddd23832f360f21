use super::core::{facing_normal, frame_from_normal, Manipulate, Preview, ToolContext, ViewContext};
use crate::{
    annotations::{ClassId, Rectangle},
    commands::{AddRectangle, AnnotationRef, ChangeClassId, MoveRectangle, RemoveRectangle},
    events::{KeyCode, Modifiers},
    result::trace_ok_err,
    scene_model::Selection,
};
use labelstudio_domain::{
    glam::{Quat, Vec3},
    ray_plane,
};
use tracing::info;

pub const ACTOR_NAME: &str = "AddRectangle";

#[derive(Clone, Copy, Debug, PartialEq)]
enum Gesture {
    /// Spanning a new rectangle from `anchor` to the pointer in the tangent plane of the surface
    Span {
        anchor: Vec3,
        orientation: Quat,
        current: Vec3,
    },
    /// Moving an existing rectangle within its plane
    Move {
        start: Rectangle,
        current: Rectangle,
        grab_point: Vec3,
    },
}

/// Rectangle with the corners `anchor` and `corner` projected onto the plane given by
/// `orientation`. Degenerate spans yield `None`.
pub fn span_rectangle(
    class_id: ClassId,
    anchor: Vec3,
    corner: Vec3,
    orientation: Quat,
    min_dimension: f32,
) -> Option<Rectangle> {
    let local = (orientation.inverse() * (corner - anchor)).truncate();
    let size = local.abs();
    if size.x < min_dimension || size.y < min_dimension {
        return None;
    }
    let center = anchor + orientation * (local * 0.5).extend(0.0);
    Some(Rectangle::new(class_id, center, orientation, size))
}

/// Spans rectangles on surfaces and moves them with ctrl held.
#[derive(Clone, Copy, Debug, Default)]
pub struct RectangleTool {
    gesture: Option<Gesture>,
}

impl Manipulate for RectangleTool {
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
        if view.modifiers.ctrl {
            let Some((id, t)) = ctx.model.pick_rectangle(&ray) else {
                return false;
            };
            let Some(start) = ctx.model.get_rectangle(id).copied() else {
                return false;
            };
            self.gesture = Some(Gesture::Move {
                start,
                current: start,
                grab_point: ray.at(t),
            });
            let selection = ctx.model.selection();
            ctx.model.set_selection(Selection {
                rectangle: Some(id),
                ..selection
            });
            true
        } else {
            let Some(isct) = ctx.model.raytracer().query_ray(&ray) else {
                return false;
            };
            let orientation =
                frame_from_normal(facing_normal(&ray, &isct), view.camera.right_vector());
            self.gesture = Some(Gesture::Span {
                anchor: isct.point,
                orientation,
                current: isct.point,
            });
            true
        }
    }
    fn mouse_moved(&mut self, view: &ViewContext, _ctx: &mut ToolContext) -> bool {
        let Some(gesture) = &mut self.gesture else {
            return false;
        };
        let Some(ray) = trace_ok_err(view.pick_ray()) else {
            return true;
        };
        match gesture {
            Gesture::Span {
                anchor,
                orientation,
                current,
            } => {
                if let Some(t) = ray_plane(&ray, *anchor, *orientation * Vec3::Z) {
                    *current = ray.at(t);
                }
            }
            Gesture::Move {
                start,
                current,
                grab_point,
            } => {
                if let Some(t) = ray_plane(&ray, *grab_point, start.normal()) {
                    current.position = start.position + (ray.at(t) - *grab_point);
                }
            }
        }
        true
    }
    fn left_button_up(&mut self, _view: &ViewContext, ctx: &mut ToolContext) -> bool {
        match self.gesture.take() {
            Some(Gesture::Span {
                anchor,
                orientation,
                current,
            }) => {
                let min_dim = ctx.model.annotation_cfg().min_dimension;
                let rect = span_rectangle(ctx.class_id, anchor, current, orientation, min_dim)
                    .unwrap_or_else(|| {
                        let size = ctx.model.default_size(ctx.class_id).truncate();
                        Rectangle::new(ctx.class_id, anchor, orientation, size)
                    });
                info!("adding rectangle at {} of size {}", rect.position, rect.size);
                ctx.execute(AddRectangle::new(rect));
                true
            }
            Some(Gesture::Move { start, current, .. }) => {
                if start != current {
                    ctx.execute(MoveRectangle::new(
                        current.id,
                        current.position,
                        current.orientation,
                    ));
                }
                true
            }
            None => false,
        }
    }
    fn keypress(&mut self, key: KeyCode, _modifiers: Modifiers, ctx: &mut ToolContext) -> bool {
        let Some(active) = ctx.model.active_rectangle().copied() else {
            return false;
        };
        if let Some(class_id) = key.digit() {
            if class_id != active.class_id {
                ctx.execute(ChangeClassId::new(
                    AnnotationRef::Rectangle(active.id),
                    class_id,
                ));
            }
            true
        } else if key.is_delete() {
            self.gesture = None;
            ctx.execute(RemoveRectangle::new(active.id));
            true
        } else {
            false
        }
    }
    fn preview(&self) -> Preview {
        match self.gesture {
            Some(Gesture::Span {
                anchor,
                orientation,
                current,
            }) => span_rectangle(0, anchor, current, orientation, 0.0)
                .map_or(Preview::Point(anchor), Preview::Rectangle),
            Some(Gesture::Move { current, .. }) => Preview::Rectangle(current),
            None => Preview::None,
        }
    }
}

#[cfg(test)]
use labelstudio_domain::glam::Vec2;

#[test]
fn test_span_rectangle() {
    let rect = span_rectangle(
        2,
        Vec3::ZERO,
        Vec3::new(2.0, -1.0, 0.0),
        Quat::IDENTITY,
        1e-3,
    )
    .unwrap();
    assert_eq!(rect.class_id, 2);
    assert_eq!(rect.size, Vec2::new(2.0, 1.0));
    assert_eq!(rect.position, Vec3::new(1.0, -0.5, 0.0));
    assert!(span_rectangle(0, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY, 1e-3).is_none());
    // in a tilted plane
    let q = Quat::from_rotation_x(std::f32::consts::FRAC_PI_2);
    let rect = span_rectangle(0, Vec3::ZERO, q * Vec3::new(1.0, 1.0, 0.0), q, 1e-3).unwrap();
    assert!((rect.size - Vec2::ONE).length() < 1e-5);
    assert!((rect.normal() - Vec3::NEG_Y).length() < 1e-5);
}
