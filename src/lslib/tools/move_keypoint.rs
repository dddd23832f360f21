use super::core::{Manipulate, Preview, ToolContext, ViewContext};
use crate::{
    annotations::Id,
    commands::{MoveKeypoint, RemoveKeypoint},
    events::{KeyCode, Modifiers},
    scene_model::{SceneModel, Selection},
};
use labelstudio_domain::glam::Vec3;

pub const ACTOR_NAME: &str = "MoveKeypoint";

#[derive(Clone, Copy, Debug, PartialEq)]
struct Drag {
    id: Id,
    start: Vec3,
    current: Vec3,
}

/// Drags keypoints along the surface. Keypoints are grabbed if they are close to the pointer on
/// screen.
#[derive(Clone, Copy, Debug, Default)]
pub struct MoveKeypointTool {
    drag: Option<Drag>,
}

/// Keypoint closest to the pointer on screen within `radius_px`
fn keypoint_under_pointer(view: &ViewContext, model: &SceneModel, radius_px: f32) -> Option<Id> {
    model
        .keypoints()
        .iter()
        .filter_map(|kp| {
            view.to_pixel(kp.position)
                .map(|px| (kp.id, px.distance(view.pointer)))
        })
        .filter(|(_, dist)| *dist <= radius_px)
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(id, _)| id)
}

impl Manipulate for MoveKeypointTool {
    fn new() -> Self {
        Self::default()
    }
    fn on_deactivate(&mut self, _ctx: &mut ToolContext) {
        self.drag = None;
    }
    fn left_button_down(&mut self, view: &ViewContext, ctx: &mut ToolContext) -> bool {
        let radius = ctx.cfg.picking.keypoint_radius_px;
        let Some(id) = keypoint_under_pointer(view, ctx.model, radius) else {
            return false;
        };
        let Some(kp) = ctx.model.get_keypoint(id) else {
            return false;
        };
        self.drag = Some(Drag {
            id,
            start: kp.position,
            current: kp.position,
        });
        let selection = ctx.model.selection();
        ctx.model.set_selection(Selection {
            keypoint: Some(id),
            ..selection
        });
        true
    }
    fn mouse_moved(&mut self, view: &ViewContext, ctx: &mut ToolContext) -> bool {
        match &mut self.drag {
            Some(drag) => {
                if let Some((_, isct)) = view.pick_surface(ctx.model) {
                    drag.current = isct.point;
                }
                true
            }
            None => false,
        }
    }
    fn left_button_up(&mut self, _view: &ViewContext, ctx: &mut ToolContext) -> bool {
        match self.drag.take() {
            Some(drag) => {
                if drag.current != drag.start {
                    ctx.execute(MoveKeypoint::new(drag.id, drag.current));
                }
                true
            }
            None => false,
        }
    }
    fn keypress(&mut self, key: KeyCode, _modifiers: Modifiers, ctx: &mut ToolContext) -> bool {
        if key.is_delete() {
            if let Some(id) = ctx.model.selection().keypoint {
                self.drag = None;
                ctx.execute(RemoveKeypoint::new(id));
                return true;
            }
        }
        false
    }
    fn preview(&self) -> Preview {
        self.drag.map_or(Preview::None, |d| Preview::Point(d.current))
    }
}
