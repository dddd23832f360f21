use super::core::{Manipulate, Preview, ToolContext, ViewContext};
use crate::{annotations::Keypoint, commands::AddKeypoint};
use labelstudio_domain::glam::Vec3;
use tracing::info;

pub const ACTOR_NAME: &str = "AddKeypoint";

/// Places a keypoint on the surface under the pointer on click.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddKeypointTool {
    hovered: Option<Vec3>,
}

impl Manipulate for AddKeypointTool {
    fn new() -> Self {
        Self::default()
    }
    fn on_deactivate(&mut self, _ctx: &mut ToolContext) {
        self.hovered = None;
    }
    fn mouse_moved(&mut self, view: &ViewContext, ctx: &mut ToolContext) -> bool {
        self.hovered = view.pick_surface(ctx.model).map(|(_, isct)| isct.point);
        false
    }
    fn left_button_up(&mut self, view: &ViewContext, ctx: &mut ToolContext) -> bool {
        self.hovered = view.pick_surface(ctx.model).map(|(_, isct)| isct.point);
        match self.hovered {
            Some(p) => {
                info!("adding keypoint at {p}");
                ctx.execute(AddKeypoint::new(Keypoint::new(ctx.class_id, p)));
                true
            }
            None => false,
        }
    }
    fn preview(&self) -> Preview {
        self.hovered.map_or(Preview::None, Preview::Point)
    }
}
