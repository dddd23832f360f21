mod add_keypoint;
mod bbox;
mod core;
mod move_keypoint;
mod rectangle;

pub use self::core::{
    facing_normal, frame_from_normal, Manipulate, Mover, Preview, ToolContext, ViewContext,
};
pub use add_keypoint::AddKeypointTool;
pub use bbox::{resize_along_face, BoundingBoxTool};
pub use move_keypoint::MoveKeypointTool;
pub use rectangle::{span_rectangle, RectangleTool};
use tracing::info;

pub const ADD_KEYPOINT_NAME: &str = add_keypoint::ACTOR_NAME;
pub const MOVE_KEYPOINT_NAME: &str = move_keypoint::ACTOR_NAME;
pub const BBOX_NAME: &str = bbox::ACTOR_NAME;
pub const RECTANGLE_NAME: &str = rectangle::ACTOR_NAME;

macro_rules! make_tools {
($(($tool:ident, $id:ident, $name:expr, $key:expr)),+) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum ToolId {
            $($id),+
        }
        impl ToolId {
            #[must_use]
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$id => $name),+
                }
            }
            /// Key that activates the tool
            #[must_use]
            pub fn key(&self) -> char {
                match self {
                    $(Self::$id => $key),+
                }
            }
            #[must_use]
            pub fn from_key(key: char) -> Option<Self> {
                $(if key.to_ascii_uppercase() == $key {
                    return Some(Self::$id);
                })+
                None
            }
        }
        #[derive(Clone, Debug)]
        pub enum ToolWrapper {
            $($tool($tool)),+
        }
        #[must_use]
        pub fn make_tool_vec() -> Vec<ToolState> {
            vec![$(
                ToolState {
                    tool_wrapper: ToolWrapper::$tool($tool::new()),
                    is_active: false,
                    id: ToolId::$id,
                }),+]
        }
    };
}
make_tools!(
    (AddKeypointTool, AddKeypoint, ADD_KEYPOINT_NAME, 'K'),
    (MoveKeypointTool, MoveKeypoint, MOVE_KEYPOINT_NAME, 'V'),
    (BoundingBoxTool, BoundingBox, BBOX_NAME, 'B'),
    (RectangleTool, AddRectangle, RECTANGLE_NAME, 'R')
);

#[macro_export]
macro_rules! apply_tool_method_mut {
    ($tool_state:expr, $f:ident, $($args:expr),*) => {
        match &mut $tool_state.tool_wrapper {
            ToolWrapper::AddKeypointTool(z) => z.$f($($args,)*),
            ToolWrapper::MoveKeypointTool(z) => z.$f($($args,)*),
            ToolWrapper::BoundingBoxTool(z) => z.$f($($args,)*),
            ToolWrapper::RectangleTool(z) => z.$f($($args,)*),
        }
    };
}

#[derive(Clone, Debug)]
pub struct ToolState {
    pub tool_wrapper: ToolWrapper,
    is_active: bool,
    pub id: ToolId,
}
impl ToolState {
    pub fn activate(&mut self, ctx: &mut ToolContext) {
        info!("activate {}", self.id.name());
        self.is_active = true;
        apply_tool_method_mut!(self, on_activate, ctx);
    }
    pub fn deactivate(&mut self, ctx: &mut ToolContext) {
        if self.is_active {
            info!("deactivate {}", self.id.name());
            apply_tool_method_mut!(self, on_deactivate, ctx);
        }
        self.is_active = false;
    }
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }
    pub fn left_button_down(&mut self, view: &ViewContext, ctx: &mut ToolContext) -> bool {
        apply_tool_method_mut!(self, left_button_down, view, ctx)
    }
    pub fn left_button_up(&mut self, view: &ViewContext, ctx: &mut ToolContext) -> bool {
        apply_tool_method_mut!(self, left_button_up, view, ctx)
    }
    pub fn mouse_moved(&mut self, view: &ViewContext, ctx: &mut ToolContext) -> bool {
        apply_tool_method_mut!(self, mouse_moved, view, ctx)
    }
    pub fn keypress(
        &mut self,
        key: crate::events::KeyCode,
        modifiers: crate::events::Modifiers,
        ctx: &mut ToolContext,
    ) -> bool {
        apply_tool_method_mut!(self, keypress, key, modifiers, ctx)
    }
    #[must_use]
    pub fn preview(&self) -> Preview {
        match &self.tool_wrapper {
            ToolWrapper::AddKeypointTool(z) => z.preview(),
            ToolWrapper::MoveKeypointTool(z) => z.preview(),
            ToolWrapper::BoundingBoxTool(z) => z.preview(),
            ToolWrapper::RectangleTool(z) => z.preview(),
        }
    }
}

#[test]
fn test_tool_ids() {
    assert_eq!(ToolId::from_key('k'), Some(ToolId::AddKeypoint));
    assert_eq!(ToolId::from_key('V'), Some(ToolId::MoveKeypoint));
    assert_eq!(ToolId::from_key('b'), Some(ToolId::BoundingBox));
    assert_eq!(ToolId::from_key('R'), Some(ToolId::AddRectangle));
    assert_eq!(ToolId::from_key('X'), None);
    let tools = make_tool_vec();
    assert_eq!(tools.len(), 4);
    for t in &tools {
        assert!(!t.is_active());
        assert_eq!(ToolId::from_key(t.id.key()), Some(t.id));
    }
    assert_eq!(ToolId::BoundingBox.name(), BBOX_NAME);
}
