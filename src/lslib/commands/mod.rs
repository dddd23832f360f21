mod bbox;
mod class_id;
mod keypoint;
mod rectangle;
mod stack;
use crate::scene_model::SceneModel;
pub use bbox::{AddBoundingBox, MoveBoundingBox, RemoveBoundingBox, ResizeBoundingBox};
pub use class_id::{AnnotationRef, ChangeClassId};
pub use keypoint::{AddKeypoint, MoveKeypoint, RemoveKeypoint};
pub use rectangle::{AddRectangle, MoveRectangle, RemoveRectangle};
pub use stack::CommandStack;

/// A reversible change of the scene model. `undo` restores the state that the model had
/// before `execute` exactly, including the selection. After an `undo`, `execute` can be called
/// again to redo the change.
pub trait Command {
    /// Returns `false` if nothing was applied, e.g., since the target annotation does not exist.
    fn execute(&mut self, model: &mut SceneModel) -> bool;
    fn undo(&mut self, model: &mut SceneModel);
}

macro_rules! make_commands {
    ($($cmd:ident),+) => {
        #[derive(Clone, Debug, PartialEq)]
        pub enum CommandKind {
            $($cmd($cmd)),+
        }
        impl CommandKind {
            #[must_use]
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$cmd(_) => stringify!($cmd)),+
                }
            }
        }
        impl Command for CommandKind {
            fn execute(&mut self, model: &mut SceneModel) -> bool {
                match self {
                    $(Self::$cmd(c) => c.execute(model)),+
                }
            }
            fn undo(&mut self, model: &mut SceneModel) {
                match self {
                    $(Self::$cmd(c) => c.undo(model)),+
                }
            }
        }
        $(
            impl From<$cmd> for CommandKind {
                fn from(c: $cmd) -> Self {
                    Self::$cmd(c)
                }
            }
        )+
    };
}
make_commands!(
    AddKeypoint,
    MoveKeypoint,
    RemoveKeypoint,
    AddBoundingBox,
    MoveBoundingBox,
    ResizeBoundingBox,
    RemoveBoundingBox,
    ChangeClassId,
    AddRectangle,
    MoveRectangle,
    RemoveRectangle
);
