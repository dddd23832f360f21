use super::Command;
use crate::{
    annotations::{Id, Rectangle},
    result::trace_ok_err,
    scene_model::{SceneModel, Selection},
};
use labelstudio_domain::glam::{Quat, Vec3};
use tracing::error;

#[derive(Clone, Debug, PartialEq)]
pub struct AddRectangle {
    rect: Rectangle,
    added: Option<Rectangle>,
    selection_before: Selection,
}
impl AddRectangle {
    pub fn new(rect: Rectangle) -> Self {
        Self {
            rect,
            added: None,
            selection_before: Selection::default(),
        }
    }
    pub fn added(&self) -> Option<&Rectangle> {
        self.added.as_ref()
    }
}
impl Command for AddRectangle {
    fn execute(&mut self, model: &mut SceneModel) -> bool {
        self.selection_before = model.selection();
        match self.added {
            Some(rect) => {
                model.insert_rectangle(model.rectangles().len(), rect);
                model.set_selection(Selection {
                    rectangle: Some(rect.id),
                    ..self.selection_before
                });
            }
            None => {
                self.added = Some(model.add_rectangle(self.rect));
            }
        }
        true
    }
    fn undo(&mut self, model: &mut SceneModel) {
        if let Some(rect) = self.added {
            model.remove_rectangle(rect.id);
        }
        model.set_selection(self.selection_before);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoveRectangle {
    id: Id,
    new_position: Vec3,
    new_orientation: Quat,
    old: Option<Rectangle>,
    selection_before: Selection,
}
impl MoveRectangle {
    pub fn new(id: Id, new_position: Vec3, new_orientation: Quat) -> Self {
        Self {
            id,
            new_position,
            new_orientation,
            old: None,
            selection_before: Selection::default(),
        }
    }
}
impl Command for MoveRectangle {
    fn execute(&mut self, model: &mut SceneModel) -> bool {
        self.selection_before = model.selection();
        let Some(old) = model.get_rectangle(self.id).copied() else {
            error!("cannot move rectangle {} that does not exist", self.id);
            return false;
        };
        self.old = Some(old);
        trace_ok_err(model.update_rectangle(Rectangle {
            position: self.new_position,
            orientation: self.new_orientation,
            ..old
        }));
        model.set_selection(Selection {
            rectangle: Some(self.id),
            ..self.selection_before
        });
        true
    }
    fn undo(&mut self, model: &mut SceneModel) {
        if let Some(old) = self.old.take() {
            trace_ok_err(model.update_rectangle(old));
        }
        model.set_selection(self.selection_before);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoveRectangle {
    id: Id,
    removed: Option<(usize, Rectangle)>,
    selection_before: Selection,
}
impl RemoveRectangle {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            removed: None,
            selection_before: Selection::default(),
        }
    }
}
impl Command for RemoveRectangle {
    fn execute(&mut self, model: &mut SceneModel) -> bool {
        self.selection_before = model.selection();
        self.removed = model.remove_rectangle(self.id);
        self.removed.is_some()
    }
    fn undo(&mut self, model: &mut SceneModel) {
        if let Some((idx, rect)) = self.removed.take() {
            model.insert_rectangle(idx, rect);
        }
        model.set_selection(self.selection_before);
    }
}

#[cfg(test)]
use {super::CommandStack, labelstudio_domain::glam::Vec2};

#[test]
fn test_rectangle_commands() {
    let mut model = SceneModel::default();
    let mut stack = CommandStack::new();
    let initial = model.clone();
    stack.execute(
        AddRectangle::new(Rectangle::new(3, Vec3::ZERO, Quat::IDENTITY, Vec2::new(0.5, 0.25))).into(),
        &mut model,
    );
    assert_eq!(model.selection().rectangle, Some(0));
    let rot = Quat::from_rotation_x(0.5);
    stack.execute(MoveRectangle::new(0, Vec3::Y, rot).into(), &mut model);
    let rect = model.rectangles()[0];
    assert_eq!(rect.position, Vec3::Y);
    assert_eq!(rect.size, Vec2::new(0.5, 0.25));
    assert_eq!(rect.class_id, 3);
    stack.execute(RemoveRectangle::new(0).into(), &mut model);
    assert!(model.rectangles().is_empty());
    assert_eq!(model.selection().rectangle, None);
    stack.undo(&mut model);
    assert_eq!(model.rectangles()[0], rect);
    stack.undo(&mut model);
    stack.undo(&mut model);
    assert_eq!(model, initial);
    stack.redo(&mut model);
    assert_eq!(model.rectangles()[0].id, 0);
}
