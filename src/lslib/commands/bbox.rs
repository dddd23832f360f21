use super::Command;
use crate::{
    annotations::{BoundingBox, Id},
    result::trace_ok_err,
    scene_model::{SceneModel, Selection},
};
use labelstudio_domain::glam::{Quat, Vec3};
use tracing::error;

#[derive(Clone, Debug, PartialEq)]
pub struct AddBoundingBox {
    bbox: BoundingBox,
    added: Option<BoundingBox>,
    selection_before: Selection,
}
impl AddBoundingBox {
    pub fn new(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            added: None,
            selection_before: Selection::default(),
        }
    }
    pub fn added(&self) -> Option<&BoundingBox> {
        self.added.as_ref()
    }
}
impl Command for AddBoundingBox {
    fn execute(&mut self, model: &mut SceneModel) -> bool {
        self.selection_before = model.selection();
        match self.added {
            Some(bb) => {
                model.insert_bounding_box(model.bounding_boxes().len(), bb);
                model.set_selection(Selection {
                    bounding_box: Some(bb.id),
                    ..self.selection_before
                });
            }
            None => {
                self.added = Some(model.add_bounding_box(self.bbox));
            }
        }
        true
    }
    fn undo(&mut self, model: &mut SceneModel) {
        if let Some(bb) = self.added {
            model.remove_bounding_box(bb.id);
        }
        model.set_selection(self.selection_before);
    }
}

/// Replaces a box by `f(box)` and selects it. Undo restores the exact previous box.
fn replace_bbox(
    model: &mut SceneModel,
    id: Id,
    f: impl FnOnce(BoundingBox) -> BoundingBox,
) -> Option<BoundingBox> {
    let Some(old) = model.get_bounding_box(id).copied() else {
        error!("bounding box {id} does not exist");
        return None;
    };
    trace_ok_err(model.update_bounding_box(f(old)));
    let selection = model.selection();
    model.set_selection(Selection {
        bounding_box: Some(id),
        ..selection
    });
    Some(old)
}
fn restore_bbox(model: &mut SceneModel, old: Option<BoundingBox>, selection: Selection) {
    if let Some(old) = old {
        trace_ok_err(model.update_bounding_box(old));
    }
    model.set_selection(selection);
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoveBoundingBox {
    id: Id,
    new_position: Vec3,
    new_orientation: Quat,
    old: Option<BoundingBox>,
    selection_before: Selection,
}
impl MoveBoundingBox {
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
impl Command for MoveBoundingBox {
    fn execute(&mut self, model: &mut SceneModel) -> bool {
        self.selection_before = model.selection();
        let (position, orientation) = (self.new_position, self.new_orientation);
        self.old = replace_bbox(model, self.id, |bb| BoundingBox {
            position,
            orientation,
            ..bb
        });
        self.old.is_some()
    }
    fn undo(&mut self, model: &mut SceneModel) {
        restore_bbox(model, self.old.take(), self.selection_before);
    }
}

/// Resizing changes the center as well, e.g., if one face is dragged while the opposite one
/// stays fixed.
#[derive(Clone, Debug, PartialEq)]
pub struct ResizeBoundingBox {
    id: Id,
    new_dimensions: Vec3,
    new_position: Vec3,
    old: Option<BoundingBox>,
    selection_before: Selection,
}
impl ResizeBoundingBox {
    pub fn new(id: Id, new_dimensions: Vec3, new_position: Vec3) -> Self {
        Self {
            id,
            new_dimensions,
            new_position,
            old: None,
            selection_before: Selection::default(),
        }
    }
}
impl Command for ResizeBoundingBox {
    fn execute(&mut self, model: &mut SceneModel) -> bool {
        self.selection_before = model.selection();
        let (dimensions, position) = (self.new_dimensions, self.new_position);
        self.old = replace_bbox(model, self.id, |bb| BoundingBox {
            dimensions,
            position,
            ..bb
        });
        self.old.is_some()
    }
    fn undo(&mut self, model: &mut SceneModel) {
        restore_bbox(model, self.old.take(), self.selection_before);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoveBoundingBox {
    id: Id,
    removed: Option<(usize, BoundingBox)>,
    selection_before: Selection,
}
impl RemoveBoundingBox {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            removed: None,
            selection_before: Selection::default(),
        }
    }
}
impl Command for RemoveBoundingBox {
    fn execute(&mut self, model: &mut SceneModel) -> bool {
        self.selection_before = model.selection();
        self.removed = model.remove_bounding_box(self.id);
        self.removed.is_some()
    }
    fn undo(&mut self, model: &mut SceneModel) {
        if let Some((idx, bb)) = self.removed.take() {
            model.insert_bounding_box(idx, bb);
        }
        model.set_selection(self.selection_before);
    }
}

#[cfg(test)]
use super::CommandStack;

#[test]
fn test_bbox_commands() {
    let mut model = SceneModel::default();
    let mut stack = CommandStack::new();
    let initial = model.clone();
    for i in 0..3 {
        stack.execute(
            AddBoundingBox::new(BoundingBox::new(
                i,
                Vec3::splat(i as f32),
                Quat::IDENTITY,
                Vec3::ONE,
            ))
            .into(),
            &mut model,
        );
    }
    assert_eq!(model.selection().bounding_box, Some(2));
    stack.execute(
        MoveBoundingBox::new(0, Vec3::new(5.0, 0.0, 0.0), Quat::from_rotation_z(0.3)).into(),
        &mut model,
    );
    assert_eq!(model.selection().bounding_box, Some(0));
    assert_eq!(model.bounding_boxes()[0].position, Vec3::new(5.0, 0.0, 0.0));
    stack.execute(
        ResizeBoundingBox::new(1, Vec3::new(2.0, 1.0, 1.0), Vec3::new(1.5, 1.0, 1.0)).into(),
        &mut model,
    );
    assert_eq!(model.bounding_boxes()[1].dimensions, Vec3::new(2.0, 1.0, 1.0));
    assert_eq!(model.bounding_boxes()[1].position, Vec3::new(1.5, 1.0, 1.0));
    let before_remove = model.clone();
    stack.execute(RemoveBoundingBox::new(1).into(), &mut model);
    assert_eq!(model.bounding_boxes().len(), 2);
    assert_eq!(model.selection().bounding_box, Some(2));
    stack.undo(&mut model);
    assert_eq!(model, before_remove);
    while stack.undo(&mut model) {}
    assert_eq!(model, initial);
    assert_eq!(model.next_bounding_box_id(), 3);
}

#[test]
fn test_remove_active_bbox() {
    let mut model = SceneModel::default();
    let mut stack = CommandStack::new();
    stack.execute(AddBoundingBox::new(BoundingBox::default()).into(), &mut model);
    stack.execute(AddBoundingBox::new(BoundingBox::default()).into(), &mut model);
    assert_eq!(model.selection().bounding_box, Some(1));
    stack.execute(RemoveBoundingBox::new(1).into(), &mut model);
    assert_eq!(model.selection().bounding_box, Some(0));
    stack.execute(RemoveBoundingBox::new(0).into(), &mut model);
    assert_eq!(model.selection().bounding_box, None);
    stack.undo(&mut model);
    stack.undo(&mut model);
    assert_eq!(model.selection().bounding_box, Some(1));
}
