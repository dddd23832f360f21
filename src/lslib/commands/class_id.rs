use super::Command;
use crate::{
    annotations::{ClassId, Id},
    result::trace_ok_err,
    scene_model::SceneModel,
};
use tracing::error;

/// Reference to one annotation of any kind
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnnotationRef {
    Keypoint(Id),
    BoundingBox(Id),
    Rectangle(Id),
}

fn class_id_of(model: &SceneModel, target: AnnotationRef) -> Option<ClassId> {
    match target {
        AnnotationRef::Keypoint(id) => model.get_keypoint(id).map(|kp| kp.class_id),
        AnnotationRef::BoundingBox(id) => model.get_bounding_box(id).map(|bb| bb.class_id),
        AnnotationRef::Rectangle(id) => model.get_rectangle(id).map(|r| r.class_id),
    }
}

fn set_class_id(model: &mut SceneModel, target: AnnotationRef, class_id: ClassId) {
    let res = match target {
        AnnotationRef::Keypoint(id) => model.get_keypoint(id).copied().map(|mut kp| {
            kp.class_id = class_id;
            model.update_keypoint(kp)
        }),
        AnnotationRef::BoundingBox(id) => model.get_bounding_box(id).copied().map(|mut bb| {
            bb.class_id = class_id;
            model.update_bounding_box(bb)
        }),
        AnnotationRef::Rectangle(id) => model.get_rectangle(id).copied().map(|mut r| {
            r.class_id = class_id;
            model.update_rectangle(r)
        }),
    };
    if let Some(res) = res {
        trace_ok_err(res);
    }
}

/// Changes the class of an annotation. Selection is not affected.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeClassId {
    target: AnnotationRef,
    new_class_id: ClassId,
    old_class_id: Option<ClassId>,
}
impl ChangeClassId {
    pub fn new(target: AnnotationRef, new_class_id: ClassId) -> Self {
        Self {
            target,
            new_class_id,
            old_class_id: None,
        }
    }
}
impl Command for ChangeClassId {
    fn execute(&mut self, model: &mut SceneModel) -> bool {
        self.old_class_id = class_id_of(model, self.target);
        if self.old_class_id.is_none() {
            error!("cannot change class of missing {:?}", self.target);
            return false;
        }
        set_class_id(model, self.target, self.new_class_id);
        true
    }
    fn undo(&mut self, model: &mut SceneModel) {
        if let Some(old) = self.old_class_id.take() {
            set_class_id(model, self.target, old);
        }
    }
}

#[cfg(test)]
use {
    super::{AddBoundingBox, AddKeypoint, CommandStack},
    crate::annotations::{BoundingBox, Keypoint},
    labelstudio_domain::glam::Vec3,
};

#[test]
fn test_change_class_id() {
    let mut model = SceneModel::default();
    let mut stack = CommandStack::new();
    stack.execute(AddKeypoint::new(Keypoint::new(1, Vec3::ZERO)).into(), &mut model);
    stack.execute(AddBoundingBox::new(BoundingBox::default()).into(), &mut model);
    let before = model.clone();
    stack.execute(
        ChangeClassId::new(AnnotationRef::BoundingBox(0), 4).into(),
        &mut model,
    );
    stack.execute(
        ChangeClassId::new(AnnotationRef::Keypoint(0), 2).into(),
        &mut model,
    );
    assert_eq!(model.bounding_boxes()[0].class_id, 4);
    assert_eq!(model.keypoints()[0].class_id, 2);
    stack.undo(&mut model);
    stack.undo(&mut model);
    assert_eq!(model, before);
    stack.execute(
        ChangeClassId::new(AnnotationRef::Rectangle(0), 2).into(),
        &mut model,
    );
    assert_eq!(model, before);
}
