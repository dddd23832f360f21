use super::Command;
use crate::{
    annotations::{Id, Keypoint},
    result::trace_ok_err,
    scene_model::{SceneModel, Selection},
};
use labelstudio_domain::glam::Vec3;
use tracing::error;

#[derive(Clone, Debug, PartialEq)]
pub struct AddKeypoint {
    keypoint: Keypoint,
    added: Option<Keypoint>,
    selection_before: Selection,
}
impl AddKeypoint {
    pub fn new(keypoint: Keypoint) -> Self {
        Self {
            keypoint,
            added: None,
            selection_before: Selection::default(),
        }
    }
    /// The stored keypoint once the command has been executed
    pub fn added(&self) -> Option<&Keypoint> {
        self.added.as_ref()
    }
}
impl Command for AddKeypoint {
    fn execute(&mut self, model: &mut SceneModel) -> bool {
        self.selection_before = model.selection();
        match self.added {
            Some(kp) => {
                model.insert_keypoint(model.keypoints().len(), kp);
                model.set_selection(Selection {
                    keypoint: Some(kp.id),
                    ..self.selection_before
                });
            }
            None => {
                self.added = Some(model.add_keypoint(self.keypoint));
            }
        }
        true
    }
    fn undo(&mut self, model: &mut SceneModel) {
        if let Some(kp) = self.added {
            model.remove_keypoint(kp.id);
        }
        model.set_selection(self.selection_before);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoveKeypoint {
    id: Id,
    new_position: Vec3,
    old: Option<Keypoint>,
    selection_before: Selection,
}
impl MoveKeypoint {
    pub fn new(id: Id, new_position: Vec3) -> Self {
        Self {
            id,
            new_position,
            old: None,
            selection_before: Selection::default(),
        }
    }
}
impl Command for MoveKeypoint {
    fn execute(&mut self, model: &mut SceneModel) -> bool {
        self.selection_before = model.selection();
        let Some(old) = model.get_keypoint(self.id).copied() else {
            error!("cannot move keypoint {} that does not exist", self.id);
            return false;
        };
        self.old = Some(old);
        trace_ok_err(model.update_keypoint(Keypoint {
            position: self.new_position,
            ..old
        }));
        model.set_selection(Selection {
            keypoint: Some(self.id),
            ..self.selection_before
        });
        true
    }
    fn undo(&mut self, model: &mut SceneModel) {
        if let Some(old) = self.old.take() {
            trace_ok_err(model.update_keypoint(old));
        }
        model.set_selection(self.selection_before);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoveKeypoint {
    id: Id,
    removed: Option<(usize, Keypoint)>,
    selection_before: Selection,
}
impl RemoveKeypoint {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            removed: None,
            selection_before: Selection::default(),
        }
    }
}
impl Command for RemoveKeypoint {
    fn execute(&mut self, model: &mut SceneModel) -> bool {
        self.selection_before = model.selection();
        self.removed = model.remove_keypoint(self.id);
        self.removed.is_some()
    }
    fn undo(&mut self, model: &mut SceneModel) {
        if let Some((idx, kp)) = self.removed.take() {
            model.insert_keypoint(idx, kp);
        }
        model.set_selection(self.selection_before);
    }
}

#[cfg(test)]
use {
    super::{CommandKind, CommandStack},
    crate::result::LsResult,
};

#[test]
fn test_add_keypoint_undo() {
    let mut model = SceneModel::default();
    let mut stack = CommandStack::new();
    stack.execute(
        AddKeypoint::new(Keypoint::new(0, Vec3::new(1.0, 2.0, 3.0))).into(),
        &mut model,
    );
    assert_eq!(model.keypoints().len(), 1);
    assert_eq!(model.keypoints()[0].position, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(model.keypoints()[0].id, 0);
    stack.undo(&mut model);
    assert!(model.keypoints().is_empty());
    assert_eq!(model.selection(), Selection::default());
    stack.redo(&mut model);
    assert_eq!(model.keypoints()[0].id, 0);
    assert_eq!(model.selection().keypoint, Some(0));
}

#[test]
fn test_move_remove_keypoint() -> LsResult<()> {
    let mut model = SceneModel::default();
    let mut stack = CommandStack::new();
    for i in 0..3 {
        stack.execute(
            AddKeypoint::new(Keypoint::new(0, Vec3::splat(i as f32))).into(),
            &mut model,
        );
    }
    let before = model.clone();
    stack.execute(MoveKeypoint::new(1, Vec3::new(0.1, 0.2, 0.3)).into(), &mut model);
    assert_eq!(model.get_keypoint(1).map(|kp| kp.position), Some(Vec3::new(0.1, 0.2, 0.3)));
    assert_eq!(model.selection().keypoint, Some(1));
    stack.undo(&mut model);
    assert_eq!(model, before);

    stack.execute(RemoveKeypoint::new(1).into(), &mut model);
    assert_eq!(
        model.keypoints().iter().map(|kp| kp.id).collect::<Vec<_>>(),
        vec![0, 2]
    );
    stack.undo(&mut model);
    assert_eq!(model, before);

    // commands on missing keypoints do not change anything
    stack.execute(CommandKind::from(MoveKeypoint::new(42, Vec3::ONE)), &mut model);
    assert_eq!(model, before);
    Ok(())
}
