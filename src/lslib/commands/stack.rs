use super::{Command, CommandKind};
use crate::scene_model::SceneModel;
use std::fmt::Debug;
use tracing::{info, warn};

/// History of executed commands. Undone commands are kept for redo until a new command is
/// executed.
#[derive(Clone, Default)]
pub struct CommandStack {
    commands: Vec<CommandKind>,
    current_idx: Option<usize>,
}

impl CommandStack {
    pub fn new() -> Self {
        Self {
            commands: vec![],
            current_idx: None,
        }
    }

    /// Executes the command and records it. Commands that have been undone before are discarded.
    /// Commands that do not apply are neither recorded nor do they discard the redo tail. Returns
    /// whether the command applied.
    pub fn execute(&mut self, mut command: CommandKind, model: &mut SceneModel) -> bool {
        info!("execute {}", command.name());
        if !command.execute(model) {
            warn!("{} did not apply and is not recorded", command.name());
            return false;
        }
        let n_keep = self.n_applied();
        self.commands.truncate(n_keep);
        self.commands.push(command);
        self.current_idx = Some(n_keep);
        true
    }

    /// Returns `false` if there is nothing to undo.
    pub fn undo(&mut self, model: &mut SceneModel) -> bool {
        match self.current_idx {
            Some(idx) => {
                let command = &mut self.commands[idx];
                info!("undo {}", command.name());
                command.undo(model);
                self.current_idx = idx.checked_sub(1);
                true
            }
            None => false,
        }
    }

    /// Returns `false` if there is nothing to redo.
    pub fn redo(&mut self, model: &mut SceneModel) -> bool {
        let next = self.current_idx.map_or(0, |idx| idx + 1);
        match self.commands.get_mut(next) {
            Some(command) => {
                info!("redo {}", command.name());
                command.execute(model);
                self.current_idx = Some(next);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.current_idx.is_some()
    }
    pub fn can_redo(&self) -> bool {
        self.current_idx.map_or(0, |idx| idx + 1) < self.commands.len()
    }
    /// Number of recorded commands including the undone ones
    pub fn len(&self) -> usize {
        self.commands.len()
    }
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
    /// Number of commands that are currently applied to the model
    pub fn n_applied(&self) -> usize {
        self.current_idx.map_or(0, |idx| idx + 1)
    }
    pub fn clear(&mut self) {
        self.commands.clear();
        self.current_idx = None;
    }
}

impl Debug for CommandStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(command idx {:?}, {:?})",
            self.current_idx,
            self.commands.iter().map(CommandKind::name).collect::<Vec<_>>()
        )
    }
}

#[cfg(test)]
use {
    super::{AddKeypoint, MoveKeypoint, RemoveKeypoint},
    crate::annotations::Keypoint,
    labelstudio_domain::glam::Vec3,
};

#[test]
fn test_stack() {
    let mut model = SceneModel::default();
    let mut stack = CommandStack::new();
    assert!(!stack.undo(&mut model));
    assert!(!stack.redo(&mut model));
    let initial = model.clone();

    let mut states = vec![model.clone()];
    for i in 0..4 {
        stack.execute(
            AddKeypoint::new(Keypoint::new(0, Vec3::splat(i as f32))).into(),
            &mut model,
        );
        states.push(model.clone());
    }
    stack.execute(MoveKeypoint::new(2, Vec3::NEG_ONE).into(), &mut model);
    states.push(model.clone());
    assert_eq!(stack.len(), 5);
    assert!(stack.can_undo());
    assert!(!stack.can_redo());

    for expected in states.iter().rev().skip(1) {
        assert!(stack.undo(&mut model));
        assert_eq!(&model, expected);
    }
    assert_eq!(model, initial);
    assert!(!stack.undo(&mut model));
    assert!(stack.can_redo());

    assert!(stack.redo(&mut model));
    assert!(stack.redo(&mut model));
    assert_eq!(model, states[2]);
    assert_eq!(stack.n_applied(), 2);

    // new commands drop the redo tail
    stack.execute(
        AddKeypoint::new(Keypoint::new(1, Vec3::ONE)).into(),
        &mut model,
    );
    assert_eq!(stack.len(), 3);
    assert!(!stack.can_redo());
    assert_eq!(model.keypoints().last().map(|kp| kp.id), Some(4));
    stack.clear();
    assert!(stack.is_empty());
    assert!(!stack.undo(&mut model));
}

#[test]
fn test_missing_target_keeps_redo_tail() {
    let mut model = SceneModel::default();
    let mut stack = CommandStack::new();
    for i in 0..2 {
        assert!(stack.execute(
            AddKeypoint::new(Keypoint::new(0, Vec3::splat(i as f32))).into(),
            &mut model,
        ));
    }
    stack.undo(&mut model);
    let before = model.clone();
    assert!(!stack.execute(MoveKeypoint::new(1, Vec3::ONE).into(), &mut model));
    assert!(!stack.execute(RemoveKeypoint::new(7).into(), &mut model));
    assert_eq!(model, before);
    assert_eq!(stack.len(), 2);
    assert_eq!(stack.n_applied(), 1);
    assert!(stack.can_redo());
    assert!(stack.redo(&mut model));
    assert_eq!(model.keypoints().len(), 2);
}
