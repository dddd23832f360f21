use lslib::{
    commands::{
        AddBoundingBox, AddKeypoint, AddRectangle, AnnotationRef, ChangeClassId, MoveBoundingBox,
        MoveKeypoint, RemoveBoundingBox, RemoveKeypoint, ResizeBoundingBox,
    },
    glam::{Quat, Vec2, Vec3},
    BoundingBox, CommandKind, CommandStack, Keypoint, Rectangle, SceneModel,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn random_vec3(rng: &mut StdRng) -> Vec3 {
    Vec3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    )
}

fn random_id(rng: &mut StdRng, ids: &[u32]) -> u32 {
    if ids.is_empty() || rng.gen_bool(0.1) {
        // commands on missing ids must not do anything and are not recorded
        1000
    } else {
        ids[rng.gen_range(0..ids.len())]
    }
}

fn random_command(rng: &mut StdRng, model: &SceneModel) -> CommandKind {
    let kp_ids = model.keypoints().iter().map(|k| k.id).collect::<Vec<_>>();
    let bb_ids = model.bounding_boxes().iter().map(|b| b.id).collect::<Vec<_>>();
    match rng.gen_range(0..9) {
        0 => AddKeypoint::new(Keypoint::new(rng.gen_range(0..3), random_vec3(rng))).into(),
        1 => MoveKeypoint::new(random_id(rng, &kp_ids), random_vec3(rng)).into(),
        2 => RemoveKeypoint::new(random_id(rng, &kp_ids)).into(),
        3 => AddBoundingBox::new(BoundingBox::new(
            rng.gen_range(0..3),
            random_vec3(rng),
            Quat::from_rotation_z(rng.gen_range(0.0..6.0)),
            random_vec3(rng).abs(),
        ))
        .into(),
        4 => MoveBoundingBox::new(
            random_id(rng, &bb_ids),
            random_vec3(rng),
            // not normalized on purpose
            Quat::from_xyzw(0.1, 0.2, 0.3, rng.gen_range(0.5..2.0)),
        )
        .into(),
        5 => ResizeBoundingBox::new(random_id(rng, &bb_ids), random_vec3(rng), random_vec3(rng))
            .into(),
        6 => RemoveBoundingBox::new(random_id(rng, &bb_ids)).into(),
        7 => ChangeClassId::new(
            AnnotationRef::BoundingBox(random_id(rng, &bb_ids)),
            rng.gen_range(0..5),
        )
        .into(),
        _ => AddRectangle::new(Rectangle::new(
            1,
            random_vec3(rng),
            Quat::IDENTITY,
            Vec2::new(rng.gen_range(0.0..1.0), 0.5),
        ))
        .into(),
    }
}

#[test]
fn test_n_executes_n_undos() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let mut model = SceneModel::default();
        let mut stack = CommandStack::new();
        let initial = model.clone();
        let mut states = vec![];
        for _ in 0..rng.gen_range(1..40) {
            let cmd = random_command(&mut rng, &model);
            let before = model.clone();
            if stack.execute(cmd, &mut model) {
                states.push(model.clone());
            } else {
                assert_eq!(model, before);
            }
        }
        let n = states.len();
        assert_eq!(stack.len(), n);
        let final_state = model.clone();
        let next_ids = (model.next_keypoint_id(), model.next_bounding_box_id());

        for i in (0..n).rev() {
            assert_eq!(model, states[i]);
            assert!(stack.undo(&mut model));
        }
        assert_eq!(model, initial);
        assert!(!stack.undo(&mut model));
        assert_eq!(model, initial);

        while stack.redo(&mut model) {}
        assert_eq!(model, final_state);
        // counters survive undo and redo
        assert_eq!(
            (model.next_keypoint_id(), model.next_bounding_box_id()),
            next_ids
        );
        for bb in model.bounding_boxes() {
            assert!((bb.orientation.length() - 1.0).abs() < 1e-5);
            assert!(bb.dimensions.min_element() > 0.0);
        }
        for rect in model.rectangles() {
            assert!(rect.size.min_element() > 0.0);
        }
    }
}

#[test]
fn test_ids_strictly_increasing() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut model = SceneModel::default();
    let mut stack = CommandStack::new();
    let mut last_id = None;
    for _ in 0..50 {
        let cmd = AddKeypoint::new(Keypoint::new(0, random_vec3(&mut rng)));
        stack.execute(cmd.into(), &mut model);
        let id = model.selection().keypoint.unwrap();
        if let Some(last) = last_id {
            assert!(id > last);
        }
        last_id = Some(id);
        if rng.gen_bool(0.5) {
            stack.execute(RemoveKeypoint::new(id).into(), &mut model);
        }
        if rng.gen_bool(0.3) {
            stack.undo(&mut model);
        }
    }
}

#[test]
fn test_new_command_drops_redo_tail() {
    let mut model = SceneModel::default();
    let mut stack = CommandStack::new();
    for i in 0..3 {
        stack.execute(
            AddKeypoint::new(Keypoint::new(0, Vec3::splat(i as f32))).into(),
            &mut model,
        );
    }
    stack.undo(&mut model);
    stack.undo(&mut model);
    assert!(stack.can_redo());
    stack.execute(
        AddKeypoint::new(Keypoint::new(1, Vec3::ONE)).into(),
        &mut model,
    );
    assert!(!stack.can_redo());
    assert_eq!(stack.len(), 2);
    let ids = model.keypoints().iter().map(|k| k.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![0, 3]);
}
