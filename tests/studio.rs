use std::path::PathBuf;

use lslib::{
    defer_file_removal,
    glam::{Mat4, Vec3},
    tools::Preview,
    tracing_setup::init_tracing_for_tests,
    Geometry, InputEvent, KeyCode, Modifiers, PointCloud, SceneModel, Studio, ToolId,
    TriangleMesh,
};

const CENTER: f32 = 249.5;

fn plane() -> Geometry {
    Geometry::Mesh(
        TriangleMesh::new(
            vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
            Mat4::IDENTITY,
        )
        .unwrap(),
    )
}

fn plane_studio() -> Studio {
    let mut studio = Studio::new(Default::default(), 500, 500);
    studio.set_geometry(plane());
    studio
}

fn click(studio: &mut Studio, x: f32, y: f32, modifiers: Modifiers) {
    studio.push_event(InputEvent::moved(x, y, modifiers));
    studio.push_event(InputEvent::left_down(x, y, modifiers));
    studio.push_event(InputEvent::left_up(x, y, modifiers));
    studio.process_events();
}

fn drag(studio: &mut Studio, from: (f32, f32), to: (f32, f32), modifiers: Modifiers) {
    studio.push_event(InputEvent::left_down(from.0, from.1, modifiers));
    studio.push_event(InputEvent::moved(to.0, to.1, modifiers));
    studio.push_event(InputEvent::left_up(to.0, to.1, modifiers));
    studio.process_events();
}

fn key(studio: &mut Studio, c: char, modifiers: Modifiers) {
    studio.push_event(InputEvent::key(c, modifiers));
    studio.process_events();
}

#[test]
fn test_add_keypoint_scenario() {
    init_tracing_for_tests();
    let mut studio = Studio::new(Default::default(), 500, 500);
    studio.set_geometry(Geometry::PointCloud(PointCloud::new(
        vec![Vec3::ZERO, Vec3::new(0.3, 0.3, -0.5)],
        Mat4::IDENTITY,
    )));
    studio
        .controller_mut()
        .camera_mut()
        .reset(Vec3::ZERO, Vec3::new(0.0, 0.0, 0.2));

    let camera = *studio.controller().camera();
    let dir = camera.compute_ray_world(500.0, 500.0, CENTER, CENTER);
    let hit = studio.model().trace_ray(camera.position(), dir).unwrap();
    assert!(hit.unwrap().length() < 1e-5);
    let projected = camera.project_point(Vec3::new(0.0, 0.0, -0.1));
    assert!(projected.length() < 1e-5);

    assert_eq!(studio.controller().active_tool(), ToolId::AddKeypoint);
    click(&mut studio, CENTER, CENTER, Modifiers::NONE);
    let keypoints = studio.model().keypoints();
    assert_eq!(keypoints.len(), 1);
    assert_eq!(keypoints[0].id, 0);
    assert_eq!(keypoints[0].class_id, 0);
    assert!(keypoints[0].position.length() < 1e-5);
    assert_eq!(studio.model().selection().keypoint, Some(0));

    key(&mut studio, 'z', Modifiers::ctrl());
    assert!(studio.model().keypoints().is_empty());
    assert_eq!(studio.model().selection().keypoint, None);
    click(&mut studio, CENTER, CENTER, Modifiers::NONE);
    // ids are never reused
    assert_eq!(studio.model().keypoints()[0].id, 1);
}

#[test]
fn test_drag_orbits() {
    let mut studio = plane_studio();
    let before = *studio.controller().camera();
    drag(&mut studio, (10.0, 10.0), (60.0, 30.0), Modifiers::NONE);
    let after = *studio.controller().camera();
    assert!(studio.model().keypoints().is_empty());
    assert!(before.position().distance(after.position()) > 1e-3);
    assert!((after.distance_to_lookat() - before.distance_to_lookat()).abs() < 1e-5);
    assert!((after.orientation().length() - 1.0).abs() < 1e-5);
}

#[test]
fn test_bounding_box_gestures() {
    let mut studio = plane_studio();
    key(&mut studio, 'b', Modifiers::NONE);
    assert_eq!(studio.controller().active_tool(), ToolId::BoundingBox);

    click(&mut studio, CENTER, CENTER, Modifiers::NONE);
    assert_eq!(studio.model().bounding_boxes().len(), 1);
    let bb = studio.model().bounding_boxes()[0];
    assert!(bb.position.length() < 1e-5);
    assert_eq!(bb.dimensions, Vec3::splat(0.2));
    assert_eq!(studio.model().selection().bounding_box, Some(bb.id));

    // grab the top face and drag to the right
    studio.push_event(InputEvent::left_down(CENTER, CENTER, Modifiers::NONE));
    studio.push_event(InputEvent::moved(300.0, CENTER, Modifiers::NONE));
    studio.process_events();
    assert!(matches!(studio.preview(), Preview::BoundingBox(_)));
    studio.push_event(InputEvent::left_up(300.0, CENTER, Modifiers::NONE));
    studio.process_events();
    let moved = studio.model().bounding_boxes()[0];
    assert!(moved.position.x > 0.05);
    assert!(moved.position.y.abs() < 1e-4);
    assert!(moved.position.z.abs() < 1e-4);
    assert_eq!(studio.stack().len(), 2);

    key(&mut studio, 'q', Modifiers::NONE);
    let rotated = studio.model().bounding_boxes()[0];
    let angle = rotated.orientation.angle_between(moved.orientation);
    assert!((angle - 5f32.to_radians()).abs() < 1e-4);
    key(&mut studio, 'z', Modifiers::ctrl());
    assert_eq!(studio.model().bounding_boxes()[0], moved);

    key(&mut studio, '2', Modifiers::NONE);
    assert_eq!(studio.model().bounding_boxes()[0].class_id, 2);
    assert_eq!(studio.controller().class_id(), 0);

    studio.push_event(InputEvent::KeyPress {
        key: KeyCode::Delete,
        modifiers: Modifiers::NONE,
    });
    studio.process_events();
    assert!(studio.model().bounding_boxes().is_empty());
    assert_eq!(studio.model().selection().bounding_box, None);
    key(&mut studio, 'z', Modifiers::ctrl());
    assert_eq!(studio.model().bounding_boxes().len(), 1);
    assert_eq!(studio.model().selection().bounding_box, Some(moved.id));
}

#[test]
fn test_shift_drag_resizes_box() {
    let mut studio = plane_studio();
    key(&mut studio, 'b', Modifiers::NONE);
    click(&mut studio, CENTER, CENTER, Modifiers::NONE);
    let bb = studio.model().bounding_boxes()[0];
    // look from an oblique angle so the x-faces are not parallel to the view
    studio
        .controller_mut()
        .camera_mut()
        .reset(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0));
    let camera = *studio.controller().camera();
    let on_face = camera
        .project_to_pixel(Vec3::new(0.1, 0.0, 0.05), 500.0, 500.0)
        .unwrap();
    // drag the +x face 0.1 outwards along its axis
    let target = camera
        .project_to_pixel(Vec3::new(0.2, 0.0, 0.0), 500.0, 500.0)
        .unwrap();
    drag(
        &mut studio,
        (on_face.x, on_face.y),
        (target.x, target.y),
        Modifiers::shift(),
    );
    assert_eq!(studio.stack().len(), 2);
    let resized = studio.model().bounding_boxes()[0];
    assert!((resized.dimensions.x - 0.3).abs() < 1e-3);
    assert_eq!(resized.dimensions.y, bb.dimensions.y);
    assert_eq!(resized.dimensions.z, bb.dimensions.z);
    // the opposite face stays where it was
    let opposite = resized.position.x - resized.dimensions.x * 0.5;
    assert!((opposite - (bb.position.x - bb.dimensions.x * 0.5)).abs() < 1e-5);
    assert!((resized.position.y - bb.position.y).abs() < 1e-5);
    assert!((resized.position.z - bb.position.z).abs() < 1e-5);
    assert_eq!(resized.orientation, bb.orientation);

    key(&mut studio, 'z', Modifiers::ctrl());
    assert_eq!(studio.model().bounding_boxes()[0], bb);
}

#[test]
fn test_undo_during_drag_keeps_redo() {
    let mut studio = plane_studio();
    click(&mut studio, CENTER, CENTER, Modifiers::NONE);
    let kp = studio.model().keypoints()[0];
    key(&mut studio, 'v', Modifiers::NONE);
    studio.push_event(InputEvent::left_down(CENTER, CENTER, Modifiers::NONE));
    studio.push_event(InputEvent::moved(300.0, CENTER, Modifiers::NONE));
    studio.process_events();
    assert!(matches!(studio.preview(), Preview::Point(_)));

    key(&mut studio, 'z', Modifiers::ctrl());
    assert!(studio.model().keypoints().is_empty());
    assert_eq!(studio.preview(), Preview::None);
    studio.push_event(InputEvent::left_up(300.0, CENTER, Modifiers::NONE));
    studio.process_events();
    assert!(studio.model().keypoints().is_empty());
    assert_eq!(studio.stack().len(), 1);
    assert!(studio.stack().can_redo());

    key(&mut studio, 'y', Modifiers::ctrl());
    assert_eq!(studio.model().keypoints(), &[kp]);
}

#[test]
fn test_span_rectangle() {
    let mut studio = plane_studio();
    key(&mut studio, 'r', Modifiers::NONE);
    key(&mut studio, '3', Modifiers::NONE);
    assert_eq!(studio.controller().class_id(), 3);
    drag(&mut studio, (CENTER, CENTER), (300.0, 300.0), Modifiers::NONE);
    let rects = studio.model().rectangles();
    assert_eq!(rects.len(), 1);
    let rect = rects[0];
    assert_eq!(rect.class_id, 3);
    assert!(rect.size.x > 0.01 && rect.size.y > 0.01);
    assert!((rect.normal() - Vec3::Z).length() < 1e-4);
    assert!(rect.position.x > 0.0 && rect.position.y < 0.0);

    // ctrl drag moves it within its plane
    let before = rect.position;
    drag(
        &mut studio,
        (275.0, 275.0),
        (200.0, 275.0),
        Modifiers::ctrl(),
    );
    let moved = studio.model().rectangles()[0];
    assert!(moved.position.x < before.x);
    assert!((moved.position.z - before.z).abs() < 1e-5);
    assert_eq!(moved.size, rect.size);
}

#[test]
fn test_ctrl_s() {
    let folder = std::env::temp_dir().join("labelstudio_test_ctrl_s");
    let annotations = folder.join("annotations.json");
    defer_file_removal!(&annotations);
    let mut studio = plane_studio();
    studio.save_to(&folder).unwrap();
    click(&mut studio, CENTER, CENTER, Modifiers::NONE);
    click(&mut studio, 300.0, 200.0, Modifiers::NONE);
    assert_eq!(studio.model().keypoints().len(), 2);

    let mut loaded = SceneModel::default();
    loaded.load(&annotations).unwrap();
    assert!(loaded.keypoints().is_empty());

    key(&mut studio, 's', Modifiers::ctrl());
    loaded.load(&annotations).unwrap();
    assert_eq!(loaded.keypoints(), studio.model().keypoints());
    assert_eq!(loaded.next_keypoint_id(), 2);
}

#[test]
fn test_open_dataset_and_save() {
    let src = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources/test_data/dataset");
    let studio = Studio::open_dataset(Default::default(), &src, 640, 480).unwrap();
    let model = studio.model();
    assert_eq!(model.keypoints().len(), 2);
    assert_eq!(model.bounding_boxes()[0].dimensions, Vec3::new(0.2, 0.3, 0.4));
    assert_eq!(model.default_size(1), Vec3::new(1.2, 0.8, 0.75));
    assert_eq!(model.selection(), Default::default());

    let out = std::env::temp_dir().join("labelstudio_test_open_dataset.json");
    defer_file_removal!(&out);
    model.save(&out).unwrap();
    let mut reloaded = SceneModel::default();
    reloaded.load(&out).unwrap();
    assert_eq!(reloaded.to_annotations(), model.to_annotations());
}
