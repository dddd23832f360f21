pub mod annotations;
pub mod cfg;
pub mod commands;
pub mod controller;
pub mod dataset;
pub mod events;
pub mod file_util;
pub mod result;
pub mod scene_model;
pub mod studio;
pub mod tools;
pub mod tracing_setup;
pub use annotations::{
    AnnotationsData, BoundingBox, ClassId, DatasetMetadata, Id, InstanceMetadata, Keypoint,
    Rectangle,
};
pub use cfg::{read_cfg, write_cfg, Cfg};
pub use commands::{Command, CommandKind, CommandStack};
pub use controller::Controller;
pub use events::{EventQueue, InputEvent, KeyCode, Modifiers, MouseButton};
pub use file_util::{get_test_folder, DatasetPaths};
pub use labelstudio_domain::{
    glam, Camera, CameraIntrinsics, Geometry, Intersection, PointCloud, PointTolerance, Ray,
    RayTracer, TriangleMesh,
};
pub use scene_model::{SceneModel, Selection};
pub use studio::Studio;
pub use tools::{Preview, ToolId};
