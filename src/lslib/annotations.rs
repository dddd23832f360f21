use labelstudio_domain::{
    glam::{Quat, Vec2, Vec3},
    is_unit_quat, normalize_quat, OrientedBox, OrientedRect,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Id = u32;
pub type ClassId = u32;

/// Leaves unit quaternions untouched such that restoring a stored orientation is exact.
fn unit_orientation(q: Quat) -> Quat {
    if is_unit_quat(q, 1e-6) {
        q
    } else {
        normalize_quat(q)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeypointRecord {
    id: Id,
    class_id: ClassId,
    x: f32,
    y: f32,
    z: f32,
}

/// Keypoints are stored with flat coordinates in annotation files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "KeypointRecord", into = "KeypointRecord")]
pub struct Keypoint {
    pub id: Id,
    pub class_id: ClassId,
    pub position: Vec3,
}
impl Keypoint {
    /// The id is assigned once the keypoint is added to a scene.
    pub fn new(class_id: ClassId, position: Vec3) -> Self {
        Self {
            id: 0,
            class_id,
            position,
        }
    }
}
impl From<KeypointRecord> for Keypoint {
    fn from(r: KeypointRecord) -> Self {
        Self {
            id: r.id,
            class_id: r.class_id,
            position: Vec3::new(r.x, r.y, r.z),
        }
    }
}
impl From<Keypoint> for KeypointRecord {
    fn from(kp: Keypoint) -> Self {
        Self {
            id: kp.id,
            class_id: kp.class_id,
            x: kp.position.x,
            y: kp.position.y,
            z: kp.position.z,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub id: Id,
    pub class_id: ClassId,
    pub position: Vec3,
    pub orientation: Quat,
    pub dimensions: Vec3,
}
impl BoundingBox {
    pub fn new(class_id: ClassId, position: Vec3, orientation: Quat, dimensions: Vec3) -> Self {
        Self {
            id: 0,
            class_id,
            position,
            orientation,
            dimensions,
        }
    }
    pub fn to_oriented_box(&self) -> OrientedBox {
        OrientedBox {
            center: self.position,
            orientation: self.orientation,
            dimensions: self.dimensions,
        }
    }
    /// Unit orientation and dimensions not below `min_dimension`.
    pub(crate) fn sanitized(mut self, min_dimension: f32) -> Self {
        self.orientation = unit_orientation(self.orientation);
        self.dimensions = self.dimensions.max(Vec3::splat(min_dimension));
        self
    }
}
impl Default for BoundingBox {
    fn default() -> Self {
        Self::new(0, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE)
    }
}

/// Planar annotation. The plane normal is the local z-axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rectangle {
    pub id: Id,
    pub class_id: ClassId,
    pub position: Vec3,
    pub orientation: Quat,
    pub size: Vec2,
}
impl Rectangle {
    pub fn new(class_id: ClassId, position: Vec3, orientation: Quat, size: Vec2) -> Self {
        Self {
            id: 0,
            class_id,
            position,
            orientation,
            size,
        }
    }
    pub fn normal(&self) -> Vec3 {
        self.orientation * Vec3::Z
    }
    pub fn to_oriented_rect(&self) -> OrientedRect {
        OrientedRect {
            center: self.position,
            orientation: self.orientation,
            size: self.size,
        }
    }
    pub(crate) fn sanitized(mut self, min_dimension: f32) -> Self {
        self.orientation = unit_orientation(self.orientation);
        self.size = self.size.max(Vec2::splat(min_dimension));
        self
    }
}
impl Default for Rectangle {
    fn default() -> Self {
        Self::new(0, Vec3::ZERO, Quat::IDENTITY, Vec2::ONE)
    }
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceMetadata {
    pub name: String,
    pub default_size: Vec3,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceMetadataRecord {
    class_id: ClassId,
    #[serde(default)]
    name: String,
    #[serde(default = "default_size_record")]
    default_size: Vec3,
}
fn default_size_record() -> Vec3 {
    Vec3::splat(0.2)
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct DatasetMetadataRecord {
    num_classes: u32,
    instance_metadata: Vec<InstanceMetadataRecord>,
}

/// Reference data of the dataset. Not mutated by commands.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "DatasetMetadataRecord", into = "DatasetMetadataRecord")]
pub struct DatasetMetadata {
    pub num_classes: u32,
    pub instance_metadata: BTreeMap<ClassId, InstanceMetadata>,
}
impl DatasetMetadata {
    pub fn class_name(&self, class_id: ClassId) -> Option<&str> {
        self.instance_metadata
            .get(&class_id)
            .map(|im| im.name.as_str())
    }
    pub fn default_size(&self, class_id: ClassId) -> Option<Vec3> {
        self.instance_metadata
            .get(&class_id)
            .map(|im| im.default_size)
    }
}
impl From<DatasetMetadataRecord> for DatasetMetadata {
    fn from(r: DatasetMetadataRecord) -> Self {
        Self {
            num_classes: r.num_classes,
            instance_metadata: r
                .instance_metadata
                .into_iter()
                .map(|im| {
                    (
                        im.class_id,
                        InstanceMetadata {
                            name: im.name,
                            default_size: im.default_size,
                        },
                    )
                })
                .collect(),
        }
    }
}
impl From<DatasetMetadata> for DatasetMetadataRecord {
    fn from(md: DatasetMetadata) -> Self {
        Self {
            num_classes: md.num_classes,
            instance_metadata: md
                .instance_metadata
                .into_iter()
                .map(|(class_id, im)| InstanceMetadataRecord {
                    class_id,
                    name: im.name,
                    default_size: im.default_size,
                })
                .collect(),
        }
    }
}

/// Content of an annotation file
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationsData {
    pub keypoints: Vec<Keypoint>,
    pub bounding_boxes: Vec<BoundingBox>,
    pub rectangles: Vec<Rectangle>,
    pub metadata: DatasetMetadata,
}

#[cfg(test)]
use crate::result::LsResult;

#[test]
fn test_keypoint_json() -> LsResult<()> {
    let kp: Keypoint = serde_json::from_str(r#"{"id": 4, "classId": 1, "x": 1.0, "y": 2.0, "z": 3.5}"#)?;
    assert_eq!(kp.id, 4);
    assert_eq!(kp.class_id, 1);
    assert_eq!(kp.position, Vec3::new(1.0, 2.0, 3.5));
    let s = serde_json::to_string(&kp)?;
    assert!(s.contains(r#""classId":1"#));
    assert!(s.contains(r#""z":3.5"#));
    Ok(())
}

#[test]
fn test_annotations_data_json() -> LsResult<()> {
    let s = r#"{
        "boundingBoxes": [
            {"id": 2, "classId": 0, "position": [0, 1, 2], "orientation": [0, 0, 0, 1], "dimensions": [1, 2, 3]}
        ],
        "metadata": {
            "numClasses": 2,
            "instanceMetadata": [{"classId": 1, "name": "chair", "defaultSize": [0.5, 0.5, 1.0]}]
        }
    }"#;
    let data: AnnotationsData = serde_json::from_str(s)?;
    assert!(data.keypoints.is_empty());
    assert!(data.rectangles.is_empty());
    assert_eq!(data.bounding_boxes[0].orientation, Quat::IDENTITY);
    assert_eq!(data.bounding_boxes[0].dimensions, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(data.metadata.num_classes, 2);
    assert_eq!(data.metadata.class_name(1), Some("chair"));
    assert_eq!(data.metadata.default_size(1), Some(Vec3::new(0.5, 0.5, 1.0)));
    assert_eq!(data.metadata.default_size(0), None);
    Ok(())
}

#[test]
fn test_sanitize() {
    let bb = BoundingBox::new(0, Vec3::ZERO, Quat::from_xyzw(0.0, 0.0, 0.0, 2.0), Vec3::new(1.0, -1.0, 0.0))
        .sanitized(1e-3);
    assert_eq!(bb.orientation, Quat::IDENTITY);
    assert_eq!(bb.dimensions, Vec3::new(1.0, 1e-3, 1e-3));
    let rect = Rectangle::new(0, Vec3::ZERO, Quat::IDENTITY, Vec2::new(0.0, 2.0)).sanitized(0.01);
    assert_eq!(rect.size, Vec2::new(0.01, 2.0));
    assert_eq!(rect.normal(), Vec3::Z);
}
