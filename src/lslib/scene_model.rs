use crate::{
    annotations::{
        AnnotationsData, BoundingBox, ClassId, DatasetMetadata, Id, Keypoint, Rectangle,
    },
    cfg::AnnotationCfg,
    file_util,
    result::{ErrorKind, LsError, LsResult},
};
use labelstudio_domain::{
    glam::Vec3, BoxHit, Geometry, Intersection, PointTolerance, Ray, RayTracer,
};
use std::{collections::BTreeSet, fmt::Debug, path::Path};
use tracing::{info, warn};

/// Access to the id of an annotation such that collections can be handled generically.
pub trait Annotation: Clone + Debug + PartialEq {
    const KIND: &'static str;
    fn id(&self) -> Id;
    fn set_id(&mut self, id: Id);
}
impl Annotation for Keypoint {
    const KIND: &'static str = "keypoint";
    fn id(&self) -> Id {
        self.id
    }
    fn set_id(&mut self, id: Id) {
        self.id = id;
    }
}
impl Annotation for BoundingBox {
    const KIND: &'static str = "bounding box";
    fn id(&self) -> Id {
        self.id
    }
    fn set_id(&mut self, id: Id) {
        self.id = id;
    }
}
impl Annotation for Rectangle {
    const KIND: &'static str = "rectangle";
    fn id(&self) -> Id {
        self.id
    }
    fn set_id(&mut self, id: Id) {
        self.id = id;
    }
}

/// Ordered annotations of one kind with a monotonic id counter. Removed ids are never handed
/// out again.
#[derive(Clone, Debug)]
pub struct AnnoCollection<T> {
    elts: Vec<T>,
    next_id: Id,
}
impl<T> Default for AnnoCollection<T> {
    fn default() -> Self {
        Self {
            elts: vec![],
            next_id: 0,
        }
    }
}
impl<T: PartialEq> PartialEq for AnnoCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.elts == other.elts
    }
}

impl<T: Annotation> AnnoCollection<T> {
    fn from_elts(elts: Vec<T>) -> LsResult<Self> {
        let mut ids = BTreeSet::new();
        for elt in &elts {
            if !ids.insert(elt.id()) {
                return Err(LsError::with_kind(
                    ErrorKind::Parse,
                    &format!("duplicate {} id {}", T::KIND, elt.id()),
                ));
            }
        }
        let next_id = ids.last().map_or(0, |id| id + 1);
        Ok(Self { elts, next_id })
    }
    pub fn as_slice(&self) -> &[T] {
        &self.elts
    }
    pub fn len(&self) -> usize {
        self.elts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.elts.is_empty()
    }
    pub fn next_id(&self) -> Id {
        self.next_id
    }
    pub fn get(&self, id: Id) -> Option<&T> {
        self.elts.iter().find(|elt| elt.id() == id)
    }
    pub fn position(&self, id: Id) -> Option<usize> {
        self.elts.iter().position(|elt| elt.id() == id)
    }
    fn last_id(&self) -> Option<Id> {
        self.elts.last().map(Annotation::id)
    }
    fn add(&mut self, mut elt: T) -> T {
        elt.set_id(self.next_id);
        self.next_id += 1;
        self.elts.push(elt.clone());
        elt
    }
    /// Re-inserts an element that had been issued its id before.
    fn insert(&mut self, idx: usize, elt: T) {
        self.next_id = self.next_id.max(elt.id() + 1);
        if let Some(old) = self.elts.iter_mut().find(|e| e.id() == elt.id()) {
            warn!("{} {} exists already, replacing it", T::KIND, elt.id());
            *old = elt;
        } else {
            self.elts.insert(idx.min(self.elts.len()), elt);
        }
    }
    fn update(&mut self, elt: T) -> LsResult<()> {
        match self.elts.iter_mut().find(|e| e.id() == elt.id()) {
            Some(old) => {
                *old = elt;
                Ok(())
            }
            None => Err(LsError::not_found(&format!(
                "cannot update {} {} since it does not exist",
                T::KIND,
                elt.id()
            ))),
        }
    }
    fn remove(&mut self, id: Id) -> Option<(usize, T)> {
        let idx = self.position(id)?;
        Some((idx, self.elts.remove(idx)))
    }
}

/// Currently active annotations. `None` means nothing of that kind is selected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub keypoint: Option<Id>,
    pub bounding_box: Option<Id>,
    pub rectangle: Option<Id>,
}

/// Owns the annotations, the dataset metadata and the scene geometry. Annotations can only be
/// changed by commands, see [`crate::commands`].
#[derive(Clone, Debug, Default)]
pub struct SceneModel {
    keypoints: AnnoCollection<Keypoint>,
    bounding_boxes: AnnoCollection<BoundingBox>,
    rectangles: AnnoCollection<Rectangle>,
    selection: Selection,
    metadata: DatasetMetadata,
    annotation_cfg: AnnotationCfg,
    geometry: Option<Geometry>,
    geometry_version: u64,
    raytracer: RayTracer,
}

impl PartialEq for SceneModel {
    fn eq(&self, other: &Self) -> bool {
        self.keypoints == other.keypoints
            && self.bounding_boxes == other.bounding_boxes
            && self.rectangles == other.rectangles
            && self.selection == other.selection
            && self.metadata == other.metadata
            && self.geometry_version == other.geometry_version
    }
}

fn reselect(selected: &mut Option<Id>, removed: Id, last: Option<Id>) {
    if *selected == Some(removed) {
        *selected = last;
    }
}

impl SceneModel {
    pub fn new(annotation_cfg: AnnotationCfg) -> Self {
        Self {
            annotation_cfg,
            ..Default::default()
        }
    }
    pub fn from_annotations(data: AnnotationsData, annotation_cfg: AnnotationCfg) -> LsResult<Self> {
        let mut model = Self::new(annotation_cfg);
        model.set_annotations(data)?;
        Ok(model)
    }

    fn set_annotations(&mut self, data: AnnotationsData) -> LsResult<()> {
        let min_dim = self.annotation_cfg.min_dimension;
        let AnnotationsData {
            keypoints,
            bounding_boxes,
            rectangles,
            metadata,
        } = data;
        let keypoints = AnnoCollection::from_elts(keypoints)?;
        let bounding_boxes = AnnoCollection::from_elts(
            bounding_boxes
                .into_iter()
                .map(|bb| bb.sanitized(min_dim))
                .collect(),
        )?;
        let rectangles = AnnoCollection::from_elts(
            rectangles
                .into_iter()
                .map(|r| r.sanitized(min_dim))
                .collect(),
        )?;
        self.keypoints = keypoints;
        self.bounding_boxes = bounding_boxes;
        self.rectangles = rectangles;
        self.metadata = metadata;
        self.selection = Selection::default();
        Ok(())
    }

    pub fn to_annotations(&self) -> AnnotationsData {
        AnnotationsData {
            keypoints: self.keypoints.as_slice().to_vec(),
            bounding_boxes: self.bounding_boxes.as_slice().to_vec(),
            rectangles: self.rectangles.as_slice().to_vec(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn save(&self, path: &Path) -> LsResult<()> {
        let s = serde_json::to_string_pretty(&self.to_annotations())?;
        file_util::write(path, s)?;
        info!(
            "saved {} keypoints, {} boxes and {} rectangles to {path:?}",
            self.keypoints.len(),
            self.bounding_boxes.len(),
            self.rectangles.len()
        );
        Ok(())
    }

    /// Replaces annotations and metadata with the content of `path`. On failure the model is
    /// left unchanged.
    pub fn load(&mut self, path: &Path) -> LsResult<()> {
        let s = file_util::read_to_string(path)?;
        let data: AnnotationsData = serde_json::from_str(&s).map_err(|e| {
            LsError::with_kind(ErrorKind::Parse, &format!("could not parse {path:?} due to {e}"))
        })?;
        self.set_annotations(data)?;
        info!("loaded annotations from {path:?}");
        Ok(())
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        self.keypoints.as_slice()
    }
    pub fn bounding_boxes(&self) -> &[BoundingBox] {
        self.bounding_boxes.as_slice()
    }
    pub fn rectangles(&self) -> &[Rectangle] {
        self.rectangles.as_slice()
    }
    pub fn get_keypoint(&self, id: Id) -> Option<&Keypoint> {
        self.keypoints.get(id)
    }
    pub fn get_bounding_box(&self, id: Id) -> Option<&BoundingBox> {
        self.bounding_boxes.get(id)
    }
    pub fn get_rectangle(&self, id: Id) -> Option<&Rectangle> {
        self.rectangles.get(id)
    }
    pub fn next_keypoint_id(&self) -> Id {
        self.keypoints.next_id()
    }
    pub fn next_bounding_box_id(&self) -> Id {
        self.bounding_boxes.next_id()
    }
    pub fn next_rectangle_id(&self) -> Id {
        self.rectangles.next_id()
    }
    pub fn selection(&self) -> Selection {
        self.selection
    }
    pub fn active_keypoint(&self) -> Option<&Keypoint> {
        self.selection.keypoint.and_then(|id| self.get_keypoint(id))
    }
    pub fn active_bounding_box(&self) -> Option<&BoundingBox> {
        self.selection
            .bounding_box
            .and_then(|id| self.get_bounding_box(id))
    }
    pub fn active_rectangle(&self) -> Option<&Rectangle> {
        self.selection.rectangle.and_then(|id| self.get_rectangle(id))
    }
    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }
    pub fn set_metadata(&mut self, metadata: DatasetMetadata) {
        self.metadata = metadata;
    }
    pub fn annotation_cfg(&self) -> &AnnotationCfg {
        &self.annotation_cfg
    }
    /// Box size of new annotations of the given class.
    pub fn default_size(&self, class_id: ClassId) -> Vec3 {
        self.metadata
            .default_size(class_id)
            .unwrap_or(self.annotation_cfg.default_box_size)
    }

    pub(crate) fn add_keypoint(&mut self, kp: Keypoint) -> Keypoint {
        let kp = self.keypoints.add(kp);
        self.selection.keypoint = Some(kp.id);
        kp
    }
    pub(crate) fn insert_keypoint(&mut self, idx: usize, kp: Keypoint) {
        self.keypoints.insert(idx, kp);
    }
    pub(crate) fn update_keypoint(&mut self, kp: Keypoint) -> LsResult<()> {
        self.keypoints.update(kp)
    }
    pub(crate) fn remove_keypoint(&mut self, id: Id) -> Option<(usize, Keypoint)> {
        let removed = self.keypoints.remove(id);
        reselect(&mut self.selection.keypoint, id, self.keypoints.last_id());
        removed
    }

    pub(crate) fn add_bounding_box(&mut self, bb: BoundingBox) -> BoundingBox {
        let bb = self
            .bounding_boxes
            .add(bb.sanitized(self.annotation_cfg.min_dimension));
        self.selection.bounding_box = Some(bb.id);
        bb
    }
    pub(crate) fn insert_bounding_box(&mut self, idx: usize, bb: BoundingBox) {
        self.bounding_boxes.insert(idx, bb);
    }
    pub(crate) fn update_bounding_box(&mut self, bb: BoundingBox) -> LsResult<()> {
        self.bounding_boxes
            .update(bb.sanitized(self.annotation_cfg.min_dimension))
    }
    pub(crate) fn remove_bounding_box(&mut self, id: Id) -> Option<(usize, BoundingBox)> {
        let removed = self.bounding_boxes.remove(id);
        reselect(
            &mut self.selection.bounding_box,
            id,
            self.bounding_boxes.last_id(),
        );
        removed
    }

    pub(crate) fn add_rectangle(&mut self, rect: Rectangle) -> Rectangle {
        let rect = self
            .rectangles
            .add(rect.sanitized(self.annotation_cfg.min_dimension));
        self.selection.rectangle = Some(rect.id);
        rect
    }
    pub(crate) fn insert_rectangle(&mut self, idx: usize, rect: Rectangle) {
        self.rectangles.insert(idx, rect);
    }
    pub(crate) fn update_rectangle(&mut self, rect: Rectangle) -> LsResult<()> {
        self.rectangles
            .update(rect.sanitized(self.annotation_cfg.min_dimension))
    }
    pub(crate) fn remove_rectangle(&mut self, id: Id) -> Option<(usize, Rectangle)> {
        let removed = self.rectangles.remove(id);
        reselect(&mut self.selection.rectangle, id, self.rectangles.last_id());
        removed
    }

    /// Only ids of existing annotations are accepted, others are dropped.
    pub(crate) fn set_selection(&mut self, selection: Selection) {
        self.selection = Selection {
            keypoint: selection.keypoint.filter(|id| self.keypoints.get(*id).is_some()),
            bounding_box: selection
                .bounding_box
                .filter(|id| self.bounding_boxes.get(*id).is_some()),
            rectangle: selection
                .rectangle
                .filter(|id| self.rectangles.get(*id).is_some()),
        };
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }
    pub fn geometry_version(&self) -> u64 {
        self.geometry_version
    }
    pub fn raytracer(&self) -> &RayTracer {
        &self.raytracer
    }
    /// Replaces the scene geometry and rebuilds the ray tracing structure. Blocks until the
    /// rebuild is done.
    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry_version += 1;
        self.raytracer =
            RayTracer::build(&geometry, self.geometry_version, self.raytracer.tolerance());
        self.geometry = Some(geometry);
    }
    pub fn set_point_tolerance(&mut self, tolerance: PointTolerance) {
        self.raytracer.set_tolerance(tolerance);
    }

    pub fn trace_ray(&self, origin: Vec3, direction: Vec3) -> LsResult<Option<Vec3>> {
        Ok(self
            .trace_ray_intersection(origin, direction)?
            .map(|isct| isct.point))
    }
    pub fn trace_ray_intersection(
        &self,
        origin: Vec3,
        direction: Vec3,
    ) -> LsResult<Option<Intersection>> {
        self.raytracer.query(origin, direction)
    }

    /// Nearest bounding box hit by the ray
    pub fn pick_bounding_box(&self, ray: &Ray) -> Option<(Id, BoxHit)> {
        self.bounding_boxes
            .as_slice()
            .iter()
            .filter_map(|bb| {
                bb.to_oriented_box()
                    .ray_intersection(ray)
                    .map(|hit| (bb.id, hit))
            })
            .min_by(|(_, a), (_, b)| a.distance.total_cmp(&b.distance))
    }
    /// Nearest rectangle hit by the ray with the ray parameter of the hit
    pub fn pick_rectangle(&self, ray: &Ray) -> Option<(Id, f32)> {
        self.rectangles
            .as_slice()
            .iter()
            .filter_map(|r| r.to_oriented_rect().ray_intersection(ray).map(|t| (r.id, t)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
    }
}

#[cfg(test)]
use {
    crate::{defer_file_removal, file_util::get_test_folder},
    labelstudio_domain::{
        glam::{Mat4, Quat, Vec2},
        PointCloud,
    },
};

#[test]
fn test_ids_not_reused() {
    let mut model = SceneModel::default();
    let a = model.add_keypoint(Keypoint::new(0, Vec3::ZERO));
    let b = model.add_keypoint(Keypoint::new(0, Vec3::ONE));
    assert_eq!((a.id, b.id), (0, 1));
    model.remove_keypoint(b.id);
    let c = model.add_keypoint(Keypoint::new(0, Vec3::X));
    assert_eq!(c.id, 2);
    assert_eq!(model.next_keypoint_id(), 3);
    assert_eq!(model.selection().keypoint, Some(2));
}

#[test]
fn test_remove_reselects() {
    let mut model = SceneModel::default();
    let ids = (0..3)
        .map(|i| model.add_bounding_box(BoundingBox::new(i, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE)).id)
        .collect::<Vec<_>>();
    assert_eq!(model.selection().bounding_box, Some(ids[2]));
    model.remove_bounding_box(ids[2]);
    assert_eq!(model.selection().bounding_box, Some(ids[1]));
    // removing a box that is not selected keeps the selection
    model.remove_bounding_box(ids[0]);
    assert_eq!(model.selection().bounding_box, Some(ids[1]));
    model.remove_bounding_box(ids[1]);
    assert_eq!(model.selection().bounding_box, None);
    assert!(model.remove_bounding_box(ids[1]).is_none());
}

#[test]
fn test_update_not_found() {
    let mut model = SceneModel::default();
    let mut kp = Keypoint::new(0, Vec3::ZERO);
    kp.id = 7;
    let err = model.update_keypoint(kp).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(model.keypoints().is_empty());
}

#[test]
fn test_sanitize_on_write() -> LsResult<()> {
    let mut model = SceneModel::default();
    let mut bb = model.add_bounding_box(BoundingBox::new(
        0,
        Vec3::ZERO,
        Quat::from_xyzw(0.0, 0.0, 1.0, 1.0),
        Vec3::new(1.0, 0.0, 1.0),
    ));
    assert!((bb.orientation.length() - 1.0).abs() < 1e-6);
    assert!(bb.dimensions.y > 0.0);
    bb.dimensions.x = -3.0;
    model.update_bounding_box(bb)?;
    assert!(model.bounding_boxes()[0].dimensions.x > 0.0);
    Ok(())
}

#[test]
fn test_save_load() -> LsResult<()> {
    let path = get_test_folder().join("tmp-scene-model-save-load.json");
    defer_file_removal!(&path);
    let mut model = SceneModel::default();
    model.add_keypoint(Keypoint::new(1, Vec3::new(1.0, 2.0, 3.0)));
    let removed = model.add_keypoint(Keypoint::new(1, Vec3::ZERO));
    model.add_keypoint(Keypoint::new(2, Vec3::ONE));
    model.remove_keypoint(removed.id);
    model.add_rectangle(Rectangle::new(0, Vec3::X, Quat::IDENTITY, Vec2::new(1.0, 2.0)));
    model.save(&path)?;

    let mut loaded = SceneModel::default();
    loaded.load(&path)?;
    assert_eq!(loaded.keypoints(), model.keypoints());
    assert_eq!(loaded.rectangles(), model.rectangles());
    assert_eq!(
        loaded.keypoints().iter().map(|kp| kp.id).collect::<Vec<_>>(),
        vec![0, 2]
    );
    assert_eq!(loaded.next_keypoint_id(), 3);
    assert_eq!(loaded.selection(), Selection::default());
    Ok(())
}

#[test]
fn test_duplicate_ids() {
    let mut data = AnnotationsData::default();
    data.keypoints = vec![Keypoint::new(0, Vec3::ZERO), Keypoint::new(0, Vec3::ONE)];
    let err = SceneModel::from_annotations(data, AnnotationCfg::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_trace_ray() -> LsResult<()> {
    let mut model = SceneModel::default();
    assert_eq!(model.trace_ray(Vec3::Z, -Vec3::Z)?, None);
    model.set_geometry(Geometry::PointCloud(PointCloud::new(
        vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)],
        Mat4::IDENTITY,
    )));
    assert_eq!(model.geometry_version(), 1);
    assert_eq!(model.raytracer().geometry_version(), 1);
    assert_eq!(model.trace_ray(Vec3::new(0.0, 0.0, 0.2), -Vec3::Z)?, Some(Vec3::ZERO));
    let err = model.trace_ray(Vec3::ZERO, Vec3::ZERO).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DegenerateInput);
    Ok(())
}

#[test]
fn test_pick_annotations() -> LsResult<()> {
    let mut model = SceneModel::default();
    let near = model.add_bounding_box(BoundingBox::new(0, Vec3::new(0.0, 0.0, 1.0), Quat::IDENTITY, Vec3::ONE));
    model.add_bounding_box(BoundingBox::new(0, Vec3::new(0.0, 0.0, -2.0), Quat::IDENTITY, Vec3::ONE));
    let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z)?;
    let (id, hit) = model.pick_bounding_box(&ray).unwrap();
    assert_eq!(id, near.id);
    assert!((hit.distance - 3.5).abs() < 1e-5);
    assert!(model.pick_rectangle(&ray).is_none());
    let rect = model.add_rectangle(Rectangle::new(0, Vec3::new(0.0, 0.0, 3.0), Quat::IDENTITY, Vec2::ONE));
    let (id, t) = model.pick_rectangle(&ray).unwrap();
    assert_eq!(id, rect.id);
    assert!((t - 2.0).abs() < 1e-5);
    Ok(())
}
