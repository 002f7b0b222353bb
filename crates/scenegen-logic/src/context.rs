//! Per-scene generation state.
//!
//! One [`GenerationContext`] is threaded by `&mut` through every placement
//! of a scene. It owns the bounds registry, the label repository, and the
//! committed objects; [`GenerationContext::begin_scene`] resets all three.

use std::collections::HashSet;

use crate::config::GenerationSettings;
use crate::geometry::{Point2, RoomExtents, Vec3};
use crate::labels::{LabelEntry, LabelRepository};
use crate::scene::{BoundsRegistry, Location, Scene, SceneObject};

#[derive(Debug, Clone)]
pub struct GenerationContext {
    settings: GenerationSettings,
    room: Vec3,
    performer_start: Location,
    bounds: BoundsRegistry,
    labels: LabelRepository,
    objects: Vec<SceneObject>,
    declared_labels: HashSet<String>,
}

impl GenerationContext {
    pub fn new(settings: GenerationSettings) -> Self {
        Self {
            settings,
            room: Vec3::default(),
            performer_start: Location::default(),
            bounds: BoundsRegistry::new(),
            labels: LabelRepository::new(),
            objects: Vec::new(),
            declared_labels: HashSet::new(),
        }
    }

    /// Start a fresh scene: forget every committed object, footprint, and
    /// label from the previous one.
    pub fn begin_scene(&mut self, room: Vec3, performer_start: Location) {
        self.room = room;
        self.performer_start = performer_start;
        self.bounds.clear();
        self.labels.clear();
        self.objects.clear();
        self.declared_labels.clear();
    }

    /// Record labels that some group in this scene can produce.
    pub fn declare_labels<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared_labels.extend(labels.into_iter().map(Into::into));
    }

    pub fn is_declared(&self, label: &str) -> bool {
        self.declared_labels.contains(label)
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn room(&self) -> Vec3 {
        self.room
    }

    pub fn extents(&self) -> RoomExtents {
        RoomExtents::from_dimensions(&self.room)
    }

    pub fn performer_start(&self) -> Location {
        self.performer_start
    }

    pub fn performer_floor(&self) -> Point2 {
        self.performer_start.position.floor()
    }

    pub fn bounds(&self) -> &BoundsRegistry {
        &self.bounds
    }

    pub fn labels(&self) -> &LabelRepository {
        &self.labels
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Id for the `offset`-th part of the next candidate. Ids are unique
    /// within a scene because committed objects only grow.
    pub fn candidate_id(&self, kind: &str, offset: usize) -> String {
        format!("{kind}-{}", self.objects.len() + offset)
    }

    /// Commit validated parts: footprints, objects, then labels. Returns
    /// the committed ids.
    pub(crate) fn commit(&mut self, parts: Vec<SceneObject>, labels: &[String]) -> Vec<String> {
        let entries: Vec<LabelEntry> = parts.iter().map(LabelEntry::from_object).collect();
        self.labels.add(&entries, labels);
        let mut ids = Vec::with_capacity(parts.len());
        for part in parts {
            self.bounds.push(part.id.clone(), part.footprint.clone());
            ids.push(part.id.clone());
            self.objects.push(part);
        }
        ids
    }

    /// Snapshot of the scene as committed so far.
    pub fn scene(&self) -> Scene {
        Scene {
            room: self.room,
            performer_start: self.performer_start,
            objects: self.objects.clone(),
        }
    }

    /// Consume the context, yielding the scene without cloning objects.
    pub fn into_scene(self) -> Scene {
        Scene {
            room: self.room,
            performer_start: self.performer_start,
            objects: self.objects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{CuboidBuilder, GeometryBuilder, PartRequest};

    fn part(ctx: &GenerationContext, offset: usize) -> SceneObject {
        CuboidBuilder
            .build(
                &ctx.candidate_id("objects", offset),
                &PartRequest {
                    kind: "objects".into(),
                    shape: "block".into(),
                    material: None,
                    size: Vec3::new(1.0, 1.0, 1.0),
                    position: Vec3::new(offset as f64 * 2.0, 0.0, 0.0),
                    rotation_y: 0.0,
                },
            )
            .unwrap()
    }

    #[test]
    fn test_commit_updates_all_stores() {
        let mut ctx = GenerationContext::new(GenerationSettings::default());
        ctx.begin_scene(Vec3::new(10.0, 3.0, 10.0), Location::default());
        let parts = vec![part(&ctx, 0), part(&ctx, 1)];
        let ids = ctx.commit(parts, &["objects".to_string()]);
        assert_eq!(ids, vec!["objects-0", "objects-1"]);
        assert_eq!(ctx.bounds().len(), 2);
        assert_eq!(ctx.labels().get_all("objects").len(), 2);
        assert_eq!(ctx.candidate_id("walls", 0), "walls-2");
    }

    #[test]
    fn test_begin_scene_resets_state() {
        let mut ctx = GenerationContext::new(GenerationSettings::default());
        ctx.begin_scene(Vec3::new(10.0, 3.0, 10.0), Location::default());
        ctx.declare_labels(["shelf"]);
        let parts = vec![part(&ctx, 0)];
        ctx.commit(parts, &["shelf".to_string()]);

        ctx.begin_scene(Vec3::new(8.0, 3.0, 8.0), Location::default());
        assert!(ctx.bounds().is_empty());
        assert!(ctx.objects().is_empty());
        assert!(!ctx.labels().has_label("shelf"));
        assert!(!ctx.is_declared("shelf"));
        assert_eq!(ctx.room().x, 8.0);
    }
}
