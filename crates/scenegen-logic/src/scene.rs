//! Committed scene state: placed objects, their footprints, and the scene
//! document handed to downstream consumers.

use serde::{Deserialize, Serialize};

use crate::geometry::{Footprint, Vec3};

/// Position and heading on the floor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub position: Vec3,
    pub rotation_y: f64,
}

/// One step-bounded entry of an object's timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    pub action: String,
    pub step_begin: i64,
    pub step_end: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<f64>,
}

/// A placed physical object. `id` is stable for the life of the scene and
/// is what labels and links point at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneObject {
    pub id: String,
    /// Feature type that produced the object.
    pub kind: String,
    pub shape: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    pub position: Vec3,
    pub rotation_y: f64,
    pub size: Vec3,
    pub footprint: Footprint,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub timeline: Vec<TimelineEvent>,
    /// Mechanism that moves this object, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved_by: Option<String>,
}

impl SceneObject {
    pub fn location(&self) -> Location {
        Location {
            position: self.position,
            rotation_y: self.rotation_y,
        }
    }
}

/// Footprints committed so far, in commit order. Only grows during a scene.
#[derive(Debug, Clone, Default)]
pub struct BoundsRegistry {
    entries: Vec<(String, Footprint)>,
}

impl BoundsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: impl Into<String>, footprint: Footprint) {
        self.entries.push((id.into(), footprint));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Footprint)> {
        self.entries.iter().map(|(id, f)| (id.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// The generated scene document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub room: Vec3,
    pub performer_start: Location,
    pub objects: Vec<SceneObject>,
}

impl Scene {
    pub fn object(&self, id: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Objects produced by one feature type.
    pub fn objects_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a SceneObject> + 'a {
        self.objects.iter().filter(move |o| o.kind == kind)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2;

    fn object(id: &str, kind: &str) -> SceneObject {
        SceneObject {
            id: id.into(),
            kind: kind.into(),
            shape: "block".into(),
            material: None,
            position: Vec3::new(0.0, 0.0, 0.0),
            rotation_y: 0.0,
            size: Vec3::new(1.0, 1.0, 1.0),
            footprint: Footprint::rectangle(Point2::new(0.0, 0.0), 1.0, 1.0, 0.0),
            labels: Vec::new(),
            timeline: Vec::new(),
            moved_by: None,
        }
    }

    #[test]
    fn test_bounds_registry_keeps_order() {
        let mut bounds = BoundsRegistry::new();
        let f = Footprint::rectangle(Point2::new(0.0, 0.0), 1.0, 1.0, 0.0);
        bounds.push("a", f.clone());
        bounds.push("b", f);
        let ids: Vec<_> = bounds.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(bounds.len(), 2);
    }

    #[test]
    fn test_scene_lookup_and_json() {
        let scene = Scene {
            room: Vec3::new(10.0, 3.0, 10.0),
            performer_start: Location::default(),
            objects: vec![object("objects-0", "objects"), object("walls-1", "walls")],
        };
        assert!(scene.object("walls-1").is_some());
        assert_eq!(scene.objects_of("objects").count(), 1);
        let json = scene.to_json().unwrap();
        assert!(json.contains("\"objects-0\""));
        // Empty optional sections are omitted
        assert!(!json.contains("timeline"));
    }
}
