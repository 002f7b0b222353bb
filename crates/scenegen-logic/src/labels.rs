//! Label repository: lets one feature find objects placed by another.
//!
//! Maps a label to every committed entry registered under it, in commit
//! order. The repository lives inside the generation context and is cleared
//! when a new scene begins; nothing is ever evicted within a scene.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::geometry::Vec3;
use crate::scene::{Location, SceneObject};

/// What was asked for when an object was built.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDefinition {
    pub kind: String,
    pub shape: String,
    pub material: Option<String>,
    pub size: Vec3,
}

/// One labelled object: the instance, its definition, and where it went.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEntry {
    pub instance: SceneObject,
    pub definition: ObjectDefinition,
    pub location: Location,
}

impl LabelEntry {
    pub fn from_object(object: &SceneObject) -> Self {
        Self {
            definition: ObjectDefinition {
                kind: object.kind.clone(),
                shape: object.shape.clone(),
                material: object.material.clone(),
                size: object.size,
            },
            location: object.location(),
            instance: object.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelRepository {
    entries: HashMap<String, Vec<LabelEntry>>,
}

impl LabelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether at least one entry carries `label`.
    pub fn has_label(&self, label: &str) -> bool {
        self.entries.get(label).is_some_and(|e| !e.is_empty())
    }

    /// Register `entries` under every label in `labels`. Empty `entries`
    /// is a no-op; a label repeated in `labels` is only applied once.
    pub fn add<S: AsRef<str>>(&mut self, entries: &[LabelEntry], labels: &[S]) {
        if entries.is_empty() {
            return;
        }
        let mut applied: Vec<&str> = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.as_ref();
            if applied.contains(&label) {
                continue;
            }
            applied.push(label);
            self.entries
                .entry(label.to_string())
                .or_default()
                .extend(entries.iter().cloned());
        }
    }

    /// Uniform pick among the entries under `label`.
    pub fn get_one_random<R: Rng + ?Sized>(&self, label: &str, rng: &mut R) -> Option<&LabelEntry> {
        self.get_all(label).choose(rng)
    }

    /// Every entry under `label`, in insertion order.
    pub fn get_all(&self, label: &str) -> &[LabelEntry] {
        self.entries.get(label).map_or(&[], |e| e.as_slice())
    }

    /// Labels with at least one entry, sorted.
    pub fn labels(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, e)| !e.is_empty())
            .map(|(l, _)| l.as_str())
            .collect();
        out.sort_unstable();
        out
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
