//! Spatial validation for placement candidates and finished scenes.
//!
//! Pure functions over footprints. [`check_placement`] decides whether one
//! candidate may be committed; the audit section re-checks a whole scene
//! after the fact and is what the harness runs.

use thiserror::Error;

use crate::builder::BuildError;
use crate::geometry::{Point2, RoomExtents};
use crate::scene::{BoundsRegistry, Scene, SceneObject};

/// Why one placement attempt was refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("{object} extends outside the room")]
    OutsideRoom { object: String },
    #[error("{object} overlaps {other}")]
    Overlap { object: String, other: String },
    #[error("{object} encloses the performer start")]
    EnclosesPerformer { object: String },
    #[error("{object} breaks rule: {rule}")]
    Rule { object: String, rule: String },
    #[error("build failed: {0}")]
    Build(#[from] BuildError),
}

/// Per-feature relaxations of the default checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRules {
    /// How far past each wall a footprint may reach.
    pub extent_allowance: f64,
    /// The performer may start on top of this object.
    pub performer_may_stand: bool,
}

impl Default for PlacementRules {
    fn default() -> Self {
        Self {
            extent_allowance: 0.0,
            performer_may_stand: false,
        }
    }
}

/// Check every part of `candidate` against the room, the performer start,
/// the committed footprints, and the parts before it in the same candidate.
pub fn check_placement(
    candidate: &[SceneObject],
    existing: &BoundsRegistry,
    room: &RoomExtents,
    performer_start: Point2,
    rules: &PlacementRules,
) -> Result<(), Rejection> {
    for (i, part) in candidate.iter().enumerate() {
        if !room.contains(&part.footprint, rules.extent_allowance) {
            return Err(Rejection::OutsideRoom {
                object: part.id.clone(),
            });
        }
        if !rules.performer_may_stand && part.footprint.contains(performer_start) {
            return Err(Rejection::EnclosesPerformer {
                object: part.id.clone(),
            });
        }
        if let Some((other, _)) = existing
            .iter()
            .find(|(_, footprint)| part.footprint.intersects(footprint))
        {
            return Err(Rejection::Overlap {
                object: part.id.clone(),
                other: other.to_string(),
            });
        }
        if let Some(sibling) = candidate[..i]
            .iter()
            .find(|s| part.footprint.intersects(&s.footprint))
        {
            return Err(Rejection::Overlap {
                object: part.id.clone(),
                other: sibling.id.clone(),
            });
        }
    }
    Ok(())
}

/// Boolean form of [`check_placement`].
pub fn is_valid(
    candidate: &[SceneObject],
    existing: &BoundsRegistry,
    room: &RoomExtents,
    performer_start: Point2,
    rules: &PlacementRules,
) -> bool {
    check_placement(candidate, existing, room, performer_start, rules).is_ok()
}

// ── Scene audit ─────────────────────────────────────────────────────────

/// A problem found in a finished scene.
#[derive(Debug, Clone)]
pub struct AuditIssue {
    pub category: &'static str,
    pub message: String,
}

/// Extent allowance a committed object of `kind` was placed under.
pub fn allowance_for(kind: &str) -> f64 {
    match kind {
        "floor_patches" => 0.5,
        _ => 0.0,
    }
}

/// Check that no two objects in the scene overlap.
pub fn check_scene_overlaps(scene: &Scene) -> Vec<AuditIssue> {
    let mut issues = Vec::new();
    for (i, a) in scene.objects.iter().enumerate() {
        for b in &scene.objects[i + 1..] {
            if a.footprint.intersects(&b.footprint) {
                issues.push(AuditIssue {
                    category: "overlap",
                    message: format!("{} and {} overlap", a.id, b.id),
                });
            }
        }
    }
    issues
}

/// Check that every object lies within the room, up to its feature's
/// allowance.
pub fn check_scene_extents(scene: &Scene) -> Vec<AuditIssue> {
    let room = RoomExtents::from_dimensions(&scene.room);
    scene
        .objects
        .iter()
        .filter(|o| !room.contains(&o.footprint, allowance_for(&o.kind)))
        .map(|o| AuditIssue {
            category: "extent",
            message: format!(
                "{} at ({:.2}, {:.2}) leaves the {}x{} room",
                o.id, o.position.x, o.position.z, scene.room.x, scene.room.z
            ),
        })
        .collect()
}

/// Check that every link (`moved_by`, timeline targets) names an object
/// in the scene.
pub fn check_scene_links(scene: &Scene) -> Vec<AuditIssue> {
    let mut issues = Vec::new();
    for o in &scene.objects {
        let targets = o
            .moved_by
            .iter()
            .chain(o.timeline.iter().filter_map(|e| e.target.as_ref()));
        for target in targets {
            if scene.object(target).is_none() {
                issues.push(AuditIssue {
                    category: "link",
                    message: format!("{} links to missing object {}", o.id, target),
                });
            }
        }
    }
    issues
}

/// Run every scene audit.
pub fn audit_scene(scene: &Scene) -> Vec<AuditIssue> {
    let mut issues = check_scene_overlaps(scene);
    issues.extend(check_scene_extents(scene));
    issues.extend(check_scene_links(scene));
    issues
}
