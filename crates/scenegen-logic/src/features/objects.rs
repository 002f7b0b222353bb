//! Interactable objects.
//!
//! Placed anywhere in the room, or next to an object carrying the
//! `relative_to` label. Walkable objects may sit under the performer.

use rand::Rng;
use serde_json::Value;

use crate::builder::PartRequest;
use crate::cast::{Cast, ConfigTypeError, FieldReader};
use crate::context::GenerationContext;
use crate::distribution::{round_precision, Choice, Resolve, Vec3Template};
use crate::features::{
    declared, normalize_rotation, random_floor_position, reach, size_from_draft, SizeDraft,
    SizeTemplate,
};
use crate::geometry::{rotate_offset, Vec3};
use crate::labels::LabelEntry;
use crate::placement::{lookup_label, Feature, Interrupt};
use crate::reconcile::{merge_atomic, merge_nested, merge_value, Reconcile};
use crate::validation::PlacementRules;

/// Clearance between an object and the object it is placed against.
pub const ADJACENT_GAP: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectTemplate {
    pub num: Option<Choice<i64>>,
    pub shape: Option<Choice<String>>,
    pub material: Option<Choice<String>>,
    pub size: Option<SizeTemplate>,
    pub position: Option<Choice<Vec3Template>>,
    pub rotation_y: Option<Choice<f64>>,
    /// Place adjacent to an object with this label; a drawn null means
    /// "anywhere".
    pub relative_to: Option<Choice<Option<String>>>,
    pub walkable: Option<Choice<bool>>,
    pub labels: Option<Vec<Choice<String>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDraft {
    pub shape: Option<String>,
    pub material: Option<String>,
    pub size: Option<SizeDraft>,
    pub position: Option<Vec3>,
    pub rotation_y: Option<f64>,
    pub relative_to: Option<Option<String>>,
    pub walkable: Option<bool>,
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSpec {
    pub shape: String,
    pub material: Option<String>,
    pub size: Vec3,
    pub position: Vec3,
    pub rotation_y: f64,
    pub walkable: bool,
    pub labels: Vec<String>,
}

impl Reconcile for ObjectTemplate {
    fn reconcile(&self, o: &Self) -> Self {
        Self {
            num: merge_value(&self.num, &o.num),
            shape: merge_value(&self.shape, &o.shape),
            material: merge_value(&self.material, &o.material),
            size: merge_nested(&self.size, &o.size),
            position: merge_value(&self.position, &o.position),
            rotation_y: merge_value(&self.rotation_y, &o.rotation_y),
            relative_to: merge_value(&self.relative_to, &o.relative_to),
            walkable: merge_value(&self.walkable, &o.walkable),
            labels: merge_atomic(&self.labels, &o.labels),
        }
    }
}

impl Resolve for ObjectTemplate {
    type Output = ObjectDraft;

    fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> ObjectDraft {
        ObjectDraft {
            shape: self.shape.resolve(rng),
            material: self.material.resolve(rng),
            size: self.size.resolve(rng),
            position: self.position.resolve(rng),
            rotation_y: self.rotation_y.resolve(rng),
            relative_to: self.relative_to.resolve(rng),
            walkable: self.walkable.resolve(rng),
            labels: self.labels.resolve(rng),
        }
    }
}

impl Cast for ObjectTemplate {
    fn expected() -> String {
        "object template".into()
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        let mut fields = FieldReader::new(path, raw, &Self::expected())?;
        let template = Self {
            num: fields.optional("num"),
            shape: fields.optional("shape"),
            material: fields.optional("material"),
            size: fields.optional("size"),
            position: fields.optional("position"),
            rotation_y: fields.optional("rotation_y"),
            relative_to: fields.optional("relative_to"),
            walkable: fields.optional("walkable"),
            labels: fields.optional("labels"),
        };
        fields.finish()?;
        Ok(template)
    }
}

pub struct Objects;

impl Feature for Objects {
    type Template = ObjectTemplate;
    type Draft = ObjectDraft;
    type Spec = ObjectSpec;

    fn name(&self) -> &'static str {
        "objects"
    }

    fn default_template(&self) -> ObjectTemplate {
        ObjectTemplate {
            num: Some(Choice::Fixed(1)),
            shape: Some(Choice::pick(
                "block",
                ["ball", "crate", "chair", "table"].map(String::from),
            )),
            material: Some(Choice::pick(
                "wood",
                ["metal", "plastic"].map(String::from),
            )),
            size: Some(SizeTemplate::ranged(0.3, 1.2)),
            position: None,
            rotation_y: Some(Choice::range(0.0, 359.0)),
            relative_to: None,
            walkable: Some(Choice::Fixed(false)),
            labels: None,
        }
    }

    fn count<'t>(&self, template: &'t ObjectTemplate) -> Option<&'t Choice<i64>> {
        template.num.as_ref()
    }

    fn declared_labels(&self, template: &ObjectTemplate) -> Vec<String> {
        declared(&template.labels)
    }

    fn complete<R: Rng + ?Sized>(
        &self,
        draft: ObjectDraft,
        ctx: &GenerationContext,
        rng: &mut R,
    ) -> Result<ObjectSpec, Interrupt> {
        let size = size_from_draft(self.name(), draft.size)?;
        let shape = draft.shape.unwrap_or_else(|| "block".to_string());

        let (position, rotation_y) = match draft.relative_to.flatten() {
            Some(label) => {
                let anchor = lookup_label(ctx, self.name(), &label, rng)?;
                beside(anchor, size, rng)
            }
            None => {
                let position = draft
                    .position
                    .unwrap_or_else(|| random_floor_position(ctx, reach(size.x, size.z), rng));
                (position, normalize_rotation(draft.rotation_y))
            }
        };

        Ok(ObjectSpec {
            shape,
            material: draft.material,
            size,
            position,
            rotation_y,
            walkable: draft.walkable.unwrap_or(false),
            labels: draft.labels.unwrap_or_default(),
        })
    }

    fn parts(&self, spec: &ObjectSpec) -> Vec<PartRequest> {
        vec![PartRequest {
            kind: self.name().to_string(),
            shape: spec.shape.clone(),
            material: spec.material.clone(),
            size: spec.size,
            position: spec.position,
            rotation_y: spec.rotation_y,
        }]
    }

    fn rules(&self, spec: &ObjectSpec) -> PlacementRules {
        PlacementRules {
            performer_may_stand: spec.walkable,
            ..PlacementRules::default()
        }
    }

    fn labels(&self, spec: &ObjectSpec) -> Vec<String> {
        spec.labels.clone()
    }
}

/// Position on a random side of `anchor`, aligned with it.
fn beside<R: Rng + ?Sized>(anchor: &LabelEntry, size: Vec3, rng: &mut R) -> (Vec3, f64) {
    let target = anchor.definition.size;
    let rotation = anchor.location.rotation_y;
    let along_x = (target.x + size.x) / 2.0 + ADJACENT_GAP;
    let along_z = (target.z + size.z) / 2.0 + ADJACENT_GAP;
    let (dx, dz) = match rng.gen_range(0..4) {
        0 => (along_x, 0.0),
        1 => (-along_x, 0.0),
        2 => (0.0, along_z),
        _ => (0.0, -along_z),
    };
    let (ox, oz) = rotate_offset(dx, dz, rotation);
    let origin = anchor.location.position;
    let position = Vec3::new(
        round_precision(origin.x + ox),
        0.0,
        round_precision(origin.z + oz),
    );
    (position, rotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CuboidBuilder;
    use crate::config::GenerationSettings;
    use crate::placement::{place, PlacementOutcome};
    use crate::scene::Location;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn context() -> GenerationContext {
        let mut ctx = GenerationContext::new(GenerationSettings::default());
        ctx.begin_scene(
            Vec3::new(10.0, 3.0, 10.0),
            Location {
                position: Vec3::new(4.5, 0.0, 4.5),
                rotation_y: 0.0,
            },
        );
        ctx
    }

    #[test]
    fn test_defaults_fill_everything() {
        let mut ctx = context();
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..5 {
            let outcome = place(&Objects, &ObjectTemplate::default(), &mut ctx, &CuboidBuilder, &mut rng);
            assert!(matches!(outcome, PlacementOutcome::Committed(_)), "{outcome:?}");
        }
        for o in ctx.objects() {
            assert!(["block", "ball", "crate", "chair", "table"].contains(&o.shape.as_str()));
            assert!((0.3..=1.2).contains(&o.size.x));
            assert!((0.0..360.0).contains(&o.rotation_y));
        }
    }

    #[test]
    fn test_relative_to_places_adjacent() {
        let mut ctx = context();
        ctx.declare_labels(["shelf"]);
        let mut rng = StdRng::seed_from_u64(4);
        let shelf = ObjectTemplate {
            size: Some(SizeTemplate::fixed(2.0, 1.0, 0.5)),
            position: Some(Choice::Fixed(Vec3Template::floor(0.0, 0.0))),
            rotation_y: Some(Choice::Fixed(90.0)),
            labels: Some(vec![Choice::Fixed("shelf".to_string())]),
            ..Default::default()
        };
        place(&Objects, &shelf, &mut ctx, &CuboidBuilder, &mut rng);

        let beside_shelf = ObjectTemplate {
            size: Some(SizeTemplate::fixed(0.5, 0.5, 0.5)),
            relative_to: Some(Choice::fixed(Some("shelf".to_string()))),
            ..Default::default()
        };
        let outcome = place(&Objects, &beside_shelf, &mut ctx, &CuboidBuilder, &mut rng);
        assert!(matches!(outcome, PlacementOutcome::Committed(_)), "{outcome:?}");
        let placed = &ctx.objects()[1];
        assert_eq!(placed.rotation_y, 90.0);
        let distance = placed.position.floor().distance(&ctx.objects()[0].position.floor());
        assert!(
            (distance - 1.3).abs() < 1e-3 || (distance - 0.55).abs() < 1e-3,
            "unexpected distance {distance}"
        );
    }

    #[test]
    fn test_relative_to_missing_label_defers() {
        let mut ctx = context();
        ctx.declare_labels(["shelf"]);
        let mut rng = StdRng::seed_from_u64(4);
        let template = ObjectTemplate {
            relative_to: Some(Choice::fixed(Some("shelf".to_string()))),
            ..Default::default()
        };
        let outcome = place(&Objects, &template, &mut ctx, &CuboidBuilder, &mut rng);
        assert_eq!(outcome, PlacementOutcome::Deferred("shelf".into()));
        assert!(ctx.objects().is_empty());
    }

    #[test]
    fn test_walkable_may_cover_performer() {
        let mut ctx = context();
        let mut rng = StdRng::seed_from_u64(4);
        let rug = ObjectTemplate {
            size: Some(SizeTemplate::fixed(2.0, 0.05, 2.0)),
            position: Some(Choice::Fixed(Vec3Template::floor(4.0, 4.0))),
            rotation_y: Some(Choice::Fixed(0.0)),
            walkable: Some(Choice::Fixed(true)),
            ..Default::default()
        };
        let outcome = place(&Objects, &rug, &mut ctx, &CuboidBuilder, &mut rng);
        assert!(matches!(outcome, PlacementOutcome::Committed(_)));

        let crate_box = ObjectTemplate {
            walkable: Some(Choice::Fixed(false)),
            ..rug
        };
        ctx.begin_scene(ctx.room(), ctx.performer_start());
        let outcome = place(&Objects, &crate_box, &mut ctx, &CuboidBuilder, &mut rng);
        assert!(matches!(outcome, PlacementOutcome::Failed(_)));
    }

    #[test]
    fn test_cast_template() {
        let template = ObjectTemplate::cast(
            "objects[0]",
            &json!({
                "num": {"min": 1, "max": 3},
                "shape": ["ball", "crate"],
                "size": {"width": 0.5},
                "relative_to": [null, "shelf"],
                "labels": ["target"]
            }),
        )
        .unwrap();
        assert_eq!(template.num, Some(Choice::range(1, 3)));
        assert_eq!(template.size.unwrap().width, Some(Choice::Fixed(0.5)));
        assert_eq!(Objects.declared_labels(&ObjectTemplate {
            labels: template.labels,
            ..Default::default()
        }), vec!["target"]);
    }
}
