//! Floor-embedded patches (lava, holes). Flat, may reach slightly past the
//! walls, and never under the performer.

use rand::Rng;
use serde_json::Value;

use crate::builder::PartRequest;
use crate::cast::{Cast, ConfigTypeError, FieldReader};
use crate::context::GenerationContext;
use crate::distribution::{Choice, Resolve, Vec3Template};
use crate::error::GenerationError;
use crate::features::{declared, random_floor_position};
use crate::geometry::Vec3;
use crate::placement::{Feature, Interrupt};
use crate::reconcile::{merge_atomic, merge_value, Reconcile};
use crate::validation::{allowance_for, PlacementRules};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FloorPatchTemplate {
    pub num: Option<Choice<i64>>,
    /// Patch type, e.g. `lava` or `hole`.
    pub kind: Option<Choice<String>>,
    pub width: Option<Choice<f64>>,
    pub depth: Option<Choice<f64>>,
    pub position: Option<Choice<Vec3Template>>,
    pub labels: Option<Vec<Choice<String>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloorPatchDraft {
    pub kind: Option<String>,
    pub width: Option<f64>,
    pub depth: Option<f64>,
    pub position: Option<Vec3>,
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloorPatchSpec {
    pub kind: String,
    pub width: f64,
    pub depth: f64,
    pub position: Vec3,
    pub labels: Vec<String>,
}

impl Reconcile for FloorPatchTemplate {
    fn reconcile(&self, o: &Self) -> Self {
        Self {
            num: merge_value(&self.num, &o.num),
            kind: merge_value(&self.kind, &o.kind),
            width: merge_value(&self.width, &o.width),
            depth: merge_value(&self.depth, &o.depth),
            position: merge_value(&self.position, &o.position),
            labels: merge_atomic(&self.labels, &o.labels),
        }
    }
}

impl Resolve for FloorPatchTemplate {
    type Output = FloorPatchDraft;

    fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> FloorPatchDraft {
        FloorPatchDraft {
            kind: self.kind.resolve(rng),
            width: self.width.resolve(rng),
            depth: self.depth.resolve(rng),
            position: self.position.resolve(rng),
            labels: self.labels.resolve(rng),
        }
    }
}

impl Cast for FloorPatchTemplate {
    fn expected() -> String {
        "floor patch template".into()
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        let mut fields = FieldReader::new(path, raw, &Self::expected())?;
        let template = Self {
            num: fields.optional("num"),
            kind: fields.optional("kind"),
            width: fields.optional("width"),
            depth: fields.optional("depth"),
            position: fields.optional("position"),
            labels: fields.optional("labels"),
        };
        fields.finish()?;
        Ok(template)
    }
}

pub struct FloorPatches;

impl Feature for FloorPatches {
    type Template = FloorPatchTemplate;
    type Draft = FloorPatchDraft;
    type Spec = FloorPatchSpec;

    fn name(&self) -> &'static str {
        "floor_patches"
    }

    fn default_template(&self) -> FloorPatchTemplate {
        FloorPatchTemplate {
            num: Some(Choice::Fixed(1)),
            kind: Some(Choice::pick("lava", ["hole".to_string()])),
            width: Some(Choice::range(0.5, 2.0)),
            depth: Some(Choice::range(0.5, 2.0)),
            position: None,
            labels: None,
        }
    }

    fn count<'t>(&self, template: &'t FloorPatchTemplate) -> Option<&'t Choice<i64>> {
        template.num.as_ref()
    }

    fn declared_labels(&self, template: &FloorPatchTemplate) -> Vec<String> {
        declared(&template.labels)
    }

    fn complete<R: Rng + ?Sized>(
        &self,
        draft: FloorPatchDraft,
        ctx: &GenerationContext,
        rng: &mut R,
    ) -> Result<FloorPatchSpec, Interrupt> {
        let (width, depth) = (draft.width.unwrap_or(1.0), draft.depth.unwrap_or(1.0));
        if width <= 0.0 || depth <= 0.0 {
            return Err(GenerationError::configuration(
                self.name(),
                format!("patch {width}x{depth} is not positive"),
            )
            .into());
        }
        let margin = (width.max(depth) / 2.0 - allowance_for(self.name())).max(0.0);
        let position = draft
            .position
            .unwrap_or_else(|| random_floor_position(ctx, margin, rng));
        Ok(FloorPatchSpec {
            kind: draft.kind.unwrap_or_else(|| "lava".to_string()),
            width,
            depth,
            position: Vec3::new(position.x, 0.0, position.z),
            labels: draft.labels.unwrap_or_default(),
        })
    }

    fn parts(&self, spec: &FloorPatchSpec) -> Vec<PartRequest> {
        vec![PartRequest {
            kind: self.name().to_string(),
            shape: spec.kind.clone(),
            material: None,
            size: Vec3::new(spec.width, 0.0, spec.depth),
            position: spec.position,
            rotation_y: 0.0,
        }]
    }

    fn rules(&self, _spec: &FloorPatchSpec) -> PlacementRules {
        PlacementRules {
            extent_allowance: allowance_for(self.name()),
            performer_may_stand: false,
        }
    }

    fn labels(&self, spec: &FloorPatchSpec) -> Vec<String> {
        spec.labels.clone()
    }
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

    fn context() -> GenerationContext {
        let mut ctx = GenerationContext::new(GenerationSettings {
            retry_budget: 10,
            ..Default::default()
        });
        ctx.begin_scene(
            Vec3::new(10.0, 3.0, 10.0),
            Location {
                position: Vec3::new(0.0, 0.0, 0.0),
                rotation_y: 0.0,
            },
        );
        ctx
    }

    fn patch_at(x: f64, z: f64) -> FloorPatchTemplate {
        FloorPatchTemplate {
            width: Some(Choice::Fixed(1.0)),
            depth: Some(Choice::Fixed(1.0)),
            position: Some(Choice::Fixed(Vec3Template::floor(x, z))),
            ..Default::default()
        }
    }

    #[test]
    fn test_patch_may_reach_past_wall() {
        let mut ctx = context();
        let mut rng = StdRng::seed_from_u64(8);
        let outcome = place(&FloorPatches, &patch_at(4.8, 0.0), &mut ctx, &CuboidBuilder, &mut rng);
        assert!(matches!(outcome, PlacementOutcome::Committed(_)), "{outcome:?}");
        assert_eq!(ctx.objects()[0].size.y, 0.0);

        let outcome = place(&FloorPatches, &patch_at(-5.2, 0.0), &mut ctx, &CuboidBuilder, &mut rng);
        assert!(matches!(outcome, PlacementOutcome::Failed(_)));
    }

    #[test]
    fn test_patch_never_under_performer() {
        let mut ctx = context();
        let mut rng = StdRng::seed_from_u64(8);
        let outcome = place(&FloorPatches, &patch_at(0.2, 0.2), &mut ctx, &CuboidBuilder, &mut rng);
        assert!(matches!(outcome, PlacementOutcome::Failed(_)));
    }

    #[test]
    fn test_default_kinds() {
        let mut ctx = context();
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..4 {
            place(&FloorPatches, &FloorPatchTemplate::default(), &mut ctx, &CuboidBuilder, &mut rng);
        }
        assert!(!ctx.objects().is_empty());
        for patch in ctx.objects() {
            assert!(patch.shape == "lava" || patch.shape == "hole");
            assert!(patch.labels.contains(&"floor_patches".to_string()));
        }
    }
}
