//! Interior walls, optionally split around a gap.

use rand::Rng;
use serde_json::Value;

use crate::builder::PartRequest;
use crate::cast::{Cast, ConfigTypeError, FieldReader};
use crate::context::GenerationContext;
use crate::distribution::{round_precision, Choice, Resolve, Vec3Template};
use crate::error::GenerationError;
use crate::features::{declared, normalize_rotation, random_floor_position, reach};
use crate::geometry::{rotate_offset, Vec3, EPSILON};
use crate::placement::{Feature, Interrupt};
use crate::reconcile::{merge_atomic, merge_value, Reconcile};
use crate::scene::SceneObject;
use crate::validation::Rejection;

/// Closest two parallel, side-by-side walls may stand.
pub const MIN_WALL_SEPARATION: f64 = 1.0;

/// Shortest segment left on either side of a gap.
pub const MIN_SEGMENT: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WallTemplate {
    pub num: Option<Choice<i64>>,
    pub width: Option<Choice<f64>>,
    pub thickness: Option<Choice<f64>>,
    pub height: Option<Choice<f64>>,
    pub material: Option<Choice<String>>,
    pub position: Option<Choice<Vec3Template>>,
    pub rotation_y: Option<Choice<f64>>,
    /// Opening in the middle of the wall; null means solid.
    pub gap: Option<Choice<Option<f64>>>,
    pub labels: Option<Vec<Choice<String>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WallDraft {
    pub width: Option<f64>,
    pub thickness: Option<f64>,
    pub height: Option<f64>,
    pub material: Option<String>,
    pub position: Option<Vec3>,
    pub rotation_y: Option<f64>,
    pub gap: Option<Option<f64>>,
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WallSpec {
    pub width: f64,
    pub thickness: f64,
    pub height: f64,
    pub material: Option<String>,
    pub position: Vec3,
    pub rotation_y: f64,
    pub gap: Option<f64>,
    pub labels: Vec<String>,
}

impl Reconcile for WallTemplate {
    fn reconcile(&self, o: &Self) -> Self {
        Self {
            num: merge_value(&self.num, &o.num),
            width: merge_value(&self.width, &o.width),
            thickness: merge_value(&self.thickness, &o.thickness),
            height: merge_value(&self.height, &o.height),
            material: merge_value(&self.material, &o.material),
            position: merge_value(&self.position, &o.position),
            rotation_y: merge_value(&self.rotation_y, &o.rotation_y),
            gap: merge_value(&self.gap, &o.gap),
            labels: merge_atomic(&self.labels, &o.labels),
        }
    }
}

impl Resolve for WallTemplate {
    type Output = WallDraft;

    fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> WallDraft {
        WallDraft {
            width: self.width.resolve(rng),
            thickness: self.thickness.resolve(rng),
            height: self.height.resolve(rng),
            material: self.material.resolve(rng),
            position: self.position.resolve(rng),
            rotation_y: self.rotation_y.resolve(rng),
            gap: self.gap.resolve(rng),
            labels: self.labels.resolve(rng),
        }
    }
}

impl Cast for WallTemplate {
    fn expected() -> String {
        "wall template".into()
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        let mut fields = FieldReader::new(path, raw, &Self::expected())?;
        let template = Self {
            num: fields.optional("num"),
            width: fields.optional("width"),
            thickness: fields.optional("thickness"),
            height: fields.optional("height"),
            material: fields.optional("material"),
            position: fields.optional("position"),
            rotation_y: fields.optional("rotation_y"),
            gap: fields.optional("gap"),
            labels: fields.optional("labels"),
        };
        fields.finish()?;
        Ok(template)
    }
}

pub struct Walls;

impl Feature for Walls {
    type Template = WallTemplate;
    type Draft = WallDraft;
    type Spec = WallSpec;

    fn name(&self) -> &'static str {
        "walls"
    }

    fn default_template(&self) -> WallTemplate {
        WallTemplate {
            num: Some(Choice::Fixed(1)),
            width: Some(Choice::range(1.0, 4.0)),
            thickness: Some(Choice::Fixed(0.1)),
            height: None,
            material: Some(Choice::fixed("drywall")),
            position: None,
            rotation_y: Some(Choice::pick(0.0, [90.0])),
            gap: None,
            labels: None,
        }
    }

    fn count<'t>(&self, template: &'t WallTemplate) -> Option<&'t Choice<i64>> {
        template.num.as_ref()
    }

    fn declared_labels(&self, template: &WallTemplate) -> Vec<String> {
        declared(&template.labels)
    }

    fn complete<R: Rng + ?Sized>(
        &self,
        draft: WallDraft,
        ctx: &GenerationContext,
        rng: &mut R,
    ) -> Result<WallSpec, Interrupt> {
        let width = draft.width.unwrap_or(1.0);
        let thickness = draft.thickness.unwrap_or(0.1);
        if width <= 0.0 || thickness <= 0.0 {
            return Err(GenerationError::configuration(
                self.name(),
                format!("wall {width}x{thickness} is not positive"),
            )
            .into());
        }
        let height = draft.height.unwrap_or(ctx.room().y);

        let gap = draft.gap.flatten();
        if let Some(gap) = gap {
            if gap <= 0.0 || gap > width - 2.0 * MIN_SEGMENT {
                return Err(Rejection::Rule {
                    object: ctx.candidate_id(self.name(), 0),
                    rule: format!("gap {gap} does not fit a {width} wide wall"),
                }
                .into());
            }
        }

        let position = draft
            .position
            .unwrap_or_else(|| random_floor_position(ctx, reach(width, thickness), rng));

        Ok(WallSpec {
            width,
            thickness,
            height,
            material: draft.material,
            position,
            rotation_y: normalize_rotation(draft.rotation_y),
            gap,
            labels: draft.labels.unwrap_or_default(),
        })
    }

    fn parts(&self, spec: &WallSpec) -> Vec<PartRequest> {
        let segment = |length: f64, offset: f64| {
            let (ox, oz) = rotate_offset(offset, 0.0, spec.rotation_y);
            PartRequest {
                kind: self.name().to_string(),
                shape: "wall".to_string(),
                material: spec.material.clone(),
                size: Vec3::new(length, spec.height, spec.thickness),
                position: Vec3::new(
                    round_precision(spec.position.x + ox),
                    spec.position.y,
                    round_precision(spec.position.z + oz),
                ),
                rotation_y: spec.rotation_y,
            }
        };
        match spec.gap {
            None => vec![segment(spec.width, 0.0)],
            Some(gap) => {
                let length = (spec.width - gap) / 2.0;
                let offset = (gap + length) / 2.0;
                vec![segment(length, -offset), segment(length, offset)]
            }
        }
    }

    fn check(
        &self,
        _spec: &WallSpec,
        parts: &[SceneObject],
        ctx: &GenerationContext,
    ) -> Result<(), Rejection> {
        for part in parts {
            for wall in ctx.objects().iter().filter(|o| o.kind == self.name()) {
                if too_close(part, wall) {
                    return Err(Rejection::Rule {
                        object: part.id.clone(),
                        rule: format!(
                            "parallel to {} and closer than {MIN_WALL_SEPARATION}",
                            wall.id
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    fn labels(&self, spec: &WallSpec) -> Vec<String> {
        spec.labels.clone()
    }
}

/// Parallel walls whose spans overlap must keep [`MIN_WALL_SEPARATION`].
fn too_close(a: &SceneObject, b: &SceneObject) -> bool {
    let turn = (a.rotation_y - b.rotation_y).rem_euclid(180.0);
    if turn > EPSILON && turn < 180.0 - EPSILON {
        return false;
    }
    let (along, across) = rotate_offset(
        b.position.x - a.position.x,
        b.position.z - a.position.z,
        -a.rotation_y,
    );
    let spans_overlap = along.abs() < (a.size.x + b.size.x) / 2.0 - EPSILON;
    spans_overlap && across.abs() < MIN_WALL_SEPARATION
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{CuboidBuilder, GeometryBuilder};
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
            Vec3::new(10.0, 2.5, 10.0),
            Location {
                position: Vec3::new(-4.5, 0.0, -4.5),
                rotation_y: 0.0,
            },
        );
        ctx
    }

    fn wall_at(x: f64, z: f64, rotation: f64) -> WallTemplate {
        WallTemplate {
            width: Some(Choice::Fixed(3.0)),
            position: Some(Choice::Fixed(Vec3Template::floor(x, z))),
            rotation_y: Some(Choice::Fixed(rotation)),
            ..Default::default()
        }
    }

    #[test]
    fn test_height_defaults_to_room() {
        let mut ctx = context();
        let mut rng = StdRng::seed_from_u64(2);
        place(&Walls, &wall_at(0.0, 0.0, 0.0), &mut ctx, &CuboidBuilder, &mut rng);
        assert_eq!(ctx.objects()[0].size.y, 2.5);
        assert_eq!(ctx.objects()[0].material.as_deref(), Some("drywall"));
    }

    #[test]
    fn test_gap_splits_wall() {
        let mut ctx = context();
        let mut rng = StdRng::seed_from_u64(2);
        let template = WallTemplate {
            gap: Some(Choice::fixed(Some(1.0))),
            ..wall_at(0.0, 0.0, 90.0)
        };
        let outcome = place(&Walls, &template, &mut ctx, &CuboidBuilder, &mut rng);
        let PlacementOutcome::Committed(ids) = outcome else {
            panic!("expected commit, got {outcome:?}");
        };
        assert_eq!(ids.len(), 2);
        let segments = ctx.objects();
        assert!((segments[0].size.x - 1.0).abs() < 1e-9);
        // Rotated a quarter turn, the segments line up along z with a 1.0 opening
        let gap = (segments[1].position.z - segments[0].position.z).abs() - 1.0;
        assert!((gap - 1.0).abs() < 1e-6, "opening {gap}");
        assert!(segments[0].position.x.abs() < 1e-9);
    }

    #[test]
    fn test_oversized_gap_rejected() {
        let mut ctx = context();
        let mut rng = StdRng::seed_from_u64(2);
        let template = WallTemplate {
            gap: Some(Choice::fixed(Some(2.9))),
            ..wall_at(0.0, 0.0, 0.0)
        };
        let outcome = place(&Walls, &template, &mut ctx, &CuboidBuilder, &mut rng);
        assert!(matches!(
            outcome,
            PlacementOutcome::Failed(GenerationError::PlacementExhausted {
                last: Rejection::Rule { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_parallel_walls_keep_separation() {
        let mut ctx = context();
        let mut rng = StdRng::seed_from_u64(2);
        place(&Walls, &wall_at(0.0, 0.0, 0.0), &mut ctx, &CuboidBuilder, &mut rng);

        let close = place(&Walls, &wall_at(0.5, 0.6, 180.0), &mut ctx, &CuboidBuilder, &mut rng);
        assert!(matches!(close, PlacementOutcome::Failed(_)));

        let far = place(&Walls, &wall_at(0.5, 1.5, 0.0), &mut ctx, &CuboidBuilder, &mut rng);
        assert!(matches!(far, PlacementOutcome::Committed(_)));

        // Side by side but not overlapping along their length
        let offset = place(&Walls, &wall_at(-3.5, 0.5, 0.0), &mut ctx, &CuboidBuilder, &mut rng);
        assert!(matches!(offset, PlacementOutcome::Committed(_)), "{offset:?}");
    }

    #[test]
    fn test_perpendicular_walls_are_not_compared() {
        let a = CuboidBuilder
            .build("walls-0", &Walls.parts(&spec(0.0))[0])
            .unwrap();
        let b = CuboidBuilder
            .build("walls-1", &Walls.parts(&spec(90.0))[0])
            .unwrap();
        assert!(!too_close(&a, &b));
    }

    fn spec(rotation_y: f64) -> WallSpec {
        WallSpec {
            width: 2.0,
            thickness: 0.1,
            height: 2.0,
            material: None,
            position: Vec3::new(0.0, 0.0, 3.0),
            rotation_y,
            gap: None,
            labels: Vec::new(),
        }
    }
}
