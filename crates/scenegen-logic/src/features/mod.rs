//! Placeable feature types and the template pieces they share.
//!
//! | Group | Feature | Parts |
//! |-------|---------|-------|
//! | `walls` | [`walls::Walls`] | 1, or 2 around a gap |
//! | `floor_patches` | [`floor::FloorPatches`] | 1 |
//! | `objects` | [`objects::Objects`] | 1 |
//! | `launchers` | [`launchers::Launchers`] | launcher + projectile |
//! | `agents` | [`agents::Agents`] | 1 |

pub mod agents;
pub mod floor;
pub mod launchers;
pub mod objects;
pub mod walls;

use rand::Rng;
use serde_json::Value;

use crate::cast::{Cast, ConfigTypeError, FieldReader};
use crate::context::GenerationContext;
use crate::distribution::{round_precision, uniform_inclusive, Choice, Resolve};
use crate::error::GenerationError;
use crate::geometry::Vec3;
use crate::placement::Interrupt;
use crate::reconcile::{merge_value, Reconcile};

/// Nested size template. Merges per axis.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SizeTemplate {
    pub width: Option<Choice<f64>>,
    pub height: Option<Choice<f64>>,
    pub depth: Option<Choice<f64>>,
}

impl SizeTemplate {
    pub fn fixed(width: f64, height: f64, depth: f64) -> Self {
        Self {
            width: Some(Choice::Fixed(width)),
            height: Some(Choice::Fixed(height)),
            depth: Some(Choice::Fixed(depth)),
        }
    }

    pub fn ranged(min: f64, max: f64) -> Self {
        Self {
            width: Some(Choice::range(min, max)),
            height: Some(Choice::range(min, max)),
            depth: Some(Choice::range(min, max)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SizeDraft {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub depth: Option<f64>,
}

impl Reconcile for SizeTemplate {
    fn reconcile(&self, o: &Self) -> Self {
        Self {
            width: merge_value(&self.width, &o.width),
            height: merge_value(&self.height, &o.height),
            depth: merge_value(&self.depth, &o.depth),
        }
    }
}

impl Resolve for SizeTemplate {
    type Output = SizeDraft;

    fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> SizeDraft {
        SizeDraft {
            width: self.width.resolve(rng),
            height: self.height.resolve(rng),
            depth: self.depth.resolve(rng),
        }
    }
}

impl Cast for SizeTemplate {
    fn expected() -> String {
        "size {width?, height?, depth?}".into()
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        let mut fields = FieldReader::new(path, raw, &Self::expected())?;
        let width = fields.optional("width");
        let height = fields.optional("height");
        let depth = fields.optional("depth");
        fields.finish()?;
        Ok(Self {
            width,
            height,
            depth,
        })
    }
}

/// Concrete size with every axis present and the floor axes positive.
pub fn size_from_draft(feature: &str, draft: Option<SizeDraft>) -> Result<Vec3, Interrupt> {
    let draft = draft.unwrap_or_default();
    let (Some(width), Some(height), Some(depth)) = (draft.width, draft.height, draft.depth) else {
        return Err(GenerationError::configuration(feature, "size needs width, height, and depth").into());
    };
    if width <= 0.0 || depth <= 0.0 || height < 0.0 {
        return Err(GenerationError::configuration(
            feature,
            format!("size {width}x{height}x{depth} is not positive"),
        )
        .into());
    }
    Ok(Vec3::new(width, height, depth))
}

/// Uniform floor position keeping `margin` clear of every wall. Collapses
/// to the room's center line on an axis too small for the margin.
pub fn random_floor_position<R: Rng + ?Sized>(ctx: &GenerationContext, margin: f64, rng: &mut R) -> Vec3 {
    let room = ctx.extents();
    let mut axis = |half: f64| {
        let limit = half - margin;
        if limit <= 0.0 {
            0.0
        } else {
            round_precision(uniform_inclusive(-limit, limit, rng)).clamp(-limit, limit)
        }
    };
    let x = axis(room.half_x);
    let z = axis(room.half_z);
    Vec3::new(x, 0.0, z)
}

/// Half the diagonal of a `width` x `depth` rectangle: the farthest any
/// rotation can reach from its center.
pub fn reach(width: f64, depth: f64) -> f64 {
    (width * width + depth * depth).sqrt() / 2.0
}

/// Heading in `[0, 360)`. Wraps again after rounding, since a value just
/// under 360 can round up to it.
pub fn normalize_rotation(rotation: Option<f64>) -> f64 {
    round_precision(rotation.unwrap_or(0.0).rem_euclid(360.0)).rem_euclid(360.0)
}

/// Literal labels a label list can apply.
pub fn declared(labels: &Option<Vec<Choice<String>>>) -> Vec<String> {
    labels
        .iter()
        .flatten()
        .flat_map(|c| c.literals())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationSettings;
    use crate::scene::Location;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    #[test]
    fn test_size_merges_per_axis() {
        let merged = SizeTemplate::fixed(1.0, 1.0, 1.0).reconcile(&SizeTemplate {
            height: Some(Choice::Fixed(2.0)),
            ..Default::default()
        });
        assert_eq!(merged.width, Some(Choice::Fixed(1.0)));
        assert_eq!(merged.height, Some(Choice::Fixed(2.0)));
    }

    #[test]
    fn test_size_from_draft() {
        let full = SizeDraft {
            width: Some(1.0),
            height: Some(2.0),
            depth: Some(3.0),
        };
        assert_eq!(size_from_draft("objects", Some(full)).unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert!(matches!(
            size_from_draft("objects", None),
            Err(Interrupt::Fail(GenerationError::Configuration { .. }))
        ));
        let flat = SizeDraft {
            width: Some(0.0),
            ..full
        };
        assert!(size_from_draft("objects", Some(flat)).is_err());
    }

    #[test]
    fn test_size_cast_rejects_unknown_axis() {
        let err = SizeTemplate::cast("objects[0].size", &json!({"width": 1, "length": 2})).unwrap_err();
        assert_eq!(err.paths(), vec!["objects[0].size.length"]);
    }

    #[test]
    fn test_random_position_respects_margin() {
        let mut ctx = GenerationContext::new(GenerationSettings::default());
        ctx.begin_scene(Vec3::new(6.0, 3.0, 4.0), Location::default());
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let p = random_floor_position(&ctx, 1.0, &mut rng);
            assert!(p.x.abs() <= 2.0 && p.z.abs() <= 1.0);
        }
        let p = random_floor_position(&ctx, 5.0, &mut rng);
        assert_eq!((p.x, p.z), (0.0, 0.0));
    }

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(Some(-90.0)), 270.0);
        assert_eq!(normalize_rotation(Some(450.0)), 90.0);
        assert_eq!(normalize_rotation(None), 0.0);
    }

    #[test]
    fn test_normalize_rotation_never_reaches_full_turn() {
        for value in [-1e-9, -1e-20, 359.99999, 719.999_99] {
            let r = normalize_rotation(Some(value));
            assert!((0.0..360.0).contains(&r), "{value} normalized to {r}");
        }
        assert_eq!(normalize_rotation(Some(-1e-9)), 0.0);
    }

    #[test]
    fn test_declared_labels_from_choices() {
        let labels = Some(vec![
            Choice::Fixed("shelf".to_string()),
            Choice::pick("red", ["blue".to_string()]),
        ]);
        assert_eq!(declared(&labels), vec!["shelf", "red", "blue"]);
    }
}
