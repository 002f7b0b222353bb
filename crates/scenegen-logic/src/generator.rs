//! Scene generation entry point.
//!
//! ```
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use serde_json::json;
//! use scenegen_logic::config::GenerationSettings;
//! use scenegen_logic::generator::SceneGenerator;
//!
//! let generator = SceneGenerator::new(GenerationSettings::default());
//! let mut rng = StdRng::seed_from_u64(1);
//! let scene = generator
//!     .generate_json(&json!({"room": {"x": 10, "y": 3, "z": 10}, "objects": [{"num": 2}]}), &mut rng)
//!     .unwrap();
//! assert_eq!(scene.objects.len(), 2);
//! ```

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use crate::builder::{CuboidBuilder, GeometryBuilder};
use crate::cast::{Cast, ConfigTypeError, FieldReader};
use crate::config::GenerationSettings;
use crate::context::GenerationContext;
use crate::distribution::{Choice, Resolve, Vec3Template};
use crate::error::GenerationError;
use crate::features::agents::{AgentTemplate, Agents};
use crate::features::floor::{FloorPatchTemplate, FloorPatches};
use crate::features::launchers::{LauncherTemplate, Launchers};
use crate::features::objects::{ObjectTemplate, Objects};
use crate::features::walls::{WallTemplate, Walls};
use crate::features::{normalize_rotation, random_floor_position};
use crate::geometry::Vec3;
use crate::scene::{Location, Scene};
use crate::scheduler::{run_groups, FeatureGroup, PlacementGroup};

/// Clearance kept between a randomly placed performer and the walls.
pub const PERFORMER_MARGIN: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PerformerTemplate {
    pub position: Option<Choice<Vec3Template>>,
    pub rotation_y: Option<Choice<f64>>,
}

impl Cast for PerformerTemplate {
    fn expected() -> String {
        "performer start {position?, rotation_y?}".into()
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        let mut fields = FieldReader::new(path, raw, &Self::expected())?;
        let template = Self {
            position: fields.optional("position"),
            rotation_y: fields.optional("rotation_y"),
        };
        fields.finish()?;
        Ok(template)
    }
}

/// A whole scene document: room, performer, and one template list per
/// feature group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneConfig {
    pub room: Option<Choice<Vec3Template>>,
    pub performer_start: Option<PerformerTemplate>,
    pub walls: Vec<WallTemplate>,
    pub floor_patches: Vec<FloorPatchTemplate>,
    pub objects: Vec<ObjectTemplate>,
    pub launchers: Vec<LauncherTemplate>,
    pub agents: Vec<AgentTemplate>,
}

impl Cast for SceneConfig {
    fn expected() -> String {
        "scene document".into()
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        let mut fields = FieldReader::new(path, raw, &Self::expected())?;
        let config = Self {
            room: fields.optional("room"),
            performer_start: fields.optional("performer_start"),
            walls: fields.optional("walls").unwrap_or_default(),
            floor_patches: fields.optional("floor_patches").unwrap_or_default(),
            objects: fields.optional("objects").unwrap_or_default(),
            launchers: fields.optional("launchers").unwrap_or_default(),
            agents: fields.optional("agents").unwrap_or_default(),
        };
        fields.finish()?;
        Ok(config)
    }
}

impl SceneConfig {
    pub fn from_json(raw: &Value) -> Result<Self, ConfigTypeError> {
        Self::cast("", raw)
    }
}

/// Room height used when the document leaves `y` out.
pub const DEFAULT_ROOM_HEIGHT: f64 = 3.0;

/// Room used when the document gives none.
pub fn default_room() -> Choice<Vec3Template> {
    Choice::Fixed(Vec3Template {
        x: Choice::range(8.0, 14.0),
        y: Some(Choice::Fixed(DEFAULT_ROOM_HEIGHT)),
        z: Choice::range(8.0, 14.0),
    })
}

/// Fill a missing `y` in every room the document offers with the default
/// height. `x` and `z` are required by the caster.
fn room_with_default_height(room: &Choice<Vec3Template>) -> Choice<Vec3Template> {
    match room {
        Choice::Fixed(template) => Choice::Fixed(Vec3Template {
            y: template
                .y
                .clone()
                .or(Some(Choice::Fixed(DEFAULT_ROOM_HEIGHT))),
            ..template.clone()
        }),
        Choice::OneOf(options) => {
            Choice::one_of(options.items().iter().map(room_with_default_height).collect())
                .unwrap_or_else(default_room)
        }
        Choice::Range(span) => {
            let never = span.min;
            match never {}
        }
    }
}

pub struct SceneGenerator<B: GeometryBuilder = CuboidBuilder> {
    settings: GenerationSettings,
    builder: B,
}

impl SceneGenerator<CuboidBuilder> {
    pub fn new(settings: GenerationSettings) -> Self {
        Self::with_builder(settings, CuboidBuilder)
    }
}

impl<B: GeometryBuilder> SceneGenerator<B> {
    pub fn with_builder(settings: GenerationSettings, builder: B) -> Self {
        Self { settings, builder }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// RNG seeded from the settings, or from entropy when no seed is set.
    pub fn rng(&self) -> StdRng {
        match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Cast a raw document, then generate from it.
    pub fn generate_json<R: Rng>(&self, raw: &Value, rng: &mut R) -> Result<Scene, GenerationError> {
        let config = SceneConfig::from_json(raw)?;
        self.generate(&config, rng)
    }

    pub fn generate<R: Rng>(&self, config: &SceneConfig, rng: &mut R) -> Result<Scene, GenerationError> {
        self.settings.validate().map_err(GenerationError::Settings)?;

        let room = match &config.room {
            Some(room) => room_with_default_height(room).resolve(rng),
            None => default_room().resolve(rng),
        };
        let usable = |v: f64| v.is_finite() && v > 0.0;
        if !(usable(room.x) && usable(room.y) && usable(room.z)) {
            return Err(GenerationError::configuration(
                "room",
                format!("dimensions {}x{}x{} are not positive and finite", room.x, room.y, room.z),
            ));
        }

        let mut ctx = GenerationContext::new(self.settings.clone());
        // Room first: a random performer start needs the extents
        ctx.begin_scene(room, Location::default());
        let performer = self.performer_start(config.performer_start.as_ref(), &ctx, rng);
        ctx.begin_scene(room, performer);
        info!(
            "scene: room {}x{}x{}, performer at ({}, {})",
            room.x, room.z, room.y, performer.position.x, performer.position.z
        );

        let mut groups: Vec<Box<dyn PlacementGroup>> = vec![
            Box::new(FeatureGroup::new(Walls, config.walls.clone())),
            Box::new(FeatureGroup::new(FloorPatches, config.floor_patches.clone())),
            Box::new(FeatureGroup::new(Objects, config.objects.clone())),
            Box::new(FeatureGroup::new(Launchers, config.launchers.clone())),
            Box::new(FeatureGroup::new(Agents, config.agents.clone())),
        ];
        for group in &groups {
            ctx.declare_labels(group.declared_labels());
        }

        run_groups(&mut groups, &mut ctx, &self.builder, rng)?;
        info!("scene: {} object(s) placed", ctx.objects().len());
        Ok(ctx.into_scene())
    }

    fn performer_start<R: Rng>(
        &self,
        template: Option<&PerformerTemplate>,
        ctx: &GenerationContext,
        rng: &mut R,
    ) -> Location {
        let template = template.cloned().unwrap_or_default();
        let position = template
            .position
            .resolve(rng)
            .unwrap_or_else(|| random_floor_position(ctx, PERFORMER_MARGIN, rng));
        let rotation_y = template
            .rotation_y
            .resolve(rng)
            .or_else(|| Some(Choice::<f64>::range(0.0, 359.0).resolve(rng)));
        Location {
            position: Vec3::new(position.x, 0.0, position.z),
            rotation_y: normalize_rotation(rotation_y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::audit_scene;
    use serde_json::json;

    #[test]
    fn test_default_room_in_range() {
        let generator = SceneGenerator::new(GenerationSettings::default());
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let scene = generator.generate(&SceneConfig::default(), &mut rng).unwrap();
            assert!((8.0..=14.0).contains(&scene.room.x));
            assert!((8.0..=14.0).contains(&scene.room.z));
            assert_eq!(scene.room.y, 3.0);
            assert!(scene.objects.is_empty());
        }
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let generator = SceneGenerator::new(GenerationSettings {
            retry_budget: 0,
            ..Default::default()
        });
        let mut rng = StdRng::seed_from_u64(3);
        let err = generator.generate(&SceneConfig::default(), &mut rng).unwrap_err();
        assert!(matches!(err, GenerationError::Settings(_)));
    }

    #[test]
    fn test_non_positive_room_rejected() {
        let generator = SceneGenerator::new(GenerationSettings::default());
        let mut rng = StdRng::seed_from_u64(3);
        let err = generator
            .generate_json(&json!({"room": {"x": 0, "z": 10}}), &mut rng)
            .unwrap_err();
        assert!(matches!(err, GenerationError::Configuration { ref feature, .. } if feature == "room"));
    }

    #[test]
    fn test_room_without_height_uses_default() {
        let generator = SceneGenerator::new(GenerationSettings::default());
        let mut rng = StdRng::seed_from_u64(3);
        let scene = generator
            .generate_json(&json!({"room": {"x": 10, "z": 10}, "objects": [{}]}), &mut rng)
            .unwrap();
        assert_eq!(scene.room, Vec3::new(10.0, DEFAULT_ROOM_HEIGHT, 10.0));
        assert_eq!(scene.objects.len(), 1);

        let doc = json!({"room": [{"x": 9, "z": 9}, {"x": 11, "y": 4, "z": 11}]});
        for _ in 0..20 {
            let scene = generator.generate_json(&doc, &mut rng).unwrap();
            let expected = if scene.room.x == 9.0 { DEFAULT_ROOM_HEIGHT } else { 4.0 };
            assert_eq!(scene.room.y, expected);
        }
    }

    #[test]
    fn test_all_groups_in_order() {
        let generator = SceneGenerator::new(GenerationSettings::default());
        let mut rng = StdRng::seed_from_u64(9);
        let scene = generator
            .generate_json(
                &json!({
                    "room": {"x": 12, "y": 3, "z": 12},
                    "performer_start": {"position": {"x": -5, "z": -5}},
                    "walls": [{"num": 1}],
                    "floor_patches": [{"num": 1}],
                    "objects": [{"num": 2}],
                    "launchers": [{}],
                    "agents": [{}]
                }),
                &mut rng,
            )
            .unwrap();
        let kinds: Vec<_> = scene.objects.iter().map(|o| o.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec!["walls", "floor_patches", "objects", "objects", "launchers", "launchers", "agents"]
        );
        assert_eq!(scene.performer_start.position, Vec3::new(-5.0, 0.0, -5.0));
        assert!(audit_scene(&scene).is_empty());
    }

    #[test]
    fn test_same_seed_same_scene() {
        let generator = SceneGenerator::new(GenerationSettings {
            seed: Some(77),
            ..Default::default()
        });
        let doc = json!({"objects": [{"num": {"min": 1, "max": 4}}], "agents": [{}]});
        let a = generator.generate_json(&doc, &mut generator.rng()).unwrap();
        let b = generator.generate_json(&doc, &mut generator.rng()).unwrap();
        assert_eq!(a, b);
    }
}
