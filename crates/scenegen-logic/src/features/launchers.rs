//! Timed launchers. Each instance is a launcher body plus the projectile it
//! fires; the launcher's timeline carries the launch event and the
//! projectile records what moves it.

use rand::Rng;
use serde_json::Value;

use crate::builder::PartRequest;
use crate::cast::{Cast, ConfigTypeError, FieldReader};
use crate::context::GenerationContext;
use crate::distribution::{round_precision, Choice, Resolve, Vec3Template};
use crate::error::GenerationError;
use crate::features::{declared, normalize_rotation, random_floor_position};
use crate::geometry::{rotate_offset, Vec3};
use crate::placement::{Feature, Interrupt};
use crate::reconcile::{merge_atomic, merge_value, Reconcile};
use crate::scene::{SceneObject, TimelineEvent};

pub const LAUNCHER_SIZE: Vec3 = Vec3::new(0.5, 0.4, 0.5);

/// Clearance between the launcher's front face and the projectile.
pub const MUZZLE_GAP: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LauncherTemplate {
    pub num: Option<Choice<i64>>,
    pub projectile: Option<Choice<String>>,
    pub projectile_size: Option<Choice<f64>>,
    pub material: Option<Choice<String>>,
    pub position: Option<Choice<Vec3Template>>,
    pub rotation_y: Option<Choice<f64>>,
    pub launch_step: Option<Choice<i64>>,
    pub force: Option<Choice<f64>>,
    pub labels: Option<Vec<Choice<String>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LauncherDraft {
    pub projectile: Option<String>,
    pub projectile_size: Option<f64>,
    pub material: Option<String>,
    pub position: Option<Vec3>,
    pub rotation_y: Option<f64>,
    pub launch_step: Option<i64>,
    pub force: Option<f64>,
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LauncherSpec {
    pub projectile: String,
    pub projectile_size: f64,
    pub material: Option<String>,
    pub position: Vec3,
    pub rotation_y: f64,
    pub launch_step: i64,
    pub force: f64,
    pub labels: Vec<String>,
}

impl LauncherSpec {
    /// Projectile center, just in front of the launcher along its local +z.
    pub fn muzzle(&self) -> Vec3 {
        let forward = LAUNCHER_SIZE.z / 2.0 + MUZZLE_GAP + self.projectile_size / 2.0;
        let (ox, oz) = rotate_offset(0.0, forward, self.rotation_y);
        Vec3::new(
            round_precision(self.position.x + ox),
            self.position.y,
            round_precision(self.position.z + oz),
        )
    }
}

impl Reconcile for LauncherTemplate {
    fn reconcile(&self, o: &Self) -> Self {
        Self {
            num: merge_value(&self.num, &o.num),
            projectile: merge_value(&self.projectile, &o.projectile),
            projectile_size: merge_value(&self.projectile_size, &o.projectile_size),
            material: merge_value(&self.material, &o.material),
            position: merge_value(&self.position, &o.position),
            rotation_y: merge_value(&self.rotation_y, &o.rotation_y),
            launch_step: merge_value(&self.launch_step, &o.launch_step),
            force: merge_value(&self.force, &o.force),
            labels: merge_atomic(&self.labels, &o.labels),
        }
    }
}

impl Resolve for LauncherTemplate {
    type Output = LauncherDraft;

    fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> LauncherDraft {
        LauncherDraft {
            projectile: self.projectile.resolve(rng),
            projectile_size: self.projectile_size.resolve(rng),
            material: self.material.resolve(rng),
            position: self.position.resolve(rng),
            rotation_y: self.rotation_y.resolve(rng),
            launch_step: self.launch_step.resolve(rng),
            force: self.force.resolve(rng),
            labels: self.labels.resolve(rng),
        }
    }
}

impl Cast for LauncherTemplate {
    fn expected() -> String {
        "launcher template".into()
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        let mut fields = FieldReader::new(path, raw, &Self::expected())?;
        let template = Self {
            num: fields.optional("num"),
            projectile: fields.optional("projectile"),
            projectile_size: fields.optional("projectile_size"),
            material: fields.optional("material"),
            position: fields.optional("position"),
            rotation_y: fields.optional("rotation_y"),
            launch_step: fields.optional("launch_step"),
            force: fields.optional("force"),
            labels: fields.optional("labels"),
        };
        fields.finish()?;
        Ok(template)
    }
}

pub struct Launchers;

impl Feature for Launchers {
    type Template = LauncherTemplate;
    type Draft = LauncherDraft;
    type Spec = LauncherSpec;

    fn name(&self) -> &'static str {
        "launchers"
    }

    fn default_template(&self) -> LauncherTemplate {
        LauncherTemplate {
            num: Some(Choice::Fixed(1)),
            projectile: Some(Choice::pick("ball", ["toy_car".to_string()])),
            projectile_size: Some(Choice::range(0.2, 0.4)),
            material: Some(Choice::fixed("metal")),
            position: None,
            rotation_y: Some(Choice::pick(0.0, [90.0, 180.0, 270.0])),
            launch_step: Some(Choice::range(1, 60)),
            force: Some(Choice::range(2.0, 8.0)),
            labels: None,
        }
    }

    fn count<'t>(&self, template: &'t LauncherTemplate) -> Option<&'t Choice<i64>> {
        template.num.as_ref()
    }

    fn declared_labels(&self, template: &LauncherTemplate) -> Vec<String> {
        declared(&template.labels)
    }

    fn complete<R: Rng + ?Sized>(
        &self,
        draft: LauncherDraft,
        ctx: &GenerationContext,
        rng: &mut R,
    ) -> Result<LauncherSpec, Interrupt> {
        let projectile_size = draft.projectile_size.unwrap_or(0.3);
        if projectile_size <= 0.0 {
            return Err(GenerationError::configuration(
                self.name(),
                format!("projectile size {projectile_size} is not positive"),
            )
            .into());
        }
        let launch_step = draft.launch_step.unwrap_or(1);
        if launch_step < 0 {
            return Err(GenerationError::configuration(
                self.name(),
                format!("launch step {launch_step} is negative"),
            )
            .into());
        }
        // Launcher and projectile together, from the launcher's center
        let margin = LAUNCHER_SIZE.x.max(LAUNCHER_SIZE.z) / 2.0 + MUZZLE_GAP + projectile_size;
        let position = draft
            .position
            .unwrap_or_else(|| random_floor_position(ctx, margin, rng));

        Ok(LauncherSpec {
            projectile: draft.projectile.unwrap_or_else(|| "ball".to_string()),
            projectile_size,
            material: draft.material,
            position,
            rotation_y: normalize_rotation(draft.rotation_y),
            launch_step,
            force: draft.force.unwrap_or(5.0),
            labels: draft.labels.unwrap_or_default(),
        })
    }

    fn parts(&self, spec: &LauncherSpec) -> Vec<PartRequest> {
        let s = spec.projectile_size;
        vec![
            PartRequest {
                kind: self.name().to_string(),
                shape: "launcher".to_string(),
                material: spec.material.clone(),
                size: LAUNCHER_SIZE,
                position: spec.position,
                rotation_y: spec.rotation_y,
            },
            PartRequest {
                kind: self.name().to_string(),
                shape: spec.projectile.clone(),
                material: None,
                size: Vec3::new(s, s, s),
                position: spec.muzzle(),
                rotation_y: spec.rotation_y,
            },
        ]
    }

    fn labels(&self, spec: &LauncherSpec) -> Vec<String> {
        spec.labels.clone()
    }

    fn wire(&self, spec: &LauncherSpec, parts: &mut [SceneObject]) {
        let [launcher, projectile] = parts else {
            return;
        };
        launcher.timeline.push(TimelineEvent {
            action: "launch".to_string(),
            step_begin: spec.launch_step,
            step_end: spec.launch_step,
            target: Some(projectile.id.clone()),
            force: Some(spec.force),
        });
        projectile.moved_by = Some(launcher.id.clone());
    }
}
