//! Agents: figures with an action timeline, optionally turned to face an
//! object carrying the `facing` label.

use rand::Rng;
use serde_json::Value;

use crate::builder::PartRequest;
use crate::cast::{Cast, ConfigTypeError, FieldReader};
use crate::context::GenerationContext;
use crate::distribution::{Choice, Resolve, Vec3Template};
use crate::error::GenerationError;
use crate::features::{
    declared, normalize_rotation, random_floor_position, reach, size_from_draft, SizeDraft,
    SizeTemplate,
};
use crate::geometry::{heading_towards, Vec3};
use crate::placement::{lookup_label, Feature, Interrupt};
use crate::reconcile::{merge_atomic, merge_nested, merge_value, Reconcile};
use crate::scene::{SceneObject, TimelineEvent};
use crate::validation::Rejection;

/// Steps an action lasts when no duration is given.
pub const DEFAULT_ACTION_DURATION: i64 = 10;

/// One entry of an agent's action timeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionTemplate {
    pub id: Option<Choice<String>>,
    pub step_begin: Option<Choice<i64>>,
    pub duration: Option<Choice<i64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionDraft {
    pub id: Option<String>,
    pub step_begin: Option<i64>,
    pub duration: Option<i64>,
}

impl Resolve for ActionTemplate {
    type Output = ActionDraft;

    fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> ActionDraft {
        ActionDraft {
            id: self.id.resolve(rng),
            step_begin: self.step_begin.resolve(rng),
            duration: self.duration.resolve(rng),
        }
    }
}

impl Cast for ActionTemplate {
    fn expected() -> String {
        "action {id, step_begin, duration?}".into()
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        let mut fields = FieldReader::new(path, raw, &Self::expected())?;
        let template = Self {
            id: fields.required("id"),
            step_begin: fields.required("step_begin"),
            duration: fields.optional("duration"),
        };
        fields.finish()?;
        Ok(template)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentTemplate {
    pub num: Option<Choice<i64>>,
    pub shape: Option<Choice<String>>,
    pub size: Option<SizeTemplate>,
    pub position: Option<Choice<Vec3Template>>,
    pub rotation_y: Option<Choice<f64>>,
    /// Turn toward an object with this label; a drawn null keeps
    /// `rotation_y`.
    pub facing: Option<Choice<Option<String>>>,
    /// Replaced wholesale on override, never merged per action.
    pub actions: Option<Vec<ActionTemplate>>,
    pub labels: Option<Vec<Choice<String>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentDraft {
    pub shape: Option<String>,
    pub size: Option<SizeDraft>,
    pub position: Option<Vec3>,
    pub rotation_y: Option<f64>,
    pub facing: Option<Option<String>>,
    pub actions: Option<Vec<ActionDraft>>,
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentSpec {
    pub shape: String,
    pub size: Vec3,
    pub position: Vec3,
    pub rotation_y: f64,
    pub actions: Vec<TimelineEvent>,
    pub labels: Vec<String>,
}

impl Reconcile for AgentTemplate {
    fn reconcile(&self, o: &Self) -> Self {
        Self {
            num: merge_value(&self.num, &o.num),
            shape: merge_value(&self.shape, &o.shape),
            size: merge_nested(&self.size, &o.size),
            position: merge_value(&self.position, &o.position),
            rotation_y: merge_value(&self.rotation_y, &o.rotation_y),
            facing: merge_value(&self.facing, &o.facing),
            actions: merge_atomic(&self.actions, &o.actions),
            labels: merge_atomic(&self.labels, &o.labels),
        }
    }
}

impl Resolve for AgentTemplate {
    type Output = AgentDraft;

    fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> AgentDraft {
        AgentDraft {
            shape: self.shape.resolve(rng),
            size: self.size.resolve(rng),
            position: self.position.resolve(rng),
            rotation_y: self.rotation_y.resolve(rng),
            facing: self.facing.resolve(rng),
            actions: self.actions.resolve(rng),
            labels: self.labels.resolve(rng),
        }
    }
}

impl Cast for AgentTemplate {
    fn expected() -> String {
        "agent template".into()
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        let mut fields = FieldReader::new(path, raw, &Self::expected())?;
        let template = Self {
            num: fields.optional("num"),
            shape: fields.optional("shape"),
            size: fields.optional("size"),
            position: fields.optional("position"),
            rotation_y: fields.optional("rotation_y"),
            facing: fields.optional("facing"),
            actions: fields.optional("actions"),
            labels: fields.optional("labels"),
        };
        fields.finish()?;
        Ok(template)
    }
}

pub struct Agents;

impl Agents {
    /// Sort actions by start step and compute their end steps. Overlapping
    /// actions are rejected so a redraw can separate them.
    fn timeline(&self, actions: Vec<ActionDraft>, object: String) -> Result<Vec<TimelineEvent>, Interrupt> {
        let mut events = Vec::with_capacity(actions.len());
        for action in actions {
            let (Some(id), Some(step_begin)) = (action.id, action.step_begin) else {
                return Err(GenerationError::configuration(
                    self.name(),
                    "every action needs an id and a step_begin",
                )
                .into());
            };
            let duration = action.duration.unwrap_or(DEFAULT_ACTION_DURATION);
            if step_begin < 0 || duration < 1 {
                return Err(GenerationError::configuration(
                    self.name(),
                    format!("action '{id}' starts at {step_begin} for {duration} steps"),
                )
                .into());
            }
            let Some(step_end) = step_begin.checked_add(duration) else {
                return Err(GenerationError::configuration(
                    self.name(),
                    format!("action '{id}' at step {step_begin} ends past the last representable step"),
                )
                .into());
            };
            events.push(TimelineEvent {
                action: id,
                step_begin,
                step_end,
                target: None,
                force: None,
            });
        }
        events.sort_by_key(|e| e.step_begin);
        if let Some(pair) = events.windows(2).find(|w| w[1].step_begin < w[0].step_end) {
            return Err(Rejection::Rule {
                object,
                rule: format!(
                    "action '{}' starts before '{}' ends",
                    pair[1].action, pair[0].action
                ),
            }
            .into());
        }
        Ok(events)
    }
}

impl Feature for Agents {
    type Template = AgentTemplate;
    type Draft = AgentDraft;
    type Spec = AgentSpec;

    fn name(&self) -> &'static str {
        "agents"
    }

    fn default_template(&self) -> AgentTemplate {
        AgentTemplate {
            num: Some(Choice::Fixed(1)),
            shape: Some(Choice::pick("agent_female_01", ["agent_male_01".to_string()])),
            size: Some(SizeTemplate::fixed(0.6, 1.6, 0.6)),
            position: None,
            rotation_y: Some(Choice::range(0.0, 359.0)),
            facing: None,
            actions: None,
            labels: None,
        }
    }

    fn count<'t>(&self, template: &'t AgentTemplate) -> Option<&'t Choice<i64>> {
        template.num.as_ref()
    }

    fn declared_labels(&self, template: &AgentTemplate) -> Vec<String> {
        declared(&template.labels)
    }

    fn complete<R: Rng + ?Sized>(
        &self,
        draft: AgentDraft,
        ctx: &GenerationContext,
        rng: &mut R,
    ) -> Result<AgentSpec, Interrupt> {
        let size = size_from_draft(self.name(), draft.size)?;
        let position = draft
            .position
            .unwrap_or_else(|| random_floor_position(ctx, reach(size.x, size.z), rng));

        let rotation_y = match draft.facing.flatten() {
            Some(label) => {
                let target = lookup_label(ctx, self.name(), &label, rng)?;
                normalize_rotation(Some(heading_towards(position.floor(), target.location.position.floor())))
            }
            None => normalize_rotation(draft.rotation_y),
        };

        let actions = self.timeline(
            draft.actions.unwrap_or_default(),
            ctx.candidate_id(self.name(), 0),
        )?;

        Ok(AgentSpec {
            shape: draft.shape.unwrap_or_else(|| "agent_female_01".to_string()),
            size,
            position,
            rotation_y,
            actions,
            labels: draft.labels.unwrap_or_default(),
        })
    }

    fn parts(&self, spec: &AgentSpec) -> Vec<PartRequest> {
        vec![PartRequest {
            kind: self.name().to_string(),
            shape: spec.shape.clone(),
            material: None,
            size: spec.size,
            position: spec.position,
            rotation_y: spec.rotation_y,
        }]
    }

    fn labels(&self, spec: &AgentSpec) -> Vec<String> {
        spec.labels.clone()
    }

    fn wire(&self, spec: &AgentSpec, parts: &mut [SceneObject]) {
        if let Some(agent) = parts.first_mut() {
            agent.timeline = spec.actions.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CuboidBuilder;
    use crate::config::GenerationSettings;
    use crate::features::objects::{ObjectTemplate, Objects};
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
                position: Vec3::new(-4.5, 0.0, -4.5),
                rotation_y: 0.0,
            },
        );
        ctx
    }

    fn action(id: &str, begin: i64, duration: i64) -> ActionTemplate {
        ActionTemplate {
            id: Some(Choice::fixed(id)),
            step_begin: Some(Choice::Fixed(begin)),
            duration: Some(Choice::Fixed(duration)),
        }
    }

    #[test]
    fn test_actions_sorted_with_end_steps() {
        let mut ctx = context();
        let mut rng = StdRng::seed_from_u64(17);
        let template = AgentTemplate {
            actions: Some(vec![action("wave", 30, 5), action("walk", 1, 20)]),
            ..Default::default()
        };
        let outcome = place(&Agents, &template, &mut ctx, &CuboidBuilder, &mut rng);
        assert!(matches!(outcome, PlacementOutcome::Committed(_)), "{outcome:?}");
        let timeline = &ctx.objects()[0].timeline;
        let steps: Vec<_> = timeline
            .iter()
            .map(|e| (e.action.as_str(), e.step_begin, e.step_end))
            .collect();
        assert_eq!(steps, vec![("walk", 1, 21), ("wave", 30, 35)]);
    }

    #[test]
    fn test_overlapping_actions_rejected() {
        let mut ctx = context();
        let mut rng = StdRng::seed_from_u64(17);
        let template = AgentTemplate {
            actions: Some(vec![action("walk", 1, 20), action("wave", 10, 5)]),
            ..Default::default()
        };
        let outcome = place(&Agents, &template, &mut ctx, &CuboidBuilder, &mut rng);
        assert!(matches!(
            outcome,
            PlacementOutcome::Failed(GenerationError::PlacementExhausted {
                last: Rejection::Rule { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_action_end_step_overflow_is_configuration_error() {
        let mut ctx = context();
        let mut rng = StdRng::seed_from_u64(17);
        let template = AgentTemplate {
            actions: Some(vec![action("wave", i64::MAX - 7, DEFAULT_ACTION_DURATION)]),
            ..Default::default()
        };
        let outcome = place(&Agents, &template, &mut ctx, &CuboidBuilder, &mut rng);
        match outcome {
            PlacementOutcome::Failed(GenerationError::Configuration { feature, message }) => {
                assert_eq!(feature, "agents");
                assert!(message.contains("wave"), "{message}");
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
        assert!(ctx.objects().is_empty());
    }

    #[test]
    fn test_facing_turns_toward_target() {
        let mut ctx = context();
        ctx.declare_labels(["toy"]);
        let mut rng = StdRng::seed_from_u64(17);
        let toy = ObjectTemplate {
            size: Some(SizeTemplate::fixed(0.5, 0.5, 0.5)),
            position: Some(Choice::Fixed(Vec3Template::floor(3.0, 3.0))),
            labels: Some(vec![Choice::fixed("toy")]),
            ..Default::default()
        };
        place(&Objects, &toy, &mut ctx, &CuboidBuilder, &mut rng);

        let template = AgentTemplate {
            position: Some(Choice::Fixed(Vec3Template::floor(0.0, 0.0))),
            facing: Some(Choice::fixed(Some("toy".to_string()))),
            ..Default::default()
        };
        let outcome = place(&Agents, &template, &mut ctx, &CuboidBuilder, &mut rng);
        assert!(matches!(outcome, PlacementOutcome::Committed(_)), "{outcome:?}");
        assert!((ctx.objects()[1].rotation_y - 45.0).abs() < 1e-6);
    }

    #[test]
    fn test_actions_override_is_atomic() {
        let default = AgentTemplate {
            actions: Some(vec![action("walk", 1, 20), action("wave", 30, 5)]),
            size: Some(SizeTemplate::fixed(0.6, 1.6, 0.6)),
            ..Default::default()
        };
        let overrides = AgentTemplate {
            actions: Some(vec![ActionTemplate {
                id: Some(Choice::fixed("sit")),
                ..Default::default()
            }]),
            size: Some(SizeTemplate {
                height: Some(Choice::Fixed(1.2)),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = default.reconcile(&overrides);
        assert_eq!(merged.actions, overrides.actions);
        let size = merged.size.unwrap();
        assert_eq!(size.width, Some(Choice::Fixed(0.6)));
        assert_eq!(size.height, Some(Choice::Fixed(1.2)));
    }

    #[test]
    fn test_action_cast_requires_id() {
        let err = AgentTemplate::cast(
            "agents[0]",
            &json!({"actions": [{"step_begin": 3}, {"id": "wave", "step_begin": true}]}),
        )
        .unwrap_err();
        assert_eq!(
            err.paths(),
            vec!["agents[0].actions[0].id", "agents[0].actions[1].step_begin"]
        );
    }
}
