//! Placement service: the generate-and-validate loop shared by every
//! feature.
//!
//! One call to [`place`] takes a user template for one feature instance
//! through: reconcile with the feature default, resolve, fill dependent
//! defaults, build parts, validate, then commit or retry. Attempts are
//! capped by the global retry budget. A feature that needs a label nobody
//! has produced yet defers instead of burning attempts.

use std::fmt;

use log::{debug, info, warn};
use rand::Rng;

use crate::builder::{GeometryBuilder, PartRequest};
use crate::cast::Cast;
use crate::context::GenerationContext;
use crate::distribution::{Choice, Resolve};
use crate::error::GenerationError;
use crate::labels::LabelEntry;
use crate::reconcile::Reconcile;
use crate::scene::SceneObject;
use crate::validation::{check_placement, PlacementRules, Rejection};

/// Why an attempt stopped short of a commit.
#[derive(Debug)]
pub enum Interrupt {
    /// Validation failed; another draw may succeed.
    Reject(Rejection),
    /// A referenced label has no entries yet.
    Defer(String),
    /// No amount of retrying can help.
    Fail(GenerationError),
}

impl From<Rejection> for Interrupt {
    fn from(r: Rejection) -> Self {
        Interrupt::Reject(r)
    }
}

impl From<GenerationError> for Interrupt {
    fn from(e: GenerationError) -> Self {
        Interrupt::Fail(e)
    }
}

/// One placeable feature type.
pub trait Feature {
    /// User-facing template; every field optional and randomizable.
    type Template: Reconcile + Resolve<Output = Self::Draft> + Cast + fmt::Debug;
    /// Resolved template, before dependent defaults.
    type Draft;
    /// Fully concrete parameters for one instance.
    type Spec;

    /// Group key, also applied as a label to everything the feature places.
    fn name(&self) -> &'static str;

    fn default_template(&self) -> Self::Template;

    /// Instance count field of a reconciled template.
    fn count<'t>(&self, template: &'t Self::Template) -> Option<&'t Choice<i64>>;

    /// Every label the template could apply.
    fn declared_labels(&self, template: &Self::Template) -> Vec<String>;

    /// Fill dependent defaults. May reject, defer on a missing label, or
    /// fail on unusable input.
    fn complete<R: Rng + ?Sized>(
        &self,
        draft: Self::Draft,
        ctx: &GenerationContext,
        rng: &mut R,
    ) -> Result<Self::Spec, Interrupt>;

    /// Parts to build, in order.
    fn parts(&self, spec: &Self::Spec) -> Vec<PartRequest>;

    fn rules(&self, _spec: &Self::Spec) -> PlacementRules {
        PlacementRules::default()
    }

    /// Feature-specific check after the shared spatial checks pass.
    fn check(
        &self,
        _spec: &Self::Spec,
        _parts: &[SceneObject],
        _ctx: &GenerationContext,
    ) -> Result<(), Rejection> {
        Ok(())
    }

    /// User labels for the committed parts.
    fn labels(&self, spec: &Self::Spec) -> Vec<String>;

    /// Link parts to each other before commit.
    fn wire(&self, _spec: &Self::Spec, _parts: &mut [SceneObject]) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlacementOutcome {
    Committed(Vec<String>),
    Deferred(String),
    Failed(GenerationError),
}

/// Place one instance of `feature` from `template`.
pub fn place<F, R>(
    feature: &F,
    template: &F::Template,
    ctx: &mut GenerationContext,
    builder: &dyn GeometryBuilder,
    rng: &mut R,
) -> PlacementOutcome
where
    F: Feature,
    R: Rng + ?Sized,
{
    let merged = feature.default_template().reconcile(template);
    let budget = ctx.settings().retry_budget.max(1);

    let mut attempt = 0;
    let last = loop {
        attempt += 1;
        match attempt_once(feature, &merged, ctx, builder, rng) {
            Ok((spec, parts)) => {
                let ids = commit(feature, &spec, parts, ctx);
                info!("{}: committed {:?} on attempt {}", feature.name(), ids, attempt);
                return PlacementOutcome::Committed(ids);
            }
            Err(Interrupt::Reject(rejection)) => {
                debug!("{}: attempt {}/{} rejected: {}", feature.name(), attempt, budget, rejection);
                if attempt >= budget {
                    break rejection;
                }
            }
            Err(Interrupt::Defer(label)) => {
                warn!("{}: deferred, no object labelled '{}' yet", feature.name(), label);
                return PlacementOutcome::Deferred(label);
            }
            Err(Interrupt::Fail(error)) => return PlacementOutcome::Failed(error),
        }
    };

    warn!("{}: exhausted {} attempts, last: {}", feature.name(), budget, last);
    PlacementOutcome::Failed(GenerationError::PlacementExhausted {
        feature: feature.name().to_string(),
        attempts: budget,
        last,
    })
}

fn attempt_once<F, R>(
    feature: &F,
    merged: &F::Template,
    ctx: &GenerationContext,
    builder: &dyn GeometryBuilder,
    rng: &mut R,
) -> Result<(F::Spec, Vec<SceneObject>), Interrupt>
where
    F: Feature,
    R: Rng + ?Sized,
{
    let draft = merged.resolve(rng);
    let spec = feature.complete(draft, ctx, rng)?;

    let mut parts = Vec::new();
    for (i, request) in feature.parts(&spec).iter().enumerate() {
        let id = ctx.candidate_id(feature.name(), i);
        parts.push(builder.build(&id, request).map_err(Rejection::from)?);
    }

    check_placement(
        &parts,
        ctx.bounds(),
        &ctx.extents(),
        ctx.performer_floor(),
        &feature.rules(&spec),
    )?;
    feature.check(&spec, &parts, ctx)?;
    Ok((spec, parts))
}

fn commit<F: Feature>(
    feature: &F,
    spec: &F::Spec,
    mut parts: Vec<SceneObject>,
    ctx: &mut GenerationContext,
) -> Vec<String> {
    let mut labels = vec![feature.name().to_string()];
    for label in feature.labels(spec) {
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    for part in &mut parts {
        part.labels = labels.clone();
    }
    feature.wire(spec, &mut parts);
    ctx.commit(parts, &labels)
}

/// Pick a random entry under `label` for `feature` to anchor on.
///
/// A label no group declares is a configuration error; a declared label
/// with no entries yet defers.
pub fn lookup_label<'c, R: Rng + ?Sized>(
    ctx: &'c GenerationContext,
    feature: &str,
    label: &str,
    rng: &mut R,
) -> Result<&'c LabelEntry, Interrupt> {
    if !ctx.is_declared(label) {
        return Err(Interrupt::Fail(GenerationError::configuration(
            feature,
            format!("label '{label}' is not produced by any feature in this scene"),
        )));
    }
    ctx.labels()
        .get_one_random(label, rng)
        .ok_or_else(|| Interrupt::Defer(label.to_string()))
}
