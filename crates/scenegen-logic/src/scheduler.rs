//! Deferred-retry scheduler.
//!
//! Feature groups run once in fixed order. A group that defers (it needs a
//! label another group has not produced yet) stops at that instance and is
//! retried, in original relative order, for a bounded number of extra
//! passes. Whatever is still deferred after the last pass is a
//! configuration error naming the labels that never appeared.

use log::{info, warn};
use rand::RngCore;

use crate::builder::GeometryBuilder;
use crate::context::GenerationContext;
use crate::distribution::Resolve;
use crate::error::GenerationError;
use crate::placement::{place, Feature, PlacementOutcome};
use crate::reconcile::Reconcile;

#[derive(Debug, Clone, PartialEq)]
pub enum GroupStatus {
    Done,
    Deferred(String),
    Failed(GenerationError),
}

/// A resumable batch of placements for one feature type.
pub trait PlacementGroup {
    fn name(&self) -> &str;

    /// Labels this group can produce.
    fn declared_labels(&self) -> Vec<String>;

    /// Place everything still outstanding, resuming where the last run
    /// deferred.
    fn run(
        &mut self,
        ctx: &mut GenerationContext,
        builder: &dyn GeometryBuilder,
        rng: &mut dyn RngCore,
    ) -> GroupStatus;
}

/// Every template of one feature, each placed `num` times.
pub struct FeatureGroup<F: Feature> {
    feature: F,
    templates: Vec<F::Template>,
    cursor: usize,
    planned: Option<u32>,
    placed: u32,
}

impl<F: Feature> FeatureGroup<F> {
    pub fn new(feature: F, templates: Vec<F::Template>) -> Self {
        Self {
            feature,
            templates,
            cursor: 0,
            planned: None,
            placed: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl<F: Feature> PlacementGroup for FeatureGroup<F> {
    fn name(&self) -> &str {
        self.feature.name()
    }

    fn declared_labels(&self) -> Vec<String> {
        if self.templates.is_empty() {
            return Vec::new();
        }
        let default = self.feature.default_template();
        let mut labels = vec![self.feature.name().to_string()];
        for template in &self.templates {
            for label in self.feature.declared_labels(&default.reconcile(template)) {
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
        }
        labels
    }

    fn run(
        &mut self,
        ctx: &mut GenerationContext,
        builder: &dyn GeometryBuilder,
        rng: &mut dyn RngCore,
    ) -> GroupStatus {
        while self.cursor < self.templates.len() {
            let template = &self.templates[self.cursor];
            // Instance count is drawn once per template, not per pass
            let planned = match self.planned {
                Some(n) => n,
                None => {
                    let merged = self.feature.default_template().reconcile(template);
                    let drawn = self.feature.count(&merged).map_or(1, |c| c.resolve(rng));
                    let Ok(n) = u32::try_from(drawn) else {
                        return GroupStatus::Failed(GenerationError::configuration(
                            self.feature.name(),
                            format!("instance count {drawn} is negative"),
                        ));
                    };
                    self.planned = Some(n);
                    n
                }
            };
            while self.placed < planned {
                match place(&self.feature, template, ctx, builder, rng) {
                    PlacementOutcome::Committed(_) => self.placed += 1,
                    PlacementOutcome::Deferred(label) => return GroupStatus::Deferred(label),
                    PlacementOutcome::Failed(e) => return GroupStatus::Failed(e),
                }
            }
            self.cursor += 1;
            self.planned = None;
            self.placed = 0;
        }
        GroupStatus::Done
    }
}

/// Run `groups` in order, then retry deferred ones for the configured
/// number of extra passes.
pub fn run_groups(
    groups: &mut [Box<dyn PlacementGroup>],
    ctx: &mut GenerationContext,
    builder: &dyn GeometryBuilder,
    rng: &mut dyn RngCore,
) -> Result<(), GenerationError> {
    let mut deferred: Vec<(usize, String)> = Vec::new();
    for (i, group) in groups.iter_mut().enumerate() {
        match group.run(ctx, builder, rng) {
            GroupStatus::Done => {}
            GroupStatus::Deferred(label) => deferred.push((i, label)),
            GroupStatus::Failed(e) => return Err(e),
        }
    }
    info!("scheduler: first pass done, {} group(s) deferred", deferred.len());

    let passes = ctx.settings().deferred_passes;
    for pass in 1..=passes {
        if deferred.is_empty() {
            break;
        }
        let mut still_deferred = Vec::new();
        for (i, _) in deferred {
            match groups[i].run(ctx, builder, rng) {
                GroupStatus::Done => {}
                GroupStatus::Deferred(label) => still_deferred.push((i, label)),
                GroupStatus::Failed(e) => return Err(e),
            }
        }
        info!(
            "scheduler: deferred pass {}/{}, {} group(s) still deferred",
            pass,
            passes,
            still_deferred.len()
        );
        deferred = still_deferred;
    }

    if deferred.is_empty() {
        return Ok(());
    }
    let features: Vec<&str> = deferred.iter().map(|(i, _)| groups[*i].name()).collect();
    let mut labels: Vec<&str> = Vec::new();
    for (_, label) in &deferred {
        if !labels.contains(&label.as_str()) {
            labels.push(label.as_str());
        }
    }
    warn!("scheduler: giving up on {:?}, missing {:?}", features, labels);
    Err(GenerationError::configuration(
        features.join(", "),
        format!(
            "no object carries label(s) {} after {} deferred pass(es)",
            labels.join(", "),
            passes
        ),
    ))
}
