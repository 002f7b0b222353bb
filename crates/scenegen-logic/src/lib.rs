//! Randomized scene template resolution and constrained placement.
//!
//! This crate turns partially-specified scene documents into concrete,
//! spatially valid scenes. Any template field may be a literal, a list of
//! choices, a numeric range, or a nested sub-template. Functions take plain
//! data and return results; the crate does no I/O and installs no logger.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`builder`] | Geometry builder interface and the default cuboid builder |
//! | [`cast`] | Raw JSON to typed templates, with aggregated type errors |
//! | [`config`] | Engine tunables (retry budget, deferred passes, seed) |
//! | [`context`] | Per-scene state: bounds, labels, committed objects |
//! | [`distribution`] | Randomizable values and the resolver |
//! | [`error`] | Errors that abort generation |
//! | [`features`] | Walls, floor patches, objects, launchers, agents |
//! | [`generator`] | Scene document and the generation entry point |
//! | [`geometry`] | Floor-plane footprints, polygon intersection, room extents |
//! | [`labels`] | Label repository for cross-object references |
//! | [`placement`] | Generate-and-validate loop shared by every feature |
//! | [`reconcile`] | Default/override template merging |
//! | [`scene`] | Placed objects, bounds registry, scene output |
//! | [`scheduler`] | Feature group ordering and deferred retries |
//! | [`validation`] | Placement checks and finished-scene audits |

pub mod builder;
pub mod cast;
pub mod config;
pub mod context;
pub mod distribution;
pub mod error;
pub mod features;
pub mod generator;
pub mod geometry;
pub mod labels;
pub mod placement;
pub mod reconcile;
pub mod scene;
pub mod scheduler;
pub mod validation;
