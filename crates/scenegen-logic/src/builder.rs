//! Geometry builder seam.
//!
//! Turning resolved parameters into real geometry belongs to a material and
//! shape library. The engine only relies on the output contract: every
//! built part has an id, a transform, and a floor footprint.
//! [`CuboidBuilder`] is the stand-in used when no library is plugged in.

use thiserror::Error;

use crate::geometry::{Footprint, Vec3};
use crate::scene::SceneObject;

/// Everything needed to build one physical part.
#[derive(Debug, Clone, PartialEq)]
pub struct PartRequest {
    pub kind: String,
    pub shape: String,
    pub material: Option<String>,
    pub size: Vec3,
    pub position: Vec3,
    pub rotation_y: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("'{shape}' has a non-positive floor size {width}x{depth}")]
    InvalidSize {
        shape: String,
        width: f64,
        depth: f64,
    },
    #[error("unknown shape '{0}'")]
    UnknownShape(String),
}

/// Builds concrete parts from resolved parameters.
pub trait GeometryBuilder {
    fn build(&self, id: &str, request: &PartRequest) -> Result<SceneObject, BuildError>;
}

/// Treats every shape as an axis-aligned box of the requested size.
#[derive(Debug, Clone, Copy, Default)]
pub struct CuboidBuilder;

impl GeometryBuilder for CuboidBuilder {
    fn build(&self, id: &str, request: &PartRequest) -> Result<SceneObject, BuildError> {
        if request.size.x <= 0.0 || request.size.z <= 0.0 {
            return Err(BuildError::InvalidSize {
                shape: request.shape.clone(),
                width: request.size.x,
                depth: request.size.z,
            });
        }
        Ok(SceneObject {
            id: id.to_string(),
            kind: request.kind.clone(),
            shape: request.shape.clone(),
            material: request.material.clone(),
            position: request.position,
            rotation_y: request.rotation_y,
            size: request.size,
            footprint: Footprint::rectangle(
                request.position.floor(),
                request.size.x,
                request.size.z,
                request.rotation_y,
            ),
            labels: Vec::new(),
            timeline: Vec::new(),
            moved_by: None,
        })
    }
}
