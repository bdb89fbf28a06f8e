//! # FoxWorks Core
//!
//! Object model and geometry plumbing for the FoxWorks vessel editor.
//!
//! This crate provides:
//! - **Object Tree**: hierarchical vessel objects with typed parameters and local positions
//! - **Snapshots**: detached copies of object state for off-thread evaluation
//! - **Geometry**: triangle meshes and the evaluator interface, plus a procedural evaluator
//! - **Tasks**: owned background threads with cooperative stop

pub mod geometry;
pub mod math;
pub mod object;
pub mod procedural;
pub mod snapshot;
pub mod task;

pub use geometry::{GeometryError, GeometryEvaluator, GeometryResult, Mesh, MeshFlags};
pub use object::{Object, ObjectId, ObjectTree, ObjectType, StateVector, Variable};
pub use procedural::RevolvedBodyEvaluator;
pub use snapshot::{ObjectSnapshot, SnapshotSource};
pub use task::{StopToken, TaskHandle};

use thiserror::Error;

/// Core errors
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),

    #[error("cannot parent {child} under its own descendant {parent}")]
    CyclicParent { child: ObjectId, parent: ObjectId },

    #[error("failed to spawn task '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
