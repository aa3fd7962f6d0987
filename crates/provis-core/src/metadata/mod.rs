//! Metadata model: installable units and the artifacts they reference.

pub mod artifact;
pub mod unit;

pub use artifact::{ARTIFACT_SIZE, ArtifactDescriptor, ArtifactKey, ArtifactRequest, DOWNLOAD_SIZE};
pub use unit::{InstallableUnit, TouchpointType, UnitBuilder, UnitId};
