//! Artifact repository capability.
//!
//! The core never performs repository I/O itself. Callers hand in an
//! [`ArtifactRepositoryManager`] that knows which repositories exist and how to
//! load them; the sizing phase only asks for artifact descriptors by key.

pub mod memory;

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::metadata::{ArtifactDescriptor, ArtifactKey};

pub use memory::{MemoryArtifactRepository, MemoryRepositoryManager};

/// A loaded artifact repository.
pub trait ArtifactRepository: fmt::Debug {
    fn location(&self) -> &Url;

    /// Descriptors stored for `key`, best candidate first.
    fn descriptors_for(&self, key: &ArtifactKey) -> Vec<ArtifactDescriptor>;
}

/// Lists and loads artifact repositories.
pub trait ArtifactRepositoryManager: fmt::Debug {
    /// Every known repository location, in registration order.
    fn known_repositories(&self) -> Vec<Url>;

    fn load(&self, location: &Url) -> Result<Arc<dyn ArtifactRepository>, RepositoryError>;
}

/// Failure to load a repository.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// The repository could not be reached; the next candidate may be tried.
    #[error("repository {location} is unavailable: {reason}")]
    Unavailable { location: Url, reason: String },

    /// The repository is unusable in a way that should stop the operation.
    #[error("repository {location} failed to load: {reason}")]
    Fatal { location: Url, reason: String },
}

impl RepositoryError {
    pub fn location(&self) -> &Url {
        match self {
            RepositoryError::Unavailable { location, .. } => location,
            RepositoryError::Fatal { location, .. } => location,
        }
    }

    /// Whether the caller may skip this repository and try the next one.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RepositoryError::Unavailable { .. })
    }
}
