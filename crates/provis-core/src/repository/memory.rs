//! In-memory repositories for embedding callers and tests.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use url::Url;

use crate::metadata::{ArtifactDescriptor, ArtifactKey};

use super::{ArtifactRepository, ArtifactRepositoryManager, RepositoryError};

#[derive(Debug, Clone)]
pub struct MemoryArtifactRepository {
    location: Url,
    descriptors: Vec<ArtifactDescriptor>,
}

impl MemoryArtifactRepository {
    pub fn new(location: Url) -> Self {
        Self {
            location,
            descriptors: Vec::new(),
        }
    }

    pub fn with_descriptor(mut self, descriptor: ArtifactDescriptor) -> Self {
        self.add_descriptor(descriptor);
        self
    }

    pub fn add_descriptor(&mut self, descriptor: ArtifactDescriptor) {
        self.descriptors.push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl ArtifactRepository for MemoryArtifactRepository {
    fn location(&self) -> &Url {
        &self.location
    }

    fn descriptors_for(&self, key: &ArtifactKey) -> Vec<ArtifactDescriptor> {
        self.descriptors
            .iter()
            .filter(|descriptor| descriptor.key() == key)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone)]
enum Availability {
    Unavailable(String),
    Broken(String),
}

/// Repository manager backed by a registration-ordered map.
#[derive(Debug, Default)]
pub struct MemoryRepositoryManager {
    repositories: IndexMap<Url, Arc<MemoryArtifactRepository>>,
    failures: HashMap<Url, Availability>,
}

impl MemoryRepositoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository. Re-registering a location keeps its position.
    pub fn register(&mut self, repository: MemoryArtifactRepository) {
        let location = repository.location().clone();
        self.repositories.insert(location, Arc::new(repository));
    }

    /// Make subsequent loads of `location` fail recoverably.
    pub fn mark_unavailable(&mut self, location: &Url, reason: impl Into<String>) {
        self.failures
            .insert(location.clone(), Availability::Unavailable(reason.into()));
    }

    /// Make subsequent loads of `location` fail fatally.
    pub fn mark_broken(&mut self, location: &Url, reason: impl Into<String>) {
        self.failures
            .insert(location.clone(), Availability::Broken(reason.into()));
    }

    pub fn mark_available(&mut self, location: &Url) {
        self.failures.remove(location);
    }
}

impl ArtifactRepositoryManager for MemoryRepositoryManager {
    fn known_repositories(&self) -> Vec<Url> {
        self.repositories.keys().cloned().collect()
    }

    fn load(&self, location: &Url) -> Result<Arc<dyn ArtifactRepository>, RepositoryError> {
        match self.failures.get(location) {
            Some(Availability::Unavailable(reason)) => {
                return Err(RepositoryError::Unavailable {
                    location: location.clone(),
                    reason: reason.clone(),
                });
            }
            Some(Availability::Broken(reason)) => {
                return Err(RepositoryError::Fatal {
                    location: location.clone(),
                    reason: reason.clone(),
                });
            }
            None => {}
        }

        match self.repositories.get(location) {
            Some(repository) => Ok(repository.clone() as Arc<dyn ArtifactRepository>),
            None => Err(RepositoryError::Unavailable {
                location: location.clone(),
                reason: "no repository registered at this location".to_string(),
            }),
        }
    }
}
