//! Artifact keys, descriptors and requests.

use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::properties::PropertyStore;

/// Descriptor property holding the on-disk size in bytes.
pub const ARTIFACT_SIZE: &str = "artifact.size";

/// Descriptor property holding the download size in bytes.
pub const DOWNLOAD_SIZE: &str = "download.size";

/// Identity of an artifact within a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub classifier: String,
    pub id: String,
    pub version: Version,
}

impl ArtifactKey {
    pub fn new(classifier: impl Into<String>, id: impl Into<String>, version: Version) -> Self {
        Self {
            classifier: classifier.into(),
            id: id.into(),
            version,
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.classifier, self.id, self.version)
    }
}

/// Repository-side description of one stored form of an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    key: ArtifactKey,
    properties: PropertyStore,
}

impl ArtifactDescriptor {
    pub fn new(key: ArtifactKey) -> Self {
        Self {
            key,
            properties: PropertyStore::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.set(key, value);
        self
    }

    /// Convenience for descriptors carrying both size properties.
    pub fn with_sizes(self, artifact_size: u64, download_size: u64) -> Self {
        self.with_property(ARTIFACT_SIZE, artifact_size.to_string())
            .with_property(DOWNLOAD_SIZE, download_size.to_string())
    }

    pub fn key(&self) -> &ArtifactKey {
        &self.key
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key)
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }
}

/// A request to obtain one artifact, produced by a touchpoint's collect action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRequest {
    key: ArtifactKey,
}

impl ArtifactRequest {
    pub fn new(key: ArtifactKey) -> Self {
        Self { key }
    }

    pub fn artifact_key(&self) -> &ArtifactKey {
        &self.key
    }
}

impl From<ArtifactKey> for ArtifactRequest {
    fn from(key: ArtifactKey) -> Self {
        Self::new(key)
    }
}
