//! Installable units: the versioned components a profile tracks.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::properties::PropertyStore;

use super::artifact::ArtifactKey;

/// Exact identity of an installable unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId {
    pub id: String,
    pub version: Version,
}

impl UnitId {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

/// The executor family responsible for physically applying a unit's actions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TouchpointType {
    pub id: String,
    pub version: Version,
}

impl TouchpointType {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }
}

impl fmt::Display for TouchpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

#[derive(Debug)]
struct UnitData {
    id: UnitId,
    properties: PropertyStore,
    touchpoint_type: Option<TouchpointType>,
    /// Phase id -> authored instruction body.
    instructions: BTreeMap<String, String>,
    artifacts: Vec<ArtifactKey>,
    fragments: Vec<UnitId>,
}

/// An immutable, cheaply cloneable installable unit.
///
/// Equality and hashing use [`UnitId`] only, so a resolved unit (one with
/// fragments attached) and its unresolved form are the same set member.
#[derive(Clone)]
pub struct InstallableUnit {
    inner: Arc<UnitData>,
}

impl InstallableUnit {
    pub fn builder(id: impl Into<String>, version: Version) -> UnitBuilder {
        UnitBuilder::new(id, version)
    }

    pub fn unit_id(&self) -> &UnitId {
        &self.inner.id
    }

    pub fn id(&self) -> &str {
        &self.inner.id.id
    }

    pub fn version(&self) -> &Version {
        &self.inner.id.version
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.inner.properties.get(key)
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.inner.properties
    }

    /// Touchpoint type, or `None` when the unit has no executor.
    pub fn touchpoint_type(&self) -> Option<&TouchpointType> {
        self.inner.touchpoint_type.as_ref()
    }

    /// Instruction body authored on this unit for `phase_id`.
    pub fn touchpoint_instruction(&self, phase_id: &str) -> Option<&str> {
        self.inner.instructions.get(phase_id).map(String::as_str)
    }

    pub fn artifacts(&self) -> &[ArtifactKey] {
        &self.inner.artifacts
    }

    pub fn fragments(&self) -> &[UnitId] {
        &self.inner.fragments
    }

    pub fn is_resolved(&self) -> bool {
        !self.inner.fragments.is_empty()
    }

    /// Attach resolution-time fragments, producing the resolved form.
    pub fn resolved(&self, fragments: Vec<UnitId>) -> Self {
        self.with_fragments(fragments)
    }

    /// Canonical form with no resolution-time attachments.
    pub fn unresolved(&self) -> Self {
        if self.is_resolved() {
            self.with_fragments(Vec::new())
        } else {
            self.clone()
        }
    }

    fn with_fragments(&self, fragments: Vec<UnitId>) -> Self {
        let data = &self.inner;
        Self {
            inner: Arc::new(UnitData {
                id: data.id.clone(),
                properties: data.properties.clone(),
                touchpoint_type: data.touchpoint_type.clone(),
                instructions: data.instructions.clone(),
                artifacts: data.artifacts.clone(),
                fragments,
            }),
        }
    }
}

impl PartialEq for InstallableUnit {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for InstallableUnit {}

impl Hash for InstallableUnit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl PartialOrd for InstallableUnit {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InstallableUnit {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner.id.cmp(&other.inner.id)
    }
}

impl fmt::Debug for InstallableUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallableUnit")
            .field("id", &self.inner.id.id)
            .field("version", &self.inner.id.version.to_string())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl fmt::Display for InstallableUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.id.fmt(f)
    }
}

/// Builder for [`InstallableUnit`].
#[derive(Debug)]
pub struct UnitBuilder {
    id: UnitId,
    properties: PropertyStore,
    touchpoint_type: Option<TouchpointType>,
    instructions: BTreeMap<String, String>,
    artifacts: Vec<ArtifactKey>,
}

impl UnitBuilder {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: UnitId::new(id, version),
            properties: PropertyStore::new(),
            touchpoint_type: None,
            instructions: BTreeMap::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.set(key, value);
        self
    }

    pub fn touchpoint(mut self, touchpoint: TouchpointType) -> Self {
        self.touchpoint_type = Some(touchpoint);
        self
    }

    /// Author the instruction body executed for `phase_id`.
    pub fn instruction(mut self, phase_id: impl Into<String>, body: impl Into<String>) -> Self {
        self.instructions.insert(phase_id.into(), body.into());
        self
    }

    pub fn artifact(mut self, key: ArtifactKey) -> Self {
        self.artifacts.push(key);
        self
    }

    pub fn build(self) -> InstallableUnit {
        InstallableUnit {
            inner: Arc::new(UnitData {
                id: self.id,
                properties: self.properties,
                touchpoint_type: self.touchpoint_type,
                instructions: self.instructions,
                artifacts: self.artifacts,
                fragments: Vec::new(),
            }),
        }
    }
}
