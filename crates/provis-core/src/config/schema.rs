//! Configuration schema for provis.toml
//!
//! ```toml
//! [[phases]]
//! id = "sizing"
//! weight = 5
//!
//! [sizing]
//! repositories = ["https://download.example.org/artifacts"]
//!
//! [profile.properties]
//! "install.folder" = "/opt/app"
//! ```

use serde::{Deserialize, Serialize};
use url::Url;

use crate::engine::phases::{DEFAULT_PHASE_WEIGHT, Sizing, UnitPhaseKind};
use crate::properties::PropertyStore;

/// Root configuration structure for provis.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisConfig {
    /// Ordered phase set. Empty means the standard
    /// unconfigure/uninstall/install/configure sequence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<PhaseEntry>,

    #[serde(default)]
    pub sizing: SizingEntry,

    #[serde(default)]
    pub profile: ProfileDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseEntry {
    pub id: String,

    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    DEFAULT_PHASE_WEIGHT
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizingEntry {
    /// Artifact repositories consulted when sizing; unset means all known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repositories: Option<Vec<Url>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDefaults {
    /// Properties seeded into newly created root profiles.
    #[serde(default)]
    pub properties: PropertyStore,
}

impl PhaseEntry {
    pub fn new(id: impl Into<String>, weight: u32) -> Self {
        Self {
            id: id.into(),
            weight,
        }
    }
}

impl ProvisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// The configured phases, or the standard sequence when none are listed.
    pub fn phase_entries(&self) -> Vec<PhaseEntry> {
        if !self.phases.is_empty() {
            return self.phases.clone();
        }
        [
            UnitPhaseKind::Unconfigure,
            UnitPhaseKind::Uninstall,
            UnitPhaseKind::Install,
            UnitPhaseKind::Configure,
        ]
        .into_iter()
        .map(|kind| PhaseEntry::new(kind.id(), DEFAULT_PHASE_WEIGHT))
        .collect()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = std::collections::HashSet::new();
        for phase in &self.phases {
            if phase.id != Sizing::PHASE_ID && UnitPhaseKind::from_id(&phase.id).is_none() {
                anyhow::bail!(
                    "Unknown phase '{}' (expected one of: sizing, unconfigure, uninstall, install, configure)",
                    phase.id
                );
            }
            if !seen.insert(phase.id.as_str()) {
                anyhow::bail!("Phase '{}' is listed more than once", phase.id);
            }
            if phase.weight == 0 {
                anyhow::bail!("Phase '{}' must have a weight greater than zero", phase.id);
            }
        }
        Ok(())
    }
}
