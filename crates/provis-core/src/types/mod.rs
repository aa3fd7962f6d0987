//! Shared core types used across the configuration layers.

use serde::{Deserialize, Serialize};

/// Configuration scope levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigScope {
    /// Per-user configuration under the platform config directory.
    Global,
    /// Project configuration next to the project's sources.
    Project,
}
