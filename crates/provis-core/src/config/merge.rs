//! Configuration layer merging logic
//!
//! Project configuration is layered over global configuration:
//! - a non-empty project phase list replaces the global one
//! - a project repository scope replaces the global one
//! - profile default properties merge key by key, project values winning

use super::schema::ProvisConfig;

/// Merge the global and project layers into the effective configuration.
pub fn merge_configs(global: Option<ProvisConfig>, project: Option<ProvisConfig>) -> ProvisConfig {
    let mut merged = global.unwrap_or_default();

    if let Some(layer) = project {
        if !layer.phases.is_empty() {
            merged.phases = layer.phases;
        }
        if layer.sizing.repositories.is_some() {
            merged.sizing.repositories = layer.sizing.repositories;
        }
        merged
            .profile
            .properties
            .put_all(layer.profile.properties.iter());
    }

    merged
}
