//! Configuration management for the two scopes
//!
//! - Global: per-user configuration in the platform config directory
//! - Project: provis.toml at the project root, layered over global

pub mod merge;
pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use merge::merge_configs;
pub use parser::{parse_provis_toml, parse_provis_toml_str, to_toml};
pub use paths::{CONFIG_FILE_NAME, config_path_for_scope};
pub use schema::{PhaseEntry, ProfileDefaults, ProvisConfig, SizingEntry};
pub use store::{ConfigStore, default_global_dir};
