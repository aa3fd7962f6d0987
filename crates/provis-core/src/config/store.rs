//! Scoped access to provis.toml on disk.
//!
//! A store is bound to one scope but knows both directories, so it can also
//! read its sibling scope when building the effective configuration.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::types::ConfigScope;

use super::{ProvisConfig, merge::merge_configs, parser, paths::config_path_for_scope};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    scope: ConfigScope,
    global_dir: PathBuf,
    project_root: PathBuf,
    config_path: PathBuf,
}

impl ConfigStore {
    /// Store for `scope` rooted at the user config dir and the working directory.
    pub fn from_scope(scope: ConfigScope) -> anyhow::Result<Self> {
        let global_dir = default_global_dir()?;
        let project_root =
            std::env::current_dir().context("Failed to read the current directory")?;

        Ok(Self::from_paths(scope, global_dir, project_root))
    }

    pub fn from_paths(scope: ConfigScope, global_dir: PathBuf, project_root: PathBuf) -> Self {
        let config_path = config_path_for_scope(scope, &global_dir, &project_root);
        Self {
            scope,
            global_dir,
            project_root,
            config_path,
        }
    }

    /// The same directories, bound to another scope.
    pub fn with_scope(&self, scope: ConfigScope) -> Self {
        Self::from_paths(scope, self.global_dir.clone(), self.project_root.clone())
    }

    pub fn scope(&self) -> ConfigScope {
        self.scope
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn global_dir(&self) -> &Path {
        &self.global_dir
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Read this scope's file. A missing file is an empty configuration.
    pub fn load(&self) -> anyhow::Result<ProvisConfig> {
        if !self.config_path.exists() {
            debug!(scope = ?self.scope, path = %self.config_path.display(), "no config file");
            return Ok(ProvisConfig::new());
        }
        let config = parser::parse_provis_toml(&self.config_path)?;
        debug!(
            scope = ?self.scope,
            phases = config.phases.len(),
            "loaded config"
        );
        Ok(config)
    }

    /// Global layer with the project layer on top, validated as a whole.
    pub fn load_effective(&self) -> anyhow::Result<ProvisConfig> {
        let global = self
            .with_scope(ConfigScope::Global)
            .load()
            .context("Failed to load global configuration")?;
        let project = self
            .with_scope(ConfigScope::Project)
            .load()
            .context("Failed to load project configuration")?;

        let merged = merge_configs(Some(global), Some(project));
        merged
            .validate()
            .context("Effective configuration is invalid")?;
        Ok(merged)
    }

    /// Validate and write `config` to this scope, creating its directory.
    pub fn save(&self, config: &ProvisConfig) -> anyhow::Result<()> {
        config
            .validate()
            .with_context(|| format!("Refusing to save {}", self.config_path.display()))?;
        let content = parser::to_toml(config).context("Failed to serialize config to TOML")?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        debug!(scope = ?self.scope, path = %self.config_path.display(), "saved config");
        Ok(())
    }
}

/// Directory holding the global provis.toml.
pub fn default_global_dir() -> anyhow::Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("provis"))
}
