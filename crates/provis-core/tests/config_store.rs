use std::sync::Arc;

use tempfile::TempDir;
use url::Url;

use provis_core::config::ConfigStore;
use provis_core::config::{PhaseEntry, ProvisConfig};
use provis_core::engine::{PhaseParameters, PhaseSet, ProvisioningContext, Sizing};
use provis_core::repository::MemoryRepositoryManager;
use provis_core::types::ConfigScope;

fn store(temp: &TempDir, scope: ConfigScope) -> ConfigStore {
    ConfigStore::from_paths(
        scope,
        temp.path().join("config"),
        temp.path().join("project"),
    )
}

#[test]
fn load_missing_returns_default_config() {
    let temp = TempDir::new().unwrap();
    let config = store(&temp, ConfigScope::Global).load().unwrap();

    assert!(config.phases.is_empty());
    assert!(config.sizing.repositories.is_none());
    assert!(config.profile.properties.is_empty());
}

#[test]
fn save_then_load_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp, ConfigScope::Global);

    let mut config = ProvisConfig::new();
    config.phases = vec![PhaseEntry::new("sizing", 5), PhaseEntry::new("install", 10)];
    config.sizing.repositories = Some(vec![Url::parse("https://repo.example.org/a").unwrap()]);
    config.profile.properties.set("install.folder", "/opt/app");

    store.save(&config).unwrap();
    assert!(store.config_path().exists());
    assert_eq!(store.load().unwrap(), config);
}

#[test]
fn invalid_file_reports_its_path() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp, ConfigScope::Project);
    std::fs::create_dir_all(store.project_root()).unwrap();
    std::fs::write(store.config_path(), "[[phases]]\nid = \"explode\"\n").unwrap();

    let err = store.load().unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("provis.toml"), "{}", message);
    assert!(message.contains("explode"), "{}", message);
}

#[test]
fn effective_config_layers_project_over_global() {
    let temp = TempDir::new().unwrap();

    let mut global = ProvisConfig::new();
    global.profile.properties.set("os", "linux");
    global.profile.properties.set("arch", "x86_64");
    global.sizing.repositories = Some(vec![Url::parse("https://repo.example.org/g").unwrap()]);
    store(&temp, ConfigScope::Global).save(&global).unwrap();

    let mut project = ProvisConfig::new();
    project.phases = vec![PhaseEntry::new("sizing", 3)];
    project.profile.properties.set("arch", "aarch64");
    store(&temp, ConfigScope::Project).save(&project).unwrap();

    // Any scope's store reads both layers.
    let effective = store(&temp, ConfigScope::Global).load_effective().unwrap();
    assert_eq!(
        store(&temp, ConfigScope::Project).load_effective().unwrap(),
        effective
    );

    assert_eq!(effective.phases, vec![PhaseEntry::new("sizing", 3)]);
    assert_eq!(effective.profile.properties.get("os"), Some("linux"));
    assert_eq!(effective.profile.properties.get("arch"), Some("aarch64"));
    assert_eq!(
        effective.sizing.repositories,
        Some(vec![Url::parse("https://repo.example.org/g").unwrap()])
    );

    let set = PhaseSet::from_config(&effective, Arc::new(MemoryRepositoryManager::new())).unwrap();
    assert_eq!(set.phase_ids(), vec!["sizing"]);
    assert!(set.phase_as::<Sizing>().is_some());
}

#[test]
fn with_scope_keeps_both_directories() {
    let temp = TempDir::new().unwrap();
    let global = store(&temp, ConfigScope::Global);
    let project = global.with_scope(ConfigScope::Project);

    assert_eq!(project.scope(), ConfigScope::Project);
    assert_eq!(project.global_dir(), global.global_dir());
    assert_eq!(project.config_path(), temp.path().join("project").join("provis.toml"));
}

#[test]
fn save_rejects_an_invalid_config() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp, ConfigScope::Global);

    let mut config = ProvisConfig::new();
    config.phases = vec![PhaseEntry::new("install", 0)];

    assert!(store.save(&config).is_err());
    assert!(!store.config_path().exists());
}

#[test]
fn invalid_project_layer_fails_the_effective_load() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("project")).unwrap();
    std::fs::write(
        temp.path().join("project").join("provis.toml"),
        "[[phases]]\nid = \"sizing\"\nweight = 1\n\n[[phases]]\nid = \"sizing\"\nweight = 2\n",
    )
    .unwrap();

    let err = store(&temp, ConfigScope::Global).load_effective().unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("project configuration"), "{}", message);
    assert!(message.contains("more than once"), "{}", message);
}

#[test]
fn configured_repositories_scope_the_sizing_phase() {
    use provis_core::engine::{CancellationToken, Phase};
    use provis_core::metadata::{ArtifactDescriptor, ArtifactKey, ArtifactRequest};
    use provis_core::repository::MemoryArtifactRepository;

    let r1 = Url::parse("memory:/r1").unwrap();
    let r2 = Url::parse("memory:/r2").unwrap();
    let key = |id: &str| ArtifactKey::new("binary", id, semver::Version::new(1, 0, 0));
    let mut manager = MemoryRepositoryManager::new();
    manager.register(
        MemoryArtifactRepository::new(r1)
            .with_descriptor(ArtifactDescriptor::new(key("k1")).with_sizes(1000, 400)),
    );
    manager.register(
        MemoryArtifactRepository::new(r2.clone())
            .with_descriptor(ArtifactDescriptor::new(key("k2")).with_sizes(2000, 800)),
    );

    let mut config = ProvisConfig::new();
    config.sizing.repositories = Some(vec![r2.clone()]);
    config.profile.properties.set("os", "linux");

    let context = ProvisioningContext::from_config(&config);
    assert_eq!(context.artifact_repositories, Some(vec![r2]));
    assert_eq!(context.properties.get("os"), Some("linux"));

    let mut sizing = Sizing::new(10, Arc::new(manager));
    let mut params = PhaseParameters::new(context);
    assert!(sizing.initialize(&mut params).is_ok());
    params.artifact_requests.push(ArtifactRequest::new(key("k1")));
    params.artifact_requests.push(ArtifactRequest::new(key("k2")));
    assert!(sizing.complete(&mut params, &CancellationToken::new()).is_ok());

    assert_eq!(sizing.disk_size(), 2000);
    assert_eq!(sizing.download_size(), 800);
}

#[test]
fn profile_defaults_serialize_as_a_plain_map() {
    let mut config = ProvisConfig::new();
    config.profile.properties.set("os", "linux");

    let json = serde_json::to_value(&config.profile).unwrap();
    assert_eq!(json, serde_json::json!({ "properties": { "os": "linux" } }));
}
