mod support;

use provis_core::config::ProfileDefaults;
use provis_core::profile::{Profile, ProfileError, ProfileRegistry};
use provis_core::properties::PropertyStore;

use support::{init_tracing, unit};

fn props(entries: &[(&str, &str)]) -> PropertyStore {
    entries.iter().map(|(k, v)| (*k, *v)).collect()
}

fn three_level_registry() -> ProfileRegistry {
    let mut registry = ProfileRegistry::new();
    registry
        .add_profile("root", None, props(&[("os", "linux"), ("cache", "/var/cache")]))
        .unwrap();
    registry
        .add_profile("middle", Some("root"), props(&[("os", "freebsd")]))
        .unwrap();
    registry
        .add_profile("leaf", Some("middle"), props(&[("name", "leaf")]))
        .unwrap();
    registry
}

#[test]
fn configured_defaults_seed_new_root_profiles() {
    let mut defaults = ProfileDefaults::default();
    defaults.properties.set("os", "linux");
    defaults.properties.set("install.folder", "/opt/app");

    let mut registry = ProfileRegistry::new();
    registry
        .add_profile_with_defaults("root", None, &defaults, props(&[("os", "freebsd")]))
        .unwrap();
    registry
        .add_profile_with_defaults("child", Some("root"), &defaults, props(&[("name", "child")]))
        .unwrap();

    let root = registry.get("root").unwrap();
    assert_eq!(root.local_property("os"), Some("freebsd"));
    assert_eq!(root.local_property("install.folder"), Some("/opt/app"));

    // The child inherits the root's values instead of shadowing them.
    let child = registry.get("child").unwrap();
    assert_eq!(child.local_property("os"), None);
    assert_eq!(registry.property("child", "os").unwrap(), Some("freebsd"));
    assert_eq!(registry.property("child", "name").unwrap(), Some("child"));
}

#[test]
fn property_lookup_uses_nearest_ancestor() {
    init_tracing();
    let registry = three_level_registry();

    assert_eq!(registry.property("leaf", "name").unwrap(), Some("leaf"));
    assert_eq!(registry.property("leaf", "os").unwrap(), Some("freebsd"));
    assert_eq!(registry.property("leaf", "cache").unwrap(), Some("/var/cache"));
    assert_eq!(registry.property("leaf", "missing").unwrap(), None);
    assert_eq!(registry.property("root", "os").unwrap(), Some("linux"));

    let leaf = registry.get("leaf").unwrap();
    assert_eq!(leaf.local_property("os"), None);
}

#[test]
fn unknown_profile_is_reported() {
    let registry = three_level_registry();
    assert_eq!(
        registry.property("nope", "os"),
        Err(ProfileError::NotFound("nope".to_string()))
    );
}

#[test]
fn merged_properties_of_root_equal_local() {
    let registry = three_level_registry();
    let root = registry.get("root").unwrap();
    assert_eq!(&registry.properties("root").unwrap(), root.local_properties());
}

#[test]
fn snapshot_is_clean_and_independent() {
    init_tracing();
    let mut registry = three_level_registry();
    let a = unit("org.example.a", "1.0.0");
    {
        let leaf = registry.get_mut("leaf").unwrap();
        leaf.add_installable_unit(&a);
        leaf.set_installable_unit_property(&a, "root", "true");
        assert!(leaf.is_changed());
    }

    let snapshot = registry.snapshot("leaf").unwrap();
    let copy = snapshot.get("leaf").unwrap();
    assert!(!copy.is_changed());
    assert_eq!(
        snapshot.properties("leaf").unwrap(),
        registry.properties("leaf").unwrap()
    );
    assert_eq!(snapshot.len(), 3);

    registry.get_mut("leaf").unwrap().set_property("name", "changed");
    registry.get_mut("root").unwrap().set_property("os", "windows");
    registry
        .get_mut("leaf")
        .unwrap()
        .remove_installable_unit(&a);

    assert_eq!(snapshot.property("leaf", "name").unwrap(), Some("leaf"));
    assert_eq!(snapshot.property("root", "os").unwrap(), Some("linux"));
    let copy = snapshot.get("leaf").unwrap();
    assert!(copy.contains_installable_unit(&a));
    assert_eq!(copy.installable_unit_property(&a, "root"), Some("true"));
}

#[test]
fn restore_puts_the_snapshot_back() {
    let mut registry = three_level_registry();
    let snapshot = registry.snapshot("leaf").unwrap();

    let leaf = registry.get_mut("leaf").unwrap();
    leaf.add_installable_unit(&unit("a", "1.0.0"));
    leaf.set_property("name", "dirty");

    registry.restore(&snapshot, "leaf").unwrap();
    let leaf = registry.get("leaf").unwrap();
    assert_eq!(leaf.installable_unit_count(), 0);
    assert_eq!(leaf.local_property("name"), Some("leaf"));
    assert!(!leaf.is_changed());
}

#[test]
fn orphaned_unit_properties_are_purged_explicitly() {
    init_tracing();
    let mut profile = Profile::new("p", PropertyStore::new()).unwrap();
    let u = unit("org.example.u", "2.1.0");
    profile.add_installable_unit(&u);
    profile.set_installable_unit_property(&u, "root", "true");

    profile.remove_installable_unit(&u);
    assert_eq!(profile.installable_unit_properties(&u).get("root"), Some("true"));

    assert_eq!(profile.clear_orphaned_installable_unit_properties(), 1);
    assert!(profile.installable_unit_properties(&u).is_empty());
}

#[test]
fn clearing_units_drops_their_properties() {
    let mut profile = Profile::new("p", PropertyStore::new()).unwrap();
    let u = unit("a", "1.0.0");
    profile.add_installable_unit(&u);
    profile.add_installable_unit_properties(&u, [("root", "true"), ("lock", "1")]);
    assert_eq!(profile.installable_unit_properties(&u).len(), 2);

    profile.clear_installable_units();
    assert_eq!(profile.installable_unit_count(), 0);
    assert!(profile.installable_unit_properties(&u).is_empty());
}

#[test]
fn timestamps_round_trip() {
    let mut profile = Profile::new("p", PropertyStore::new()).unwrap();
    assert_eq!(profile.timestamp(), None);
    let now = chrono::Utc::now();
    profile.set_timestamp(now);
    assert_eq!(profile.timestamp(), Some(now));
}
