mod support;

use std::sync::Arc;

use provis_core::engine::{
    ActionContext, ActionManager, Engine, Operand, PhaseParameters, PhaseSet, ProgressEvent,
    ProgressMonitor, ProvisioningAction, UnitPhase, UnitPhaseKind, planned_actions,
};
use provis_core::metadata::InstallableUnit;
use provis_core::profile::ProfileRegistry;
use provis_core::properties::PropertyStore;
use semver::Version;

use support::{init_tracing, native, unit};

/// Records its `key`/`value` arguments as a per-unit property.
#[derive(Debug)]
struct MarkUnit;

impl ProvisioningAction for MarkUnit {
    fn id(&self) -> &str {
        "mark"
    }

    fn execute(&self, ctx: &mut ActionContext<'_>) -> anyhow::Result<()> {
        let Some(unit) = ctx.operand.after() else {
            anyhow::bail!("nothing to mark");
        };
        let key = ctx.arguments.get("key").map(String::as_str).unwrap_or("marked");
        let value = ctx.arguments.get("value").map(String::as_str).unwrap_or("true");
        ctx.profile.set_installable_unit_property(unit, key, value);
        Ok(())
    }
}

#[derive(Debug)]
struct Fail;

impl ProvisioningAction for Fail {
    fn id(&self) -> &str {
        "fail"
    }

    fn execute(&self, _ctx: &mut ActionContext<'_>) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }
}

fn native_unit(id: &str, major: u64) -> InstallableUnit {
    InstallableUnit::builder(id, Version::new(major, 0, 0))
        .touchpoint(native())
        .build()
}

fn registry_with(profile_id: &str) -> ProfileRegistry {
    let mut registry = ProfileRegistry::new();
    registry
        .add_profile(profile_id, None, PropertyStore::new())
        .unwrap();
    registry
}

fn engine(actions: ActionManager) -> Engine {
    Engine::new(Arc::new(actions))
}

#[test]
fn install_run_adds_units_and_timestamps_the_profile() {
    init_tracing();
    let mut registry = registry_with("p");
    let a = native_unit("org.example.a", 1);
    let b = unit("org.example.b", "1.0.0");

    let mut set = PhaseSet::install_and_configure();
    let mut params = PhaseParameters::default();
    let mut monitor = ProgressMonitor::new();
    let status = engine(ActionManager::new())
        .perform(
            &mut registry,
            "p",
            &[Operand::install(a.clone()), Operand::install(b.clone())],
            &mut set,
            &mut params,
            &mut monitor,
        )
        .unwrap();

    assert!(status.is_ok(), "{}", status);
    let profile = registry.get("p").unwrap();
    assert!(profile.contains_installable_unit(&a));
    assert!(profile.contains_installable_unit(&b));
    assert!(profile.timestamp().is_some());
    assert!((monitor.work_done() - monitor.total_work()).abs() < 1e-9);
}

#[test]
fn update_replaces_the_old_unit() {
    let mut registry = registry_with("p");
    let old = native_unit("org.example.a", 1);
    let new = native_unit("org.example.a", 2);
    {
        let profile = registry.get_mut("p").unwrap();
        profile.add_installable_unit(&old);
        profile.set_installable_unit_property(&old, "root", "true");
    }

    let mut set = PhaseSet::install_and_configure();
    let status = engine(ActionManager::new())
        .perform(
            &mut registry,
            "p",
            &[Operand::update(old.clone(), new.clone())],
            &mut set,
            &mut PhaseParameters::default(),
            &mut ProgressMonitor::new(),
        )
        .unwrap();

    assert!(status.is_ok());
    let profile = registry.get("p").unwrap();
    assert!(!profile.contains_installable_unit(&old));
    assert!(profile.contains_installable_unit(&new));
    // Properties of the removed unit are purged once the run succeeds.
    assert!(profile.installable_unit_properties(&old).is_empty());
}

#[test]
fn authored_instructions_run_with_their_arguments() {
    init_tracing();
    let mut actions = ActionManager::new();
    actions.register_for_touchpoint("native", "mark", Arc::new(MarkUnit));

    let a = InstallableUnit::builder("org.example.a", Version::new(1, 0, 0))
        .touchpoint(native())
        .instruction("configure", "mark(key:started, value:yes); mark()")
        .build();

    let mut registry = registry_with("p");
    let mut set = PhaseSet::install_and_configure();
    let status = engine(actions)
        .perform(
            &mut registry,
            "p",
            &[Operand::install(a.clone())],
            &mut set,
            &mut PhaseParameters::default(),
            &mut ProgressMonitor::new(),
        )
        .unwrap();

    assert!(status.is_ok(), "{}", status);
    let profile = registry.get("p").unwrap();
    assert_eq!(profile.installable_unit_property(&a, "started"), Some("yes"));
    assert_eq!(profile.installable_unit_property(&a, "marked"), Some("true"));
}

#[test]
fn failing_action_rolls_the_profile_back() {
    init_tracing();
    let mut actions = ActionManager::new();
    actions.register_for_touchpoint("native", "configure", Arc::new(Fail));

    let mut registry = registry_with("p");
    let existing = unit("org.example.existing", "1.0.0");
    registry.get_mut("p").unwrap().add_installable_unit(&existing);
    let a = native_unit("org.example.a", 1);

    let mut set = PhaseSet::install_and_configure();
    let status = engine(actions)
        .perform(
            &mut registry,
            "p",
            &[Operand::install(a.clone())],
            &mut set,
            &mut PhaseParameters::default(),
            &mut ProgressMonitor::new(),
        )
        .unwrap();

    assert!(status.is_error());
    assert!(status.to_string().contains("configure"));
    assert!(status.to_string().contains("disk full"));

    let profile = registry.get("p").unwrap();
    assert!(!profile.contains_installable_unit(&a));
    assert!(profile.contains_installable_unit(&existing));
    assert!(profile.timestamp().is_none());
}

#[test]
fn unknown_authored_action_is_an_error() {
    let a = InstallableUnit::builder("org.example.a", Version::new(1, 0, 0))
        .instruction("install", "explode(now:true)")
        .build();

    let mut registry = registry_with("p");
    let mut set = PhaseSet::install_and_configure();
    let status = engine(ActionManager::new())
        .perform(
            &mut registry,
            "p",
            &[Operand::install(a.clone())],
            &mut set,
            &mut PhaseParameters::default(),
            &mut ProgressMonitor::new(),
        )
        .unwrap();

    assert!(status.is_error());
    assert!(!registry.get("p").unwrap().contains_installable_unit(&a));
}

#[test]
fn cancellation_between_phases_rolls_back() {
    init_tracing();
    let mut registry = registry_with("p");
    let a = native_unit("org.example.a", 1);

    let mut monitor = ProgressMonitor::new();
    let token = monitor.token().clone();
    monitor.add_observer(Arc::new(move |event: &ProgressEvent| {
        if let ProgressEvent::PhaseFinished { phase, .. } = event {
            if phase == "install" {
                token.cancel();
            }
        }
    }));

    let mut set = PhaseSet::install_and_configure();
    let status = engine(ActionManager::new())
        .perform(
            &mut registry,
            "p",
            &[Operand::install(a.clone())],
            &mut set,
            &mut PhaseParameters::default(),
            &mut monitor,
        )
        .unwrap();

    assert!(status.is_canceled());
    assert!(!registry.get("p").unwrap().contains_installable_unit(&a));
}

#[test]
fn unknown_profile_is_an_error() {
    let mut registry = ProfileRegistry::new();
    let result = engine(ActionManager::new()).perform(
        &mut registry,
        "missing",
        &[],
        &mut PhaseSet::install_and_configure(),
        &mut PhaseParameters::default(),
        &mut ProgressMonitor::new(),
    );
    assert!(result.is_err());
}

#[test]
fn noop_operands_plan_no_actions() {
    let mut actions = ActionManager::new();
    actions.register_for_touchpoint("native", "configure", Arc::new(MarkUnit));
    let a = native_unit("org.example.a", 1);
    let noop = Operand::update(a.clone(), a);

    for kind in [
        UnitPhaseKind::Unconfigure,
        UnitPhaseKind::Uninstall,
        UnitPhaseKind::Install,
        UnitPhaseKind::Configure,
    ] {
        let phase = UnitPhase::new(kind, 10);
        assert!(planned_actions(&phase, &noop, &actions).unwrap().is_empty());
    }
}
