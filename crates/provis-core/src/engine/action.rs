//! Provisioning actions and the registry that resolves them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use indexmap::IndexMap;
use tracing::trace;

use super::operand::Operand;
use super::phase::PhaseParameters;
use crate::metadata::{ArtifactRequest, TouchpointType};
use crate::profile::Profile;

/// Everything an action sees while it runs for one operand.
pub struct ActionContext<'a> {
    pub phase_id: &'a str,
    pub operand: &'a Operand,
    pub profile: &'a mut Profile,
    pub parameters: &'a mut PhaseParameters,
    pub arguments: &'a BTreeMap<String, String>,
}

/// One executable step applied for an operand within a phase.
pub trait ProvisioningAction: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    fn execute(&self, ctx: &mut ActionContext<'_>) -> anyhow::Result<()>;
}

/// An action paired with the arguments authored for it.
#[derive(Debug, Clone)]
pub struct ResolvedAction {
    pub action: Arc<dyn ProvisioningAction>,
    pub arguments: BTreeMap<String, String>,
}

impl ResolvedAction {
    pub fn new(action: Arc<dyn ProvisioningAction>, arguments: BTreeMap<String, String>) -> Self {
        Self { action, arguments }
    }

    pub fn id(&self) -> &str {
        self.action.id()
    }
}

/// Looks up actions by name.
pub trait ActionRegistry: fmt::Debug + Send + Sync {
    /// Resolve `name`. Unqualified names are tried as
    /// `<touchpoint>.<name>` first when a touchpoint type is given.
    fn action(
        &self,
        name: &str,
        touchpoint: Option<&TouchpointType>,
    ) -> Option<Arc<dyn ProvisioningAction>>;

    /// The action a touchpoint registers for a whole phase.
    fn touchpoint_qualified_action(
        &self,
        phase_id: &str,
        touchpoint: &TouchpointType,
    ) -> Option<Arc<dyn ProvisioningAction>> {
        self.action(&qualified_name(&touchpoint.id, phase_id), None)
    }
}

fn qualified_name(touchpoint_id: &str, name: &str) -> String {
    format!("{}.{}", touchpoint_id, name)
}

/// In-memory [`ActionRegistry`].
#[derive(Debug, Default)]
pub struct ActionManager {
    actions: IndexMap<String, Arc<dyn ProvisioningAction>>,
}

impl ActionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, action: Arc<dyn ProvisioningAction>) {
        self.actions.insert(name.into(), action);
    }

    /// Register `action` under `<touchpoint_id>.<name>`.
    pub fn register_for_touchpoint(
        &mut self,
        touchpoint_id: &str,
        name: &str,
        action: Arc<dyn ProvisioningAction>,
    ) {
        self.register(qualified_name(touchpoint_id, name), action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl ActionRegistry for ActionManager {
    fn action(
        &self,
        name: &str,
        touchpoint: Option<&TouchpointType>,
    ) -> Option<Arc<dyn ProvisioningAction>> {
        if !name.contains('.') {
            if let Some(touchpoint) = touchpoint {
                if let Some(action) = self.actions.get(&qualified_name(&touchpoint.id, name)) {
                    return Some(Arc::clone(action));
                }
            }
        }
        self.actions.get(name).cloned()
    }
}

/// Adds the operand's after-unit to the profile.
#[derive(Debug, Default)]
pub struct InstallUnitAction;

impl ProvisioningAction for InstallUnitAction {
    fn id(&self) -> &str {
        "installUnit"
    }

    fn execute(&self, ctx: &mut ActionContext<'_>) -> anyhow::Result<()> {
        let unit = ctx
            .operand
            .after()
            .with_context(|| format!("operand {} has no unit to install", ctx.operand))?;
        trace!(profile = ctx.profile.id(), unit = %unit, "installing unit");
        ctx.profile.add_installable_unit(unit);
        Ok(())
    }
}

/// Removes the operand's before-unit from the profile.
#[derive(Debug, Default)]
pub struct UninstallUnitAction;

impl ProvisioningAction for UninstallUnitAction {
    fn id(&self) -> &str {
        "uninstallUnit"
    }

    fn execute(&self, ctx: &mut ActionContext<'_>) -> anyhow::Result<()> {
        let unit = ctx
            .operand
            .before()
            .with_context(|| format!("operand {} has no unit to uninstall", ctx.operand))?;
        trace!(profile = ctx.profile.id(), unit = %unit, "uninstalling unit");
        ctx.profile.remove_installable_unit(unit);
        Ok(())
    }
}

/// Queues one artifact request per artifact of the after-unit.
///
/// Touchpoints register it for the sizing collect step, e.g. as
/// `native.collect`.
#[derive(Debug, Default)]
pub struct CollectArtifactsAction;

impl ProvisioningAction for CollectArtifactsAction {
    fn id(&self) -> &str {
        "collect"
    }

    fn execute(&self, ctx: &mut ActionContext<'_>) -> anyhow::Result<()> {
        let Some(unit) = ctx.operand.after() else {
            return Ok(());
        };
        ctx.parameters.artifact_requests.extend(
            unit.artifacts()
                .iter()
                .cloned()
                .map(ArtifactRequest::from),
        );
        Ok(())
    }
}
