//! The phased provisioning pipeline.
//!
//! An [`Engine`] owns one transaction: it snapshots the target profile, drives
//! a [`PhaseSet`] across the operands and rolls the profile back from the
//! snapshot when the run does not finish cleanly.

pub mod action;
pub mod instruction;
pub mod operand;
pub mod phase;
pub mod phase_set;
pub mod phases;
pub mod progress;
pub mod status;

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};

pub use action::{
    ActionContext, ActionManager, ActionRegistry, CollectArtifactsAction, InstallUnitAction,
    ProvisioningAction, ResolvedAction, UninstallUnitAction,
};
pub use instruction::{ActionCall, parse_instructions};
pub use operand::Operand;
pub use phase::{
    Phase, PhaseParameters, ProvisioningContext, perform_phase, planned_actions, resolve_actions,
};
pub use phase_set::PhaseSet;
pub use phases::{Sizing, UnitPhase, UnitPhaseKind};
pub use progress::{CancellationToken, ProgressEvent, ProgressMonitor, ProgressObserver};
pub use status::Status;

use crate::profile::ProfileRegistry;

/// Errors raised while planning a phase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("operand has neither a before nor an after unit")]
    InvalidOperand,

    #[error("invalid touchpoint instruction '{instruction}': {reason}")]
    InvalidInstruction { instruction: String, reason: String },

    #[error("no action '{name}' is registered for phase '{phase}'")]
    UnknownAction { name: String, phase: String },

    #[error("artifact {key} has an invalid {property} '{value}'")]
    InvalidSize {
        key: String,
        property: String,
        value: String,
    },

    #[error("adding the {property} of artifact {key} overflows the sizing total")]
    SizeOverflow { key: String, property: String },
}

/// Runs phase sets against profiles held in a [`ProfileRegistry`].
#[derive(Debug, Clone)]
pub struct Engine {
    actions: Arc<dyn ActionRegistry>,
}

impl Engine {
    pub fn new(actions: Arc<dyn ActionRegistry>) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &dyn ActionRegistry {
        self.actions.as_ref()
    }

    /// Run `phase_set` over `operands` against profile `profile_id`.
    ///
    /// On success orphaned per-unit properties are purged and the profile is
    /// timestamped. On cancellation or error the profile is restored from the
    /// snapshot taken before the run. `Err` is reserved for failures of the
    /// transaction itself, such as an unknown profile.
    pub fn perform(
        &self,
        registry: &mut ProfileRegistry,
        profile_id: &str,
        operands: &[Operand],
        phase_set: &mut PhaseSet,
        parameters: &mut PhaseParameters,
        monitor: &mut ProgressMonitor,
    ) -> anyhow::Result<Status> {
        let snapshot = registry
            .snapshot(profile_id)
            .with_context(|| format!("Failed to snapshot profile '{}'", profile_id))?;
        let profile = registry
            .get_mut(profile_id)
            .with_context(|| format!("Profile '{}' disappeared after snapshot", profile_id))?;

        info!(
            profile = profile_id,
            operands = operands.len(),
            phases = ?phase_set.phase_ids(),
            "provisioning started"
        );
        let status = phase_set.perform(
            operands,
            profile,
            parameters,
            self.actions.as_ref(),
            monitor,
        );

        if status.is_ok() {
            let purged = profile.clear_orphaned_installable_unit_properties();
            profile.set_timestamp(Utc::now());
            info!(profile = profile_id, purged, "provisioning complete");
        } else {
            warn!(profile = profile_id, status = %status, "provisioning did not complete, rolling back");
            registry
                .restore(&snapshot, profile_id)
                .with_context(|| format!("Failed to roll back profile '{}'", profile_id))?;
        }
        Ok(status)
    }
}
