//! The phase contract and the per-phase driver.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, trace};
use url::Url;

use super::EngineError;
use super::action::{ActionContext, ActionRegistry, ResolvedAction};
use super::instruction::parse_instructions;
use super::operand::Operand;
use super::progress::{CancellationToken, ProgressMonitor};
use super::status::Status;
use crate::config::ProvisConfig;
use crate::metadata::{ArtifactRequest, InstallableUnit};
use crate::profile::Profile;
use crate::properties::PropertyStore;

/// Caller-supplied scope of a transaction.
#[derive(Debug, Clone, Default)]
pub struct ProvisioningContext {
    /// Artifact repositories to consult; `None` means every known one.
    pub artifact_repositories: Option<Vec<Url>>,
    pub properties: PropertyStore,
}

impl ProvisioningContext {
    /// Scope a transaction the way `provis.toml` describes it.
    pub fn from_config(config: &ProvisConfig) -> Self {
        Self {
            artifact_repositories: config.sizing.repositories.clone(),
            properties: config.profile.properties.clone(),
        }
    }
}

/// Parameter bag shared by the phases of one run.
#[derive(Debug, Clone, Default)]
pub struct PhaseParameters {
    pub context: ProvisioningContext,
    /// Requests queued by collect actions for the sizing phase.
    pub artifact_requests: Vec<ArtifactRequest>,
    pub values: BTreeMap<String, String>,
}

impl PhaseParameters {
    pub fn new(context: ProvisioningContext) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }
}

/// One ordered stage of a transaction.
pub trait Phase: fmt::Debug {
    fn id(&self) -> &str;

    /// Share of the phase set's progress.
    fn weight(&self) -> u32;

    fn initialize(&mut self, _parameters: &mut PhaseParameters) -> Status {
        Status::Ok
    }

    /// Whether this phase does anything for `operand`. Skips no-ops by
    /// default.
    fn is_applicable(&self, operand: &Operand) -> bool {
        !operand.is_noop()
    }

    /// Actions to run for an applicable operand, resolved for the after-unit
    /// by default.
    fn actions(
        &self,
        operand: &Operand,
        registry: &dyn ActionRegistry,
    ) -> Result<Vec<ResolvedAction>, EngineError> {
        match operand.after() {
            Some(unit) => resolve_actions(unit, self.id(), registry),
            None => Ok(Vec::new()),
        }
    }

    /// Phase-wide aggregation after every operand has been processed.
    fn complete(&mut self, _parameters: &mut PhaseParameters, _cancel: &CancellationToken) -> Status {
        Status::Ok
    }

    fn as_any(&self) -> &dyn Any;
}

/// Resolve the actions `unit` needs for `phase_id`.
///
/// Instructions authored on the unit for the phase win. Otherwise the unit's
/// touchpoint may register an action for the whole phase. A unit with
/// neither contributes nothing.
pub fn resolve_actions(
    unit: &InstallableUnit,
    phase_id: &str,
    registry: &dyn ActionRegistry,
) -> Result<Vec<ResolvedAction>, EngineError> {
    if let Some(body) = unit.touchpoint_instruction(phase_id) {
        return parse_instructions(body)?
            .into_iter()
            .map(|call| {
                registry
                    .action(&call.name, unit.touchpoint_type())
                    .map(|action| ResolvedAction::new(action, call.arguments))
                    .ok_or_else(|| EngineError::UnknownAction {
                        name: call.name,
                        phase: phase_id.to_string(),
                    })
            })
            .collect();
    }

    let Some(touchpoint) = unit.touchpoint_type() else {
        return Ok(Vec::new());
    };
    Ok(registry
        .touchpoint_qualified_action(phase_id, touchpoint)
        .map(|action| ResolvedAction::new(action, BTreeMap::new()))
        .into_iter()
        .collect())
}

/// The actions `phase` would run for `operand`; empty when it does not apply.
pub fn planned_actions(
    phase: &dyn Phase,
    operand: &Operand,
    registry: &dyn ActionRegistry,
) -> Result<Vec<ResolvedAction>, EngineError> {
    if !phase.is_applicable(operand) {
        return Ok(Vec::new());
    }
    phase.actions(operand, registry)
}

/// Drive one phase across `operands`.
pub fn perform_phase(
    phase: &mut dyn Phase,
    operands: &[Operand],
    profile: &mut Profile,
    parameters: &mut PhaseParameters,
    registry: &dyn ActionRegistry,
    monitor: &mut ProgressMonitor,
) -> Status {
    let phase_id = phase.id().to_string();
    let weight = phase.weight();
    monitor.phase_started(&phase_id, weight);
    debug!(phase = %phase_id, operands = operands.len(), "phase started");

    let status = run_phase(phase, operands, profile, parameters, registry, monitor);

    monitor.phase_finished(&phase_id, status.is_ok());
    debug!(phase = %phase_id, status = %status, "phase finished");
    status
}

fn run_phase(
    phase: &mut dyn Phase,
    operands: &[Operand],
    profile: &mut Profile,
    parameters: &mut PhaseParameters,
    registry: &dyn ActionRegistry,
    monitor: &mut ProgressMonitor,
) -> Status {
    let phase_id = phase.id().to_string();
    let status = phase.initialize(parameters);
    if !status.is_ok() {
        return status;
    }

    // Half of the weight goes to the operands, half to completion.
    let share = f64::from(phase.weight()) / 2.0;
    let per_operand = if operands.is_empty() {
        0.0
    } else {
        share / operands.len() as f64
    };

    for operand in operands {
        if monitor.is_canceled() {
            debug!(phase = %phase_id, "canceled between operands");
            return Status::Canceled;
        }
        if !phase.is_applicable(operand) {
            trace!(phase = %phase_id, operand = %operand, "operand not applicable");
            monitor.worked(&phase_id, per_operand);
            continue;
        }

        let actions = match phase.actions(operand, registry) {
            Ok(actions) => actions,
            Err(err) => {
                return Status::error_with_cause(
                    &phase_id,
                    format!("could not resolve actions for {}", operand),
                    err,
                );
            }
        };
        if actions.is_empty() {
            trace!(phase = %phase_id, operand = %operand, "no actions for operand");
        }

        for resolved in &actions {
            let mut ctx = ActionContext {
                phase_id: &phase_id,
                operand,
                profile: &mut *profile,
                parameters: &mut *parameters,
                arguments: &resolved.arguments,
            };
            if let Err(err) = resolved.action.execute(&mut ctx) {
                return Status::error_with_cause(
                    &phase_id,
                    format!("action '{}' failed for {}", resolved.id(), operand),
                    err,
                );
            }
        }
        monitor.worked(&phase_id, per_operand);
    }

    if monitor.is_canceled() {
        return Status::Canceled;
    }
    let status = phase.complete(parameters, monitor.token());
    if status.is_ok() {
        let remaining = if operands.is_empty() { 2.0 * share } else { share };
        monitor.worked(&phase_id, remaining);
    }
    status
}
