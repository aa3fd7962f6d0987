//! Ordered phase sequences.

use std::sync::Arc;

use tracing::debug;

use super::action::ActionRegistry;
use super::operand::Operand;
use super::phase::{Phase, PhaseParameters, perform_phase};
use super::phases::{DEFAULT_PHASE_WEIGHT, Sizing, UnitPhase, UnitPhaseKind};
use super::progress::ProgressMonitor;
use super::status::Status;
use crate::config::ProvisConfig;
use crate::profile::Profile;
use crate::repository::ArtifactRepositoryManager;

/// A fixed sequence of phases run start to end for one transaction.
#[derive(Debug)]
pub struct PhaseSet {
    phases: Vec<Box<dyn Phase>>,
}

impl PhaseSet {
    pub fn new(phases: Vec<Box<dyn Phase>>) -> Self {
        Self { phases }
    }

    /// Unconfigure, uninstall, install, configure; weight 10 each.
    pub fn install_and_configure() -> Self {
        Self::new(
            [
                UnitPhaseKind::Unconfigure,
                UnitPhaseKind::Uninstall,
                UnitPhaseKind::Install,
                UnitPhaseKind::Configure,
            ]
            .into_iter()
            .map(|kind| Box::new(UnitPhase::new(kind, DEFAULT_PHASE_WEIGHT)) as Box<dyn Phase>)
            .collect(),
        )
    }

    /// Build the phase set a configuration describes.
    pub fn from_config(
        config: &ProvisConfig,
        repositories: Arc<dyn ArtifactRepositoryManager>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let mut phases: Vec<Box<dyn Phase>> = Vec::new();
        for entry in config.phase_entries() {
            if entry.id == Sizing::PHASE_ID {
                phases.push(Box::new(Sizing::new(entry.weight, Arc::clone(&repositories))));
                continue;
            }
            let kind = UnitPhaseKind::from_id(&entry.id)
                .ok_or_else(|| anyhow::anyhow!("Unknown phase '{}'", entry.id))?;
            phases.push(Box::new(UnitPhase::new(kind, entry.weight)));
        }
        Ok(Self::new(phases))
    }

    pub fn phases(&self) -> &[Box<dyn Phase>] {
        &self.phases
    }

    pub fn phase_ids(&self) -> Vec<&str> {
        self.phases.iter().map(|phase| phase.id()).collect()
    }

    pub fn total_weight(&self) -> u32 {
        self.phases.iter().map(|phase| phase.weight()).sum()
    }

    /// The first phase of concrete type `T`, e.g. to read sizing totals
    /// after a run.
    pub fn phase_as<T: Phase + 'static>(&self) -> Option<&T> {
        self.phases
            .iter()
            .find_map(|phase| phase.as_any().downcast_ref::<T>())
    }

    /// Run every phase in order over `operands`, stopping at the first phase
    /// that does not finish `Ok`.
    pub fn perform(
        &mut self,
        operands: &[Operand],
        profile: &mut Profile,
        parameters: &mut PhaseParameters,
        registry: &dyn ActionRegistry,
        monitor: &mut ProgressMonitor,
    ) -> Status {
        monitor.begin(self.total_weight());
        for phase in &mut self.phases {
            if monitor.is_canceled() {
                debug!(phase = phase.id(), "canceled before phase");
                return Status::Canceled;
            }
            let status = perform_phase(
                phase.as_mut(),
                operands,
                profile,
                parameters,
                registry,
                monitor,
            );
            if !status.is_ok() {
                return status;
            }
        }
        Status::Ok
    }
}
