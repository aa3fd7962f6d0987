//! The standard install/configure phases.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::engine::EngineError;
use crate::engine::action::{
    ActionRegistry, InstallUnitAction, ResolvedAction, UninstallUnitAction,
};
use crate::engine::operand::Operand;
use crate::engine::phase::{Phase, resolve_actions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitPhaseKind {
    Unconfigure,
    Uninstall,
    Install,
    Configure,
}

impl UnitPhaseKind {
    pub fn id(self) -> &'static str {
        match self {
            UnitPhaseKind::Unconfigure => "unconfigure",
            UnitPhaseKind::Uninstall => "uninstall",
            UnitPhaseKind::Install => "install",
            UnitPhaseKind::Configure => "configure",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "unconfigure" => Some(UnitPhaseKind::Unconfigure),
            "uninstall" => Some(UnitPhaseKind::Uninstall),
            "install" => Some(UnitPhaseKind::Install),
            "configure" => Some(UnitPhaseKind::Configure),
            _ => None,
        }
    }

    /// Whether the phase acts on the unit being removed.
    fn acts_on_before(self) -> bool {
        matches!(self, UnitPhaseKind::Unconfigure | UnitPhaseKind::Uninstall)
    }
}

impl fmt::Display for UnitPhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A phase running touchpoint actions for one side of each operand.
///
/// Unconfigure and uninstall act on the before-unit, install and configure on
/// the after-unit. Install and uninstall also update the profile's unit set.
#[derive(Debug, Clone)]
pub struct UnitPhase {
    kind: UnitPhaseKind,
    weight: u32,
}

impl UnitPhase {
    pub fn new(kind: UnitPhaseKind, weight: u32) -> Self {
        Self { kind, weight }
    }

    pub fn kind(&self) -> UnitPhaseKind {
        self.kind
    }
}

impl Phase for UnitPhase {
    fn id(&self) -> &str {
        self.kind.id()
    }

    fn weight(&self) -> u32 {
        self.weight
    }

    fn is_applicable(&self, operand: &Operand) -> bool {
        let side = if self.kind.acts_on_before() {
            operand.before()
        } else {
            operand.after()
        };
        side.is_some() && !operand.is_noop()
    }

    fn actions(
        &self,
        operand: &Operand,
        registry: &dyn ActionRegistry,
    ) -> Result<Vec<ResolvedAction>, EngineError> {
        let unit = if self.kind.acts_on_before() {
            operand.before()
        } else {
            operand.after()
        };
        let Some(unit) = unit else {
            return Ok(Vec::new());
        };

        let mut actions = resolve_actions(unit, self.id(), registry)?;
        match self.kind {
            UnitPhaseKind::Install => actions.push(ResolvedAction::new(
                Arc::new(InstallUnitAction),
                BTreeMap::new(),
            )),
            UnitPhaseKind::Uninstall => actions.push(ResolvedAction::new(
                Arc::new(UninstallUnitAction),
                BTreeMap::new(),
            )),
            UnitPhaseKind::Unconfigure | UnitPhaseKind::Configure => {}
        }
        Ok(actions)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
