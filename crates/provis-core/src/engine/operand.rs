//! Before/after unit pairs driven through the phases.

use std::fmt;

use super::EngineError;
use crate::metadata::InstallableUnit;

/// One unit's transition within a transaction.
///
/// At least one side is present: `before` alone is an uninstall, `after`
/// alone an install, both an update (or a no-op when they are equal).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operand {
    before: Option<InstallableUnit>,
    after: Option<InstallableUnit>,
}

impl Operand {
    pub fn new(
        before: Option<InstallableUnit>,
        after: Option<InstallableUnit>,
    ) -> Result<Self, EngineError> {
        if before.is_none() && after.is_none() {
            return Err(EngineError::InvalidOperand);
        }
        Ok(Self { before, after })
    }

    pub fn install(unit: InstallableUnit) -> Self {
        Self {
            before: None,
            after: Some(unit),
        }
    }

    pub fn uninstall(unit: InstallableUnit) -> Self {
        Self {
            before: Some(unit),
            after: None,
        }
    }

    pub fn update(before: InstallableUnit, after: InstallableUnit) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn before(&self) -> Option<&InstallableUnit> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&InstallableUnit> {
        self.after.as_ref()
    }

    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn side(unit: Option<&InstallableUnit>) -> String {
            unit.map_or_else(|| "null".to_string(), ToString::to_string)
        }
        write!(f, "{} --> {}", side(self.before()), side(self.after()))
    }
}
