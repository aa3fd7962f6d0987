//! Concrete phases.

pub mod sizing;
pub mod touchpoint;

pub use sizing::Sizing;
pub use touchpoint::{UnitPhase, UnitPhaseKind};

/// Weight of each standard phase.
pub const DEFAULT_PHASE_WEIGHT: u32 = 10;
