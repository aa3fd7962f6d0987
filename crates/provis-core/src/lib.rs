//! Provis Core Library
//!
//! Tracks the installed state of a product in profiles and computes, phase by
//! phase, the work needed to move a profile to a new set of units. Units are
//! selected with the expression engine; artifact sizes come from an abstract
//! repository capability.

pub mod config;
pub mod engine;
pub mod expression;
pub mod metadata;
pub mod profile;
pub mod properties;
pub mod query;
pub mod repository;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, PhaseEntry, ProvisConfig};
    pub use crate::types::ConfigScope;

    // Metadata
    pub use crate::metadata::{
        ArtifactDescriptor, ArtifactKey, ArtifactRequest, InstallableUnit, TouchpointType,
    };
    pub use crate::properties::PropertyStore;

    // Profiles and queries
    pub use crate::profile::{Profile, ProfileError, ProfileRegistry};
    pub use crate::query::{Query, QueryResult};

    // Expressions
    pub use crate::expression::{
        EvaluationContext, Expression, ExpressionError, ExpressionFactory, LdapFilter, Value,
    };

    // Engine
    pub use crate::engine::{
        ActionManager, CancellationToken, Engine, EngineError, Operand, Phase, PhaseParameters,
        PhaseSet, ProgressMonitor, ProvisioningContext, Sizing, Status,
    };

    // Repositories
    pub use crate::repository::{
        ArtifactRepository, ArtifactRepositoryManager, MemoryArtifactRepository,
        MemoryRepositoryManager, RepositoryError,
    };
}
