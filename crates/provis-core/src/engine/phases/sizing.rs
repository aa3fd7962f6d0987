//! Artifact sizing.
//!
//! Collect actions queue an [`ArtifactRequest`](crate::metadata::ArtifactRequest)
//! per artifact; on completion each distinct artifact is looked up in the
//! candidate repositories and the first descriptor found contributes its disk
//! and download sizes to the running totals.

use std::any::Any;
use std::sync::Arc;

use indexmap::IndexSet;
use tracing::{debug, info};

use crate::engine::EngineError;
use crate::engine::action::{ActionRegistry, ResolvedAction};
use crate::engine::operand::Operand;
use crate::engine::phase::{Phase, PhaseParameters, resolve_actions};
use crate::engine::progress::CancellationToken;
use crate::engine::status::Status;
use crate::metadata::{ARTIFACT_SIZE, ArtifactDescriptor, ArtifactKey, DOWNLOAD_SIZE};
use crate::repository::ArtifactRepositoryManager;

#[derive(Debug)]
pub struct Sizing {
    weight: u32,
    disk_size: u64,
    download_size: u64,
    repositories: Arc<dyn ArtifactRepositoryManager>,
}

impl Sizing {
    pub const PHASE_ID: &'static str = "sizing";

    /// Sub-phase whose actions queue the artifact requests.
    pub const COLLECT: &'static str = "collect";

    pub fn new(weight: u32, repositories: Arc<dyn ArtifactRepositoryManager>) -> Self {
        Self {
            weight,
            disk_size: 0,
            download_size: 0,
            repositories,
        }
    }

    /// Total on-disk size of the sized artifacts, in bytes.
    pub fn disk_size(&self) -> u64 {
        self.disk_size
    }

    /// Total download size of the sized artifacts, in bytes.
    pub fn download_size(&self) -> u64 {
        self.download_size
    }
}

fn size_of(descriptor: &ArtifactDescriptor, property: &str) -> Result<u64, EngineError> {
    match descriptor.property(property) {
        None => Ok(0),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| EngineError::InvalidSize {
                key: descriptor.key().to_string(),
                property: property.to_string(),
                value: value.to_string(),
            }),
    }
}

fn add_size(total: u64, size: u64, key: &ArtifactKey, property: &str) -> Result<u64, EngineError> {
    total.checked_add(size).ok_or_else(|| EngineError::SizeOverflow {
        key: key.to_string(),
        property: property.to_string(),
    })
}

impl Phase for Sizing {
    fn id(&self) -> &str {
        Self::PHASE_ID
    }

    fn weight(&self) -> u32 {
        self.weight
    }

    /// Starts a fresh request list. The running totals carry over.
    fn initialize(&mut self, parameters: &mut PhaseParameters) -> Status {
        parameters.artifact_requests = Vec::new();
        Status::Ok
    }

    fn is_applicable(&self, operand: &Operand) -> bool {
        operand.after().is_some() && operand.after() != operand.before()
    }

    fn actions(
        &self,
        operand: &Operand,
        registry: &dyn ActionRegistry,
    ) -> Result<Vec<ResolvedAction>, EngineError> {
        match operand.after() {
            Some(unit) => resolve_actions(unit, Self::COLLECT, registry),
            None => Ok(Vec::new()),
        }
    }

    fn complete(&mut self, parameters: &mut PhaseParameters, cancel: &CancellationToken) -> Status {
        let keys: IndexSet<ArtifactKey> = parameters
            .artifact_requests
            .iter()
            .map(|request| request.artifact_key().clone())
            .collect();

        let locations = match &parameters.context.artifact_repositories {
            Some(scoped) => scoped.clone(),
            None => self.repositories.known_repositories(),
        };
        debug!(
            artifacts = keys.len(),
            repositories = locations.len(),
            "sizing artifacts"
        );

        for key in &keys {
            if cancel.is_canceled() {
                info!("sizing canceled");
                return Status::Canceled;
            }
            for location in &locations {
                let repository = match self.repositories.load(location) {
                    Ok(repository) => repository,
                    Err(err) if err.is_recoverable() => {
                        debug!(repository = %location, error = %err, "skipping repository");
                        continue;
                    }
                    Err(err) => {
                        return Status::error_with_cause(
                            Self::PHASE_ID,
                            format!("could not size artifact {}", key),
                            err,
                        );
                    }
                };
                if cancel.is_canceled() {
                    info!("sizing canceled");
                    return Status::Canceled;
                }

                let descriptors = repository.descriptors_for(key);
                let Some(descriptor) = descriptors.first() else {
                    continue;
                };
                let totals = size_of(descriptor, ARTIFACT_SIZE)
                    .and_then(|disk| add_size(self.disk_size, disk, key, ARTIFACT_SIZE))
                    .and_then(|disk| {
                        let download = size_of(descriptor, DOWNLOAD_SIZE)?;
                        let download = add_size(self.download_size, download, key, DOWNLOAD_SIZE)?;
                        Ok((disk, download))
                    });
                match totals {
                    Ok((disk, download)) => {
                        self.disk_size = disk;
                        self.download_size = download;
                    }
                    Err(err) => {
                        return Status::error_with_cause(
                            Self::PHASE_ID,
                            format!("could not size artifact {}", key),
                            err,
                        );
                    }
                }
                break;
            }
        }

        info!(
            disk_size = self.disk_size,
            download_size = self.download_size,
            "sizing complete"
        );
        Status::Ok
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
