#![allow(dead_code)]

use std::sync::Once;

use semver::Version;
use tracing_subscriber::{EnvFilter, fmt};

use provis_core::metadata::{ArtifactKey, InstallableUnit, TouchpointType};

static TRACING: Once = Once::new();

/// Route `tracing` output to the test harness. `RUST_LOG` overrides the filter.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("provis_core=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn native() -> TouchpointType {
    TouchpointType::new("native", Version::new(1, 0, 0))
}

pub fn unit(id: &str, version: &str) -> InstallableUnit {
    InstallableUnit::builder(id, Version::parse(version).unwrap()).build()
}

pub fn artifact(id: &str) -> ArtifactKey {
    ArtifactKey::new("binary", id, Version::new(1, 0, 0))
}

/// A native unit shipping the given artifacts.
pub fn unit_with_artifacts(id: &str, artifacts: &[ArtifactKey]) -> InstallableUnit {
    artifacts
        .iter()
        .cloned()
        .fold(
            InstallableUnit::builder(id, Version::new(1, 0, 0)).touchpoint(native()),
            |builder, key| builder.artifact(key),
        )
        .build()
}
