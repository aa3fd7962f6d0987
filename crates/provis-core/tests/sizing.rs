mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use provis_core::engine::{
    ActionManager, CancellationToken, CollectArtifactsAction, EngineError, Operand, Phase,
    PhaseParameters, PhaseSet, ProgressMonitor, Sizing, Status,
};
use provis_core::metadata::{ArtifactDescriptor, ArtifactRequest};
use provis_core::profile::Profile;
use provis_core::properties::PropertyStore;
use provis_core::repository::{
    ArtifactRepository, ArtifactRepositoryManager, MemoryArtifactRepository,
    MemoryRepositoryManager, RepositoryError,
};
use url::Url;

use support::{artifact, init_tracing, unit_with_artifacts};

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

/// R1 holds K1 (1000/400), R2 holds K2 (2000/800), registered R1 first.
fn two_repositories() -> MemoryRepositoryManager {
    let mut manager = MemoryRepositoryManager::new();
    manager.register(
        MemoryArtifactRepository::new(url("memory:/r1"))
            .with_descriptor(ArtifactDescriptor::new(artifact("k1")).with_sizes(1000, 400)),
    );
    manager.register(
        MemoryArtifactRepository::new(url("memory:/r2"))
            .with_descriptor(ArtifactDescriptor::new(artifact("k2")).with_sizes(2000, 800)),
    );
    manager
}

fn sized(
    manager: MemoryRepositoryManager,
    requests: &[&str],
    params: &mut PhaseParameters,
) -> (Sizing, Status) {
    let mut sizing = Sizing::new(10, Arc::new(manager));
    assert!(sizing.initialize(params).is_ok());
    params
        .artifact_requests
        .extend(requests.iter().map(|id| ArtifactRequest::new(artifact(id))));
    let status = sizing.complete(params, &CancellationToken::new());
    (sizing, status)
}

#[test]
fn totals_come_from_the_first_repository_with_a_descriptor() {
    init_tracing();
    let mut params = PhaseParameters::default();
    let (sizing, status) = sized(two_repositories(), &["k1", "k2"], &mut params);

    assert!(status.is_ok(), "{}", status);
    assert_eq!(sizing.disk_size(), 3000);
    assert_eq!(sizing.download_size(), 1200);
}

#[test]
fn duplicate_requests_are_sized_once() {
    let mut params = PhaseParameters::default();
    let (sizing, _) = sized(two_repositories(), &["k1", "k1", "k1"], &mut params);
    assert_eq!(sizing.disk_size(), 1000);
    assert_eq!(sizing.download_size(), 400);
}

#[test]
fn first_repository_wins_for_shared_artifacts() {
    let mut manager = two_repositories();
    manager.register(
        MemoryArtifactRepository::new(url("memory:/r3"))
            .with_descriptor(ArtifactDescriptor::new(artifact("k1")).with_sizes(9, 9)),
    );
    let mut params = PhaseParameters::default();
    let (sizing, _) = sized(manager, &["k1"], &mut params);
    assert_eq!(sizing.disk_size(), 1000);
}

#[test]
fn cancellation_before_any_request_leaves_zero_totals() {
    init_tracing();
    let mut sizing = Sizing::new(10, Arc::new(two_repositories()));
    let mut params = PhaseParameters::default();
    assert!(sizing.initialize(&mut params).is_ok());
    params.artifact_requests.push(ArtifactRequest::new(artifact("k1")));

    let token = CancellationToken::new();
    token.cancel();
    let status = sizing.complete(&mut params, &token);

    assert!(status.is_canceled());
    assert_eq!(sizing.disk_size(), 0);
    assert_eq!(sizing.download_size(), 0);
}

/// Cancels `token` when the `cancel_on`-th repository load happens.
#[derive(Debug)]
struct CancelOnLoad {
    inner: MemoryRepositoryManager,
    token: CancellationToken,
    cancel_on: usize,
    loads: AtomicUsize,
}

impl ArtifactRepositoryManager for CancelOnLoad {
    fn known_repositories(&self) -> Vec<Url> {
        self.inner.known_repositories()
    }

    fn load(&self, location: &Url) -> Result<Arc<dyn ArtifactRepository>, RepositoryError> {
        if self.loads.fetch_add(1, Ordering::SeqCst) + 1 == self.cancel_on {
            self.token.cancel();
        }
        self.inner.load(location)
    }
}

#[test]
fn cancellation_mid_run_keeps_partial_totals() {
    init_tracing();
    let token = CancellationToken::new();
    let manager = CancelOnLoad {
        inner: two_repositories(),
        token: token.clone(),
        cancel_on: 2,
        loads: AtomicUsize::new(0),
    };
    let mut sizing = Sizing::new(10, Arc::new(manager));
    let mut params = PhaseParameters::default();
    assert!(sizing.initialize(&mut params).is_ok());
    params.artifact_requests.push(ArtifactRequest::new(artifact("k1")));
    params.artifact_requests.push(ArtifactRequest::new(artifact("k2")));

    let status = sizing.complete(&mut params, &token);

    assert!(status.is_canceled(), "{}", status);
    // k1 was sized from R1 before the second load canceled the run.
    assert_eq!(sizing.disk_size(), 1000);
    assert_eq!(sizing.download_size(), 400);
}

#[test]
fn size_overflow_is_an_error() {
    init_tracing();
    let mut manager = MemoryRepositoryManager::new();
    manager.register(
        MemoryArtifactRepository::new(url("memory:/r1"))
            .with_descriptor(
                ArtifactDescriptor::new(artifact("k1"))
                    .with_property("artifact.size", u64::MAX.to_string()),
            )
            .with_descriptor(
                ArtifactDescriptor::new(artifact("k2")).with_property("artifact.size", "1"),
            ),
    );
    let mut params = PhaseParameters::default();
    let (sizing, status) = sized(manager, &["k1", "k2"], &mut params);

    assert!(status.is_error(), "{}", status);
    let cause = status.cause().unwrap();
    assert!(matches!(
        cause.downcast_ref::<EngineError>(),
        Some(EngineError::SizeOverflow { .. })
    ));
    assert_eq!(sizing.disk_size(), u64::MAX);
}

#[test]
fn unavailable_repositories_are_skipped() {
    init_tracing();
    let mut manager = two_repositories();
    manager.register(
        MemoryArtifactRepository::new(url("memory:/mirror"))
            .with_descriptor(ArtifactDescriptor::new(artifact("k2")).with_sizes(5, 5)),
    );
    manager.mark_unavailable(&url("memory:/r2"), "connection refused");

    let mut params = PhaseParameters::default();
    let (sizing, status) = sized(manager, &["k1", "k2"], &mut params);
    assert!(status.is_ok());
    assert_eq!(sizing.disk_size(), 1005);
    assert_eq!(sizing.download_size(), 405);
}

#[test]
fn fatal_repository_failure_is_an_error() {
    let mut manager = two_repositories();
    manager.mark_broken(&url("memory:/r1"), "corrupt index");

    let mut params = PhaseParameters::default();
    let (_, status) = sized(manager, &["k1"], &mut params);
    assert!(status.is_error());
}

#[test]
fn unmatched_requests_and_missing_sizes_count_as_zero() {
    let mut manager = MemoryRepositoryManager::new();
    manager.register(
        MemoryArtifactRepository::new(url("memory:/r1"))
            .with_descriptor(ArtifactDescriptor::new(artifact("bare"))),
    );
    let mut params = PhaseParameters::default();
    let (sizing, status) = sized(manager, &["bare", "nowhere"], &mut params);
    assert!(status.is_ok());
    assert_eq!(sizing.disk_size(), 0);
    assert_eq!(sizing.download_size(), 0);
}

#[test]
fn malformed_size_is_an_error() {
    let mut manager = MemoryRepositoryManager::new();
    manager.register(
        MemoryArtifactRepository::new(url("memory:/r1")).with_descriptor(
            ArtifactDescriptor::new(artifact("k1")).with_property("artifact.size", "lots"),
        ),
    );
    let mut params = PhaseParameters::default();
    let (_, status) = sized(manager, &["k1"], &mut params);
    assert!(status.is_error());
}

#[test]
fn scoped_repositories_replace_the_known_list() {
    let mut params = PhaseParameters::default();
    params.context.artifact_repositories = Some(vec![url("memory:/r2")]);
    let (sizing, _) = sized(two_repositories(), &["k1", "k2"], &mut params);
    assert_eq!(sizing.disk_size(), 2000);
    assert_eq!(sizing.download_size(), 800);
}

#[test]
fn sizing_through_the_pipeline_uses_collect_actions() {
    init_tracing();
    let mut actions = ActionManager::new();
    actions.register_for_touchpoint("native", Sizing::COLLECT, Arc::new(CollectArtifactsAction));

    let a = unit_with_artifacts("org.example.a", &[artifact("k1")]);
    let b = unit_with_artifacts("org.example.b", &[artifact("k2"), artifact("k1")]);
    let operands = vec![
        Operand::install(a.clone()),
        Operand::install(b),
        Operand::update(a.clone(), a),
    ];

    let mut set = PhaseSet::new(vec![Box::new(Sizing::new(10, Arc::new(two_repositories())))]);
    let mut profile = Profile::new("p", PropertyStore::new()).unwrap();
    let mut params = PhaseParameters::default();
    let mut monitor = ProgressMonitor::new();

    let status = set.perform(&operands, &mut profile, &mut params, &actions, &mut monitor);
    assert!(status.is_ok(), "{}", status);

    let sizing = set.phase_as::<Sizing>().unwrap();
    assert_eq!(sizing.disk_size(), 3000);
    assert_eq!(sizing.download_size(), 1200);
    assert_eq!(params.artifact_requests.len(), 3);
    assert!((monitor.work_done() - monitor.total_work()).abs() < 1e-9);
}
