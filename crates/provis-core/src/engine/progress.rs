//! Cooperative cancellation and weighted progress reporting.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared cancellation flag.
///
/// Clones share the flag. A token built with [`combined_with`](Self::combined_with)
/// reads as canceled when its own flag or any source token is canceled.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    sources: Vec<CancellationToken>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.sources.iter().any(CancellationToken::is_canceled)
    }

    /// A new token canceled by itself, by `self` or by `other`.
    pub fn combined_with(&self, other: &CancellationToken) -> CancellationToken {
        CancellationToken {
            flag: Arc::new(AtomicBool::new(false)),
            sources: vec![self.clone(), other.clone()],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    PhaseStarted { phase: String, weight: u32 },
    /// `amount` is in weight units; `done` and `total` cover the whole set.
    Worked {
        phase: String,
        amount: f64,
        done: f64,
        total: f64,
    },
    PhaseFinished { phase: String, succeeded: bool },
}

pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Progress sink handed to a phase set run.
#[derive(Default)]
pub struct ProgressMonitor {
    token: CancellationToken,
    observers: Vec<Arc<dyn ProgressObserver>>,
    total: f64,
    done: f64,
}

impl ProgressMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.token.is_canceled()
    }

    pub fn add_observer(&mut self, observer: Arc<dyn ProgressObserver>) {
        self.observers.push(observer);
    }

    /// Reset the counters for a run of `total` weight units.
    pub fn begin(&mut self, total: u32) {
        self.total = f64::from(total);
        self.done = 0.0;
    }

    pub fn total_work(&self) -> f64 {
        self.total
    }

    pub fn work_done(&self) -> f64 {
        self.done
    }

    pub fn phase_started(&self, phase: &str, weight: u32) {
        self.emit(ProgressEvent::PhaseStarted {
            phase: phase.to_string(),
            weight,
        });
    }

    pub fn worked(&mut self, phase: &str, amount: f64) {
        self.done += amount;
        self.emit(ProgressEvent::Worked {
            phase: phase.to_string(),
            amount,
            done: self.done,
            total: self.total,
        });
    }

    pub fn phase_finished(&self, phase: &str, succeeded: bool) {
        self.emit(ProgressEvent::PhaseFinished {
            phase: phase.to_string(),
            succeeded,
        });
    }

    fn emit(&self, event: ProgressEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }
}

impl fmt::Debug for ProgressMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressMonitor")
            .field("canceled", &self.is_canceled())
            .field("observers", &self.observers.len())
            .field("done", &self.done)
            .field("total", &self.total)
            .finish()
    }
}
