//! Progress reporting for long-running simulation calls
//!
//! Every batch entry point takes a `&Progress` argument instead of toggling
//! any shared state, so nested calls (a cascade sweep running load
//! estimations, say) can be silenced independently of their caller.

use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One unit of work finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: &'static str,
    pub completed: usize,
    pub total: usize,
}

impl ProgressEvent {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Progress sink
#[derive(Clone, Default)]
pub enum Progress {
    #[default]
    Silent,
    /// Emit a `tracing` debug event per finished unit
    Log,
    Callback(Arc<dyn Fn(ProgressEvent) + Send + Sync>),
}

impl Progress {
    pub fn callback(f: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        Progress::Callback(Arc::new(f))
    }

    pub fn report(&self, stage: &'static str, completed: usize, total: usize) {
        match self {
            Progress::Silent => {}
            Progress::Log => {
                debug!(stage, completed, total, "progress");
            }
            Progress::Callback(f) => f(ProgressEvent {
                stage,
                completed,
                total,
            }),
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, Progress::Silent)
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::Silent => write!(f, "Progress::Silent"),
            Progress::Log => write!(f, "Progress::Log"),
            Progress::Callback(_) => write!(f, "Progress::Callback(..)"),
        }
    }
}
