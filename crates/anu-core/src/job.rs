use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ResourceLocator;

/// State of the prefetch job observed by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running { job_id: Uuid },
    Succeeded { job_id: Uuid },
    Failed { job_id: Uuid, reason: String },
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Running { .. } => "running",
            JobState::Succeeded { .. } => "succeeded",
            JobState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded { .. } | JobState::Failed { .. })
    }

    pub fn in_progress(&self) -> bool {
        matches!(self, JobState::Running { .. })
    }

    /// Outcome of the last finished run, if any.
    pub fn outcome(&self) -> Option<JobOutcome> {
        match self {
            JobState::Succeeded { .. } => Some(JobOutcome::Success),
            JobState::Failed { .. } => Some(JobOutcome::Error),
            JobState::Idle | JobState::Running { .. } => None,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Binary result shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Error,
}

impl JobOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            JobOutcome::Success => "Successfully downloaded to your device!",
            JobOutcome::Error => {
                "Could not download the course. Please contact site administrator."
            }
        }
    }
}

/// Observable handle for prefetch runs.
///
/// Transitions are published over a `watch` channel; observers call
/// [`PrefetchJob::subscribe`] and render the latest state. Only the last
/// terminal state is kept; the next [`start`](Self::start) overwrites it.
#[derive(Debug, Clone)]
pub struct PrefetchJob {
    tx: Arc<watch::Sender<JobState>>,
}

impl Default for PrefetchJob {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefetchJob {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(JobState::Idle);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> JobState {
        self.tx.borrow().clone()
    }

    pub fn in_progress(&self) -> bool {
        self.tx.borrow().in_progress()
    }

    pub fn outcome(&self) -> Option<JobOutcome> {
        self.tx.borrow().outcome()
    }

    /// Move to `Running` and return the id of the new run.
    ///
    /// Starting while another run is in progress is not prevented.
    pub fn start(&self) -> Uuid {
        let job_id = Uuid::new_v4();
        self.tx.send_modify(|state| {
            if let JobState::Running { job_id: previous } = state {
                tracing::warn!(%previous, %job_id, "Prefetch started while another run is in progress");
            }
            *state = JobState::Running { job_id };
        });
        job_id
    }

    /// Record the terminal state of a run.
    ///
    /// Only the run currently in `Running` may settle the state. A stale run
    /// finishing after a newer one started leaves the newer state untouched.
    /// Returns whether the state changed.
    pub fn finish<T>(&self, job_id: Uuid, result: &Result<T, AppError>) -> bool {
        self.tx.send_if_modified(|state| {
            match state {
                JobState::Running { job_id: current } if *current == job_id => {}
                other => {
                    tracing::warn!(%job_id, current = %other, "Ignoring finish of a superseded prefetch run");
                    return false;
                }
            }
            *state = match result {
                Ok(_) => JobState::Succeeded { job_id },
                Err(e) => JobState::Failed {
                    job_id,
                    reason: e.to_string(),
                },
            };
            true
        })
    }
}

/// Events emitted by the prefetch orchestrator for monitoring/logging.
#[derive(Debug, Clone)]
pub enum PrefetchEvent<'a> {
    Started {
        job_id: Uuid,
        course_path: &'a str,
        cache_name: &'a str,
    },
    BatchStarted {
        stage: Stage,
        size: usize,
    },
    ResourceStored {
        stage: Stage,
        locator: &'a ResourceLocator,
    },
    ImagesDiscovered {
        page: &'a ResourceLocator,
        count: usize,
    },
    BatchCompleted {
        stage: Stage,
        size: usize,
    },
    Succeeded {
        job_id: Uuid,
        stored: usize,
        elapsed: Duration,
    },
    Failed {
        job_id: Uuid,
        error: &'a AppError,
    },
}

/// Batches of the two-stage pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Home, listing, course and module pages and images.
    Structure,
    /// Lesson and assessment pages.
    Pages,
    /// Images discovered inside lesson and assessment pages.
    Images,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Structure => "structure",
            Stage::Pages => "pages",
            Stage::Images => "images",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for receiving prefetch events (decoupled logging).
pub trait PrefetchReporter: Send + Sync {
    fn report(&self, event: PrefetchEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPrefetchReporter;

impl PrefetchReporter for TracingPrefetchReporter {
    fn report(&self, event: PrefetchEvent<'_>) {
        match event {
            PrefetchEvent::Started {
                job_id,
                course_path,
                cache_name,
            } => {
                tracing::info!(%job_id, %course_path, %cache_name, "Prefetch started");
            }
            PrefetchEvent::BatchStarted { stage, size } => {
                tracing::info!(%stage, %size, "Fetching batch");
            }
            PrefetchEvent::ResourceStored { stage, locator } => {
                tracing::debug!(%stage, %locator, "Cached");
            }
            PrefetchEvent::ImagesDiscovered { page, count } => {
                tracing::debug!(%page, %count, "Discovered page images");
            }
            PrefetchEvent::BatchCompleted { stage, size } => {
                tracing::info!(%stage, %size, "Batch complete");
            }
            PrefetchEvent::Succeeded {
                job_id,
                stored,
                elapsed,
            } => {
                tracing::info!(%job_id, %stored, elapsed_ms = elapsed.as_millis() as u64, "Prefetch succeeded");
            }
            PrefetchEvent::Failed { job_id, error } => {
                tracing::error!(%job_id, kind = ?error.kind(), %error, "Could not download course content");
            }
        }
    }
}
