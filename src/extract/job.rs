use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::extract::progress::{ProgressEvent, ProgressSink};
use crate::foundation::core::{ArtifactKind, Progress};

/// Lifecycle of an extraction job.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Paused,
    Cancelled,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal states never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Cancelled | JobStatus::Completed | JobStatus::Failed
        )
    }
}

#[derive(Debug)]
struct JobState {
    status: JobStatus,
    progress: [Progress; 2],
    auto_paused: bool,
    error: Option<String>,
}

/// What the worker should do at a batch boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Checkpoint {
    Continue,
    Stop,
}

struct JobShared {
    epoch: u64,
    source: PathBuf,
    work_dir: PathBuf,
    active_epoch: Arc<AtomicU64>,
    sink: Arc<dyn ProgressSink>,
    state: Mutex<JobState>,
    changed: Condvar,
}

/// Shared handle to one extraction job.
///
/// Clones refer to the same job. Pause, resume and cancel are cooperative: the worker observes
/// them at its next batch boundary.
#[derive(Clone)]
pub struct JobHandle {
    shared: Arc<JobShared>,
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("epoch", &self.shared.epoch)
            .field("source", &self.shared.source)
            .field("status", &self.status())
            .finish()
    }
}

impl JobHandle {
    pub(crate) fn new(
        epoch: u64,
        source: PathBuf,
        work_dir: PathBuf,
        active_epoch: Arc<AtomicU64>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            shared: Arc::new(JobShared {
                epoch,
                source,
                work_dir,
                active_epoch,
                sink,
                state: Mutex::new(JobState {
                    status: JobStatus::Running,
                    progress: [Progress::default(); 2],
                    auto_paused: false,
                    error: None,
                }),
                changed: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn epoch(&self) -> u64 {
        self.shared.epoch
    }

    pub fn source(&self) -> &Path {
        &self.shared.source
    }

    pub fn work_dir(&self) -> &Path {
        &self.shared.work_dir
    }

    pub fn status(&self) -> JobStatus {
        self.lock().status
    }

    pub fn progress(&self, kind: ArtifactKind) -> Progress {
        self.lock().progress[kind.slot()]
    }

    /// `true` once the one-shot backpressure pause has fired for this job.
    pub fn auto_paused(&self) -> bool {
        self.lock().auto_paused
    }

    /// Failure message for a `Failed` job.
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// `false` once another job has been started by the same coordinator.
    pub fn is_current(&self) -> bool {
        self.shared.active_epoch.load(Ordering::SeqCst) == self.shared.epoch
    }

    pub fn pause(&self) -> bool {
        self.transition(JobStatus::Running, JobStatus::Paused)
    }

    pub fn resume(&self) -> bool {
        self.transition(JobStatus::Paused, JobStatus::Running)
    }

    /// Request cancellation. Returns `false` if the job had already finished.
    pub fn cancel(&self) -> bool {
        let mut st = self.lock();
        if st.status.is_terminal() {
            return false;
        }
        st.status = JobStatus::Cancelled;
        drop(st);
        self.shared.changed.notify_all();
        tracing::debug!(epoch = self.shared.epoch, "extraction job cancel requested");
        self.emit_status(JobStatus::Cancelled, false);
        true
    }

    fn transition(&self, from: JobStatus, to: JobStatus) -> bool {
        let mut st = self.lock();
        if st.status != from {
            return false;
        }
        st.status = to;
        drop(st);
        self.shared.changed.notify_all();
        tracing::debug!(epoch = self.shared.epoch, ?from, ?to, "extraction job status");
        self.emit_status(to, false);
        true
    }

    /// Block until the job reaches a terminal state.
    pub fn wait(&self) -> JobStatus {
        let mut st = self.lock();
        while !st.status.is_terminal() {
            st = self
                .shared
                .changed
                .wait(st)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        st.status
    }

    /// Block until `pred(status)` holds or `timeout` elapses; returns the last observed status.
    pub fn wait_for(&self, timeout: Duration, pred: impl Fn(JobStatus) -> bool) -> JobStatus {
        let deadline = Instant::now() + timeout;
        let mut st = self.lock();
        loop {
            if pred(st.status) {
                return st.status;
            }
            let now = Instant::now();
            if now >= deadline {
                return st.status;
            }
            st = self
                .shared
                .changed
                .wait_timeout(st, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .0;
        }
    }

    /// Worker side: block while paused, stop if cancelled or superseded.
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        let mut st = self.lock();
        loop {
            if !self.is_current() {
                tracing::debug!(epoch = self.shared.epoch, "stale extraction job stopping");
                return Checkpoint::Stop;
            }
            match st.status {
                JobStatus::Running => return Checkpoint::Continue,
                JobStatus::Paused => {
                    // Timed wait so a superseded epoch is noticed even without a notify.
                    st = self
                        .shared
                        .changed
                        .wait_timeout(st, Duration::from_millis(250))
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .0;
                }
                _ => return Checkpoint::Stop,
            }
        }
    }

    /// Worker side: publish progress for one kind.
    pub(crate) fn record_progress(&self, kind: ArtifactKind, current: usize, total: usize) {
        let mut st = self.lock();
        let slot = &mut st.progress[kind.slot()];
        slot.total = total;
        slot.current = slot.current.max(current.min(total));
        let progress = *slot;
        drop(st);

        self.shared.sink.emit(ProgressEvent::Progress {
            epoch: self.shared.epoch,
            kind,
            progress,
        });
    }

    /// Worker side: pause once a large source has had `threshold` frames produced by this job.
    ///
    /// Frames found already on disk do not count, so a rerun always makes headway. Fires at most
    /// once per job and returns `true` on the call that fired.
    pub(crate) fn auto_pause(&self, produced: usize, total: usize, threshold: usize) -> bool {
        let mut st = self.lock();
        if st.auto_paused
            || total <= threshold
            || produced < threshold
            || st.status != JobStatus::Running
        {
            return false;
        }
        st.auto_paused = true;
        st.status = JobStatus::Paused;
        drop(st);

        self.shared.changed.notify_all();
        tracing::info!(
            epoch = self.shared.epoch,
            produced,
            total,
            "extraction auto-paused; resume required"
        );
        self.emit_status(JobStatus::Paused, true);
        true
    }

    /// Worker side: move to a terminal state unless one was already reached.
    pub(crate) fn finish(&self, status: JobStatus, error: Option<String>) {
        let mut st = self.lock();
        if st.status.is_terminal() {
            return;
        }
        st.status = status;
        st.error = error;
        drop(st);
        self.shared.changed.notify_all();
        self.emit_status(status, false);
    }

    fn emit_status(&self, status: JobStatus, auto: bool) {
        self.shared.sink.emit(ProgressEvent::Status {
            epoch: self.shared.epoch,
            status,
            auto,
        });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/extract/job.rs"]
mod tests;
