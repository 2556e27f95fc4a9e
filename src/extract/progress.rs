use std::sync::mpsc;

use crate::extract::job::JobStatus;
use crate::foundation::core::{ArtifactKind, Progress};

/// Event published by an extraction job. `epoch` identifies the job that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Per-kind progress after a batch boundary; `current` never decreases within one job.
    Progress {
        epoch: u64,
        kind: ArtifactKind,
        progress: Progress,
    },
    /// Status transition, including the one-shot auto-pause.
    Status {
        epoch: u64,
        status: JobStatus,
        auto: bool,
    },
}

impl ProgressEvent {
    pub fn epoch(&self) -> u64 {
        match self {
            ProgressEvent::Progress { epoch, .. } | ProgressEvent::Status { epoch, .. } => *epoch,
        }
    }
}

/// Receiver side of the progress channel.
///
/// Called from job worker threads and from whichever thread pauses/resumes/cancels a job, so
/// implementations must not block for long.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

impl ProgressSink for mpsc::Sender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.send(event);
    }
}
