use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::foundation::error::{AnimstreamError, AnimstreamResult};
use crate::preload::cache::PreloadCache;
use crate::preload::loader::FrameLoader;

/// Background timer that drives [`PreloadCache::sweep`].
///
/// Holds only a weak reference to the cache and exits on its own once the cache is dropped or
/// disposed. Dropping the sweeper stops it.
pub struct RetrySweeper {
    stop: Arc<(Mutex<bool>, Condvar)>,
    thread: Option<JoinHandle<()>>,
}

impl RetrySweeper {
    /// Tick every `interval`. Use a period no longer than the cache's shortest retry interval.
    pub fn spawn<L: FrameLoader>(
        cache: &PreloadCache<L>,
        interval: Duration,
    ) -> AnimstreamResult<Self> {
        if interval.is_zero() {
            return Err(AnimstreamError::validation(
                "sweep interval must be non-zero",
            ));
        }
        let weak = cache.downgrade();
        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let stop_thread = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("animstream-sweep".to_owned())
            .spawn(move || {
                let (flag, cv) = &*stop_thread;
                let mut stopped = flag.lock().unwrap_or_else(PoisonError::into_inner);
                loop {
                    stopped = cv
                        .wait_timeout(stopped, interval)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                    if *stopped {
                        break;
                    }
                    let Some(shared) = weak.upgrade() else {
                        break;
                    };
                    if shared.is_disposed() {
                        break;
                    }
                    shared.sweep(Instant::now());
                }
                tracing::trace!("retry sweeper exiting");
            })
            .map_err(|e| AnimstreamError::job_failed(format!("spawn sweep thread: {e}")))?;

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    pub fn stop(&mut self) {
        {
            let (flag, cv) = &*self.stop;
            *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
            cv.notify_all();
        }
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("retry sweeper panicked");
        }
    }
}

impl Drop for RetrySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/preload/sweep.rs"]
mod tests;
