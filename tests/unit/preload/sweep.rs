use super::*;
use crate::foundation::error::AnimstreamResult;
use crate::preload::cache::PreloadOpts;
use std::collections::BTreeSet;

struct LateLoader {
    ready: Mutex<BTreeSet<usize>>,
}

impl FrameLoader for LateLoader {
    type Handle = usize;

    fn load(&self, index: usize) -> AnimstreamResult<Option<usize>> {
        Ok(self
            .ready
            .lock()
            .unwrap()
            .contains(&index)
            .then_some(index))
    }

    fn release(&self, _handle: usize) {}
}

#[test]
fn sweeper_recovers_late_frames() {
    let opts = PreloadOpts {
        focus_retry: Duration::from_millis(20),
        window_retry: Duration::from_millis(10),
        threads: Some(1),
        ..PreloadOpts::default()
    };
    let cache = PreloadCache::new(
        LateLoader {
            ready: Mutex::new(BTreeSet::new()),
        },
        opts,
    )
    .unwrap();
    let mut sweeper = RetrySweeper::spawn(&cache, Duration::from_millis(5)).unwrap();

    cache.request_window(0, 3);
    assert!(cache.get(2).is_none());
    assert!(cache.wait_idle(Duration::from_secs(5)));
    cache.loader().ready.lock().unwrap().extend(0..3);

    let deadline = Instant::now() + Duration::from_secs(10);
    while cache.len() < 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(cache.len(), 3);
    sweeper.stop();
}

#[test]
fn zero_interval_rejected() {
    let cache = PreloadCache::new(
        LateLoader {
            ready: Mutex::new(BTreeSet::new()),
        },
        PreloadOpts::default(),
    )
    .unwrap();
    assert!(RetrySweeper::spawn(&cache, Duration::ZERO).is_err());
}

#[test]
fn sweeper_exits_when_cache_is_dropped() {
    let cache = PreloadCache::new(
        LateLoader {
            ready: Mutex::new(BTreeSet::new()),
        },
        PreloadOpts::default(),
    )
    .unwrap();
    let mut sweeper = RetrySweeper::spawn(&cache, Duration::from_millis(5)).unwrap();
    drop(cache);
    std::thread::sleep(Duration::from_millis(30));
    assert!(sweeper.thread.as_ref().is_some_and(|t| t.is_finished()));
    sweeper.stop();
}
