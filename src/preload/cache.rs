use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::ops::Range;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

use crate::foundation::error::{AnimstreamError, AnimstreamResult};
use crate::preload::loader::FrameLoader;

/// Options controlling a [`PreloadCache`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PreloadOpts {
    /// Maximum number of cached frames.
    pub capacity: usize,
    /// Default look-ahead used by [`PreloadCache::prefetch_from`].
    pub window: usize,
    /// Retry interval for the focused (displayed) frame while it is missing.
    #[serde(with = "duration_ms")]
    pub focus_retry: Duration,
    /// Retry interval for missing frames inside the requested window.
    #[serde(with = "duration_ms")]
    pub window_retry: Duration,
    /// Loader worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
}

impl Default for PreloadOpts {
    fn default() -> Self {
        Self {
            capacity: 20,
            window: 10,
            focus_retry: Duration::from_secs(2),
            window_retry: Duration::from_secs(1),
            threads: None,
        }
    }
}

impl PreloadOpts {
    pub fn validate(&self) -> AnimstreamResult<()> {
        if self.capacity == 0 {
            return Err(AnimstreamError::validation("preload capacity must be >= 1"));
        }
        if let Some(n) = self.threads
            && n == 0
        {
            return Err(AnimstreamError::validation(
                "preload 'threads' must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    pub(super) fn serialize<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = <u64 as serde::Deserialize>::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

/// Per-index state: `Unrequested -> Loading -> {Cached | Missing}`, `Missing -> Loading` on sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotState {
    Unrequested,
    Loading,
    Cached,
    Missing,
}

struct Inner<H> {
    entries: HashMap<usize, H>,
    /// Cached indices, oldest insertion first.
    order: VecDeque<usize>,
    pending: HashSet<usize>,
    /// Missing index -> time of the last load attempt.
    missing: BTreeMap<usize, Instant>,
    /// Bumped by `clear`; loads started under an older generation are discarded on arrival.
    generation: u64,
    focus: Option<usize>,
    window: Option<Range<usize>>,
    disposed: bool,
}

impl<H> Inner<H> {
    fn state(&self, index: usize) -> SlotState {
        if self.entries.contains_key(&index) {
            SlotState::Cached
        } else if self.pending.contains(&index) {
            SlotState::Loading
        } else if self.missing.contains_key(&index) {
            SlotState::Missing
        } else {
            SlotState::Unrequested
        }
    }

    /// Insert and evict past capacity; displaced handles are pushed to `released`.
    fn insert(&mut self, index: usize, handle: H, capacity: usize, released: &mut Vec<H>) {
        if let Some(old) = self.entries.insert(index, handle) {
            self.order.retain(|&i| i != index);
            released.push(old);
        }
        self.order.push_back(index);
        self.missing.remove(&index);

        while self.entries.len() > capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(h) = self.entries.remove(&oldest) {
                tracing::trace!(index = oldest, "preload evict");
                released.push(h);
            }
        }
    }

    fn drain(&mut self, released: &mut Vec<H>) {
        self.order.clear();
        released.extend(self.entries.drain().map(|(_, h)| h));
        self.pending.clear();
        self.missing.clear();
        self.focus = None;
        self.window = None;
    }
}

pub(crate) struct Shared<L: FrameLoader> {
    loader: L,
    opts: PreloadOpts,
    pool: rayon::ThreadPool,
    inner: Mutex<Inner<L::Handle>>,
    idle: Condvar,
}

impl<L: FrameLoader> Shared<L> {
    fn lock(&self) -> MutexGuard<'_, Inner<L::Handle>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release_all(&self, handles: Vec<L::Handle>) {
        for h in handles {
            self.loader.release(h);
        }
    }

    /// Mark `indices` pending under the lock, then hand them to the pool.
    fn schedule(self: &Arc<Self>, inner: &mut Inner<L::Handle>, indices: &[usize]) -> usize {
        if inner.disposed {
            return 0;
        }
        let generation = inner.generation;
        let mut started = 0;
        for &index in indices {
            if inner.entries.contains_key(&index) || !inner.pending.insert(index) {
                continue;
            }
            started += 1;
            let shared = Arc::clone(self);
            self.pool.spawn(move || {
                let result = shared.loader.load(index);
                shared.complete(index, generation, result);
            });
        }
        started
    }

    fn complete(&self, index: usize, generation: u64, result: AnimstreamResult<Option<L::Handle>>) {
        let mut released = Vec::new();
        {
            let mut inner = self.lock();
            let stale = inner.disposed || inner.generation != generation;
            if !stale {
                inner.pending.remove(&index);
            }
            match result {
                Ok(Some(handle)) if stale => released.push(handle),
                Ok(Some(handle)) => {
                    let capacity = self.opts.capacity;
                    inner.insert(index, handle, capacity, &mut released);
                }
                Ok(None) if !stale => {
                    inner.missing.insert(index, Instant::now());
                }
                Err(e) if !stale => {
                    tracing::debug!(index, error = %e, "preload load failed; will retry");
                    inner.missing.insert(index, Instant::now());
                }
                _ => {}
            }
            if inner.pending.is_empty() {
                self.idle.notify_all();
            }
        }
        self.release_all(released);
    }

    pub(crate) fn sweep(self: &Arc<Self>, now: Instant) -> usize {
        let mut inner = self.lock();
        if inner.disposed {
            return 0;
        }
        let due: Vec<usize> = inner
            .missing
            .iter()
            .filter(|&(&index, &last)| {
                let elapsed = now.saturating_duration_since(last);
                let focused = inner.focus == Some(index) && elapsed >= self.opts.focus_retry;
                let windowed = inner.window.as_ref().is_some_and(|w| w.contains(&index))
                    && elapsed >= self.opts.window_retry;
                focused || windowed
            })
            .map(|(&index, _)| index)
            .collect();
        for index in &due {
            inner.missing.remove(index);
        }
        let started = self.schedule(&mut inner, &due);
        if started > 0 {
            tracing::debug!(retried = started, "preload sweep");
        }
        started
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.lock().disposed
    }
}

/// Bounded in-memory frame cache with look-ahead prefetch.
///
/// Capacity is enforced on insertion order: inserting past capacity evicts the oldest inserted
/// entry. Loads run on a dedicated thread pool; at most one load per index is in flight.
pub struct PreloadCache<L: FrameLoader> {
    shared: Arc<Shared<L>>,
}

impl<L: FrameLoader> PreloadCache<L> {
    pub fn new(loader: L, opts: PreloadOpts) -> AnimstreamResult<Self> {
        opts.validate()?;
        let pool = build_thread_pool(opts.threads)?;
        Ok(Self {
            shared: Arc::new(Shared {
                loader,
                opts,
                pool,
                inner: Mutex::new(Inner {
                    entries: HashMap::new(),
                    order: VecDeque::new(),
                    pending: HashSet::new(),
                    missing: BTreeMap::new(),
                    generation: 0,
                    focus: None,
                    window: None,
                    disposed: false,
                }),
                idle: Condvar::new(),
            }),
        })
    }

    pub fn loader(&self) -> &L {
        &self.shared.loader
    }

    pub fn opts(&self) -> &PreloadOpts {
        &self.shared.opts
    }

    pub(crate) fn downgrade(&self) -> Weak<Shared<L>> {
        Arc::downgrade(&self.shared)
    }

    /// Cached image for `index`, or `None` on a miss.
    ///
    /// A miss makes `index` the focused frame and starts a load unless one is in flight.
    pub fn get(&self, index: usize) -> Option<L::Handle> {
        let mut inner = self.shared.lock();
        if let Some(h) = inner.entries.get(&index) {
            return Some(h.clone());
        }
        inner.focus = Some(index);
        if !inner.missing.contains_key(&index) {
            self.shared.schedule(&mut inner, &[index]);
        }
        None
    }

    /// Cached image without side effects.
    pub fn peek(&self, index: usize) -> Option<L::Handle> {
        self.shared.lock().entries.get(&index).cloned()
    }

    /// Prefetch `[start, start + count)`, skipping cached and in-flight indices.
    ///
    /// The range becomes the retry window for the sweep. Returns the number of loads started.
    pub fn request_window(&self, start: usize, count: usize) -> usize {
        let end = start.saturating_add(count);
        let mut inner = self.shared.lock();
        inner.window = Some(start..end);
        let wanted: Vec<usize> = (start..end)
            .filter(|i| !inner.missing.contains_key(i))
            .collect();
        self.shared.schedule(&mut inner, &wanted)
    }

    /// [`Self::request_window`] with the configured default window size.
    pub fn prefetch_from(&self, start: usize) -> usize {
        self.request_window(start, self.shared.opts.window)
    }

    /// Insert a handle directly, evicting past capacity.
    pub fn insert(&self, index: usize, handle: L::Handle) {
        let mut released = Vec::new();
        {
            let mut inner = self.shared.lock();
            if inner.disposed {
                released.push(handle);
            } else {
                let capacity = self.shared.opts.capacity;
                inner.insert(index, handle, capacity, &mut released);
            }
        }
        self.shared.release_all(released);
    }

    /// Retry due `Missing` entries. Returns the number of loads started.
    pub fn sweep(&self, now: Instant) -> usize {
        self.shared.sweep(now)
    }

    /// Drop every entry and forget pending/missing state. Loads already in flight are released
    /// when they arrive.
    pub fn clear(&self) {
        let mut released = Vec::new();
        {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            inner.drain(&mut released);
            self.shared.idle.notify_all();
        }
        if !released.is_empty() {
            tracing::debug!(released = released.len(), "preload cache cleared");
        }
        self.shared.release_all(released);
    }

    /// Release every entry and refuse further work. Idempotent.
    pub fn dispose(&self) {
        let mut released = Vec::new();
        {
            let mut inner = self.shared.lock();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.generation += 1;
            inner.drain(&mut released);
            self.shared.idle.notify_all();
        }
        self.shared.release_all(released);
    }

    /// Block until no load is in flight or `timeout` elapses. Returns `true` when idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.shared.lock();
        while !inner.pending.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            inner = self
                .shared
                .idle
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .0;
        }
        true
    }

    pub fn state(&self, index: usize) -> SlotState {
        self.shared.lock().state(index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.shared.lock().entries.contains_key(&index)
    }

    /// Cached indices, oldest insertion first.
    pub fn cached_indices(&self) -> Vec<usize> {
        self.shared.lock().order.iter().copied().collect()
    }

    pub fn missing_indices(&self) -> Vec<usize> {
        self.shared.lock().missing.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.opts.capacity
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }
}

impl<L: FrameLoader> Drop for PreloadCache<L> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn build_thread_pool(threads: Option<usize>) -> AnimstreamResult<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("animstream-preload-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| AnimstreamError::validation(format!("failed to build preload thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/preload/cache.rs"]
mod tests;
