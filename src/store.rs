//! Core store type, handle, and builder.

use crate::backend::MapBackend;
use crate::codec::{BincodeCodec, Codec};
use crate::error::{Error, Result};
use crate::persist;
use crate::worker::{SaveWorker, MIN_INTERVAL};
use crate::DefaultBackend;
use parking_lot::Mutex;
use std::hash::Hash;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

type SaveErrorHook = Arc<dyn Fn(&Error) + Send + Sync>;

/// In-memory map persisted to a single file.
///
/// Generic over key `K`, value `V`, map backend `M` and codec `C`. Use
/// [`open`](Self::open) for a quick start or [`builder`](Self::builder) to pick
/// a save interval, codec or error hook.
///
/// Reads and writes go straight to the backend; the store does not watch
/// individual mutations. The file is rewritten as a whole by the background
/// save thread (if configured), by [`flush`](Self::flush), and one last time
/// when the owning [`FileMapHandle`] is closed or dropped.
pub struct FileMap<K, V, M = DefaultBackend<K, V>, C = BincodeCodec> {
    map: M,
    path: PathBuf,
    codec: C,
    save_every: Option<Duration>,
    save_lock: Mutex<()>,
    closed: AtomicBool,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, M, C> FileMap<K, V, M, C>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    M: MapBackend<K, V> + 'static,
    C: Codec<K, V> + 'static,
{
    /// Open (or create) a store at `path` that only saves when closed.
    pub fn open(path: impl AsRef<Path>) -> Result<FileMapHandle<K, V, M, C>>
    where
        C: Default,
    {
        Self::builder(path).build()
    }

    /// Open with a background save every `every`. Shorthand for
    /// `builder(path).save_every(every).build()`.
    pub fn open_with_interval(
        path: impl AsRef<Path>,
        every: Duration,
    ) -> Result<FileMapHandle<K, V, M, C>>
    where
        C: Default,
    {
        Self::builder(path).save_every(every).build()
    }

    /// Start configuring a new store. Call [`.build()`](FileMapBuilder::build)
    /// when ready.
    pub fn builder(path: impl AsRef<Path>) -> FileMapBuilder<K, V, M, C>
    where
        C: Default,
    {
        FileMapBuilder::new(path, C::default())
    }

    /// Open the store at `path`, run `f` against it, then close it.
    ///
    /// The final save runs even if `f` panics (through the handle's `Drop`).
    /// Its error is returned here when `f` completes normally.
    pub fn scoped<R, F>(path: impl AsRef<Path>, f: F) -> Result<R>
    where
        C: Default,
        F: FnOnce(&Self) -> R,
    {
        Self::builder(path).scoped(f)
    }

    // ---- reads ----

    /// Get the value for `key`, or `None` if absent.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.map.get(key)
    }

    /// `true` if the key exists.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// `true` when the store has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Snapshot of all key-value pairs.
    #[must_use]
    pub fn iter(&self) -> Vec<(K, V)> {
        self.map.snapshot().into_iter().collect()
    }

    /// Snapshot of all keys.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.map.snapshot().into_keys().collect()
    }

    /// Snapshot of all values.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.map.snapshot().into_values().collect()
    }

    /// Path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Interval of the background save, if one was configured.
    #[must_use]
    pub fn save_interval(&self) -> Option<Duration> {
        self.save_every
    }

    /// `true` once the final save has succeeded (or is in flight). A failed
    /// final save clears it again so [`close`](FileMapHandle::close) can be
    /// retried.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // ---- writes ----

    /// Insert a key-value pair, returning the previous value if the key existed.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.map.insert(key, value)
    }

    /// Remove a key, returning its value if it was present.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.map.remove(key)
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.map.clear()
    }

    /// Insert every pair from `iter`, overwriting existing keys.
    pub fn extend<I>(&self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in iter {
            self.map.insert(k, v);
        }
    }

    /// Mutate the value at `key` in place. Returns `false` if the key doesn't
    /// exist (nothing happens in that case).
    ///
    /// Atomic with the default backend. ShardMap does a get-then-put, so
    /// concurrent writers to the same key can lose updates.
    pub fn update<F>(&self, key: &K, f: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        self.map.update(key, f)
    }

    /// Return the existing value for `key`, or insert `default` and return it.
    pub fn get_or_insert(&self, key: K, default: V) -> V {
        if let Some(v) = self.map.get(&key) {
            return v;
        }
        self.map.insert(key, default.clone());
        default
    }

    /// Like [`get_or_insert`](Self::get_or_insert) but only computes the
    /// default when the key is actually missing.
    pub fn get_or_insert_with<F>(&self, key: K, f: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(v) = self.map.get(&key) {
            return v;
        }
        let val = f();
        self.map.insert(key, val.clone());
        val
    }

    // ---- persistence ----

    /// Write the whole map to disk now. Fails with [`Error::Closed`] once the
    /// store has been closed, since the closing save must be the last one.
    pub fn flush(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        self.save()
    }

    /// Snapshot, encode and write the map under the save lock.
    fn save(&self) -> Result<()> {
        let _guard = self.save_lock.lock();
        let data = self.map.snapshot();
        let bytes = persist::encode(&data, &self.codec)?;
        persist::write_truncate(&self.path, &bytes)?;
        tracing::trace!(
            path = %self.path.display(),
            entries = data.len(),
            bytes = bytes.len(),
            "saved"
        );
        Ok(())
    }

    fn save_in_background(&self, hook: Option<&(dyn Fn(&Error) + Send + Sync)>) {
        if let Err(e) = self.save() {
            tracing::error!(path = %self.path.display(), error = %e, "background save failed");
            if let Some(hook) = hook {
                hook(&e);
            }
        }
    }
}

impl<K, V, M, C> std::fmt::Debug for FileMap<K, V, M, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileMap")
            .field("path", &self.path)
            .field("save_every", &self.save_every)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and opens a [`FileMap`] store.
///
/// ```rust,no_run
/// use file_map::{FileMap, JsonCodec};
/// use std::time::Duration;
///
/// let db = FileMap::<String, i32>::builder("data/db.json")
///     .codec(JsonCodec::pretty())
///     .save_every(Duration::from_secs(5))
///     .on_save_error(|e| eprintln!("save failed: {e}"))
///     .build()
///     .unwrap();
/// db.insert("answer".into(), 42);
/// db.close().unwrap();
/// ```
pub struct FileMapBuilder<K, V, M, C> {
    path: PathBuf,
    save_every: Option<Duration>,
    codec: C,
    on_save_error: Option<SaveErrorHook>,
    _marker: PhantomData<fn() -> (K, V, M)>,
}

impl<K, V, M, C> FileMapBuilder<K, V, M, C>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    M: MapBackend<K, V> + 'static,
    C: Codec<K, V> + 'static,
{
    fn new(path: impl AsRef<Path>, codec: C) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            save_every: None,
            codec,
            on_save_error: None,
            _marker: PhantomData,
        }
    }

    /// Save in the background every `every` (default: only save on close).
    /// Intervals below one millisecond are raised to one millisecond.
    pub fn save_every(mut self, every: Duration) -> Self {
        self.save_every = Some(every);
        self
    }

    /// Like [`save_every`](Self::save_every) but in seconds. A negative,
    /// NaN or infinite value disables background saving.
    pub fn save_every_secs(mut self, secs: f64) -> Self {
        self.save_every = match Duration::try_from_secs_f64(secs) {
            Ok(every) => Some(every),
            Err(e) => {
                tracing::warn!(secs, error = %e, "invalid save interval, saving on close only");
                None
            }
        };
        self
    }

    /// Use `codec` instead of the current one (default: [`BincodeCodec`]).
    pub fn codec<C2>(self, codec: C2) -> FileMapBuilder<K, V, M, C2>
    where
        C2: Codec<K, V> + 'static,
    {
        FileMapBuilder {
            path: self.path,
            save_every: self.save_every,
            codec,
            on_save_error: self.on_save_error,
            _marker: PhantomData,
        }
    }

    /// Called with every error a background save hits. Failures are always
    /// logged; the hook is for callers that want to react to them.
    pub fn on_save_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_save_error = Some(Arc::new(hook));
        self
    }

    /// Load (or create) the store and return a handle.
    pub fn build(self) -> Result<FileMapHandle<K, V, M, C>> {
        persist::ensure_parent_dir(&self.path)?;
        let entries = persist::load::<K, V, C>(&self.path, &self.codec)?;
        tracing::debug!(
            path = %self.path.display(),
            entries = entries.len(),
            mode = ?self.codec.mode(),
            "opened store"
        );

        let inner = Arc::new(FileMap {
            map: M::from_entries(entries),
            path: self.path,
            codec: self.codec,
            save_every: self.save_every.map(|every| every.max(MIN_INTERVAL)),
            save_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            _marker: PhantomData,
        });

        let worker = match inner.save_every {
            Some(interval) => {
                let store = Arc::clone(&inner);
                let hook = self.on_save_error;
                Some(SaveWorker::spawn(interval, move || {
                    store.save_in_background(hook.as_deref())
                })?)
            }
            None => None,
        };

        Ok(FileMapHandle {
            inner,
            worker: Mutex::new(worker),
            close_lock: Mutex::new(()),
        })
    }

    /// Build the store, run `f` against it, then close it. See
    /// [`FileMap::scoped`].
    pub fn scoped<R, F>(self, f: F) -> Result<R>
    where
        F: FnOnce(&FileMap<K, V, M, C>) -> R,
    {
        let handle = self.build()?;
        let out = f(&handle);
        handle.close()?;
        Ok(out)
    }
}

impl<K, V, M, C> std::fmt::Debug for FileMapBuilder<K, V, M, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileMapBuilder")
            .field("path", &self.path)
            .field("save_every", &self.save_every)
            .field("on_save_error", &self.on_save_error.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owns the store and its background save thread.
///
/// Derefs to [`FileMap`] so you can call store methods directly on it.
/// [`close`](Self::close) stops the thread and writes the final save; dropping
/// the handle does the same and logs a failed save instead of returning it.
pub struct FileMapHandle<K, V, M, C>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    M: MapBackend<K, V> + 'static,
    C: Codec<K, V> + 'static,
{
    inner: Arc<FileMap<K, V, M, C>>,
    worker: Mutex<Option<SaveWorker>>,
    close_lock: Mutex<()>,
}

impl<K, V, M, C> FileMapHandle<K, V, M, C>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    M: MapBackend<K, V> + 'static,
    C: Codec<K, V> + 'static,
{
    /// Stop the background thread and write the map one last time.
    ///
    /// Once a close has succeeded, later calls return `Ok(())` straight away.
    /// Calls racing from other threads wait for the one in progress. If the
    /// final save fails the error is returned and the store stays open (minus
    /// its background thread), so the caller can fix the cause and close
    /// again or [`flush`](FileMap::flush) by hand. The map stays usable in
    /// memory after a successful close, but nothing else reaches the file.
    pub fn close(&self) -> Result<()> {
        let _closing = self.close_lock.lock();
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let worker = self.worker.lock().take();
        if let Some(mut worker) = worker {
            worker.stop();
        }
        if let Err(e) = self.inner.save() {
            self.inner.closed.store(false, Ordering::Release);
            return Err(e);
        }
        tracing::debug!(path = %self.inner.path.display(), "closed store");
        Ok(())
    }

    /// `true` while the background save thread is running.
    #[must_use]
    pub fn is_saving_in_background(&self) -> bool {
        self.worker.lock().is_some()
    }
}

impl<K, V, M, C> Drop for FileMapHandle<K, V, M, C>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    M: MapBackend<K, V> + 'static,
    C: Codec<K, V> + 'static,
{
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!(
                path = %self.inner.path.display(),
                error = %e,
                "final save on drop failed"
            );
        }
    }
}

impl<K, V, M, C> std::ops::Deref for FileMapHandle<K, V, M, C>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    M: MapBackend<K, V> + 'static,
    C: Codec<K, V> + 'static,
{
    type Target = FileMap<K, V, M, C>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<K, V, M, C> std::fmt::Debug for FileMapHandle<K, V, M, C>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    M: MapBackend<K, V> + 'static,
    C: Codec<K, V> + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&*self.inner, f)
    }
}
