use std::{
    collections::HashMap,
    ops::{Deref, DerefMut},
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, RwLock, TryLockError,
    },
};

/// Named sample storage owned by the host.
///
/// The writer only needs to look a buffer up, ask its length, take exclusive
/// access to its samples and tell the host it changed. Exclusive access is a
/// guard: dropping it unlocks.
pub trait BufferStore: Send + Sync + 'static {
    type Handle: Clone + Send + 'static;
    type Samples<'a>: DerefMut<Target = [f32]>
    where
        Self: 'a;

    /// Look a buffer up by name.
    fn resolve(&self, name: &str) -> Option<Self::Handle>;

    /// Frame count, or `None` when the host does not know it.
    fn frame_count(&self, handle: &Self::Handle) -> Option<usize>;

    /// Take exclusive access to the samples. Must not block; `None` when the
    /// buffer is busy or gone.
    fn lock<'a>(&'a self, handle: &'a Self::Handle) -> Option<Self::Samples<'a>>;

    /// Flag the buffer as modified so dependents refresh.
    fn mark_dirty(&self, handle: &Self::Handle);

    /// Resize to `frames` samples.
    fn set_size(&self, handle: &Self::Handle, frames: usize);
}

/// One named buffer in a [`MemoryBufferStore`].
#[derive(Debug)]
pub struct SharedBuffer {
    samples: Mutex<Vec<f32>>,
    frames: AtomicUsize,
    dirty: AtomicBool,
    writes: AtomicU64,
}

impl SharedBuffer {
    fn new(frames: usize) -> Self {
        Self {
            samples: Mutex::new(vec![0.0; frames]),
            frames: AtomicUsize::new(frames),
            dirty: AtomicBool::new(false),
            writes: AtomicU64::new(0),
        }
    }

    /// Copy of the current contents. Blocks while a writer holds the lock.
    pub fn snapshot(&self) -> Vec<f32> {
        match self.samples.lock() {
            Ok(samples) => samples.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns and clears the dirty flag.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// How many times the buffer was marked dirty.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }
}

/// Exclusive access to a [`SharedBuffer`]'s samples.
pub struct SampleGuard<'a> {
    guard: MutexGuard<'a, Vec<f32>>,
}

impl Deref for SampleGuard<'_> {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.guard
    }
}

impl DerefMut for SampleGuard<'_> {
    fn deref_mut(&mut self) -> &mut [f32] {
        &mut self.guard
    }
}

/// In-process buffer registry. Handles are shared references, so a handle
/// stays valid after the name is rebound to another buffer.
#[derive(Debug, Default)]
pub struct MemoryBufferStore {
    buffers: RwLock<HashMap<String, Arc<SharedBuffer>>>,
}

impl MemoryBufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) a zeroed buffer of `frames` samples.
    pub fn insert(&self, name: &str, frames: usize) -> Arc<SharedBuffer> {
        let buffer = Arc::new(SharedBuffer::new(frames));
        let mut buffers = match self.buffers.write() {
            Ok(buffers) => buffers,
            Err(poisoned) => poisoned.into_inner(),
        };
        buffers.insert(name.to_owned(), Arc::clone(&buffer));
        buffer
    }

    pub fn remove(&self, name: &str) -> Option<Arc<SharedBuffer>> {
        let mut buffers = match self.buffers.write() {
            Ok(buffers) => buffers,
            Err(poisoned) => poisoned.into_inner(),
        };
        buffers.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<SharedBuffer>> {
        let buffers = match self.buffers.read() {
            Ok(buffers) => buffers,
            Err(poisoned) => poisoned.into_inner(),
        };
        buffers.get(name).cloned()
    }
}

impl BufferStore for MemoryBufferStore {
    type Handle = Arc<SharedBuffer>;
    type Samples<'a> = SampleGuard<'a>;

    fn resolve(&self, name: &str) -> Option<Self::Handle> {
        self.get(name)
    }

    fn frame_count(&self, handle: &Self::Handle) -> Option<usize> {
        Some(handle.len())
    }

    fn lock<'a>(&'a self, handle: &'a Self::Handle) -> Option<Self::Samples<'a>> {
        match handle.samples.try_lock() {
            Ok(guard) => Some(SampleGuard { guard }),
            Err(TryLockError::Poisoned(poisoned)) => Some(SampleGuard {
                guard: poisoned.into_inner(),
            }),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    fn mark_dirty(&self, handle: &Self::Handle) {
        handle.dirty.store(true, Ordering::Release);
        handle.writes.fetch_add(1, Ordering::AcqRel);
    }

    fn set_size(&self, handle: &Self::Handle, frames: usize) {
        let mut samples = match handle.samples.lock() {
            Ok(samples) => samples,
            Err(poisoned) => poisoned.into_inner(),
        };
        samples.resize(frames, 0.0);
        handle.frames.store(frames, Ordering::Release);
    }
}
