use crate::{engine::buffer::BufferStore, error::CurveError};

/// A buffer looked up by name, with its usable length.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedBuffer<H> {
    pub handle: H,
    pub frames: usize,
}

/// Result of a deferred rebind, tagged with the request it answers.
pub(crate) struct BindResult<H> {
    pub generation: u64,
    pub outcome: Result<ResolvedBuffer<H>, CurveError>,
}

/// The writer's view of its destination buffer.
#[derive(Debug)]
pub(crate) struct Binding<H> {
    pub name: Option<String>,
    pub handle: Option<H>,
    pub frames: usize,
    // Re-resolve before the next pass.
    pub stale: bool,
    // Generation of the newest `set` request.
    pub requested: u64,
}

impl<H> Binding<H> {
    pub fn new() -> Self {
        Self {
            name: None,
            handle: None,
            frames: 0,
            stale: true,
            requested: 0,
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn bind(&mut self, resolved: ResolvedBuffer<H>) {
        self.handle = Some(resolved.handle);
        self.frames = resolved.frames;
        self.stale = false;
    }

    pub fn unbind(&mut self) {
        self.handle = None;
        self.frames = 0;
        self.stale = true;
    }
}

/// Look `name` up and read its length. Buffers without a usable length are
/// resized to `fallback_frames`.
pub(crate) fn resolve_binding<S: BufferStore + ?Sized>(
    store: &S,
    name: &str,
    fallback_frames: usize,
) -> Result<ResolvedBuffer<S::Handle>, CurveError> {
    if name.is_empty() {
        return Err(CurveError::MissingBufferName);
    }

    let handle = store
        .resolve(name)
        .ok_or_else(|| CurveError::BufferNotFound {
            name: name.to_owned(),
        })?;

    let frames = match store.frame_count(&handle) {
        Some(frames) if frames > 0 => frames,
        _ => {
            store.set_size(&handle, fallback_frames);
            tracing::info!(
                buffer = name,
                frames = fallback_frames,
                "buffer had no size, set buffer length to 1000 ms"
            );
            fallback_frames
        }
    };

    Ok(ResolvedBuffer { handle, frames })
}
