//! The buffer-writing curve object.
//!
//! A [`CurveWriter`] receives list messages, compiles them into curve
//! segments and renders one full destination buffer per message. Rebinding
//! the destination by name runs on the scheduler; completion of a segment
//! list is announced through a zero-delay scheduled callback.
//!
//! Errors are logged once, at [`CurveWriter::handle_message`]. The direct
//! methods (`set`, `list_values`, `render`, ...) only return them.

mod binding;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use rtrb::{Consumer, Producer, RingBuffer};

use crate::{
    config::WriterConfig,
    dsp::{
        compiler::{compile, CompileCtx},
        generator::{CurveGenerator, PassOutcome},
        segment::clamp_curvature,
    },
    engine::{
        buffer::BufferStore,
        scheduler::{Scheduler, TaskId},
    },
    error::CurveError,
    io::message::{Atom, BufferEvent, Message},
};

use self::binding::{resolve_binding, BindResult, Binding};

type CompletionFn = Arc<dyn Fn() + Send + Sync>;
type RebindTx<H> = Arc<Mutex<Producer<BindResult<H>>>>;

pub struct CurveWriter<S: BufferStore, K: Scheduler> {
    config: WriterConfig,
    store: Arc<S>,
    scheduler: Arc<K>,

    // Destination
    binding: Binding<S::Handle>,
    rebind_tx: RebindTx<S::Handle>,
    rebind_rx: Consumer<BindResult<S::Handle>>,
    // Set by the worker when a result did not fit the ring
    rebind_lost: Arc<AtomicBool>,

    // Curve state
    generator: CurveGenerator,
    curvature_bias: f32,

    // Completion
    on_complete: CompletionFn,
    pending_completion: Option<TaskId>,
}

impl<S: BufferStore, K: Scheduler> CurveWriter<S, K> {
    pub fn new(config: WriterConfig, store: Arc<S>, scheduler: Arc<K>) -> Self {
        let (tx, rx) = RingBuffer::new(config.rebind_queue.max(1));

        Self {
            generator: CurveGenerator::new(config.initial_value),
            curvature_bias: clamp_curvature(config.curvature_bias),
            config,
            store,
            scheduler,
            binding: Binding::new(),
            rebind_tx: Arc::new(Mutex::new(tx)),
            rebind_rx: rx,
            rebind_lost: Arc::new(AtomicBool::new(false)),
            on_complete: Arc::new(|| {}),
            pending_completion: None,
        }
    }

    /// Name the destination buffer at construction time.
    pub fn with_buffer(mut self, name: &str) -> Self {
        if let Err(err) = self.set(name) {
            tracing::error!("{err}");
        }
        self
    }

    /// Callback fired (from the scheduler) once a segment list has finished.
    pub fn on_complete(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Arc::new(callback);
        self
    }

    /// Dispatch one inbound message. Errors are reported here and returned.
    pub fn handle_message(&mut self, message: Message) -> Result<(), CurveError> {
        let result = match message {
            Message::Set(atoms) => self.set_atoms(&atoms),
            Message::List(atoms) => self.list(&atoms).map(|_| ()),
            Message::Float(_) => Err(CurveError::InvalidInput),
            Message::Curve(bias) => {
                self.set_curvature_bias(bias);
                Ok(())
            }
            Message::Notify(event) => {
                self.notify(event);
                Ok(())
            }
        };

        if let Err(err) = &result {
            tracing::error!(buffer = self.binding.name(), "{err}");
        }
        result
    }

    /// `set` with raw atoms: the first atom must be a symbol.
    pub fn set_atoms(&mut self, atoms: &[Atom]) -> Result<(), CurveError> {
        match atoms.first().and_then(Atom::as_symbol) {
            Some(name) => self.set(name),
            None => Err(CurveError::MissingBufferName),
        }
    }

    /// Rebind the destination. The lookup runs on the scheduler; passes keep
    /// using the current buffer until it lands.
    pub fn set(&mut self, name: &str) -> Result<(), CurveError> {
        if name.is_empty() {
            return Err(CurveError::MissingBufferName);
        }

        self.binding.name = Some(name.to_owned());
        self.binding.requested += 1;

        let generation = self.binding.requested;
        let name = name.to_owned();
        let store = Arc::clone(&self.store);
        let tx = Arc::clone(&self.rebind_tx);
        let lost = Arc::clone(&self.rebind_lost);
        let fallback_frames = self.config.one_second_frames();

        self.scheduler.defer(Box::new(move || {
            let outcome = resolve_binding(&*store, &name, fallback_frames);
            if let Err(err) = &outcome {
                tracing::error!(buffer = %name, "{err}");
            }

            let mut tx = match tx.lock() {
                Ok(tx) => tx,
                Err(poisoned) => poisoned.into_inner(),
            };
            if tx.push(BindResult { generation, outcome }).is_err() {
                tracing::warn!(buffer = %name, "rebind queue full, dropping result");
                lost.store(true, Ordering::Release);
            }
        }));

        Ok(())
    }

    /// Buffer notification: re-resolve before the next pass.
    pub fn notify(&mut self, event: BufferEvent) {
        tracing::debug!(buffer = self.binding.name(), ?event, "binding marked stale");
        self.binding.stale = true;
    }

    /// Curvature for trailing partial segments, clamped to [-1, 1].
    pub fn set_curvature_bias(&mut self, bias: f32) {
        self.curvature_bias = clamp_curvature(bias);
    }

    /// Validate, compile and render. `Ok(None)` when the list is one the
    /// compiler ignores (empty, or exactly one triple).
    pub fn list(&mut self, atoms: &[Atom]) -> Result<Option<PassOutcome>, CurveError> {
        let mut values = Vec::with_capacity(atoms.len());
        for (index, atom) in atoms.iter().enumerate() {
            match atom.as_float() {
                Some(value) => values.push(value),
                None => {
                    return Err(CurveError::NonFloatElement {
                        index,
                        found: atom.to_string(),
                    })
                }
            }
        }
        self.list_values(&values)
    }

    /// [`CurveWriter::list`] for values already known to be floats.
    pub fn list_values(&mut self, values: &[f32]) -> Result<Option<PassOutcome>, CurveError> {
        if values.is_empty() || values.len() == 3 {
            return Ok(None);
        }

        self.prepare_binding()?;

        let ctx = CompileCtx::new(
            self.config.sample_rate,
            self.binding.frames,
            self.curvature_bias,
        );
        let Some(segments) = compile(values, &ctx) else {
            return Ok(None);
        };
        if segments.was_clamped() {
            tracing::debug!(
                requested = values.len() / 3,
                kept = segments.len(),
                "segment list clamped"
            );
        }

        self.generator.load(segments);
        self.render().map(Some)
    }

    /// Render one full buffer from the current curve state.
    pub fn render(&mut self) -> Result<PassOutcome, CurveError> {
        self.prepare_binding()?;

        let Some(handle) = self.binding.handle.as_ref() else {
            return Err(CurveError::NoBuffer);
        };

        let outcome = {
            let Some(mut samples) = self.store.lock(handle) else {
                return Err(CurveError::LockFailed {
                    name: self.binding.name().to_owned(),
                });
            };
            self.generator.render(&mut *samples)
        };
        self.store.mark_dirty(handle);

        if outcome.completed {
            self.schedule_completion();
        }

        Ok(outcome)
    }

    /// Apply finished rebinds. Only the newest request counts. If a result
    /// was dropped on a full queue, the current name is re-resolved on the
    /// next pass instead.
    pub fn apply_pending_bindings(&mut self) {
        while let Ok(result) = self.rebind_rx.pop() {
            if result.generation < self.binding.requested {
                tracing::debug!(
                    generation = result.generation,
                    latest = self.binding.requested,
                    "dropping superseded rebind"
                );
                continue;
            }
            match result.outcome {
                Ok(resolved) => self.binding.bind(resolved),
                Err(_) => self.binding.unbind(),
            }
        }

        if self.rebind_lost.swap(false, Ordering::AcqRel) {
            tracing::debug!(buffer = self.binding.name(), "rebind result lost, re-resolving");
            self.binding.stale = true;
        }
    }

    fn prepare_binding(&mut self) -> Result<(), CurveError> {
        self.apply_pending_bindings();

        if self.binding.stale {
            let fallback_frames = self.config.one_second_frames();
            match resolve_binding(&*self.store, self.binding.name(), fallback_frames) {
                Ok(resolved) => self.binding.bind(resolved),
                Err(err) => {
                    self.binding.unbind();
                    return Err(err);
                }
            }
        }

        if self.binding.handle.is_none() {
            return Err(CurveError::NoBuffer);
        }
        Ok(())
    }

    // One notification in flight: a newer completion replaces the pending one.
    fn schedule_completion(&mut self) {
        if let Some(previous) = self.pending_completion.take() {
            self.scheduler.cancel_pending(previous);
        }
        let callback = Arc::clone(&self.on_complete);
        let id = self
            .scheduler
            .schedule_after(Duration::ZERO, Box::new(move || callback()));
        self.pending_completion = Some(id);
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn curvature_bias(&self) -> f32 {
        self.curvature_bias
    }

    /// Last value written.
    pub fn value(&self) -> f32 {
        self.generator.value()
    }

    pub fn generator(&self) -> &CurveGenerator {
        &self.generator
    }

    pub fn buffer_name(&self) -> Option<&str> {
        self.binding.name.as_deref()
    }

    /// Frames of the bound buffer, 0 when unbound.
    pub fn buffer_frames(&self) -> usize {
        self.binding.frames
    }

    pub fn is_bound(&self) -> bool {
        self.binding.handle.is_some()
    }
}

impl<S: BufferStore, K: Scheduler> Drop for CurveWriter<S, K> {
    fn drop(&mut self) {
        if let Some(id) = self.pending_completion.take() {
            self.scheduler.cancel_pending(id);
        }
    }
}
