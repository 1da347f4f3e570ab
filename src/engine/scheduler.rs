use std::{
    cmp::Ordering as CmpOrdering,
    collections::BinaryHeap,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use rtrb::{Consumer, Producer, PushError, RingBuffer};

/// Work handed off the calling thread.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Identifies a task submitted through [`Scheduler::schedule_after`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Runs callbacks later, off the calling (audio) thread.
///
/// `defer` gives no ordering guarantee relative to the caller. Delayed tasks
/// fire no earlier than their delay and can be cancelled until they run.
pub trait Scheduler: Send + Sync + 'static {
    fn defer(&self, task: Task);

    fn schedule_after(&self, delay: Duration, task: Task) -> TaskId;

    /// Drop a delayed task that has not run yet. Unknown ids are ignored.
    fn cancel_pending(&self, id: TaskId);
}

const COMMAND_QUEUE_SIZE: usize = 1024;
const IDLE_POLL: Duration = Duration::from_millis(10);

enum Command {
    Run { id: TaskId, due: Instant, task: Task },
    Cancel(TaskId),
}

struct Timed {
    id: TaskId,
    due: Instant,
    task: Task,
}

impl PartialEq for Timed {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.id == other.id
    }
}

impl Eq for Timed {}

impl PartialOrd for Timed {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timed {
    // BinaryHeap is a max-heap; earliest deadline (then lowest id) on top.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Scheduler backed by one dedicated worker thread.
///
/// Submissions go through a lock-free ring; the worker keeps a deadline heap
/// and parks between deadlines.
pub struct WorkerScheduler {
    tx: Mutex<Producer<Command>>,
    next_id: AtomicU64,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl WorkerScheduler {
    pub fn new() -> Self {
        Self::with_capacity(COMMAND_QUEUE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = RingBuffer::<Command>::new(capacity.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker_shutdown = Arc::clone(&shutdown);
        let worker = thread::Builder::new()
            .name("curvebuf-scheduler".into())
            .spawn(move || run_worker(rx, worker_shutdown))
            .map_err(|err| tracing::error!("failed to spawn scheduler worker: {err}"))
            .ok();

        Self {
            tx: Mutex::new(tx),
            next_id: AtomicU64::new(1),
            shutdown,
            worker,
        }
    }

    fn next_id(&self) -> TaskId {
        TaskId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn submit(&self, command: Command) {
        let pushed = {
            let mut tx = match self.tx.lock() {
                Ok(tx) => tx,
                Err(poisoned) => poisoned.into_inner(),
            };
            tx.push(command)
        };

        match pushed {
            Ok(()) => {
                if let Some(worker) = &self.worker {
                    worker.thread().unpark();
                }
            }
            Err(PushError::Full(_)) => {
                tracing::warn!("scheduler queue full, dropping task");
            }
        }
    }
}

impl Default for WorkerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WorkerScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerScheduler")
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl Scheduler for WorkerScheduler {
    fn defer(&self, task: Task) {
        let id = self.next_id();
        self.submit(Command::Run {
            id,
            due: Instant::now(),
            task,
        });
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> TaskId {
        let id = self.next_id();
        self.submit(Command::Run {
            id,
            due: Instant::now() + delay,
            task,
        });
        id
    }

    fn cancel_pending(&self, id: TaskId) {
        self.submit(Command::Cancel(id));
    }
}

impl Drop for WorkerScheduler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            worker.thread().unpark();
            if worker.join().is_err() {
                tracing::error!("scheduler worker panicked");
            }
        }
    }
}

fn run_worker(mut rx: Consumer<Command>, shutdown: Arc<AtomicBool>) {
    let mut timers: BinaryHeap<Timed> = BinaryHeap::new();

    loop {
        while let Ok(command) = rx.pop() {
            match command {
                Command::Run { id, due, task } => timers.push(Timed { id, due, task }),
                Command::Cancel(id) => timers.retain(|timed| timed.id != id),
            }
        }

        if shutdown.load(Ordering::Acquire) {
            break;
        }

        let now = Instant::now();
        while timers.peek().is_some_and(|timed| timed.due <= now) {
            if let Some(timed) = timers.pop() {
                (timed.task)();
            }
        }

        let wait = timers
            .peek()
            .map(|timed| timed.due.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_POLL)
            .min(IDLE_POLL);
        thread::park_timeout(wait);
    }
}

/// Scheduler pumped by the host on a thread of its choosing.
///
/// Tasks queue up until [`ManualScheduler::run_pending`] is called; delays are
/// ignored, order is submission order.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<Vec<(TaskId, Task)>>,
    next_id: AtomicU64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, task: Task) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_queue().push((id, task));
        id
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, Vec<(TaskId, Task)>> {
        match self.queue.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.lock_queue().len()
    }

    /// Run everything queued so far, including tasks queued by those tasks.
    /// Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let batch = std::mem::take(&mut *self.lock_queue());
            if batch.is_empty() {
                return ran;
            }
            for (_, task) in batch {
                task();
                ran += 1;
            }
        }
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn defer(&self, task: Task) {
        self.push(task);
    }

    fn schedule_after(&self, _delay: Duration, task: Task) -> TaskId {
        self.push(task)
    }

    fn cancel_pending(&self, id: TaskId) {
        self.lock_queue().retain(|(queued, _)| *queued != id);
    }
}
