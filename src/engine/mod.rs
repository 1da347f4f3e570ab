// Purpose: the host services a writer depends on (sample buffers, deferred work)

pub mod buffer;
pub mod scheduler;

pub use buffer::{BufferStore, MemoryBufferStore, SharedBuffer};
pub use scheduler::{ManualScheduler, Scheduler, Task, TaskId, WorkerScheduler};
