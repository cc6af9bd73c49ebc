//! Bounded worker pool.
//!
//! A FIFO job channel drained by a fixed set of threads. A thread blocked on
//! a nested run of the same pool keeps draining the channel through
//! [`Pool::help_until`], so nested graphs make progress with any pool size.

use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, select, unbounded};
use parking_lot::Mutex;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    /// Address of the pool the current thread works for, or 0.
    static CURRENT_POOL: Cell<usize> = const { Cell::new(0) };
}

/// One-shot signal. Every receiver clone observes the release as a
/// disconnect, so any number of threads can wait on it.
pub(crate) struct Latch {
    release: Mutex<Option<Sender<()>>>,
    released: Receiver<()>,
}

impl Latch {
    pub(crate) fn new() -> Self {
        let (release, released) = unbounded();
        Self {
            release: Mutex::new(Some(release)),
            released,
        }
    }

    pub(crate) fn release(&self) {
        self.release.lock().take();
    }

    pub(crate) fn receiver(&self) -> &Receiver<()> {
        &self.released
    }
}

pub(crate) struct Pool {
    jobs: Sender<Job>,
    queue: Receiver<Job>,
    stop: Latch,
    active: AtomicUsize,
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Pool {
    pub(crate) fn new() -> Arc<Self> {
        let (jobs, queue) = unbounded();
        Arc::new(Self {
            jobs,
            queue,
            stop: Latch::new(),
            active: AtomicUsize::new(0),
        })
    }

    pub(crate) fn submit(&self, job: Job) {
        // The pool owns a receiver, so the channel cannot be disconnected.
        if self.jobs.send(job).is_err() {
            tracing::error!("job queue disconnected");
        }
    }

    /// Number of jobs currently executing.
    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    fn address(&self) -> usize {
        core::ptr::from_ref(self).addr()
    }

    /// Returns `true` on a thread owned by this pool.
    pub(crate) fn is_current(&self) -> bool {
        CURRENT_POOL.with(|current| current.get() == self.address())
    }

    fn execute(&self, job: Job) {
        self.active.fetch_add(1, Ordering::AcqRel);
        let _guard = ActiveGuard(&self.active);
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!("worker job panicked");
        }
    }

    /// Runs queued jobs on the calling thread until `done` holds or `latch`
    /// is released.
    ///
    /// `done` is checked before every job, so a completion caused by a job
    /// run here is seen before the next job is taken.
    pub(crate) fn help_until(&self, latch: &Latch, done: impl Fn() -> bool) {
        while !done() {
            select! {
                recv(self.queue) -> job => match job {
                    Ok(job) => self.execute(job),
                    Err(_) => return,
                },
                recv(latch.receiver()) -> _ => return,
            }
        }
    }

    pub(crate) fn shutdown(&self) {
        self.stop.release();
    }

    fn next_job(&self) -> Option<Job> {
        select! {
            recv(self.queue) -> job => job.ok(),
            // Jobs queued before the stop still run.
            recv(self.stop.receiver()) -> _ => self.queue.try_recv().ok(),
        }
    }
}

/// Body of every worker thread. Exits once the pool shuts down and the queue
/// is empty.
pub(crate) fn worker_loop(pool: Arc<Pool>) {
    CURRENT_POOL.with(|current| current.set(pool.address()));
    while let Some(job) = pool.next_job() {
        pool.execute(job);
    }
    CURRENT_POOL.with(|current| current.set(0));
}
