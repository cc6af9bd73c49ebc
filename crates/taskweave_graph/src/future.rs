//! Completion handles for scheduled runs.
//!
//! Every `Executor::run_*` call returns a [`TaskFuture`]. The future only
//! signals completion; whether the run succeeded is read from the context's
//! records afterwards.
//!
//! A future keeps the scheduled graph alive through shared ownership of the
//! run state, so dropping it early never frees anything a worker still uses.
//!
//! # Blocking and async use
//!
//! [`TaskFuture::wait`] blocks the calling thread. `TaskFuture` also
//! implements [`core::future::Future`], so async callers can `.await` it:
//!
//! ```ignore
//! let future = executor.run_graph(graph, &ctx)?;
//! future.await;
//! ```

use core::pin::Pin;
use core::task::{Context, Poll};
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use futures::task::AtomicWaker;

use crate::executor::pool::{Latch, Pool};

/// Result of a timed wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FutureStatus {
    /// The run finished.
    Ready,
    /// The deadline passed first.
    Timeout,
    /// The future has no backing run.
    Invalid,
}

/// Shared completion signal of one run.
pub(crate) struct Completion {
    done: AtomicBool,
    latch: Latch,
    waker: AtomicWaker,
    pool: Arc<Pool>,
}

impl Completion {
    pub(crate) fn new(pool: Arc<Pool>) -> Arc<Self> {
        Arc::new(Self {
            done: AtomicBool::new(false),
            latch: Latch::new(),
            waker: AtomicWaker::new(),
            pool,
        })
    }

    pub(crate) fn complete(&self) {
        // Set before the release so every woken waiter observes it.
        self.done.store(true, Ordering::Release);
        self.latch.release();
        self.waker.wake();
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

/// Handle to a scheduled run.
///
/// Clones share the same run. A default-constructed or cleared future is
/// invalid.
#[derive(Clone, Default)]
pub struct TaskFuture {
    completion: Option<Arc<Completion>>,
    retained: Option<Arc<dyn Any + Send + Sync>>,
}

impl TaskFuture {
    pub(crate) fn new(completion: Arc<Completion>, retained: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            completion: Some(completion),
            retained: Some(retained),
        }
    }

    /// Returns `true` if the future refers to a run.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.completion.is_some()
    }

    /// Returns `true` if the run finished. Invalid futures are never ready.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.completion.as_ref().is_some_and(|c| c.is_done())
    }

    /// Blocks until the run finishes. Returns immediately if invalid.
    ///
    /// Called from a worker of the executor that owns the run, the thread
    /// keeps executing queued jobs while it waits.
    pub fn wait(&self) {
        let Some(completion) = &self.completion else {
            return;
        };
        if completion.pool.is_current() {
            completion
                .pool
                .help_until(&completion.latch, || completion.is_done());
            return;
        }
        // Nothing is ever sent; the release disconnects the channel.
        let _ = completion.latch.receiver().recv();
    }

    /// Blocks for at most `timeout`.
    pub fn wait_for(&self, timeout: Duration) -> FutureStatus {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.wait_until(deadline),
            None => {
                self.wait();
                self.status()
            }
        }
    }

    /// Blocks until `deadline` at the latest.
    ///
    /// Unlike [`wait`](Self::wait), a timed wait never executes other jobs.
    pub fn wait_until(&self, deadline: Instant) -> FutureStatus {
        let Some(completion) = &self.completion else {
            return FutureStatus::Invalid;
        };
        match completion.latch.receiver().recv_deadline(deadline) {
            Err(RecvTimeoutError::Timeout) if !completion.is_done() => FutureStatus::Timeout,
            _ => FutureStatus::Ready,
        }
    }

    /// Detaches from the run. The run itself continues.
    pub fn clear(&mut self) {
        self.completion = None;
        self.retained = None;
    }

    fn status(&self) -> FutureStatus {
        match &self.completion {
            None => FutureStatus::Invalid,
            Some(c) if c.is_done() => FutureStatus::Ready,
            Some(_) => FutureStatus::Timeout,
        }
    }
}

impl core::future::Future for TaskFuture {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let Some(completion) = &self.completion else {
            return Poll::Ready(());
        };
        if completion.is_done() {
            return Poll::Ready(());
        }
        completion.waker.register(cx.waker());
        if completion.is_done() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

impl core::fmt::Debug for TaskFuture {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TaskFuture")
            .field("valid", &self.valid())
            .field("ready", &self.ready())
            .finish()
    }
}
