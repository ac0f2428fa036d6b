// src/pool/mod.rs

//! A fixed-size pool of worker tasks draining one shared input channel.
//!
//! Every worker runs the same loop: receive a job, run the handler on it,
//! send the outcome to the output channel if there is one, repeat. Workers
//! terminate independently once they observe the input closed and drained.
//!
//! The producer's side of the contract is to send jobs to the input and close
//! it exactly once. [`PoolHandle::await_drained`] resolves when every worker
//! has terminated normally.
//!
//! ### Failures
//!
//! - A handler error is reported as `Err(JobError { worker, error })` on the
//!   output (or as a `warn` log event when there is no output) and the worker
//!   moves on to the next job.
//! - A handler panic terminates that worker only. It is not retried, and the
//!   pool never counts it as drained. [`PoolHandle::await_drained_timeout`]
//!   reports it as [`PoolError::Stalled`] and [`PoolHandle::join`] as
//!   [`PoolError::Faulted`].
//!
//! ```no_run
//! use conduit::{Channel, WorkerPool};
//!
//! # async fn demo() -> Result<(), conduit::PoolError> {
//! let jobs = Channel::new(16);
//! let results = Channel::new(16);
//!
//! let pool = WorkerPool::builder()
//!   .workers(3)
//!   .build(jobs.receiver(), Some(results.sender()), |n: u64| async move {
//!     Ok::<_, std::convert::Infallible>(n * 2)
//!   })?;
//!
//! for n in 1..=100 {
//!   jobs.send(n).await.expect("input is open");
//! }
//! jobs.close().expect("closed once");
//! pool.await_drained().await;
//! # Ok(())
//! # }
//! ```

mod builder;
mod worker;

pub use builder::{PoolBuilder, PoolConfig};

use crate::channel::Channel;
use crate::coord::WaitGroup;
use crate::error::{JobError, PoolError, WorkerFault};
use crate::task::TaskHandle;

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// What a worker sends to the output channel for each job.
pub type JobResult<R, E> = Result<R, JobError<E>>;

/// Entry point for building worker pools.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerPool;

impl WorkerPool {
  pub fn builder() -> PoolBuilder {
    PoolBuilder::new()
  }
}

/// Supervises a running pool.
///
/// Dropping the handle does not stop the workers; they keep draining the input.
pub struct PoolHandle {
  name: Arc<str>,
  group: WaitGroup,
  stop: Channel<()>,
  tasks: Vec<TaskHandle>,
}

impl fmt::Debug for PoolHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PoolHandle")
      .field("name", &self.name)
      .field("workers", &self.tasks.len())
      .field("active", &self.group.count())
      .field("stopped", &self.stop.is_closed())
      .finish()
  }
}

impl PoolHandle {
  pub(crate) fn new(name: Arc<str>, group: WaitGroup, stop: Channel<()>, tasks: Vec<TaskHandle>) -> Self {
    Self {
      name,
      group,
      stop,
      tasks,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Number of workers the pool was started with.
  pub fn worker_count(&self) -> usize {
    self.tasks.len()
  }

  /// Number of workers that have not terminated normally yet. A worker that
  /// panicked stays counted.
  pub fn active_workers(&self) -> usize {
    self.group.count()
  }

  /// Resolves once every worker has terminated normally.
  ///
  /// If a worker panicked this never resolves; use
  /// [`await_drained_timeout`](Self::await_drained_timeout) to bound the wait.
  pub async fn await_drained(&self) {
    self.group.wait().await;
  }

  /// Blocking form of [`await_drained`](Self::await_drained), for callers
  /// outside the runtime.
  pub fn await_drained_blocking(&self) {
    self.group.wait_blocking();
  }

  /// Like [`await_drained`](Self::await_drained), giving up after `timeout`.
  ///
  /// # Errors
  ///
  /// `PoolError::Stalled` with the number of workers still counted.
  pub async fn await_drained_timeout(&self, timeout: Duration) -> Result<(), PoolError> {
    match tokio::time::timeout(timeout, self.group.wait()).await {
      Ok(()) => Ok(()),
      Err(_) => {
        let remaining = self.group.count();
        tracing::warn!(pool = %self.name, remaining, ?timeout, "pool did not drain in time");
        Err(PoolError::Stalled { remaining, timeout })
      }
    }
  }

  /// Asks every worker to exit at its next receive, without consuming further
  /// jobs. A job already being processed is finished first. Calling it again
  /// has no effect.
  pub fn stop(&self) {
    if self.stop.close().is_ok() {
      tracing::debug!(pool = %self.name, "stop requested");
    }
  }

  /// Waits for every worker task to end and reports the ones that panicked.
  ///
  /// # Errors
  ///
  /// `PoolError::Faulted` listing each faulted worker.
  pub async fn join(self) -> Result<(), PoolError> {
    let mut faults = Vec::new();
    for (worker, task) in self.tasks.into_iter().enumerate() {
      if let Err(err) = task.into_inner().await {
        let message = if err.is_panic() {
          panic_message(err.into_panic())
        } else {
          "worker task was cancelled".to_string()
        };
        tracing::error!(pool = %self.name, worker, %message, "worker faulted");
        faults.push(WorkerFault { worker, message });
      }
    }
    if faults.is_empty() {
      Ok(())
    } else {
      Err(PoolError::Faulted(faults))
    }
  }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  match payload.downcast::<String>() {
    Ok(message) => *message,
    Err(payload) => match payload.downcast::<&'static str>() {
      Ok(message) => (*message).to_string(),
      Err(_) => "non-string panic payload".to_string(),
    },
  }
}
