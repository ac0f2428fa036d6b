//! Spawning lightweight tasks onto the Tokio runtime.
//!
//! Tasks communicate through channels. A [`TaskHandle`] deliberately offers
//! no way to retrieve a result: send it over a channel instead.

use std::fmt;
use std::future::Future;

use tokio::task::JoinHandle;

/// An opaque handle to a spawned task. Dropping it detaches the task.
pub struct TaskHandle {
  inner: JoinHandle<()>,
}

impl fmt::Debug for TaskHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskHandle")
      .field("finished", &self.inner.is_finished())
      .finish()
  }
}

impl TaskHandle {
  /// Returns `true` once the task has run to completion (or panicked).
  pub fn is_finished(&self) -> bool {
    self.inner.is_finished()
  }

  pub(crate) fn into_inner(self) -> JoinHandle<()> {
    self.inner
  }
}

/// Spawns `future` as a new task on the current Tokio runtime.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
pub fn spawn<F>(future: F) -> TaskHandle
where
  F: Future<Output = ()> + Send + 'static,
{
  TaskHandle {
    inner: tokio::spawn(future),
  }
}

pub(crate) fn spawn_on<F>(runtime: &tokio::runtime::Handle, future: F) -> TaskHandle
where
  F: Future<Output = ()> + Send + 'static,
{
  TaskHandle {
    inner: runtime.spawn(future),
  }
}

/// Runs `f` on the runtime's blocking thread pool. Use this for code that
/// calls the `*_blocking` channel operations from inside a runtime.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
pub fn spawn_blocking<F>(f: F) -> TaskHandle
where
  F: FnOnce() + Send + 'static,
{
  TaskHandle {
    inner: tokio::task::spawn_blocking(f),
  }
}
