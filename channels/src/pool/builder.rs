use super::worker::{self, WorkerContext};
use super::{JobResult, PoolHandle};
use crate::channel::{Channel, Receiver, Sender};
use crate::coord::WaitGroup;
use crate::error::PoolError;
use crate::task;

use core::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::runtime::Handle;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const DEFAULT_POOL_NAME: &str = "conduit-pool";

/// Plain-data pool settings, e.g. loaded from a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct PoolConfig {
  /// Number of worker tasks. Must be positive.
  pub workers: usize,
  /// Name used in log events.
  pub name: String,
  /// Close the output channel once every worker has terminated normally.
  pub close_output_on_drain: bool,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      workers: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
      name: DEFAULT_POOL_NAME.to_string(),
      close_output_on_drain: false,
    }
  }
}

/// A builder for [`PoolHandle`]s. Obtained from [`WorkerPool::builder`](super::WorkerPool::builder).
pub struct PoolBuilder {
  config: PoolConfig,
  runtime: Option<Handle>,
}

impl fmt::Debug for PoolBuilder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PoolBuilder")
      .field("config", &self.config)
      .field("has_runtime", &self.runtime.is_some())
      .finish()
  }
}

impl Default for PoolBuilder {
  fn default() -> Self {
    Self::from_config(PoolConfig::default())
  }
}

impl PoolBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_config(config: PoolConfig) -> Self {
    Self {
      config,
      runtime: None,
    }
  }

  /// Sets the number of worker tasks.
  pub fn workers(mut self, workers: usize) -> Self {
    self.config.workers = workers;
    self
  }

  /// Sets the name reported in log events.
  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.config.name = name.into();
    self
  }

  /// Closes the output channel once the pool has drained, so consumers can
  /// read results until `None`.
  pub fn close_output_on_drain(mut self, enabled: bool) -> Self {
    self.config.close_output_on_drain = enabled;
    self
  }

  /// Spawns the workers on `runtime` instead of the current runtime.
  pub fn runtime(mut self, runtime: Handle) -> Self {
    self.runtime = Some(runtime);
    self
  }

  fn validate(&self) -> Result<(), PoolError> {
    if self.config.workers == 0 {
      return Err(PoolError::InvalidConfig("worker count must be positive".into()));
    }
    Ok(())
  }

  /// Spawns the workers and returns a handle to supervise them.
  ///
  /// Each worker receives jobs from `input` until it is closed and drained,
  /// runs `handler` on each, and sends the outcome to `output` if one is
  /// given.
  ///
  /// # Errors
  ///
  /// `PoolError::InvalidConfig` for a zero worker count, or when no runtime
  /// was given and none is current.
  pub fn build<J, R, E, F, Fut>(
    self,
    input: Receiver<J>,
    output: Option<Sender<JobResult<R, E>>>,
    handler: F,
  ) -> Result<PoolHandle, PoolError>
  where
    J: Send + 'static,
    R: Send + 'static,
    E: fmt::Debug + Send + 'static,
    F: Fn(J) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
  {
    self.validate()?;
    let runtime = match self.runtime {
      Some(runtime) => runtime,
      None => Handle::try_current()
        .map_err(|err| PoolError::InvalidConfig(format!("no Tokio runtime available: {err}")))?,
    };

    let PoolConfig {
      workers,
      name,
      close_output_on_drain,
    } = self.config;
    let name: Arc<str> = name.into();
    let group = WaitGroup::new();
    let stop = Channel::<()>::rendezvous();
    let handler = Arc::new(handler);

    group.add(workers);
    let mut tasks = Vec::with_capacity(workers);
    for index in 0..workers {
      let context = WorkerContext {
        index,
        pool: Arc::clone(&name),
        input: input.clone(),
        output: output.clone(),
        stop: stop.receiver(),
        group: group.clone(),
        handler: Arc::clone(&handler),
      };
      tasks.push(task::spawn_on(&runtime, worker::run(context)));
    }

    if close_output_on_drain {
      if let Some(output) = output {
        let group = group.clone();
        let pool = Arc::clone(&name);
        task::spawn_on(&runtime, async move {
          group.wait().await;
          if output.close().is_err() {
            tracing::debug!(pool = %pool, "output channel was already closed at drain");
          }
        });
      }
    }

    tracing::debug!(pool = %name, workers, "worker pool started");
    Ok(PoolHandle::new(name, group, stop, tasks))
  }
}
