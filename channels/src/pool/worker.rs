//! The loop every pool worker runs.

use super::JobResult;
use crate::channel::{Receiver, Sender};
use crate::coord::WaitGroup;
use crate::error::JobError;
use crate::select::Select;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub(super) struct WorkerContext<J, R, E, F> {
  pub(super) index: usize,
  pub(super) pool: Arc<str>,
  pub(super) input: Receiver<J>,
  pub(super) output: Option<Sender<JobResult<R, E>>>,
  pub(super) stop: Receiver<()>,
  pub(super) group: WaitGroup,
  pub(super) handler: Arc<F>,
}

enum Step<J> {
  Job(Option<J>),
  Stop,
}

/// Receives and processes jobs until the input is closed and drained or the
/// pool is stopped.
///
/// The group is only marked done on a normal exit. A panicking handler
/// unwinds past it, which keeps the pool from reporting itself drained.
pub(super) async fn run<J, R, E, F, Fut>(ctx: WorkerContext<J, R, E, F>)
where
  J: Send + 'static,
  R: Send + 'static,
  E: fmt::Debug + Send + 'static,
  F: Fn(J) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<R, E>> + Send + 'static,
{
  tracing::debug!(pool = %ctx.pool, worker = ctx.index, "worker started");
  let mut processed = 0usize;

  loop {
    if ctx.stop.is_closed() {
      tracing::debug!(pool = %ctx.pool, worker = ctx.index, processed, "worker stopped");
      break;
    }

    let step = Select::new()
      .recv(&ctx.input, Step::Job)
      .recv(&ctx.stop, |_| Step::Stop)
      .run()
      .await;

    match step {
      Step::Job(Some(job)) => {
        let outcome = (ctx.handler)(job).await;
        processed += 1;
        publish(&ctx, outcome).await;
      }
      Step::Job(None) => {
        tracing::debug!(pool = %ctx.pool, worker = ctx.index, processed, "input drained, worker exiting");
        break;
      }
      Step::Stop => {
        tracing::debug!(pool = %ctx.pool, worker = ctx.index, processed, "worker stopped");
        break;
      }
    }
  }

  ctx.group.done();
}

async fn publish<J, R, E, F>(ctx: &WorkerContext<J, R, E, F>, outcome: Result<R, E>)
where
  J: Send,
  R: Send,
  E: fmt::Debug + Send,
{
  let Some(output) = ctx.output.as_ref() else {
    if let Err(error) = outcome {
      tracing::warn!(pool = %ctx.pool, worker = ctx.index, ?error, "job failed");
    }
    return;
  };

  let result = outcome.map_err(|error| JobError {
    worker: ctx.index,
    error,
  });
  if output.send(result).await.is_err() {
    tracing::error!(
      pool = %ctx.pool,
      worker = ctx.index,
      "output channel is closed, dropping job result"
    );
  }
}
