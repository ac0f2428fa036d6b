//! The future returned by [`Select::run`](super::Select::run).

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use super::engine::{attempt, Waiting};
use super::{Case, Handler, Operation};

/// A future that resolves with the result of the first select case to fire.
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct SelectFuture<'a, R> {
  cases: Vec<Case<'a, R>>,
  default: Option<Handler<'a, R>>,
  deadline: Option<(Instant, Handler<'a, R>)>,
  sleep: Option<Pin<Box<tokio::time::Sleep>>>,
  waiting: Waiting,
}

impl<R> fmt::Debug for SelectFuture<'_, R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SelectFuture")
      .field("cases", &self.cases.len())
      .field("has_default", &self.default.is_some())
      .field("deadline", &self.deadline.as_ref().map(|(at, _)| *at))
      .field("waiting", &self.waiting)
      .finish()
  }
}

impl<'a, R> SelectFuture<'a, R> {
  pub(super) fn new(
    cases: Vec<Case<'a, R>>,
    default: Option<Handler<'a, R>>,
    timeout: Option<(Duration, Handler<'a, R>)>,
  ) -> Self {
    Self {
      cases,
      default,
      deadline: timeout.and_then(|(after, handler)| Some((Instant::now().checked_add(after)?, handler))),
      sleep: None,
      waiting: Waiting::new(),
    }
  }

  fn ops(&mut self) -> Vec<&mut dyn Operation<R>> {
    self
      .cases
      .iter_mut()
      .map(|case| case.as_mut() as &mut dyn Operation<R>)
      .collect()
  }
}

impl<'a, R> Future for SelectFuture<'a, R> {
  type Output = R;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();

    if let Some(default) = this.default.take() {
      let result = attempt(&mut this.ops());
      return Poll::Ready(match result {
        Some(result) => result,
        None => default(),
      });
    }

    let mut ops: Vec<&mut dyn Operation<R>> = this
      .cases
      .iter_mut()
      .map(|case| case.as_mut() as &mut dyn Operation<R>)
      .collect();
    if let Poll::Ready(result) = this.waiting.poll(&mut ops, cx) {
      return Poll::Ready(result);
    }

    let Some((deadline, _)) = this.deadline.as_ref() else {
      return Poll::Pending;
    };
    let sleep = this
      .sleep
      .get_or_insert_with(|| Box::pin(tokio::time::sleep_until(tokio::time::Instant::from_std(*deadline))));
    if sleep.as_mut().poll(cx).is_pending() {
      return Poll::Pending;
    }

    // Deadline reached. A case that won the race to the token still wins.
    if let Some(result) = this.waiting.abort(&mut ops) {
      return Poll::Ready(result);
    }
    match this.deadline.take() {
      Some((_, on_timeout)) => Poll::Ready(on_timeout()),
      None => Poll::Pending,
    }
  }
}

impl<R> Drop for SelectFuture<'_, R> {
  fn drop(&mut self) {
    if self.waiting.is_registered() {
      let mut waiting = std::mem::replace(&mut self.waiting, Waiting::new());
      waiting.cancel(&mut self.ops());
    }
  }
}
