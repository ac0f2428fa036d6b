//! The wait engines: one that parks the current thread and one that is polled
//! by a future. Both follow the same three phases.
//!
//! 1.  **Attempt**: try every operation once, in a fresh random order, and
//!     complete the first that does not block.
//! 2.  **Register**: create a wait context and enqueue an entry for every
//!     operation. If registration finds an operation that became ready in the
//!     meantime, abort the context, withdraw the entries and go back to 1.
//! 3.  **Wait**: sleep until a counterpart selects one case (or the deadline
//!     passes and the owner manages to abort), withdraw the other entries and
//!     produce the selected case's result.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use rand::seq::SliceRandom;

use super::arm::Operation;
use crate::internal::backoff;
use crate::internal::waiter::{Selection, WaitContext};

/// Operations of one wait, in the order they were tried and registered.
struct Order {
  indices: Vec<usize>,
  registered: usize,
}

impl Order {
  fn new(len: usize) -> Self {
    Self {
      indices: (0..len).collect(),
      registered: 0,
    }
  }

  /// Reshuffles for a new round. A uniform permutation makes the first ready
  /// operation uniform over the ready set.
  fn shuffle(&mut self) {
    self.registered = 0;
    if self.indices.len() > 1 {
      self.indices.shuffle(&mut rand::rng());
    }
  }

  fn attempt<R>(&self, ops: &mut [&mut dyn Operation<R>]) -> Option<R> {
    self.indices.iter().find_map(|&index| ops[index].try_complete())
  }

  /// Registers every operation under `cx`. Returns `false` if one was found
  /// ready, in which case only the ones before it are registered.
  fn register<R>(&mut self, ops: &mut [&mut dyn Operation<R>], cx: &Arc<WaitContext>) -> bool {
    for (position, &index) in self.indices.iter().enumerate() {
      if ops[index].register(cx, index) {
        self.registered = position;
        return false;
      }
    }
    self.registered = self.indices.len();
    true
  }

  fn unregister_except<R>(
    &mut self,
    ops: &mut [&mut dyn Operation<R>],
    cx: &Arc<WaitContext>,
    selected: Option<usize>,
  ) {
    for &index in &self.indices[..self.registered] {
      if Some(index) != selected {
        ops[index].unregister(cx);
      }
    }
    self.registered = 0;
  }

  /// Withdraws the losing entries and completes the selected case.
  fn finish<R>(&mut self, ops: &mut [&mut dyn Operation<R>], cx: &Arc<WaitContext>, index: usize) -> R {
    self.unregister_except(ops, cx, Some(index));
    ops[index].complete()
  }

  /// Gives up on `cx`. If a counterpart won the race, its case completes instead.
  fn abort<R>(&mut self, ops: &mut [&mut dyn Operation<R>], cx: &Arc<WaitContext>) -> Option<R> {
    match cx.try_select(Selection::Aborted) {
      Err(Selection::Case(index)) => Some(self.finish(ops, cx, index)),
      Ok(()) | Err(Selection::Aborted) => {
        self.unregister_except(ops, cx, None);
        None
      }
    }
  }
}

/// Completes exactly one of `ops` without blocking, if any is ready.
pub(crate) fn attempt<R>(ops: &mut [&mut dyn Operation<R>]) -> Option<R> {
  let mut order = Order::new(ops.len());
  order.shuffle();
  order.attempt(ops)
}

/// Blocks the current thread until one of `ops` completes, or until
/// `deadline` passes (`None` is returned then). An empty `ops` with no
/// deadline blocks forever.
pub(crate) fn wait_blocking<R>(ops: &mut [&mut dyn Operation<R>], deadline: Option<Instant>) -> Option<R> {
  let mut order = Order::new(ops.len());
  loop {
    // --- Phase 1: Attempt without parking ---
    order.shuffle();
    if let Some(result) = order.attempt(ops) {
      return Some(result);
    }
    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
      return None;
    }

    // --- Phase 2: Register, re-checking readiness under each channel lock ---
    let cx = WaitContext::for_current_thread();
    if !order.register(ops, &cx) {
      match order.abort(ops, &cx) {
        Some(result) => return Some(result),
        None => continue,
      }
    }

    // --- Phase 3: Wait ---
    let decided = backoff::adaptive_wait(|| !cx.is_waiting(), deadline);
    if !decided {
      // Deadline passed. A counterpart may still win the race to the token.
      return order.abort(ops, &cx);
    }
    match cx.selected() {
      Some(Selection::Case(index)) => return Some(order.finish(ops, &cx, index)),
      // Only the owner aborts, and it has not.
      Some(Selection::Aborted) | None => continue,
    }
  }
}

/// Poll-driven counterpart of [`wait_blocking`], kept inside a future.
#[derive(Debug)]
pub(crate) struct Waiting {
  cx: Option<Arc<WaitContext>>,
  order_indices: Vec<usize>,
  registered: usize,
}

impl Waiting {
  pub(crate) fn new() -> Self {
    Self {
      cx: None,
      order_indices: Vec::new(),
      registered: 0,
    }
  }

  /// Whether entries are currently enqueued on behalf of this wait.
  pub(crate) fn is_registered(&self) -> bool {
    self.cx.is_some()
  }

  fn take_order(&mut self, len: usize) -> Order {
    let mut indices = std::mem::take(&mut self.order_indices);
    if indices.len() != len {
      indices = (0..len).collect();
    }
    Order {
      indices,
      registered: self.registered,
    }
  }

  fn store_order(&mut self, order: Order) {
    self.order_indices = order.indices;
    self.registered = order.registered;
  }

  /// Drives the operations; `Ready` carries the completed case's result.
  pub(crate) fn poll<R>(&mut self, ops: &mut [&mut dyn Operation<R>], task: &mut Context<'_>) -> Poll<R> {
    let mut order = self.take_order(ops.len());
    let result = self.poll_inner(&mut order, ops, task);
    self.store_order(order);
    result
  }

  fn poll_inner<R>(
    &mut self,
    order: &mut Order,
    ops: &mut [&mut dyn Operation<R>],
    task: &mut Context<'_>,
  ) -> Poll<R> {
    loop {
      if let Some(cx) = self.cx.clone() {
        match cx.selected() {
          Some(Selection::Case(index)) => {
            self.cx = None;
            return Poll::Ready(order.finish(ops, &cx, index));
          }
          Some(Selection::Aborted) => {
            order.unregister_except(ops, &cx, None);
            self.cx = None;
          }
          None => {
            cx.register_waker(task.waker());
            // Re-check: a counterpart may have selected us before the new waker was stored.
            if cx.is_waiting() {
              return Poll::Pending;
            }
            continue;
          }
        }
      }

      order.shuffle();
      if let Some(result) = order.attempt(ops) {
        return Poll::Ready(result);
      }

      let cx = WaitContext::for_task(task.waker());
      if !order.register(ops, &cx) {
        match order.abort(ops, &cx) {
          Some(result) => return Poll::Ready(result),
          None => continue,
        }
      }
      self.cx = Some(cx);
      return Poll::Pending;
    }
  }

  /// Gives up a registered wait (timeout). Returns the result of a case that
  /// won the race against the abort, if any.
  pub(crate) fn abort<R>(&mut self, ops: &mut [&mut dyn Operation<R>]) -> Option<R> {
    let cx = self.cx.take()?;
    let mut order = self.take_order(ops.len());
    let result = order.abort(ops, &cx);
    self.store_order(order);
    result
  }

  /// Tears down a registered wait whose future is being dropped. A case that
  /// was already selected is abandoned, which hands any received item back to
  /// its channel.
  pub(crate) fn cancel<R>(&mut self, ops: &mut [&mut dyn Operation<R>]) {
    let Some(cx) = self.cx.take() else {
      return;
    };
    let mut order = self.take_order(ops.len());
    match cx.try_select(Selection::Aborted) {
      Err(Selection::Case(index)) => {
        order.unregister_except(ops, &cx, Some(index));
        ops[index].abandon();
      }
      Ok(()) | Err(Selection::Aborted) => order.unregister_except(ops, &cx, None),
    }
    self.store_order(order);
  }
}
