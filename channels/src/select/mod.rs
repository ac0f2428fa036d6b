// src/select/mod.rs

//! Multiplexed waiting over several channel operations.
//!
//! A [`Select`] is built from cases, each pairing one channel operation with a
//! handler. Every handler returns the same type `R`, so the value produced by
//! the select both identifies the case that fired and carries whatever that
//! case received.
//!
//! Resolution rules:
//!
//! - All cases are tried once, in a fresh random order. The first ready case
//!   runs. When several are ready the choice is uniform among them.
//! - If none is ready and a [`default`](Select::default) handler is present,
//!   it runs immediately.
//! - Otherwise the caller waits until some case fires. With a
//!   [`timeout`](Select::timeout), the timeout handler runs once the duration
//!   has elapsed with no case firing. It never runs early.
//!
//! A receive case is ready when an element is queued, a sender is blocked on
//! a rendezvous channel, or the channel is closed (the handler then gets
//! `None`). A send case is ready when there is room, a receiver is blocked,
//! or the channel is closed (the handler then gets the value back inside a
//! [`SendError`]).
//!
//! ```no_run
//! use conduit::{Channel, Select};
//! use std::time::Duration;
//!
//! enum Event {
//!   Job(Option<u32>),
//!   Stop,
//!   Idle,
//! }
//!
//! let jobs = Channel::<u32>::new(8);
//! let stop = Channel::<()>::rendezvous();
//!
//! let event = Select::new()
//!   .recv(&jobs, Event::Job)
//!   .recv(&stop, |_| Event::Stop)
//!   .timeout(Duration::from_millis(100), || Event::Idle)
//!   .wait();
//! # let _ = event;
//! ```

mod arm;
mod engine;
mod future;

pub(crate) use arm::{identity, Operation, RecvArm, SendArm};
pub(crate) use engine::{attempt, wait_blocking, Waiting};
pub use future::SelectFuture;

use std::fmt;
use std::time::{Duration, Instant};

use crate::channel::{RecvHandle, SendHandle};
use crate::error::SendError;

type Handler<'a, R> = Box<dyn FnOnce() -> R + Send + 'a>;
type Case<'a, R> = Box<dyn Operation<R> + Send + 'a>;

/// A builder for a one-shot multiplexed wait. See the [module docs](self).
pub struct Select<'a, R> {
  cases: Vec<Case<'a, R>>,
  default: Option<Handler<'a, R>>,
  timeout: Option<(Duration, Handler<'a, R>)>,
}

impl<R> fmt::Debug for Select<'_, R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Select")
      .field("cases", &self.cases.len())
      .field("has_default", &self.default.is_some())
      .field("timeout", &self.timeout.as_ref().map(|(after, _)| *after))
      .finish()
  }
}

impl<'a, R> Default for Select<'a, R> {
  fn default() -> Self {
    Self::new()
  }
}

impl<'a, R> Select<'a, R> {
  /// Creates a select with no cases.
  pub fn new() -> Self {
    Select {
      cases: Vec::new(),
      default: None,
      timeout: None,
    }
  }

  /// Adds a receive case. `handler` gets `Some(item)`, or `None` if the
  /// channel is closed and drained.
  pub fn recv<T, H, F>(mut self, channel: &H, handler: F) -> Self
  where
    T: Send + 'a,
    H: RecvHandle<T>,
    F: FnOnce(Option<T>) -> R + Send + 'a,
  {
    let chan = channel.chan().clone();
    self.cases.push(Box::new(RecvArm::new(chan, handler)));
    self
  }

  /// Adds a send case offering `item`. `handler` gets `Ok(())` once the item
  /// was delivered, or the item back if the channel is closed. If another
  /// case fires, the item is dropped with the select.
  pub fn send<T, H, F>(mut self, channel: &H, item: T, handler: F) -> Self
  where
    T: Send + 'a,
    H: SendHandle<T>,
    F: FnOnce(Result<(), SendError<T>>) -> R + Send + 'a,
  {
    let chan = channel.chan().clone();
    self.cases.push(Box::new(SendArm::new(chan, item, handler)));
    self
  }

  /// Makes the select non-blocking: `handler` runs if no case is ready.
  ///
  /// A default takes precedence over a timeout.
  pub fn default<F>(mut self, handler: F) -> Self
  where
    F: FnOnce() -> R + Send + 'a,
  {
    self.default = Some(Box::new(handler));
    self
  }

  /// Bounds the wait: `handler` runs once `after` has elapsed with no case firing.
  pub fn timeout<F>(mut self, after: Duration, handler: F) -> Self
  where
    F: FnOnce() -> R + Send + 'a,
  {
    self.timeout = Some((after, Box::new(handler)));
    self
  }

  /// Number of channel cases (default and timeout not counted).
  pub fn len(&self) -> usize {
    self.cases.len()
  }

  /// Returns `true` if no channel case was added.
  pub fn is_empty(&self) -> bool {
    self.cases.is_empty()
  }

  /// Runs the select, blocking the current thread.
  ///
  /// With no cases, no default and no timeout, this blocks forever.
  pub fn wait(mut self) -> R {
    let mut ops: Vec<&mut dyn Operation<R>> = self
      .cases
      .iter_mut()
      .map(|case| case.as_mut() as &mut dyn Operation<R>)
      .collect();

    if let Some(default) = self.default {
      return match attempt(&mut ops) {
        Some(result) => result,
        None => default(),
      };
    }

    match self.timeout {
      None => loop {
        if let Some(result) = wait_blocking(&mut ops, None) {
          return result;
        }
      },
      Some((after, on_timeout)) => match Instant::now().checked_add(after) {
        Some(deadline) => match wait_blocking(&mut ops, Some(deadline)) {
          Some(result) => result,
          None => on_timeout(),
        },
        // Too far out to represent: the timeout can never fire.
        None => loop {
          if let Some(result) = wait_blocking(&mut ops, None) {
            return result;
          }
        },
      },
    }
  }

  /// Runs the select as a future, suspending the task rather than the thread.
  ///
  /// The timeout, if any, starts counting now. Dropping the future cancels the
  /// select; an element already handed to a receive case is given back to its
  /// channel.
  pub fn run(self) -> SelectFuture<'a, R> {
    SelectFuture::new(self.cases, self.default, self.timeout)
  }
}
