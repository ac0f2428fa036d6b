// src/channel/mod.rs

//! A bounded, closable MPMC channel with Go-style semantics.
//!
//! A [`Channel`] is a typed FIFO queue with a fixed capacity chosen at
//! creation. Capacity `0` makes a *rendezvous* channel: a send completes only
//! when a receiver takes the value, and both sides complete together. Any
//! other capacity buffers up to that many elements before senders wait.
//!
//! ### Close and drain
//!
//! A channel is closed explicitly, exactly once, with [`Channel::close`]
//! (or [`Sender::close`]). Dropping handles never closes it. After close:
//!
//! - every pending and future send fails with [`SendError`], which hands the
//!   value back;
//! - receivers keep draining the buffered elements in order, and only then
//!   observe `None`;
//! - a second `close` fails with [`CloseError`].
//!
//! ### Directional views
//!
//! [`Sender`] and [`Receiver`] are send-only and receive-only handles over the
//! same channel. Hand a component the view it needs and the other direction is
//! simply not available to it. All handles are cheap to clone and share
//! ownership of the channel.
//!
//! ### Sync and async
//!
//! Every blocking operation exists twice: `send`/`recv` return futures that
//! suspend only the calling task, while `send_blocking`/`recv_blocking` park
//! the calling thread. Both kinds can wait on the same channel at the same
//! time. Waiters of either kind are served in arrival order.

mod async_impl;
pub(crate) mod shared;
mod sync_impl;
mod view;

pub use async_impl::{RecvFuture, RecvStream, SendFuture};
pub use view::{IntoIter, Iter, Receiver, Sender, TryIter};

use self::shared::Chan;
use crate::error::{
  CloseError, RecvTimeoutError, SendError, SendTimeoutError, TryRecvError, TrySendError,
};

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub(crate) mod sealed {
  use super::shared::Chan;
  use std::sync::Arc;

  /// Access to the shared core behind a handle. Not implementable outside the crate.
  pub trait Endpoint<T> {
    fn chan(&self) -> &Arc<Chan<T>>;
  }
}

/// A handle that can receive: [`Channel`] or [`Receiver`]. Used by
/// [`Select::recv`](crate::Select::recv).
pub trait RecvHandle<T>: sealed::Endpoint<T> {}

/// A handle that can send: [`Channel`] or [`Sender`]. Used by
/// [`Select::send`](crate::Select::send).
pub trait SendHandle<T>: sealed::Endpoint<T> {}

// --- Public Structs ---

/// A bidirectional handle to a channel.
///
/// Cloning a `Channel` creates another handle to the same channel.
pub struct Channel<T> {
  chan: Arc<Chan<T>>,
}

// --- Channel Constructors ---

/// Creates a channel with the given capacity and returns its two directional views.
///
/// A capacity of `0` creates a rendezvous channel.
pub fn bounded<T: Send>(capacity: usize) -> (Sender<T>, Receiver<T>) {
  Channel::new(capacity).split()
}

/// Creates a rendezvous (capacity `0`) channel and returns its two directional views.
pub fn rendezvous<T: Send>() -> (Sender<T>, Receiver<T>) {
  bounded(0)
}

/// Creates an "unbounded" channel and returns its two directional views.
///
/// In reality, the channel is bounded by available memory.
pub fn unbounded<T: Send>() -> (Sender<T>, Receiver<T>) {
  bounded(usize::MAX)
}

// --- Trait Implementations for Public Structs ---

impl<T> Clone for Channel<T> {
  fn clone(&self) -> Self {
    Channel {
      chan: Arc::clone(&self.chan),
    }
  }
}

impl<T> fmt::Debug for Channel<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Channel").field(&self.chan).finish()
  }
}

impl<T> sealed::Endpoint<T> for Channel<T> {
  #[inline]
  fn chan(&self) -> &Arc<Chan<T>> {
    &self.chan
  }
}
impl<T> RecvHandle<T> for Channel<T> {}
impl<T> SendHandle<T> for Channel<T> {}

// --- Public API Method Implementations ---

impl<T: Send> Channel<T> {
  /// Creates a channel that buffers up to `capacity` elements.
  ///
  /// A capacity of `0` creates a rendezvous channel, where a send waits until
  /// a receive is ready to take the value.
  pub fn new(capacity: usize) -> Self {
    Channel {
      chan: Arc::new(Chan::new(capacity)),
    }
  }

  /// Creates a rendezvous (capacity `0`) channel.
  pub fn rendezvous() -> Self {
    Self::new(0)
  }

  /// Creates an "unbounded" channel. In reality, it is bounded by available memory.
  pub fn unbounded() -> Self {
    Self::new(usize::MAX)
  }

  /// Returns a send-only view of this channel.
  pub fn sender(&self) -> Sender<T> {
    Sender::new(Arc::clone(&self.chan))
  }

  /// Returns a receive-only view of this channel.
  pub fn receiver(&self) -> Receiver<T> {
    Receiver::new(Arc::clone(&self.chan))
  }

  /// Consumes this handle, returning a send-only and a receive-only view.
  pub fn split(self) -> (Sender<T>, Receiver<T>) {
    (Sender::new(Arc::clone(&self.chan)), Receiver::new(self.chan))
  }

  /// Sends a value, suspending the task until it is buffered or taken by a
  /// receiver.
  ///
  /// # Errors
  ///
  /// The future resolves to `Err(SendError(value))` if the channel is closed
  /// before the value could be handed over.
  pub fn send(&self, item: T) -> SendFuture<T> {
    SendFuture::new(&self.chan, item)
  }

  /// Sends a value, blocking the current thread until it is buffered or taken
  /// by a receiver.
  pub fn send_blocking(&self, item: T) -> Result<(), SendError<T>> {
    sync_impl::send_blocking(&self.chan, item)
  }

  /// Like [`send_blocking`](Self::send_blocking), giving up after `timeout`.
  pub fn send_timeout(&self, item: T, timeout: Duration) -> Result<(), SendTimeoutError<T>> {
    sync_impl::send_sync(&self.chan, item, Instant::now().checked_add(timeout))
  }

  /// Attempts to send a value without waiting.
  pub fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
    self.chan.try_send(item)
  }

  /// Receives the next value, suspending the task until one is available.
  ///
  /// Resolves to `None` once the channel is closed and every buffered value
  /// has been received.
  pub fn recv(&self) -> RecvFuture<T> {
    RecvFuture::new(&self.chan)
  }

  /// Receives the next value, blocking the current thread until one is
  /// available. Returns `None` once the channel is closed and drained.
  pub fn recv_blocking(&self) -> Option<T> {
    sync_impl::recv_blocking(&self.chan)
  }

  /// Like [`recv_blocking`](Self::recv_blocking), giving up after `timeout`.
  ///
  /// # Errors
  ///
  /// - `Err(RecvTimeoutError::Timeout)` if the timeout is reached.
  /// - `Err(RecvTimeoutError::Closed)` if the channel is closed and drained.
  pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
    sync_impl::recv_sync(&self.chan, Instant::now().checked_add(timeout))?.ok_or(RecvTimeoutError::Closed)
  }

  /// Attempts to receive a value without waiting.
  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    self.chan.try_recv()
  }

  /// Closes the channel.
  ///
  /// Wakes every blocked sender (they fail) and every blocked receiver (they
  /// observe the end of the channel). Buffered values remain receivable.
  ///
  /// # Errors
  ///
  /// Returns `Err(CloseError)` if the channel has already been closed.
  pub fn close(&self) -> Result<(), CloseError> {
    self.chan.close()
  }

  /// Returns `true` once the channel has been closed. Buffered values may
  /// still be waiting to be received.
  pub fn is_closed(&self) -> bool {
    self.chan.is_closed()
  }

  /// Returns the capacity of the channel. `None` for unbounded channels.
  pub fn capacity(&self) -> Option<usize> {
    capacity_of(&self.chan)
  }

  /// Returns the number of buffered values. Always 0 for rendezvous channels.
  #[inline]
  pub fn len(&self) -> usize {
    self.chan.len()
  }

  /// Returns `true` if no value is buffered.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns `true` if the buffer is full. Always `true` for rendezvous
  /// channels and always `false` for unbounded ones.
  #[inline]
  pub fn is_full(&self) -> bool {
    is_full(&self.chan)
  }
}

pub(crate) fn capacity_of<T>(chan: &Chan<T>) -> Option<usize> {
  if chan.capacity() == usize::MAX {
    None
  } else {
    Some(chan.capacity())
  }
}

pub(crate) fn is_full<T>(chan: &Chan<T>) -> bool {
  chan.capacity() != usize::MAX && chan.len() >= chan.capacity()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::thread;

  #[test]
  fn views_share_one_channel() {
    let channel = Channel::new(2);
    let tx = channel.sender();
    let rx = channel.receiver();
    tx.try_send(1).unwrap();
    channel.try_send(2).unwrap();
    assert!(channel.is_full());
    assert_eq!(rx.try_recv(), Ok(1));
    assert_eq!(channel.try_recv(), Ok(2));
    assert_eq!(channel.capacity(), Some(2));
    assert_eq!(Channel::<u8>::unbounded().capacity(), None);
  }

  #[test]
  fn blocked_sender_is_released_by_close() {
    let channel = Channel::new(1);
    channel.send_blocking(1).unwrap();
    let tx = channel.sender();
    let handle = thread::spawn(move || tx.send_blocking(2));
    thread::sleep(Duration::from_millis(50));
    assert!(!handle.is_finished());
    channel.close().unwrap();
    let err = handle.join().unwrap().unwrap_err();
    assert_eq!(err.into_inner(), 2);
    assert_eq!(channel.recv_blocking(), Some(1));
    assert_eq!(channel.recv_blocking(), None);
  }

  #[test]
  fn send_timeout_returns_the_value() {
    let channel = Channel::rendezvous();
    match channel.send_timeout("late", Duration::from_millis(20)) {
      Err(SendTimeoutError::Timeout(value)) => assert_eq!(value, "late"),
      other => panic!("expected timeout, got {:?}", other),
    }
    assert!(channel.lock_is_clean());
  }

  impl<T: Send> Channel<T> {
    fn lock_is_clean(&self) -> bool {
      let state = self.chan.lock();
      state.senders.is_empty() && state.receivers.is_empty()
    }
  }
}
