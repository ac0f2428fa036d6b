// src/channel/view.rs

//! Send-only and receive-only views over a channel.

use super::async_impl::{RecvFuture, RecvStream, SendFuture};
use super::sealed::Endpoint;
use super::shared::Chan;
use super::{capacity_of, is_full, sync_impl, RecvHandle, SendHandle};
use crate::error::{
  CloseError, RecvTimeoutError, SendError, SendTimeoutError, TryRecvError, TrySendError,
};

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

// --- Sender ---

/// The send-only view of a channel.
///
/// A `Sender` can send and close, and can inspect the channel, but offers no
/// way to receive.
pub struct Sender<T> {
  chan: Arc<Chan<T>>,
}

impl<T> Clone for Sender<T> {
  fn clone(&self) -> Self {
    Sender {
      chan: Arc::clone(&self.chan),
    }
  }
}

impl<T> fmt::Debug for Sender<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Sender").field(&self.chan).finish()
  }
}

impl<T> Endpoint<T> for Sender<T> {
  #[inline]
  fn chan(&self) -> &Arc<Chan<T>> {
    &self.chan
  }
}
impl<T> SendHandle<T> for Sender<T> {}

impl<T: Send> Sender<T> {
  pub(super) fn new(chan: Arc<Chan<T>>) -> Self {
    Sender { chan }
  }

  /// Sends a value, suspending the task until it is buffered or taken.
  /// Resolves to `Err(SendError(value))` if the channel is closed first.
  pub fn send(&self, item: T) -> SendFuture<T> {
    SendFuture::new(&self.chan, item)
  }

  /// Sends a value, blocking the current thread until it is buffered or taken.
  pub fn send_blocking(&self, item: T) -> Result<(), SendError<T>> {
    sync_impl::send_blocking(&self.chan, item)
  }

  /// Like [`send_blocking`](Self::send_blocking), giving up after `timeout`.
  pub fn send_timeout(&self, item: T, timeout: Duration) -> Result<(), SendTimeoutError<T>> {
    sync_impl::send_sync(&self.chan, item, Instant::now().checked_add(timeout))
  }

  pub fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
    self.chan.try_send(item)
  }

  /// Closes the channel. See [`Channel::close`](super::Channel::close).
  pub fn close(&self) -> Result<(), CloseError> {
    self.chan.close()
  }

  pub fn is_closed(&self) -> bool {
    self.chan.is_closed()
  }

  pub fn capacity(&self) -> Option<usize> {
    capacity_of(&self.chan)
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.chan.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  #[inline]
  pub fn is_full(&self) -> bool {
    is_full(&self.chan)
  }

  /// Returns `true` if both handles refer to the same channel.
  pub fn same_channel(&self, other: &Sender<T>) -> bool {
    Arc::ptr_eq(&self.chan, &other.chan)
  }
}

// --- Receiver ---

/// The receive-only view of a channel.
///
/// A `Receiver` can receive and inspect the channel. It cannot send, and it
/// cannot close the channel: closing is the producing side's decision.
pub struct Receiver<T> {
  pub(super) chan: Arc<Chan<T>>,
}

impl<T> Clone for Receiver<T> {
  fn clone(&self) -> Self {
    Receiver {
      chan: Arc::clone(&self.chan),
    }
  }
}

impl<T> fmt::Debug for Receiver<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Receiver").field(&self.chan).finish()
  }
}

impl<T> Endpoint<T> for Receiver<T> {
  #[inline]
  fn chan(&self) -> &Arc<Chan<T>> {
    &self.chan
  }
}
impl<T> RecvHandle<T> for Receiver<T> {}

impl<T: Send> Receiver<T> {
  pub(super) fn new(chan: Arc<Chan<T>>) -> Self {
    Receiver { chan }
  }

  /// Receives the next value, suspending the task until one is available.
  /// Resolves to `None` once the channel is closed and drained.
  pub fn recv(&self) -> RecvFuture<T> {
    RecvFuture::new(&self.chan)
  }

  /// Receives the next value, blocking the current thread until one is
  /// available. Returns `None` once the channel is closed and drained.
  pub fn recv_blocking(&self) -> Option<T> {
    sync_impl::recv_blocking(&self.chan)
  }

  /// Like [`recv_blocking`](Self::recv_blocking), giving up after `timeout`.
  pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
    sync_impl::recv_sync(&self.chan, Instant::now().checked_add(timeout))?.ok_or(RecvTimeoutError::Closed)
  }

  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    self.chan.try_recv()
  }

  /// A blocking iterator over received values. It ends when the channel is
  /// closed and drained.
  pub fn iter(&self) -> Iter<'_, T> {
    Iter { receiver: self }
  }

  /// A non-blocking iterator over the values that are available right now.
  pub fn try_iter(&self) -> TryIter<'_, T> {
    TryIter { receiver: self }
  }

  /// Converts this receiver into a [`Stream`](futures_core::Stream) of values.
  pub fn into_stream(self) -> RecvStream<T> {
    RecvStream::new(self)
  }

  pub fn is_closed(&self) -> bool {
    self.chan.is_closed()
  }

  pub fn capacity(&self) -> Option<usize> {
    capacity_of(&self.chan)
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.chan.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  #[inline]
  pub fn is_full(&self) -> bool {
    is_full(&self.chan)
  }

  /// Returns `true` if both handles refer to the same channel.
  pub fn same_channel(&self, other: &Receiver<T>) -> bool {
    Arc::ptr_eq(&self.chan, &other.chan)
  }
}

// --- Iterators ---

/// Blocking iterator returned by [`Receiver::iter`].
#[derive(Debug)]
pub struct Iter<'a, T> {
  receiver: &'a Receiver<T>,
}

impl<T: Send> Iterator for Iter<'_, T> {
  type Item = T;

  fn next(&mut self) -> Option<T> {
    self.receiver.recv_blocking()
  }
}

/// Non-blocking iterator returned by [`Receiver::try_iter`].
#[derive(Debug)]
pub struct TryIter<'a, T> {
  receiver: &'a Receiver<T>,
}

impl<T: Send> Iterator for TryIter<'_, T> {
  type Item = T;

  fn next(&mut self) -> Option<T> {
    self.receiver.try_recv().ok()
  }
}

/// Owning blocking iterator, from `Receiver`'s `IntoIterator` impl.
#[derive(Debug)]
pub struct IntoIter<T> {
  receiver: Receiver<T>,
}

impl<T: Send> Iterator for IntoIter<T> {
  type Item = T;

  fn next(&mut self) -> Option<T> {
    self.receiver.recv_blocking()
  }
}

impl<T: Send> IntoIterator for Receiver<T> {
  type Item = T;
  type IntoIter = IntoIter<T>;

  fn into_iter(self) -> IntoIter<T> {
    IntoIter { receiver: self }
  }
}

impl<'a, T: Send> IntoIterator for &'a Receiver<T> {
  type Item = T;
  type IntoIter = Iter<'a, T>;

  fn into_iter(self) -> Iter<'a, T> {
    self.iter()
  }
}
