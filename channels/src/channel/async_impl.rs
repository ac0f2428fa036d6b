// src/channel/async_impl.rs
//! Implementation of the asynchronous Future-based send and receive logic.

use futures_core::Stream;

use super::shared::Chan;
use super::Receiver;
use crate::error::SendError;
use crate::select::{identity, Operation, RecvArm, SendArm, Waiting};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

type SendOutcome<T> = Result<(), SendError<T>>;
type SendHandler<T> = fn(SendOutcome<T>) -> SendOutcome<T>;
type RecvHandler<T> = fn(Option<T>) -> Option<T>;

// --- SendFuture ---

/// A future that completes when a value has been handed to the channel.
///
/// On a rendezvous channel that means a receiver took it; on a buffered
/// channel that it was enqueued. Resolves to `Err(SendError(v))` if the
/// channel is or becomes closed first. Dropping the future before it
/// completes withdraws the value.
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct SendFuture<T> {
  arm: SendArm<T, SendHandler<T>>,
  waiting: Waiting,
}

impl<T> fmt::Debug for SendFuture<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SendFuture")
      .field("waiting", &self.waiting)
      .finish_non_exhaustive()
  }
}

// The item is only ever moved, never pinned in place.
impl<T> Unpin for SendFuture<T> {}

impl<T: Send> SendFuture<T> {
  pub(super) fn new(chan: &Arc<Chan<T>>, item: T) -> Self {
    Self {
      arm: SendArm::new(Arc::clone(chan), item, identity as SendHandler<T>),
      waiting: Waiting::new(),
    }
  }
}

impl<T: Send> Future for SendFuture<T> {
  type Output = Result<(), SendError<T>>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    let mut ops: [&mut dyn Operation<SendOutcome<T>>; 1] = [&mut this.arm];
    this.waiting.poll(&mut ops, cx)
  }
}

impl<T> Drop for SendFuture<T> {
  fn drop(&mut self) {
    if self.waiting.is_registered() {
      let mut ops: [&mut dyn Operation<SendOutcome<T>>; 1] = [&mut self.arm];
      self.waiting.cancel(&mut ops);
    }
  }
}

// --- RecvFuture ---

/// A future that resolves to the next element, or `None` once the channel is
/// closed and drained.
///
/// Dropping the future after a sender already handed it an element puts that
/// element back at the head of the channel, so nothing is lost to
/// cancellation.
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct RecvFuture<T> {
  arm: RecvArm<T, RecvHandler<T>>,
  waiting: Waiting,
}

impl<T> fmt::Debug for RecvFuture<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RecvFuture")
      .field("waiting", &self.waiting)
      .finish_non_exhaustive()
  }
}

impl<T: Send> RecvFuture<T> {
  pub(super) fn new(chan: &Arc<Chan<T>>) -> Self {
    Self {
      arm: RecvArm::new(Arc::clone(chan), identity as RecvHandler<T>),
      waiting: Waiting::new(),
    }
  }
}

impl<T: Send> Future for RecvFuture<T> {
  type Output = Option<T>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    let mut ops: [&mut dyn Operation<Option<T>>; 1] = [&mut this.arm];
    this.waiting.poll(&mut ops, cx)
  }
}

impl<T> Drop for RecvFuture<T> {
  fn drop(&mut self) {
    if self.waiting.is_registered() {
      let mut ops: [&mut dyn Operation<Option<T>>; 1] = [&mut self.arm];
      self.waiting.cancel(&mut ops);
    }
  }
}

// --- RecvStream ---

/// A [`Stream`] of a channel's elements, ending when the channel is closed and
/// drained. Created by [`Receiver::into_stream`].
#[must_use = "streams do nothing unless polled"]
pub struct RecvStream<T> {
  receiver: Receiver<T>,
  pending: Option<RecvFuture<T>>,
}

impl<T: Send> fmt::Debug for RecvStream<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RecvStream")
      .field("receiver", &self.receiver)
      .field("pending", &self.pending.is_some())
      .finish()
  }
}

impl<T: Send> RecvStream<T> {
  pub(super) fn new(receiver: Receiver<T>) -> Self {
    Self {
      receiver,
      pending: None,
    }
  }

  /// Returns the receiver this stream reads from.
  pub fn into_inner(self) -> Receiver<T> {
    self.receiver
  }
}

impl<T: Send> Stream for RecvStream<T> {
  type Item = T;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this = self.get_mut();
    let chan = &this.receiver.chan;
    let future = this.pending.get_or_insert_with(|| RecvFuture::new(chan));
    match Pin::new(future).poll(cx) {
      Poll::Ready(item) => {
        this.pending = None;
        Poll::Ready(item)
      }
      Poll::Pending => Poll::Pending,
    }
  }
}
