//! Type-erased channel operations driven by the wait engines.
//!
//! An `Operation` is one send or receive on one channel together with the
//! handler that turns its outcome into the caller's result type. Plain
//! `send`/`recv` calls are a single operation with an identity handler; a
//! `Select` is a list of them.

use std::sync::Arc;

use crate::channel::shared::{Chan, Entry, Packet};
use crate::error::{SendError, TryRecvError, TrySendError};
use crate::internal::waiter::WaitContext;

pub(crate) trait Operation<R> {
  /// Attempts the operation without blocking. `None` means it would block.
  fn try_complete(&mut self) -> Option<R>;

  /// Enqueues a wait-set entry owned by `cx` under case index `case`.
  ///
  /// Returns `true`, without registering, if the operation turned out to be
  /// ready; the caller aborts its context and retries.
  fn register(&mut self, cx: &Arc<WaitContext>, case: usize) -> bool;

  /// Removes the entries owned by `cx`. Only called for cases that were not selected.
  fn unregister(&mut self, cx: &Arc<WaitContext>);

  /// Produces the result after a counterpart selected this case.
  fn complete(&mut self) -> R;

  /// Called instead of `complete` when the owner was cancelled after this
  /// case had already been selected.
  fn abandon(&mut self);
}

#[inline]
pub(crate) fn identity<T>(value: T) -> T {
  value
}

// --- Receive ---

pub(crate) struct RecvArm<T, F> {
  chan: Arc<Chan<T>>,
  packet: Option<Arc<Packet<T>>>,
  handler: Option<F>,
}

impl<T, F> RecvArm<T, F> {
  pub(crate) fn new(chan: Arc<Chan<T>>, handler: F) -> Self {
    Self {
      chan,
      packet: None,
      handler: Some(handler),
    }
  }

  fn finish<R>(&mut self, item: Option<T>) -> R
  where
    F: FnOnce(Option<T>) -> R,
  {
    let handler = self
      .handler
      .take()
      .expect("a select case must complete at most once");
    handler(item)
  }
}

impl<T, R, F> Operation<R> for RecvArm<T, F>
where
  F: FnOnce(Option<T>) -> R,
{
  fn try_complete(&mut self) -> Option<R> {
    let item = match self.chan.try_recv() {
      Ok(item) => Some(item),
      Err(TryRecvError::Closed) => None,
      Err(TryRecvError::Empty) => return None,
    };
    Some(self.finish(item))
  }

  fn register(&mut self, cx: &Arc<WaitContext>, case: usize) -> bool {
    let mut state = self.chan.lock();
    if state.recv_ready(cx) {
      return true;
    }
    let packet = Packet::new(None);
    state.receivers.push_back(Entry {
      cx: Arc::clone(cx),
      case,
      packet: Arc::clone(&packet),
    });
    self.packet = Some(packet);
    false
  }

  fn unregister(&mut self, cx: &Arc<WaitContext>) {
    self.chan.lock().unregister_receiver(cx);
    self.packet = None;
  }

  fn complete(&mut self) -> R {
    let item = {
      // Taking the lock orders this read after the claimer's write.
      let _state = self.chan.lock();
      self.packet.take().and_then(|packet| packet.take())
    };
    // An empty packet means the channel was closed while we waited.
    self.finish(item)
  }

  fn abandon(&mut self) {
    let mut state = self.chan.lock();
    if let Some(item) = self.packet.take().and_then(|packet| packet.take()) {
      state.restore(item);
    }
  }
}

// --- Send ---

pub(crate) struct SendArm<T, F> {
  chan: Arc<Chan<T>>,
  item: Option<T>,
  packet: Option<Arc<Packet<T>>>,
  handler: Option<F>,
}

impl<T, F> SendArm<T, F> {
  pub(crate) fn new(chan: Arc<Chan<T>>, item: T, handler: F) -> Self {
    Self {
      chan,
      item: Some(item),
      packet: None,
      handler: Some(handler),
    }
  }

  /// Takes back the item after the operation gave up (timeout).
  pub(crate) fn take_item(&mut self) -> Option<T> {
    self.item.take()
  }

  fn finish<R>(&mut self, outcome: Result<(), SendError<T>>) -> R
  where
    F: FnOnce(Result<(), SendError<T>>) -> R,
  {
    let handler = self
      .handler
      .take()
      .expect("a select case must complete at most once");
    handler(outcome)
  }
}

impl<T, R, F> Operation<R> for SendArm<T, F>
where
  F: FnOnce(Result<(), SendError<T>>) -> R,
{
  fn try_complete(&mut self) -> Option<R> {
    let item = self.item.take()?;
    match self.chan.try_send(item) {
      Ok(()) => Some(self.finish(Ok(()))),
      Err(TrySendError::Closed(item)) => Some(self.finish(Err(SendError(item)))),
      Err(TrySendError::Full(item)) => {
        self.item = Some(item);
        None
      }
    }
  }

  fn register(&mut self, cx: &Arc<WaitContext>, case: usize) -> bool {
    let mut state = self.chan.lock();
    if state.send_ready(cx, self.chan.capacity()) {
      return true;
    }
    // The item travels with the entry so a receiver can take it directly.
    let packet = Packet::new(self.item.take());
    state.senders.push_back(Entry {
      cx: Arc::clone(cx),
      case,
      packet: Arc::clone(&packet),
    });
    self.packet = Some(packet);
    false
  }

  fn unregister(&mut self, cx: &Arc<WaitContext>) {
    self.chan.lock().unregister_sender(cx);
    if let Some(item) = self.packet.take().and_then(|packet| packet.take()) {
      self.item = Some(item);
    }
  }

  fn complete(&mut self) -> R {
    let leftover = {
      let _state = self.chan.lock();
      self.packet.take().and_then(|packet| packet.take())
    };
    // A receiver empties the packet; close leaves the item in it.
    match leftover {
      None => self.finish(Ok(())),
      Some(item) => self.finish(Err(SendError(item))),
    }
  }

  fn abandon(&mut self) {
    // Either delivered already, or rejected by close; nothing to hand back.
    self.packet = None;
  }
}
