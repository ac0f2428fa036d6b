// src/channel/shared.rs

//! The shared state of a channel and the transitions that mutate it.
//!
//! ### Design Principles:
//!
//! 1.  **Central Mutex**: A `parking_lot::Mutex` guards the buffer, the closed
//!     flag and both wait queues. Every transition happens under it.
//! 2.  **One Wait Queue per Direction**: Blocked senders and blocked receivers
//!     are kept in two FIFO queues. A queue entry points at a shared
//!     [`WaitContext`] so that one blocked thread or task can sit in several
//!     queues at once (that is what `select` does). Thread and task waiters
//!     share the same queues; the context knows how to wake its owner.
//! 3.  **Claim Before Transfer**: A counterpart must win the context's CAS
//!     before it touches the entry's packet. Losing the CAS means the entry is
//!     stale and it is dropped from the queue.
//! 4.  **Senders Carry Their Item**: A blocked sender's packet holds the item.
//!     A receiver on a rendezvous channel takes it directly; a receiver on a
//!     full buffered channel pops the head and moves the first blocked sender's
//!     item to the tail, which keeps both FIFO order and the capacity bound.
//!
//! The owner of a context reads its packet only after locking the channel the
//! selected entry lived in. The claimer writes the packet while holding that
//! same lock, so the owner always observes the completed transfer.

use crate::error::{CloseError, TryRecvError, TrySendError};
use crate::internal::waiter::{Selection, WaitContext};

use parking_lot::{Mutex, MutexGuard};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

// --- Waiter & Data Structs ---

/// Handoff slot between a blocked operation and the counterpart completing it.
///
/// Sender entries start with `Some(item)`; receiver entries start empty.
pub(crate) struct Packet<T> {
  slot: Mutex<Option<T>>,
}

impl<T> Packet<T> {
  pub(crate) fn new(item: Option<T>) -> Arc<Self> {
    Arc::new(Self {
      slot: Mutex::new(item),
    })
  }

  #[inline]
  pub(crate) fn put(&self, item: T) {
    *self.slot.lock() = Some(item);
  }

  #[inline]
  pub(crate) fn take(&self) -> Option<T> {
    self.slot.lock().take()
  }
}

/// An entry in one of the channel's wait queues.
pub(crate) struct Entry<T> {
  pub(crate) cx: Arc<WaitContext>,
  /// Case index this entry was registered under within its context.
  pub(crate) case: usize,
  pub(crate) packet: Arc<Packet<T>>,
}

impl<T> Entry<T> {
  #[inline]
  fn belongs_to(&self, cx: Option<&Arc<WaitContext>>) -> bool {
    cx.is_some_and(|cx| Arc::ptr_eq(&self.cx, cx))
  }
}

/// Removes and returns the first entry whose context could be claimed for it.
///
/// Entries owned by `skip` (the caller's own context) are left in place.
/// Stale entries encountered on the way are discarded.
fn claim<T>(queue: &mut VecDeque<Entry<T>>, skip: Option<&Arc<WaitContext>>) -> Option<Entry<T>> {
  let mut index = 0;
  while index < queue.len() {
    if queue[index].belongs_to(skip) {
      index += 1;
      continue;
    }
    let entry = queue.remove(index)?;
    if entry.cx.try_select(Selection::Case(entry.case)).is_ok() {
      return Some(entry);
    }
  }
  None
}

/// Whether `queue` holds an entry that someone other than `skip` could still claim.
fn has_live<T>(queue: &VecDeque<Entry<T>>, skip: Option<&Arc<WaitContext>>) -> bool {
  queue
    .iter()
    .any(|entry| !entry.belongs_to(skip) && entry.cx.is_waiting())
}

/// The mutex-protected state of a channel.
pub(crate) struct State<T> {
  /// Buffered items, never more than `capacity` of them.
  pub(crate) queue: VecDeque<T>,
  /// Set once by `close`, never cleared.
  pub(crate) closed: bool,
  pub(crate) senders: VecDeque<Entry<T>>,
  pub(crate) receivers: VecDeque<Entry<T>>,
}

impl<T> State<T> {
  /// Takes the next element: the buffer head (refilled from a blocked sender),
  /// or an item handed over by a blocked rendezvous sender.
  pub(crate) fn try_recv(&mut self, capacity: usize) -> Result<T, TryRecvError> {
    if let Some(item) = self.queue.pop_front() {
      // Refill only into a free slot. A restored item can leave the buffer at
      // `capacity + 1`, and on a rendezvous channel there is never a slot.
      if self.queue.len() < capacity {
        if let Some(entry) = claim(&mut self.senders, None) {
          if let Some(refill) = entry.packet.take() {
            self.queue.push_back(refill);
          }
          entry.cx.unpark();
        }
      }
      return Ok(item);
    }

    while let Some(entry) = claim(&mut self.senders, None) {
      let item = entry.packet.take();
      entry.cx.unpark();
      if let Some(item) = item {
        return Ok(item);
      }
    }

    if self.closed {
      Err(TryRecvError::Closed)
    } else {
      Err(TryRecvError::Empty)
    }
  }

  /// Delivers `item` to a blocked receiver, or buffers it if there is room.
  pub(crate) fn try_send(&mut self, item: T, capacity: usize) -> Result<(), TrySendError<T>> {
    if self.closed {
      return Err(TrySendError::Closed(item));
    }

    if let Some(entry) = claim(&mut self.receivers, None) {
      entry.packet.put(item);
      entry.cx.unpark();
      return Ok(());
    }

    if self.queue.len() < capacity {
      self.queue.push_back(item);
      return Ok(());
    }

    Err(TrySendError::Full(item))
  }

  /// Returns an item that was handed to a receiver which then went away
  /// without taking it. It is still the oldest item, so it goes first.
  pub(crate) fn restore(&mut self, item: T) {
    if let Some(entry) = claim(&mut self.receivers, None) {
      entry.packet.put(item);
      entry.cx.unpark();
    } else {
      self.queue.push_front(item);
    }
  }

  /// Whether a receive could complete now for someone other than `cx`.
  pub(crate) fn recv_ready(&self, cx: &Arc<WaitContext>) -> bool {
    !self.queue.is_empty() || self.closed || has_live(&self.senders, Some(cx))
  }

  /// Whether a send could complete now for someone other than `cx`.
  pub(crate) fn send_ready(&self, cx: &Arc<WaitContext>, capacity: usize) -> bool {
    self.closed || self.queue.len() < capacity || has_live(&self.receivers, Some(cx))
  }

  pub(crate) fn unregister_sender(&mut self, cx: &Arc<WaitContext>) {
    self.senders.retain(|entry| !Arc::ptr_eq(&entry.cx, cx));
  }

  pub(crate) fn unregister_receiver(&mut self, cx: &Arc<WaitContext>) {
    self.receivers.retain(|entry| !Arc::ptr_eq(&entry.cx, cx));
  }
}

/// The shared core of a channel, owned jointly by every handle through an `Arc`.
pub struct Chan<T> {
  state: Mutex<State<T>>,
  capacity: usize,
}

impl<T> fmt::Debug for Chan<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state.lock();
    f.debug_struct("Chan")
      .field("capacity", &self.capacity)
      .field("len", &state.queue.len())
      .field("closed", &state.closed)
      .field("blocked_senders", &state.senders.len())
      .field("blocked_receivers", &state.receivers.len())
      .finish()
  }
}

impl<T> Chan<T> {
  pub(crate) fn new(capacity: usize) -> Self {
    Chan {
      state: Mutex::new(State {
        // Unbounded-looking capacities must not preallocate.
        queue: VecDeque::with_capacity(capacity.min(1024)),
        closed: false,
        senders: VecDeque::new(),
        receivers: VecDeque::new(),
      }),
      capacity,
    }
  }

  #[inline]
  pub(crate) fn capacity(&self) -> usize {
    self.capacity
  }

  #[inline]
  pub(crate) fn lock(&self) -> MutexGuard<'_, State<T>> {
    self.state.lock()
  }

  pub(crate) fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
    self.state.lock().try_send(item, self.capacity)
  }

  pub(crate) fn try_recv(&self) -> Result<T, TryRecvError> {
    self.state.lock().try_recv(self.capacity)
  }

  /// Closes the channel and wakes every blocked party.
  ///
  /// Blocked receivers wake with an empty packet (receivers only block on an
  /// empty buffer, so there is nothing left for them). Blocked senders wake
  /// with their item still in the packet and report the closure.
  pub(crate) fn close(&self) -> Result<(), CloseError> {
    let mut woken = Vec::new();
    {
      let mut state = self.state.lock();
      if state.closed {
        return Err(CloseError);
      }
      state.closed = true;
      while let Some(entry) = claim(&mut state.receivers, None) {
        woken.push(entry.cx);
      }
      while let Some(entry) = claim(&mut state.senders, None) {
        woken.push(entry.cx);
      }
      tracing::trace!(
        capacity = self.capacity,
        buffered = state.queue.len(),
        woken = woken.len(),
        "channel closed"
      );
    }
    // Wake waiters outside the lock to reduce contention.
    for cx in woken {
      cx.unpark();
    }
    Ok(())
  }

  pub(crate) fn is_closed(&self) -> bool {
    self.state.lock().closed
  }

  pub(crate) fn len(&self) -> usize {
    self.state.lock().queue.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn buffered_fifo_and_capacity() {
    let chan = Chan::new(2);
    chan.try_send(1).unwrap();
    chan.try_send(2).unwrap();
    assert_eq!(chan.try_send(3), Err(TrySendError::Full(3)));
    assert_eq!(chan.try_recv(), Ok(1));
    chan.try_send(3).unwrap();
    assert_eq!(chan.try_recv(), Ok(2));
    assert_eq!(chan.try_recv(), Ok(3));
    assert_eq!(chan.try_recv(), Err(TryRecvError::Empty));
  }

  #[test]
  fn rendezvous_never_buffers() {
    let chan = Chan::new(0);
    assert_eq!(chan.try_send(7), Err(TrySendError::Full(7)));
    assert_eq!(chan.len(), 0);
  }

  #[test]
  fn blocked_sender_refills_after_pop() {
    let chan = Chan::new(1);
    chan.try_send(1).unwrap();

    let cx = WaitContext::for_current_thread();
    let packet = Packet::new(Some(2));
    chan.lock().senders.push_back(Entry {
      cx: cx.clone(),
      case: 0,
      packet: packet.clone(),
    });

    assert_eq!(chan.try_recv(), Ok(1));
    assert_eq!(cx.selected(), Some(Selection::Case(0)));
    assert!(packet.take().is_none(), "item must have moved into the buffer");
    assert_eq!(chan.len(), 1);
    assert_eq!(chan.try_recv(), Ok(2));
  }

  #[test]
  fn stale_entries_are_skipped() {
    let chan = Chan::<u8>::new(0);
    let stale = WaitContext::for_current_thread();
    stale.try_select(Selection::Aborted).unwrap();
    let live = WaitContext::for_current_thread();
    let packet = Packet::new(None);
    {
      let mut state = chan.lock();
      state.receivers.push_back(Entry {
        cx: stale,
        case: 0,
        packet: Packet::new(None),
      });
      state.receivers.push_back(Entry {
        cx: live.clone(),
        case: 4,
        packet: packet.clone(),
      });
    }
    chan.try_send(9).unwrap();
    assert_eq!(live.selected(), Some(Selection::Case(4)));
    assert_eq!(packet.take(), Some(9));
    assert!(chan.lock().receivers.is_empty());
  }

  #[test]
  fn close_is_one_shot_and_keeps_buffer() {
    let chan = Chan::new(3);
    chan.try_send('a').unwrap();
    chan.try_send('b').unwrap();
    assert_eq!(chan.close(), Ok(()));
    assert_eq!(chan.close(), Err(CloseError));
    assert_eq!(chan.try_send('c'), Err(TrySendError::Closed('c')));
    assert_eq!(chan.try_recv(), Ok('a'));
    assert_eq!(chan.try_recv(), Ok('b'));
    assert_eq!(chan.try_recv(), Err(TryRecvError::Closed));
  }

  #[test]
  fn restored_item_on_rendezvous_does_not_become_a_buffer() {
    let chan = Chan::new(0);
    chan.lock().restore(1);
    assert_eq!(chan.len(), 1);

    let cx = WaitContext::for_current_thread();
    let packet = Packet::new(Some(2));
    chan.lock().senders.push_back(Entry {
      cx: cx.clone(),
      case: 0,
      packet: packet.clone(),
    });

    assert_eq!(chan.try_recv(), Ok(1));
    assert_eq!(chan.len(), 0);
    assert!(cx.is_waiting(), "the sender must still wait for its own receiver");
    assert_eq!(chan.try_send(3), Err(TrySendError::Full(3)));

    assert_eq!(chan.try_recv(), Ok(2));
    assert_eq!(cx.selected(), Some(Selection::Case(0)));
    assert!(packet.take().is_none());
  }

  #[test]
  fn restored_item_over_capacity_drains_back_to_the_bound() {
    let chan = Chan::new(1);
    chan.try_send(2).unwrap();
    chan.lock().restore(1);

    let cx = WaitContext::for_current_thread();
    chan.lock().senders.push_back(Entry {
      cx: cx.clone(),
      case: 0,
      packet: Packet::new(Some(3)),
    });

    assert_eq!(chan.try_recv(), Ok(1));
    assert_eq!(chan.len(), 1);
    assert!(cx.is_waiting());
    assert_eq!(chan.try_recv(), Ok(2));
    assert_eq!(chan.len(), 1, "the freed slot takes the blocked sender's item");
    assert_eq!(chan.try_recv(), Ok(3));
  }

  #[test]
  fn restore_puts_item_back_at_the_head() {
    let chan = Chan::new(4);
    chan.try_send(2).unwrap();
    chan.lock().restore(1);
    assert_eq!(chan.try_recv(), Ok(1));
    assert_eq!(chan.try_recv(), Ok(2));
  }
}
