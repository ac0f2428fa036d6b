//! Wait contexts: the selection token shared by every wait-set entry that a
//! single blocked operation (a plain send/recv, or a whole select) registers.
//!
//! A context starts out `WAITING`. Exactly one party moves it away from that
//! state with a compare-and-swap: either a counterpart that completes one of
//! the registered operations (`Selection::Case`), or the owner itself giving up
//! (`Selection::Aborted`, on timeout or cancellation). Whoever wins the CAS owns
//! the outcome; everybody else must treat the context's entries as stale.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::Waker;
use std::thread::{self, Thread};

use crate::async_util::AtomicWaker;

const WAITING: usize = 0;
const ABORTED: usize = 1;
const FIRST_CASE: usize = 2;

/// The outcome recorded in a [`WaitContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Selection {
  /// The owner gave up waiting.
  Aborted,
  /// The operation registered under this case index was completed by a counterpart.
  Case(usize),
}

impl Selection {
  fn encode(self) -> usize {
    match self {
      Selection::Aborted => ABORTED,
      Selection::Case(index) => index + FIRST_CASE,
    }
  }

  fn decode(raw: usize) -> Option<Self> {
    match raw {
      WAITING => None,
      ABORTED => Some(Selection::Aborted),
      n => Some(Selection::Case(n - FIRST_CASE)),
    }
  }
}

/// How the owner of a context is woken.
enum Notify {
  Thread(Thread),
  Task(AtomicWaker),
}

/// Selection token plus wakeup target for one blocked operation.
pub(crate) struct WaitContext {
  selected: AtomicUsize,
  notify: Notify,
}

impl fmt::Debug for WaitContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let kind = match self.notify {
      Notify::Thread(_) => "thread",
      Notify::Task(_) => "task",
    };
    f.debug_struct("WaitContext")
      .field("selected", &self.selected())
      .field("notify", &kind)
      .finish()
  }
}

impl WaitContext {
  /// A context whose owner parks the current thread.
  pub(crate) fn for_current_thread() -> Arc<Self> {
    Arc::new(Self {
      selected: AtomicUsize::new(WAITING),
      notify: Notify::Thread(thread::current()),
    })
  }

  /// A context whose owner is a future polled with `waker`.
  pub(crate) fn for_task(waker: &Waker) -> Arc<Self> {
    let atomic = AtomicWaker::new();
    atomic.register(waker);
    Arc::new(Self {
      selected: AtomicUsize::new(WAITING),
      notify: Notify::Task(atomic),
    })
  }

  /// Attempts to record `selection`. Fails with the existing selection if the
  /// context was already decided.
  #[inline]
  pub(crate) fn try_select(&self, selection: Selection) -> Result<(), Selection> {
    self
      .selected
      .compare_exchange(WAITING, selection.encode(), Ordering::AcqRel, Ordering::Acquire)
      .map(|_| ())
      .map_err(|raw| Selection::decode(raw).unwrap_or(Selection::Aborted))
  }

  /// The recorded selection, or `None` while still waiting.
  #[inline]
  pub(crate) fn selected(&self) -> Option<Selection> {
    Selection::decode(self.selected.load(Ordering::Acquire))
  }

  #[inline]
  pub(crate) fn is_waiting(&self) -> bool {
    self.selected.load(Ordering::Acquire) == WAITING
  }

  /// Replaces the waker of a task-owned context. No-op for thread contexts.
  pub(crate) fn register_waker(&self, waker: &Waker) {
    if let Notify::Task(atomic) = &self.notify {
      atomic.register(waker);
    }
  }

  /// Wakes the owner.
  pub(crate) fn unpark(&self) {
    match &self.notify {
      Notify::Thread(thread) => thread.unpark(),
      Notify::Task(atomic) => atomic.wake(),
    }
  }
}
