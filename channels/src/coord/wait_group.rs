//! A completion counter that threads and tasks can wait on.
//!
//! A `WaitGroup` counts outstanding units of work. `add` raises the count,
//! `done` lowers it, and waiters are released when it reaches zero. Blocked
//! threads and suspended tasks share one FIFO waiter queue behind a
//! `parking_lot::Mutex`, so a wake can never be lost between the count check
//! and the enqueue.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug)]
enum Waiter {
  Sync(Thread),
  Async(Waker),
}

impl Waiter {
  fn wake(self) {
    match self {
      Waiter::Sync(thread) => thread.unpark(),
      Waiter::Async(waker) => waker.wake(),
    }
  }

  fn will_wake(&self, waker: &Waker) -> bool {
    match self {
      Waiter::Async(own) => own.will_wake(waker),
      Waiter::Sync(_) => false,
    }
  }
}

#[derive(Debug)]
struct GroupInternal {
  count: usize,
  next_key: u64,
  waiters: VecDeque<(u64, Waiter)>,
}

impl GroupInternal {
  fn enqueue(&mut self, waiter: Waiter) -> u64 {
    let key = self.next_key;
    self.next_key = self.next_key.wrapping_add(1);
    self.waiters.push_back((key, waiter));
    key
  }

  /// Drops the entry for `key` if `done` has not taken it already.
  fn remove(&mut self, key: u64) {
    self.waiters.retain(|(own, _)| *own != key);
  }
}

/// A clonable handle to a shared completion counter.
#[derive(Clone)]
pub struct WaitGroup {
  internal: Arc<Mutex<GroupInternal>>,
}

impl fmt::Debug for WaitGroup {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let internal = self.internal.lock();
    f.debug_struct("WaitGroup")
      .field("count", &internal.count)
      .field("waiters", &internal.waiters.len())
      .finish()
  }
}

impl Default for WaitGroup {
  fn default() -> Self {
    Self::new()
  }
}

impl WaitGroup {
  /// Creates a group with a count of zero.
  pub fn new() -> Self {
    Self {
      internal: Arc::new(Mutex::new(GroupInternal {
        count: 0,
        next_key: 0,
        waiters: VecDeque::new(),
      })),
    }
  }

  /// Raises the count by `n`.
  pub fn add(&self, n: usize) {
    let mut internal = self.internal.lock();
    internal.count = internal.count.saturating_add(n);
  }

  /// Lowers the count by one, releasing every waiter when it reaches zero.
  ///
  /// Calling `done` more often than `add` is a bug in the caller. It is
  /// logged and otherwise ignored.
  pub fn done(&self) {
    let waiters = {
      let mut internal = self.internal.lock();
      if internal.count == 0 {
        tracing::error!("WaitGroup::done called with a count of zero");
        return;
      }
      internal.count -= 1;
      if internal.count > 0 {
        return;
      }
      std::mem::take(&mut internal.waiters)
    };
    for (_, waiter) in waiters {
      waiter.wake();
    }
  }

  /// Current count.
  pub fn count(&self) -> usize {
    self.internal.lock().count
  }

  /// Returns a future that resolves once the count is zero.
  pub fn wait(&self) -> WaitGroupFuture {
    WaitGroupFuture {
      group: self.clone(),
      key: None,
    }
  }

  /// Blocks the current thread until the count is zero.
  pub fn wait_blocking(&self) {
    let mut internal = self.internal.lock();
    while internal.count > 0 {
      let key = internal.enqueue(Waiter::Sync(thread::current()));
      drop(internal);
      thread::park();
      internal = self.internal.lock();
      internal.remove(key);
    }
  }

  /// Blocks until the count is zero or `timeout` elapses. Returns `true` if
  /// the count reached zero. A timeout too large to represent waits forever.
  pub fn wait_timeout(&self, timeout: Duration) -> bool {
    let Some(deadline) = Instant::now().checked_add(timeout) else {
      self.wait_blocking();
      return true;
    };
    let mut internal = self.internal.lock();
    while internal.count > 0 {
      let now = Instant::now();
      if now >= deadline {
        return false;
      }
      let key = internal.enqueue(Waiter::Sync(thread::current()));
      drop(internal);
      thread::park_timeout(deadline - now);
      internal = self.internal.lock();
      internal.remove(key);
    }
    true
  }
}

/// A future that resolves when a [`WaitGroup`]'s count reaches zero.
///
/// Dropping it before completion withdraws its waker from the group.
#[must_use = "futures do nothing unless you .await or poll them"]
#[derive(Debug)]
pub struct WaitGroupFuture {
  group: WaitGroup,
  key: Option<u64>,
}

impl Future for WaitGroupFuture {
  type Output = ();

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    let mut internal = this.group.internal.lock();
    if internal.count == 0 {
      if let Some(key) = this.key.take() {
        internal.remove(key);
      }
      return Poll::Ready(());
    }
    let own = match this.key {
      Some(key) => internal.waiters.iter_mut().find(|(own, _)| *own == key),
      None => None,
    };
    match own {
      Some((_, waiter)) => {
        if !waiter.will_wake(cx.waker()) {
          *waiter = Waiter::Async(cx.waker().clone());
        }
      }
      None => this.key = Some(internal.enqueue(Waiter::Async(cx.waker().clone()))),
    }
    Poll::Pending
  }
}

impl Drop for WaitGroupFuture {
  fn drop(&mut self) {
    if let Some(key) = self.key.take() {
      self.group.internal.lock().remove(key);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::time::timeout;

  #[test]
  fn zero_count_does_not_block() {
    let group = WaitGroup::new();
    group.wait_blocking();
    assert!(group.wait_timeout(Duration::from_millis(1)));
  }

  #[test]
  fn extra_done_is_ignored() {
    let group = WaitGroup::new();
    group.add(1);
    group.done();
    group.done();
    assert_eq!(group.count(), 0);
  }

  #[test]
  fn wait_blocking_released_by_last_done() {
    let group = WaitGroup::new();
    group.add(2);

    let waiter = {
      let group = group.clone();
      thread::spawn(move || group.wait_blocking())
    };

    thread::sleep(Duration::from_millis(50));
    group.done();
    thread::sleep(Duration::from_millis(50));
    assert!(!waiter.is_finished(), "one unit is still outstanding");

    group.done();
    waiter.join().expect("waiter panicked");
  }

  #[test]
  fn wait_timeout_expires_while_counted() {
    let group = WaitGroup::new();
    group.add(1);
    let start = Instant::now();
    assert!(!group.wait_timeout(Duration::from_millis(40)));
    assert!(start.elapsed() >= Duration::from_millis(40));
  }

  #[tokio::test]
  async fn abandoned_waits_leave_no_waiters_behind() {
    let group = WaitGroup::new();
    group.add(1);

    for _ in 0..50 {
      assert!(timeout(Duration::from_millis(1), group.wait()).await.is_err());
    }
    for _ in 0..20 {
      assert!(!group.wait_timeout(Duration::from_millis(1)));
    }
    assert_eq!(group.internal.lock().waiters.len(), 0);

    group.done();
    group.wait().await;
  }

  #[test]
  fn oversized_timeout_waits_without_overflow() {
    let group = WaitGroup::new();
    group.add(1);
    let releaser = {
      let group = group.clone();
      thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        group.done();
      })
    };
    assert!(group.wait_timeout(Duration::MAX));
    releaser.join().expect("releaser panicked");
  }

  #[tokio::test]
  async fn async_wait_completes_after_done() {
    let group = WaitGroup::new();
    group.add(3);

    for _ in 0..3 {
      let group = group.clone();
      tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        group.done();
      });
    }

    timeout(Duration::from_millis(500), group.wait())
      .await
      .expect("wait did not complete after the last done");
    assert_eq!(group.count(), 0);
  }
}
