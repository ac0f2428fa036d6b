use std::thread;
use std::time::Instant;

/// Emits a CPU instruction that signals the processor that it is in a spin loop.
#[inline(always)]
fn spin_hint() {
  std::hint::spin_loop();
}

/// An adaptive wait strategy that starts with spinning, then yields, then parks.
///
/// Returns `true` once `cond` holds, or `false` if `deadline` passed first.
/// The deadline is never reported as reached early: spurious unparks loop.
pub(crate) fn adaptive_wait<F>(cond: F, deadline: Option<Instant>) -> bool
where
  F: Fn() -> bool,
{
  // 1. Spinning Phase
  for _ in 0..10 {
    if cond() {
      return true;
    }
    spin_hint();
  }

  // 2. Yielding Phase
  for _ in 0..20 {
    if cond() {
      return true;
    }
    thread::yield_now();
  }

  // 3. Blocking Phase
  loop {
    if cond() {
      return true;
    }
    match deadline {
      None => thread::park(),
      Some(deadline) => {
        let now = Instant::now();
        if now >= deadline {
          return cond();
        }
        thread::park_timeout(deadline - now);
      }
    }
  }
}
