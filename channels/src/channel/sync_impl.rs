//! Implementation of the synchronous, blocking send and receive logic.
//!
//! Each call is a one-case wait driven by the blocking engine: attempt, then
//! register, then park with adaptive backoff until a counterpart completes the
//! operation, the channel closes, or the deadline passes.

use std::sync::Arc;
use std::time::Instant;

use super::shared::Chan;
use crate::error::{RecvTimeoutError, SendError, SendTimeoutError};
use crate::select::{identity, wait_blocking, Operation, RecvArm, SendArm};

type SendOutcome<T> = Result<(), SendError<T>>;

/// Blocking send. `Timeout` is only possible when a deadline is given.
pub(crate) fn send_sync<T: Send>(
  chan: &Arc<Chan<T>>,
  item: T,
  deadline: Option<Instant>,
) -> Result<(), SendTimeoutError<T>> {
  let mut arm = SendArm::new(Arc::clone(chan), item, identity::<SendOutcome<T>> as fn(_) -> _);
  let outcome = {
    let mut ops: [&mut dyn Operation<SendOutcome<T>>; 1] = [&mut arm];
    wait_blocking(&mut ops, deadline)
  };
  match outcome {
    Some(Ok(())) => Ok(()),
    Some(Err(SendError(item))) => Err(SendTimeoutError::Closed(item)),
    // A successful abort withdrew the entry, so the item is back in the arm.
    None => match arm.take_item() {
      Some(item) => Err(SendTimeoutError::Timeout(item)),
      None => Ok(()),
    },
  }
}

/// Blocking receive. `Ok(None)` reports a closed and drained channel.
pub(crate) fn recv_sync<T: Send>(
  chan: &Arc<Chan<T>>,
  deadline: Option<Instant>,
) -> Result<Option<T>, RecvTimeoutError> {
  let mut arm = RecvArm::new(Arc::clone(chan), identity::<Option<T>> as fn(_) -> _);
  let mut ops: [&mut dyn Operation<Option<T>>; 1] = [&mut arm];
  wait_blocking(&mut ops, deadline).ok_or(RecvTimeoutError::Timeout)
}

pub(crate) fn send_blocking<T: Send>(chan: &Arc<Chan<T>>, item: T) -> Result<(), SendError<T>> {
  send_sync(chan, item, None).map_err(|err| SendError(err.into_inner()))
}

pub(crate) fn recv_blocking<T: Send>(chan: &Arc<Chan<T>>) -> Option<T> {
  loop {
    if let Ok(outcome) = recv_sync(chan, None) {
      return outcome;
    }
  }
}
