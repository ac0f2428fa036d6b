// src/error.rs

//! Error types for channel, select and pool operations.
//!
//! Errors that hand the unsent value back (`SendError<T>`, `TrySendError<T>`,
//! `SendTimeoutError<T>`) implement `Debug` without requiring `T: Debug`, so
//! they can be used with `?` for any payload type.

use core::fmt;
use std::time::Duration;

use thiserror::Error;

// Implements `into_inner`, `Display` and `Error` for enums whose every variant
// wraps the rejected value.
macro_rules! impl_error_for_enum_with_inner {
    (
        $enum_name:ident < $generic_param:ident >,
        $($variant:ident ( $message:expr ) ),+
        $(,)?
    ) => {
        impl<$generic_param> $enum_name<$generic_param> {
            /// Consumes the error, returning the value that could not be sent.
            #[inline]
            pub fn into_inner(self) -> $generic_param {
                match self {
                    $( $enum_name::$variant(v) => v, )+
                }
            }
        }

        impl<$generic_param> fmt::Display for $enum_name<$generic_param> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $( $enum_name::$variant(_) => f.write_str($message), )+
                }
            }
        }

        impl<$generic_param> std::error::Error for $enum_name<$generic_param> {}
    };
}

/// Returned by `send` on a channel that is closed, either before the call or
/// while the sender was waiting.
///
/// Sending on a closed channel is a programming error. The value is handed
/// back so it is not silently lost.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
  /// Consumes the error, returning the value that could not be sent.
  #[inline]
  pub fn into_inner(self) -> T {
    self.0
  }
}

impl<T> fmt::Debug for SendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("SendError(..)")
  }
}

impl<T> fmt::Display for SendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("sending on a closed channel")
  }
}

impl<T> std::error::Error for SendError<T> {}

/// Error returned by `try_send` when the value could not be delivered
/// immediately. The value is returned.
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum TrySendError<T> {
  /// The buffer is full, or (for a rendezvous channel) no receiver is waiting.
  Full(T),
  /// The channel has been closed.
  Closed(T),
}

impl<T> fmt::Debug for TrySendError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TrySendError::Full(_) => write!(f, "TrySendError::Full(..)"),
      TrySendError::Closed(_) => write!(f, "TrySendError::Closed(..)"),
    }
  }
}

impl_error_for_enum_with_inner!(
  TrySendError<T>,
  Full("channel full"),
  Closed("sending on a closed channel"),
);

impl<T> From<SendError<T>> for TrySendError<T> {
  fn from(err: SendError<T>) -> Self {
    TrySendError::Closed(err.0)
  }
}

/// Error returned by `send_timeout`.
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum SendTimeoutError<T> {
  /// No room or receiver became available before the deadline.
  Timeout(T),
  /// The channel has been closed.
  Closed(T),
}

impl<T> fmt::Debug for SendTimeoutError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SendTimeoutError::Timeout(_) => write!(f, "SendTimeoutError::Timeout(..)"),
      SendTimeoutError::Closed(_) => write!(f, "SendTimeoutError::Closed(..)"),
    }
  }
}

impl_error_for_enum_with_inner!(
  SendTimeoutError<T>,
  Timeout("send operation timed out"),
  Closed("sending on a closed channel"),
);

/// Error returned by `try_recv` when no element could be taken immediately.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum TryRecvError {
  /// The channel is open but nothing is queued and no sender is waiting.
  #[error("channel empty")]
  Empty,
  /// The channel is closed and fully drained.
  #[error("channel closed and drained")]
  Closed,
}

/// Error returned by `recv_timeout`.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum RecvTimeoutError {
  /// The deadline passed before an element arrived.
  #[error("receive operation timed out")]
  Timeout,
  /// The channel is closed and fully drained.
  #[error("channel closed and drained")]
  Closed,
}

/// Returned by a second call to `close` on the same channel.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("channel is already closed")]
pub struct CloseError;

/// A per-job failure reported by a pool worker.
///
/// Job failures are data: they travel on the pool's output channel and never
/// stop the worker that produced them.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("job failed on worker {worker}: {error}")]
pub struct JobError<E> {
  /// Index of the worker that processed the job.
  pub worker: usize,
  /// The error returned by the job handler.
  pub error: E,
}

/// An unrecoverable fault (panic) inside a pool worker.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("worker {worker} faulted: {message}")]
pub struct WorkerFault {
  /// Index of the faulted worker.
  pub worker: usize,
  /// The panic payload, when it was a string.
  pub message: String,
}

/// Errors surfaced by [`WorkerPool`](crate::pool::WorkerPool) construction and supervision.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PoolError {
  /// The pool configuration is unusable.
  #[error("invalid pool configuration: {0}")]
  InvalidConfig(String),

  /// Workers were still running when the supervision deadline passed.
  #[error("pool did not drain within {timeout:?}: {remaining} worker(s) still running")]
  Stalled { remaining: usize, timeout: Duration },

  /// One or more workers terminated by panicking.
  #[error("{} worker(s) faulted", .0.len())]
  Faulted(Vec<WorkerFault>),
}
