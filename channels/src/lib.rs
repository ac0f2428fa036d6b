//! Go-style channels for Rust, usable from both threads and async tasks.
//!
//! Conduit provides the building blocks of channel-based task coordination:
//!
//! - [`Channel`]: a typed FIFO queue with a fixed capacity. Capacity `0`
//!   gives a rendezvous channel. Close is explicit, one-shot, and lets
//!   receivers drain what was buffered.
//! - [`Sender`] / [`Receiver`]: send-only and receive-only views, for
//!   enforcing direction at component boundaries.
//! - [`Select`]: waits for exactly one of several sends and receives, with a
//!   uniformly random choice among ready cases, an optional non-blocking
//!   default and an optional timeout.
//! - [`WorkerPool`]: a fixed set of tasks draining one input channel, with
//!   per-job errors reported as data and panics surfaced to the supervisor.
//! - [`spawn`] / [`spawn_blocking`] and [`WaitGroup`] for the surrounding
//!   task plumbing.
//!
//! Every waiting operation comes in an async form (suspending only the task)
//! and a `_blocking` form (parking the thread). Both kinds interoperate on the
//! same channel.

pub mod channel;
pub mod coord;
pub mod error;
pub mod pool;
pub mod select;
pub mod task;

// Internal utilities - not part of public API but exposed for crate use
mod async_util;
mod internal;

pub use channel::{bounded, rendezvous, unbounded, Channel, Receiver, Sender};
pub use coord::WaitGroup;
pub use error::{
  CloseError, JobError, PoolError, RecvTimeoutError, SendError, SendTimeoutError, TryRecvError,
  TrySendError, WorkerFault,
};
pub use pool::{JobResult, PoolBuilder, PoolConfig, PoolHandle, WorkerPool};
pub use select::{Select, SelectFuture};
pub use task::{spawn, spawn_blocking, TaskHandle};
