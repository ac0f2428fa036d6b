//! Async wakeup plumbing shared by the wait contexts.

// A task-owned wait context stores its waker here. A counterpart may wake it
// while the owning future re-registers from another poll.
pub(crate) use futures_util::task::AtomicWaker;
