//! Coordination primitives used alongside channels.

mod wait_group;

pub use wait_group::{WaitGroup, WaitGroupFuture};
