#![allow(dead_code)]

use std::time::Duration;

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(500);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(3);
pub const BLOCK_CHECK: Duration = Duration::from_millis(50);
pub const SELECT_TIMEOUT: Duration = Duration::from_millis(100);
/// How late a timeout may fire on a loaded test machine.
pub const TIMEOUT_SLACK: Duration = Duration::from_millis(75);
pub const ITEMS_LOW: usize = 50;
pub const ITEMS_MEDIUM: usize = 200;
pub const ITEMS_HIGH: usize = 1000;

/// Routes `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}
