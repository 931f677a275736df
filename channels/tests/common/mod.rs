#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(500);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(3);
pub const STRESS_TIMEOUT: Duration = Duration::from_secs(15);
pub const ITEMS_LOW: usize = 50;
pub const ITEMS_MEDIUM: usize = 200;
pub const ITEMS_HIGH: usize = 1000;

/// Counts how many of its instances have been dropped.
pub struct DropCounter(pub Arc<AtomicUsize>);

impl Drop for DropCounter {
  fn drop(&mut self) {
    self.0.fetch_add(1, Ordering::SeqCst);
  }
}

/// Installs a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}
