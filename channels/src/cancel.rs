//! Cooperative cancellation.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_intrusive::sync::ManualResetEvent;

/// A one-shot, broadcast "stop" signal.
///
/// Clones share the same signal. Once [`cancel`](CancelToken::cancel) has
/// been called every clone reports cancelled forever; calling it again is a
/// no-op. A coordinator built with a token abandons its buffered values and
/// closes its output as soon as it observes the signal.
///
/// There is no timeout primitive: to bound a pipeline in time, call
/// `cancel()` from a timer of your choice.
#[derive(Clone)]
pub struct CancelToken {
  event: Arc<ManualResetEvent>,
}

impl CancelToken {
  /// Creates a token that has not fired.
  pub fn new() -> Self {
    CancelToken {
      event: Arc::new(ManualResetEvent::new(false)),
    }
  }

  /// Fires the signal. Idempotent.
  pub fn cancel(&self) {
    self.event.set();
  }

  /// Returns `true` once the signal has fired.
  pub fn is_cancelled(&self) -> bool {
    self.event.is_set()
  }

  /// Resolves once the signal has fired. Resolves immediately if it already
  /// has.
  pub fn cancelled(&self) -> impl Future<Output = ()> + '_ {
    self.event.wait()
  }
}

impl Default for CancelToken {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for CancelToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CancelToken")
      .field("cancelled", &self.is_cancelled())
      .finish()
  }
}
