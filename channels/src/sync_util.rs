//! Helpers for blocking the calling thread on a hand-off slot.
//! Callers register their `Thread` in a wait list before parking and re-check
//! their condition after every wake-up, so spurious unparks are harmless.

use std::thread;
use std::time::{Duration, Instant};

/// Parks the current thread until unparked or until `deadline` passes.
#[inline]
pub(crate) fn park_until(deadline: Option<Instant>) {
  match deadline {
    None => thread::park(),
    Some(deadline) => {
      let now = Instant::now();
      if deadline > now {
        thread::park_timeout(deadline - now);
      }
    }
  }
}

/// Converts a relative timeout into an absolute deadline. Timeouts too large
/// to represent are treated as "no deadline".
#[inline]
pub(crate) fn deadline_after(timeout: Duration) -> Option<Instant> {
  Instant::now().checked_add(timeout)
}

#[inline]
pub(crate) fn expired(deadline: Option<Instant>) -> bool {
  matches!(deadline, Some(d) if Instant::now() >= d)
}
