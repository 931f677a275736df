//! The background coordinator's lifetime, made explicit.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_intrusive::sync::ManualResetEvent;
use parking_lot::{Condvar, Mutex};

use crate::cancel::CancelToken;

/// Why a coordinator stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
  /// The input was closed and every buffered value was handed to a receiver.
  Drained,
  /// The cancel token fired; buffered values were dropped.
  Cancelled,
  /// Every receiver was dropped; buffered values were dropped.
  ConsumerGone,
  /// The coordinator future was dropped before finishing, e.g. because its
  /// runtime shut down or it panicked. Endpoints are closed all the same.
  Aborted,
}

/// Completion record shared between a coordinator and its [`Worker`]s.
/// Sync waiters use the condvar, async waiters the event.
pub(crate) struct Completion {
  reason: Mutex<Option<ExitReason>>,
  cond: Condvar,
  event: ManualResetEvent,
}

impl Completion {
  pub(crate) fn new() -> Self {
    Completion {
      reason: Mutex::new(None),
      cond: Condvar::new(),
      event: ManualResetEvent::new(false),
    }
  }

  pub(crate) fn finish(&self, reason: ExitReason) {
    {
      let mut slot = self.reason.lock();
      if slot.is_some() {
        return;
      }
      *slot = Some(reason);
    }
    self.cond.notify_all();
    self.event.set();
  }

  fn get(&self) -> Option<ExitReason> {
    *self.reason.lock()
  }
}

/// Handle to a running coordinator.
///
/// Dropping a `Worker` detaches it; the coordinator keeps running until its
/// stream is drained, it is cancelled, or all receivers are gone.
#[derive(Clone)]
pub struct Worker {
  completion: Arc<Completion>,
  cancel: CancelToken,
}

impl Worker {
  pub(crate) fn new(completion: Arc<Completion>, cancel: CancelToken) -> Self {
    Worker { completion, cancel }
  }

  /// Fires the cancel token this coordinator observes. If the token was
  /// supplied by the caller and shared with other coordinators, they are
  /// cancelled too.
  pub fn cancel(&self) {
    self.cancel.cancel();
  }

  /// The token this coordinator observes.
  pub fn cancel_token(&self) -> &CancelToken {
    &self.cancel
  }

  pub fn is_finished(&self) -> bool {
    self.completion.get().is_some()
  }

  /// `None` while the coordinator is still running.
  pub fn exit_reason(&self) -> Option<ExitReason> {
    self.completion.get()
  }

  /// Blocks the calling thread until the coordinator has exited.
  ///
  /// Do not call this from a thread that has to drive the coordinator
  /// (e.g. a current-thread Tokio runtime it was spawned on); use
  /// [`wait`](Worker::wait) there.
  pub fn join(&self) -> ExitReason {
    let mut reason = self.completion.reason.lock();
    loop {
      if let Some(r) = *reason {
        return r;
      }
      self.completion.cond.wait(&mut reason);
    }
  }

  /// Like [`join`](Worker::join) with an upper bound. Returns `None` on
  /// timeout.
  pub fn join_timeout(&self, timeout: Duration) -> Option<ExitReason> {
    let deadline = Instant::now().checked_add(timeout);
    let mut reason = self.completion.reason.lock();
    loop {
      if let Some(r) = *reason {
        return Some(r);
      }
      match deadline {
        Some(deadline) => {
          if self.completion.cond.wait_until(&mut reason, deadline).timed_out() {
            return *reason;
          }
        }
        None => self.completion.cond.wait(&mut reason),
      }
    }
  }

  /// Waits asynchronously until the coordinator has exited.
  pub async fn wait(&self) -> ExitReason {
    loop {
      if let Some(r) = self.completion.get() {
        return r;
      }
      self.completion.event.wait().await;
    }
  }
}

impl fmt::Debug for Worker {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Worker")
      .field("exit_reason", &self.exit_reason())
      .field("cancel", &self.cancel)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::thread;

  fn worker() -> (Arc<Completion>, Worker) {
    let completion = Arc::new(Completion::new());
    let worker = Worker::new(completion.clone(), CancelToken::new());
    (completion, worker)
  }

  #[test]
  fn first_finish_wins() {
    let (completion, worker) = worker();
    assert!(!worker.is_finished());

    completion.finish(ExitReason::Drained);
    completion.finish(ExitReason::Aborted);
    assert_eq!(worker.exit_reason(), Some(ExitReason::Drained));
    assert_eq!(worker.join(), ExitReason::Drained);
  }

  #[test]
  fn join_blocks_until_finish() {
    let (completion, worker) = worker();
    let finisher = thread::spawn(move || {
      thread::sleep(Duration::from_millis(30));
      completion.finish(ExitReason::Cancelled);
    });
    assert_eq!(worker.join(), ExitReason::Cancelled);
    finisher.join().unwrap();
  }

  #[test]
  fn join_timeout_expires() {
    let (_completion, worker) = worker();
    assert_eq!(worker.join_timeout(Duration::from_millis(20)), None);
  }

  #[test]
  fn cancel_fires_the_shared_token() {
    let (_completion, worker) = worker();
    let token = worker.cancel_token().clone();
    worker.cancel();
    assert!(token.is_cancelled());
  }

  #[tokio::test]
  async fn wait_resolves_after_finish() {
    let (completion, worker) = worker();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(20)).await;
      completion.finish(ExitReason::ConsumerGone);
    });
    let reason = tokio::time::timeout(Duration::from_secs(1), worker.wait())
      .await
      .expect("worker never finished");
    assert_eq!(reason, ExitReason::ConsumerGone);
  }
}
