//! The buffering coordinator.
//!
//! One background routine per channel. It owns the pending queue outright
//! and is the only party that touches it; the two hand-off slots are its
//! whole interface to the outside world.
//!
//! ```text
//!  Sender(s) --give--> [inbound slot] --take--> Coordinator --put--> [outbound slot] --take--> Receiver(s)
//!                                                  |
//!                                            pending queue
//! ```
//!
//! Phases:
//! - `Idle`: queue empty. Waits for a value, input close, or cancellation.
//! - `Active`: queue non-empty. Races new input against outbound vacancy.
//!   Going empty through delivery releases storage and returns to `Idle`.
//! - `Draining`: input closed with values left. Delivery only, then exit.
//!
//! Cancellation is checked on every poll and before every round of work
//! within a poll, ahead of everything else.

use std::future::poll_fn;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::pin_mut;
use tracing::{debug, trace};

use crate::builder::ReleasePolicy;
use crate::cancel::CancelToken;
use crate::error::RecvError;
use crate::handoff::{Disconnected, Handoff};
use crate::internal::blocked_deque::BlockedDeque;
use crate::internal::waiter::WaitKey;
use crate::worker::{Completion, ExitReason};

/// Rounds of accept/deliver work done in one poll before yielding back to
/// the executor, so a producer that never pauses cannot monopolize it.
const POLL_BUDGET: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
  Idle,
  Active,
  Draining,
}

pub(crate) struct Coordinator<T> {
  inbound: Arc<Handoff<T>>,
  outbound: Arc<Handoff<T>>,
  pending: BlockedDeque<T>,
  release: ReleasePolicy,
  phase: Phase,
  inbound_key: Option<WaitKey>,
  outbound_key: Option<WaitKey>,
  exit: Option<ExitReason>,
  completion: Arc<Completion>,
}

impl<T: Send> Coordinator<T> {
  pub(crate) fn new(
    inbound: Arc<Handoff<T>>,
    outbound: Arc<Handoff<T>>,
    release: ReleasePolicy,
    completion: Arc<Completion>,
  ) -> Self {
    Coordinator {
      inbound,
      outbound,
      pending: BlockedDeque::new(),
      release,
      phase: Phase::Idle,
      inbound_key: None,
      outbound_key: None,
      exit: None,
      completion,
    }
  }

  /// Runs until the stream is drained, `cancel` fires, or every receiver is
  /// gone. Endpoints are closed when `self` drops, whichever way that happens.
  pub(crate) async fn run(mut self, cancel: CancelToken) {
    debug!(release = ?self.release, "coordinator started");

    let cancelled = cancel.cancelled();
    pin_mut!(cancelled);

    let reason = poll_fn(|cx| {
      if cancelled.as_mut().poll(cx).is_ready() {
        return Poll::Ready(ExitReason::Cancelled);
      }
      self.poll_step(cx, &cancel)
    })
    .await;

    self.exit = Some(reason);
  }

  /// One wake-up's worth of work. The waker for `cancel` must already be
  /// registered; here the token is only re-read between rounds.
  fn poll_step(&mut self, cx: &mut Context<'_>, cancel: &CancelToken) -> Poll<ExitReason> {
    for _ in 0..POLL_BUDGET {
      if cancel.is_cancelled() {
        return Poll::Ready(ExitReason::Cancelled);
      }
      let mut progressed = false;

      // Consumer side. Polled in every phase so a vanished consumer is
      // noticed even while idle.
      match self.outbound.poll_vacant(cx, &mut self.outbound_key) {
        Poll::Ready(Err(Disconnected)) => return Poll::Ready(ExitReason::ConsumerGone),
        Poll::Ready(Ok(())) => {
          if let Some(value) = self.pending.pop_front() {
            if self.outbound.put(value).is_err() {
              return Poll::Ready(ExitReason::ConsumerGone);
            }
            progressed = true;
            if self.pending.is_empty() {
              self.pending.release(self.release);
              if self.phase == Phase::Active {
                self.enter(Phase::Idle);
              }
            }
          }
        }
        Poll::Pending => {}
      }

      if self.phase == Phase::Draining {
        if self.pending.is_empty() {
          return Poll::Ready(ExitReason::Drained);
        }
        if !progressed {
          return Poll::Pending;
        }
        continue;
      }

      // Producer side.
      match self.inbound.poll_take(cx, &mut self.inbound_key) {
        Poll::Ready(Ok(value)) => {
          self.pending.push_back(value);
          if self.phase == Phase::Idle {
            self.enter(Phase::Active);
          }
          progressed = true;
        }
        Poll::Ready(Err(RecvError::Disconnected)) => {
          if self.pending.is_empty() {
            return Poll::Ready(ExitReason::Drained);
          }
          self.enter(Phase::Draining);
          progressed = true;
        }
        Poll::Pending => {}
      }

      if !progressed {
        return Poll::Pending;
      }
    }

    // Budget spent with work still flowing: yield, but ask to be polled again.
    cx.waker().wake_by_ref();
    Poll::Pending
  }

  fn enter(&mut self, phase: Phase) {
    trace!(from = ?self.phase, to = ?phase, pending = self.pending.len(), "coordinator phase change");
    self.phase = phase;
  }
}

impl<T> Drop for Coordinator<T> {
  fn drop(&mut self) {
    let reason = self.exit.unwrap_or(ExitReason::Aborted);

    // Producers: nobody will take from the inbound slot again.
    let stranded_input = self.inbound.remove_taker();

    // Consumers: a clean drain leaves the last delivered value in the slot for
    // them to take; every other exit throws it away.
    let stranded_output = match reason {
      ExitReason::Drained => None,
      _ => self.outbound.abandon(),
    };
    self.outbound.remove_giver();

    let abandoned = self.pending.clear()
      + usize::from(stranded_input.is_some())
      + usize::from(stranded_output.is_some());
    drop(stranded_input);
    drop(stranded_output);

    debug!(?reason, abandoned, "coordinator exited");
    self.completion.finish(reason);
  }
}
