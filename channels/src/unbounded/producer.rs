use crate::error::{CloseError, SendError, SendTimeoutError, TrySendError};
use crate::handoff::Handoff;
use crate::internal::waiter::WaitKey;
use crate::sync_util;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

/// The sending half of an unbounded channel, blocking flavour.
///
/// Cloning adds a producer; the stream ends once every clone has been closed
/// or dropped.
#[derive(Debug)]
pub struct Sender<T: Send> {
  pub(crate) shared: Arc<Handoff<T>>,
  pub(crate) closed: AtomicBool,
}

/// The sending half of an unbounded channel, async flavour.
#[derive(Debug)]
pub struct AsyncSender<T: Send> {
  pub(crate) shared: Arc<Handoff<T>>,
  pub(crate) closed: AtomicBool,
}

impl<T: Send> Sender<T> {
  pub(crate) fn new(shared: Arc<Handoff<T>>) -> Self {
    Sender {
      shared,
      closed: AtomicBool::new(false),
    }
  }

  /// Hands `value` to the coordinator. Waits only while the coordinator is
  /// busy picking up the previous value, never for the receiver.
  pub fn send(&self, value: T) -> Result<(), SendError> {
    if self.closed.load(Ordering::Acquire) {
      return Err(SendError::Closed);
    }
    self.shared.give(value, None).map_err(|_| SendError::Closed)
  }

  pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
    if self.closed.load(Ordering::Acquire) {
      return Err(TrySendError::Closed(value));
    }
    self.shared.try_give(value)
  }

  pub fn send_timeout(&self, value: T, timeout: Duration) -> Result<(), SendTimeoutError<T>> {
    if self.closed.load(Ordering::Acquire) {
      return Err(SendTimeoutError::Closed(value));
    }
    self.shared.give(value, sync_util::deadline_after(timeout))
  }

  /// True if this handle was closed or nothing will ever accept a value
  /// again (the coordinator exited).
  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire) || self.shared.is_closed_for_givers()
  }

  /// Closes this handle. Once every sender is closed or dropped, receivers
  /// drain what is buffered and then see the end of the stream.
  pub fn close(&self) -> Result<(), CloseError> {
    if self
      .closed
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
      .is_ok()
    {
      self.shared.remove_giver();
      Ok(())
    } else {
      Err(CloseError)
    }
  }

  /// Converts into an async sender without ending the stream.
  pub fn to_async(self) -> AsyncSender<T> {
    let was_closed = self.closed.swap(true, Ordering::AcqRel);
    AsyncSender {
      shared: Arc::clone(&self.shared),
      closed: AtomicBool::new(was_closed),
    }
  }
}

impl<T: Send> AsyncSender<T> {
  pub(crate) fn new(shared: Arc<Handoff<T>>) -> Self {
    AsyncSender {
      shared,
      closed: AtomicBool::new(false),
    }
  }

  pub fn send(&self, value: T) -> SendFuture<'_, T> {
    SendFuture {
      sender: self,
      value: Some(value),
      key: None,
    }
  }

  pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
    if self.closed.load(Ordering::Acquire) {
      return Err(TrySendError::Closed(value));
    }
    self.shared.try_give(value)
  }

  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire) || self.shared.is_closed_for_givers()
  }

  pub fn close(&self) -> Result<(), CloseError> {
    if self
      .closed
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
      .is_ok()
    {
      self.shared.remove_giver();
      Ok(())
    } else {
      Err(CloseError)
    }
  }

  /// Converts into a blocking sender without ending the stream.
  pub fn to_sync(self) -> Sender<T> {
    let was_closed = self.closed.swap(true, Ordering::AcqRel);
    Sender {
      shared: Arc::clone(&self.shared),
      closed: AtomicBool::new(was_closed),
    }
  }
}

// --- Future ---

/// Future returned by [`AsyncSender::send`]. Dropping it before completion
/// drops the value.
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct SendFuture<'a, T: Send> {
  sender: &'a AsyncSender<T>,
  value: Option<T>,
  key: Option<WaitKey>,
}

// The value is only ever moved, never pinned.
impl<T: Send> Unpin for SendFuture<'_, T> {}

impl<'a, T: Send> Future for SendFuture<'a, T> {
  type Output = Result<(), SendError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    if this.sender.closed.load(Ordering::Acquire) {
      this.value = None;
      return Poll::Ready(Err(SendError::Closed));
    }
    this.sender.shared.poll_give(cx, &mut this.value, &mut this.key)
  }
}

impl<T: Send> Drop for SendFuture<'_, T> {
  fn drop(&mut self) {
    self.sender.shared.cancel_give(self.key.take());
  }
}

// --- Cloning and Dropping ---

impl<T: Send> Clone for Sender<T> {
  fn clone(&self) -> Self {
    // A closed handle clones into a closed one; the input stays closed.
    let joined = !self.closed.load(Ordering::Acquire) && self.shared.try_add_giver();
    Sender {
      shared: Arc::clone(&self.shared),
      closed: AtomicBool::new(!joined),
    }
  }
}

impl<T: Send> Drop for Sender<T> {
  fn drop(&mut self) {
    if !self.closed.swap(true, Ordering::AcqRel) {
      self.shared.remove_giver();
    }
  }
}

impl<T: Send> Clone for AsyncSender<T> {
  fn clone(&self) -> Self {
    // A closed handle clones into a closed one; the input stays closed.
    let joined = !self.closed.load(Ordering::Acquire) && self.shared.try_add_giver();
    AsyncSender {
      shared: Arc::clone(&self.shared),
      closed: AtomicBool::new(!joined),
    }
  }
}

impl<T: Send> Drop for AsyncSender<T> {
  fn drop(&mut self) {
    if !self.closed.swap(true, Ordering::AcqRel) {
      self.shared.remove_giver();
    }
  }
}
