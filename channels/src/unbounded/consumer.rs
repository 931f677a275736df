use crate::error::{CloseError, RecvError, RecvErrorTimeout, TryRecvError};
use crate::handoff::Handoff;
use crate::internal::waiter::WaitKey;
use crate::sync_util;

use futures_core::Stream;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

/// The receiving half of an unbounded channel, blocking flavour.
///
/// Clones compete for values; each value is delivered to exactly one of
/// them. Dropping the last receiver stops the coordinator and closes the
/// senders.
#[derive(Debug)]
pub struct Receiver<T: Send> {
  pub(crate) shared: Arc<Handoff<T>>,
  pub(crate) closed: AtomicBool,
}

/// The receiving half of an unbounded channel, async flavour. Also a
/// [`Stream`] that ends with the channel.
#[derive(Debug)]
pub struct AsyncReceiver<T: Send> {
  pub(crate) shared: Arc<Handoff<T>>,
  pub(crate) closed: AtomicBool,
  stream_key: Option<WaitKey>,
}

impl<T: Send> Receiver<T> {
  pub(crate) fn new(shared: Arc<Handoff<T>>) -> Self {
    Receiver {
      shared,
      closed: AtomicBool::new(false),
    }
  }

  /// Blocks until the oldest undelivered value is available. Returns
  /// `Disconnected` once the stream has ended, and keeps returning it.
  pub fn recv(&self) -> Result<T, RecvError> {
    if self.closed.load(Ordering::Acquire) {
      return Err(RecvError::Disconnected);
    }
    self.shared.take(None).map_err(|_| RecvError::Disconnected)
  }

  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    if self.closed.load(Ordering::Acquire) {
      return Err(TryRecvError::Disconnected);
    }
    self.shared.try_take()
  }

  pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvErrorTimeout> {
    if self.closed.load(Ordering::Acquire) {
      return Err(RecvErrorTimeout::Disconnected);
    }
    self.shared.take(sync_util::deadline_after(timeout))
  }

  /// True once this handle is closed or the stream has ended and nothing is
  /// left to receive.
  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire) || self.shared.is_closed_for_takers()
  }

  /// Closes this handle. If it was the last receiver, the coordinator stops
  /// and buffered values are dropped.
  pub fn close(&self) -> Result<(), CloseError> {
    if self
      .closed
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
      .is_ok()
    {
      drop(self.shared.remove_taker());
      Ok(())
    } else {
      Err(CloseError)
    }
  }

  /// Blocking iterator over received values. Ends with the stream.
  pub fn iter(&self) -> Iter<'_, T> {
    Iter { receiver: self }
  }

  /// Converts into an async receiver without giving up its place.
  pub fn to_async(self) -> AsyncReceiver<T> {
    let was_closed = self.closed.swap(true, Ordering::AcqRel);
    AsyncReceiver {
      shared: Arc::clone(&self.shared),
      closed: AtomicBool::new(was_closed),
      stream_key: None,
    }
  }
}

impl<T: Send> AsyncReceiver<T> {
  pub(crate) fn new(shared: Arc<Handoff<T>>) -> Self {
    AsyncReceiver {
      shared,
      closed: AtomicBool::new(false),
      stream_key: None,
    }
  }

  pub fn recv(&self) -> RecvFuture<'_, T> {
    RecvFuture {
      receiver: self,
      key: None,
    }
  }

  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    if self.closed.load(Ordering::Acquire) {
      return Err(TryRecvError::Disconnected);
    }
    self.shared.try_take()
  }

  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire) || self.shared.is_closed_for_takers()
  }

  pub fn close(&self) -> Result<(), CloseError> {
    if self
      .closed
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
      .is_ok()
    {
      drop(self.shared.remove_taker());
      Ok(())
    } else {
      Err(CloseError)
    }
  }

  /// Converts into a blocking receiver without giving up its place.
  pub fn to_sync(mut self) -> Receiver<T> {
    self.shared.cancel_take(self.stream_key.take());
    let was_closed = self.closed.swap(true, Ordering::AcqRel);
    Receiver {
      shared: Arc::clone(&self.shared),
      closed: AtomicBool::new(was_closed),
    }
  }
}

// --- Iterators ---

pub struct Iter<'a, T: Send> {
  receiver: &'a Receiver<T>,
}

impl<T: Send> Iterator for Iter<'_, T> {
  type Item = T;

  fn next(&mut self) -> Option<T> {
    self.receiver.recv().ok()
  }
}

pub struct IntoIter<T: Send> {
  receiver: Receiver<T>,
}

impl<T: Send> Iterator for IntoIter<T> {
  type Item = T;

  fn next(&mut self) -> Option<T> {
    self.receiver.recv().ok()
  }
}

impl<'a, T: Send> IntoIterator for &'a Receiver<T> {
  type Item = T;
  type IntoIter = Iter<'a, T>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

impl<T: Send> IntoIterator for Receiver<T> {
  type Item = T;
  type IntoIter = IntoIter<T>;

  fn into_iter(self) -> Self::IntoIter {
    IntoIter { receiver: self }
  }
}

// --- Futures ---

#[must_use = "futures do nothing unless you .await or poll them"]
pub struct RecvFuture<'a, T: Send> {
  receiver: &'a AsyncReceiver<T>,
  key: Option<WaitKey>,
}

impl<'a, T: Send> Future for RecvFuture<'a, T> {
  type Output = Result<T, RecvError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    if this.receiver.closed.load(Ordering::Acquire) {
      return Poll::Ready(Err(RecvError::Disconnected));
    }
    this.receiver.shared.poll_take(cx, &mut this.key)
  }
}

impl<T: Send> Drop for RecvFuture<'_, T> {
  fn drop(&mut self) {
    self.receiver.shared.cancel_take(self.key.take());
  }
}

impl<T: Send> Stream for AsyncReceiver<T> {
  type Item = T;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this = self.get_mut();
    if this.closed.load(Ordering::Acquire) {
      return Poll::Ready(None);
    }
    match this.shared.poll_take(cx, &mut this.stream_key) {
      Poll::Ready(Ok(value)) => Poll::Ready(Some(value)),
      Poll::Ready(Err(_)) => Poll::Ready(None),
      Poll::Pending => Poll::Pending,
    }
  }
}

// --- Cloning and Dropping ---

impl<T: Send> Clone for Receiver<T> {
  fn clone(&self) -> Self {
    // A closed handle clones into a closed one; a finished consumer side
    // stays finished.
    let joined = !self.closed.load(Ordering::Acquire) && self.shared.try_add_taker();
    Receiver {
      shared: Arc::clone(&self.shared),
      closed: AtomicBool::new(!joined),
    }
  }
}

impl<T: Send> Drop for Receiver<T> {
  fn drop(&mut self) {
    if !self.closed.swap(true, Ordering::AcqRel) {
      drop(self.shared.remove_taker());
    }
  }
}

impl<T: Send> Clone for AsyncReceiver<T> {
  fn clone(&self) -> Self {
    let joined = !self.closed.load(Ordering::Acquire) && self.shared.try_add_taker();
    AsyncReceiver {
      shared: Arc::clone(&self.shared),
      closed: AtomicBool::new(!joined),
      stream_key: None,
    }
  }
}

impl<T: Send> Drop for AsyncReceiver<T> {
  fn drop(&mut self) {
    self.shared.cancel_take(self.stream_key.take());
    if !self.closed.swap(true, Ordering::AcqRel) {
      drop(self.shared.remove_taker());
    }
  }
}
