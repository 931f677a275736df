//! A single-slot hand-off between a giving side and a taking side.
//!
//! Two of these connect the outside world to the coordinator: the inbound
//! slot (senders give, the coordinator takes) and the outbound slot (the
//! coordinator gives, receivers take). The slot holds at most one value, so a
//! giver only ever waits for the other side to pick the previous value up.
//! All state lives behind one `parking_lot::Mutex`; blocked threads and
//! pending tasks park in the two wait lists.

use std::fmt;
use std::task::{Context, Poll};
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::{RecvError, RecvErrorTimeout, SendError, SendTimeoutError, TryRecvError, TrySendError};
use crate::internal::waiter::{WaitKey, WaitList, Waiter};
use crate::sync_util;

/// The taking side has gone away for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Disconnected;

struct State<T> {
  slot: Option<T>,
  // No more gives will be accepted; takers drain the slot then disconnect.
  sealed: bool,
  givers: usize,
  takers: usize,
  // Givers waiting for the slot to become vacant.
  vacancy: WaitList,
  // Takers waiting for the slot to be filled.
  arrival: WaitList,
}

impl<T> State<T> {
  fn give(&mut self, value: T) -> Result<(), TrySendError<T>> {
    if self.sealed || self.takers == 0 {
      return Err(TrySendError::Closed(value));
    }
    if self.slot.is_some() {
      return Err(TrySendError::Full(value));
    }
    self.slot = Some(value);
    self.arrival.notify_one();
    Ok(())
  }

  fn take(&mut self) -> Result<T, TryRecvError> {
    match self.slot.take() {
      Some(value) => {
        self.vacancy.notify_one();
        Ok(value)
      }
      None if self.sealed || self.givers == 0 => Err(TryRecvError::Disconnected),
      None => Err(TryRecvError::Empty),
    }
  }
}

pub(crate) struct Handoff<T> {
  state: Mutex<State<T>>,
}

impl<T> fmt::Debug for Handoff<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state.lock();
    f.debug_struct("Handoff")
      .field("occupied", &state.slot.is_some())
      .field("sealed", &state.sealed)
      .field("givers", &state.givers)
      .field("takers", &state.takers)
      .field("waiting_givers", &state.vacancy.len())
      .field("waiting_takers", &state.arrival.len())
      .finish()
  }
}

impl<T> Handoff<T> {
  /// Creates a vacant slot with one giver and one taker handle accounted for.
  pub(crate) fn new() -> Self {
    Handoff {
      state: Mutex::new(State {
        slot: None,
        sealed: false,
        givers: 1,
        takers: 1,
        vacancy: WaitList::new(),
        arrival: WaitList::new(),
      }),
    }
  }

  // --- Giving side ---

  pub(crate) fn try_give(&self, value: T) -> Result<(), TrySendError<T>> {
    self.state.lock().give(value)
  }

  /// Blocks the calling thread until the value is in the slot, the slot
  /// closes, or `deadline` passes.
  pub(crate) fn give(&self, value: T, deadline: Option<Instant>) -> Result<(), SendTimeoutError<T>> {
    let mut key = None;
    let mut value = value;
    loop {
      let mut state = self.state.lock();
      match state.give(value) {
        Ok(()) => {
          if let Some(k) = key {
            state.vacancy.remove(k);
          }
          return Ok(());
        }
        Err(TrySendError::Closed(v)) => {
          state.vacancy.forget(key);
          return Err(SendTimeoutError::Closed(v));
        }
        Err(TrySendError::Full(v)) => {
          if sync_util::expired(deadline) {
            state.vacancy.forget(key);
            return Err(SendTimeoutError::Timeout(v));
          }
          value = v;
          state.vacancy.register(&mut key, Waiter::current_thread());
        }
      }
      drop(state);
      sync_util::park_until(deadline);
    }
  }

  /// Async give. The value stays in `value` while pending; `key` tracks the
  /// registration and must be released with [`Handoff::cancel_give`] if the
  /// caller stops polling.
  pub(crate) fn poll_give(
    &self,
    cx: &mut Context<'_>,
    value: &mut Option<T>,
    key: &mut Option<WaitKey>,
  ) -> Poll<Result<(), SendError>> {
    let Some(item) = value.take() else {
      return Poll::Ready(Ok(()));
    };
    let mut state = self.state.lock();
    match state.give(item) {
      Ok(()) => {
        if let Some(k) = key.take() {
          state.vacancy.remove(k);
        }
        Poll::Ready(Ok(()))
      }
      Err(TrySendError::Closed(rejected)) => {
        state.vacancy.forget(key.take());
        drop(state);
        drop(rejected);
        Poll::Ready(Err(SendError::Closed))
      }
      Err(TrySendError::Full(item)) => {
        *value = Some(item);
        state.vacancy.register(key, Waiter::task(cx.waker()));
        Poll::Pending
      }
    }
  }

  pub(crate) fn cancel_give(&self, key: Option<WaitKey>) {
    if key.is_some() {
      self.state.lock().vacancy.forget(key);
    }
  }

  /// Delivery readiness for a giver that owns the values it gives (the
  /// coordinator). Ready once the slot is vacant; always leaves a
  /// registration behind so the giver also hears about takers leaving.
  pub(crate) fn poll_vacant(&self, cx: &mut Context<'_>, key: &mut Option<WaitKey>) -> Poll<Result<(), Disconnected>> {
    let mut state = self.state.lock();
    if state.takers == 0 {
      state.vacancy.forget(key.take());
      return Poll::Ready(Err(Disconnected));
    }
    state.vacancy.register(key, Waiter::task(cx.waker()));
    if state.slot.is_none() {
      Poll::Ready(Ok(()))
    } else {
      Poll::Pending
    }
  }

  /// Places a value into a slot previously reported vacant by
  /// [`Handoff::poll_vacant`]. Hands the value back if every taker is gone.
  pub(crate) fn put(&self, value: T) -> Result<(), T> {
    let mut state = self.state.lock();
    debug_assert!(state.slot.is_none(), "put into an occupied hand-off slot");
    match state.give(value) {
      Ok(()) => Ok(()),
      Err(rejected) => Err(rejected.into_inner()),
    }
  }

  // --- Taking side ---

  pub(crate) fn try_take(&self) -> Result<T, TryRecvError> {
    self.state.lock().take()
  }

  /// Blocks the calling thread until a value arrives, the stream ends, or
  /// `deadline` passes.
  pub(crate) fn take(&self, deadline: Option<Instant>) -> Result<T, RecvErrorTimeout> {
    let mut key = None;
    loop {
      let mut state = self.state.lock();
      match state.take() {
        Ok(value) => {
          if let Some(k) = key {
            state.arrival.remove(k);
          }
          return Ok(value);
        }
        Err(TryRecvError::Disconnected) => {
          state.arrival.forget(key);
          return Err(RecvErrorTimeout::Disconnected);
        }
        Err(TryRecvError::Empty) => {
          if sync_util::expired(deadline) {
            state.arrival.forget(key);
            return Err(RecvErrorTimeout::Timeout);
          }
          state.arrival.register(&mut key, Waiter::current_thread());
        }
      }
      drop(state);
      sync_util::park_until(deadline);
    }
  }

  pub(crate) fn poll_take(&self, cx: &mut Context<'_>, key: &mut Option<WaitKey>) -> Poll<Result<T, RecvError>> {
    let mut state = self.state.lock();
    match state.take() {
      Ok(value) => {
        if let Some(k) = key.take() {
          state.arrival.remove(k);
        }
        Poll::Ready(Ok(value))
      }
      Err(TryRecvError::Disconnected) => {
        state.arrival.forget(key.take());
        Poll::Ready(Err(RecvError::Disconnected))
      }
      Err(TryRecvError::Empty) => {
        state.arrival.register(key, Waiter::task(cx.waker()));
        Poll::Pending
      }
    }
  }

  pub(crate) fn cancel_take(&self, key: Option<WaitKey>) {
    if key.is_some() {
      self.state.lock().arrival.forget(key);
    }
  }

  // --- Lifecycle ---

  /// Closes the slot and drops whatever value is parked in it. Returns that
  /// value so the caller can drop it outside the lock.
  pub(crate) fn abandon(&self) -> Option<T> {
    let mut state = self.state.lock();
    state.sealed = true;
    let stranded = state.slot.take();
    state.vacancy.notify_all();
    state.arrival.notify_all();
    stranded
  }

  /// Registers another giver handle. Fails once the giving side has closed
  /// for good, so a late clone cannot reopen it.
  pub(crate) fn try_add_giver(&self) -> bool {
    let mut state = self.state.lock();
    if state.givers == 0 || state.sealed {
      return false;
    }
    state.givers += 1;
    true
  }

  pub(crate) fn remove_giver(&self) {
    let mut state = self.state.lock();
    debug_assert!(state.givers > 0, "giver count underflow");
    state.givers -= 1;
    if state.givers == 0 {
      // Takers drain the slot, then observe the disconnect.
      state.arrival.notify_all();
    }
  }

  /// Registers another taker handle. Fails once every taker has left.
  pub(crate) fn try_add_taker(&self) -> bool {
    let mut state = self.state.lock();
    if state.takers == 0 {
      return false;
    }
    state.takers += 1;
    true
  }

  /// Drops one taker handle. When the last one leaves, any value stuck in the
  /// slot can never be taken; it is returned so it is dropped outside the lock.
  pub(crate) fn remove_taker(&self) -> Option<T> {
    let mut state = self.state.lock();
    debug_assert!(state.takers > 0, "taker count underflow");
    state.takers -= 1;
    if state.takers == 0 {
      state.vacancy.notify_all();
      return state.slot.take();
    }
    None
  }

  /// True when no give can ever succeed again.
  pub(crate) fn is_closed_for_givers(&self) -> bool {
    let state = self.state.lock();
    state.sealed || state.takers == 0
  }

  /// True when the slot is empty and no value will ever arrive.
  pub(crate) fn is_closed_for_takers(&self) -> bool {
    let state = self.state.lock();
    state.slot.is_none() && (state.sealed || state.givers == 0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::task::{Wake, Waker};
  use std::thread;
  use std::time::Duration;

  struct NoopWaker;
  impl Wake for NoopWaker {
    fn wake(self: Arc<Self>) {}
  }

  fn noop_cx_waker() -> Waker {
    Waker::from(Arc::new(NoopWaker))
  }

  #[test]
  fn give_then_take() {
    let slot = Handoff::new();
    slot.try_give(1).unwrap();
    assert!(matches!(slot.try_give(2), Err(TrySendError::Full(2))));
    assert_eq!(slot.try_take(), Ok(1));
    assert_eq!(slot.try_take(), Err(TryRecvError::Empty));
  }

  #[test]
  fn takers_drain_before_disconnect() {
    let slot = Handoff::new();
    slot.try_give("last").unwrap();
    slot.remove_giver();
    assert!(!slot.is_closed_for_takers());
    assert_eq!(slot.try_take(), Ok("last"));
    assert_eq!(slot.try_take(), Err(TryRecvError::Disconnected));
    assert!(slot.is_closed_for_takers());
  }

  #[test]
  fn abandon_drops_parked_value_and_disconnects() {
    let slot = Handoff::new();
    slot.try_give(5).unwrap();
    assert_eq!(slot.abandon(), Some(5));
    assert_eq!(slot.try_take(), Err(TryRecvError::Disconnected));
    assert!(matches!(slot.try_give(6), Err(TrySendError::Closed(6))));
  }

  #[test]
  fn last_taker_leaving_closes_givers_and_returns_stranded_value() {
    let slot = Handoff::new();
    assert!(slot.try_add_taker());
    slot.try_give(9).unwrap();
    assert_eq!(slot.remove_taker(), None);
    assert!(!slot.is_closed_for_givers());
    assert_eq!(slot.remove_taker(), Some(9));
    assert!(slot.is_closed_for_givers());
    assert!(matches!(slot.try_give(10), Err(TrySendError::Closed(10))));
  }

  #[test]
  fn closed_sides_cannot_be_rejoined() {
    let slot = Handoff::<u8>::new();
    slot.remove_giver();
    assert!(!slot.try_add_giver());
    assert_eq!(slot.remove_taker(), None);
    assert!(!slot.try_add_taker());
  }

  #[test]
  fn blocking_give_waits_for_vacancy() {
    let slot = Arc::new(Handoff::new());
    slot.try_give(1).unwrap();

    let giver = {
      let slot = slot.clone();
      thread::spawn(move || slot.give(2, None))
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!giver.is_finished());
    assert_eq!(slot.try_take(), Ok(1));

    assert!(giver.join().unwrap().is_ok());
    assert_eq!(slot.try_take(), Ok(2));
  }

  #[test]
  fn blocking_give_times_out_with_value() {
    let slot = Handoff::new();
    slot.try_give(1).unwrap();
    let deadline = sync_util::deadline_after(Duration::from_millis(30));
    match slot.give(2, deadline) {
      Err(SendTimeoutError::Timeout(v)) => assert_eq!(v, 2),
      other => panic!("expected timeout, got {:?}", other),
    }
  }

  #[test]
  fn blocking_take_wakes_on_arrival_and_on_close() {
    let slot = Arc::new(Handoff::<u32>::new());

    let taker = {
      let slot = slot.clone();
      thread::spawn(move || {
        let first = slot.take(None);
        let second = slot.take(None);
        (first, second)
      })
    };

    thread::sleep(Duration::from_millis(30));
    slot.try_give(3).unwrap();
    thread::sleep(Duration::from_millis(30));
    slot.remove_giver();

    let (first, second) = taker.join().unwrap();
    assert_eq!(first, Ok(3));
    assert_eq!(second, Err(RecvErrorTimeout::Disconnected));
  }

  #[test]
  fn poll_vacant_reports_lost_takers() {
    let slot = Handoff::<u8>::new();
    let waker = noop_cx_waker();
    let mut cx = Context::from_waker(&waker);
    let mut key = None;

    assert_eq!(slot.poll_vacant(&mut cx, &mut key), Poll::Ready(Ok(())));
    slot.put(1).unwrap();
    assert_eq!(slot.poll_vacant(&mut cx, &mut key), Poll::Pending);

    assert_eq!(slot.remove_taker(), Some(1));
    assert_eq!(slot.poll_vacant(&mut cx, &mut key), Poll::Ready(Err(Disconnected)));
  }

  #[test]
  fn poll_give_keeps_value_while_pending() {
    let slot = Handoff::new();
    let waker = noop_cx_waker();
    let mut cx = Context::from_waker(&waker);

    slot.try_give(1).unwrap();
    let mut value = Some(2);
    let mut key = None;
    assert_eq!(slot.poll_give(&mut cx, &mut value, &mut key), Poll::Pending);
    assert_eq!(value, Some(2));
    assert!(key.is_some());

    assert_eq!(slot.try_take(), Ok(1));
    assert_eq!(slot.poll_give(&mut cx, &mut value, &mut key), Poll::Ready(Ok(())));
    assert_eq!(value, None);
    assert_eq!(slot.try_take(), Ok(2));
  }
}
