use std::collections::VecDeque;
use std::fmt;
use std::task::Waker;
use std::thread::{self, Thread};

/// Identifies one registration in a [`WaitList`]. A waiter keeps its key
/// across re-polls so that a registration is refreshed rather than duplicated.
pub(crate) type WaitKey = u64;

/// Something parked on a hand-off slot: a blocked thread or a pending task.
pub(crate) enum Waiter {
  Thread(Thread),
  Task(Waker),
}

impl Waiter {
  #[inline]
  pub(crate) fn current_thread() -> Self {
    Waiter::Thread(thread::current())
  }

  #[inline]
  pub(crate) fn task(waker: &Waker) -> Self {
    Waiter::Task(waker.clone())
  }

  fn wake(self) {
    match self {
      Waiter::Thread(thread) => thread.unpark(),
      Waiter::Task(waker) => waker.wake(),
    }
  }

  fn refresh(&mut self, other: Waiter) {
    // Avoid replacing a waker that would wake the same task anyway.
    if let (Waiter::Task(current), Waiter::Task(new)) = (&*self, &other) {
      if current.will_wake(new) {
        return;
      }
    }
    *self = other;
  }
}

impl fmt::Debug for Waiter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Waiter::Thread(thread) => f.debug_tuple("Thread").field(&thread.id()).finish(),
      Waiter::Task(_) => f.write_str("Task"),
    }
  }
}

/// FIFO of parked waiters. Not synchronized; lives inside the hand-off
/// slot's mutex.
///
/// Notifying a waiter removes its entry. A waiter that gives up after being
/// notified (timeout, dropped future) finds its entry gone and must pass the
/// notification on, see [`WaitList::forget`].
pub(crate) struct WaitList {
  entries: VecDeque<(WaitKey, Waiter)>,
  next_key: WaitKey,
}

impl fmt::Debug for WaitList {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WaitList")
      .field("len", &self.entries.len())
      .finish()
  }
}

impl Default for WaitList {
  fn default() -> Self {
    Self::new()
  }
}

impl WaitList {
  pub(crate) fn new() -> Self {
    Self {
      entries: VecDeque::new(),
      next_key: 0,
    }
  }

  #[cfg(test)]
  pub(crate) fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.entries.len()
  }

  /// Registers `waiter`, or refreshes the existing registration under `key`.
  /// `key` is updated when a new entry is created.
  pub(crate) fn register(&mut self, key: &mut Option<WaitKey>, waiter: Waiter) {
    if let Some(existing) = *key {
      if let Some((_, entry)) = self.entries.iter_mut().find(|(k, _)| *k == existing) {
        entry.refresh(waiter);
        return;
      }
    }
    let new_key = self.next_key;
    self.next_key = self.next_key.wrapping_add(1);
    self.entries.push_back((new_key, waiter));
    *key = Some(new_key);
  }

  /// Removes the entry for `key`. Returns `false` if it was no longer
  /// present, meaning it has already been notified.
  pub(crate) fn remove(&mut self, key: WaitKey) -> bool {
    match self.entries.iter().position(|(k, _)| *k == key) {
      Some(pos) => {
        self.entries.remove(pos);
        true
      }
      None => false,
    }
  }

  /// Withdraws a registration whose owner is giving up without consuming
  /// the event it may have been notified for. That notification is handed
  /// to the next waiter.
  pub(crate) fn forget(&mut self, key: Option<WaitKey>) {
    if let Some(key) = key {
      if !self.remove(key) {
        self.notify_one();
      }
    }
  }

  /// Wakes the oldest waiter. Returns `false` if there was none.
  pub(crate) fn notify_one(&mut self) -> bool {
    match self.entries.pop_front() {
      Some((_, waiter)) => {
        waiter.wake();
        true
      }
      None => false,
    }
  }

  pub(crate) fn notify_all(&mut self) {
    for (_, waiter) in self.entries.drain(..) {
      waiter.wake();
    }
  }
}
