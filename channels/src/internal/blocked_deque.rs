use std::collections::VecDeque;
use std::fmt;
use std::mem::MaybeUninit;

use crate::builder::ReleasePolicy;

/// A block of slots for the BlockedDeque.
///
/// Aligned to 128 bytes to keep blocks on their own cache lines (x86_64: 64, aarch64: up to 128).
#[repr(align(128))]
struct Block<T, const N: usize> {
  slots: [MaybeUninit<T>; N],
}

impl<T, const N: usize> Block<T, N> {
  fn boxed() -> Box<Self> {
    Box::new(Self {
      slots: std::array::from_fn(|_| MaybeUninit::uninit()),
    })
  }
}

/// The coordinator's pending queue: an unbounded FIFO stored as a list of
/// fixed-size blocks.
///
/// Memory follows the traffic. Blocks are allocated as the tail fills and
/// freed as soon as the head has consumed them, so a long backlog gives its
/// memory back while it drains. When the queue becomes empty the remainder is
/// handed back according to a [`ReleasePolicy`].
///
/// Slots are moved out with `assume_init_read`, so a delivered value is never
/// retained by the queue after it leaves.
pub(crate) struct BlockedDeque<T, const BLOCK_SIZE: usize = 64> {
  blocks: VecDeque<Box<Block<T, BLOCK_SIZE>>>,
  // Next slot to read in blocks.front().
  head: usize,
  // Next slot to write in blocks.back().
  tail: usize,
  len: usize,
}

impl<T, const BLOCK_SIZE: usize> fmt::Debug for BlockedDeque<T, BLOCK_SIZE> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BlockedDeque")
      .field("len", &self.len)
      .field("head", &self.head)
      .field("tail", &self.tail)
      .field("block_count", &self.blocks.len())
      .finish()
  }
}

impl<T, const BLOCK_SIZE: usize> BlockedDeque<T, BLOCK_SIZE> {
  pub(crate) fn new() -> Self {
    debug_assert!(BLOCK_SIZE > 0, "BlockedDeque needs a non-zero block size");
    Self {
      blocks: VecDeque::new(),
      head: 0,
      tail: 0,
      len: 0,
    }
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.len
  }

  #[inline(always)]
  pub(crate) fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub(crate) fn push_back(&mut self, item: T) {
    if self.blocks.is_empty() || self.tail == BLOCK_SIZE {
      self.blocks.push_back(Block::boxed());
      self.tail = 0;
    }
    if let Some(block) = self.blocks.back_mut() {
      block.slots[self.tail].write(item);
      self.tail += 1;
      self.len += 1;
    }
  }

  pub(crate) fn pop_front(&mut self) -> Option<T> {
    if self.len == 0 {
      return None;
    }

    let block = self.blocks.front_mut()?;
    // Safety: slots in [head, tail) of the front block (or [head, BLOCK_SIZE)
    // when more blocks follow) are initialized, and len > 0 puts `head` there.
    let item = unsafe { block.slots[self.head].assume_init_read() };
    self.head += 1;
    self.len -= 1;

    if self.head == BLOCK_SIZE {
      // Head block fully consumed: free it right away.
      self.blocks.pop_front();
      self.head = 0;
      if self.blocks.is_empty() {
        self.tail = 0;
      }
    }

    Some(item)
  }

  /// Gives storage back after the queue has become empty. Does nothing while
  /// values are still queued.
  pub(crate) fn release(&mut self, policy: ReleasePolicy) {
    if self.len != 0 {
      return;
    }
    match policy {
      ReleasePolicy::Eager => self.blocks.clear(),
      ReleasePolicy::KeepBlock => self.blocks.truncate(1),
    }
    self.blocks.shrink_to_fit();
    // Every slot is logically uninitialized now; restart at the block's start.
    self.head = 0;
    self.tail = 0;
  }

  /// Drops every queued value and frees all blocks. Returns how many values
  /// were dropped.
  pub(crate) fn clear(&mut self) -> usize {
    let dropped = self.len;
    while self.pop_front().is_some() {}
    self.release(ReleasePolicy::Eager);
    dropped
  }

  #[cfg(test)]
  pub(crate) fn block_count(&self) -> usize {
    self.blocks.len()
  }
}

impl<T, const B: usize> Drop for BlockedDeque<T, B> {
  fn drop(&mut self) {
    self.clear();
  }
}
