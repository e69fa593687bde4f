//! `MoveQueue` – ordered, mutually-exclusive pending primary moves.
//!
//! FIFO except for [`MoveQueue::clear`], which removes every queued entry of
//! one variant tag.  All operations complete in bounded time: they run on, or
//! are invoked from, the tick path.

use std::collections::VecDeque;

use swivel_types::{MoveTag, PrimaryMove};

/// Pending primary moves, consumed head-first by the motion loop.
#[derive(Debug, Default)]
pub struct MoveQueue {
    pending: VecDeque<PrimaryMove>,
}

impl MoveQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a move to the tail.
    pub fn enqueue(&mut self, mv: PrimaryMove) {
        self.pending.push_back(mv);
    }

    /// Remove and return the head move, if any.
    pub fn pop(&mut self) -> Option<PrimaryMove> {
        self.pending.pop_front()
    }

    /// Remove every queued entry whose variant matches `tag`.  Returns the
    /// number of removed entries.  Aborting a matching *active* move is the
    /// loop's responsibility; the queue only owns pending entries.
    pub fn clear(&mut self, tag: MoveTag) -> usize {
        let before = self.pending.len();
        self.pending.retain(|mv| mv.tag() != tag);
        before - self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
