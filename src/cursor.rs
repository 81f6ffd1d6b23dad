// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

//! Bounds-checked sequential reader over a borrowed buffer.
//!
//! A standalone utility; nothing else in the crate depends on it. Every move
//! or read that would leave the buffer is refused: the position stays where
//! it was and the cursor latches [`Status::Failed`] until
//! [`BufferCursor::reset`].

/// Outcome of the operations performed so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Every operation so far stayed in bounds.
    Good,
    /// Some operation was refused.
    Failed,
}

/// Cursor over `&[T]`.
#[derive(Clone, Debug)]
pub struct BufferCursor<'a, T> {
    buf: &'a [T],
    pos: usize,
    status: Status,
}

impl<'a, T: Copy> BufferCursor<'a, T> {
    /// Starts at the beginning. An empty buffer starts failed.
    pub fn new(buf: &'a [T]) -> Self {
        let status = if buf.is_empty() {
            Status::Failed
        } else {
            Status::Good
        };
        BufferCursor {
            buf,
            pos: 0,
            status,
        }
    }

    /// Current status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// True while no operation has been refused.
    pub fn is_ok(&self) -> bool {
        self.status == Status::Good
    }

    /// Offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Buffer length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// True while the position addresses an element.
    pub fn has_current(&self) -> bool {
        self.pos < self.buf.len()
    }

    /// Whether `pos + offset` addresses an element.
    pub fn check_index(&self, offset: usize) -> bool {
        self.pos
            .checked_add(offset)
            .is_some_and(|i| i < self.buf.len())
    }

    /// Rewinds to the start and clears the status.
    ///
    /// Returns `false` (and stays failed) for an empty buffer.
    pub fn reset(&mut self) -> bool {
        self.pos = 0;
        self.status = if self.buf.is_empty() {
            Status::Failed
        } else {
            Status::Good
        };
        self.is_ok()
    }

    /// Moves one element forward. Stepping onto the end is allowed.
    pub fn advance(&mut self) -> bool {
        if self.has_current() {
            self.pos += 1;
            true
        } else {
            self.fail()
        }
    }

    /// Moves one element back.
    ///
    /// Stepping back off the end position is allowed, so a cursor that ran
    /// to the end can walk back over the buffer. Only position 0 refuses.
    pub fn retreat(&mut self) -> bool {
        if self.pos > 0 {
            self.pos -= 1;
            true
        } else {
            self.fail()
        }
    }

    /// Moves `offset` elements forward if the target is an element.
    pub fn seek_forward(&mut self, offset: usize) -> bool {
        if self.check_index(offset) {
            self.pos += offset;
            true
        } else {
            self.fail()
        }
    }

    /// Moves `offset` elements back if that stays inside the buffer.
    pub fn seek_back(&mut self, offset: usize) -> bool {
        match self.pos.checked_sub(offset) {
            Some(pos) => {
                self.pos = pos;
                true
            }
            None => self.fail(),
        }
    }

    /// Element at the position.
    pub fn peek(&mut self) -> Option<T> {
        match self.buf.get(self.pos) {
            Some(&value) => Some(value),
            None => {
                self.fail();
                None
            }
        }
    }

    /// Element `offset` past the position.
    pub fn get(&mut self, offset: usize) -> Option<T> {
        if self.check_index(offset) {
            Some(self.buf[self.pos + offset])
        } else {
            self.fail();
            None
        }
    }

    /// Elements from the position to the end.
    pub fn remaining(&self) -> &'a [T] {
        &self.buf[self.pos.min(self.buf.len())..]
    }

    fn fail(&mut self) -> bool {
        self.status = Status::Failed;
        false
    }
}

impl<T: Copy> Iterator for BufferCursor<'_, T> {
    type Item = T;

    /// Yields the current element and advances. Running off the end does not
    /// latch a failure.
    fn next(&mut self) -> Option<T> {
        let value = self.buf.get(self.pos).copied()?;
        self.pos += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining().len();
        (n, Some(n))
    }
}
