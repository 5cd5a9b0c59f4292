// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! FIFO worklist without duplicates.

use std::collections::{HashSet, VecDeque};
use std::fmt::{Debug, Formatter, Result};
use std::hash::Hash;

/// A first-in-first-out worklist. An element already waiting in the list is
/// not enqueued a second time.
pub struct FIFOWorkList<T> {
    queue: VecDeque<T>,
    pending: HashSet<T>,
}

impl<T: Debug> Debug for FIFOWorkList<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_list().entries(self.queue.iter()).finish()
    }
}

impl<T: Copy + Eq + Hash> Default for FIFOWorkList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Eq + Hash> FIFOWorkList<T> {
    pub fn new() -> Self {
        FIFOWorkList {
            queue: VecDeque::new(),
            pending: HashSet::new(),
        }
    }

    /// Returns false if `elem` was already pending.
    pub fn push(&mut self, elem: T) -> bool {
        if self.pending.insert(elem) {
            self.queue.push_back(elem);
            true
        } else {
            false
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        let elem = self.queue.pop_front()?;
        self.pending.remove(&elem);
        Some(elem)
    }

    #[inline]
    pub fn contains(&self, elem: &T) -> bool {
        self.pending.contains(elem)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
