// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Per-statement filter sets.
//!
//! An object filtered at a statement stays in the points-to sets the statement
//! reads from; it is only hidden from the statement itself. Filter sets only
//! ever grow, so a filtered object remains filtered for the rest of the solve.

use std::collections::HashMap;
use std::hash::Hash;

use super::points_to::PointsToSet;
use crate::util::bit_vec::Idx;

pub struct FilterSets<L, D, DS> {
    sets: HashMap<L, DS>,
    empty: DS,
    marker: std::marker::PhantomData<D>,
}

impl<L, D, DS> Default for FilterSets<L, D, DS>
where
    L: Hash + Eq + Copy,
    D: Idx,
    DS: PointsToSet<D>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<L, D, DS> FilterSets<L, D, DS>
where
    L: Hash + Eq + Copy,
    D: Idx,
    DS: PointsToSet<D>,
{
    pub fn new() -> Self {
        FilterSets {
            sets: HashMap::new(),
            empty: DS::new(),
            marker: std::marker::PhantomData,
        }
    }

    /// The filter set of `loc`, empty if nothing was ever filtered there.
    #[inline]
    pub fn get(&self, loc: L) -> &DS {
        self.sets.get(&loc).unwrap_or(&self.empty)
    }

    #[inline]
    pub fn is_filtered(&self, loc: L, obj: D) -> bool {
        self.sets.get(&loc).map_or(false, |set| set.contains(obj))
    }

    /// Filters `obj` at `loc`. Returns true if it was not filtered before.
    pub fn filter(&mut self, loc: L, obj: D) -> bool {
        self.sets.entry(loc).or_insert_with(DS::new).insert(obj)
    }

    /// Total number of (statement, object) pairs filtered so far.
    pub fn num_filtered(&self) -> usize {
        self.sets.values().map(|set| set.count()).sum()
    }
}

#[cfg(test)]
mod test {
    use super::FilterSets;
    use crate::pts_set::points_to::{HybridPointsToSet, PointsToSet};

    #[test]
    fn filtering_is_local_to_a_statement() {
        let mut filters: FilterSets<u32, u32, HybridPointsToSet<u32>> = FilterSets::new();
        assert!(filters.get(1).is_empty());
        assert!(filters.filter(1, 42));
        assert!(!filters.filter(1, 42));
        assert!(filters.is_filtered(1, 42));
        assert!(!filters.is_filtered(2, 42));
        assert_eq!(filters.num_filtered(), 1);
    }
}
