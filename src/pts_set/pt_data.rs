// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use super::points_to::PointsToSet;
use crate::util::bit_vec::Idx;

/// Basic points-to data structure
/// Given a key (variable), return its points-to data (pts).
///
/// K  (Key):     "owning" variable of a points-to set.
/// KS (KeySet):  collection of keys.
/// D  (Data):    elements in points-to sets.
/// DS (DataSet): the points-to set; a collection of Data.
pub struct BasePTData<K, KS, D, DS> {
    pts_map: HashMap<K, DS>,
    rev_pts_map: HashMap<D, KS>,
}

impl<K, KS, D, DS> fmt::Debug for BasePTData<K, KS, D, DS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "BasePTData".fmt(f)
    }
}

impl<K, D, DS> Default for BasePTData<K, HashSet<K>, D, DS>
where
    K: Hash + Eq + Copy,
    D: Idx,
    DS: PointsToSet<D> + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, D, DS> BasePTData<K, HashSet<K>, D, DS>
where
    K: Hash + Eq + Copy,
    D: Idx,
    DS: PointsToSet<D> + Clone,
{
    pub fn new() -> BasePTData<K, HashSet<K>, D, DS> {
        BasePTData {
            pts_map: HashMap::new(),
            rev_pts_map: HashMap::new(),
        }
    }

    /// Return Points-to map
    #[inline]
    pub fn get_pts_map(&self) -> &HashMap<K, DS> {
        &self.pts_map
    }

    #[inline]
    pub fn clear(&mut self) {
        self.pts_map.clear();
        self.rev_pts_map.clear();
    }

    /// Get points-to set of a var.
    #[inline]
    pub fn get_pts(&self, var: K) -> Option<&DS> {
        self.pts_map.get(&var)
    }

    /// Get reverse points-to set of a elem.
    #[inline]
    pub fn get_rev_pts(&self, elem: D) -> Option<&HashSet<K>> {
        self.rev_pts_map.get(&elem)
    }

    /// Adds element to the points-to set associated with var.
    pub fn add_pts(&mut self, var: K, elem: D) -> bool {
        self.rev_pts_map.entry(elem).or_default().insert(var);
        self.pts_map.entry(var).or_insert_with(DS::new).insert(elem)
    }

    /// Performs pts(dst_var) = pts(dst_var) U pts(src_var).
    pub fn union_pts(&mut self, dst_var: K, src_var: K) -> bool {
        if dst_var == src_var {
            return false;
        }
        match self.pts_map.get(&src_var) {
            Some(src_ds) => {
                let src_ds = src_ds.clone();
                self.union_pts_to(dst_var, &src_ds)
            }
            None => false,
        }
    }

    /// Performs pts(dst_var) = pts(dst_var) U src_dataset.
    pub fn union_pts_to(&mut self, dst_var: K, src_ds: &DS) -> bool {
        self.add_rev_pts(src_ds, dst_var);
        let dst_ds = self.pts_map.entry(dst_var).or_insert_with(DS::new);
        dst_ds.union(src_ds)
    }

    /// Fully clears the points-to set of var.
    pub fn clear_pts(&mut self, var: K) {
        if let Some(pts) = self.pts_map.get_mut(&var) {
            for elem in pts.iter() {
                if let Some(vars) = self.rev_pts_map.get_mut(&elem) {
                    vars.remove(&var);
                }
            }
            pts.clear();
        }
    }

    /// Add `var` to the reversed pts set for each data in `data_set`.
    #[inline]
    fn add_rev_pts(&mut self, data_set: &DS, var: K) {
        for elem in data_set.iter() {
            self.rev_pts_map.entry(elem).or_default().insert(var);
        }
    }
}

/// Data-flow points-to data for address-taken objects.
///
/// Every statement `L` keeps an IN and an OUT map from object `o` to the
/// points-to set stored in `o` right before and right after `L`.
///
/// L  (Location): statement node owning the IN/OUT maps.
/// D  (Data):     objects, used both as keys and as points-to elements.
/// DS (DataSet):  the points-to set.
pub struct DFPTData<L, D, DS> {
    in_map: HashMap<L, HashMap<D, DS>>,
    out_map: HashMap<L, HashMap<D, DS>>,
}

impl<L, D, DS> fmt::Debug for DFPTData<L, D, DS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "DFPTData".fmt(f)
    }
}

impl<L, D, DS> Default for DFPTData<L, D, DS>
where
    L: Hash + Eq + Copy,
    D: Idx,
    DS: PointsToSet<D> + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<L, D, DS> DFPTData<L, D, DS>
where
    L: Hash + Eq + Copy,
    D: Idx,
    DS: PointsToSet<D> + Clone,
{
    pub fn new() -> Self {
        DFPTData {
            in_map: HashMap::new(),
            out_map: HashMap::new(),
        }
    }

    #[inline]
    pub fn get_in_pts(&self, loc: L, obj: D) -> Option<&DS> {
        self.in_map.get(&loc).and_then(|m| m.get(&obj))
    }

    #[inline]
    pub fn get_out_pts(&self, loc: L, obj: D) -> Option<&DS> {
        self.out_map.get(&loc).and_then(|m| m.get(&obj))
    }

    /// Objects that have an IN set at `loc`.
    pub fn in_objects(&self, loc: L) -> Vec<D> {
        self.in_map
            .get(&loc)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    /// IN[dst_loc][obj] = IN[dst_loc][obj] U IN[src_loc][obj].
    pub fn update_in_from_in(&mut self, src_loc: L, obj: D, dst_loc: L) -> bool {
        match self.get_in_pts(src_loc, obj) {
            Some(src) => {
                let src = src.clone();
                Self::union_into(&mut self.in_map, dst_loc, obj, &src)
            }
            None => false,
        }
    }

    /// IN[dst_loc][obj] = IN[dst_loc][obj] U OUT[src_loc][obj].
    pub fn update_in_from_out(&mut self, src_loc: L, obj: D, dst_loc: L) -> bool {
        match self.get_out_pts(src_loc, obj) {
            Some(src) => {
                let src = src.clone();
                Self::union_into(&mut self.in_map, dst_loc, obj, &src)
            }
            None => false,
        }
    }

    /// OUT[loc][obj] = OUT[loc][obj] U `pts`.
    pub fn union_out_pts(&mut self, loc: L, obj: D, pts: &DS) -> bool {
        Self::union_into(&mut self.out_map, loc, obj, pts)
    }

    /// OUT[loc][o] = OUT[loc][o] U IN[loc][o] for every object with an IN set at
    /// `loc`, except `killed`, whose incoming value is overwritten by a strong update.
    pub fn update_all_out_from_in(&mut self, loc: L, killed: Option<D>) -> bool {
        let Some(ins) = self.in_map.get(&loc) else {
            return false;
        };
        let out = self.out_map.entry(loc).or_default();
        let mut changed = false;
        for (obj, pts) in ins.iter() {
            if Some(*obj) == killed {
                continue;
            }
            changed |= out.entry(*obj).or_insert_with(DS::new).union(pts);
        }
        changed
    }

    fn union_into(map: &mut HashMap<L, HashMap<D, DS>>, loc: L, obj: D, pts: &DS) -> bool {
        if pts.is_empty() {
            return false;
        }
        map.entry(loc)
            .or_default()
            .entry(obj)
            .or_insert_with(DS::new)
            .union(pts)
    }
}
