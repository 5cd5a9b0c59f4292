// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashSet;

use crate::graph::vfg;
use crate::pts_set::filter::FilterSets;
use crate::pts_set::points_to::HybridPointsToSet;
use crate::pts_set::pt_data::{BasePTData, DFPTData};

pub mod alias;
pub mod flow_sensitive;
pub mod heap_cloning;

pub type NodeId = vfg::NodeId;
pub type EdgeId = vfg::EdgeId;
pub type PointsTo<T> = HybridPointsToSet<T>;
pub type PTDataTy = BasePTData<NodeId, HashSet<NodeId>, NodeId, PointsTo<NodeId>>;
pub type DFPTDataTy = DFPTData<NodeId, NodeId, PointsTo<NodeId>>;
pub type FilterSetsTy = FilterSets<NodeId, NodeId, PointsTo<NodeId>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PTAType {
    FlowSensitive,
    FlowSensitiveTBHC,
}

pub trait PointerAnalysis {
    fn analyze(&mut self);
}
