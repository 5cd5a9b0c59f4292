// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Alias queries over type-filtered points-to sets.

use crate::dchg::di_type::TypeId;
use crate::pta::flow_sensitive::FlowSensitivePTA;
use crate::pta::*;
use crate::pts_set::points_to::PointsToSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AliasResult {
    NoAlias,
    MayAlias,
    MustAlias,
}

/// Objects of `value`'s points-to set that a pointer to `ty` may view. An
/// unknown `ty` keeps every object.
pub fn type_filtered_pts(
    pta: &FlowSensitivePTA,
    value: NodeId,
    ty: Option<TypeId>,
) -> PointsTo<NodeId> {
    let pts = pta.get_pts(value);
    if ty.is_none() || !pta.options().tbhc() {
        return pts;
    }
    let first_field = pta.options().first_field;
    pts.iter()
        .filter(|obj| {
            pta.vfg().obj(*obj).is_blk_or_const()
                || pta.dchg().is_base(ty, pta.get_type(*obj), first_field)
        })
        .collect()
}

/// Alias relation between pointer `p` accessing memory of type `p_ty` and
/// pointer `q` accessing memory of type `q_ty`.
pub fn alias(
    pta: &FlowSensitivePTA,
    (p, p_ty): (NodeId, Option<TypeId>),
    (q, q_ty): (NodeId, Option<TypeId>),
) -> AliasResult {
    let p_pts = type_filtered_pts(pta, p, p_ty);
    let q_pts = type_filtered_pts(pta, q, q_ty);
    if !p_pts.intersects(&q_pts) {
        return AliasResult::NoAlias;
    }
    if p_pts.count() == 1 && p_pts == q_pts {
        if let Some(obj) = p_pts.iter().next() {
            if pta.is_strong_updatable(obj) {
                return AliasResult::MustAlias;
            }
        }
    }
    AliasResult::MayAlias
}
