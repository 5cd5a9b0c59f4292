// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Flow-sensitive points-to analysis over the sparse value-flow graph, with
//! optional type-based heap cloning.
//!
//! Top-level values have a single points-to set each. Address-taken objects
//! have an IN and an OUT set per statement, connected by the indirect edges
//! of the graph. With heap cloning, statements annotated with a static type
//! first run `init` on the pointer they dereference: objects of an
//! incompatible type are filtered for that statement, and objects whose type
//! is unknown or more general are replaced by a clone of the accessed type.

use std::fmt::{Debug, Formatter, Result};
use std::time::Instant;

use log::*;

use super::heap_cloning::HeapCloning;
use super::PointerAnalysis;
use crate::dchg::di_type::TypeId;
use crate::dchg::DCHGraph;
use crate::graph::node::{AllocKind, GepOffset, ObjKind, StmtKind};
use crate::graph::vfg::VFG;
use crate::pta::*;
use crate::pts_set::points_to::PointsToSet;
use crate::util::options::AnalysisOptions;
use crate::util::pta_statistics::FSStat;
use crate::util::results_dumper;
use crate::util::worklist::FIFOWorkList;

pub struct FlowSensitivePTA<'pta> {
    /// Type hierarchy oracle
    pub(crate) dchg: &'pta DCHGraph,
    /// Value-flow graph, extended with clones and field objects while solving
    pub(crate) vfg: VFG,
    pub(crate) options: AnalysisOptions,
    /// Points-to data of top-level values
    pub(crate) pt_data: PTDataTy,
    /// Per-statement points-to data of address-taken objects
    pub(crate) df_pt_data: DFPTDataTy,
    pub(crate) heap_cloning: HeapCloning,
    pub(crate) filter_sets: FilterSetsTy,
    worklist: FIFOWorkList<NodeId>,

    pub(crate) num_processed: usize,
    pub(crate) num_strong_updates: usize,
}

impl<'pta> Debug for FlowSensitivePTA<'pta> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        "FlowSensitivePTA".fmt(f)
    }
}

/// Constructor
impl<'pta> FlowSensitivePTA<'pta> {
    pub fn new(dchg: &'pta DCHGraph, vfg: VFG, options: AnalysisOptions) -> Self {
        let heap_cloning = HeapCloning::new(options.max_field_limit);
        FlowSensitivePTA {
            dchg,
            vfg,
            options,
            pt_data: PTDataTy::new(),
            df_pt_data: DFPTDataTy::new(),
            heap_cloning,
            filter_sets: FilterSetsTy::new(),
            worklist: FIFOWorkList::new(),
            num_processed: 0,
            num_strong_updates: 0,
        }
    }

    #[inline]
    pub fn vfg(&self) -> &VFG {
        &self.vfg
    }

    #[inline]
    pub fn dchg(&self) -> &DCHGraph {
        self.dchg
    }

    #[inline]
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    #[inline]
    pub fn get_pt_data(&self) -> &PTDataTy {
        &self.pt_data
    }

    #[inline]
    pub fn heap_cloning(&self) -> &HeapCloning {
        &self.heap_cloning
    }

    /// Points-to set of a top-level value, filtered objects included.
    pub fn get_pts(&self, value: NodeId) -> PointsTo<NodeId> {
        self.pt_data.get_pts(value).cloned().unwrap_or_default()
    }

    /// Points-to set of `value` as seen by statement `stmt`.
    pub fn get_effective_pts(&self, stmt: NodeId, value: NodeId) -> PointsTo<NodeId> {
        let mut pts = self.get_pts(value);
        pts.subtract(self.filter_sets.get(stmt));
        pts
    }

    /// Contents of `obj` right before `stmt`.
    pub fn get_in_pts(&self, stmt: NodeId, obj: NodeId) -> PointsTo<NodeId> {
        self.df_pt_data.get_in_pts(stmt, obj).cloned().unwrap_or_default()
    }

    /// Contents of `obj` right after `stmt`.
    pub fn get_out_pts(&self, stmt: NodeId, obj: NodeId) -> PointsTo<NodeId> {
        self.df_pt_data.get_out_pts(stmt, obj).cloned().unwrap_or_default()
    }

    pub fn get_clones(&self, obj: NodeId) -> PointsTo<NodeId> {
        self.heap_cloning.get_clones(obj).cloned().unwrap_or_default()
    }

    #[inline]
    pub fn get_type(&self, obj: NodeId) -> Option<TypeId> {
        self.heap_cloning.get_type(obj)
    }

    #[inline]
    pub fn is_filtered(&self, stmt: NodeId, obj: NodeId) -> bool {
        self.filter_sets.is_filtered(stmt, obj)
    }

    /// Initialize the analysis.
    pub fn initialize(&mut self) {
        for obj in self.vfg.objects().to_vec() {
            let ty = self.initial_type(obj);
            self.heap_cloning.register_object(&self.vfg, obj, ty);
        }
        for stmt in self.vfg.stmts().to_vec() {
            if let StmtKind::Addr { obj, .. } = self.vfg.stmt(stmt).kind {
                self.heap_cloning.set_allocation_site(obj, stmt);
            }
        }
        for (value, obj) in self.vfg.seeds().to_vec() {
            self.pt_data.add_pts(value, obj);
        }
        for stmt in self.vfg.stmts() {
            self.worklist.push(*stmt);
        }
        info!(
            "Initialized with {} statements, {} objects",
            self.vfg.stmts().len(),
            self.vfg.objects().len()
        );
    }

    /// Heap and merged constant objects start out untyped, other objects
    /// carry their declared type.
    fn initial_type(&self, obj: NodeId) -> Option<TypeId> {
        let node = self.vfg.obj(obj);
        if node.is_blk_or_const() {
            return None;
        }
        let mem = self.vfg.mem(node.mem);
        match mem.alloc {
            AllocKind::Heap | AllocKind::Constant => None,
            _ => self.dchg.get_canonical_type(mem.ty),
        }
    }

    /// Propagate until the worklist is empty.
    pub fn solve_worklist(&mut self) {
        while self.solve_step().is_some() {}
    }

    /// Processes the next statement on the worklist and returns it, or
    /// `None` once a fixpoint is reached.
    pub fn solve_step(&mut self) -> Option<NodeId> {
        let stmt = self.worklist.pop()?;
        self.num_processed += 1;
        if self.process_stmt(stmt) {
            for succ in self.vfg.direct_successors(stmt) {
                self.worklist.push(succ);
            }
        }
        self.propagate_indirect(stmt);
        Some(stmt)
    }

    /// Returns true if the value defined by `stmt` (or, for a store, the
    /// contents written by it) changed.
    fn process_stmt(&mut self, stmt: NodeId) -> bool {
        let node = self.vfg.stmt(stmt);
        let target_ty = node.target_ty;
        match node.kind.clone() {
            StmtKind::Addr { obj, dst } => self.process_addr(obj, dst),
            StmtKind::Copy { src, dst, .. } => self.pt_data.union_pts(dst, src),
            StmtKind::Gep { base, dst, offset } => {
                self.process_gep(stmt, base, dst, offset, target_ty)
            }
            StmtKind::Load { ptr, dst } => self.process_load(stmt, ptr, dst, target_ty),
            StmtKind::Store { src, ptr } => self.process_store(stmt, src, ptr, target_ty),
            StmtKind::Phi { dst, operands } => self.process_phi(stmt, dst, &operands, target_ty),
        }
    }

    /// The object and every clone of it made so far.
    fn process_addr(&mut self, obj: NodeId, dst: NodeId) -> bool {
        let mut changed = self.pt_data.add_pts(dst, obj);
        if let Some(clones) = self.heap_cloning.get_clones(obj) {
            let clones = clones.clone();
            changed |= self.pt_data.union_pts_to(dst, &clones);
        }
        changed
    }

    fn process_gep(
        &mut self,
        stmt: NodeId,
        base: NodeId,
        dst: NodeId,
        offset: GepOffset,
        target_ty: Option<TypeId>,
    ) -> bool {
        let tbhc = self.options.tbhc();
        if tbhc && target_ty.is_some() {
            self.init(stmt, base, target_ty, self.options.store_reuse(), true);
        }

        let mut tmp_dst_pts = PointsTo::new();
        for obj in self.get_pts(base).iter() {
            if tbhc && self.filter_sets.is_filtered(stmt, obj) {
                continue;
            }
            let node = self.vfg.obj(obj);
            if node.is_blk_or_const() {
                tmp_dst_pts.insert(obj);
                continue;
            }
            let (kind, mem) = (node.kind, node.mem);
            match offset {
                GepOffset::Variant => {
                    self.vfg.set_field_insensitive(mem);
                    let whole = match kind {
                        ObjKind::Field { base, .. } => base,
                        _ => obj,
                    };
                    tmp_dst_pts.insert(whole);
                }
                GepOffset::Field(idx) => {
                    let base_ty = self.heap_cloning.get_type(obj);
                    if tbhc
                        && self.dchg.is_agg(base_ty)
                        && !self.dchg.is_array(base_ty)
                        && !self.vfg.mem(mem).is_array
                        && idx >= self.dchg.num_fields(base_ty)
                    {
                        debug!("Gep {:?}: offset {} out of bounds of {:?}", stmt, idx, obj);
                        self.filter_sets.filter(stmt, obj);
                        continue;
                    }
                    let fields =
                        self.heap_cloning
                            .get_gep_obj_clones(&mut self.vfg, self.dchg, obj, idx);
                    for field in fields.iter() {
                        self.heap_cloning.add_gep_retriever(field, stmt);
                    }
                    tmp_dst_pts.union(&fields);
                }
            }
        }
        self.pt_data.union_pts_to(dst, &tmp_dst_pts)
    }

    fn process_load(
        &mut self,
        stmt: NodeId,
        ptr: NodeId,
        dst: NodeId,
        target_ty: Option<TypeId>,
    ) -> bool {
        if self.options.tbhc() {
            self.init(stmt, ptr, target_ty, self.options.load_reuse(), false);
        }

        let mut tmp_dst_pts = PointsTo::new();
        for obj in self.get_effective_pts(stmt, ptr).iter() {
            let node = self.vfg.obj(obj);
            if node.kind == ObjKind::Constant {
                continue;
            }
            if let Some(pts) = self.df_pt_data.get_in_pts(stmt, obj) {
                tmp_dst_pts.union(pts);
            }
            let mem = node.mem;
            if self.vfg.mem(mem).field_insensitive {
                if let Some(all) = self.heap_cloning.mem_nodes(mem) {
                    for field in all.iter() {
                        if let Some(pts) = self.df_pt_data.get_in_pts(stmt, field) {
                            tmp_dst_pts.union(pts);
                        }
                    }
                }
            }
        }
        self.pt_data.union_pts_to(dst, &tmp_dst_pts)
    }

    fn process_store(
        &mut self,
        stmt: NodeId,
        src: NodeId,
        ptr: NodeId,
        target_ty: Option<TypeId>,
    ) -> bool {
        if self.get_pts(ptr).is_empty() {
            return false;
        }
        if self.options.tbhc() {
            self.init(stmt, ptr, target_ty, self.options.store_reuse(), false);
        }

        let src_pts = self.get_pts(src);
        let effective = self.get_effective_pts(stmt, ptr);
        let mut changed = false;
        for obj in effective.iter() {
            if self.vfg.obj(obj).is_blk_or_const() {
                continue;
            }
            changed |= self.df_pt_data.union_out_pts(stmt, obj, &src_pts);
        }

        // A black hole or constant target leaves the store ambiguous.
        let killed = match effective.iter().next() {
            Some(single) if effective.count() == 1 && self.is_strong_updatable(single) => {
                Some(single)
            }
            _ => None,
        };
        if killed.is_some() {
            self.num_strong_updates += 1;
        }
        changed |= self.df_pt_data.update_all_out_from_in(stmt, killed);
        changed
    }

    /// A store through a pointer to this object overwrites its contents.
    pub fn is_strong_updatable(&self, obj: NodeId) -> bool {
        let node = self.vfg.obj(obj);
        if !matches!(node.kind, ObjKind::Base | ObjKind::Field { .. }) {
            return false;
        }
        let mem = self.vfg.mem(node.mem);
        !(mem.is_heap()
            || mem.is_array
            || mem.in_recursion
            || mem.field_insensitive
            || mem.alloc == AllocKind::Special)
    }

    fn process_phi(
        &mut self,
        stmt: NodeId,
        dst: NodeId,
        operands: &[NodeId],
        receiver: Option<TypeId>,
    ) -> bool {
        let mut changed = false;
        for (i, operand) in operands.iter().enumerate() {
            if i == 0 && receiver.is_some() && self.options.tbhc() {
                // `this` of a constructor takes the constructed type on entry.
                self.init(stmt, *operand, receiver, false, false);
                let pts = self.get_effective_pts(stmt, *operand);
                changed |= self.pt_data.union_pts_to(dst, &pts);
            } else {
                changed |= self.pt_data.union_pts(dst, *operand);
            }
        }
        changed
    }

    /// Carries the contents of the objects on every indirect edge leaving
    /// `stmt` into the IN sets of the edge targets.
    fn propagate_indirect(&mut self, stmt: NodeId) {
        let from_out = matches!(self.vfg.stmt(stmt).kind, StmtKind::Store { .. });
        let edges: Vec<(NodeId, PointsTo<NodeId>)> = self
            .vfg
            .indirect_successors(stmt)
            .into_iter()
            .map(|(dst, label)| (dst, label.clone()))
            .collect();
        for (dst, label) in edges {
            let objs = self.heap_cloning.expand_edge_objs(&self.vfg, &label);
            let mut changed = false;
            for obj in objs.iter() {
                changed |= if from_out {
                    self.df_pt_data.update_in_from_out(stmt, obj, dst)
                } else {
                    self.df_pt_data.update_in_from_in(stmt, obj, dst)
                };
            }
            if changed {
                self.worklist.push(dst);
            }
        }
    }

    /// Type-based initialization of `ptr`'s points-to set at `loc`, where
    /// `ptr` is used to access memory of type `tildet`.
    ///
    /// Each unfiltered object is kept, replaced by a clone of type `tildet`,
    /// or filtered, by the first rule that applies:
    /// 1. field-insensitive objects already covering a field of type `tildet` are kept;
    /// 2. at a GEP, objects with `tildet` nested in their type are kept;
    /// 3. untyped objects are cloned;
    /// 4. objects of a base type of `tildet` are cloned (downcast);
    /// 5. objects of a derived type of `tildet` are kept (upcast);
    /// 6. with reuse, objects of any other type are cloned;
    /// 7. anything else is filtered.
    ///
    /// A cloned object stays in the points-to set but is filtered at `loc`.
    /// Returns true if the points-to set of `ptr` changed.
    pub fn init(
        &mut self,
        loc: NodeId,
        ptr: NodeId,
        tildet: Option<TypeId>,
        reuse: bool,
        gep: bool,
    ) -> bool {
        let Some(tildet) = self.dchg.get_canonical_type(tildet) else {
            return false;
        };
        let first_field = self.options.first_field;
        let pts = self.get_pts(ptr);
        let mut new_pts = pts.clone();

        for obj in pts.iter() {
            if self.filter_sets.is_filtered(loc, obj) {
                continue;
            }
            let node = self.vfg.obj(obj);
            if node.is_blk_or_const() {
                continue;
            }
            let is_field = node.is_field();
            let field_insensitive = self.vfg.mem(node.mem).field_insensitive;
            let tp = self.heap_cloning.get_type(obj);

            let prop = if field_insensitive && self.dchg.field_types(tp).contains(&tildet) {
                Some(obj)
            } else if gep && self.nests_in_aggregate(obj, tp, tildet) {
                Some(obj)
            } else if tp.is_none() {
                Some(self.clone_object(obj, tildet))
            } else if tp != Some(tildet)
                && self.dchg.is_base(tp, Some(tildet), first_field)
                && (!reuse || !is_field)
            {
                Some(self.clone_object(obj, tildet))
            } else if self.dchg.is_base(Some(tildet), tp, first_field) {
                Some(obj)
            } else if reuse && tp != Some(tildet) {
                Some(self.clone_object(obj, tildet))
            } else {
                None
            };

            match prop {
                Some(prop) if prop == obj => {}
                Some(clone) => {
                    self.filter_sets.filter(loc, obj);
                    new_pts.insert(clone);
                }
                None => {
                    debug!(
                        "Filtered {:?} of type {} at {:?}, accessed as {}",
                        obj,
                        self.dchg.type_name(tp),
                        loc,
                        self.dchg.type_name(Some(tildet))
                    );
                    self.filter_sets.filter(loc, obj);
                }
            }
        }

        let changed = self.pt_data.union_pts_to(ptr, &new_pts);
        if changed {
            for user in self.vfg.value_users(ptr).to_vec() {
                self.worklist.push(user);
            }
        }
        changed
    }

    /// Whether `tildet` is nested in `tp` or, for a field object, in the type
    /// of the object the field belongs to. A second GEP in a chain reaches
    /// the field object of the first one.
    fn nests_in_aggregate(&self, obj: NodeId, tp: Option<TypeId>, tildet: TypeId) -> bool {
        let nested_in =
            |ty: Option<TypeId>| self.dchg.aggs(ty).map_or(false, |aggs| aggs.contains(&tildet));
        if nested_in(tp) {
            return true;
        }
        match self.vfg.obj(obj).kind {
            ObjKind::Field { base, .. } => nested_in(self.heap_cloning.get_type(base)),
            _ => false,
        }
    }

    fn clone_object(&mut self, obj: NodeId, ty: TypeId) -> NodeId {
        self.heap_cloning
            .clone_object(&mut self.vfg, obj, Some(ty), &mut self.worklist)
    }

    /// Finalize the analysis.
    pub fn finalize(&self) {
        if let Some(output) = &self.options.pts_output {
            if let Err(e) = results_dumper::dump_pts_to_file(self, output) {
                error!("Failed to dump points-to results to {}: {:?}", output, e);
            }
        }

        if self.options.dump_stats {
            let fs_stat = FSStat::new(self);
            fs_stat.dump_stats();
        }
    }
}

impl<'pta> PointerAnalysis for FlowSensitivePTA<'pta> {
    /// Solve the whole value-flow graph to a fixed point.
    fn analyze(&mut self) {
        let now = Instant::now();

        // Initialization for the analysis.
        self.initialize();

        // Solve the worklist problem.
        self.solve_worklist();

        let elapsed = now.elapsed();
        match self.options.pta_type {
            PTAType::FlowSensitive => info!("Flow-sensitive analysis completed."),
            PTAType::FlowSensitiveTBHC => info!(
                "Flow-sensitive analysis with type-based heap cloning completed, {} clones.",
                self.heap_cloning.num_clones
            ),
        }
        info!(
            "Analysis time: {}",
            humantime::format_duration(elapsed).to_string()
        );

        // Finalize the analysis.
        self.finalize();
    }
}
