// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Type-based heap cloning: the object <-> clone mapping, the type and
//! allocation site of every object, and field object resolution.

use log::*;
use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter, Result};

use crate::dchg::di_type::TypeId;
use crate::dchg::DCHGraph;
use crate::graph::node::{MemId, ObjKind};
use crate::graph::vfg::VFG;
use crate::pta::*;
use crate::pts_set::points_to::PointsToSet;
use crate::util::worklist::FIFOWorkList;

/// Notified with the statements to revisit once a new clone exists.
pub trait CloneListener {
    fn on_clone(&mut self, stmt: NodeId);
}

impl CloneListener for FIFOWorkList<NodeId> {
    fn on_clone(&mut self, stmt: NodeId) {
        self.push(stmt);
    }
}

impl CloneListener for Vec<NodeId> {
    fn on_clone(&mut self, stmt: NodeId) {
        self.push(stmt);
    }
}

pub struct HeapCloning {
    /// Type of every object; `None` is the undefined type.
    obj_types: HashMap<NodeId, Option<TypeId>>,
    alloc_sites: HashMap<NodeId, NodeId>,
    obj_to_clones: HashMap<NodeId, PointsTo<NodeId>>,
    clone_to_original: HashMap<NodeId, NodeId>,
    /// Field objects (and their clones) of a whole object at a flattened offset.
    gep_objs: HashMap<(NodeId, usize), PointsTo<NodeId>>,
    /// Field objects of a memory object at a flattened offset, across all
    /// whole objects and clones.
    mem_field_objs: HashMap<(MemId, usize), PointsTo<NodeId>>,
    /// Every object node of a memory object.
    mem_nodes: HashMap<MemId, PointsTo<NodeId>>,
    /// GEP statements that produced a field object.
    gep_retrievers: HashMap<NodeId, HashSet<NodeId>>,
    max_field_limit: usize,

    pub(crate) num_clones: usize,
    pub(crate) num_field_objs: usize,
}

impl Debug for HeapCloning {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        "HeapCloning".fmt(f)
    }
}

impl HeapCloning {
    pub fn new(max_field_limit: usize) -> Self {
        HeapCloning {
            obj_types: HashMap::new(),
            alloc_sites: HashMap::new(),
            obj_to_clones: HashMap::new(),
            clone_to_original: HashMap::new(),
            gep_objs: HashMap::new(),
            mem_field_objs: HashMap::new(),
            mem_nodes: HashMap::new(),
            gep_retrievers: HashMap::new(),
            max_field_limit,
            num_clones: 0,
            num_field_objs: 0,
        }
    }

    /// Registers an object that exists before solving.
    pub fn register_object(&mut self, vfg: &VFG, obj: NodeId, ty: Option<TypeId>) {
        let mem = vfg.obj(obj).mem;
        self.mem_nodes.entry(mem).or_default().insert(obj);
        self.set_type(obj, ty);
    }

    #[inline]
    pub fn set_type(&mut self, obj: NodeId, ty: Option<TypeId>) {
        self.obj_types.insert(obj, ty);
    }

    /// Type of `obj`. Panics if it was never set.
    pub fn get_type(&self, obj: NodeId) -> Option<TypeId> {
        match self.obj_types.get(&obj) {
            Some(ty) => *ty,
            None => panic!("Object {:?} has no type", obj),
        }
    }

    #[inline]
    pub fn set_allocation_site(&mut self, obj: NodeId, site: NodeId) {
        self.alloc_sites.insert(obj, site);
    }

    /// The Addr statement allocating `obj`, if any.
    #[inline]
    pub fn get_allocation_site(&self, obj: NodeId) -> Option<NodeId> {
        self.alloc_sites.get(&obj).copied()
    }

    #[inline]
    pub fn is_clone(&self, obj: NodeId) -> bool {
        self.clone_to_original.contains_key(&obj)
    }

    /// The non-clone object `obj` was cloned from, or `obj` itself.
    #[inline]
    pub fn get_original(&self, obj: NodeId) -> NodeId {
        self.clone_to_original.get(&obj).copied().unwrap_or(obj)
    }

    pub fn get_clones(&self, obj: NodeId) -> Option<&PointsTo<NodeId>> {
        self.obj_to_clones.get(&obj)
    }

    /// Every object node of memory object `mem`.
    pub fn mem_nodes(&self, mem: MemId) -> Option<&PointsTo<NodeId>> {
        self.mem_nodes.get(&mem)
    }

    pub fn add_gep_retriever(&mut self, field_obj: NodeId, gep: NodeId) {
        let original = self.get_original(field_obj);
        self.gep_retrievers.entry(original).or_default().insert(gep);
    }

    /// Returns the clone of `obj` with type `ty`, creating it if needed.
    ///
    /// Clones of clones are made from the original object. A new clone is
    /// announced to `listener` through the statements that need to revisit
    /// it: the allocation site of a whole object, or the GEPs that retrieved
    /// a field object.
    pub fn clone_object(
        &mut self,
        vfg: &mut VFG,
        obj: NodeId,
        ty: Option<TypeId>,
        listener: &mut dyn CloneListener,
    ) -> NodeId {
        let original = self.get_original(obj);
        if let Some(clones) = self.obj_to_clones.get(&original) {
            if let Some(clone) = clones.iter().find(|c| self.obj_types.get(c) == Some(&ty)) {
                return clone;
            }
        }

        let kind = vfg.obj(original).kind;
        if matches!(kind, ObjKind::BlackHole | ObjKind::Constant) {
            panic!("Cannot clone {:?} object {:?}", kind, original);
        }
        let clone = vfg.add_clone_of(original);
        self.num_clones += 1;
        debug!(
            "Cloned {} ({:?}) into {:?} with type {:?}",
            vfg.obj(original).name,
            original,
            clone,
            ty
        );

        self.set_type(clone, ty);
        if let Some(site) = self.get_allocation_site(original) {
            self.set_allocation_site(clone, site);
        }
        self.obj_to_clones.entry(original).or_default().insert(clone);
        self.clone_to_original.insert(clone, original);
        let mem = vfg.obj(clone).mem;
        self.mem_nodes.entry(mem).or_default().insert(clone);
        if let ObjKind::Field { base, offset } = kind {
            self.gep_objs.entry((base, offset)).or_default().insert(clone);
            self.mem_field_objs.entry((mem, offset)).or_default().insert(clone);
        }

        self.back_propagate(vfg, clone, listener);
        clone
    }

    fn back_propagate(&self, vfg: &VFG, clone: NodeId, listener: &mut dyn CloneListener) {
        let original = self.get_original(clone);
        match vfg.obj(clone).kind {
            ObjKind::Field { .. } => {
                if let Some(geps) = self.gep_retrievers.get(&original) {
                    for gep in geps {
                        listener.on_clone(*gep);
                    }
                }
            }
            ObjKind::Base | ObjKind::Dummy => {
                if let Some(site) = self.get_allocation_site(original) {
                    listener.on_clone(site);
                }
            }
            ObjKind::BlackHole | ObjKind::Constant => unreachable!(),
        }
    }

    /// Every object standing for the field at `offset` of `base`, clones included.
    ///
    /// Offset 0 of a non-array object is the object itself, and so is any
    /// field of a field-insensitive object. Missing field objects are created
    /// and typed after the field, the element of an array, or the pointee of
    /// a pointer.
    pub fn get_gep_obj_clones(
        &mut self,
        vfg: &mut VFG,
        dchg: &DCHGraph,
        base: NodeId,
        offset: usize,
    ) -> PointsTo<NodeId> {
        let base_obj = vfg.obj(base);
        let (kind, mem) = (base_obj.kind, base_obj.mem);
        let single = |obj: NodeId| -> PointsTo<NodeId> { std::iter::once(obj).collect() };
        if matches!(kind, ObjKind::BlackHole | ObjKind::Constant) {
            return single(base);
        }
        let base_ty = self.get_type(base);
        let is_array = vfg.mem(mem).is_array || dchg.is_array(base_ty);
        if vfg.mem(mem).field_insensitive || (offset == 0 && !is_array) {
            return single(base);
        }

        let (root, abs_offset) = match kind {
            ObjKind::Field { base: root, offset: k } => (root, k + offset),
            _ => (base, offset),
        };
        if abs_offset >= self.max_field_limit {
            info!(
                "Field offset {} of {} reaches the field limit",
                abs_offset,
                vfg.mem(mem).name
            );
            vfg.set_field_insensitive(mem);
            return single(base);
        }
        if let Some(existing) = self.gep_objs.get(&(root, abs_offset)) {
            return existing.clone();
        }

        let field_ty = if is_array {
            dchg.element_type(base_ty)
        } else if dchg.is_pointer(base_ty) {
            dchg.pointee_type(base_ty)
        } else if root != base && self.get_type(root).is_some() {
            dchg.field_type(self.get_type(root), abs_offset)
        } else {
            dchg.field_type(base_ty, offset)
        };
        let field = vfg.add_field_obj(root, abs_offset);
        self.num_field_objs += 1;
        self.set_type(field, field_ty);
        if let Some(site) = self.get_allocation_site(base) {
            self.set_allocation_site(field, site);
        }
        self.mem_nodes.entry(mem).or_default().insert(field);
        self.mem_field_objs
            .entry((mem, abs_offset))
            .or_default()
            .insert(field);
        let fields = self.gep_objs.entry((root, abs_offset)).or_default();
        fields.insert(field);
        fields.clone()
    }

    /// The objects whose contents flow along an indirect edge labelled with
    /// `objs`: the labelled objects, their clones, field objects at the same
    /// offset of the same memory object, and every object of a
    /// field-insensitive memory object.
    pub fn expand_edge_objs(&self, vfg: &VFG, objs: &PointsTo<NodeId>) -> PointsTo<NodeId> {
        let mut expanded = objs.clone();
        for obj in objs.iter() {
            let original = self.get_original(obj);
            expanded.insert(original);
            if let Some(clones) = self.obj_to_clones.get(&original) {
                expanded.union(clones);
            }
            let node = vfg.obj(obj);
            if let ObjKind::Field { offset, .. } = node.kind {
                if let Some(siblings) = self.mem_field_objs.get(&(node.mem, offset)) {
                    expanded.union(siblings);
                }
            }
            if vfg.mem(node.mem).field_insensitive {
                if let Some(all) = self.mem_nodes.get(&node.mem) {
                    expanded.union(all);
                }
            }
        }
        expanded
    }
}
