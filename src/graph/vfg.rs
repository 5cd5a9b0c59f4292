// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Sparse value-flow graph.
//!
//! Values, memory objects and statements are all nodes of one graph. Direct
//! edges connect the statement defining a value to every statement using it
//! and are wired automatically as statements are added. Indirect edges carry
//! the contents of address-taken objects from one statement to another and are
//! labelled with the objects flowing along them.

use log::*;
use petgraph::graph::{DefaultIx, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Graph;
use std::collections::{BTreeSet, HashMap};

use super::node::*;
use crate::dchg::di_type::TypeId;
use crate::pts_set::points_to::{HybridPointsToSet, PointsToSet};
use crate::util::bit_vec::Idx;

// Unique identifiers for graph node and edges.
pub type NodeId = NodeIndex<DefaultIx>;
pub type EdgeId = EdgeIndex<DefaultIx>;

impl Idx for NodeId {
    #[inline]
    fn new(idx: usize) -> Self {
        NodeIndex::new(idx)
    }

    #[inline]
    fn index(self) -> usize {
        self.index()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum VFGEdge {
    /// Top-level value flow from a definition to a use.
    Direct,
    /// Flow of the contents of the labelled objects.
    Indirect(HybridPointsToSet<NodeId>),
}

type EdgeMap = HashMap<NodeId, BTreeSet<EdgeId>>;

pub struct VFG {
    /// The graph structure capturing value flows between nodes.
    pub(crate) graph: Graph<VFGNode, VFGEdge>,
    pub(crate) mem_objs: Vec<MemObj>,
    /// Named values and objects.
    names: HashMap<String, NodeId>,
    /// Statements in insertion order.
    stmts: Vec<NodeId>,
    /// Objects in creation order, clones and field objects included.
    objects: Vec<NodeId>,
    black_hole: Option<NodeId>,
    constant_obj: Option<NodeId>,
    value_defs: HashMap<NodeId, Vec<NodeId>>,
    value_users: HashMap<NodeId, Vec<NodeId>>,
    /// Initial points-to relations of top-level values.
    seeds: Vec<(NodeId, NodeId)>,

    pub(crate) direct_in_edges: EdgeMap,
    pub(crate) direct_out_edges: EdgeMap,
    pub(crate) indirect_in_edges: EdgeMap,
    pub(crate) indirect_out_edges: EdgeMap,
}

impl Default for VFG {
    fn default() -> Self {
        Self::new()
    }
}

impl VFG {
    /// Constructor
    pub fn new() -> Self {
        VFG {
            graph: Graph::new(),
            mem_objs: Vec::new(),
            names: HashMap::new(),
            stmts: Vec::new(),
            objects: Vec::new(),
            black_hole: None,
            constant_obj: None,
            value_defs: HashMap::new(),
            value_users: HashMap::new(),
            seeds: Vec::new(),
            direct_in_edges: EdgeMap::new(),
            direct_out_edges: EdgeMap::new(),
            indirect_in_edges: EdgeMap::new(),
            indirect_out_edges: EdgeMap::new(),
        }
    }

    /// Returns a reference to the graph.
    #[inline]
    pub fn graph(&self) -> &Graph<VFGNode, VFGEdge> {
        &self.graph
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the node for the given node_id.
    pub fn get_node(&self, node_id: NodeId) -> &VFGNode {
        self.graph
            .node_weight(node_id)
            .unwrap_or_else(|| panic!("No VFG node {:?}", node_id))
    }

    /// Returns the node_id of a named value or object.
    pub fn get_node_id(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn is_value(&self, node_id: NodeId) -> bool {
        matches!(self.graph.node_weight(node_id), Some(VFGNode::Value(_)))
    }

    pub fn is_object(&self, node_id: NodeId) -> bool {
        matches!(self.graph.node_weight(node_id), Some(VFGNode::Object(_)))
    }

    pub fn is_stmt(&self, node_id: NodeId) -> bool {
        matches!(self.graph.node_weight(node_id), Some(VFGNode::Stmt(_)))
    }

    pub fn value(&self, node_id: NodeId) -> &ValueNode {
        match self.get_node(node_id) {
            VFGNode::Value(value) => value,
            node => panic!("{:?} is not a value: {:?}", node_id, node),
        }
    }

    pub fn obj(&self, node_id: NodeId) -> &ObjNode {
        match self.get_node(node_id) {
            VFGNode::Object(obj) => obj,
            node => panic!("{:?} is not an object: {:?}", node_id, node),
        }
    }

    pub fn stmt(&self, node_id: NodeId) -> &StmtNode {
        match self.get_node(node_id) {
            VFGNode::Stmt(stmt) => stmt,
            node => panic!("{:?} is not a statement: {:?}", node_id, node),
        }
    }

    #[inline]
    pub fn mem(&self, mem: MemId) -> &MemObj {
        &self.mem_objs[mem.0 as usize]
    }

    /// The memory object `obj` belongs to.
    #[inline]
    pub fn mem_of(&self, obj: NodeId) -> &MemObj {
        self.mem(self.obj(obj).mem)
    }

    pub fn set_field_insensitive(&mut self, mem: MemId) {
        let mem_obj = &mut self.mem_objs[mem.0 as usize];
        if !mem_obj.field_insensitive {
            debug!("Memory object {} collapsed to field-insensitive", mem_obj.name);
            mem_obj.field_insensitive = true;
        }
    }

    /// Statements in insertion order.
    #[inline]
    pub fn stmts(&self) -> &[NodeId] {
        &self.stmts
    }

    /// All object nodes, including lazily created field objects and clones.
    #[inline]
    pub fn objects(&self) -> &[NodeId] {
        &self.objects
    }

    /// Named top-level values.
    pub fn values(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph
            .node_indices()
            .filter(move |id| matches!(self.graph[*id], VFGNode::Value(_)))
    }

    #[inline]
    pub fn seeds(&self) -> &[(NodeId, NodeId)] {
        &self.seeds
    }

    /// Statements reading `value`.
    pub fn value_users(&self, value: NodeId) -> &[NodeId] {
        self.value_users.get(&value).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Statements defining `value`.
    pub fn value_defs(&self, value: NodeId) -> &[NodeId] {
        self.value_defs.get(&value).map(Vec::as_slice).unwrap_or(&[])
    }

    fn add_named(&mut self, name: &str, node: VFGNode) -> NodeId {
        let node_id = self.graph.add_node(node);
        if self.names.insert(name.to_string(), node_id).is_some() {
            warn!("Name {} is bound to more than one node", name);
        }
        node_id
    }

    /// Adds a top-level value.
    pub fn add_value(&mut self, name: &str) -> NodeId {
        self.add_named(
            name,
            VFGNode::Value(ValueNode {
                name: name.to_string(),
            }),
        )
    }

    fn add_mem_obj(&mut self, mem_obj: MemObj) -> MemId {
        let mem = MemId(self.mem_objs.len() as u32);
        self.mem_objs.push(mem_obj);
        mem
    }

    fn add_obj_node(&mut self, obj: ObjNode) -> NodeId {
        let node_id = self.graph.add_node(VFGNode::Object(obj));
        self.objects.push(node_id);
        node_id
    }

    /// Adds the base object of a new memory object.
    pub fn add_object(&mut self, mem_obj: MemObj) -> NodeId {
        self.add_root_object(mem_obj, ObjKind::Base)
    }

    /// Adds a placeholder object without a backing allocation.
    pub fn add_dummy_object(&mut self, name: &str, ty: Option<TypeId>) -> NodeId {
        self.add_root_object(MemObj::new(name, AllocKind::Special, ty), ObjKind::Dummy)
    }

    /// The unique black-hole object.
    pub fn black_hole(&mut self) -> NodeId {
        if let Some(obj) = self.black_hole {
            return obj;
        }
        let mem_obj = MemObj::new("blackhole", AllocKind::Special, None).field_insensitive();
        let obj = self.add_root_object(mem_obj, ObjKind::BlackHole);
        self.black_hole = Some(obj);
        obj
    }

    /// The unique object standing for all merged constants.
    pub fn constant_object(&mut self) -> NodeId {
        if let Some(obj) = self.constant_obj {
            return obj;
        }
        let mem_obj = MemObj::new("constant", AllocKind::Constant, None).field_insensitive();
        let obj = self.add_root_object(mem_obj, ObjKind::Constant);
        self.constant_obj = Some(obj);
        obj
    }

    fn add_root_object(&mut self, mem_obj: MemObj, kind: ObjKind) -> NodeId {
        let name = mem_obj.name.clone();
        let mem = self.add_mem_obj(mem_obj);
        let node_id = self.graph.add_node(VFGNode::Object(ObjNode {
            kind,
            mem,
            name: name.clone(),
        }));
        self.objects.push(node_id);
        if self.names.insert(name.clone(), node_id).is_some() {
            warn!("Name {} is bound to more than one node", name);
        }
        node_id
    }

    /// Materializes the field at flattened offset `offset` of `base`.
    pub fn add_field_obj(&mut self, base: NodeId, offset: usize) -> NodeId {
        let base_obj = self.obj(base);
        let obj = ObjNode {
            kind: ObjKind::Field { base, offset },
            mem: base_obj.mem,
            name: format!("{}.{}", base_obj.name, offset),
        };
        self.add_obj_node(obj)
    }

    /// Adds a fresh node of the same kind and memory object as `obj`.
    pub fn add_clone_of(&mut self, obj: NodeId) -> NodeId {
        let clone = self.obj(obj).clone();
        self.add_obj_node(clone)
    }

    /// Adds a statement and wires the direct edges of the values it defines and uses.
    pub fn add_stmt(&mut self, kind: StmtKind, target_ty: Option<TypeId>) -> NodeId {
        let def = kind.def();
        let uses = kind.uses();
        let stmt = self.graph.add_node(VFGNode::Stmt(StmtNode { kind, target_ty }));
        self.stmts.push(stmt);

        for used in uses {
            let defs = self.value_defs(used).to_vec();
            for def_stmt in defs {
                self.add_direct_edge(def_stmt, stmt);
            }
            let users = self.value_users.entry(used).or_default();
            if !users.contains(&stmt) {
                users.push(stmt);
            }
        }
        if let Some(def) = def {
            let users = self.value_users(def).to_vec();
            for user in users {
                self.add_direct_edge(stmt, user);
            }
            self.value_defs.entry(def).or_default().push(stmt);
        }
        stmt
    }

    pub fn add_addr(&mut self, obj: NodeId, dst: NodeId) -> NodeId {
        self.add_stmt(StmtKind::Addr { obj, dst }, None)
    }

    pub fn add_copy(&mut self, src: NodeId, dst: NodeId) -> NodeId {
        self.add_stmt(
            StmtKind::Copy {
                src,
                dst,
                vtable_init: false,
            },
            None,
        )
    }

    pub fn add_vtable_copy(&mut self, src: NodeId, dst: NodeId) -> NodeId {
        self.add_stmt(
            StmtKind::Copy {
                src,
                dst,
                vtable_init: true,
            },
            None,
        )
    }

    /// `dst = &base->offset`, where `base` points to memory of type `target_ty`.
    pub fn add_gep(
        &mut self,
        base: NodeId,
        dst: NodeId,
        offset: usize,
        target_ty: Option<TypeId>,
    ) -> NodeId {
        let offset = GepOffset::Field(offset);
        self.add_stmt(StmtKind::Gep { base, dst, offset }, target_ty)
    }

    pub fn add_variant_gep(&mut self, base: NodeId, dst: NodeId) -> NodeId {
        let offset = GepOffset::Variant;
        self.add_stmt(StmtKind::Gep { base, dst, offset }, None)
    }

    /// `dst = *ptr`, where `ptr` points to memory of type `target_ty`.
    pub fn add_load(&mut self, ptr: NodeId, dst: NodeId, target_ty: Option<TypeId>) -> NodeId {
        self.add_stmt(StmtKind::Load { ptr, dst }, target_ty)
    }

    /// `*ptr = src`, where `ptr` points to memory of type `target_ty`.
    pub fn add_store(&mut self, src: NodeId, ptr: NodeId, target_ty: Option<TypeId>) -> NodeId {
        self.add_stmt(StmtKind::Store { src, ptr }, target_ty)
    }

    /// A phi. With `receiver`, the phi is the `this` parameter of a constructor
    /// of that type and `operands[0]` is the incoming receiver.
    pub fn add_phi(
        &mut self,
        dst: NodeId,
        operands: Vec<NodeId>,
        receiver: Option<TypeId>,
    ) -> NodeId {
        self.add_stmt(StmtKind::Phi { dst, operands }, receiver)
    }

    /// Records that `value` initially points to `obj`.
    pub fn seed_pts(&mut self, value: NodeId, obj: NodeId) {
        self.seeds.push((value, obj));
    }

    fn contains_edge(&self, src: NodeId, dst: NodeId, direct: bool) -> Option<EdgeId> {
        self.graph
            .edges_connecting(src, dst)
            .find(|e| matches!(e.weight(), VFGEdge::Direct) == direct)
            .map(|e| e.id())
    }

    pub fn add_direct_edge(&mut self, src: NodeId, dst: NodeId) -> Option<EdgeId> {
        if self.contains_edge(src, dst, true).is_some() {
            return None;
        }
        let edge_id = self.graph.add_edge(src, dst, VFGEdge::Direct);
        self.direct_out_edges.entry(src).or_default().insert(edge_id);
        self.direct_in_edges.entry(dst).or_default().insert(edge_id);
        Some(edge_id)
    }

    /// Adds an indirect edge carrying the contents of `objs` from statement
    /// `src` to statement `dst`. An existing edge gets its label extended.
    pub fn add_indirect_edge(&mut self, src: NodeId, dst: NodeId, objs: &[NodeId]) -> EdgeId {
        assert!(self.is_stmt(src) && self.is_stmt(dst));
        if let Some(edge_id) = self.contains_edge(src, dst, false) {
            if let Some(VFGEdge::Indirect(label)) = self.graph.edge_weight_mut(edge_id) {
                for obj in objs {
                    label.insert(*obj);
                }
            }
            return edge_id;
        }
        let label = objs.iter().copied().collect();
        let edge_id = self.graph.add_edge(src, dst, VFGEdge::Indirect(label));
        self.indirect_out_edges.entry(src).or_default().insert(edge_id);
        self.indirect_in_edges.entry(dst).or_default().insert(edge_id);
        edge_id
    }

    /// Targets of the direct edges leaving `node_id`.
    pub fn direct_successors(&self, node_id: NodeId) -> Vec<NodeId> {
        self.direct_out_edges
            .get(&node_id)
            .map(|edges| {
                edges
                    .iter()
                    .filter_map(|e| self.graph.edge_endpoints(*e))
                    .map(|(_, dst)| dst)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Indirect edges leaving `node_id` as (target, label) pairs.
    pub fn indirect_successors(&self, node_id: NodeId) -> Vec<(NodeId, &HybridPointsToSet<NodeId>)> {
        let Some(edges) = self.indirect_out_edges.get(&node_id) else {
            return Vec::new();
        };
        edges
            .iter()
            .filter_map(|e| {
                let (_, dst) = self.graph.edge_endpoints(*e)?;
                match self.graph.edge_weight(*e)? {
                    VFGEdge::Indirect(label) => Some((dst, label)),
                    VFGEdge::Direct => None,
                }
            })
            .collect()
    }

    pub fn num_indirect_edges(&self) -> usize {
        self.indirect_out_edges.values().map(BTreeSet::len).sum()
    }
}
