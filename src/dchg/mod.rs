// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Type hierarchy oracle built from debug-info type descriptors.
//!
//! Types are first canonicalized: every descriptor is mapped to the first
//! descriptor it is `teq` to. The hierarchy graph then has one node per
//! canonical type, an `Inheritance` edge from every base class to its derived
//! class and a `FirstField` edge from the type of a struct's first field to the
//! struct. `is_base(a, b)` holds iff `b` is reachable from `a`.

use log::*;
use petgraph::graph::{DefaultIx, NodeIndex};
use petgraph::visit::{Dfs, EdgeFiltered, EdgeRef};
use petgraph::Graph;
use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter, Result};

use self::di_type::{DITypeKind, DITypeTable, TypeId};

pub mod di_type;

type DCHNodeId = NodeIndex<DefaultIx>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DCHEdgeKind {
    Inheritance,
    FirstField,
}

pub struct DCHNode {
    pub ty: TypeId,
}

pub struct DCHEdge {
    pub kind: DCHEdgeKind,
}

pub struct DCHGraph {
    table: DITypeTable,
    /// Canonical representative of every type; `None` for types that strip to void.
    canonicals: HashMap<TypeId, Option<TypeId>>,
    graph: Graph<DCHNode, DCHEdge>,
    nodes: HashMap<TypeId, DCHNodeId>,
    /// Types reachable over inheritance edges, self included.
    descendants: HashMap<TypeId, HashSet<TypeId>>,
    /// Types reachable over inheritance and first-field edges, self included.
    ext_descendants: HashMap<TypeId, HashSet<TypeId>>,
    field_types: HashMap<TypeId, Vec<TypeId>>,
    aggs: HashMap<TypeId, HashSet<TypeId>>,
}

impl Debug for DCHGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        "DCHGraph".fmt(f)
    }
}

impl DCHGraph {
    /// The oracle used when no debug information is available. Every type
    /// query answers "undefined".
    pub fn empty() -> Self {
        Self::new(DITypeTable::new())
    }

    pub fn new(table: DITypeTable) -> Self {
        let mut dchg = DCHGraph {
            table,
            canonicals: HashMap::new(),
            graph: Graph::new(),
            nodes: HashMap::new(),
            descendants: HashMap::new(),
            ext_descendants: HashMap::new(),
            field_types: HashMap::new(),
            aggs: HashMap::new(),
        };
        if dchg.table.is_empty() {
            warn!("No debug-info types available, every object will be untyped");
            return dchg;
        }
        dchg.build_canonicals();
        dchg.build_hierarchy();
        dchg.compute_reachability();
        dchg.flatten_all();
        dchg.compute_all_aggs();
        info!(
            "DCHG built: {} types, {} canonical, {} hierarchy edges",
            dchg.table.len(),
            dchg.nodes.len(),
            dchg.graph.edge_count()
        );
        dchg
    }

    #[inline]
    pub fn table(&self) -> &DITypeTable {
        &self.table
    }

    /// The first type, in table order, that is `teq` to `t`'s stripped form.
    fn build_canonicals(&mut self) {
        let mut reps: Vec<TypeId> = Vec::new();
        for id in self.table.ids() {
            let canonical = self.table.strip_qualifiers(Some(id)).map(|stripped| {
                match reps.iter().find(|rep| self.table.teq(Some(**rep), Some(stripped))) {
                    Some(rep) => *rep,
                    None => {
                        reps.push(stripped);
                        stripped
                    }
                }
            });
            self.canonicals.insert(id, canonical);
        }
        for rep in reps {
            let node = self.graph.add_node(DCHNode { ty: rep });
            self.nodes.insert(rep, node);
        }
    }

    fn build_hierarchy(&mut self) {
        let records: Vec<TypeId> = self.nodes.keys().copied().collect();
        for ty in records {
            let Some(members) = self.table.get(ty).members() else {
                continue;
            };
            if self.table.get(ty).is_union() {
                continue;
            }
            let mut edges = Vec::new();
            for member in members.iter().filter(|m| m.inheritance) {
                if let Some(base) = self.get_canonical_type(Some(member.ty)) {
                    edges.push((base, DCHEdgeKind::Inheritance));
                }
            }
            if let Some(first) = members.iter().find(|m| !m.inheritance) {
                if let Some(field_ty) = self.get_canonical_type(Some(first.ty)) {
                    edges.push((field_ty, DCHEdgeKind::FirstField));
                }
            }
            let dst = self.nodes[&ty];
            for (src_ty, kind) in edges {
                let src = self.nodes[&src_ty];
                if src != dst {
                    self.graph.add_edge(src, dst, DCHEdge { kind });
                }
            }
        }
    }

    fn compute_reachability(&mut self) {
        let inheritance_only =
            EdgeFiltered::from_fn(&self.graph, |e| e.weight().kind == DCHEdgeKind::Inheritance);
        for (ty, node) in self.nodes.iter() {
            let mut reached = HashSet::new();
            let mut dfs = Dfs::new(&inheritance_only, *node);
            while let Some(nx) = dfs.next(&inheritance_only) {
                reached.insert(self.graph[nx].ty);
            }
            self.descendants.insert(*ty, reached);

            let mut reached = HashSet::new();
            let mut dfs = Dfs::new(&self.graph, *node);
            while let Some(nx) = dfs.next(&self.graph) {
                reached.insert(self.graph[nx].ty);
            }
            self.ext_descendants.insert(*ty, reached);
        }
    }

    fn flatten_all(&mut self) {
        let types: Vec<TypeId> = self.nodes.keys().copied().collect();
        for ty in types {
            let mut in_progress = HashSet::new();
            let fields = self.flatten(ty, &mut in_progress);
            self.field_types.insert(ty, fields);
        }
    }

    /// Flattened field types of canonical type `ty`. Nested structs and arrays
    /// are expanded in place; a union counts as a single field.
    fn flatten(&self, ty: TypeId, in_progress: &mut HashSet<TypeId>) -> Vec<TypeId> {
        if let Some(fields) = self.field_types.get(&ty) {
            return fields.clone();
        }
        if !in_progress.insert(ty) {
            return vec![ty];
        }
        let desc = self.table.get(ty);
        let fields = match &desc.kind {
            DITypeKind::Struct { members } | DITypeKind::Class { members } => {
                let mut fields = Vec::new();
                for member in members {
                    if let Some(member_ty) = self.get_canonical_type(Some(member.ty)) {
                        let member_desc = self.table.get(member_ty);
                        if member_desc.is_record() || member_desc.is_array() {
                            fields.extend(self.flatten(member_ty, in_progress));
                        } else {
                            fields.push(member_ty);
                        }
                    }
                }
                fields
            }
            DITypeKind::Array { element, .. } => match self.get_canonical_type(Some(*element)) {
                Some(elem) => self.flatten(elem, in_progress),
                None => Vec::new(),
            },
            _ => vec![ty],
        };
        in_progress.remove(&ty);
        fields
    }

    fn compute_all_aggs(&mut self) {
        let types: Vec<TypeId> = self.nodes.keys().copied().collect();
        let mut in_progress = HashSet::new();
        for ty in types {
            self.compute_aggs(ty, &mut in_progress);
        }
    }

    /// Aggregate types nested (by value) in `ty`, transitively. A type being
    /// computed further up the stack contributes nothing on re-entry.
    fn compute_aggs(&mut self, ty: TypeId, in_progress: &mut HashSet<TypeId>) -> HashSet<TypeId> {
        if let Some(aggs) = self.aggs.get(&ty) {
            return aggs.clone();
        }
        if !in_progress.insert(ty) {
            return HashSet::new();
        }
        let nested: Vec<TypeId> = match &self.table.get(ty).kind {
            DITypeKind::Struct { members }
            | DITypeKind::Class { members }
            | DITypeKind::Union { members } => members
                .iter()
                .filter_map(|m| self.get_canonical_type(Some(m.ty)))
                .collect(),
            DITypeKind::Array { element, .. } => {
                self.get_canonical_type(Some(*element)).into_iter().collect()
            }
            _ => Vec::new(),
        };
        let mut aggs = HashSet::new();
        for member_ty in nested {
            if self.table.get(member_ty).is_agg() {
                aggs.insert(member_ty);
                aggs.extend(self.compute_aggs(member_ty, in_progress));
            }
        }
        in_progress.remove(&ty);
        self.aggs.insert(ty, aggs.clone());
        aggs
    }

    /// Canonical type of `ty`, `None` if `ty` is undefined or (qualified) void.
    #[inline]
    pub fn get_canonical_type(&self, ty: Option<TypeId>) -> Option<TypeId> {
        ty.and_then(|t| self.canonicals.get(&t).copied().flatten())
    }

    /// Returns true if `b` is reachable from `a` in the hierarchy, i.e. a
    /// pointer to `a` may view an object of type `b`. With `extended`,
    /// first-field edges are followed too.
    pub fn is_base(&self, a: Option<TypeId>, b: Option<TypeId>, extended: bool) -> bool {
        match (self.get_canonical_type(a), self.get_canonical_type(b)) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                if a == b {
                    return true;
                }
                let reach = if extended {
                    &self.ext_descendants
                } else {
                    &self.descendants
                };
                reach.get(&a).map_or(false, |set| set.contains(&b))
            }
            _ => false,
        }
    }

    /// Flattened field types of `ty`; a non-aggregate is its own single field.
    pub fn field_types(&self, ty: Option<TypeId>) -> &[TypeId] {
        self.get_canonical_type(ty)
            .and_then(|t| self.field_types.get(&t))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Type of the flattened field at `offset`, `None` when out of range.
    pub fn field_type(&self, ty: Option<TypeId>, offset: usize) -> Option<TypeId> {
        self.field_types(ty).get(offset).copied()
    }

    /// Number of flattened fields of `ty`.
    #[inline]
    pub fn num_fields(&self, ty: Option<TypeId>) -> usize {
        self.field_types(ty).len()
    }

    /// Aggregate types nested by value in `ty`, transitively, `ty` excluded.
    pub fn aggs(&self, ty: Option<TypeId>) -> Option<&HashSet<TypeId>> {
        self.get_canonical_type(ty).and_then(|t| self.aggs.get(&t))
    }

    pub fn is_agg(&self, ty: Option<TypeId>) -> bool {
        self.get_canonical_type(ty)
            .map_or(false, |t| self.table.get(t).is_agg())
    }

    pub fn is_array(&self, ty: Option<TypeId>) -> bool {
        self.get_canonical_type(ty)
            .map_or(false, |t| self.table.get(t).is_array())
    }

    /// Canonical element type of an array type.
    pub fn element_type(&self, ty: Option<TypeId>) -> Option<TypeId> {
        match self.get_canonical_type(ty).map(|t| &self.table.get(t).kind) {
            Some(DITypeKind::Array { element, .. }) => self.get_canonical_type(Some(*element)),
            _ => None,
        }
    }

    /// Canonical pointee type of a pointer or reference type.
    pub fn pointee_type(&self, ty: Option<TypeId>) -> Option<TypeId> {
        match self.get_canonical_type(ty).map(|t| &self.table.get(t).kind) {
            Some(DITypeKind::Pointer { pointee })
            | Some(DITypeKind::Reference { pointee })
            | Some(DITypeKind::RvalueReference { pointee }) => self.get_canonical_type(*pointee),
            _ => None,
        }
    }

    pub fn is_pointer(&self, ty: Option<TypeId>) -> bool {
        matches!(
            self.get_canonical_type(ty).map(|t| &self.table.get(t).kind),
            Some(DITypeKind::Pointer { .. })
                | Some(DITypeKind::Reference { .. })
                | Some(DITypeKind::RvalueReference { .. })
        )
    }

    /// Human readable name of a type, used for dumping.
    pub fn type_name(&self, ty: Option<TypeId>) -> String {
        let Some(id) = ty else {
            return "void".to_string();
        };
        let Some(desc) = self.table.try_get(id) else {
            return format!("{:?}", id);
        };
        match &desc.kind {
            DITypeKind::Pointer { pointee } => format!("{}*", self.type_name(*pointee)),
            DITypeKind::Reference { pointee } => format!("{}&", self.type_name(*pointee)),
            DITypeKind::RvalueReference { pointee } => format!("{}&&", self.type_name(*pointee)),
            DITypeKind::Array { element, count } => match count {
                Some(n) => format!("{}[{}]", self.type_name(Some(*element)), n),
                None => format!("{}[]", self.type_name(Some(*element))),
            },
            DITypeKind::Const { base } if desc.name.is_none() => {
                format!("const {}", self.type_name(*base))
            }
            DITypeKind::Volatile { base } if desc.name.is_none() => {
                format!("volatile {}", self.type_name(*base))
            }
            _ => desc.name.clone().unwrap_or_else(|| format!("{:?}", id)),
        }
    }

    /// Number of hierarchy edges of the given kind.
    pub fn num_edges(&self, kind: DCHEdgeKind) -> usize {
        self.graph
            .edge_references()
            .filter(|e| e.weight().kind == kind)
            .count()
    }
}

#[cfg(test)]
mod test {
    use super::di_type::{DIMember, DITypeTable, Encoding, TypeId};
    use super::{DCHEdgeKind, DCHGraph};
    use crate::util::bit_vec::Idx;

    struct Fixture {
        dchg: DCHGraph,
        int: TypeId,
        uint: TypeId,
        base: TypeId,
        derived: TypeId,
        wrapper: TypeId,
        outer: TypeId,
        inner: TypeId,
        arr: TypeId,
    }

    fn fixture() -> Fixture {
        let mut table = DITypeTable::new();
        let int = table.add_basic("int", 32, Encoding::Signed);
        let uint = table.add_basic("unsigned", 32, Encoding::Unsigned);
        let base = table.add_class("Base", vec![DIMember::field("b", int)]);
        let derived = table.add_class(
            "Derived",
            vec![DIMember::base(base), DIMember::field("d", int)],
        );
        let wrapper = table.add_struct("Wrapper", vec![DIMember::field("first", base)]);
        let inner = table.add_struct(
            "Inner",
            vec![DIMember::field("x", int), DIMember::field("y", int)],
        );
        let arr = table.add_array(inner, Some(2));
        let outer = table.add_struct(
            "Outer",
            vec![DIMember::field("tag", uint), DIMember::field("items", arr)],
        );
        Fixture {
            dchg: DCHGraph::new(table),
            int,
            uint,
            base,
            derived,
            wrapper,
            outer,
            inner,
            arr,
        }
    }

    #[test]
    fn canonical_types_merge_teq_classes() {
        let f = fixture();
        assert_eq!(f.dchg.get_canonical_type(Some(f.uint)), Some(f.int));
        assert_eq!(f.dchg.get_canonical_type(Some(f.base)), Some(f.base));
        assert_eq!(f.dchg.get_canonical_type(None), None);
    }

    #[test]
    fn inheritance_and_first_field() {
        let f = fixture();
        let dchg = &f.dchg;
        assert!(dchg.is_base(Some(f.base), Some(f.derived), false));
        assert!(!dchg.is_base(Some(f.derived), Some(f.base), false));
        assert!(dchg.is_base(Some(f.base), Some(f.base), false));

        // Wrapper starts with a Base, so a Base pointer may view a Wrapper.
        assert!(!dchg.is_base(Some(f.base), Some(f.wrapper), false));
        assert!(dchg.is_base(Some(f.base), Some(f.wrapper), true));
        assert!(dchg.is_base(Some(f.int), Some(f.base), true));
        assert_eq!(dchg.num_edges(DCHEdgeKind::Inheritance), 1);
    }

    #[test]
    fn flattened_fields() {
        let f = fixture();
        let dchg = &f.dchg;
        // tag, items[].x, items[].y
        assert_eq!(dchg.field_types(Some(f.outer)), &[f.int, f.int, f.int]);
        assert_eq!(dchg.field_type(Some(f.derived), 1), Some(f.int));
        assert_eq!(dchg.field_type(Some(f.inner), 2), None);
        assert_eq!(dchg.field_types(Some(f.int)), &[f.int]);
        assert_eq!(dchg.element_type(Some(f.arr)), Some(f.inner));
        assert!(dchg.is_array(Some(f.arr)) && dchg.is_agg(Some(f.arr)));
    }

    #[test]
    fn nested_aggregates() {
        let f = fixture();
        let aggs = f.dchg.aggs(Some(f.outer)).unwrap();
        assert!(aggs.contains(&f.arr));
        assert!(aggs.contains(&f.inner));
        assert!(!aggs.contains(&f.outer));
        assert!(f.dchg.aggs(Some(f.inner)).unwrap().is_empty());
    }

    #[test]
    fn self_referential_types_terminate() {
        let mut table = DITypeTable::new();
        // struct Node { Node *next; Node *tail[]; }
        let node_ptr = table.add_pointer(Some(TypeId::new(2)));
        let arr = table.add_array(node_ptr, None);
        let node = table.add_struct(
            "Node",
            vec![DIMember::field("next", node_ptr), DIMember::field("tail", arr)],
        );
        assert_eq!(node, TypeId::new(2));
        let dchg = DCHGraph::new(table);
        assert_eq!(dchg.num_fields(Some(node)), 2);
        assert!(dchg.is_pointer(Some(node_ptr)));
    }

    #[test]
    fn unions_are_single_fields() {
        let mut table = DITypeTable::new();
        let int = table.add_basic("int", 32, Encoding::Signed);
        let long = table.add_basic("long", 64, Encoding::Signed);
        let base = table.add_class("Base", vec![DIMember::field("b", int)]);
        let u = table.add_union(
            "U",
            vec![DIMember::field("obj", base), DIMember::field("l", long)],
        );
        let holder = table.add_struct(
            "Holder",
            vec![DIMember::field("tag", int), DIMember::field("u", u)],
        );
        let dchg = DCHGraph::new(table);
        assert_eq!(dchg.field_types(Some(u)), &[u]);
        assert_eq!(dchg.field_types(Some(holder)), &[int, u]);
        assert!(dchg.aggs(Some(holder)).unwrap().contains(&u));
        assert!(dchg.aggs(Some(u)).unwrap().contains(&base));
        assert!(!dchg.is_base(Some(base), Some(u), true));
    }

    #[test]
    fn cyclic_typedefs_have_no_canonical_type() {
        let mut table = DITypeTable::new();
        let int = table.add_basic("int", 32, Encoding::Signed);
        let t = table.add_typedef("T", Some(TypeId::new(2)));
        let self_ref = table.add_typedef("S", Some(TypeId::new(2)));
        let holder = table.add_struct("Holder", vec![DIMember::field("t", t)]);
        let dchg = DCHGraph::new(table);
        assert_eq!(dchg.get_canonical_type(Some(t)), None);
        assert_eq!(dchg.get_canonical_type(Some(self_ref)), None);
        assert_eq!(dchg.get_canonical_type(Some(int)), Some(int));
        assert!(dchg.field_types(Some(holder)).is_empty());
    }

    #[test]
    fn empty_oracle_is_undefined() {
        let dchg = DCHGraph::empty();
        assert_eq!(dchg.get_canonical_type(Some(TypeId::new(0))), None);
        assert!(dchg.field_types(Some(TypeId::new(0))).is_empty());
        assert!(!dchg.is_agg(Some(TypeId::new(0))));
    }
}
