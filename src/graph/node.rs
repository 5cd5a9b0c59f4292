// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::vfg::NodeId;
use crate::dchg::di_type::TypeId;

/// Identifies a memory object, i.e. one allocation shared by its base object
/// node, its field object nodes and all of their clones.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemId(pub(crate) u32);

impl fmt::Debug for MemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocKind {
    Stack,
    Global,
    Heap,
    /// Merged constant objects.
    Constant,
    /// Objects modeling built-ins, e.g. the arguments of `main`.
    Special,
}

#[derive(Clone, Debug)]
pub struct MemObj {
    pub name: String,
    pub alloc: AllocKind,
    /// Declared static type of the allocation, if known.
    pub ty: Option<TypeId>,
    pub is_array: bool,
    /// Allocated inside a recursive function, so one abstract object stands
    /// for several live concrete ones.
    pub in_recursion: bool,
    pub field_insensitive: bool,
}

impl MemObj {
    pub fn new(name: &str, alloc: AllocKind, ty: Option<TypeId>) -> Self {
        MemObj {
            name: name.to_string(),
            alloc,
            ty,
            is_array: false,
            in_recursion: false,
            field_insensitive: false,
        }
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn in_recursion(mut self) -> Self {
        self.in_recursion = true;
        self
    }

    pub fn field_insensitive(mut self) -> Self {
        self.field_insensitive = true;
        self
    }

    #[inline]
    pub fn is_heap(&self) -> bool {
        self.alloc == AllocKind::Heap
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjKind {
    /// The object as a whole. Stands for all of its fields once its memory
    /// object is field-insensitive.
    Base,
    /// The field at flattened offset `offset` of the whole-object node `base`.
    Field { base: NodeId, offset: usize },
    /// Placeholder objects without a backing allocation.
    Dummy,
    /// Unknown memory.
    BlackHole,
    Constant,
}

#[derive(Clone, Debug)]
pub struct ObjNode {
    pub kind: ObjKind,
    pub mem: MemId,
    pub name: String,
}

impl ObjNode {
    #[inline]
    pub fn is_field(&self) -> bool {
        matches!(self.kind, ObjKind::Field { .. })
    }

    /// Black-hole and constant objects pass through type checks untouched.
    #[inline]
    pub fn is_blk_or_const(&self) -> bool {
        matches!(self.kind, ObjKind::BlackHole | ObjKind::Constant)
    }
}

#[derive(Clone, Debug)]
pub struct ValueNode {
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GepOffset {
    /// Constant flattened field index.
    Field(usize),
    /// Non-constant index, e.g. into an array with a variable subscript.
    Variant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StmtKind {
    /// `dst = &obj`
    Addr { obj: NodeId, dst: NodeId },
    /// `dst = src`; `vtable_init` marks virtual table pointer initialization.
    Copy { src: NodeId, dst: NodeId, vtable_init: bool },
    /// `dst = &base->offset`
    Gep { base: NodeId, dst: NodeId, offset: GepOffset },
    /// `dst = *ptr`
    Load { ptr: NodeId, dst: NodeId },
    /// `*ptr = src`
    Store { src: NodeId, ptr: NodeId },
    /// `dst = phi(operands)`
    Phi { dst: NodeId, operands: Vec<NodeId> },
}

impl StmtKind {
    /// The value defined by the statement.
    pub fn def(&self) -> Option<NodeId> {
        match self {
            StmtKind::Addr { dst, .. }
            | StmtKind::Copy { dst, .. }
            | StmtKind::Gep { dst, .. }
            | StmtKind::Load { dst, .. }
            | StmtKind::Phi { dst, .. } => Some(*dst),
            StmtKind::Store { .. } => None,
        }
    }

    /// The values read by the statement.
    pub fn uses(&self) -> Vec<NodeId> {
        match self {
            StmtKind::Addr { .. } => Vec::new(),
            StmtKind::Copy { src, .. } => vec![*src],
            StmtKind::Gep { base, .. } => vec![*base],
            StmtKind::Load { ptr, .. } => vec![*ptr],
            StmtKind::Store { src, ptr } => vec![*src, *ptr],
            StmtKind::Phi { operands, .. } => operands.clone(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StmtKind::Addr { .. } => "Addr",
            StmtKind::Copy { .. } => "Copy",
            StmtKind::Gep { .. } => "Gep",
            StmtKind::Load { .. } => "Load",
            StmtKind::Store { .. } => "Store",
            StmtKind::Phi { .. } => "Phi",
        }
    }
}

#[derive(Clone, Debug)]
pub struct StmtNode {
    pub kind: StmtKind,
    /// Static type of the memory accessed through the pointer operand. For a
    /// constructor's `this` phi, the declared receiver type.
    pub target_ty: Option<TypeId>,
}

#[derive(Clone, Debug)]
pub enum VFGNode {
    Value(ValueNode),
    Object(ObjNode),
    Stmt(StmtNode),
}
