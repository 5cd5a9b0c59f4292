// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Debug-info type descriptors.
//!
//! A `DITypeTable` owns every type descriptor of the analyzed program. Types
//! refer to each other by `TypeId`; a missing base type (`None`) stands for
//! `void`.

use log::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::util::bit_vec::Idx;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(u32);

impl Idx for TypeId {
    #[inline]
    fn new(idx: usize) -> Self {
        TypeId(u32::new(idx))
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Signed,
    Unsigned,
    SignedChar,
    UnsignedChar,
    Float,
    Boolean,
}

impl Encoding {
    /// Signed and unsigned variants of the same encoding are not distinguished.
    fn sign_agnostic(self) -> Encoding {
        match self {
            Encoding::Unsigned => Encoding::Signed,
            Encoding::UnsignedChar => Encoding::SignedChar,
            other => other,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DIMember {
    #[serde(default)]
    pub name: Option<String>,
    pub ty: TypeId,
    /// Marks a base-class subobject.
    #[serde(default)]
    pub inheritance: bool,
}

impl DIMember {
    pub fn field(name: &str, ty: TypeId) -> Self {
        DIMember {
            name: Some(name.to_string()),
            ty,
            inheritance: false,
        }
    }

    pub fn base(ty: TypeId) -> Self {
        DIMember {
            name: None,
            ty,
            inheritance: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum DITypeKind {
    Basic { encoding: Encoding },
    Pointer { pointee: Option<TypeId> },
    Reference { pointee: Option<TypeId> },
    RvalueReference { pointee: Option<TypeId> },
    Array { element: TypeId, count: Option<u64> },
    Struct { members: Vec<DIMember> },
    Class { members: Vec<DIMember> },
    Union { members: Vec<DIMember> },
    Typedef { base: Option<TypeId> },
    Const { base: Option<TypeId> },
    Volatile { base: Option<TypeId> },
    Subroutine,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DIType {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub size_bits: u64,
    #[serde(flatten)]
    pub kind: DITypeKind,
}

impl DIType {
    pub fn new(name: Option<&str>, size_bits: u64, kind: DITypeKind) -> Self {
        DIType {
            name: name.map(str::to_string),
            file: None,
            line: 0,
            size_bits,
            kind,
        }
    }

    /// Declaration site of a named aggregate.
    pub fn declared_at(mut self, file: &str, line: u32) -> Self {
        self.file = Some(file.to_string());
        self.line = line;
        self
    }

    /// Member list of a struct, class or union.
    pub fn members(&self) -> Option<&[DIMember]> {
        match &self.kind {
            DITypeKind::Struct { members }
            | DITypeKind::Class { members }
            | DITypeKind::Union { members } => Some(members),
            _ => None,
        }
    }

    #[inline]
    pub fn is_record(&self) -> bool {
        matches!(self.kind, DITypeKind::Struct { .. } | DITypeKind::Class { .. })
    }

    #[inline]
    pub fn is_union(&self) -> bool {
        matches!(self.kind, DITypeKind::Union { .. })
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self.kind, DITypeKind::Array { .. })
    }

    /// Arrays, structs, classes and unions.
    #[inline]
    pub fn is_agg(&self) -> bool {
        self.is_record() || self.is_union() || self.is_array()
    }

    /// Every type id this type refers to.
    pub fn referenced_types(&self) -> Vec<TypeId> {
        if let Some(members) = self.members() {
            return members.iter().map(|member| member.ty).collect();
        }
        match self.kind {
            DITypeKind::Array { element, .. } => vec![element],
            _ => self
                .pointee()
                .or_else(|| self.qualified_base())
                .flatten()
                .into_iter()
                .collect(),
        }
    }

    fn pointee(&self) -> Option<Option<TypeId>> {
        match self.kind {
            DITypeKind::Pointer { pointee }
            | DITypeKind::Reference { pointee }
            | DITypeKind::RvalueReference { pointee } => Some(pointee),
            _ => None,
        }
    }

    fn qualified_base(&self) -> Option<Option<TypeId>> {
        match self.kind {
            DITypeKind::Typedef { base }
            | DITypeKind::Const { base }
            | DITypeKind::Volatile { base } => Some(base),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DITypeTable {
    types: Vec<DIType>,
}

impl DITypeTable {
    pub fn new() -> Self {
        DITypeTable { types: Vec::new() }
    }

    pub fn add(&mut self, ty: DIType) -> TypeId {
        let id = TypeId::new(self.types.len());
        self.types.push(ty);
        id
    }

    /// Panics if `id` does not belong to this table.
    #[inline]
    pub fn get(&self, id: TypeId) -> &DIType {
        &self.types[id.index()]
    }

    #[inline]
    pub fn try_get(&self, id: TypeId) -> Option<&DIType> {
        self.types.get(id.index())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = TypeId> {
        (0..self.types.len()).map(TypeId::new)
    }

    pub fn add_basic(&mut self, name: &str, size_bits: u64, encoding: Encoding) -> TypeId {
        self.add(DIType::new(Some(name), size_bits, DITypeKind::Basic { encoding }))
    }

    pub fn add_pointer(&mut self, pointee: Option<TypeId>) -> TypeId {
        self.add(DIType::new(None, 64, DITypeKind::Pointer { pointee }))
    }

    pub fn add_array(&mut self, element: TypeId, count: Option<u64>) -> TypeId {
        let size_bits = count.unwrap_or(0) * self.get(element).size_bits;
        self.add(DIType::new(None, size_bits, DITypeKind::Array { element, count }))
    }

    pub fn add_struct(&mut self, name: &str, members: Vec<DIMember>) -> TypeId {
        let size_bits = self.members_size(&members);
        self.add(DIType::new(Some(name), size_bits, DITypeKind::Struct { members }))
    }

    pub fn add_class(&mut self, name: &str, members: Vec<DIMember>) -> TypeId {
        let size_bits = self.members_size(&members);
        self.add(DIType::new(Some(name), size_bits, DITypeKind::Class { members }))
    }

    pub fn add_union(&mut self, name: &str, members: Vec<DIMember>) -> TypeId {
        let size_bits = members
            .iter()
            .map(|m| self.get(m.ty).size_bits)
            .max()
            .unwrap_or(0);
        self.add(DIType::new(Some(name), size_bits, DITypeKind::Union { members }))
    }

    pub fn add_typedef(&mut self, name: &str, base: Option<TypeId>) -> TypeId {
        self.add(DIType::new(Some(name), 0, DITypeKind::Typedef { base }))
    }

    pub fn add_const(&mut self, base: Option<TypeId>) -> TypeId {
        self.add(DIType::new(None, 0, DITypeKind::Const { base }))
    }

    fn members_size(&self, members: &[DIMember]) -> u64 {
        members.iter().map(|m| self.get(m.ty).size_bits).sum()
    }

    /// Strips typedefs, const and volatile. Returns `None` when the chain ends
    /// in `void` or never ends.
    pub fn strip_qualifiers(&self, ty: Option<TypeId>) -> Option<TypeId> {
        let mut cur = ty;
        // A well-formed chain never visits a descriptor twice.
        for _ in 0..=self.types.len() {
            match cur {
                Some(id) => match self.get(id).qualified_base() {
                    Some(base) => cur = base,
                    None => return Some(id),
                },
                None => return None,
            }
        }
        warn!("Cyclic typedef chain starting at {:?}, treated as undefined", ty);
        None
    }

    /// Returns true if stripping qualifiers from `ty` runs into a cycle.
    pub fn has_cyclic_qualifiers(&self, ty: TypeId) -> bool {
        let mut cur = Some(ty);
        for _ in 0..=self.types.len() {
            match cur.and_then(|id| self.get(id).qualified_base()) {
                Some(base) => cur = base,
                None => return false,
            }
        }
        true
    }

    /// Structural type equivalence.
    ///
    /// Basic types match on size and encoding, ignoring signedness. Pointers
    /// and both kinds of references match on their pointees, arrays on their
    /// elements regardless of length. Structs and classes are interchangeable
    /// and match on name and declaration site, unions only match unions.
    pub fn teq(&self, a: Option<TypeId>, b: Option<TypeId>) -> bool {
        let (a, b) = match (self.strip_qualifiers(a), self.strip_qualifiers(b)) {
            (None, None) => return true,
            (Some(a), Some(b)) => (a, b),
            _ => return false,
        };
        if a == b {
            return true;
        }
        let (ta, tb) = (self.get(a), self.get(b));
        match (&ta.kind, &tb.kind) {
            (DITypeKind::Basic { encoding: ea }, DITypeKind::Basic { encoding: eb }) => {
                ta.size_bits == tb.size_bits && ea.sign_agnostic() == eb.sign_agnostic()
            }
            (DITypeKind::Array { element: ea, .. }, DITypeKind::Array { element: eb, .. }) => {
                self.teq(Some(*ea), Some(*eb))
            }
            (DITypeKind::Subroutine, DITypeKind::Subroutine) => true,
            _ => match (ta.pointee(), tb.pointee()) {
                (Some(pa), Some(pb)) => self.teq(pa, pb),
                (None, None) => {
                    let same_shape = (ta.is_record() && tb.is_record())
                        || (ta.is_union() && tb.is_union());
                    same_shape && ta.name == tb.name && ta.file == tb.file && ta.line == tb.line
                }
                _ => false,
            },
        }
    }
}
