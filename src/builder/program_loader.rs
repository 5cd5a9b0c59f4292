// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Builds a value-flow graph and its debug-info type table from a JSON
//! program description.
//!
//! ```json
//! {
//!   "types": [{"name": "int", "size_bits": 32, "tag": "basic", "encoding": "signed"}],
//!   "objects": [{"name": "o", "alloc": "heap"}],
//!   "values": ["p", "q"],
//!   "statements": [
//!     {"id": "a", "kind": "addr", "obj": "o", "dst": "p"},
//!     {"id": "l", "kind": "load", "ptr": "p", "dst": "q", "ty": 0}
//!   ],
//!   "indirect_edges": [{"src": "a", "dst": "l", "objs": ["o"]}],
//!   "seed_pts": [{"value": "q", "objs": ["o"]}]
//! }
//! ```
//!
//! Types are referred to by their index in `types`. The object names
//! `blackhole` and `constant` denote the black-hole and constant objects.

use anyhow::{bail, Context};
use log::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::dchg::di_type::{DIType, DITypeTable, TypeId};
use crate::graph::node::{AllocKind, GepOffset, MemObj, StmtKind};
use crate::graph::vfg::{NodeId, VFG};
use crate::util::bit_vec::Idx;

#[derive(Debug, Deserialize)]
pub struct ProgramDesc {
    #[serde(default)]
    pub types: Vec<DIType>,
    #[serde(default)]
    pub objects: Vec<ObjectDesc>,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub statements: Vec<StmtDesc>,
    #[serde(default)]
    pub indirect_edges: Vec<IndirectEdgeDesc>,
    #[serde(default)]
    pub seed_pts: Vec<SeedDesc>,
}

#[derive(Debug, Deserialize)]
pub struct ObjectDesc {
    pub name: String,
    pub alloc: AllocKind,
    #[serde(default)]
    pub ty: Option<TypeId>,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default)]
    pub in_recursion: bool,
    #[serde(default)]
    pub field_insensitive: bool,
    #[serde(default)]
    pub dummy: bool,
}

#[derive(Debug, Deserialize)]
pub struct StmtDesc {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub kind: StmtKindDesc,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StmtKindDesc {
    Addr {
        obj: String,
        dst: String,
    },
    Copy {
        src: String,
        dst: String,
        #[serde(default)]
        vtable_init: bool,
    },
    /// A missing offset is a variant GEP.
    Gep {
        base: String,
        dst: String,
        #[serde(default)]
        offset: Option<usize>,
        #[serde(default)]
        ty: Option<TypeId>,
    },
    Load {
        ptr: String,
        dst: String,
        #[serde(default)]
        ty: Option<TypeId>,
    },
    Store {
        src: String,
        ptr: String,
        #[serde(default)]
        ty: Option<TypeId>,
    },
    Phi {
        dst: String,
        operands: Vec<String>,
        #[serde(default)]
        receiver: Option<TypeId>,
    },
}

#[derive(Debug, Deserialize)]
pub struct IndirectEdgeDesc {
    pub src: String,
    pub dst: String,
    pub objs: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedDesc {
    pub value: String,
    pub objs: Vec<String>,
}

/// A loaded program.
pub struct Program {
    pub vfg: VFG,
    pub types: DITypeTable,
    /// Statements by their `id`.
    pub stmt_ids: HashMap<String, NodeId>,
}

pub fn load_program(path: &Path) -> anyhow::Result<Program> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read {}", path.display()))?;
    parse_program(&json).with_context(|| format!("Invalid program description {}", path.display()))
}

pub fn parse_program(json: &str) -> anyhow::Result<Program> {
    let desc: ProgramDesc = serde_json::from_str(json)?;
    build_program(desc)
}

struct ProgramBuilder {
    vfg: VFG,
    num_types: usize,
    values: HashMap<String, NodeId>,
    objects: HashMap<String, NodeId>,
    stmt_ids: HashMap<String, NodeId>,
}

impl ProgramBuilder {
    fn check_type(&self, ty: Option<TypeId>) -> anyhow::Result<Option<TypeId>> {
        match ty {
            Some(id) if id.index() >= self.num_types => {
                bail!("Type index {} out of range ({} types)", id.index(), self.num_types)
            }
            _ => Ok(ty),
        }
    }

    fn value(&self, name: &str) -> anyhow::Result<NodeId> {
        match self.values.get(name) {
            Some(id) => Ok(*id),
            None => bail!("Unknown value {}", name),
        }
    }

    fn object(&mut self, name: &str) -> anyhow::Result<NodeId> {
        match name {
            "blackhole" => Ok(self.vfg.black_hole()),
            "constant" => Ok(self.vfg.constant_object()),
            _ => match self.objects.get(name) {
                Some(id) => Ok(*id),
                None => bail!("Unknown object {}", name),
            },
        }
    }

    fn objects(&mut self, names: &[String]) -> anyhow::Result<Vec<NodeId>> {
        names.iter().map(|name| self.object(name)).collect()
    }

    fn stmt(&self, id: &str) -> anyhow::Result<NodeId> {
        match self.stmt_ids.get(id) {
            Some(stmt) => Ok(*stmt),
            None => bail!("Unknown statement {}", id),
        }
    }

    fn add_stmt(&mut self, desc: StmtKindDesc) -> anyhow::Result<NodeId> {
        let (kind, target_ty) = match desc {
            StmtKindDesc::Addr { obj, dst } => {
                let obj = self.object(&obj)?;
                (StmtKind::Addr { obj, dst: self.value(&dst)? }, None)
            }
            StmtKindDesc::Copy {
                src,
                dst,
                vtable_init,
            } => (
                StmtKind::Copy {
                    src: self.value(&src)?,
                    dst: self.value(&dst)?,
                    vtable_init,
                },
                None,
            ),
            StmtKindDesc::Gep {
                base,
                dst,
                offset,
                ty,
            } => (
                StmtKind::Gep {
                    base: self.value(&base)?,
                    dst: self.value(&dst)?,
                    offset: offset.map_or(GepOffset::Variant, GepOffset::Field),
                },
                self.check_type(ty)?,
            ),
            StmtKindDesc::Load { ptr, dst, ty } => (
                StmtKind::Load {
                    ptr: self.value(&ptr)?,
                    dst: self.value(&dst)?,
                },
                self.check_type(ty)?,
            ),
            StmtKindDesc::Store { src, ptr, ty } => (
                StmtKind::Store {
                    src: self.value(&src)?,
                    ptr: self.value(&ptr)?,
                },
                self.check_type(ty)?,
            ),
            StmtKindDesc::Phi {
                dst,
                operands,
                receiver,
            } => {
                let operands = operands
                    .iter()
                    .map(|op| self.value(op))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                if receiver.is_some() && operands.is_empty() {
                    bail!("Constructor phi of {} has no operand", dst);
                }
                (
                    StmtKind::Phi {
                        dst: self.value(&dst)?,
                        operands,
                    },
                    self.check_type(receiver)?,
                )
            }
        };
        Ok(self.vfg.add_stmt(kind, target_ty))
    }
}

pub fn build_program(desc: ProgramDesc) -> anyhow::Result<Program> {
    let mut types = DITypeTable::new();
    for ty in desc.types {
        types.add(ty);
    }
    let mut builder = ProgramBuilder {
        vfg: VFG::new(),
        num_types: types.len(),
        values: HashMap::new(),
        objects: HashMap::new(),
        stmt_ids: HashMap::new(),
    };
    for id in types.ids() {
        for ty in types.get(id).referenced_types() {
            builder
                .check_type(Some(ty))
                .with_context(|| format!("In type {}", id.index()))?;
        }
    }
    for id in types.ids() {
        if types.has_cyclic_qualifiers(id) {
            bail!("Type {} is part of a cyclic typedef chain", id.index());
        }
    }

    for value in desc.values {
        if builder.values.contains_key(&value) {
            bail!("Duplicate value {}", value);
        }
        let id = builder.vfg.add_value(&value);
        builder.values.insert(value, id);
    }
    for obj in desc.objects {
        if builder.objects.contains_key(&obj.name) || builder.values.contains_key(&obj.name) {
            bail!("Duplicate name {}", obj.name);
        }
        let ty = builder.check_type(obj.ty)?;
        let id = if obj.dummy {
            builder.vfg.add_dummy_object(&obj.name, ty)
        } else {
            let mut mem_obj = MemObj::new(&obj.name, obj.alloc, ty);
            mem_obj.is_array = obj.is_array;
            mem_obj.in_recursion = obj.in_recursion;
            mem_obj.field_insensitive = obj.field_insensitive;
            builder.vfg.add_object(mem_obj)
        };
        builder.objects.insert(obj.name, id);
    }

    for stmt in desc.statements {
        let id = builder.add_stmt(stmt.kind)?;
        if let Some(name) = stmt.id {
            if builder.stmt_ids.insert(name.clone(), id).is_some() {
                bail!("Duplicate statement id {}", name);
            }
        }
    }
    for edge in desc.indirect_edges {
        let src = builder.stmt(&edge.src)?;
        let dst = builder.stmt(&edge.dst)?;
        let objs = builder.objects(&edge.objs)?;
        builder.vfg.add_indirect_edge(src, dst, &objs);
    }
    for seed in desc.seed_pts {
        let value = builder.value(&seed.value)?;
        for obj in builder.objects(&seed.objs)? {
            builder.vfg.seed_pts(value, obj);
        }
    }

    info!(
        "Loaded program: {} types, {} statements, {} objects",
        types.len(),
        builder.vfg.stmts().len(),
        builder.vfg.objects().len()
    );
    Ok(Program {
        vfg: builder.vfg,
        types,
        stmt_ids: builder.stmt_ids,
    })
}
