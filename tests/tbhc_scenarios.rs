// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use fstbhc::dchg::di_type::{DIMember, DITypeTable, Encoding, TypeId};
use fstbhc::dchg::DCHGraph;
use fstbhc::graph::node::{AllocKind, MemObj, ObjKind, StmtKind};
use fstbhc::graph::vfg::{NodeId, VFG};
use fstbhc::pta::alias::{alias, type_filtered_pts, AliasResult};
use fstbhc::pta::flow_sensitive::FlowSensitivePTA;
use fstbhc::pta::{PTAType, PointerAnalysis};
use fstbhc::pts_set::points_to::PointsToSet;
use fstbhc::util::options::AnalysisOptions;

fn tbhc() -> AnalysisOptions {
    AnalysisOptions::default()
}

fn flow_sensitive() -> AnalysisOptions {
    AnalysisOptions {
        pta_type: PTAType::FlowSensitive,
        ..AnalysisOptions::default()
    }
}

fn heap(vfg: &mut VFG, name: &str) -> NodeId {
    vfg.add_object(MemObj::new(name, AllocKind::Heap, None))
}

fn stack(vfg: &mut VFG, name: &str, ty: Option<TypeId>) -> NodeId {
    vfg.add_object(MemObj::new(name, AllocKind::Stack, ty))
}

fn ids(pts: &impl PointsToSet<NodeId>) -> Vec<NodeId> {
    let mut ids: Vec<NodeId> = pts.iter().collect();
    ids.sort();
    ids
}

/// `struct A { int x; }` and `struct B { long y; }`.
fn unrelated_structs() -> (DITypeTable, TypeId, TypeId) {
    let mut table = DITypeTable::new();
    let int = table.add_basic("int", 32, Encoding::Signed);
    let long = table.add_basic("long", 64, Encoding::Signed);
    let a = table.add_struct("A", vec![DIMember::field("x", int)]);
    let b = table.add_struct("B", vec![DIMember::field("y", long)]);
    (table, a, b)
}

/// `class Base { int x; }` and `class Derived : Base { int y; }`.
fn class_hierarchy() -> (DITypeTable, TypeId, TypeId) {
    let mut table = DITypeTable::new();
    let int = table.add_basic("int", 32, Encoding::Signed);
    let base = table.add_class("Base", vec![DIMember::field("x", int)]);
    let derived = table.add_class(
        "Derived",
        vec![DIMember::base(base), DIMember::field("y", int)],
    );
    (table, base, derived)
}

#[test]
fn untyped_heap_object_is_cloned_at_typed_access() {
    let (table, a, _) = unrelated_structs();
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let h = heap(&mut vfg, "h");
    let o = stack(&mut vfg, "o", None);
    let (p, x, q) = (vfg.add_value("p"), vfg.add_value("x"), vfg.add_value("q"));
    let alloc = vfg.add_addr(h, p);
    vfg.add_addr(o, x);
    let store = vfg.add_store(x, p, Some(a));
    let load = vfg.add_load(p, q, Some(a));
    vfg.add_indirect_edge(store, load, &[h]);

    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    let clones = ids(&pta.get_clones(h));
    assert_eq!(clones.len(), 1);
    let clone = clones[0];
    assert_eq!(pta.get_type(clone), Some(a));
    assert_eq!(pta.heap_cloning().get_original(clone), h);
    assert_eq!(pta.heap_cloning().get_allocation_site(clone), Some(alloc));

    // The original stays in the points-to set but is hidden at both accesses.
    assert_eq!(ids(&pta.get_pts(p)), {
        let mut expected = vec![h, clone];
        expected.sort();
        expected
    });
    assert!(pta.is_filtered(store, h) && pta.is_filtered(load, h));
    assert_eq!(ids(&pta.get_effective_pts(load, p)), vec![clone]);

    assert_eq!(ids(&pta.get_out_pts(store, clone)), vec![o]);
    assert_eq!(ids(&pta.get_pts(q)), vec![o]);
}

#[test]
fn clone_cache_yields_one_clone_per_type() {
    let (table, a, b) = unrelated_structs();
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let h = heap(&mut vfg, "h");
    let (p, q1, q2, q3) = (
        vfg.add_value("p"),
        vfg.add_value("q1"),
        vfg.add_value("q2"),
        vfg.add_value("q3"),
    );
    vfg.add_addr(h, p);
    vfg.add_load(p, q1, Some(a));
    vfg.add_load(p, q2, Some(a));
    vfg.add_load(p, q3, Some(b));

    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    let clones = ids(&pta.get_clones(h));
    assert_eq!(clones.len(), 2);
    let mut types: Vec<_> = clones.iter().map(|c| pta.get_type(*c)).collect();
    types.sort();
    assert_eq!(types, vec![Some(a), Some(b)]);
    // Every clone is visible at the allocation site.
    assert_eq!(pta.get_pts(p).count(), 3);
}

#[test]
fn derived_object_is_kept_through_base_pointer() {
    let (table, base, derived) = class_hierarchy();
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let d = stack(&mut vfg, "d", Some(derived));
    let o = stack(&mut vfg, "o", None);
    let (p, x) = (vfg.add_value("p"), vfg.add_value("x"));
    vfg.add_addr(d, p);
    vfg.add_addr(o, x);
    let store = vfg.add_store(x, p, Some(base));

    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    assert!(!pta.is_filtered(store, d));
    assert!(pta.get_clones(d).is_empty());
    assert_eq!(ids(&pta.get_out_pts(store, d)), vec![o]);
}

#[test]
fn base_object_is_cloned_on_downcast() {
    let (table, base, derived) = class_hierarchy();
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let b = stack(&mut vfg, "b", Some(base));
    let (p, q) = (vfg.add_value("p"), vfg.add_value("q"));
    vfg.add_addr(b, p);
    let load = vfg.add_load(p, q, Some(derived));

    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    assert!(pta.is_filtered(load, b));
    let clones = ids(&pta.get_clones(b));
    assert_eq!(clones.len(), 1);
    assert_eq!(pta.get_type(clones[0]), Some(derived));
    assert_eq!(ids(&pta.get_effective_pts(load, p)), clones);
}

#[test]
fn nested_aggregate_is_kept_at_gep() {
    let mut table = DITypeTable::new();
    let int = table.add_basic("int", 32, Encoding::Signed);
    let inner = table.add_struct(
        "Inner",
        vec![DIMember::field("a", int), DIMember::field("b", int)],
    );
    let outer = table.add_struct(
        "Outer",
        vec![DIMember::field("c", int), DIMember::field("i", inner)],
    );
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let o = stack(&mut vfg, "o", Some(outer));
    let (p, q) = (vfg.add_value("p"), vfg.add_value("q"));
    vfg.add_addr(o, p);
    let gep = vfg.add_gep(p, q, 1, Some(inner));

    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    assert!(!pta.is_filtered(gep, o));
    assert!(pta.get_clones(o).is_empty());
    let fields = ids(&pta.get_pts(q));
    assert_eq!(fields.len(), 1);
    assert_eq!(
        pta.vfg().obj(fields[0]).kind,
        ObjKind::Field { base: o, offset: 1 }
    );
    assert_eq!(pta.get_type(fields[0]), Some(int));
}

#[test]
fn consecutive_geps_keep_the_field_object() {
    let mut table = DITypeTable::new();
    let int = table.add_basic("int", 32, Encoding::Signed);
    let inner = table.add_struct(
        "Inner",
        vec![DIMember::field("a", int), DIMember::field("b", int)],
    );
    let outer = table.add_struct(
        "Outer",
        vec![DIMember::field("c", int), DIMember::field("i", inner)],
    );
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let o = stack(&mut vfg, "o", Some(outer));
    let [p, q, r] = ["p", "q", "r"].map(|name| vfg.add_value(name));
    vfg.add_addr(o, p);
    // q = &p->i; r = &q->b
    let gep1 = vfg.add_gep(p, q, 1, Some(outer));
    let gep2 = vfg.add_gep(q, r, 1, Some(inner));

    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    assert!(!pta.is_filtered(gep1, o));
    let first = ids(&pta.get_pts(q));
    assert_eq!(first.len(), 1);
    let field = first[0];
    assert_eq!(pta.vfg().obj(field).kind, ObjKind::Field { base: o, offset: 1 });

    assert!(!pta.is_filtered(gep2, field));
    assert!(pta.get_clones(o).is_empty());
    assert!(pta.get_clones(field).is_empty());
    let second = ids(&pta.get_pts(r));
    assert_eq!(second.len(), 1);
    assert_eq!(pta.vfg().obj(second[0]).kind, ObjKind::Field { base: o, offset: 2 });
    assert_eq!(pta.get_type(second[0]), Some(int));
}

#[test]
fn out_of_bounds_gep_is_filtered() {
    let (table, a, _) = unrelated_structs();
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let s = stack(&mut vfg, "s", Some(a));
    let (p, q) = (vfg.add_value("p"), vfg.add_value("q"));
    vfg.add_addr(s, p);
    let gep = vfg.add_gep(p, q, 3, Some(a));

    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    assert!(pta.is_filtered(gep, s));
    assert!(pta.get_pts(q).is_empty());
}

#[test]
fn unrelated_object_is_filtered_at_load() {
    let (table, a, b) = unrelated_structs();
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let obj = stack(&mut vfg, "b", Some(b));
    let other = stack(&mut vfg, "a", Some(a));
    let o = stack(&mut vfg, "o", None);
    let [p, pb, x, q] = ["p", "pb", "x", "q"].map(|name| vfg.add_value(name));
    vfg.add_addr(obj, pb);
    vfg.add_addr(o, x);
    let store = vfg.add_store(x, pb, Some(b));
    // p is seeded with both objects, as a flow-insensitive pre-analysis would.
    vfg.seed_pts(p, obj);
    vfg.seed_pts(p, other);
    let load = vfg.add_load(p, q, Some(a));
    vfg.add_indirect_edge(store, load, &[obj]);

    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    assert!(!pta.is_filtered(store, obj));
    assert!(pta.is_filtered(load, obj));
    assert!(!pta.is_filtered(load, other));
    assert!(pta.get_pts(p).contains(obj));
    assert!(pta.get_clones(obj).is_empty() && pta.get_clones(other).is_empty());
    assert_eq!(ids(&pta.get_effective_pts(load, p)), vec![other]);
    assert_eq!(ids(&pta.get_in_pts(load, obj)), vec![o]);
    assert!(pta.get_pts(q).is_empty());
}

#[test]
fn reuse_clones_unrelated_object_at_load() {
    let (table, a, b) = unrelated_structs();
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let obj = stack(&mut vfg, "b", Some(b));
    let (p, q) = (vfg.add_value("p"), vfg.add_value("q"));
    vfg.add_addr(obj, p);
    let load = vfg.add_load(p, q, Some(a));

    let options = AnalysisOptions {
        all_reuse: true,
        ..AnalysisOptions::default()
    };
    let mut pta = FlowSensitivePTA::new(&dchg, vfg, options);
    pta.analyze();

    assert!(pta.is_filtered(load, obj));
    let clones = ids(&pta.get_clones(obj));
    assert_eq!(clones.len(), 1);
    assert_eq!(pta.get_type(clones[0]), Some(a));
}

#[test]
fn field_insensitive_object_is_kept_as_any_field_type() {
    let mut table = DITypeTable::new();
    let int = table.add_basic("int", 32, Encoding::Signed);
    let long = table.add_basic("long", 64, Encoding::Signed);
    let s_ty = table.add_struct(
        "S",
        vec![DIMember::field("a", int), DIMember::field("b", long)],
    );
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let fi = vfg.add_object(MemObj::new("fi", AllocKind::Stack, Some(s_ty)).field_insensitive());
    let fs = stack(&mut vfg, "fs", Some(s_ty));
    let (p, r, q1, q2, q3) = (
        vfg.add_value("p"),
        vfg.add_value("r"),
        vfg.add_value("q1"),
        vfg.add_value("q2"),
        vfg.add_value("q3"),
    );
    vfg.add_addr(fi, p);
    vfg.add_addr(fs, r);
    let load_fi = vfg.add_load(p, q1, Some(long));
    let load_second = vfg.add_load(r, q2, Some(long));
    let load_first = vfg.add_load(r, q3, Some(int));

    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    assert!(!pta.is_filtered(load_fi, fi));
    assert!(pta.get_clones(fi).is_empty());
    // A field-sensitive struct is only viewable as the type of its first field.
    assert!(pta.is_filtered(load_second, fs));
    assert!(!pta.is_filtered(load_first, fs));
}

#[test]
fn constructor_receiver_takes_the_constructed_type() {
    let (table, base, _) = class_hierarchy();
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let h = heap(&mut vfg, "h");
    let (p, this) = (vfg.add_value("p"), vfg.add_value("this"));
    vfg.add_addr(h, p);
    let phi = vfg.add_phi(this, vec![p], Some(base));

    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    assert!(pta.is_filtered(phi, h));
    let clones = ids(&pta.get_clones(h));
    assert_eq!(clones.len(), 1);
    assert_eq!(ids(&pta.get_pts(this)), clones);
}

#[test]
fn strong_update_kills_previous_contents() {
    let mut vfg = VFG::new();
    let a = stack(&mut vfg, "a", None);
    let h = heap(&mut vfg, "h");
    let o1 = stack(&mut vfg, "o1", None);
    let o2 = stack(&mut vfg, "o2", None);
    let names = ["p", "r", "x", "y", "q", "s"];
    let [p, r, x, y, q, s] = names.map(|name| vfg.add_value(name));
    vfg.add_addr(a, p);
    vfg.add_addr(h, r);
    vfg.add_addr(o1, x);
    vfg.add_addr(o2, y);
    let st1 = vfg.add_store(x, p, None);
    let st2 = vfg.add_store(y, p, None);
    let ld = vfg.add_load(p, q, None);
    vfg.add_indirect_edge(st1, st2, &[a]);
    vfg.add_indirect_edge(st2, ld, &[a]);
    let hst1 = vfg.add_store(x, r, None);
    let hst2 = vfg.add_store(y, r, None);
    let hld = vfg.add_load(r, s, None);
    vfg.add_indirect_edge(hst1, hst2, &[h]);
    vfg.add_indirect_edge(hst2, hld, &[h]);

    let dchg = DCHGraph::empty();
    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    assert!(pta.is_strong_updatable(a));
    assert!(!pta.is_strong_updatable(h));
    assert_eq!(ids(&pta.get_in_pts(st2, a)), vec![o1]);
    assert_eq!(ids(&pta.get_pts(q)), vec![o2]);
    assert_eq!(ids(&pta.get_pts(s)), vec![o1, o2]);
}

#[test]
fn store_through_black_hole_is_weak() {
    let mut vfg = VFG::new();
    let a = stack(&mut vfg, "a", None);
    let o1 = stack(&mut vfg, "o1", None);
    let o2 = stack(&mut vfg, "o2", None);
    let blk = vfg.black_hole();
    let [p, x, y, q] = ["p", "x", "y", "q"].map(|name| vfg.add_value(name));
    vfg.add_addr(a, p);
    vfg.seed_pts(p, blk);
    vfg.add_addr(o1, x);
    vfg.add_addr(o2, y);
    let st1 = vfg.add_store(x, p, None);
    let st2 = vfg.add_store(y, p, None);
    let ld = vfg.add_load(p, q, None);
    vfg.add_indirect_edge(st1, st2, &[a]);
    vfg.add_indirect_edge(st2, ld, &[a]);

    let dchg = DCHGraph::empty();
    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    assert!(pta.is_strong_updatable(a));
    let mut targets = vec![a, blk];
    targets.sort();
    assert_eq!(ids(&pta.get_pts(p)), targets);
    assert_eq!(ids(&pta.get_out_pts(st2, a)), vec![o1, o2]);
    assert_eq!(ids(&pta.get_pts(q)), vec![o1, o2]);
}

#[test]
fn contents_flow_unchanged_through_unrelated_statements() {
    let mut vfg = VFG::new();
    let a = stack(&mut vfg, "a", None);
    let b = stack(&mut vfg, "b", None);
    let o = stack(&mut vfg, "o", None);
    let [p, t, x, q] = ["p", "t", "x", "q"].map(|name| vfg.add_value(name));
    vfg.add_addr(a, p);
    vfg.add_addr(b, t);
    vfg.add_addr(o, x);
    let st = vfg.add_store(x, p, None);
    let other = vfg.add_store(x, t, None);
    let ld = vfg.add_load(p, q, None);
    vfg.add_indirect_edge(st, other, &[a]);
    vfg.add_indirect_edge(other, ld, &[a]);

    let dchg = DCHGraph::empty();
    let mut pta = FlowSensitivePTA::new(&dchg, vfg, flow_sensitive());
    pta.analyze();

    assert_eq!(ids(&pta.get_out_pts(other, a)), vec![o]);
    assert_eq!(ids(&pta.get_pts(q)), vec![o]);
}

#[test]
fn plain_flow_sensitive_analysis_never_clones() {
    let (table, a, b) = unrelated_structs();
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let h = heap(&mut vfg, "h");
    let o = stack(&mut vfg, "o", None);
    let [p, x, q] = ["p", "x", "q"].map(|name| vfg.add_value(name));
    vfg.add_addr(h, p);
    vfg.add_addr(o, x);
    let store = vfg.add_store(x, p, Some(a));
    let load = vfg.add_load(p, q, Some(b));
    vfg.add_indirect_edge(store, load, &[h]);

    let mut pta = FlowSensitivePTA::new(&dchg, vfg, flow_sensitive());
    pta.analyze();

    assert!(pta.get_clones(h).is_empty());
    assert!(!pta.is_filtered(load, h));
    assert_eq!(ids(&pta.get_pts(q)), vec![o]);
}

#[test]
fn gep_cycle_terminates_at_field_limit() {
    let mut vfg = VFG::new();
    let h = heap(&mut vfg, "h");
    let [p0, p, q] = ["p0", "p", "q"].map(|name| vfg.add_value(name));
    vfg.add_addr(h, p0);
    vfg.add_phi(p, vec![p0, q], None);
    vfg.add_gep(p, q, 1, None);

    let dchg = DCHGraph::empty();
    let options = AnalysisOptions {
        pta_type: PTAType::FlowSensitive,
        max_field_limit: 8,
        ..AnalysisOptions::default()
    };
    let mut pta = FlowSensitivePTA::new(&dchg, vfg, options);
    pta.analyze();

    assert!(pta.vfg().mem_of(h).field_insensitive);
    let fields = pta.get_pts(q);
    assert!(!fields.is_empty());
    for field in fields.iter() {
        match pta.vfg().obj(field).kind {
            ObjKind::Field { base, offset } => {
                assert_eq!(base, h);
                assert!(offset < 8);
            }
            ObjKind::Base => assert_eq!(field, h),
            kind => panic!("Unexpected {:?}", kind),
        }
    }
}

#[test]
fn points_to_sets_grow_monotonically_around_a_cycle() {
    let (table, a_ty, _) = unrelated_structs();
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let h = heap(&mut vfg, "h");
    let a = stack(&mut vfg, "a", Some(a_ty));
    let [x, p0, p, r] = ["x", "p0", "p", "r"].map(|name| vfg.add_value(name));
    vfg.add_addr(h, x);
    vfg.add_addr(a, p0);
    vfg.add_phi(p, vec![p0, r], None);
    let st = vfg.add_store(x, p, Some(a_ty));
    let ld = vfg.add_load(p, r, Some(a_ty));
    vfg.add_indirect_edge(st, ld, &[a, h]);

    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.initialize();
    let values: Vec<NodeId> = pta.vfg().values().collect();
    let mut sizes = vec![0; values.len()];
    let mut steps = 0;
    while pta.solve_step().is_some() {
        steps += 1;
        assert!(steps < 10_000);
        for (value, size) in values.iter().zip(sizes.iter_mut()) {
            let count = pta.get_pts(*value).count();
            assert!(count >= *size, "pts({:?}) shrank at step {}", value, steps);
            *size = count;
        }
    }

    assert!(pta.solve_step().is_none());
    let clones = ids(&pta.get_clones(h));
    assert_eq!(clones.len(), 1);
    assert!(pta.get_pts(r).contains(clones[0]));
    assert!(pta.get_pts(p).contains(a));
}

#[test]
fn vtable_initialization_copies_like_a_copy() {
    let mut vfg = VFG::new();
    let vtable = stack(&mut vfg, "vtable", None);
    let [v, w] = ["v", "w"].map(|name| vfg.add_value(name));
    vfg.add_addr(vtable, v);
    let copy = vfg.add_vtable_copy(v, w);
    assert!(matches!(
        vfg.stmt(copy).kind,
        StmtKind::Copy { vtable_init: true, .. }
    ));

    let dchg = DCHGraph::empty();
    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    assert_eq!(ids(&pta.get_pts(w)), vec![vtable]);
}

#[test]
fn variant_gep_collapses_object() {
    let (table, a, _) = unrelated_structs();
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let s = stack(&mut vfg, "s", Some(a));
    let [p, q] = ["p", "q"].map(|name| vfg.add_value(name));
    vfg.add_addr(s, p);
    vfg.add_variant_gep(p, q);

    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    assert!(pta.vfg().mem_of(s).field_insensitive);
    assert_eq!(ids(&pta.get_pts(q)), vec![s]);
    assert!(!pta.is_strong_updatable(s));
}

#[test]
fn black_hole_passes_type_checks() {
    let (table, a, _) = unrelated_structs();
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let blk = vfg.black_hole();
    let [p, q] = ["p", "q"].map(|name| vfg.add_value(name));
    vfg.seed_pts(p, blk);
    let load = vfg.add_load(p, q, Some(a));

    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    assert!(!pta.is_filtered(load, blk));
    assert!(pta.get_clones(blk).is_empty());
    assert_eq!(ids(&pta.get_pts(p)), vec![blk]);
}

#[test]
fn alias_queries() {
    let (table, a_ty, b_ty) = unrelated_structs();
    let dchg = DCHGraph::new(table);
    let mut vfg = VFG::new();
    let a = stack(&mut vfg, "a", Some(a_ty));
    let b = stack(&mut vfg, "b", Some(b_ty));
    let [p, q, r, m] = ["p", "q", "r", "m"].map(|name| vfg.add_value(name));
    vfg.add_addr(a, p);
    vfg.add_addr(a, q);
    vfg.add_addr(b, r);
    vfg.add_phi(m, vec![p, r], None);

    let mut pta = FlowSensitivePTA::new(&dchg, vfg, tbhc());
    pta.analyze();

    assert_eq!(alias(&pta, (p, None), (q, None)), AliasResult::MustAlias);
    assert_eq!(alias(&pta, (p, None), (r, None)), AliasResult::NoAlias);
    assert_eq!(alias(&pta, (p, None), (m, None)), AliasResult::MayAlias);
    assert_eq!(ids(&type_filtered_pts(&pta, m, Some(b_ty))), vec![b]);
    assert_eq!(
        alias(&pta, (m, Some(b_ty)), (p, Some(a_ty))),
        AliasResult::NoAlias
    );
}
