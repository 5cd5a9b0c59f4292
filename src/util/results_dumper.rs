// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Context;
use itertools::Itertools;
use log::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};

use crate::graph::node::ObjKind;
use crate::pta::flow_sensitive::FlowSensitivePTA;
use crate::pta::NodeId;
use crate::pts_set::points_to::PointsToSet;

/// Dumps the points-to sets of all top-level values to `pts_path`, or to
/// standard output if `pts_path` is "stdout".
pub fn dump_pts_to_file(pta: &FlowSensitivePTA, pts_path: &str) -> anyhow::Result<()> {
    info!("Dumping points-to results...");
    let mut pts_writer = BufWriter::new(match pts_path {
        "stdout" => Box::new(std::io::stdout()) as Box<dyn Write>,
        _ => Box::new(
            File::create(pts_path).with_context(|| format!("Unable to create {}", pts_path))?,
        ) as Box<dyn Write>,
    });
    dump_pts(pta, &mut pts_writer).context("Unable to write points-to results")?;
    Ok(())
}

/// One line per value with a non-empty points-to set, sorted by value name:
/// `p ==> { o o'<Base> }`. Objects filtered at every user of the value are
/// still listed.
pub fn dump_pts<W: Write>(pta: &FlowSensitivePTA, pts_writer: &mut W) -> io::Result<()> {
    let vfg = pta.vfg();
    let values = vfg
        .values()
        .map(|value| (vfg.value(value).name.as_str(), value))
        .sorted();
    for (name, value) in values {
        let pts = pta.get_pts(value);
        if pts.is_empty() {
            continue;
        }
        let pointees = pts.iter().map(|obj| obj_name(pta, obj)).sorted().join(" ");
        writeln!(pts_writer, "{} ==> {{ {} }}", name, pointees)?;
    }
    pts_writer.flush()
}

/// Display name of an object. Clones carry the type they were cloned for.
pub fn obj_name(pta: &FlowSensitivePTA, obj: NodeId) -> String {
    let vfg = pta.vfg();
    let node = vfg.obj(obj);
    let name = match node.kind {
        ObjKind::Field { base, offset } => format!("{}.{}", obj_name(pta, base), offset),
        _ => node.name.clone(),
    };
    if pta.heap_cloning().is_clone(obj) {
        format!("{}'<{}>", name, pta.dchg().type_name(pta.get_type(obj)))
    } else {
        name
    }
}
