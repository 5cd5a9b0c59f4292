// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use log::*;
use std::io::{self, BufWriter, Write};

use crate::dchg::DCHEdgeKind;
use crate::pta::flow_sensitive::FlowSensitivePTA;
use crate::pts_set::points_to::PointsToSet;

pub struct FSStat<'a, 'pta> {
    pta: &'a FlowSensitivePTA<'pta>,
}

impl<'a, 'pta> FSStat<'a, 'pta> {
    pub fn new(pta: &'a FlowSensitivePTA<'pta>) -> Self {
        FSStat { pta }
    }

    pub fn dump_stats(&self) {
        let mut stat_writer = BufWriter::new(Box::new(std::io::stdout()) as Box<dyn Write>);

        info!("Dumping pta statistics...");
        if let Err(e) = self.write_stats(&mut stat_writer) {
            error!("Unable to write statistics: {:?}", e);
        }
    }

    pub fn write_stats<W: Write>(&self, stat_writer: &mut BufWriter<W>) -> io::Result<()> {
        stat_writer.write_all("##########################################################\n".as_bytes())?;
        self.dump_solver_stat(stat_writer)?;
        stat_writer.write_all("----------------------------------------------------------\n".as_bytes())?;
        self.dump_pts_stat(stat_writer)?;
        stat_writer.write_all("##########################################################\n".as_bytes())?;
        stat_writer.flush()
    }

    pub fn dump_solver_stat<W: Write>(&self, stat_writer: &mut BufWriter<W>) -> io::Result<()> {
        let pta = self.pta;
        let vfg = pta.vfg();
        stat_writer.write_all("Solver Statistics: \n".as_bytes())?;
        stat_writer.write_all(format!("#Statements: {}\n", vfg.stmts().len()).as_bytes())?;
        stat_writer.write_all(format!("#Indirect edges: {}\n", vfg.num_indirect_edges()).as_bytes())?;
        stat_writer.write_all(format!("#Processed statements: {}\n", pta.num_processed).as_bytes())?;
        stat_writer.write_all(format!("#Objects: {}\n", vfg.objects().len()).as_bytes())?;
        stat_writer.write_all(format!("#Clones: {}\n", pta.heap_cloning.num_clones).as_bytes())?;
        stat_writer.write_all(format!("#Field objects: {}\n", pta.heap_cloning.num_field_objs).as_bytes())?;
        stat_writer.write_all(format!("#Filtered: {}\n", pta.filter_sets.num_filtered()).as_bytes())?;
        stat_writer.write_all(format!("#Strong updates: {}\n", pta.num_strong_updates).as_bytes())?;
        let dchg = pta.dchg();
        stat_writer.write_all(
            format!(
                "#DCHG edges: {} inheritance, {} first-field\n",
                dchg.num_edges(DCHEdgeKind::Inheritance),
                dchg.num_edges(DCHEdgeKind::FirstField)
            )
            .as_bytes(),
        )?;
        Ok(())
    }

    pub fn dump_pts_stat<W: Write>(&self, stat_writer: &mut BufWriter<W>) -> io::Result<()> {
        let pts_map = self.pta.get_pt_data().get_pts_map();
        let num_pointers = pts_map.values().filter(|pts| !pts.is_empty()).count();
        let num_pts_relations: usize = pts_map.values().map(|pts| pts.count()).sum();
        let avg_pts = if num_pointers == 0 {
            0.0
        } else {
            num_pts_relations as f64 / num_pointers as f64
        };

        stat_writer.write_all("Points-to Statistics: \n".as_bytes())?;
        stat_writer.write_all(format!("#Pointers: {}\n", num_pointers).as_bytes())?;
        stat_writer.write_all(format!("#Points-to relations: {}\n", num_pts_relations).as_bytes())?;
        stat_writer.write_all(format!("#Avg points-to size: {}\n", avg_pts).as_bytes())?;
        Ok(())
    }
}
