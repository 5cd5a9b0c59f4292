// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The main routine of `fstbhc`.
//!
//! Loads a JSON program description, builds the debug-info class hierarchy
//! of its types and runs the flow-sensitive pointer analysis over it.

use log::*;
use std::env;
use std::path::Path;

use fstbhc::builder::program_loader;
use fstbhc::dchg::DCHGraph;
use fstbhc::pta::flow_sensitive::FlowSensitivePTA;
use fstbhc::pta::PointerAnalysis;
use fstbhc::util::options::AnalysisOptions;

fn run(options: AnalysisOptions) -> anyhow::Result<()> {
    let input = match &options.input {
        Some(input) => input.clone(),
        None => anyhow::bail!("No input program given"),
    };
    let program = program_loader::load_program(Path::new(&input))?;
    let dchg = DCHGraph::new(program.types);
    let mut pta = FlowSensitivePTA::new(&dchg, program.vfg, options);
    pta.analyze();
    Ok(())
}

fn main() {
    // Initialize loggers.
    if env::var("FSTBHC_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("FSTBHC_LOG")
            .write_style("FSTBHC_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    // Get any options specified via the FSTBHC_FLAGS environment variable
    let mut options = AnalysisOptions::default();
    let fstbhc_flags = env::var("FSTBHC_FLAGS").unwrap_or_default();
    let fstbhc_args: Vec<String> = serde_json::from_str(&fstbhc_flags).unwrap_or_default();
    if let Err(e) = options.parse_from_args(&fstbhc_args[..]) {
        e.exit();
    }

    // Let arguments supplied on the command line override the environment variable.
    let args = env::args().skip(1).collect::<Vec<_>>();
    if let Err(e) = options.parse_from_args(&args[..]) {
        e.exit();
    }
    info!("FSTBHC Options: {:?}", options);

    if let Err(e) = run(options) {
        error!("{:#}", e);
        eprintln!("fstbhc: {:#}", e);
        std::process::exit(1);
    }
}
