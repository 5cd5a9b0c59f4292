// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Analysis options.

use clap::{Arg, Command};

use crate::pta::PTAType;

const FSTBHC_USAGE: &str = r#"fstbhc [OPTIONS] INPUT"#;

/// Creates the clap::Command metadata for argument parsing.
fn make_options_parser() -> Command<'static> {
    Command::new("fstbhc")
        .no_binary_name(true)
        .override_usage(FSTBHC_USAGE)
        .version(env!("CARGO_PKG_VERSION"))
        .arg(Arg::new("pta-type")
            .long("pta-type")
            .takes_value(true)
            .value_parser(["fs", "flow-sensitive", "tbhc"])
            .default_value("tbhc")
            .help("The type of pointer analysis.")
            .long_help("Plain flow-sensitive analysis (fs), or flow-sensitive analysis with type-based heap cloning (tbhc)."))
        .arg(Arg::new("store-reuse")
            .long("store-reuse")
            .takes_value(false)
            .help("Allow objects to be reused with another type at GEPs and stores."))
        .arg(Arg::new("all-reuse")
            .long("all-reuse")
            .takes_value(false)
            .help("Allow objects to be reused with another type at GEPs, stores and loads."))
        .arg(Arg::new("no-first-field")
            .long("no-first-field")
            .takes_value(false)
            .help("Do not treat a struct as a subtype of the type of its first field."))
        .arg(Arg::new("max-field-limit")
            .long("max-field-limit")
            .takes_value(true)
            .value_parser(clap::value_parser!(usize))
            .default_value("512")
            .help("Field offset at which a memory object becomes field-insensitive."))
        .arg(Arg::new("dump-stats")
            .long("dump-stats")
            .takes_value(false)
            .help("Dump the statistics of the analysis results."))
        .arg(Arg::new("pts-output")
            .long("dump-pts")
            .takes_value(true)
            .help("Dump points-to results to the output file."))
        .arg(Arg::new("INPUT")
            .help("The JSON program description to be analyzed."))
}

#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    pub pta_type: PTAType,
    // options for object reuse in type-based heap cloning
    pub store_reuse: bool,
    pub all_reuse: bool,
    pub first_field: bool,
    pub max_field_limit: usize,

    pub dump_stats: bool,
    pub pts_output: Option<String>,
    pub input: Option<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            pta_type: PTAType::FlowSensitiveTBHC,
            store_reuse: false,
            all_reuse: false,
            first_field: true,
            max_field_limit: 512,
            dump_stats: false,
            pts_output: None,
            input: None,
        }
    }
}

impl AnalysisOptions {
    /// Parses options from a list of strings. Options not mentioned in `args`
    /// keep their current values, so that the command line can override
    /// options taken from the environment.
    pub fn parse_from_args(&mut self, args: &[String]) -> Result<(), clap::Error> {
        let matches = make_options_parser().try_get_matches_from(args.iter())?;

        if args.iter().any(|arg| arg.starts_with("--pta-type")) {
            if let Some(pta_type) = matches.get_one::<String>("pta-type") {
                self.pta_type = match pta_type.as_str() {
                    "fs" | "flow-sensitive" => PTAType::FlowSensitive,
                    "tbhc" => PTAType::FlowSensitiveTBHC,
                    _ => unreachable!(),
                }
            }
        }
        if args.iter().any(|arg| arg.starts_with("--max-field-limit")) {
            if let Some(limit) = matches.get_one::<usize>("max-field-limit") {
                self.max_field_limit = *limit;
            }
        }

        self.store_reuse |= matches.contains_id("store-reuse");
        self.all_reuse |= matches.contains_id("all-reuse");
        if matches.contains_id("no-first-field") {
            self.first_field = false;
        }
        self.dump_stats |= matches.contains_id("dump-stats");
        if let Some(output) = matches.get_one::<String>("pts-output") {
            self.pts_output = Some(output.clone());
        }
        if let Some(input) = matches.get_one::<String>("INPUT") {
            self.input = Some(input.clone());
        }
        Ok(())
    }

    #[inline]
    pub fn tbhc(&self) -> bool {
        matches!(self.pta_type, PTAType::FlowSensitiveTBHC)
    }

    /// Whether GEPs and stores may reuse objects.
    #[inline]
    pub fn store_reuse(&self) -> bool {
        self.store_reuse || self.all_reuse
    }

    /// Whether loads may reuse objects.
    #[inline]
    pub fn load_reuse(&self) -> bool {
        self.all_reuse
    }
}
