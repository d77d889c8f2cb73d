use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rct229",
    about = "Ruleset checking for ASHRAE 90.1-2019 Appendix G building energy models",
    version
)]
pub struct Cli {
    /// Emit debug diagnostics on stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a user/baseline/proposed RMR triplet against every rule
    Evaluate {
        /// User RMR (JSON)
        user: PathBuf,

        /// Baseline RMR (JSON)
        baseline: PathBuf,

        /// Proposed RMR (JSON)
        proposed: PathBuf,

        /// Evaluation config (YAML, or JSON by extension)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the full report as JSON to this path
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Write the per-rule text log to this path
        #[arg(long)]
        log: Option<PathBuf>,

        /// Print the full report as JSON instead of the summary
        #[arg(long)]
        json: bool,
    },

    /// Run rule test suites and print the software testing summary
    Test {
        /// Suite files (JSON or YAML); defaults to every suite under --dir
        suites: Vec<PathBuf>,

        /// Directory searched when no suite files are given
        #[arg(long, default_value = "ruletests")]
        dir: PathBuf,

        /// Only check each test's generated RMRs against the schema
        #[arg(long)]
        check_schema: bool,
    },

    /// Validate one RMR against the schema
    Validate {
        /// RMR (JSON)
        rmr: PathBuf,
    },

    /// List the rules in the catalog
    Rules {
        /// Only list rules of this section
        #[arg(long)]
        section: Option<u32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
