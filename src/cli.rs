use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::output::OutputFormat;
use crate::posterior::FitPolicy;

/// Report format for `analyze`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Tables for reading in a terminal (default)
    Terminal,
    /// The full report as JSON
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Terminal => OutputFormat::Terminal,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// When to fit the model instead of loading the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Load a matching artifact, fit otherwise
    Reuse,
    /// Always fit and overwrite the artifact
    Refit,
    /// Never fit; fail without a matching artifact
    CacheOnly,
}

impl From<PolicyArg> for FitPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Reuse => FitPolicy::Reuse,
            PolicyArg::Refit => FitPolicy::Refit,
            PolicyArg::CacheOnly => FitPolicy::CacheOnly,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "betaviz")]
#[command(about = "Bayesian beta-regression analysis of visualization decision-making trials", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Increase verbosity level (can be repeated: -v, -vv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Configuration file (default: nearest .betaviz.toml)
    #[arg(long, global = true, env = "BETAVIZ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress progress indicators and stage lines
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full analysis: derive, fit or load, summarize and render
    Analyze {
        /// Trial data CSV (overrides paths.data)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: FormatArg,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fit policy (overrides engine.policy)
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        /// Worker threads for summarizing (0 = all cores)
        #[arg(short = 'j', long = "jobs", default_value = "0")]
        jobs: usize,

        /// Directory for SVG charts (overrides paths.figures)
        #[arg(long)]
        figures: Option<PathBuf>,

        /// Skip writing charts
        #[arg(long, conflicts_with = "figures")]
        no_figures: bool,

        /// Log per-stage timings
        #[arg(long)]
        timings: bool,
    },

    /// Derive features and write the cleaned table as CSV
    Derive {
        /// Trial data CSV (overrides paths.data)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Destination CSV
        #[arg(short, long, default_value = "data/derived.csv")]
        output: PathBuf,
    },

    /// Fit the model (or import draws) and persist the posterior artifact
    Fit {
        /// Trial data CSV (overrides paths.data)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Import an `as_draws_df` CSV instead of running the engine
        #[arg(long)]
        from_draws: Option<PathBuf>,

        /// Fit policy (default: refit)
        #[arg(long, value_enum, default_value = "refit")]
        policy: PolicyArg,
    },

    /// Write a commented default .betaviz.toml
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Configure the rayon global thread pool once at startup.
pub fn configure_thread_pool(jobs: usize) {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if jobs > 0 {
        builder = builder.num_threads(jobs);
    }
    if let Err(e) = builder.build_global() {
        log::debug!("Thread pool already configured: {e}");
    }
}
