use anyhow::Result;
use betaviz::cli::{Cli, Commands};
use betaviz::commands::{self, AnalyzeConfig};
use betaviz::config::CONFIG_FILE_NAME;
use betaviz::observability::{init_logging, install_panic_hook};
use betaviz::progress::QUIET_ENV;
use clap::Parser;
use std::path::PathBuf;

fn main() -> Result<()> {
    let cli = Cli::parse();

    install_panic_hook();
    init_logging(cli.verbosity);
    if cli.quiet {
        std::env::set_var(QUIET_ENV, "true");
    }

    match cli.command {
        Commands::Analyze {
            data,
            format,
            output,
            policy,
            jobs,
            figures,
            no_figures,
            timings,
        } => commands::handle_analyze(AnalyzeConfig {
            config: cli.config,
            data,
            format: format.into(),
            output,
            policy: policy.map(Into::into),
            jobs,
            figures,
            no_figures,
            timings,
        }),
        Commands::Derive { data, output } => {
            commands::handle_derive(cli.config.as_deref(), data, &output)
        }
        Commands::Fit {
            data,
            from_draws,
            policy,
        } => commands::handle_fit(
            cli.config.as_deref(),
            data,
            from_draws.as_deref(),
            policy.into(),
        ),
        Commands::Init { force } => {
            let path = cli
                .config
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            commands::init_config(&path, force)
        }
    }
}
