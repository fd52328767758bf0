// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            implementation,
            host_version,
            host_source,
            container_version,
            container_source,
            force,
            pipeline,
        } => {
            let config = commands::load_config(config_path, &pipeline)?;
            let request = commands::RunRequest {
                implementation,
                host_version,
                host_source,
                container_version,
                container_source,
                force,
            };
            commands::cmd_run(&request, &config)
        }

        Commands::Sweep {
            experiments,
            jobs,
            dry_run,
            pipeline,
        } => {
            let config = commands::load_config(config_path, &pipeline)?;
            commands::cmd_sweep(&experiments, jobs, dry_run, &config)
        }

        Commands::Results { output, failed } => {
            let overrides = cli::PipelineArgs {
                output,
                ..Default::default()
            };
            let config = commands::load_config(config_path, &overrides)?;
            commands::cmd_results(&config, failed)
        }

        Commands::Uninstall {
            source_dir,
            install_dir,
            template_dir,
        } => {
            let overrides = cli::PipelineArgs {
                template_dir,
                ..Default::default()
            };
            let config = commands::load_config(config_path, &overrides)?;
            commands::cmd_uninstall(&source_dir, &install_dir, &config)
        }
    }
}
