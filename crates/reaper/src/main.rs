// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! CLI entry point: `reap` deletes every cloud resource tagged for a
//! cluster, `materialize` applies (or renders) a declared file spec.

mod materialize_cmd;
mod reap;

use std::process::exit;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "reaper", about = "Tears down tagged cluster resources")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level, overridden by the `RUST_LOG` environment variable.
    #[arg(long, global = true, default_value = "info")]
    log_level: log::LevelFilter,
}

#[derive(Subcommand)]
enum Command {
    /// Discover and delete every resource tagged for a cluster.
    Reap {
        /// The cluster name resources are tagged with.
        #[arg(long)]
        cluster_name: String,

        /// A JSON file backing an in-memory mock cloud client, in place of
        /// a real cloud SDK (which is out of scope for this tool).
        #[arg(long)]
        mock_state: Option<String>,
    },
    /// Apply (or render) a declared file specification.
    Materialize {
        /// Path to a JSON file describing the desired file spec.
        #[arg(long)]
        spec: String,

        /// Emit a cloud-init script instead of touching the local filesystem.
        #[arg(long)]
        cloud_init: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    let runtime = tokio::runtime::Runtime::new().expect("failed to start Tokio runtime");
    let result = runtime.block_on(async move {
        match cli.command {
            Command::Reap {
                cluster_name,
                mock_state,
            } => reap::run(&cluster_name, mock_state.as_deref()).await,
            Command::Materialize { spec, cloud_init } => {
                materialize_cmd::run(&spec, cloud_init).await
            }
        }
    });

    if let Err(err) = result {
        logging::fatal_log!("error: {err}");
        exit(1);
    }
}
