// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use clap::{Parser, Subcommand};
use echo_log_cli::commands::{append, decode_policy, range, tail};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "echo-log")]
#[command(about = "Inspect and append to an echo-log request log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show lines in [start, end)
    Range {
        path: PathBuf,

        #[arg(long)]
        start: u64,

        #[arg(long)]
        end: u64,

        /// Print stored JSON lines instead of a table
        #[arg(long)]
        raw: bool,

        /// Leave undecodable lines out of the table instead of failing
        #[arg(long)]
        skip_invalid: bool,
    },
    /// Show the last N lines
    Tail {
        path: PathBuf,

        #[arg(long, short, default_value_t = 10)]
        n: usize,

        #[arg(long)]
        raw: bool,

        #[arg(long)]
        skip_invalid: bool,
    },
    /// Append an entry built from JSON objects
    Append {
        path: PathBuf,

        #[arg(long)]
        headers: Option<String>,

        #[arg(long)]
        params: Option<String>,

        #[arg(long)]
        body: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Range {
            path,
            start,
            end,
            raw,
            skip_invalid,
        } => range::run(&path, start, end, raw, decode_policy(skip_invalid)?).await,
        Commands::Tail {
            path,
            n,
            raw,
            skip_invalid,
        } => tail::run(&path, n, raw, decode_policy(skip_invalid)?).await,
        Commands::Append {
            path,
            headers,
            params,
            body,
        } => {
            append::run(
                &path,
                headers.as_deref(),
                params.as_deref(),
                body.as_deref(),
            )
            .await
        }
    }
}
