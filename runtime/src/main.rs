// Copyright 2026 Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use harvest_runtime::cli;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "harvest",
    about = "Harvest: authenticated profile acquisition and field extraction",
    version,
    after_help = "Run 'harvest <command> --help' for details on each command."
)]
struct Cli {
    /// Config file (overrides HARVEST_CONFIG and the default locations)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture profile and detail documents for every subject in a roster
    Crawl {
        /// Roster CSV
        roster: PathBuf,
        /// Credentials JSON
        #[arg(long)]
        accounts: PathBuf,
        /// Roster column holding the subject id
        #[arg(long, default_value = "id")]
        id_column: String,
        /// Roster column holding the profile locator
        #[arg(long, default_value = "linkedin_url")]
        url_column: String,
        /// Seed the delay model for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Collect current and past members of companies via people search
    Search {
        /// Company names to search
        #[arg(required = true)]
        companies: Vec<String>,
        /// Credentials JSON
        #[arg(long)]
        accounts: PathBuf,
        /// Account id to log in with (default: the first one)
        #[arg(long)]
        account: Option<String>,
        /// Where to write the membership records
        #[arg(long, short, default_value = "memberships.json")]
        output: PathBuf,
        /// Follow each lead to its public profile locator
        #[arg(long)]
        resolve: bool,
    },
    /// Turn captured documents into structured JSON records
    Extract {
        /// Roster CSV
        roster: PathBuf,
        /// Roster column holding the subject id
        #[arg(long, default_value = "id")]
        id_column: String,
        /// Roster column holding the profile locator
        #[arg(long, default_value = "linkedin_url")]
        url_column: String,
        /// Skip headshot downloads
        #[arg(long)]
        no_images: bool,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var("HARVEST_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("HARVEST_QUIET", "1");
    }

    let directive = if cli.verbose {
        "harvest_runtime=debug"
    } else {
        "harvest_runtime=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directive)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Crawl {
            roster,
            accounts,
            id_column,
            url_column,
            seed,
        } => cli::crawl_cmd::run(config, &roster, &accounts, &id_column, &url_column, seed).await,
        Commands::Search {
            companies,
            accounts,
            account,
            output,
            resolve,
        } => {
            cli::search_cmd::run(
                config,
                &companies,
                &accounts,
                account.as_deref(),
                &output,
                resolve,
            )
            .await
        }
        Commands::Extract {
            roster,
            id_column,
            url_column,
            no_images,
        } => cli::extract_cmd::run(config, &roster, &id_column, &url_column, no_images).await,
        Commands::Doctor => cli::doctor::run(config).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "harvest", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else if !cli::output::is_quiet() {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
