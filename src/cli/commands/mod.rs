//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod export;
mod helpers;
mod ingest;
mod init;
mod qualify;
mod review;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};
use crate::models::BusinessStatus;

/// Final status a reviewer may assign or an export may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FinalStatus {
    Qualified,
    Excluded,
}

impl From<FinalStatus> for BusinessStatus {
    fn from(status: FinalStatus) -> Self {
        match status {
            FinalStatus::Qualified => BusinessStatus::Qualified,
            FinalStatus::Excluded => BusinessStatus::Excluded,
        }
    }
}

#[derive(Parser)]
#[command(name = "leadgate")]
#[command(about = "Small-business lead discovery, deduplication and qualification")]
#[command(version)]
pub struct Cli {
    /// Data directory or database file (overrides config file).
    /// Can be a directory containing leadgate.db or a .db file directly.
    #[arg(long, short = 'd', global = true)]
    data: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Ingest discovery records (JSON array or JSON Lines)
    Ingest {
        /// File of discovery records
        file: PathBuf,
    },

    /// Append enrichment signals to the evidence ledger (JSON array or JSON Lines)
    Enrich {
        /// File of enrichment signals
        file: PathBuf,
    },

    /// Run pending businesses through the qualification gates
    Qualify {
        /// Re-run the gates for businesses already qualified or excluded
        #[arg(long)]
        requalify: bool,
        /// Limit number of businesses to process (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: usize,
        /// Skip website archive lookups
        #[arg(long)]
        offline: bool,
    },

    /// Human review of held businesses
    Review {
        #[command(subcommand)]
        command: ReviewCommands,
    },

    /// Write finalized businesses to a JSON file and mark them exported
    Export {
        /// Output file
        file: PathBuf,
        /// Statuses to export (repeatable)
        #[arg(short, long, value_enum, default_value = "qualified")]
        status: Vec<FinalStatus>,
    },

    /// Show business counts by status
    Status,

    /// Show one business with its evidence and gate results
    Show {
        /// Business ID or fingerprint
        id: String,
    },
}

#[derive(Subcommand)]
enum ReviewCommands {
    /// List businesses awaiting review
    List {
        /// Limit number of businesses to list (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Force a final status, recording who decided and why
    Override {
        /// Business ID
        id: String,
        /// Status to assign
        #[arg(long, value_enum)]
        status: FinalStatus,
        /// Reason for the decision
        #[arg(long)]
        reason: String,
        /// Reviewer name
        #[arg(long)]
        by: String,
    },

    /// Exclude reviews older than the configured review window
    Expire,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        data: cli.data,
    };
    let (settings, config) = load_settings_with_options(options).await?;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Ingest { file } => ingest::cmd_ingest(&settings, &config, &file).await,
        Commands::Enrich { file } => ingest::cmd_enrich(&settings, &config, &file).await,
        Commands::Qualify {
            requalify,
            limit,
            offline,
        } => qualify::cmd_qualify(&settings, &config, requalify, limit, offline).await,
        Commands::Review { command } => match command {
            ReviewCommands::List { limit } => review::cmd_review_list(&settings, &config, limit).await,
            ReviewCommands::Override {
                id,
                status,
                reason,
                by,
            } => review::cmd_review_override(&settings, &id, status.into(), &reason, &by).await,
            ReviewCommands::Expire => review::cmd_review_expire(&settings, &config).await,
        },
        Commands::Export { file, status } => {
            let statuses: Vec<BusinessStatus> = status.into_iter().map(Into::into).collect();
            export::cmd_export(&settings, &config, &file, &statuses).await
        }
        Commands::Status => status::cmd_status(&settings).await,
        Commands::Show { id } => status::cmd_show(&settings, &id).await,
    }
}
