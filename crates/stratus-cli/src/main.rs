//! Stratus CLI entry point.

mod commands;
mod prompter;
mod walkthrough;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use stratus_state::{find_project_root, ProjectConfig, ProjectPaths};

use crate::prompter::TerminalPrompter;

#[derive(Parser)]
#[command(name = "stratus", version, about = "Scaffold cloud storage resources")]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a resource to the project.
    Add { category: Category },
    /// Update an existing resource.
    Update { category: Category },
    /// Remove a resource and its local artifacts.
    Remove {
        category: Category,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Show configured resources.
    Status { category: Category },
    /// Migrate pre-versioned state files to the current schema.
    Migrate {
        category: Category,
        /// Migrate without asking per resource.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Category {
    Storage,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let root = find_project_root(&cwd)?;
    let project = ProjectConfig::load(&root)?;
    let paths = ProjectPaths::new(root);
    let mut prompter = TerminalPrompter;

    match cli.command {
        Commands::Add { category: Category::Storage } => {
            commands::add::run_add(&mut prompter, &paths, &project)
        }
        Commands::Update { category: Category::Storage } => {
            commands::update::run_update(&mut prompter, &paths)
        }
        Commands::Remove { category: Category::Storage, yes } => {
            commands::remove::run_remove(&mut prompter, &paths, yes)
        }
        Commands::Status { category: Category::Storage } => commands::status::run_status(&paths),
        Commands::Migrate { category: Category::Storage, force } => {
            commands::migrate::run_migrate(&mut prompter, &paths, force)
        }
    }
}
