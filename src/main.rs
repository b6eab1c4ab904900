//! # Campus Search CLI (`campus`)
//!
//! ## Usage
//!
//! ```bash
//! campus --config ./config/campus.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `campus init` | Create the SQLite database and run schema migrations |
//! | `campus search <domain> "<query>"` | Search courses, clubs, or professors |
//! | `campus events` | List the next upcoming events |
//! | `campus ingest` | Pull the events feed once into the store |
//! | `campus serve` | Start the HTTP server and the hourly ingestion job |
//!
//! Logging goes to stderr and honours `RUST_LOG`; `--verbose` raises the
//! default level to `debug`.

use std::path::PathBuf;

use campus_search::{config, events, ingest, migrate, search, server};
use campus_search_core::DomainTag;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Campus Search: natural-language search over courses, clubs, and professors.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/campus.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "campus", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/campus.toml")]
    config: PathBuf,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Search one domain.
    Search {
        /// `courses` (or `classes`), `clubs`, or `professors`.
        domain: DomainTag,

        /// The natural-language query.
        query: String,

        /// Number of results (defaults to `[retrieval].top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// List events starting after now, earliest first.
    Events {
        /// Maximum number of events (defaults to `[retrieval].top_k`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Run the events ingestion job once.
    Ingest,

    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and runs the ingestion job every
    /// `[ingest].interval_secs` unless `--no-ingest` is given.
    Serve {
        /// Do not start the ingestion scheduler.
        #[arg(long)]
        no_ingest: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Search {
            domain,
            query,
            top_k,
        } => {
            search::run_search(&cfg, domain, &query, top_k).await?;
        }
        Commands::Events { limit } => {
            events::run_events(&cfg, limit).await?;
        }
        Commands::Ingest => {
            ingest::run_ingest(&cfg).await?;
        }
        Commands::Serve { no_ingest } => {
            server::run_server(&cfg, !no_ingest).await?;
        }
    }

    Ok(())
}
