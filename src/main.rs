//! # Vehicle Lookup CLI (`vlk`)
//!
//! Looks up school vehicle and family registrations from a locally cached
//! copy of the registration spreadsheet, refreshing it when the network is
//! available.
//!
//! ## Usage
//!
//! ```bash
//! vlk --config ./config/vlk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vlk init` | Create the SQLite database and run schema migrations |
//! | `vlk sync [--force]` | Show cached data, then refresh from the remote sources |
//! | `vlk search "<query>"` | Search the cached households |
//! | `vlk shell` | Interactive lookup with debounced input |
//! | `vlk cache info` | Describe the cached record set |
//! | `vlk cache clear` | Remove the cached record set |
//! | `vlk sources` | Show resolved endpoints and where they came from |
//! | `vlk import <file.xlsx>` | Load a local workbook into the cache |
//!
//! Logs go to stderr; set `RUST_LOG=info` (or `debug`) for more detail.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use vehicle_lookup::{config, import, lifecycle::App, migrate, search, sources, stats};

/// Vehicle Lookup CLI: offline-first search over school vehicle and family
/// registrations.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/vlk.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "vlk",
    about = "Vehicle Lookup: offline-first search over school vehicle and family registrations",
    version,
    long_about = "Vehicle Lookup keeps the last good copy of the registration spreadsheet on the \
    device, shows it immediately, and refreshes it in the background from a fast JSON feed or the \
    spreadsheet export. Households can be searched by plate, sticker, make/model, student, or guardian."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/vlk.toml`.
    #[arg(long, global = true, default_value = "./config/vlk.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it more than once is safe.
    Init,

    /// Synchronize the local record set.
    ///
    /// Shows the cached set first, then refreshes from the fast feed or the
    /// spreadsheet when online.
    Sync {
        /// Go to the network even when content is already showing.
        #[arg(long)]
        force: bool,
    },

    /// Search households.
    Search {
        /// The search query string. Leading and trailing spaces are ignored.
        query: String,

        /// Fields to search: `all` or `stickers`.
        #[arg(long, default_value = "all")]
        mode: String,

        /// Require whole-value matches instead of substring matches.
        #[arg(long)]
        exact: bool,

        /// Synchronize before searching.
        #[arg(long)]
        refresh: bool,

        /// Maximum number of households to print.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Interactive lookup.
    ///
    /// Each line is a query. `:mode all|stickers`, `:exact on|off`,
    /// `:refresh`, and `:quit` change settings.
    Shell,

    /// Inspect or clear the cached record set.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show resolved endpoints and where each came from.
    Sources,

    /// Import a local `.xlsx` workbook into the cache.
    Import {
        /// Path to the workbook.
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Describe the cached record set without modifying it.
    Info,
    /// Remove the cached record set.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    if let Commands::Init = cli.command {
        migrate::run_migrations(&cfg).await?;
        println!("Database initialized successfully.");
        return Ok(());
    }

    let app = App::open(&cfg).await?;
    let result = match cli.command {
        Commands::Init => Ok(()),
        Commands::Sync { force } => {
            let outcome = app.sync(force).await;
            search::print_outcome(&outcome);
            match outcome.error {
                Some(err) => Err(anyhow::Error::new(err)),
                None => Ok(()),
            }
        }
        Commands::Search {
            query,
            mode,
            exact,
            refresh,
            limit,
        } => search::run_search(&app, &query, &mode, exact, refresh, limit).await,
        Commands::Shell => search::run_shell(&app).await,
        Commands::Cache { action } => match action {
            CacheAction::Info => stats::run_cache_info(&cfg, &app.cache, app.kv.as_ref()).await,
            CacheAction::Clear => stats::run_cache_clear(&app.cache).await,
        },
        Commands::Sources => {
            sources::list_sources(&app.resolver).await;
            Ok(())
        }
        Commands::Import { path } => import::import_file(&app.cache, &path)
            .await
            .map(|count| println!("Imported {} records.", count)),
    };

    app.close().await;
    result
}
