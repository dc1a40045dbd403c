//! capstore command-line interface.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use capstore::config::Config;
use capstore::paths;
use capstore::storage::{Store, SystemClock};

mod commands;

#[derive(Parser)]
#[command(name = "capstore", version, about = "Transient, capability-gated object store")]
struct Cli {
    /// Base directory of the store (overrides CAPSTORE_HOME and the config file)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Path to capstore.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an entry and print its id
    Create {
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// MIME type
        #[arg(long = "type")]
        content_type: Option<String>,
        /// Initial content (file path or "-" for stdin); empty if omitted
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Print an entry's name, content type and size as JSON
    Info { id: String },
    /// Write an entry's content to stdout
    Cat { id: String },
    /// Replace (or append to) an entry's content
    Write {
        id: String,
        /// Append instead of truncating
        #[arg(long)]
        append: bool,
        /// Content source (file path or "-" for stdin)
        #[arg(long, default_value = "-")]
        input: PathBuf,
    },
    /// Print an entry's content type
    Type { id: String },
    /// Set an entry's content type
    SetType { id: String, content_type: String },
    /// Delete an entry and print the number of rows removed
    Delete { id: String },
    /// Remove expired entries and orphaned files once
    Sweep {
        /// Override retention.ttl_secs
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
    /// Sweep periodically until interrupted
    Daemon,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let config_path = match cli.config {
        Some(path) => path,
        None => paths::get_config_path()?,
    };
    let config = Config::load_or_default(&config_path)?;
    let validation = config.validate()?;
    for warning in &validation.warnings {
        tracing::warn!("{warning}");
    }

    let base_dir = paths::get_base_dir(cli.home.as_deref(), config.storage.base_dir.as_deref())?;
    let store = Store::open(&base_dir, config.storage.index, Arc::new(SystemClock))
        .with_context(|| format!("Failed to open store at {}", base_dir.display()))?;

    let gateway = store.gateway();
    match cli.command {
        Commands::Create {
            name,
            content_type,
            input,
        } => commands::entry::create(
            gateway,
            name.as_deref(),
            content_type.as_deref(),
            input.as_deref(),
        )?,
        Commands::Info { id } => commands::entry::info(gateway, &id)?,
        Commands::Cat { id } => commands::entry::cat(gateway, &id)?,
        Commands::Write { id, append, input } => {
            commands::entry::write(gateway, &id, append, &input)?;
        },
        Commands::Type { id } => commands::entry::content_type(gateway, &id)?,
        Commands::SetType { id, content_type } => {
            commands::entry::set_content_type(gateway, &id, &content_type)?;
        },
        Commands::Delete { id } => commands::entry::delete(gateway, &id)?,
        Commands::Sweep { ttl_secs } => {
            let ttl = ttl_secs.map_or_else(|| config.retention.ttl(), std::time::Duration::from_secs);
            commands::sweep::once(store.sweeper(), ttl)?;
        },
        Commands::Daemon => commands::sweep::daemon(store.sweeper(), &config.retention).await?,
    }

    store.close();
    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` overrides the default `info`.
fn init_logging(format: LogFormat) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
