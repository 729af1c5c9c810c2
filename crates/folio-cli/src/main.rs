//! folio - inspect version databases.
//!
//! # Configuration
//!
//! - `FOLIO_DB_PATH` - version database, defaults to `~/.folio/versions.db`
//! - `RUST_LOG` - log filter, logs go to stderr
//!
//! A `.env` file in the working directory is loaded first.

mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use folio_core::VersioningConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(about = "Inspect content version history and drafts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Version database (overrides config and environment)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Configuration file (.toml, .json or .yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every version of a master item, newest first
    History {
        /// Master item id
        master_id: i64,
    },
    /// Show a version with its rebuilt item tree
    Show {
        /// Master item id
        master_id: i64,

        /// Version index (defaults to the latest version)
        #[arg(long)]
        index: Option<i32>,
    },
    /// Show the current draft of a master item
    Draft {
        /// Master item id
        master_id: i64,
    },
}

/// Build the configuration: file (or defaults), then `FOLIO_*` variables,
/// then `--db`.
fn load_config(
    config_file: Option<&Path>,
    db: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<VersioningConfig> {
    let mut config = match config_file {
        Some(path) => VersioningConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => VersioningConfig::default(),
    };
    config.apply_env(lookup);
    if let Some(db) = db {
        config.database_path = db.to_path_buf();
        config.in_memory = false;
    }
    Ok(config)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.db.as_deref(), |key| {
        std::env::var(key).ok()
    })?;
    let store = commands::open_store(&config)?;

    let mut out = std::io::stdout().lock();
    match cli.command {
        Commands::History { master_id } => {
            commands::history(&store, master_id, cli.pretty, &mut out)
        }
        Commands::Show { master_id, index } => {
            commands::show(&store, master_id, index, cli.pretty, &mut out)
        }
        Commands::Draft { master_id } => commands::draft(&store, master_id, cli.pretty, &mut out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_env_overrides_config_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "database_path = \"/srv/file.db\"\nverify_masters = true").unwrap();
        let env: HashMap<&str, &str> = [
            ("FOLIO_DB_PATH", "/srv/env.db"),
            ("FOLIO_VERIFY_MASTERS", "false"),
        ]
        .into_iter()
        .collect();

        let config =
            load_config(Some(file.path()), None, |key| env.get(key).map(|v| v.to_string()))
                .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/srv/env.db"));
        assert!(!config.verify_masters);
    }

    #[test]
    fn test_db_flag_wins() {
        let env: HashMap<&str, &str> = [("FOLIO_DB_PATH", "/srv/env.db"), ("FOLIO_IN_MEMORY", "1")]
            .into_iter()
            .collect();

        let config = load_config(None, Some(Path::new("/srv/flag.db")), |key| {
            env.get(key).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/srv/flag.db"));
        assert!(!config.in_memory);
    }
}
