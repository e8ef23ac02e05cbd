//! Service configuration: CLI flags with environment fallbacks

use clap::Parser;
use dotenv::dotenv;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
#[command(name = "riverboat")]
#[command(about = "Riverboat - certainty-weighted payouts for prediction circles")]
pub struct Config {
    /// Address to serve the API on
    #[arg(long, env = "RIVERBOAT_BIND", default_value = "0.0.0.0:5000")]
    pub bind: String,

    /// SQLite database file (relative paths resolve against the crate directory)
    #[arg(long, env = "RIVERBOAT_DB_PATH", default_value = "riverboat.db")]
    pub database_path: String,
}

impl Config {
    /// Load `.env` files, then parse flags and environment
    pub fn load() -> Self {
        load_env();
        Self::parse()
    }

    pub fn resolved_database_path(&self) -> String {
        resolve_data_path(&self.database_path)
    }
}

/// Absolute paths and `:memory:` pass through; relative paths are anchored at
/// the crate directory, not the caller's cwd.
pub fn resolve_data_path(raw: &str) -> String {
    let raw = raw.trim();
    if raw == ":memory:" {
        return raw.to_string();
    }

    let p = PathBuf::from(raw);
    if p.is_absolute() {
        return p.to_string_lossy().to_string();
    }

    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join(p)
        .to_string_lossy()
        .to_string()
}

fn load_env() {
    // cwd + parents
    let _ = dotenv();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
