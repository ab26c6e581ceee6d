use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File, Source};
use serde::Deserialize;
use tracing::{info, warn};

use crate::normalize::EntityType;

const DEFAULT_FILE: &str = "loader.toml";

/// Connection and input settings. Read from `loader.toml` (or `--config`),
/// then overridden by `LOADER_*` variables, e.g. `LOADER_FILES__LEISURE`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<PathBuf>,
    /// CSV path per item type key (`leisure`, `help`, ...).
    pub files: HashMap<String, PathBuf>,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_source(File::from(p).required(true)),
            None => Self::from_source(File::from(Path::new(DEFAULT_FILE)).required(false)),
        }
    }

    fn from_source<S>(file: S) -> Result<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("LOADER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")?;
        info!(
            database = ?settings.database,
            files = settings.files.len(),
            "settings loaded"
        );
        Ok(settings)
    }

    pub fn file_for(&self, item_type: EntityType) -> Option<&Path> {
        self.files.get(item_type.key()).map(PathBuf::as_path)
    }

    /// Server credentials mean nothing to a SQLite file.
    pub fn warn_unused(&self) {
        for (key, value) in [("host", &self.host), ("user", &self.user), ("password", &self.password)] {
            if value.is_some() {
                warn!(key, "setting ignored by the SQLite backend");
            }
        }
    }
}

/// Ask the operator for a value on stderr, read the answer from stdin.
pub fn prompt(label: &str) -> Result<String> {
    prompt_with(&mut io::stdin().lock(), &mut io::stderr(), label)
}

fn prompt_with<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> Result<String> {
    write!(output, "{}", label)?;
    output.flush()?;
    let mut line = String::new();
    input
        .read_line(&mut line)
        .with_context(|| format!("Failed to read answer to {:?}", label.trim()))?;
    Ok(line.trim().to_string())
}
