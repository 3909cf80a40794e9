//! CLI execution context.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use edge_core::EdgeCacheConfig;

use crate::config::{find_config_file, load_config};
use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Worker configuration.
    pub config: Arc<EdgeCacheConfig>,
    /// File the configuration came from, if any.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from config file.
    ///
    /// An explicit path must load; a discovered one is used when present,
    /// otherwise the built-in defaults apply.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config_path = match config_path {
            Some(path) => Some(resolve(&cwd, path)),
            None => find_config_file(&cwd),
        };

        let config = match &config_path {
            Some(path) => {
                output.debug(&format!("Using config {}", path.display()));
                load_config(path)?
            }
            None => {
                output.debug("No config file found, using defaults");
                EdgeCacheConfig::default()
            }
        };

        Ok(Self {
            config: Arc::new(config),
            config_path,
            output,
            cwd,
        })
    }
}

fn resolve(cwd: &std::path::Path, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}
