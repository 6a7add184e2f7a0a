//! Where switchboard keeps its files.
//!
//! The global config lives under the platform config dir; the REPL's
//! readline history lives under the cache dir. Transcripts go wherever
//! `--transcript` points, so there is no data dir.

use anyhow::{Context, Result};
use std::path::PathBuf;

use super::types::Config;

impl Config {
    /// Directory holding the global `config.toml`.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|base| base.join(crate::constants::APP_NAME))
            .context("no config directory on this platform (is $HOME set?)")
    }

    /// Directory for chat readline history.
    pub fn cache_dir() -> Result<PathBuf> {
        dirs::cache_dir()
            .map(|base| base.join(crate::constants::APP_NAME))
            .context("no cache directory on this platform (is $HOME set?)")
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(crate::constants::CONFIG_FILENAME))
    }
}
