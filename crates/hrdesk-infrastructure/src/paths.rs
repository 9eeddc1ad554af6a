//! Centralized path resolution for panel files.

use std::path::PathBuf;

use hrdesk_core::error::{HrdeskError, Result};

const APP_DIR: &str = "hrdesk";
const CONFIG_FILE: &str = "config.toml";

/// Resolves where panel files live on disk.
///
/// By default files are rooted under the user configuration directory
/// (`~/.config/hrdesk` on Linux). Tests pass an explicit root instead.
#[derive(Debug, Clone, Default)]
pub struct HrdeskPaths {
    root: Option<PathBuf>,
}

impl HrdeskPaths {
    /// Creates a path resolver.
    ///
    /// # Arguments
    ///
    /// * `root` - Overrides the default root directory when given
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Path of the panel configuration file.
    pub fn config_file(&self) -> Result<PathBuf> {
        let base = match &self.root {
            Some(root) => root.clone(),
            None => dirs::config_dir()
                .ok_or_else(|| HrdeskError::config("no user config directory available"))?
                .join(APP_DIR),
        };
        Ok(base.join(CONFIG_FILE))
    }
}
