//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads the panel configuration
//! from the configuration file (~/.config/hrdesk/config.toml).

use std::sync::{Arc, RwLock};

use tracing::warn;

use hrdesk_core::config::PanelConfig;
use hrdesk_core::error::Result;

use crate::paths::HrdeskPaths;

/// Configuration service that loads and caches the panel configuration.
///
/// This implementation reads the configuration from config.toml and caches
/// it to avoid repeated file I/O operations. A missing file is created with
/// defaults; an unreadable file falls back to defaults with a warning so the
/// panel never fails to start over configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    /// Cached configuration loaded from file.
    /// Uses RwLock for thread-safe lazy loading.
    config: Arc<RwLock<Option<PanelConfig>>>,
    paths: HrdeskPaths,
}

impl ConfigService {
    /// Creates a new ConfigService rooted at the default config directory.
    ///
    /// The configuration is loaded lazily on first access to avoid blocking
    /// during initialization.
    pub fn new() -> Self {
        Self::with_paths(HrdeskPaths::new(None))
    }

    /// Creates a ConfigService with an explicit path resolver (tests).
    pub fn with_paths(paths: HrdeskPaths) -> Self {
        Self {
            config: Arc::new(RwLock::new(None)),
            paths,
        }
    }

    /// Gets the panel configuration, loading from file if not cached.
    pub fn get_config(&self) -> PanelConfig {
        // Check if already cached
        {
            let read_lock = self.config.read().unwrap();
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = self.load_config().unwrap_or_else(|err| {
            warn!("[ConfigService] falling back to defaults: {err}");
            PanelConfig::default()
        });

        // Cache it
        {
            let mut write_lock = self.config.write().unwrap();
            *write_lock = Some(loaded.clone());
        }

        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap();
        *write_lock = None;
    }

    /// Loads the configuration file, creating it with defaults if missing.
    fn load_config(&self) -> Result<PanelConfig> {
        let path = self.paths.config_file()?;

        if !path.exists() {
            let default_config = PanelConfig::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, toml::to_string_pretty(&default_config)?)?;
            return Ok(default_config);
        }

        let raw = std::fs::read_to_string(&path)?;
        Ok(toml::from_str(&raw)?)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
