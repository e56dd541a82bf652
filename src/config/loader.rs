//! Configuration File Loading
//!
//! Finds and parses the configuration file. Lookup order:
//!
//! 1. An explicit path (the CLI `--config` flag)
//! 2. `$MAILSHIFT_CONFIG`
//! 3. `<config dir>/mailshift/config.toml`, `./mailshift.toml`, `./config.json`
//!
//! The format is chosen from the file extension. When no file is found the
//! defaults are used.

use super::Config;
use crate::error::{Error, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a configuration file
pub const CONFIG_ENV_VAR: &str = "MAILSHIFT_CONFIG";

/// Configuration file loader
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Candidate files, in priority order
    search_paths: Vec<PathBuf>,
    /// File the configuration was loaded from
    current_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Format implied by a file extension; anything else is read as TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Fall back to defaults when no file exists
    pub use_defaults: bool,
    /// Validate the configuration after loading
    pub validate: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            use_defaults: true,
            validate: true,
        }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            search_paths: Self::default_search_paths(),
            current_path: None,
        }
    }

    /// Load configuration from the default locations
    pub fn load() -> Result<Config> {
        Self::new().load_with_options(None, LoadOptions::default())
    }

    /// Load configuration, preferring an explicit path
    pub fn load_from(path: Option<&Path>) -> Result<Config> {
        Self::new().load_with_options(path, LoadOptions::default())
    }

    /// Load configuration with custom options.
    ///
    /// An explicit path or `$MAILSHIFT_CONFIG` must exist; search paths are
    /// optional.
    pub fn load_with_options(&mut self, explicit: Option<&Path>, options: LoadOptions) -> Result<Config> {
        let required = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
            .filter(|p| !p.as_os_str().is_empty());

        let found = match required {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::ConfigLoadFailed {
                        path,
                        reason: "file does not exist".to_string(),
                    });
                }
                Some(path)
            }
            None => self.search_paths.iter().find(|p| p.is_file()).cloned(),
        };

        let config = match found {
            Some(path) => {
                let config = Self::load_config_file(&path)?;
                info!("Loaded configuration from {}", path.display());
                self.current_path = Some(path);
                config
            }
            None if options.use_defaults => {
                debug!("No configuration file found, using defaults");
                Config::default()
            }
            None => return Err(Error::ConfigNotFound),
        };

        if options.validate {
            config.validate()?;
        }
        Ok(config)
    }

    /// Load a specific configuration file
    pub fn load_config_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let format = ConfigFormat::from_path(path);
        let parsed: std::result::Result<Config, String> = match format {
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| Error::ConfigParseFailed {
            format: format.name().to_string(),
            reason,
        })
    }

    /// Default candidate files
    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("mailshift").join("config.toml"));
        }

        paths.push(PathBuf::from("mailshift.toml"));
        paths.push(PathBuf::from("config.json"));
        paths
    }

    /// File the configuration was loaded from, if any
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Clear all search paths and add a single path
    pub fn set_search_path(&mut self, path: PathBuf) {
        self.search_paths = vec![path];
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
