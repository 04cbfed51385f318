// src/config.rs

//! Converter configuration (`config.toml`)
//!
//! Every section is optional. A missing default config file yields the
//! built-in defaults; an explicitly named file must exist.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::codec::{CodecOptions, CrxVersion, DEFAULT_MAX_UNPACKED_SIZE};
use crate::manifest::TranslatorOptions;
use crate::package::DEFAULT_SIZE_LIMIT;

/// Application directory name under the platform config/data dirs
pub const APP_DIR: &str = "extconv";

/// Config file name
pub const CONFIG_FILE: &str = "config.toml";

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    pub limits: LimitsConfig,
    pub validation: ValidationConfig,
    pub chrome: ChromeConfig,
    pub firefox: FirefoxConfig,
    pub history: HistoryConfig,
}

/// Size limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest accepted input package in bytes
    pub max_package_size: u64,
    /// Largest total decompressed archive size in bytes
    pub max_unpacked_size: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_package_size: DEFAULT_SIZE_LIMIT,
            max_unpacked_size: DEFAULT_MAX_UNPACKED_SIZE,
        }
    }
}

/// Input validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Confirm the declared suffix against the file's magic bytes
    pub verify_content: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            verify_content: true,
        }
    }
}

/// Chrome output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChromeConfig {
    /// CRX header version for written packages (2 or 3)
    pub crx_version: u32,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self { crx_version: 3 }
    }
}

/// Firefox output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FirefoxConfig {
    /// Target Firefox accepts Manifest V3
    pub manifest_v3: bool,
    /// Written as `browser_specific_settings.gecko.strict_min_version`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_min_version: Option<String>,
}

impl Default for FirefoxConfig {
    fn default() -> Self {
        Self {
            manifest_v3: true,
            strict_min_version: None,
        }
    }
}

/// History retention
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    /// Keep at most this many entries in the history file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
}

impl ConverterConfig {
    /// Load from `path`, or from the default location if `None`
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml(&content)
    }

    /// Parse config from a TOML string
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if self.limits.max_package_size == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_package_size must be greater than zero".to_string(),
            ));
        }
        if self.limits.max_unpacked_size == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_unpacked_size must be greater than zero".to_string(),
            ));
        }
        CrxVersion::try_from(self.chrome.crx_version)
            .map_err(|e| ConfigError::Invalid(format!("chrome.crx_version: {}", e)))?;
        if self.history.max_entries == Some(0) {
            return Err(ConfigError::Invalid(
                "history.max_entries must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// CRX version for written packages (falls back to CRX3 if unvalidated)
    pub fn crx_version(&self) -> CrxVersion {
        CrxVersion::try_from(self.chrome.crx_version).unwrap_or(CrxVersion::V3)
    }

    pub fn codec_options(&self) -> CodecOptions {
        CodecOptions {
            max_unpacked_size: self.limits.max_unpacked_size,
            crx_version: self.crx_version(),
        }
    }

    pub fn translator_options(&self) -> TranslatorOptions {
        TranslatorOptions {
            firefox_manifest_v3: self.firefox.manifest_v3,
            strict_min_version: self.firefox.strict_min_version.clone(),
        }
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// `<config_dir>/extconv/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}
