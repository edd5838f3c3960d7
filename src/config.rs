//! Index configuration.
//!
//! Handles loading, validating, and layering `review-index.toml`. Values are
//! resolved in three layers, each overriding the previous one:
//!
//! ```text
//! stock defaults  →  <root>/review-index.toml  →  command-line flags
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! image_suffixes = ["svg", "png", "jpeg", "jpg", "gif", "webp"]
//! exclude = []              # Keywords; first match claims an excluded file
//! include_hidden = false    # Also index dot-files and dot-directories
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [serving]
//! dev_mode = false          # Re-read content fragments on every request
//! ```
//!
//! The two structural suffixes (`reviewer2_metadata.json` and
//! `reviewer2_content.html`) are always recognized and cannot be configured.
//! Unknown keys are rejected to catch typos early.

use crate::index::{CONTENT_SUFFIX, DEFAULT_IMAGE_SUFFIXES, METADATA_SUFFIX, SuffixTable};
use crate::scan::ScanOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the review root.
pub const CONFIG_FILENAME: &str = "review-index.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Index configuration loaded from `review-index.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// Suffixes classified as images.
    pub image_suffixes: Vec<String>,
    /// Exclusion keywords, in precedence order.
    pub exclude: Vec<String>,
    /// Whether hidden entries are scanned.
    pub include_hidden: bool,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Settings read by the serving layer.
    pub serving: ServingConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            image_suffixes: DEFAULT_IMAGE_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            exclude: Vec::new(),
            include_hidden: false,
            processing: ProcessingConfig::default(),
            serving: ServingConfig::default(),
        }
    }
}

impl IndexConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_suffixes.is_empty() {
            return Err(ConfigError::Validation(
                "image_suffixes must not be empty".into(),
            ));
        }
        if self.image_suffixes.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "image_suffixes must not contain blank entries".into(),
            ));
        }
        if let Some(s) = self
            .image_suffixes
            .iter()
            .find(|s| *s == METADATA_SUFFIX || *s == CONTENT_SUFFIX)
        {
            return Err(ConfigError::Validation(format!(
                "'{s}' is a structural suffix and cannot be an image suffix"
            )));
        }
        if self.exclude.iter().any(|k| k.is_empty()) {
            return Err(ConfigError::Validation(
                "exclude keywords must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn suffix_table(&self) -> SuffixTable {
        SuffixTable::new(&self.image_suffixes)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            include_hidden: self.include_hidden,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers used while resolving paths.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Settings consumed when serving pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServingConfig {
    /// Bypass the content fragment cache.
    pub dev_mode: bool,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(IndexConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `review-index.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge overlays in order onto `base`, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<IndexConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: IndexConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config for `root`: stock defaults, then the root's
/// `review-index.toml`, then `overrides`.
pub fn load_config(
    root: &Path,
    overrides: Option<toml::Value>,
) -> Result<IndexConfig, ConfigError> {
    let file = load_raw_config(root)?;
    resolve_config(stock_defaults_value(), file.into_iter().chain(overrides))
}

/// Returns a fully-commented stock `review-index.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# review-index configuration
# ==========================
# Place this file at the root of the review directory as review-index.toml.
# All options are optional; the values below are the defaults.

# File suffixes indexed as images. Each suffix is matched as the glob
# "**/*<suffix>" against paths relative to the root, so a suffix may contain
# wildcards of its own (e.g. "thumbs/*.png").
# reviewer2_metadata.json and reviewer2_content.html are always recognized.
image_suffixes = ["svg", "png", "jpeg", "jpg", "gif", "webp"]

# Files whose root-relative path contains any of these keywords are skipped.
# When several keywords match, the first one listed is reported.
exclude = []

# Index entries whose name starts with a dot.
include_hidden = false

[processing]
# Maximum parallel workers. Omit to use all CPU cores.
# max_processes = 4

[serving]
# Re-read content fragments on every page view instead of caching them.
dev_mode = false
"##
}
