//! Configuration for actioneval.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags (applied by the CLI)
//! 2. Environment variables (ACTIONEVAL_GROUND_TRUTH, ACTIONEVAL_OUTPUT_DIR,
//!    ACTIONEVAL_TOLERANCE)
//! 3. Config file (.actioneval/config.yaml)
//! 4. Defaults
//!
//! Config file discovery:
//! - Searches the current directory and its parents for .actioneval/config.yaml
//! - Falls back to <config_dir>/actioneval/config.yaml
//! - Relative paths are resolved against the directory holding .actioneval/
//!
//! The resolved configuration is returned as a value; nothing is cached.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::{AlignmentContext, DEFAULT_TOLERANCE_SECONDS};
use crate::extract::{ExtractOptions, DEFAULT_ACCEPTANCE_WINDOW, DEFAULT_FOLLOW_UP_WINDOW};

pub mod limits;

pub use limits::{InputError, InputLimits};

/// Directory holding the project config file
pub const CONFIG_DIR_NAME: &str = ".actioneval";
/// Config file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.yaml";

pub const ENV_GROUND_TRUTH: &str = "ACTIONEVAL_GROUND_TRUTH";
pub const ENV_OUTPUT_DIR: &str = "ACTIONEVAL_OUTPUT_DIR";
pub const ENV_TOLERANCE: &str = "ACTIONEVAL_TOLERANCE";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub limits: InputLimits,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlignmentConfig {
    pub tolerance_seconds: Option<f64>,
    pub stretch: Option<bool>,
    pub accepted_only: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionConfig {
    pub acceptance_window: Option<usize>,
    pub follow_up_window: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Ground-truth CSV (relative to the project root)
    pub ground_truth: Option<String>,
    /// Where timeline exports and reports go (relative to the project root)
    pub output_dir: Option<String>,
}

/// Alignment defaults after resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignmentSettings {
    pub tolerance_seconds: f64,
    pub stretch: bool,
    pub accepted_only: bool,
}

impl Default for AlignmentSettings {
    fn default() -> Self {
        Self {
            tolerance_seconds: DEFAULT_TOLERANCE_SECONDS,
            stretch: true,
            accepted_only: false,
        }
    }
}

/// Extraction windows after resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExtractionSettings {
    pub acceptance_window: usize,
    pub follow_up_window: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            acceptance_window: DEFAULT_ACCEPTANCE_WINDOW,
            follow_up_window: DEFAULT_FOLLOW_UP_WINDOW,
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub alignment: AlignmentSettings,
    pub extraction: ExtractionSettings,
    /// Ground-truth CSV, if configured
    pub ground_truth: Option<PathBuf>,
    /// Output directory for exports, if configured
    pub output_dir: Option<PathBuf>,
    pub limits: InputLimits,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Alignment context seeded from these settings
    pub fn alignment_context(&self) -> AlignmentContext {
        AlignmentContext {
            tolerance_seconds: self.alignment.tolerance_seconds,
            stretch_enabled: self.alignment.stretch,
            accepted_only: self.alignment.accepted_only,
            ..AlignmentContext::default()
        }
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            acceptance_window: self.extraction.acceptance_window,
            follow_up_window: self.extraction.follow_up_window,
        }
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let fallback = dirs::config_dir()?.join("actioneval").join(CONFIG_FILE_NAME);
    fallback.exists().then_some(fallback)
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Directory that relative config paths are resolved against
fn base_dir(config_path: &Path) -> PathBuf {
    let parent = config_path.parent().unwrap_or(Path::new("."));
    if parent.file_name().is_some_and(|n| n == CONFIG_DIR_NAME) {
        // Project root is the parent of .actioneval/
        parent.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        parent.to_path_buf()
    }
}

/// Resolve configuration starting discovery at `start`, reading environment
/// variables through `env`.
pub fn resolve_config<F>(start: &Path, env: F) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let config_file = find_config_file(start);
    let (file, base) = match &config_file {
        Some(path) => (load_config_file(path)?, base_dir(path)),
        None => (ConfigFile::default(), start.to_path_buf()),
    };

    let defaults = AlignmentSettings::default();
    let mut alignment = AlignmentSettings {
        tolerance_seconds: file
            .alignment
            .tolerance_seconds
            .unwrap_or(defaults.tolerance_seconds),
        stretch: file.alignment.stretch.unwrap_or(defaults.stretch),
        accepted_only: file.alignment.accepted_only.unwrap_or(defaults.accepted_only),
    };
    if let Some(raw) = env(ENV_TOLERANCE) {
        alignment.tolerance_seconds = raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {}", ENV_TOLERANCE, raw))?;
    }

    let extraction_defaults = ExtractionSettings::default();
    let extraction = ExtractionSettings {
        acceptance_window: file
            .extraction
            .acceptance_window
            .unwrap_or(extraction_defaults.acceptance_window),
        follow_up_window: file
            .extraction
            .follow_up_window
            .unwrap_or(extraction_defaults.follow_up_window),
    };

    let ground_truth = env(ENV_GROUND_TRUTH)
        .map(PathBuf::from)
        .or_else(|| file.paths.ground_truth.as_deref().map(|p| resolve_path(&base, p)));

    let output_dir = env(ENV_OUTPUT_DIR)
        .map(PathBuf::from)
        .or_else(|| file.paths.output_dir.as_deref().map(|p| resolve_path(&base, p)));

    if let Some(path) = &config_file {
        tracing::debug!(path = %path.display(), "Loaded config file");
    }

    Ok(ResolvedConfig {
        alignment,
        extraction,
        ground_truth,
        output_dir,
        limits: file.limits,
        config_file,
    })
}

/// Load configuration from all sources, discovering from the current directory
pub fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    resolve_config(&cwd, |key| std::env::var(key).ok())
}
