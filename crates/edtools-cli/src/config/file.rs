use crate::error::{CliError, Result};
use directories::ProjectDirs;
use edtools::core::models::cell::AngleTransform;
use edtools::engine::config::{CellMetric, LinkageMethod};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileClusteringConfig {
    pub method: Option<LinkageMethod>,
    pub distance: Option<f64>,
    pub min_size: Option<usize>,
    pub metric: Option<CellMetric>,
    pub angle_transform: Option<AngleTransform>,
    pub use_raw_cell: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileScalingConfig {
    /// `[dmax, dmin]`
    pub resolution: Option<[f64; 2]>,
    pub snrc: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileGatherConfig {
    pub min_completeness: Option<f64>,
    pub min_cc_half: Option<f64>,
}

/// Contents of the optional TOML configuration file. Every key is optional.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub threads: Option<usize>,
    pub clustering: Option<FileClusteringConfig>,
    pub scaling: Option<FileScalingConfig>,
    pub gather: Option<FileGatherConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::parsing(path, e))
    }

    /// Reads the explicit file, or the user configuration file when it
    /// exists; falls back to an empty configuration otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// `config.toml` in the per-user configuration directory.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("se", "su", "edtools").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
