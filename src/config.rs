//! Configuration management for the upgrade planner
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (kup.toml)
//! - Environment variables (KUP__*)
//!
//! ## Example config file (kup.toml):
//! ```toml
//! [source]
//! repo_root = "https://github.com/canonical/bundle-kubeflow"
//! docs_path = "tree/main/docs"
//!
//! [bundle]
//! anchor = "kubeflow-dashboard"
//!
//! [resolver]
//! juju_path = "/snap/bin/juju"
//!
//! [output]
//! format = "table"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Main configuration for the upgrade planner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Where published bundles live
    #[serde(default)]
    pub source: SourceConfig,

    /// Bundle settings
    #[serde(default)]
    pub bundle: BundleConfig,

    /// Revision resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Upstream bundle repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root URL of the bundle repository
    #[serde(default = "default_repo_root")]
    pub repo_root: String,

    /// Path of the upgrade docs, relative to `repo_root`
    #[serde(default = "default_docs_path")]
    pub docs_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Application whose channel stands for the whole deployment
    #[serde(default = "default_anchor")]
    pub anchor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Path to the juju binary used to query charmhub
    #[serde(default = "default_juju_path")]
    pub juju_path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for rendered bundles and comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Yaml,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "yaml" => Ok(OutputFormat::Yaml),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Table => "table",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        };
        f.write_str(name)
    }
}

// Default value functions
fn default_repo_root() -> String {
    "https://github.com/canonical/bundle-kubeflow".to_string()
}

fn default_docs_path() -> String {
    "tree/main/docs".to_string()
}

fn default_anchor() -> String {
    "kubeflow-dashboard".to_string()
}

fn default_juju_path() -> PathBuf {
    PathBuf::from("/snap/bin/juju")
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repo_root: default_repo_root(),
            docs_path: default_docs_path(),
        }
    }
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            anchor: default_anchor(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            juju_path: default_juju_path(),
        }
    }
}

impl PlannerConfig {
    /// Load configuration from the default locations, with an optional
    /// explicit file on top
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["kup.toml", ".kup.toml", "config/kup.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("io", "kubeflow", "kup") {
            let xdg_config = config_dir.config_dir().join("kup.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // KUP__BUNDLE__ANCHOR=... and friends
        builder = builder.add_source(
            Environment::with_prefix("KUP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Link to the upstream upgrade docs
    pub fn upgrade_docs_url(&self) -> String {
        format!(
            "{}/{}",
            self.source.repo_root.trim_end_matches('/'),
            self.source.docs_path.trim_start_matches('/')
        )
    }
}
