//! Configuration file support for phint
//!
//! Loads `.phint.toml` from current directory or parent directories.

use anyhow::{Context, Result};
use phint_analyze::exclude::PathFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = ".phint.toml";

/// Configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub trace: TraceConfig,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Glob patterns excluded from scanning and from the trace
    pub exclude: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Xdebug trace file, relative to the working directory
    pub file: Option<PathBuf>,
    /// Storage backend: "memory" or "file"
    pub storage: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Widen conflicting object types to their closest shared ancestor
    pub widen: bool,
    /// Read types from doc comments
    #[serde(rename = "static")]
    pub static_analysis: bool,
    /// Read types from the trace
    pub dynamic: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            widen: false,
            static_analysis: true,
            dynamic: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "text", "json" or "diff"
    pub format: Option<String>,
}

impl Config {
    /// Load config from `.phint.toml` searching from current directory upward
    pub fn load() -> Result<Option<(Config, PathBuf)>> {
        Self::load_from(std::env::current_dir()?)
    }

    /// Load config searching from the given directory upward
    pub fn load_from(start_dir: PathBuf) -> Result<Option<(Config, PathBuf)>> {
        let mut current = Some(start_dir.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                let config = Self::load_path(&config_path)?;
                return Ok(Some((config, config_path)));
            }
            current = dir.parent();
        }

        Ok(None)
    }

    /// Load config from a specific path
    pub fn load_path(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate().with_context(|| format!("Invalid {}", path.display()))?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(storage) = &self.trace.storage {
            if !matches!(storage.as_str(), "memory" | "file") {
                anyhow::bail!("unknown trace storage '{}', expected memory or file", storage);
            }
        }
        for pattern in &self.paths.exclude {
            glob::Pattern::new(pattern.trim_end_matches('/'))
                .with_context(|| format!("bad exclude pattern '{}'", pattern))?;
        }
        Ok(())
    }

    /// Exclude patterns as a filter shared by every scan
    pub fn path_filter(&self) -> PathFilter {
        PathFilter::new(self.paths.exclude.clone())
    }
}
