use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::error;

use logtally_types::{LogConfig, SearchSpec, DEFAULT_METRIC_PREFIX, POINTER_FILENAME};

/// Top-level TOML configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Prefix namespacing every published metric
    #[serde(default = "default_metric_prefix")]
    pub metric_prefix: String,

    /// Trailing context lines captured into each match event
    #[serde(default)]
    pub match_context_lines: usize,

    /// Where pointer state is persisted; defaults next to the config file
    #[serde(default)]
    pub pointer_file: Option<PathBuf>,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub logs: Vec<LogSection>,
}

/// Events sink settings
#[derive(Debug, Default, Deserialize)]
pub struct EventsConfig {
    /// Produce match events at all
    #[serde(default)]
    pub enabled: bool,

    /// File the JSON-lines sink appends to
    #[serde(default)]
    pub output: Option<PathBuf>,
}

/// One `[[logs]]` entry
#[derive(Debug, Deserialize)]
pub struct LogSection {
    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub directory: String,

    #[serde(default)]
    pub filename_pattern: String,

    #[serde(default)]
    pub encoding: Option<String>,

    #[serde(default)]
    pub search: Vec<SearchSection>,
}

/// One `[[logs.search]]` entry
#[derive(Debug, Deserialize)]
pub struct SearchSection {
    pub display_name: String,
    pub pattern: String,

    #[serde(default)]
    pub match_whole_token: bool,

    #[serde(default)]
    pub case_sensitive: bool,

    #[serde(default)]
    pub capture_matches: bool,
}

fn default_metric_prefix() -> String {
    DEFAULT_METRIC_PREFIX.to_string()
}

impl Config {
    /// Read and parse the configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Path the pointer store persists to: the configured override, or the
    /// default filename next to the config file
    pub fn pointer_path(&self, config_path: &Path) -> PathBuf {
        self.pointer_file.clone().unwrap_or_else(|| {
            config_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(POINTER_FILENAME)
        })
    }

    /// Validate each configured log, keeping the valid ones
    ///
    /// An invalid entry is rejected alone with an error log; the rest of
    /// the run continues.
    pub fn valid_logs(&self) -> Vec<LogConfig> {
        let mut logs = Vec::with_capacity(self.logs.len());
        for section in &self.logs {
            match validate_log(section) {
                Ok(log) => logs.push(log),
                Err(reason) => {
                    error!(
                        "invalid log configuration '{}': {reason}",
                        section.display_name
                    );
                }
            }
        }
        logs
    }
}

fn validate_log(section: &LogSection) -> Result<LogConfig, String> {
    if section.directory.trim().is_empty() {
        return Err("log directory must not be blank".to_string());
    }
    if section.filename_pattern.trim().is_empty() {
        return Err("filename pattern must not be blank".to_string());
    }
    if section.search.is_empty() {
        return Err("at least one search pattern is required".to_string());
    }

    // An unknown encoding label drops the conversion step, not the log.
    let encoding = section.encoding.as_ref().and_then(|label| {
        if logtally_engine::encoding::is_supported_label(label) {
            Some(label.clone())
        } else {
            error!(
                "unsupported encoding '{label}' for log '{}', ignoring",
                section.display_name
            );
            None
        }
    });

    Ok(LogConfig {
        display_name: section.display_name.clone(),
        directory: PathBuf::from(&section.directory),
        filename_pattern: section.filename_pattern.clone(),
        encoding,
        search: section
            .search
            .iter()
            .map(|s| SearchSpec {
                display_name: s.display_name.clone(),
                pattern: s.pattern.clone(),
                match_whole_token: s.match_whole_token,
                case_sensitive: s.case_sensitive,
                capture_matches: s.capture_matches,
            })
            .collect(),
    })
}
