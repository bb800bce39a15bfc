use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use anyhow::{Context, Result};
use chrono::{NaiveDate, Weekday};
use serde::Deserialize;
use toml::Value;
use log::{debug, info, LevelFilter};

use crate::analysis::{AnalysisConfig, DateWindow};
use crate::logging::{LogConfig, LogDestination, LogFormat};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "DEVSTATS_CONFIG";

/// Section holding analysis settings
pub const ANALYSIS_SECTION: &str = "analysis";

/// Section holding logging settings
pub const LOGGING_SECTION: &str = "logging";

/// Configuration storage - section_name -> key -> value
pub type Configuration = HashMap<String, HashMap<String, String>>;

/// Configuration manager
pub struct ConfigManager {
    config: Configuration,
    config_file_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create a new ConfigManager from a Configuration (primarily for testing)
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config,
            config_file_path: None,
        }
    }

    /// Load configuration using discovery hierarchy
    pub fn load() -> Result<Self> {
        debug!("Starting configuration discovery");

        for path in discover_config_files() {
            debug!("Attempting to load config from: {}", path.display());
            if path.exists() {
                info!("Loading configuration from: {}", path.display());
                return Self::load_from_file(path);
            }
        }

        info!("No configuration file found, using empty configuration");
        Ok(Self::from_config(Configuration::new()))
    }

    /// Load configuration from explicit file path
    pub fn load_from_file(path: PathBuf) -> Result<Self> {
        debug!("Loading configuration from file: {}", path.display());

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = parse_toml_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Successfully loaded configuration from: {}", path.display());
        Ok(Self {
            config,
            config_file_path: Some(path),
        })
    }

    /// File the configuration was read from, if any
    pub fn config_file_path(&self) -> Option<&PathBuf> {
        self.config_file_path.as_ref()
    }

    /// Get value from configuration
    pub fn get_value(&self, section: &str, key: &str) -> Option<&String> {
        self.config.get(section).and_then(|s| s.get(key))
    }

    /// Get boolean value with type conversion
    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        match self.get_value(section, key) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(anyhow::anyhow!("Invalid boolean value for {}.{}: {}", section, key, value)),
            },
            None => Ok(None),
        }
    }

    /// Get numeric value with type conversion
    pub fn get_f64(&self, section: &str, key: &str) -> Result<Option<f64>> {
        self.get_value(section, key)
            .map(|value| {
                value.parse::<f64>()
                    .with_context(|| format!("Invalid number for {}.{}: {}", section, key, value))
            })
            .transpose()
    }

    /// Get `YYYY-MM-DD` date value
    pub fn get_date(&self, section: &str, key: &str) -> Result<Option<NaiveDate>> {
        self.get_value(section, key)
            .map(|value| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .with_context(|| format!("Invalid date for {}.{}: {} (expected YYYY-MM-DD)", section, key, value))
            })
            .transpose()
    }

    /// Get a list value, a plain string is a single element list
    pub fn get_list(&self, section: &str, key: &str) -> Result<Option<Vec<String>>> {
        #[derive(Deserialize)]
        struct List {
            items: Vec<String>,
        }

        match self.get_value(section, key) {
            Some(value) if value.trim_start().starts_with('[') => {
                let list: List = toml::from_str(&format!("items = {}", value))
                    .with_context(|| format!("Invalid list for {}.{}: {}", section, key, value))?;
                Ok(Some(list.items))
            }
            Some(value) => Ok(Some(vec![value.clone()])),
            None => Ok(None),
        }
    }

    /// Get weekday list value
    pub fn get_weekdays(&self, section: &str, key: &str) -> Result<Option<Vec<Weekday>>> {
        self.get_list(section, key)?
            .map(|days| {
                days.iter()
                    .map(|day| {
                        day.parse::<Weekday>()
                            .map_err(|_| anyhow::anyhow!("Invalid weekday for {}.{}: {}", section, key, day))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()
    }

    /// Get log level value with type conversion
    pub fn get_log_level(&self, section: &str, key: &str) -> Result<Option<LevelFilter>> {
        match self.get_value(section, key) {
            Some(value) => Ok(Some(crate::logging::parse_log_level(value)?)),
            None => Ok(None),
        }
    }

    /// Get path value with type conversion
    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_value(section, key).map(PathBuf::from)
    }

    /// Build a validated analysis configuration for `repository`
    pub fn analysis_config(&self, repository: impl Into<PathBuf>) -> Result<AnalysisConfig> {
        let section = ANALYSIS_SECTION;

        let start = self.get_date(section, "start")?;
        let end = self.get_date(section, "end")?;
        let entire_history = self.get_bool(section, "entire-history")?.unwrap_or(false);
        let window = match (start, end, entire_history) {
            (Some(start), Some(end), false) => DateWindow::Explicit { start, end },
            (None, None, true) => DateWindow::EntireHistory,
            (_, _, true) => anyhow::bail!("entire-history cannot be combined with start or end"),
            _ => anyhow::bail!("Either both start and end, or entire-history, must be configured"),
        };

        let mut config = AnalysisConfig::new(repository, window);

        if let Some(branch) = self.get_value(section, "branch") {
            config = config.with_branch(branch.clone());
        }
        if let Some(trunk) = self.get_value(section, "trunk") {
            config = config.with_trunk(trunk.clone());
        }
        if let Some(patterns) = self.get_list(section, "ignore")? {
            config = config.with_ignore_patterns(patterns);
        }
        if let Some(marker) = self.get_value(section, "comment-marker") {
            config.comment_marker = marker.clone();
        }
        config.ignore_comments = self.get_bool(section, "ignore-comments")?.unwrap_or(false);
        if let Some(aliases) = self.get_path(section, "aliases") {
            config = config.with_aliases(aliases);
        }
        if let Some(weekends) = self.get_weekdays(section, "weekends")? {
            config = config.with_weekends(weekends);
        }

        let hours = self.get_f64(section, "hours-per-week")?.unwrap_or(config.hours_per_week);
        let days = self.get_f64(section, "days-per-week")?.unwrap_or(config.days_per_week);
        config = config.with_work_week(hours, days);
        config.team_weekends = self.get_bool(section, "team-weekends")?.unwrap_or(false);

        config.validate()
            .with_context(|| "Analysis configuration validation failed")?;

        Ok(config)
    }

    /// Build the logging configuration
    pub fn log_config(&self) -> Result<LogConfig> {
        let section = LOGGING_SECTION;
        let mut config = LogConfig::default();

        if let Some(level) = self.get_log_level(section, "console-level")? {
            config.console_level = level;
        }
        if let Some(format) = self.get_value(section, "format") {
            config.format = format.parse::<LogFormat>().map_err(anyhow::Error::msg)?;
        }
        if let Some(file) = self.get_path(section, "file") {
            config.file_level = Some(self.get_log_level(section, "file-level")?.unwrap_or(config.console_level));
            config.destination = LogDestination::Both(file);
        }

        Ok(config)
    }
}

/// Discover configuration files in order of precedence
fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Environment variable $DEVSTATS_CONFIG
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        paths.push(PathBuf::from(env_path));
    }

    // 2. XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("devstats").join("config.toml"));
    }

    // 3. Home directory
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".devstats.toml"));
    }

    // 4. Project local
    paths.push(PathBuf::from("./.devstats.toml"));

    debug!("Config discovery paths: {:?}", paths);
    paths
}

/// Parse TOML content to string-based configuration
fn parse_toml_config(content: &str) -> Result<Configuration> {
    let toml_value: Value = content.parse()
        .context("Failed to parse TOML content")?;

    let mut config = Configuration::new();

    if let Value::Table(table) = toml_value {
        flatten_toml_table(&table, String::new(), &mut config);
    }

    debug!("Parsed configuration: {:?}", config);
    Ok(config)
}

/// Recursively flatten TOML tables into section.subsection format
fn flatten_toml_table(table: &toml::Table, prefix: String, config: &mut Configuration) {
    for (key, value) in table {
        let section_name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Table(subtable) => {
                if subtable.values().all(|v| !matches!(v, Value::Table(_))) {
                    // leaf table
                    let section_map = subtable.iter()
                        .map(|(subkey, subvalue)| (subkey.clone(), toml_value_to_string(subvalue)))
                        .collect();
                    config.insert(section_name, section_map);
                } else {
                    flatten_toml_table(subtable, section_name, config);
                }
            }
            _ => {
                let mut section_map = HashMap::new();
                section_map.insert("value".to_string(), toml_value_to_string(value));
                config.insert(section_name, section_map);
            }
        }
    }
}

/// Convert TOML Value to string representation
fn toml_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Datetime(d) => d.to_string(),
        Value::Array(_) | Value::Table(_) => value.to_string(),
    }
}
