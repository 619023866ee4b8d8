//! Link hierarchy settings.
//!
//! Resolution order per key: merged YAML (`<root>/.config/suyuan.yaml`, then
//! the `--conf` override file deep-merged on top), then the `SUYUAN_*`
//! environment variable, then the built-in default. Keys live under
//! `link_hierarchy.*`.

use crate::cache::LinkCacheOptions;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// System config file, relative to the vault root.
pub const SYSTEM_CONFIG_RELATIVE_PATH: &str = ".config/suyuan.yaml";

pub(crate) const CACHE_TIMEOUT_MS_ENV: &str = "SUYUAN_CACHE_TIMEOUT_MS";
pub(crate) const CACHE_CLEANUP_INTERVAL_MINUTES_ENV: &str = "SUYUAN_CACHE_CLEANUP_INTERVAL_MINUTES";
pub(crate) const MAX_CACHE_SIZE_ENV: &str = "SUYUAN_MAX_CACHE_SIZE";
pub(crate) const MAX_DEPTH_ENV: &str = "SUYUAN_MAX_DEPTH";
pub(crate) const SEARCH_CANVAS_LINKS_ENV: &str = "SUYUAN_SEARCH_CANVAS_LINKS";
pub(crate) const SHOW_CACHE_CLEANUP_NOTICE_ENV: &str = "SUYUAN_SHOW_CACHE_CLEANUP_NOTICE";

const DEFAULT_CACHE_TIMEOUT_MS: u64 = 300_000;
const DEFAULT_CACHE_CLEANUP_INTERVAL_MINUTES: u64 = 10;
const DEFAULT_MAX_CACHE_SIZE: usize = 1000;
const DEFAULT_MAX_DEPTH: usize = 5;

/// Errors while loading config files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Explicit override file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A config file is not valid YAML.
    #[error("invalid YAML in {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: serde_yaml::Error,
    },
}

/// Recognized link hierarchy options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkHierarchyConfig {
    /// Staleness threshold for cache entries, in milliseconds.
    pub cache_timeout_ms: u64,
    /// Background sweep period, in minutes.
    pub cache_cleanup_interval_minutes: u64,
    /// Entry count bound.
    pub max_cache_size: usize,
    /// Traversal depth bound; adjustable at runtime on the engine.
    pub max_depth: usize,
    /// Scan canvas boards for `[[Name]]` references.
    pub search_canvas_links_enabled: bool,
    /// Publish cleanup notices.
    pub show_cache_cleanup_notice: bool,
}

impl Default for LinkHierarchyConfig {
    fn default() -> Self {
        Self {
            cache_timeout_ms: DEFAULT_CACHE_TIMEOUT_MS,
            cache_cleanup_interval_minutes: DEFAULT_CACHE_CLEANUP_INTERVAL_MINUTES,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            search_canvas_links_enabled: true,
            show_cache_cleanup_notice: false,
        }
    }
}

impl LinkHierarchyConfig {
    /// Cache staleness threshold.
    #[must_use]
    pub const fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    /// Background sweep period.
    #[must_use]
    pub const fn cache_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cache_cleanup_interval_minutes.saturating_mul(60))
    }

    /// Cache options derived from this config.
    #[must_use]
    pub const fn cache_options(&self) -> LinkCacheOptions {
        LinkCacheOptions {
            cache_timeout: self.cache_timeout(),
            max_cache_size: self.max_cache_size,
        }
    }

    /// Clamp values into usable ranges: timeout, size and interval at least 1.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.cache_timeout_ms = self.cache_timeout_ms.max(1);
        self.cache_cleanup_interval_minutes = self.cache_cleanup_interval_minutes.max(1);
        self.max_cache_size = self.max_cache_size.max(1);
        self
    }
}

fn parse_positive_u64(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|value| *value > 0)
}

fn parse_positive_usize(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|value| *value > 0)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn first_non_empty(values: &[Option<String>]) -> Option<String> {
    values.iter().flatten().find_map(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn read_yaml_file(path: &Path) -> Result<Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str::<Value>(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                if let Some(existing) = base_map.get_mut(&key) {
                    deep_merge(existing, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (_, Value::Null) => {}
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

fn merged_settings(root: &Path, override_file: Option<&Path>) -> Result<Value, ConfigError> {
    let mut merged = Value::Mapping(Mapping::new());
    let system_path = root.join(SYSTEM_CONFIG_RELATIVE_PATH);
    if system_path.is_file() {
        deep_merge(&mut merged, read_yaml_file(&system_path)?);
    }
    if let Some(user_path) = override_file {
        deep_merge(&mut merged, read_yaml_file(user_path)?);
    }
    Ok(merged)
}

fn setting_value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(value) => Some(value.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn get_setting_value<'a>(settings: &'a Value, dotted_key: &str) -> Option<&'a Value> {
    let mut cursor = settings;
    for segment in dotted_key.split('.') {
        match cursor {
            Value::Mapping(map) => {
                let key = Value::String(segment.to_string());
                cursor = map.get(&key)?;
            }
            _ => return None,
        }
    }
    Some(cursor)
}

fn get_setting_string(settings: &Value, dotted_key: &str) -> Option<String> {
    get_setting_value(settings, dotted_key).and_then(setting_value_to_string)
}

fn settings_to_config<F>(settings: &Value, env: &F) -> LinkHierarchyConfig
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |dotted_key: &str, env_key: &str| {
        first_non_empty(&[get_setting_string(settings, dotted_key), env(env_key)])
    };
    let defaults = LinkHierarchyConfig::default();
    LinkHierarchyConfig {
        cache_timeout_ms: lookup("link_hierarchy.cache.timeout_ms", CACHE_TIMEOUT_MS_ENV)
            .as_deref()
            .and_then(parse_positive_u64)
            .unwrap_or(defaults.cache_timeout_ms),
        cache_cleanup_interval_minutes: lookup(
            "link_hierarchy.cache.cleanup_interval_minutes",
            CACHE_CLEANUP_INTERVAL_MINUTES_ENV,
        )
        .as_deref()
        .and_then(parse_positive_u64)
        .unwrap_or(defaults.cache_cleanup_interval_minutes),
        max_cache_size: lookup("link_hierarchy.cache.max_size", MAX_CACHE_SIZE_ENV)
            .as_deref()
            .and_then(parse_positive_usize)
            .unwrap_or(defaults.max_cache_size),
        max_depth: lookup("link_hierarchy.traversal.max_depth", MAX_DEPTH_ENV)
            .as_deref()
            .and_then(parse_positive_usize)
            .unwrap_or(defaults.max_depth),
        search_canvas_links_enabled: lookup(
            "link_hierarchy.canvas.search_links",
            SEARCH_CANVAS_LINKS_ENV,
        )
        .as_deref()
        .and_then(parse_bool)
        .unwrap_or(defaults.search_canvas_links_enabled),
        show_cache_cleanup_notice: lookup(
            "link_hierarchy.cache.show_cleanup_notice",
            SHOW_CACHE_CLEANUP_NOTICE_ENV,
        )
        .as_deref()
        .and_then(parse_bool)
        .unwrap_or(defaults.show_cache_cleanup_notice),
    }
    .normalized()
}

/// Resolve config for a vault rooted at `root` using the process environment.
///
/// # Errors
///
/// Returns [`ConfigError`] when the override file is missing or either file
/// is not valid YAML.
pub fn resolve_link_hierarchy_config(
    root: &Path,
    override_file: Option<&Path>,
) -> Result<LinkHierarchyConfig, ConfigError> {
    resolve_link_hierarchy_config_with_env(root, override_file, |key| std::env::var(key).ok())
}

/// Same as [`resolve_link_hierarchy_config`] with an explicit environment.
///
/// # Errors
///
/// Returns [`ConfigError`] when the override file is missing or either file
/// is not valid YAML.
pub fn resolve_link_hierarchy_config_with_env<F>(
    root: &Path,
    override_file: Option<&Path>,
    env: F,
) -> Result<LinkHierarchyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let settings = merged_settings(root, override_file)?;
    Ok(settings_to_config(&settings, &env))
}
