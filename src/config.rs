use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "STREAM_TUI";

pub const DEFAULT_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/d-a-s-h-o/stream/master/content.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub checker: CheckerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Unset means the HTTP client's own default applies.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            user_agent: default_user_agent(),
            timeout: None,
        }
    }
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_user_agent() -> String {
    format!("stream-tui/{}", crate::VERSION)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_visible_items")]
    pub visible_items: usize,
    #[serde(default = "default_name_step")]
    pub name_step: usize,
    #[serde(default)]
    pub truncate_urls: bool,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            visible_items: default_visible_items(),
            name_step: default_name_step(),
            truncate_urls: false,
        }
    }
}

fn default_visible_items() -> usize {
    10
}

fn default_name_step() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckerConfig {
    #[serde(default = "default_check_delay", with = "humantime_serde")]
    pub delay: Duration,
    #[serde(default)]
    pub concurrent: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            delay: default_check_delay(),
            concurrent: false,
        }
    }
}

fn default_check_delay() -> Duration {
    Duration::from_millis(10)
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            cfg = read_config_file(path)?;
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            cfg = read_config_file(&default_path)?;
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);
    sanitize(&mut cfg);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "catalog.url" => cfg.catalog.url = value,
        "catalog.user_agent" => cfg.catalog.user_agent = value,
        "catalog.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.catalog.timeout = Some(duration);
            }
        }
        "ui.visible_items" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.ui.visible_items = parsed;
            }
        }
        "ui.name_step" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.ui.name_step = parsed;
            }
        }
        "ui.truncate_urls" => cfg.ui.truncate_urls = env_truthy(&value),
        "checker.delay" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.checker.delay = duration;
            }
        }
        "checker.concurrent" => cfg.checker.concurrent = env_truthy(&value),
        _ => {}
    }
}

fn env_truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "True")
}

fn sanitize(cfg: &mut Config) {
    if cfg.catalog.url.trim().is_empty() {
        cfg.catalog.url = default_catalog_url();
    }
    if cfg.catalog.user_agent.trim().is_empty() {
        cfg.catalog.user_agent = default_user_agent();
    }
    if cfg.ui.name_step == 0 {
        cfg.ui.name_step = default_name_step();
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("stream-tui").join("config.yaml"))
}
