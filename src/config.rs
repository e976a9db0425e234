use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bumpers::BumperSettings;
use crate::catalog::RatingAssignment;
use crate::shuffle::ShuffleSettings;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub criteria: CriteriaConfig,
    #[serde(default)]
    pub shuffle: ShuffleSettings,
    #[serde(default)]
    pub bumpers: BumperSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// JSON catalog file; empty means the built-in catalog.
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CriteriaConfig {
    /// Importance per criterion id or name, 1 through 5.
    #[serde(default)]
    pub ratings: BTreeMap<String, u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub catalog_path: Option<PathBuf>,
    pub ratings: Vec<RatingAssignment>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/ppm-tool-finder/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(path) = overrides.catalog_path {
            self.catalog.path = path.display().to_string();
        }
        for assignment in overrides.ratings {
            self.criteria
                .ratings
                .insert(assignment.criterion, assignment.rating);
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_catalog_path(&self) -> Option<PathBuf> {
        let raw = self.catalog.path.trim();
        (!raw.is_empty()).then(|| expand_tilde(raw))
    }

    pub fn resolved_state_path(&self) -> PathBuf {
        expand_tilde(&self.storage.state_path)
    }

    /// Configured ratings in a stable order, ready for `Catalog::criteria_with`.
    pub fn rating_assignments(&self) -> Vec<RatingAssignment> {
        self.criteria
            .ratings
            .iter()
            .map(|(criterion, rating)| RatingAssignment {
                criterion: criterion.clone(),
                rating: *rating,
            })
            .collect()
    }

    pub fn default_template() -> String {
        let template = r#"[catalog]
# path = "~/.config/ppm-tool-finder/catalog.json"
path = ""

[criteria.ratings]
# scalability = 4
# ease_of_use = 5

[shuffle]
delay_ms = 500
duration_ms = 1200
compact_duration_ms = 800
disabled = false

[bumpers]
bumper_delay_ms = 20000
guided_ranking_delay_ms = 10000
exit_intent_timer_ms = 120000
exit_intent_min_presence_ms = 30000
exit_intent_max_per_session = 1
product_bumper_initial_delay_ms = 10000
manual_guidance_delay_ms = 3000
guided_ranking_stale_after_ms = 1800000

[storage]
state_path = "~/.local/share/ppm-tool-finder/state.json"

[server]
host = "127.0.0.1"
port = 3001

[logging]
level = "info"
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_state_path() -> String {
    "~/.local/share/ppm-tool-finder/state.json".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_log_level() -> String {
    "info".to_string()
}
