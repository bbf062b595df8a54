//! Navigator configuration stored in `navigator.toml`.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::geometry::Point;
use crate::core::movement::MovementConfig;
use crate::core::registry::{Location, LocationRegistry, default_locations};
use crate::core::rules::{KeywordRule, RuleTable, default_rules};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "navigator.toml";

/// Navigator configuration (TOML).
///
/// Built once per session and never mutated afterwards. Missing fields default
/// to the six-room house layout with the model endpoint disabled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NavConfig {
    /// Where the agent starts before the first location.
    pub initial_position: Point,

    pub llm: LlmConfig,

    pub movement: MovementConfig,

    pub planner: PlannerConfig,

    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions URL. Unset means plan offline.
    pub api_url: Option<String>,

    pub model: String,

    /// Environment variable holding the bearer token.
    pub api_key_env: String,

    /// Upper bound on the single planning request.
    pub timeout_secs: u64,

    /// Output token budget for the planning request.
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            model: "openai/gpt-oss-20b".to_string(),
            api_key_env: "LLM_API_KEY".to_string(),
            timeout_secs: 30,
            max_tokens: 256,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Bearer token from the configured environment variable, if set.
    pub fn api_key(&self) -> Option<String> {
        env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlannerConfig {
    /// Fallback target for tasks no rule matches.
    pub default_location: String,

    /// Keyword rules, evaluated in order.
    pub rules: Vec<KeywordRule>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_location: "LivingRoom".to_string(),
            rules: default_rules(),
        }
    }
}

impl PlannerConfig {
    pub fn rule_table(&self) -> RuleTable {
        RuleTable::new(self.rules.clone(), self.default_location.clone())
    }
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            initial_position: Point::ORIGIN,
            llm: LlmConfig::default(),
            movement: MovementConfig::default(),
            planner: PlannerConfig::default(),
            locations: default_locations(),
        }
    }
}

impl NavConfig {
    pub fn validate(&self) -> Result<()> {
        self.movement.validate()?;
        if !self.initial_position.is_finite() {
            return Err(anyhow!("initial_position must be finite"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(anyhow!("llm.timeout_secs must be > 0"));
        }
        if self.llm.max_tokens == 0 {
            return Err(anyhow!("llm.max_tokens must be > 0"));
        }
        if let Some(url) = &self.llm.api_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow!("llm.api_url must be an http(s) URL, got {url}"));
            }
        }
        if self.llm.model.trim().is_empty() {
            return Err(anyhow!("llm.model must be non-empty"));
        }
        if self.planner.rules.iter().any(|rule| rule.keywords.is_empty()) {
            return Err(anyhow!("planner.rules entries need at least one keyword"));
        }
        let registry = self.registry()?;
        if !registry.contains(&self.planner.default_location) {
            return Err(anyhow!(
                "planner.default_location {} is not a configured location",
                self.planner.default_location
            ));
        }
        Ok(())
    }

    /// Build the location registry described by `[[locations]]`.
    pub fn registry(&self) -> Result<LocationRegistry> {
        if self.locations.is_empty() {
            return Err(anyhow!("at least one location must be configured"));
        }
        LocationRegistry::new(self.locations.clone()).context("invalid [[locations]]")
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `NavConfig::default()`.
pub fn load_config(path: &Path) -> Result<NavConfig> {
    if !path.exists() {
        let cfg = NavConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: NavConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &NavConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
