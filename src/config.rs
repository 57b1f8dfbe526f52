use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{ContextEngineError, Result};

/// Directory holding all curated context documents.
pub const CONTEXT_DIR: &str = "context";

/// Configuration file path relative to the project root.
pub const CONFIG_PATH: &str = "context/config/context.config.json";

/// Active packet directory relative to the project root.
pub const PACKETS_ACTIVE_DIR: &str = "context/packets/active";

/// Completed packet directory relative to the project root.
pub const PACKETS_COMPLETED_DIR: &str = "context/packets/completed";

/// Decision record directory relative to the project root.
pub const ADRS_DIR: &str = "context/adrs";

/// Journal directory relative to the project root.
pub const JOURNAL_DIR: &str = "context/journal";

/// Saved keyword index relative to the project root.
pub const INDEX_PATH: &str = "context/.index/index.json";

/// Hand-maintained repository overview relative to the project root.
pub const REPO_MAP_PATH: &str = "context/repo-map/REPO_MAP.md";

/// Per-checkout state that is not committed.
pub const LOCAL_STATE_DIR: &str = ".context-engine";

/// The packet last switched to, relative to the project root.
pub const CURRENT_CONTEXT_PATH: &str = ".context-engine/current-context.json";

/// Boosts added on top of keyword overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceBoosts {
    pub symbol_match: f64,
    pub path_overlap: f64,
    pub explicit_link: f64,
}

/// Linear decay applied to journal entries by age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecencyConfig {
    pub journal_max: f64,
    pub decay_per_day: f64,
}

/// Tuning for candidate scoring and ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceConfig {
    /// Journal entries older than this many days are not gathered.
    pub journal_window_days: u32,
    pub max_candidates: usize,
    pub boosts: RelevanceBoosts,
    pub recency: RecencyConfig,
    /// Candidates scoring below this are discarded.
    pub min_score: f64,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            journal_window_days: 30,
            max_candidates: 200,
            boosts: RelevanceBoosts {
                symbol_match: 0.3,
                path_overlap: 0.2,
                explicit_link: 0.5,
            },
            recency: RecencyConfig {
                journal_max: 0.2,
                decay_per_day: 0.002,
            },
            min_score: 0.05,
        }
    }
}

impl RelevanceConfig {
    /// Rejects values that would make scores meaningless.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("boosts.symbol_match", self.boosts.symbol_match),
            ("boosts.path_overlap", self.boosts.path_overlap),
            ("boosts.explicit_link", self.boosts.explicit_link),
            ("recency.journal_max", self.recency.journal_max),
            ("recency.decay_per_day", self.recency.decay_per_day),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ContextEngineError::Config {
                    message: format!("relevance.{field} must be a finite non-negative number, got {value}"),
                });
            }
        }
        if !self.min_score.is_finite() {
            return Err(ContextEngineError::Config {
                message: format!("relevance.min_score must be finite, got {}", self.min_score),
            });
        }
        if self.max_candidates == 0 {
            return Err(ContextEngineError::Config {
                message: "relevance.max_candidates must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Project-level configuration stored in `context/config/context.config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub version: String,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub relevance: RelevanceConfig,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            version: "2.0.0".to_string(),
            project: ProjectConfig::default(),
            relevance: RelevanceConfig::default(),
        }
    }
}

/// Returns the path to the configuration file within the given project root.
pub fn get_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_PATH)
}

/// Returns `true` if the project has been initialized.
pub fn is_initialized(project_root: &Path) -> bool {
    get_config_path(project_root).exists()
}

/// Walks up from `start` looking for a directory that contains `context/`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONTEXT_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Loads and validates the configuration.
///
/// If the configuration file does not exist, returns the default
/// configuration.
pub fn load_config(project_root: &Path) -> Result<ContextConfig> {
    let config_path = get_config_path(project_root);

    if !config_path.exists() {
        return Ok(ContextConfig::default());
    }

    let contents = fs::read_to_string(&config_path).map_err(|e| ContextEngineError::Config {
        message: format!(
            "failed to read config file '{}': {}",
            config_path.display(),
            e
        ),
    })?;

    let config: ContextConfig =
        serde_json::from_str(&contents).map_err(|e| ContextEngineError::Config {
            message: format!(
                "failed to parse config file '{}': {}",
                config_path.display(),
                e
            ),
        })?;

    config.relevance.validate()?;
    Ok(config)
}

/// Saves the configuration to disk using an atomic write.
///
/// Writes to a temporary file first and then renames it to the final location.
pub fn save_config(project_root: &Path, config: &ContextConfig) -> Result<()> {
    let config_path = get_config_path(project_root);
    if let Some(dir) = config_path.parent() {
        fs::create_dir_all(dir).map_err(|e| ContextEngineError::Config {
            message: format!("failed to create config directory '{}': {}", dir.display(), e),
        })?;
    }

    let tmp_path = config_path.with_extension("tmp");

    let json = serde_json::to_string_pretty(config).map_err(|e| ContextEngineError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    fs::write(&tmp_path, &json).map_err(|e| ContextEngineError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, &config_path).map_err(|e| ContextEngineError::Config {
        message: format!(
            "failed to rename temporary config file '{}' to '{}': {}",
            tmp_path.display(),
            config_path.display(),
            e
        ),
    })?;

    Ok(())
}

/// The packet a developer is currently working on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentContext {
    pub packet_id: Option<String>,
    pub switched_at: Option<String>,
}

/// Loads the current packet selection, or `None` if nothing was switched to.
pub fn load_current_context(project_root: &Path) -> Result<Option<CurrentContext>> {
    let path = project_root.join(CURRENT_CONTEXT_PATH);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    let context: CurrentContext = serde_json::from_str(&content)?;
    Ok(context.packet_id.is_some().then_some(context))
}

pub fn save_current_context(project_root: &Path, context: &CurrentContext) -> Result<()> {
    let path = project_root.join(CURRENT_CONTEXT_PATH);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(&path, serde_json::to_string_pretty(context)?)?;
    Ok(())
}

fn repo_map_template(project_name: &str, date: &str) -> String {
    format!(
        "# Repository Map: {project_name}

## Overview
Add a description of your project here.

## Key Directories
- `src/` - Source code
- `tests/` - Test files

## Key Files
- Add important files and their purposes here

## Architecture Notes
- Add architecture notes here

---
*Last updated: {date}*
"
    )
}

/// Creates the context directory layout, a repository map template, and a
/// default configuration. Existing files are left alone.
pub fn init_project(project_root: &Path, project_name: &str) -> Result<ContextConfig> {
    for dir in [
        PACKETS_ACTIVE_DIR,
        PACKETS_COMPLETED_DIR,
        ADRS_DIR,
        JOURNAL_DIR,
        LOCAL_STATE_DIR,
    ] {
        fs::create_dir_all(project_root.join(dir))?;
    }

    let repo_map = project_root.join(REPO_MAP_PATH);
    if !repo_map.exists() {
        if let Some(dir) = repo_map.parent() {
            fs::create_dir_all(dir)?;
        }
        let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
        fs::write(&repo_map, repo_map_template(project_name, &date))?;
    }

    if is_initialized(project_root) {
        return load_config(project_root);
    }

    let config = ContextConfig {
        project: ProjectConfig {
            name: project_name.to_string(),
            description: String::new(),
        },
        ..ContextConfig::default()
    };
    save_config(project_root, &config)?;
    Ok(config)
}
