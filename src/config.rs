use crate::cli::ColorChoice;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub open: OpenConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub results_per_page: usize,
    pub engine_command: String,
    pub index_command: String,
    pub history_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            results_per_page: 10,
            engine_command: "recoll -t -A".to_string(),
            index_command: "recollindex".to_string(),
            history_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Column paragraphs are filled to.
    pub fill_column: usize,
    pub color: ColorChoice,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fill_column: 70,
            color: ColorChoice::Auto,
        }
    }
}

/// Behaviour after a result is opened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenConfig {
    #[serde(default = "default_true")]
    pub auto_file_search: bool,
    #[serde(default = "default_true")]
    pub prompt_before_search: bool,
    #[serde(default = "default_true")]
    pub result_read_only: bool,
    #[serde(default = "default_true")]
    pub render_markup: bool,
    #[serde(default = "default_markup_renderer")]
    pub markup_renderer: String,
    #[serde(default = "default_text_extractor")]
    pub text_extractor: String,
    #[serde(default = "default_extractable_extensions")]
    pub extractable_extensions: Vec<String>,
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

fn default_true() -> bool {
    true
}
fn default_markup_renderer() -> String {
    "w3m -dump -T text/html".to_string()
}
fn default_text_extractor() -> String {
    "pdftotext -layout".to_string()
}
fn default_extractable_extensions() -> Vec<String> {
    vec!["pdf".to_string()]
}
fn default_context_lines() -> usize {
    2
}

impl Default for OpenConfig {
    fn default() -> Self {
        Self {
            auto_file_search: default_true(),
            prompt_before_search: default_true(),
            result_read_only: default_true(),
            render_markup: default_true(),
            markup_renderer: default_markup_renderer(),
            text_extractor: default_text_extractor(),
            extractable_extensions: default_extractable_extensions(),
            context_lines: default_context_lines(),
        }
    }
}

impl Config {
    /// Loads the first configuration file found, or the defaults.
    pub fn load() -> Result<Self> {
        match Self::find_config_path()? {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn find_config_path() -> Result<Option<PathBuf>> {
        if let Some(xdg_config) = dirs::config_dir() {
            let xdg_path = xdg_config.join("recoll-outline/config.toml");
            if xdg_path.exists() {
                return Ok(Some(xdg_path));
            }
        }

        if let Some(home) = dirs::home_dir() {
            let home_path = home.join(".recoll-outline.toml");
            if home_path.exists() {
                return Ok(Some(home_path));
            }
        }

        let current_path = Path::new(".recoll-outline.toml");
        if current_path.exists() {
            return Ok(Some(current_path.to_path_buf()));
        }

        Ok(None)
    }

    pub fn validate(&self) -> Result<()> {
        if self.search.results_per_page == 0 {
            anyhow::bail!("search.results_per_page must be at least 1");
        }
        if self.search.engine_command.trim().is_empty() {
            anyhow::bail!("search.engine_command must not be empty");
        }
        if self.display.fill_column == 0 {
            anyhow::bail!("display.fill_column must be at least 1");
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_documented_surface() {
        let cfg = Config::default();
        assert_eq!(cfg.search.results_per_page, 10);
        assert_eq!(cfg.search.engine_command, "recoll -t -A");
        assert_eq!(cfg.search.index_command, "recollindex");
        assert!(cfg.open.auto_file_search);
        assert!(cfg.open.prompt_before_search);
        assert!(cfg.open.result_read_only);
        assert!(cfg.open.render_markup);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[search]\nresults_per_page = 25\n\n[open]\nprompt_before_search = false\n",
        )
        .unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.search.results_per_page, 25);
        assert_eq!(cfg.search.engine_command, "recoll -t -A");
        assert!(!cfg.open.prompt_before_search);
        assert!(cfg.open.auto_file_search);
        assert_eq!(cfg.display.fill_column, 70);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[search]\nresults_per_page = 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.toml");
        let mut cfg = Config::default();
        cfg.display.fill_column = 100;
        cfg.display.color = ColorChoice::Never;
        cfg.save(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }
}
