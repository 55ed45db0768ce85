use crate::core::alias::AliasTable;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ECB_DAILY_URL: &str = "https://www.ecb.europa.eu/stats/eurofxref/eurofxref-daily.xml";

/// Converter settings. Every field is optional in the file.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Settings {
    /// `{ code: [alias, ...] }`
    #[serde(default)]
    pub aliases: HashMap<String, Vec<String>>,
    /// Destinations used when a query names only a source currency.
    #[serde(default)]
    pub defaults: Vec<String>,
    #[serde(default)]
    pub feed_url: Option<String>,
}

impl Settings {
    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "eurofx", "eurofx")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("settings.json"))
    }

    /// Loads settings from the default location, falling back to defaults when
    /// no file exists.
    pub fn load() -> Result<Self> {
        debug!("Loading default settings");
        let path = Self::default_config_path()?;
        Self::load_optional(path)
    }

    pub fn load_optional<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            debug!(
                "No settings file at {}, using defaults",
                path.as_ref().display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(path)
    }

    /// Reads JSON settings, or YAML when the extension is `.yaml`/`.yml`.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        let settings: Self = if is_yaml {
            serde_yaml::from_str(&config_str)
                .with_context(|| format!("Failed to parse settings file: {}", path.display()))?
        } else {
            serde_json::from_str(&config_str)
                .with_context(|| format!("Failed to parse settings file: {}", path.display()))?
        };
        debug!("Successfully loaded settings");
        Ok(settings.normalized())
    }

    fn normalized(mut self) -> Self {
        for code in &mut self.defaults {
            *code = code.to_uppercase();
        }
        self
    }

    pub fn alias_table(&self) -> AliasTable {
        AliasTable::from_config(&self.aliases)
    }

    pub fn feed_url(&self) -> &str {
        self.feed_url.as_deref().unwrap_or(ECB_DAILY_URL)
    }
}
