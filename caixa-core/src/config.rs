//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "defaultSource": "ASAAS",
//!   "ingest": { "scanWindow": 50, "aliases": { "date": ["data", "vencimento"] } },
//!   "categorizer": { "endpoint": "http://localhost:8080/categorize", "apiKeyEnv": "CAIXA_CATEGORIZER_KEY" },
//!   "nonImpactingCategories": ["Retirada de lucro", "Aporte de Capital"]
//! }
//! ```
//! Keys this crate does not know about are preserved on save.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::result::Error;
use crate::ingest::IngestOptions;

/// Overrides the categorizer endpoint from settings.json
pub const CATEGORIZER_URL_ENV: &str = "CAIXA_CATEGORIZER_URL";

const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ingest: Option<IngestOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    categorizer: Option<CategorizerSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    non_impacting_categories: Option<Vec<String>>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Remote categorization service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizerSettings {
    pub endpoint: String,
    /// Name of the environment variable holding the bearer token, if any
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Caixa configuration (resolved view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub default_source: String,
    pub ingest: IngestOptions,
    pub categorizer: Option<CategorizerSettings>,
    /// Categories left out of the period result (owner withdrawals, capital contributions)
    pub non_impacting_categories: Vec<String>,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_source: "ASAAS".to_string(),
            ingest: IngestOptions::default(),
            categorizer: None,
            non_impacting_categories: default_non_impacting(),
            _raw_settings: SettingsFile::default(),
        }
    }
}

fn default_non_impacting() -> Vec<String> {
    vec!["Retirada de lucro".to_string(), "Aporte de Capital".to_string()]
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing file gives defaults. A malformed file is an error rather
    /// than silently falling back, since it usually carries custom aliases.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;
        let defaults = Config::default();

        let categorizer = match std::env::var(CATEGORIZER_URL_ENV).ok().filter(|s| !s.is_empty()) {
            Some(endpoint) => Some(CategorizerSettings {
                endpoint,
                ..raw.categorizer.clone().unwrap_or(CategorizerSettings {
                    endpoint: String::new(),
                    api_key_env: None,
                    timeout_secs: default_timeout_secs(),
                })
            }),
            None => raw.categorizer.clone(),
        };

        Ok(Self {
            default_source: raw.default_source.clone().unwrap_or(defaults.default_source),
            ingest: raw.ingest.clone().unwrap_or(defaults.ingest),
            categorizer,
            non_impacting_categories: raw
                .non_impacting_categories
                .clone()
                .unwrap_or(defaults.non_impacting_categories),
            _raw_settings: raw,
        })
    }

    /// Save config to the data directory
    /// Preserves other settings that this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;

        settings.default_source = Some(self.default_source.clone());
        settings.ingest = Some(self.ingest.clone());
        settings.categorizer = self.categorizer.clone();
        settings.non_impacting_categories = Some(self.non_impacting_categories.clone());

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    /// Whether a category counts toward the period result
    pub fn impacts_result(&self, category: &str) -> bool {
        !self
            .non_impacting_categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }

    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    let settings = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("{}: {}", settings_path.display(), e)))?;
    Ok(settings)
}
