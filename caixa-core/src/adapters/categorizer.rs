//! Category suggestion adapters
//!
//! `HttpCategorizer` asks a remote service; `RuleCategorizer` applies the
//! keyword rules from settings and needs no network.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::CategorizerSettings;
use crate::domain::Direction;
use crate::ingest::CategoryRules;
use crate::ports::{CategorySuggestion, Categorizer};

/// Suggestion used whenever the remote service cannot answer
pub const FALLBACK_CATEGORY: &str = "Outros";
pub const FALLBACK_CONFIDENCE: u8 = 50;

#[derive(Debug, Serialize)]
struct CategorizeRequest<'a> {
    description: &'a str,
    #[serde(rename = "type")]
    direction: Direction,
}

#[derive(Debug, Deserialize)]
struct CategorizeResponse {
    category: String,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Remote categorizer (JSON POST `{description, type}` -> `{category, confidence}`)
#[derive(Debug)]
pub struct HttpCategorizer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl HttpCategorizer {
    pub fn new(settings: &CategorizerSettings) -> Result<Self> {
        if settings.endpoint.trim().is_empty() {
            anyhow::bail!("Categorizer endpoint cannot be empty");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let api_key = settings
            .api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.is_empty());

        Ok(Self {
            client,
            endpoint: settings.endpoint.trim().to_string(),
            api_key,
            timeout_secs: settings.timeout_secs,
        })
    }

    /// Ask the service, surfacing any failure
    pub fn request(&self, description: &str, direction: Direction) -> Result<CategorySuggestion> {
        let mut request = self.client.post(&self.endpoint).json(&CategorizeRequest {
            description,
            direction,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| self.map_request_error(e))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Categorizer returned HTTP {}", status.as_u16());
        }

        let body: CategorizeResponse = response
            .json()
            .context("Failed to parse categorizer response")?;
        let category = body.category.trim();
        if category.is_empty() {
            anyhow::bail!("Categorizer returned an empty category");
        }

        Ok(CategorySuggestion::new(category, normalize_confidence(body.confidence)))
    }

    fn map_request_error(&self, error: reqwest::Error) -> anyhow::Error {
        if error.is_timeout() {
            anyhow::anyhow!("Categorizer timed out after {} seconds", self.timeout_secs)
        } else if error.is_connect() {
            anyhow::anyhow!("Unable to connect to categorizer at {}", self.endpoint)
        } else {
            anyhow::anyhow!("Categorizer request failed: {}", error)
        }
    }
}

impl Categorizer for HttpCategorizer {
    fn name(&self) -> &str {
        "http"
    }

    fn suggest(&self, description: &str, direction: Direction) -> CategorySuggestion {
        self.request(description, direction)
            .unwrap_or_else(|_| CategorySuggestion::new(FALLBACK_CATEGORY, FALLBACK_CONFIDENCE))
    }
}

/// Accepts 0-1 fractions as well as 0-100 scores
fn normalize_confidence(raw: Option<f64>) -> u8 {
    match raw {
        Some(c) if (0.0..=1.0).contains(&c) => (c * 100.0).round() as u8,
        Some(c) if c.is_finite() && c > 1.0 => c.min(100.0).round() as u8,
        _ => FALLBACK_CONFIDENCE,
    }
}

/// Offline categorizer backed by the import keyword rules
#[derive(Debug, Clone, Default)]
pub struct RuleCategorizer {
    rules: CategoryRules,
}

impl RuleCategorizer {
    pub fn new(rules: CategoryRules) -> Self {
        Self { rules }
    }
}

impl Categorizer for RuleCategorizer {
    fn name(&self) -> &str {
        "rules"
    }

    fn suggest(&self, description: &str, direction: Direction) -> CategorySuggestion {
        let category = self.rules.seed_category(description, direction);
        let matched_rule = self.rules.rules.iter().any(|r| r.category == category);
        CategorySuggestion::new(category, if matched_rule { 90 } else { FALLBACK_CONFIDENCE })
    }
}
