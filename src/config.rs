//! Process configuration.
//!
//! Loaded once by the binary from built-in defaults overlaid with
//! `SEO_AUDITOR__<SECTION>__<KEY>` environment variables, then handed to
//! each component explicitly.

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;
use std::time::Duration;

use crate::error::AppError;
use crate::service::auditor::AuditSettings;
use crate::service::llm::GeminiSettings;

pub const ENV_PREFIX: &str = "SEO_AUDITOR";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub gemini: GeminiConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    pub fetch_timeout_secs: u64,
    pub llm_timeout_secs: u64,
    pub max_concurrency: usize,
    pub max_batch_pages: usize,
    pub max_output_tokens: u32,
}

impl AppConfig {
    /// Defaults overlaid with the process environment.
    pub fn load() -> Result<Self> {
        Self::build(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
    }

    fn build(environment: Environment) -> Result<Self> {
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite://seo_auditor.db?mode=rwc")?
            .set_default("database.max_connections", 5)?
            .set_default("gemini.model", "gemini-2.0-flash")?
            .set_default("gemini.base_url", "https://generativelanguage.googleapis.com")?
            .set_default("audit.fetch_timeout_secs", 15)?
            .set_default("audit.llm_timeout_secs", 90)?
            .set_default("audit.max_concurrency", 5)?
            .set_default("audit.max_batch_pages", 50)?
            .set_default("audit.max_output_tokens", 2048)?
            .add_source(environment)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Gemini client settings; fails when no API key is configured.
    pub fn gemini_settings(&self) -> crate::error::Result<GeminiSettings> {
        let api_key = self
            .gemini
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AppError::config(format!(
                    "Gemini API key missing; set {}__GEMINI__API_KEY",
                    ENV_PREFIX
                ))
            })?;

        Ok(GeminiSettings {
            api_key: api_key.to_string(),
            model: self.gemini.model.clone(),
            base_url: self.gemini.base_url.clone(),
            timeout: Duration::from_secs(self.audit.llm_timeout_secs),
        })
    }

    pub fn audit_settings(&self) -> AuditSettings {
        AuditSettings {
            fetch_timeout: Duration::from_secs(self.audit.fetch_timeout_secs),
            llm_timeout: Duration::from_secs(self.audit.llm_timeout_secs),
            max_concurrency: self.audit.max_concurrency.max(1),
            max_output_tokens: self.audit.max_output_tokens,
            ..AuditSettings::default()
        }
    }
}
