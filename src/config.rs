use crate::api::constants::{self, defaults, pagination};
use crate::api::{ClientConfig, Credential, RetryConfig};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bearer token from the environment, supersedes stored credentials
pub const ENV_TOKEN: &str = "PD_TOKEN";
/// Legacy API key from the environment
pub const ENV_LEGACY_TOKEN: &str = "PD_LEGACY_TOKEN";
/// Base URL override
pub const ENV_API_URL: &str = "PD_API_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    #[default]
    Bearer,
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub token: String,
    #[serde(default)]
    pub kind: CredentialKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
}

impl StoredCredential {
    pub fn to_credential(&self) -> Credential {
        match self.kind {
            CredentialKind::Bearer => Credential::Bearer(self.token.clone()),
            CredentialKind::Legacy => Credential::LegacyKey(self.token.clone()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    pub default_alias: Option<String>,
    #[serde(default)]
    pub credentials: BTreeMap<String, StoredCredential>,
    #[serde(default)]
    pub engine: EngineSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    constants::DEFAULT_BASE_URL.to_string()
}

fn default_concurrency() -> usize {
    defaults::CONCURRENCY
}

fn default_page_size() -> usize {
    pagination::DEFAULT_PAGE_SIZE
}

fn default_max_retries() -> u32 {
    RetryConfig::default().max_retries
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    defaults::REQUEST_TIMEOUT.as_secs()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            concurrency: default_concurrency(),
            page_size: default_page_size(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Outcome of removing a stored credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub was_default: bool,
    /// Alias that became the default in its place
    pub new_default: Option<String>,
}

impl Config {
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("pagerduty-cli");

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
            info!("Created config directory: {:?}", config_dir);
        }

        Ok(config_dir)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", config_path);

        if !config_path.exists() {
            info!("Config file doesn't exist, using default config");
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        debug!("Loaded config with {} credentials", config.credentials.len());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        debug!("Saving config to: {:?}", config_path);

        let config_content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(config_path, config_content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        info!("Config saved successfully");
        Ok(())
    }

    /// Store a credential; the first one, or one added with `make_default`, becomes the default
    pub fn add_credential(&mut self, alias: &str, credential: StoredCredential, make_default: bool) -> Result<()> {
        let alias = alias.trim();
        if alias.is_empty() {
            anyhow::bail!("Alias cannot be empty");
        }
        if credential.token.trim().is_empty() {
            anyhow::bail!("Token cannot be empty");
        }

        info!("Adding credential: {}", alias);
        self.credentials.insert(alias.to_string(), credential);

        if make_default || self.default_alias.is_none() {
            self.default_alias = Some(alias.to_string());
            info!("Set {} as default credential", alias);
        }

        Ok(())
    }

    pub fn set_default(&mut self, alias: &str) -> Result<()> {
        if !self.credentials.contains_key(alias) {
            anyhow::bail!("Credential '{}' not found", alias);
        }

        info!("Setting default credential to: {}", alias);
        self.default_alias = Some(alias.to_string());
        Ok(())
    }

    /// Remove a credential, promoting the alphabetically first remaining alias when it was the default
    pub fn remove_credential(&mut self, alias: &str) -> Result<Removal> {
        if self.credentials.remove(alias).is_none() {
            anyhow::bail!("Credential '{}' not found", alias);
        }
        info!("Removed credential: {}", alias);

        let was_default = self.default_alias.as_deref() == Some(alias);
        let mut new_default = None;
        if was_default {
            new_default = self.credentials.keys().next().cloned();
            match &new_default {
                Some(next) => info!("Promoted {} to default credential", next),
                None => warn!("Removed the last stored credential"),
            }
            self.default_alias = new_default.clone();
        }

        Ok(Removal {
            was_default,
            new_default,
        })
    }

    pub fn list_aliases(&self) -> Vec<&String> {
        self.credentials.keys().collect()
    }

    pub fn get_credential(&self, alias: &str) -> Option<&StoredCredential> {
        self.credentials.get(alias)
    }

    /// Credential to use: explicit alias, then environment override, then the default alias
    pub fn current_credential(&self, alias: Option<&str>) -> Result<Option<Credential>> {
        self.resolve_credential(alias, credential_from_env())
    }

    fn resolve_credential(&self, alias: Option<&str>, from_env: Option<Credential>) -> Result<Option<Credential>> {
        if let Some(alias) = alias {
            let stored = self
                .get_credential(alias)
                .with_context(|| format!("Credential '{}' not found", alias))?;
            return Ok(Some(stored.to_credential()));
        }

        if let Some(credential) = from_env {
            debug!("Using credential from the environment");
            return Ok(Some(credential));
        }

        Ok(self
            .default_alias
            .as_deref()
            .and_then(|alias| self.get_credential(alias))
            .map(StoredCredential::to_credential))
    }

    /// Engine configuration from the `[engine]` table and `PD_API_URL`
    pub fn client_config(&self) -> ClientConfig {
        self.client_config_with(std::env::var(ENV_API_URL).ok())
    }

    fn client_config_with(&self, base_url_override: Option<String>) -> ClientConfig {
        let settings = &self.engine;
        let base_url = base_url_override
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| settings.base_url.clone());

        ClientConfig::builder()
            .base_url(base_url)
            .concurrency(settings.concurrency)
            .page_size(settings.page_size)
            .max_retries(settings.max_retries)
            .retry_delay(Duration::from_millis(settings.retry_delay_ms))
            .request_timeout(Duration::from_secs(settings.timeout_secs))
            .build()
    }
}

/// `PD_TOKEN` wins over `PD_LEGACY_TOKEN`
fn credential_from_env() -> Option<Credential> {
    let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

    read(ENV_TOKEN)
        .map(Credential::Bearer)
        .or_else(|| read(ENV_LEGACY_TOKEN).map(Credential::LegacyKey))
}
