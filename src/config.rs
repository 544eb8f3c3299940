//! Azure OpenAI configuration: validation, source precedence and the live store.
//!
//! The store is built once at startup from an ordered chain of sources
//! (secret mount, environment, persisted file, built-in default) and is then
//! shared by handle. Updates are validated, written to disk, and only then
//! swapped in, so readers always see a complete configuration.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::constants;
use crate::error::{ConfigError, FieldError, PersistenceError, ValidationError};

/// Shown in place of the API key in anything that leaves the process.
pub const REDACTED_KEY: &str = "***CONFIGURED***";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureOpenAIConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub deployment_name: String,
}

impl Default for AzureOpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: String::new(),
            api_version: constants::DEFAULT_API_VERSION.to_string(),
            deployment_name: constants::DEFAULT_DEPLOYMENT_NAME.to_string(),
        }
    }
}

// Keep the key out of logs.
impl fmt::Debug for AzureOpenAIConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureOpenAIConfig")
            .field("api_key", &redact(&self.api_key))
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("deployment_name", &self.deployment_name)
            .finish()
    }
}

fn redact(key: &str) -> &'static str {
    if key.is_empty() {
        ""
    } else {
        REDACTED_KEY
    }
}

impl AzureOpenAIConfig {
    /// Trims every field, then checks them all and reports every failure at
    /// once. The validated value holds the trimmed fields.
    pub fn validate(self) -> Result<ValidatedConfig, ValidationError> {
        let config = self.normalized();
        let mut errors = Vec::new();

        if config.api_key.is_empty() {
            errors.push(FieldError::new("apiKey", "Azure OpenAI API Key is required"));
        }
        if config.endpoint.is_empty() {
            errors.push(FieldError::new(
                "endpoint",
                "Valid Azure OpenAI endpoint URL is required",
            ));
        } else if let Err(reason) = check_endpoint(&config.endpoint) {
            errors.push(FieldError::new(
                "endpoint",
                format!("Valid Azure OpenAI endpoint URL is required ({reason})"),
            ));
        }
        if config.api_version.is_empty() {
            errors.push(FieldError::new("apiVersion", "API version is required"));
        }
        if config.deployment_name.is_empty() {
            errors.push(FieldError::new("deploymentName", "Deployment name is required"));
        }

        if errors.is_empty() {
            Ok(ValidatedConfig(Arc::new(config)))
        } else {
            Err(ValidationError { errors })
        }
    }

    fn normalized(self) -> Self {
        let trim = |s: String| {
            let trimmed = s.trim();
            if trimmed.len() == s.len() {
                s
            } else {
                trimmed.to_string()
            }
        };
        Self {
            api_key: trim(self.api_key),
            endpoint: trim(self.endpoint),
            api_version: trim(self.api_version),
            deployment_name: trim(self.deployment_name),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.clone().validate().is_ok()
    }

    pub fn redacted(&self) -> RedactedConfig {
        RedactedConfig {
            api_key: redact(&self.api_key).to_string(),
            endpoint: self.endpoint.clone(),
            api_version: self.api_version.clone(),
            deployment_name: self.deployment_name.clone(),
        }
    }
}

fn check_endpoint(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(())
}

/// A configuration that passed [`AzureOpenAIConfig::validate`].
///
/// This is the only form the completion client accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig(Arc<AzureOpenAIConfig>);

impl ValidatedConfig {
    pub fn get(&self) -> &AzureOpenAIConfig {
        &self.0
    }

    pub fn redacted(&self) -> RedactedConfig {
        self.0.redacted()
    }
}

impl std::ops::Deref for ValidatedConfig {
    type Target = AzureOpenAIConfig;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Externally visible form of the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactedConfig {
    pub api_key: String,
    pub endpoint: String,
    pub api_version: String,
    pub deployment_name: String,
}

/// A possibly incomplete candidate read from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub api_version: Option<String>,
    pub deployment_name: Option<String>,
}

impl PartialConfig {
    fn is_empty(&self) -> bool {
        self.api_key.is_none()
            && self.endpoint.is_none()
            && self.api_version.is_none()
            && self.deployment_name.is_none()
    }

    /// Fills gaps from the built-in defaults.
    pub fn into_config(self) -> AzureOpenAIConfig {
        let defaults = AzureOpenAIConfig::default();
        AzureOpenAIConfig {
            api_key: self.api_key.unwrap_or(defaults.api_key),
            endpoint: self.endpoint.unwrap_or(defaults.endpoint),
            api_version: self.api_version.unwrap_or(defaults.api_version),
            deployment_name: self.deployment_name.unwrap_or(defaults.deployment_name),
        }
    }
}

impl From<AzureOpenAIConfig> for PartialConfig {
    fn from(c: AzureOpenAIConfig) -> Self {
        let keep = |s: String| (!s.trim().is_empty()).then_some(s);
        Self {
            api_key: keep(c.api_key),
            endpoint: keep(c.endpoint),
            api_version: keep(c.api_version),
            deployment_name: keep(c.deployment_name),
        }
    }
}

/// One place configuration can come from.
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` when the source has nothing to offer.
    fn read(&self) -> Option<PartialConfig>;
}

/// A mounted secret directory holding one file per field.
pub struct SecretsDirSource {
    dir: PathBuf,
}

impl SecretsDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read_secret(&self, name: &str) -> Option<String> {
        let value = std::fs::read_to_string(self.dir.join(name)).ok()?;
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

impl ConfigSource for SecretsDirSource {
    fn name(&self) -> &'static str {
        "secrets"
    }

    fn read(&self) -> Option<PartialConfig> {
        if !self.dir.is_dir() {
            return None;
        }
        let partial = PartialConfig {
            api_key: self.read_secret("api-key"),
            endpoint: self.read_secret("endpoint"),
            api_version: self.read_secret("api-version"),
            deployment_name: self.read_secret("deployment-name"),
        };
        (!partial.is_empty()).then_some(partial)
    }
}

/// `AZURE_OPENAI_*` variables.
pub struct EnvSource {
    vars: HashMap<String, String>,
}

const ENV_KEYS: [&str; 4] = [
    constants::ENV_API_KEY,
    constants::ENV_ENDPOINT,
    constants::ENV_API_VERSION,
    constants::ENV_DEPLOYMENT_NAME,
];

impl EnvSource {
    /// Reads only the `AZURE_OPENAI_*` keys. Unset or non-UTF-8 values count
    /// as absent; the rest of the environment is never touched.
    pub fn from_process() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            vars: ENV_KEYS
                .iter()
                .filter_map(|key| lookup(key).map(|value| (key.to_string(), value)))
                .collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    fn var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

impl ConfigSource for EnvSource {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn read(&self) -> Option<PartialConfig> {
        let partial = PartialConfig {
            api_key: self.var(constants::ENV_API_KEY),
            endpoint: self.var(constants::ENV_ENDPOINT),
            api_version: self.var(constants::ENV_API_VERSION),
            deployment_name: self.var(constants::ENV_DEPLOYMENT_NAME),
        };
        (!partial.is_empty()).then_some(partial)
    }
}

/// The JSON file written by [`ConfigStore::update`].
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn read(&self) -> Option<PartialConfig> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<AzureOpenAIConfig>(&raw) {
            Ok(config) => Some(config.into()),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable config file");
                None
            }
        }
    }
}

/// Standard chain, highest priority first. The built-in default is implicit.
pub fn standard_sources(config_file: impl Into<PathBuf>) -> Vec<Box<dyn ConfigSource>> {
    vec![
        Box::new(SecretsDirSource::new(constants::SECRETS_DIR.as_str())),
        Box::new(EnvSource::from_process()),
        Box::new(FileSource::new(config_file)),
    ]
}

/// Holds the one live configuration of the process.
pub struct ConfigStore {
    live: RwLock<Arc<AzureOpenAIConfig>>,
    // Serializes validate/persist/swap across concurrent updaters.
    writer: Mutex<()>,
    path: PathBuf,
}

impl ConfigStore {
    /// Picks the first source whose candidate validates. Never fails: with no
    /// usable source the store starts from the unconfigured default.
    pub fn load(sources: &[Box<dyn ConfigSource>], persist_path: impl Into<PathBuf>) -> Self {
        let mut chosen = None;
        for source in sources {
            let Some(partial) = source.read() else {
                debug!(source = source.name(), "Config source has no values");
                continue;
            };
            match partial.into_config().validate() {
                Ok(valid) => {
                    info!(source = source.name(), config = ?valid.get(), "Loaded Azure OpenAI configuration");
                    chosen = Some(valid.get().clone());
                    break;
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Skipping incomplete configuration");
                }
            }
        }

        let config = chosen.unwrap_or_else(|| {
            warn!("Azure OpenAI is not configured, answers will use fallback responses");
            AzureOpenAIConfig::default()
        });

        Self::with_config(config, persist_path)
    }

    pub fn with_config(config: AzureOpenAIConfig, persist_path: impl Into<PathBuf>) -> Self {
        Self {
            live: RwLock::new(Arc::new(config)),
            writer: Mutex::new(()),
            path: persist_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn current(&self) -> Arc<AzureOpenAIConfig> {
        self.live.read().await.clone()
    }

    pub async fn validated(&self) -> Option<ValidatedConfig> {
        self.current().await.as_ref().clone().validate().ok()
    }

    pub async fn is_configured(&self) -> bool {
        self.current().await.is_valid()
    }

    pub async fn redacted(&self) -> RedactedConfig {
        self.current().await.redacted()
    }

    /// Validates, persists, then replaces the live configuration. On any error
    /// the previous configuration stays in place.
    pub async fn update(&self, candidate: AzureOpenAIConfig) -> Result<ValidatedConfig, ConfigError> {
        let valid = candidate.validate()?;

        let _writer = self.writer.lock().await;
        self.persist(valid.get()).await?;
        *self.live.write().await = Arc::new(valid.get().clone());

        info!(path = %self.path.display(), config = ?valid.get(), "Azure OpenAI configuration updated");
        Ok(valid)
    }

    async fn persist(&self, config: &AzureOpenAIConfig) -> Result<(), PersistenceError> {
        let to_err = |source| PersistenceError {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(config)
            .map_err(|e| to_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        // Write beside the target and rename so a crash never leaves half a file.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await.map_err(to_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(to_err)
    }
}
