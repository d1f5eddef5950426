use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    auth::StaticCredential,
    history::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT},
    provider::ProviderId,
};

pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,

    /// Overrides the provider's public endpoint, e.g. for a proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// The single identity allowed to log in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginConfig {
    pub username: String,

    /// Plain password, hashed at startup. Prefer `password_hash`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Output of `weather-web hash-password`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: SocketAddr,
    pub history_limit: usize,
    /// Lifetime of a login, in seconds.
    pub session_max_age_secs: u64,
    pub pages_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], 5000)),
            history_limit: DEFAULT_HISTORY_LIMIT,
            session_max_age_secs: DEFAULT_SESSION_MAX_AGE.as_secs(),
            pages_dir: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
        }
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<LoginConfig>,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load config from `path`, or return an empty default if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-web")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay values from the environment on top of the file.
    ///
    /// `var` looks a variable up; pass `|k| std::env::var(k).ok()` in production.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        for id in ProviderId::all() {
            if let Some(key) = var(id.api_key_env()) {
                self.upsert_provider_api_key(*id, key);
            }
        }

        if let Some(username) = var("WEATHER_LOGIN_USERNAME") {
            self.login.get_or_insert_with(LoginConfig::default).username = username;
        }
        // A password from the environment replaces whichever form the file used.
        if let Some(password) = var("WEATHER_LOGIN_PASSWORD") {
            let login = self.login.get_or_insert_with(LoginConfig::default);
            login.password = Some(password);
            login.password_hash = None;
        }
        if let Some(hash) = var("WEATHER_LOGIN_PASSWORD_HASH") {
            let login = self.login.get_or_insert_with(LoginConfig::default);
            login.password_hash = Some(hash);
            login.password = None;
        }

        if let Some(address) = var("WEATHER_SERVER_ADDRESS") {
            self.server.address = address
                .parse()
                .with_context(|| format!("Invalid WEATHER_SERVER_ADDRESS '{address}'"))?;
        }
        if let Some(limit) = var("WEATHER_HISTORY_LIMIT") {
            self.server.history_limit = limit
                .parse()
                .with_context(|| format!("Invalid WEATHER_HISTORY_LIMIT '{limit}'"))?;
        }
        if let Some(secs) = var("WEATHER_SESSION_MAX_AGE") {
            self.server.session_max_age_secs = secs
                .parse()
                .with_context(|| format!("Invalid WEATHER_SESSION_MAX_AGE '{secs}'"))?;
        }

        Ok(())
    }

    /// Set/replace a provider API key, keeping any base URL override.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers
            .entry(provider_id.as_str().to_string())
            .and_modify(|cfg| cfg.api_key = api_key.clone())
            .or_insert(ProviderConfig { api_key, base_url: None });
    }

    /// Returns API key for a provider, if present and non-empty.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers
            .get(provider_id.as_str())
            .map(|cfg| cfg.api_key.trim())
            .filter(|key| !key.is_empty())
    }

    pub fn provider_base_url(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers.get(provider_id.as_str()).and_then(|cfg| cfg.base_url.as_deref())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }

    /// Providers that still lack an API key.
    pub fn missing_api_keys(&self) -> Vec<ProviderId> {
        ProviderId::all()
            .iter()
            .copied()
            .filter(|id| !self.is_provider_configured(*id))
            .collect()
    }

    /// Entries kept per session, clamped to the supported range.
    pub fn history_limit(&self) -> usize {
        self.server.history_limit.clamp(DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT)
    }

    pub fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.server.session_max_age_secs)
    }

    /// The configured login, if any.
    pub fn credential(&self) -> Result<Option<StaticCredential>> {
        let Some(login) = self.login.as_ref().filter(|l| !l.username.is_empty()) else {
            return Ok(None);
        };

        if let Some(hash) = &login.password_hash {
            return StaticCredential::from_encoded(login.username.clone(), hash)
                .map(Some)
                .context("Invalid login.password_hash");
        }

        match &login.password {
            Some(password) => Ok(Some(StaticCredential::from_password(
                login.username.clone(),
                password,
            ))),
            None => Err(anyhow!(
                "Login '{}' has neither `password` nor `password_hash`.\n\
                 Hint: run `weather-web hash-password` and set login.password_hash.",
                login.username
            )),
        }
    }
}
