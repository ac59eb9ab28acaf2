use anyhow::{Context as AnyhowContext, Result};
use reqforge_assistant::LlmConfig;
use reqforge_relay::RelayConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub(crate) const DEFAULT_CONFIG_FILE: &str = "reqforge.toml";

const ENDPOINT_ENV: &str = "REQFORGE_LLM_ENDPOINT";
const API_KEY_ENV: &str = "REQFORGE_LLM_API_KEY";
const FALLBACK_API_KEY_ENV: &str = "OPENAI_API_KEY";
const MODEL_ENV: &str = "REQFORGE_LLM_MODEL";

/// Contents of `reqforge.toml`. Every table and key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub llm: LlmConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct ProxyConfig {
    pub timeout_secs: u64,
    pub follow_redirects: bool,
    pub accept_invalid_certs: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        let relay = RelayConfig::default();
        Self {
            timeout_secs: relay.timeout.as_secs(),
            follow_redirects: relay.follow_redirects,
            accept_invalid_certs: relay.accept_invalid_certs,
        }
    }
}

impl ProxyConfig {
    pub(crate) fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            follow_redirects: self.follow_redirects,
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}

/// Load config from `explicit` (`--config` or `$REQFORGE_CONFIG`) or `./reqforge.toml`, then
/// apply environment overrides. A missing default file is not an error; a missing explicit one is.
pub(crate) fn load(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.is_file().then_some(local)
        });

    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            let config = parse(&raw)
                .with_context(|| format!("Failed to parse config {}", path.display()))?;
            log::debug!("loaded config from {}", path.display());
            config
        }
        None => AppConfig::default(),
    };
    apply_env(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

pub(crate) fn parse(raw: &str) -> Result<AppConfig> {
    Ok(toml::from_str(raw)?)
}

fn apply_env(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(endpoint) = lookup(ENDPOINT_ENV) {
        config.llm.endpoint = endpoint;
    }
    if let Some(key) = lookup(API_KEY_ENV).or_else(|| {
        config
            .llm
            .api_key
            .is_none()
            .then(|| lookup(FALLBACK_API_KEY_ENV))
            .flatten()
    }) {
        config.llm.api_key = Some(key);
    }
    if let Some(model) = lookup(MODEL_ENV) {
        config.llm.model = model;
    }
}
