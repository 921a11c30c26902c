use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_COOKIES_FILE: &str = "cookies/cookies.txt";
pub const DEFAULT_ADAPTER: &str = "ClaudeSonnet4_5";
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://clerk.cto.new";
pub const DEFAULT_API_BASE_URL: &str = "https://api.enginelabs.ai/engine-agent";
pub const DEFAULT_STREAM_BASE_URL: &str = "wss://api.enginelabs.ai/engine-agent";
pub const DEFAULT_SITE_ORIGIN: &str = "https://cto.new";
pub const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 30;

const ENV_PREFIX: &str = "CTOPROXY_";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GlobalConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid model mapping `{0}`, expected `model=adapter`")]
    InvalidModelMapping(String),
}

/// One exposed model name and the upstream adapter it is routed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAdapter {
    pub model: String,
    pub adapter: String,
}

impl ModelAdapter {
    pub fn new(model: impl Into<String>, adapter: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            adapter: adapter.into(),
        }
    }

    /// Parses `model=adapter`.
    pub fn parse(raw: &str) -> Result<Self, GlobalConfigError> {
        let (model, adapter) = raw
            .split_once('=')
            .ok_or_else(|| GlobalConfigError::InvalidModelMapping(raw.to_string()))?;
        let (model, adapter) = (model.trim(), adapter.trim());
        if model.is_empty() || adapter.is_empty() {
            return Err(GlobalConfigError::InvalidModelMapping(raw.to_string()));
        }
        Ok(Self::new(model, adapter))
    }
}

pub fn default_model_adapters() -> Vec<ModelAdapter> {
    vec![
        ModelAdapter::new("gpt-5", "GPT5"),
        ModelAdapter::new("claude-sonnet-4-5", "ClaudeSonnet4_5"),
    ]
}

/// Final, merged global configuration used by the running process.
///
/// Merge order: CLI > ENV > built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub host: String,
    pub port: u16,
    /// Line-oriented credential file, reloaded when its mtime changes.
    pub cookies_file: String,
    /// Optional outbound proxy (for upstream egress).
    pub proxy: Option<String>,
    pub default_adapter: String,
    pub model_adapters: Vec<ModelAdapter>,
    pub identity_base_url: String,
    pub api_base_url: String,
    pub stream_base_url: String,
    /// Origin the upstream web app is served from; used for Origin/Referer.
    pub site_origin: String,
    pub stream_idle_timeout_secs: u64,
}

/// Optional layer used for merging global config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfigPatch {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cookies_file: Option<String>,
    pub proxy: Option<String>,
    pub default_adapter: Option<String>,
    /// Extra mappings, appended after the defaults; later entries win.
    pub model_adapters: Option<Vec<ModelAdapter>>,
    pub identity_base_url: Option<String>,
    pub api_base_url: Option<String>,
    pub stream_base_url: Option<String>,
    pub site_origin: Option<String>,
    pub stream_idle_timeout_secs: Option<u64>,
}

impl GlobalConfigPatch {
    pub fn overlay(&mut self, other: GlobalConfigPatch) {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.cookies_file.is_some() {
            self.cookies_file = other.cookies_file;
        }
        if other.proxy.is_some() {
            self.proxy = other.proxy;
        }
        if other.default_adapter.is_some() {
            self.default_adapter = other.default_adapter;
        }
        if let Some(extra) = other.model_adapters {
            self.model_adapters.get_or_insert_with(Vec::new).extend(extra);
        }
        if other.identity_base_url.is_some() {
            self.identity_base_url = other.identity_base_url;
        }
        if other.api_base_url.is_some() {
            self.api_base_url = other.api_base_url;
        }
        if other.stream_base_url.is_some() {
            self.stream_base_url = other.stream_base_url;
        }
        if other.site_origin.is_some() {
            self.site_origin = other.site_origin;
        }
        if other.stream_idle_timeout_secs.is_some() {
            self.stream_idle_timeout_secs = other.stream_idle_timeout_secs;
        }
    }

    /// Reads `CTOPROXY_*` variables from the process environment.
    pub fn from_env() -> Result<Self, GlobalConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, GlobalConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = get("PORT")
            .map(|value| {
                value.parse::<u16>().map_err(|_| GlobalConfigError::InvalidValue {
                    field: "port",
                    value,
                })
            })
            .transpose()?;
        let stream_idle_timeout_secs = get("STREAM_IDLE_TIMEOUT_SECS")
            .map(|value| {
                value
                    .parse::<u64>()
                    .map_err(|_| GlobalConfigError::InvalidValue {
                        field: "stream_idle_timeout_secs",
                        value,
                    })
            })
            .transpose()?;
        let model_adapters = get("MODELS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(ModelAdapter::parse)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Ok(Self {
            host: get("HOST"),
            port,
            cookies_file: get("COOKIES_FILE"),
            proxy: get("PROXY"),
            default_adapter: get("DEFAULT_ADAPTER"),
            model_adapters,
            identity_base_url: get("IDENTITY_BASE_URL"),
            api_base_url: get("API_BASE_URL"),
            stream_base_url: get("STREAM_BASE_URL"),
            site_origin: get("SITE_ORIGIN"),
            stream_idle_timeout_secs,
        })
    }

    pub fn into_config(self) -> Result<GlobalConfig, GlobalConfigError> {
        let stream_idle_timeout_secs = self
            .stream_idle_timeout_secs
            .unwrap_or(DEFAULT_STREAM_IDLE_TIMEOUT_SECS);
        if stream_idle_timeout_secs == 0 {
            return Err(GlobalConfigError::InvalidValue {
                field: "stream_idle_timeout_secs",
                value: "0".to_string(),
            });
        }

        let mut model_adapters = default_model_adapters();
        for extra in self.model_adapters.unwrap_or_default() {
            model_adapters.retain(|existing| existing.model != extra.model);
            model_adapters.push(extra);
        }

        Ok(GlobalConfig {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            cookies_file: self
                .cookies_file
                .unwrap_or_else(|| DEFAULT_COOKIES_FILE.to_string()),
            proxy: self.proxy.filter(|value| !value.trim().is_empty()),
            default_adapter: self
                .default_adapter
                .unwrap_or_else(|| DEFAULT_ADAPTER.to_string()),
            model_adapters,
            identity_base_url: self
                .identity_base_url
                .unwrap_or_else(|| DEFAULT_IDENTITY_BASE_URL.to_string()),
            api_base_url: self
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            stream_base_url: self
                .stream_base_url
                .unwrap_or_else(|| DEFAULT_STREAM_BASE_URL.to_string()),
            site_origin: self
                .site_origin
                .unwrap_or_else(|| DEFAULT_SITE_ORIGIN.to_string()),
            stream_idle_timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_fill_every_field() {
        let config = GlobalConfigPatch::default().into_config().unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.cookies_file, DEFAULT_COOKIES_FILE);
        assert_eq!(config.proxy, None);
        assert_eq!(config.default_adapter, DEFAULT_ADAPTER);
        assert_eq!(config.model_adapters, default_model_adapters());
        assert_eq!(config.stream_idle_timeout_secs, 30);
    }

    #[test]
    fn cli_layer_wins_over_env_layer() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CTOPROXY_PORT", "9000"),
            ("CTOPROXY_HOST", "127.0.0.1"),
            ("CTOPROXY_PROXY", "http://127.0.0.1:7890"),
        ]);
        let mut patch =
            GlobalConfigPatch::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();
        patch.overlay(GlobalConfigPatch {
            port: Some(9100),
            ..Default::default()
        });

        let config = patch.into_config().unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.proxy.as_deref(), Some("http://127.0.0.1:7890"));
    }

    #[test]
    fn env_port_must_be_numeric() {
        let err = GlobalConfigPatch::from_lookup(|key| {
            (key == "CTOPROXY_PORT").then(|| "eighty".to_string())
        })
        .unwrap_err();
        assert_eq!(
            err,
            GlobalConfigError::InvalidValue {
                field: "port",
                value: "eighty".to_string()
            }
        );
    }

    #[test]
    fn extra_model_mapping_replaces_default_entry() {
        let patch = GlobalConfigPatch::from_lookup(|key| {
            (key == "CTOPROXY_MODELS").then(|| "gpt-5=GPT5Mini, o3 = O3".to_string())
        })
        .unwrap();
        let config = patch.into_config().unwrap();

        let gpt5: Vec<_> = config
            .model_adapters
            .iter()
            .filter(|entry| entry.model == "gpt-5")
            .collect();
        assert_eq!(gpt5.len(), 1);
        assert_eq!(gpt5[0].adapter, "GPT5Mini");
        assert!(config.model_adapters.contains(&ModelAdapter::new("o3", "O3")));
    }

    #[test]
    fn model_mapping_requires_both_sides() {
        assert!(ModelAdapter::parse("gpt-5").is_err());
        assert!(ModelAdapter::parse("=GPT5").is_err());
        assert_eq!(
            ModelAdapter::parse("a=b").unwrap(),
            ModelAdapter::new("a", "b")
        );
    }

    #[test]
    fn zero_idle_timeout_is_rejected() {
        let patch = GlobalConfigPatch {
            stream_idle_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(patch.into_config().is_err());
    }
}
