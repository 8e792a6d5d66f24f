//! Layered configuration
//!
//! Built-in defaults, then an optional TOML file, then `MAILGEN_` environment
//! variables (`__` separates sections, e.g. `MAILGEN_BEDROCK__ENDPOINT`).

use std::net::SocketAddr;
use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::bedrock::BedrockConfig;
use crate::pipeline::CampaignConfig;
use crate::retry::RetryPolicy;
use crate::storage::StorageConfig;

/// Config file read when none is given explicitly
pub const DEFAULT_CONFIG_FILE: &str = "mailgen.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "MAILGEN_";

/// Full daemon and CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub bedrock: BedrockConfig,
    pub retry: RetryPolicy,
    pub storage: StorageConfig,
    pub campaign: CampaignConfig,
    pub log: LogConfig,
}

/// HTTP daemon settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directives; `RUST_LOG` takes precedence
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "mailgen=info,tower_http=info".to_string(),
        }
    }
}

impl Config {
    /// Provider chain for `path` (or `mailgen.toml` when absent).
    /// A missing file contributes nothing.
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load configuration
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }
}
