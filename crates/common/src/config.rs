use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

/// Default Kodi JSON-RPC endpoint (web server add-on on the local host).
const DEFAULT_JSON_RPC: &str = "http://127.0.0.1:8080/jsonrpc";

/// Kodi client configuration. Immutable once the dispatcher is built.
#[derive(Debug, Clone, Deserialize)]
pub struct KodiConfig {
    /// Master switch; when off, enqueues are dropped and no cycle runs
    pub enable: bool,

    /// JSON-RPC endpoint URL, e.g. `http://host:8080/jsonrpc`
    pub json_rpc: String,

    /// Basic auth username
    pub username: String,

    /// Basic auth password
    pub password: String,

    /// Per-request timeout in seconds (default: 5)
    pub timeout_secs: u64,

    /// Period between flush cycles (default: 60s)
    pub flush_interval: Duration,

    /// Send attempts per task before it is dropped (default: 3, minimum 1)
    pub max_attempts: u32,
}

impl KodiConfig {
    /// Request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for KodiConfig {
    fn default() -> Self {
        Self {
            enable: false,
            json_rpc: DEFAULT_JSON_RPC.to_string(),
            username: String::new(),
            password: String::new(),
            timeout_secs: 5,
            flush_interval: Duration::from_secs(60),
            max_attempts: 3,
        }
    }
}

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Kodi client settings
    pub kodi: KodiConfig,

    /// Listen address for the enqueue API (default: 0.0.0.0:3000)
    pub api_addr: SocketAddr,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = KodiConfig::default();

        let kodi = KodiConfig {
            enable: match lookup("KODI_ENABLE") {
                Some(raw) => parse_bool("KODI_ENABLE", &raw)?,
                None => defaults.enable,
            },
            json_rpc: lookup("KODI_JSON_RPC").unwrap_or(defaults.json_rpc),
            username: lookup("KODI_USERNAME").unwrap_or_default(),
            password: lookup("KODI_PASSWORD").unwrap_or_default(),
            timeout_secs: lookup("KODI_TIMEOUT")
                .unwrap_or_else(|| defaults.timeout_secs.to_string())
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("KODI_TIMEOUT must be a valid u64"))?,
            flush_interval: Duration::from_secs(
                lookup("KODI_FLUSH_INTERVAL_SECS")
                    .unwrap_or_else(|| defaults.flush_interval.as_secs().to_string())
                    .trim()
                    .parse()
                    .map_err(|_| {
                        anyhow::anyhow!("KODI_FLUSH_INTERVAL_SECS must be a valid u64")
                    })?,
            ),
            max_attempts: lookup("KODI_MAX_ATTEMPTS")
                .unwrap_or_else(|| defaults.max_attempts.to_string())
                .trim()
                .parse::<u32>()
                .map_err(|_| anyhow::anyhow!("KODI_MAX_ATTEMPTS must be a valid u32"))?
                .max(1),
        };

        if kodi.enable && kodi.json_rpc.trim().is_empty() {
            anyhow::bail!("KODI_JSON_RPC must be set when KODI_ENABLE is on");
        }
        if kodi.timeout_secs == 0 {
            anyhow::bail!("KODI_TIMEOUT must be greater than zero");
        }
        if kodi.flush_interval.is_zero() {
            anyhow::bail!("KODI_FLUSH_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            kodi,
            api_addr: lookup("API_ADDR")
                .unwrap_or_else(|| "0.0.0.0:3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("API_ADDR must be a valid socket address"))?,
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(anyhow::anyhow!("{} must be a boolean, got {:?}", key, raw)),
    }
}
