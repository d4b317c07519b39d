use crate::transport::ClientOptions;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Complete dashboard configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DagitConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub app: AppConfig,
}

/// GraphQL server location
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Base HTTP origin; the GraphQL endpoint is `<origin>/graphql`
    #[serde(default = "default_origin")]
    pub origin: String,
}

fn default_origin() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
        }
    }
}

/// Subscription socket configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Explicit socket URI; derived from the server origin when absent
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default = "default_true")]
    pub reconnect: bool,
    #[serde(default = "default_true")]
    pub lazy: bool,
    #[serde(default)]
    pub reconnection_attempts: Option<u32>,
    #[serde(default = "default_min_reconnect_delay_ms")]
    pub min_reconnect_delay_ms: u64,
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Sent as the `connection_init` payload
    #[serde(default)]
    pub connection_params: Option<Value>,
}

fn default_true() -> bool {
    true
}

fn default_min_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            uri: None,
            reconnect: true,
            lazy: true,
            reconnection_attempts: None,
            min_reconnect_delay_ms: default_min_reconnect_delay_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            connection_params: None,
        }
    }
}

impl WebSocketConfig {
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            reconnect: self.reconnect,
            lazy: self.lazy,
            reconnection_attempts: self.reconnection_attempts,
            min_reconnect_delay: Duration::from_millis(self.min_reconnect_delay_ms),
            max_reconnect_delay: Duration::from_millis(self.max_reconnect_delay_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            connection_params: self.connection_params.clone(),
            ..ClientOptions::default()
        }
    }
}

/// Which transport terminates the link chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Every operation over the socket
    #[default]
    WebSocket,
    /// Subscriptions over the socket, queries and mutations over HTTP
    Split,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub mode: TransportMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Id of the element the dashboard mounts into
    #[serde(default = "default_mount_root")]
    pub mount_root: String,
    /// Query issued once after startup (opens the lazy socket)
    #[serde(default)]
    pub startup_query: Option<String>,
}

fn default_mount_root() -> String {
    "root".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mount_root: default_mount_root(),
            startup_query: None,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    InvalidUri { uri: String, reason: String },
    UnsupportedScheme(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config: {}", e),
            ConfigError::Parse(e) => write!(f, "failed to parse config: {}", e),
            ConfigError::InvalidUri { uri, reason } => {
                write!(f, "invalid URI '{}': {}", uri, reason)
            }
            ConfigError::UnsupportedScheme(scheme) => {
                write!(f, "unsupported URI scheme '{}'", scheme)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn parse_url(uri: &str) -> Result<Url, ConfigError> {
    Url::parse(uri).map_err(|e| ConfigError::InvalidUri {
        uri: uri.to_string(),
        reason: e.to_string(),
    })
}

impl DagitConfig {
    /// Socket URI: the explicit one, or the origin with `ws`/`wss` and path `/graphql`
    pub fn websocket_uri(&self) -> Result<String, ConfigError> {
        if let Some(uri) = &self.websocket.uri {
            let url = parse_url(uri)?;
            return match url.scheme() {
                "ws" | "wss" => Ok(url.to_string()),
                other => Err(ConfigError::UnsupportedScheme(other.to_string())),
            };
        }

        let mut url = parse_url(&self.server.origin)?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|_| ConfigError::UnsupportedScheme(scheme.to_string()))?;
        url.set_path("/graphql");
        Ok(url.to_string())
    }

    /// HTTP GraphQL endpoint, `<origin>/graphql`
    pub fn graphql_http_uri(&self) -> Result<Url, ConfigError> {
        let mut url = parse_url(&self.server.origin)?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
        url.set_path("/graphql");
        Ok(url)
    }

    /// Apply `DAGIT_ORIGIN`, `DAGIT_WEBSOCKET_URI` and `DAGIT_MOUNT_ROOT`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(origin) = lookup("DAGIT_ORIGIN") {
            self.server.origin = origin;
        }
        if let Some(uri) = lookup("DAGIT_WEBSOCKET_URI") {
            self.websocket.uri = Some(uri);
        }
        if let Some(root) = lookup("DAGIT_MOUNT_ROOT") {
            self.app.mount_root = root;
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &str) -> Result<DagitConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
    toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
}
