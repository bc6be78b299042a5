use serde::{Deserialize, Serialize};

/// Top-level server configuration, loaded from `wordrace.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    pub auth: AuthFileConfig,
    pub limits: LimitsConfig,
    pub rooms: RoomsConfig,
    pub results: ResultsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            web_root: "web".to_string(),
            auth: AuthFileConfig::default(),
            limits: LimitsConfig::default(),
            rooms: RoomsConfig::default(),
            results: ResultsConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub ws_rate_limit_per_sec: f64,
    /// Outbound messages buffered per connection before drops begin.
    pub player_message_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 500,
            ws_rate_limit_per_sec: 30.0,
            player_message_buffer: 256,
        }
    }
}

/// Room lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub idle_timeout_secs: u64,
    pub idle_check_interval_secs: u64,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 3600,
            idle_check_interval_secs: 60,
        }
    }
}

/// Auth section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthFileConfig {
    /// Bearer token for the REST API. None = auth disabled.
    pub bearer_token: Option<String>,
}

/// Which result sink receives finished-player records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Log,
    Http,
}

/// Session store integration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    pub sink: SinkKind,
    /// Session store URL records are POSTed to (required for `http`).
    pub endpoint: Option<String>,
    pub bearer_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::Log,
            endpoint: None,
            bearer_token: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    InvalidListenAddr(String),
    Zero(&'static str),
    MissingEndpoint,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidListenAddr(a) => write!(f, "listen_addr is not a valid socket address: {a}"),
            Self::Zero(field) => write!(f, "{field} must be > 0"),
            Self::MissingEndpoint => write!(f, "results.sink = \"http\" requires results.endpoint"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Validate configuration, logging warnings for non-fatal issues.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidListenAddr(self.listen_addr.clone()));
        }

        if self.auth.bearer_token.is_some() {
            tracing::warn!(
                "bearer_token is set in config file; prefer the WORDRACE_API_TOKEN env var in production"
            );
        }

        if self.limits.max_ws_connections == 0 {
            return Err(ConfigError::Zero("limits.max_ws_connections"));
        }
        if self.limits.ws_rate_limit_per_sec <= 0.0 {
            return Err(ConfigError::Zero("limits.ws_rate_limit_per_sec"));
        }
        if self.limits.player_message_buffer == 0 {
            return Err(ConfigError::Zero("limits.player_message_buffer"));
        }
        if self.rooms.idle_timeout_secs == 0 {
            return Err(ConfigError::Zero("rooms.idle_timeout_secs"));
        }
        if self.rooms.idle_check_interval_secs == 0 {
            return Err(ConfigError::Zero("rooms.idle_check_interval_secs"));
        }

        if self.results.sink == SinkKind::Http {
            if self.results.endpoint.as_deref().is_none_or(str::is_empty) {
                return Err(ConfigError::MissingEndpoint);
            }
            if self.results.timeout_secs == 0 {
                return Err(ConfigError::Zero("results.timeout_secs"));
            }
        }

        Ok(())
    }

    /// Load config from `wordrace.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("wordrace.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from wordrace.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse wordrace.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No wordrace.toml found, using defaults");
                ServerConfig::default()
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Apply `WORDRACE_*` overrides from a variable lookup.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v| !v.is_empty());

        if let Some(addr) = non_empty("WORDRACE_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(root) = non_empty("WORDRACE_WEB_ROOT") {
            self.web_root = root;
        }
        if let Some(token) = non_empty("WORDRACE_API_TOKEN") {
            self.auth.bearer_token = Some(token);
        }
        if let Some(endpoint) = non_empty("WORDRACE_RESULTS_ENDPOINT") {
            self.results.endpoint = Some(endpoint);
            self.results.sink = SinkKind::Http;
        }
        if let Some(token) = non_empty("WORDRACE_RESULTS_TOKEN") {
            self.results.bearer_token = Some(token);
        }
        if let Some(n) = non_empty("WORDRACE_MAX_WS_CONNECTIONS").and_then(|v| v.parse().ok()) {
            self.limits.max_ws_connections = n;
        }
        if let Some(n) = non_empty("WORDRACE_WS_RATE_LIMIT").and_then(|v| v.parse().ok()) {
            self.limits.ws_rate_limit_per_sec = n;
        }
    }
}
