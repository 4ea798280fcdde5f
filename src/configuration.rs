use config::ConfigError;

use crate::csrf::DEFAULT_TOKEN_TTL_SECONDS;
use crate::url_validator::DEFAULT_ALLOWED_DOMAINS;

#[derive(serde::Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub rate_limit: RateLimitSettings,
    pub csrf: CsrfSettings,
    pub https: HttpsSettings,
    pub outbound: OutboundSettings,
    pub uploads: UploadSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// JSON payload limit in bytes
    pub max_body_bytes: usize,
    /// Trust `X-Forwarded-*` headers from a reverse proxy
    pub trust_proxy: bool,
}

/// Window and ceiling for one rate-limited route group
#[derive(serde::Deserialize, Clone, Copy, Debug)]
pub struct RateLimitRule {
    pub window_ms: u64,
    pub max_requests: u32,
}

#[derive(serde::Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RateLimitSettings {
    pub api: RateLimitRule,
    pub files: RateLimitRule,
}

#[derive(serde::Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CsrfSettings {
    pub token_ttl_seconds: i64,
    /// Public endpoints that never carry a session
    pub exempt_paths: Vec<String>,
}

#[derive(serde::Deserialize, Clone, Debug)]
#[serde(default)]
pub struct HttpsSettings {
    pub enabled: bool,
    /// Health-check style endpoints served over plain HTTP
    pub excluded_paths: Vec<String>,
    /// Paths that produce a warning when reached over plain HTTP
    pub sensitive_paths: Vec<String>,
}

#[derive(serde::Deserialize, Clone, Debug)]
#[serde(default)]
pub struct OutboundSettings {
    pub allowed_domains: Vec<String>,
}

#[derive(serde::Deserialize, Clone, Debug)]
#[serde(default)]
pub struct UploadSettings {
    pub directory: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_body_bytes: 64 * 1024,
            trust_proxy: false,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            api: RateLimitRule {
                window_ms: 60_000,
                max_requests: 100,
            },
            files: RateLimitRule {
                window_ms: 60_000,
                max_requests: 30,
            },
        }
    }
}

impl Default for CsrfSettings {
    fn default() -> Self {
        Self {
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            exempt_paths: vec!["/health_check".to_string(), "/csrf-token".to_string()],
        }
    }
}

impl Default for HttpsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            excluded_paths: vec!["/health_check".to_string()],
            sensitive_paths: vec!["/csrf-token".to_string(), "/api/posts".to_string()],
        }
    }
}

impl Default for OutboundSettings {
    fn default() -> Self {
        Self {
            allowed_domains: DEFAULT_ALLOWED_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            directory: "./uploads".to_string(),
        }
    }
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Loads `configuration.{yaml,toml,json}` if present, then `APP_*` environment overrides
/// (`APP_HTTPS__ENABLED=true`, `APP_APPLICATION__PORT=9000`, ...)
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("csrf.exempt_paths")
                .with_list_parse_key("https.excluded_paths")
                .with_list_parse_key("https.sensitive_paths")
                .with_list_parse_key("outbound.allowed_domains"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
