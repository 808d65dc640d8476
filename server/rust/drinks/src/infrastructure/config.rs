use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;

use coffee_auth::{AuthConfig, AuthConfigError};
use coffee_telemetry::logger::{default_log_level, parse_log_level};
use coffee_telemetry::TelemetryConfig;

use super::database::DatabaseConfig;

/// ConfigError は設定ファイルの読み込み・検証エラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid auth config: {0}")]
    Auth(#[from] AuthConfigError),

    #[error("unknown log level: {0}")]
    LogLevel(String),

    #[error("unknown log format: {0} (expected json or text)")]
    LogFormat(String),
}

/// Application configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// DATABASE_URL による上書き。database セクションより優先する
    #[serde(skip)]
    database_url_override: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// ObservabilityConfig はログ・トレースの設定。
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// 未指定の場合は環境名から決める
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default)]
    pub trace_endpoint: Option<String>,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: None,
            log_format: default_log_format(),
            trace_endpoint: None,
            sample_rate: default_sample_rate(),
        }
    }
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_sample_rate() -> f64 {
    1.0
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// 設定ファイルを読み込み、環境変数で上書きしてから検証する。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut cfg = Self::from_yaml(&content)?;
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// lookup で得られた値で設定を上書きする。空文字列は未設定として扱う。
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(domain) = get("AUTH_DOMAIN") {
            self.auth.domain = domain;
        }
        if let Some(audience) = get("API_AUDIENCE") {
            self.auth.audience = audience;
        }
        if let Some(algorithms) = get("ALGORITHMS") {
            self.auth.algorithms = AuthConfig::parse_algorithm_list(&algorithms);
        }
        if let Some(url) = get("DATABASE_URL") {
            self.database_url_override = Some(SecretString::new(url));
        }
        if let Some(environment) = get("ENVIRONMENT") {
            self.app.environment = environment;
        }
        if let Some(endpoint) = get("OTEL_EXPORTER_OTLP_ENDPOINT") {
            self.observability.trace_endpoint = Some(endpoint);
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.observability.log_level = Some(level);
        }
        if let Some(format) = get("LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.validate()?;

        if let Some(ref level) = self.observability.log_level {
            if parse_log_level(level).is_none() {
                return Err(ConfigError::LogLevel(level.clone()));
            }
        }

        match self.observability.log_format.as_str() {
            "json" | "text" => Ok(()),
            other => Err(ConfigError::LogFormat(other.to_string())),
        }
    }

    /// 接続オプション。DATABASE_URL が設定されていればそちらを優先する。
    /// どちらも無ければ None（インメモリリポジトリを使う）。
    pub fn database_options(&self) -> Result<Option<PgConnectOptions>, sqlx::Error> {
        if let Some(ref url) = self.database_url_override {
            return url.expose_secret().parse().map(Some);
        }
        self.database
            .as_ref()
            .map(DatabaseConfig::connect_options)
            .transpose()
    }

    pub fn max_connections(&self) -> u32 {
        self.database.as_ref().map_or(25, |db| db.max_open_conns)
    }

    pub fn reset_on_startup(&self) -> bool {
        self.database.as_ref().is_some_and(|db| db.reset_on_startup)
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        let log_level = self
            .observability
            .log_level
            .clone()
            .unwrap_or_else(|| default_log_level(&self.app.environment).to_string());

        TelemetryConfig {
            service_name: self.app.name.clone(),
            version: self.app.version.clone(),
            environment: self.app.environment.clone(),
            trace_endpoint: self.observability.trace_endpoint.clone(),
            sample_rate: self.observability.sample_rate,
            log_level,
            log_format: self.observability.log_format.clone(),
        }
    }
}
