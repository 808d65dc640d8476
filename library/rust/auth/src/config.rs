//! 認証設定。

use std::str::FromStr;

use jsonwebtoken::Algorithm;
use serde::Deserialize;

use crate::jwks;
use crate::verifier::{is_rsa_family, issuer_for};

/// AuthConfig は発行者・オーディエンス・許可アルゴリズムと JWKS 取得の設定。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthConfig {
    /// 発行者ドメイン（例: `fsndproject.au.auth0.com`）
    pub domain: String,
    pub audience: String,
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<String>,
    /// 0 の場合は検証のたびに JWKS を取得する
    #[serde(default = "default_jwks_cache_ttl_secs")]
    pub jwks_cache_ttl_secs: u64,
    #[serde(default = "default_jwks_timeout_secs")]
    pub jwks_timeout_secs: u64,
    #[serde(default = "default_jwks_min_refresh_interval_secs")]
    pub jwks_min_refresh_interval_secs: u64,
}

fn default_algorithms() -> Vec<String> {
    vec!["RS256".to_string()]
}

fn default_jwks_cache_ttl_secs() -> u64 {
    300
}

fn default_jwks_timeout_secs() -> u64 {
    10
}

fn default_jwks_min_refresh_interval_secs() -> u64 {
    10
}

/// AuthConfigError は認証設定の不備を表す。
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthConfigError {
    #[error("auth.domain must not be empty")]
    EmptyDomain,

    #[error("auth.audience must not be empty")]
    EmptyAudience,

    #[error("auth.algorithms must contain at least one algorithm")]
    NoAlgorithms,

    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("algorithm {0} is not an RSA signature algorithm")]
    UnsupportedAlgorithm(String),

    #[error("failed to build JWKS HTTP client: {0}")]
    HttpClient(String),
}

impl AuthConfig {
    pub fn new(domain: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            audience: audience.into(),
            algorithms: default_algorithms(),
            jwks_cache_ttl_secs: default_jwks_cache_ttl_secs(),
            jwks_timeout_secs: default_jwks_timeout_secs(),
            jwks_min_refresh_interval_secs: default_jwks_min_refresh_interval_secs(),
        }
    }

    /// 期待する iss（`https://{domain}/`）。
    pub fn issuer(&self) -> String {
        issuer_for(&self.domain)
    }

    pub fn jwks_url(&self) -> String {
        jwks::jwks_url(&self.domain)
    }

    /// algorithms を jsonwebtoken の Algorithm に変換する。RSA 系以外はエラー。
    pub fn parsed_algorithms(&self) -> Result<Vec<Algorithm>, AuthConfigError> {
        if self.algorithms.is_empty() {
            return Err(AuthConfigError::NoAlgorithms);
        }
        self.algorithms
            .iter()
            .map(|name| {
                let alg = Algorithm::from_str(name.trim())
                    .map_err(|_| AuthConfigError::UnknownAlgorithm(name.clone()))?;
                if !is_rsa_family(alg) {
                    return Err(AuthConfigError::UnsupportedAlgorithm(name.clone()));
                }
                Ok(alg)
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), AuthConfigError> {
        if self.domain.trim().is_empty() {
            return Err(AuthConfigError::EmptyDomain);
        }
        if self.audience.trim().is_empty() {
            return Err(AuthConfigError::EmptyAudience);
        }
        self.parsed_algorithms().map(|_| ())
    }

    /// `RS256,RS384` 形式または `["RS256"]` 形式のアルゴリズム指定を分解する。
    pub fn parse_algorithm_list(raw: &str) -> Vec<String> {
        let raw = raw.trim();
        if raw.starts_with('[') {
            if let Ok(list) = serde_json::from_str::<Vec<String>>(raw) {
                return list;
            }
        }
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}
