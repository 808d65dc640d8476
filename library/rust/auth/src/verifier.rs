//! トークン検証。鍵選択、アルゴリズム制限、署名・クレーム検証を行う。

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{
    decode, decode_header, errors::ErrorKind, get_current_timestamp, Algorithm, DecodingKey,
    Validation,
};
use tracing::debug;

use crate::claims::Claims;
use crate::config::{AuthConfig, AuthConfigError};
use crate::error::{AuthError, AUTHORIZATION_MALFORMED};
use crate::jwks::{HttpJwksFetcher, JwkKey, JwksFetcher, KeyResolver, KeySet};

/// 発行者ドメインから期待する iss を組み立てる。
pub fn issuer_for(domain: &str) -> String {
    format!("https://{domain}/")
}

/// RSA 系アルゴリズム（RS*/PS*）かどうか。
pub fn is_rsa_family(alg: Algorithm) -> bool {
    matches!(
        alg,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
    )
}

/// TokenVerifier は与えられた鍵セットに対してトークンを検証する。ネットワークには触れない。
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    issuer: String,
    audience: String,
    algorithms: Vec<Algorithm>,
}

impl TokenVerifier {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        algorithms: Vec<Algorithm>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            algorithms,
        }
    }

    /// トークンを検証し、デコード済みの Claims を返す。
    pub fn verify(&self, token: &str, keys: &KeySet) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::unable_to_parse())?;
        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| AuthError::InvalidHeader(AUTHORIZATION_MALFORMED.to_string()))?;

        let key = keys.find(kid).ok_or(AuthError::KeyNotFound)?;

        // ヘッダーの alg は許可リストかつ RSA 系に限る
        if !self.algorithms.contains(&header.alg) || !is_rsa_family(header.alg) {
            debug!(alg = ?header.alg, kid, "rejected token algorithm");
            return Err(AuthError::unable_to_parse());
        }
        let decoding_key = rsa_decoding_key(key)?;

        // 期限切れは署名の正否に関係なく TokenExpired にする
        if unverified_exp(token).is_some_and(is_past) {
            return Err(AuthError::TokenExpired);
        }

        let mut validation = Validation::new(header.alg);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidAudience
                | ErrorKind::InvalidIssuer
                | ErrorKind::MissingRequiredClaim(_) => AuthError::InvalidClaims,
                _ => {
                    debug!(error = %e, kid, "token verification failed");
                    AuthError::unable_to_parse()
                }
            })
    }
}

fn rsa_decoding_key(key: &JwkKey) -> Result<DecodingKey, AuthError> {
    if key.kty != "RSA" {
        return Err(AuthError::unable_to_parse());
    }
    let (Some(n), Some(e)) = (key.n.as_deref(), key.e.as_deref()) else {
        return Err(AuthError::unable_to_parse());
    };
    DecodingKey::from_rsa_components(n, e).map_err(|_| AuthError::unable_to_parse())
}

/// 署名未検証のペイロードから exp を読む。小数の exp も受け付ける。読めない場合は None。
fn unverified_exp(token: &str) -> Option<f64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    value.get("exp")?.as_f64()
}

#[allow(clippy::cast_precision_loss)]
fn is_past(exp: f64) -> bool {
    exp < get_current_timestamp() as f64
}

/// JwksVerifier は KeyResolver と TokenVerifier を組み合わせた検証器。
///
/// 未知の kid に当たった場合は鍵セットを一度だけ再取得して検証し直す。
pub struct JwksVerifier {
    resolver: KeyResolver,
    verifier: TokenVerifier,
}

impl JwksVerifier {
    pub fn from_parts(resolver: KeyResolver, verifier: TokenVerifier) -> Self {
        Self { resolver, verifier }
    }

    /// 設定から HTTP フェッチャー付きの検証器を生成する。
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthConfigError> {
        let fetcher = HttpJwksFetcher::new(Duration::from_secs(config.jwks_timeout_secs))
            .map_err(|e| AuthConfigError::HttpClient(e.to_string()))?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// 任意のフェッチャーで検証器を生成する。
    pub fn with_fetcher(
        config: &AuthConfig,
        fetcher: Arc<dyn JwksFetcher>,
    ) -> Result<Self, AuthConfigError> {
        config.validate()?;
        let algorithms = config.parsed_algorithms()?;

        let resolver = KeyResolver::new(
            config.jwks_url(),
            Duration::from_secs(config.jwks_cache_ttl_secs),
            fetcher,
        )
        .with_min_refresh_interval(Duration::from_secs(config.jwks_min_refresh_interval_secs));
        let verifier = TokenVerifier::new(config.issuer(), config.audience.clone(), algorithms);

        Ok(Self::from_parts(resolver, verifier))
    }

    /// トークンを検証し、Claims を返す。
    pub async fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let keys = self.resolver.resolve().await?;

        match self.verifier.verify(token, &keys) {
            Err(AuthError::KeyNotFound) => match self.resolver.refresh().await? {
                Some(fresh) => {
                    debug!("retrying verification with refreshed JWKS");
                    self.verifier.verify(token, &fresh)
                }
                None => Err(AuthError::KeyNotFound),
            },
            other => other,
        }
    }
}
