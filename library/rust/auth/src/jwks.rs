//! JWKS の取得と鍵セットキャッシュ。

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::AuthError;

/// 未知の kid による強制再取得の最短間隔のデフォルト。
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// 発行者ドメインから JWKS の URL を組み立てる。
pub fn jwks_url(domain: &str) -> String {
    format!("https://{domain}/.well-known/jwks.json")
}

/// 個々の JWK 鍵。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JwkKey {
    #[serde(default)]
    pub kid: Option<String>,
    pub kty: String,
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
    /// RSA modulus (base64url)
    #[serde(default)]
    pub n: Option<String>,
    /// RSA exponent (base64url)
    #[serde(default)]
    pub e: Option<String>,
}

/// KeySet は JWKS エンドポイントのレスポンス。鍵の順序を保持する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KeySet {
    pub keys: Vec<JwkKey>,
}

impl KeySet {
    pub fn new(keys: Vec<JwkKey>) -> Self {
        Self { keys }
    }

    /// kid が一致する最初の鍵を返す。kid の重複は想定しない。
    pub fn find(&self, kid: &str) -> Option<&JwkKey> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// JwksFetcher は JWKS エンドポイントからの鍵取得を抽象化するトレイト。
#[async_trait::async_trait]
pub trait JwksFetcher: Send + Sync {
    async fn fetch_keys(&self, jwks_url: &str) -> Result<KeySet, AuthError>;
}

/// HttpJwksFetcher は HTTP 経由で JWKS を取得するデフォルト実装。
pub struct HttpJwksFetcher {
    client: reqwest::Client,
}

impl HttpJwksFetcher {
    /// タイムアウト付きの HTTP クライアントでフェッチャーを生成する。
    pub fn new(timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::KeySetUnavailable(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl JwksFetcher for HttpJwksFetcher {
    async fn fetch_keys(&self, jwks_url: &str) -> Result<KeySet, AuthError> {
        let unavailable = |e: reqwest::Error| AuthError::KeySetUnavailable(e.to_string());

        self.client
            .get(jwks_url)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json::<KeySet>()
            .await
            .map_err(unavailable)
    }
}

struct CachedKeySet {
    keys: Arc<KeySet>,
    fetched_at: Instant,
}

/// KeyResolver は鍵セットを取得し、TTL の範囲でキャッシュする。
///
/// `cache_ttl` が 0 の場合は検証のたびに取得し直す。
/// フェッチ中はロックを保持しない。同時ミスによる重複フェッチは許容する。
pub struct KeyResolver {
    jwks_url: String,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
    cache: RwLock<Option<CachedKeySet>>,
    fetcher: Arc<dyn JwksFetcher>,
}

impl KeyResolver {
    pub fn new(
        jwks_url: impl Into<String>,
        cache_ttl: Duration,
        fetcher: Arc<dyn JwksFetcher>,
    ) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            cache_ttl,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            cache: RwLock::new(None),
            fetcher,
        }
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// 鍵セットを返す。キャッシュが TTL 内ならそれを使う。
    pub async fn resolve(&self) -> Result<Arc<KeySet>, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(ref c) = *cache {
                if c.fetched_at.elapsed() < self.cache_ttl {
                    debug!("JWKS cache hit");
                    return Ok(c.keys.clone());
                }
            }
        }

        self.fetch_and_store().await
    }

    /// 鍵ローテーションに備えて強制的に再取得する。
    ///
    /// 直近の取得から `min_refresh_interval` 未満の場合は取得せず `None` を返す。
    pub async fn refresh(&self) -> Result<Option<Arc<KeySet>>, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(ref c) = *cache {
                if c.fetched_at.elapsed() < self.min_refresh_interval {
                    debug!("JWKS refresh skipped: fetched recently");
                    return Ok(None);
                }
            }
        }

        self.fetch_and_store().await.map(Some)
    }

    /// キャッシュを無効化する。
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    async fn fetch_and_store(&self) -> Result<Arc<KeySet>, AuthError> {
        debug!(jwks_url = %self.jwks_url, "fetching JWKS");
        let keys = match self.fetcher.fetch_keys(&self.jwks_url).await {
            Ok(keys) => Arc::new(keys),
            Err(e) => {
                warn!(jwks_url = %self.jwks_url, error = %e, "failed to fetch JWKS");
                return Err(e);
            }
        };

        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeySet {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffee_test_helper::{JwksMockServer, JwtTestHelper, TEST_KID};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(kid: &str, n: &str) -> JwkKey {
        JwkKey {
            kid: Some(kid.into()),
            kty: "RSA".into(),
            key_use: Some("sig".into()),
            n: Some(n.into()),
            e: Some("AQAB".into()),
        }
    }

    /// フェッチ回数を記録するフェッチャー。
    struct CountingFetcher {
        keys: KeySet,
        count: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl JwksFetcher for CountingFetcher {
        async fn fetch_keys(&self, _jwks_url: &str) -> Result<KeySet, AuthError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(self.keys.clone())
        }
    }

    struct FailingFetcher;

    #[async_trait::async_trait]
    impl JwksFetcher for FailingFetcher {
        async fn fetch_keys(&self, _jwks_url: &str) -> Result<KeySet, AuthError> {
            Err(AuthError::KeySetUnavailable("connection refused".into()))
        }
    }

    fn counting_resolver(cache_ttl: Duration) -> (KeyResolver, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let fetcher = CountingFetcher {
            keys: KeySet::new(vec![key("k1", "n1")]),
            count: count.clone(),
        };
        let resolver = KeyResolver::new(
            "https://fsndproject.au.auth0.com/.well-known/jwks.json",
            cache_ttl,
            Arc::new(fetcher),
        );
        (resolver, count)
    }

    #[test]
    fn test_jwks_url() {
        assert_eq!(
            jwks_url("fsndproject.au.auth0.com"),
            "https://fsndproject.au.auth0.com/.well-known/jwks.json"
        );
    }

    #[test]
    fn test_find_returns_first_match() {
        let set = KeySet::new(vec![key("dup", "first"), key("dup", "second"), key("k2", "n2")]);
        assert_eq!(set.find("dup").unwrap().n.as_deref(), Some("first"));
        assert!(set.find("missing").is_none());
    }

    #[test]
    fn test_deserialize_ignores_unknown_fields() {
        let set: KeySet = serde_json::from_value(serde_json::json!({
            "keys": [
                {"kid": "k1", "kty": "RSA", "use": "sig", "alg": "RS256", "n": "abc", "e": "AQAB", "x5c": ["..."]},
                {"kty": "EC", "crv": "P-256", "x": "x", "y": "y"}
            ]
        }))
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.keys[0].key_use.as_deref(), Some("sig"));
        assert!(set.keys[1].kid.is_none());
        assert!(set.keys[1].n.is_none());
    }

    #[tokio::test]
    async fn test_resolve_uses_cache_within_ttl() {
        let (resolver, count) = counting_resolver(Duration::from_secs(600));

        resolver.resolve().await.unwrap();
        resolver.resolve().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_fetches_every_time() {
        let (resolver, count) = counting_resolver(Duration::ZERO);

        resolver.resolve().await.unwrap();
        resolver.resolve().await.unwrap();
        resolver.resolve().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_refresh_skipped_when_recent() {
        let (resolver, count) = counting_resolver(Duration::from_secs(600));

        resolver.resolve().await.unwrap();
        assert!(resolver.refresh().await.unwrap().is_none());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_refetches_after_interval() {
        let (resolver, count) = counting_resolver(Duration::from_secs(600));
        let resolver = resolver.with_min_refresh_interval(Duration::ZERO);

        resolver.resolve().await.unwrap();
        let refreshed = resolver.refresh().await.unwrap();
        assert!(refreshed.is_some());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_cache() {
        let (resolver, count) = counting_resolver(Duration::from_secs(600));

        resolver.resolve().await.unwrap();
        resolver.invalidate().await;
        resolver.resolve().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_cached() {
        let resolver = KeyResolver::new("https://x/", Duration::from_secs(600), Arc::new(FailingFetcher));

        let err = resolver.resolve().await.unwrap_err();
        assert!(matches!(err, AuthError::KeySetUnavailable(_)));
        // 失敗はキャッシュされないので、次回も取得を試みる
        assert!(resolver.resolve().await.is_err());
    }

    #[tokio::test]
    async fn test_http_fetcher_parses_key_set() {
        let server = JwksMockServer::start(JwtTestHelper::shared().jwks()).await;
        let fetcher = HttpJwksFetcher::new(Duration::from_secs(5)).unwrap();

        let set = fetcher.fetch_keys(&server.jwks_url()).await.unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.keys[0].kid.as_deref(), Some(TEST_KID));
        assert_eq!(set.keys[0].kty, "RSA");
    }

    #[tokio::test]
    async fn test_http_fetcher_error_status() {
        let server = JwksMockServer::start_with_status(500, "boom").await;
        let fetcher = HttpJwksFetcher::new(Duration::from_secs(5)).unwrap();

        let err = fetcher.fetch_keys(&server.jwks_url()).await.unwrap_err();
        assert!(matches!(err, AuthError::KeySetUnavailable(_)));
    }

    #[tokio::test]
    async fn test_http_fetcher_invalid_body() {
        let server = JwksMockServer::start_with_status(200, "<html>not json</html>").await;
        let fetcher = HttpJwksFetcher::new(Duration::from_secs(5)).unwrap();

        let err = fetcher.fetch_keys(&server.jwks_url()).await.unwrap_err();
        assert!(matches!(err, AuthError::KeySetUnavailable(_)));
    }

    #[tokio::test]
    async fn test_http_fetcher_timeout() {
        let server = JwksMockServer::start_delayed(
            JwtTestHelper::shared().jwks(),
            Duration::from_millis(500),
        )
        .await;
        let fetcher = HttpJwksFetcher::new(Duration::from_millis(50)).unwrap();

        let err = fetcher.fetch_keys(&server.jwks_url()).await.unwrap_err();
        assert!(matches!(err, AuthError::KeySetUnavailable(_)));
    }
}
