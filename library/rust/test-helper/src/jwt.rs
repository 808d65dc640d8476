use std::sync::OnceLock;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::rngs::OsRng;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};

/// 共有テスト鍵の kid。
pub const TEST_KID: &str = "test-key-1";
/// JWKS に載らない別鍵の kid。
pub const OTHER_KID: &str = "other-key-1";

/// テスト用 JWT クレーム。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestClaims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl Default for TestClaims {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            sub: "auth0|barista".to_string(),
            iss: String::new(),
            aud: String::new(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
            permissions: None,
        }
    }
}

impl TestClaims {
    /// 発行者とオーディエンスを指定して、1 時間有効なクレームを生成する。
    pub fn new(issuer: &str, audience: &str) -> Self {
        Self {
            iss: issuer.to_string(),
            aud: audience.to_string(),
            ..Default::default()
        }
    }

    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = Some(permissions.iter().map(ToString::to_string).collect());
        self
    }

    /// 1 時間前に期限切れになったクレームに書き換える。
    pub fn expired(mut self) -> Self {
        let now = Utc::now();
        self.iat = (now - Duration::hours(2)).timestamp();
        self.exp = (now - Duration::hours(1)).timestamp();
        self
    }
}

/// RS256 でテストトークンを署名するヘルパー。
///
/// 2048 bit 鍵の生成は遅いため、通常は `shared()` / `other()` のプロセス共有インスタンスを使う。
pub struct JwtTestHelper {
    kid: String,
    encoding_key: EncodingKey,
    n: String,
    e: String,
}

impl JwtTestHelper {
    /// 新しい RSA 鍵ペアを生成する。
    pub fn new(kid: &str) -> Self {
        let private_key =
            RsaPrivateKey::new(&mut OsRng, 2048).expect("failed to generate RSA key");
        let public_key = private_key.to_public_key();

        let pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("failed to encode RSA key as PEM");
        let encoding_key =
            EncodingKey::from_rsa_pem(pem.as_bytes()).expect("failed to load RSA PEM");

        Self {
            kid: kid.to_string(),
            encoding_key,
            n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        }
    }

    /// `TEST_KID` の共有鍵。
    pub fn shared() -> &'static Self {
        static SHARED: OnceLock<JwtTestHelper> = OnceLock::new();
        SHARED.get_or_init(|| Self::new(TEST_KID))
    }

    /// `OTHER_KID` の共有鍵。JWKS に載せない鍵として使う。
    pub fn other() -> &'static Self {
        static OTHER: OnceLock<JwtTestHelper> = OnceLock::new();
        OTHER.get_or_init(|| Self::new(OTHER_KID))
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// 公開鍵を JWK 形式で返す。
    pub fn jwk(&self) -> serde_json::Value {
        serde_json::json!({
            "kid": self.kid,
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "n": self.n,
            "e": self.e,
        })
    }

    /// この鍵だけを含む JWKS ドキュメントを返す。
    pub fn jwks(&self) -> serde_json::Value {
        serde_json::json!({ "keys": [self.jwk()] })
    }

    /// 自身の kid を付けて RS256 で署名する。
    pub fn sign<T: Serialize>(&self, claims: &T) -> String {
        self.sign_as(&self.kid, claims)
    }

    /// 任意の kid を名乗って署名する。署名不一致のトークンを作るのに使う。
    pub fn sign_as<T: Serialize>(&self, kid: &str, claims: &T) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        self.sign_with_header(&header, claims)
    }

    pub fn sign_with_header<T: Serialize>(&self, header: &Header, claims: &T) -> String {
        encode(header, claims, &self.encoding_key).expect("failed to sign test token")
    }
}

/// 署名部分がダミーの compact JWS を組み立てる。
///
/// ヘッダー解析や kid 探索など、署名検証より前の段階をテストするのに使う。
pub fn unsigned_token(header: &serde_json::Value, claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(header.to_string());
    let claims = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{claims}.c2lnbmF0dXJl")
}
