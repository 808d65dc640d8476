use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// JWKS_PATH は発行者が公開鍵セットを公開する well-known パス。
const JWKS_PATH: &str = "/.well-known/jwks.json";

/// JWKS エンドポイントを模擬する HTTP サーバー。
///
/// 実ソケットで待ち受けるため、HTTP フェッチャーのテストに使う。
pub struct JwksMockServer {
    server: MockServer,
}

impl JwksMockServer {
    /// 指定の JWKS ドキュメントを 200 で返すサーバーを起動する。
    pub async fn start(jwks: serde_json::Value) -> Self {
        Self::start_with(ResponseTemplate::new(200).set_body_json(jwks)).await
    }

    /// 任意のステータスと本文を返すサーバーを起動する。
    pub async fn start_with_status(status: u16, body: &str) -> Self {
        Self::start_with(ResponseTemplate::new(status).set_body_string(body)).await
    }

    /// 応答を `delay` だけ遅延させるサーバーを起動する。タイムアウト検証用。
    pub async fn start_delayed(jwks: serde_json::Value, delay: std::time::Duration) -> Self {
        Self::start_with(
            ResponseTemplate::new(200)
                .set_body_json(jwks)
                .set_delay(delay),
        )
        .await
    }

    async fn start_with(template: ResponseTemplate) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(template)
            .mount(&server)
            .await;
        Self { server }
    }

    /// JWKS の完全な URL を返す。
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// これまでに受け付けたリクエスト数を返す。
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}
