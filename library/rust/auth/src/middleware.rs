//! axum 用の認可ミドルウェア。

use std::sync::Arc;

use axum::{body::Body, extract::Request, middleware::Next, response::Response};
use http::HeaderMap;
use tracing::warn;

use crate::claims::Claims;
use crate::error::AuthError;
use crate::extractor::extract_bearer_token;
use crate::permission::check_permission;
use crate::verifier::JwksVerifier;

/// ミドルウェアファクトリの戻り値型。
type AuthMiddlewareFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>;

/// AuthState はミドルウェアが使用する共有状態。
#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<JwksVerifier>,
}

impl AuthState {
    pub fn new(verifier: Arc<JwksVerifier>) -> Self {
        Self { verifier }
    }

    /// ヘッダーから Claims を取り出し、権限を確認する。
    ///
    /// トークン取り出し、鍵セット解決と検証、権限確認の順に進み、最初の失敗で止まる。
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        permission: &str,
    ) -> Result<Claims, AuthError> {
        let token = extract_bearer_token(headers)?;
        let claims = self.verifier.verify_token(token).await?;
        check_permission(permission, &claims)?;
        Ok(claims)
    }
}

/// require_permission は指定権限を必須とするミドルウェアファクトリ。
///
/// 認可に成功すると Claims をリクエストエクステンションに格納してハンドラを呼ぶ。
/// ハンドラ側では `Extension<Claims>` で受け取る。
pub fn require_permission(
    state: AuthState,
    permission: &'static str,
) -> impl Fn(Request<Body>, Next) -> AuthMiddlewareFuture + Clone {
    move |mut req: Request<Body>, next: Next| {
        let state = state.clone();
        Box::pin(async move {
            let claims = match state.authorize(req.headers(), permission).await {
                Ok(claims) => claims,
                Err(e) => {
                    warn!(
                        code = e.code(),
                        error = %e,
                        permission,
                        method = %req.method(),
                        path = %req.uri().path(),
                        "request rejected"
                    );
                    return Err(e);
                }
            };

            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        })
    }
}
