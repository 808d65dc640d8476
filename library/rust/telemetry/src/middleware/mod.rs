use std::sync::Arc;

use crate::metrics::Metrics;

#[cfg(any(feature = "axum-layer", test))]
mod http_layer;

#[cfg(any(feature = "axum-layer", test))]
pub use http_layer::MetricsLayer;

/// ルーティングに一致しなかったリクエストの path ラベル。
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// 標準外のメソッドに使う method ラベル。
pub const OTHER_METHOD: &str = "OTHER";

const KNOWN_METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "CONNECT", "TRACE",
];

/// RequestLabels はメトリクスに付けるラベルの組。
/// path にはリクエスト URI ではなくルートのテンプレート（`/drinks/{id}`）を使い、
/// 系列数がルート定義の数で頭打ちになるようにする。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLabels {
    pub method: &'static str,
    pub route: String,
}

impl RequestLabels {
    /// route が None の場合（fallback 到達）は UNMATCHED_ROUTE になる。
    pub fn new(method: &str, route: Option<&str>) -> Self {
        Self {
            method: method_label(method),
            route: route.unwrap_or(UNMATCHED_ROUTE).to_string(),
        }
    }
}

/// 標準メソッドはそのまま、それ以外は OTHER_METHOD にまとめる。
pub fn method_label(method: &str) -> &'static str {
    KNOWN_METHODS
        .iter()
        .find(|known| **known == method)
        .copied()
        .unwrap_or(OTHER_METHOD)
}

/// TelemetryMiddleware はレスポンス完了時にメトリクスと構造化ログを記録する。
#[derive(Clone)]
pub struct TelemetryMiddleware {
    metrics: Arc<Metrics>,
}

impl TelemetryMiddleware {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    pub fn on_response(&self, labels: &RequestLabels, status: u16, duration_secs: f64) {
        self.metrics
            .record_http_request(labels.method, &labels.route, &status.to_string());
        self.metrics
            .record_http_duration(labels.method, &labels.route, duration_secs);

        if status >= 500 {
            tracing::error!(
                http.method = labels.method,
                http.route = %labels.route,
                http.status_code = status,
                duration_secs,
                "request failed"
            );
        } else {
            tracing::debug!(
                http.method = labels.method,
                http.route = %labels.route,
                http.status_code = status,
                duration_secs,
                "request completed"
            );
        }
    }

    /// 内側のサービスがエラーを返した場合。レスポンスが無いので status は "error"。
    pub fn on_error(&self, labels: &RequestLabels, duration_secs: f64) {
        self.metrics
            .record_http_request(labels.method, &labels.route, "error");
        self.metrics
            .record_http_duration(labels.method, &labels.route, duration_secs);
        tracing::error!(
            http.method = labels.method,
            http.route = %labels.route,
            duration_secs,
            "request errored before producing a response"
        );
    }
}
