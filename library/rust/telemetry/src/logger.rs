//! ログレベルのユーティリティ。
//!
//! # 使用例
//!
//! ```ignore
//! use tracing::{info, warn};
//!
//! info!(drink_id = 1, "drink created");
//! warn!(code = "permission_denied", path = "/drinks", "request rejected");
//! ```

/// default_log_level は環境名からデフォルトのログレベルを決める。
///
/// - dev: debug
/// - staging: info
/// - それ以外: warn
pub fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "dev" => "debug",
        "staging" => "info",
        _ => "warn",
    }
}

/// parse_log_level はログレベル文字列を tracing の Level に変換する。
/// 未知の文字列は None。
pub fn parse_log_level(level: &str) -> Option<tracing::Level> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Some(tracing::Level::TRACE),
        "debug" => Some(tracing::Level::DEBUG),
        "info" => Some(tracing::Level::INFO),
        "warn" => Some(tracing::Level::WARN),
        "error" => Some(tracing::Level::ERROR),
        _ => None,
    }
}
