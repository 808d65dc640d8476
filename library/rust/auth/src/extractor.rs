//! Authorization ヘッダーからの Bearer トークン取り出し。

use http::{header::AUTHORIZATION, HeaderMap};

use crate::error::AuthError;

/// Bearer トークンを Authorization ヘッダーから取得する。
///
/// ヘッダー値は空白 1 文字で区切って厳密に 2 要素でなければならず、
/// 先頭要素は大文字小文字を区別せず `bearer` であること。
/// トークン部分はデコードせずそのまま返す。
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let parts: Vec<&str> = value.split(' ').collect();
    let [scheme, token] = parts.as_slice() else {
        return Err(AuthError::MalformedHeader);
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingBearerPrefix);
    }

    Ok(*token)
}
