//! 権限チェック。

use crate::claims::Claims;
use crate::error::AuthError;

/// Claims が指定の権限を持っているか。完全一致（大文字小文字を区別）で判定する。
pub fn has_permission(claims: &Claims, permission: &str) -> bool {
    claims.permission_list().iter().any(|p| p == permission)
}

/// 必要な権限を確認する。
///
/// 空文字の権限は常に許可する。permissions クレームが無いトークンでも同様。
pub fn check_permission(required: &str, claims: &Claims) -> Result<(), AuthError> {
    if required.is_empty() {
        return Ok(());
    }

    let permissions = claims
        .permissions
        .as_ref()
        .ok_or(AuthError::MissingPermissionsClaim)?;

    if permissions.iter().any(|p| p == required) {
        Ok(())
    } else {
        Err(AuthError::PermissionDenied)
    }
}
