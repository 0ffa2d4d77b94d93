//! Bearer token authentication middleware.
//!
//! Every request under `/api` must carry `Authorization: Bearer <token>`.
//! The token is hashed with SHA-256 and looked up among the active
//! operator tokens; on success an [`AuthContext`] is attached to the request.

use crate::{db::DbPool, error::AppError, models::api_token::ApiToken};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Authentication context attached to authenticated requests.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// ID of the token used for this request
    pub token_id: Uuid,

    /// Name of the operator the token was issued to
    pub operador: String,
}

/// Hex-encoded SHA-256 of a raw token, as stored in `api_tokens.token_hash`.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extract the token from an `Authorization` header value.
fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Authentication middleware.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>`
/// 2. Hash the token with SHA-256
/// 3. Look up an active token with that hash
/// 4. Insert `AuthContext` and continue, or return 401
pub async fn auth_middleware(
    State(pool): State<DbPool>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AppError::Unauthorized)?;

    let token_hash = hash_token(token);

    let record = sqlx::query_as::<_, ApiToken>(
        "SELECT id, token_hash, operador, created_at, ativo
         FROM api_tokens
         WHERE token_hash = $1 AND ativo = true",
    )
    .bind(&token_hash)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    tracing::debug!(operador = %record.operador, "request authenticated");

    request.extensions_mut().insert(AuthContext {
        token_id: record.id,
        operador: record.operador,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_lowercase_hex_sha256() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token("Bearer tok123"), Some("tok123"));
        assert_eq!(bearer_token("Basic tok123"), None);
        assert_eq!(bearer_token("Bearer   "), None);
    }
}
