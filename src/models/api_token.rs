//! Operator API token model.
//!
//! Tokens are stored as SHA-256 hashes; the raw value is shown once, when
//! the token is issued by the `emitir-token` binary.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A row of the `api_tokens` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiToken {
    pub id: Uuid,

    /// SHA-256 hash of the raw token (64 hex characters)
    pub token_hash: String,

    /// Person or integration the token was issued to
    pub operador: String,

    pub created_at: DateTime<Utc>,

    /// Inactive tokens are rejected; revoking never deletes the row.
    pub ativo: bool,
}
