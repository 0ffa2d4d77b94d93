//! Bank API credential handlers.
//!
//! - POST   /api/contas-correntes/{id}/credenciais
//! - GET    /api/contas-correntes/{id}/credenciais
//! - GET    /api/credenciais-api/{id}
//! - PATCH  /api/credenciais-api/{id}
//! - DELETE /api/credenciais-api/{id}
//!
//! Secrets go in, never out: every response carries the masked form only.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::credencial::{AtualizarCredencial, CredencialApiResponse, NovaCredencial},
    services::bancario_service,
};

/// Register credentials for an account.
///
/// # Request Body
///
/// ```json
/// {
///   "modalidade": "cobranca",
///   "ambiente": "producao",
///   "client_id": "eyJpZCI6ImFi",
///   "client_secret": "eyJpZCI6IjU2",
///   "chave_aplicacao": "d27b77790cffabc01363e17d80050c56b9a1"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: masked credentials
/// - **404**: account not found
/// - **409**: the account already has credentials for this modality
pub async fn create_credencial(
    State(pool): State<DbPool>,
    Path(conta_id): Path<Uuid>,
    Json(request): Json<NovaCredencial>,
) -> Result<impl IntoResponse, AppError> {
    let credencial = bancario_service::criar_credencial(&pool, conta_id, request).await?;
    Ok((StatusCode::CREATED, Json(credencial)))
}

pub async fn list_credenciais(
    State(pool): State<DbPool>,
    Path(conta_id): Path<Uuid>,
) -> Result<Json<Vec<CredencialApiResponse>>, AppError> {
    Ok(Json(bancario_service::listar_credenciais(&pool, conta_id).await?))
}

pub async fn get_credencial(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<CredencialApiResponse>, AppError> {
    Ok(Json(bancario_service::buscar_credencial(&pool, id).await?))
}

/// Update credentials. Sending `client_secret` rotates the stored secret.
pub async fn update_credencial(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<AtualizarCredencial>,
) -> Result<Json<CredencialApiResponse>, AppError> {
    let credencial =
        bancario_service::atualizar_credencial(&pool, id, request, &auth.operador).await?;
    Ok(Json(credencial))
}

pub async fn delete_credencial(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    bancario_service::remover_credencial(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
