//! Banana tag (fita) handlers.
//!
//! - POST   /api/fitas-banana
//! - GET    /api/fitas-banana
//! - GET    /api/fitas-banana/{id}
//! - PATCH  /api/fitas-banana/{id}
//! - DELETE /api/fitas-banana/{id}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::banana::{AtualizarFita, FitaBanana, NovaFita},
    services::banana_service,
};

/// Create a colour tag.
///
/// ```json
/// { "nome": "Azul", "cor_hex": "#1e40af" }
/// ```
pub async fn create_fita(
    State(pool): State<DbPool>,
    Json(request): Json<NovaFita>,
) -> Result<impl IntoResponse, AppError> {
    let fita = banana_service::criar_fita(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(fita)))
}

pub async fn list_fitas(State(pool): State<DbPool>) -> Result<Json<Vec<FitaBanana>>, AppError> {
    Ok(Json(banana_service::listar_fitas(&pool).await?))
}

pub async fn get_fita(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<FitaBanana>, AppError> {
    Ok(Json(banana_service::buscar_fita(&pool, id).await?))
}

pub async fn update_fita(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Json(request): Json<AtualizarFita>,
) -> Result<Json<FitaBanana>, AppError> {
    Ok(Json(banana_service::atualizar_fita(&pool, id, request).await?))
}

/// Delete a tag. Returns 409 while registrations still use it.
pub async fn delete_fita(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    banana_service::remover_fita(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
