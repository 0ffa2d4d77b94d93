//! Billing agreement (convênio de cobrança) handlers.
//!
//! The convênio is addressed through its account:
//! `/api/contas-correntes/{id}/convenio-cobranca` (POST, GET, PATCH, DELETE).

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
    models::credencial::{AtualizarConvenio, ConvenioCobranca, NovoConvenio},
    services::bancario_service,
};

/// Register the account's convênio.
///
/// # Response
///
/// - **201 Created**: the stored convênio
/// - **404**: account not found
/// - **409**: the account already has a convênio
/// - **422**: the account has no active `cobranca` credentials yet
pub async fn create_convenio(
    State(pool): State<DbPool>,
    Path(conta_id): Path<Uuid>,
    Json(request): Json<NovoConvenio>,
) -> Result<impl IntoResponse, AppError> {
    let convenio = bancario_service::criar_convenio(&pool, conta_id, request).await?;
    Ok((StatusCode::CREATED, Json(convenio)))
}

pub async fn get_convenio(
    State(pool): State<DbPool>,
    Path(conta_id): Path<Uuid>,
) -> Result<Json<ConvenioCobranca>, AppError> {
    Ok(Json(bancario_service::buscar_convenio(&pool, conta_id).await?))
}

pub async fn update_convenio(
    State(pool): State<DbPool>,
    Path(conta_id): Path<Uuid>,
    Json(request): Json<AtualizarConvenio>,
) -> Result<Json<ConvenioCobranca>, AppError> {
    Ok(Json(
        bancario_service::atualizar_convenio(&pool, conta_id, request).await?,
    ))
}

pub async fn delete_convenio(
    State(pool): State<DbPool>,
    Path(conta_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    bancario_service::remover_convenio(&pool, conta_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
