//! Certificate handlers.
//!
//! - POST   /api/certificados
//! - GET    /api/certificados
//! - GET    /api/certificados/monitor
//! - GET    /api/certificados/{id}
//! - PATCH  /api/certificados/{id}
//! - DELETE /api/certificados/{id}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    app::AppState,
    db::DbPool,
    error::AppError,
    models::certificado::{
        AtualizarCertificado, Certificado, NovoCertificado, SituacaoCertificado,
    },
    services::{certificado_service, hoje},
};

pub async fn create_certificado(
    State(pool): State<DbPool>,
    Json(request): Json<NovoCertificado>,
) -> Result<impl IntoResponse, AppError> {
    let certificado = certificado_service::criar(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(certificado)))
}

pub async fn list_certificados(
    State(pool): State<DbPool>,
) -> Result<Json<Vec<Certificado>>, AppError> {
    Ok(Json(certificado_service::listar(&pool).await?))
}

/// Expiry status of every certificate.
///
/// # Response (200 OK)
///
/// ```json
/// [
///   {
///     "id": "550e8400-e29b-41d4-a716-446655440000",
///     "nome": "e-CNPJ Bananal",
///     "valido_ate": "2025-03-31",
///     "dias_restantes": 12,
///     "status": "expirando",
///     "arquivo_presente": true
///   }
/// ]
/// ```
pub async fn get_monitor(
    State(state): State<AppState>,
) -> Result<Json<Vec<SituacaoCertificado>>, AppError> {
    let situacoes =
        certificado_service::monitorar(&state.pool, hoje(), state.config.certificate_alert_days)
            .await?;
    Ok(Json(situacoes))
}

pub async fn get_certificado(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Certificado>, AppError> {
    Ok(Json(certificado_service::buscar(&pool, id).await?))
}

pub async fn update_certificado(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Json(request): Json<AtualizarCertificado>,
) -> Result<Json<Certificado>, AppError> {
    Ok(Json(certificado_service::atualizar(&pool, id, request).await?))
}

pub async fn delete_certificado(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    certificado_service::remover(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
