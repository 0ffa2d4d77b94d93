//! Banana ripening-control handlers.
//!
//! - POST   /api/controle-banana
//! - GET    /api/controle-banana?fita_id=&area=&status=&data_referencia=
//! - GET    /api/controle-banana/resumo?data_referencia=
//! - GET    /api/controle-banana/calendario?inicio=&fim=
//! - GET    /api/controle-banana/{id}?data_referencia=
//! - PATCH  /api/controle-banana/{id}
//! - DELETE /api/controle-banana/{id}
//! - POST   /api/controle-banana/{id}/colheitas
//!
//! Every registration in a response carries its maturation status computed
//! against `data_referencia` (today when omitted).

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::banana::{
        AtualizarControle, ControleBananaResponse, FiltroControles, NovoControle,
        PeriodoCalendario, RegistrarColheitaCachos, ResumoStatus,
    },
    services::{banana_service, maturacao::StatusMaturacao},
};

/// Register tagged bunches.
///
/// # Response
///
/// - **201 Created**: the registration with its harvest window
/// - **400**: future date, empty area, non-positive count, unknown or inactive tag
pub async fn create_controle(
    State(pool): State<DbPool>,
    Json(request): Json<NovoControle>,
) -> Result<impl IntoResponse, AppError> {
    let controle = banana_service::criar_controle(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(controle)))
}

pub async fn list_controles(
    State(pool): State<DbPool>,
    Query(filtro): Query<FiltroControles>,
) -> Result<Json<Vec<ControleBananaResponse>>, AppError> {
    Ok(Json(banana_service::listar_controles(&pool, filtro).await?))
}

pub async fn get_controle(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Query(filtro): Query<FiltroControles>,
) -> Result<Json<ControleBananaResponse>, AppError> {
    Ok(Json(
        banana_service::buscar_controle(&pool, id, filtro.data_referencia).await?,
    ))
}

pub async fn update_controle(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Json(request): Json<AtualizarControle>,
) -> Result<Json<ControleBananaResponse>, AppError> {
    Ok(Json(
        banana_service::atualizar_controle(&pool, id, request).await?,
    ))
}

pub async fn delete_controle(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    banana_service::remover_controle(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Record harvested bunches.
///
/// ```json
/// { "quantidade": 40 }
/// ```
///
/// Returns 422 when more bunches are reported than are still pending.
pub async fn registrar_colheita(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Json(request): Json<RegistrarColheitaCachos>,
) -> Result<Json<ControleBananaResponse>, AppError> {
    Ok(Json(
        banana_service::registrar_colheita(&pool, id, request.quantidade).await?,
    ))
}

/// Harvest calendar for a period of at most a year.
pub async fn get_calendario(
    State(pool): State<DbPool>,
    Query(periodo): Query<PeriodoCalendario>,
) -> Result<Json<Vec<ControleBananaResponse>>, AppError> {
    Ok(Json(banana_service::calendario(&pool, periodo).await?))
}

/// Pending bunches per maturation status.
///
/// ```json
/// {
///   "maturacao": { "registros": 12, "cachos_pendentes": 3400 },
///   "colheita": { "registros": 3, "cachos_pendentes": 810 },
///   "alerta": { "registros": 1, "cachos_pendentes": 95 },
///   "vencido": { "registros": 0, "cachos_pendentes": 0 }
/// }
/// ```
pub async fn get_resumo(
    State(pool): State<DbPool>,
    Query(filtro): Query<FiltroControles>,
) -> Result<Json<BTreeMap<StatusMaturacao, ResumoStatus>>, AppError> {
    Ok(Json(
        banana_service::resumo(&pool, filtro.data_referencia).await?,
    ))
}
