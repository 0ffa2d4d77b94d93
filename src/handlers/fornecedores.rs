//! Supplier HTTP handlers.
//!
//! - POST   /api/fornecedores
//! - GET    /api/fornecedores?ativo=&busca=
//! - GET    /api/fornecedores/{id}
//! - PATCH  /api/fornecedores/{id}
//! - DELETE /api/fornecedores/{id}
//! - GET    /api/fornecedores/{id}/estatisticas

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
    models::fornecedor::{AtualizarFornecedor, FiltroFornecedores, Fornecedor, NovoFornecedor},
    services::{estatisticas::EstatisticasFornecedor, fornecedor_service},
};

/// Create a supplier.
///
/// # Response
///
/// - **201 Created**: the stored supplier, document digits-only
/// - **400**: validation errors per field (e.g. invalid CPF/CNPJ)
/// - **409**: another supplier already has this document
pub async fn create_fornecedor(
    State(pool): State<DbPool>,
    Json(request): Json<NovoFornecedor>,
) -> Result<impl IntoResponse, AppError> {
    let fornecedor = fornecedor_service::criar(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(fornecedor)))
}

/// List suppliers ordered by name.
pub async fn list_fornecedores(
    State(pool): State<DbPool>,
    Query(filtro): Query<FiltroFornecedores>,
) -> Result<Json<Vec<Fornecedor>>, AppError> {
    Ok(Json(fornecedor_service::listar(&pool, filtro).await?))
}

pub async fn get_fornecedor(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Fornecedor>, AppError> {
    Ok(Json(fornecedor_service::buscar(&pool, id).await?))
}

/// Partially update a supplier. The merged record is validated as a whole.
pub async fn update_fornecedor(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Json(request): Json<AtualizarFornecedor>,
) -> Result<Json<Fornecedor>, AppError> {
    Ok(Json(fornecedor_service::atualizar(&pool, id, request).await?))
}

/// Delete a supplier.
///
/// Returns 204 No Content, or 409 when the supplier still has orders.
pub async fn delete_fornecedor(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    fornecedor_service::remover(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Order and payment statistics for one supplier.
///
/// ```json
/// {
///   "fornecedor_id": "550e8400-e29b-41d4-a716-446655440000",
///   "total_pedidos": 4,
///   "pedidos_por_status": { "criado": 1, "colhido": 1, "precificado": 1, "pago": 1, "finalizado": 0 },
///   "caixas_previstas": 450,
///   "caixas_colhidas": 330,
///   "valor_total_cents": 500000,
///   "valor_pago_cents": 350000,
///   "saldo_pendente_cents": 150000,
///   "preco_medio_caixa_cents": 3333,
///   "primeiro_pedido_em": "2025-03-01T12:00:00Z",
///   "ultimo_pedido_em": "2025-03-05T12:00:00Z"
/// }
/// ```
pub async fn get_estatisticas(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<EstatisticasFornecedor>, AppError> {
    Ok(Json(fornecedor_service::estatisticas(&pool, id).await?))
}
