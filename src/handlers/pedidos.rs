//! Order handlers.
//!
//! - POST   /api/pedidos
//! - GET    /api/pedidos?status=&fornecedor_id=
//! - GET    /api/pedidos/{id}
//! - PATCH  /api/pedidos/{id}
//! - DELETE /api/pedidos/{id}
//! - POST   /api/pedidos/{id}/colheita
//! - POST   /api/pedidos/{id}/precificacao
//! - GET    /api/pedidos/{id}/pagamentos
//! - POST   /api/pedidos/{id}/pagamentos
//! - POST   /api/pedidos/{id}/finalizacao
//!
//! A transition requested from the wrong state answers 422 with both states
//! in the message.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::pedido::{
        AtualizarPedido, FiltroPedidos, NovoPagamento, NovoPedido, PagamentoPedido, Pedido,
        PedidoDetalhado, PrecificarPedido, RegistrarColheitaPedido,
    },
    services::pedido_service,
};

/// Create an order in state `criado`.
///
/// # Response
///
/// - **201 Created**: the order
/// - **400**: validation errors, unknown or inactive supplier
pub async fn create_pedido(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<NovoPedido>,
) -> Result<impl IntoResponse, AppError> {
    let pedido = pedido_service::criar(&pool, request).await?;
    tracing::debug!(pedido_id = %pedido.id, operador = %auth.operador, "order created by operator");
    Ok((StatusCode::CREATED, Json(pedido)))
}

pub async fn list_pedidos(
    State(pool): State<DbPool>,
    Query(filtro): Query<FiltroPedidos>,
) -> Result<Json<Vec<Pedido>>, AppError> {
    Ok(Json(pedido_service::listar(&pool, filtro).await?))
}

/// Order with its payments and outstanding balance.
pub async fn get_pedido(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<PedidoDetalhado>, AppError> {
    Ok(Json(pedido_service::detalhar(&pool, id).await?))
}

pub async fn update_pedido(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Json(request): Json<AtualizarPedido>,
) -> Result<Json<Pedido>, AppError> {
    Ok(Json(pedido_service::atualizar(&pool, id, request).await?))
}

pub async fn delete_pedido(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    pedido_service::remover(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Record the harvest of a `criado` order.
///
/// # Request Body
///
/// ```json
/// { "quantidade_caixas": 380, "data_colheita": "2025-05-01" }
/// ```
pub async fn registrar_colheita(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<RegistrarColheitaPedido>,
) -> Result<Json<Pedido>, AppError> {
    let pedido = pedido_service::registrar_colheita(&pool, id, request, &auth.operador).await?;
    Ok(Json(pedido))
}

/// Price a harvested order.
///
/// # Request Body
///
/// ```json
/// { "preco_caixa_cents": 3500 }
/// ```
pub async fn precificar(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<PrecificarPedido>,
) -> Result<Json<Pedido>, AppError> {
    let pedido =
        pedido_service::precificar(&pool, id, request.preco_caixa_cents, &auth.operador).await?;
    Ok(Json(pedido))
}

pub async fn list_pagamentos(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PagamentoPedido>>, AppError> {
    pedido_service::buscar(&pool, id).await?;
    Ok(Json(pedido_service::listar_pagamentos(&pool, id).await?))
}

/// Register a payment.
///
/// # Response
///
/// - **201 Created**: the order with all its payments; `status` is `pago`
///   once fully paid
/// - **422**: order not `precificado`, or the payment exceeds the balance
pub async fn create_pagamento(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<NovoPagamento>,
) -> Result<impl IntoResponse, AppError> {
    let pedido = pedido_service::registrar_pagamento(&pool, id, request, &auth.operador).await?;
    Ok((StatusCode::CREATED, Json(pedido)))
}

pub async fn finalizar(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Pedido>, AppError> {
    Ok(Json(pedido_service::finalizar(&pool, id, &auth.operador).await?))
}
