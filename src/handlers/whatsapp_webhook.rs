//! Public WhatsApp webhook receiver.
//!
//! - GET  /webhooks/whatsapp?hub.mode=subscribe&hub.verify_token=&hub.challenge=
//! - POST /webhooks/whatsapp (signed with `X-Hub-Signature-256`)

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};

use crate::{
    db::DbPool, error::AppError, models::configuracao::VerificacaoWebhook,
    services::whatsapp_service,
};

/// Echo `hub.challenge` as plain text when the verify token matches.
pub async fn verify_subscription(
    State(pool): State<DbPool>,
    Query(query): Query<VerificacaoWebhook>,
) -> Result<String, AppError> {
    whatsapp_service::verificar_inscricao(&pool, query).await
}

/// Store an inbound event. The raw body is needed for the signature check.
pub async fn receive_event(
    State(pool): State<DbPool>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let assinatura = headers
        .get("x-hub-signature-256")
        .and_then(|value| value.to_str().ok());

    whatsapp_service::receber_evento(&pool, assinatura, &body).await?;
    Ok(StatusCode::OK)
}
