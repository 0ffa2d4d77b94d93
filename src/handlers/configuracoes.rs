//! E-mail (SMTP) and WhatsApp configuration handlers.
//!
//! - GET  /api/configuracoes/email
//! - PUT  /api/configuracoes/email
//! - POST /api/configuracoes/email/testar
//! - GET  /api/configuracoes/whatsapp
//! - PUT  /api/configuracoes/whatsapp
//! - POST /api/configuracoes/whatsapp/testar

use std::time::Duration;

use axum::{Extension, Json, extract::State};

use crate::{
    app::AppState,
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::configuracao::{
        ConfigEmailResponse, ConfigWhatsappResponse, MensagemWhatsapp, SalvarConfigEmail,
        SalvarConfigWhatsapp, TesteEmail, TesteWhatsapp,
    },
    services::{configuracao_service, whatsapp_service},
};

/// Current SMTP configuration, password masked. 404 until saved once.
pub async fn get_email(State(pool): State<DbPool>) -> Result<Json<ConfigEmailResponse>, AppError> {
    Ok(Json(configuracao_service::buscar_email(&pool).await?))
}

pub async fn put_email(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<SalvarConfigEmail>,
) -> Result<Json<ConfigEmailResponse>, AppError> {
    let config = configuracao_service::salvar_email(&pool, request, &auth.operador).await?;
    Ok(Json(config))
}

/// TCP reachability check of the configured SMTP server.
///
/// # Response
///
/// - **200 OK**: `{"host": "...", "porta": 587, "alcancavel": true, "latencia_ms": 38}`
/// - **404**: no configuration saved
/// - **502**: the server refused the connection or timed out
pub async fn testar_email(State(state): State<AppState>) -> Result<Json<TesteEmail>, AppError> {
    let timeout = Duration::from_secs(state.config.http_client_timeout_secs);
    Ok(Json(configuracao_service::testar_email(&state.pool, timeout).await?))
}

pub async fn get_whatsapp(
    State(pool): State<DbPool>,
) -> Result<Json<ConfigWhatsappResponse>, AppError> {
    Ok(Json(whatsapp_service::buscar(&pool).await?))
}

/// Save the WhatsApp configuration.
///
/// # Request Body
///
/// ```json
/// {
///   "phone_number_id": "106540352242922",
///   "business_account_id": "102290129340398",
///   "access_token": "EAAG...",
///   "app_secret": "c0ffee...",
///   "api_version": "v21.0"
/// }
/// ```
///
/// The response carries the `verify_token` to register in the Meta console.
pub async fn put_whatsapp(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<SalvarConfigWhatsapp>,
) -> Result<Json<ConfigWhatsappResponse>, AppError> {
    let config = whatsapp_service::salvar(&pool, request, &auth.operador).await?;
    Ok(Json(config))
}

/// Send a test text message.
///
/// # Response
///
/// - **200 OK**: the recorded attempt with the Graph API `message_id`
/// - **502**: the Graph API rejected the message (the attempt is recorded)
pub async fn testar_whatsapp(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<TesteWhatsapp>,
) -> Result<Json<MensagemWhatsapp>, AppError> {
    let mensagem = whatsapp_service::testar(
        &state.pool,
        &state.http,
        &state.config.whatsapp_api_base_url,
        request,
        &auth.operador,
    )
    .await?;
    Ok(Json(mensagem))
}
