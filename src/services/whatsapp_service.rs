//! WhatsApp Business Cloud API: configuration, test messages and the
//! inbound webhook.
//!
//! # Webhook Signatures
//!
//! Meta signs every webhook POST with
//! `X-Hub-Signature-256: sha256=<hex(HMAC-SHA256(app_secret, body))>`.
//! The signature is checked with a constant-time comparison before the
//! event is stored.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

use crate::{
    db::DbPool,
    error::AppError,
    models::configuracao::{
        ConfigWhatsapp, ConfigWhatsappResponse, MensagemWhatsapp, SalvarConfigWhatsapp,
        TesteWhatsapp, VerificacaoWebhook,
    },
};

type HmacSha256 = Hmac<Sha256>;

async fn carregar(pool: &DbPool) -> Result<Option<ConfigWhatsapp>, AppError> {
    let config = sqlx::query_as::<_, ConfigWhatsapp>(
        r#"
        SELECT phone_number_id, business_account_id, access_token, api_version,
               app_secret, verify_token, ativo, updated_at
        FROM config_whatsapp WHERE id = 1
        "#,
    )
    .fetch_optional(pool)
    .await?;
    Ok(config)
}

async fn carregar_obrigatoria(pool: &DbPool) -> Result<ConfigWhatsapp, AppError> {
    carregar(pool)
        .await?
        .ok_or(AppError::NotFound("config_whatsapp"))
}

pub async fn buscar(pool: &DbPool) -> Result<ConfigWhatsappResponse, AppError> {
    Ok(carregar_obrigatoria(pool).await?.into())
}

/// 32 hex characters of randomness.
pub fn gerar_verify_token() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// Create or replace the WhatsApp configuration.
pub async fn salvar(
    pool: &DbPool,
    request: SalvarConfigWhatsapp,
    operador: &str,
) -> Result<ConfigWhatsappResponse, AppError> {
    let atual = carregar(pool).await?;
    let config = request.normalizado(atual, gerar_verify_token)?;

    let salvo = sqlx::query_as::<_, ConfigWhatsapp>(
        r#"
        INSERT INTO config_whatsapp (
            id, phone_number_id, business_account_id, access_token, api_version,
            app_secret, verify_token, ativo
        )
        VALUES (1, $1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE SET
            phone_number_id = EXCLUDED.phone_number_id,
            business_account_id = EXCLUDED.business_account_id,
            access_token = EXCLUDED.access_token,
            api_version = EXCLUDED.api_version,
            app_secret = EXCLUDED.app_secret,
            verify_token = EXCLUDED.verify_token,
            ativo = EXCLUDED.ativo,
            updated_at = NOW()
        RETURNING phone_number_id, business_account_id, access_token, api_version,
                  app_secret, verify_token, ativo, updated_at
        "#,
    )
    .bind(&config.phone_number_id)
    .bind(&config.business_account_id)
    .bind(&config.access_token)
    .bind(&config.api_version)
    .bind(&config.app_secret)
    .bind(&config.verify_token)
    .bind(config.ativo)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        phone_number_id = %salvo.phone_number_id,
        api_version = %salvo.api_version,
        operador,
        "WhatsApp configuration saved"
    );
    Ok(salvo.into())
}

/// `{base}/{api_version}/{phone_number_id}/messages`
pub fn url_mensagens(
    base: &str,
    api_version: &str,
    phone_number_id: &str,
) -> Result<url::Url, AppError> {
    let raw = format!(
        "{}/{}/{}/messages",
        base.trim_end_matches('/'),
        api_version,
        phone_number_id
    );
    let parsed = url::Url::parse(&raw)
        .map_err(|err| AppError::InvalidRequest(format!("invalid WhatsApp API URL: {err}")))?;

    match parsed.scheme() {
        "https" | "http" => Ok(parsed),
        other => Err(AppError::InvalidRequest(format!(
            "WhatsApp API URL must use HTTP or HTTPS, got '{other}'"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct RespostaEnvio {
    #[serde(default)]
    messages: Vec<MensagemEnviada>,
}

#[derive(Debug, Deserialize)]
struct MensagemEnviada {
    id: String,
}

/// Outcome of one call to the messages endpoint, before it is recorded.
struct Tentativa {
    http_status: Option<i32>,
    message_id: Option<String>,
    erro: Option<String>,
}

async fn enviar(
    http: &reqwest::Client,
    url: url::Url,
    access_token: &str,
    teste: &TesteWhatsapp,
) -> Tentativa {
    let body = json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": teste.destinatario,
        "type": "text",
        "text": { "preview_url": false, "body": teste.mensagem },
    });

    let response = match http.post(url).bearer_auth(access_token).json(&body).send().await {
        Ok(resp) => resp,
        Err(err) => {
            return Tentativa {
                http_status: None,
                message_id: None,
                erro: Some(format!("request failed: {err}")),
            };
        }
    };

    let status = response.status();
    let texto = response.text().await.unwrap_or_default();

    if status.is_success() {
        let message_id = serde_json::from_str::<RespostaEnvio>(&texto)
            .ok()
            .and_then(|r| r.messages.into_iter().next())
            .map(|m| m.id);
        Tentativa {
            http_status: Some(i32::from(status.as_u16())),
            message_id,
            erro: None,
        }
    } else {
        Tentativa {
            http_status: Some(i32::from(status.as_u16())),
            message_id: None,
            erro: Some(texto),
        }
    }
}

/// Send a text message with the stored configuration and record the attempt.
///
/// # Errors
///
/// - `NotFound`: WhatsApp is not configured
/// - `BusinessRule`: the configuration is inactive
/// - `Upstream`: the Graph API rejected the message or was unreachable
///   (the attempt is still recorded)
pub async fn testar(
    pool: &DbPool,
    http: &reqwest::Client,
    base_url: &str,
    request: TesteWhatsapp,
    operador: &str,
) -> Result<MensagemWhatsapp, AppError> {
    let teste = request.normalizado()?;
    let config = carregar_obrigatoria(pool).await?;
    if !config.ativo {
        return Err(AppError::BusinessRule(
            "WhatsApp integration is inactive".to_string(),
        ));
    }

    let url = url_mensagens(base_url, &config.api_version, &config.phone_number_id)?;
    let tentativa = enviar(http, url, &config.access_token, &teste).await;

    let mensagem = sqlx::query_as::<_, MensagemWhatsapp>(
        r#"
        INSERT INTO whatsapp_mensagens (
            destinatario, conteudo, message_id, http_status, erro, enviado_por
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&teste.destinatario)
    .bind(&teste.mensagem)
    .bind(&tentativa.message_id)
    .bind(tentativa.http_status)
    .bind(&tentativa.erro)
    .bind(operador)
    .fetch_one(pool)
    .await?;

    match &tentativa.erro {
        None => {
            tracing::info!(
                mensagem_id = %mensagem.id,
                message_id = ?mensagem.message_id,
                operador,
                "WhatsApp test message sent"
            );
            Ok(mensagem)
        }
        Some(erro) => {
            tracing::warn!(
                mensagem_id = %mensagem.id,
                http_status = ?tentativa.http_status,
                "WhatsApp test message failed"
            );
            Err(AppError::Upstream(format!("WhatsApp API error: {erro}")))
        }
    }
}

/// Check an `X-Hub-Signature-256` header against the raw request body.
pub fn assinatura_valida(app_secret: &str, body: &[u8], header: &str) -> bool {
    let Some(hex_sig) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(esperada) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&esperada).is_ok()
}

/// Answer a subscription challenge when the verify token matches.
pub fn desafio_aceito(verify_token: &str, query: &VerificacaoWebhook) -> Option<String> {
    let inscricao = query.mode.as_deref() == Some("subscribe");
    let token_confere = query.verify_token.as_deref() == Some(verify_token);
    if inscricao && token_confere {
        query.challenge.clone()
    } else {
        None
    }
}

/// Handle `GET /webhooks/whatsapp`.
pub async fn verificar_inscricao(
    pool: &DbPool,
    query: VerificacaoWebhook,
) -> Result<String, AppError> {
    let config = carregar(pool).await?.ok_or(AppError::Unauthorized)?;

    match desafio_aceito(&config.verify_token, &query) {
        Some(challenge) => {
            tracing::info!("WhatsApp webhook subscription verified");
            Ok(challenge)
        }
        None => {
            tracing::warn!(mode = ?query.mode, "WhatsApp webhook verification rejected");
            Err(AppError::Unauthorized)
        }
    }
}

/// Handle `POST /webhooks/whatsapp`: verify the signature and store the event.
pub async fn receber_evento(
    pool: &DbPool,
    assinatura: Option<&str>,
    body: &[u8],
) -> Result<(), AppError> {
    let config = carregar(pool).await?.ok_or(AppError::Unauthorized)?;

    match (&config.app_secret, assinatura) {
        (Some(secret), Some(header)) if assinatura_valida(secret, body, header) => {}
        (Some(_), _) => {
            tracing::warn!("WhatsApp webhook with missing or invalid signature");
            return Err(AppError::Unauthorized);
        }
        (None, _) => {
            tracing::warn!("WhatsApp webhook accepted without signature check, app_secret not configured");
        }
    }

    let payload: serde_json::Value = serde_json::from_slice(body)
        .map_err(|err| AppError::InvalidRequest(format!("invalid webhook payload: {err}")))?;

    sqlx::query("INSERT INTO whatsapp_eventos (payload) VALUES ($1)")
        .bind(&payload)
        .execute(pool)
        .await?;

    tracing::debug!("WhatsApp webhook event stored");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_is_accepted() {
        let body = br#"{"object":"whatsapp_business_account"}"#;
        let header = sign("app-secret", body);
        assert!(assinatura_valida("app-secret", body, &header));
    }

    #[test]
    fn tampered_body_or_wrong_secret_is_rejected() {
        let body = br#"{"object":"whatsapp_business_account"}"#;
        let header = sign("app-secret", body);
        assert!(!assinatura_valida("other-secret", body, &header));
        assert!(!assinatura_valida("app-secret", b"{}", &header));
        assert!(!assinatura_valida("app-secret", body, header.trim_start_matches("sha256=")));
        assert!(!assinatura_valida("app-secret", body, "sha256=not-hex"));
    }

    #[test]
    fn challenge_requires_subscribe_and_matching_token() {
        let query = VerificacaoWebhook {
            mode: Some("subscribe".into()),
            verify_token: Some("abc".into()),
            challenge: Some("1158201444".into()),
        };
        assert_eq!(desafio_aceito("abc", &query).as_deref(), Some("1158201444"));
        assert_eq!(desafio_aceito("xyz", &query), None);

        let wrong_mode = VerificacaoWebhook {
            mode: Some("unsubscribe".into()),
            ..query
        };
        assert_eq!(desafio_aceito("abc", &wrong_mode), None);
    }

    #[test]
    fn messages_url_is_built_from_base() {
        let url = url_mensagens("https://graph.facebook.com/", "v21.0", "106540352242922").unwrap();
        assert_eq!(
            url.as_str(),
            "https://graph.facebook.com/v21.0/106540352242922/messages"
        );
        assert!(url_mensagens("ftp://example.com", "v21.0", "1").is_err());
    }

    #[test]
    fn generated_verify_token_is_hex() {
        let token = gerar_verify_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
