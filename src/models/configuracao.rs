//! Server configuration models: SMTP and WhatsApp Business Cloud API.
//!
//! Both live in single-row tables; `PUT` upserts the row. Passwords and
//! tokens are stored verbatim and only leave the server masked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    error::{AppError, FieldErrors},
    services::validation::{self, clean_optional, mask_secret, only_digits},
};

/// The `config_email` row.
#[derive(Debug, Clone, FromRow)]
pub struct ConfigEmail {
    pub host: String,
    pub porta: i32,
    pub usuario: String,
    pub senha: String,
    pub remetente_email: String,
    pub remetente_nome: String,
    pub usar_tls: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ConfigEmailResponse {
    pub host: String,
    pub porta: i32,
    pub usuario: String,
    pub senha_mascarada: String,
    pub remetente_email: String,
    pub remetente_nome: String,
    pub usar_tls: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<ConfigEmail> for ConfigEmailResponse {
    fn from(config: ConfigEmail) -> Self {
        Self {
            senha_mascarada: mask_secret(&config.senha),
            host: config.host,
            porta: config.porta,
            usuario: config.usuario,
            remetente_email: config.remetente_email,
            remetente_nome: config.remetente_nome,
            usar_tls: config.usar_tls,
            updated_at: config.updated_at,
        }
    }
}

/// Request body for `PUT /api/configuracoes/email`.
///
/// `senha` may be omitted when a configuration already exists; the stored
/// password is kept.
///
/// ```json
/// {
///   "host": "smtp.gmail.com",
///   "porta": 587,
///   "usuario": "financeiro@bananal.com.br",
///   "senha": "app-password",
///   "remetente_email": "financeiro@bananal.com.br",
///   "remetente_nome": "Bananal Financeiro",
///   "usar_tls": true
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SalvarConfigEmail {
    pub host: String,
    pub porta: i32,
    pub usuario: String,
    pub senha: Option<String>,
    pub remetente_email: String,
    pub remetente_nome: String,
    #[serde(default = "default_true")]
    pub usar_tls: bool,
}

fn default_true() -> bool {
    true
}

impl SalvarConfigEmail {
    /// Validate and resolve the password against the stored one.
    pub fn normalizado(self, senha_atual: Option<String>) -> Result<SalvarConfigEmail, AppError> {
        let config = Self {
            host: self.host.trim().to_lowercase(),
            usuario: self.usuario.trim().to_string(),
            senha: clean_optional(self.senha).or(senha_atual),
            remetente_email: self.remetente_email.trim().to_lowercase(),
            remetente_nome: self.remetente_nome.trim().to_string(),
            ..self
        };

        let mut errors = FieldErrors::new();
        validation::required(&mut errors, "host", &config.host, 255);
        validation::range_i32(&mut errors, "porta", config.porta, 1, 65_535);
        validation::required(&mut errors, "usuario", &config.usuario, 255);
        if config.senha.is_none() {
            errors.add("senha", "is required");
        }
        validation::email(&mut errors, "remetente_email", &config.remetente_email);
        validation::required(&mut errors, "remetente_nome", &config.remetente_nome, 120);
        errors.into_result()?;

        Ok(config)
    }
}

/// Outcome of `POST /api/configuracoes/email/testar`.
#[derive(Debug, Serialize)]
pub struct TesteEmail {
    pub host: String,
    pub porta: i32,
    pub alcancavel: bool,
    pub latencia_ms: u128,
}

/// The `config_whatsapp` row.
#[derive(Debug, Clone, FromRow)]
pub struct ConfigWhatsapp {
    pub phone_number_id: String,
    pub business_account_id: String,
    pub access_token: String,
    pub api_version: String,
    pub app_secret: Option<String>,
    pub verify_token: String,
    pub ativo: bool,
    pub updated_at: DateTime<Utc>,
}

/// WhatsApp configuration as returned to clients.
///
/// `verify_token` is shown in full: it has to be pasted into the Meta
/// developer console when subscribing the webhook.
#[derive(Debug, Serialize)]
pub struct ConfigWhatsappResponse {
    pub phone_number_id: String,
    pub business_account_id: String,
    pub access_token_mascarado: String,
    pub api_version: String,
    pub possui_app_secret: bool,
    pub verify_token: String,
    pub ativo: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<ConfigWhatsapp> for ConfigWhatsappResponse {
    fn from(config: ConfigWhatsapp) -> Self {
        Self {
            access_token_mascarado: mask_secret(&config.access_token),
            possui_app_secret: config.app_secret.is_some(),
            phone_number_id: config.phone_number_id,
            business_account_id: config.business_account_id,
            api_version: config.api_version,
            verify_token: config.verify_token,
            ativo: config.ativo,
            updated_at: config.updated_at,
        }
    }
}

pub const API_VERSION_PADRAO: &str = "v21.0";

/// Request body for `PUT /api/configuracoes/whatsapp`.
///
/// Omitted secrets keep their stored values; an omitted `verify_token` is
/// generated on first save.
#[derive(Debug, Clone, Deserialize)]
pub struct SalvarConfigWhatsapp {
    pub phone_number_id: String,
    pub business_account_id: String,
    pub access_token: Option<String>,
    pub api_version: Option<String>,
    pub app_secret: Option<String>,
    pub verify_token: Option<String>,
    #[serde(default = "default_true")]
    pub ativo: bool,
}

/// Validated WhatsApp configuration ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWhatsappValidada {
    pub phone_number_id: String,
    pub business_account_id: String,
    pub access_token: String,
    pub api_version: String,
    pub app_secret: Option<String>,
    pub verify_token: String,
    pub ativo: bool,
}

fn api_version_valida(version: &str) -> bool {
    let Some(rest) = version.strip_prefix('v') else {
        return false;
    };
    let mut parts = rest.split('.');
    let major = parts.next().unwrap_or_default();
    let minor = parts.next();
    !major.is_empty()
        && major.chars().all(|c| c.is_ascii_digit())
        && minor.is_none_or(|m| !m.is_empty() && m.chars().all(|c| c.is_ascii_digit()))
        && parts.next().is_none()
}

impl SalvarConfigWhatsapp {
    /// Merge with the stored row (if any) and validate.
    ///
    /// `novo_verify_token` is used only when neither the request nor the
    /// stored row carries one.
    pub fn normalizado(
        self,
        atual: Option<ConfigWhatsapp>,
        novo_verify_token: impl FnOnce() -> String,
    ) -> Result<ConfigWhatsappValidada, AppError> {
        let (token_atual, secret_atual, verify_atual) = match atual {
            Some(a) => (Some(a.access_token), a.app_secret, Some(a.verify_token)),
            None => (None, None, None),
        };

        let access_token = clean_optional(self.access_token).or(token_atual);
        let config = ConfigWhatsappValidada {
            phone_number_id: only_digits(&self.phone_number_id),
            business_account_id: only_digits(&self.business_account_id),
            access_token: access_token.clone().unwrap_or_default(),
            api_version: clean_optional(self.api_version)
                .unwrap_or_else(|| API_VERSION_PADRAO.to_string()),
            app_secret: clean_optional(self.app_secret).or(secret_atual),
            verify_token: clean_optional(self.verify_token)
                .or(verify_atual)
                .unwrap_or_else(novo_verify_token),
            ativo: self.ativo,
        };

        let mut errors = FieldErrors::new();
        validation::digits(&mut errors, "phone_number_id", &config.phone_number_id, 5, 40);
        validation::digits(
            &mut errors,
            "business_account_id",
            &config.business_account_id,
            5,
            40,
        );
        if access_token.is_none() {
            errors.add("access_token", "is required");
        }
        if !api_version_valida(&config.api_version) {
            errors.add("api_version", "must look like v21.0");
        }
        validation::max_len(&mut errors, "verify_token", Some(&config.verify_token), 64);
        errors.into_result()?;

        Ok(config)
    }
}

/// Request body for `POST /api/configuracoes/whatsapp/testar`.
#[derive(Debug, Clone, Deserialize)]
pub struct TesteWhatsapp {
    /// E.164 number without `+`, e.g. `5543999990000`
    pub destinatario: String,
    pub mensagem: String,
}

impl TesteWhatsapp {
    pub fn normalizado(self) -> Result<Self, AppError> {
        let teste = Self {
            destinatario: only_digits(&self.destinatario),
            mensagem: self.mensagem.trim().to_string(),
        };

        let mut errors = FieldErrors::new();
        validation::digits(&mut errors, "destinatario", &teste.destinatario, 10, 15);
        validation::required(&mut errors, "mensagem", &teste.mensagem, 4096);
        errors.into_result()?;

        Ok(teste)
    }
}

/// A row of `whatsapp_mensagens`: one send attempt.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MensagemWhatsapp {
    pub id: uuid::Uuid,
    pub destinatario: String,
    pub conteudo: String,
    pub message_id: Option<String>,
    pub http_status: Option<i32>,
    pub erro: Option<String>,
    pub enviado_por: String,
    pub created_at: DateTime<Utc>,
}

/// Query string Meta sends when subscribing a webhook.
#[derive(Debug, Default, Deserialize)]
pub struct VerificacaoWebhook {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salvar_whatsapp() -> SalvarConfigWhatsapp {
        SalvarConfigWhatsapp {
            phone_number_id: "106540352242922".into(),
            business_account_id: "102290129340398".into(),
            access_token: Some("EAAG-token-abcd".into()),
            api_version: None,
            app_secret: None,
            verify_token: None,
            ativo: true,
        }
    }

    fn stored() -> ConfigWhatsapp {
        ConfigWhatsapp {
            phone_number_id: "106540352242922".into(),
            business_account_id: "102290129340398".into(),
            access_token: "stored-token".into(),
            api_version: "v20.0".into(),
            app_secret: Some("stored-secret".into()),
            verify_token: "stored-verify".into(),
            ativo: true,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn verify_token_is_generated_on_first_save() {
        let config = salvar_whatsapp()
            .normalizado(None, || "generated".to_string())
            .unwrap();
        assert_eq!(config.verify_token, "generated");
        assert_eq!(config.api_version, API_VERSION_PADRAO);
    }

    #[test]
    fn omitted_secrets_keep_stored_values() {
        let request = SalvarConfigWhatsapp {
            access_token: None,
            ..salvar_whatsapp()
        };
        let config = request
            .normalizado(Some(stored()), || panic!("must not generate"))
            .unwrap();
        assert_eq!(config.access_token, "stored-token");
        assert_eq!(config.app_secret.as_deref(), Some("stored-secret"));
        assert_eq!(config.verify_token, "stored-verify");
    }

    #[test]
    fn first_save_requires_access_token() {
        let request = SalvarConfigWhatsapp {
            access_token: None,
            api_version: Some("21".into()),
            ..salvar_whatsapp()
        };
        match request.normalizado(None, String::new) {
            Err(AppError::Validation(errors)) => {
                assert!(errors.get("access_token").is_some());
                assert!(errors.get("api_version").is_some());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn api_version_format() {
        assert!(api_version_valida("v21.0"));
        assert!(api_version_valida("v19"));
        assert!(!api_version_valida("21.0"));
        assert!(!api_version_valida("v21."));
        assert!(!api_version_valida("v21.0.1"));
    }

    #[test]
    fn email_password_falls_back_to_stored() {
        let request = SalvarConfigEmail {
            host: " SMTP.Gmail.com ".into(),
            porta: 587,
            usuario: "financeiro".into(),
            senha: Some("  ".into()),
            remetente_email: "financeiro@bananal.com.br".into(),
            remetente_nome: "Financeiro".into(),
            usar_tls: true,
        };

        let config = request
            .clone()
            .normalizado(Some("stored".into()))
            .unwrap();
        assert_eq!(config.senha.as_deref(), Some("stored"));
        assert_eq!(config.host, "smtp.gmail.com");

        match request.normalizado(None) {
            Err(AppError::Validation(errors)) => assert!(errors.get("senha").is_some()),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn email_response_masks_password() {
        let response = ConfigEmailResponse::from(ConfigEmail {
            host: "smtp.gmail.com".into(),
            porta: 587,
            usuario: "financeiro".into(),
            senha: "app-password-x1y2".into(),
            remetente_email: "financeiro@bananal.com.br".into(),
            remetente_nome: "Financeiro".into(),
            usar_tls: true,
            updated_at: Utc::now(),
        });
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("app-password"));
        assert!(json.contains("x1y2"));
    }
}
