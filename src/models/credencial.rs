//! Bank API credentials and billing agreement (convênio de cobrança) models.
//!
//! # Secret Handling
//!
//! `client_secret` and `chave_aplicacao` are stored as given (the bank
//! integration needs them verbatim) but never serialized back to clients.
//! Responses only carry a masked form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    error::{AppError, FieldErrors},
    services::validation::{self, clean_optional, mask_secret, only_digits},
};

/// Bank API products a credential can be issued for.
pub const MODALIDADES: [&str; 4] = ["cobranca", "pix", "extratos", "pagamentos"];

/// Bank API environments.
pub const AMBIENTES: [&str; 2] = ["sandbox", "producao"];

/// Modality a convênio de cobrança depends on.
pub const MODALIDADE_COBRANCA: &str = "cobranca";

/// A row of the `credenciais_api` table.
#[derive(Debug, Clone, FromRow)]
pub struct CredencialApi {
    pub id: Uuid,
    pub conta_corrente_id: Uuid,
    pub modalidade: String,
    pub ambiente: String,
    pub client_id: String,
    pub client_secret: String,
    pub chave_aplicacao: Option<String>,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Credential as returned to clients.
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "conta_corrente_id": "660e8400-e29b-41d4-a716-446655440001",
///   "modalidade": "cobranca",
///   "ambiente": "producao",
///   "client_id": "eyJpZCI6ImFi",
///   "client_secret_mascarado": "************9f3a",
///   "possui_chave_aplicacao": true,
///   "ativo": true,
///   "created_at": "2025-01-15T10:30:00Z",
///   "updated_at": "2025-01-15T10:30:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct CredencialApiResponse {
    pub id: Uuid,
    pub conta_corrente_id: Uuid,
    pub modalidade: String,
    pub ambiente: String,
    pub client_id: String,
    pub client_secret_mascarado: String,
    pub possui_chave_aplicacao: bool,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CredencialApi> for CredencialApiResponse {
    fn from(credencial: CredencialApi) -> Self {
        Self {
            id: credencial.id,
            conta_corrente_id: credencial.conta_corrente_id,
            modalidade: credencial.modalidade,
            ambiente: credencial.ambiente,
            client_id: credencial.client_id,
            client_secret_mascarado: mask_secret(&credencial.client_secret),
            possui_chave_aplicacao: credencial.chave_aplicacao.is_some(),
            ativo: credencial.ativo,
            created_at: credencial.created_at,
            updated_at: credencial.updated_at,
        }
    }
}

/// Request body for `POST /api/contas-correntes/{id}/credenciais`.
#[derive(Debug, Clone, Deserialize)]
pub struct NovaCredencial {
    pub modalidade: String,
    pub ambiente: String,
    pub client_id: String,
    pub client_secret: String,
    pub chave_aplicacao: Option<String>,
    #[serde(default = "default_true")]
    pub ativo: bool,
}

fn default_true() -> bool {
    true
}

fn one_of(errors: &mut FieldErrors, field: &'static str, value: &str, allowed: &[&str]) {
    if !allowed.contains(&value) {
        errors.add(field, format!("must be one of: {}", allowed.join(", ")));
    }
}

impl NovaCredencial {
    pub fn normalizado(self) -> Result<Self, AppError> {
        let credencial = Self {
            modalidade: self.modalidade.trim().to_lowercase(),
            ambiente: self.ambiente.trim().to_lowercase(),
            client_id: self.client_id.trim().to_string(),
            client_secret: self.client_secret.trim().to_string(),
            chave_aplicacao: clean_optional(self.chave_aplicacao),
            ativo: self.ativo,
        };

        let mut errors = FieldErrors::new();
        one_of(&mut errors, "modalidade", &credencial.modalidade, &MODALIDADES);
        one_of(&mut errors, "ambiente", &credencial.ambiente, &AMBIENTES);
        validation::required(&mut errors, "client_id", &credencial.client_id, 255);
        validation::required(&mut errors, "client_secret", &credencial.client_secret, 4096);
        validation::max_len(
            &mut errors,
            "chave_aplicacao",
            credencial.chave_aplicacao.as_deref(),
            4096,
        );
        errors.into_result()?;

        Ok(credencial)
    }
}

/// Request body for `PATCH /api/credenciais-api/{id}`.
///
/// The modality is fixed once created. Sending `client_secret` rotates it.
#[derive(Debug, Default, Deserialize)]
pub struct AtualizarCredencial {
    pub ambiente: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub chave_aplicacao: Option<String>,
    pub ativo: Option<bool>,
}

impl AtualizarCredencial {
    /// Whether this update replaces stored secrets.
    pub fn rotaciona_segredo(&self) -> bool {
        self.client_secret.is_some() || self.chave_aplicacao.is_some()
    }

    pub fn aplicar(self, atual: CredencialApi) -> NovaCredencial {
        NovaCredencial {
            modalidade: atual.modalidade,
            ambiente: self.ambiente.unwrap_or(atual.ambiente),
            client_id: self.client_id.unwrap_or(atual.client_id),
            client_secret: self.client_secret.unwrap_or(atual.client_secret),
            chave_aplicacao: self.chave_aplicacao.or(atual.chave_aplicacao),
            ativo: self.ativo.unwrap_or(atual.ativo),
        }
    }
}

/// A row of the `convenios_cobranca` table. At most one per account.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConvenioCobranca {
    pub id: Uuid,
    pub conta_corrente_id: Uuid,
    pub numero_convenio: String,
    pub carteira: String,
    pub variacao_carteira: Option<String>,

    /// Monthly interest in basis points (100 = 1%)
    pub juros_mensal_bps: i32,

    /// Late fee in basis points
    pub multa_bps: i32,

    /// Days after due date before protest, `None` disables protest
    pub dias_protesto: Option<i32>,

    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /api/contas-correntes/{id}/convenio-cobranca`.
///
/// ```json
/// {
///   "numero_convenio": "3128557",
///   "carteira": "17",
///   "variacao_carteira": "35",
///   "juros_mensal_bps": 100,
///   "multa_bps": 200,
///   "dias_protesto": 15
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct NovoConvenio {
    pub numero_convenio: String,
    pub carteira: String,
    pub variacao_carteira: Option<String>,
    #[serde(default)]
    pub juros_mensal_bps: i32,
    #[serde(default)]
    pub multa_bps: i32,
    pub dias_protesto: Option<i32>,
    #[serde(default = "default_true")]
    pub ativo: bool,
}

impl NovoConvenio {
    pub fn normalizado(self) -> Result<Self, AppError> {
        let convenio = Self {
            numero_convenio: only_digits(&self.numero_convenio),
            carteira: self.carteira.trim().to_string(),
            variacao_carteira: clean_optional(self.variacao_carteira),
            ..self
        };

        let mut errors = FieldErrors::new();
        validation::digits(&mut errors, "numero_convenio", &convenio.numero_convenio, 4, 20);
        validation::digits(&mut errors, "carteira", &convenio.carteira, 1, 5);
        if let Some(variacao) = &convenio.variacao_carteira {
            validation::digits(&mut errors, "variacao_carteira", variacao, 1, 5);
        }
        validation::range_i32(&mut errors, "juros_mensal_bps", convenio.juros_mensal_bps, 0, 10_000);
        validation::range_i32(&mut errors, "multa_bps", convenio.multa_bps, 0, 10_000);
        if let Some(dias) = convenio.dias_protesto {
            validation::range_i32(&mut errors, "dias_protesto", dias, 0, 90);
        }
        errors.into_result()?;

        Ok(convenio)
    }
}

/// Request body for `PATCH /api/contas-correntes/{id}/convenio-cobranca`.
#[derive(Debug, Default, Deserialize)]
pub struct AtualizarConvenio {
    pub numero_convenio: Option<String>,
    pub carteira: Option<String>,
    pub variacao_carteira: Option<String>,
    pub juros_mensal_bps: Option<i32>,
    pub multa_bps: Option<i32>,
    pub dias_protesto: Option<i32>,
    pub ativo: Option<bool>,
}

impl AtualizarConvenio {
    pub fn aplicar(self, atual: ConvenioCobranca) -> NovoConvenio {
        NovoConvenio {
            numero_convenio: self.numero_convenio.unwrap_or(atual.numero_convenio),
            carteira: self.carteira.unwrap_or(atual.carteira),
            variacao_carteira: self.variacao_carteira.or(atual.variacao_carteira),
            juros_mensal_bps: self.juros_mensal_bps.unwrap_or(atual.juros_mensal_bps),
            multa_bps: self.multa_bps.unwrap_or(atual.multa_bps),
            dias_protesto: self.dias_protesto.or(atual.dias_protesto),
            ativo: self.ativo.unwrap_or(atual.ativo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credencial() -> CredencialApi {
        let now = Utc::now();
        CredencialApi {
            id: Uuid::new_v4(),
            conta_corrente_id: Uuid::new_v4(),
            modalidade: "pix".into(),
            ambiente: "sandbox".into(),
            client_id: "client".into(),
            client_secret: "super-secret-9f3a".into(),
            chave_aplicacao: None,
            ativo: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn response_never_contains_the_secret() {
        let response = CredencialApiResponse::from(credencial());
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("super-secret"));
        assert!(json.contains("9f3a"));
        assert!(!response.possui_chave_aplicacao);
    }

    #[test]
    fn modality_cannot_change_on_update() {
        let update = AtualizarCredencial {
            client_secret: Some("novo-segredo".into()),
            ..Default::default()
        };
        assert!(update.rotaciona_segredo());

        let merged = update.aplicar(credencial());
        assert_eq!(merged.modalidade, "pix");
        assert_eq!(merged.client_secret, "novo-segredo");
    }

    #[test]
    fn unknown_modality_is_rejected() {
        let result = NovaCredencial {
            modalidade: "cartao".into(),
            ambiente: "PRODUCAO".into(),
            client_id: "id".into(),
            client_secret: "secret".into(),
            chave_aplicacao: None,
            ativo: true,
        }
        .normalizado();

        match result {
            Err(AppError::Validation(errors)) => {
                assert!(errors.get("modalidade").is_some());
                assert!(errors.get("ambiente").is_none());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn convenio_rates_are_bounded() {
        let result = NovoConvenio {
            numero_convenio: "3128557".into(),
            carteira: "17".into(),
            variacao_carteira: None,
            juros_mensal_bps: 10_001,
            multa_bps: -1,
            dias_protesto: Some(120),
            ativo: true,
        }
        .normalizado();

        match result {
            Err(AppError::Validation(errors)) => {
                assert!(errors.get("juros_mensal_bps").is_some());
                assert!(errors.get("multa_bps").is_some());
                assert!(errors.get("dias_protesto").is_some());
                assert!(errors.get("numero_convenio").is_none());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
