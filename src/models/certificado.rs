//! Digital certificates (e-CNPJ / bank API mTLS) and their expiry status.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    error::{AppError, FieldErrors},
    services::validation::{self, clean_optional},
};

/// A row of the `certificados` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Certificado {
    pub id: Uuid,
    pub nome: String,
    pub caminho_arquivo: String,
    pub emitido_para: Option<String>,
    pub valido_ate: NaiveDate,
    pub conta_corrente_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /api/certificados`.
///
/// ```json
/// {
///   "nome": "e-CNPJ Bananal",
///   "caminho_arquivo": "/etc/bananal/certs/ecnpj.pfx",
///   "emitido_para": "BANANAL LTDA:11222333000181",
///   "valido_ate": "2026-03-31"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct NovoCertificado {
    pub nome: String,
    pub caminho_arquivo: String,
    pub emitido_para: Option<String>,
    pub valido_ate: NaiveDate,
    pub conta_corrente_id: Option<Uuid>,
}

impl NovoCertificado {
    pub fn normalizado(self) -> Result<Self, AppError> {
        let certificado = Self {
            nome: self.nome.trim().to_string(),
            caminho_arquivo: self.caminho_arquivo.trim().to_string(),
            emitido_para: clean_optional(self.emitido_para),
            ..self
        };

        let mut errors = FieldErrors::new();
        validation::required(&mut errors, "nome", &certificado.nome, 120);
        validation::required(&mut errors, "caminho_arquivo", &certificado.caminho_arquivo, 1024);
        validation::max_len(
            &mut errors,
            "emitido_para",
            certificado.emitido_para.as_deref(),
            200,
        );
        validation::data(&mut errors, "valido_ate", certificado.valido_ate);
        errors.into_result()?;

        Ok(certificado)
    }
}

/// Request body for `PATCH /api/certificados/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct AtualizarCertificado {
    pub nome: Option<String>,
    pub caminho_arquivo: Option<String>,
    pub emitido_para: Option<String>,
    pub valido_ate: Option<NaiveDate>,
    pub conta_corrente_id: Option<Uuid>,
}

impl AtualizarCertificado {
    pub fn aplicar(self, atual: Certificado) -> NovoCertificado {
        NovoCertificado {
            nome: self.nome.unwrap_or(atual.nome),
            caminho_arquivo: self.caminho_arquivo.unwrap_or(atual.caminho_arquivo),
            emitido_para: self.emitido_para.or(atual.emitido_para),
            valido_ate: self.valido_ate.unwrap_or(atual.valido_ate),
            conta_corrente_id: self.conta_corrente_id.or(atual.conta_corrente_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCertificado {
    Valido,
    Expirando,
    Expirado,
}

impl StatusCertificado {
    /// `expirado` below zero days, `expirando` within `dias_alerta`.
    pub fn from_dias_restantes(dias_restantes: i64, dias_alerta: i64) -> Self {
        if dias_restantes < 0 {
            StatusCertificado::Expirado
        } else if dias_restantes <= dias_alerta {
            StatusCertificado::Expirando
        } else {
            StatusCertificado::Valido
        }
    }
}

/// One entry of `GET /api/certificados/monitor`.
#[derive(Debug, Clone, Serialize)]
pub struct SituacaoCertificado {
    #[serde(flatten)]
    pub certificado: Certificado,
    pub dias_restantes: i64,
    pub status: StatusCertificado,
    pub arquivo_presente: bool,
}

impl SituacaoCertificado {
    pub fn new(
        certificado: Certificado,
        hoje: NaiveDate,
        dias_alerta: i64,
        arquivo_presente: bool,
    ) -> Self {
        let dias_restantes = (certificado.valido_ate - hoje).num_days();
        Self {
            status: StatusCertificado::from_dias_restantes(dias_restantes, dias_alerta),
            dias_restantes,
            arquivo_presente,
            certificado,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn certificado(valido_ate: NaiveDate) -> Certificado {
        let now = Utc::now();
        Certificado {
            id: Uuid::new_v4(),
            nome: "e-CNPJ".into(),
            caminho_arquivo: "/tmp/none.pfx".into(),
            emitido_para: None,
            valido_ate,
            conta_corrente_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn status_thresholds() {
        assert_eq!(StatusCertificado::from_dias_restantes(-1, 30), StatusCertificado::Expirado);
        assert_eq!(StatusCertificado::from_dias_restantes(0, 30), StatusCertificado::Expirando);
        assert_eq!(StatusCertificado::from_dias_restantes(30, 30), StatusCertificado::Expirando);
        assert_eq!(StatusCertificado::from_dias_restantes(31, 30), StatusCertificado::Valido);
    }

    #[test]
    fn situation_counts_days_until_expiry() {
        let hoje = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let valido_ate = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        let situacao = SituacaoCertificado::new(certificado(valido_ate), hoje, 30, false);
        assert_eq!(situacao.dias_restantes, 10);
        assert_eq!(situacao.status, StatusCertificado::Expirando);

        let json = serde_json::to_value(&situacao).unwrap();
        assert_eq!(json["status"], "expirando");
        assert_eq!(json["arquivo_presente"], false);
        assert_eq!(json["nome"], "e-CNPJ");
    }
}
