//! Banana ripening models: colour tags (fitas) and tagged-bunch registrations (controles).
//!
//! Growers tie a coloured tape to each bunch the week it flowers. A
//! `ControleBanana` records how many bunches of one colour were tagged in
//! one field area on one date; the harvest window follows from that date.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, FieldErrors},
    services::{
        hoje,
        maturacao::{JanelaColheita, StatusMaturacao, dias_decorridos},
        validation::{self, clean_optional},
    },
};

/// A row of the `fitas_banana` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct FitaBanana {
    pub id: Uuid,
    pub nome: String,

    /// `#RRGGBB`, upper case
    pub cor_hex: String,

    pub descricao: Option<String>,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /api/fitas-banana`.
#[derive(Debug, Clone, Deserialize)]
pub struct NovaFita {
    pub nome: String,
    pub cor_hex: String,
    pub descricao: Option<String>,
    #[serde(default = "default_true")]
    pub ativo: bool,
}

fn default_true() -> bool {
    true
}

impl NovaFita {
    pub fn normalizado(self) -> Result<Self, AppError> {
        let fita = Self {
            nome: self.nome.trim().to_string(),
            cor_hex: self.cor_hex.trim().to_uppercase(),
            descricao: clean_optional(self.descricao),
            ativo: self.ativo,
        };

        let mut errors = FieldErrors::new();
        validation::required(&mut errors, "nome", &fita.nome, 60);
        validation::hex_color(&mut errors, "cor_hex", &fita.cor_hex);
        errors.into_result()?;

        Ok(fita)
    }
}

/// Request body for `PATCH /api/fitas-banana/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct AtualizarFita {
    pub nome: Option<String>,
    pub cor_hex: Option<String>,
    pub descricao: Option<String>,
    pub ativo: Option<bool>,
}

impl AtualizarFita {
    pub fn aplicar(self, atual: FitaBanana) -> NovaFita {
        NovaFita {
            nome: self.nome.unwrap_or(atual.nome),
            cor_hex: self.cor_hex.unwrap_or(atual.cor_hex),
            descricao: self.descricao.or(atual.descricao),
            ativo: self.ativo.unwrap_or(atual.ativo),
        }
    }
}

/// A `controles_banana` row joined with its tag.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ControleBanana {
    pub id: Uuid,
    pub fita_id: Uuid,
    pub fita_nome: String,
    pub fita_cor_hex: String,
    pub area: String,
    pub data_registro: NaiveDate,
    pub quantidade_cachos: i32,
    pub cachos_colhidos: i32,
    pub observacoes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ControleBanana {
    pub fn cachos_pendentes(&self) -> i32 {
        (self.quantidade_cachos - self.cachos_colhidos).max(0)
    }

    pub fn status_em(&self, referencia: NaiveDate) -> StatusMaturacao {
        StatusMaturacao::from_dias(dias_decorridos(self.data_registro, referencia))
    }
}

/// Registration with its maturation data computed against a reference date.
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "fita_id": "660e8400-e29b-41d4-a716-446655440001",
///   "fita_nome": "Azul",
///   "fita_cor_hex": "#1E40AF",
///   "area": "Talhão 3",
///   "data_registro": "2025-01-01",
///   "quantidade_cachos": 320,
///   "cachos_colhidos": 40,
///   "cachos_pendentes": 280,
///   "data_referencia": "2025-04-20",
///   "dias_decorridos": 109,
///   "status_maturacao": "colheita",
///   "inicio_colheita": "2025-04-11",
///   "fim_colheita": "2025-04-26",
///   "data_limite": "2025-05-01"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ControleBananaResponse {
    pub id: Uuid,
    pub fita_id: Uuid,
    pub fita_nome: String,
    pub fita_cor_hex: String,
    pub area: String,
    pub data_registro: NaiveDate,
    pub quantidade_cachos: i32,
    pub cachos_colhidos: i32,
    pub cachos_pendentes: i32,
    pub observacoes: Option<String>,
    pub data_referencia: NaiveDate,
    pub dias_decorridos: i64,
    pub status_maturacao: StatusMaturacao,
    #[serde(flatten)]
    pub janela: JanelaColheita,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ControleBananaResponse {
    pub fn new(controle: ControleBanana, referencia: NaiveDate) -> Self {
        let dias = dias_decorridos(controle.data_registro, referencia);
        Self {
            cachos_pendentes: controle.cachos_pendentes(),
            data_referencia: referencia,
            dias_decorridos: dias,
            status_maturacao: StatusMaturacao::from_dias(dias),
            janela: JanelaColheita::para(controle.data_registro),
            id: controle.id,
            fita_id: controle.fita_id,
            fita_nome: controle.fita_nome,
            fita_cor_hex: controle.fita_cor_hex,
            area: controle.area,
            data_registro: controle.data_registro,
            quantidade_cachos: controle.quantidade_cachos,
            cachos_colhidos: controle.cachos_colhidos,
            observacoes: controle.observacoes,
            created_at: controle.created_at,
            updated_at: controle.updated_at,
        }
    }
}

/// Request body for `POST /api/controle-banana`.
///
/// ```json
/// {
///   "fita_id": "660e8400-e29b-41d4-a716-446655440001",
///   "area": "Talhão 3",
///   "data_registro": "2025-01-01",
///   "quantidade_cachos": 320
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct NovoControle {
    pub fita_id: Uuid,
    pub area: String,
    pub data_registro: NaiveDate,
    pub quantidade_cachos: i32,
    pub observacoes: Option<String>,
}

impl NovoControle {
    /// Validate against `hoje`; registrations cannot be dated in the future.
    pub fn normalizado(self, hoje: NaiveDate) -> Result<Self, AppError> {
        let controle = Self {
            area: self.area.trim().to_string(),
            observacoes: clean_optional(self.observacoes),
            ..self
        };

        let mut errors = FieldErrors::new();
        validation::required(&mut errors, "area", &controle.area, 120);
        validation::positive_i32(&mut errors, "quantidade_cachos", controle.quantidade_cachos);
        validation::data(&mut errors, "data_registro", controle.data_registro);
        if controle.data_registro > hoje {
            errors.add("data_registro", "cannot be in the future");
        }
        errors.into_result()?;

        Ok(controle)
    }
}

/// Request body for `PATCH /api/controle-banana/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct AtualizarControle {
    pub fita_id: Option<Uuid>,
    pub area: Option<String>,
    pub data_registro: Option<NaiveDate>,
    pub quantidade_cachos: Option<i32>,
    pub observacoes: Option<String>,
}

impl AtualizarControle {
    pub fn aplicar(self, atual: &ControleBanana) -> NovoControle {
        NovoControle {
            fita_id: self.fita_id.unwrap_or(atual.fita_id),
            area: self.area.unwrap_or_else(|| atual.area.clone()),
            data_registro: self.data_registro.unwrap_or(atual.data_registro),
            quantidade_cachos: self.quantidade_cachos.unwrap_or(atual.quantidade_cachos),
            observacoes: self.observacoes.or_else(|| atual.observacoes.clone()),
        }
    }
}

/// Request body for `POST /api/controle-banana/{id}/colheitas`.
#[derive(Debug, Deserialize)]
pub struct RegistrarColheitaCachos {
    pub quantidade: i32,
}

/// Query string shared by the list, detail and summary endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct FiltroControles {
    pub fita_id: Option<Uuid>,
    pub area: Option<String>,
    pub status: Option<StatusMaturacao>,

    /// Defaults to today
    pub data_referencia: Option<NaiveDate>,
}

/// Query string for `GET /api/controle-banana/calendario`.
#[derive(Debug, Deserialize)]
pub struct PeriodoCalendario {
    pub inicio: NaiveDate,
    pub fim: NaiveDate,

    /// Date the entries' maturation is projected to, defaults to today
    pub data_referencia: Option<NaiveDate>,
}

impl PeriodoCalendario {
    pub fn referencia(&self) -> NaiveDate {
        self.data_referencia.unwrap_or_else(hoje)
    }
}

/// Per-status totals for `GET /api/controle-banana/resumo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResumoStatus {
    pub registros: i64,
    pub cachos_pendentes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn controle() -> ControleBanana {
        let now = Utc::now();
        ControleBanana {
            id: Uuid::new_v4(),
            fita_id: Uuid::new_v4(),
            fita_nome: "Azul".into(),
            fita_cor_hex: "#1E40AF".into(),
            area: "Talhão 3".into(),
            data_registro: date(2025, 1, 1),
            quantidade_cachos: 320,
            cachos_colhidos: 40,
            observacoes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn response_derives_maturation_fields() {
        let response = ControleBananaResponse::new(controle(), date(2025, 4, 20));
        assert_eq!(response.dias_decorridos, 109);
        assert_eq!(response.status_maturacao, StatusMaturacao::Colheita);
        assert_eq!(response.cachos_pendentes, 280);
        assert_eq!(response.janela.inicio_colheita, date(2025, 4, 11));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status_maturacao"], "colheita");
        assert_eq!(json["data_limite"], "2025-05-01");
    }

    #[test]
    fn future_registration_is_rejected() {
        let request = NovoControle {
            fita_id: Uuid::new_v4(),
            area: " ".into(),
            data_registro: date(2025, 6, 2),
            quantidade_cachos: 10,
            observacoes: None,
        };
        match request.normalizado(date(2025, 6, 1)) {
            Err(AppError::Validation(errors)) => {
                assert!(errors.get("data_registro").is_some());
                assert!(errors.get("area").is_some());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn registration_before_supported_years_is_rejected() {
        let request = NovoControle {
            fita_id: Uuid::new_v4(),
            area: "Talhão 1".into(),
            data_registro: date(-4800, 1, 1),
            quantidade_cachos: 10,
            observacoes: None,
        };
        match request.normalizado(date(2025, 6, 1)) {
            Err(AppError::Validation(errors)) => assert!(errors.get("data_registro").is_some()),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn calendar_period_projects_to_reference_date() {
        let periodo = PeriodoCalendario {
            inicio: date(2025, 4, 1),
            fim: date(2025, 4, 30),
            data_referencia: Some(date(2025, 4, 20)),
        };
        assert_eq!(periodo.referencia(), date(2025, 4, 20));

        let sem_referencia = PeriodoCalendario {
            data_referencia: None,
            ..periodo
        };
        assert_eq!(sem_referencia.referencia(), hoje());
    }

    #[test]
    fn fita_color_is_upper_cased() {
        let fita = NovaFita {
            nome: "Vermelha".into(),
            cor_hex: "#dc2626".into(),
            descricao: None,
            ativo: true,
        }
        .normalizado()
        .unwrap();
        assert_eq!(fita.cor_hex, "#DC2626");
    }
}
