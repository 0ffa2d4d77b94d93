//! Supplier (fornecedor) models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, FieldErrors},
    services::validation::{self, clean_optional, only_digits},
};

/// A row of the `fornecedores` table.
///
/// `documento` is stored digits-only: 11 digits for a CPF, 14 for a CNPJ.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Fornecedor {
    pub id: Uuid,
    pub nome: String,
    pub documento: String,
    pub telefone: Option<String>,
    pub email: Option<String>,
    pub logradouro: Option<String>,
    pub cidade: Option<String>,
    pub uf: Option<String>,
    pub cep: Option<String>,

    /// Coordinates picked on the map in the front end
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /api/fornecedores`.
///
/// ```json
/// {
///   "nome": "Sítio Boa Vista",
///   "documento": "11.222.333/0001-81",
///   "telefone": "(47) 99999-0000",
///   "cidade": "Corupá",
///   "uf": "SC",
///   "latitude": -26.43,
///   "longitude": -49.24
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct NovoFornecedor {
    pub nome: String,
    pub documento: String,
    pub telefone: Option<String>,
    pub email: Option<String>,
    pub logradouro: Option<String>,
    pub cidade: Option<String>,
    pub uf: Option<String>,
    pub cep: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default = "default_true")]
    pub ativo: bool,
}

fn default_true() -> bool {
    true
}

impl NovoFornecedor {
    /// Normalize formatting (digits-only document, upper-case UF, trimmed
    /// strings) and validate every field.
    pub fn normalizado(self) -> Result<Self, AppError> {
        let fornecedor = Self {
            nome: self.nome.trim().to_string(),
            documento: only_digits(&self.documento),
            telefone: clean_optional(self.telefone),
            email: clean_optional(self.email).map(|e| e.to_lowercase()),
            logradouro: clean_optional(self.logradouro),
            cidade: clean_optional(self.cidade),
            uf: clean_optional(self.uf).map(|uf| uf.to_uppercase()),
            cep: clean_optional(self.cep).map(|cep| only_digits(&cep)),
            latitude: self.latitude,
            longitude: self.longitude,
            ativo: self.ativo,
        };

        let mut errors = FieldErrors::new();
        validation::required(&mut errors, "nome", &fornecedor.nome, 200);
        validation::documento(&mut errors, "documento", &fornecedor.documento);
        validation::max_len(&mut errors, "telefone", fornecedor.telefone.as_deref(), 20);
        if let Some(email) = &fornecedor.email {
            validation::email(&mut errors, "email", email);
        }
        validation::max_len(&mut errors, "logradouro", fornecedor.logradouro.as_deref(), 200);
        validation::max_len(&mut errors, "cidade", fornecedor.cidade.as_deref(), 120);
        if let Some(uf) = &fornecedor.uf {
            validation::uf(&mut errors, "uf", uf);
        }
        if let Some(cep) = &fornecedor.cep {
            validation::digits(&mut errors, "cep", cep, 8, 8);
        }
        validation::latitude(&mut errors, fornecedor.latitude);
        validation::longitude(&mut errors, fornecedor.longitude);
        errors.into_result()?;

        Ok(fornecedor)
    }
}

/// Request body for `PATCH /api/fornecedores/{id}`. Absent fields are kept.
#[derive(Debug, Default, Deserialize)]
pub struct AtualizarFornecedor {
    pub nome: Option<String>,
    pub documento: Option<String>,
    pub telefone: Option<String>,
    pub email: Option<String>,
    pub logradouro: Option<String>,
    pub cidade: Option<String>,
    pub uf: Option<String>,
    pub cep: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub ativo: Option<bool>,
}

impl AtualizarFornecedor {
    /// Overlay the changes on the stored record.
    pub fn aplicar(self, atual: Fornecedor) -> NovoFornecedor {
        NovoFornecedor {
            nome: self.nome.unwrap_or(atual.nome),
            documento: self.documento.unwrap_or(atual.documento),
            telefone: self.telefone.or(atual.telefone),
            email: self.email.or(atual.email),
            logradouro: self.logradouro.or(atual.logradouro),
            cidade: self.cidade.or(atual.cidade),
            uf: self.uf.or(atual.uf),
            cep: self.cep.or(atual.cep),
            latitude: self.latitude.or(atual.latitude),
            longitude: self.longitude.or(atual.longitude),
            ativo: self.ativo.unwrap_or(atual.ativo),
        }
    }
}

/// Query string for `GET /api/fornecedores`.
#[derive(Debug, Default, Deserialize)]
pub struct FiltroFornecedores {
    pub ativo: Option<bool>,

    /// Case-insensitive match on name, or prefix match on the document digits
    pub busca: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn novo() -> NovoFornecedor {
        NovoFornecedor {
            nome: "  Sítio Boa Vista ".into(),
            documento: "11.222.333/0001-81".into(),
            telefone: Some(" ".into()),
            email: Some("Compras@SitioBoaVista.com.br".into()),
            logradouro: None,
            cidade: Some("Corupá".into()),
            uf: Some("sc".into()),
            cep: Some("89278-000".into()),
            latitude: Some(-26.43),
            longitude: Some(-49.24),
            ativo: true,
        }
    }

    #[test]
    fn normalizes_formatting() {
        let fornecedor = novo().normalizado().unwrap();
        assert_eq!(fornecedor.nome, "Sítio Boa Vista");
        assert_eq!(fornecedor.documento, "11222333000181");
        assert_eq!(fornecedor.telefone, None);
        assert_eq!(fornecedor.email.as_deref(), Some("compras@sitioboavista.com.br"));
        assert_eq!(fornecedor.uf.as_deref(), Some("SC"));
        assert_eq!(fornecedor.cep.as_deref(), Some("89278000"));
    }

    #[test]
    fn reports_all_bad_fields() {
        let mut request = novo();
        request.nome = "".into();
        request.documento = "123".into();
        request.latitude = Some(95.0);

        match request.normalizado() {
            Err(AppError::Validation(errors)) => {
                assert!(errors.get("nome").is_some());
                assert!(errors.get("documento").is_some());
                assert!(errors.get("latitude").is_some());
                assert!(errors.get("uf").is_none());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
