//! Bank account (conta corrente) models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, FieldErrors},
    services::validation::{self, clean_optional, only_digits},
};

/// A row of the `contas_correntes` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ContaCorrente {
    pub id: Uuid,

    /// Three-digit bank code (COMPE), e.g. `"001"`
    pub banco_codigo: String,
    pub banco_nome: String,
    pub agencia: String,
    pub agencia_digito: Option<String>,
    pub numero_conta: String,
    pub conta_digito: Option<String>,
    pub titular: String,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /api/contas-correntes`.
///
/// ```json
/// {
///   "banco_codigo": "001",
///   "banco_nome": "Banco do Brasil",
///   "agencia": "1234",
///   "agencia_digito": "5",
///   "numero_conta": "98765",
///   "conta_digito": "X",
///   "titular": "Bananal Agrícola Ltda"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct NovaContaCorrente {
    pub banco_codigo: String,
    pub banco_nome: String,
    pub agencia: String,
    pub agencia_digito: Option<String>,
    pub numero_conta: String,
    pub conta_digito: Option<String>,
    pub titular: String,
    #[serde(default = "default_true")]
    pub ativo: bool,
}

fn default_true() -> bool {
    true
}

/// Check digits are one or two characters, digits or `X`.
fn check_digit(errors: &mut FieldErrors, field: &'static str, value: Option<&str>) {
    if let Some(value) = value {
        let valid = (1..=2).contains(&value.len())
            && value.chars().all(|c| c.is_ascii_digit() || c == 'X');
        if !valid {
            errors.add(field, "must be 1 or 2 digits (or X)");
        }
    }
}

impl NovaContaCorrente {
    pub fn normalizado(self) -> Result<Self, AppError> {
        let conta = Self {
            banco_codigo: self.banco_codigo.trim().to_string(),
            banco_nome: self.banco_nome.trim().to_string(),
            agencia: only_digits(&self.agencia),
            agencia_digito: clean_optional(self.agencia_digito).map(|d| d.to_uppercase()),
            numero_conta: only_digits(&self.numero_conta),
            conta_digito: clean_optional(self.conta_digito).map(|d| d.to_uppercase()),
            titular: self.titular.trim().to_string(),
            ativo: self.ativo,
        };

        let mut errors = FieldErrors::new();
        validation::digits(&mut errors, "banco_codigo", &conta.banco_codigo, 3, 3);
        validation::required(&mut errors, "banco_nome", &conta.banco_nome, 120);
        validation::digits(&mut errors, "agencia", &conta.agencia, 1, 5);
        check_digit(&mut errors, "agencia_digito", conta.agencia_digito.as_deref());
        validation::digits(&mut errors, "numero_conta", &conta.numero_conta, 1, 12);
        check_digit(&mut errors, "conta_digito", conta.conta_digito.as_deref());
        validation::required(&mut errors, "titular", &conta.titular, 200);
        errors.into_result()?;

        Ok(conta)
    }
}

/// Request body for `PATCH /api/contas-correntes/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct AtualizarContaCorrente {
    pub banco_codigo: Option<String>,
    pub banco_nome: Option<String>,
    pub agencia: Option<String>,
    pub agencia_digito: Option<String>,
    pub numero_conta: Option<String>,
    pub conta_digito: Option<String>,
    pub titular: Option<String>,
    pub ativo: Option<bool>,
}

impl AtualizarContaCorrente {
    pub fn aplicar(self, atual: ContaCorrente) -> NovaContaCorrente {
        NovaContaCorrente {
            banco_codigo: self.banco_codigo.unwrap_or(atual.banco_codigo),
            banco_nome: self.banco_nome.unwrap_or(atual.banco_nome),
            agencia: self.agencia.unwrap_or(atual.agencia),
            agencia_digito: self.agencia_digito.or(atual.agencia_digito),
            numero_conta: self.numero_conta.unwrap_or(atual.numero_conta),
            conta_digito: self.conta_digito.or(atual.conta_digito),
            titular: self.titular.unwrap_or(atual.titular),
            ativo: self.ativo.unwrap_or(atual.ativo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_formatting_from_numbers() {
        let conta = NovaContaCorrente {
            banco_codigo: "001".into(),
            banco_nome: "Banco do Brasil".into(),
            agencia: "1.234".into(),
            agencia_digito: Some("x".into()),
            numero_conta: "98.765".into(),
            conta_digito: None,
            titular: "Bananal Agrícola".into(),
            ativo: true,
        }
        .normalizado()
        .unwrap();

        assert_eq!(conta.agencia, "1234");
        assert_eq!(conta.agencia_digito.as_deref(), Some("X"));
        assert_eq!(conta.numero_conta, "98765");
    }

    #[test]
    fn bank_code_must_have_three_digits() {
        let result = NovaContaCorrente {
            banco_codigo: "1".into(),
            banco_nome: "Banco".into(),
            agencia: "1234".into(),
            agencia_digito: None,
            numero_conta: "".into(),
            conta_digito: Some("123".into()),
            titular: "Titular".into(),
            ativo: true,
        }
        .normalizado();

        match result {
            Err(AppError::Validation(errors)) => {
                assert!(errors.get("banco_codigo").is_some());
                assert!(errors.get("numero_conta").is_some());
                assert!(errors.get("conta_digito").is_some());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
