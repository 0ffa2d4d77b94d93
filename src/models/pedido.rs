//! Order (pedido) and order payment models.
//!
//! An order moves through `criado → colhido → precificado → pago → finalizado`.
//! Amounts are integer cents.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, FieldErrors},
    services::validation::{self, clean_optional},
};

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PedidoStatus {
    Criado,
    Colhido,
    Precificado,
    Pago,
    Finalizado,
}

impl PedidoStatus {
    pub const ALL: [PedidoStatus; 5] = [
        PedidoStatus::Criado,
        PedidoStatus::Colhido,
        PedidoStatus::Precificado,
        PedidoStatus::Pago,
        PedidoStatus::Finalizado,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PedidoStatus::Criado => "criado",
            PedidoStatus::Colhido => "colhido",
            PedidoStatus::Precificado => "precificado",
            PedidoStatus::Pago => "pago",
            PedidoStatus::Finalizado => "finalizado",
        }
    }

    /// The state that follows this one, `None` for `finalizado`.
    pub fn proximo(&self) -> Option<PedidoStatus> {
        match self {
            PedidoStatus::Criado => Some(PedidoStatus::Colhido),
            PedidoStatus::Colhido => Some(PedidoStatus::Precificado),
            PedidoStatus::Precificado => Some(PedidoStatus::Pago),
            PedidoStatus::Pago => Some(PedidoStatus::Finalizado),
            PedidoStatus::Finalizado => None,
        }
    }

    /// Fail with a business-rule error unless the order is in `esperado`.
    pub fn exigir(&self, esperado: PedidoStatus, operacao: &str) -> Result<(), AppError> {
        if *self == esperado {
            Ok(())
        } else {
            Err(AppError::BusinessRule(format!(
                "cannot {operacao}: order is '{self}', expected '{esperado}'"
            )))
        }
    }
}

impl fmt::Display for PedidoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PedidoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PedidoStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status '{s}'"))
    }
}

/// A row of the `pedidos` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Pedido {
    pub id: Uuid,
    pub fornecedor_id: Uuid,
    pub cliente: String,

    /// One of the [`PedidoStatus`] wire names (enforced by a CHECK constraint)
    pub status: String,

    pub quantidade_caixas_prevista: i32,
    pub data_prevista: Option<NaiveDate>,
    pub quantidade_caixas_colhida: Option<i32>,
    pub data_colheita: Option<NaiveDate>,
    pub preco_caixa_cents: Option<i64>,

    /// `quantidade_caixas_colhida × preco_caixa_cents`, set on pricing
    pub valor_total_cents: Option<i64>,

    /// Sum of the order's payments
    pub valor_pago_cents: i64,

    pub observacoes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pedido {
    pub fn status(&self) -> Result<PedidoStatus, AppError> {
        self.status.parse().map_err(AppError::InvalidRequest)
    }

    /// Amount still owed, zero until the order is priced.
    pub fn saldo_cents(&self) -> i64 {
        self.valor_total_cents
            .map(|total| (total - self.valor_pago_cents).max(0))
            .unwrap_or(0)
    }
}

/// A row of the `pagamentos_pedido` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PagamentoPedido {
    pub id: Uuid,
    pub pedido_id: Uuid,
    pub valor_cents: i64,
    pub data_pagamento: NaiveDate,
    pub forma: String,
    pub observacao: Option<String>,

    /// Operator whose token registered the payment
    pub registrado_por: String,

    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /api/pedidos`.
///
/// ```json
/// {
///   "fornecedor_id": "550e8400-e29b-41d4-a716-446655440000",
///   "cliente": "Ceasa Curitiba",
///   "quantidade_caixas_prevista": 400,
///   "data_prevista": "2025-05-02"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct NovoPedido {
    pub fornecedor_id: Uuid,
    pub cliente: String,
    pub quantidade_caixas_prevista: i32,
    pub data_prevista: Option<NaiveDate>,
    pub observacoes: Option<String>,
}

impl NovoPedido {
    pub fn normalizado(self) -> Result<Self, AppError> {
        let pedido = Self {
            cliente: self.cliente.trim().to_string(),
            observacoes: clean_optional(self.observacoes),
            ..self
        };

        let mut errors = FieldErrors::new();
        validation::required(&mut errors, "cliente", &pedido.cliente, 200);
        validation::positive_i32(
            &mut errors,
            "quantidade_caixas_prevista",
            pedido.quantidade_caixas_prevista,
        );
        if let Some(data) = pedido.data_prevista {
            validation::data(&mut errors, "data_prevista", data);
        }
        errors.into_result()?;

        Ok(pedido)
    }
}

/// Request body for `PATCH /api/pedidos/{id}`; only allowed while `criado`.
#[derive(Debug, Default, Deserialize)]
pub struct AtualizarPedido {
    pub cliente: Option<String>,
    pub quantidade_caixas_prevista: Option<i32>,
    pub data_prevista: Option<NaiveDate>,
    pub observacoes: Option<String>,
}

impl AtualizarPedido {
    pub fn aplicar(self, atual: Pedido) -> NovoPedido {
        NovoPedido {
            fornecedor_id: atual.fornecedor_id,
            cliente: self.cliente.unwrap_or(atual.cliente),
            quantidade_caixas_prevista: self
                .quantidade_caixas_prevista
                .unwrap_or(atual.quantidade_caixas_prevista),
            data_prevista: self.data_prevista.or(atual.data_prevista),
            observacoes: self.observacoes.or(atual.observacoes),
        }
    }
}

/// Request body for `POST /api/pedidos/{id}/colheita`.
#[derive(Debug, Deserialize)]
pub struct RegistrarColheitaPedido {
    pub quantidade_caixas: i32,
    pub data_colheita: NaiveDate,
}

/// Request body for `POST /api/pedidos/{id}/precificacao`.
#[derive(Debug, Deserialize)]
pub struct PrecificarPedido {
    pub preco_caixa_cents: i64,
}

/// Accepted payment methods.
pub const FORMAS_PAGAMENTO: [&str; 4] = ["pix", "boleto", "transferencia", "dinheiro"];

/// Request body for `POST /api/pedidos/{id}/pagamentos`.
///
/// ```json
/// {
///   "valor_cents": 250000,
///   "data_pagamento": "2025-05-10",
///   "forma": "pix"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct NovoPagamento {
    pub valor_cents: i64,
    pub data_pagamento: NaiveDate,
    pub forma: String,
    pub observacao: Option<String>,
}

impl NovoPagamento {
    pub fn normalizado(self) -> Result<Self, AppError> {
        let pagamento = Self {
            forma: self.forma.trim().to_lowercase(),
            observacao: clean_optional(self.observacao),
            ..self
        };

        let mut errors = FieldErrors::new();
        validation::positive_i64(&mut errors, "valor_cents", pagamento.valor_cents);
        if !FORMAS_PAGAMENTO.contains(&pagamento.forma.as_str()) {
            errors.add(
                "forma",
                format!("must be one of: {}", FORMAS_PAGAMENTO.join(", ")),
            );
        }
        validation::data(&mut errors, "data_pagamento", pagamento.data_pagamento);
        errors.into_result()?;

        Ok(pagamento)
    }
}

/// Query string for `GET /api/pedidos`.
#[derive(Debug, Default, Deserialize)]
pub struct FiltroPedidos {
    pub status: Option<String>,
    pub fornecedor_id: Option<Uuid>,
}

/// Order with its payments, returned by `GET /api/pedidos/{id}`.
#[derive(Debug, Serialize)]
pub struct PedidoDetalhado {
    #[serde(flatten)]
    pub pedido: Pedido,
    pub saldo_cents: i64,
    pub pagamentos: Vec<PagamentoPedido>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_is_linear() {
        let mut status = PedidoStatus::Criado;
        let mut visited = vec![status];
        while let Some(next) = status.proximo() {
            visited.push(next);
            status = next;
        }
        assert_eq!(visited, PedidoStatus::ALL.to_vec());
    }

    #[test]
    fn wrong_state_names_both_states() {
        let err = PedidoStatus::Colhido
            .exigir(PedidoStatus::Pago, "finalize")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot finalize: order is 'colhido', expected 'pago'"
        );
    }

    #[test]
    fn payment_method_must_be_known() {
        let pagamento = NovoPagamento {
            valor_cents: 100,
            data_pagamento: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
            forma: " PIX ".into(),
            observacao: Some("".into()),
        }
        .normalizado()
        .unwrap();
        assert_eq!(pagamento.forma, "pix");
        assert_eq!(pagamento.observacao, None);

        let invalid = NovoPagamento {
            forma: "cheque".into(),
            valor_cents: 0,
            ..pagamento
        }
        .normalizado();
        match invalid {
            Err(AppError::Validation(errors)) => {
                assert!(errors.get("forma").is_some());
                assert!(errors.get("valor_cents").is_some());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn payment_date_must_be_in_supported_years() {
        let pagamento = NovoPagamento {
            valor_cents: 100,
            data_pagamento: NaiveDate::from_ymd_opt(20_000, 1, 1).unwrap(),
            forma: "pix".into(),
            observacao: None,
        };
        match pagamento.normalizado() {
            Err(AppError::Validation(errors)) => assert!(errors.get("data_pagamento").is_some()),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
