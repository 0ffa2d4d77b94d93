//! Business logic services.
//!
//! Services validate requests, run the SQL (inside a transaction when
//! several rows must change together) and log business events.

use chrono::{NaiveDate, Utc};

pub mod banana_service;
pub mod bancario_service;
pub mod certificado_service;
pub mod configuracao_service;
pub mod estatisticas;
pub mod fornecedor_service;
pub mod maturacao;
pub mod pedido_service;
pub mod validation;
pub mod whatsapp_service;

/// Current date in UTC, the default reference for date-derived fields.
pub fn hoje() -> NaiveDate {
    Utc::now().date_naive()
}
