//! Supplier financial statistics.
//!
//! Single pass over a supplier's orders, which already carry their paid
//! totals.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::pedido::{Pedido, PedidoStatus};

/// Response body for `GET /api/fornecedores/{id}/estatisticas`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstatisticasFornecedor {
    pub fornecedor_id: Uuid,
    pub total_pedidos: i64,

    /// Every status is present, zero when no order is in it
    pub pedidos_por_status: BTreeMap<&'static str, i64>,

    pub caixas_previstas: i64,
    pub caixas_colhidas: i64,
    pub valor_total_cents: i64,
    pub valor_pago_cents: i64,
    pub saldo_pendente_cents: i64,

    /// Priced value over priced boxes; `None` while nothing is priced
    pub preco_medio_caixa_cents: Option<i64>,

    pub primeiro_pedido_em: Option<DateTime<Utc>>,
    pub ultimo_pedido_em: Option<DateTime<Utc>>,
}

/// Sums saturate at `i64::MAX` instead of wrapping.
pub fn calcular(fornecedor_id: Uuid, pedidos: &[Pedido]) -> EstatisticasFornecedor {
    let mut pedidos_por_status: BTreeMap<&'static str, i64> = PedidoStatus::ALL
        .iter()
        .map(|status| (status.as_str(), 0))
        .collect();

    let mut caixas_previstas = 0i64;
    let mut caixas_colhidas = 0i64;
    let mut caixas_precificadas = 0i64;
    let mut valor_total_cents = 0i64;
    let mut valor_pago_cents = 0i64;
    let mut saldo_pendente_cents = 0i64;
    let mut primeiro: Option<DateTime<Utc>> = None;
    let mut ultimo: Option<DateTime<Utc>> = None;

    for pedido in pedidos {
        if let Ok(status) = pedido.status.parse::<PedidoStatus>() {
            *pedidos_por_status.entry(status.as_str()).or_insert(0) += 1;
        }

        caixas_previstas =
            caixas_previstas.saturating_add(i64::from(pedido.quantidade_caixas_prevista));
        let colhidas = pedido.quantidade_caixas_colhida.map(i64::from).unwrap_or(0);
        caixas_colhidas = caixas_colhidas.saturating_add(colhidas);

        if let Some(total) = pedido.valor_total_cents {
            valor_total_cents = valor_total_cents.saturating_add(total);
            caixas_precificadas = caixas_precificadas.saturating_add(colhidas);
        }
        valor_pago_cents = valor_pago_cents.saturating_add(pedido.valor_pago_cents);
        saldo_pendente_cents = saldo_pendente_cents.saturating_add(pedido.saldo_cents());

        primeiro = Some(primeiro.map_or(pedido.created_at, |p| p.min(pedido.created_at)));
        ultimo = Some(ultimo.map_or(pedido.created_at, |u| u.max(pedido.created_at)));
    }

    let preco_medio_caixa_cents =
        (caixas_precificadas > 0).then(|| valor_total_cents / caixas_precificadas);

    EstatisticasFornecedor {
        fornecedor_id,
        total_pedidos: pedidos.len() as i64,
        pedidos_por_status,
        caixas_previstas,
        caixas_colhidas,
        valor_total_cents,
        valor_pago_cents,
        saldo_pendente_cents,
        preco_medio_caixa_cents,
        primeiro_pedido_em: primeiro,
        ultimo_pedido_em: ultimo,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pedido(
        status: PedidoStatus,
        prevista: i32,
        colhida: Option<i32>,
        preco: Option<i64>,
        pago: i64,
        dia: u32,
    ) -> Pedido {
        let created_at = Utc.with_ymd_and_hms(2025, 3, dia, 12, 0, 0).unwrap();
        Pedido {
            id: Uuid::new_v4(),
            fornecedor_id: Uuid::nil(),
            cliente: "Ceasa".into(),
            status: status.as_str().into(),
            quantidade_caixas_prevista: prevista,
            data_prevista: None,
            quantidade_caixas_colhida: colhida,
            data_colheita: None,
            preco_caixa_cents: preco,
            valor_total_cents: colhida.zip(preco).map(|(c, p)| i64::from(c) * p),
            valor_pago_cents: pago,
            observacoes: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn empty_supplier_has_zeroed_statistics() {
        let stats = calcular(Uuid::nil(), &[]);
        assert_eq!(stats.total_pedidos, 0);
        assert_eq!(stats.pedidos_por_status.len(), 5);
        assert!(stats.pedidos_por_status.values().all(|count| *count == 0));
        assert_eq!(stats.preco_medio_caixa_cents, None);
        assert_eq!(stats.primeiro_pedido_em, None);
    }

    #[test]
    fn aggregates_orders_and_payments() {
        let pedidos = vec![
            pedido(PedidoStatus::Criado, 100, None, None, 0, 3),
            pedido(PedidoStatus::Colhido, 200, Some(180), None, 0, 1),
            pedido(PedidoStatus::Precificado, 50, Some(50), Some(4_000), 50_000, 5),
            pedido(PedidoStatus::Pago, 100, Some(100), Some(3_000), 300_000, 2),
        ];

        let stats = calcular(Uuid::nil(), &pedidos);

        assert_eq!(stats.total_pedidos, 4);
        assert_eq!(stats.pedidos_por_status["criado"], 1);
        assert_eq!(stats.pedidos_por_status["pago"], 1);
        assert_eq!(stats.pedidos_por_status["finalizado"], 0);
        assert_eq!(stats.caixas_previstas, 450);
        assert_eq!(stats.caixas_colhidas, 330);
        assert_eq!(stats.valor_total_cents, 200_000 + 300_000);
        assert_eq!(stats.valor_pago_cents, 350_000);
        assert_eq!(stats.saldo_pendente_cents, 150_000);
        // 500_000 cents over 150 priced boxes
        assert_eq!(stats.preco_medio_caixa_cents, Some(3_333));
        assert_eq!(stats.primeiro_pedido_em, Some(pedidos[1].created_at));
        assert_eq!(stats.ultimo_pedido_em, Some(pedidos[2].created_at));
    }

    #[test]
    fn huge_totals_saturate_instead_of_overflowing() {
        let mut caro = pedido(PedidoStatus::Precificado, 1, Some(1), Some(1), 0, 4);
        caro.valor_total_cents = Some(i64::MAX);
        let pedidos = vec![caro.clone(), caro];

        let stats = calcular(Uuid::nil(), &pedidos);

        assert_eq!(stats.valor_total_cents, i64::MAX);
        assert_eq!(stats.saldo_pendente_cents, i64::MAX);
        assert_eq!(stats.preco_medio_caixa_cents, Some(i64::MAX / 2));
    }
}
