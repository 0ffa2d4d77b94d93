//! Order lifecycle - core business logic for pedidos and their payments.
//!
//! # State Machine
//!
//! `criado → colhido → precificado → pago → finalizado`
//!
//! Every transition locks the order row (`FOR UPDATE`) inside a database
//! transaction, checks the current state and writes the new one atomically.
//! Payments and the order's paid total are updated in the same transaction.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, FieldErrors},
    models::pedido::{
        AtualizarPedido, FiltroPedidos, NovoPagamento, NovoPedido, PagamentoPedido, Pedido,
        PedidoDetalhado, PedidoStatus, RegistrarColheitaPedido,
    },
    services::validation,
};

/// Lock an order inside `tx` and return it, or 404.
async fn lock_pedido(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
) -> Result<Pedido, AppError> {
    sqlx::query_as::<_, Pedido>("SELECT * FROM pedidos WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::NotFound("pedido"))
}

async fn exigir_fornecedor_ativo(pool: &DbPool, fornecedor_id: Uuid) -> Result<(), AppError> {
    let ativo: Option<bool> = sqlx::query_scalar("SELECT ativo FROM fornecedores WHERE id = $1")
        .bind(fornecedor_id)
        .fetch_optional(pool)
        .await?;

    match ativo {
        None => Err(AppError::field("fornecedor_id", "supplier does not exist")),
        Some(false) => Err(AppError::field("fornecedor_id", "supplier is inactive")),
        Some(true) => Ok(()),
    }
}

/// Create an order in state `criado`.
///
/// # Errors
///
/// - `Validation`: empty client, non-positive box count, unknown or inactive supplier
pub async fn criar(pool: &DbPool, request: NovoPedido) -> Result<Pedido, AppError> {
    let novo = request.normalizado()?;
    exigir_fornecedor_ativo(pool, novo.fornecedor_id).await?;

    let pedido = sqlx::query_as::<_, Pedido>(
        r#"
        INSERT INTO pedidos (
            fornecedor_id, cliente, quantidade_caixas_prevista, data_prevista, observacoes
        )
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(novo.fornecedor_id)
    .bind(&novo.cliente)
    .bind(novo.quantidade_caixas_prevista)
    .bind(novo.data_prevista)
    .bind(&novo.observacoes)
    .fetch_one(pool)
    .await?;

    tracing::info!(pedido_id = %pedido.id, fornecedor_id = %pedido.fornecedor_id, "order created");
    Ok(pedido)
}

pub async fn listar(pool: &DbPool, filtro: FiltroPedidos) -> Result<Vec<Pedido>, AppError> {
    let status = filtro
        .status
        .as_deref()
        .map(str::parse::<PedidoStatus>)
        .transpose()
        .map_err(|msg| AppError::field("status", msg))?;

    let pedidos = sqlx::query_as::<_, Pedido>(
        r#"
        SELECT * FROM pedidos
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::UUID IS NULL OR fornecedor_id = $2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .bind(filtro.fornecedor_id)
    .fetch_all(pool)
    .await?;

    Ok(pedidos)
}

pub async fn buscar(pool: &DbPool, id: Uuid) -> Result<Pedido, AppError> {
    sqlx::query_as::<_, Pedido>("SELECT * FROM pedidos WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("pedido"))
}

pub async fn listar_pagamentos(
    pool: &DbPool,
    pedido_id: Uuid,
) -> Result<Vec<PagamentoPedido>, AppError> {
    let pagamentos = sqlx::query_as::<_, PagamentoPedido>(
        "SELECT * FROM pagamentos_pedido WHERE pedido_id = $1 ORDER BY data_pagamento DESC, created_at DESC",
    )
    .bind(pedido_id)
    .fetch_all(pool)
    .await?;
    Ok(pagamentos)
}

/// Order with payments and outstanding balance.
pub async fn detalhar(pool: &DbPool, id: Uuid) -> Result<PedidoDetalhado, AppError> {
    let pedido = buscar(pool, id).await?;
    let pagamentos = listar_pagamentos(pool, id).await?;
    Ok(PedidoDetalhado {
        saldo_cents: pedido.saldo_cents(),
        pedido,
        pagamentos,
    })
}

/// Update descriptive fields; only while the order is `criado`.
pub async fn atualizar(
    pool: &DbPool,
    id: Uuid,
    request: AtualizarPedido,
) -> Result<Pedido, AppError> {
    let mut tx = pool.begin().await?;
    let atual = lock_pedido(&mut tx, id).await?;
    atual.status()?.exigir(PedidoStatus::Criado, "edit")?;

    let novo = request.aplicar(atual).normalizado()?;

    let pedido = sqlx::query_as::<_, Pedido>(
        r#"
        UPDATE pedidos
        SET cliente = $2, quantidade_caixas_prevista = $3, data_prevista = $4,
            observacoes = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&novo.cliente)
    .bind(novo.quantidade_caixas_prevista)
    .bind(novo.data_prevista)
    .bind(&novo.observacoes)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(pedido)
}

/// Delete an order; only while it is `criado`.
pub async fn remover(pool: &DbPool, id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let atual = lock_pedido(&mut tx, id).await?;
    atual.status()?.exigir(PedidoStatus::Criado, "delete")?;

    sqlx::query("DELETE FROM pedidos WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!(pedido_id = %id, "order deleted");
    Ok(())
}

/// `criado → colhido`: record the harvested box count.
pub async fn registrar_colheita(
    pool: &DbPool,
    id: Uuid,
    request: RegistrarColheitaPedido,
    operador: &str,
) -> Result<Pedido, AppError> {
    let mut errors = FieldErrors::new();
    validation::positive_i32(&mut errors, "quantidade_caixas", request.quantidade_caixas);
    validation::data(&mut errors, "data_colheita", request.data_colheita);
    errors.into_result()?;

    let mut tx = pool.begin().await?;
    let atual = lock_pedido(&mut tx, id).await?;
    atual.status()?.exigir(PedidoStatus::Criado, "register harvest")?;

    let pedido = sqlx::query_as::<_, Pedido>(
        r#"
        UPDATE pedidos
        SET status = $2, quantidade_caixas_colhida = $3, data_colheita = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(PedidoStatus::Colhido.as_str())
    .bind(request.quantidade_caixas)
    .bind(request.data_colheita)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        pedido_id = %id,
        caixas = request.quantidade_caixas,
        operador,
        "order harvested"
    );
    Ok(pedido)
}

/// Total value of a harvest at a box price, rejecting overflow.
pub fn valor_total(caixas: i32, preco_caixa_cents: i64) -> Result<i64, AppError> {
    i64::from(caixas)
        .checked_mul(preco_caixa_cents)
        .ok_or_else(|| AppError::field("preco_caixa_cents", "total value is too large"))
}

/// An order can be priced when `colhido`, or re-priced while `precificado`
/// with nothing paid.
pub fn validar_precificacao(status: PedidoStatus, valor_pago_cents: i64) -> Result<(), AppError> {
    match status {
        PedidoStatus::Colhido => Ok(()),
        PedidoStatus::Precificado if valor_pago_cents == 0 => Ok(()),
        PedidoStatus::Precificado => Err(AppError::BusinessRule(
            "cannot re-price an order that already has payments".to_string(),
        )),
        other => other.exigir(PedidoStatus::Colhido, "price"),
    }
}

/// `colhido → precificado`, or re-price a `precificado` order with no payments.
pub async fn precificar(
    pool: &DbPool,
    id: Uuid,
    preco_caixa_cents: i64,
    operador: &str,
) -> Result<Pedido, AppError> {
    if preco_caixa_cents <= 0 {
        return Err(AppError::field("preco_caixa_cents", "must be greater than zero"));
    }

    let mut tx = pool.begin().await?;
    let atual = lock_pedido(&mut tx, id).await?;

    validar_precificacao(atual.status()?, atual.valor_pago_cents)?;

    let caixas = atual
        .quantidade_caixas_colhida
        .ok_or_else(|| AppError::BusinessRule("order has no harvested boxes".to_string()))?;
    let total = valor_total(caixas, preco_caixa_cents)?;

    let pedido = sqlx::query_as::<_, Pedido>(
        r#"
        UPDATE pedidos
        SET status = $2, preco_caixa_cents = $3, valor_total_cents = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(PedidoStatus::Precificado.as_str())
    .bind(preco_caixa_cents)
    .bind(total)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(pedido_id = %id, preco_caixa_cents, valor_total_cents = total, operador, "order priced");
    Ok(pedido)
}

/// Result of applying a payment to an order's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AplicacaoPagamento {
    pub novo_valor_pago: i64,
    pub quitado: bool,
}

impl AplicacaoPagamento {
    /// Order state after the payment: `pago` once settled.
    pub fn status(&self) -> PedidoStatus {
        if self.quitado {
            PedidoStatus::Pago
        } else {
            PedidoStatus::Precificado
        }
    }
}

/// Apply `valor` to an order with `total` value and `pago` already received.
///
/// # Errors
///
/// `BusinessRule` when the payment exceeds the outstanding balance.
pub fn aplicar_pagamento(total: i64, pago: i64, valor: i64) -> Result<AplicacaoPagamento, AppError> {
    let saldo = total - pago;
    if valor > saldo {
        return Err(AppError::BusinessRule(format!(
            "payment of {valor} cents exceeds the outstanding balance of {saldo} cents"
        )));
    }
    let novo_valor_pago = pago + valor;
    Ok(AplicacaoPagamento {
        novo_valor_pago,
        quitado: novo_valor_pago == total,
    })
}

/// Register a payment on a `precificado` order.
///
/// When the paid total reaches the order value the order moves to `pago`.
pub async fn registrar_pagamento(
    pool: &DbPool,
    id: Uuid,
    request: NovoPagamento,
    operador: &str,
) -> Result<PedidoDetalhado, AppError> {
    let pagamento = request.normalizado()?;

    let mut tx = pool.begin().await?;
    let atual = lock_pedido(&mut tx, id).await?;
    atual
        .status()?
        .exigir(PedidoStatus::Precificado, "register payment")?;

    let total = atual
        .valor_total_cents
        .ok_or_else(|| AppError::BusinessRule("order has no price".to_string()))?;
    let aplicacao = aplicar_pagamento(total, atual.valor_pago_cents, pagamento.valor_cents)?;

    sqlx::query(
        r#"
        INSERT INTO pagamentos_pedido (
            pedido_id, valor_cents, data_pagamento, forma, observacao, registrado_por
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(pagamento.valor_cents)
    .bind(pagamento.data_pagamento)
    .bind(&pagamento.forma)
    .bind(&pagamento.observacao)
    .bind(operador)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE pedidos SET valor_pago_cents = $2, status = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(aplicacao.novo_valor_pago)
    .bind(aplicacao.status().as_str())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        pedido_id = %id,
        valor_cents = pagamento.valor_cents,
        forma = %pagamento.forma,
        quitado = aplicacao.quitado,
        operador,
        "order payment registered"
    );

    detalhar(pool, id).await
}

/// `pago → finalizado`.
pub async fn finalizar(pool: &DbPool, id: Uuid, operador: &str) -> Result<Pedido, AppError> {
    let mut tx = pool.begin().await?;
    let atual = lock_pedido(&mut tx, id).await?;
    atual.status()?.exigir(PedidoStatus::Pago, "finalize")?;

    let pedido = sqlx::query_as::<_, Pedido>(
        "UPDATE pedidos SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(PedidoStatus::Finalizado.as_str())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(pedido_id = %id, operador, "order finalized");
    Ok(pedido)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn partial_payment_keeps_order_open() {
        let aplicacao = aplicar_pagamento(100_000, 20_000, 30_000).unwrap();
        assert_eq!(
            aplicacao,
            AplicacaoPagamento {
                novo_valor_pago: 50_000,
                quitado: false
            }
        );
    }

    #[test]
    fn exact_payment_settles_order() {
        let aplicacao = aplicar_pagamento(100_000, 60_000, 40_000).unwrap();
        assert!(aplicacao.quitado);
        assert_eq!(aplicacao.novo_valor_pago, 100_000);
    }

    #[test]
    fn overpayment_is_rejected() {
        let err = aplicar_pagamento(100_000, 60_000, 40_001).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert!(err.to_string().contains("40000"));
    }

    #[test]
    fn settling_payment_moves_order_to_paid() {
        let parcial = aplicar_pagamento(100_000, 0, 99_999).unwrap();
        assert_eq!(parcial.status(), PedidoStatus::Precificado);

        let quitado = aplicar_pagamento(100_000, 99_999, 1).unwrap();
        assert_eq!(quitado.status(), PedidoStatus::Pago);
    }

    #[test]
    fn harvested_order_can_be_priced() {
        assert!(validar_precificacao(PedidoStatus::Colhido, 0).is_ok());
    }

    #[test]
    fn priced_order_can_be_repriced_until_paid() {
        assert!(validar_precificacao(PedidoStatus::Precificado, 0).is_ok());

        let err = validar_precificacao(PedidoStatus::Precificado, 1).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("payments"));
    }

    #[test]
    fn other_states_cannot_be_priced() {
        for status in [PedidoStatus::Criado, PedidoStatus::Pago, PedidoStatus::Finalizado] {
            let err = validar_precificacao(status, 0).unwrap_err();
            assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
            let msg = err.to_string();
            assert!(msg.contains(status.as_str()), "{msg}");
            assert!(msg.contains("colhido"), "{msg}");
        }
    }

    #[test]
    fn total_value_is_boxes_times_price() {
        assert_eq!(valor_total(330, 3_500).unwrap(), 1_155_000);
        assert!(valor_total(i32::MAX, i64::MAX).is_err());
    }
}
