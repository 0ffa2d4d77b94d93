//! Supplier persistence and statistics.

use uuid::Uuid;

use crate::{
    db::{DbPool, is_foreign_key_violation, is_unique_violation},
    error::AppError,
    models::{
        fornecedor::{AtualizarFornecedor, FiltroFornecedores, Fornecedor, NovoFornecedor},
        pedido::Pedido,
    },
    services::estatisticas::{self, EstatisticasFornecedor},
};

fn map_write_error(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict("a supplier with this document already exists".to_string())
    } else {
        AppError::Database(err)
    }
}

pub async fn criar(pool: &DbPool, request: NovoFornecedor) -> Result<Fornecedor, AppError> {
    let novo = request.normalizado()?;

    let fornecedor = sqlx::query_as::<_, Fornecedor>(
        r#"
        INSERT INTO fornecedores (
            nome, documento, telefone, email, logradouro, cidade, uf, cep,
            latitude, longitude, ativo
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(&novo.nome)
    .bind(&novo.documento)
    .bind(&novo.telefone)
    .bind(&novo.email)
    .bind(&novo.logradouro)
    .bind(&novo.cidade)
    .bind(&novo.uf)
    .bind(&novo.cep)
    .bind(novo.latitude)
    .bind(novo.longitude)
    .bind(novo.ativo)
    .fetch_one(pool)
    .await
    .map_err(map_write_error)?;

    tracing::info!(fornecedor_id = %fornecedor.id, nome = %fornecedor.nome, "supplier created");
    Ok(fornecedor)
}

pub async fn listar(
    pool: &DbPool,
    filtro: FiltroFornecedores,
) -> Result<Vec<Fornecedor>, AppError> {
    let busca = filtro
        .busca
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty());

    let fornecedores = sqlx::query_as::<_, Fornecedor>(
        r#"
        SELECT * FROM fornecedores
        WHERE ($1::BOOLEAN IS NULL OR ativo = $1)
          AND ($2::TEXT IS NULL OR nome ILIKE '%' || $2 || '%' OR documento LIKE $2 || '%')
        ORDER BY created_at DESC
        "#,
    )
    .bind(filtro.ativo)
    .bind(busca)
    .fetch_all(pool)
    .await?;

    Ok(fornecedores)
}

pub async fn buscar(pool: &DbPool, id: Uuid) -> Result<Fornecedor, AppError> {
    sqlx::query_as::<_, Fornecedor>("SELECT * FROM fornecedores WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("fornecedor"))
}

pub async fn atualizar(
    pool: &DbPool,
    id: Uuid,
    request: AtualizarFornecedor,
) -> Result<Fornecedor, AppError> {
    let atual = buscar(pool, id).await?;
    let novo = request.aplicar(atual).normalizado()?;

    let fornecedor = sqlx::query_as::<_, Fornecedor>(
        r#"
        UPDATE fornecedores
        SET nome = $2, documento = $3, telefone = $4, email = $5, logradouro = $6,
            cidade = $7, uf = $8, cep = $9, latitude = $10, longitude = $11,
            ativo = $12, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&novo.nome)
    .bind(&novo.documento)
    .bind(&novo.telefone)
    .bind(&novo.email)
    .bind(&novo.logradouro)
    .bind(&novo.cidade)
    .bind(&novo.uf)
    .bind(&novo.cep)
    .bind(novo.latitude)
    .bind(novo.longitude)
    .bind(novo.ativo)
    .fetch_optional(pool)
    .await
    .map_err(map_write_error)?
    .ok_or(AppError::NotFound("fornecedor"))?;

    Ok(fornecedor)
}

/// Delete a supplier. Suppliers with orders cannot be deleted; deactivate them instead.
pub async fn remover(pool: &DbPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM fornecedores WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|err| {
            if is_foreign_key_violation(&err) {
                AppError::Conflict(
                    "supplier has orders; deactivate it instead of deleting".to_string(),
                )
            } else {
                AppError::Database(err)
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("fornecedor"));
    }

    tracing::info!(fornecedor_id = %id, "supplier deleted");
    Ok(())
}

pub async fn estatisticas(pool: &DbPool, id: Uuid) -> Result<EstatisticasFornecedor, AppError> {
    // 404 for unknown suppliers rather than all-zero statistics
    buscar(pool, id).await?;

    let pedidos = sqlx::query_as::<_, Pedido>("SELECT * FROM pedidos WHERE fornecedor_id = $1")
        .bind(id)
        .fetch_all(pool)
        .await?;

    Ok(estatisticas::calcular(id, &pedidos))
}
