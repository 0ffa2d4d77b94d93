//! Bank account HTTP handlers.
//!
//! - POST   /api/contas-correntes
//! - GET    /api/contas-correntes
//! - GET    /api/contas-correntes/{id}
//! - PATCH  /api/contas-correntes/{id}
//! - DELETE /api/contas-correntes/{id}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::{DbPool, is_unique_violation},
    error::AppError,
    models::conta_corrente::{AtualizarContaCorrente, ContaCorrente, NovaContaCorrente},
    services::bancario_service,
};

fn duplicate_account(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict("this bank/agency/account combination already exists".to_string())
    } else {
        AppError::Database(err)
    }
}

/// Register a bank account.
///
/// # Response
///
/// - **201 Created**: the stored account
/// - **400**: invalid bank code, agency or account number
/// - **409**: the same bank/agency/account is already registered
pub async fn create_conta(
    State(pool): State<DbPool>,
    Json(request): Json<NovaContaCorrente>,
) -> Result<impl IntoResponse, AppError> {
    let nova = request.normalizado()?;

    let conta = sqlx::query_as::<_, ContaCorrente>(
        r#"
        INSERT INTO contas_correntes (
            banco_codigo, banco_nome, agencia, agencia_digito,
            numero_conta, conta_digito, titular, ativo
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(&nova.banco_codigo)
    .bind(&nova.banco_nome)
    .bind(&nova.agencia)
    .bind(&nova.agencia_digito)
    .bind(&nova.numero_conta)
    .bind(&nova.conta_digito)
    .bind(&nova.titular)
    .bind(nova.ativo)
    .fetch_one(&pool)
    .await
    .map_err(duplicate_account)?;

    tracing::info!(conta_id = %conta.id, banco = %conta.banco_codigo, "bank account created");
    Ok((StatusCode::CREATED, Json(conta)))
}

/// List accounts ordered by bank, agency and number.
pub async fn list_contas(State(pool): State<DbPool>) -> Result<Json<Vec<ContaCorrente>>, AppError> {
    let contas = sqlx::query_as::<_, ContaCorrente>(
        "SELECT * FROM contas_correntes ORDER BY created_at DESC",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(contas))
}

pub async fn get_conta(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContaCorrente>, AppError> {
    Ok(Json(bancario_service::buscar_conta(&pool, id).await?))
}

pub async fn update_conta(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
    Json(request): Json<AtualizarContaCorrente>,
) -> Result<Json<ContaCorrente>, AppError> {
    let atual = bancario_service::buscar_conta(&pool, id).await?;
    let nova = request.aplicar(atual).normalizado()?;

    let conta = sqlx::query_as::<_, ContaCorrente>(
        r#"
        UPDATE contas_correntes
        SET banco_codigo = $2, banco_nome = $3, agencia = $4, agencia_digito = $5,
            numero_conta = $6, conta_digito = $7, titular = $8, ativo = $9,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&nova.banco_codigo)
    .bind(&nova.banco_nome)
    .bind(&nova.agencia)
    .bind(&nova.agencia_digito)
    .bind(&nova.numero_conta)
    .bind(&nova.conta_digito)
    .bind(&nova.titular)
    .bind(nova.ativo)
    .fetch_optional(&pool)
    .await
    .map_err(duplicate_account)?
    .ok_or(AppError::NotFound("conta_corrente"))?;

    Ok(Json(conta))
}

/// Delete an account together with its credentials and convênio.
pub async fn delete_conta(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM contas_correntes WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("conta_corrente"));
    }

    tracing::info!(conta_id = %id, "bank account deleted");
    Ok(StatusCode::NO_CONTENT)
}
