//! Bank API credentials and billing agreements.
//!
//! A convênio de cobrança can only be registered for an account that
//! already holds an active `cobranca` credential.

use uuid::Uuid;

use crate::{
    db::{DbPool, is_unique_violation},
    error::AppError,
    models::{
        conta_corrente::ContaCorrente,
        credencial::{
            AtualizarConvenio, AtualizarCredencial, ConvenioCobranca, CredencialApi,
            CredencialApiResponse, MODALIDADE_COBRANCA, NovaCredencial, NovoConvenio,
        },
    },
};

pub async fn buscar_conta(pool: &DbPool, id: Uuid) -> Result<ContaCorrente, AppError> {
    sqlx::query_as::<_, ContaCorrente>("SELECT * FROM contas_correntes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("conta_corrente"))
}

/// Register credentials for one modality of an account.
///
/// # Errors
///
/// - `NotFound`: the account does not exist
/// - `Validation`: unknown modality or environment, empty client id or secret
/// - `Conflict`: the account already has credentials for this modality
pub async fn criar_credencial(
    pool: &DbPool,
    conta_id: Uuid,
    request: NovaCredencial,
) -> Result<CredencialApiResponse, AppError> {
    let nova = request.normalizado()?;
    buscar_conta(pool, conta_id).await?;

    let credencial = sqlx::query_as::<_, CredencialApi>(
        r#"
        INSERT INTO credenciais_api (
            conta_corrente_id, modalidade, ambiente, client_id, client_secret,
            chave_aplicacao, ativo
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(conta_id)
    .bind(&nova.modalidade)
    .bind(&nova.ambiente)
    .bind(&nova.client_id)
    .bind(&nova.client_secret)
    .bind(&nova.chave_aplicacao)
    .bind(nova.ativo)
    .fetch_one(pool)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            AppError::Conflict(format!(
                "account already has '{}' credentials",
                nova.modalidade
            ))
        } else {
            AppError::Database(err)
        }
    })?;

    tracing::info!(
        credencial_id = %credencial.id,
        conta_id = %conta_id,
        modalidade = %credencial.modalidade,
        "bank API credentials registered"
    );
    Ok(credencial.into())
}

pub async fn listar_credenciais(
    pool: &DbPool,
    conta_id: Uuid,
) -> Result<Vec<CredencialApiResponse>, AppError> {
    buscar_conta(pool, conta_id).await?;

    let credenciais = sqlx::query_as::<_, CredencialApi>(
        "SELECT * FROM credenciais_api WHERE conta_corrente_id = $1 ORDER BY created_at DESC",
    )
    .bind(conta_id)
    .fetch_all(pool)
    .await?;

    Ok(credenciais.into_iter().map(Into::into).collect())
}

async fn buscar_credencial_completa(pool: &DbPool, id: Uuid) -> Result<CredencialApi, AppError> {
    sqlx::query_as::<_, CredencialApi>("SELECT * FROM credenciais_api WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("credencial_api"))
}

pub async fn buscar_credencial(
    pool: &DbPool,
    id: Uuid,
) -> Result<CredencialApiResponse, AppError> {
    Ok(buscar_credencial_completa(pool, id).await?.into())
}

/// Update credentials, optionally rotating the secret.
pub async fn atualizar_credencial(
    pool: &DbPool,
    id: Uuid,
    request: AtualizarCredencial,
    operador: &str,
) -> Result<CredencialApiResponse, AppError> {
    let atual = buscar_credencial_completa(pool, id).await?;
    let rotaciona = request.rotaciona_segredo();
    let nova = request.aplicar(atual).normalizado()?;

    let credencial = sqlx::query_as::<_, CredencialApi>(
        r#"
        UPDATE credenciais_api
        SET ambiente = $2, client_id = $3, client_secret = $4, chave_aplicacao = $5,
            ativo = $6, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&nova.ambiente)
    .bind(&nova.client_id)
    .bind(&nova.client_secret)
    .bind(&nova.chave_aplicacao)
    .bind(nova.ativo)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("credencial_api"))?;

    if rotaciona {
        tracing::info!(credencial_id = %id, operador, "bank API secret rotated");
    }
    Ok(credencial.into())
}

pub async fn remover_credencial(pool: &DbPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM credenciais_api WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("credencial_api"));
    }

    tracing::info!(credencial_id = %id, "bank API credentials deleted");
    Ok(())
}

/// A convênio needs active `cobranca` credentials on its account.
pub fn exigir_cobranca_ativa(possui: bool) -> Result<(), AppError> {
    if possui {
        Ok(())
    } else {
        Err(AppError::BusinessRule(
            "register active 'cobranca' credentials for this account before the convênio"
                .to_string(),
        ))
    }
}

/// Register the account's billing agreement.
///
/// # Errors
///
/// - `NotFound`: the account does not exist
/// - `BusinessRule`: the account has no active `cobranca` credentials
/// - `Conflict`: the account already has a convênio
pub async fn criar_convenio(
    pool: &DbPool,
    conta_id: Uuid,
    request: NovoConvenio,
) -> Result<ConvenioCobranca, AppError> {
    let novo = request.normalizado()?;
    buscar_conta(pool, conta_id).await?;

    let mut tx = pool.begin().await?;

    // Holds the credential row so it cannot be deactivated before the insert commits.
    let credencial: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT id FROM credenciais_api
        WHERE conta_corrente_id = $1 AND modalidade = $2 AND ativo = true
        LIMIT 1
        FOR SHARE
        "#,
    )
    .bind(conta_id)
    .bind(MODALIDADE_COBRANCA)
    .fetch_optional(&mut *tx)
    .await?;

    if let Err(err) = exigir_cobranca_ativa(credencial.is_some()) {
        tx.rollback().await?;
        return Err(err);
    }

    let convenio = sqlx::query_as::<_, ConvenioCobranca>(
        r#"
        INSERT INTO convenios_cobranca (
            conta_corrente_id, numero_convenio, carteira, variacao_carteira,
            juros_mensal_bps, multa_bps, dias_protesto, ativo
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(conta_id)
    .bind(&novo.numero_convenio)
    .bind(&novo.carteira)
    .bind(&novo.variacao_carteira)
    .bind(novo.juros_mensal_bps)
    .bind(novo.multa_bps)
    .bind(novo.dias_protesto)
    .bind(novo.ativo)
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            AppError::Conflict("account already has a convênio de cobrança".to_string())
        } else {
            AppError::Database(err)
        }
    })?;

    tx.commit().await?;

    tracing::info!(convenio_id = %convenio.id, conta_id = %conta_id, "convênio de cobrança registered");
    Ok(convenio)
}

pub async fn buscar_convenio(pool: &DbPool, conta_id: Uuid) -> Result<ConvenioCobranca, AppError> {
    sqlx::query_as::<_, ConvenioCobranca>(
        "SELECT * FROM convenios_cobranca WHERE conta_corrente_id = $1",
    )
    .bind(conta_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("convenio_cobranca"))
}

pub async fn atualizar_convenio(
    pool: &DbPool,
    conta_id: Uuid,
    request: AtualizarConvenio,
) -> Result<ConvenioCobranca, AppError> {
    let atual = buscar_convenio(pool, conta_id).await?;
    let novo = request.aplicar(atual).normalizado()?;

    let convenio = sqlx::query_as::<_, ConvenioCobranca>(
        r#"
        UPDATE convenios_cobranca
        SET numero_convenio = $2, carteira = $3, variacao_carteira = $4,
            juros_mensal_bps = $5, multa_bps = $6, dias_protesto = $7, ativo = $8,
            updated_at = NOW()
        WHERE conta_corrente_id = $1
        RETURNING *
        "#,
    )
    .bind(conta_id)
    .bind(&novo.numero_convenio)
    .bind(&novo.carteira)
    .bind(&novo.variacao_carteira)
    .bind(novo.juros_mensal_bps)
    .bind(novo.multa_bps)
    .bind(novo.dias_protesto)
    .bind(novo.ativo)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("convenio_cobranca"))?;

    Ok(convenio)
}

pub async fn remover_convenio(pool: &DbPool, conta_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM convenios_cobranca WHERE conta_corrente_id = $1")
        .bind(conta_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("convenio_cobranca"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn convenio_requires_active_billing_credentials() {
        assert!(exigir_cobranca_ativa(true).is_ok());

        let err = exigir_cobranca_ativa(false).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("cobranca"));
    }
}
