//! Certificate registry and expiry monitor.

use std::time::Duration;

use chrono::NaiveDate;
use tokio::time;
use uuid::Uuid;

use crate::{
    db::{DbPool, is_foreign_key_violation},
    error::AppError,
    models::certificado::{
        AtualizarCertificado, Certificado, NovoCertificado, SituacaoCertificado, StatusCertificado,
    },
    services::hoje,
};

fn conta_inexistente(err: sqlx::Error) -> AppError {
    if is_foreign_key_violation(&err) {
        AppError::field("conta_corrente_id", "account does not exist")
    } else {
        AppError::Database(err)
    }
}

pub async fn criar(pool: &DbPool, request: NovoCertificado) -> Result<Certificado, AppError> {
    let novo = request.normalizado()?;

    let certificado = sqlx::query_as::<_, Certificado>(
        r#"
        INSERT INTO certificados (nome, caminho_arquivo, emitido_para, valido_ate, conta_corrente_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&novo.nome)
    .bind(&novo.caminho_arquivo)
    .bind(&novo.emitido_para)
    .bind(novo.valido_ate)
    .bind(novo.conta_corrente_id)
    .fetch_one(pool)
    .await
    .map_err(conta_inexistente)?;

    tracing::info!(certificado_id = %certificado.id, valido_ate = %certificado.valido_ate, "certificate registered");
    Ok(certificado)
}

pub async fn listar(pool: &DbPool) -> Result<Vec<Certificado>, AppError> {
    let certificados =
        sqlx::query_as::<_, Certificado>("SELECT * FROM certificados ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;
    Ok(certificados)
}

pub async fn buscar(pool: &DbPool, id: Uuid) -> Result<Certificado, AppError> {
    sqlx::query_as::<_, Certificado>("SELECT * FROM certificados WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("certificado"))
}

pub async fn atualizar(
    pool: &DbPool,
    id: Uuid,
    request: AtualizarCertificado,
) -> Result<Certificado, AppError> {
    let atual = buscar(pool, id).await?;
    let novo = request.aplicar(atual).normalizado()?;

    sqlx::query_as::<_, Certificado>(
        r#"
        UPDATE certificados
        SET nome = $2, caminho_arquivo = $3, emitido_para = $4, valido_ate = $5,
            conta_corrente_id = $6, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&novo.nome)
    .bind(&novo.caminho_arquivo)
    .bind(&novo.emitido_para)
    .bind(novo.valido_ate)
    .bind(novo.conta_corrente_id)
    .fetch_optional(pool)
    .await
    .map_err(conta_inexistente)?
    .ok_or(AppError::NotFound("certificado"))
}

pub async fn remover(pool: &DbPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM certificados WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("certificado"));
    }
    Ok(())
}

/// Soonest expiry first, ties by name.
pub fn ordenar_por_vencimento(situacoes: &mut [SituacaoCertificado]) {
    situacoes.sort_by(|a, b| {
        a.dias_restantes
            .cmp(&b.dias_restantes)
            .then_with(|| a.certificado.nome.cmp(&b.certificado.nome))
    });
}

/// Expiry situation of every certificate, soonest first.
pub async fn monitorar(
    pool: &DbPool,
    hoje: NaiveDate,
    dias_alerta: i64,
) -> Result<Vec<SituacaoCertificado>, AppError> {
    let mut situacoes = Vec::new();
    for certificado in listar(pool).await? {
        let presente = tokio::fs::try_exists(&certificado.caminho_arquivo)
            .await
            .unwrap_or(false);
        situacoes.push(SituacaoCertificado::new(certificado, hoje, dias_alerta, presente));
    }
    ordenar_por_vencimento(&mut situacoes);
    Ok(situacoes)
}

/// Run one monitor pass and log every certificate that needs attention.
async fn verificar_uma_vez(pool: &DbPool, dias_alerta: i64) {
    let situacoes = match monitorar(pool, hoje(), dias_alerta).await {
        Ok(s) => s,
        Err(err) => {
            tracing::error!(error = %err, "certificate check failed, skipping tick");
            return;
        }
    };

    let mut alertas = 0usize;
    for situacao in &situacoes {
        let c = &situacao.certificado;
        match situacao.status {
            StatusCertificado::Expirado => tracing::warn!(
                certificado_id = %c.id,
                nome = %c.nome,
                valido_ate = %c.valido_ate,
                "certificate expired"
            ),
            StatusCertificado::Expirando => tracing::warn!(
                certificado_id = %c.id,
                nome = %c.nome,
                dias_restantes = situacao.dias_restantes,
                "certificate expiring soon"
            ),
            StatusCertificado::Valido => continue,
        }
        alertas += 1;

        if !situacao.arquivo_presente {
            tracing::warn!(certificado_id = %c.id, caminho = %c.caminho_arquivo, "certificate file missing");
        }
    }

    tracing::info!(total = situacoes.len(), alertas, "certificate check complete");
}

/// Periodic certificate check; runs until the task is dropped.
pub async fn executar_monitor(pool: DbPool, intervalo_secs: u64, dias_alerta: i64) {
    let mut interval = time::interval(Duration::from_secs(intervalo_secs));
    tracing::info!(intervalo_secs, dias_alerta, "certificate monitor started");

    loop {
        interval.tick().await;
        verificar_uma_vez(&pool, dias_alerta).await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn situacao(nome: &str, valido_ate: NaiveDate, hoje: NaiveDate) -> SituacaoCertificado {
        let now = Utc::now();
        let certificado = Certificado {
            id: Uuid::new_v4(),
            nome: nome.into(),
            caminho_arquivo: "/tmp/none.pfx".into(),
            emitido_para: None,
            valido_ate,
            conta_corrente_id: None,
            created_at: now,
            updated_at: now,
        };
        SituacaoCertificado::new(certificado, hoje, 30, false)
    }

    #[test]
    fn monitor_lists_soonest_expiry_first() {
        let hoje = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let dia = |d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap();
        let mut situacoes = vec![
            situacao("tarde", dia(30), hoje),
            situacao("b-cedo", dia(5), hoje),
            situacao("a-cedo", dia(5), hoje),
            situacao("vencido", NaiveDate::from_ymd_opt(2025, 2, 20).unwrap(), hoje),
        ];

        ordenar_por_vencimento(&mut situacoes);

        let nomes: Vec<_> = situacoes.iter().map(|s| s.certificado.nome.as_str()).collect();
        assert_eq!(nomes, ["vencido", "a-cedo", "b-cedo", "tarde"]);
    }
}
