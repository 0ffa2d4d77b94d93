//! SMTP server configuration and reachability check.

use std::time::{Duration, Instant};

use tokio::{net::TcpStream, time};

use crate::{
    db::DbPool,
    error::AppError,
    models::configuracao::{ConfigEmail, ConfigEmailResponse, SalvarConfigEmail, TesteEmail},
};

async fn carregar_email(pool: &DbPool) -> Result<Option<ConfigEmail>, AppError> {
    let config = sqlx::query_as::<_, ConfigEmail>(
        r#"
        SELECT host, porta, usuario, senha, remetente_email, remetente_nome, usar_tls, updated_at
        FROM config_email WHERE id = 1
        "#,
    )
    .fetch_optional(pool)
    .await?;
    Ok(config)
}

pub async fn buscar_email(pool: &DbPool) -> Result<ConfigEmailResponse, AppError> {
    carregar_email(pool)
        .await?
        .map(Into::into)
        .ok_or(AppError::NotFound("config_email"))
}

/// Create or replace the SMTP configuration.
///
/// An omitted password keeps the stored one; on first save it is required.
pub async fn salvar_email(
    pool: &DbPool,
    request: SalvarConfigEmail,
    operador: &str,
) -> Result<ConfigEmailResponse, AppError> {
    let senha_atual = carregar_email(pool).await?.map(|c| c.senha);
    let config = request.normalizado(senha_atual)?;

    let salvo = sqlx::query_as::<_, ConfigEmail>(
        r#"
        INSERT INTO config_email (
            id, host, porta, usuario, senha, remetente_email, remetente_nome, usar_tls
        )
        VALUES (1, $1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE SET
            host = EXCLUDED.host,
            porta = EXCLUDED.porta,
            usuario = EXCLUDED.usuario,
            senha = EXCLUDED.senha,
            remetente_email = EXCLUDED.remetente_email,
            remetente_nome = EXCLUDED.remetente_nome,
            usar_tls = EXCLUDED.usar_tls,
            updated_at = NOW()
        RETURNING host, porta, usuario, senha, remetente_email, remetente_nome, usar_tls, updated_at
        "#,
    )
    .bind(&config.host)
    .bind(config.porta)
    .bind(&config.usuario)
    .bind(&config.senha)
    .bind(&config.remetente_email)
    .bind(&config.remetente_nome)
    .bind(config.usar_tls)
    .fetch_one(pool)
    .await?;

    tracing::info!(host = %salvo.host, porta = salvo.porta, operador, "SMTP configuration saved");
    Ok(salvo.into())
}

/// Open a TCP connection to `host:porta` within `timeout`.
pub async fn sondar(host: &str, porta: u16, timeout: Duration) -> Result<Duration, AppError> {
    let inicio = Instant::now();
    match time::timeout(timeout, TcpStream::connect((host, porta))).await {
        Ok(Ok(_stream)) => Ok(inicio.elapsed()),
        Ok(Err(err)) => Err(AppError::Upstream(format!(
            "SMTP server {host}:{porta} is unreachable: {err}"
        ))),
        Err(_) => Err(AppError::Upstream(format!(
            "SMTP server {host}:{porta} did not answer within {}s",
            timeout.as_secs()
        ))),
    }
}

/// Check that the configured SMTP server accepts connections.
pub async fn testar_email(pool: &DbPool, timeout: Duration) -> Result<TesteEmail, AppError> {
    let config = carregar_email(pool)
        .await?
        .ok_or(AppError::NotFound("config_email"))?;

    let porta = u16::try_from(config.porta)
        .map_err(|_| AppError::InvalidRequest(format!("invalid SMTP port {}", config.porta)))?;

    let latencia = sondar(&config.host, porta, timeout).await.inspect_err(|err| {
        tracing::warn!(host = %config.host, porta, error = %err, "SMTP check failed");
    })?;

    tracing::info!(host = %config.host, porta, latencia_ms = latencia.as_millis() as u64, "SMTP check succeeded");
    Ok(TesteEmail {
        host: config.host,
        porta: config.porta,
        alcancavel: true,
        latencia_ms: latencia.as_millis(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn check_reaches_a_listening_socket() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let porta = listener.local_addr().unwrap().port();

        let latencia = sondar("127.0.0.1", porta, Duration::from_secs(2)).await;
        assert!(latencia.is_ok());
    }

    #[tokio::test]
    async fn closed_port_is_reported_as_upstream_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let porta = listener.local_addr().unwrap().port();
        drop(listener);

        let err = sondar("127.0.0.1", porta, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
