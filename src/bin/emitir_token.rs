//! Issue an operator API token.
//!
//! ```text
//! DATABASE_URL=postgres://... emitir-token "Maria (financeiro)"
//! ```
//!
//! The raw token is printed once; only its SHA-256 hash is stored.

use anyhow::{Context, bail};
use bananal_erp::{config::Config, db, middleware::auth::hash_token};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let operador = std::env::args().nth(1).unwrap_or_default();
    let operador = operador.trim();
    if operador.is_empty() {
        bail!("usage: emitir-token <operator name>");
    }

    let config = Config::from_env().context("loading configuration")?;
    let pool = db::create_pool(&config.database_url, 1).await?;
    db::run_migrations(&pool).await?;

    let bytes: [u8; 32] = rand::random();
    let token = format!("bnl_{}", hex::encode(bytes));

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO api_tokens (token_hash, operador) VALUES ($1, $2) RETURNING id",
    )
    .bind(hash_token(&token))
    .bind(operador)
    .fetch_one(&pool)
    .await
    .context("storing token")?;

    println!("token id: {id}");
    println!("operator: {operador}");
    println!("token:    {token}");
    println!("Store it now; it cannot be shown again.");
    Ok(())
}
