//! Router assembly and shared application state.

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::FromRef,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::Config, db::DbPool, handlers, middleware};

/// State shared by every handler.
///
/// Handlers that only touch the database extract `State<DbPool>`.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub http: reqwest::Client,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_client_timeout_secs))
            .build()?;

        Ok(Self {
            pool,
            http,
            config: Arc::new(config),
        })
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins = match config.cors_origins() {
        None => AllowOrigin::from(Any),
        Some(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(values)
        }
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Build the full HTTP router.
///
/// `/health` and `/webhooks/whatsapp` are public; everything under `/api`
/// requires a bearer token.
pub fn build_router(state: AppState) -> Router {
    use handlers::{
        certificados, configuracoes, contas_correntes, controle_banana, convenios, credenciais,
        fitas, fornecedores, pedidos,
    };

    let authenticated_routes = Router::new()
        // Suppliers
        .route(
            "/api/fornecedores",
            post(fornecedores::create_fornecedor).get(fornecedores::list_fornecedores),
        )
        .route(
            "/api/fornecedores/{id}",
            get(fornecedores::get_fornecedor)
                .patch(fornecedores::update_fornecedor)
                .delete(fornecedores::delete_fornecedor),
        )
        .route(
            "/api/fornecedores/{id}/estatisticas",
            get(fornecedores::get_estatisticas),
        )
        // Bank accounts, API credentials, billing agreements
        .route(
            "/api/contas-correntes",
            post(contas_correntes::create_conta).get(contas_correntes::list_contas),
        )
        .route(
            "/api/contas-correntes/{id}",
            get(contas_correntes::get_conta)
                .patch(contas_correntes::update_conta)
                .delete(contas_correntes::delete_conta),
        )
        .route(
            "/api/contas-correntes/{id}/credenciais",
            post(credenciais::create_credencial).get(credenciais::list_credenciais),
        )
        .route(
            "/api/credenciais-api/{id}",
            get(credenciais::get_credencial)
                .patch(credenciais::update_credencial)
                .delete(credenciais::delete_credencial),
        )
        .route(
            "/api/contas-correntes/{id}/convenio-cobranca",
            post(convenios::create_convenio)
                .get(convenios::get_convenio)
                .patch(convenios::update_convenio)
                .delete(convenios::delete_convenio),
        )
        // Banana tags and ripening control
        .route(
            "/api/fitas-banana",
            post(fitas::create_fita).get(fitas::list_fitas),
        )
        .route(
            "/api/fitas-banana/{id}",
            get(fitas::get_fita)
                .patch(fitas::update_fita)
                .delete(fitas::delete_fita),
        )
        .route(
            "/api/controle-banana",
            post(controle_banana::create_controle).get(controle_banana::list_controles),
        )
        .route(
            "/api/controle-banana/resumo",
            get(controle_banana::get_resumo),
        )
        .route(
            "/api/controle-banana/calendario",
            get(controle_banana::get_calendario),
        )
        .route(
            "/api/controle-banana/{id}",
            get(controle_banana::get_controle)
                .patch(controle_banana::update_controle)
                .delete(controle_banana::delete_controle),
        )
        .route(
            "/api/controle-banana/{id}/colheitas",
            post(controle_banana::registrar_colheita),
        )
        // Orders
        .route(
            "/api/pedidos",
            post(pedidos::create_pedido).get(pedidos::list_pedidos),
        )
        .route(
            "/api/pedidos/{id}",
            get(pedidos::get_pedido)
                .patch(pedidos::update_pedido)
                .delete(pedidos::delete_pedido),
        )
        .route("/api/pedidos/{id}/colheita", post(pedidos::registrar_colheita))
        .route("/api/pedidos/{id}/precificacao", post(pedidos::precificar))
        .route(
            "/api/pedidos/{id}/pagamentos",
            post(pedidos::create_pagamento).get(pedidos::list_pagamentos),
        )
        .route("/api/pedidos/{id}/finalizacao", post(pedidos::finalizar))
        // Server configuration
        .route(
            "/api/configuracoes/email",
            get(configuracoes::get_email).put(configuracoes::put_email),
        )
        .route(
            "/api/configuracoes/email/testar",
            post(configuracoes::testar_email),
        )
        .route(
            "/api/configuracoes/whatsapp",
            get(configuracoes::get_whatsapp).put(configuracoes::put_whatsapp),
        )
        .route(
            "/api/configuracoes/whatsapp/testar",
            post(configuracoes::testar_whatsapp),
        )
        // Certificates
        .route(
            "/api/certificados",
            post(certificados::create_certificado).get(certificados::list_certificados),
        )
        .route("/api/certificados/monitor", get(certificados::get_monitor))
        .route(
            "/api/certificados/{id}",
            get(certificados::get_certificado)
                .patch(certificados::update_certificado)
                .delete(certificados::delete_certificado),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.pool.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/webhooks/whatsapp",
            get(handlers::whatsapp_webhook::verify_subscription)
                .post(handlers::whatsapp_webhook::receive_event),
        )
        .merge(authenticated_routes)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
