//! HTTP request handlers.
//!
//! Handlers extract the request, call one service function and map the
//! result to a status code and JSON body. Business rules live in
//! [`crate::services`].

pub mod certificados;
pub mod configuracoes;
pub mod contas_correntes;
pub mod controle_banana;
pub mod convenios;
pub mod credenciais;
pub mod fitas;
pub mod fornecedores;
pub mod health;
pub mod pedidos;
pub mod whatsapp_webhook;
