//! Rows, request bodies and response shapes.

/// Operator API token
pub mod api_token;
/// Banana tags and ripening registrations
pub mod banana;
pub mod certificado;
pub mod configuracao;
pub mod conta_corrente;
/// Bank API credentials and billing agreements
pub mod credencial;
pub mod fornecedor;
/// Orders and payments
pub mod pedido;
