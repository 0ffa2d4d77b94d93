//! Bananal ERP: supply-chain backend for a banana grower.
//!
//! Suppliers, bank accounts and their API credentials, billing agreements,
//! orders with payments, banana ripening control, SMTP and WhatsApp
//! configuration and certificate monitoring, served as a JSON REST API.
//!
//! The binary in `main.rs` only wires configuration, logging and the
//! database; everything else is exposed here so integration tests can
//! drive the router directly.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
