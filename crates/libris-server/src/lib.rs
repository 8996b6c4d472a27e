//! Libris authorization server process.
//!
//! Hosts the `libris-auth` endpoints on axum with an in-memory store seeded
//! from configuration.

pub mod bootstrap;
pub mod config;
pub mod observability;
pub mod server;

pub use config::AppConfig;
pub use server::{LibrisServer, ServerBuilder, build_app};
