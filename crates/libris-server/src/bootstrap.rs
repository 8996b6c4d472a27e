//! Seeding of the in-memory store from configuration.
//!
//! Clients and resource owners listed in the configuration file are loaded
//! on every startup. Plain-text client secrets are hashed with Argon2id here
//! and never kept in memory afterwards.

use libris_auth::oauth::secret::hash_client_secret;
use libris_auth::types::{Client, ClientValidationError};
use libris_auth_memory::InMemoryAuthStorage;
use tracing::info;

use crate::config::{AppConfig, SeedClient};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("failed to hash secret of client {client_id}: {message}")]
    SecretHash { client_id: String, message: String },

    #[error("invalid registration for client {client_id}: {source}")]
    InvalidClient {
        client_id: String,
        #[source]
        source: ClientValidationError,
    },
}

/// Statistics from a seeding run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapStats {
    pub clients: usize,
    pub users: usize,
}

/// Registers the configured clients and users.
///
/// # Errors
///
/// Returns an error if a secret cannot be hashed or a registration is
/// inconsistent. Nothing is rolled back; the server refuses to start.
pub async fn seed_storage(
    storage: &InMemoryAuthStorage,
    cfg: &AppConfig,
) -> Result<BootstrapStats, BootstrapError> {
    let mut stats = BootstrapStats::default();

    for seed in &cfg.clients {
        let client = to_client(seed)?;
        storage
            .insert_client(client)
            .await
            .map_err(|source| BootstrapError::InvalidClient {
                client_id: seed.client_id.clone(),
                source,
            })?;
        stats.clients += 1;
    }

    for user in &cfg.users {
        storage.insert_user(user.clone()).await;
        stats.users += 1;
    }

    info!(
        clients = stats.clients,
        users = stats.users,
        "Seed data loaded"
    );
    Ok(stats)
}

fn to_client(seed: &SeedClient) -> Result<Client, BootstrapError> {
    let client_secret_hash = match seed.secret.as_deref().filter(|s| !s.is_empty()) {
        Some(secret) => {
            Some(
                hash_client_secret(secret).map_err(|e| BootstrapError::SecretHash {
                    client_id: seed.client_id.clone(),
                    message: e.to_string(),
                })?,
            )
        }
        None => None,
    };

    Ok(Client {
        client_id: seed.client_id.clone(),
        name: if seed.name.is_empty() {
            seed.client_id.clone()
        } else {
            seed.name.clone()
        },
        client_type: seed.client_type,
        client_secret_hash,
        redirect_uris: seed.redirect_uris.clone(),
        grant_types: seed.grant_types.clone(),
        scopes: seed.scopes.clone(),
        token_endpoint_auth_method: seed.auth_method(),
        active: seed.active,
        access_token_lifetime: seed.access_token_lifetime,
    })
}
