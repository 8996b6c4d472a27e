use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderValue;
use libris_auth::types::{ClientType, GrantType, TokenEndpointAuthMethod, UserInfo};
use libris_auth::{AuthConfig, ConfigError, HeaderResourceOwner};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Authorization server core configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Clients registered at startup
    #[serde(default)]
    pub clients: Vec<SeedClient>,
    /// Resource owner claims loaded at startup
    #[serde(default)]
    pub users: Vec<UserInfo>,
}

impl AppConfig {
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.server.host.parse().map_err(|_| {
            ConfigError::InvalidValue(format!(
                "server.host must be an IP address, got {:?}",
                self.server.host
            ))
        })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Server validations
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue("server.port must be > 0".into()));
        }
        if self.server.body_limit_bytes == 0 {
            return Err(ConfigError::InvalidValue(
                "server.body_limit_bytes must be > 0".into(),
            ));
        }
        self.addr()?;
        if axum::http::HeaderName::try_from(self.server.resource_owner_header.as_str()).is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "server.resource_owner_header is not a valid header name: {:?}",
                self.server.resource_owner_header
            )));
        }
        for origin in &self.server.cors_allowed_origins {
            if origin == "*" || HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::InvalidValue(format!(
                    "server.cors_allowed_origins contains an invalid origin: {origin:?}"
                )));
            }
        }

        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::InvalidValue(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }

        self.auth.validate()?;

        // Seed data validations
        for client in &self.clients {
            client.validate()?;
        }
        for user in &self.users {
            if user.sub.is_empty() {
                return Err(ConfigError::Missing("users[].sub".into()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// Trusted header carrying the authenticated resource owner, set by the
    /// login front end.
    #[serde(default = "default_resource_owner_header")]
    pub resource_owner_header: String,
    /// Browser origins allowed to call the token endpoints. Empty disables CORS.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    64 * 1024
}
fn default_resource_owner_header() -> String {
    HeaderResourceOwner::DEFAULT_HEADER.into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            resource_owner_header: default_resource_owner_header(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// A client registration as written in the configuration file.
///
/// The secret is given in plain text and hashed when the store is seeded.
///
/// ```toml
/// [[clients]]
/// client_id = "catalog-indexer"
/// name = "Catalog indexer"
/// client_type = "confidential"
/// secret = "indexer-secret"
/// grant_types = ["client_credentials"]
/// scopes = ["catalog:read"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedClient {
    pub client_id: String,
    #[serde(default)]
    pub name: String,
    pub client_type: ClientType,
    #[serde(default, skip_serializing)]
    pub secret: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<GrantType>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Defaults to `client_secret_basic` for confidential clients and `none`
    /// for public ones.
    #[serde(default)]
    pub token_endpoint_auth_method: Option<TokenEndpointAuthMethod>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Access token lifetime override in seconds.
    #[serde(default)]
    pub access_token_lifetime: Option<i64>,
}

fn default_active() -> bool {
    true
}

impl SeedClient {
    pub fn auth_method(&self) -> TokenEndpointAuthMethod {
        self.token_endpoint_auth_method
            .unwrap_or(match self.client_type {
                ClientType::Public => TokenEndpointAuthMethod::None,
                ClientType::Confidential => TokenEndpointAuthMethod::ClientSecretBasic,
            })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::Missing("clients[].client_id".into()));
        }
        let has_secret = self.secret.as_deref().is_some_and(|s| !s.is_empty());
        match self.client_type {
            ClientType::Confidential if !has_secret => Err(ConfigError::Missing(format!(
                "clients[{}].secret",
                self.client_id
            ))),
            ClientType::Public if has_secret => Err(ConfigError::InvalidValue(format!(
                "clients[{}]: public clients cannot have a secret",
                self.client_id
            ))),
            _ => Ok(()),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File, FileFormat};
    use libris_auth::ConfigError;
    use std::path::Path;

    /// Default configuration file, used when neither `--config` nor
    /// `LIBRIS_CONFIG` names one.
    pub const DEFAULT_CONFIG_PATH: &str = "libris.toml";

    /// Loads the configuration from `path`, then applies `LIBRIS__*`
    /// environment overrides, then validates the result.
    ///
    /// A missing file at the default path is skipped. A missing file at an
    /// explicitly named path is an error.
    pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::Missing(format!(
                        "configuration file {}",
                        p.display()
                    )));
                }
                builder = builder.add_source(File::from(p).format(FileFormat::Toml));
            }
            None => {
                builder = builder.add_source(
                    File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(false),
                );
            }
        }
        // Environment variable overrides, e.g., LIBRIS__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("LIBRIS")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| ConfigError::InvalidValue(format!("config build error: {e}")))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::InvalidValue(format!("config deserialize error: {e}")))?;
        merged.validate()?;
        Ok(merged)
    }
}
