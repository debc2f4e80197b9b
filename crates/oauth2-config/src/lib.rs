use hocon::HoconLoader;
use oauth2_core::GOOGLE_TOKEN_URI;
use serde::{Deserialize, Serialize};
use std::path::Path;

const MASKED: &str = "***MASKED***";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub client: ClientConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// The OAuth2 client whose credentials are being stored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// Where credentials are persisted.
///
/// `url` selects the backend: `memory:` for an in-process container,
/// `sqlite:...` or `postgres://...` for a table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_url")]
    pub url: String,
    /// Container key (memory) or key column value (SQL).
    #[serde(default = "default_storage_key")]
    pub key: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_key_column")]
    pub key_column: String,
    #[serde(default = "default_credential_column")]
    pub credential_column: String,
}

fn default_scopes() -> Vec<String> {
    vec!["email".to_string()]
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

fn default_storage_url() -> String {
    "memory:".to_string()
}

fn default_storage_key() -> String {
    "google_oauth2_credentials".to_string()
}

fn default_table() -> String {
    "oauth2_credentials".to_string()
}

fn default_key_column() -> String {
    "id".to_string()
}

fn default_credential_column() -> String {
    "credentials".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: default_storage_url(),
            key: default_storage_key(),
            table: default_table(),
            key_column: default_key_column(),
            credential_column: default_credential_column(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        // Try to load from HOCON file first, fall back to environment variables
        Self::from_hocon().unwrap_or_else(|e| {
            tracing::warn!(
                "Failed to load HOCON config: {}. Falling back to environment variables.",
                e
            );
            Self::from_env_fallback()
        })
    }
}

fn split_scopes(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

impl Config {
    /// Load configuration from `application.conf` in the working directory.
    pub fn from_hocon() -> Result<Self, String> {
        Self::from_hocon_path("application.conf")
    }

    /// Load configuration from a specific HOCON file path.
    ///
    /// `GOOGLE_OAUTH2_*` environment variables override the file's client settings.
    pub fn from_hocon_path<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(format!("Configuration file not found: {}", path.display()));
        }

        let mut config: Config = HoconLoader::new()
            .load_file(path)
            .map_err(|e| format!("Failed to load HOCON file: {}", e))?
            .resolve()
            .map_err(|e| format!("Failed to parse and resolve HOCON: {}", e))?;

        config.load_client_from_env();

        Ok(config)
    }

    /// Structured environment loading via the `config` crate, e.g.
    /// `OAUTH2_CLIENT__CLIENT_ID`, `OAUTH2_STORAGE__URL`,
    /// `OAUTH2_CLIENT__SCOPES="email profile"`.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("OAUTH2")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(" ")
                    .with_list_parse_key("client.scopes")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Fallback configuration from flat environment variables.
    fn from_env_fallback() -> Self {
        let storage = StorageConfig {
            url: std::env::var("OAUTH2_STORAGE_URL").unwrap_or_else(|_| default_storage_url()),
            key: std::env::var("OAUTH2_STORAGE_KEY").unwrap_or_else(|_| default_storage_key()),
            table: std::env::var("OAUTH2_STORAGE_TABLE").unwrap_or_else(|_| default_table()),
            key_column: std::env::var("OAUTH2_STORAGE_KEY_COLUMN")
                .unwrap_or_else(|_| default_key_column()),
            credential_column: std::env::var("OAUTH2_STORAGE_CREDENTIAL_COLUMN")
                .unwrap_or_else(|_| default_credential_column()),
        };

        let mut config = Self {
            client: ClientConfig {
                client_id: String::new(),
                client_secret: String::new(),
                scopes: default_scopes(),
                token_uri: default_token_uri(),
            },
            storage,
        };

        config.load_client_from_env();
        config
    }

    /// Apply `GOOGLE_OAUTH2_*` overrides to the client settings.
    fn load_client_from_env(&mut self) {
        if let Ok(client_id) = std::env::var("GOOGLE_OAUTH2_CLIENT_ID") {
            self.client.client_id = client_id;
        }
        if let Ok(client_secret) = std::env::var("GOOGLE_OAUTH2_CLIENT_SECRET") {
            self.client.client_secret = client_secret;
        }
        if let Ok(scopes) = std::env::var("GOOGLE_OAUTH2_SCOPES") {
            let scopes = split_scopes(&scopes);
            if !scopes.is_empty() {
                self.client.scopes = scopes;
            }
        }
        if let Ok(token_uri) = std::env::var("GOOGLE_OAUTH2_TOKEN_URI") {
            self.client.token_uri = token_uri;
        }
    }

    /// Check the settings are usable before building a storage.
    pub fn validate(&self) -> Result<(), String> {
        if self.client.client_id.trim().is_empty() {
            return Err("GOOGLE_OAUTH2_CLIENT_ID must be set".to_string());
        }
        if self.client.client_secret.trim().is_empty() {
            return Err("GOOGLE_OAUTH2_CLIENT_SECRET must be set".to_string());
        }
        if self.client.scopes.is_empty() {
            return Err("at least one OAuth2 scope is required".to_string());
        }
        if self.storage.key.is_empty() {
            return Err("storage key must not be empty".to_string());
        }

        let url = self.storage.url.as_str();
        let known = url == "memory:"
            || url.starts_with("sqlite:")
            || url.starts_with("postgres://")
            || url.starts_with("postgresql://");
        if !known {
            return Err(format!("unsupported storage url `{url}`"));
        }

        Ok(())
    }

    /// Produce a version safe to log (secrets masked).
    pub fn sanitized(&self) -> Self {
        let mut clone = self.clone();
        clone.client.client_secret = MASKED.to_string();
        clone.storage.url = Self::sanitize_url(&clone.storage.url);
        clone
    }

    fn sanitize_url(raw: &str) -> String {
        match url::Url::parse(raw) {
            Ok(mut parsed) if parsed.password().is_some() => {
                // set_password only fails for URLs that cannot carry credentials.
                if parsed.set_password(Some(MASKED)).is_ok() {
                    parsed.to_string()
                } else {
                    raw.to_string()
                }
            }
            _ => raw.to_string(),
        }
    }
}
