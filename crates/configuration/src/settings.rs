use crate::error::ConfigError;
use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the hosted backend-as-a-service lives and how to talk to it.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// The public (anon) API key sent as the `apikey` header on every request.
    pub anon_key: String,
    /// Privileged key used by the server for data calls and operator invitations.
    /// Without it, data calls carry the signed-in user's token.
    #[serde(default)]
    pub service_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Only addresses under this domain may sign up or be invited as operators.
    #[serde(default = "default_email_domain")]
    pub allowed_email_domain: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_timeout() -> u64 { 10 }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 3000 }
fn default_email_domain() -> String { "investsmart.com.br".to_string() }
fn default_delimiter() -> String { ",".to_string() }
fn default_level() -> String { "info".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { allowed_email_domain: default_email_domain() }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { delimiter: default_delimiter() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level(), directory: None }
    }
}

impl Config {
    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::ValidationError("backend.url must be set".into()));
        }
        if self.backend.anon_key.trim().is_empty() {
            return Err(ConfigError::ValidationError("backend.anon_key must be set".into()));
        }
        if self.auth.allowed_email_domain.trim().is_empty() {
            return Err(ConfigError::ValidationError("auth.allowed_email_domain must not be empty".into()));
        }
        self.export.delimiter_byte()?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AuthConfig {
    /// Case-insensitive check that `email` belongs to the allowed domain.
    pub fn accepts_email(&self, email: &str) -> bool {
        let suffix = format!("@{}", self.allowed_email_domain.trim().to_ascii_lowercase());
        email.trim().to_ascii_lowercase().ends_with(&suffix)
    }
}

impl ExportConfig {
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(ConfigError::ValidationError(format!(
                "export.delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            ))),
        }
    }
}
