use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{AuthConfig, BackendConfig, Config, ExportConfig, LoggingConfig, ServerConfig};

/// Prefix for environment overrides, e.g. `SALESBOARD__BACKEND__URL`.
pub const ENV_PREFIX: &str = "SALESBOARD";

/// Loads the application configuration.
///
/// Sources, later ones winning: the optional file (`config.toml` in the working
/// directory unless `path` is given), then `SALESBOARD__SECTION__KEY` environment
/// variables. An explicitly requested file must exist.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(p) => config::File::from(p).required(true),
        None => config::File::with_name("config.toml").required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(backend = %config.backend.url, "Configuration loaded.");
    Ok(config)
}
