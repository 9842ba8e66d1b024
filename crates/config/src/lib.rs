//! # otlp-relay-config
//!
//! Exporter and queue settings schema, validation, and env/file loading.
//! This crate depends on `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (file + env).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use env::{ENV_COMPOSE_COMMAND, ENV_LOG_DEBUG, ENV_LOG_QUEUE, EnvParseError, RelayEnv, apply_env_overrides};
pub use load::{
    load_relay_config_from_path, load_relay_config_from_sources, load_relay_config_std_env,
    to_pretty_json, to_pretty_toml,
};
pub use schema::{
    CURRENT_CONFIG_VERSION, ConfigLimits, ConfigSchemaError, ExporterSettings, LoggingSettings,
    QueueBackend, QueueSettings, RelayConfig, ValidatedRelayConfig, parse_relay_config_json,
    parse_relay_config_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use otlp_relay_shared::shared_crate_version;

    #[test]
    fn config_crate_compiles() {
        let version = config_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn config_can_use_shared() {
        let shared_version = shared_crate_version();
        assert!(!shared_version.is_empty());
    }

    #[test]
    fn defaults_validate_successfully() {
        RelayConfig::default()
            .validate_and_normalize()
            .expect("defaults must be valid");
    }
}
