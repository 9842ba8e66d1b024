//! Config loading helpers (file + env).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.

use crate::env::{RelayEnv, apply_env_overrides};
use crate::schema::{RelayConfig, ValidatedRelayConfig};
use otlp_relay_shared::{ErrorCode, ErrorEnvelope};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// Load the relay config from sources using a deterministic precedence order.
///
/// Precedence (highest wins): env overrides (`RelayEnv`) > config file
/// content > defaults (`RelayConfig::default()`).
pub fn load_relay_config_from_sources(
    config_file: Option<&str>,
    format: Option<&str>,
    env: &RelayEnv,
) -> Result<ValidatedRelayConfig, ErrorEnvelope> {
    let base = match config_file {
        None => RelayConfig::default(),
        Some(input) => {
            let format = detect_config_format(format)?;
            parse_config_unvalidated(input, format)?
        },
    };

    apply_env_overrides(base, env)
}

/// Load the relay config from a file path plus the process environment.
pub fn load_relay_config_from_path(path: &Path) -> Result<ValidatedRelayConfig, ErrorEnvelope> {
    let env = RelayEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    let contents = read_config_file(path)?;
    let format = detect_config_format(path.extension().and_then(|ext| ext.to_str()))?;
    let base = parse_config_unvalidated(&contents, format)?;
    apply_env_overrides(base, &env)
}

/// Load the relay config from the process environment alone, against
/// defaults.
pub fn load_relay_config_std_env() -> Result<ValidatedRelayConfig, ErrorEnvelope> {
    let env = RelayEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    apply_env_overrides(RelayConfig::default(), &env)
}

fn detect_config_format(hint: Option<&str>) -> Result<ConfigFormat, ErrorEnvelope> {
    match hint.map(str::to_ascii_lowercase).as_deref() {
        Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unknown_format"),
            format!("unrecognized config format: {other}"),
        )),
        None => Ok(ConfigFormat::Json),
    }
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::io(),
            format!("failed to read config file {}: {error}", path.display()),
            otlp_relay_shared::ErrorClass::NonRetriable,
        )
    })
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<RelayConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
        }),
    }
}

/// Serialize a config to pretty-printed JSON.
pub fn to_pretty_json(config: &RelayConfig) -> Result<String, ErrorEnvelope> {
    serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config as JSON: {error}"),
            otlp_relay_shared::ErrorClass::NonRetriable,
        )
    })
}

/// Serialize a config to pretty-printed TOML.
pub fn to_pretty_toml(config: &RelayConfig) -> Result<String, ErrorEnvelope> {
    toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config as TOML: {error}"),
            otlp_relay_shared::ErrorClass::NonRetriable,
        )
    })
}
