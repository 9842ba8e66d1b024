//! Exporter and queue settings schema, defaults, validation, and
//! normalization.
//!
//! Deserialization uses `serde` (JSON or TOML). Validation is manual and
//! returns typed errors mapped to `ErrorEnvelope`.

use otlp_relay_shared::{BoundedU32, BoundedU64, ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Current supported configuration schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

const BATCH_SIZE_MIN: u32 = 1;
const BATCH_SIZE_MAX: u32 = 100_000;
const FULL_BATCH_TIMEOUT_MIN_MS: u64 = 1;
const FULL_BATCH_TIMEOUT_MAX_MS: u64 = 3_600_000;
const RECEIVE_TIMEOUT_MIN_MS: u64 = 1;
const RECEIVE_TIMEOUT_MAX_MS: u64 = 3_600_000;

fn default_endpoint() -> Url {
    Url::parse("http://127.0.0.1:4318/v1/logs").expect("hardcoded default endpoint must parse")
}

/// Top-level relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RelayConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// Batching exporter settings.
    pub exporter: ExporterSettings,
    /// Queue backend settings.
    pub queue: QueueSettings,
    /// Logging-related settings (`spec.md` §6.4).
    pub logging: LoggingSettings,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            exporter: ExporterSettings::default(),
            queue: QueueSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl RelayConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedRelayConfig, ConfigSchemaError> {
        self.validate_version()?;
        self.exporter.validate()?;
        self.queue.normalize();
        self.queue.validate()?;
        self.logging.normalize();

        let limits = ConfigLimits::new(&self)?;
        Ok(ValidatedRelayConfig { raw: self, limits })
    }

    const fn validate_version(&self) -> Result<(), ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }
        Ok(())
    }
}

/// Validated config wrapper carrying bounded numeric values.
#[derive(Debug, Clone)]
pub struct ValidatedRelayConfig {
    raw: RelayConfig,
    limits: ConfigLimits,
}

impl ValidatedRelayConfig {
    /// Access validated numeric bounds.
    #[must_use]
    pub const fn limits(&self) -> &ConfigLimits {
        &self.limits
    }

    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &RelayConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> RelayConfig {
        self.raw
    }
}

impl AsRef<RelayConfig> for ValidatedRelayConfig {
    fn as_ref(&self) -> &RelayConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedRelayConfig {
    type Target = RelayConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Validated numeric limits derived from the config.
#[derive(Debug, Clone, Copy)]
pub struct ConfigLimits {
    /// Batch size.
    pub batch_size: BoundedU32<BATCH_SIZE_MIN, BATCH_SIZE_MAX>,
    /// Full-batch timeout (ms).
    pub full_batch_timeout_ms: BoundedU64<FULL_BATCH_TIMEOUT_MIN_MS, FULL_BATCH_TIMEOUT_MAX_MS>,
    /// Receive timeout (ms).
    pub receive_timeout_ms: BoundedU64<RECEIVE_TIMEOUT_MIN_MS, RECEIVE_TIMEOUT_MAX_MS>,
}

impl ConfigLimits {
    fn new(config: &RelayConfig) -> Result<Self, ConfigSchemaError> {
        Ok(Self {
            batch_size: bounded_u32(
                "exporter",
                "batchSize",
                config.exporter.batch_size,
                BATCH_SIZE_MIN,
                BATCH_SIZE_MAX,
            )?,
            full_batch_timeout_ms: bounded_u64(
                "exporter",
                "fullBatchTimeoutMs",
                config.exporter.full_batch_timeout_ms,
                FULL_BATCH_TIMEOUT_MIN_MS,
                FULL_BATCH_TIMEOUT_MAX_MS,
            )?,
            receive_timeout_ms: bounded_u64(
                "exporter",
                "receiveTimeoutMs",
                config.exporter.receive_timeout_ms,
                RECEIVE_TIMEOUT_MIN_MS,
                RECEIVE_TIMEOUT_MAX_MS,
            )?,
        })
    }
}

/// Parse a relay config from a JSON string, applying validation and normalization.
pub fn parse_relay_config_json(input: &str) -> Result<ValidatedRelayConfig, ErrorEnvelope> {
    let config: RelayConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Parse a relay config from a TOML string, applying validation and normalization.
pub fn parse_relay_config_toml(input: &str) -> Result<ValidatedRelayConfig, ErrorEnvelope> {
    let config: RelayConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Batching exporter settings (`spec.md` §4.6, `SPEC_FULL.md` §4.10).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ExporterSettings {
    /// Flush once the open batch reaches this many records.
    pub batch_size: u32,
    /// Force-flush an open batch once it has been open this long (ms).
    pub full_batch_timeout_ms: u64,
    /// Bound on a single blocking receive (ms).
    pub receive_timeout_ms: u64,
    /// Detach the per-iteration receive timeout from the outer scope.
    pub soft_stop: bool,
    /// OTLP/HTTP collector endpoint batches are POSTed to.
    pub endpoint: Url,
}

impl Default for ExporterSettings {
    fn default() -> Self {
        Self {
            batch_size: 512,
            full_batch_timeout_ms: 5_000,
            receive_timeout_ms: 1_000,
            soft_stop: true,
            endpoint: default_endpoint(),
        }
    }
}

impl ExporterSettings {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        validate_limit_u32(
            "exporter",
            "batchSize",
            self.batch_size,
            BATCH_SIZE_MIN,
            BATCH_SIZE_MAX,
        )?;
        validate_timeout_ms(
            "exporter",
            "fullBatchTimeoutMs",
            self.full_batch_timeout_ms,
            FULL_BATCH_TIMEOUT_MIN_MS,
            FULL_BATCH_TIMEOUT_MAX_MS,
        )?;
        validate_timeout_ms(
            "exporter",
            "receiveTimeoutMs",
            self.receive_timeout_ms,
            RECEIVE_TIMEOUT_MIN_MS,
            RECEIVE_TIMEOUT_MAX_MS,
        )?;
        if self.endpoint.scheme() != "http" && self.endpoint.scheme() != "https" {
            return Err(ConfigSchemaError::InvalidUrl {
                section: "exporter",
                field: "endpoint",
                url: self.endpoint.to_string(),
            });
        }
        Ok(())
    }
}

/// Queue backend selection (`spec.md` §4.3/§4.4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct QueueSettings {
    /// The configured backend.
    pub backend: QueueBackend,
}

impl QueueSettings {
    fn normalize(&mut self) {
        if let QueueBackend::Durable { path } = &mut self.backend {
            let trimmed = path.trim();
            if trimmed != path.as_ref() {
                *path = trimmed.to_owned().into_boxed_str();
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigSchemaError> {
        if let QueueBackend::Durable { path } = &self.backend
            && path.is_empty()
        {
            return Err(ConfigSchemaError::InvalidQueuePath {
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

/// Queue backend: in-memory or durable (`SQLite`-backed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum QueueBackend {
    /// Non-durable in-process queue.
    Memory,
    /// `SQLite`-backed durable queue at the given file path.
    Durable {
        /// Path to the `SQLite` database file.
        path: Box<str>,
    },
}

impl Default for QueueBackend {
    fn default() -> Self {
        Self::Memory
    }
}

/// Logging-related settings (`spec.md` §6.4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct LoggingSettings {
    /// When false, debug-severity records are dropped at the producer-side
    /// log sink.
    pub log_debug: bool,
    /// Optional queue binding name; when present the producer additionally
    /// tees each log into the named queue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_queue: Option<Box<str>>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_debug: true,
            log_queue: None,
        }
    }
}

impl LoggingSettings {
    fn normalize(&mut self) {
        normalize_optional_trimmed(&mut self.log_queue);
    }
}

/// Typed validation errors for the configuration schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported by this binary.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A timeout value is out of bounds.
    TimeoutOutOfRange {
        /// Schema section (e.g. `exporter`).
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Value provided (ms).
        value_ms: u64,
        /// Minimum allowed value (ms).
        min_ms: u64,
        /// Maximum allowed value (ms).
        max_ms: u64,
    },
    /// A numeric limit is out of bounds.
    LimitOutOfRange {
        /// Schema section (e.g. `exporter`).
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Value provided.
        value: u64,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
    },
    /// A URL entry is invalid.
    InvalidUrl {
        /// Schema section (e.g. `exporter`).
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Invalid URL value.
        url: String,
    },
    /// The durable queue path is invalid.
    InvalidQueuePath {
        /// Invalid path value.
        path: String,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::TimeoutOutOfRange { .. } => ErrorCode::new("config", "invalid_timeout"),
            Self::LimitOutOfRange { .. } => ErrorCode::new("config", "invalid_limit"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_url"),
            Self::InvalidQueuePath { .. } => ErrorCode::new("config", "invalid_queue_path"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => {
                write!(
                    formatter,
                    "unsupported config version: {found} (supported: {supported})"
                )
            },
            Self::TimeoutOutOfRange {
                section,
                field,
                value_ms,
                min_ms,
                max_ms,
            } => write!(
                formatter,
                "{section}.{field} must be within [{min_ms}, {max_ms}] ms (got {value_ms})"
            ),
            Self::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => write!(
                formatter,
                "{section}.{field} must be within [{min}, {max}] (got {value})"
            ),
            Self::InvalidUrl { section, field, .. } => {
                write!(formatter, "invalid URL for {section}.{field}")
            },
            Self::InvalidQueuePath { .. } => {
                write!(formatter, "queue.backend durable path must not be empty")
            },
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => {
                envelope = envelope
                    .with_metadata("found", found.to_string())
                    .with_metadata("supported", supported.to_string());
            },
            ConfigSchemaError::TimeoutOutOfRange {
                section,
                field,
                value_ms,
                min_ms,
                max_ms,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("value_ms", value_ms.to_string())
                    .with_metadata("min_ms", min_ms.to_string())
                    .with_metadata("max_ms", max_ms.to_string());
            },
            ConfigSchemaError::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("value", value.to_string())
                    .with_metadata("min", min.to_string())
                    .with_metadata("max", max.to_string());
            },
            ConfigSchemaError::InvalidUrl {
                section,
                field,
                url,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("url", sanitize_url_for_error(&url));
            },
            ConfigSchemaError::InvalidQueuePath { path } => {
                envelope = envelope.with_metadata("path", path);
            },
        }

        envelope
    }
}

fn sanitize_url_for_error(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() || !parsed.username().is_empty() {
                if parsed.set_username("").is_err() {
                    return "[invalid url: invalid username]".to_string();
                }
                if parsed.set_password(None).is_err() {
                    return "[invalid url: invalid password]".to_string();
                }
            }
            parsed.to_string()
        },
        Err(error) => format!("[invalid url: {error}]"),
    }
}

fn bounded_u32<const MIN: u32, const MAX: u32>(
    section: &'static str,
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<BoundedU32<MIN, MAX>, ConfigSchemaError> {
    BoundedU32::try_new(value).map_err(|_| ConfigSchemaError::LimitOutOfRange {
        section,
        field,
        value: u64::from(value),
        min: u64::from(min),
        max: u64::from(max),
    })
}

fn bounded_u64<const MIN: u64, const MAX: u64>(
    section: &'static str,
    field: &'static str,
    value: u64,
    min: u64,
    max: u64,
) -> Result<BoundedU64<MIN, MAX>, ConfigSchemaError> {
    BoundedU64::try_new(value).map_err(|_| ConfigSchemaError::LimitOutOfRange {
        section,
        field,
        value,
        min,
        max,
    })
}

fn validate_limit_u32(
    section: &'static str,
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<(), ConfigSchemaError> {
    if value < min || value > max {
        return Err(ConfigSchemaError::LimitOutOfRange {
            section,
            field,
            value: u64::from(value),
            min: u64::from(min),
            max: u64::from(max),
        });
    }
    Ok(())
}

const fn validate_timeout_ms(
    section: &'static str,
    field: &'static str,
    value_ms: u64,
    min_ms: u64,
    max_ms: u64,
) -> Result<(), ConfigSchemaError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigSchemaError::TimeoutOutOfRange {
            section,
            field,
            value_ms,
            min_ms,
            max_ms,
        });
    }
    Ok(())
}

fn normalize_optional_trimmed(value: &mut Option<Box<str>>) {
    let Some(raw) = value.take() else {
        return;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        *value = None;
    } else {
        *value = Some(trimmed.to_owned().into_boxed_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let validated = RelayConfig::default()
            .validate_and_normalize()
            .expect("defaults must validate");
        assert_eq!(validated.limits().batch_size.get(), 512);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut config = RelayConfig::default();
        config.version = CURRENT_CONFIG_VERSION + 1;
        let error = config
            .validate_and_normalize()
            .expect_err("future version should be rejected");
        assert!(matches!(error, ConfigSchemaError::UnsupportedVersion { .. }));
    }

    #[test]
    fn batch_size_out_of_range_is_rejected() {
        let mut config = RelayConfig::default();
        config.exporter.batch_size = 0;
        config
            .validate_and_normalize()
            .expect_err("zero batch size should be rejected");
    }

    #[test]
    fn non_http_endpoint_is_rejected() {
        let mut config = RelayConfig::default();
        config.exporter.endpoint = Url::parse("ftp://example.com/").expect("valid url");
        let error = config
            .validate_and_normalize()
            .expect_err("non-http endpoint should be rejected");
        assert!(matches!(error, ConfigSchemaError::InvalidUrl { .. }));
    }

    #[test]
    fn durable_backend_requires_non_empty_path_after_trimming() {
        let mut config = RelayConfig::default();
        config.queue.backend = QueueBackend::Durable {
            path: "   ".into(),
        };
        config
            .validate_and_normalize()
            .expect_err("whitespace-only path should be rejected");
    }

    #[test]
    fn durable_backend_path_is_trimmed() {
        let mut config = RelayConfig::default();
        config.queue.backend = QueueBackend::Durable {
            path: "  /var/lib/relay/queue.db  ".into(),
        };
        let validated = config
            .validate_and_normalize()
            .expect("trimmed path should validate");
        match &validated.as_ref().queue.backend {
            QueueBackend::Durable { path } => assert_eq!(path.as_ref(), "/var/lib/relay/queue.db"),
            QueueBackend::Memory => panic!("expected durable backend"),
        }
    }

    #[test]
    fn parse_relay_config_json_round_trips() {
        let json = to_json_for_test(&RelayConfig::default());
        let validated = parse_relay_config_json(&json).expect("default config should parse");
        assert_eq!(validated.as_ref().version, CURRENT_CONFIG_VERSION);
    }

    #[test]
    fn parse_relay_config_toml_round_trips() {
        let toml_text = toml::to_string_pretty(&RelayConfig::default()).expect("serialize toml");
        let validated = parse_relay_config_toml(&toml_text).expect("default config should parse");
        assert_eq!(validated.as_ref().version, CURRENT_CONFIG_VERSION);
    }

    fn to_json_for_test(config: &RelayConfig) -> String {
        serde_json::to_string(config).expect("serialize json")
    }
}
