//! Environment variable overrides for [`crate::schema::RelayConfig`].
//!
//! Each override is parsed strictly: a present-but-invalid value is a hard
//! failure rather than a silent fallback to the default.

use crate::schema::{ExporterSettings, LoggingSettings, QueueBackend, QueueSettings, RelayConfig};
use otlp_relay_shared::{ErrorCode, ErrorEnvelope};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Exporter batch size override.
pub const ENV_EXPORTER_BATCH_SIZE: &str = "RELAY_EXPORTER_BATCH_SIZE";
/// Exporter full-batch timeout override (ms).
pub const ENV_EXPORTER_FULL_BATCH_TIMEOUT_MS: &str = "RELAY_EXPORTER_FULL_BATCH_TIMEOUT_MS";
/// Exporter receive timeout override (ms).
pub const ENV_EXPORTER_RECEIVE_TIMEOUT_MS: &str = "RELAY_EXPORTER_RECEIVE_TIMEOUT_MS";
/// Exporter soft-stop override.
pub const ENV_EXPORTER_SOFT_STOP: &str = "RELAY_EXPORTER_SOFT_STOP";
/// Exporter endpoint override.
pub const ENV_EXPORTER_ENDPOINT: &str = "RELAY_EXPORTER_ENDPOINT";
/// Queue backend override (`memory` | `durable`).
pub const ENV_QUEUE_BACKEND: &str = "RELAY_QUEUE_BACKEND";
/// Durable queue path override.
pub const ENV_QUEUE_DURABLE_PATH: &str = "RELAY_QUEUE_DURABLE_PATH";
/// Whether debug-severity records are kept (`spec.md` §6.4).
pub const ENV_LOG_DEBUG: &str = "LOG_DEBUG";
/// Queue binding name logs are additionally teed into (`spec.md` §6.4).
pub const ENV_LOG_QUEUE: &str = "LOG_QUEUE";
/// Test-only: the compose command used by e2e test harnesses.
pub const ENV_COMPOSE_COMMAND: &str = "COMPOSE_COMMAND";

/// Typed environment overrides, one optional field per configurable value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayEnv {
    /// Override for [`ExporterSettings::batch_size`].
    pub exporter_batch_size: Option<u32>,
    /// Override for [`ExporterSettings::full_batch_timeout_ms`].
    pub exporter_full_batch_timeout_ms: Option<u64>,
    /// Override for [`ExporterSettings::receive_timeout_ms`].
    pub exporter_receive_timeout_ms: Option<u64>,
    /// Override for [`ExporterSettings::soft_stop`].
    pub exporter_soft_stop: Option<bool>,
    /// Override for [`ExporterSettings::endpoint`].
    pub exporter_endpoint: Option<Url>,
    /// Override for [`QueueSettings::backend`].
    pub queue_backend: Option<QueueBackend>,
    /// Override for [`LoggingSettings::log_debug`].
    pub log_debug: Option<bool>,
    /// Override for [`LoggingSettings::log_queue`].
    pub log_queue: Option<Box<str>>,
    /// Test-only compose command passthrough.
    pub compose_command: Option<Box<str>>,
}

impl RelayEnv {
    /// Build overrides from an arbitrary string map, useful for tests.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            exporter_batch_size: parse_opt_u32(map, ENV_EXPORTER_BATCH_SIZE)?,
            exporter_full_batch_timeout_ms: parse_opt_u64(
                map,
                ENV_EXPORTER_FULL_BATCH_TIMEOUT_MS,
            )?,
            exporter_receive_timeout_ms: parse_opt_u64(map, ENV_EXPORTER_RECEIVE_TIMEOUT_MS)?,
            exporter_soft_stop: parse_opt_bool(map, ENV_EXPORTER_SOFT_STOP)?,
            exporter_endpoint: parse_opt_url(map, ENV_EXPORTER_ENDPOINT)?,
            queue_backend: parse_opt_queue_backend(map)?,
            log_debug: parse_opt_bool(map, ENV_LOG_DEBUG)?,
            log_queue: parse_opt_box_str(map, ENV_LOG_QUEUE),
            compose_command: parse_opt_box_str(map, ENV_COMPOSE_COMMAND),
        })
    }

    /// Build overrides from the process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let map: BTreeMap<String, String> = std::env::vars().collect();
        Self::from_map(&map)
    }
}

/// A typed error for a single environment variable parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvParseError {
    /// The environment variable name.
    pub var: &'static str,
    /// The raw value that failed to parse.
    pub value: String,
    /// A short description of the expected shape.
    pub expected: &'static str,
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{} has invalid value {:?}, expected {}",
            self.var, self.value, self.expected
        )
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        Self::expected(ErrorCode::new("config", "invalid_env"), error.to_string())
            .with_metadata("var", error.var)
            .with_metadata("expected", error.expected)
    }
}

fn parse_opt_u32(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u32>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    raw.trim().parse::<u32>().map(Some).map_err(|_| EnvParseError {
        var,
        value: raw.clone(),
        expected: "an unsigned 32-bit integer",
    })
}

fn parse_opt_u64(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    raw.trim().parse::<u64>().map(Some).map_err(|_| EnvParseError {
        var,
        value: raw.clone(),
        expected: "an unsigned 64-bit integer",
    })
}

fn parse_opt_bool(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<bool>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(EnvParseError {
            var,
            value: raw.clone(),
            expected: "a boolean (true/false/1/0/yes/no/on/off)",
        }),
    }
}

fn parse_opt_url(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Url>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    Url::parse(raw.trim()).map(Some).map_err(|_| EnvParseError {
        var,
        value: raw.clone(),
        expected: "an absolute URL",
    })
}

fn parse_opt_box_str(map: &BTreeMap<String, String>, var: &'static str) -> Option<Box<str>> {
    let raw = map.get(var)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned().into_boxed_str())
    }
}

fn parse_opt_queue_backend(
    map: &BTreeMap<String, String>,
) -> Result<Option<QueueBackend>, EnvParseError> {
    let Some(raw) = map.get(ENV_QUEUE_BACKEND) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "memory" => Ok(Some(QueueBackend::Memory)),
        "durable" => {
            let path = map
                .get(ENV_QUEUE_DURABLE_PATH)
                .map(|raw| raw.trim().to_owned())
                .filter(|path| !path.is_empty())
                .ok_or(EnvParseError {
                    var: ENV_QUEUE_DURABLE_PATH,
                    value: String::new(),
                    expected: "a non-empty path when RELAY_QUEUE_BACKEND=durable",
                })?;
            Ok(Some(QueueBackend::Durable {
                path: path.into_boxed_str(),
            }))
        },
        _ => Err(EnvParseError {
            var: ENV_QUEUE_BACKEND,
            value: raw.clone(),
            expected: "\"memory\" or \"durable\"",
        }),
    }
}

/// Terse setter helper mirroring the teacher's `EnvConfigMapper` idiom: each
/// method applies an override only when present, keeping the call site in
/// [`apply_env_overrides`] to one line per field.
struct EnvConfigMapper<'a> {
    exporter: &'a mut ExporterSettings,
    queue: &'a mut QueueSettings,
    logging: &'a mut LoggingSettings,
}

impl<'a> EnvConfigMapper<'a> {
    fn new(config: &'a mut RelayConfig) -> Self {
        Self {
            exporter: &mut config.exporter,
            queue: &mut config.queue,
            logging: &mut config.logging,
        }
    }

    fn set_batch_size(&mut self, value: Option<u32>) {
        if let Some(value) = value {
            self.exporter.batch_size = value;
        }
    }

    fn set_full_batch_timeout_ms(&mut self, value: Option<u64>) {
        if let Some(value) = value {
            self.exporter.full_batch_timeout_ms = value;
        }
    }

    fn set_receive_timeout_ms(&mut self, value: Option<u64>) {
        if let Some(value) = value {
            self.exporter.receive_timeout_ms = value;
        }
    }

    fn set_soft_stop(&mut self, value: Option<bool>) {
        if let Some(value) = value {
            self.exporter.soft_stop = value;
        }
    }

    fn set_endpoint(&mut self, value: Option<Url>) {
        if let Some(value) = value {
            self.exporter.endpoint = value;
        }
    }

    fn set_queue_backend(&mut self, value: Option<QueueBackend>) {
        if let Some(value) = value {
            self.queue.backend = value;
        }
    }

    fn set_log_debug(&mut self, value: Option<bool>) {
        if let Some(value) = value {
            self.logging.log_debug = value;
        }
    }

    fn set_log_queue(&mut self, value: Option<Box<str>>) {
        if value.is_some() {
            self.logging.log_queue = value;
        }
    }
}

/// Apply environment overrides over a base config, then validate.
pub fn apply_env_overrides(
    base: RelayConfig,
    env: &RelayEnv,
) -> Result<crate::schema::ValidatedRelayConfig, ErrorEnvelope> {
    let mut config = base;
    let mut mapper = EnvConfigMapper::new(&mut config);
    mapper.set_batch_size(env.exporter_batch_size);
    mapper.set_full_batch_timeout_ms(env.exporter_full_batch_timeout_ms);
    mapper.set_receive_timeout_ms(env.exporter_receive_timeout_ms);
    mapper.set_soft_stop(env.exporter_soft_stop);
    mapper.set_endpoint(env.exporter_endpoint.clone());
    mapper.set_queue_backend(env.queue_backend.clone());
    mapper.set_log_debug(env.log_debug);
    mapper.set_log_queue(env.log_queue.clone());

    config.validate_and_normalize().map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn from_map_parses_all_known_variables() {
        let env = RelayEnv::from_map(&map(&[
            (ENV_EXPORTER_BATCH_SIZE, "256"),
            (ENV_EXPORTER_FULL_BATCH_TIMEOUT_MS, "2500"),
            (ENV_EXPORTER_RECEIVE_TIMEOUT_MS, "750"),
            (ENV_EXPORTER_SOFT_STOP, "false"),
            (ENV_EXPORTER_ENDPOINT, "https://collector.example/v1/logs"),
            (ENV_QUEUE_BACKEND, "durable"),
            (ENV_QUEUE_DURABLE_PATH, "/var/lib/relay/queue.db"),
            (ENV_LOG_DEBUG, "0"),
            (ENV_LOG_QUEUE, "app-logs"),
        ]))
        .expect("well-formed env should parse");

        assert_eq!(env.exporter_batch_size, Some(256));
        assert_eq!(env.exporter_soft_stop, Some(false));
        assert_eq!(env.log_debug, Some(false));
        assert_eq!(env.log_queue.as_deref(), Some("app-logs"));
        assert_eq!(
            env.queue_backend,
            Some(QueueBackend::Durable {
                path: "/var/lib/relay/queue.db".into(),
            })
        );
    }

    #[test]
    fn invalid_bool_is_rejected() {
        let error = RelayEnv::from_map(&map(&[(ENV_EXPORTER_SOFT_STOP, "maybe")]))
            .expect_err("invalid bool should fail");
        assert_eq!(error.var, ENV_EXPORTER_SOFT_STOP);
    }

    #[test]
    fn durable_backend_without_path_is_rejected() {
        let error = RelayEnv::from_map(&map(&[(ENV_QUEUE_BACKEND, "durable")]))
            .expect_err("durable without path should fail");
        assert_eq!(error.var, ENV_QUEUE_DURABLE_PATH);
    }

    #[test]
    fn apply_env_overrides_overrides_defaults() {
        let env = RelayEnv::from_map(&map(&[(ENV_EXPORTER_BATCH_SIZE, "4096")]))
            .expect("well-formed env should parse");
        let validated = apply_env_overrides(RelayConfig::default(), &env)
            .expect("valid override should succeed");
        assert_eq!(validated.as_ref().exporter.batch_size, 4096);
    }

    #[test]
    fn apply_env_overrides_rejects_out_of_range_values() {
        let env = RelayEnv::from_map(&map(&[(ENV_EXPORTER_BATCH_SIZE, "0")]))
            .expect("well-formed env should parse");
        apply_env_overrides(RelayConfig::default(), &env)
            .expect_err("zero batch size should fail validation");
    }
}
