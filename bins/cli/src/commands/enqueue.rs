//! Enqueue command handler: pushes one record onto the configured queue.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use otlp_relay_app::enqueue_with_retry;
use otlp_relay_config::{RelayEnv, load_relay_config_from_sources};
use otlp_relay_domain::Record;
use otlp_relay_infra::{build_logger, build_queue};
use otlp_relay_shared::{ErrorEnvelope, RequestContext};
use std::io::Read;
use std::path::Path;

/// Read one JSON record from `--message` or stdin and enqueue it with
/// retry, against the queue backend named in config.
pub async fn run_enqueue(
    mode: OutputMode,
    config_path: Option<&Path>,
    format: Option<&str>,
    message: Option<&str>,
) -> Result<CliOutput, CliError> {
    let payload = read_record_payload(message)?;
    let value: serde_json::Value = serde_json::from_str(&payload)?;
    let record = Record::from_json(value)?;

    let env = RelayEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    let config_path_str = config_path.map(|path| path.to_string_lossy().into_owned());
    let config = load_relay_config_from_sources(config_path_str.as_deref(), format, &env)?;

    let queue = build_queue(&config.queue)?;
    let logger = build_logger(&config.logging, &queue);

    let ctx = RequestContext::new_request();
    enqueue_with_retry(&ctx, queue.as_ref(), record, logger.as_ref()).await?;

    let stdout = if mode.is_ndjson() {
        format_summary_ndjson()?
    } else if mode.is_json() {
        format_summary_json()?
    } else {
        "status: ok\nenqueued: 1\n".to_string()
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn read_record_payload(message: Option<&str>) -> Result<String, CliError> {
    if let Some(message) = message {
        return Ok(message.to_owned());
    }

    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        return Err(CliError::InvalidInput(
            "missing --message and stdin is empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn format_summary_json() -> Result<String, CliError> {
    let payload = serde_json::json!({ "status": "ok", "enqueued": 1 });
    let mut output = serde_json::to_string_pretty(&payload)?;
    output.push('\n');
    Ok(output)
}

fn format_summary_ndjson() -> Result<String, CliError> {
    let payload = serde_json::json!({ "type": "summary", "status": "ok", "kind": "enqueue", "enqueued": 1 });
    let mut output = serde_json::to_string(&payload)?;
    output.push('\n');
    Ok(output)
}
