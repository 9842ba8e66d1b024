//! Run command handler: drives the batching exporter loop until Ctrl-C.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use otlp_relay_config::{RelayEnv, load_relay_config_from_sources};
use otlp_relay_infra::{build_exporter, build_logger, build_queue, build_telemetry, run_exporter_until_cancelled};
use otlp_relay_shared::{ErrorEnvelope, RequestContext};
use std::path::Path;

/// Run the exporter loop against a configured queue until the process's
/// root scope is cancelled (Ctrl-C), respecting the configured (or
/// CLI-overridden) soft-stop behavior.
pub async fn run_run(
    mode: OutputMode,
    config_path: Option<&Path>,
    format: Option<&str>,
    soft_stop_override: Option<bool>,
) -> Result<CliOutput, CliError> {
    let env = RelayEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    let config_path_str = config_path.map(|path| path.to_string_lossy().into_owned());
    let mut config = load_relay_config_from_sources(config_path_str.as_deref(), format, &env)?;

    if let Some(soft_stop) = soft_stop_override {
        let mut raw = config.as_ref().clone();
        raw.exporter.soft_stop = soft_stop;
        config = raw.validate_and_normalize().map_err(ErrorEnvelope::from)?;
    }

    let queue = build_queue(&config.queue)?;
    let logger = build_logger(&config.logging, &queue);
    let telemetry = build_telemetry();
    let exporter = build_exporter(&config.exporter, queue, logger.clone(), telemetry)?;

    let ctx = RequestContext::new_request();
    let stop_scope = ctx.scope();
    let signal_wait = tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        stop_scope.cancel();
    });

    logger.info(
        "cli.run.started",
        "exporter loop started, waiting for Ctrl-C or cancellation",
        None,
    );
    run_exporter_until_cancelled(&exporter, &ctx).await;
    signal_wait.abort();
    logger.info("cli.run.stopped", "exporter loop stopped", None);

    let stdout = if mode.is_ndjson() {
        format_summary_ndjson()?
    } else if mode.is_json() {
        format_summary_json()?
    } else {
        "status: ok\nexporter: stopped\n".to_string()
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn format_summary_json() -> Result<String, CliError> {
    let payload = serde_json::json!({ "status": "ok", "exporter": "stopped" });
    let mut output = serde_json::to_string_pretty(&payload)?;
    output.push('\n');
    Ok(output)
}

fn format_summary_ndjson() -> Result<String, CliError> {
    let payload = serde_json::json!({ "type": "summary", "status": "ok", "kind": "run", "exporter": "stopped" });
    let mut output = serde_json::to_string(&payload)?;
    output.push('\n');
    Ok(output)
}
