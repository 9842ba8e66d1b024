//! Info command handler.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use otlp_relay_adapters::adapters_crate_version;
use otlp_relay_app::app_crate_version;
use otlp_relay_config::config_crate_version;
use otlp_relay_core::{BuildInfo, build_info};
use otlp_relay_infra::infra_crate_version;

/// Run the info command.
pub fn run_info(mode: OutputMode) -> Result<CliOutput, CliError> {
    let build = build_info();

    let stdout = if mode.is_ndjson() {
        format_info_ndjson(&build)?
    } else if mode.is_json() {
        format_info_json(&build)?
    } else {
        format_info_text(&build)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn format_info_text(build: &BuildInfo) -> String {
    format!(
        "status: ok\nname: {}\nversion: {}\napp: {}\nadapters: {}\nconfig: {}\ninfra: {}\nrustc: {}\ntarget: {}\nprofile: {}\ngit: {}{}\n",
        build.name,
        build.version,
        app_crate_version(),
        adapters_crate_version(),
        config_crate_version(),
        infra_crate_version(),
        build.rustc_version,
        build.target,
        build.profile,
        build.git_hash.unwrap_or("none"),
        if build.git_dirty { " (dirty)" } else { "" }
    )
}

fn format_info_json(build: &BuildInfo) -> Result<String, CliError> {
    let payload = serde_json::json!({
        "status": "ok",
        "build": {
            "name": build.name,
            "version": build.version,
            "appVersion": app_crate_version(),
            "adaptersVersion": adapters_crate_version(),
            "configVersion": config_crate_version(),
            "infraVersion": infra_crate_version(),
            "rustcVersion": build.rustc_version,
            "target": build.target,
            "profile": build.profile,
            "gitHash": build.git_hash,
            "gitDirty": build.git_dirty,
        }
    });
    let mut output = serde_json::to_string_pretty(&payload)?;
    output.push('\n');
    Ok(output)
}

fn format_info_ndjson(build: &BuildInfo) -> Result<String, CliError> {
    let payload = serde_json::json!({
        "type": "summary",
        "status": "ok",
        "kind": "info",
        "build": {
            "name": build.name,
            "version": build.version,
            "appVersion": app_crate_version(),
            "adaptersVersion": adapters_crate_version(),
            "configVersion": config_crate_version(),
            "infraVersion": infra_crate_version(),
            "rustcVersion": build.rustc_version,
            "target": build.target,
            "profile": build.profile,
            "gitHash": build.git_hash,
            "gitDirty": build.git_dirty,
        }
    });
    let mut output = serde_json::to_string(&payload)?;
    output.push('\n');
    Ok(output)
}
