//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Parser, Subcommand};
use commands::{run_enqueue, run_info, run_run};
use error::{CliError, ExitCode};
use format::{OutputArgs, OutputMode};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "otlp-relay",
    version,
    about = "Cancellable, durable-queue-backed OTLP/HTTP log relay",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the batching exporter loop until Ctrl-C (or the process is cancelled).
    Run {
        /// Config file path (JSON or TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Config file format, inferred from the file extension when omitted.
        #[arg(long)]
        format: Option<String>,
        /// Override the configured soft-stop behavior.
        #[arg(long)]
        soft_stop: Option<bool>,
    },
    /// Enqueue one JSON record from `--message` or stdin.
    Enqueue {
        /// Config file path (JSON or TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Config file format, inferred from the file extension when omitted.
        #[arg(long)]
        format: Option<String>,
        /// The record payload as a JSON object. Reads stdin when omitted.
        #[arg(long)]
        message: Option<String>,
    },
    /// Show build and version details.
    Info,
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);

    match run(&cli.command, mode).await {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

async fn run(command: &Commands, mode: OutputMode) -> Result<CliOutput, CliError> {
    match command {
        Commands::Run {
            config,
            format,
            soft_stop,
        } => run_run(mode, config.as_deref(), format.as_deref(), *soft_stop).await,
        Commands::Enqueue {
            config,
            format,
            message,
        } => run_enqueue(mode, config.as_deref(), format.as_deref(), message.as_deref()).await,
        Commands::Info => run_info(mode),
    }
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}
