use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "restform", version, about = "Inspect and exercise resources derived from an OpenAPI description")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

/// Logs go to stderr so that stdout stays machine-readable. Filter with
/// `RESTFORM_LOG` (e.g. `RESTFORM_LOG=restform_exec=debug`).
fn init_logging() {
    let filter = EnvFilter::try_from_env("RESTFORM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

async fn run_command(command: Command) -> i32 {
    tracing::debug!(?command, "running command");
    match command {
        Command::Validate {
            spec,
            strict,
            output,
        } => cmd::validate::validate_cmd(&spec, strict, output).await,
        Command::Resources {
            spec,
            resource,
            config,
            output,
        } => cmd::resources::resources_cmd(&spec, resource.as_deref(), config, output).await,
        Command::Plan {
            spec,
            resource,
            operation,
            config,
            state,
            output,
        } => cmd::plan::plan_cmd(&spec, &resource, operation, config, state, output).await,
        Command::Invoke {
            spec,
            resource,
            operation,
            timeout,
            config,
            state,
            output,
        } => {
            cmd::invoke::invoke_cmd(&spec, &resource, operation, timeout, config, state, output)
                .await
        }
    }
}
