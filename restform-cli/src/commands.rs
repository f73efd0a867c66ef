use clap::Subcommand;
use restform_core::OperationKind;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Loads a description and reports the resources it yields.
    Validate {
        /// File path or http(s) URL of the OpenAPI description.
        spec: String,
        #[arg(long)]
        strict: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Lists resources, or shows one resource in detail.
    Resources {
        spec: String,
        resource: Option<String>,
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Shows the HTTP exchange an operation would perform, credentials redacted.
    Plan {
        spec: String,
        resource: String,
        /// create, read, update, delete, or list.
        operation: OperationKind,
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        state: StateArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Performs an operation against the remote API.
    Invoke {
        spec: String,
        resource: String,
        operation: OperationKind,
        /// Overall deadline in seconds, including asynchronous waits.
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        #[command(flatten)]
        config: ConfigArgs,
        #[command(flatten)]
        state: StateArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}
