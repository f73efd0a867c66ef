use std::path::PathBuf;

use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ConfigArgs {
    /// Provider configuration file (YAML or JSON).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Overrides the configured base URL.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,
    /// Fail when any property has to be dropped as unsupported.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Args, Clone)]
pub struct StateArgs {
    /// Instance state file (YAML or JSON object).
    #[arg(long, value_name = "PATH")]
    pub state: Option<PathBuf>,
    /// Sets one state field; values are parsed as JSON when possible.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub set: Vec<String>,
}
