use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::OutputArgs;

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    resources: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

pub async fn validate_cmd(spec: &str, strict: bool, output: OutputArgs) -> i32 {
    let catalog = match super::config::load_catalog(spec, strict, &output).await {
        Ok(c) => c,
        Err(code) => return code,
    };

    let result = ValidateResult {
        valid: true,
        resources: catalog.names().into_iter().map(String::from).collect(),
        warnings: catalog.warnings().iter().map(|w| w.to_string()).collect(),
    };

    if output.format == OutputFormat::Text && !output.quiet {
        println!(
            "ok: {} resource(s) in {}",
            result.resources.len(),
            catalog.source()
        );
        for w in &result.warnings {
            eprintln!("warning: {w}");
        }
    } else {
        print_result(output.format, output.quiet, &result);
    }
    exit_codes::SUCCESS
}
