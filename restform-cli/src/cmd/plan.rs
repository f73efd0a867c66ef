use restform_core::OperationKind;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{ConfigArgs, OutputArgs, StateArgs};

pub async fn plan_cmd(
    spec: &str,
    resource: &str,
    operation: OperationKind,
    config: ConfigArgs,
    state: StateArgs,
    output: OutputArgs,
) -> i32 {
    let state = match super::config::load_state(&state, &output) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let engine = match super::config::build_engine(spec, &config, &output).await {
        Ok(e) => e,
        Err(code) => return code,
    };

    let view = match engine.plan_view(resource, operation, &state) {
        Ok(v) => v,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return super::config::engine_error_code(&e);
        }
    };

    if output.format == OutputFormat::Text && !output.quiet {
        println!("{} {}", view.method, view.url);
        for (k, v) in &view.headers {
            println!("{k}: {v}");
        }
        if let Some(body) = &view.body {
            println!();
            println!("{}", serde_json::to_string_pretty(body).unwrap_or_default());
        }
        if view.asynchronous {
            println!();
            println!("(asynchronous: completion is polled)");
        }
    } else {
        print_result(output.format, output.quiet, &view);
    }
    exit_codes::SUCCESS
}
