use std::time::Duration;

use restform_core::OperationKind;
use restform_exec::{CallContext, Outcome};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::exit_codes;
use crate::output::{print_error, print_result};
use crate::{ConfigArgs, OutputArgs, StateArgs};

#[derive(Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
enum InvokeResult {
    Present { state: JsonValue },
    Gone,
    Deleted,
    Listed { items: Vec<JsonValue> },
}

pub async fn invoke_cmd(
    spec: &str,
    resource: &str,
    operation: OperationKind,
    timeout: Option<u64>,
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

    let mut ctx = CallContext::new();
    if let Some(secs) = timeout {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }

    let result = match operation {
        OperationKind::Create => engine
            .create(resource, &state, &ctx)
            .await
            .map(|s| InvokeResult::Present {
                state: JsonValue::Object(s),
            }),
        OperationKind::Read => engine.read(resource, &state, &ctx).await.map(outcome),
        OperationKind::Update => engine.update(resource, &state, &ctx).await.map(outcome),
        OperationKind::Delete => engine
            .delete(resource, &state, &ctx)
            .await
            .map(|()| InvokeResult::Deleted),
        OperationKind::List => engine
            .list(resource, &state, &ctx)
            .await
            .map(|items| InvokeResult::Listed {
                items: items.map(JsonValue::Object).collect(),
            }),
    };

    match result {
        Ok(r) => {
            print_result(output.format, output.quiet, &r);
            exit_codes::SUCCESS
        }
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            super::config::engine_error_code(&e)
        }
    }
}

fn outcome(o: Outcome) -> InvokeResult {
    match o {
        Outcome::Present(s) => InvokeResult::Present {
            state: JsonValue::Object(s),
        },
        Outcome::Gone => InvokeResult::Gone,
    }
}
