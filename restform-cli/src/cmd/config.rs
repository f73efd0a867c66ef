use restform_core::{Catalog, LoadError, MapOptions};
use restform_exec::{Engine, EngineError, InstanceState, ProviderConfig, SpecSource};
use serde_json::Value as JsonValue;

use crate::exit_codes;
use crate::output::print_error;
use crate::{ConfigArgs, OutputArgs, StateArgs};

pub fn load_error_code(err: &LoadError) -> i32 {
    match err {
        LoadError::Io { .. } => exit_codes::RUNTIME_ERROR,
        _ => exit_codes::VALIDATION_FAILED,
    }
}

pub fn engine_error_code(err: &EngineError) -> i32 {
    match err {
        EngineError::Load(e) => load_error_code(e),
        EngineError::Config(_)
        | EngineError::UnknownResource { .. }
        | EngineError::UnsupportedOperation { .. }
        | EngineError::MissingIdentifier { .. } => exit_codes::VALIDATION_FAILED,
        _ => exit_codes::RUN_FAILED,
    }
}

pub async fn load_catalog(spec: &str, strict: bool, output: &OutputArgs) -> Result<Catalog, i32> {
    let doc = SpecSource::locate(spec).load().await.map_err(|e| {
        print_error(output.format, output.quiet, &e.to_string());
        load_error_code(&e)
    })?;
    Catalog::build(&doc, MapOptions { strict }).map_err(|e| {
        print_error(output.format, output.quiet, &e.to_string());
        load_error_code(&e)
    })
}

pub fn load_provider_config(args: &ConfigArgs, output: &OutputArgs) -> Result<ProviderConfig, i32> {
    let mut cfg = match &args.config {
        Some(path) => ProviderConfig::from_file(path).map_err(|e| {
            print_error(output.format, output.quiet, &e.to_string());
            exit_codes::VALIDATION_FAILED
        })?,
        None => ProviderConfig::default(),
    };
    if let Some(url) = &args.base_url {
        cfg.base_url = Some(url.clone());
    }
    cfg.strict_schemas |= args.strict;
    cfg.validate().map_err(|e| {
        print_error(output.format, output.quiet, &e.to_string());
        exit_codes::VALIDATION_FAILED
    })?;
    Ok(cfg)
}

pub async fn build_engine(spec: &str, config: &ConfigArgs, output: &OutputArgs) -> Result<Engine, i32> {
    let cfg = load_provider_config(config, output)?;
    Engine::builder(cfg)
        .build(&SpecSource::locate(spec))
        .await
        .map_err(|e| {
            print_error(output.format, output.quiet, &e.to_string());
            engine_error_code(&e)
        })
}

/// State from `--state` with `--set` assignments applied on top.
pub fn load_state(args: &StateArgs, output: &OutputArgs) -> Result<InstanceState, i32> {
    let mut state = match &args.state {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                print_error(
                    output.format,
                    output.quiet,
                    &format!("failed to read {}: {e}", path.display()),
                );
                exit_codes::RUNTIME_ERROR
            })?;
            parse_state(&content).map_err(|msg| {
                print_error(output.format, output.quiet, &msg);
                exit_codes::VALIDATION_FAILED
            })?
        }
        None => InstanceState::new(),
    };
    for assignment in &args.set {
        let Some((field, raw)) = assignment.split_once('=') else {
            print_error(
                output.format,
                output.quiet,
                &format!("--set expects FIELD=VALUE, got '{assignment}'"),
            );
            return Err(exit_codes::VALIDATION_FAILED);
        };
        let value = serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()));
        state.insert(field.trim().to_string(), value);
    }
    Ok(state)
}

fn parse_state(content: &str) -> Result<InstanceState, String> {
    let value: JsonValue = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(_) => serde_yaml::from_str(content)
            .map_err(|e| format!("state file is neither valid JSON nor YAML: {e}"))?,
    };
    match value {
        JsonValue::Object(m) => Ok(m),
        JsonValue::Null => Ok(InstanceState::new()),
        _ => Err("state file must contain an object".to_string()),
    }
}
