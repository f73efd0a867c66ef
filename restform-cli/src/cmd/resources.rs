use restform_core::{CatalogEntry, FieldKind, FieldSchema};
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{ConfigArgs, OutputArgs};

#[derive(Serialize)]
struct ResourcesResult<'a> {
    resources: Vec<&'a CatalogEntry>,
}

pub async fn resources_cmd(
    spec: &str,
    resource: Option<&str>,
    config: ConfigArgs,
    output: OutputArgs,
) -> i32 {
    let catalog = match super::config::load_catalog(spec, config.strict, &output).await {
        Ok(c) => c,
        Err(code) => return code,
    };

    let entries: Vec<&CatalogEntry> = match resource {
        Some(name) => match catalog.get(name) {
            Some(e) => vec![e],
            None => {
                print_error(
                    output.format,
                    output.quiet,
                    &format!("unknown resource '{name}' (known: {})", catalog.names().join(", ")),
                );
                return exit_codes::VALIDATION_FAILED;
            }
        },
        None => catalog
            .names()
            .into_iter()
            .filter_map(|n| catalog.get(n))
            .collect(),
    };

    if output.format == OutputFormat::Text && !output.quiet {
        for entry in &entries {
            print_entry(entry, resource.is_some());
        }
    } else {
        print_result(output.format, output.quiet, &ResourcesResult { resources: entries });
    }
    exit_codes::SUCCESS
}

fn print_entry(entry: &CatalogEntry, detailed: bool) {
    if !detailed {
        let kinds: Vec<&str> = entry.operations.keys().map(|k| k.as_str()).collect();
        println!("{} [{}]", entry.name(), kinds.join(", "));
        return;
    }
    println!("{}", entry.name());
    for (kind, ep) in &entry.operations {
        println!("  {kind}: {} {}", ep.method, ep.path);
    }
    for field in &entry.schema.fields {
        print_field(field, 1);
    }
}

fn print_field(field: &FieldSchema, depth: usize) {
    let mut flags = Vec::new();
    if field.required {
        flags.push("required");
    }
    if field.computed {
        flags.push("computed");
    }
    if field.immutable {
        flags.push("immutable");
    }
    if field.sensitive {
        flags.push("sensitive");
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!(" ({})", flags.join(", "))
    };
    println!(
        "{}- {}: {}{}",
        "  ".repeat(depth),
        field.name,
        field.kind.type_name(),
        flags
    );
    if let FieldKind::Object { fields } = &field.kind {
        for f in fields {
            print_field(f, depth + 1);
        }
    }
}
