use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value as JsonValue;

use crate::error::LoadError;
use crate::types::SecurityScheme;

mod refs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Yaml,
}

/// A parsed, reference-resolved OpenAPI document.
///
/// Every local `$ref` under `paths` has been replaced by its target. Recursive
/// references are left in place as a bare `{"$ref": ...}` at the point where
/// the cycle closes.
#[derive(Debug, Clone)]
pub struct SpecDocument {
    /// Original location (URL or file path) or `<inline>`.
    pub source: String,
    pub format: SpecFormat,
    pub openapi_version: String,
    tree: JsonValue,
}

impl SpecDocument {
    pub fn paths(&self) -> &serde_json::Map<String, JsonValue> {
        // presence checked during parsing
        static EMPTY: std::sync::LazyLock<serde_json::Map<String, JsonValue>> =
            std::sync::LazyLock::new(serde_json::Map::new);
        self.tree
            .get("paths")
            .and_then(|p| p.as_object())
            .unwrap_or(&EMPTY)
    }

    pub fn tree(&self) -> &JsonValue {
        &self.tree
    }

    /// First document-level server URL with its variables substituted by
    /// their defaults.
    pub fn default_server(&self) -> Option<String> {
        first_server_url(&self.tree)
    }

    /// Global security requirement: scheme names of the first alternative.
    pub fn global_security(&self) -> Vec<String> {
        security_names(self.tree.get("security")).unwrap_or_default()
    }

    pub fn security_schemes(&self) -> BTreeMap<String, SecurityScheme> {
        let mut out = BTreeMap::new();
        let Some(schemes) = self
            .tree
            .pointer("/components/securitySchemes")
            .and_then(|v| v.as_object())
        else {
            return out;
        };
        for (name, scheme) in schemes {
            if let Some(s) = parse_security_scheme(scheme) {
                out.insert(name.clone(), s);
            } else {
                tracing::debug!(scheme = %name, "ignoring unsupported security scheme");
            }
        }
        out
    }
}

pub fn read_spec_file(path: &Path) -> Result<SpecDocument, LoadError> {
    let body = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        location: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_spec_str(&body, &path.display().to_string())
}

pub fn parse_spec_str(body: &str, source: &str) -> Result<SpecDocument, LoadError> {
    let (raw, format) = parse_tree(body)?;

    let root = raw
        .as_object()
        .ok_or_else(|| LoadError::malformed("document root must be a mapping"))?;
    let openapi_version = match root.get("openapi") {
        Some(JsonValue::String(v)) => v.clone(),
        Some(JsonValue::Number(n)) => n.to_string(),
        Some(_) => return Err(LoadError::malformed("`openapi` must be a version string")),
        None => return Err(LoadError::malformed("missing `openapi` version field")),
    };
    if !openapi_version.starts_with("3.") {
        return Err(LoadError::malformed(format!(
            "unsupported OpenAPI version {openapi_version} (expected 3.x)"
        )));
    }
    match root.get("paths") {
        Some(JsonValue::Object(_)) => {}
        Some(_) => return Err(LoadError::malformed("`paths` must be a mapping")),
        None => return Err(LoadError::malformed("missing `paths`")),
    }

    let tree = refs::resolve_document(&raw)?;
    Ok(SpecDocument {
        source: source.to_string(),
        format,
        openapi_version,
        tree,
    })
}

fn parse_tree(body: &str) -> Result<(JsonValue, SpecFormat), LoadError> {
    // JSON always starts with `{` after trimming; everything else goes through YAML.
    let trimmed = body.trim_start();
    if trimmed.starts_with('{') {
        if let Ok(v) = serde_json::from_str::<JsonValue>(body) {
            return Ok((v, SpecFormat::Json));
        }
    }
    if trimmed.is_empty() {
        return Err(LoadError::malformed("document is empty"));
    }
    let y = serde_yaml::from_str::<serde_yaml::Value>(body)
        .map_err(|e| LoadError::malformed(format!("failed to parse as YAML: {e}")))?;
    let v = serde_json::to_value(y)
        .map_err(|e| LoadError::malformed(format!("document is not JSON-compatible: {e}")))?;
    Ok((v, SpecFormat::Yaml))
}

pub(crate) fn first_server_url(node: &JsonValue) -> Option<String> {
    let server = node.get("servers")?.as_array()?.first()?.as_object()?;
    let mut url = server.get("url")?.as_str()?.to_string();
    if let Some(vars) = server.get("variables").and_then(|v| v.as_object()) {
        for (name, var) in vars {
            if let Some(default) = var.get("default").and_then(|d| d.as_str()) {
                url = url.replace(&format!("{{{name}}}"), default);
            }
        }
    }
    Some(url)
}

/// Scheme names of the first requirement object; `Some(vec![])` means an
/// explicit opt-out (`security: []`).
pub(crate) fn security_names(node: Option<&JsonValue>) -> Option<Vec<String>> {
    let reqs = node?.as_array()?;
    let Some(first) = reqs.first() else {
        return Some(Vec::new());
    };
    Some(
        first
            .as_object()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default(),
    )
}

fn parse_security_scheme(scheme: &JsonValue) -> Option<SecurityScheme> {
    match scheme.get("type")?.as_str()? {
        "apiKey" => {
            let name = scheme.get("name")?.as_str()?.to_string();
            match scheme.get("in")?.as_str()? {
                "header" => Some(SecurityScheme::ApiKeyHeader { name }),
                "query" => Some(SecurityScheme::ApiKeyQuery { name }),
                _ => None,
            }
        }
        "http" => match scheme.get("scheme")?.as_str()?.to_ascii_lowercase().as_str() {
            "bearer" => Some(SecurityScheme::Bearer),
            "basic" => Some(SecurityScheme::Basic),
            _ => None,
        },
        "oauth2" | "openIdConnect" => Some(SecurityScheme::Bearer),
        _ => None,
    }
}
