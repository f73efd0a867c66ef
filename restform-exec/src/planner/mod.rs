//! Resolves a CRUD request into a concrete HTTP exchange. No I/O happens
//! here: credentials are resolved when the engine is built.

use std::collections::BTreeMap;

use restform_core::{
    template, AsyncPolicy, Catalog, CatalogEntry, EndpointTemplate, OperationKind, SecurityScheme,
};
use serde_json::Value as JsonValue;
use url::Url;

use crate::config::ProviderConfig;
use crate::error::EngineError;
use crate::reconciler::InstanceState;
use crate::secrets::SecretValue;

mod body;
mod target;

pub use target::base_url;

/// Resolved credentials keyed by security scheme name.
pub type Credentials = BTreeMap<String, SecretValue>;

/// One fully resolved HTTP exchange. Call-scoped; never stored.
#[derive(Debug, Clone)]
pub struct OperationPlan {
    pub resource: String,
    pub operation: OperationKind,
    pub method: String,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    /// Header names whose values came from credentials.
    pub secret_headers: Vec<String>,
    /// Query parameter names whose values came from credentials.
    pub secret_query: Vec<String>,
    pub body: Option<JsonValue>,
    pub asynchronous: Option<AsyncPolicy>,
}

impl OperationPlan {
    pub fn body_bytes(&self) -> Vec<u8> {
        match &self.body {
            // Serializing a `Value` cannot fail.
            Some(b) => serde_json::to_vec(b).unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

pub struct Planner<'a> {
    catalog: &'a Catalog,
    config: &'a ProviderConfig,
    credentials: &'a Credentials,
}

impl<'a> Planner<'a> {
    pub fn new(catalog: &'a Catalog, config: &'a ProviderConfig, credentials: &'a Credentials) -> Self {
        Self {
            catalog,
            config,
            credentials,
        }
    }

    pub fn entry(&self, resource: &str) -> Result<&'a CatalogEntry, EngineError> {
        self.catalog
            .get(resource)
            .ok_or_else(|| EngineError::UnknownResource {
                resource: resource.to_string(),
            })
    }

    pub fn plan(
        &self,
        resource: &str,
        operation: OperationKind,
        state: &InstanceState,
    ) -> Result<OperationPlan, EngineError> {
        let entry = self.entry(resource)?;
        let endpoint = entry
            .operation(operation)
            .ok_or_else(|| EngineError::UnsupportedOperation {
                resource: resource.to_string(),
                operation,
            })?;

        let path = self.resolve_path(entry, operation, &endpoint.path, state, operation.targets_instance())?;
        let url = self.join(entry, operation, &path)?;

        let body = match operation {
            OperationKind::Create | OperationKind::Update => {
                Some(body::encode(&entry.schema.fields, state, operation))
            }
            _ => None,
        };
        let mut plan = OperationPlan {
            resource: resource.to_string(),
            operation,
            method: endpoint.method.clone(),
            url,
            headers: BTreeMap::new(),
            secret_headers: Vec::new(),
            secret_query: Vec::new(),
            body,
            asynchronous: endpoint.asynchronous.clone(),
        };
        self.add_query(entry, endpoint, state, &mut plan);
        self.add_headers(&mut plan);
        self.apply_security(&endpoint.security, &mut plan)?;
        Ok(plan)
    }

    /// Plans the GET that observes completion of an asynchronous operation.
    ///
    /// Target order: the operation's poll path, the `Location` header of
    /// the initial response, the instance read endpoint.
    pub fn plan_poll(
        &self,
        initial: &OperationPlan,
        policy: &AsyncPolicy,
        location: Option<&str>,
        values: &InstanceState,
    ) -> Result<(OperationPlan, PollTarget), EngineError> {
        let entry = self.entry(&initial.resource)?;
        let operation = initial.operation;

        let (url, target) = if let Some(poll_path) = &policy.poll_path {
            let path = self.resolve_path(entry, operation, poll_path, values, false)?;
            (self.join(entry, operation, &path)?, PollTarget::StatusEndpoint)
        } else if let Some(location) = location {
            let url = initial.url.join(location).map_err(|e| EngineError::InvalidResponse {
                resource: initial.resource.clone(),
                operation,
                message: format!("invalid Location header '{location}': {e}"),
            })?;
            (url, PollTarget::StatusEndpoint)
        } else if let Some(read) = entry.operation(OperationKind::Read) {
            let path = self.resolve_path(entry, operation, &read.path, values, true)?;
            (self.join(entry, operation, &path)?, PollTarget::ReadEndpoint)
        } else {
            return Err(EngineError::InvalidResponse {
                resource: initial.resource.clone(),
                operation,
                message: "asynchronous operation has no poll path, Location header, or read endpoint"
                    .to_string(),
            });
        };

        let mut plan = OperationPlan {
            resource: initial.resource.clone(),
            operation,
            method: "GET".to_string(),
            url,
            headers: BTreeMap::new(),
            secret_headers: Vec::new(),
            secret_query: Vec::new(),
            body: None,
            asynchronous: None,
        };
        self.add_headers(&mut plan);
        // Same credentials as the operation being observed.
        let security = entry
            .operation(operation)
            .map(|ep| ep.security.clone())
            .unwrap_or_default();
        self.apply_security(&security, &mut plan)?;
        Ok((plan, target))
    }

    fn resolve_path(
        &self,
        entry: &CatalogEntry,
        operation: OperationKind,
        path: &str,
        state: &InstanceState,
        instance: bool,
    ) -> Result<String, EngineError> {
        let versioned = match self
            .config
            .resource(entry.name())
            .and_then(|o| o.api_version.as_deref())
        {
            Some(v) => template::with_version(path, v).unwrap_or_else(|| {
                tracing::debug!(resource = %entry.name(), path, "api_version override ignored: path has no version segment");
                path.to_string()
            }),
            None => path.to_string(),
        };

        let trailing = template::segments(path)
            .last()
            .and_then(template::segment_placeholder)
            .map(str::to_string);
        template::render(&versioned, |name| {
            let is_identifier = instance && trailing.as_deref() == Some(name);
            let value = if is_identifier {
                entry
                    .schema
                    .identifier
                    .as_deref()
                    .and_then(|id| state.get(id))
                    .filter(|v| !v.is_null())
                    .or_else(|| lookup(entry, state, name))
            } else {
                lookup(entry, state, name)
            };
            value.and_then(scalar).map(|v| urlencoding::encode(&v).into_owned())
        })
        .map_err(|parameter| EngineError::MissingIdentifier {
            resource: entry.name().to_string(),
            operation,
            parameter,
        })
    }

    fn join(&self, entry: &CatalogEntry, operation: OperationKind, path: &str) -> Result<Url, EngineError> {
        let base = base_url(entry, self.config, self.catalog.default_base_url())?;
        let raw = format!("{}{}", base.trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| {
            EngineError::config(format!(
                "{} {operation}: invalid request URL '{raw}': {e}",
                entry.name()
            ))
        })
    }

    fn add_query(
        &self,
        entry: &CatalogEntry,
        endpoint: &EndpointTemplate,
        state: &InstanceState,
        plan: &mut OperationPlan,
    ) {
        let pairs: Vec<(String, String)> = endpoint
            .query_params
            .iter()
            .filter_map(|q| Some((q.clone(), lookup(entry, state, q).and_then(scalar)?)))
            .collect();
        if !pairs.is_empty() {
            plan.url.query_pairs_mut().extend_pairs(pairs);
        }
    }

    fn add_headers(&self, plan: &mut OperationPlan) {
        plan.headers
            .insert("Accept".to_string(), "application/json".to_string());
        if plan.body.is_some() {
            plan.headers
                .insert("Content-Type".to_string(), "application/json".to_string());
        }
        for (k, v) in &self.config.headers {
            plan.headers.insert(k.clone(), v.clone());
        }
    }

    fn apply_security(&self, schemes: &[String], plan: &mut OperationPlan) -> Result<(), EngineError> {
        for name in schemes {
            let Some(scheme) = self.catalog.security_scheme(name) else {
                tracing::debug!(scheme = %name, "security scheme not declared or not supported");
                continue;
            };
            let Some(secret) = self.credentials.get(name) else {
                tracing::debug!(scheme = %name, resource = %plan.resource, "no credential configured");
                continue;
            };
            let value = secret.expose_str().ok_or_else(|| {
                EngineError::config(format!("credential for '{name}' is not valid UTF-8"))
            })?;
            match scheme {
                SecurityScheme::ApiKeyHeader { name: header } => {
                    plan.headers.insert(header.clone(), value.to_string());
                    plan.secret_headers.push(header.clone());
                }
                SecurityScheme::ApiKeyQuery { name: param } => {
                    if !self.config.allow_secrets_in_url {
                        return Err(EngineError::config(format!(
                            "security scheme '{name}' sends the key in the query string; set allow_secrets_in_url to permit it"
                        )));
                    }
                    plan.url.query_pairs_mut().append_pair(param, value);
                    plan.secret_query.push(param.clone());
                }
                SecurityScheme::Bearer => {
                    plan.headers
                        .insert("Authorization".to_string(), format!("Bearer {value}"));
                    plan.secret_headers.push("Authorization".to_string());
                }
                SecurityScheme::Basic => {
                    use base64::Engine as _;
                    let encoded = base64::engine::general_purpose::STANDARD.encode(value);
                    plan.headers
                        .insert("Authorization".to_string(), format!("Basic {encoded}"));
                    plan.secret_headers.push("Authorization".to_string());
                }
            }
        }
        Ok(())
    }
}

/// What a poll request observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTarget {
    /// A dedicated status/operation endpoint; the instance must be read
    /// again afterwards.
    StatusEndpoint,
    /// The instance itself.
    ReadEndpoint,
}

/// State value for a path/query parameter: the field whose wire name
/// matches, else a field or state key with that exact name.
fn lookup<'s>(entry: &CatalogEntry, state: &'s InstanceState, name: &str) -> Option<&'s JsonValue> {
    entry
        .schema
        .field_by_api_name(name)
        .and_then(|f| state.get(&f.name))
        .or_else(|| state.get(name))
        .filter(|v| !v.is_null())
}

fn scalar(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
