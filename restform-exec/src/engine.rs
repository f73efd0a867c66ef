use std::sync::Arc;

use restform_core::{
    Catalog, CatalogEntry, CatalogHandle, MapOptions, OperationKind, ResourceSchema, SpecDocument,
    UnsupportedSchema,
};
use serde_json::Value as JsonValue;

use crate::config::ProviderConfig;
use crate::error::EngineError;
use crate::executor::http::{HttpClient, ReqwestHttpClient};
use crate::executor::{async_state, AsyncState, CallContext, Executor, PollResult, Response};
use crate::loader::SpecSource;
use crate::planner::{Credentials, OperationPlan, Planner, PollTarget};
use crate::reconciler::{list_elements, InstanceList, InstanceState, Outcome, Reconciler};
use crate::sanitize::PlanView;
use crate::secrets::{CompositeProvider, SecretValue, SecretsProvider};

/// Assembles an [`Engine`]: configuration, HTTP transport, and where
/// credentials are resolved from.
pub struct EngineBuilder {
    config: ProviderConfig,
    http: Option<Arc<dyn HttpClient>>,
    secrets: Option<Arc<dyn SecretsProvider>>,
}

impl EngineBuilder {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            http: None,
            secrets: None,
        }
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http = Some(client);
        self
    }

    pub fn secrets_provider(mut self, provider: Arc<dyn SecretsProvider>) -> Self {
        self.secrets = Some(provider);
        self
    }

    /// Loads the description, builds the catalog, and resolves credentials.
    /// Any failure leaves no engine behind.
    pub async fn build(self, source: &SpecSource) -> Result<Engine, EngineError> {
        let doc = source.load().await?;
        self.build_document(&doc).await
    }

    pub async fn build_document(self, doc: &SpecDocument) -> Result<Engine, EngineError> {
        self.config.validate()?;
        let catalog = Catalog::build(
            doc,
            MapOptions {
                strict: self.config.strict_schemas,
            },
        )?;

        let secrets = match self.secrets {
            Some(s) => s,
            None => {
                let dir = self.config.secrets_dir.clone().unwrap_or_else(|| ".".into());
                Arc::new(CompositeProvider::standard(dir))
            }
        };
        let credentials = resolve_credentials(&self.config, secrets.as_ref()).await?;

        let http: Arc<dyn HttpClient> = match self.http {
            Some(h) => h,
            None => Arc::new(ReqwestHttpClient::new().map_err(|e| EngineError::config(e.to_string()))?),
        };

        tracing::info!(
            resources = catalog.len(),
            warnings = catalog.warnings().len(),
            credentials = credentials.len(),
            "engine ready"
        );
        Ok(Engine {
            executor: Executor::new(http, &self.config),
            catalog: CatalogHandle::new(catalog),
            config: self.config,
            credentials,
        })
    }
}

async fn resolve_credentials(
    config: &ProviderConfig,
    secrets: &dyn SecretsProvider,
) -> Result<Credentials, EngineError> {
    let mut out = Credentials::new();
    for (scheme, credential) in &config.credentials {
        let value = match credential.secret_ref() {
            Some(r) => secrets
                .get(&r)
                .await
                .map_err(|e| EngineError::config(format!("credential '{scheme}': {e}")))?,
            None => SecretValue::from_string(credential.literal().to_string()),
        };
        out.insert(scheme.clone(), value);
    }
    Ok(out)
}

/// Executes CRUD operations against catalog resources.
///
/// Each call reads the catalog once at its start, so a concurrent
/// [`Engine::reload`] never changes the schema under an in-flight call.
pub struct Engine {
    catalog: CatalogHandle,
    config: ProviderConfig,
    credentials: Credentials,
    executor: Executor,
}

impl Engine {
    pub fn builder(config: ProviderConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.snapshot()
    }

    /// Resource schemas sorted by name.
    pub fn resources(&self) -> Vec<ResourceSchema> {
        self.catalog
            .snapshot()
            .schemas()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn resource(&self, name: &str) -> Option<CatalogEntry> {
        self.catalog.snapshot().get(name).cloned()
    }

    pub fn warnings(&self) -> Vec<UnsupportedSchema> {
        self.catalog.snapshot().warnings().to_vec()
    }

    /// Rebuilds the catalog from `source` and swaps it in. On error the
    /// current catalog stays in place.
    pub async fn reload(&self, source: &SpecSource) -> Result<(), EngineError> {
        let doc = source.load().await?;
        let catalog = Catalog::build(
            &doc,
            MapOptions {
                strict: self.config.strict_schemas,
            },
        )?;
        let resources = catalog.len();
        self.catalog.replace(catalog);
        tracing::info!(resources, source = %source, "catalog reloaded");
        Ok(())
    }

    /// The exchange `operation` would perform, without performing it.
    pub fn plan(
        &self,
        resource: &str,
        operation: OperationKind,
        state: &InstanceState,
    ) -> Result<OperationPlan, EngineError> {
        let catalog = self.catalog.snapshot();
        self.planner(&catalog).plan(resource, operation, state)
    }

    /// [`Engine::plan`] with credentials and sensitive fields redacted.
    pub fn plan_view(
        &self,
        resource: &str,
        operation: OperationKind,
        state: &InstanceState,
    ) -> Result<PlanView, EngineError> {
        let catalog = self.catalog.snapshot();
        let planner = self.planner(&catalog);
        let entry = planner.entry(resource)?;
        let plan = planner.plan(resource, operation, state)?;
        Ok(PlanView::new(&plan, &entry.schema.fields))
    }

    pub async fn create(
        &self,
        resource: &str,
        state: &InstanceState,
        ctx: &CallContext,
    ) -> Result<InstanceState, EngineError> {
        match self.run(resource, OperationKind::Create, state, ctx).await? {
            Outcome::Present(s) => Ok(s),
            Outcome::Gone => Err(EngineError::InvalidResponse {
                resource: resource.to_string(),
                operation: OperationKind::Create,
                message: "created instance was not found when its completion was observed".to_string(),
            }),
        }
    }

    /// [`Outcome::Gone`] when the remote reports the instance missing.
    pub async fn read(
        &self,
        resource: &str,
        state: &InstanceState,
        ctx: &CallContext,
    ) -> Result<Outcome, EngineError> {
        self.run(resource, OperationKind::Read, state, ctx).await
    }

    pub async fn update(
        &self,
        resource: &str,
        state: &InstanceState,
        ctx: &CallContext,
    ) -> Result<Outcome, EngineError> {
        self.run(resource, OperationKind::Update, state, ctx).await
    }

    /// Succeeds when the instance is gone, including when it already was.
    pub async fn delete(
        &self,
        resource: &str,
        state: &InstanceState,
        ctx: &CallContext,
    ) -> Result<(), EngineError> {
        self.run(resource, OperationKind::Delete, state, ctx).await.map(|_| ())
    }

    /// Instances from one list call. `filters` fills path and query
    /// parameters of the list endpoint.
    pub async fn list(
        &self,
        resource: &str,
        filters: &InstanceState,
        ctx: &CallContext,
    ) -> Result<InstanceList, EngineError> {
        let catalog = self.catalog.snapshot();
        let planner = self.planner(&catalog);
        let entry = planner.entry(resource)?;
        let plan = planner.plan(resource, OperationKind::List, filters)?;
        self.trace_plan(&plan, entry);

        let resp = self.executor.execute(&plan, ctx).await?;
        let items_key = entry
            .operation(OperationKind::List)
            .and_then(|ep| ep.list_items.as_deref());
        let elements = list_elements(resp.body, items_key).map_err(|message| EngineError::InvalidResponse {
            resource: resource.to_string(),
            operation: OperationKind::List,
            message,
        })?;

        let reconciler = Reconciler::new(entry, OperationKind::List);
        let items = elements
            .iter()
            .map(|item| reconciler.decode_item(item))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(resource, count = items.len(), "list complete");
        Ok(InstanceList::new(items))
    }

    fn planner<'a>(&'a self, catalog: &'a Catalog) -> Planner<'a> {
        Planner::new(catalog, &self.config, &self.credentials)
    }

    fn trace_plan(&self, plan: &OperationPlan, entry: &CatalogEntry) {
        if tracing::enabled!(tracing::Level::TRACE) {
            let view = PlanView::new(plan, &entry.schema.fields);
            tracing::trace!(plan = ?view, "planned exchange");
        }
    }

    async fn run(
        &self,
        resource: &str,
        operation: OperationKind,
        state: &InstanceState,
        ctx: &CallContext,
    ) -> Result<Outcome, EngineError> {
        let catalog = self.catalog.snapshot();
        let planner = self.planner(&catalog);
        let entry = planner.entry(resource)?;
        let plan = planner.plan(resource, operation, state)?;
        self.trace_plan(&plan, entry);
        let reconciler = Reconciler::new(entry, operation);

        let resp = self.executor.execute(&plan, ctx).await?;
        if resp.is_not_found() {
            tracing::info!(resource, %operation, "instance no longer exists");
            return Ok(Outcome::Gone);
        }

        let Some(policy) = plan.asynchronous.as_ref() else {
            return self.settle(&reconciler, operation, state, resp.body.as_ref());
        };
        match async_state(policy, resp.status, resp.body.as_ref()) {
            AsyncState::Done => return self.settle(&reconciler, operation, state, resp.body.as_ref()),
            AsyncState::Failed(status) => {
                return Err(EngineError::AsyncFailed {
                    resource: resource.to_string(),
                    operation,
                    status,
                })
            }
            AsyncState::Pending(_) => {}
        }

        let mut values = self
            .settle(&reconciler, operation, state, resp.body.as_ref())?
            .into_state()
            .unwrap_or_default();
        let poll_values = poll_values(&values, &resp);
        let (poll_plan, target) = planner.plan_poll(&plan, policy, resp.header("location"), &poll_values)?;
        tracing::info!(resource, %operation, "waiting for asynchronous completion");

        let until_gone = operation == OperationKind::Delete && target == PollTarget::ReadEndpoint;
        match self.executor.poll(&poll_plan, policy, until_gone, ctx).await? {
            PollResult::Gone => Ok(Outcome::Gone),
            PollResult::Done(_) if operation == OperationKind::Delete => Ok(Outcome::Gone),
            PollResult::Done(body) => {
                if target == PollTarget::ReadEndpoint {
                    values = reconciler.merge(&values, body.as_ref())?;
                } else if entry.supports(OperationKind::Read) {
                    // Status endpoints describe the operation, not the instance.
                    let read_plan = planner.plan(resource, OperationKind::Read, &values)?;
                    let read = self.executor.execute(&read_plan, ctx).await?;
                    if read.is_not_found() {
                        return Ok(Outcome::Gone);
                    }
                    values = reconciler.merge(&values, read.body.as_ref())?;
                }
                Ok(Outcome::Present(values))
            }
        }
    }

    /// New state from a final response. Delete answers are not decoded.
    fn settle(
        &self,
        reconciler: &Reconciler<'_>,
        operation: OperationKind,
        state: &InstanceState,
        body: Option<&JsonValue>,
    ) -> Result<Outcome, EngineError> {
        if operation == OperationKind::Delete {
            return Ok(Outcome::Present(state.clone()));
        }
        reconciler.merge(state, body).map(Outcome::Present)
    }
}

/// Values for poll path placeholders: reconciled state plus the raw
/// top-level properties of the initial response (operation ids and the like
/// are rarely part of the resource schema).
fn poll_values(state: &InstanceState, resp: &Response) -> InstanceState {
    let mut values = state.clone();
    if let Some(JsonValue::Object(raw)) = &resp.body {
        for (k, v) in raw {
            values.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
    values
}
