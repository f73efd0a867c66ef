use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use restform_core::OperationKind;
use serde_json::Value as JsonValue;
use tokio::time::Instant;

use crate::config::{PollSettings, ProviderConfig};
use crate::error::EngineError;
use crate::planner::OperationPlan;
use crate::retry::{decide_retry, RetryConfig, RetryDecision};
use crate::sanitize::{redact_headers, redact_url};

pub mod http;

mod context;
mod poll;

pub use context::{CallContext, CancelHandle};
pub(crate) use context::Interrupted;
pub(crate) use poll::{async_state, AsyncState, PollResult};

use http::{HttpClient, HttpRequestParts, HttpResponseParts};

/// Longest remote error text carried into an [`EngineError`].
const MAX_MESSAGE_CHARS: usize = 512;

/// A classified 2xx (or instance 404) answer with its body parsed.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Option<JsonValue>,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        crate::retry::header(&self.headers, name)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Performs planned exchanges: bounded retries on transient failures and
/// "retry later" statuses, then classification of the final answer.
pub struct Executor {
    client: Arc<dyn HttpClient>,
    retry: RetryConfig,
    request_timeout: Duration,
    max_response_bytes: usize,
    poll: PollSettings,
}

impl Executor {
    pub fn new(client: Arc<dyn HttpClient>, config: &ProviderConfig) -> Self {
        Self {
            client,
            retry: config.retry.to_retry_config(),
            request_timeout: config.request_timeout(),
            max_response_bytes: config.max_response_bytes,
            poll: config.poll.clone(),
        }
    }

    /// Sends `plan` and classifies the answer. A 404 on an instance
    /// operation comes back as a [`Response`] so the caller can treat the
    /// instance as gone.
    pub async fn execute(&self, plan: &OperationPlan, ctx: &CallContext) -> Result<Response, EngineError> {
        let resp = self.exchange(plan, ctx).await?;
        self.classify(plan, resp)
    }

    async fn exchange(&self, plan: &OperationPlan, ctx: &CallContext) -> Result<HttpResponseParts, EngineError> {
        let started = Instant::now();
        let req = HttpRequestParts {
            method: plan.method.clone(),
            url: plan.url.clone(),
            headers: plan.headers.clone(),
            body: plan.body_bytes(),
        };

        let mut attempt = 1usize;
        loop {
            if let Err(why) = ctx.check() {
                return Err(self.interrupted(plan, why, started, None));
            }
            tracing::debug!(
                resource = %plan.resource,
                operation = %plan.operation,
                method = %plan.method,
                url = %redact_url(&plan.url, &plan.secret_query),
                headers = ?redact_headers(&plan.headers, &plan.secret_headers),
                attempt,
                "sending request"
            );

            let sent = self
                .client
                .send(req.clone(), self.request_timeout, self.max_response_bytes)
                .await;
            let delay = match sent {
                Ok(resp) => {
                    tracing::debug!(
                        resource = %plan.resource,
                        operation = %plan.operation,
                        status = resp.status,
                        bytes = resp.body.len(),
                        "response received"
                    );
                    if resp.is_success() {
                        return Ok(resp);
                    }
                    match decide_retry(
                        &self.retry,
                        attempt,
                        Some(resp.status),
                        Some(&resp.headers),
                        false,
                        SystemTime::now(),
                        || fastrand::u64(..),
                    ) {
                        RetryDecision::RetryAfter { delay, reason } => {
                            tracing::warn!(
                                resource = %plan.resource,
                                operation = %plan.operation,
                                status = resp.status,
                                ?reason,
                                delay_ms = delay.as_millis() as u64,
                                attempt,
                                "remote asked to retry later"
                            );
                            delay
                        }
                        RetryDecision::Stop { .. } => return Ok(resp),
                    }
                }
                Err(err) => {
                    let decision = if err.is_transient() {
                        decide_retry(
                            &self.retry,
                            attempt,
                            None,
                            None,
                            true,
                            SystemTime::now(),
                            || fastrand::u64(..),
                        )
                    } else {
                        RetryDecision::Stop {
                            reason: crate::retry::RetryReason::NotRetryable,
                        }
                    };
                    match decision {
                        RetryDecision::RetryAfter { delay, .. } => {
                            tracing::warn!(
                                resource = %plan.resource,
                                operation = %plan.operation,
                                error = %err,
                                delay_ms = delay.as_millis() as u64,
                                attempt,
                                "transport failure, retrying"
                            );
                            delay
                        }
                        RetryDecision::Stop { .. } => {
                            return Err(EngineError::Transport {
                                resource: plan.resource.clone(),
                                operation: plan.operation,
                                attempts: attempt,
                                source: err,
                            });
                        }
                    }
                }
            };

            if let Err(why) = ctx.pause(delay).await {
                return Err(self.interrupted(plan, why, started, None));
            }
            attempt += 1;
        }
    }

    fn classify(&self, plan: &OperationPlan, resp: HttpResponseParts) -> Result<Response, EngineError> {
        if resp.is_success() || (resp.status == 404 && plan.operation.targets_instance()) {
            let body = if resp.is_success() {
                self.parse_body(plan, &resp.body)?
            } else {
                None
            };
            return Ok(Response {
                status: resp.status,
                headers: resp.headers,
                body,
            });
        }

        let message = error_message(&resp.body);
        let resource = plan.resource.clone();
        let operation = plan.operation;
        let status = resp.status;
        if (400..500).contains(&status) && !self.retry.retry_statuses.contains(&status) {
            Err(EngineError::RemoteRejected {
                resource,
                operation,
                status,
                message,
            })
        } else {
            Err(EngineError::RemoteFailure {
                resource,
                operation,
                status,
                message,
            })
        }
    }

    fn parse_body(&self, plan: &OperationPlan, body: &[u8]) -> Result<Option<JsonValue>, EngineError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        match serde_json::from_slice(body) {
            Ok(v) => Ok(Some(v)),
            // Delete answers carry nothing the engine needs.
            Err(e) if plan.operation == OperationKind::Delete => {
                tracing::debug!(resource = %plan.resource, error = %e, "ignoring non-JSON delete response");
                Ok(None)
            }
            Err(e) => Err(EngineError::InvalidResponse {
                resource: plan.resource.clone(),
                operation: plan.operation,
                message: format!("body is not valid JSON: {e}"),
            }),
        }
    }

    fn interrupted(
        &self,
        plan: &OperationPlan,
        why: Interrupted,
        started: Instant,
        last_status: Option<String>,
    ) -> EngineError {
        tracing::warn!(
            resource = %plan.resource,
            operation = %plan.operation,
            reason = ?why,
            "call interrupted"
        );
        EngineError::OperationTimeout {
            resource: plan.resource.clone(),
            operation: plan.operation,
            waited: started.elapsed(),
            last_status,
        }
    }
}

/// Human-readable error text: a `message`/`error`/`detail` property of a
/// JSON body, else the body itself, truncated.
fn error_message(body: &[u8]) -> String {
    if let Ok(JsonValue::Object(obj)) = serde_json::from_slice::<JsonValue>(body) {
        for key in ["message", "error", "detail", "title"] {
            match obj.get(key) {
                Some(JsonValue::String(s)) if !s.is_empty() => return truncate(s),
                Some(JsonValue::Object(inner)) => {
                    if let Some(JsonValue::String(s)) = inner.get("message") {
                        return truncate(s);
                    }
                }
                _ => {}
            }
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        "empty response body".to_string()
    } else {
        truncate(text)
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_MESSAGE_CHARS {
        return s.to_string();
    }
    let mut out: String = s.chars().take(MAX_MESSAGE_CHARS).collect();
    out.push('…');
    out
}
