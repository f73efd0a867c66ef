use restform_core::AsyncPolicy;
use serde_json::Value as JsonValue;
use tokio::time::Instant;

use super::{CallContext, Executor};
use crate::error::EngineError;
use crate::planner::OperationPlan;

/// Where an asynchronous operation stands after one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AsyncState {
    Done,
    Pending(Option<String>),
    Failed(String),
}

/// How a poll loop ended without error.
#[derive(Debug)]
pub(crate) enum PollResult {
    /// A target status was observed; carries the last poll body.
    Done(Option<JsonValue>),
    /// The polled endpoint answered 404.
    Gone,
}

/// Classifies one response of an asynchronous operation.
///
/// Without a status value a 202 is still pending and anything else is done.
/// Values in none of the configured lists are treated as pending.
pub(crate) fn async_state(policy: &AsyncPolicy, http_status: u16, body: Option<&JsonValue>) -> AsyncState {
    match body.and_then(|b| status_value(b, &policy.status_field)) {
        Some(s) if policy.is_failed(&s) => AsyncState::Failed(s),
        Some(s) if policy.is_target(&s) => AsyncState::Done,
        Some(s) => {
            if !policy.is_pending(&s) {
                tracing::warn!(status = %s, field = %policy.status_field, "unrecognized status value, still waiting");
            }
            AsyncState::Pending(Some(s))
        }
        None if http_status == 202 => AsyncState::Pending(None),
        None => AsyncState::Done,
    }
}

/// Status property of `body`: a JSON pointer when `field` starts with `/`,
/// otherwise a dotted path.
fn status_value(body: &JsonValue, field: &str) -> Option<String> {
    let v = if field.starts_with('/') {
        body.pointer(field)?
    } else {
        field.split('.').try_fold(body, |v, key| v.get(key))?
    };
    match v {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Executor {
    /// Polls `plan` until `policy` reports a terminal status, the endpoint
    /// answers 404, or the call runs out of time.
    ///
    /// With `until_gone` only a 404 (or a failed status) ends the loop; used
    /// when a delete is observed through the instance read endpoint.
    pub(crate) async fn poll(
        &self,
        plan: &OperationPlan,
        policy: &AsyncPolicy,
        until_gone: bool,
        ctx: &CallContext,
    ) -> Result<PollResult, EngineError> {
        let started = Instant::now();
        let timeout = policy.timeout.unwrap_or_else(|| self.poll.timeout());
        let ctx = ctx.clone().with_timeout(timeout);
        let interval = self.poll.interval();
        let mut last_status: Option<String> = None;
        let mut polls = 0usize;

        loop {
            if let Err(why) = ctx.pause(interval).await {
                return Err(self.interrupted(plan, why, started, last_status));
            }
            polls += 1;

            let resp = self.exchange(plan, &ctx).await.map_err(|e| match e {
                EngineError::OperationTimeout { resource, operation, .. } => EngineError::OperationTimeout {
                    resource,
                    operation,
                    waited: started.elapsed(),
                    last_status: last_status.clone(),
                },
                other => other,
            })?;
            if resp.status == 404 {
                tracing::debug!(resource = %plan.resource, polls, "polled endpoint reports not found");
                return Ok(PollResult::Gone);
            }
            let resp = self.classify(plan, resp)?;

            match async_state(policy, resp.status, resp.body.as_ref()) {
                AsyncState::Failed(status) => {
                    return Err(EngineError::AsyncFailed {
                        resource: plan.resource.clone(),
                        operation: plan.operation,
                        status,
                    });
                }
                AsyncState::Done if !until_gone => {
                    tracing::debug!(resource = %plan.resource, operation = %plan.operation, polls, "asynchronous operation complete");
                    return Ok(PollResult::Done(resp.body));
                }
                AsyncState::Done => {}
                AsyncState::Pending(status) => {
                    tracing::debug!(
                        resource = %plan.resource,
                        operation = %plan.operation,
                        status = status.as_deref().unwrap_or("-"),
                        polls,
                        "still pending"
                    );
                    if status.is_some() {
                        last_status = status;
                    }
                }
            }
        }
    }
}
