#![forbid(unsafe_code)]

//! Runtime side of restform: turns CRUD requests against catalog resources
//! into HTTP exchanges and maps the answers back onto instance state.
//!
//! Per call: [`planner`] resolves an [`OperationPlan`], [`executor`] performs
//! the exchange (retries, async polling), [`reconciler`] produces the new
//! [`InstanceState`]. [`Engine`] wires the three together.
//!
//! Calls for different instances may run concurrently. Callers must not issue
//! two overlapping calls for the same instance; the engine does not serialize
//! them.

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod loader;
pub mod planner;
pub mod reconciler;
pub mod retry;
pub mod sanitize;
pub mod secrets;

pub use crate::config::{PollSettings, ProviderConfig, ResourceOverride, RetrySettings};
pub use crate::engine::{Engine, EngineBuilder};
pub use crate::error::EngineError;
pub use crate::executor::{CallContext, CancelHandle};
pub use crate::loader::SpecSource;
pub use crate::planner::{OperationPlan, Planner};
pub use crate::reconciler::{InstanceList, InstanceState, Outcome};
pub use crate::sanitize::PlanView;
