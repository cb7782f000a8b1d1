//! Coordination service interface
//!
//! The central orchestrator never talks to participating nodes directly. It
//! goes through a coordination service that knows the collaboration's
//! organizations, creates distributed tasks addressed to a subset of them,
//! and hands back the collected results once every targeted participant has
//! a terminal outcome. Identity, encryption and message transport all live
//! behind this seam; this crate only consumes the three capabilities below.
//!
//! Timeout and retry policy belong to the service. `wait_for_results` is a
//! single barrier: it resolves only when all targeted participants have
//! succeeded or failed, and the orchestrator adds no policy of its own on
//! top of it.

pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Organization identifier as assigned by the coordination service
pub type OrgId = u64;

/// One organization known to the collaboration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Organization {
    pub id: OrgId,
}

/// Input of a distributed task: the method to invoke on every targeted
/// participant and its keyword arguments.
///
/// The kwargs are carried as an opaque JSON object. The orchestrator encodes
/// a typed request into this form once and never reshapes it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskInput {
    pub method: String,
    pub kwargs: Value,
}

impl TaskInput {
    /// Encode a serializable kwargs record under the given method name.
    pub fn new<K: Serialize>(method: &str, kwargs: &K) -> Result<Self, serde_json::Error> {
        Ok(Self {
            method: method.to_string(),
            kwargs: serde_json::to_value(kwargs)?,
        })
    }
}

/// Handle of a created distributed task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRef {
    pub id: u64,
}

/// One participant's result, opaque to the orchestrator.
///
/// Workers return serialized tabular artifacts; the orchestrator aggregates
/// them into an ordered collection without inspecting their structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PartialResult(pub Value);

/// Transport and service failures, propagated verbatim to the caller
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("coordination service unreachable: {0}")]
    Unreachable(String),

    #[error("task creation failed: {0}")]
    CreateTask(String),

    #[error("waiting for results failed: {0}")]
    WaitForResults(String),
}

/// Client of the coordination service.
///
/// Implementations wrap whatever transport the deployment uses. All methods
/// map one-to-one onto service calls; none of them retries.
#[async_trait]
pub trait CoordinationClient: Send + Sync {
    /// List every organization in the collaboration, in service order.
    async fn list_organizations(&self) -> Result<Vec<Organization>, ClientError>;

    /// Create one distributed task addressed to the given organizations.
    async fn create_task(
        &self,
        input: TaskInput,
        organizations: &[OrgId],
    ) -> Result<TaskRef, ClientError>;

    /// Block until every targeted participant of the task has a terminal
    /// outcome, then return the collected results in service order.
    async fn wait_for_results(&self, task_id: u64) -> Result<Vec<PartialResult>, ClientError>;
}
