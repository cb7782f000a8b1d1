//! Central orchestrator
//!
//! Runs on a single organization's node and coordinates one diagnostics round:
//! discover the collaboration's organizations, validate the caller's inclusion
//! selector, broadcast exactly one task, block until every targeted node has
//! reported, and hand the per-node results back unmodified. The orchestrator
//! never aggregates; interpretation of the partial results is left to the
//! caller.

use crate::client::{ClientError, CoordinationClient, OrgId, PartialResult};
use crate::protocol::DiagnosticsRequest;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::info;

/// Which organizations a diagnostics round targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizationSelection {
    /// Every organization in the collaboration
    All,
    /// Only the listed organizations, which must all belong to the
    /// collaboration
    Include(Vec<OrgId>),
}

/// Orchestration failures
#[derive(Debug, Error)]
pub enum CentralError {
    #[error("You specified an organization that is not part of the collaboration")]
    UnknownOrganization,

    #[error("failed to encode task input: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Structured error payload reported to the caller in place of results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorReport {
    pub msg: String,
}

impl CentralError {
    /// Render this error as the structured payload callers receive.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            msg: self.to_string(),
        }
    }
}

/// One-shot orchestrator for a diagnostics round
pub struct Central<C: CoordinationClient> {
    client: C,
}

impl<C: CoordinationClient> Central<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Run one diagnostics round and return the per-node results.
    ///
    /// The inclusion selector is validated against the collaboration before
    /// any task is created; on a violation no node ever sees the request.
    /// Results are returned in the order the coordination service delivers
    /// them, without inspection.
    pub async fn run(
        self,
        request: &DiagnosticsRequest,
        selection: OrganizationSelection,
    ) -> Result<Vec<PartialResult>, CentralError> {
        info!("collecting participating organizations");
        let organizations = self.client.list_organizations().await?;
        let known: HashSet<OrgId> = organizations.iter().map(|org| org.id).collect();
        info!(count = known.len(), "organizations in collaboration");

        let targets: Vec<OrgId> = match selection {
            OrganizationSelection::All => organizations.iter().map(|org| org.id).collect(),
            OrganizationSelection::Include(ids) => {
                if ids.iter().any(|id| !known.contains(id)) {
                    return Err(CentralError::UnknownOrganization);
                }
                ids
            }
        };

        let input = request.to_task_input()?;
        info!(organizations = targets.len(), "dispatching diagnostics task");
        let task = self.client.create_task(input, &targets).await?;
        info!(task_id = task.id, "task created, waiting for node results");

        let results = self.client.wait_for_results(task.id).await?;
        info!(results = results.len(), "received all node results");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use crate::protocol::DIAGNOSTICS_METHOD;
    use serde_json::{json, Value};

    fn request() -> DiagnosticsRequest {
        DiagnosticsRequest {
            cohort_definitions: vec![json!({"ConceptSets": []})],
            cohort_names: vec!["test cohort".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_central_dispatches_one_task_to_all() {
        let client = MockClient::with_organizations(&[3, 7, 11]);
        client.set_results(vec![PartialResult(json!("a")), PartialResult(json!("b"))]);

        let results = Central::new(client.clone())
            .run(&request(), OrganizationSelection::All)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);

        let created = client.created_tasks();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].organizations, vec![3, 7, 11]);
        assert_eq!(created[0].input.method, DIAGNOSTICS_METHOD);
        let kwargs = created[0].input.kwargs.as_object().unwrap();
        assert_eq!(kwargs.len(), 4);
        for key in [
            "cohort_definitions",
            "cohort_names",
            "temporal_covariate_settings",
            "diagnostics_settings",
        ] {
            assert!(kwargs.contains_key(key), "missing kwarg {key}");
        }
    }

    #[tokio::test]
    async fn test_central_honors_valid_subset() {
        let client = MockClient::with_organizations(&[3, 7, 11]);
        client.set_results(vec![PartialResult(json!(null))]);

        Central::new(client.clone())
            .run(&request(), OrganizationSelection::Include(vec![11, 3]))
            .await
            .unwrap();

        let created = client.created_tasks();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].organizations, vec![11, 3]);
    }

    #[tokio::test]
    async fn test_central_rejects_unknown_organization() {
        let client = MockClient::with_organizations(&[3, 7]);

        let err = Central::new(client.clone())
            .run(&request(), OrganizationSelection::Include(vec![3, 99]))
            .await
            .unwrap_err();
        assert!(matches!(err, CentralError::UnknownOrganization));
        // No task may ever reach a node on a selector violation
        assert_eq!(client.created_count(), 0);

        assert_eq!(
            serde_json::to_value(err.report()).unwrap(),
            json!({"msg": "You specified an organization that is not part of the collaboration"})
        );
    }

    #[tokio::test]
    async fn test_central_propagates_service_failures() {
        let client = MockClient::with_organizations(&[3]);
        client.set_unreachable("connection refused");

        let err = Central::new(client)
            .run(&request(), OrganizationSelection::All)
            .await
            .unwrap_err();
        assert!(matches!(err, CentralError::Client(ClientError::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_central_propagates_create_task_failures() {
        let client = MockClient::with_organizations(&[3, 7]);
        client.set_create_failure("task quota exceeded");
        client.set_wait_failure("wait must never be reached");

        let err = Central::new(client.clone())
            .run(&request(), OrganizationSelection::All)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CentralError::Client(ClientError::CreateTask(ref m)) if m == "task quota exceeded"
        ));
        assert_eq!(client.created_count(), 0);
    }

    #[tokio::test]
    async fn test_central_propagates_wait_failures() {
        let client = MockClient::with_organizations(&[3]);
        client.set_wait_failure("collaboration went away");

        let err = Central::new(client)
            .run(&request(), OrganizationSelection::All)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CentralError::Client(ClientError::WaitForResults(_))
        ));
    }

    #[tokio::test]
    async fn test_central_preserves_result_order() {
        let client = MockClient::with_organizations(&[1, 2, 3]);
        let payloads = vec![
            PartialResult(json!({"node": 2})),
            PartialResult(json!({"node": 1})),
            PartialResult(json!({"node": 3})),
        ];
        client.set_results(payloads.clone());

        let results = Central::new(client)
            .run(&request(), OrganizationSelection::All)
            .await
            .unwrap();
        let got: Vec<Value> = results.into_iter().map(|r| r.0).collect();
        let want: Vec<Value> = payloads.into_iter().map(|r| r.0).collect();
        assert_eq!(got, want);
    }
}
