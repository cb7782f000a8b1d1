//! Mock coordination client for testing
//!
//! Simulates the coordination service without any transport. The mock tracks
//! every created task for verification and can be configured to fail each of
//! the three service calls independently, making orchestrator failure paths
//! easy to exercise in tests.

use super::{ClientError, CoordinationClient, Organization, OrgId, PartialResult, TaskInput, TaskRef};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Record of a created task for testing verification
#[derive(Debug, Clone)]
pub struct CreatedTask {
    pub id: u64,
    pub input: TaskInput,
    pub organizations: Vec<OrgId>,
}

/// Mock coordination client
///
/// By default the mock knows no organizations and returns an empty result
/// list; configure it per test with `with_organizations` and `set_results`.
#[derive(Clone)]
pub struct MockClient {
    organizations: Arc<Mutex<Vec<Organization>>>,
    results: Arc<Mutex<Vec<PartialResult>>>,
    created: Arc<Mutex<Vec<CreatedTask>>>,
    next_task_id: Arc<Mutex<u64>>,
    fail_list: Arc<Mutex<Option<String>>>,
    fail_create: Arc<Mutex<Option<String>>>,
    fail_wait: Arc<Mutex<Option<String>>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            organizations: Arc::new(Mutex::new(Vec::new())),
            results: Arc::new(Mutex::new(Vec::new())),
            created: Arc::new(Mutex::new(Vec::new())),
            next_task_id: Arc::new(Mutex::new(1)),
            fail_list: Arc::new(Mutex::new(None)),
            fail_create: Arc::new(Mutex::new(None)),
            fail_wait: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a mock that knows the given organization ids.
    pub fn with_organizations(ids: &[OrgId]) -> Self {
        let client = Self::new();
        *client.organizations.lock().unwrap() =
            ids.iter().map(|&id| Organization { id }).collect();
        client
    }

    /// Set the results the barrier wait will return.
    pub fn set_results(&self, results: Vec<PartialResult>) {
        *self.results.lock().unwrap() = results;
    }

    /// Make `list_organizations` fail with the given message.
    pub fn set_unreachable(&self, message: &str) {
        *self.fail_list.lock().unwrap() = Some(message.to_string());
    }

    /// Make `create_task` fail with the given message.
    pub fn set_create_failure(&self, message: &str) {
        *self.fail_create.lock().unwrap() = Some(message.to_string());
    }

    /// Make `wait_for_results` fail with the given message.
    pub fn set_wait_failure(&self, message: &str) {
        *self.fail_wait.lock().unwrap() = Some(message.to_string());
    }

    /// Get a copy of all created tasks for verification
    pub fn created_tasks(&self) -> Vec<CreatedTask> {
        self.created.lock().unwrap().clone()
    }

    /// Number of tasks created so far
    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationClient for MockClient {
    async fn list_organizations(&self) -> Result<Vec<Organization>, ClientError> {
        if let Some(message) = self.fail_list.lock().unwrap().clone() {
            return Err(ClientError::Unreachable(message));
        }
        Ok(self.organizations.lock().unwrap().clone())
    }

    async fn create_task(
        &self,
        input: TaskInput,
        organizations: &[OrgId],
    ) -> Result<TaskRef, ClientError> {
        if let Some(message) = self.fail_create.lock().unwrap().clone() {
            return Err(ClientError::CreateTask(message));
        }

        let mut next = self.next_task_id.lock().unwrap();
        let id = *next;
        *next += 1;

        self.created.lock().unwrap().push(CreatedTask {
            id,
            input,
            organizations: organizations.to_vec(),
        });

        Ok(TaskRef { id })
    }

    async fn wait_for_results(&self, _task_id: u64) -> Result<Vec<PartialResult>, ClientError> {
        if let Some(message) = self.fail_wait.lock().unwrap().clone() {
            return Err(ClientError::WaitForResults(message));
        }
        Ok(self.results.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_client_records_tasks() {
        let client = MockClient::with_organizations(&[1, 2, 3]);
        let orgs = client.list_organizations().await.unwrap();
        assert_eq!(orgs.len(), 3);

        let input = TaskInput::new("cohort_diagnostics", &json!({"x": 1})).unwrap();
        let task = client.create_task(input.clone(), &[1, 3]).await.unwrap();
        assert_eq!(task.id, 1);

        let created = client.created_tasks();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].input, input);
        assert_eq!(created[0].organizations, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_mock_client_failure_injection() {
        let client = MockClient::with_organizations(&[1]);
        client.set_wait_failure("server outage");

        let err = client.wait_for_results(1).await.unwrap_err();
        assert!(matches!(err, ClientError::WaitForResults(ref m) if m == "server outage"));
    }

    #[tokio::test]
    async fn test_mock_client_task_ids_increment() {
        let client = MockClient::with_organizations(&[1]);
        let input = TaskInput::new("m", &json!({})).unwrap();
        let first = client.create_task(input.clone(), &[1]).await.unwrap();
        let second = client.create_task(input, &[1]).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }
}
