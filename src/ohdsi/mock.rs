//! Mock analytic backend for testing
//!
//! Simulates the OHDSI-style library without a database or an R runtime. The
//! mock records every backend call for verification, can be configured to
//! fail at any single stage, and writes a configurable incidence-rate export
//! when diagnostics execute, so the worker's readback path is exercised
//! end to end against a real filesystem.

use super::{
    CohortAnalytics, CohortExpression, CohortQueryBuilder, CohortTableNames, DiagnosticsRun,
    GenerationOptions, QueryError, TemporalCovariates,
};
use crate::cohort::CohortRecord;
use crate::config::TemporalCovariateSettings;
use crate::export::INCIDENCE_RATE_EXPORT;
use crate::runtime::Connection;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Backend stages a test can make fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CreateTables,
    GenerateSet,
    TemporalSettings,
    ExecuteDiagnostics,
}

/// Record of one backend call for testing verification
#[derive(Debug, Clone)]
pub enum AnalyticsCall {
    CreateTables {
        schema: String,
        cohort_table: String,
    },
    GenerateSet {
        cdm_schema: String,
        results_schema: String,
        cohorts: usize,
    },
    TemporalSettings {
        options: usize,
    },
    ExecuteDiagnostics {
        database_id: u64,
        database_name: String,
        export_folder: PathBuf,
        cohort_table: String,
        cdm_version: u32,
    },
}

const DEFAULT_INCIDENCE_CSV: &str = "\
cohort_id,gender,age_group,person_years,incidence_rate
120034000,Female,50-54,1523,0.041
120034001,Male,50-54,1289,0.037
";

/// Mock analytic backend
#[derive(Clone)]
pub struct MockAnalytics {
    calls: Arc<Mutex<Vec<AnalyticsCall>>>,
    fail_at: Arc<Mutex<Option<Stage>>>,
    incidence_csv: Arc<Mutex<String>>,
    skip_export: Arc<Mutex<bool>>,
}

impl MockAnalytics {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_at: Arc::new(Mutex::new(None)),
            incidence_csv: Arc::new(Mutex::new(DEFAULT_INCIDENCE_CSV.to_string())),
            skip_export: Arc::new(Mutex::new(false)),
        }
    }

    /// Fail the given stage with an injected error.
    pub fn set_fail_at(&self, stage: Stage) {
        *self.fail_at.lock().unwrap() = Some(stage);
    }

    /// Replace the incidence-rate CSV written by `execute_diagnostics`.
    pub fn set_incidence_csv(&self, csv: &str) {
        *self.incidence_csv.lock().unwrap() = csv.to_string();
    }

    /// Make `execute_diagnostics` succeed without writing the export file.
    pub fn set_skip_export(&self, skip: bool) {
        *self.skip_export.lock().unwrap() = skip;
    }

    /// Get a copy of all recorded calls for verification
    pub fn calls(&self) -> Vec<AnalyticsCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn check(&self, stage: Stage) -> crate::Result<()> {
        if *self.fail_at.lock().unwrap() == Some(stage) {
            anyhow::bail!("injected {stage:?} failure");
        }
        Ok(())
    }
}

impl Default for MockAnalytics {
    fn default() -> Self {
        Self::new()
    }
}

impl CohortAnalytics for MockAnalytics {
    fn create_cohort_tables(
        &self,
        _connection: &dyn Connection,
        cohort_database_schema: &str,
        table_names: &CohortTableNames,
    ) -> crate::Result<()> {
        self.check(Stage::CreateTables)?;
        self.calls.lock().unwrap().push(AnalyticsCall::CreateTables {
            schema: cohort_database_schema.to_string(),
            cohort_table: table_names.cohort_table.clone(),
        });
        Ok(())
    }

    fn generate_cohort_set(
        &self,
        _connection: &dyn Connection,
        cdm_database_schema: &str,
        cohort_database_schema: &str,
        _table_names: &CohortTableNames,
        definition_set: &[CohortRecord],
    ) -> crate::Result<()> {
        self.check(Stage::GenerateSet)?;
        self.calls.lock().unwrap().push(AnalyticsCall::GenerateSet {
            cdm_schema: cdm_database_schema.to_string(),
            results_schema: cohort_database_schema.to_string(),
            cohorts: definition_set.len(),
        });
        Ok(())
    }

    fn temporal_covariate_settings(
        &self,
        options: &TemporalCovariateSettings,
    ) -> crate::Result<TemporalCovariates> {
        self.check(Stage::TemporalSettings)?;
        self.calls.lock().unwrap().push(AnalyticsCall::TemporalSettings {
            options: options.len(),
        });
        Ok(TemporalCovariates(Value::Object(options.as_object().clone())))
    }

    fn execute_diagnostics(
        &self,
        _connection: &dyn Connection,
        run: &DiagnosticsRun<'_>,
    ) -> crate::Result<()> {
        self.check(Stage::ExecuteDiagnostics)?;
        self.calls
            .lock()
            .unwrap()
            .push(AnalyticsCall::ExecuteDiagnostics {
                database_id: run.database_id,
                database_name: run.database_name.clone(),
                export_folder: run.export_folder.clone(),
                cohort_table: run.cohort_table.to_string(),
                cdm_version: run.cdm_version,
            });

        if !*self.skip_export.lock().unwrap() {
            fs::create_dir_all(&run.export_folder)?;
            fs::write(
                run.export_folder.join(INCIDENCE_RATE_EXPORT),
                self.incidence_csv.lock().unwrap().as_bytes(),
            )?;
        }
        Ok(())
    }
}

/// Mock query builder.
///
/// Accepts any JSON object as a definition and renders a deterministic query
/// from it. Returns two artifacts so tests can verify that only the first
/// one is kept.
pub struct MockQueryBuilder;

impl CohortQueryBuilder for MockQueryBuilder {
    fn expression_from_json(&self, definition: &Value) -> Result<CohortExpression, QueryError> {
        if !definition.is_object() {
            return Err(QueryError::Parse(
                "cohort definition must be a JSON object".to_string(),
            ));
        }
        Ok(CohortExpression(definition.clone()))
    }

    fn build_queries(
        &self,
        expression: &CohortExpression,
        options: &GenerationOptions,
    ) -> Result<Vec<String>, QueryError> {
        let body = serde_json::to_string(&expression.0)
            .map_err(|e| QueryError::Parse(e.to_string()))?;
        Ok(vec![
            format!(
                "INSERT INTO @target_cohort_table /* stats = {} */ -- {}",
                options.generate_stats, body
            ),
            "DELETE FROM @target_cohort_table".to_string(),
        ])
    }
}

/// Connection stand-in for tests; the mock backend never touches it.
pub struct MockConnection;

impl Connection for MockConnection {
    fn dbms(&self) -> &str {
        "postgresql"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mock_builder_is_deterministic() {
        let builder = MockQueryBuilder;
        let definition = json!({"ConceptSets": [], "PrimaryCriteria": {}});

        let first = builder
            .build_queries(
                &builder.expression_from_json(&definition).unwrap(),
                &GenerationOptions { generate_stats: true },
            )
            .unwrap();
        let second = builder
            .build_queries(
                &builder.expression_from_json(&definition).unwrap(),
                &GenerationOptions { generate_stats: true },
            )
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_mock_builder_rejects_non_objects() {
        let builder = MockQueryBuilder;
        let err = builder.expression_from_json(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, QueryError::Parse(_)));
    }

    #[test]
    fn test_mock_backend_failure_injection() {
        let backend = MockAnalytics::new();
        backend.set_fail_at(Stage::GenerateSet);

        let names = CohortTableNames::from_base("cohort_1_1");
        backend
            .create_cohort_tables(&MockConnection, "results", &names)
            .unwrap();
        let err = backend
            .generate_cohort_set(&MockConnection, "cdm", "results", &names, &[])
            .unwrap_err();
        assert!(err.to_string().contains("GenerateSet"));
        assert_eq!(backend.call_count(), 1);
    }
}
