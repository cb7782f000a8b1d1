//! Analytic library contract
//!
//! The actual clinical computations are performed by an external OHDSI-style
//! library. CohortDx treats that library as a black box and consumes exactly
//! five capabilities: table-name derivation, cohort table creation, cohort
//! set generation, temporal-covariate-settings construction and diagnostics
//! execution. The `CohortAnalytics` trait is the uniform interface for all
//! of them; the worker is agnostic to the concrete backend, which allows a
//! mock backend in tests and different database bindings in deployments.
//!
//! Query generation is a separate, pure capability (`CohortQueryBuilder`)
//! because it has no database side effects and its errors are meaningfully
//! typed rather than opaque.

pub mod mock;

use crate::cohort::CohortRecord;
use crate::config::{DiagnosticsSettings, TemporalCovariateSettings};
use crate::runtime::Connection;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Common-data-model version the diagnostics run against, fixed by contract.
pub const CDM_VERSION: u32 = 5;

/// Physical table names backing one cohort table namespace.
///
/// The analytic library's generator keeps statistics in sibling tables next
/// to the main cohort table. The conventional derivation below matches the
/// library's naming function; backends with a diverging convention override
/// `CohortAnalytics::cohort_table_names`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortTableNames {
    pub cohort_table: String,
    pub cohort_inclusion_table: String,
    pub cohort_inclusion_result_table: String,
    pub cohort_inclusion_stats_table: String,
    pub cohort_summary_stats_table: String,
    pub cohort_censor_stats_table: String,
}

impl CohortTableNames {
    /// Derive the full table set from a base namespace key.
    pub fn from_base(base: &str) -> Self {
        Self {
            cohort_table: base.to_string(),
            cohort_inclusion_table: format!("{base}_inclusion"),
            cohort_inclusion_result_table: format!("{base}_inclusion_result"),
            cohort_inclusion_stats_table: format!("{base}_inclusion_stats"),
            cohort_summary_stats_table: format!("{base}_summary_stats"),
            cohort_censor_stats_table: format!("{base}_censor_stats"),
        }
    }

    /// All physical table names, main table first.
    pub fn all(&self) -> [&str; 6] {
        [
            &self.cohort_table,
            &self.cohort_inclusion_table,
            &self.cohort_inclusion_result_table,
            &self.cohort_inclusion_stats_table,
            &self.cohort_summary_stats_table,
            &self.cohort_censor_stats_table,
        ]
    }
}

/// Temporal covariate settings in the analytic library's constructed form.
///
/// Opaque to this crate; produced by the backend from the caller's named
/// options and handed back to the backend at diagnostics time.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalCovariates(pub Value);

/// Everything the diagnostics execution call needs.
///
/// Assembled by the worker from run metadata, node metadata and the caller's
/// settings. The database id and display name both derive from the task
/// identifier, so diagnostics exports from different tasks never claim the
/// same source database.
#[derive(Debug)]
pub struct DiagnosticsRun<'a> {
    pub definition_set: &'a [CohortRecord],
    pub export_folder: PathBuf,
    pub database_id: u64,
    pub database_name: String,
    pub database_description: String,
    pub cohort_database_schema: &'a str,
    pub cdm_database_schema: &'a str,
    pub vocabulary_database_schema: &'a str,
    pub cohort_table: &'a str,
    pub cohort_table_names: &'a CohortTableNames,
    pub cdm_version: u32,
    pub temporal_covariates: TemporalCovariates,
    pub settings: &'a DiagnosticsSettings,
}

/// Uniform interface to the analytic backend.
///
/// Backend failures are opaque to the worker and are not recovered locally;
/// they surface as the participant's failed outcome. Methods are called
/// strictly in sequence on a single thread, each one after the previous has
/// committed its effects through the shared connection.
pub trait CohortAnalytics: Send + Sync {
    /// Derive the physical table set for a cohort table namespace.
    fn cohort_table_names(&self, base: &str) -> CohortTableNames {
        CohortTableNames::from_base(base)
    }

    /// Create the cohort tables in the results schema.
    fn create_cohort_tables(
        &self,
        connection: &dyn Connection,
        cohort_database_schema: &str,
        table_names: &CohortTableNames,
    ) -> crate::Result<()>;

    /// Populate the cohort tables by generating the cohort set against the
    /// CDM schema.
    fn generate_cohort_set(
        &self,
        connection: &dyn Connection,
        cdm_database_schema: &str,
        cohort_database_schema: &str,
        table_names: &CohortTableNames,
        definition_set: &[CohortRecord],
    ) -> crate::Result<()>;

    /// Expand a bundle of named options into the library's temporal
    /// covariate settings construct. Pure configuration translation.
    fn temporal_covariate_settings(
        &self,
        options: &TemporalCovariateSettings,
    ) -> crate::Result<TemporalCovariates>;

    /// Run the diagnostics, producing export files under
    /// `run.export_folder`, including the incidence-rate export.
    fn execute_diagnostics(
        &self,
        connection: &dyn Connection,
        run: &DiagnosticsRun<'_>,
    ) -> crate::Result<()>;
}

/// Cohort definition parsed into the query builder's expression form, opaque
/// to this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortExpression(pub Value);

/// Options applied when generating cohort queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationOptions {
    pub generate_stats: bool,
}

/// Failures of the pure query-generation path
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid cohort definition: {0}")]
    Parse(String),

    #[error("query generation returned no artifacts")]
    NoArtifacts,
}

/// Pure cohort-query generation, circe style.
///
/// Deterministic: the same definition always yields the same query text.
pub trait CohortQueryBuilder: Send + Sync {
    /// Parse a JSON cohort definition into the internal expression form.
    fn expression_from_json(&self, definition: &Value) -> Result<CohortExpression, QueryError>;

    /// Generate the ordered sequence of query artifacts for an expression.
    fn build_queries(
        &self,
        expression: &CohortExpression,
        options: &GenerationOptions,
    ) -> Result<Vec<String>, QueryError>;
}
