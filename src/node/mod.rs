//! Participant worker
//!
//! This module implements the routine the hosting runtime invokes on each
//! participating node when the orchestrator's task arrives. One invocation:
//! - validates the identifier bounds of the run,
//! - derives cluster-wide-unique cohort identifiers,
//! - builds the cohort definition set,
//! - creates and populates the node-scoped cohort tables,
//! - executes the diagnostics against the local OMOP database,
//! - reads back the incidence-rate export and returns it serialized.
//!
//! Execution is strictly sequential: every step depends on the previous one
//! having committed its effects through the connection. Failures are not
//! recovered here; they propagate to the hosting runtime, which reports them
//! as this participant's outcome. Other participants are unaffected.

use crate::cohort::{self, ids, CohortSetError};
use crate::export::{self, ExportError, SerializedFrame};
use crate::ohdsi::{CohortAnalytics, CohortQueryBuilder, DiagnosticsRun, CDM_VERSION};
use crate::protocol::DiagnosticsRequest;
use crate::runtime::{Connection, OmopMetadata, RunMetadata};
use thiserror::Error;
use tracing::info;

/// Worker invocation failures, surfaced to the hosting runtime
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("task id {0} exceeds the maximum of {max} supported by cohort identifier derivation", max = ids::MAX_TASK_ID)]
    TaskIdOutOfRange(u64),

    #[error("{0} cohort definitions exceed the per-task maximum of {max}", max = ids::MAX_COHORT_DEFINITIONS)]
    TooManyCohorts(usize),

    #[error(transparent)]
    CohortSet(#[from] CohortSetError),

    #[error("analytic backend failed: {0:#}")]
    Backend(#[from] anyhow::Error),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Run the cohort diagnostics on this node.
///
/// The connection, metadata and backend are supplied by the hosting runtime;
/// the request is the kwargs bundle the orchestrator broadcast. Returns the
/// serialized incidence-rate frame, the single value reported back through
/// the coordination service.
pub fn cohort_diagnostics(
    connection: &dyn Connection,
    backend: &dyn CohortAnalytics,
    query_builder: &dyn CohortQueryBuilder,
    omop: &OmopMetadata,
    run: &RunMetadata,
    request: &DiagnosticsRequest,
) -> Result<SerializedFrame, NodeError> {
    if run.task_id > ids::MAX_TASK_ID {
        return Err(NodeError::TaskIdOutOfRange(run.task_id));
    }
    if request.cohort_definitions.len() > ids::MAX_COHORT_DEFINITIONS {
        return Err(NodeError::TooManyCohorts(request.cohort_definitions.len()));
    }

    let definition_set = cohort::build_definition_set(
        run,
        &request.cohort_definitions,
        &request.cohort_names,
        query_builder,
    )?;
    let cohort_ids: Vec<f64> = definition_set.iter().map(|r| r.cohort_id).collect();
    info!(
        dbms = connection.dbms(),
        cohorts = definition_set.len(),
        ?cohort_ids,
        "generated cohort definition set"
    );

    let cohort_table = ids::cohort_table_name(run);
    let table_names = backend.cohort_table_names(&cohort_table);
    info!(%cohort_table, tables = ?table_names.all(), "derived cohort table names");

    info!(results_schema = %omop.results_schema, "creating cohort tables");
    backend.create_cohort_tables(connection, &omop.results_schema, &table_names)?;
    info!("created cohort tables");

    backend.generate_cohort_set(
        connection,
        &omop.cdm_schema,
        &omop.results_schema,
        &table_names,
        &definition_set,
    )?;
    info!("generated cohort set");

    let temporal_covariates =
        backend.temporal_covariate_settings(&request.temporal_covariate_settings)?;
    info!("created temporal covariate settings");

    let export_folder = omop.exports_dir();
    let database_name = format!("{:06}", run.task_id);
    let diagnostics = DiagnosticsRun {
        definition_set: &definition_set,
        export_folder: export_folder.clone(),
        database_id: run.task_id,
        database_name: database_name.clone(),
        database_description: database_name,
        cohort_database_schema: &omop.results_schema,
        cdm_database_schema: &omop.cdm_schema,
        vocabulary_database_schema: &omop.cdm_schema,
        cohort_table: &cohort_table,
        cohort_table_names: &table_names,
        cdm_version: CDM_VERSION,
        temporal_covariates,
        settings: &request.diagnostics_settings,
    };
    backend.execute_diagnostics(connection, &diagnostics)?;
    info!("executed diagnostics");

    let frame = export::read_incidence_rate(&export_folder)?;
    info!(rows = frame.row_count(), "read incidence rate export");

    Ok(frame.to_json()?)
}
