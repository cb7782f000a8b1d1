//! Per-node runtime contract
//!
//! A participating node does not manage its own credentials or database
//! access. The hosting runtime hands the worker a live, already authenticated
//! connection handle together with two metadata records: where the OMOP data
//! lives on this node, and which run this invocation belongs to. Everything
//! in this module is supplied from outside and is immutable for the duration
//! of one worker invocation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Live database connection handle supplied by the hosting runtime.
///
/// The handle is opaque to this crate. Only the analytic backend knows how to
/// drive it; the worker merely threads it through the backend calls, one step
/// at a time. A connection is exclusively owned by a single worker invocation
/// and is never shared across threads.
pub trait Connection: Send {
    /// DBMS flavor of the underlying connection, for log output only.
    fn dbms(&self) -> &str;
}

/// Database locations and export directory of one participating node.
///
/// Mirrors the OMOP metadata record provisioned by the node runtime: the
/// schema holding the common-data-model tables, the writable results schema
/// for generated cohort tables, and the directory diagnostics exports are
/// written to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OmopMetadata {
    /// Schema containing the CDM (patient data and vocabulary) tables
    pub cdm_schema: String,
    /// Writable schema for generated cohort tables
    pub results_schema: String,
    /// Base directory for diagnostics output files
    pub export_folder: PathBuf,
}

impl OmopMetadata {
    /// Directory the diagnostics routine writes its export files into.
    pub fn exports_dir(&self) -> PathBuf {
        self.export_folder.join("exports")
    }
}

/// Identity of one worker invocation.
///
/// Supplied by the hosting runtime and used solely to derive identifiers that
/// are unique across the whole distributed run. Task identifiers must not be
/// reused; two tasks with the same id on the same node would collide in the
/// results schema.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunMetadata {
    /// Identifier of the node this invocation runs on
    pub node_id: u64,
    /// Identifier of the distributed task this invocation belongs to
    pub task_id: u64,
}
