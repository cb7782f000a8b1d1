//! CohortDx - federated cohort diagnostics over OMOP CDM data networks
//!
//! CohortDx is a federated-analytics algorithm plugin. A central orchestrator
//! fans a single cohort-diagnostics task out to the participating organizations
//! of a collaboration; each participating node runs the analytic routine
//! against its local OMOP database and returns one aggregated tabular result.
//! Patient-level data never leaves a node.
//!
//! # Architecture
//!
//! - **Central orchestrator**: resolves the participant set, dispatches one
//!   distributed task, blocks on a single result barrier
//! - **Participant worker**: derives collision-free cohort identifiers,
//!   drives the analytic backend, returns a serialized incidence-rate frame
//! - **External seams**: the coordination service, the per-node runtime and
//!   the OHDSI-style analytic library are consumed through traits only
//! - **Shipped mocks**: every seam has a mock implementation for testing

pub mod central;
pub mod client;
pub mod cohort;
pub mod config;
pub mod export;
pub mod node;
pub mod ohdsi;
pub mod protocol;
pub mod runtime;

// Re-export commonly used types
pub use central::{Central, CentralError, ErrorReport, OrganizationSelection};
pub use node::cohort_diagnostics;
pub use protocol::{DiagnosticsRequest, DIAGNOSTICS_METHOD};

/// Result type used throughout CohortDx
pub type Result<T> = anyhow::Result<T>;
