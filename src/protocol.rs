//! Dispatched task contract
//!
//! One distributed task carries one method name and one keyword-argument
//! bundle, broadcast unchanged to every targeted participant. The method
//! name is fixed; the kwargs are the typed record below, encoded to JSON
//! exactly once by the orchestrator and decoded by the hosting runtime on
//! each node. No defaults are injected at this layer.

use crate::client::TaskInput;
use crate::config::{DiagnosticsSettings, TemporalCovariateSettings};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method identifier of the worker entry point
pub const DIAGNOSTICS_METHOD: &str = "cohort_diagnostics";

/// Shared parameters of one diagnostics run.
///
/// These are the exact kwargs each participant worker receives: the ATLAS
/// cohort definitions, their display names, and the two settings bundles
/// forwarded to the analytic library.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticsRequest {
    pub cohort_definitions: Vec<Value>,
    pub cohort_names: Vec<String>,
    #[serde(default)]
    pub temporal_covariate_settings: TemporalCovariateSettings,
    #[serde(default)]
    pub diagnostics_settings: DiagnosticsSettings,
}

impl DiagnosticsRequest {
    /// Encode this request as the input of a distributed task.
    pub fn to_task_input(&self) -> Result<TaskInput, serde_json::Error> {
        TaskInput::new(DIAGNOSTICS_METHOD, self)
    }
}
