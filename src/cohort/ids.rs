//! Cohort identifier derivation
//!
//! Every cohort a worker creates needs an identifier that is unique across
//! the whole distributed run, without any cross-node coordination. The
//! scheme concatenates, as decimal digits, the node id, the task id padded
//! to four digits and the definition index padded to three digits:
//!
//! ```text
//! node 12, task 34, index 1  ->  12 0034 001  ->  120034001
//! ```
//!
//! Two items can only collide if a task id exceeds four digits or a task
//! carries more than a thousand definitions, which is why the worker
//! enforces [`MAX_TASK_ID`] and [`MAX_COHORT_DEFINITIONS`] before deriving
//! anything. Within those bounds the derivation is injective and its digit
//! layout can be decomposed back into the original components.
//!
//! Identifiers are exposed as `f64` because that is the numeric type the
//! analytic library uses for cohort ids in its definition-set format.

use crate::runtime::RunMetadata;

/// Largest task id that fits the four-digit slot of the layout
pub const MAX_TASK_ID: u64 = 9_999;

/// Largest definition batch that fits the three-digit index slot
pub const MAX_COHORT_DEFINITIONS: usize = 1_000;

const TASK_SPAN: u64 = MAX_TASK_ID + 1;
const INDEX_SPAN: u64 = MAX_COHORT_DEFINITIONS as u64;

/// Derive the cluster-wide-unique cohort identifier for one definition.
///
/// Pure function of (node id, task id, index). Callers must hold the
/// documented bounds; they are debug-asserted here and validated with typed
/// errors at the worker entry point.
pub fn derive_cohort_id(node_id: u64, task_id: u64, index: usize) -> f64 {
    debug_assert!(task_id <= MAX_TASK_ID, "task id out of range: {task_id}");
    debug_assert!(
        index < MAX_COHORT_DEFINITIONS,
        "definition index out of range: {index}"
    );
    ((node_id * TASK_SPAN + task_id) * INDEX_SPAN + index as u64) as f64
}

/// Recover (node id, task id, index) from a derived identifier.
pub fn decompose_cohort_id(cohort_id: f64) -> (u64, u64, u64) {
    let value = cohort_id as u64;
    let index = value % INDEX_SPAN;
    let task_id = (value / INDEX_SPAN) % TASK_SPAN;
    let node_id = value / (INDEX_SPAN * TASK_SPAN);
    (node_id, task_id, index)
}

/// Namespace key for this run's cohort tables: `cohort_<task>_<node>`.
///
/// The {task, node} qualification keeps concurrent runs on the same node, and
/// the same task on different nodes, in disjoint table sets without locking.
pub fn cohort_table_name(run: &RunMetadata) -> String {
    format!("cohort_{}_{}", run.task_id, run.node_id)
}
