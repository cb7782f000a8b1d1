//! Cohort definition sets
//!
//! The worker turns the caller's cohort definitions into the record format
//! the analytic library's generator consumes: one record per definition,
//! pairing the derived identifier, the display name, the original JSON
//! payload and a generated query. Statistics collection is always enabled
//! for every record, and no per-record logic description is set.

pub mod ids;

use crate::ohdsi::{CohortQueryBuilder, GenerationOptions, QueryError};
use crate::runtime::RunMetadata;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One row of the cohort definition set, in the analytic library's column
/// naming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CohortRecord {
    pub cohort_id: f64,
    pub cohort_name: String,
    pub json: Value,
    pub sql: String,
    pub logic_description: Option<String>,
    pub generate_stats: bool,
}

/// Failures while building a definition set
#[derive(Debug, Error)]
pub enum CohortSetError {
    #[error("{definitions} cohort definitions paired with {names} cohort names")]
    NameCountMismatch { definitions: usize, names: usize },

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Generate the query for one cohort definition.
///
/// Parses the definition into the builder's expression form, generates with
/// statistics collection forced on, and keeps the first artifact of the
/// ordered sequence. The index-0 selection is a fixed policy, not an option.
/// Malformed definitions and empty artifact lists are errors; callers do not
/// suppress them.
pub fn create_cohort_query(
    builder: &dyn CohortQueryBuilder,
    definition: &Value,
) -> Result<String, QueryError> {
    let expression = builder.expression_from_json(definition)?;
    let options = GenerationOptions { generate_stats: true };
    let mut queries = builder.build_queries(&expression, &options)?;
    if queries.is_empty() {
        return Err(QueryError::NoArtifacts);
    }
    Ok(queries.swap_remove(0))
}

/// Build one record per definition, identifiers derived from the run
/// identity and the zero-based definition index.
pub fn build_definition_set(
    run: &RunMetadata,
    definitions: &[Value],
    names: &[String],
    builder: &dyn CohortQueryBuilder,
) -> Result<Vec<CohortRecord>, CohortSetError> {
    if definitions.len() != names.len() {
        return Err(CohortSetError::NameCountMismatch {
            definitions: definitions.len(),
            names: names.len(),
        });
    }

    definitions
        .iter()
        .zip(names)
        .enumerate()
        .map(|(index, (definition, name))| {
            let sql = create_cohort_query(builder, definition)?;
            Ok(CohortRecord {
                cohort_id: ids::derive_cohort_id(run.node_id, run.task_id, index),
                cohort_name: name.clone(),
                json: definition.clone(),
                sql,
                logic_description: None,
                generate_stats: true,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ohdsi::mock::MockQueryBuilder;
    use serde_json::json;

    fn run() -> RunMetadata {
        RunMetadata { node_id: 12, task_id: 34 }
    }

    #[test]
    fn test_build_definition_set_one_record_per_definition() {
        let definitions = vec![json!({"id": "a"}), json!({"id": "b"})];
        let names = vec!["A".to_string(), "B".to_string()];

        let set = build_definition_set(&run(), &definitions, &names, &MockQueryBuilder).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set[0].cohort_id, 120034000.0);
        assert_eq!(set[1].cohort_id, 120034001.0);
        assert_eq!(set[0].cohort_name, "A");
        assert_eq!(set[1].cohort_name, "B");
        for record in &set {
            assert!(record.generate_stats);
            assert!(record.logic_description.is_none());
            assert!(!record.sql.is_empty());
        }
        assert_eq!(set[0].json, definitions[0]);
    }

    #[test]
    fn test_build_definition_set_count_mismatch() {
        let definitions = vec![json!({})];
        let names = vec!["A".to_string(), "B".to_string()];

        let err = build_definition_set(&run(), &definitions, &names, &MockQueryBuilder)
            .unwrap_err();
        assert!(matches!(
            err,
            CohortSetError::NameCountMismatch { definitions: 1, names: 2 }
        ));
    }

    #[test]
    fn test_build_definition_set_propagates_parse_errors() {
        let definitions = vec![json!("not an object")];
        let names = vec!["A".to_string()];

        let err = build_definition_set(&run(), &definitions, &names, &MockQueryBuilder)
            .unwrap_err();
        assert!(matches!(err, CohortSetError::Query(QueryError::Parse(_))));
    }

    #[test]
    fn test_create_cohort_query_keeps_first_artifact_with_stats_on() {
        let query = create_cohort_query(&MockQueryBuilder, &json!({"id": 1})).unwrap();
        assert!(query.starts_with("INSERT INTO @target_cohort_table"));
        assert!(query.contains("stats = true"));
    }

    #[test]
    fn test_create_cohort_query_is_deterministic() {
        let definition = json!({"PrimaryCriteria": {"ObservationWindow": 0}});
        let first = create_cohort_query(&MockQueryBuilder, &definition).unwrap();
        let second = create_cohort_query(&MockQueryBuilder, &definition).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_create_cohort_query_rejects_empty_artifact_lists() {
        struct EmptyBuilder;
        impl CohortQueryBuilder for EmptyBuilder {
            fn expression_from_json(
                &self,
                definition: &Value,
            ) -> Result<crate::ohdsi::CohortExpression, QueryError> {
                Ok(crate::ohdsi::CohortExpression(definition.clone()))
            }
            fn build_queries(
                &self,
                _expression: &crate::ohdsi::CohortExpression,
                _options: &GenerationOptions,
            ) -> Result<Vec<String>, QueryError> {
                Ok(Vec::new())
            }
        }

        let err = create_cohort_query(&EmptyBuilder, &json!({})).unwrap_err();
        assert!(matches!(err, QueryError::NoArtifacts));
    }

    #[test]
    fn test_record_serializes_with_library_column_names() {
        let record = CohortRecord {
            cohort_id: 120034000.0,
            cohort_name: "A".to_string(),
            json: json!({}),
            sql: "SELECT 1".to_string(),
            logic_description: None,
            generate_stats: true,
        };

        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.contains_key("cohortId"));
        assert!(object.contains_key("cohortName"));
        assert!(object.contains_key("logicDescription"));
        assert!(object.contains_key("generateStats"));
    }
}
