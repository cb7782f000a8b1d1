//! Settings bundles for the diagnostics run
//!
//! The analytic library takes two bundles of named options: the temporal
//! covariate settings and the diagnostics settings. Both are caller-supplied
//! and flow through this crate unmodified; defaults belong to the analytic
//! routine, not to the dispatch layer. The bundles are therefore modeled as
//! typed but open option maps rather than closed structs.

pub mod toml;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named options expanded into the analytic library's temporal covariate
/// settings construct.
///
/// Content is passed through verbatim; this type only guarantees the bundle
/// is a well-formed object of named options.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct TemporalCovariateSettings {
    options: Map<String, Value>,
}

/// Named options forwarded to the diagnostics execution call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DiagnosticsSettings {
    options: Map<String, Value>,
}

macro_rules! option_bundle {
    ($name:ident) => {
        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            /// Add or replace a named option, builder style.
            pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
                self.options.insert(name.to_string(), value.into());
                self
            }

            pub fn get(&self, name: &str) -> Option<&Value> {
                self.options.get(name)
            }

            pub fn len(&self) -> usize {
                self.options.len()
            }

            pub fn is_empty(&self) -> bool {
                self.options.is_empty()
            }

            /// Iterate the named options in insertion-independent key order.
            pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
                self.options.iter()
            }

            /// The bundle as a JSON object, for handing to the backend.
            pub fn as_object(&self) -> &Map<String, Value> {
                &self.options
            }
        }

        impl From<Map<String, Value>> for $name {
            fn from(options: Map<String, Value>) -> Self {
                Self { options }
            }
        }
    };
}

option_bundle!(TemporalCovariateSettings);
option_bundle!(DiagnosticsSettings);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bundle_passthrough_is_verbatim() {
        let settings = TemporalCovariateSettings::new()
            .with("use_demographics_gender", true)
            .with("temporal_start_days", json!([-365, -30]))
            .with("temporal_end_days", json!([-31, -1]));

        assert_eq!(settings.len(), 3);
        assert_eq!(settings.get("use_demographics_gender"), Some(&json!(true)));

        // Round-trip through JSON must not reshape anything
        let as_json = serde_json::to_value(&settings).unwrap();
        assert_eq!(
            as_json,
            json!({
                "use_demographics_gender": true,
                "temporal_start_days": [-365, -30],
                "temporal_end_days": [-31, -1],
            })
        );
        let back: TemporalCovariateSettings = serde_json::from_value(as_json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_empty_bundle_serializes_as_empty_object() {
        let settings = DiagnosticsSettings::new();
        assert!(settings.is_empty());
        assert_eq!(serde_json::to_value(&settings).unwrap(), json!({}));
    }
}
