//! TOML settings file parsing
//!
//! Settings bundles are usually assembled programmatically by the caller, but
//! operators often keep them next to the cohort definitions in a small TOML
//! file. This loader parses such a file into the two bundles without
//! interpreting any of the option values.

use super::{DiagnosticsSettings, TemporalCovariateSettings};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Settings bundles as kept in an operator-maintained TOML file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SettingsFile {
    #[serde(default)]
    pub temporal_covariate_settings: TemporalCovariateSettings,
    #[serde(default)]
    pub diagnostics_settings: DiagnosticsSettings,
}

/// Parse a TOML settings file
pub fn parse_settings_file(path: &Path) -> Result<SettingsFile> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

    parse_settings_string(&contents)
        .with_context(|| format!("Failed to parse settings file: {}", path.display()))
}

/// Parse TOML settings from string
pub fn parse_settings_string(contents: &str) -> Result<SettingsFile> {
    let settings: SettingsFile =
        ::toml::from_str(contents).context("Failed to parse TOML settings")?;

    Ok(settings)
}
