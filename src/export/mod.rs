//! Diagnostics export readback
//!
//! The diagnostics routine writes its results as files into the node's
//! export directory. The worker reads back exactly one of them, the
//! incidence-rate export, turns it into a small tabular frame and serializes
//! that frame to JSON text for transmission. The frame is the only thing a
//! participant ever returns; everything else stays on the node.

pub mod csv;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the export artifact the worker returns
pub const INCIDENCE_RATE_EXPORT: &str = "incidence_rate.csv";

/// Readback failures
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("expected export artifact missing: {0}")]
    Missing(PathBuf),

    #[error("failed to read export artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed export artifact: {0}")]
    Malformed(String),

    #[error("failed to serialize result frame: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A small tabular artifact: named columns over uniform rows.
///
/// Cells are JSON values; numeric-looking fields are parsed as numbers so
/// the serialized form keeps its types across the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Frame {
    /// Parse a frame from CSV text. The first record is the header; every
    /// following record must have the same width.
    pub fn from_csv_str(contents: &str) -> Result<Self, ExportError> {
        let mut records = csv::parse(contents)?.into_iter();
        let columns = records
            .next()
            .ok_or_else(|| ExportError::Malformed("empty export file".to_string()))?;

        let mut rows = Vec::new();
        for (number, record) in records.enumerate() {
            if record.len() != columns.len() {
                return Err(ExportError::Malformed(format!(
                    "row {} has {} fields, header has {}",
                    number + 2,
                    record.len(),
                    columns.len()
                )));
            }
            rows.push(record.iter().map(|cell| cell_value(cell)).collect());
        }

        Ok(Self { columns, rows })
    }

    /// Parse a frame from a CSV file on disk.
    pub fn from_csv_file(path: &Path) -> Result<Self, ExportError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExportError::Missing(path.to_path_buf())
            } else {
                ExportError::Io(e)
            }
        })?;
        Self::from_csv_str(&contents)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Serialize to the transmissible form: a JSON array of row objects
    /// keyed by column name.
    pub fn to_json(&self) -> Result<SerializedFrame, ExportError> {
        let records: Vec<Value> = self
            .rows
            .iter()
            .map(|row| {
                let mut object = Map::new();
                for (column, cell) in self.columns.iter().zip(row) {
                    object.insert(column.clone(), cell.clone());
                }
                Value::Object(object)
            })
            .collect();

        Ok(SerializedFrame(serde_json::to_string(&records)?))
    }
}

/// A frame serialized to JSON text, ready to be returned from a worker
/// invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SerializedFrame(String);

impl SerializedFrame {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Read the incidence-rate export from the diagnostics output directory.
pub fn read_incidence_rate(export_folder: &Path) -> Result<Frame, ExportError> {
    Frame::from_csv_file(&export_folder.join(INCIDENCE_RATE_EXPORT))
}

fn cell_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(integer) = raw.parse::<i64>() {
        return Value::from(integer);
    }
    if let Ok(float) = raw.parse::<f64>() {
        if float.is_finite() {
            return Value::from(float);
        }
    }
    Value::from(raw)
}
