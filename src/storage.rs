//! Read-only access to the safety report documents.
//!
//! Reports are arbitrary JSON objects keyed by id. The directory-backed store
//! keeps one document per file (`<root>/<id>.json`) and reads it on every
//! lookup; nothing is cached.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

pub type Report = Map<String, JsonValue>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reading report '{id}': {source}")]
    Io { id: String, source: std::io::Error },
    #[error("decoding report '{id}': {source}")]
    Decode { id: String, source: serde_json::Error },
    #[error("report '{id}' is not a JSON object")]
    NotAnObject { id: String },
}

pub trait ReportStore: Send + Sync {
    /// Point lookup by id. `Ok(None)` when no such report exists.
    fn fetch_report(&self, id: &str) -> Result<Option<Report>, StoreError>;
}

/// Report fields as (key, display value) pairs sorted by key.
pub fn sorted_fields(report: &Report) -> Vec<(String, String)> {
    let mut rows: Vec<(String, String)> = report
        .iter()
        .map(|(k, v)| {
            let shown = match v {
                JsonValue::String(s) => s.clone(),
                JsonValue::Null => String::new(),
                other => other.to_string(),
            };
            (k.clone(), shown)
        })
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}

fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && !id.contains('/')
        && !id.contains('\\')
        && !id.contains('\0')
}

#[derive(Debug, Clone)]
pub struct DirReportStore {
    root: PathBuf,
}

impl DirReportStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    fn path_for(&self, id: &str) -> Option<PathBuf> {
        if !is_safe_id(id) {
            return None;
        }
        Some(self.root.join(format!("{id}.json")))
    }
}

impl ReportStore for DirReportStore {
    fn fetch_report(&self, id: &str) -> Result<Option<Report>, StoreError> {
        let Some(path) = self.path_for(id) else { return Ok(None) };
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io { id: id.to_string(), source: e }),
        };
        let val: JsonValue = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Decode { id: id.to_string(), source: e })?;
        match val {
            JsonValue::Object(map) => Ok(Some(map)),
            _ => Err(StoreError::NotAnObject { id: id.to_string() }),
        }
    }
}

/// In-memory store; handy for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    map: RwLock<HashMap<String, Report>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: impl Into<String>, report: Report) {
        self.map.write().insert(id.into(), report);
    }
}

impl ReportStore for MemoryReportStore {
    fn fetch_report(&self, id: &str) -> Result<Option<Report>, StoreError> {
        Ok(self.map.read().get(id).cloned())
    }
}
