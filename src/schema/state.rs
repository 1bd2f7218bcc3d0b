//! Persisted schema state: for each logical table, the ordered column list as
//! of the end of the previous successful run.
//!
//! Loaded once before any table is processed and never mutated during the
//! run; the orchestrator builds a fresh snapshot which is written out in one
//! atomic step after every table has finalized. A failed run therefore leaves
//! the prior snapshot in place instead of persisting a half-merged schema.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// On-disk shape: `{"table_schemas": {"orders": ["code", ...], ...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    table_schemas: HashMap<String, Vec<String>>,
}

/// In-memory snapshot of table → ordered column list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaState {
    tables: HashMap<String, Vec<String>>,
}

impl SchemaState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot from `path`. A missing file yields an empty snapshot.
    /// Older runs persisted the mapping flat, without the `table_schemas`
    /// wrapper; that shape is still accepted.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no prior state at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading state file {}", path.display()))
            }
        };

        let value: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("parsing state file {}", path.display()))?;

        let tables = if value.get("table_schemas").is_some() {
            let state: StateFile = serde_json::from_value(value)
                .with_context(|| format!("parsing state file {}", path.display()))?;
            state.table_schemas
        } else {
            // legacy flat mapping, e.g. {"orders": ["code"]}
            let tables: HashMap<String, Vec<String>> = serde_json::from_value(value)
                .with_context(|| format!("parsing legacy state file {}", path.display()))?;
            if !tables.is_empty() {
                warn!("state file {} uses the legacy flat shape", path.display());
            }
            tables
        };

        Ok(Self { tables })
    }

    /// Persist the snapshot atomically: write to a `.tmp` sibling, then
    /// rename over the final path.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating state directory {}", parent.display()))?;
        }

        let file = StateFile {
            table_schemas: self.tables.clone(),
        };
        let text = serde_json::to_string_pretty(&file).context("serializing schema state")?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("renaming {} to {}", tmp.display(), path.display()))?;
        Ok(())
    }

    /// Columns persisted for `table`, if any prior run saw it.
    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(|c| c.as_slice())
    }

    /// Record the final column list for `table` in this snapshot.
    pub fn set_columns(&mut self, table: &str, columns: Vec<String>) {
        self.tables.insert(table.to_string(), columns);
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty_state() {
        let tmp = tempdir().unwrap();
        let state = SchemaState::load(&tmp.path().join("state.json")).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn save_and_reload_round_trip() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("state.json");

        let mut state = SchemaState::new();
        state.set_columns("products", vec!["code".into(), "name".into()]);
        state.save(&path).unwrap();

        let loaded = SchemaState::load(&path).unwrap();
        assert_eq!(loaded.columns("products"), Some(&["code".to_string(), "name".to_string()][..]));
        // the .tmp sibling must not be left behind
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn reads_legacy_flat_shape() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("state.json");
        fs::write(&path, r#"{"orders": ["code", "itemcode"]}"#).unwrap();

        let state = SchemaState::load(&path).unwrap();
        assert_eq!(
            state.columns("orders"),
            Some(&["code".to_string(), "itemcode".to_string()][..])
        );
    }

    #[test]
    fn wrapped_shape_wins_over_legacy() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("state.json");
        fs::write(
            &path,
            r#"{"table_schemas": {"orders": ["code"]}}"#,
        )
        .unwrap();

        let state = SchemaState::load(&path).unwrap();
        assert_eq!(state.columns("orders"), Some(&["code".to_string()][..]));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn corrupt_state_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("state.json");
        fs::write(&path, "not json").unwrap();
        assert!(SchemaState::load(&path).is_err());
    }
}
