//! Output-table registration: the JSON sidecar the host platform reads to
//! learn a table's columns, primary key, and delimiter, plus the fixed
//! single-row shop metadata table written on every run.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Sidecar written next to `<table>.csv` as `<table>.csv.manifest`.
#[derive(Debug, Clone, Serialize)]
pub struct TableManifest {
    pub columns: Vec<String>,
    pub primary_key: Vec<String>,
    pub delimiter: String,
    pub incremental: bool,
}

impl TableManifest {
    pub fn write(&self, table_path: &Path) -> Result<()> {
        let manifest_path = manifest_path(table_path);
        let text = serde_json::to_string_pretty(self).context("serializing table manifest")?;
        fs::write(&manifest_path, text)
            .with_context(|| format!("writing manifest {}", manifest_path.display()))?;
        Ok(())
    }
}

fn manifest_path(table_path: &Path) -> std::path::PathBuf {
    let mut os = table_path.as_os_str().to_os_string();
    os.push(".manifest");
    os.into()
}

pub const SHOP_TABLE: &str = "shoptet";
pub const SHOP_COLUMNS: [&str; 2] = ["shop_base_url", "shop_name"];

/// Write the one-row shop metadata table and its manifest. Always full-load,
/// always comma-delimited, no primary key.
pub fn write_shop_table(out_dir: &Path, base_url: &str, shop_name: &str) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let path = out_dir.join(format!("{SHOP_TABLE}.csv"));

    let mut writer = csv::WriterBuilder::new()
        .from_path(&path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer
        .write_record([base_url, shop_name])
        .context("writing shop metadata row")?;
    writer.flush().context("flushing shop metadata table")?;

    let manifest = TableManifest {
        columns: SHOP_COLUMNS.iter().map(|c| c.to_string()).collect(),
        primary_key: Vec::new(),
        delimiter: ",".to_string(),
        incremental: false,
    };
    manifest.write(&path)
}
