//! Incremental per-table writer over an open-ended column set.
//!
//! Records arrive one at a time and may introduce columns the writer has not
//! seen; the column set only ever grows (new columns are appended in order of
//! first appearance). Rows written before a column existed must still carry an
//! empty value for it in the final output, so writing is two-phase: records
//! are appended to a flexible-width staging CSV as they arrive, and `finalize`
//! makes one materialization pass that pads every staged row to the final
//! column set and renames the result over the destination path.

pub mod manifest;

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{ExtractorError, ExtractorResult};

pub struct ElasticWriter {
    table: String,
    dest: PathBuf,
    delimiter: u8,
    columns: Vec<String>,
    index: HashMap<String, usize>,
    staging: csv::Writer<BufWriter<File>>,
    staging_file: NamedTempFile,
    rows: u64,
    closed: bool,
}

impl ElasticWriter {
    /// Open a writer for `table` targeting `dest`, seeded with
    /// `known_columns` (possibly empty, possibly a prior run's schema).
    pub fn create(
        table: &str,
        dest: &Path,
        delimiter: u8,
        known_columns: &[String],
    ) -> ExtractorResult<Self> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| ExtractorError::storage(parent, e))?;
        }

        let staging_file = NamedTempFile::new().map_err(|e| ExtractorError::storage(dest, e))?;
        let handle = staging_file
            .reopen()
            .map_err(|e| ExtractorError::storage(staging_file.path(), e))?;
        // always quote: an all-empty row must not serialize as a blank line,
        // or the finalize pass would skip it
        let staging = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(BufWriter::new(handle));

        let mut index = HashMap::with_capacity(known_columns.len());
        for (i, col) in known_columns.iter().enumerate() {
            index.insert(col.clone(), i);
        }

        Ok(Self {
            table: table.to_string(),
            dest: dest.to_path_buf(),
            delimiter,
            columns: known_columns.to_vec(),
            index,
            staging,
            staging_file,
            rows: 0,
            closed: false,
        })
    }

    /// Accept one record. Keys not yet in the column set extend it; the row
    /// is staged at the current width and padded during `finalize`.
    pub fn write<'a, I>(&mut self, record: I) -> ExtractorResult<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        if self.closed {
            return Err(ExtractorError::WriterClosed {
                table: self.table.clone(),
            });
        }

        let mut row: Vec<String> = vec![String::new(); self.columns.len()];
        for (key, value) in record {
            let idx = match self.index.get(key) {
                Some(&i) => i,
                None => {
                    let i = self.columns.len();
                    self.columns.push(key.to_string());
                    self.index.insert(key.to_string(), i);
                    row.push(String::new());
                    i
                }
            };
            row[idx] = value.to_string();
        }

        self.staging
            .write_record(&row)
            .map_err(|e| self.storage_err(e))?;
        self.rows += 1;
        Ok(())
    }

    /// Append any of `cols` not yet in the column set, in the given order.
    /// Lets a document's header join the schema even when no data row
    /// carries the new column.
    pub fn extend_columns(&mut self, cols: &[String]) -> ExtractorResult<()> {
        if self.closed {
            return Err(ExtractorError::WriterClosed {
                table: self.table.clone(),
            });
        }
        for col in cols {
            if !self.index.contains_key(col) {
                self.index.insert(col.clone(), self.columns.len());
                self.columns.push(col.clone());
            }
        }
        Ok(())
    }

    /// Columns seen so far, in schema order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush the staging buffer, pad every staged row to the final column
    /// set, and atomically materialize the destination file. Returns the
    /// final columns. The output is headerless; the column list travels in
    /// the table manifest.
    pub fn finalize(mut self) -> ExtractorResult<Vec<String>> {
        self.finalize_mut()
    }

    /// Materialization body. `finalize` consumes the writer so the closed
    /// state is unreachable through the public API; the runtime guard covers
    /// internal callers holding `&mut self`.
    fn finalize_mut(&mut self) -> ExtractorResult<Vec<String>> {
        self.closed = true;
        // csv::Writer::flush flushes the underlying BufWriter as well, so the
        // staged bytes are on disk before the read-back pass opens them.
        self.staging
            .flush()
            .map_err(|e| ExtractorError::storage(self.staging_file.path(), e))?;

        let staged = File::open(self.staging_file.path())
            .map_err(|e| ExtractorError::storage(self.staging_file.path(), e))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(BufReader::new(staged));

        let tmp_dest = self.dest.with_extension("csv.tmp");
        let out = File::create(&tmp_dest).map_err(|e| ExtractorError::storage(&tmp_dest, e))?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(BufWriter::new(out));

        let width = self.columns.len();
        let mut padded = csv::StringRecord::with_capacity(64, width);
        for result in reader.records() {
            let record = result.map_err(|e| self.storage_err(e))?;
            padded.clear();
            for field in record.iter().take(width) {
                padded.push_field(field);
            }
            for _ in record.len()..width {
                padded.push_field("");
            }
            writer.write_record(&padded).map_err(|e| self.storage_err(e))?;
        }
        writer
            .flush()
            .map_err(|e| ExtractorError::storage(&tmp_dest, e))?;
        drop(writer);

        fs::rename(&tmp_dest, &self.dest).map_err(|e| ExtractorError::storage(&self.dest, e))?;
        debug!(
            table = %self.table,
            rows = self.rows,
            columns = self.columns.len(),
            "materialized table"
        );

        Ok(self.columns.clone())
    }

    fn storage_err(&self, e: csv::Error) -> ExtractorError {
        ExtractorError::storage(
            &self.dest,
            std::io::Error::new(std::io::ErrorKind::Other, e),
        )
    }
}
