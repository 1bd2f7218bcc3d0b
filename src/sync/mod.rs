//! Per-run orchestration: fetch each configured feed, reconcile its schema
//! with the persisted state, stream its rows through the elastic writer, and
//! capture the final column sets into a fresh state snapshot.
//!
//! One `TableSync` instance owns all per-run mutable state (the writer cache
//! and the prior schema snapshot). Writers live across date chunks, so in
//! backfill mode a later chunk merges into the columns an earlier chunk
//! already discovered. Processing is strictly sequential; the writer's
//! column-set growth is not built for concurrent mutation.

pub mod dates;
pub mod feeds;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use reqwest::Client;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ExtractorError, ExtractorResult};
use crate::fetch;
use crate::header::normalize_header;
use crate::schema::{merge_columns, resolve_primary_key, SchemaState};
use crate::writer::manifest::{write_shop_table, TableManifest};
use crate::writer::ElasticWriter;

use dates::DateChunk;
use feeds::{feeds_from_config, FeedSpec};

pub struct TableSync {
    client: Client,
    encoding: &'static encoding_rs::Encoding,
    delimiter: u8,
    incremental: bool,
    base_url: String,
    shop_name: String,
    out_dir: PathBuf,
    feeds: Vec<FeedSpec>,
    prior: SchemaState,
    writers: HashMap<String, ElasticWriter>,
}

impl TableSync {
    pub fn new(config: &Config, prior: SchemaState, out_dir: PathBuf) -> Self {
        Self {
            client: Client::new(),
            encoding: config.encoding(),
            delimiter: config.delimiter_byte(),
            incremental: config.loading_options.incremental_output,
            base_url: config.base_url.clone(),
            shop_name: config.shop_name.clone(),
            out_dir,
            feeds: feeds_from_config(config),
            prior,
            writers: HashMap::new(),
        }
    }

    /// Fetch and ingest every configured feed for one date chunk.
    pub async fn run_chunk(&mut self, chunk: &DateChunk) -> ExtractorResult<()> {
        let feeds = self.feeds.clone();
        for feed in &feeds {
            info!(
                table = %feed.name,
                from = %chunk.start,
                until = %chunk.end,
                "downloading feed"
            );
            let url = fetch::add_date_parameters(&feed.url, chunk.start, chunk.end)?;
            let document = fetch::download(&self.client, &url).await?;
            let raw = fs::read(document.path())
                .map_err(|e| ExtractorError::storage(document.path(), e))?;
            self.ingest_document(feed, &raw)?;
        }
        Ok(())
    }

    /// Decode one fetched document, reconcile its header with the known
    /// schema, and stream its rows into the table's writer.
    pub fn ingest_document(&mut self, feed: &FeedSpec, raw: &[u8]) -> ExtractorResult<()> {
        let (text, _, had_errors) = self.encoding.decode(raw);
        if had_errors {
            return Err(ExtractorError::Encoding {
                table: feed.name.clone(),
                charset: self.encoding.name().to_string(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut records = reader.records();

        let header = match records.next() {
            Some(record) => {
                let record = record.map_err(|e| ExtractorError::RowParse {
                    table: feed.name.clone(),
                    row: 1,
                    detail: e.to_string(),
                })?;
                record.iter().map(|f| f.to_string()).collect::<Vec<_>>()
            }
            None => {
                // still open the table so the run produces an artifact and
                // primary-key resolution runs against the prior schema
                warn!(table = %feed.name, "document is empty, keeping table seeded from prior schema");
                self.writer_for(&feed.name, &[])?;
                return Ok(());
            }
        };
        let columns = normalize_header(&header);
        let writer = self.writer_for(&feed.name, &columns)?;

        let mut rows: u64 = 0;
        for (i, record) in records.enumerate() {
            let record = record.map_err(|e| ExtractorError::RowParse {
                table: feed.name.clone(),
                row: i as u64 + 2,
                detail: e.to_string(),
            })?;
            if record.len() != columns.len() {
                return Err(ExtractorError::RowParse {
                    table: feed.name.clone(),
                    row: record.position().map(|p| p.line()).unwrap_or(i as u64 + 2),
                    detail: format!(
                        "expected {} fields, got {}",
                        columns.len(),
                        record.len()
                    ),
                });
            }
            writer.write(columns.iter().map(|c| c.as_str()).zip(record.iter()))?;
            rows += 1;
        }

        info!(table = %feed.name, rows, columns = columns.len(), "ingested document");
        Ok(())
    }

    /// The table's writer, created on first use with the persisted-schema ∪
    /// header union. Every document's header is merged, not just the first
    /// one: a later chunk may introduce a column in its header alone, with no
    /// data row carrying it yet.
    fn writer_for(
        &mut self,
        table: &str,
        observed: &[String],
    ) -> ExtractorResult<&mut ElasticWriter> {
        let writer = match self.writers.entry(table.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let known = self.prior.columns(table).unwrap_or(&[]);
                let seed = merge_columns(known, observed);
                let dest = self.out_dir.join(format!("{table}.csv"));
                entry.insert(ElasticWriter::create(table, &dest, self.delimiter, &seed)?)
            }
        };
        writer.extend_columns(observed)?;
        Ok(writer)
    }

    /// Resolve each table's primary key, materialize its output, register its
    /// manifest, and return the new schema snapshot. Tables persisted by
    /// earlier runs but not processed this run keep their prior entry, so the
    /// snapshot never shrinks a logical table's schema.
    pub fn finalize(mut self) -> ExtractorResult<SchemaState> {
        let mut snapshot = self.prior.clone();

        for feed in &self.feeds {
            let Some(writer) = self.writers.remove(&feed.name) else {
                continue;
            };

            let primary_key = resolve_primary_key(
                &feed.name,
                &feed.primary_key,
                &feed.fallback_key,
                writer.columns(),
            )?;

            let rows = writer.rows();
            let final_columns = writer.finalize()?;
            let manifest = TableManifest {
                columns: final_columns.clone(),
                primary_key,
                delimiter: (self.delimiter as char).to_string(),
                incremental: self.incremental,
            };
            let table_path = self.out_dir.join(format!("{}.csv", feed.name));
            manifest
                .write(&table_path)
                .map_err(|e| ExtractorError::storage(&table_path, std::io::Error::new(
                    std::io::ErrorKind::Other,
                    e.to_string(),
                )))?;

            info!(
                table = %feed.name,
                rows,
                columns = final_columns.len(),
                "finalized table"
            );
            snapshot.set_columns(&feed.name, final_columns);
        }

        write_shop_table(&self.out_dir, &self.base_url, &self.shop_name).map_err(|e| {
            ExtractorError::storage(&self.out_dir, std::io::Error::new(
                std::io::ErrorKind::Other,
                e.to_string(),
            ))
        })?;

        Ok(snapshot)
    }
}
