//! HTTP retrieval of export documents.
//!
//! Downloads stream into a temp file so a table is only parsed once its
//! document arrived whole. Transient connectivity failures are retried a
//! bounded number of times with a fixed delay; an HTTP 404 is surfaced as
//! `ResourceNotFound` (the configured endpoint is wrong) instead of a
//! generic transport error.

use std::io::Write;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use tempfile::NamedTempFile;
use tokio::time::sleep;
use tracing::warn;
use url::Url;

use crate::error::{ExtractorError, ExtractorResult};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Download `url` into a fresh temp file. Retries connect/timeout failures
/// up to `MAX_ATTEMPTS` times; any other failure propagates immediately.
pub async fn download(client: &Client, url: &str) -> ExtractorResult<NamedTempFile> {
    let mut attempt = 1;
    loop {
        match try_download(client, url).await {
            Ok(file) => return Ok(file),
            Err(DownloadError::Transient(detail)) if attempt < MAX_ATTEMPTS => {
                warn!(url, attempt, "transient fetch failure: {detail}; retrying");
                sleep(RETRY_DELAY).await;
                attempt += 1;
            }
            Err(DownloadError::Transient(detail)) => {
                return Err(ExtractorError::Fetch {
                    url: url.to_string(),
                    detail,
                })
            }
            Err(DownloadError::Fatal(err)) => return Err(err),
        }
    }
}

enum DownloadError {
    /// Connect/timeout class, worth another attempt.
    Transient(String),
    Fatal(ExtractorError),
}

async fn try_download(client: &Client, url: &str) -> Result<NamedTempFile, DownloadError> {
    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) if e.is_connect() || e.is_timeout() => {
            return Err(DownloadError::Transient(e.to_string()))
        }
        Err(e) => {
            return Err(DownloadError::Fatal(ExtractorError::Fetch {
                url: url.to_string(),
                detail: e.to_string(),
            }))
        }
    };

    if response.status() == StatusCode::NOT_FOUND {
        return Err(DownloadError::Fatal(ExtractorError::ResourceNotFound {
            url: url.to_string(),
        }));
    }
    let mut response = match response.error_for_status() {
        Ok(r) => r,
        Err(e) => {
            return Err(DownloadError::Fatal(ExtractorError::Fetch {
                url: url.to_string(),
                detail: e.to_string(),
            }))
        }
    };

    let mut file = NamedTempFile::new().map_err(|e| {
        DownloadError::Fatal(ExtractorError::storage(std::env::temp_dir(), e))
    })?;
    loop {
        match response.chunk().await {
            Ok(Some(bytes)) => file.write_all(&bytes).map_err(|e| {
                DownloadError::Fatal(ExtractorError::storage(file.path(), e))
            })?,
            Ok(None) => break,
            // body interruptions are as transient as connect failures
            Err(e) => return Err(DownloadError::Transient(e.to_string())),
        }
    }
    file.flush()
        .map_err(|e| DownloadError::Fatal(ExtractorError::storage(file.path(), e)))?;
    Ok(file)
}

/// Set `dateFrom`/`dateUntil` query parameters on `url`, preserving every
/// unrelated parameter and overwriting any stale date parameters already
/// present.
pub fn add_date_parameters(
    url: &str,
    date_from: NaiveDate,
    date_until: NaiveDate,
) -> ExtractorResult<String> {
    let parsed =
        Url::parse(url).map_err(|e| ExtractorError::Config(format!("invalid URL `{url}`: {e}")))?;

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "dateFrom" && k != "dateUntil")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut updated = parsed;
    {
        let mut pairs = updated.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair("dateFrom", &date_from.format("%Y-%m-%d").to_string());
        pairs.append_pair("dateUntil", &date_until.format("%Y-%m-%d").to_string());
    }
    Ok(updated.to_string())
}
