//! Date-range handling for date-filtered exports and backfill chunking.

use chrono::{Duration, NaiveDate, Utc};

use crate::error::{ExtractorError, ExtractorResult};

/// One inclusive date range handed to the exporter as
/// `dateFrom=start`/`dateUntil=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateChunk {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Accepts `YYYY-MM-DD` plus the relative tokens `now`, `today` and
/// `yesterday`.
pub fn parse_date(input: &str) -> ExtractorResult<NaiveDate> {
    let today = Utc::now().date_naive();
    match input.trim().to_ascii_lowercase().as_str() {
        "now" | "today" => Ok(today),
        "yesterday" => Ok(today - Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").map_err(|_| {
            ExtractorError::Config(format!(
                "invalid date `{input}`; expected YYYY-MM-DD, now, today or yesterday"
            ))
        }),
    }
}

/// Split `[start, end]` into consecutive non-overlapping chunks of at most
/// `chunk_size_days` days each. `chunk_size_days` must be at least 1
/// (config validation enforces this for backfill mode).
pub fn split_into_chunks(start: NaiveDate, end: NaiveDate, chunk_size_days: u32) -> Vec<DateChunk> {
    let size = i64::from(chunk_size_days.max(1));
    let mut chunks = Vec::new();
    let mut cursor = start;

    while cursor <= end {
        let chunk_end = std::cmp::min(cursor + Duration::days(size - 1), end);
        chunks.push(DateChunk {
            start: cursor,
            end: chunk_end,
        });
        cursor = chunk_end + Duration::days(1);
    }

    chunks
}

/// The chunk plan for one run: a single full-range chunk, or the backfill
/// split.
pub fn plan_chunks(
    date_since: &str,
    date_to: &str,
    backfill_mode: bool,
    chunk_size_days: u32,
) -> ExtractorResult<Vec<DateChunk>> {
    let start = parse_date(date_since)?;
    let end = parse_date(date_to)?;
    if start > end {
        return Err(ExtractorError::Config(format!(
            "date_since {start} is after date_to {end}"
        )));
    }

    if backfill_mode {
        Ok(split_into_chunks(start, end, chunk_size_days))
    } else {
        Ok(vec![DateChunk { start, end }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parses_iso_and_relative_dates() {
        assert_eq!(parse_date("2020-03-01").unwrap(), date("2020-03-01"));
        let today = Utc::now().date_naive();
        assert_eq!(parse_date("now").unwrap(), today);
        assert_eq!(parse_date("Today").unwrap(), today);
        assert_eq!(parse_date("yesterday").unwrap(), today - Duration::days(1));
        assert!(parse_date("03/01/2020").is_err());
    }

    #[test]
    fn chunks_are_non_overlapping_and_cover_the_range() {
        let chunks = split_into_chunks(date("2020-01-01"), date("2020-01-10"), 4);
        assert_eq!(
            chunks,
            vec![
                DateChunk { start: date("2020-01-01"), end: date("2020-01-04") },
                DateChunk { start: date("2020-01-05"), end: date("2020-01-08") },
                DateChunk { start: date("2020-01-09"), end: date("2020-01-10") },
            ]
        );
    }

    #[test]
    fn single_day_range_is_one_chunk() {
        let chunks = split_into_chunks(date("2020-01-01"), date("2020-01-01"), 7);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start, chunks[0].end);
    }

    #[test]
    fn non_backfill_is_one_full_chunk() {
        let chunks = plan_chunks("2020-01-01", "2020-12-31", false, 7).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start, date("2020-01-01"));
        assert_eq!(chunks[0].end, date("2020-12-31"));
    }

    #[test]
    fn inverted_range_is_a_config_error() {
        let err = plan_chunks("2021-01-01", "2020-01-01", false, 7).unwrap_err();
        assert!(matches!(err, ExtractorError::Config(_)));
    }
}
