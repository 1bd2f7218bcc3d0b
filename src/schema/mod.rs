//! Table-schema reconciliation: merging the column set persisted from prior
//! runs with the column set observed in the current run.

pub mod keys;
pub mod state;

pub use keys::resolve_primary_key;
pub use state::SchemaState;

use std::collections::HashSet;

/// Union of `known` and `observed` in first-seen order: every known column
/// keeps its position, observed columns not yet known are appended in the
/// order the current run saw them. Columns are never dropped, so repeated
/// merges grow monotonically.
pub fn merge_columns(known: &[String], observed: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(known.len() + observed.len());
    let mut present: HashSet<String> = HashSet::with_capacity(known.len() + observed.len());

    for col in known.iter().chain(observed) {
        if present.insert(col.clone()) {
            merged.push(col.clone());
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn known_columns_keep_their_positions() {
        let merged = merge_columns(&cols(&["code", "name"]), &cols(&["name", "price", "code"]));
        assert_eq!(merged, cols(&["code", "name", "price"]));
    }

    #[test]
    fn empty_known_takes_observed_order() {
        let merged = merge_columns(&[], &cols(&["b", "a"]));
        assert_eq!(merged, cols(&["b", "a"]));
    }

    #[test]
    fn merge_is_monotonic_superset() {
        let run1 = merge_columns(&[], &cols(&["code", "name"]));
        let run2 = merge_columns(&run1, &cols(&["code", "price"]));
        for col in &run1 {
            assert!(run2.contains(col));
        }
        assert_eq!(run2, cols(&["code", "name", "price"]));
    }

    #[test]
    fn observed_column_dropped_by_source_survives() {
        let merged = merge_columns(&cols(&["code", "name", "price"]), &cols(&["code"]));
        assert_eq!(merged, cols(&["code", "name", "price"]));
    }
}
