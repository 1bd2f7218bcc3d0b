//! Primary-key resolution against the columns a table actually exposed.
//!
//! Remote exports occasionally rename their key columns (`itemCode` →
//! `orderItemCode`), so each feed may declare one fallback candidate. Keys
//! are declared in the source's raw casing; comparison and the resolved key
//! both use the normalized form, which is what the output columns carry.

use std::collections::HashSet;

use crate::error::{ExtractorError, ExtractorResult};
use crate::header::normalize_token;

/// Resolve the usable primary key for `table`.
///
/// - every column of `declared` present in `observed` → the declared key,
/// - else every column of `fallback` present → the fallback key,
/// - else `SchemaMismatch` naming both candidates and the observed columns.
///
/// An empty `declared` key means "no valid key" and moves straight to the
/// fallback; feeds that declare no key at all resolve to an empty key.
pub fn resolve_primary_key(
    table: &str,
    declared: &[String],
    fallback: &[String],
    observed: &[String],
) -> ExtractorResult<Vec<String>> {
    let declared: Vec<String> = declared.iter().map(|c| normalize_token(c)).collect();
    let fallback: Vec<String> = fallback.iter().map(|c| normalize_token(c)).collect();

    if declared.is_empty() && fallback.is_empty() {
        return Ok(Vec::new());
    }

    let present: HashSet<&str> = observed.iter().map(|c| c.as_str()).collect();
    let satisfied = |key: &[String]| !key.is_empty() && key.iter().all(|c| present.contains(c.as_str()));

    if satisfied(&declared) {
        return Ok(declared);
    }
    if satisfied(&fallback) {
        return Ok(fallback);
    }

    Err(ExtractorError::SchemaMismatch {
        table: table.to_string(),
        declared,
        fallback,
        observed: observed.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn declared_key_wins_when_present() {
        let key = resolve_primary_key(
            "products",
            &cols(&["code"]),
            &[],
            &cols(&["code", "name"]),
        )
        .unwrap();
        assert_eq!(key, cols(&["code"]));
    }

    #[test]
    fn falls_back_when_declared_key_is_renamed() {
        let key = resolve_primary_key(
            "orders",
            &cols(&["code", "itemCode", "itemName"]),
            &cols(&["code", "orderItemCode", "orderItemName"]),
            &cols(&["code", "orderitemcode", "orderitemname", "total"]),
        )
        .unwrap();
        assert_eq!(key, cols(&["code", "orderitemcode", "orderitemname"]));
    }

    #[test]
    fn both_candidates_missing_is_schema_mismatch() {
        let err = resolve_primary_key(
            "orders",
            &cols(&["code", "itemCode", "itemName"]),
            &cols(&["code", "orderItemCode", "orderItemName"]),
            &cols(&["code", "total"]),
        )
        .unwrap_err();
        match err {
            ExtractorError::SchemaMismatch {
                table,
                declared,
                fallback,
                observed,
            } => {
                assert_eq!(table, "orders");
                assert_eq!(declared, cols(&["code", "itemcode", "itemname"]));
                assert_eq!(fallback, cols(&["code", "orderitemcode", "orderitemname"]));
                assert_eq!(observed, cols(&["code", "total"]));
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn empty_declared_key_evaluates_fallback_immediately() {
        let key = resolve_primary_key("extra", &[], &cols(&["id"]), &cols(&["id", "name"])).unwrap();
        assert_eq!(key, cols(&["id"]));
    }

    #[test]
    fn no_candidates_at_all_resolves_to_empty_key() {
        let key = resolve_primary_key("extra", &[], &[], &cols(&["id"])).unwrap();
        assert!(key.is_empty());
    }

    #[test]
    fn comparison_happens_in_normalized_space() {
        let key = resolve_primary_key(
            "customers",
            &cols(&["accountGuid"]),
            &[],
            &cols(&["accountguid", "email"]),
        )
        .unwrap();
        assert_eq!(key, cols(&["accountguid"]));
    }
}
