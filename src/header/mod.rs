//! Header normalization: raw exporter header tokens → canonical column
//! identifiers safe for use as output-table column names.
//!
//! Some exporters prepend a BOM to the first column name (or its windows-1252
//! mis-decoding), leave literal quotes inside header text, or rename the
//! casing of columns between runs. Everything here is pure and total: bad
//! input degrades to a normalized (possibly empty) identifier, never an error.

/// UTF-8 BOM as it appears when the marker bytes survive decoding.
const BOM: char = '\u{FEFF}';
/// The same marker bytes mis-decoded through windows-1252.
const BOM_MOJIBAKE: &str = "\u{EF}\u{BB}\u{BF}";

/// Normalize a single token with the fixed strategy: trim, lowercase, map
/// anything outside `[a-z0-9_]` to `_`. No collision handling.
pub fn normalize_token(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Strip a leading BOM artifact (real or mis-decoded) from the first header
/// token and embedded literal quotes from every token.
fn clean_raw_header(headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let mut h = h.as_str();
            if i == 0 {
                h = h.trim_start_matches(BOM);
                if let Some(rest) = h.strip_prefix(BOM_MOJIBAKE) {
                    h = rest;
                }
            }
            h.replace('"', "")
        })
        .collect()
}

/// Normalize a full header row. Two raw headers that normalize to the same
/// identifier must not collapse into one column: the second and subsequent
/// occurrences get a `_{position}` suffix, repeated until unique.
pub fn normalize_header(headers: &[String]) -> Vec<String> {
    let cleaned = clean_raw_header(headers);
    let mut out: Vec<String> = Vec::with_capacity(cleaned.len());

    for (pos, token) in cleaned.iter().enumerate() {
        let mut name = normalize_token(token);
        while out.contains(&name) {
            name = format!("{}_{}", name, pos);
        }
        out.push(name);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &[&str]) -> Vec<String> {
        normalize_header(&raw.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn lowercases_and_maps_non_identifier_chars() {
        assert_eq!(
            norm(&["Order Code", "unit-price (CZK)", " itemName "]),
            vec!["order_code", "unit_price__czk_", "itemname"]
        );
    }

    #[test]
    fn strips_bom_from_first_token_only() {
        assert_eq!(norm(&["\u{FEFF}code", "name"]), vec!["code", "name"]);
        assert_eq!(
            norm(&["\u{EF}\u{BB}\u{BF}code", "name"]),
            vec!["code", "name"]
        );
        // a BOM-looking sequence elsewhere is just mapped, not stripped
        assert_eq!(norm(&["code", "\u{FEFF}name"]), vec!["code", "_name"]);
    }

    #[test]
    fn strips_embedded_quotes() {
        assert_eq!(norm(&["\"code\"", "item\"Name"]), vec!["code", "itemname"]);
    }

    #[test]
    fn collisions_get_positional_suffixes() {
        assert_eq!(norm(&["Code", "code", "CODE"]), vec!["code", "code_1", "code_2"]);
    }

    #[test]
    fn collision_with_existing_suffix_stays_unique() {
        let got = norm(&["code", "code_1", "Code"]);
        assert_eq!(got.len(), 3);
        assert_eq!(got[0], "code");
        assert_eq!(got[1], "code_1");
        let unique: std::collections::HashSet<_> = got.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn normalization_is_idempotent() {
        let cases: Vec<Vec<String>> = vec![
            vec!["Code".into(), "code".into(), "CODE".into()],
            vec!["\u{FEFF}Order Code".into(), "unit-price".into()],
            vec!["".into(), "".into()],
        ];
        for raw in cases {
            let once = normalize_header(&raw);
            let twice = normalize_header(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn empty_tokens_degrade_without_error() {
        let got = norm(&["", " ", "\t"]);
        assert_eq!(got.len(), 3);
        assert_eq!(got[0], "");
        let unique: std::collections::HashSet<_> = got.iter().collect();
        assert_eq!(unique.len(), 3);
    }
}
