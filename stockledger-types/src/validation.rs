//! Shared validation predicates for domain types.
//!
//! This module contains validation functions used by nutype-based domain types
//! across the stockledger crates.

/// Validation predicate: a product slug is lowercase ASCII alphanumerics
/// separated by single hyphens.
pub(crate) fn is_slug(s: &str) -> bool {
    !s.starts_with('-')
        && !s.ends_with('-')
        && !s.contains("--")
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Validation predicate: an unquoted SQL identifier (savepoint names are
/// interpolated into `SAVEPOINT <name>` statements).
pub(crate) fn is_sql_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_with_lowercase_words_pass_validation() {
        assert!(is_slug("red-widget"));
        assert!(is_slug("widget42"));
        assert!(is_slug("a-b-c"));
    }

    #[test]
    fn slugs_with_uppercase_spaces_or_stray_hyphens_fail_validation() {
        assert!(!is_slug("Red-Widget"));
        assert!(!is_slug("red widget"));
        assert!(!is_slug("-widget"));
        assert!(!is_slug("widget-"));
        assert!(!is_slug("red--widget"));
    }

    #[test]
    fn sql_identifiers_must_start_with_letter_or_underscore() {
        assert!(is_sql_identifier("transfer_leg"));
        assert!(is_sql_identifier("_sp1"));
        assert!(!is_sql_identifier("1sp"));
        assert!(!is_sql_identifier("sp; DROP TABLE warehouses"));
        assert!(!is_sql_identifier(""));
    }
}
