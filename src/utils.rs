//! Utility functions for record and zone data.
//!
//! This module provides helpers for search patterns and for parsing values
//! stored as text.

use crate::errors::BackendError;

/// Convert a search pattern to a SQL `LIKE` pattern using `\` as escape.
///
/// `*` matches any run of characters and `?` a single character. Literal
/// `%`, `_` and `\` in the pattern are escaped.
///
/// # Arguments
/// * `pattern` - The user supplied search pattern.
///
/// # Returns
/// A pattern suitable for `LIKE ... ESCAPE '\'`.
pub fn pattern_to_like(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    for c in pattern.chars() {
        match c {
            '\\' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '*' => out.push('%'),
            '?' => out.push('_'),
            _ => out.push(c),
        }
    }
    out
}

/// Split a stored master list on spaces, commas and tabs.
pub fn split_masters(masters: &str) -> Vec<String> {
    masters
        .split(|c| c == ' ' || c == ',' || c == '\t')
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Extract the serial from SOA record content.
///
/// # Arguments
/// * `content` - SOA content: `mname rname serial refresh retry expire minimum`.
///
/// # Returns
/// The serial, `0` when the content has fewer than three fields.
pub fn soa_serial(content: &str) -> Result<i64, BackendError> {
    match content.split_whitespace().nth(2) {
        Some(serial) => Ok(serial.parse()?),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcards_become_like_patterns() {
        assert_eq!(pattern_to_like("*.example.com"), "%.example.com");
        assert_eq!(pattern_to_like("www?"), "www_");
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(pattern_to_like("50%_off"), "50\\%\\_off");
        assert_eq!(pattern_to_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn masters_split_on_separators() {
        assert_eq!(
            split_masters("192.0.2.1:53, 192.0.2.2\t192.0.2.3"),
            vec!["192.0.2.1:53", "192.0.2.2", "192.0.2.3"]
        );
        assert!(split_masters("").is_empty());
    }

    #[test]
    fn serial_is_third_field() {
        assert_eq!(
            soa_serial("ns1.example.com. hostmaster.example.com. 2024010101 10800 3600 604800 86400")
                .unwrap(),
            2024010101
        );
        assert_eq!(soa_serial("ns1 hostmaster").unwrap(), 0);
        assert!(soa_serial("ns1 hostmaster serial").is_err());
    }
}
