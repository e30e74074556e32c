//! Naming rules for parameter path segments and template logical ids.

use sha2::{Digest, Sha256};

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '/';

/// Maximum number of segments the parameter store accepts in a name.
pub const MAX_DEPTH: usize = 15;

/// Maximum length of a full parameter name (including the leading separator).
pub const MAX_NAME_LEN: usize = 1011;

/// Maximum length of a template logical id.
pub const MAX_LOGICAL_ID_LEN: usize = 255;

/// Checks a single segment name, returning a description of the problem if invalid.
///
/// Segments must be non-empty, must not contain the path separator, and are
/// restricted to ASCII letters, digits, `_`, `.` and `-`.
#[must_use]
pub fn check_segment(segment: &str) -> Option<String> {
    if segment.is_empty() {
        return Some(String::from("segment name cannot be empty"));
    }

    if segment.contains(PATH_SEPARATOR) {
        return Some(format!(
            "segment name '{segment}' contains the path separator '{PATH_SEPARATOR}'"
        ));
    }

    if let Some(bad) = segment
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '_' | '.' | '-'))
    {
        return Some(format!(
            "segment name '{segment}' contains unsupported character '{bad}'"
        ));
    }

    None
}

/// Converts an arbitrary name into a CamelCase logical id fragment.
///
/// Runs of non-alphanumeric characters separate words; each word keeps its
/// characters but starts with an upper-case letter. A name with no usable
/// characters becomes `SymbolsOnly`.
#[must_use]
pub fn camelize(name: &str) -> String {
    let result: String = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect();

    if result.is_empty() {
        String::from("SymbolsOnly")
    } else {
        result
    }
}

/// Builds a logical id from a prefix, a name and a suffix, keeping it within
/// the template limit.
///
/// Over-long ids are truncated and suffixed with 8 hex digits of a digest of
/// the full id, so distinct long ids stay distinct even when they share the
/// kept prefix.
#[must_use]
pub fn logical_id(prefix: &str, name: &str, suffix: &str) -> String {
    let id = format!("{prefix}{}{suffix}", camelize(name));
    if id.len() <= MAX_LOGICAL_ID_LEN {
        return id;
    }

    let digest = hex::encode(Sha256::digest(id.as_bytes()));
    let keep = MAX_LOGICAL_ID_LEN - 8;
    // Logical ids are pure ASCII, so byte truncation is safe.
    format!("{}{}", &id[..keep], &digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_segments() {
        assert!(check_segment("shipping-labels-service").is_none());
        assert!(check_segment("enable_fast.delivery").is_none());
        assert!(check_segment("8080").is_none());
    }

    #[test]
    fn test_invalid_segments() {
        assert!(check_segment("").is_some());
        assert!(check_segment("a/b").is_some());
        assert!(check_segment("with space").is_some());
        assert!(check_segment("caf\u{e9}").is_some());
    }

    #[test]
    fn test_camelize() {
        assert_eq!(camelize("enable-fast-delivery"), "EnableFastDelivery");
        assert_eq!(
            camelize("acme/shipping-labels-service/greeting"),
            "AcmeShippingLabelsServiceGreeting"
        );
        assert_eq!(camelize("already_Camel"), "AlreadyCamel");
        assert_eq!(camelize("--//"), "SymbolsOnly");
    }

    #[test]
    fn test_logical_id_truncates_long_names() {
        let long = "segment-".repeat(60);
        let id = logical_id("SSMParam", &long, "");
        assert_eq!(id.len(), MAX_LOGICAL_ID_LEN);
        assert!(id.starts_with("SSMParamSegment"));

        let other = format!("{long}x");
        assert_ne!(id, logical_id("SSMParam", &other, ""));
    }

    #[test]
    fn test_long_ids_differing_only_in_suffix_stay_distinct() {
        let long = "target-".repeat(40);
        let function = logical_id("Invalidate", &long, "Function");
        let restarter = logical_id("Invalidate", &long, "Restarter");
        assert_eq!(function.len(), MAX_LOGICAL_ID_LEN);
        assert_eq!(restarter.len(), MAX_LOGICAL_ID_LEN);
        assert_ne!(function, restarter);
    }
}
