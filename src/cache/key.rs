//! Cache key derivation
//!
//! Keys are built from a subject (a game name) and a source tag. The subject
//! is normalized so that minor spelling variations of the same title
//! ("Baldur's Gate 3", "baldurs gate 3") land on the same entry.

use crate::cache::types::CacheKey;

/// Source tag used when the caller does not restrict the lookup to one provider
pub const DEFAULT_SOURCE: &str = "all";

/// Normalize a subject identifier: lowercase it and drop every character
/// outside `[a-z0-9]`.
pub fn normalize_subject(subject: &str) -> String {
    subject
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Derive the cache key for a `(subject, source)` pair.
///
/// The source tag is appended verbatim. Total for any input, including the
/// empty string.
pub fn derive_key(subject: &str, source: &str) -> CacheKey {
    format!("{}_{}", normalize_subject(subject), source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apostrophes_case_and_spacing_collapse() {
        assert_eq!(
            derive_key("Baldur's Gate 3", "steam"),
            derive_key("baldurs gate 3", "steam")
        );
        assert_eq!(derive_key("Baldur's Gate 3", "steam"), "baldursgate3_steam");
    }

    #[test]
    fn test_source_is_not_normalized() {
        assert_eq!(derive_key("Hades", "IGDB"), "hades_IGDB");
        assert_ne!(derive_key("Hades", "IGDB"), derive_key("Hades", "igdb"));
    }

    #[test]
    fn test_default_source() {
        assert_eq!(derive_key("Celeste", DEFAULT_SOURCE), "celeste_all");
    }

    #[test]
    fn test_empty_and_symbol_only_subjects() {
        assert_eq!(derive_key("", "all"), "_all");
        assert_eq!(derive_key("!!! ???", "all"), "_all");
        assert_eq!(normalize_subject("Pokémon: Red"), "pokmonred");
    }
}
