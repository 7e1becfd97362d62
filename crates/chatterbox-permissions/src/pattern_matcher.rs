//! Segment-wise wildcard matching for command identifiers

use crate::error::{Error, Result};

/// Separator between the segments of a command identifier
pub const SEGMENT_SEPARATOR: char = '.';

/// Wildcard segment
pub const WILDCARD: &str = "*";

/// Matches restriction patterns against dot-separated command identifiers
///
/// Matching works on whole segments, never on substrings:
/// - a literal segment must equal the identifier segment exactly
/// - `*` in a non-final position matches exactly one segment
/// - `*` as the final segment matches one segment and everything nested below it
///
/// A pattern scoped to a child namespace never matches its ancestor:
/// `A.B.*` matches `A.B.C` and `A.B.C.D` but not `A.X`, `A` or `A.*`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternMatcher;

impl PatternMatcher {
    /// Create a new pattern matcher
    pub fn new() -> Self {
        Self
    }

    /// Match a command identifier against a restriction pattern
    pub fn match_pattern(&self, pattern: &str, identifier: &str) -> bool {
        let pattern: Vec<&str> = pattern.split(SEGMENT_SEPARATOR).collect();
        let identifier: Vec<&str> = identifier.split(SEGMENT_SEPARATOR).collect();
        self.match_segments(&pattern, &identifier)
    }

    #[allow(clippy::only_used_in_recursion)]
    fn match_segments(&self, pattern: &[&str], identifier: &[&str]) -> bool {
        match (pattern.split_first(), identifier.split_first()) {
            (None, None) => true,
            // Pattern exhausted before the identifier, or the other way round
            (None, Some(_)) | (Some(_), None) => false,
            (Some((segment, rest)), Some((target, target_rest))) => {
                if *segment == WILDCARD {
                    rest.is_empty() || self.match_segments(rest, target_rest)
                } else {
                    segment == target && self.match_segments(rest, target_rest)
                }
            }
        }
    }

    /// Return true when any of the patterns matches the identifier
    pub fn any_match<'a, I>(&self, patterns: I, identifier: &str) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        patterns
            .into_iter()
            .any(|pattern| self.match_pattern(pattern, identifier))
    }

    /// Validate a restriction pattern before it is stored
    ///
    /// Every segment must be non-empty and a `*` may only appear as a whole segment.
    pub fn validate_pattern(&self, pattern: &str) -> Result<()> {
        if pattern.trim().is_empty() {
            return Err(invalid(pattern, "pattern cannot be empty"));
        }

        for segment in pattern.split(SEGMENT_SEPARATOR) {
            if segment.is_empty() {
                return Err(invalid(pattern, "empty segment"));
            }
            if segment.chars().any(char::is_whitespace) {
                return Err(invalid(pattern, "segments cannot contain whitespace"));
            }
            if segment != WILDCARD && segment.contains(WILDCARD) {
                return Err(invalid(
                    pattern,
                    "'*' must occupy a whole segment",
                ));
            }
        }

        Ok(())
    }
}

fn invalid(pattern: &str, reason: &str) -> Error {
    Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let matcher = PatternMatcher::new();
        assert!(matcher.match_pattern("Fishing.Cast", "Fishing.Cast"));
        assert!(!matcher.match_pattern("Fishing.Cast", "Fishing.Reel"));
        assert!(!matcher.match_pattern("Fishing.Cast", "Fishing"));
    }

    #[test]
    fn test_no_partial_segment_match() {
        let matcher = PatternMatcher::new();
        assert!(!matcher.match_pattern("Foo.Bar", "Foobar.Bar"));
        assert!(!matcher.match_pattern("Foo.*", "Foobar.Baz"));
        assert!(!matcher.match_pattern("Foo.Ba", "Foo.Bar"));
    }

    #[test]
    fn test_trailing_wildcard_matches_nested() {
        let matcher = PatternMatcher::new();
        assert!(matcher.match_pattern("A.B.*", "A.B.C"));
        assert!(matcher.match_pattern("A.B.*", "A.B.C.D"));
        assert!(!matcher.match_pattern("A.B.*", "A.X"));
        assert!(!matcher.match_pattern("A.B.*", "A"));
        assert!(!matcher.match_pattern("A.B.*", "A.B"));
    }

    #[test]
    fn test_child_wildcard_does_not_grant_parent() {
        let matcher = PatternMatcher::new();
        assert!(!matcher.match_pattern("A.B.*", "A.*"));
        assert!(matcher.match_pattern("A.*", "A.*"));
        assert!(matcher.match_pattern("A.*", "A.B.*"));
    }

    #[test]
    fn test_sibling_namespaces_do_not_leak() {
        let matcher = PatternMatcher::new();
        assert!(matcher.match_pattern("A.*", "A.C.Run"));
        assert!(!matcher.match_pattern("A.B.*", "A.C.Run"));
    }

    #[test]
    fn test_inner_wildcard_matches_single_segment() {
        let matcher = PatternMatcher::new();
        assert!(matcher.match_pattern("A.*.Run", "A.B.Run"));
        assert!(matcher.match_pattern("A.*.Run", "A.C.Run"));
        assert!(!matcher.match_pattern("A.*.Run", "A.B.C.Run"));
        assert!(!matcher.match_pattern("A.*.Run", "A.B.Stop"));
    }

    #[test]
    fn test_universal_wildcard() {
        let matcher = PatternMatcher::new();
        assert!(matcher.match_pattern("*", "Fishing"));
        assert!(matcher.match_pattern("*", "Fishing.Cast"));
        assert!(matcher.match_pattern("*", "Dungeon.Party.Join"));
    }

    #[test]
    fn test_any_match() {
        let matcher = PatternMatcher::new();
        let patterns = ["Fishing.Cast", "Dungeon.*"];
        assert!(matcher.any_match(patterns, "Dungeon.Join"));
        assert!(matcher.any_match(patterns, "Fishing.Cast"));
        assert!(!matcher.any_match(patterns, "Fishing.Reel"));
        assert!(!matcher.any_match(Vec::<&str>::new(), "Fishing.Reel"));
    }

    #[test]
    fn test_validate_pattern() {
        let matcher = PatternMatcher::new();
        assert!(matcher.validate_pattern("A.B.*").is_ok());
        assert!(matcher.validate_pattern("*").is_ok());
        assert!(matcher.validate_pattern("A.*.C").is_ok());
        assert!(matcher.validate_pattern("").is_err());
        assert!(matcher.validate_pattern("A..B").is_err());
        assert!(matcher.validate_pattern("A.B*").is_err());
        assert!(matcher.validate_pattern("A.B C").is_err());
        assert!(matcher.validate_pattern("A.").is_err());
    }
}
