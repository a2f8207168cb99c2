//! Translation key validation module.
//!
//! This module decides whether a candidate key may enter a project. Checks
//! run in a fixed order (format, duplicate, namespace, similarity) and the
//! first failure wins. Each check is also callable on its own so that
//! live-typing feedback can stay on the cheap format check.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Default threshold for the similarity check.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Maximum number of conflicting keys listed in a namespace message.
const MAX_LISTED_CONFLICTS: usize = 3;

/// Outcome of a validation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,

    /// Human-readable reason when the input was rejected
    pub message: Option<String>,
}

impl ValidationResult {
    /// A passing result
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    /// A failing result carrying a message
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
        }
    }
}

/// Result of the similarity check, including the keys that looked alike.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityCheck {
    pub is_valid: bool,
    pub message: Option<String>,
    pub similar_keys: Vec<String>,
}

impl From<SimilarityCheck> for ValidationResult {
    fn from(check: SimilarityCheck) -> Self {
        ValidationResult {
            is_valid: check.is_valid,
            message: check.message,
        }
    }
}

/// Every way a key can be malformed. Each cause carries its own message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KeyFormatError {
    #[error("Translation key is required")]
    Empty,

    #[error("Translation key must not contain whitespace")]
    ContainsWhitespace,

    #[error("Translation key may only contain letters, digits, '.' and '_'")]
    InvalidCharacter,

    #[error("Translation key must not start with a digit")]
    LeadingDigit,

    #[error("Translation key must not contain consecutive '.' or '_'")]
    ConsecutiveSeparators,

    #[error("Translation key must not start or end with '.' or '_'")]
    EdgeSeparator,
}

/// Knobs for [`KeyValidator::validate_complete`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationOptions {
    /// Compare keys exactly (true) or on lower-cased forms (false)
    pub case_sensitive: bool,

    /// Run the Levenshtein typo check (costly, run on commit only)
    pub check_similarity: bool,

    /// Similarity at or above this value (and below 1) is flagged
    pub similarity_threshold: f64,

    /// Reject keys that would nest under or above an existing key
    pub check_namespace_conflict: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            check_similarity: false,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            check_namespace_conflict: true,
        }
    }
}

/// Validator for translation keys.
pub struct KeyValidator;

static ALLOWED_CHARS_REGEX: OnceLock<Regex> = OnceLock::new();
static CONSECUTIVE_SEPARATOR_REGEX: OnceLock<Regex> = OnceLock::new();

impl KeyValidator {
    /// Check the format rules of a key.
    ///
    /// Rules, in order: not blank, no whitespace anywhere, only
    /// `[A-Za-z0-9._]`, no leading digit, no run of two or more separators,
    /// no separator at either end.
    ///
    /// # Arguments
    /// * `key` - The candidate key exactly as typed (it is not trimmed)
    pub fn check_format(key: &str) -> Result<(), KeyFormatError> {
        if key.trim().is_empty() {
            return Err(KeyFormatError::Empty);
        }

        if key.chars().any(char::is_whitespace) {
            return Err(KeyFormatError::ContainsWhitespace);
        }

        let allowed = ALLOWED_CHARS_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._]+$").unwrap());
        if !allowed.is_match(key) {
            return Err(KeyFormatError::InvalidCharacter);
        }

        if key.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(KeyFormatError::LeadingDigit);
        }

        let consecutive =
            CONSECUTIVE_SEPARATOR_REGEX.get_or_init(|| Regex::new(r"[._]{2,}").unwrap());
        if consecutive.is_match(key) {
            return Err(KeyFormatError::ConsecutiveSeparators);
        }

        let is_separator = |c: char| c == '.' || c == '_';
        if key.starts_with(is_separator) || key.ends_with(is_separator) {
            return Err(KeyFormatError::EdgeSeparator);
        }

        Ok(())
    }

    /// Format check wrapped as a [`ValidationResult`].
    pub fn validate(key: &str) -> ValidationResult {
        match Self::check_format(key) {
            Ok(()) => ValidationResult::valid(),
            Err(err) => ValidationResult::invalid(err.to_string()),
        }
    }

    /// Check whether the trimmed key already exists.
    ///
    /// # Arguments
    /// * `key` - The candidate key
    /// * `existing_keys` - Keys already in the project
    /// * `case_sensitive` - When false, keys are compared lower-cased
    pub fn check_duplicate<S: AsRef<str>>(
        key: &str,
        existing_keys: &[S],
        case_sensitive: bool,
    ) -> ValidationResult {
        let trimmed = key.trim();

        if case_sensitive {
            if existing_keys.iter().any(|k| k.as_ref() == trimmed) {
                return ValidationResult::invalid("Translation key already exists");
            }
        } else {
            let lowered = trimmed.to_lowercase();
            if existing_keys
                .iter()
                .any(|k| k.as_ref().to_lowercase() == lowered)
            {
                return ValidationResult::invalid(
                    "Translation key already exists (case-insensitive match)",
                );
            }
        }

        ValidationResult::valid()
    }

    /// Check that the key neither contains nor sits under an existing key.
    ///
    /// `a` conflicts with `a.b` in both directions: adding `a` when `a.b`
    /// exists would turn a leaf into a namespace, and adding `a.b.c` when
    /// `a.b` exists would nest under a leaf. The comparison is always
    /// case-sensitive.
    pub fn check_namespace_conflict<S: AsRef<str>>(
        key: &str,
        existing_keys: &[S],
    ) -> ValidationResult {
        let trimmed = key.trim();
        let as_namespace = format!("{}.", trimmed);

        let conflicts: Vec<&str> = existing_keys
            .iter()
            .map(AsRef::as_ref)
            .filter(|existing| {
                existing.starts_with(&as_namespace)
                    || trimmed
                        .strip_prefix(*existing)
                        .is_some_and(|rest| rest.starts_with('.'))
            })
            .collect();

        if conflicts.is_empty() {
            return ValidationResult::valid();
        }

        let listed = conflicts
            .iter()
            .take(MAX_LISTED_CONFLICTS)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        let ellipsis = if conflicts.len() > MAX_LISTED_CONFLICTS {
            "..."
        } else {
            ""
        };

        ValidationResult::invalid(format!(
            "Translation key conflicts with existing namespace: {}{}",
            listed, ellipsis
        ))
    }

    /// Flag keys that are close to, but not equal to, an existing key.
    ///
    /// # Arguments
    /// * `key` - The candidate key
    /// * `existing_keys` - Keys already in the project
    /// * `threshold` - Minimum similarity (0-1) that counts as "alike"
    ///
    /// # Returns
    /// A [`SimilarityCheck`] listing every existing key whose similarity is
    /// in `[threshold, 1)`. Exact matches are left to the duplicate check.
    pub fn check_similarity<S: AsRef<str>>(
        key: &str,
        existing_keys: &[S],
        threshold: f64,
    ) -> SimilarityCheck {
        let trimmed = key.trim();

        let similar_keys: Vec<String> = existing_keys
            .iter()
            .map(AsRef::as_ref)
            .filter(|existing| {
                let similarity = Self::calculate_similarity(trimmed, existing);
                similarity >= threshold && similarity < 1.0
            })
            .map(str::to_string)
            .collect();

        if similar_keys.is_empty() {
            return SimilarityCheck {
                is_valid: true,
                message: None,
                similar_keys,
            };
        }

        SimilarityCheck {
            is_valid: false,
            message: Some(format!(
                "Translation key is similar to existing keys, possibly a typo: {}",
                similar_keys.join(", ")
            )),
            similar_keys,
        }
    }

    /// Normalized Levenshtein similarity: `(max_len - distance) / max_len`.
    ///
    /// Two empty strings are identical (1.0); one empty string against a
    /// non-empty one scores 0.0.
    pub fn calculate_similarity(a: &str, b: &str) -> f64 {
        let len_a = a.chars().count();
        let len_b = b.chars().count();

        if len_a == 0 {
            return if len_b == 0 { 1.0 } else { 0.0 };
        }
        if len_b == 0 {
            return 0.0;
        }

        let max_len = len_a.max(len_b);
        let distance = levenshtein(a, b);
        (max_len - distance) as f64 / max_len as f64
    }

    /// Run every enabled check in order and stop at the first failure.
    ///
    /// # Arguments
    /// * `key` - The candidate key
    /// * `existing_keys` - Keys already in the project (exclude the key's
    ///   own old name when renaming)
    /// * `options` - Which optional checks to run and how
    pub fn validate_complete<S: AsRef<str>>(
        key: &str,
        existing_keys: &[S],
        options: &ValidationOptions,
    ) -> ValidationResult {
        let format = Self::validate(key);
        if !format.is_valid {
            return format;
        }

        let duplicate = Self::check_duplicate(key, existing_keys, options.case_sensitive);
        if !duplicate.is_valid {
            return duplicate;
        }

        if options.check_namespace_conflict {
            let namespace = Self::check_namespace_conflict(key, existing_keys);
            if !namespace.is_valid {
                return namespace;
            }
        }

        if options.check_similarity {
            let similarity =
                Self::check_similarity(key, existing_keys, options.similarity_threshold);
            if !similarity.is_valid {
                return similarity.into();
            }
        }

        ValidationResult::valid()
    }
}

/// Edit distance over chars, two rows at a time.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = if ca == *cb { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

/// Generic field validators used for project and language metadata.
pub struct CommonValidator;

impl CommonValidator {
    /// Reject blank values.
    pub fn required(value: &str, field_name: &str) -> ValidationResult {
        if value.trim().is_empty() {
            return ValidationResult::invalid(format!("{} must not be empty", field_name));
        }
        ValidationResult::valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_KEYS: [&str; 0] = [];

    // ==================== Format Tests ====================

    #[test]
    fn test_format_accepts_common_keys() {
        for key in ["home", "home.title", "user_profile.name", "a1.b2_c3", "Button.OK"] {
            assert!(KeyValidator::validate(key).is_valid, "{} should be valid", key);
        }
    }

    #[test]
    fn test_format_rejects_blank() {
        assert_eq!(KeyValidator::check_format(""), Err(KeyFormatError::Empty));
        assert_eq!(KeyValidator::check_format("   "), Err(KeyFormatError::Empty));
    }

    #[test]
    fn test_format_rejects_whitespace() {
        assert_eq!(
            KeyValidator::check_format("home title"),
            Err(KeyFormatError::ContainsWhitespace)
        );
        assert_eq!(
            KeyValidator::check_format(" home"),
            Err(KeyFormatError::ContainsWhitespace)
        );
        assert_eq!(
            KeyValidator::check_format("home\t"),
            Err(KeyFormatError::ContainsWhitespace)
        );
    }

    #[test]
    fn test_format_rejects_invalid_characters() {
        for key in ["home-title", "home/title", "ключ", "a:b", "a$"] {
            assert_eq!(
                KeyValidator::check_format(key),
                Err(KeyFormatError::InvalidCharacter),
                "{}",
                key
            );
        }
    }

    #[test]
    fn test_format_rejects_leading_digit() {
        assert_eq!(
            KeyValidator::check_format("1home"),
            Err(KeyFormatError::LeadingDigit)
        );
    }

    #[test]
    fn test_format_rejects_consecutive_separators() {
        for key in ["a..b", "a__b", "a._b", "a_.b"] {
            assert_eq!(
                KeyValidator::check_format(key),
                Err(KeyFormatError::ConsecutiveSeparators),
                "{}",
                key
            );
        }
    }

    #[test]
    fn test_format_rejects_edge_separators() {
        for key in [".a", "a.", "_a", "a_"] {
            assert_eq!(
                KeyValidator::check_format(key),
                Err(KeyFormatError::EdgeSeparator),
                "{}",
                key
            );
        }
    }

    #[test]
    fn test_format_messages_are_distinct() {
        let messages: std::collections::HashSet<String> = [
            KeyFormatError::Empty,
            KeyFormatError::ContainsWhitespace,
            KeyFormatError::InvalidCharacter,
            KeyFormatError::LeadingDigit,
            KeyFormatError::ConsecutiveSeparators,
            KeyFormatError::EdgeSeparator,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(messages.len(), 6);
    }

    // ==================== Duplicate Tests ====================

    #[test]
    fn test_duplicate_case_sensitive() {
        let existing = ["home.title", "home.body"];
        assert!(!KeyValidator::check_duplicate("home.title", &existing, true).is_valid);
        assert!(KeyValidator::check_duplicate("HOME.TITLE", &existing, true).is_valid);
    }

    #[test]
    fn test_duplicate_case_insensitive() {
        let existing = ["home.title"];
        let result = KeyValidator::check_duplicate("HOME.TITLE", &existing, false);
        assert!(!result.is_valid);
        assert!(result.message.unwrap().contains("case-insensitive"));
    }

    #[test]
    fn test_duplicate_trims_candidate() {
        let existing = ["home.title"];
        assert!(!KeyValidator::check_duplicate("  home.title ", &existing, true).is_valid);
    }

    // ==================== Namespace Tests ====================

    #[test]
    fn test_namespace_ancestor_conflict() {
        let existing = ["a.b"];
        assert!(!KeyValidator::check_namespace_conflict("a", &existing).is_valid);
    }

    #[test]
    fn test_namespace_descendant_conflict() {
        let existing = ["a.b"];
        assert!(!KeyValidator::check_namespace_conflict("a.b.c", &existing).is_valid);
    }

    #[test]
    fn test_namespace_sibling_prefix_is_fine() {
        let existing = ["a.b"];
        assert!(KeyValidator::check_namespace_conflict("a.bb", &existing).is_valid);
        assert!(KeyValidator::check_namespace_conflict("a.b_c", &existing).is_valid);
    }

    #[test]
    fn test_namespace_is_case_sensitive() {
        let existing = ["A.b"];
        assert!(KeyValidator::check_namespace_conflict("a", &existing).is_valid);
    }

    #[test]
    fn test_namespace_lists_three_with_ellipsis() {
        let existing = ["menu.a", "menu.b", "menu.c", "menu.d"];
        let message = KeyValidator::check_namespace_conflict("menu", &existing)
            .message
            .unwrap();
        assert!(message.contains("menu.a, menu.b, menu.c..."));
        assert!(!message.contains("menu.d"));
    }

    #[test]
    fn test_namespace_no_ellipsis_at_three() {
        let existing = ["menu.a", "menu.b", "menu.c"];
        let message = KeyValidator::check_namespace_conflict("menu", &existing)
            .message
            .unwrap();
        assert!(message.ends_with("menu.a, menu.b, menu.c"));
    }

    // ==================== Similarity Tests ====================

    #[test]
    fn test_similarity_one_edit() {
        let similarity = KeyValidator::calculate_similarity("user.name", "user.nam");
        assert!((similarity - 8.0 / 9.0).abs() < 1e-9);
        assert!(similarity >= DEFAULT_SIMILARITY_THRESHOLD);
    }

    #[test]
    fn test_similarity_edge_cases() {
        assert_eq!(KeyValidator::calculate_similarity("", ""), 1.0);
        assert_eq!(KeyValidator::calculate_similarity("", "a"), 0.0);
        assert_eq!(KeyValidator::calculate_similarity("a", ""), 0.0);
        assert_eq!(KeyValidator::calculate_similarity("abc", "abc"), 1.0);
        assert_eq!(KeyValidator::calculate_similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_levenshtein_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
        assert_eq!(levenshtein("", "abc"), 3);
    }

    #[test]
    fn test_similarity_check_flags_typo_not_exact() {
        let existing = ["user.name", "user.email"];
        let check = KeyValidator::check_similarity("user.nam", &existing, 0.85);
        assert!(!check.is_valid);
        assert_eq!(check.similar_keys, vec!["user.name"]);

        let exact = KeyValidator::check_similarity("user.name", &existing, 0.85);
        assert!(exact.is_valid);
    }

    // ==================== Composition Tests ====================

    #[test]
    fn test_complete_reports_first_failure() {
        let existing = ["home.title"];
        let result = KeyValidator::validate_complete(
            "home title",
            &existing,
            &ValidationOptions::default(),
        );
        assert_eq!(
            result.message.as_deref(),
            Some("Translation key must not contain whitespace")
        );
    }

    #[test]
    fn test_complete_duplicate_before_similarity() {
        let existing = ["user.name"];
        let options = ValidationOptions {
            check_similarity: true,
            ..ValidationOptions::default()
        };
        let result = KeyValidator::validate_complete("user.name", &existing, &options);
        assert_eq!(
            result.message.as_deref(),
            Some("Translation key already exists")
        );
    }

    #[test]
    fn test_complete_similarity_is_opt_in() {
        let existing = ["user.name"];
        let default = KeyValidator::validate_complete(
            "user.nam",
            &existing,
            &ValidationOptions::default(),
        );
        assert!(default.is_valid);

        let options = ValidationOptions {
            check_similarity: true,
            ..ValidationOptions::default()
        };
        let strict = KeyValidator::validate_complete("user.nam", &existing, &options);
        assert!(!strict.is_valid);
        assert!(strict.message.unwrap().contains("user.name"));
    }

    #[test]
    fn test_complete_namespace_can_be_disabled() {
        let existing = ["a.b"];
        let options = ValidationOptions {
            check_namespace_conflict: false,
            ..ValidationOptions::default()
        };
        assert!(KeyValidator::validate_complete("a", &existing, &options).is_valid);
        assert!(
            !KeyValidator::validate_complete("a", &existing, &ValidationOptions::default())
                .is_valid
        );
    }

    #[test]
    fn test_complete_with_no_existing_keys() {
        assert!(
            KeyValidator::validate_complete("home", &NO_KEYS, &ValidationOptions::default())
                .is_valid
        );
    }

    // ==================== Common Validator Tests ====================

    #[test]
    fn test_required() {
        assert!(!CommonValidator::required("  ", "Project name").is_valid);
        assert!(CommonValidator::required("Demo", "Project name").is_valid);
        assert_eq!(
            CommonValidator::required("", "Project name").message.as_deref(),
            Some("Project name must not be empty")
        );
    }
}
