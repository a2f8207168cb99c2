//! Property tests for key validation and progress aggregation.
//!
//! 1. Format validation agrees with a character-level description of the rules.
//! 2. Existing keys are always duplicates; case folding only matters when
//!    comparison is case-insensitive.
//! 3. Similarity is symmetric, bounded and 1.0 on identical keys.
//! 4. Keys nested under an existing key always conflict.
//! 5. Progress percentages stay within 0..=100 and the overall figure never
//!    exceeds any language's figure.

use proptest::prelude::*;
use translation_keystore::i18n::{KeyValidator, ProgressCalculator};
use translation_keystore::model::TranslationGroup;

// ==================== Helpers ====================

fn expected_valid(key: &str) -> bool {
    let allowed = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
    let separator = |c: char| c == '.' || c == '_';

    !key.trim().is_empty()
        && allowed
        && !key.starts_with(|c: char| c.is_ascii_digit())
        && !["..", "__", "._", "_."].iter().any(|run| key.contains(run))
        && !key.starts_with(separator)
        && !key.ends_with(separator)
}

fn lowercase_key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,6}(\\.[a-z][a-z0-9]{0,6}){0,2}"
}

// ==================== Format ====================

proptest! {
    #[test]
    fn format_matches_rules(key in "[A-Za-z0-9._ \\-#]{0,12}") {
        prop_assert_eq!(
            KeyValidator::validate(&key).is_valid,
            expected_valid(&key),
            "Disagreement on {:?}", key
        );
    }

    #[test]
    fn well_formed_keys_pass(key in lowercase_key()) {
        prop_assert!(KeyValidator::validate(&key).is_valid);
    }
}

// ==================== Duplicates ====================

proptest! {
    #[test]
    fn existing_key_is_duplicate(
        existing in proptest::collection::vec(lowercase_key(), 1..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let key = pick.get(&existing).clone();
        let upper = key.to_uppercase();

        prop_assert!(!KeyValidator::check_duplicate(&key, &existing, true).is_valid);
        prop_assert!(KeyValidator::check_duplicate(&upper, &existing, true).is_valid);
        prop_assert!(!KeyValidator::check_duplicate(&upper, &existing, false).is_valid);
    }
}

// ==================== Similarity ====================

proptest! {
    #[test]
    fn similarity_is_symmetric_and_bounded(a in "[a-z._]{0,10}", b in "[a-z._]{0,10}") {
        let ab = KeyValidator::calculate_similarity(&a, &b);
        let ba = KeyValidator::calculate_similarity(&b, &a);

        prop_assert!((ab - ba).abs() < 1e-12);
        prop_assert!((0.0..=1.0).contains(&ab));
        prop_assert_eq!(KeyValidator::calculate_similarity(&a, &a), 1.0);
    }
}

// ==================== Namespaces ====================

proptest! {
    #[test]
    fn nested_keys_conflict(parent in lowercase_key(), child in "[a-z]{1,5}") {
        let nested = format!("{}.{}", parent, child);

        prop_assert!(!KeyValidator::check_namespace_conflict(&nested, &[parent.clone()]).is_valid);
        prop_assert!(!KeyValidator::check_namespace_conflict(&parent, &[nested]).is_valid);
    }
}

// ==================== Progress ====================

proptest! {
    #[test]
    fn progress_is_bounded(
        cells in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..20),
    ) {
        let groups: Vec<TranslationGroup> = cells
            .iter()
            .enumerate()
            .map(|(i, (en, ja))| {
                TranslationGroup::empty(format!("k{}", i), i as i64, &["en", "ja"])
                    .with_value("en", if *en { "x" } else { "" })
                    .with_value("ja", if *ja { "y" } else { " " })
            })
            .collect();

        let report = ProgressCalculator::calculate(&groups, &["en", "ja"]);
        for percentage in report.by_language.values() {
            prop_assert!(*percentage <= 100);
            prop_assert!(report.overall <= *percentage);
        }

        let incomplete = ProgressCalculator::get_incomplete_items(&groups, &["en", "ja"]);
        let expected = cells.iter().filter(|(en, ja)| !(*en && *ja)).count();
        prop_assert_eq!(incomplete.len(), expected);

        if groups.is_empty() {
            prop_assert_eq!(report.overall, 0);
        }
    }
}
