//! Translation progress aggregation.
//!
//! Percentages and the "incomplete" filter are both derived from
//! [`ProgressCalculator::is_item_complete`], so they can never disagree.

use crate::model::{is_value_complete, TranslationGroup};
use serde::Serialize;
use std::collections::BTreeMap;

/// Completion percentages for a set of groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
    /// Share of groups complete in every configured language (0-100)
    pub overall: u32,

    /// Share of groups with a non-empty value, per language (0-100)
    pub by_language: BTreeMap<String, u32>,
}

/// Completion counts for one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageStats {
    pub completed: usize,
    pub total: usize,
    pub percentage: u32,
}

/// Pure aggregation over in-memory translation groups.
pub struct ProgressCalculator;

impl ProgressCalculator {
    /// A group is complete when every listed language has a non-empty
    /// trimmed value. An empty language list makes every group complete.
    pub fn is_item_complete<S: AsRef<str>>(group: &TranslationGroup, language_codes: &[S]) -> bool {
        language_codes
            .iter()
            .all(|code| is_value_complete(group.value(code.as_ref())))
    }

    /// Compute overall and per-language completion.
    ///
    /// # Arguments
    /// * `groups` - The translation groups of a project
    /// * `language_codes` - The languages currently configured on the project
    ///
    /// # Returns
    /// A [`ProgressReport`]; every percentage is 0 when there are no groups.
    pub fn calculate<S: AsRef<str>>(
        groups: &[TranslationGroup],
        language_codes: &[S],
    ) -> ProgressReport {
        let total = groups.len();

        let by_language = language_codes
            .iter()
            .map(|code| {
                let code = code.as_ref();
                let completed = groups
                    .iter()
                    .filter(|group| is_value_complete(group.value(code)))
                    .count();
                (code.to_string(), percentage(completed, total))
            })
            .collect();

        let fully_translated = groups
            .iter()
            .filter(|group| Self::is_item_complete(group, language_codes))
            .count();

        ProgressReport {
            overall: percentage(fully_translated, total),
            by_language,
        }
    }

    /// Groups that are missing a value in at least one language.
    pub fn get_incomplete_items<'a, S: AsRef<str>>(
        groups: &'a [TranslationGroup],
        language_codes: &[S],
    ) -> Vec<&'a TranslationGroup> {
        groups
            .iter()
            .filter(|group| !Self::is_item_complete(group, language_codes))
            .collect()
    }

    /// Completion counts for a single language.
    pub fn language_stats(groups: &[TranslationGroup], language_code: &str) -> LanguageStats {
        let total = groups.len();
        let completed = groups
            .iter()
            .filter(|group| is_value_complete(group.value(language_code)))
            .count();

        LanguageStats {
            completed,
            total,
            percentage: percentage(completed, total),
        }
    }
}

/// `round(100 * part / total)` with halves rounded up, 0 for an empty total.
fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * part + total) / (2 * total)) as u32
}
