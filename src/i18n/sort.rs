//! Ordering strategies for translation groups.

use crate::model::TranslationGroup;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// How groups are listed.
///
/// Time ordering uses the shared `sort_order` of a key, which grows by one
/// for every key created in a project. Key ordering compares bytes, like
/// SQLite's default collation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    /// Newest first
    #[default]
    TimeDesc,
    /// Oldest first
    TimeAsc,
    KeyAsc,
    KeyDesc,
}

impl SortOption {
    pub const ALL: [SortOption; 4] = [
        SortOption::TimeDesc,
        SortOption::TimeAsc,
        SortOption::KeyAsc,
        SortOption::KeyDesc,
    ];

    /// `ORDER BY` body for the translations table. Fixed strings only.
    pub fn order_by_clause(self) -> &'static str {
        match self {
            SortOption::TimeDesc => "sort_order DESC, key ASC",
            SortOption::TimeAsc => "sort_order ASC, key ASC",
            SortOption::KeyAsc => "key ASC",
            SortOption::KeyDesc => "key DESC",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOption::TimeDesc => "time_desc",
            SortOption::TimeAsc => "time_asc",
            SortOption::KeyAsc => "key_asc",
            SortOption::KeyDesc => "key_desc",
        }
    }

    /// Comparator matching [`SortOption::order_by_clause`].
    pub fn compare(self, a: &TranslationGroup, b: &TranslationGroup) -> Ordering {
        let by_key = || a.key.as_bytes().cmp(b.key.as_bytes());
        match self {
            SortOption::TimeDesc => b.sort_order.cmp(&a.sort_order).then_with(by_key),
            SortOption::TimeAsc => a.sort_order.cmp(&b.sort_order).then_with(by_key),
            SortOption::KeyAsc => by_key(),
            SortOption::KeyDesc => by_key().reverse(),
        }
    }

    /// Sort groups in place.
    pub fn sort_groups(self, groups: &mut [TranslationGroup]) {
        groups.sort_by(|a, b| self.compare(a, b));
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOption::ALL
            .into_iter()
            .find(|option| option.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown sort option '{}', expected one of time_desc, time_asc, key_asc, key_desc",
                    s
                )
            })
    }
}
