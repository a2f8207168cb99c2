//! Domain records shared by the store, the aggregation helpers and the
//! import/export layers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `{key: {language: value}}`, ordered by key then language code.
///
/// This is the interchange shape between parsing, storage import and export
/// rendering.
pub type CanonicalMap = BTreeMap<String, BTreeMap<String, String>>;

/// A translation project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Language codes in the order they were selected
    pub languages: Vec<String>,
    pub is_completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Project {
    /// Compact view used when reporting a name collision.
    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            language_count: self.languages.len(),
        }
    }

    pub fn has_language(&self, code: &str) -> bool {
        self.languages.iter().any(|c| c == code)
    }
}

/// What a caller needs to decide whether to overwrite an existing project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub language_count: usize,
}

/// A language known to the installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedLanguage {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: String,
}

/// One stored (project, key, language) row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationEntry {
    pub project_id: i64,
    pub key: String,
    pub language: String,
    pub value: String,
    pub is_completed: bool,
    pub sort_order: i64,
}

impl TranslationEntry {
    /// Build a row whose completion flag follows its value.
    pub fn new(
        project_id: i64,
        key: impl Into<String>,
        language: impl Into<String>,
        value: impl Into<String>,
        sort_order: i64,
    ) -> Self {
        let value = value.into();
        Self {
            project_id,
            key: key.into(),
            language: language.into(),
            is_completed: is_value_complete(&value),
            value,
            sort_order,
        }
    }
}

/// A single language cell of a [`TranslationGroup`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub value: String,
    pub is_completed: bool,
}

impl Cell {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            is_completed: is_value_complete(&value),
            value,
        }
    }
}

/// All rows sharing one key within a project.
///
/// Cells are keyed by language code, so iteration is always code-ascending
/// regardless of how the groups themselves are ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationGroup {
    pub key: String,
    pub sort_order: i64,
    pub cells: BTreeMap<String, Cell>,
}

impl TranslationGroup {
    /// A group with an empty cell for every language.
    pub fn empty<S: AsRef<str>>(key: impl Into<String>, sort_order: i64, languages: &[S]) -> Self {
        Self {
            key: key.into(),
            sort_order,
            cells: languages
                .iter()
                .map(|code| (code.as_ref().to_string(), Cell::default()))
                .collect(),
        }
    }

    /// Builder used mostly by tests and the importer.
    pub fn with_value(mut self, language: impl Into<String>, value: impl Into<String>) -> Self {
        self.cells.insert(language.into(), Cell::new(value));
        self
    }

    /// Value for a language; missing cells read as empty.
    pub fn value(&self, language: &str) -> &str {
        self.cells
            .get(language)
            .map(|cell| cell.value.as_str())
            .unwrap_or("")
    }

    /// Overwrite a cell, keeping the completion flag in step with the value.
    pub fn set_value(&mut self, language: &str, value: impl Into<String>) {
        self.cells.insert(language.to_string(), Cell::new(value));
    }
}

/// A cell is complete when its trimmed value is non-empty.
pub fn is_value_complete(value: &str) -> bool {
    !value.trim().is_empty()
}
