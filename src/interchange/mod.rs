//! Interchange formats for importing and exporting project translations.
//!
//! Two payload formats are understood:
//!
//! - **CSV**: a `Key` column followed by one column per language code.
//! - **JSON**: either a full export bundle (`project`, `languages`,
//!   `translations`, `exportTime`) or a bare `{key: {language: value}}` map.
//!
//! Parsing produces a [`ParsedPayload`]; [`ProjectInfo::infer`] turns it into
//! the name, description and language list of the project to create.
//! Rendering goes the other way, from a [`CanonicalMap`] to file contents.

pub mod csv;
pub mod json;

use crate::model::CanonicalMap;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

pub use self::csv::{parse_csv, render_csv};
pub use self::json::{parse_json, render_json_bundle, render_language_json, ExportBundle};

/// Name used when neither the payload nor the file name provides one
pub const FALLBACK_PROJECT_NAME: &str = "Imported Project";

/// Why an import payload was rejected.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("CSV file is empty")]
    EmptyCsv,

    #[error("CSV header must start with a 'Key' column, found '{0}'")]
    BadHeader(String),

    #[error("CSV header has no language columns")]
    NoLanguageColumns,

    #[error("CSV header column {column} has an empty language code")]
    EmptyLanguageCode { column: usize },

    #[error("language '{0}' appears more than once in the CSV header")]
    DuplicateLanguage(String),

    #[error("line {line}: expected {expected} fields, found {found}")]
    RowWidth {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: quoted field is never closed")]
    UnterminatedQuote { line: usize },

    #[error("line {line}: unexpected quote inside an unquoted field")]
    StrayQuote { line: usize },

    #[error("line {line}: key is empty")]
    EmptyKey { line: usize },

    #[error("key '{0}' appears more than once")]
    DuplicateKey(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON payload must be an object")]
    NotAnObject,

    #[error("translations for key '{0}' must be an object of language values")]
    KeyNotObject(String),

    #[error("value of key '{key}' for language '{language}' must be a string")]
    ValueNotString { key: String, language: String },

    #[error("JSON member '{0}' has the wrong shape")]
    BadSection(&'static str),
}

/// Payload format of an import file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    Csv,
    Json,
}

impl PayloadFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Guess the format from content: an opening brace means JSON.
    pub fn sniff(content: &str) -> Self {
        if strip_bom(content).trim_start().starts_with('{') {
            Self::Json
        } else {
            Self::Csv
        }
    }

    /// Extension first, content second.
    pub fn detect(path: Option<&Path>, content: &str) -> Self {
        path.and_then(Self::from_path)
            .unwrap_or_else(|| Self::sniff(content))
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Project metadata carried by a full JSON bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadProject {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Result of parsing an import payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPayload {
    pub format: PayloadFormat,
    pub project: Option<PayloadProject>,
    /// Languages named by the payload itself (CSV header or bundle
    /// `languages`), in payload order
    pub declared_languages: Option<Vec<String>>,
    pub translations: CanonicalMap,
}

impl ParsedPayload {
    /// Sorted union of the language codes used by any key.
    pub fn used_languages(&self) -> Vec<String> {
        self.translations
            .values()
            .flat_map(|values| values.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Parse a payload in the given format.
pub fn parse_payload(content: &str, format: PayloadFormat) -> Result<ParsedPayload, ParseError> {
    match format {
        PayloadFormat::Csv => parse_csv(content),
        PayloadFormat::Json => parse_json(content),
    }
}

/// What an import will create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    pub name: String,
    pub description: Option<String>,
    pub languages: Vec<String>,
}

impl ProjectInfo {
    /// Infer project metadata from a parsed payload.
    ///
    /// # Arguments
    /// * `payload` - Parsed import data
    /// * `source_name` - File name (or path) the payload was read from, if any
    ///
    /// # Returns
    /// The bundle's project name when present and non-blank, otherwise the
    /// source file stem, otherwise [`FALLBACK_PROJECT_NAME`]. Languages come
    /// from the payload's declaration, or from the keys when it has none.
    pub fn infer(payload: &ParsedPayload, source_name: Option<&str>) -> Self {
        let bundle_name = payload
            .project
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty());

        let stem = source_name
            .and_then(|source| Path::new(source).file_stem())
            .and_then(|stem| stem.to_str())
            .map(str::trim)
            .filter(|stem| !stem.is_empty());

        let name = bundle_name
            .or(stem)
            .unwrap_or(FALLBACK_PROJECT_NAME)
            .to_string();

        let description = payload
            .project
            .as_ref()
            .and_then(|p| p.description.clone())
            .filter(|d| !d.trim().is_empty());

        let languages = match &payload.declared_languages {
            Some(declared) if !declared.is_empty() => declared.clone(),
            _ => payload.used_languages(),
        };

        Self {
            name,
            description,
            languages,
        }
    }
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `<name>_translations[_<suffix>]_<YYYY-MM-DD>.<ext>`
pub fn generate_file_name(
    project_name: &str,
    extension: &str,
    suffix: Option<&str>,
    date: NaiveDate,
) -> String {
    let suffix = suffix.map(|s| format!("_{}", s)).unwrap_or_default();
    format!(
        "{}_translations{}_{}.{}",
        sanitize_file_name(project_name),
        suffix,
        date.format("%Y-%m-%d"),
        extension
    )
}

pub(crate) fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{FEFF}').unwrap_or(content)
}
