//! JSON codec: full export bundles, bare key maps and per-language files.

use super::{strip_bom, ParseError, ParsedPayload, PayloadFormat, PayloadProject};
use crate::model::CanonicalMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Project section of an [`ExportBundle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleProject {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleLanguage {
    pub code: String,
    pub name: String,
}

/// Everything needed to recreate a project elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub project: BundleProject,
    pub languages: Vec<BundleLanguage>,
    pub translations: CanonicalMap,
    #[serde(rename = "exportTime")]
    pub export_time: String,
}

/// Parse either a full bundle or a bare `{key: {language: value}}` map.
///
/// An object with a `translations` member is treated as a bundle; its
/// `project` and `languages` members are optional and anything else is
/// ignored.
pub fn parse_json(content: &str) -> Result<ParsedPayload, ParseError> {
    let root: Value = serde_json::from_str(strip_bom(content))?;
    let Value::Object(mut root) = root else {
        return Err(ParseError::NotAnObject);
    };

    let Some(translations) = root.remove("translations") else {
        return Ok(ParsedPayload {
            format: PayloadFormat::Json,
            project: None,
            declared_languages: None,
            translations: parse_translations(root)?,
        });
    };

    let Value::Object(translations) = translations else {
        return Err(ParseError::BadSection("translations"));
    };

    let project = root.remove("project").map(parse_project).transpose()?;
    let declared_languages = root
        .remove("languages")
        .map(parse_languages)
        .transpose()?;

    Ok(ParsedPayload {
        format: PayloadFormat::Json,
        project,
        declared_languages,
        translations: parse_translations(translations)?,
    })
}

fn parse_translations(section: Map<String, Value>) -> Result<CanonicalMap, ParseError> {
    let mut translations = CanonicalMap::new();

    for (key, values) in section {
        let Value::Object(values) = values else {
            return Err(ParseError::KeyNotObject(key));
        };

        let mut row = BTreeMap::new();
        for (language, value) in values {
            match value {
                Value::String(text) => {
                    row.insert(language, text);
                }
                _ => return Err(ParseError::ValueNotString { key, language }),
            }
        }

        translations.insert(key, row);
    }

    Ok(translations)
}

fn parse_project(section: Value) -> Result<PayloadProject, ParseError> {
    let Value::Object(section) = section else {
        return Err(ParseError::BadSection("project"));
    };

    let text = |field: &str| -> Result<Option<String>, ParseError> {
        match section.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ParseError::BadSection("project")),
        }
    };

    Ok(PayloadProject {
        name: text("name")?,
        description: text("description")?,
    })
}

/// Accepts `[{"code": "en", ...}]` as well as `["en"]`.
fn parse_languages(section: Value) -> Result<Vec<String>, ParseError> {
    let Value::Array(items) = section else {
        return Err(ParseError::BadSection("languages"));
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(code) => Ok(code),
            Value::Object(mut language) => match language.remove("code") {
                Some(Value::String(code)) => Ok(code),
                _ => Err(ParseError::BadSection("languages")),
            },
            _ => Err(ParseError::BadSection("languages")),
        })
        .filter(|code| !matches!(code, Ok(c) if c.trim().is_empty()))
        .collect()
}

/// Pretty-printed bundle.
pub fn render_json_bundle(bundle: &ExportBundle) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(bundle)
}

/// Flat `{key: value}` for one language, skipping empty values.
pub fn render_language_json(
    translations: &CanonicalMap,
    language: &str,
) -> Result<String, serde_json::Error> {
    let flat: BTreeMap<&str, &str> = translations
        .iter()
        .filter_map(|(key, values)| {
            values
                .get(language)
                .filter(|value| !value.is_empty())
                .map(|value| (key.as_str(), value.as_str()))
        })
        .collect();

    serde_json::to_string_pretty(&flat)
}
