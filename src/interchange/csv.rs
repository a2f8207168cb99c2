//! CSV codec: `Key,<lang>,<lang>...` tables with RFC 4180 quoting.

use super::{strip_bom, ParseError, ParsedPayload, PayloadFormat};
use crate::model::CanonicalMap;
use std::collections::HashSet;
use std::iter::Peekable;
use std::str::Chars;

const KEY_COLUMN: &str = "Key";

/// One physical record and the line it started on (1-based).
#[derive(Debug)]
struct Record {
    line: usize,
    fields: Vec<String>,
}

struct Reader<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Reader<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
        }
    }

    /// Next non-blank record, or `None` at end of input.
    fn next_record(&mut self) -> Result<Option<Record>, ParseError> {
        loop {
            if self.chars.peek().is_none() {
                return Ok(None);
            }

            let start = self.line;
            let (fields, quoted) = self.read_fields()?;

            let blank = !quoted && fields.len() == 1 && fields[0].trim().is_empty();
            if !blank {
                return Ok(Some(Record {
                    line: start,
                    fields,
                }));
            }
        }
    }

    /// Read fields up to the end of the current record.
    ///
    /// Also reports whether any field was quoted, so `""` is not mistaken
    /// for a blank line.
    fn read_fields(&mut self) -> Result<(Vec<String>, bool), ParseError> {
        let start = self.line;
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut any_quoted = false;
        let mut in_quotes = false;
        // Set after a closing quote until the next separator
        let mut closed = false;

        while let Some(c) = self.chars.next() {
            if in_quotes {
                match c {
                    '"' if self.chars.peek() == Some(&'"') => {
                        self.chars.next();
                        field.push('"');
                    }
                    '"' => {
                        in_quotes = false;
                        closed = true;
                    }
                    '\n' => {
                        self.line += 1;
                        field.push(c);
                    }
                    _ => field.push(c),
                }
                continue;
            }

            match c {
                '"' if field.is_empty() && !closed => {
                    in_quotes = true;
                    any_quoted = true;
                }
                '"' => return Err(ParseError::StrayQuote { line: self.line }),
                ',' => {
                    fields.push(std::mem::take(&mut field));
                    closed = false;
                }
                '\r' | '\n' => {
                    if c == '\r' && self.chars.peek() == Some(&'\n') {
                        self.chars.next();
                    }
                    self.line += 1;
                    fields.push(field);
                    return Ok((fields, any_quoted));
                }
                _ if closed => return Err(ParseError::StrayQuote { line: self.line }),
                _ => field.push(c),
            }
        }

        if in_quotes {
            return Err(ParseError::UnterminatedQuote { line: start });
        }

        fields.push(field);
        Ok((fields, any_quoted))
    }
}

/// Parse a CSV table into a payload.
///
/// The header names the language columns; each following row is a key and
/// one value per language. Values are kept verbatim, keys are trimmed.
pub fn parse_csv(content: &str) -> Result<ParsedPayload, ParseError> {
    let mut reader = Reader::new(strip_bom(content));

    let header = reader.next_record()?.ok_or(ParseError::EmptyCsv)?;
    let first = header.fields[0].trim();
    if first != KEY_COLUMN {
        return Err(ParseError::BadHeader(first.to_string()));
    }

    let languages: Vec<String> = header.fields[1..]
        .iter()
        .map(|code| code.trim().to_string())
        .collect();
    if languages.is_empty() {
        return Err(ParseError::NoLanguageColumns);
    }

    let mut seen = HashSet::new();
    for (index, code) in languages.iter().enumerate() {
        if code.is_empty() {
            return Err(ParseError::EmptyLanguageCode { column: index + 2 });
        }
        if !seen.insert(code.as_str()) {
            return Err(ParseError::DuplicateLanguage(code.clone()));
        }
    }

    let width = header.fields.len();
    let mut translations = CanonicalMap::new();

    while let Some(record) = reader.next_record()? {
        if record.fields.len() != width {
            return Err(ParseError::RowWidth {
                line: record.line,
                expected: width,
                found: record.fields.len(),
            });
        }

        let mut fields = record.fields.into_iter();
        let key = fields.next().unwrap_or_default().trim().to_string();
        if key.is_empty() {
            return Err(ParseError::EmptyKey { line: record.line });
        }
        if translations.contains_key(&key) {
            return Err(ParseError::DuplicateKey(key));
        }

        let values = languages.iter().cloned().zip(fields).collect();
        translations.insert(key, values);
    }

    Ok(ParsedPayload {
        format: PayloadFormat::Csv,
        project: None,
        declared_languages: Some(languages),
        translations,
    })
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

/// Render a table with a BOM, a bare `Key,<codes>` header and one quoted row per key.
///
/// Missing values are written as empty cells.
pub fn render_csv<S: AsRef<str>>(languages: &[S], translations: &CanonicalMap) -> String {
    let mut lines = Vec::with_capacity(translations.len() + 1);

    let header = std::iter::once(KEY_COLUMN)
        .chain(languages.iter().map(AsRef::as_ref))
        .collect::<Vec<_>>()
        .join(",");
    lines.push(header);

    for (key, values) in translations {
        let row = std::iter::once(key.as_str())
            .chain(languages.iter().map(|code| {
                values
                    .get(code.as_ref())
                    .map(String::as_str)
                    .unwrap_or("")
            }))
            .map(quote)
            .collect::<Vec<_>>()
            .join(",");
        lines.push(row);
    }

    format!("\u{FEFF}{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(payload: &'a ParsedPayload, key: &str, lang: &str) -> &'a str {
        payload.translations[key][lang].as_str()
    }

    // ==================== Parsing Tests ====================

    #[test]
    fn test_parse_simple_table() {
        let payload = parse_csv("Key,en,ja\nhome,Home,ホーム\nsave,Save,\n").expect("Should parse");

        assert_eq!(payload.format, PayloadFormat::Csv);
        assert_eq!(
            payload.declared_languages,
            Some(vec!["en".to_string(), "ja".to_string()])
        );
        assert_eq!(value(&payload, "home", "ja"), "ホーム");
        assert_eq!(value(&payload, "save", "ja"), "");
    }

    #[test]
    fn test_parse_bom_crlf_and_blank_lines() {
        let payload =
            parse_csv("\u{FEFF}Key,en\r\n\r\nhome,Home\r\n\r\n").expect("Should parse");
        assert_eq!(payload.translations.len(), 1);
        assert_eq!(value(&payload, "home", "en"), "Home");
    }

    #[test]
    fn test_parse_quoted_fields() {
        let input = "\"Key\",\"en\"\n\"greeting\",\"Say \"\"hi\"\", then\nwave\"\n";
        let payload = parse_csv(input).expect("Should parse");
        assert_eq!(value(&payload, "greeting", "en"), "Say \"hi\", then\nwave");
    }

    #[test]
    fn test_quoted_empty_row_is_not_blank() {
        let err = parse_csv("Key,en\n\"\"\n").expect_err("Should reject");
        assert!(matches!(err, ParseError::RowWidth { line: 2, .. }));
    }

    // ==================== Rejection Tests ====================

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse_csv(""), Err(ParseError::EmptyCsv)));
        assert!(matches!(parse_csv("\u{FEFF}\n\n"), Err(ParseError::EmptyCsv)));
    }

    #[test]
    fn test_bad_header() {
        assert!(matches!(parse_csv("key,en\n"), Err(ParseError::BadHeader(h)) if h == "key"));
        assert!(matches!(parse_csv("Key\n"), Err(ParseError::NoLanguageColumns)));
        assert!(matches!(
            parse_csv("Key,en,\n"),
            Err(ParseError::EmptyLanguageCode { column: 3 })
        ));
        assert!(matches!(
            parse_csv("Key,en,en\n"),
            Err(ParseError::DuplicateLanguage(code)) if code == "en"
        ));
    }

    #[test]
    fn test_row_width_mismatch() {
        let err = parse_csv("Key,en,ja\nhome,Home\n").expect_err("Should reject");
        assert!(matches!(
            err,
            ParseError::RowWidth {
                line: 2,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn test_empty_and_duplicate_keys() {
        assert!(matches!(
            parse_csv("Key,en\n ,x\n"),
            Err(ParseError::EmptyKey { line: 2 })
        ));
        assert!(matches!(
            parse_csv("Key,en\na,1\na,2\n"),
            Err(ParseError::DuplicateKey(k)) if k == "a"
        ));
    }

    #[test]
    fn test_quote_errors() {
        assert!(matches!(
            parse_csv("Key,en\na,\"open\n"),
            Err(ParseError::UnterminatedQuote { line: 2 })
        ));
        assert!(matches!(
            parse_csv("Key,en\na,b\"c\n"),
            Err(ParseError::StrayQuote { line: 2 })
        ));
        assert!(matches!(
            parse_csv("Key,en\na,\"b\"c\n"),
            Err(ParseError::StrayQuote { line: 2 })
        ));
    }

    #[test]
    fn test_error_line_counts_embedded_newlines() {
        let err = parse_csv("Key,en\na,\"x\ny\"\nb\n").expect_err("Should reject");
        assert!(matches!(err, ParseError::RowWidth { line: 4, .. }));
    }

    // ==================== Rendering Tests ====================

    #[test]
    fn test_render_csv() {
        let mut map = CanonicalMap::new();
        map.entry("home".to_string())
            .or_default()
            .insert("en".to_string(), "Say \"hi\"".to_string());

        let csv = render_csv(&["en", "ja"], &map);
        assert_eq!(
            csv,
            "\u{FEFF}Key,en,ja\n\"home\",\"Say \"\"hi\"\"\",\"\""
        );
    }

    #[test]
    fn test_render_csv_header_is_unquoted() {
        let mut map = CanonicalMap::new();
        map.entry("home".to_string())
            .or_default()
            .insert("en".to_string(), "Home".to_string());

        let csv = render_csv(&["en", "fr"], &map);
        assert!(csv.starts_with("\u{FEFF}Key,en,fr\n"));
        assert!(csv.ends_with("\"home\",\"Home\",\"\""));
    }

    #[test]
    fn test_render_then_parse() {
        let mut map = CanonicalMap::new();
        let values = map.entry("menu.file".to_string()).or_default();
        values.insert("en".to_string(), "File, \"Open\"\nSave".to_string());
        values.insert("ja".to_string(), String::new());

        let parsed = parse_csv(&render_csv(&["en", "ja"], &map)).expect("Should parse");
        assert_eq!(parsed.translations, map);
    }
}
