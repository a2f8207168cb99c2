//! Substring search over translation groups.

use crate::model::TranslationGroup;
use regex::RegexBuilder;
use std::borrow::Cow;

pub struct SearchFilter;

impl SearchFilter {
    /// Keep groups whose key or any listed language value contains `term`,
    /// ignoring case.
    ///
    /// A blank term returns the input slice itself (borrowed, not copied).
    pub fn filter<'a, S: AsRef<str>>(
        groups: &'a [TranslationGroup],
        term: &str,
        language_codes: &[S],
    ) -> Cow<'a, [TranslationGroup]> {
        if term.trim().is_empty() {
            return Cow::Borrowed(groups);
        }

        let needle = term.to_lowercase();

        let matches = groups
            .iter()
            .filter(|group| {
                group.key.to_lowercase().contains(&needle)
                    || language_codes
                        .iter()
                        .any(|code| group.value(code.as_ref()).to_lowercase().contains(&needle))
            })
            .cloned()
            .collect::<Vec<_>>();

        Cow::Owned(matches)
    }

    /// Wrap every case-insensitive occurrence of `term` in `<mark>` tags.
    ///
    /// The term is matched literally; regex metacharacters have no effect.
    pub fn highlight(text: &str, term: &str) -> String {
        if term.trim().is_empty() {
            return text.to_string();
        }

        match RegexBuilder::new(&regex::escape(term))
            .case_insensitive(true)
            .build()
        {
            Ok(regex) => regex.replace_all(text, "<mark>$0</mark>").into_owned(),
            Err(_) => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<TranslationGroup> {
        vec![
            TranslationGroup::empty("home.title", 2, &["en", "ja"])
                .with_value("en", "Welcome")
                .with_value("ja", "ようこそ"),
            TranslationGroup::empty("home.body", 1, &["en", "ja"]).with_value("en", "Hello World"),
            TranslationGroup::empty("settings.save", 3, &["en", "ja"]).with_value("en", "Save"),
        ]
    }

    #[test]
    fn test_blank_term_borrows_input() {
        let groups = sample();
        let result = SearchFilter::filter(&groups, "   ", &["en"]);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert!(std::ptr::eq(result.as_ptr(), groups.as_ptr()));
    }

    #[test]
    fn test_matches_key_case_insensitively() {
        let groups = sample();
        let result = SearchFilter::filter(&groups, "HOME", &["en"]);
        let keys: Vec<_> = result.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["home.title", "home.body"]);
    }

    #[test]
    fn test_matches_any_language_value() {
        let groups = sample();
        let result = SearchFilter::filter(&groups, "world", &["en", "ja"]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].key, "home.body");

        let result = SearchFilter::filter(&groups, "ようこそ", &["en", "ja"]);
        assert_eq!(result[0].key, "home.title");
    }

    #[test]
    fn test_only_listed_languages_are_searched() {
        let groups = sample();
        let result = SearchFilter::filter(&groups, "ようこそ", &["en"]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_highlight() {
        assert_eq!(
            SearchFilter::highlight("Save and save", "save"),
            "<mark>Save</mark> and <mark>save</mark>"
        );
        assert_eq!(SearchFilter::highlight("a.b", "."), "a<mark>.</mark>b");
        assert_eq!(SearchFilter::highlight("abc", " "), "abc");
    }
}
