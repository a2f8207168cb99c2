//! Language registry: the languages every new database starts with.
//!
//! The registry is a process-wide, immutable list initialized once with
//! `OnceLock`. The database seeds its `supported_languages` table from it;
//! after that the table is the source of truth (languages can be added or
//! deactivated at runtime).

use std::sync::OnceLock;

/// A language shipped with the application.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Language tag (e.g., "en", "zh-Hans")
    pub code: &'static str,

    /// Display name (e.g., "English")
    pub name: &'static str,
}

/// Global language registry singleton.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

/// Global registry instance (initialized lazily)
static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// All default languages, in seeding order.
    pub fn list_all(&self) -> &[LanguageConfig] {
        &self.languages
    }
}

/// Default language configurations.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "zh-Hans",
            name: "Chinese (Simplified)",
        },
        LanguageConfig {
            code: "zh-Hant",
            name: "Chinese (Traditional)",
        },
        LanguageConfig {
            code: "en",
            name: "English",
        },
        LanguageConfig {
            code: "ja",
            name: "Japanese",
        },
        LanguageConfig {
            code: "ko",
            name: "Korean",
        },
        LanguageConfig {
            code: "tr",
            name: "Turkish",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LanguageRegistry::get();
        let registry2 = LanguageRegistry::get();

        // Should return the same instance (same memory address)
        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_codes_and_names_are_unique() {
        let all = LanguageRegistry::get().list_all();
        let codes: std::collections::HashSet<_> = all.iter().map(|l| l.code).collect();
        let names: std::collections::HashSet<_> = all.iter().map(|l| l.name).collect();
        assert_eq!(codes.len(), all.len());
        assert_eq!(names.len(), all.len());
        assert_eq!(all.len(), 6);
    }
}
