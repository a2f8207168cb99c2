//! Pure translation-key logic: validation, progress, search and ordering.
//!
//! Nothing in this module touches storage; every function works on
//! in-memory keys and [`TranslationGroup`](crate::model::TranslationGroup)s
//! and is safe to call on every keystroke (except the similarity check,
//! which callers should reserve for commit time).
//!
//! # Architecture
//!
//! - `validator`: key format, duplicate, namespace and similarity checks
//! - `progress`: per-language and overall completion percentages
//! - `search`: case-insensitive substring filtering and highlighting
//! - `sort`: the four group orderings shared with SQL queries
//! - `registry`: the languages seeded into a fresh database
//!
//! # Example
//!
//! ```rust,ignore
//! use translation_keystore::i18n::{KeyValidator, ValidationOptions};
//!
//! let result = KeyValidator::validate_complete("home.title", &existing, &ValidationOptions::default());
//! if !result.is_valid {
//!     println!("{}", result.message.unwrap_or_default());
//! }
//! ```

mod progress;
mod registry;
mod search;
mod sort;
mod validator;

pub use progress::{LanguageStats, ProgressCalculator, ProgressReport};
pub use registry::{LanguageConfig, LanguageRegistry};
pub use search::SearchFilter;
pub use sort::SortOption;
pub use validator::{
    CommonValidator, KeyFormatError, KeyValidator, SimilarityCheck, ValidationOptions,
    ValidationResult, DEFAULT_SIMILARITY_THRESHOLD,
};
