//! Translation key management for multilingual projects.
//!
//! A project declares its languages and a set of string keys; every
//! (key, language) pair holds a value and a completion flag. On top of the
//! SQLite store sit key validation, progress aggregation and CSV/JSON
//! import/export.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod files;
pub mod i18n;
pub mod import;
pub mod interchange;
pub mod model;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::TranslationStore;
