use crate::i18n::{SortOption, ValidationOptions, DEFAULT_SIMILARITY_THRESHOLD};
use anyhow::{anyhow, bail, Context, Result};

const DEFAULT_DATABASE_URL: &str = "sqlite:i18napp.db";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // Storage
    pub database_url: String,

    // Listing
    pub default_sort: SortOption,

    // Key validation
    pub key_case_sensitive: bool,
    pub key_check_namespace: bool,
    pub key_check_similarity: bool,
    pub key_similarity_threshold: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let key_similarity_threshold = match std::env::var("KEY_SIMILARITY_THRESHOLD") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .with_context(|| format!("KEY_SIMILARITY_THRESHOLD is not a number: '{}'", raw))?,
            Err(_) => DEFAULT_SIMILARITY_THRESHOLD,
        };
        if !(key_similarity_threshold > 0.0 && key_similarity_threshold <= 1.0) {
            bail!(
                "KEY_SIMILARITY_THRESHOLD must be within (0, 1], got {}",
                key_similarity_threshold
            );
        }

        Ok(Self {
            // Storage
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),

            // Listing
            default_sort: match std::env::var("DEFAULT_SORT") {
                Ok(raw) => raw
                    .parse()
                    .map_err(|e: String| anyhow!(e))
                    .context("DEFAULT_SORT is invalid")?,
                Err(_) => SortOption::default(),
            },

            // Key validation
            key_case_sensitive: env_flag("KEY_CASE_SENSITIVE", true)?,
            key_check_namespace: env_flag("KEY_CHECK_NAMESPACE", true)?,
            key_check_similarity: env_flag("KEY_CHECK_SIMILARITY", false)?,
            key_similarity_threshold,
        })
    }

    /// Options handed to the key validator.
    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            case_sensitive: self.key_case_sensitive,
            check_similarity: self.key_check_similarity,
            similarity_threshold: self.key_similarity_threshold,
            check_namespace_conflict: self.key_check_namespace,
        }
    }
}

fn env_flag(name: &str, default: bool) -> Result<bool> {
    match std::env::var(name) {
        Ok(raw) => parse_flag(&raw).with_context(|| format!("{} must be a boolean", name)),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognized boolean '{}'", other),
    }
}
