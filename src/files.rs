//! File access for import and export.
//!
//! Picking a file is a host concern (a dialog in a desktop shell, a flag on
//! the command line), so the import and export layers only see the
//! [`FileAccess`] trait. A picker returning `None` means the user cancelled.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A named group of file extensions offered by a picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFilter {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

impl FileFilter {
    pub const JSON: FileFilter = FileFilter {
        name: "JSON",
        extensions: &["json"],
    };

    pub const CSV: FileFilter = FileFilter {
        name: "CSV",
        extensions: &["csv"],
    };

    /// Formats accepted by the importer
    pub const IMPORT: [FileFilter; 2] = [FileFilter::JSON, FileFilter::CSV];

    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

/// Host file services.
///
/// All methods are async so implementations can wait on a dialog or a slow
/// disk without blocking the runtime.
#[async_trait]
pub trait FileAccess: Send + Sync {
    /// Ask where to save a file.
    ///
    /// # Arguments
    /// * `title` - Dialog title
    /// * `default_name` - Suggested file name
    /// * `filter` - The format being written
    ///
    /// # Returns
    /// * `Some(path)` - Target chosen
    /// * `None` - User cancelled
    async fn pick_save_target(
        &self,
        title: &str,
        default_name: &str,
        filter: FileFilter,
    ) -> Option<PathBuf>;

    /// Ask which file to open. `None` means cancelled.
    async fn pick_open_target(&self, title: &str, filters: &[FileFilter]) -> Option<PathBuf>;

    /// Ask for an output directory. `None` means cancelled.
    async fn pick_directory(&self, title: &str) -> Option<PathBuf>;

    async fn read_text(&self, path: &Path) -> StoreResult<String>;

    async fn write_text(&self, path: &Path, content: &str) -> StoreResult<()>;
}

/// Answers pickers from paths fixed up front, e.g. command-line flags.
///
/// A save target that is an existing directory receives the suggested
/// file name.
#[derive(Debug, Clone, Default)]
pub struct PresetFileAccess {
    open: Option<PathBuf>,
    save: Option<PathBuf>,
    directory: Option<PathBuf>,
}

impl PresetFileAccess {
    /// Every picker reports cancellation.
    pub fn cancelled() -> Self {
        Self::default()
    }

    pub fn opening(path: impl Into<PathBuf>) -> Self {
        Self {
            open: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn saving_to(path: impl Into<PathBuf>) -> Self {
        Self {
            save: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }
}

#[async_trait]
impl FileAccess for PresetFileAccess {
    async fn pick_save_target(
        &self,
        _title: &str,
        default_name: &str,
        _filter: FileFilter,
    ) -> Option<PathBuf> {
        let target = self.save.as_ref()?;

        let is_dir = tokio::fs::metadata(target)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);

        if is_dir {
            Some(target.join(default_name))
        } else {
            Some(target.clone())
        }
    }

    async fn pick_open_target(&self, _title: &str, _filters: &[FileFilter]) -> Option<PathBuf> {
        self.open.clone()
    }

    async fn pick_directory(&self, _title: &str) -> Option<PathBuf> {
        self.directory.clone().or_else(|| self.save.clone())
    }

    async fn read_text(&self, path: &Path) -> StoreResult<String> {
        debug!("Reading {}", path.display());
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::io(path, e))
    }

    async fn write_text(&self, path: &Path, content: &str) -> StoreResult<()> {
        debug!("Writing {} bytes to {}", content.len(), path.display());
        tokio::fs::write(path, content)
            .await
            .map_err(|e| StoreError::io(path, e))
    }
}
