//! Writing projects out as JSON bundles, CSV tables or per-language files.

use crate::error::{StoreError, StoreResult};
use crate::files::{FileAccess, FileFilter};
use crate::i18n::SortOption;
use crate::interchange::json::{BundleLanguage, BundleProject};
use crate::interchange::{
    generate_file_name, render_csv, render_json_bundle, render_language_json, ExportBundle,
};
use crate::model::CanonicalMap;
use crate::store::{ProjectBundle, TranslationStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Records kept by [`ExportHistory`]
pub const MAX_HISTORY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    /// Full bundle with project metadata
    ProjectJson,
    Csv,
    /// Flat `{key: value}` file for one language
    LanguageJson,
}

impl ExportKind {
    /// Title of the save dialog for this kind of export.
    pub fn dialog_title(self) -> &'static str {
        match self {
            ExportKind::ProjectJson => "Export JSON file",
            ExportKind::Csv => "Export CSV file",
            ExportKind::LanguageJson => "Export language file",
        }
    }
}

/// Title of the directory dialog used by [`Exporter::export_all_languages`]
pub const EXPORT_DIRECTORY_TITLE: &str = "Choose export directory";

/// One successful export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRecord {
    pub project_id: i64,
    pub project_name: String,
    pub kind: ExportKind,
    pub language: Option<String>,
    pub path: PathBuf,
    pub exported_at: DateTime<Utc>,
}

/// The last [`MAX_HISTORY`] exports of one [`Exporter`].
#[derive(Debug, Clone, Default)]
pub struct ExportHistory {
    records: VecDeque<ExportRecord>,
}

impl ExportHistory {
    pub fn record(&mut self, record: ExportRecord) {
        if self.records.len() == MAX_HISTORY {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Most recent first.
    pub fn recent(&self) -> impl Iterator<Item = &ExportRecord> {
        self.records.iter().rev()
    }

    /// Exports of one project, most recent first.
    pub fn for_project(&self, project_id: i64) -> Vec<&ExportRecord> {
        self.recent()
            .filter(|record| record.project_id == project_id)
            .collect()
    }

    pub fn last_for_project(&self, project_id: i64) -> Option<&ExportRecord> {
        self.recent().find(|record| record.project_id == project_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Per-file counts of a multi-file export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounts {
    pub success: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The picker was dismissed; nothing was written
    Cancelled,
    Written(PathBuf),
    Batch {
        directory: PathBuf,
        counts: BatchCounts,
    },
}

/// Exports projects through a [`FileAccess`] and remembers what it wrote.
pub struct Exporter {
    store: TranslationStore,
    files: Arc<dyn FileAccess>,
    history: ExportHistory,
}

impl Exporter {
    pub fn new(store: TranslationStore, files: Arc<dyn FileAccess>) -> Self {
        Self {
            store,
            files,
            history: ExportHistory::default(),
        }
    }

    pub fn history(&self) -> &ExportHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ExportHistory {
        &mut self.history
    }

    async fn load(&self, project_id: i64) -> StoreResult<(ProjectBundle, CanonicalMap)> {
        let bundle = self.store.load_project(project_id, SortOption::KeyAsc).await?;
        let codes = bundle.language_codes();

        let translations = bundle
            .groups
            .iter()
            .map(|group| {
                let values = group
                    .cells
                    .iter()
                    .filter(|(code, _)| codes.contains(&code.as_str()))
                    .map(|(code, cell)| (code.clone(), cell.value.clone()))
                    .collect();
                (group.key.clone(), values)
            })
            .collect();

        Ok((bundle, translations))
    }

    fn remember(&mut self, bundle: &ProjectBundle, kind: ExportKind, language: Option<&str>, path: PathBuf) {
        self.history.record(ExportRecord {
            project_id: bundle.project.id,
            project_name: bundle.project.name.clone(),
            kind,
            language: language.map(str::to_string),
            path,
            exported_at: Utc::now(),
        });
    }

    async fn save(
        &mut self,
        bundle: &ProjectBundle,
        content: &str,
        file_name: &str,
        filter: FileFilter,
        kind: ExportKind,
        language: Option<&str>,
    ) -> StoreResult<ExportOutcome> {
        let Some(path) = self
            .files
            .pick_save_target(kind.dialog_title(), file_name, filter)
            .await else {
            info!("Export of '{}' cancelled", bundle.project.name);
            return Ok(ExportOutcome::Cancelled);
        };

        self.files.write_text(&path, content).await?;
        info!("✓ Exported '{}' to {}", bundle.project.name, path.display());

        self.remember(bundle, kind, language, path.clone());
        Ok(ExportOutcome::Written(path))
    }

    /// Export the full bundle (project, languages, translations) as JSON.
    pub async fn export_project_json(&mut self, project_id: i64) -> StoreResult<ExportOutcome> {
        let (bundle, translations) = self.load(project_id).await?;

        let export = ExportBundle {
            project: BundleProject {
                id: bundle.project.id,
                name: bundle.project.name.clone(),
                description: bundle.project.description.clone(),
            },
            languages: bundle
                .languages
                .iter()
                .map(|l| BundleLanguage {
                    code: l.code.clone(),
                    name: l.name.clone(),
                })
                .collect(),
            translations,
            export_time: Utc::now().to_rfc3339(),
        };

        let content = render_json_bundle(&export)?;
        let file_name = generate_file_name(&bundle.project.name, "json", None, Utc::now().date_naive());

        self.save(&bundle, &content, &file_name, FileFilter::JSON, ExportKind::ProjectJson, None)
            .await
    }

    /// Export a `Key,<languages>` table.
    pub async fn export_csv(&mut self, project_id: i64) -> StoreResult<ExportOutcome> {
        let (bundle, translations) = self.load(project_id).await?;

        let content = render_csv(&bundle.language_codes(), &translations);
        let file_name = generate_file_name(&bundle.project.name, "csv", None, Utc::now().date_naive());

        self.save(&bundle, &content, &file_name, FileFilter::CSV, ExportKind::Csv, None)
            .await
    }

    /// Export the non-empty values of one language as flat JSON.
    pub async fn export_single_language(
        &mut self,
        project_id: i64,
        language: &str,
    ) -> StoreResult<ExportOutcome> {
        let (bundle, translations) = self.load(project_id).await?;
        if !bundle.language_codes().contains(&language) {
            return Err(StoreError::not_found("language", language));
        }

        let content = render_language_json(&translations, language)?;
        let file_name = generate_file_name(
            &bundle.project.name,
            "json",
            Some(language),
            Utc::now().date_naive(),
        );

        self.save(
            &bundle,
            &content,
            &file_name,
            FileFilter::JSON,
            ExportKind::LanguageJson,
            Some(language),
        )
        .await
    }

    /// Write one flat JSON file per language into a picked directory.
    ///
    /// A failed file is counted and logged; the others are still written.
    pub async fn export_all_languages(&mut self, project_id: i64) -> StoreResult<ExportOutcome> {
        let (bundle, translations) = self.load(project_id).await?;

        let Some(directory) = self.files.pick_directory(EXPORT_DIRECTORY_TITLE).await else {
            info!("Export of '{}' cancelled", bundle.project.name);
            return Ok(ExportOutcome::Cancelled);
        };

        let date = Utc::now().date_naive();
        let mut counts = BatchCounts::default();

        for code in bundle.language_codes() {
            let path = directory.join(generate_file_name(&bundle.project.name, "json", Some(code), date));

            let written = match render_language_json(&translations, code) {
                Ok(content) => self.files.write_text(&path, &content).await,
                Err(e) => Err(e.into()),
            };

            match written {
                Ok(()) => {
                    counts.success += 1;
                    self.remember(&bundle, ExportKind::LanguageJson, Some(code), path);
                }
                Err(e) => {
                    counts.failed += 1;
                    warn!("Failed to export language '{}': {}", code, e);
                }
            }
        }

        info!(
            "✓ Exported {} languages of '{}' ({} failed)",
            counts.success, bundle.project.name, counts.failed
        );
        Ok(ExportOutcome::Batch { directory, counts })
    }
}
