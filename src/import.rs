//! Importing a CSV or JSON payload as a new project.
//!
//! An import is a small state machine held in an [`ImportSession`]:
//!
//! ```text
//! Idle --parse--> Parsed --check_conflict--> Done
//!                    |
//!                    +--> NeedsConfirmation --confirm_overwrite--> Done
//!                                |
//!                                +--cancel--> Aborted
//! ```
//!
//! Nothing is written until the session either finds no project with the
//! inferred name or the caller confirms the overwrite. While a session waits
//! for confirmation, all of its state lives in the value; dropping it leaves
//! storage untouched.

use crate::error::{StoreError, StoreResult};
use crate::files::{FileAccess, FileFilter};
use crate::i18n::KeyValidator;
use crate::interchange::{parse_payload, ParsedPayload, PayloadFormat, ProjectInfo};
use crate::model::{ProjectSummary, TranslationEntry};
use crate::store::{BatchFailure, TranslationStore};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Message carried by a cancelled import
pub const IMPORT_CANCELLED: &str = "Import cancelled by user";

/// Title of the open dialog
pub const IMPORT_DIALOG_TITLE: &str = "Import translation file";

/// What an import wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub project_id: i64,
    pub project_name: String,
    /// Languages the project was created with
    pub languages: Vec<String>,
    /// Languages present in the payload but not imported
    pub skipped_languages: Vec<String>,
    pub imported_keys: usize,
    pub failed_keys: Vec<BatchFailure>,
    /// Id of the project deleted by an overwrite
    pub replaced_project: Option<i64>,
}

/// Where an [`ImportSession`] is.
#[derive(Debug, Clone, Default)]
pub enum ImportState {
    #[default]
    Idle,
    Parsed {
        payload: ParsedPayload,
        info: ProjectInfo,
    },
    NeedsConfirmation {
        payload: ParsedPayload,
        info: ProjectInfo,
        conflicting: ProjectSummary,
    },
    Done(ImportReport),
    Aborted,
}

impl ImportState {
    pub fn name(&self) -> &'static str {
        match self {
            ImportState::Idle => "idle",
            ImportState::Parsed { .. } => "parsed",
            ImportState::NeedsConfirmation { .. } => "awaiting confirmation",
            ImportState::Done(_) => "done",
            ImportState::Aborted => "aborted",
        }
    }
}

/// Result of [`ImportSession::check_conflict`].
#[derive(Debug, Clone)]
pub enum ConflictCheck {
    /// No project had the name; the import has been written
    Imported(ImportReport),
    /// A project already has the name; nothing was written
    Conflict(ProjectSummary),
}

/// One import, from parsed payload to written project.
#[derive(Debug, Clone, Default)]
pub struct ImportSession {
    state: ImportState,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ImportState {
        &self.state
    }

    /// Metadata of the pending import, once parsed.
    pub fn info(&self) -> Option<&ProjectInfo> {
        match &self.state {
            ImportState::Parsed { info, .. } | ImportState::NeedsConfirmation { info, .. } => {
                Some(info)
            }
            _ => None,
        }
    }

    fn invalid(&self, expected: &'static str) -> StoreError {
        StoreError::InvalidState {
            expected,
            actual: self.state.name(),
        }
    }

    /// Parse a payload and infer the project to create.
    ///
    /// # Arguments
    /// * `content` - Raw file contents
    /// * `format` - Payload format
    /// * `source_name` - File name, used for the project name when the
    ///   payload carries none
    ///
    /// A parse failure leaves the session idle.
    pub fn parse(
        &mut self,
        content: &str,
        format: PayloadFormat,
        source_name: Option<&str>,
    ) -> StoreResult<&ProjectInfo> {
        if !matches!(self.state, ImportState::Idle) {
            return Err(self.invalid("idle"));
        }

        let payload = parse_payload(content, format)?;
        let info = ProjectInfo::infer(&payload, source_name);
        info!(
            "Parsed {} keys for project '{}' ({} languages)",
            payload.translations.len(),
            info.name,
            info.languages.len()
        );

        self.state = ImportState::Parsed { payload, info };
        match &self.state {
            ImportState::Parsed { info, .. } => Ok(info),
            _ => Err(self.invalid("parsed")),
        }
    }

    /// Look for a project with the inferred name and import when free.
    ///
    /// A conflict moves the session to `NeedsConfirmation` without writing.
    /// On a storage error the session stays parsed.
    pub async fn check_conflict(&mut self, store: &TranslationStore) -> StoreResult<ConflictCheck> {
        let ImportState::Parsed { payload, info } = &self.state else {
            return Err(self.invalid("parsed"));
        };

        let existing = store.find_project_by_name(&info.name).await?;
        if let Some(existing) = existing {
            let conflicting = existing.summary();
            info!(
                "Project '{}' already exists (id {}), waiting for confirmation",
                existing.name, existing.id
            );

            if let ImportState::Parsed { payload, info } = std::mem::take(&mut self.state) {
                self.state = ImportState::NeedsConfirmation {
                    payload,
                    info,
                    conflicting: conflicting.clone(),
                };
            }
            return Ok(ConflictCheck::Conflict(conflicting));
        }

        let report = create_and_import(store, payload, info, None).await?;
        self.state = ImportState::Done(report.clone());
        Ok(ConflictCheck::Imported(report))
    }

    /// Replace the conflicting project with the imported one.
    ///
    /// Languages are resolved before anything is deleted, so an import with
    /// no usable language leaves the existing project in place.
    pub async fn confirm_overwrite(&mut self, store: &TranslationStore) -> StoreResult<ImportReport> {
        let ImportState::NeedsConfirmation {
            payload,
            info,
            conflicting,
        } = &self.state
        else {
            return Err(self.invalid("awaiting confirmation"));
        };

        resolve_languages(store, info).await?;

        match store.delete_project(conflicting.id).await {
            Ok(()) | Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        info!("✓ Replacing project '{}' (id {})", conflicting.name, conflicting.id);

        let replaced = Some(conflicting.id);
        let result = create_and_import(store, payload, info, replaced).await;
        match result {
            Ok(report) => {
                self.state = ImportState::Done(report.clone());
                Ok(report)
            }
            Err(e) => {
                // The old project is gone; the import can be retried from parsed
                if let ImportState::NeedsConfirmation { payload, info, .. } =
                    std::mem::take(&mut self.state)
                {
                    self.state = ImportState::Parsed { payload, info };
                }
                Err(e)
            }
        }
    }

    /// Abandon the import without touching storage.
    pub fn cancel(&mut self) -> StoreResult<()> {
        if matches!(self.state, ImportState::Done(_)) {
            return Err(self.invalid("not done"));
        }

        self.state = ImportState::Aborted;
        Ok(())
    }
}

/// Split the inferred languages into (usable, skipped).
async fn resolve_languages(
    store: &TranslationStore,
    info: &ProjectInfo,
) -> StoreResult<(Vec<String>, Vec<String>)> {
    let active = store.active_language_codes().await?;

    let mut usable: Vec<String> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();
    for code in &info.languages {
        if active.contains(code) {
            if !usable.contains(code) {
                usable.push(code.clone());
            }
        } else if !skipped.contains(code) {
            skipped.push(code.clone());
        }
    }

    if usable.is_empty() {
        return Err(StoreError::NoSupportedLanguages(info.languages.clone()));
    }

    Ok((usable, skipped))
}

/// Create the project and upsert every key in every project language.
///
/// Keys failing the format rules, and keys whose writes fail, are reported
/// and skipped; the rest continue.
async fn create_and_import(
    store: &TranslationStore,
    payload: &ParsedPayload,
    info: &ProjectInfo,
    replaced_project: Option<i64>,
) -> StoreResult<ImportReport> {
    let (languages, _) = resolve_languages(store, info).await?;
    let project = store
        .create_project(&info.name, info.description.as_deref(), &languages)
        .await?;

    let mut skipped: BTreeSet<String> = info
        .languages
        .iter()
        .chain(payload.used_languages().iter())
        .filter(|code| !project.has_language(code))
        .cloned()
        .collect();
    skipped.retain(|code| !code.trim().is_empty());

    let db = store.database();
    let mut imported_keys = 0;
    let mut failed_keys = Vec::new();

    for (key, values) in &payload.translations {
        if let Err(e) = KeyValidator::check_format(key) {
            failed_keys.push(BatchFailure {
                item: key.clone(),
                reason: e.to_string(),
            });
            continue;
        }

        let sort_order = imported_keys as i64 + 1;
        let mut write_error = None;
        for language in &project.languages {
            let value = values.get(language).map(String::as_str).unwrap_or("");
            let entry = TranslationEntry::new(project.id, key, language, value, sort_order);
            if let Err(e) = db.upsert_entry(&entry).await {
                write_error = Some(e);
                break;
            }
        }

        match write_error {
            None => imported_keys += 1,
            Some(e) => {
                warn!("Failed to import key '{}': {}", key, e);
                failed_keys.push(BatchFailure {
                    item: key.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "✓ Imported {} keys into '{}' ({} failed, {} languages skipped)",
        imported_keys,
        project.name,
        failed_keys.len(),
        skipped.len()
    );

    Ok(ImportReport {
        project_id: project.id,
        project_name: project.name,
        languages: project.languages,
        skipped_languages: skipped.into_iter().collect(),
        imported_keys,
        failed_keys,
        replaced_project,
    })
}

/// Outcome of [`Importer::import_project`].
#[derive(Debug, Clone)]
pub enum ImportOutcome {
    /// No file was picked
    Cancelled(String),
    Imported(ImportReport),
    /// A project with the same name exists; call
    /// [`Importer::confirm_overwrite_and_import`] with the session to replace it
    NeedsOverwriteConfirmation {
        conflicting_project: ProjectSummary,
        session: ImportSession,
    },
}

/// File-driven import entry points.
pub struct Importer;

impl Importer {
    /// Pick a file, parse it and import it unless its name collides.
    pub async fn import_project(
        files: &dyn FileAccess,
        store: &TranslationStore,
    ) -> StoreResult<ImportOutcome> {
        let Some(path) = files
            .pick_open_target(IMPORT_DIALOG_TITLE, &FileFilter::IMPORT)
            .await else {
            info!("{}", IMPORT_CANCELLED);
            return Ok(ImportOutcome::Cancelled(IMPORT_CANCELLED.to_string()));
        };

        let content = files.read_text(&path).await?;
        let format = PayloadFormat::detect(Some(&path), &content);
        let source_name = path.file_name().and_then(|name| name.to_str());

        let mut session = ImportSession::new();
        session.parse(&content, format, source_name)?;

        match session.check_conflict(store).await? {
            ConflictCheck::Imported(report) => Ok(ImportOutcome::Imported(report)),
            ConflictCheck::Conflict(conflicting_project) => {
                Ok(ImportOutcome::NeedsOverwriteConfirmation {
                    conflicting_project,
                    session,
                })
            }
        }
    }

    /// Finish an import that was waiting for overwrite confirmation.
    pub async fn confirm_overwrite_and_import(
        mut session: ImportSession,
        store: &TranslationStore,
    ) -> StoreResult<ImportReport> {
        session.confirm_overwrite(store).await
    }
}
