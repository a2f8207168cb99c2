//! Project, key, cell and language operations on top of [`Database`].
//!
//! Every key mutation goes through [`KeyValidator`] first, and every write of
//! a value keeps the completion flag in step with it. Derived data
//! (progress, search) is computed from loaded groups, never stored.

use crate::db::{Database, ProjectUpdate};
use crate::error::{StoreError, StoreResult};
use crate::i18n::{
    CommonValidator, KeyValidator, ProgressCalculator, ProgressReport, SearchFilter, SortOption,
    ValidationOptions,
};
use crate::model::{Cell, Project, SupportedLanguage, TranslationEntry, TranslationGroup};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const PROJECT_NAME_FIELD: &str = "Project name";

/// A loaded project with its visible languages and translation groups.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectBundle {
    pub project: Project,
    /// Active supported languages configured on the project, in project order
    pub languages: Vec<SupportedLanguage>,
    pub groups: Vec<TranslationGroup>,
}

impl ProjectBundle {
    pub fn language_codes(&self) -> Vec<&str> {
        self.languages.iter().map(|l| l.code.as_str()).collect()
    }

    pub fn progress(&self) -> ProgressReport {
        ProgressCalculator::calculate(&self.groups, &self.language_codes())
    }

    pub fn incomplete(&self) -> Vec<&TranslationGroup> {
        ProgressCalculator::get_incomplete_items(&self.groups, &self.language_codes())
    }

    pub fn search(&self, term: &str) -> Cow<'_, [TranslationGroup]> {
        SearchFilter::filter(&self.groups, term, &self.language_codes())
    }
}

/// A project plus its key counts, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectOverview {
    #[serde(flatten)]
    pub project: Project,
    pub total_keys: usize,
    pub completed_keys: usize,
    /// Overall completion percentage
    pub progress: u32,
}

/// One item a batch could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub item: String,
    pub reason: String,
}

/// Outcome of a sequential batch; partial failure is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    fn record(&mut self, item: String, result: StoreResult<()>) {
        match result {
            Ok(()) => self.succeeded.push(item),
            Err(e) => {
                if e.is_infrastructure() {
                    warn!("Batch item '{}' failed: {}", item, e);
                }
                self.failed.push(BatchFailure {
                    item,
                    reason: e.to_string(),
                });
            }
        }
    }
}

fn validation(result: crate::i18n::ValidationResult) -> StoreResult<()> {
    if result.is_valid {
        Ok(())
    } else {
        Err(StoreError::Validation(result.message.unwrap_or_default()))
    }
}

fn validate_project_name(name: &str) -> StoreResult<()> {
    validation(CommonValidator::required(name, PROJECT_NAME_FIELD))
}

/// Store operations for projects, keys, cells and languages.
#[derive(Clone)]
pub struct TranslationStore {
    db: Database,
    options: ValidationOptions,
}

impl TranslationStore {
    pub fn new(db: Database, options: ValidationOptions) -> Self {
        Self { db, options }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    async fn require_project(&self, project_id: i64) -> StoreResult<Project> {
        self.db
            .get_project(project_id)
            .await?
            .ok_or_else(|| StoreError::not_found("project", project_id))
    }

    /// Codes of active supported languages.
    pub async fn active_language_codes(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .db
            .active_languages()
            .await?
            .into_iter()
            .map(|l| l.code)
            .collect())
    }

    // ==================== Projects ====================

    /// Load a project with its languages and groups.
    ///
    /// # Arguments
    /// * `project_id` - Project to load
    /// * `sort` - Group ordering
    ///
    /// # Returns
    /// A [`ProjectBundle`] whose languages are the project's codes that are
    /// still active supported languages, or `NotFound`.
    pub async fn load_project(&self, project_id: i64, sort: SortOption) -> StoreResult<ProjectBundle> {
        let project = self.require_project(project_id).await?;
        let active = self.db.active_languages().await?;

        let languages = project
            .languages
            .iter()
            .filter_map(|code| active.iter().find(|l| &l.code == code).cloned())
            .collect();

        let groups = self.groups_for(&project, sort).await?;

        Ok(ProjectBundle {
            project,
            languages,
            groups,
        })
    }

    /// Re-read only the groups of a project.
    pub async fn reload_groups(
        &self,
        project_id: i64,
        sort: SortOption,
    ) -> StoreResult<Vec<TranslationGroup>> {
        let project = self.require_project(project_id).await?;
        self.groups_for(&project, sort).await
    }

    async fn groups_for(&self, project: &Project, sort: SortOption) -> StoreResult<Vec<TranslationGroup>> {
        let mut groups = self.db.project_groups(project.id, sort).await?;

        for group in &mut groups {
            for code in &project.languages {
                group.cells.entry(code.clone()).or_default();
            }
        }

        Ok(groups)
    }

    /// Create a project.
    ///
    /// The name is trimmed, required and unique.
    /// Languages are filtered to active supported ones (order kept,
    /// duplicates dropped); at least one must remain.
    pub async fn create_project(
        &self,
        name: &str,
        description: Option<&str>,
        languages: &[String],
    ) -> StoreResult<Project> {
        validate_project_name(name)?;
        let name = name.trim();

        if self.db.find_project_by_name(name).await?.is_some() {
            return Err(StoreError::Conflict(format!(
                "A project named '{}' already exists",
                name
            )));
        }

        let active = self.active_language_codes().await?;
        let mut selected: Vec<String> = Vec::new();
        for code in languages {
            if active.contains(code) && !selected.contains(code) {
                selected.push(code.clone());
            }
        }

        if selected.is_empty() {
            return Err(StoreError::NoSupportedLanguages(languages.to_vec()));
        }

        let id = self.db.create_project(name, description, &selected).await?;
        info!("✓ Created project '{}' (id {}) with {} languages", name, id, selected.len());

        self.require_project(id).await
    }

    pub async fn find_project_by_name(&self, name: &str) -> StoreResult<Option<Project>> {
        self.db.find_project_by_name(name.trim()).await
    }

    /// All projects with key counts, most recently updated first.
    ///
    /// Counts use the same active project languages as [`ProjectBundle::progress`].
    pub async fn list_projects(&self) -> StoreResult<Vec<ProjectOverview>> {
        let projects = self.db.list_projects().await?;
        let active = self.active_language_codes().await?;
        let mut overviews = Vec::with_capacity(projects.len());

        for project in projects {
            let codes: Vec<&str> = project
                .languages
                .iter()
                .filter(|code| active.contains(code))
                .map(String::as_str)
                .collect();
            let groups = self.groups_for(&project, SortOption::default()).await?;
            let completed_keys = groups
                .iter()
                .filter(|g| ProgressCalculator::is_item_complete(g, &codes))
                .count();
            let progress = ProgressCalculator::calculate(&groups, &codes).overall;

            overviews.push(ProjectOverview {
                total_keys: groups.len(),
                completed_keys,
                progress,
                project,
            });
        }

        Ok(overviews)
    }

    /// Rename a project and/or change its description.
    ///
    /// An empty description clears it. Languages change only through
    /// [`add_language`](Self::add_language) and
    /// [`remove_language`](Self::remove_language).
    pub async fn update_project(
        &self,
        project_id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> StoreResult<Project> {
        let project = self.require_project(project_id).await?;

        let name = match name {
            Some(name) => {
                validate_project_name(name)?;
                let name = name.trim();
                if let Some(other) = self.db.find_project_by_name(name).await? {
                    if other.id != project.id {
                        return Err(StoreError::Conflict(format!(
                            "A project named '{}' already exists",
                            name
                        )));
                    }
                }
                Some(name.to_string())
            }
            None => None,
        };

        let update = ProjectUpdate {
            name,
            description: description.map(str::to_string),
            languages: None,
        };
        self.db.update_project(project.id, &update).await?;

        self.require_project(project.id).await
    }

    /// Delete a project and every translation row it owns.
    pub async fn delete_project(&self, project_id: i64) -> StoreResult<()> {
        if !self.db.delete_project(project_id).await? {
            return Err(StoreError::not_found("project", project_id));
        }

        info!("✓ Deleted project {}", project_id);
        Ok(())
    }

    pub async fn toggle_project_completion(&self, project_id: i64) -> StoreResult<Project> {
        if !self.db.toggle_project_completion(project_id).await? {
            return Err(StoreError::not_found("project", project_id));
        }
        self.require_project(project_id).await
    }

    // ==================== Keys ====================

    /// Create a key with an empty cell for every project language.
    ///
    /// The key gets the next sort order of the project, so it lists first
    /// under the default ordering.
    pub async fn create_key(&self, project_id: i64, candidate: &str) -> StoreResult<TranslationGroup> {
        let project = self.require_project(project_id).await?;
        let existing = self.db.project_keys(project.id).await?;

        validation(KeyValidator::validate_complete(
            candidate,
            &existing,
            &self.options,
        ))?;

        let sort_order = self.db.max_sort_order(project.id).await? + 1;
        self.db
            .insert_key(project.id, candidate, &project.languages, sort_order)
            .await?;

        debug!("Created key '{}' in project {}", candidate, project.id);
        Ok(TranslationGroup::empty(candidate, sort_order, &project.languages))
    }

    /// Create several keys one after another.
    ///
    /// Each key is validated against the keys created before it, so
    /// duplicates inside the batch are reported as failures.
    pub async fn create_keys<S: AsRef<str>>(
        &self,
        project_id: i64,
        candidates: &[S],
    ) -> StoreResult<BatchReport> {
        self.require_project(project_id).await?;

        let mut report = BatchReport::default();
        for candidate in candidates {
            let candidate = candidate.as_ref();
            let result = self.create_key(project_id, candidate).await.map(|_| ());
            report.record(candidate.to_string(), result);
        }

        info!(
            "✓ Batch key creation: {} created, {} failed",
            report.success_count(),
            report.failure_count()
        );
        Ok(report)
    }

    /// Rename a key across all languages, keeping values and sort order.
    pub async fn rename_key(&self, project_id: i64, old_key: &str, new_key: &str) -> StoreResult<u64> {
        let project = self.require_project(project_id).await?;
        let existing = self.db.project_keys(project.id).await?;

        if !existing.iter().any(|k| k == old_key) {
            return Err(StoreError::not_found("key", old_key));
        }

        let others: Vec<&String> = existing.iter().filter(|k| *k != old_key).collect();
        validation(KeyValidator::validate_complete(new_key, &others, &self.options))?;

        let rows = self.db.rename_key(project.id, old_key, new_key).await?;
        debug!("Renamed key '{}' to '{}' ({} rows)", old_key, new_key, rows);
        Ok(rows)
    }

    /// Delete one key. Returns the number of rows removed.
    pub async fn delete_key(&self, project_id: i64, key: &str) -> StoreResult<u64> {
        self.delete_keys(project_id, &[key]).await
    }

    /// Delete several keys. Returns the number of rows removed.
    pub async fn delete_keys<S: AsRef<str>>(&self, project_id: i64, keys: &[S]) -> StoreResult<u64> {
        let project = self.require_project(project_id).await?;

        let mut removed = 0;
        for key in keys {
            removed += self.db.delete_key(project.id, key.as_ref()).await?;
        }

        debug!("Deleted {} keys ({} rows) from project {}", keys.len(), removed, project.id);
        Ok(removed)
    }

    // ==================== Cells ====================

    /// Write one value, deriving its completion flag.
    pub async fn update_cell(
        &self,
        project_id: i64,
        key: &str,
        language: &str,
        value: &str,
    ) -> StoreResult<Cell> {
        let project = self.require_project(project_id).await?;
        if !project.has_language(language) {
            return Err(StoreError::not_found("language", language));
        }

        let sort_order = self
            .db
            .key_sort_order(project.id, key)
            .await?
            .ok_or_else(|| StoreError::not_found("key", key))?;

        self.db
            .upsert_entry(&TranslationEntry::new(project.id, key, language, value, sort_order))
            .await?;

        Ok(Cell::new(value))
    }

    // ==================== Project Languages ====================

    /// Add a language to a project and an empty cell for every key.
    pub async fn add_language(&self, project_id: i64, code: &str) -> StoreResult<Project> {
        let mut project = self.require_project(project_id).await?;

        let supported = self
            .db
            .get_language_by_code(code)
            .await?
            .filter(|l| l.is_active)
            .ok_or_else(|| StoreError::not_found("language", code))?;

        if project.has_language(&supported.code) {
            return Err(StoreError::Conflict(format!(
                "Language '{}' is already in project '{}'",
                code, project.name
            )));
        }

        let rows = self.db.insert_language_rows(project.id, &supported.code).await?;
        project.languages.push(supported.code);
        self.set_languages(&project).await?;

        info!("✓ Added language '{}' to project {} ({} cells)", code, project.id, rows);
        self.require_project(project.id).await
    }

    /// Remove a language and its cells from a project.
    pub async fn remove_language(&self, project_id: i64, code: &str) -> StoreResult<Project> {
        let mut project = self.require_project(project_id).await?;

        if !project.has_language(code) {
            return Err(StoreError::not_found("language", code));
        }
        if project.languages.len() == 1 {
            return Err(StoreError::LastLanguage(code.to_string()));
        }

        let rows = self.db.delete_language_rows(project.id, code).await?;
        project.languages.retain(|c| c != code);
        self.set_languages(&project).await?;

        info!("✓ Removed language '{}' from project {} ({} cells)", code, project.id, rows);
        self.require_project(project.id).await
    }

    async fn set_languages(&self, project: &Project) -> StoreResult<()> {
        let update = ProjectUpdate {
            languages: Some(project.languages.clone()),
            ..Default::default()
        };
        self.db.update_project(project.id, &update).await?;
        Ok(())
    }

    // ==================== Supported Languages ====================

    pub async fn list_languages(&self, include_inactive: bool) -> StoreResult<Vec<SupportedLanguage>> {
        self.db.list_languages(include_inactive).await
    }

    /// Register a new supported language. Code and name must both be unique.
    pub async fn add_supported_language(&self, code: &str, name: &str) -> StoreResult<SupportedLanguage> {
        validation(CommonValidator::required(code, "Language code"))?;
        validation(CommonValidator::required(name, "Language name"))?;
        let (code, name) = (code.trim(), name.trim());

        let all = self.db.list_languages(true).await?;
        if all.iter().any(|l| l.code == code || l.name == name) {
            return Err(StoreError::Conflict(format!(
                "Language '{}' ({}) already exists",
                name, code
            )));
        }

        self.db.add_language(code, name).await?;
        info!("✓ Added supported language '{}' ({})", name, code);

        self.db
            .get_language_by_code(code)
            .await?
            .ok_or_else(|| StoreError::not_found("language", code))
    }

    /// Activate or deactivate a supported language.
    pub async fn toggle_language_status(&self, language_id: i64) -> StoreResult<SupportedLanguage> {
        if !self.db.toggle_language_status(language_id).await? {
            return Err(StoreError::not_found("language", language_id));
        }

        self.db
            .list_languages(true)
            .await?
            .into_iter()
            .find(|l| l.id == language_id)
            .ok_or_else(|| StoreError::not_found("language", language_id))
    }
}

/// Edits typed into cells but not yet written.
///
/// Staging never touches storage; only [`commit`](Self::commit) and
/// [`commit_all`](Self::commit_all) do. A failed commit keeps the edit
/// staged.
#[derive(Debug, Clone)]
pub struct CellEdits {
    project_id: i64,
    pending: BTreeMap<(String, String), String>,
}

impl CellEdits {
    pub fn new(project_id: i64) -> Self {
        Self {
            project_id,
            pending: BTreeMap::new(),
        }
    }

    pub fn stage(&mut self, key: &str, language: &str, value: impl Into<String>) {
        self.pending
            .insert((key.to_string(), language.to_string()), value.into());
    }

    pub fn pending(&self, key: &str, language: &str) -> Option<&str> {
        self.pending
            .get(&(key.to_string(), language.to_string()))
            .map(String::as_str)
    }

    pub fn discard(&mut self, key: &str, language: &str) -> Option<String> {
        self.pending.remove(&(key.to_string(), language.to_string()))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Write one staged edit. Returns `None` when nothing was staged.
    pub async fn commit(
        &mut self,
        store: &TranslationStore,
        key: &str,
        language: &str,
    ) -> StoreResult<Option<Cell>> {
        let slot = (key.to_string(), language.to_string());
        let Some(value) = self.pending.get(&slot) else {
            return Ok(None);
        };

        let cell = store.update_cell(self.project_id, key, language, value).await?;
        self.pending.remove(&slot);
        Ok(Some(cell))
    }

    /// Write every staged edit in key order.
    pub async fn commit_all(&mut self, store: &TranslationStore) -> BatchReport {
        let slots: Vec<(String, String)> = self.pending.keys().cloned().collect();
        let mut report = BatchReport::default();

        for (key, language) in slots {
            let result = self.commit(store, &key, &language).await.map(|_| ());
            report.record(format!("{}:{}", key, language), result);
        }

        report
    }
}
