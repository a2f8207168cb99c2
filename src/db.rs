use crate::error::StoreResult;
use crate::i18n::{LanguageRegistry, SortOption};
use crate::model::{
    CanonicalMap, Cell, Project, SupportedLanguage, TranslationEntry, TranslationGroup,
};
use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, FromRow)]
struct LanguageRow {
    id: i64,
    name: String,
    code: String,
    is_active: bool,
    created_at: String,
}

impl From<LanguageRow> for SupportedLanguage {
    fn from(row: LanguageRow) -> Self {
        SupportedLanguage {
            id: row.id,
            code: row.code,
            name: row.name,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: i64,
    name: String,
    description: Option<String>,
    selected_languages: String,
    is_completed: bool,
    created_at: String,
    updated_at: String,
}

impl ProjectRow {
    fn into_project(self) -> StoreResult<Project> {
        Ok(Project {
            id: self.id,
            name: self.name,
            description: self.description,
            languages: serde_json::from_str(&self.selected_languages)?,
            is_completed: self.is_completed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TranslationRow {
    key: String,
    language: String,
    value: String,
    is_completed: bool,
    sort_order: i64,
}

/// Partial update of a project; `None` fields are left unchanged.
///
/// An empty `description` clears it.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub languages: Option<Vec<String>>,
}

/// Counters of statements sent to SQLite.
#[derive(Debug, Default)]
pub struct DbMetrics {
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl DbMetrics {
    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of read statements issued
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of write statements issued (schema setup included)
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> DbMetricsReport {
        let reads = self.reads();
        let writes = self.writes();
        DbMetricsReport {
            reads,
            writes,
            total: reads + writes,
        }
    }
}

/// Snapshot of [`DbMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DbMetricsReport {
    pub reads: usize,
    pub writes: usize,
    pub total: usize,
}

/// SQLite-backed persistence for languages, projects and translations.
///
/// The pool holds a single connection: statements run one at a time, and
/// `sqlite::memory:` databases survive for the life of the pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    metrics: Arc<DbMetrics>,
}

impl Database {
    /// Open (creating if needed) the database and make sure the schema and
    /// the default languages exist.
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            metrics: Arc::new(DbMetrics::default()),
        };

        db.create_schema().await?;
        db.seed_languages().await?;

        info!("Database ready at {}", database_url);
        Ok(db)
    }

    pub fn metrics(&self) -> &DbMetrics {
        &self.metrics
    }

    async fn create_schema(&self) -> StoreResult<()> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS supported_languages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                code TEXT NOT NULL UNIQUE,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                selected_languages TEXT NOT NULL,
                is_completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS translations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL REFERENCES projects (id) ON DELETE CASCADE,
                key TEXT NOT NULL,
                language TEXT NOT NULL,
                value TEXT NOT NULL DEFAULT '',
                is_completed INTEGER NOT NULL DEFAULT 0,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (project_id, key, language)
            )",
            "CREATE INDEX IF NOT EXISTS idx_translations_project_sort
                ON translations (project_id, sort_order)",
        ];

        for statement in statements {
            self.metrics.record_write();
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }

    async fn seed_languages(&self) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();

        for language in LanguageRegistry::get().list_all() {
            self.metrics.record_write();
            sqlx::query(
                "INSERT OR IGNORE INTO supported_languages (name, code, is_active, created_at)
                 VALUES (?1, ?2, 1, ?3)",
            )
            .bind(language.name)
            .bind(language.code)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    // ==================== Languages ====================

    /// List supported languages ordered by name.
    pub async fn list_languages(&self, include_inactive: bool) -> StoreResult<Vec<SupportedLanguage>> {
        self.metrics.record_read();
        let rows: Vec<LanguageRow> = sqlx::query_as(
            "SELECT id, name, code, is_active, created_at
             FROM supported_languages
             WHERE is_active = 1 OR ?1
             ORDER BY name",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SupportedLanguage::from).collect())
    }

    pub async fn active_languages(&self) -> StoreResult<Vec<SupportedLanguage>> {
        self.list_languages(false).await
    }

    pub async fn get_language_by_code(&self, code: &str) -> StoreResult<Option<SupportedLanguage>> {
        self.metrics.record_read();
        let row: Option<LanguageRow> = sqlx::query_as(
            "SELECT id, name, code, is_active, created_at
             FROM supported_languages WHERE code = ?1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SupportedLanguage::from))
    }

    /// Register a new (active) language. Returns its id.
    pub async fn add_language(&self, code: &str, name: &str) -> StoreResult<i64> {
        self.metrics.record_write();
        let result = sqlx::query(
            "INSERT INTO supported_languages (name, code, is_active, created_at)
             VALUES (?1, ?2, 1, ?3)",
        )
        .bind(name)
        .bind(code)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Flip a language between active and inactive.
    pub async fn toggle_language_status(&self, id: i64) -> StoreResult<bool> {
        self.metrics.record_write();
        let result = sqlx::query(
            "UPDATE supported_languages SET is_active = NOT is_active WHERE id = ?1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== Projects ====================

    /// Insert a project. Returns its id.
    pub async fn create_project(
        &self,
        name: &str,
        description: Option<&str>,
        languages: &[String],
    ) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        self.metrics.record_write();
        let result = sqlx::query(
            "INSERT INTO projects (name, description, selected_languages, is_completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?4)",
        )
        .bind(name)
        .bind(description)
        .bind(serde_json::to_string(languages)?)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_project(&self, id: i64) -> StoreResult<Option<Project>> {
        self.metrics.record_read();
        let row: Option<ProjectRow> = sqlx::query_as(
            "SELECT id, name, description, selected_languages, is_completed, created_at, updated_at
             FROM projects WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProjectRow::into_project).transpose()
    }

    /// Exact (case-sensitive) name lookup.
    pub async fn find_project_by_name(&self, name: &str) -> StoreResult<Option<Project>> {
        self.metrics.record_read();
        let row: Option<ProjectRow> = sqlx::query_as(
            "SELECT id, name, description, selected_languages, is_completed, created_at, updated_at
             FROM projects WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProjectRow::into_project).transpose()
    }

    /// All projects, most recently updated first.
    pub async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        self.metrics.record_read();
        let rows: Vec<ProjectRow> = sqlx::query_as(
            "SELECT id, name, description, selected_languages, is_completed, created_at, updated_at
             FROM projects
             ORDER BY updated_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProjectRow::into_project).collect()
    }

    pub async fn update_project(&self, id: i64, update: &ProjectUpdate) -> StoreResult<bool> {
        let languages = update
            .languages
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.metrics.record_write();
        let result = sqlx::query(
            "UPDATE projects SET
                name = COALESCE(?1, name),
                description = CASE WHEN ?2 IS NULL THEN description ELSE NULLIF(TRIM(?2), '') END,
                selected_languages = COALESCE(?3, selected_languages),
                updated_at = ?4
             WHERE id = ?5",
        )
        .bind(update.name.as_deref())
        .bind(update.description.as_deref())
        .bind(languages)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a project and all of its translation rows.
    pub async fn delete_project(&self, id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        self.metrics.record_write();
        let rows = sqlx::query("DELETE FROM translations WHERE project_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        self.metrics.record_write();
        let deleted = sqlx::query("DELETE FROM projects WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        debug!("Deleted project {} ({} translation rows)", id, rows);
        Ok(deleted > 0)
    }

    pub async fn toggle_project_completion(&self, id: i64) -> StoreResult<bool> {
        self.metrics.record_write();
        let result = sqlx::query(
            "UPDATE projects SET is_completed = NOT is_completed, updated_at = ?1 WHERE id = ?2",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== Translations ====================

    /// Highest sort order used in a project (0 when it has no rows).
    pub async fn max_sort_order(&self, project_id: i64) -> StoreResult<i64> {
        self.metrics.record_read();
        let max: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sort_order), 0) FROM translations WHERE project_id = ?1",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(max)
    }

    /// Sort order of an existing key, if the key exists.
    pub async fn key_sort_order(&self, project_id: i64, key: &str) -> StoreResult<Option<i64>> {
        self.metrics.record_read();
        let order: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(sort_order) FROM translations WHERE project_id = ?1 AND key = ?2",
        )
        .bind(project_id)
        .bind(key)
        .fetch_one(&self.pool)
        .await?;

        Ok(order)
    }

    /// Insert one empty row per language for a new key, atomically.
    pub async fn insert_key(
        &self,
        project_id: i64,
        key: &str,
        languages: &[String],
        sort_order: i64,
    ) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for language in languages {
            self.metrics.record_write();
            sqlx::query(
                "INSERT INTO translations
                    (project_id, key, language, value, is_completed, sort_order, created_at, updated_at)
                 VALUES (?1, ?2, ?3, '', 0, ?4, ?5, ?5)",
            )
            .bind(project_id)
            .bind(key)
            .bind(language)
            .bind(sort_order)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Insert or update one cell. The row's sort order is only set on insert.
    pub async fn upsert_entry(&self, entry: &TranslationEntry) -> StoreResult<()> {
        self.metrics.record_write();
        sqlx::query(
            "INSERT INTO translations
                (project_id, key, language, value, is_completed, sort_order, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT (project_id, key, language) DO UPDATE SET
                value = excluded.value,
                is_completed = excluded.is_completed,
                updated_at = excluded.updated_at",
        )
        .bind(entry.project_id)
        .bind(&entry.key)
        .bind(&entry.language)
        .bind(&entry.value)
        .bind(entry.is_completed)
        .bind(entry.sort_order)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Re-key every row of `old_key`. Returns the number of rows changed.
    pub async fn rename_key(&self, project_id: i64, old_key: &str, new_key: &str) -> StoreResult<u64> {
        self.metrics.record_write();
        let result = sqlx::query(
            "UPDATE translations SET key = ?1, updated_at = ?2 WHERE project_id = ?3 AND key = ?4",
        )
        .bind(new_key)
        .bind(Utc::now().to_rfc3339())
        .bind(project_id)
        .bind(old_key)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete every language row of a key. Returns the number of rows removed.
    pub async fn delete_key(&self, project_id: i64, key: &str) -> StoreResult<u64> {
        self.metrics.record_write();
        let result = sqlx::query("DELETE FROM translations WHERE project_id = ?1 AND key = ?2")
            .bind(project_id)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Add an empty row in `language` for every key of the project.
    pub async fn insert_language_rows(&self, project_id: i64, language: &str) -> StoreResult<u64> {
        self.metrics.record_write();
        let result = sqlx::query(
            "INSERT OR IGNORE INTO translations
                (project_id, key, language, value, is_completed, sort_order, created_at, updated_at)
             SELECT ?1, key, ?2, '', 0, MAX(sort_order), ?3, ?3
             FROM translations
             WHERE project_id = ?1
             GROUP BY key",
        )
        .bind(project_id)
        .bind(language)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Remove every row in `language` from the project.
    pub async fn delete_language_rows(&self, project_id: i64, language: &str) -> StoreResult<u64> {
        self.metrics.record_write();
        let result = sqlx::query("DELETE FROM translations WHERE project_id = ?1 AND language = ?2")
            .bind(project_id)
            .bind(language)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Distinct keys of a project, ascending.
    pub async fn project_keys(&self, project_id: i64) -> StoreResult<Vec<String>> {
        self.metrics.record_read();
        let keys: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT key FROM translations WHERE project_id = ?1 ORDER BY key",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    pub async fn key_exists(&self, project_id: i64, key: &str) -> StoreResult<bool> {
        self.metrics.record_read();
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM translations WHERE project_id = ?1 AND key = ?2",
        )
        .bind(project_id)
        .bind(key)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Rows of a project grouped by key, in `sort` order.
    ///
    /// Only the ORDER BY body is spliced into the statement, and it comes
    /// from a fixed set of strings.
    pub async fn project_groups(
        &self,
        project_id: i64,
        sort: SortOption,
    ) -> StoreResult<Vec<TranslationGroup>> {
        let sql = format!(
            "SELECT key, language, value, is_completed, sort_order
             FROM translations
             WHERE project_id = ?1
             ORDER BY {}, language ASC",
            sort.order_by_clause()
        );

        self.metrics.record_read();
        let rows: Vec<TranslationRow> = sqlx::query_as(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(group_rows(rows))
    }

    /// `{key: {language: value}}` for a project.
    pub async fn export_map(&self, project_id: i64) -> StoreResult<CanonicalMap> {
        let groups = self.project_groups(project_id, SortOption::KeyAsc).await?;

        Ok(groups
            .into_iter()
            .map(|group| {
                let values = group
                    .cells
                    .into_iter()
                    .map(|(language, cell)| (language, cell.value))
                    .collect();
                (group.key, values)
            })
            .collect())
    }
}

/// Fold ordered rows into groups, keeping first-seen key order.
fn group_rows(rows: Vec<TranslationRow>) -> Vec<TranslationGroup> {
    let mut groups: Vec<TranslationGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let position = *index.entry(row.key.clone()).or_insert_with(|| {
            groups.push(TranslationGroup {
                key: row.key.clone(),
                sort_order: row.sort_order,
                cells: Default::default(),
            });
            groups.len() - 1
        });

        groups[position].cells.insert(
            row.language,
            Cell {
                value: row.value,
                is_completed: row.is_completed,
            },
        );
    }

    groups
}
