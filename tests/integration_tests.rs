//! Integration tests for the translation keystore
//!
//! These tests drive the store, importer and exporter together against an
//! in-memory SQLite database and a temporary directory.

use std::sync::Arc;
use tempfile::TempDir;

use translation_keystore::db::Database;
use translation_keystore::export::{ExportOutcome, Exporter};
use translation_keystore::files::PresetFileAccess;
use translation_keystore::i18n::{SortOption, ValidationOptions};
use translation_keystore::import::{ImportOutcome, Importer, IMPORT_CANCELLED};
use translation_keystore::store::TranslationStore;
use translation_keystore::StoreError;

// ==================== Test Helpers ====================

async fn create_test_store() -> TranslationStore {
    let db = Database::new("sqlite::memory:")
        .await
        .expect("Failed to create database");
    TranslationStore::new(db, ValidationOptions::default())
}

fn langs(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

/// "Demo" with three keys in en/ja, partly translated
async fn seed_demo(store: &TranslationStore) -> i64 {
    let project = store
        .create_project("Demo", Some("Sample project"), &langs(&["en", "ja"]))
        .await
        .expect("Should create project");

    store
        .create_keys(project.id, &["home.title", "home.body", "settings.save"])
        .await
        .expect("Should create keys");

    for (key, lang, value) in [
        ("home.title", "en", "Welcome"),
        ("home.title", "ja", "ようこそ"),
        ("home.body", "en", "Hello, \"friend\""),
        ("settings.save", "en", "Save"),
        ("settings.save", "ja", "保存"),
    ] {
        store
            .update_cell(project.id, key, lang, value)
            .await
            .expect("Should update cell");
    }

    project.id
}

// ==================== Import Conflict Tests ====================

#[tokio::test]
async fn test_import_conflict_leaves_storage_unchanged_until_confirmed() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = create_test_store().await;
    let demo_id = seed_demo(&store).await;

    let path = temp_dir.path().join("anything.json");
    std::fs::write(
        &path,
        r#"{"project": {"name": "Demo"}, "translations": {"fresh.key": {"en": "Fresh"}}}"#,
    )
    .expect("Should write payload");

    let writes_before = store.database().metrics().writes();
    let outcome = Importer::import_project(&PresetFileAccess::opening(&path), &store)
        .await
        .expect("Import should run");

    let ImportOutcome::NeedsOverwriteConfirmation {
        conflicting_project,
        session,
    } = outcome
    else {
        panic!("Expected an overwrite confirmation");
    };
    assert_eq!(conflicting_project.name, "Demo");
    assert_eq!(conflicting_project.id, demo_id);
    assert_eq!(store.database().metrics().writes(), writes_before);

    let bundle = store
        .load_project(demo_id, SortOption::KeyAsc)
        .await
        .expect("Original project should still exist");
    assert_eq!(bundle.groups.len(), 3);

    let report = Importer::confirm_overwrite_and_import(session, &store)
        .await
        .expect("Overwrite should succeed");
    assert_eq!(report.replaced_project, Some(demo_id));
    assert_eq!(report.languages, vec!["en"]);

    let replaced = store
        .load_project(report.project_id, SortOption::KeyAsc)
        .await
        .expect("New project should load");
    assert_eq!(replaced.project.name, "Demo");
    assert_eq!(replaced.groups.len(), 1);
    assert!(matches!(
        store.load_project(demo_id, SortOption::KeyAsc).await,
        Err(StoreError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_cancelled_import_makes_no_storage_calls() {
    let store = create_test_store().await;
    let before = store.database().metrics().report();

    let outcome = Importer::import_project(&PresetFileAccess::cancelled(), &store)
        .await
        .expect("Cancellation is not an error");

    match outcome {
        ImportOutcome::Cancelled(message) => {
            assert_eq!(message, IMPORT_CANCELLED);
            assert!(message.contains("cancelled"));
        }
        other => panic!("Expected cancellation, got {:?}", other),
    }
    assert_eq!(store.database().metrics().report(), before);
}

// ==================== Round-trip Tests ====================

#[tokio::test]
async fn test_json_export_then_import_reproduces_project() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = create_test_store().await;
    let demo_id = seed_demo(&store).await;
    let original = store.database().export_map(demo_id).await.expect("Should export map");

    let mut exporter = Exporter::new(
        store.clone(),
        Arc::new(PresetFileAccess::saving_to(temp_dir.path())),
    );
    let ExportOutcome::Written(path) = exporter
        .export_project_json(demo_id)
        .await
        .expect("Export should succeed")
    else {
        panic!("Expected a written file");
    };

    store.delete_project(demo_id).await.expect("Should delete");

    let outcome = Importer::import_project(&PresetFileAccess::opening(&path), &store)
        .await
        .expect("Import should succeed");
    let ImportOutcome::Imported(report) = outcome else {
        panic!("Expected a direct import");
    };

    assert_eq!(report.project_name, "Demo");
    assert_eq!(report.languages, vec!["en", "ja"]);
    assert!(report.failed_keys.is_empty());

    let imported = store
        .database()
        .export_map(report.project_id)
        .await
        .expect("Should export map");
    assert_eq!(imported, original);

    let project = store
        .load_project(report.project_id, SortOption::default())
        .await
        .expect("Should load");
    assert_eq!(project.project.description.as_deref(), Some("Sample project"));
    assert_eq!(project.progress().overall, 67);
}

#[tokio::test]
async fn test_csv_export_then_import_under_file_name() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = create_test_store().await;
    let demo_id = seed_demo(&store).await;
    let original = store.database().export_map(demo_id).await.expect("Should export map");

    let target = temp_dir.path().join("Copy.csv");
    let mut exporter = Exporter::new(store.clone(), Arc::new(PresetFileAccess::saving_to(&target)));
    exporter.export_csv(demo_id).await.expect("Export should succeed");

    let outcome = Importer::import_project(&PresetFileAccess::opening(&target), &store)
        .await
        .expect("Import should succeed");
    let ImportOutcome::Imported(report) = outcome else {
        panic!("Expected a direct import");
    };

    assert_eq!(report.project_name, "Copy", "CSV carries no name; the file stem is used");
    let imported = store
        .database()
        .export_map(report.project_id)
        .await
        .expect("Should export map");
    assert_eq!(imported, original);
}

// ==================== Progress Consistency Tests ====================

#[tokio::test]
async fn test_progress_follows_language_changes() {
    let store = create_test_store().await;
    let demo_id = seed_demo(&store).await;

    let bundle = store.load_project(demo_id, SortOption::default()).await.unwrap();
    let progress = bundle.progress();
    assert_eq!(progress.by_language["en"], 100);
    assert_eq!(progress.by_language["ja"], 67);
    assert_eq!(progress.overall, 67);
    assert_eq!(bundle.incomplete().len(), 1);

    store.add_language(demo_id, "ko").await.expect("Should add language");
    let bundle = store.load_project(demo_id, SortOption::default()).await.unwrap();
    assert_eq!(bundle.progress().overall, 0);
    assert_eq!(bundle.progress().by_language["ko"], 0);
    assert_eq!(bundle.incomplete().len(), 3);

    store.remove_language(demo_id, "ko").await.expect("Should remove");
    store.remove_language(demo_id, "ja").await.expect("Should remove");
    let bundle = store.load_project(demo_id, SortOption::default()).await.unwrap();
    assert_eq!(bundle.progress().overall, 100);
    assert!(bundle.incomplete().is_empty());
}

#[tokio::test]
async fn test_sort_orders_on_loaded_project() {
    let store = create_test_store().await;
    let project = store
        .create_project("Sorted", None, &langs(&["en"]))
        .await
        .unwrap();
    store.create_keys(project.id, &["c", "a", "b"]).await.unwrap();

    let keys = |groups: Vec<translation_keystore::model::TranslationGroup>| {
        groups.into_iter().map(|g| g.key).collect::<Vec<_>>()
    };

    let newest = store.reload_groups(project.id, SortOption::TimeDesc).await.unwrap();
    assert_eq!(keys(newest), vec!["b", "a", "c"]);

    let oldest = store.reload_groups(project.id, SortOption::TimeAsc).await.unwrap();
    assert_eq!(keys(oldest), vec!["c", "a", "b"]);

    let by_key = store.reload_groups(project.id, SortOption::KeyAsc).await.unwrap();
    assert_eq!(keys(by_key), vec!["a", "b", "c"]);
}
