use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use translation_keystore::config::Config;
use translation_keystore::db::Database;
use translation_keystore::export::{ExportOutcome, Exporter};
use translation_keystore::files::PresetFileAccess;
use translation_keystore::i18n::{SearchFilter, SortOption};
use translation_keystore::import::{ImportOutcome, Importer};
use translation_keystore::store::{CellEdits, TranslationStore};

#[derive(Parser, Debug)]
#[command(
    name = "keystore",
    about = "Manage project translation keys, progress and CSV/JSON import/export",
    version,
    arg_required_else_help = true
)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Supported languages
    #[command(subcommand)]
    Languages(LanguageCommand),
    /// Projects and their languages
    #[command(subcommand)]
    Projects(ProjectCommand),
    /// Translation keys of a project
    #[command(subcommand)]
    Keys(KeyCommand),
    /// Set one or more values: KEY:LANG=VALUE
    Set {
        project: i64,
        #[arg(required = true)]
        edits: Vec<String>,
    },
    /// Show a project's translations and progress
    Show {
        project: i64,
        #[arg(long)]
        sort: Option<SortOption>,
        #[arg(long)]
        search: Option<String>,
        /// Only keys missing a value in some language
        #[arg(long)]
        incomplete: bool,
    },
    /// Import a CSV or JSON file as a new project
    Import {
        path: PathBuf,
        /// Replace an existing project with the same name
        #[arg(long)]
        overwrite: bool,
    },
    /// Export a project
    Export {
        project: i64,
        #[arg(value_enum)]
        format: ExportFormat,
        /// Language for `language` exports
        #[arg(long)]
        language: Option<String>,
        /// Output file or directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum LanguageCommand {
    List {
        /// Include inactive languages
        #[arg(long)]
        all: bool,
    },
    Add { code: String, name: String },
    Toggle { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
    List,
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated language codes
        #[arg(long, value_delimiter = ',', required = true)]
        languages: Vec<String>,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete { id: i64 },
    /// Flip the completed flag
    Toggle { id: i64 },
    AddLanguage { id: i64, code: String },
    RemoveLanguage { id: i64, code: String },
}

#[derive(Subcommand, Debug)]
enum KeyCommand {
    Add {
        project: i64,
        #[arg(required = true)]
        keys: Vec<String>,
    },
    Rename {
        project: i64,
        old: String,
        new: String,
    },
    Delete {
        project: i64,
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ExportFormat {
    /// Full project bundle
    Json,
    Csv,
    /// One language as flat JSON
    Language,
    /// Every language as flat JSON files in a directory
    Languages,
}

fn emit<T: Serialize + std::fmt::Debug>(json: bool, value: &T) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{:#?}", value);
    }
    Ok(())
}

/// Split `KEY:LANG=VALUE`.
fn parse_edit(raw: &str) -> Result<(&str, &str, &str)> {
    let (target, value) = raw
        .split_once('=')
        .with_context(|| format!("Edit '{}' is missing '='", raw))?;
    let (key, language) = target
        .rsplit_once(':')
        .with_context(|| format!("Edit '{}' must look like KEY:LANG=VALUE", raw))?;
    Ok((key, language, value))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("translation_keystore=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let db = Database::new(&config.database_url)
        .await
        .context("Failed to open database")?;
    let store = TranslationStore::new(db, config.validation_options());

    run(cli, &store, &config).await
}

async fn run(cli: Cli, store: &TranslationStore, config: &Config) -> Result<()> {
    let json = cli.json;

    match cli.command {
        Commands::Languages(command) => match command {
            LanguageCommand::List { all } => emit(json, &store.list_languages(all).await?)?,
            LanguageCommand::Add { code, name } => {
                emit(json, &store.add_supported_language(&code, &name).await?)?
            }
            LanguageCommand::Toggle { id } => emit(json, &store.toggle_language_status(id).await?)?,
        },

        Commands::Projects(command) => match command {
            ProjectCommand::List => emit(json, &store.list_projects().await?)?,
            ProjectCommand::Create {
                name,
                description,
                languages,
            } => emit(
                json,
                &store
                    .create_project(&name, description.as_deref(), &languages)
                    .await?,
            )?,
            ProjectCommand::Update {
                id,
                name,
                description,
            } => emit(
                json,
                &store
                    .update_project(id, name.as_deref(), description.as_deref())
                    .await?,
            )?,
            ProjectCommand::Delete { id } => {
                store.delete_project(id).await?;
                info!("✓ Project {} deleted", id);
            }
            ProjectCommand::Toggle { id } => emit(json, &store.toggle_project_completion(id).await?)?,
            ProjectCommand::AddLanguage { id, code } => emit(json, &store.add_language(id, &code).await?)?,
            ProjectCommand::RemoveLanguage { id, code } => {
                emit(json, &store.remove_language(id, &code).await?)?
            }
        },

        Commands::Keys(command) => match command {
            KeyCommand::Add { project, keys } => {
                let report = store.create_keys(project, &keys).await?;
                emit(json, &report)?;
                if report.failure_count() > 0 {
                    bail!("{} of {} keys were rejected", report.failure_count(), keys.len());
                }
            }
            KeyCommand::Rename { project, old, new } => {
                let rows = store.rename_key(project, &old, &new).await?;
                info!("✓ Renamed '{}' to '{}' ({} cells)", old, new, rows);
            }
            KeyCommand::Delete { project, keys } => {
                let rows = store.delete_keys(project, &keys).await?;
                info!("✓ Deleted {} keys ({} cells)", keys.len(), rows);
            }
        },

        Commands::Set { project, edits } => {
            let mut pending = CellEdits::new(project);
            for raw in &edits {
                let (key, language, value) = parse_edit(raw)?;
                pending.stage(key, language, value);
            }

            let report = pending.commit_all(store).await;
            emit(json, &report)?;
            if report.failure_count() > 0 {
                bail!("{} of {} edits failed", report.failure_count(), edits.len());
            }
        }

        Commands::Show {
            project,
            sort,
            search,
            incomplete,
        } => {
            let bundle = store
                .load_project(project, sort.unwrap_or(config.default_sort))
                .await?;
            let codes = bundle.language_codes();
            let progress = bundle.progress();

            let term = search.unwrap_or_default();
            let shown = bundle.search(&term);
            let shown: Vec<_> = if incomplete {
                let missing: Vec<&str> = bundle.incomplete().into_iter().map(|g| g.key.as_str()).collect();
                shown
                    .iter()
                    .filter(|g| missing.contains(&g.key.as_str()))
                    .collect()
            } else {
                shown.iter().collect()
            };

            if json {
                #[derive(Serialize)]
                struct View<'a, T: Serialize> {
                    project: &'a translation_keystore::model::Project,
                    progress: &'a translation_keystore::i18n::ProgressReport,
                    groups: Vec<T>,
                }
                let view = View {
                    project: &bundle.project,
                    progress: &progress,
                    groups: shown,
                };
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!(
                    "{} [{}] overall {}%",
                    bundle.project.name,
                    codes.join(", "),
                    progress.overall
                );
                for code in &codes {
                    println!("  {:<8} {:>3}%", code, progress.by_language.get(*code).copied().unwrap_or(0));
                }
                for group in shown {
                    println!("{}", SearchFilter::highlight(&group.key, &term));
                    for code in &codes {
                        println!("    {:<8} {}", code, group.value(code));
                    }
                }
            }
        }

        Commands::Import { path, overwrite } => {
            let files = PresetFileAccess::opening(&path);
            match Importer::import_project(&files, store).await? {
                ImportOutcome::Cancelled(message) => warn!("{}", message),
                ImportOutcome::Imported(report) => emit(json, &report)?,
                ImportOutcome::NeedsOverwriteConfirmation {
                    conflicting_project,
                    mut session,
                } => {
                    if overwrite {
                        let report = Importer::confirm_overwrite_and_import(session, store).await?;
                        emit(json, &report)?;
                    } else {
                        session.cancel()?;
                        bail!(
                            "Project '{}' (id {}, {} languages) already exists; rerun with --overwrite to replace it",
                            conflicting_project.name,
                            conflicting_project.id,
                            conflicting_project.language_count
                        );
                    }
                }
            }
        }

        Commands::Export {
            project,
            format,
            language,
            out,
        } => {
            let files = PresetFileAccess::saving_to(&out).with_directory(&out);
            let mut exporter = Exporter::new(store.clone(), Arc::new(files));

            let outcome = match format {
                ExportFormat::Json => exporter.export_project_json(project).await?,
                ExportFormat::Csv => exporter.export_csv(project).await?,
                ExportFormat::Language => {
                    let language = language.context("--language is required for language exports")?;
                    exporter.export_single_language(project, &language).await?
                }
                ExportFormat::Languages => exporter.export_all_languages(project).await?,
            };

            match outcome {
                ExportOutcome::Cancelled => warn!("Export cancelled"),
                ExportOutcome::Written(path) => println!("{}", path.display()),
                ExportOutcome::Batch { directory, counts } => {
                    println!(
                        "{}: {} written, {} failed",
                        directory.display(),
                        counts.success,
                        counts.failed
                    );
                }
            }
        }
    }

    Ok(())
}
