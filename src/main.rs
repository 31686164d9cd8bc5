//! tododb CLI - Command-line front end for the to-do store

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tododb::config::{self, TododbConfig};
use tododb::{ui, AppLogger, Database, RepeatMode, TodoItem};
use tokio_stream::StreamExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const TAG: &str = "TodoCli";

#[derive(Parser)]
#[command(name = "tododb")]
#[command(version)]
#[command(about = "Local to-do list with reminders metadata and diagnostic logs")]
#[command(long_about = r#"
tododb keeps to-dos and diagnostic logs in a local SQLite database.

Example usage:
  tododb add "Pay rent" --at 2026-11-01T09:00:00+01:00 --repeat monthly
  tododb list
  tododb done 3
  tododb watch
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    #[command(flatten)]
    Store(StoreCommand),
}

/// Commands that operate on an opened database
#[derive(Subcommand)]
enum StoreCommand {
    /// Add a to-do
    Add {
        /// What to do
        name: String,

        /// When, as RFC 3339 or epoch milliseconds (defaults to now)
        #[arg(long)]
        at: Option<String>,

        /// Free-form remarks
        #[arg(short, long, default_value = "")]
        remarks: String,

        /// Attached image path (repeatable)
        #[arg(short, long = "image")]
        images: Vec<String>,

        /// Recurrence: none, daily, weekly, monthly
        #[arg(long, default_value = "none")]
        repeat: RepeatMode,

        /// Reminders to send before giving up
        #[arg(long, default_value_t = TodoItem::DEFAULT_MAX_RETRIES)]
        max_retries: i32,

        /// Hours between reminders
        #[arg(long, default_value_t = TodoItem::DEFAULT_RETRY_INTERVAL_HOURS)]
        retry_interval: i32,
    },

    /// List all to-dos in scheduled order
    List,

    /// Show one to-do
    Show { id: i64 },

    /// Mark a to-do as done
    Done { id: i64 },

    /// Mark a to-do as not done
    Undone { id: i64 },

    /// Remove a to-do
    Remove { id: i64 },

    /// Print the to-do list every time it changes
    Watch,

    /// Append a diagnostic log entry
    Log { tag: String, message: String },

    /// Show diagnostic logs, newest first
    Logs {
        /// Maximum number of entries
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Delete all diagnostic logs
    ClearLogs,

    /// Delete all to-dos and logs and compact the database
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let settings = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let db_path = resolve_database_path(cli.database.as_deref(), &settings)?;

    match cli.command {
        Commands::Init { force } => {
            run_init(cli.config.as_deref(), &settings, &db_path, force).await
        }
        Commands::Store(command) => {
            let db = Database::shared(settings.builder(&db_path)).await?;
            run_command(command, db, cli.json).await
        }
    }
}

async fn run_command(command: StoreCommand, db: &Database, json: bool) -> anyhow::Result<()> {
    let logger = AppLogger::new(db.log_store().clone());
    let todos = db.todo_store();

    match command {
        StoreCommand::Add {
            name,
            at,
            remarks,
            images,
            repeat,
            max_retries,
            retry_interval,
        } => {
            let time = match at {
                Some(at) => parse_time(&at)?,
                None => tododb::log_entry::now_millis(),
            };
            let mut todo = TodoItem::new(name, time)
                .with_remarks(remarks)
                .with_images(images)
                .with_retries(max_retries, retry_interval)
                .with_repeat(repeat);

            todo.id = todos.insert(&todo).await?;
            logger
                .log(TAG, format!("Added new todo: {} (ID: {})", todo.name, todo.id))
                .await?;
            emit_todo(json, &todo, ui::todo_added)?;
        }

        StoreCommand::List => {
            let all = todos.get_all_todos_list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else if all.is_empty() {
                ui::info("Todos", "none");
            } else {
                ui::header(&format!("{} todos", all.len()));
                println!("{}", ui::todos_table(&all));
            }
        }

        StoreCommand::Show { id } => {
            let todo = require_todo(db, id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&todo)?);
            } else {
                println!("{}", ui::todos_table(std::slice::from_ref(&todo)));
                if !todo.remarks.is_empty() {
                    ui::info("Remarks", &todo.remarks);
                }
                for path in &todo.image_paths {
                    ui::info("Image", path);
                }
            }
        }

        StoreCommand::Done { id } => set_done(db, &logger, id, true, json).await?,

        StoreCommand::Undone { id } => set_done(db, &logger, id, false, json).await?,

        StoreCommand::Remove { id } => {
            let todo = require_todo(db, id).await?;
            todos.delete(&todo).await?;
            logger.log(TAG, format!("Deleted todo: {}", todo.name)).await?;
            emit_todo(json, &todo, ui::todo_removed)?;
        }

        StoreCommand::Watch => run_watch(db, json).await?,

        StoreCommand::Log { tag, message } => {
            logger.log(tag, message).await?;
            if !json {
                ui::success("Logged");
            }
        }

        StoreCommand::Logs { limit } => {
            let mut entries = db.log_store().get_all_logs_list().await?;
            entries.truncate(limit);
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                ui::info("Logs", "none");
            } else {
                println!("{}", ui::logs_table(&entries));
            }
        }

        StoreCommand::ClearLogs => {
            db.log_store().clear_logs().await?;
            if !json {
                ui::success("Logs cleared");
            }
        }

        StoreCommand::Reset => {
            db.clear_all_tables().await?;
            if !json {
                ui::success("All tables cleared");
            }
        }
    }

    Ok(())
}

fn resolve_database_path(flag: Option<&Path>, settings: &TododbConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = &settings.database {
        return Ok(PathBuf::from(path));
    }
    Ok(config::default_database_path_in(&std::env::current_dir()?))
}

async fn run_init(
    config_path: Option<&Path>,
    settings: &TododbConfig,
    db_path: &Path,
    force: bool,
) -> anyhow::Result<()> {
    let config_path = config_path.map(Path::to_path_buf).unwrap_or_else(config::default_config_path);
    let settings = TododbConfig {
        database: Some(db_path.display().to_string()),
        ..settings.clone()
    };
    config::write_config(&config_path, &settings, force)?;
    config::ensure_db_dir(db_path)?;

    let db = settings.builder(db_path).open_async().await?;
    ui::success(&format!("Wrote {}", config_path.display()));
    ui::info("Database", &db_path.display().to_string());
    ui::info("Schema version", &db.schema_version().to_string());
    ui::info("Schema identity", &db.identity_hash());
    Ok(())
}

async fn run_watch(db: &Database, json: bool) -> anyhow::Result<()> {
    let mut snapshots = db.todo_store().get_all_todos().into_stream();
    if !json {
        ui::header("Watching todos (Ctrl-C to stop)");
    }

    loop {
        tokio::select! {
            snapshot = snapshots.next() => {
                let Some(snapshot) = snapshot else { break };
                let snapshot = snapshot?;
                if json {
                    println!("{}", serde_json::to_string(&snapshot)?);
                } else {
                    ui::section(&format!("{} todos", snapshot.len()));
                    println!("{}", ui::todos_table(&snapshot));
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn set_done(
    db: &Database,
    logger: &AppLogger,
    id: i64,
    done: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut todo = require_todo(db, id).await?;
    todo.is_done = done;
    db.todo_store().update(&todo).await?;

    let verb = if done { "Marked done" } else { "Marked undone" };
    logger.log(TAG, format!("{}: {}", verb, todo.name)).await?;
    emit_todo(json, &todo, ui::todo_done)
}

async fn require_todo(db: &Database, id: i64) -> anyhow::Result<TodoItem> {
    db.todo_store()
        .get_todo_by_id(id)
        .await?
        .ok_or_else(|| tododb::Error::TodoNotFound(id).into())
}

fn emit_todo(json: bool, todo: &TodoItem, human: fn(&TodoItem)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(todo)?);
    } else {
        human(todo);
    }
    Ok(())
}

/// RFC 3339 timestamp or raw epoch milliseconds
fn parse_time(input: &str) -> anyhow::Result<i64> {
    if let Ok(millis) = input.parse::<i64>() {
        return Ok(millis);
    }
    let time = chrono::DateTime::parse_from_rfc3339(input)
        .map_err(|e| anyhow::anyhow!("invalid time {:?}: {}", input, e))?;
    Ok(time.timestamp_millis())
}
