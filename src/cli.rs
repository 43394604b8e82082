use std::{
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    domain::{CategoryKey, Tracker, clean_name},
    storage::{self, TimeSnapshot},
};

#[derive(Parser, Debug)]
#[command(name = "tracktime")]
#[command(about = "Track time across a tree of projects and tasks", long_about = None)]
pub struct Cli {
    #[arg(long, short, global = true, help = "Category file, one `key: name` per line")]
    pub config: Option<PathBuf>,

    #[arg(long, short, global = true, help = "Write debug-level logs")]
    pub verbose: bool,

    #[command(subcommand)]
    pub action: Option<Action>,
}

#[derive(Subcommand, Debug)]
pub enum Action {
    #[command(about = "Print the category tree with accumulated times")]
    Report,

    #[command(about = "Export categories and times")]
    Export {
        #[arg(long, value_enum, help = "Export format")]
        format: ExportFormat,

        #[arg(long, short, help = "Output path")]
        out: Option<PathBuf>,
    },

    #[command(about = "Add a category to the category file")]
    Add {
        #[arg(help = "Single-letter shortcut")]
        key: char,

        #[arg(help = "Display name")]
        name: String,

        #[arg(long, short, help = "Shortcut of the parent category")]
        parent: Option<char>,
    },

    #[command(about = "Rename a category in the category file")]
    Rename {
        #[arg(help = "Shortcut of the category")]
        key: char,

        #[arg(help = "New display name")]
        name: String,
    },

    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(help = "Shell type (bash, zsh, fish)")]
        shell: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryExport {
    pub key: String,
    pub name: String,
    pub depth: usize,
    pub parent: Option<String>,
    pub own_seconds: u64,
    pub total_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataExport {
    pub schema_version: u32,
    pub exported_at: DateTime<Utc>,
    pub total_seconds: u64,
    pub categories: Vec<CategoryExport>,
}

pub fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .unwrap_or_else(storage::default_config_path)
}

/// Loads the category tree and the banked times saved by the last run.
pub fn open_tracker(config_path: &Path) -> Result<Tracker, String> {
    storage::ensure_config(config_path).map_err(|e| {
        format!(
            "cannot create category file {}: {}",
            config_path.display(),
            e
        )
    })?;
    let mut tracker = storage::load_tracker(config_path)
        .map_err(|e| format!("cannot read category file {}: {}", config_path.display(), e))?;

    if let Some(snapshot) = storage::load_snapshot(&storage::snapshot_path_for(config_path)) {
        let restored = snapshot.apply(&mut tracker);
        info!(restored, saved_at = %snapshot.saved_at, "restored banked times");
    }
    Ok(tracker)
}

/// Writes the tree shape back to the category file and the times to the
/// snapshot.
pub fn save_tracker(config_path: &Path, tracker: &Tracker) -> Result<(), String> {
    storage::save_config(config_path, tracker).map_err(|e| e.to_string())?;
    storage::save_snapshot(
        &storage::snapshot_path_for(config_path),
        &TimeSnapshot::capture(tracker),
    )
    .map_err(|e| e.to_string())
}

pub fn report(config_path: &Path) -> Result<(), String> {
    let tracker = open_tracker(config_path)?;
    println!("{}", tracker.render_text());
    Ok(())
}

pub fn export_rows(tracker: &Tracker) -> Vec<CategoryExport> {
    tracker
        .walk()
        .into_iter()
        .filter_map(|(depth, key)| {
            let category = tracker.get(key)?;
            let parent = category
                .parent
                .filter(|parent| !parent.is_root())
                .map(|parent| parent.to_string());
            Some(CategoryExport {
                key: category.key.to_string(),
                name: category.name.clone(),
                depth,
                parent,
                own_seconds: category.accumulated_seconds,
                total_seconds: tracker.effective_total(key).unwrap_or(0),
            })
        })
        .collect()
}

pub fn export_data(
    config_path: &Path,
    format: ExportFormat,
    out_path: Option<PathBuf>,
) -> Result<(), String> {
    let tracker = open_tracker(config_path)?;
    let rows = export_rows(&tracker);

    let content = match format {
        ExportFormat::Json => {
            let export = DataExport {
                schema_version: 1,
                exported_at: Utc::now(),
                total_seconds: tracker.effective_total(CategoryKey::ROOT).unwrap_or(0),
                categories: rows,
            };
            serde_json::to_string_pretty(&export).map_err(|e| e.to_string())?
        }
        ExportFormat::Csv => storage::render_csv(&rows).map_err(|e| e.to_string())?,
    };

    if let Some(path) = out_path {
        storage::write_text_file(&path, &content).map_err(|e| e.to_string())?;
        println!("Exported to {}", path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

pub fn add_category(
    config_path: &Path,
    key: char,
    name: &str,
    parent: Option<char>,
) -> Result<(), String> {
    storage::ensure_config(config_path).map_err(|e| e.to_string())?;
    let mut tracker = storage::load_tracker(config_path).map_err(|e| e.to_string())?;

    let name = clean_name(name).map_err(|e| e.to_string())?;
    let parent = parent.map(CategoryKey::new).unwrap_or(CategoryKey::ROOT);
    tracker
        .insert_category_under(key, name.as_str(), parent)
        .map_err(|e| e.to_string())?;
    storage::save_config(config_path, &tracker).map_err(|e| e.to_string())?;

    println!("Added '{}' ({}) to {}", name, key, config_path.display());
    Ok(())
}

pub fn rename_category(config_path: &Path, key: char, name: &str) -> Result<(), String> {
    let name = clean_name(name).map_err(|e| e.to_string())?;
    let mut tracker = storage::load_tracker(config_path).map_err(|e| e.to_string())?;
    tracker
        .rename_category(CategoryKey::new(key), name.as_str())
        .map_err(|e| e.to_string())?;
    storage::save_config(config_path, &tracker).map_err(|e| e.to_string())?;

    println!("Renamed '{}' to {}", key, name);
    Ok(())
}

pub fn print_completions(shell: &str) -> Result<(), String> {
    use clap_complete::Shell;
    let shell = match shell {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        _ => {
            return Err(format!(
                "Unsupported shell: {}. Use bash, zsh, or fish.",
                shell
            ));
        }
    };
    clap_complete::generate(shell, &mut Cli::command(), "tracktime", &mut io::stdout());
    Ok(())
}

pub fn run_action(action: Action, config_path: &Path) {
    let result = match action {
        Action::Report => report(config_path),
        Action::Export { format, out } => export_data(config_path, format, out),
        Action::Add { key, name, parent } => add_category(config_path, key, &name, parent),
        Action::Rename { key, name } => rename_category(config_path, key, &name),
        Action::Completions { shell } => print_completions(&shell),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
